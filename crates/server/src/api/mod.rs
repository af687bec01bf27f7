pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod scan;

pub use routes::create_router;
