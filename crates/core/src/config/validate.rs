use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::classifier::labels;
use crate::scheduler::{ScheduleMode, Trigger, MIN_INTERVAL};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Client names are unique and non-empty
/// - Target clients refer to configured clients
/// - Schedule parses and respects the minimum interval
/// - Category lists only name labels the classifier produces
/// - Site aliases map to a non-empty host
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for client in &config.clients {
        if client.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "clients[].name cannot be empty".to_string(),
            ));
        }
        if !names.insert(client.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate client name: {}",
                client.name
            )));
        }
    }

    for target in &config.tagger.target_clients {
        if !names.contains(target.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "tagger.target_clients references unknown client: {}",
                target
            )));
        }
    }

    if config.schedule.mode == ScheduleMode::Interval {
        if config.schedule.interval_value == 0 {
            return Err(ConfigError::ValidationError(
                "schedule.interval_value must be greater than 0".to_string(),
            ));
        }
        if config.schedule.interval() < MIN_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "schedule interval must be at least {} minutes",
                MIN_INTERVAL.as_secs() / 60
            )));
        }
    }
    Trigger::from_config(&config.schedule)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    let lists = [
        ("categories.movie", &config.categories.movie, labels::MOVIE),
        ("categories.tv", &config.categories.tv, labels::TV),
        ("categories.anime", &config.categories.anime, labels::ANIME),
    ];
    for (field, configured, known) in lists {
        if let Some(unknown) = configured.iter().find(|l| !known.contains(&l.as_str())) {
            return Err(ConfigError::ValidationError(format!(
                "{} contains unknown category: {}",
                field, unknown
            )));
        }
    }

    if let Some((alias, _)) = config
        .site_aliases
        .iter()
        .find(|(k, v)| k.trim().is_empty() || v.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(format!(
            "site_aliases entry '{}' must map a non-empty host",
            alias
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_from_str, ClientConfig, ServerConfig};
    use crate::scheduler::IntervalUnit;
    use crate::torrent_client::ClientBackend;

    fn client(name: &str) -> ClientConfig {
        ClientConfig {
            name: name.to_string(),
            backend: ClientBackend::QBittorrent,
            url: "http://localhost:8080".to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_duplicate_client_names() {
        let config = Config {
            clients: vec![client("qb"), client("qb")],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate client name"));
    }

    #[test]
    fn test_validate_unknown_target_client() {
        let mut config = Config {
            clients: vec![client("qb")],
            ..Default::default()
        };
        config.tagger.target_clients = vec!["missing".to_string()];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_interval_below_minimum() {
        let mut config = Config::default();
        config.schedule.mode = ScheduleMode::Interval;
        config.schedule.interval_value = 3;
        config.schedule.interval_unit = IntervalUnit::Minutes;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("at least 5 minutes"));

        config.schedule.interval_value = 5;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_bad_cron() {
        let mut config = Config::default();
        config.schedule.mode = ScheduleMode::Cron;
        config.schedule.cron = "every day please".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_category_label() {
        let config = load_config_from_str(
            r#"
[categories]
movie = ["Movie/Animation", "Movie/Horror"]
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Movie/Horror"));
    }

    #[test]
    fn test_validate_empty_alias_target() {
        let mut config = Config::default();
        config
            .site_aliases
            .insert("tracker.example".to_string(), " ".to_string());
        assert!(validate_config(&config).is_err());
    }
}
