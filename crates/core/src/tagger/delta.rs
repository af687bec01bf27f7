use std::collections::BTreeSet;

/// Changes to apply to one torrent.
///
/// Additive only: tags are never removed and a category is only proposed
/// when it differs from the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCategoryDelta {
    /// Tags to add, in desired order.
    pub tags: Vec<String>,
    pub category: Option<String>,
    /// Tags on the torrent before the write, when known.
    pub original_tags: Option<BTreeSet<String>>,
}

impl TagCategoryDelta {
    pub fn compute(
        desired_tags: impl IntoIterator<Item = String>,
        desired_category: Option<String>,
        current_tags: &BTreeSet<String>,
        current_category: Option<&str>,
    ) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for tag in desired_tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !current_tags.contains(&tag) && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let category = desired_category
            .filter(|c| !c.is_empty())
            .filter(|c| current_category != Some(c.as_str()));

        Self {
            tags,
            category,
            original_tags: Some(current_tags.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.category.is_none()
    }
}
