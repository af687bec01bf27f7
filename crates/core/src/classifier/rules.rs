use super::{genres, labels, MediaFacts};

const CHINESE_LANGUAGES: &[&str] = &["zh", "cn", "bo", "za"];
const CHINESE_COUNTRIES: &[&str] = &["CN", "TW", "HK"];
const JAPANESE_ANIMATION_COUNTRIES: &[&str] = &["JP", "US"];
const WESTERN_COUNTRIES: &[&str] = &[
    "US", "FR", "GB", "DE", "ES", "IT", "NL", "PT", "RU", "UK",
];
const EAST_ASIAN_COUNTRIES: &[&str] = &["JP", "KP", "KR", "TH", "IN", "SG"];

/// A predicate over media facts.
#[derive(Debug, Clone)]
pub enum Condition {
    HasGenre(u32),
    AnyGenre(&'static [u32]),
    /// Any origin country in the set (case-insensitive).
    CountryIn(&'static [&'static str]),
    /// Original language in the set (case-insensitive).
    LanguageIn(&'static [&'static str]),
    All(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, facts: &MediaFacts) -> bool {
        match self {
            Condition::HasGenre(id) => facts.genre_ids.contains(id),
            Condition::AnyGenre(ids) => ids.iter().any(|id| facts.genre_ids.contains(id)),
            Condition::CountryIn(set) => facts
                .origin_countries
                .iter()
                .any(|c| set.iter().any(|s| s.eq_ignore_ascii_case(c.trim()))),
            Condition::LanguageIn(set) => facts
                .original_language
                .as_deref()
                .is_some_and(|lang| set.iter().any(|s| s.eq_ignore_ascii_case(lang.trim()))),
            Condition::All(conditions) => conditions.iter().all(|c| c.matches(facts)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub condition: Condition,
    pub label: &'static str,
}

impl Rule {
    fn new(condition: Condition, label: &'static str) -> Self {
        Self { condition, label }
    }
}

/// Ordered rules with a fallback label.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub fallback: &'static str,
}

impl RuleSet {
    /// Label of the first matching rule, or the fallback.
    pub fn evaluate(&self, facts: &MediaFacts) -> &'static str {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(facts))
            .map_or(self.fallback, |rule| rule.label)
    }
}

pub(super) fn movie_rules() -> RuleSet {
    RuleSet {
        rules: vec![
            Rule::new(Condition::HasGenre(genres::ANIMATION), labels::MOVIE_ANIMATION),
            Rule::new(Condition::LanguageIn(CHINESE_LANGUAGES), labels::MOVIE_CHINESE),
        ],
        fallback: labels::MOVIE_FOREIGN,
    }
}

pub(super) fn tv_rules() -> RuleSet {
    RuleSet {
        rules: vec![
            Rule::new(
                Condition::All(vec![
                    Condition::HasGenre(genres::ANIMATION),
                    Condition::CountryIn(CHINESE_COUNTRIES),
                ]),
                labels::TV_CHINESE_ANIMATION,
            ),
            Rule::new(
                Condition::All(vec![
                    Condition::HasGenre(genres::ANIMATION),
                    Condition::CountryIn(JAPANESE_ANIMATION_COUNTRIES),
                ]),
                labels::TV_JAPANESE_ANIMATION,
            ),
            Rule::new(Condition::HasGenre(genres::DOCUMENTARY), labels::TV_DOCUMENTARY),
            Rule::new(Condition::HasGenre(genres::KIDS), labels::TV_KIDS),
            Rule::new(
                Condition::AnyGenre(&[genres::REALITY, genres::TALK]),
                labels::TV_VARIETY,
            ),
            Rule::new(Condition::CountryIn(CHINESE_COUNTRIES), labels::TV_CHINESE),
            Rule::new(Condition::CountryIn(WESTERN_COUNTRIES), labels::TV_WESTERN),
            Rule::new(Condition::CountryIn(EAST_ASIAN_COUNTRIES), labels::TV_EAST_ASIAN),
        ],
        fallback: labels::TV_UNCATEGORIZED,
    }
}

/// Anime is animation by definition, so only the country split applies.
pub(super) fn anime_rules() -> RuleSet {
    RuleSet {
        rules: vec![
            Rule::new(
                Condition::CountryIn(CHINESE_COUNTRIES),
                labels::ANIME_CHINESE_ANIMATION,
            ),
            Rule::new(
                Condition::CountryIn(JAPANESE_ANIMATION_COUNTRIES),
                labels::ANIME_JAPANESE_ANIMATION,
            ),
        ],
        fallback: labels::ANIME_UNCATEGORIZED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_facts_match_nothing() {
        let facts = MediaFacts::default();
        assert!(!Condition::HasGenre(16).matches(&facts));
        assert!(!Condition::CountryIn(CHINESE_COUNTRIES).matches(&facts));
        assert!(!Condition::LanguageIn(CHINESE_LANGUAGES).matches(&facts));
        // Vacuous conjunction
        assert!(Condition::All(vec![]).matches(&facts));
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let facts = MediaFacts {
            genre_ids: [genres::DOCUMENTARY, genres::KIDS].into_iter().collect(),
            origin_countries: ["CN".to_string()].into_iter().collect(),
            original_language: None,
        };
        assert_eq!(tv_rules().evaluate(&facts), labels::TV_DOCUMENTARY);
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            movie_rules().evaluate(&MediaFacts::default()),
            labels::MOVIE_FOREIGN
        );
        assert_eq!(
            tv_rules().evaluate(&MediaFacts::default()),
            labels::TV_UNCATEGORIZED
        );
    }
}
