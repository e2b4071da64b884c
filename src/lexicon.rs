// Keyword tables behind sentiment and theme tagging.
// Edits here only affect new submissions; stored records keep their tags.

pub const POSITIVE_WORDS: &[&str] = &[
    "shiny", "elegant", "comfortable", "premium", "beautiful", "good", "great",
    "amazing", "love", "perfect", "nice", "smooth", "light",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "tarnish", "dull", "broke", "uncomfortable", "heavy", "fragile", "bad",
    "poor", "hate", "worst", "rough", "cheap",
];

/// Theme name -> keywords, checked in this order.
pub const THEMES: &[(&str, &[&str])] = &[
    ("Comfort", &["light", "heavy", "fit", "wearable", "comfortable", "uncomfortable", "smooth", "rough"]),
    ("Durability", &["broke", "strong", "quality", "fragile", "tarnish", "lasting", "sturdy"]),
    ("Appearance", &["shiny", "dull", "design", "polish", "elegant", "beautiful", "looks", "style"]),
];

pub fn is_positive(token: &str) -> bool {
    POSITIVE_WORDS.contains(&token)
}

pub fn is_negative(token: &str) -> bool {
    NEGATIVE_WORDS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_order_is_fixed() {
        let names: Vec<&str> = THEMES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Comfort", "Durability", "Appearance"]);
    }

    #[test]
    fn test_lexicons_are_lowercase() {
        for word in POSITIVE_WORDS.iter().chain(NEGATIVE_WORDS) {
            assert_eq!(*word, word.to_lowercase());
        }
        for (_, keywords) in THEMES {
            for keyword in keywords.iter() {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
        }
    }

    #[test]
    fn test_sentiment_lexicons_are_disjoint() {
        for word in POSITIVE_WORDS {
            assert!(!is_negative(word), "{} is in both lexicons", word);
        }
    }
}
