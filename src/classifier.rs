use crate::lexicon::{self, THEMES};
use crate::model::{Analysis, Sentiment};

/// Unicode whitespace plus the ASCII file/group/record/unit separators,
/// which older exports treat as word breaks too.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_separator).filter(|t| !t.is_empty())
}

/// Counts whole-token lexicon hits in the lowercased text.
///
/// Tokens are whitespace-separated and keep any punctuation, so `"broke."`
/// does not match `"broke"`. Negative wins only on a strict majority.
pub fn classify_sentiment(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();

    let mut positive = 0usize;
    let mut negative = 0usize;
    for token in tokens(&lowered) {
        if lexicon::is_positive(token) {
            positive += 1;
        }
        if lexicon::is_negative(token) {
            negative += 1;
        }
    }

    if positive >= negative {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    }
}

/// Returns every theme with at least one keyword appearing anywhere in the
/// text as a substring, in theme table order.
pub fn detect_themes(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();

    THEMES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(theme, _)| theme.to_string())
        .collect()
}

pub fn analyze(text: &str) -> Analysis {
    Analysis {
        sentiment: classify_sentiment(text),
        themes: detect_themes(text),
    }
}
