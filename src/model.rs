use std::num::IntErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentiment label attached to a record at submission time.
///
/// Ties (including text with no lexicon hits) resolve to `Positive`,
/// so there is no neutral label.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classifier output, echoed back to the submitter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub themes: Vec<String>,
}

/// One stored piece of feedback. Field order is the on-disk order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub product_id: String,
    pub rating: i64,
    #[serde(default)]
    pub text: String,
    pub sentiment: Sentiment,
    pub themes: Vec<String>,
}

impl FeedbackRecord {
    pub fn new(feedback: NewFeedback, analysis: Analysis) -> Self {
        Self {
            product_id: feedback.product_id,
            rating: feedback.rating,
            text: feedback.text,
            sentiment: analysis.sentiment,
            themes: analysis.themes,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing product_id or rating")]
    MissingFields,

    #[error("rating must be an integer")]
    InvalidRating,

    #[error("rating is out of range")]
    RatingOutOfRange,
}

/// Rating as it may arrive over the wire.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RatingInput {
    Integer(i64),
    // Only reached for integers above i64::MAX
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl RatingInput {
    /// Zero and the empty string count as "not provided".
    fn is_blank(&self) -> bool {
        match self {
            RatingInput::Integer(n) => *n == 0,
            RatingInput::Unsigned(n) => *n == 0,
            RatingInput::Float(f) => *f == 0.0,
            RatingInput::Text(s) => s.is_empty(),
        }
    }

    fn to_integer(&self) -> Result<i64, ValidationError> {
        match self {
            RatingInput::Integer(n) => Ok(*n),
            RatingInput::Unsigned(n) => {
                i64::try_from(*n).map_err(|_| ValidationError::RatingOutOfRange)
            }
            RatingInput::Float(f) if !f.is_finite() => Err(ValidationError::InvalidRating),
            RatingInput::Float(f) => {
                let whole = f.trunc();
                // i64::MAX as f64 rounds up to 2^63, which is already out of range
                if whole >= i64::MIN as f64 && whole < i64::MAX as f64 {
                    Ok(whole as i64)
                } else {
                    Err(ValidationError::RatingOutOfRange)
                }
            }
            RatingInput::Text(s) => s.trim().parse::<i64>().map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    ValidationError::RatingOutOfRange
                }
                _ => ValidationError::InvalidRating,
            }),
        }
    }
}

/// Raw body of `POST /api/feedback`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Submission {
    pub product_id: Option<String>,
    pub rating: Option<RatingInput>,
    pub text: Option<String>,
}

/// A submission that passed validation and is ready to classify.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub product_id: String,
    pub rating: i64,
    pub text: String,
}

impl Submission {
    pub fn validate(self) -> Result<NewFeedback, ValidationError> {
        let product_id = self.product_id.filter(|id| !id.is_empty());
        let rating = self.rating.filter(|r| !r.is_blank());

        let (product_id, rating) = match (product_id, rating) {
            (Some(id), Some(rating)) => (id, rating),
            _ => return Err(ValidationError::MissingFields),
        };

        Ok(NewFeedback {
            product_id,
            rating: rating.to_integer()?,
            text: self.text.unwrap_or_default(),
        })
    }
}
