// Five-bucket polarity thresholds, first match wins.
//
// Older importers used a three-bucket scheme (> 0.05 / < -0.05). Only the
// five-bucket table is supported; stored category labels depend on it.

use crate::types::SentimentCategory;

pub const VERY_POSITIVE_ABOVE: f64 = 0.5;
pub const VERY_NEGATIVE_AT_OR_BELOW: f64 = -0.5;

pub fn categorize(polarity: f64) -> SentimentCategory {
    if polarity > VERY_POSITIVE_ABOVE {
        SentimentCategory::VeryPositive
    } else if polarity > 0.0 {
        SentimentCategory::Positive
    } else if polarity == 0.0 {
        SentimentCategory::Neutral
    } else if polarity > VERY_NEGATIVE_AT_OR_BELOW {
        SentimentCategory::Negative
    } else {
        SentimentCategory::VeryNegative
    }
}
