use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{ScoredRecord, SentimentCategory};

/// Count per sentiment category. All five categories are always present and
/// no other key can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    counts: [u64; 5],
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: SentimentCategory) -> u64 {
        self.counts[category.ordinal()]
    }

    pub fn increment(&mut self, category: SentimentCategory) {
        self.counts[category.ordinal()] += 1;
    }

    pub fn add(&mut self, category: SentimentCategory, n: u64) {
        self.counts[category.ordinal()] += n;
    }

    /// Sum another summary's counters into this one.
    pub fn merge(&mut self, other: &BatchSummary) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            *mine += theirs;
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// (category, count) in fixed category order.
    pub fn iter(&self) -> impl Iterator<Item = (SentimentCategory, u64)> + '_ {
        SentimentCategory::ALL
            .into_iter()
            .map(move |c| (c, self.get(c)))
    }
}

/// Count categories across `records`. Order-independent and idempotent.
pub fn summarize<'a, I>(records: I) -> BatchSummary
where
    I: IntoIterator<Item = &'a ScoredRecord>,
{
    let mut summary = BatchSummary::new();
    for record in records {
        summary.increment(record.category());
    }
    summary
}

impl FromIterator<SentimentCategory> for BatchSummary {
    fn from_iter<T: IntoIterator<Item = SentimentCategory>>(iter: T) -> Self {
        let mut summary = BatchSummary::new();
        for category in iter {
            summary.increment(category);
        }
        summary
    }
}

impl Serialize for BatchSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SentimentCategory::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.as_str(), &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BatchSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
        let mut summary = BatchSummary::new();
        for (key, count) in raw {
            let category: SentimentCategory = key.parse().map_err(D::Error::custom)?;
            summary.add(category, count);
        }
        Ok(summary)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (category, count) in self.iter() {
            writeln!(f, "  {:<14} {}", category.as_str(), count)?;
        }
        write!(f, "  {:<14} {}", "total", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Sentiment;
    use crate::types::{BatchId, SourceKind};
    use serde_json::json;

    fn scored(polarity: f64) -> ScoredRecord {
        ScoredRecord::new(
            "text",
            SourceKind::Csv,
            Sentiment::new(polarity, 0.5),
            BatchId::new("batch_test"),
            100,
        )
    }

    #[test]
    fn empty_input_has_all_five_keys_at_zero() {
        let summary = summarize(std::iter::empty::<&ScoredRecord>());
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({
                "very_positive": 0,
                "positive": 0,
                "neutral": 0,
                "negative": 0,
                "very_negative": 0
            })
        );
    }

    #[test]
    fn scenario_counts() {
        let records: Vec<_> = [0.8, 0.0, 0.1, -0.9].into_iter().map(scored).collect();
        let summary = summarize(&records);
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({
                "very_positive": 1,
                "positive": 1,
                "neutral": 1,
                "negative": 0,
                "very_negative": 1
            })
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn order_independent() {
        let records: Vec<_> = [0.9, -0.2, 0.0, 0.3, -0.7, 0.3, 0.0]
            .into_iter()
            .map(scored)
            .collect();
        let forward = summarize(&records);
        let reversed = summarize(records.iter().rev());

        let mut rotated = records.clone();
        rotated.rotate_left(3);
        let mut sorted = records.clone();
        sorted.sort_by(|a, b| a.polarity().total_cmp(&b.polarity()));

        assert_eq!(forward, reversed);
        assert_eq!(forward, summarize(&rotated));
        assert_eq!(forward, summarize(&sorted));
        assert_eq!(forward, summarize(&records));
    }

    #[test]
    fn merge_sums_counters() {
        let a: BatchSummary = [SentimentCategory::Positive, SentimentCategory::Neutral]
            .into_iter()
            .collect();
        let b: BatchSummary = [SentimentCategory::Positive, SentimentCategory::VeryNegative]
            .into_iter()
            .collect();
        let mut merged = a;
        merged.merge(&b);
        assert_eq!(merged.get(SentimentCategory::Positive), 2);
        assert_eq!(merged.get(SentimentCategory::Neutral), 1);
        assert_eq!(merged.get(SentimentCategory::VeryNegative), 1);
        assert_eq!(merged.total(), a.total() + b.total());
    }

    #[test]
    fn deserialize_fills_missing_and_rejects_unknown_keys() {
        let partial: BatchSummary = serde_json::from_value(json!({"positive": 3})).unwrap();
        assert_eq!(partial.get(SentimentCategory::Positive), 3);
        assert_eq!(partial.total(), 3);

        let unknown = serde_json::from_value::<BatchSummary>(json!({"mixed": 1}));
        assert!(unknown.is_err());
    }
}
