use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Polarity in [-1, 1], subjectivity in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

impl Sentiment {
    pub const NEUTRAL: Sentiment = Sentiment {
        polarity: 0.0,
        subjectivity: 0.0,
    };

    pub fn new(polarity: f64, subjectivity: f64) -> Self {
        Self {
            polarity,
            subjectivity,
        }
    }

    pub fn is_in_range(&self) -> bool {
        (-1.0..=1.0).contains(&self.polarity) && (0.0..=1.0).contains(&self.subjectivity)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("scorer rejected input: {0}")]
    Rejected(String),

    #[error("scorer returned out-of-range values (polarity {polarity}, subjectivity {subjectivity})")]
    OutOfRange { polarity: f64, subjectivity: f64 },
}

/// Computes polarity and subjectivity for one text. Must be deterministic and
/// free of side effects.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<Sentiment, ScoreError>;
}

/// Score `text`, converting any scorer failure (including NaN or out-of-range
/// output) into the neutral pair. The error is handed back for reporting.
pub fn score_or_neutral(
    scorer: &dyn SentimentScorer,
    text: &str,
) -> (Sentiment, Option<ScoreError>) {
    match scorer.score(text) {
        Ok(s) if s.is_in_range() => (s, None),
        Ok(s) => (
            Sentiment::NEUTRAL,
            Some(ScoreError::OutOfRange {
                polarity: s.polarity,
                subjectivity: s.subjectivity,
            }),
        ),
        Err(e) => (Sentiment::NEUTRAL, Some(e)),
    }
}

// ---------------------------------------------------------------------------
// LexiconScorer
// ---------------------------------------------------------------------------

// (word, polarity, subjectivity)
const LEXICON: &[(&str, f64, f64)] = &[
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("bad", -0.7, 0.67),
    ("beautiful", 0.85, 1.0),
    ("best", 1.0, 0.3),
    ("boring", -1.0, 1.0),
    ("broken", -0.4, 0.4),
    ("cheap", 0.4, 0.7),
    ("disappointing", -0.6, 0.7),
    ("excellent", 1.0, 1.0),
    ("fantastic", 0.4, 0.9),
    ("fine", 0.42, 0.5),
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.8, 1.0),
    ("hate", -0.8, 0.9),
    ("horrible", -1.0, 1.0),
    ("love", 0.5, 0.6),
    ("nice", 0.6, 1.0),
    ("ok", 0.5, 0.5),
    ("okay", 0.5, 0.5),
    ("perfect", 1.0, 1.0),
    ("poor", -0.4, 0.6),
    ("recommend", 0.3, 0.4),
    ("rude", -0.3, 0.6),
    ("slow", -0.3, 0.4),
    ("terrible", -1.0, 1.0),
    ("unhappy", -0.6, 0.9),
    ("useless", -0.5, 0.2),
    ("wonderful", 1.0, 1.0),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("really", 1.3),
    ("so", 1.2),
    ("very", 1.3),
];

const NEGATORS: &[&str] = &["not", "no", "never", "hardly", "nothing"];

const NEGATION_FACTOR: f64 = -0.5;

/// Word-list scorer shipped as the default. Averages the polarity and
/// subjectivity of known opinion words; intensifiers scale the next opinion
/// word and negators flip and dampen it. Text without opinion words is neutral.
pub struct LexiconScorer {
    words: HashMap<&'static str, (f64, f64)>,
    intensifiers: HashMap<&'static str, f64>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            words: LEXICON.iter().map(|&(w, p, s)| (w, (p, s))).collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z']+").unwrap());

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<Sentiment, ScoreError> {
        let mut polarities = Vec::new();
        let mut subjectivities = Vec::new();
        let mut multiplier = 1.0;
        let mut negated = false;

        for token in TOKEN_RE.find_iter(text) {
            let word = token.as_str().to_ascii_lowercase();

            if NEGATORS.contains(&word.as_str()) || word.ends_with("n't") {
                negated = true;
                continue;
            }
            if let Some(factor) = self.intensifiers.get(word.as_str()) {
                multiplier *= factor;
                continue;
            }
            if let Some(&(polarity, subjectivity)) = self.words.get(word.as_str()) {
                let mut p = polarity * multiplier;
                if negated {
                    p *= NEGATION_FACTOR;
                }
                polarities.push(p.clamp(-1.0, 1.0));
                subjectivities.push((subjectivity * multiplier).clamp(0.0, 1.0));
                multiplier = 1.0;
                negated = false;
            }
        }

        if polarities.is_empty() {
            return Ok(Sentiment::NEUTRAL);
        }

        let n = polarities.len() as f64;
        Ok(Sentiment::new(
            (polarities.iter().sum::<f64>() / n).clamp(-1.0, 1.0),
            (subjectivities.iter().sum::<f64>() / n).clamp(0.0, 1.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Sentiment, ScoreError>);

    impl SentimentScorer for Fixed {
        fn score(&self, _text: &str) -> Result<Sentiment, ScoreError> {
            self.0.clone()
        }
    }

    #[test]
    fn failure_becomes_neutral() {
        let scorer = Fixed(Err(ScoreError::Rejected("boom".into())));
        let (sentiment, err) = score_or_neutral(&scorer, "anything");
        assert_eq!(sentiment, Sentiment::NEUTRAL);
        assert_eq!(err, Some(ScoreError::Rejected("boom".into())));
    }

    #[test]
    fn out_of_range_and_nan_become_neutral() {
        for bad in [
            Sentiment::new(1.5, 0.2),
            Sentiment::new(0.2, -0.1),
            Sentiment::new(f64::NAN, 0.5),
        ] {
            let (sentiment, err) = score_or_neutral(&Fixed(Ok(bad)), "x");
            assert_eq!(sentiment, Sentiment::NEUTRAL);
            assert!(matches!(err, Some(ScoreError::OutOfRange { .. })));
        }
    }

    #[test]
    fn in_range_passes_through() {
        let (sentiment, err) = score_or_neutral(&Fixed(Ok(Sentiment::new(-1.0, 1.0))), "x");
        assert_eq!(sentiment, Sentiment::new(-1.0, 1.0));
        assert!(err.is_none());
    }

    #[test]
    fn lexicon_direction() {
        let scorer = LexiconScorer::new();
        assert!(scorer.score("I love this, it is great!").unwrap().polarity > 0.0);
        assert!(scorer.score("Terrible, worst ever.").unwrap().polarity < -0.5);
        assert_eq!(scorer.score("").unwrap(), Sentiment::NEUTRAL);
        assert_eq!(scorer.score("The parcel arrived on Tuesday.").unwrap(), Sentiment::NEUTRAL);
    }

    #[test]
    fn lexicon_negation_flips() {
        let scorer = LexiconScorer::new();
        let plain = scorer.score("good").unwrap().polarity;
        let negated = scorer.score("not good").unwrap().polarity;
        let contracted = scorer.score("isn't good").unwrap().polarity;
        assert!(plain > 0.0);
        assert!(negated < 0.0);
        assert_eq!(negated, contracted);
    }

    #[test]
    fn lexicon_intensifier_scales_but_stays_in_range() {
        let scorer = LexiconScorer::new();
        let plain = scorer.score("good").unwrap();
        let boosted = scorer.score("very good").unwrap();
        assert!(boosted.polarity > plain.polarity);
        let capped = scorer.score("extremely incredibly excellent").unwrap();
        assert!(capped.is_in_range());
        assert_eq!(capped.polarity, 1.0);
    }

    #[test]
    fn lexicon_is_deterministic() {
        let scorer = LexiconScorer::new();
        let text = "Really nice staff but slow service.";
        assert_eq!(scorer.score(text).unwrap(), scorer.score(text).unwrap());
    }
}
