//! In-process lexicon analyzer: word-weight sentiment scoring plus a small
//! emotion lexicon.

use async_trait::async_trait;

use crate::{AnalysisOutcome, Analyzer, AnalyzerError};
use sentistream_core::SentimentLabel;

pub(crate) const MODEL_NAME: &str = "lexicon-v1";

/// Word weights for sentiment scoring.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
const SENTIMENT_LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("love", 0.5),
    ("loved", 0.5),
    ("amazing", 0.5),
    ("excellent", 0.5),
    ("great", 0.4),
    ("good", 0.3),
    ("best", 0.5),
    ("fantastic", 0.5),
    ("wonderful", 0.5),
    ("recommend", 0.4),
    ("happy", 0.4),
    ("impressed", 0.4),
    ("exceeded", 0.4),
    ("perfect", 0.5),
    ("quality", 0.3),
    ("enjoy", 0.4),
    ("awesome", 0.5),
    // Negative signals
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("bad", -0.4),
    ("disappointed", -0.5),
    ("disappointing", -0.5),
    ("broken", -0.5),
    ("hate", -0.6),
    ("hated", -0.6),
    ("useless", -0.5),
    ("refund", -0.4),
    ("scam", -0.7),
    ("failure", -0.4),
    ("failed", -0.4),
    ("problem", -0.3),
    ("horrible", -0.6),
    ("waste", -0.5),
    ("angry", -0.5),
];

/// Word → emotion mapping. The most frequent matched emotion wins.
const EMOTION_LEXICON: &[(&str, &str)] = &[
    ("love", "joy"),
    ("loved", "joy"),
    ("happy", "joy"),
    ("amazing", "joy"),
    ("awesome", "joy"),
    ("enjoy", "joy"),
    ("angry", "anger"),
    ("hate", "anger"),
    ("hated", "anger"),
    ("scam", "anger"),
    ("furious", "anger"),
    ("disappointed", "sadness"),
    ("disappointing", "sadness"),
    ("sad", "sadness"),
    ("waste", "sadness"),
    ("worried", "fear"),
    ("afraid", "fear"),
    ("dangerous", "fear"),
    ("shocked", "surprise"),
    ("unexpected", "surprise"),
    ("disgusting", "disgust"),
    ("gross", "disgust"),
];

/// Score above which text is positive, below the negation of which it is
/// negative; anything in between is neutral.
const LABEL_CUTOFF: f32 = 0.05;

/// Score a text string using the sentiment lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps the
/// result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        for &(lex_word, weight) in SENTIMENT_LEXICON {
            if w == lex_word {
                score += weight;
                break;
            }
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Pick the dominant emotion in a text, if any emotion word matches.
#[must_use]
pub fn dominant_emotion(text: &str) -> Option<String> {
    let mut counts: Vec<(&str, u32)> = Vec::new();
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        for &(lex_word, emotion) in EMOTION_LEXICON {
            if w == lex_word {
                match counts.iter_mut().find(|(e, _)| *e == emotion) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((emotion, 1)),
                }
                break;
            }
        }
    }
    counts
        .into_iter()
        .max_by_key(|&(_, n)| n)
        .map(|(emotion, _)| emotion.to_string())
}

fn label_for(score: f32) -> SentimentLabel {
    if score > LABEL_CUTOFF {
        SentimentLabel::Positive
    } else if score < -LABEL_CUTOFF {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// The local-model analyzer variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconAnalyzer;

impl LexiconAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Analyzer for LexiconAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Option<AnalysisOutcome>, AnalyzerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let score = lexicon_score(text);
        // Confidence grows with signal strength; a zero score is a coin flip.
        let confidence = f64::from(0.5 + (score.abs() / 2.0)).clamp(0.0, 1.0);

        Ok(Some(AnalysisOutcome {
            sentiment_label: label_for(score),
            confidence_score: confidence,
            emotion: dominant_emotion(text),
            model_name: MODEL_NAME.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_scores_zero() {
        assert_eq!(lexicon_score(""), 0.0);
    }

    #[test]
    fn unknown_text_scores_zero() {
        assert_eq!(lexicon_score("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_keyword_scores_positive() {
        let score = lexicon_score("this product is great");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn negative_keyword_scores_negative() {
        let score = lexicon_score("terrible experience, would not recommend");
        // terrible (-0.6) + recommend (0.4) = -0.2
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn score_clamps_at_extremes() {
        let positive = "love amazing excellent great best fantastic wonderful perfect";
        assert_eq!(lexicon_score(positive), 1.0);
        let negative = "terrible awful worst hate scam horrible useless broken";
        assert_eq!(lexicon_score(negative), -1.0);
    }

    #[test]
    fn punctuation_stripped_from_words() {
        assert!(lexicon_score("great!") > 0.0);
    }

    #[test]
    fn dominant_emotion_picks_most_frequent() {
        let emotion = dominant_emotion("I hate this, so angry, but a bit disappointed");
        assert_eq!(emotion.as_deref(), Some("anger"));
    }

    #[test]
    fn dominant_emotion_absent_for_plain_text() {
        assert!(dominant_emotion("received it today").is_none());
    }

    #[tokio::test]
    async fn empty_content_is_terminal_skip() {
        let analyzer = LexiconAnalyzer::new();
        assert!(analyzer.analyze("").await.unwrap().is_none());
        assert!(analyzer.analyze("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn positive_content_maps_to_positive_label() {
        let analyzer = LexiconAnalyzer::new();
        let outcome = analyzer
            .analyze("I absolutely love this, it is amazing and exceeded my expectations")
            .await
            .unwrap()
            .expect("non-empty content must produce an outcome");

        assert_eq!(outcome.sentiment_label, SentimentLabel::Positive);
        assert!(outcome.confidence_score > 0.5);
        assert_eq!(outcome.emotion.as_deref(), Some("joy"));
        assert_eq!(outcome.model_name, MODEL_NAME);
    }

    #[tokio::test]
    async fn bland_content_maps_to_neutral_label() {
        let analyzer = LexiconAnalyzer::new();
        let outcome = analyzer
            .analyze("Just tried it. It is what it is. Received it today.")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.sentiment_label, SentimentLabel::Neutral);
        assert!(outcome.emotion.is_none());
    }

    #[tokio::test]
    async fn confidence_stays_in_range() {
        let analyzer = LexiconAnalyzer::new();
        let outcome = analyzer
            .analyze("love love amazing excellent best perfect wonderful fantastic")
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.confidence_score <= 1.0);
        assert!(outcome.confidence_score >= 0.0);
    }
}
