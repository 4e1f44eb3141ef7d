//! Lexicon-based polarity scoring

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::error::{Error, Result};
use crate::records::{EmailRecord, EmailTable};
use crate::stats::{rank_counts, RankedCount};

pub const HIGHLY_POSITIVE: f64 = 0.5;
pub const HIGHLY_NEGATIVE: f64 = -0.5;
pub const EXTREMES_SHOWN: usize = 10;
pub const HISTOGRAM_BINS: usize = 20;
/// Senders listed per highly positive / negative group
pub const SENTIMENT_SENDERS_SHOWN: usize = 5;

const NEGATION_FACTOR: f64 = -0.5;
const NEGATIONS: [&str; 6] = ["not", "no", "never", "nothing", "neither", "nor"];

static SENTIMENT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z']+|[.!?;]").expect("static sentiment token pattern"));

pub trait SentimentScorer: Send + Sync {
    /// Polarity in [-1, 1]; 0 for text without opinion words
    fn polarity(&self, text: &str) -> f64;
}

/// Averages the polarity of known words. Intensifiers scale the next opinion
/// word, negations flip and halve it; both reset at sentence punctuation.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    polarities: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
}

impl LexiconScorer {
    /// Parse `word<TAB>value` lines; `~word` lines are intensifiers
    pub fn from_lexicon(content: &str) -> Result<Self> {
        let mut polarities = HashMap::new();
        let mut intensifiers = HashMap::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let invalid = || Error::ModelUnavailable {
                model: "sentiment lexicon",
                reason: format!("invalid entry at line {}: {:?}", line_num + 1, line),
            };

            let (word, value) = line.split_once('\t').ok_or_else(invalid)?;
            let value: f64 = value.trim().parse().map_err(|_| invalid())?;

            match word.strip_prefix('~') {
                Some(modifier) => {
                    intensifiers.insert(modifier.to_lowercase(), value);
                }
                None => {
                    if !(-1.0..=1.0).contains(&value) {
                        return Err(invalid());
                    }
                    polarities.insert(word.to_lowercase(), value);
                }
            }
        }

        if polarities.is_empty() {
            return Err(Error::ModelUnavailable {
                model: "sentiment lexicon",
                reason: "lexicon has no entries".into(),
            });
        }

        Ok(Self {
            polarities,
            intensifiers,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.polarities.len()
    }
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let lowered = text
            .to_lowercase()
            .replace(|c: char| c == '\u{2019}' || c == '\u{2018}', "'");
        let mut scores = Vec::new();
        let mut negated = false;
        let mut intensity = 1.0;

        for token in SENTIMENT_TOKEN.find_iter(&lowered) {
            let word = token.as_str();
            if matches!(word, "." | "!" | "?" | ";") {
                negated = false;
                intensity = 1.0;
                continue;
            }
            if NEGATIONS.contains(&word) || word.ends_with("n't") {
                negated = true;
                continue;
            }
            if let Some(multiplier) = self.intensifiers.get(word) {
                intensity *= multiplier;
                continue;
            }
            if let Some(&polarity) = self.polarities.get(word) {
                let mut score = polarity * intensity;
                if negated {
                    score *= NEGATION_FACTOR;
                }
                scores.push(score.clamp(-1.0, 1.0));
                negated = false;
                intensity = 1.0;
            }
        }

        if scores.is_empty() {
            return 0.0;
        }
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
    }
}

/// Fill in the polarity of every record that does not have one yet
pub fn score_table(table: &mut EmailTable, scorer: &dyn SentimentScorer) {
    let start_time = Instant::now();
    let mut scored = 0usize;
    for record in table.records.iter_mut().filter(|r| r.polarity.is_none()) {
        record.polarity = Some(scorer.polarity(&record.body));
        scored += 1;
    }
    info!(
        action = "complete",
        component = "sentiment",
        scored,
        duration_ms = start_time.elapsed().as_millis(),
        "Scored email polarity"
    );
}

fn polarity_of(record: &EmailRecord) -> f64 {
    record.polarity.unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarityEmail {
    pub date: String,
    pub sender: String,
    pub subject: String,
    pub polarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PolarityEmail {
    fn from_record(record: &EmailRecord, with_body: bool) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            sender: record.sender.clone(),
            subject: record.subject.clone(),
            polarity: polarity_of(record),
            body: with_body.then(|| record.body.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentOverview {
    pub mean_polarity: Option<f64>,
    pub histogram: Vec<HistogramBin>,
    pub most_negative: Vec<PolarityEmail>,
    pub most_positive: Vec<PolarityEmail>,
    pub highly_positive: usize,
    pub highly_negative: usize,
    pub top_positive_senders: Vec<RankedCount>,
    pub top_negative_senders: Vec<RankedCount>,
}

pub fn mean_polarity(table: &EmailTable) -> Option<f64> {
    if table.is_empty() {
        return None;
    }
    Some(table.iter().map(polarity_of).sum::<f64>() / table.len() as f64)
}

/// Equal-width bins over [-1, 1]; 1.0 falls into the last bin
pub fn polarity_histogram(table: &EmailTable, bins: usize) -> Vec<HistogramBin> {
    if table.is_empty() || bins == 0 {
        return Vec::new();
    }
    let width = 2.0 / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: -1.0 + i as f64 * width,
            upper: -1.0 + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for record in table.iter() {
        let index = (((polarity_of(record) + 1.0) / width).floor() as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

pub fn sentiment_overview(table: &EmailTable, sender_limit: usize) -> SentimentOverview {
    if table.is_empty() {
        return SentimentOverview::default();
    }

    let mut ascending: Vec<&EmailRecord> = table.iter().collect();
    ascending.sort_by(|a, b| polarity_of(a).total_cmp(&polarity_of(b)));
    let mut descending = ascending.clone();
    descending.sort_by(|a, b| polarity_of(b).total_cmp(&polarity_of(a)));

    let positives: Vec<&EmailRecord> = table
        .iter()
        .filter(|r| polarity_of(r) > HIGHLY_POSITIVE)
        .collect();
    let negatives: Vec<&EmailRecord> = table
        .iter()
        .filter(|r| polarity_of(r) < HIGHLY_NEGATIVE)
        .collect();

    SentimentOverview {
        mean_polarity: mean_polarity(table),
        histogram: polarity_histogram(table, HISTOGRAM_BINS),
        most_negative: ascending
            .iter()
            .take(EXTREMES_SHOWN)
            .map(|r| PolarityEmail::from_record(r, false))
            .collect(),
        most_positive: descending
            .iter()
            .take(EXTREMES_SHOWN)
            .map(|r| PolarityEmail::from_record(r, true))
            .collect(),
        highly_positive: positives.len(),
        highly_negative: negatives.len(),
        top_positive_senders: rank_counts(positives.iter().map(|r| r.sender.as_str()), sender_limit),
        top_negative_senders: rank_counts(negatives.iter().map(|r| r.sender.as_str()), sender_limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_date;

    const LEXICON: &str = "good\t0.7\ngreat\t0.8\nterrible\t-1.0\nbad\t-0.7\n~very\t1.3\n";

    fn scorer() -> LexiconScorer {
        LexiconScorer::from_lexicon(LEXICON).unwrap()
    }

    fn record(sender: &str, body: &str) -> EmailRecord {
        EmailRecord::new(
            "s".into(),
            sender.into(),
            parse_date("01/03/2024 09:15:00 AM").unwrap(),
            body.into(),
        )
    }

    #[test]
    fn test_plain_words() {
        let s = scorer();
        assert!((s.polarity("This is great") - 0.8).abs() < 1e-9);
        assert!((s.polarity("good and bad") - 0.0).abs() < 1e-9);
        assert_eq!(s.polarity("nothing opinionated here"), 0.0);
        assert_eq!(s.polarity(""), 0.0);
    }

    #[test]
    fn test_intensifier_and_clamp() {
        let s = scorer();
        assert!((s.polarity("very good") - 0.91).abs() < 1e-9);
        assert_eq!(s.polarity("very terrible"), -1.0);
    }

    #[test]
    fn test_negation() {
        let s = scorer();
        assert!((s.polarity("not good") - (-0.35)).abs() < 1e-9);
        assert!((s.polarity("This isn't bad") - 0.35).abs() < 1e-9);
        assert!((s.polarity("This isn\u{2019}t bad") - 0.35).abs() < 1e-9);
        // negation does not cross sentence ends
        assert!((s.polarity("Not now. Good work") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_polarity_bounds() {
        let s = scorer();
        for text in ["great great very very very good", "terrible bad", "not not terrible"] {
            let p = s.polarity(text);
            assert!((-1.0..=1.0).contains(&p), "{} -> {}", text, p);
        }
    }

    #[test]
    fn test_invalid_lexicon_is_model_error() {
        assert!(matches!(
            LexiconScorer::from_lexicon("good 0.7\n"),
            Err(Error::ModelUnavailable { .. })
        ));
        assert!(matches!(
            LexiconScorer::from_lexicon("good\t3.0\n"),
            Err(Error::ModelUnavailable { .. })
        ));
        assert!(LexiconScorer::from_lexicon("# only comments\n").is_err());
    }

    #[test]
    fn test_score_table_is_lazy() {
        let mut table = EmailTable::new(vec![record("a", "great"), record("b", "bad")]);
        table.records[1].polarity = Some(0.25);
        score_table(&mut table, &scorer());
        assert_eq!(table.records[0].polarity, Some(0.8));
        assert_eq!(table.records[1].polarity, Some(0.25));
    }

    #[test]
    fn test_overview() {
        let mut table = EmailTable::new(vec![
            record("a", "great"),
            record("b", "terrible"),
            record("a", "very good"),
            record("c", "meh"),
        ]);
        score_table(&mut table, &scorer());
        let overview = sentiment_overview(&table, 5);

        assert_eq!(overview.highly_positive, 2);
        assert_eq!(overview.highly_negative, 1);
        assert_eq!(overview.top_positive_senders[0], RankedCount { label: "a".into(), count: 2 });
        assert_eq!(overview.top_negative_senders[0].label, "b");
        assert_eq!(overview.most_negative[0].sender, "b");
        assert!(overview.most_negative[0].body.is_none());
        assert!((overview.most_positive[0].polarity - 0.91).abs() < 1e-9);
        assert!(overview.most_positive[0].body.is_some());
        let mean = overview.mean_polarity.unwrap();
        assert!((mean - (0.8 - 1.0 + 0.91) / 4.0).abs() < 1e-9);
        assert_eq!(overview.histogram.len(), HISTOGRAM_BINS);
        assert_eq!(overview.histogram.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(overview.histogram[0].count, 1);
    }

    #[test]
    fn test_empty_overview() {
        let overview = sentiment_overview(&EmailTable::default(), 5);
        assert!(overview.mean_polarity.is_none());
        assert!(overview.histogram.is_empty());
        assert!(overview.most_positive.is_empty());
        assert_eq!(overview.highly_negative, 0);
    }
}
