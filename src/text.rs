//! Tokenization, stopwords, bigrams and word-cloud input

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use crate::records::EmailTable;
use crate::stats::{rank_counts, RankedCount};

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "com", "could", "couldn't", "did", "didn't",
    "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "else", "ever", "few",
    "for", "from", "further", "get", "had", "hadn't", "has", "hasn't", "have", "haven't",
    "having", "he", "he'd", "he'll", "he's", "hence", "her", "here", "here's", "hers",
    "herself", "him", "himself", "his", "how", "how's", "however", "http", "i", "i'd", "i'll",
    "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just",
    "k", "let's", "like", "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not",
    "of", "off", "on", "once", "only", "or", "other", "otherwise", "ought", "our", "ours",
    "ourselves", "out", "over", "own", "r", "same", "shall", "shan't", "she", "she'd",
    "she'll", "she's", "should", "shouldn't", "since", "so", "some", "such", "than", "that",
    "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "there's",
    "therefore", "these", "they", "they'd", "they'll", "they're", "they've", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd",
    "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's", "where",
    "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with", "won't",
    "would", "wouldn't", "www", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

const MIN_TOKEN_LEN: usize = 3;
pub const WORD_CLOUD_WORDS: usize = 100;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("static token pattern"));
static CLOUD_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w[\w']+").expect("static word pattern"));

/// Built-in stopwords plus user terms, all lowercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self {
            words: DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl StopwordSet {
    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    pub fn with_custom<I, S>(mut self, custom: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in custom {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                self.words.insert(word);
            }
        }
        self
    }

    /// Parse the comma-separated form accepted on the command line
    pub fn with_custom_csv(self, input: &str) -> Self {
        self.with_custom(input.split(','))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Lowercase, strip everything but ASCII letters, digits and whitespace,
/// split on whitespace, keep tokens longer than two characters that are
/// not stopwords.
pub fn tokenize(text: &str, stopwords: &StopwordSet) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = NON_ALPHANUMERIC.replace_all(&lowered, "");
    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_TOKEN_LEN && !stopwords.contains(word))
        .map(str::to_string)
        .collect()
}

/// Adjacent token pairs after tokenization, joined by a space
pub fn bigrams(text: &str, stopwords: &StopwordSet) -> Vec<String> {
    tokenize(text, stopwords)
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

pub fn common_subject_words(
    table: &EmailTable,
    stopwords: &StopwordSet,
    limit: usize,
) -> Vec<RankedCount> {
    rank_counts(
        table.iter().flat_map(|r| tokenize(&r.subject, stopwords)),
        limit,
    )
}

pub fn subject_bigrams(
    table: &EmailTable,
    stopwords: &StopwordSet,
    limit: usize,
) -> Vec<RankedCount> {
    rank_counts(
        table.iter().flat_map(|r| bigrams(&r.subject, stopwords)),
        limit,
    )
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WordCloudInput {
    /// All cleaned bodies joined, with stopwords removed
    pub text: String,
    /// Lowercased word frequencies a renderer sizes words by
    pub frequencies: Vec<RankedCount>,
}

pub fn word_cloud_input(table: &EmailTable, stopwords: &StopwordSet) -> WordCloudInput {
    let joined = table
        .iter()
        .map(|r| r.body.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let kept: Vec<&str> = CLOUD_WORD
        .find_iter(&joined)
        .map(|m| m.as_str().trim_end_matches('\''))
        .filter(|word| !word.is_empty() && !stopwords.contains(&word.to_lowercase()))
        .collect();

    WordCloudInput {
        text: kept.join(" "),
        frequencies: rank_counts(kept.iter().map(|w| w.to_lowercase()), WORD_CLOUD_WORDS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_date;
    use crate::records::EmailRecord;

    fn table(subjects: &[&str], bodies: &[&str]) -> EmailTable {
        EmailTable::new(
            subjects
                .iter()
                .zip(bodies.iter())
                .map(|(s, b)| {
                    EmailRecord::new(
                        s.to_string(),
                        "a@x.com".into(),
                        parse_date("01/03/2024 09:15:00 AM").unwrap(),
                        b.to_string(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("Re: Q3 Invoice #1234 for the ACME project!", &StopwordSet::default());
        assert_eq!(tokens, vec!["invoice", "1234", "acme", "project"]);
    }

    #[test]
    fn test_tokenize_strips_punctuation_inside_words() {
        let tokens = tokenize("don't e-mail", &StopwordSet::empty());
        assert_eq!(tokens, vec!["dont", "email"]);
    }

    #[test]
    fn test_tokenize_excludes_all_stopwords() {
        let stopwords = StopwordSet::default().with_custom_csv(" Invoice , project,");
        let text = "The invoice for the Project is about THE budget and the invoice";
        let tokens = tokenize(text, &stopwords);
        assert!(tokens.iter().all(|t| !stopwords.contains(t)));
        assert_eq!(tokens, vec!["budget"]);
    }

    #[test]
    fn test_custom_stopwords_lowercased() {
        let stopwords = StopwordSet::empty().with_custom(["ACME", "  "]);
        assert_eq!(stopwords.len(), 1);
        assert!(stopwords.contains("acme"));
    }

    #[test]
    fn test_bigrams_use_filtered_tokens() {
        let grams = bigrams("Budget review for the quarterly report", &StopwordSet::default());
        assert_eq!(
            grams,
            vec!["budget review", "review quarterly", "quarterly report"]
        );
        assert!(bigrams("single", &StopwordSet::default()).is_empty());
    }

    #[test]
    fn test_common_words_and_bigrams_ranked() {
        let t = table(
            &["Budget review", "Team lunch", "Budget review again", "lunch"],
            &["", "", "", ""],
        );
        let words = common_subject_words(&t, &StopwordSet::default(), 2);
        assert_eq!(words[0], RankedCount { label: "budget".into(), count: 2 });
        assert_eq!(words[1], RankedCount { label: "review".into(), count: 2 });

        let grams = subject_bigrams(&t, &StopwordSet::default(), 20);
        assert_eq!(grams[0], RankedCount { label: "budget review".into(), count: 2 });
        assert_eq!(grams[1], RankedCount { label: "team lunch".into(), count: 1 });
        assert_eq!(grams.len(), 2);
    }

    #[test]
    fn test_word_cloud_excludes_stopwords() {
        let t = table(&["a", "b"], &["The servers are offline", "Servers restarted"]);
        let cloud = word_cloud_input(&t, &StopwordSet::default());
        assert_eq!(cloud.text, "servers offline Servers restarted");
        assert_eq!(cloud.frequencies[0], RankedCount { label: "servers".into(), count: 2 });
    }

    #[test]
    fn test_empty_inputs() {
        let t = EmailTable::default();
        assert!(common_subject_words(&t, &StopwordSet::default(), 20).is_empty());
        assert!(subject_bigrams(&t, &StopwordSet::default(), 20).is_empty());
        let cloud = word_cloud_input(&t, &StopwordSet::default());
        assert!(cloud.text.is_empty());
        assert!(cloud.frequencies.is_empty());
    }
}
