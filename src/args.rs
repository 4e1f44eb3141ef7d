use clap::Parser;
use std::path::PathBuf;

use crate::entities::DEFAULT_SAMPLE_SIZE;
use crate::report::DEFAULT_TITLE;

pub const DEFAULT_INPUT_FILE: &str = "exported_emails.csv";

#[derive(Parser, Debug)]
#[command(
    name = "inboxlens",
    about = "Analyze an exported email table: volume, timing, vocabulary, entities, sentiment and insights",
    version,
    long_about = None
)]
pub struct Args {
    /// CSV or TSV export with Subject, Sender, Date and Body columns
    pub file: Option<PathBuf>,

    /// Dashboard title
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Path to custom body-cleanup keyword file
    #[arg(short, long)]
    pub keywords: Option<PathBuf>,

    /// Keep signatures and sign-offs in bodies
    #[arg(long)]
    pub no_cleanup: bool,

    /// Initialize cleanup_keywords.txt with default keywords
    #[arg(long)]
    pub init: bool,

    /// Extra stopwords, comma separated
    #[arg(long)]
    pub stopwords: Option<String>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Only include these senders (repeatable)
    #[arg(short, long = "sender")]
    pub senders: Vec<String>,

    /// Print the distinct senders and exit
    #[arg(long)]
    pub list_senders: bool,

    /// Case-insensitive text to search for in subject or body
    #[arg(long)]
    pub keyword: Option<String>,

    /// Maximum number of emails sampled for entity extraction
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    pub ner_sample: usize,

    /// Seed for the entity extraction sample
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of senders, words, bigrams and entities to display
    #[arg(short, long, default_value_t = 20)]
    pub top: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn input_path(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["inboxlens"]);
        assert_eq!(args.input_path(), PathBuf::from(DEFAULT_INPUT_FILE));
        assert_eq!(args.title, "Email Analysis Dashboard");
        assert_eq!(args.ner_sample, 50);
        assert_eq!(args.top, 20);
        assert!(args.senders.is_empty());
        assert!(!args.json);
    }

    #[test]
    fn test_repeatable_sender() {
        let args = Args::parse_from([
            "inboxlens",
            "mail.csv",
            "--sender",
            "a@x.com",
            "-s",
            "b@x.com",
            "--start",
            "2024-03-01",
        ]);
        assert_eq!(args.input_path(), PathBuf::from("mail.csv"));
        assert_eq!(args.senders, vec!["a@x.com", "b@x.com"]);
        assert_eq!(args.start.as_deref(), Some("2024-03-01"));
    }
}
