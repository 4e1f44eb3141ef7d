//! Process-wide NLP resources, loaded once at startup

use once_cell::sync::OnceCell;
use std::time::Instant;
use tracing::info;

use crate::entities::PatternRecognizer;
use crate::error::Result;
use crate::sentiment::LexiconScorer;

const SENTIMENT_LEXICON: &str = include_str!("../sentiment_lexicon.txt");

static MODELS: OnceCell<Models> = OnceCell::new();

#[derive(Debug)]
pub struct Models {
    pub sentiment: LexiconScorer,
    pub entities: PatternRecognizer,
}

impl Models {
    pub fn load() -> Result<Self> {
        let start_time = Instant::now();
        let sentiment = LexiconScorer::from_lexicon(SENTIMENT_LEXICON)?;
        let entities = PatternRecognizer::new()?;
        info!(
            action = "complete",
            component = "models",
            lexicon_words = sentiment.vocabulary_size(),
            duration_ms = start_time.elapsed().as_millis(),
            "NLP resources loaded"
        );
        Ok(Self {
            sentiment,
            entities,
        })
    }
}

/// Load the shared resources on first call; later calls return the same
/// instance. A load failure is returned to the caller, which should abort.
pub fn init() -> Result<&'static Models> {
    MODELS.get_or_try_init(Models::load)
}

pub fn get() -> Option<&'static Models> {
    MODELS.get()
}
