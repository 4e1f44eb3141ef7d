//! Rule-based named-entity extraction over a bounded sample of bodies

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::info;

use crate::error::{Error, Result};
use crate::records::EmailTable;

pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// Entity labels, following the OntoNotes names NER models emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Gpe,
    Date,
    Time,
    Money,
    Percent,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Gpe => "GPE",
            EntityType::Date => "DATE",
            EntityType::Time => "TIME",
            EntityType::Money => "MONEY",
            EntityType::Percent => "PERCENT",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: EntityType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub text: String,
    pub label: EntityType,
    pub count: usize,
}

pub trait EntityRecognizer: Send + Sync {
    /// Entities in order of appearance
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

const PLACES: &[&str] = &[
    "London", "Paris", "Berlin", "Madrid", "Rome", "Dublin", "Amsterdam", "Brussels", "Sydney",
    "Melbourne", "Tokyo", "Singapore", "Mumbai", "Delhi", "Toronto", "Chicago", "Boston",
    "Seattle", "Dallas", "Houston", "Atlanta", "Denver", "Austin", "Manchester", "Edinburgh",
    "New York", "San Francisco", "Los Angeles", "Hong Kong", "England", "Scotland", "Wales",
    "Ireland", "France", "Germany", "Spain", "Italy", "Canada", "Australia", "India", "China",
    "Japan", "Brazil", "Mexico", "America", "USA", "UK", "US", "EU", "Europe", "Asia", "Africa",
];

const ORG_SUFFIXES: &str = r"Inc|Corp|Corporation|Ltd|LLC|Limited|Group|Company|Co|Bank|University|Institute|Agency|Department|Foundation|Partners|Holdings|Solutions|Technologies|Systems|Services";

/// Pattern and gazetteer recognizer. Rules run in priority order and a
/// character span is claimed by the first rule that matches it.
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    rules: Vec<(EntityType, Regex)>,
}

impl PatternRecognizer {
    pub fn new() -> Result<Self> {
        let month = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";
        let weekday = r"(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)";
        let name = r"[A-Z][a-z]+(?:[-'][A-Z][a-z]+)?";
        let places = PLACES
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");

        let specs: Vec<(EntityType, String)> = vec![
            (
                EntityType::Money,
                r"(?:[$€£]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:k|m|bn|million|billion)\b)?|\b\d[\d,]*(?:\.\d+)?\s?(?:USD|EUR|GBP|dollars|euros|pounds)\b)".to_string(),
            ),
            (EntityType::Percent, r"\b\d+(?:\.\d+)?\s?(?:%|percent\b)".to_string()),
            (
                EntityType::Time,
                r"(?i)\b\d{1,2}(?::\d{2})?\s?(?:am|pm)\b|\b\d{1,2}:\d{2}\b".to_string(),
            ),
            (
                EntityType::Date,
                format!(
                    r"\b(?:\d{{1,2}}(?:st|nd|rd|th)?\s{month}(?:\s\d{{4}})?|{month}\s\d{{1,2}}(?:st|nd|rd|th)?(?:,?\s\d{{4}})?|\d{{1,2}}/\d{{1,2}}/\d{{2,4}}|\d{{4}}-\d{{2}}-\d{{2}}|(?:next|last|this)\s(?:week|month|year|{weekday})|{weekday}|(?i:today|tomorrow|yesterday))\b"
                ),
            ),
            (
                EntityType::Org,
                format!(r"\b(?:[A-Z][A-Za-z&]+\s){{0,3}}[A-Z][A-Za-z&]+\s(?:{ORG_SUFFIXES})\b\.?|\b[A-Z]{{2,}}\s(?:{ORG_SUFFIXES})\b"),
            ),
            (
                EntityType::Person,
                format!(r"\b(?:Mr|Mrs|Ms|Miss|Dr|Prof)\.?\s{name}(?:\s{name})?"),
            ),
            (EntityType::Gpe, format!(r"\b(?:{places})\b")),
        ];

        let rules = specs
            .into_iter()
            .map(|(label, pattern)| {
                Regex::new(&pattern)
                    .map(|regex| (label, regex))
                    .map_err(|e| Error::ModelUnavailable {
                        model: "entity recognizer",
                        reason: format!("{} rule failed to compile: {}", label, e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }
}

impl EntityRecognizer for PatternRecognizer {
    fn recognize(&self, text: &str) -> Vec<Entity> {
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut found: Vec<(usize, Entity)> = Vec::new();

        for (label, regex) in &self.rules {
            for m in regex.find_iter(text) {
                let overlaps = claimed
                    .iter()
                    .any(|&(start, end)| m.start() < end && start < m.end());
                if overlaps {
                    continue;
                }
                let surface = m.as_str().trim().trim_end_matches(&['.', ','][..]).to_string();
                if surface.is_empty() {
                    continue;
                }
                claimed.push((m.start(), m.end()));
                found.push((
                    m.start(),
                    Entity {
                        text: surface,
                        label: *label,
                    },
                ));
            }
        }

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, entity)| entity).collect()
    }
}

/// Pick at most `cap` distinct row indices, returned in table order
pub fn sample_indices<R: Rng + ?Sized>(len: usize, cap: usize, rng: &mut R) -> Vec<usize> {
    if len <= cap {
        return (0..len).collect();
    }
    let mut picked = rand::seq::index::sample(rng, len, cap).into_vec();
    picked.sort_unstable();
    picked
}

/// Run the recognizer over a random sample of at most `cap` bodies, store
/// each sampled record's entities, and rank (text, label) pairs by frequency.
pub fn extract_sampled<R: Rng + ?Sized>(
    table: &mut EmailTable,
    recognizer: &dyn EntityRecognizer,
    cap: usize,
    limit: usize,
    rng: &mut R,
) -> Vec<EntityCount> {
    if table.is_empty() || cap == 0 {
        return Vec::new();
    }

    let start_time = Instant::now();
    let indices = sample_indices(table.len(), cap, rng);
    let mut all = Vec::new();

    for &index in &indices {
        let record = &mut table.records[index];
        if record.entities.is_none() {
            record.entities = Some(recognizer.recognize(&record.body));
        }
        all.extend(record.entities.iter().flatten().cloned());
    }

    let ranked = rank_entities(&all, limit);
    info!(
        action = "complete",
        component = "entities",
        sampled = indices.len(),
        entity_count = all.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Extracted named entities"
    );
    ranked
}

/// Rank (text, label) pairs by frequency; ties keep first-seen order
pub fn rank_entities(entities: &[Entity], limit: usize) -> Vec<EntityCount> {
    let mut counts: Vec<EntityCount> = Vec::new();
    for entity in entities {
        match counts
            .iter_mut()
            .find(|c| c.label == entity.label && c.text == entity.text)
        {
            Some(existing) => existing.count += 1,
            None => counts.push(EntityCount {
                text: entity.text.clone(),
                label: entity.label,
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_date;
    use crate::records::EmailRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn recognizer() -> PatternRecognizer {
        PatternRecognizer::new().unwrap()
    }

    fn labels(text: &str) -> Vec<(String, EntityType)> {
        recognizer()
            .recognize(text)
            .into_iter()
            .map(|e| (e.text, e.label))
            .collect()
    }

    fn table(bodies: &[&str]) -> EmailTable {
        EmailTable::new(
            bodies
                .iter()
                .map(|b| {
                    EmailRecord::new(
                        "s".into(),
                        "a@x.com".into(),
                        parse_date("01/03/2024 09:15:00 AM").unwrap(),
                        b.to_string(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_recognizes_core_types() {
        let found = labels(
            "Dr. Jane Smith from Acme Corp will visit London on 12 March 2024 at 3pm to discuss the $4,500 invoice (a 15% discount).",
        );
        assert_eq!(
            found,
            vec![
                ("Dr. Jane Smith".to_string(), EntityType::Person),
                ("Acme Corp".to_string(), EntityType::Org),
                ("London".to_string(), EntityType::Gpe),
                ("12 March 2024".to_string(), EntityType::Date),
                ("3pm".to_string(), EntityType::Time),
                ("$4,500".to_string(), EntityType::Money),
                ("15%".to_string(), EntityType::Percent),
            ]
        );
    }

    #[test]
    fn test_relative_dates_and_weekdays() {
        let found = labels("Can we meet next week or Friday? Tomorrow works too.");
        let texts: Vec<&str> = found.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["next week", "Friday", "Tomorrow"]);
        assert!(found.iter().all(|(_, l)| *l == EntityType::Date));
    }

    #[test]
    fn test_no_entities_in_plain_text() {
        assert!(labels("please review the attached file").is_empty());
    }

    #[test]
    fn test_sample_indices_bounded_and_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample_indices(200, 50, &mut rng);
        assert_eq!(picked.len(), 50);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|&i| i < 200));

        assert_eq!(sample_indices(3, 50, &mut rng), vec![0, 1, 2]);
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let a = sample_indices(500, 10, &mut StdRng::seed_from_u64(42));
        let b = sample_indices(500, 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_sampled_ranks_and_annotates() {
        let mut t = table(&[
            "Meeting in London with Acme Corp",
            "London again",
            "Nothing here",
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let ranked = extract_sampled(&mut t, &recognizer(), 50, 20, &mut rng);

        assert_eq!(
            ranked[0],
            EntityCount {
                text: "London".into(),
                label: EntityType::Gpe,
                count: 2
            }
        );
        assert_eq!(ranked[1].text, "Acme Corp");
        assert_eq!(ranked.len(), 2);
        assert!(t.iter().all(|r| r.entities.is_some()));
        assert_eq!(t.records[2].entities.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_extract_sampled_respects_cap() {
        let bodies: Vec<String> = (0..20).map(|i| format!("Paris {}", i)).collect();
        let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
        let mut t = table(&refs);
        let ranked = extract_sampled(&mut t, &recognizer(), 5, 20, &mut StdRng::seed_from_u64(3));
        assert_eq!(ranked[0].count, 5);
        assert_eq!(t.iter().filter(|r| r.entities.is_some()).count(), 5);
    }

    #[test]
    fn test_extract_empty_table() {
        let mut t = EmailTable::default();
        let ranked = extract_sampled(&mut t, &recognizer(), 50, 20, &mut StdRng::seed_from_u64(0));
        assert!(ranked.is_empty());
    }
}
