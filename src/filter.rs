use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::info;

use crate::records::{EmailRecord, EmailTable};

/// Date/sender/keyword narrowing applied before any aggregate is computed.
///
/// Date bounds are inclusive and compared at day granularity; a missing
/// bound is open. An empty sender set and an empty keyword do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub senders: BTreeSet<String>,
    pub keyword: Option<String>,
}

impl FilterSpec {
    /// Filter covering the whole table; the default before any narrowing
    pub fn full_range(table: &EmailTable) -> Self {
        let (start_date, end_date) = match table.date_bounds() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        Self {
            start_date,
            end_date,
            ..Self::default()
        }
    }

    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders = senders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn matches(&self, record: &EmailRecord) -> bool {
        let day = record.date_only();
        if self.start_date.is_some_and(|start| day < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| day > end) {
            return false;
        }
        if !self.senders.is_empty() && !self.senders.contains(&record.sender) {
            return false;
        }
        match self.keyword.as_deref().map(str::to_lowercase) {
            Some(keyword) if !keyword.is_empty() => {
                record.subject.to_lowercase().contains(&keyword)
                    || record.body.to_lowercase().contains(&keyword)
            }
            _ => true,
        }
    }
}

/// Narrow a table without touching it; source order is preserved.
pub fn apply(table: &EmailTable, spec: &FilterSpec) -> EmailTable {
    let start_time = Instant::now();
    let records: Vec<EmailRecord> = table
        .iter()
        .filter(|record| spec.matches(record))
        .cloned()
        .collect();

    info!(
        action = "complete",
        component = "filter",
        input_count = table.len(),
        output_count = records.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Applied filters"
    );
    EmailTable::new(records)
}
