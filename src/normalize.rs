//! Column validation, strict date parsing and signature stripping

use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};
use std::time::Instant;
use tracing::info;

use crate::error::{Error, Result};
use crate::loader::RawTable;
use crate::records::{CalendarFields, EmailRecord, EmailTable};

pub const REQUIRED_COLUMNS: [&str; 4] = ["Subject", "Sender", "Date", "Body"];

/// Export timestamp format, e.g. `01/03/2024 09:15:00 AM`
pub const DATE_FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";

/// Positions of the required columns in a raw table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub subject: usize,
    pub sender: usize,
    pub date: usize,
    pub body: usize,
}

pub fn validate_columns(table: &RawTable) -> Result<ColumnIndex> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let index = |name: &str| table.column_index(name).unwrap_or_default();
    Ok(ColumnIndex {
        subject: index("Subject"),
        sender: index("Sender"),
        date: index("Date"),
        body: index("Body"),
    })
}

pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn derive_calendar_fields(date: &NaiveDateTime) -> CalendarFields {
    CalendarFields::derive(date)
}

/// Truncates a body at the first closing phrase on each line.
///
/// Every keyword matches itself and the rest of its line, case-insensitively.
/// Text after a phrase is lost even when it is real content.
#[derive(Debug, Clone)]
pub struct BodyCleaner {
    pattern: Option<Regex>,
}

impl BodyCleaner {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(|k| format!("{}.*", regex::escape(k)))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self::disabled());
        }

        let pattern = RegexBuilder::new(&format!("({})", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn disabled() -> Self {
        Self { pattern: None }
    }

    pub fn clean(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, "").trim().to_string(),
            None => text.trim().to_string(),
        }
    }
}

pub fn clean_body<S: AsRef<str>>(text: &str, cleanup_keywords: &[S]) -> Result<String> {
    Ok(BodyCleaner::new(cleanup_keywords)?.clean(text))
}

/// Turn a raw table into email records: drop rows with null required
/// fields, drop rows whose date does not match [`DATE_FORMAT`], derive
/// calendar fields and clean bodies.
pub fn normalize(table: &RawTable, cleaner: &BodyCleaner) -> Result<EmailTable> {
    let start_time = Instant::now();
    let columns = validate_columns(table)?;

    let mut null_rows = 0usize;
    let mut bad_dates = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let field = |idx: usize| row.get(idx).and_then(|v| v.as_deref());
        let (Some(subject), Some(sender), Some(date), Some(body)) = (
            field(columns.subject),
            field(columns.sender),
            field(columns.date),
            field(columns.body),
        ) else {
            null_rows += 1;
            continue;
        };

        let Some(date) = parse_date(date) else {
            bad_dates += 1;
            continue;
        };

        records.push(EmailRecord::new(
            subject.to_string(),
            sender.to_string(),
            date,
            cleaner.clean(body),
        ));
    }

    info!(
        action = "complete",
        component = "normalizer",
        record_count = records.len(),
        null_rows,
        bad_dates,
        duration_ms = start_time.elapsed().as_millis(),
        "Normalized email table"
    );

    Ok(EmailTable::new(records))
}
