use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::HashSet;

use crate::entities::Entity;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Calendar features derived from a parsed timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarFields {
    pub date_only: NaiveDate,
    pub hour: u32,
    pub weekday: String,
    pub month: String,
}

impl CalendarFields {
    pub fn derive(date: &NaiveDateTime) -> Self {
        Self {
            date_only: date.date(),
            hour: date.hour(),
            weekday: date.format("%A").to_string(),
            month: date.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailRecord {
    pub subject: String,
    pub sender: String,
    pub date: NaiveDateTime,
    pub body: String,
    #[serde(flatten)]
    pub calendar: CalendarFields,
    pub polarity: Option<f64>,
    pub entities: Option<Vec<Entity>>,
}

impl EmailRecord {
    pub fn new(subject: String, sender: String, date: NaiveDateTime, body: String) -> Self {
        let calendar = CalendarFields::derive(&date);
        Self {
            subject,
            sender,
            date,
            body,
            calendar,
            polarity: None,
            entities: None,
        }
    }

    pub fn date_only(&self) -> NaiveDate {
        self.calendar.date_only
    }
}

/// Records in source order, after row-level drops
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailTable {
    pub records: Vec<EmailRecord>,
}

impl EmailTable {
    pub fn new(records: Vec<EmailRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EmailRecord> {
        self.records.iter()
    }

    /// Earliest and latest calendar day, `None` for an empty table
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date_only()).min()?;
        let max = self.records.iter().map(|r| r.date_only()).max()?;
        Some((min, max))
    }

    /// Distinct senders, sorted
    pub fn senders(&self) -> Vec<String> {
        let mut senders: Vec<String> = self
            .records
            .iter()
            .map(|r| r.sender.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        senders.sort();
        senders
    }

    pub fn unique_sender_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.sender.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
