use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::records::{EmailTable, WEEKDAYS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub label: String,
    pub count: usize,
}

/// Count labels, ranked by count descending; ties keep first-seen order.
pub fn rank_counts<I, S>(labels: I, limit: usize) -> Vec<RankedCount>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, label) in labels.into_iter().enumerate() {
        counts
            .entry(label.into())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(label, (count, first))| (label, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(label, count, _)| RankedCount { label, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: usize,
}

/// Weekday x hour counts, rows Monday..Sunday, columns hour 0..23
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityHeatmap {
    pub weekdays: [&'static str; 7],
    pub cells: [[usize; 24]; 7],
}

impl ActivityHeatmap {
    pub fn get(&self, weekday: &str, hour: u32) -> usize {
        WEEKDAYS
            .iter()
            .position(|w| *w == weekday)
            .and_then(|row| self.cells[row].get(hour as usize).copied())
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }
}

/// Per-day counts in chronological order
pub fn daily_counts(table: &EmailTable) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in table.iter() {
        *by_day.entry(record.date_only()).or_insert(0) += 1;
    }
    by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

pub fn activity_heatmap(table: &EmailTable) -> ActivityHeatmap {
    let mut cells = [[0usize; 24]; 7];
    for record in table.iter() {
        if let Some(row) = WEEKDAYS.iter().position(|w| *w == record.calendar.weekday) {
            if let Some(cell) = cells[row].get_mut(record.calendar.hour as usize) {
                *cell += 1;
            }
        }
    }
    ActivityHeatmap {
        weekdays: WEEKDAYS,
        cells,
    }
}

/// Per-month counts; `YYYY-MM` labels sort chronologically
pub fn monthly_counts(table: &EmailTable) -> Vec<MonthlyCount> {
    let mut by_month: BTreeMap<&str, usize> = BTreeMap::new();
    for record in table.iter() {
        *by_month.entry(record.calendar.month.as_str()).or_insert(0) += 1;
    }
    by_month
        .into_iter()
        .map(|(month, count)| MonthlyCount {
            month: month.to_string(),
            count,
        })
        .collect()
}

pub fn top_senders(table: &EmailTable, limit: usize) -> Vec<RankedCount> {
    rank_counts(table.iter().map(|r| r.sender.as_str()), limit)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurstReport {
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two days
    pub std_dev: Option<f64>,
    pub threshold: Option<f64>,
    pub burst_days: Vec<DailyCount>,
}

impl BurstReport {
    pub fn has_bursts(&self) -> bool {
        !self.burst_days.is_empty()
    }
}

/// Flag days whose count is strictly above mean + 2 * sample std dev.
///
/// Fewer than two distinct days leaves the deviation undefined and
/// reports no bursts.
pub fn detect_bursts(daily: &[DailyCount]) -> BurstReport {
    if daily.is_empty() {
        return BurstReport {
            mean: 0.0,
            std_dev: None,
            threshold: None,
            burst_days: Vec::new(),
        };
    }

    let n = daily.len() as f64;
    let mean = daily.iter().map(|d| d.count as f64).sum::<f64>() / n;

    if daily.len() < 2 {
        return BurstReport {
            mean,
            std_dev: None,
            threshold: None,
            burst_days: Vec::new(),
        };
    }

    let variance = daily
        .iter()
        .map(|d| (d.count as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();
    let threshold = mean + 2.0 * std_dev;

    let burst_days = daily
        .iter()
        .filter(|d| d.count as f64 > threshold)
        .cloned()
        .collect();

    BurstReport {
        mean,
        std_dev: Some(std_dev),
        threshold: Some(threshold),
        burst_days,
    }
}

/// Most frequent value; ties resolve to the first encountered
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts
            .entry(value)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }
    counts
        .into_iter()
        .max_by(|a, b| (a.1).0.cmp(&(b.1).0).then_with(|| (b.1).1.cmp(&(a.1).1)))
        .map(|(value, _)| value)
}
