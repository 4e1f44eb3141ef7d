use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Instant;
use tracing::info;

use crate::entities::{extract_sampled, EntityCount};
use crate::filter::{self, FilterSpec};
use crate::insights::{InsightEngine, InsightSummary};
use crate::models::Models;
use crate::records::EmailTable;
use crate::sentiment::{
    score_table, sentiment_overview, SentimentOverview, SENTIMENT_SENDERS_SHOWN,
};
use crate::stats::{
    activity_heatmap, daily_counts, detect_bursts, monthly_counts, top_senders, ActivityHeatmap,
    BurstReport, DailyCount, MonthlyCount, RankedCount,
};
use crate::text::{common_subject_words, subject_bigrams, word_cloud_input, StopwordSet, WordCloudInput};
use crate::utils::format_number;

pub const DEFAULT_TITLE: &str = "Email Analysis Dashboard";
const NO_DATA: &str = "No data for selected filters.";
const WORD_CLOUD_SHOWN: usize = 10;
const HISTOGRAM_BAR_MAX: usize = 50;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Ranking length for senders, words, bigrams and entities
    pub top: usize,
    pub ner_sample: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            top: 20,
            ner_sample: crate::entities::DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_emails: usize,
    pub unique_senders: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl Overview {
    pub fn from_table(table: &EmailTable) -> Self {
        let bounds = table.date_bounds();
        Self {
            total_emails: table.len(),
            unique_senders: table.unique_sender_count(),
            first_date: bounds.map(|(first, _)| first),
            last_date: bounds.map(|(_, last)| last),
        }
    }

    pub fn date_range_label(&self) -> String {
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => format!("{} → {}", first, last),
            _ => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub title: String,
    pub filter: FilterSpec,
    pub overview: Overview,
    pub daily_counts: Vec<DailyCount>,
    pub activity_heatmap: ActivityHeatmap,
    pub monthly_counts: Vec<MonthlyCount>,
    pub top_senders: Vec<RankedCount>,
    pub bursts: BurstReport,
    pub common_words: Vec<RankedCount>,
    pub bigrams: Vec<RankedCount>,
    pub word_cloud: WordCloudInput,
    pub entity_sample_size: usize,
    pub entities: Vec<EntityCount>,
    pub sentiment: SentimentOverview,
    pub insights: InsightSummary,
}

impl DashboardReport {
    pub fn is_empty(&self) -> bool {
        self.overview.total_emails == 0
    }
}

/// Filter the loaded table and compute every dashboard section from the
/// filtered rows. The source table is left untouched.
pub fn build_report<R: Rng + ?Sized>(
    table: &EmailTable,
    spec: &FilterSpec,
    stopwords: &StopwordSet,
    models: &Models,
    options: &ReportOptions,
    rng: &mut R,
) -> DashboardReport {
    let start_time = Instant::now();
    let mut filtered = filter::apply(table, spec);

    score_table(&mut filtered, &models.sentiment);

    let daily = daily_counts(&filtered);
    let bursts = detect_bursts(&daily);
    let entity_sample_size = filtered.len().min(options.ner_sample);
    let entities = extract_sampled(
        &mut filtered,
        &models.entities,
        options.ner_sample,
        options.top,
        rng,
    );
    let sentiment = sentiment_overview(&filtered, SENTIMENT_SENDERS_SHOWN);
    let insights = InsightEngine::new().summarize(&filtered, &bursts, &sentiment);

    let report = DashboardReport {
        title: options.title.clone(),
        filter: spec.clone(),
        overview: Overview::from_table(&filtered),
        activity_heatmap: activity_heatmap(&filtered),
        monthly_counts: monthly_counts(&filtered),
        top_senders: top_senders(&filtered, options.top),
        common_words: common_subject_words(&filtered, stopwords, options.top),
        bigrams: subject_bigrams(&filtered, stopwords, options.top),
        word_cloud: word_cloud_input(&filtered, stopwords),
        sentiment,
        daily_counts: daily,
        bursts,
        entity_sample_size,
        entities,
        insights,
    };

    info!(
        action = "complete",
        component = "report",
        emails = report.overview.total_emails,
        burst_days = report.bursts.burst_days.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Dashboard computed"
    );
    report
}

pub fn write_json<W: Write>(report: &DashboardReport, out: &mut W) -> crate::error::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

fn write_ranked<W: Write>(out: &mut W, items: &[RankedCount], unit: &str) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "{}", NO_DATA);
    }
    for item in items {
        writeln!(
            out,
            "- {}: {} {}",
            item.label,
            format_number(item.count as u64),
            unit
        )?;
    }
    Ok(())
}

fn write_group<W: Write>(out: &mut W, senders: &[RankedCount]) -> io::Result<()> {
    if senders.is_empty() {
        return writeln!(out, "- none");
    }
    write_ranked(out, senders, "emails")
}

pub fn write_text<W: Write>(report: &DashboardReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n--- {} ---", report.title)?;

    let overview = &report.overview;
    writeln!(
        out,
        "Total emails: {}",
        format_number(overview.total_emails as u64)
    )?;
    writeln!(
        out,
        "Unique senders: {}",
        format_number(overview.unique_senders as u64)
    )?;
    writeln!(out, "Date range: {}", overview.date_range_label())?;

    writeln!(out, "\nEmails per day:")?;
    if report.daily_counts.is_empty() {
        writeln!(out, "{}", NO_DATA)?;
    }
    for day in &report.daily_counts {
        writeln!(out, "- {}: {}", day.date, day.count)?;
    }

    writeln!(out, "\nActivity by weekday and hour:")?;
    if report.is_empty() {
        writeln!(out, "{}", NO_DATA)?;
    } else {
        let heatmap = &report.activity_heatmap;
        write!(out, "{:<10}", "")?;
        for hour in 0..24 {
            write!(out, "{:>4}", hour)?;
        }
        writeln!(out)?;
        for (weekday, row) in heatmap.weekdays.iter().zip(heatmap.cells.iter()) {
            write!(out, "{:<10}", weekday)?;
            for count in row {
                write!(out, "{:>4}", count)?;
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "\nEmails per month:")?;
    if report.monthly_counts.is_empty() {
        writeln!(out, "{}", NO_DATA)?;
    }
    for month in &report.monthly_counts {
        writeln!(out, "- {}: {}", month.month, month.count)?;
    }

    writeln!(out, "\nTop {} senders:", report.top_senders.len())?;
    write_ranked(out, &report.top_senders, "emails")?;

    writeln!(out, "\nEmail bursts:")?;
    match report.bursts.threshold {
        _ if report.is_empty() => writeln!(out, "{}", NO_DATA)?,
        Some(threshold) if report.bursts.has_bursts() => {
            writeln!(out, "Threshold: {:.2} emails/day", threshold)?;
            for day in &report.bursts.burst_days {
                writeln!(out, "- {}: {} emails", day.date, day.count)?;
            }
        }
        _ => writeln!(out, "No burst days detected.")?,
    }

    writeln!(out, "\nCommon subject words:")?;
    write_ranked(out, &report.common_words, "occurrences")?;

    writeln!(out, "\nSubject bigrams:")?;
    write_ranked(out, &report.bigrams, "occurrences")?;

    writeln!(out, "\nWord cloud (top {} words):", WORD_CLOUD_SHOWN)?;
    let cloud: Vec<RankedCount> = report
        .word_cloud
        .frequencies
        .iter()
        .take(WORD_CLOUD_SHOWN)
        .cloned()
        .collect();
    write_ranked(out, &cloud, "occurrences")?;

    writeln!(
        out,
        "\nNamed entities (sample of {} emails):",
        report.entity_sample_size
    )?;
    if report.entities.is_empty() {
        writeln!(out, "{}", NO_DATA)?;
    }
    for entity in &report.entities {
        writeln!(out, "- {} [{}]: {}", entity.text, entity.label, entity.count)?;
    }

    let sentiment = &report.sentiment;
    writeln!(out, "\nSentiment:")?;
    match sentiment.mean_polarity {
        Some(mean) => {
            writeln!(out, "Average polarity: {:.3}", mean)?;
            writeln!(
                out,
                "Highly positive: {}, highly negative: {}",
                sentiment.highly_positive, sentiment.highly_negative
            )?;
            writeln!(out, "Polarity distribution ({} bins):", sentiment.histogram.len())?;
            for bin in &sentiment.histogram {
                writeln!(
                    out,
                    "  [{:+.2}, {:+.2}) {:>5} {}",
                    bin.lower,
                    bin.upper,
                    bin.count,
                    "#".repeat(bin.count.min(HISTOGRAM_BAR_MAX))
                )?;
            }
            writeln!(out, "Most positive:")?;
            for email in &sentiment.most_positive {
                writeln!(
                    out,
                    "- {:+.2} {} {}: {}",
                    email.polarity, email.date, email.sender, email.subject
                )?;
            }
            writeln!(out, "Most negative:")?;
            for email in &sentiment.most_negative {
                writeln!(
                    out,
                    "- {:+.2} {} {}: {}",
                    email.polarity, email.date, email.sender, email.subject
                )?;
            }
        }
        None => writeln!(out, "{}", NO_DATA)?,
    }

    writeln!(out, "\nBehavioral insights:")?;
    if !report.insights.is_empty() {
        writeln!(out, "Highly positive senders:")?;
        write_group(out, &report.insights.top_positive_senders)?;
        writeln!(out, "Highly negative senders:")?;
        write_group(out, &report.insights.top_negative_senders)?;
    }
    for section in &report.insights.sections {
        writeln!(out, "\n{}", section.title)?;
        for statement in &section.statements {
            writeln!(out, "- {}", statement)?;
        }
    }

    Ok(())
}
