//! Insight rules - threshold checks over a shared read-only snapshot
//!
//! Each rule looks at the same [`InsightSnapshot`] and produces one
//! [`RuleOutcome`] with natural-language statements. Rules never see each
//! other's output, so they can be evaluated and tested one at a time.
//!
//! ## Built-in rules, in report order
//!
//! - **Sender behaviour** - dominant source when the top sender exceeds 30%
//! - **Temporal patterns** - peak hour and weekday
//! - **Sentiment dynamics** - mean polarity above 0.1 / below -0.1
//! - **Investigative cues** - complaint and issue vocabulary in bodies
//! - **Politeness** - share of bodies with polite phrases
//! - **Anomalies** - bursts, low politeness or negative sentiment

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::records::EmailTable;
use crate::sentiment::{mean_polarity, SentimentOverview};
use crate::stats::{mode, top_senders, BurstReport, DailyCount, RankedCount};

pub const DOMINANT_SENDER_SHARE: f64 = 0.3;
pub const POSITIVE_MEAN: f64 = 0.1;
pub const NEGATIVE_MEAN: f64 = -0.1;
pub const HIGH_POLITENESS: f64 = 0.4;
pub const LOW_POLITENESS: f64 = 0.2;

pub const INVESTIGATIVE_TERMS: [&str; 11] = [
    "issue", "problem", "urgent", "delay", "fail", "error", "complaint", "request", "bug", "fix",
    "escalate",
];

pub const POLITE_PHRASES: [&str; 7] = [
    "kind regards",
    "best regards",
    "thank you",
    "thanks",
    "sincerely",
    "please",
    "appreciate",
];

const NO_DATA: &str = "No data available for the selected filters.";

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("static word pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    SenderBehaviour,
    TemporalPatterns,
    SentimentDynamics,
    InvestigativeCues,
    Politeness,
    Anomalies,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::SenderBehaviour => "sender_behaviour",
            RuleId::TemporalPatterns => "temporal_patterns",
            RuleId::SentimentDynamics => "sentiment_dynamics",
            RuleId::InvestigativeCues => "investigative_cues",
            RuleId::Politeness => "politeness",
            RuleId::Anomalies => "anomalies",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregates every rule reads from. Built once per filtered table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightSnapshot {
    pub total: usize,
    pub top_sender: Option<RankedCount>,
    pub peak_hour: Option<u32>,
    pub peak_weekday: Option<String>,
    pub mean_polarity: Option<f64>,
    pub burst_days: Vec<DailyCount>,
    /// Nonzero investigative term counts, in vocabulary order
    pub investigative_terms: Vec<RankedCount>,
    pub politeness_ratio: f64,
}

impl InsightSnapshot {
    /// Expects polarity to be scored already; unscored records count as 0.
    pub fn from_table(table: &EmailTable, bursts: &BurstReport) -> Self {
        if table.is_empty() {
            return Self::default();
        }

        Self {
            total: table.len(),
            top_sender: top_senders(table, 1).into_iter().next(),
            peak_hour: mode(table.iter().map(|r| r.calendar.hour)),
            peak_weekday: mode(table.iter().map(|r| r.calendar.weekday.clone())),
            mean_polarity: mean_polarity(table),
            burst_days: bursts.burst_days.clone(),
            investigative_terms: investigative_term_counts(table),
            politeness_ratio: politeness_ratio(table),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn low_politeness(&self) -> bool {
        !self.is_empty() && self.politeness_ratio < LOW_POLITENESS
    }

    pub fn negative_sentiment(&self) -> bool {
        self.mean_polarity.is_some_and(|p| p < NEGATIVE_MEAN)
    }

    pub fn has_bursts(&self) -> bool {
        !self.burst_days.is_empty()
    }
}

/// Whole-word counts of [`INVESTIGATIVE_TERMS`] across lowercased bodies
pub fn investigative_term_counts(table: &EmailTable) -> Vec<RankedCount> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for record in table.iter() {
        let body = record.body.to_lowercase();
        for word in WORD.find_iter(&body) {
            if let Some(term) = INVESTIGATIVE_TERMS.iter().find(|t| **t == word.as_str()) {
                *counts.entry(term).or_insert(0) += 1;
            }
        }
    }
    INVESTIGATIVE_TERMS
        .iter()
        .filter_map(|term| {
            counts.get(term).map(|&count| RankedCount {
                label: term.to_string(),
                count,
            })
        })
        .collect()
}

/// Fraction of bodies containing any polite phrase; 0 for an empty table
pub fn politeness_ratio(table: &EmailTable) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let polite = table
        .iter()
        .filter(|r| {
            let body = r.body.to_lowercase();
            POLITE_PHRASES.iter().any(|p| body.contains(p))
        })
        .count();
    polite as f64 / table.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule: RuleId,
    pub title: String,
    pub statements: Vec<String>,
    /// True when the rule found something worth attention
    pub flagged: bool,
}

impl RuleOutcome {
    fn no_data(rule: &dyn Rule) -> Self {
        Self {
            rule: rule.id(),
            title: rule.title().to_string(),
            statements: vec![NO_DATA.to_string()],
            flagged: false,
        }
    }
}

pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn title(&self) -> &'static str;

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome;
}

pub struct DominantSenderRule;

impl Rule for DominantSenderRule {
    fn id(&self) -> RuleId {
        RuleId::SenderBehaviour
    }

    fn title(&self) -> &'static str {
        "Sender Behavior Patterns"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        let Some(top) = snapshot.top_sender.as_ref().filter(|_| !snapshot.is_empty()) else {
            return RuleOutcome::no_data(self);
        };

        let dominant = top.count as f64 > DOMINANT_SENDER_SHARE * snapshot.total as f64;
        let mut statements = vec![format!(
            "The top sender is {} with {} emails.",
            top.label, top.count
        )];
        statements.push(if dominant {
            "This suggests a dominant communication source, possibly a key stakeholder or automated system.".to_string()
        } else {
            "Email distribution is relatively balanced among senders.".to_string()
        });

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements,
            flagged: dominant,
        }
    }
}

pub struct TemporalRule;

impl Rule for TemporalRule {
    fn id(&self) -> RuleId {
        RuleId::TemporalPatterns
    }

    fn title(&self) -> &'static str {
        "Temporal Communication Patterns"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        let (Some(hour), Some(weekday)) = (snapshot.peak_hour, snapshot.peak_weekday.as_ref())
        else {
            return RuleOutcome::no_data(self);
        };

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements: vec![
                format!("Peak email sending hour is around {}:00.", hour),
                format!("Most active day of the week is {}.", weekday),
                "These patterns may reflect typical business hours and weekday workload."
                    .to_string(),
            ],
            flagged: false,
        }
    }
}

pub struct SentimentDynamicsRule;

impl Rule for SentimentDynamicsRule {
    fn id(&self) -> RuleId {
        RuleId::SentimentDynamics
    }

    fn title(&self) -> &'static str {
        "Sentiment Dynamics"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        let Some(mean) = snapshot.mean_polarity else {
            return RuleOutcome::no_data(self);
        };

        let statement = if mean > POSITIVE_MEAN {
            "Overall sentiment is slightly positive, indicating generally constructive communication."
        } else if mean < NEGATIVE_MEAN {
            "Overall sentiment leans negative, possible signs of dissatisfaction or conflict."
        } else {
            "Sentiment is mostly neutral, reflecting balanced communication."
        };

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements: vec![
                format!("Average polarity is {:.2}.", mean),
                statement.to_string(),
            ],
            flagged: mean < NEGATIVE_MEAN,
        }
    }
}

pub struct InvestigativeTermsRule;

impl Rule for InvestigativeTermsRule {
    fn id(&self) -> RuleId {
        RuleId::InvestigativeCues
    }

    fn title(&self) -> &'static str {
        "Investigative Linguistic Cues"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        if snapshot.is_empty() {
            return RuleOutcome::no_data(self);
        }

        let mut statements: Vec<String> = snapshot
            .investigative_terms
            .iter()
            .map(|term| {
                format!(
                    "Term '{}' appeared {} times, suggesting frequent mentions of potential issues or concerns.",
                    term.label, term.count
                )
            })
            .collect();

        let flagged = !statements.is_empty();
        if flagged {
            statements.push(
                "These keywords could indicate areas requiring operational review or support focus."
                    .to_string(),
            );
        } else {
            statements.push(
                "No strong presence of common investigative or complaint-related keywords detected."
                    .to_string(),
            );
        }

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements,
            flagged,
        }
    }
}

pub struct PolitenessRule;

impl Rule for PolitenessRule {
    fn id(&self) -> RuleId {
        RuleId::Politeness
    }

    fn title(&self) -> &'static str {
        "Politeness & Communication Tone"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        if snapshot.is_empty() {
            return RuleOutcome::no_data(self);
        }

        let ratio = snapshot.politeness_ratio;
        let mut statements = vec![format!(
            "Approximately {:.1}% of emails include polite or formal phrases.",
            ratio * 100.0
        )];
        statements.push(if ratio > HIGH_POLITENESS {
            "High politeness ratio may suggest formal business communications or attempts to soften requests.".to_string()
        } else {
            "Lower politeness usage could indicate more direct or informal exchanges.".to_string()
        });

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements,
            flagged: snapshot.low_politeness(),
        }
    }
}

pub struct AnomalyRule;

impl Rule for AnomalyRule {
    fn id(&self) -> RuleId {
        RuleId::Anomalies
    }

    fn title(&self) -> &'static str {
        "Potential Anomalies or Areas for Further Investigation"
    }

    fn evaluate(&self, snapshot: &InsightSnapshot) -> RuleOutcome {
        if snapshot.is_empty() {
            return RuleOutcome::no_data(self);
        }

        let mut statements = Vec::new();
        if snapshot.has_bursts() {
            statements.push("Email Bursts: Unusually high email volume detected on certain days. Investigate these periods for specific events or issues.".to_string());
        }
        if snapshot.low_politeness() {
            statements.push("Low Politeness: A low ratio of polite phrases might indicate a more direct, urgent, or potentially confrontational tone in communications.".to_string());
        }
        if snapshot.negative_sentiment() {
            statements.push("Negative Sentiment: Overall negative sentiment suggests potential dissatisfaction or ongoing problems that might need attention.".to_string());
        }

        let flagged = !statements.is_empty();
        if !flagged {
            statements.push("Communication appears consistent with typical patterns. No significant anomalies detected.".to_string());
        }

        RuleOutcome {
            rule: self.id(),
            title: self.title().to_string(),
            statements,
            flagged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyFlags {
    pub bursts: bool,
    pub low_politeness: bool,
    pub negative_sentiment: bool,
}

impl AnomalyFlags {
    pub fn from_snapshot(snapshot: &InsightSnapshot) -> Self {
        Self {
            bursts: snapshot.has_bursts(),
            low_politeness: snapshot.low_politeness(),
            negative_sentiment: snapshot.negative_sentiment(),
        }
    }

    pub fn triggered(&self) -> bool {
        self.bursts || self.low_politeness || self.negative_sentiment
    }
}

/// Everything the behavioural-insights section shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightSummary {
    pub total: usize,
    pub highly_positive: usize,
    pub highly_negative: usize,
    pub top_positive_senders: Vec<RankedCount>,
    pub top_negative_senders: Vec<RankedCount>,
    pub burst_days: Vec<DailyCount>,
    pub anomalies: AnomalyFlags,
    pub sections: Vec<RuleOutcome>,
}

impl InsightSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn section(&self, rule: RuleId) -> Option<&RuleOutcome> {
        self.sections.iter().find(|s| s.rule == rule)
    }
}

/// Ordered set of rules evaluated against one snapshot
pub struct InsightEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    pub fn new() -> Self {
        let mut engine = Self { rules: vec![] };

        engine.register(Box::new(DominantSenderRule));
        engine.register(Box::new(TemporalRule));
        engine.register(Box::new(SentimentDynamicsRule));
        engine.register(Box::new(InvestigativeTermsRule));
        engine.register(Box::new(PolitenessRule));
        engine.register(Box::new(AnomalyRule));

        engine
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn evaluate(&self, snapshot: &InsightSnapshot) -> Vec<RuleOutcome> {
        self.rules
            .iter()
            .map(|rule| {
                let outcome = rule.evaluate(snapshot);
                tracing::debug!(
                    rule = rule.id().as_str(),
                    flagged = outcome.flagged,
                    "Rule evaluated"
                );
                outcome
            })
            .collect()
    }

    /// Build the full summary for a scored, filtered table. Sentiment
    /// group counts come from `sentiment`, computed over the same table.
    pub fn summarize(
        &self,
        table: &EmailTable,
        bursts: &BurstReport,
        sentiment: &SentimentOverview,
    ) -> InsightSummary {
        let snapshot = InsightSnapshot::from_table(table, bursts);
        let sections = self.evaluate(&snapshot);

        InsightSummary {
            total: snapshot.total,
            highly_positive: sentiment.highly_positive,
            highly_negative: sentiment.highly_negative,
            top_positive_senders: sentiment.top_positive_senders.clone(),
            top_negative_senders: sentiment.top_negative_senders.clone(),
            burst_days: snapshot.burst_days.clone(),
            anomalies: AnomalyFlags::from_snapshot(&snapshot),
            sections,
        }
    }
}
