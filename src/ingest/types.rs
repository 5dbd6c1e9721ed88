// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an outbreak as estimated from bulletin text.
/// Total order: Low < Moderate < Severe < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    /// Fixed escalation rank: low=1, moderate=2, severe=3, critical=4.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Moderate => 2,
            Severity::Severe => 3,
            Severity::Critical => 4,
        }
    }

    /// Fixed 0..1 score stored per location:
    /// low=0.3, moderate=0.5, severe=0.75, critical=0.9.
    pub fn score(self) -> f64 {
        match self {
            Severity::Low => 0.3,
            Severity::Moderate => 0.5,
            Severity::Severe => 0.75,
            Severity::Critical => 0.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Who,
    Cdc,
    News,
    User,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Who => "who",
            SourceType::Cdc => "cdc",
            SourceType::News => "news",
            SourceType::User => "user",
        }
    }
}

/// One normalized bulletin as produced by a source provider.
/// Consumed exactly once by the merge engine; never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReport {
    pub disease_name: String,
    pub country: String,
    pub region: Option<String>,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub severity_hint: Option<Severity>,
    pub case_count: Option<i64>,
}

#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawReport>>;
    fn name(&self) -> &'static str;
}
