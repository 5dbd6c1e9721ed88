// src/store/mod.rs
//! Storage capability used by the merge engine. The engine only ever needs
//! the operations below; everything else about the schema is the store's
//! business. Write failures are per-call `Err`s the engine absorbs; a failed
//! initial read is fatal for the whole batch.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ingest::types::{Severity, SourceType};

#[derive(Debug, Clone)]
pub struct OutbreakRow {
    pub id: Uuid,
    pub disease_name: String,
    pub severity: Severity,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NewOutbreak {
    pub disease_name: String,
    pub status: String,
    pub severity: Severity,
    pub first_reported: DateTime<Utc>,
    /// Already truncated by the caller.
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub outbreak_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub region: Option<String>,
    pub case_count: i64,
    pub severity_score: f64,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub outbreak_id: Uuid,
    pub source_type: SourceType,
    pub source_name: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait OutbreakStore: Send + Sync {
    async fn list_outbreaks(&self) -> Result<Vec<OutbreakRow>>;
    async fn list_report_titles(&self) -> Result<Vec<String>>;
    async fn create_outbreak(&self, outbreak: NewOutbreak) -> Result<Uuid>;
    async fn update_outbreak_severity(
        &self,
        id: Uuid,
        severity: Severity,
        last_updated: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_location(&self, outbreak_id: Uuid, country: &str) -> Result<Option<Uuid>>;
    async fn create_location(&self, location: NewLocation) -> Result<()>;
    async fn create_report(&self, report: NewReport) -> Result<()>;
}
