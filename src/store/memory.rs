// src/store/memory.rs
//! In-memory store: backs unit/integration tests and serves as the fallback
//! when no DATABASE_URL is configured (useful for local poking at the API).

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::{NewLocation, NewOutbreak, NewReport, OutbreakRow, OutbreakStore};
use crate::ingest::types::Severity;

#[derive(Debug, Clone)]
pub struct StoredOutbreak {
    pub id: Uuid,
    pub disease_name: String,
    pub status: String,
    pub severity: Severity,
    pub first_reported: DateTime<Utc>,
    pub summary: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StoredLocation {
    pub id: Uuid,
    pub outbreak_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub region: Option<String>,
    pub case_count: i64,
    pub severity_score: f64,
}

#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: Uuid,
    pub outbreak_id: Uuid,
    pub source_type: String,
    pub source_name: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    outbreaks: Vec<StoredOutbreak>,
    locations: Vec<StoredLocation>,
    reports: Vec<StoredReport>,
    fail_outbreak_writes: bool,
    fail_location_writes: bool,
    fail_report_writes: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- test instrumentation ---

    pub fn fail_outbreak_writes(&self, fail: bool) {
        self.inner.lock().expect("store mutex poisoned").fail_outbreak_writes = fail;
    }

    pub fn fail_location_writes(&self, fail: bool) {
        self.inner.lock().expect("store mutex poisoned").fail_location_writes = fail;
    }

    pub fn fail_report_writes(&self, fail: bool) {
        self.inner.lock().expect("store mutex poisoned").fail_report_writes = fail;
    }

    // --- snapshots for assertions ---

    pub fn outbreaks(&self) -> Vec<StoredOutbreak> {
        self.inner.lock().expect("store mutex poisoned").outbreaks.clone()
    }

    pub fn locations(&self) -> Vec<StoredLocation> {
        self.inner.lock().expect("store mutex poisoned").locations.clone()
    }

    pub fn reports(&self) -> Vec<StoredReport> {
        self.inner.lock().expect("store mutex poisoned").reports.clone()
    }
}

#[async_trait::async_trait]
impl OutbreakStore for MemoryStore {
    async fn list_outbreaks(&self) -> Result<Vec<OutbreakRow>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .outbreaks
            .iter()
            .map(|o| OutbreakRow {
                id: o.id,
                disease_name: o.disease_name.clone(),
                severity: o.severity,
                status: o.status.clone(),
            })
            .collect())
    }

    async fn list_report_titles(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.reports.iter().map(|r| r.title.clone()).collect())
    }

    async fn create_outbreak(&self, outbreak: NewOutbreak) -> Result<Uuid> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.fail_outbreak_writes {
            bail!("injected outbreak write failure");
        }
        let id = Uuid::new_v4();
        inner.outbreaks.push(StoredOutbreak {
            id,
            disease_name: outbreak.disease_name,
            status: outbreak.status,
            severity: outbreak.severity,
            first_reported: outbreak.first_reported,
            summary: outbreak.summary,
            last_updated: None,
        });
        Ok(id)
    }

    async fn update_outbreak_severity(
        &self,
        id: Uuid,
        severity: Severity,
        last_updated: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.fail_outbreak_writes {
            bail!("injected outbreak write failure");
        }
        if let Some(o) = inner.outbreaks.iter_mut().find(|o| o.id == id) {
            o.severity = severity;
            o.last_updated = Some(last_updated);
        }
        Ok(())
    }

    async fn find_location(&self, outbreak_id: Uuid, country: &str) -> Result<Option<Uuid>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .locations
            .iter()
            .find(|l| l.outbreak_id == outbreak_id && l.country == country)
            .map(|l| l.id))
    }

    async fn create_location(&self, location: NewLocation) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.fail_location_writes {
            bail!("injected location write failure");
        }
        inner.locations.push(StoredLocation {
            id: Uuid::new_v4(),
            outbreak_id: location.outbreak_id,
            latitude: location.latitude,
            longitude: location.longitude,
            country: location.country,
            region: location.region,
            case_count: location.case_count,
            severity_score: location.severity_score,
        });
        Ok(())
    }

    async fn create_report(&self, report: NewReport) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.fail_report_writes {
            bail!("injected report write failure");
        }
        inner.reports.push(StoredReport {
            id: Uuid::new_v4(),
            outbreak_id: report.outbreak_id,
            source_type: report.source_type.as_str().to_string(),
            source_name: report.source_name,
            title: report.title,
            url: report.url,
            content: report.content,
            published_at: report.published_at,
        });
        Ok(())
    }
}
