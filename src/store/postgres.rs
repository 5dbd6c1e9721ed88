// src/store/postgres.rs
//! Postgres-backed store via sqlx.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewLocation, NewOutbreak, NewReport, OutbreakRow, OutbreakStore};
use crate::ingest::types::Severity;

#[derive(Clone)]
pub struct PgOutbreakStore {
    pool: PgPool,
}

impl PgOutbreakStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("connecting to postgres")?;
        Ok(Self::new(pool))
    }

    /// Idempotent schema bootstrap. Safe to run on every startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS outbreaks (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                disease_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                severity TEXT NOT NULL,
                first_reported TIMESTAMPTZ NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                last_updated TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating outbreaks table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS outbreak_locations (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                outbreak_id UUID NOT NULL REFERENCES outbreaks(id),
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                country TEXT NOT NULL,
                region TEXT,
                case_count BIGINT NOT NULL DEFAULT 0,
                severity_score DOUBLE PRECISION NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating outbreak_locations table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                outbreak_id UUID NOT NULL REFERENCES outbreaks(id),
                source_type TEXT NOT NULL,
                source_name TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT,
                content TEXT NOT NULL DEFAULT '',
                published_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating reports table")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl OutbreakStore for PgOutbreakStore {
    async fn list_outbreaks(&self) -> Result<Vec<OutbreakRow>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, disease_name, severity, status FROM outbreaks",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing outbreaks")?;

        Ok(rows
            .into_iter()
            .map(|(id, disease_name, severity, status)| OutbreakRow {
                id,
                disease_name,
                // Unrecognized values fall back to the creation default.
                severity: Severity::parse(&severity).unwrap_or(Severity::Moderate),
                status,
            })
            .collect())
    }

    async fn list_report_titles(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT title FROM reports")
            .fetch_all(&self.pool)
            .await
            .context("listing report titles")?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    async fn create_outbreak(&self, outbreak: NewOutbreak) -> Result<Uuid> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO outbreaks (disease_name, status, severity, first_reported, summary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&outbreak.disease_name)
        .bind(&outbreak.status)
        .bind(outbreak.severity.as_str())
        .bind(outbreak.first_reported)
        .bind(&outbreak.summary)
        .fetch_one(&self.pool)
        .await
        .context("inserting outbreak")?;

        Ok(row.0)
    }

    async fn update_outbreak_severity(
        &self,
        id: Uuid,
        severity: Severity,
        last_updated: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE outbreaks SET severity = $1, last_updated = $2 WHERE id = $3")
            .bind(severity.as_str())
            .bind(last_updated)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("updating outbreak severity")?;
        Ok(())
    }

    async fn find_location(&self, outbreak_id: Uuid, country: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM outbreak_locations WHERE outbreak_id = $1 AND country = $2 LIMIT 1",
        )
        .bind(outbreak_id)
        .bind(country)
        .fetch_optional(&self.pool)
        .await
        .context("looking up outbreak location")?;
        Ok(row.map(|(id,)| id))
    }

    async fn create_location(&self, location: NewLocation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbreak_locations
                (outbreak_id, latitude, longitude, country, region, case_count, severity_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(location.outbreak_id)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.country)
        .bind(&location.region)
        .bind(location.case_count)
        .bind(location.severity_score)
        .execute(&self.pool)
        .await
        .context("inserting outbreak location")?;
        Ok(())
    }

    async fn create_report(&self, report: NewReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports
                (outbreak_id, source_type, source_name, title, url, content, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(report.outbreak_id)
        .bind(report.source_type.as_str())
        .bind(&report.source_name)
        .bind(&report.title)
        .bind(&report.url)
        .bind(&report.content)
        .bind(report.published_at)
        .execute(&self.pool)
        .await
        .context("inserting report")?;
        Ok(())
    }
}
