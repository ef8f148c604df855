//! Machine record storage and queries

use anyhow::{Context, Result};
use mspec_common::mapping::NormalizedRecord;
use mspec_common::CanonicalField;
use serde::Serialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

/// Stored machine as returned by list queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRow {
    pub os: Option<String>,
    pub cpu: Option<String>,
    pub memory_gb: Option<f64>,
}

/// Exact-match filters for list queries
#[derive(Debug, Clone, Default)]
pub struct MachineFilter {
    pub os: Option<String>,
    pub cpu: Option<String>,
}

/// Persist one normalized record, returning its generated id
pub async fn insert_machine(pool: &SqlitePool, record: &NormalizedRecord) -> Result<String> {
    let guid = Uuid::new_v4().to_string();
    let diagnostics = if record.diagnostics.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&record.diagnostics)?)
    };

    sqlx::query(
        "INSERT INTO machines (guid, os, cpu, memory_gb, source, timestamp, diagnostics) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(text_column(record.get(CanonicalField::Os)))
    .bind(text_column(record.get(CanonicalField::Cpu)))
    .bind(record.get(CanonicalField::MemoryGb).as_f64())
    .bind(&record.source_id)
    .bind(record.ingested_at.to_rfc3339())
    .bind(diagnostics)
    .execute(pool)
    .await
    .context("Failed to insert machine record")?;

    Ok(guid)
}

/// List machines in insertion order, filtered and windowed
pub async fn list_machines(
    pool: &SqlitePool,
    filter: &MachineFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<MachineRow>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT os, cpu, memory_gb FROM machines WHERE 1 = 1");
    if let Some(os) = &filter.os {
        query.push(" AND os = ").push_bind(os);
    }
    if let Some(cpu) = &filter.cpu {
        query.push(" AND cpu = ").push_bind(cpu);
    }
    query
        .push(" ORDER BY rowid LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = query
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to query machines")?;

    rows.iter()
        .map(|row| {
            Ok(MachineRow {
                os: row.try_get("os")?,
                cpu: row.try_get("cpu")?,
                memory_gb: row.try_get("memory_gb")?,
            })
        })
        .collect()
}

/// Sources that have stored at least one record
pub async fn distinct_sources(pool: &SqlitePool) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT DISTINCT source FROM machines ORDER BY source")
        .fetch_all(pool)
        .await
        .context("Failed to query sources")
}

/// Strings are stored as-is; other non-null values as their JSON text
fn text_column(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
