//! Read-only aggregation over stored machines

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Aggregate statistics for `GET /stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineStats {
    pub total_records: i64,
    pub os_distribution: BTreeMap<String, i64>,
    pub cpu_distribution: BTreeMap<String, i64>,
    pub memory_stats: MemoryStats,
}

/// Memory summary; only numeric memory values take part
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MemoryStats {
    Available {
        average_gb: f64,
        minimum_gb: f64,
        maximum_gb: f64,
        count: i64,
    },
    Unavailable {
        message: String,
        count: i64,
    },
}

pub async fn machine_stats(pool: &SqlitePool) -> Result<MachineStats> {
    let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machines")
        .fetch_one(pool)
        .await
        .context("Failed to count machines")?;

    let os_distribution = distribution(pool, "os").await?;
    let cpu_distribution = distribution(pool, "cpu").await?;

    let (average, minimum, maximum, count): (Option<f64>, Option<f64>, Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(memory_gb), MIN(memory_gb), MAX(memory_gb), COUNT(memory_gb) \
         FROM machines WHERE memory_gb IS NOT NULL",
    )
    .fetch_one(pool)
    .await
    .context("Failed to aggregate memory")?;

    let memory_stats = match (average, minimum, maximum) {
        (Some(average), Some(minimum), Some(maximum)) if count > 0 => MemoryStats::Available {
            average_gb: (average * 100.0).round() / 100.0,
            minimum_gb: minimum,
            maximum_gb: maximum,
            count,
        },
        _ => MemoryStats::Unavailable {
            message: "No valid memory data available".to_string(),
            count: 0,
        },
    };

    Ok(MachineStats {
        total_records,
        os_distribution,
        cpu_distribution,
        memory_stats,
    })
}

/// Record count per distinct non-null value of a column
async fn distribution(pool: &SqlitePool, column: &'static str) -> Result<BTreeMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT {column}, COUNT(*) FROM machines WHERE {column} IS NOT NULL GROUP BY {column}"
    ))
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to compute {} distribution", column))?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    async fn insert(pool: &SqlitePool, os: Option<&str>, cpu: &str, memory: Option<f64>) {
        sqlx::query(
            "INSERT INTO machines (guid, os, cpu, memory_gb, source, timestamp) \
             VALUES (lower(hex(randomblob(16))), ?, ?, ?, 'team_a', '2026-01-01T00:00:00Z')",
        )
        .bind(os)
        .bind(cpu)
        .bind(memory)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let pool = open_in_memory().await.unwrap();
        let stats = machine_stats(&pool).await.unwrap();
        assert_eq!(stats.total_records, 0);
        assert!(stats.os_distribution.is_empty());
        assert_eq!(
            stats.memory_stats,
            MemoryStats::Unavailable {
                message: "No valid memory data available".to_string(),
                count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let pool = open_in_memory().await.unwrap();
        insert(&pool, Some("Ubuntu"), "Xeon", Some(64.0)).await;
        insert(&pool, Some("Debian"), "Ryzen 7", Some(16.0)).await;
        insert(&pool, Some("Debian"), "Xeon", Some(32.0)).await;
        insert(&pool, None, "i9", None).await;

        let stats = machine_stats(&pool).await.unwrap();
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.os_distribution.get("Debian"), Some(&2));
        assert_eq!(stats.os_distribution.len(), 2);
        assert_eq!(stats.cpu_distribution.get("Xeon"), Some(&2));
        assert_eq!(
            stats.memory_stats,
            MemoryStats::Available {
                average_gb: 37.33,
                minimum_gb: 16.0,
                maximum_gb: 64.0,
                count: 3
            }
        );
    }
}
