//! Long-term memory queries.

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::models::{MemoryEntry, MemoryType};

/// Insert a memory entry. Entries are append-only.
pub async fn insert_entry(pool: &SqlitePool, entry: &MemoryEntry) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO memory_entries (id, owner, content, memory_type, metadata,
                                    importance, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.owner)
    .bind(&entry.content)
    .bind(entry.memory_type)
    .bind(&entry.metadata)
    .bind(entry.importance)
    .bind(entry.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent entries for an owner, newest first, optionally filtered by type.
pub async fn recent_entries(
    pool: &SqlitePool,
    owner: &str,
    memory_type: Option<MemoryType>,
    limit: i64,
) -> DbResult<Vec<MemoryEntry>> {
    let entries = match memory_type {
        Some(kind) => {
            sqlx::query_as::<_, MemoryEntry>(
                r#"
                SELECT * FROM memory_entries
                WHERE owner = ? AND memory_type = ?
                ORDER BY created_at DESC LIMIT ?
                "#,
            )
            .bind(owner)
            .bind(kind)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MemoryEntry>(
                "SELECT * FROM memory_entries WHERE owner = ? ORDER BY created_at DESC LIMIT ?",
            )
            .bind(owner)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(entries)
}

/// Literal substring search over an owner's entries, newest first.
pub async fn search_entries(
    pool: &SqlitePool,
    owner: &str,
    query: &str,
    memory_type: Option<MemoryType>,
) -> DbResult<Vec<MemoryEntry>> {
    let pattern = format!("%{}%", query);
    let entries = match memory_type {
        Some(kind) => {
            sqlx::query_as::<_, MemoryEntry>(
                r#"
                SELECT * FROM memory_entries
                WHERE owner = ? AND content LIKE ? AND memory_type = ?
                ORDER BY created_at DESC
                "#,
            )
            .bind(owner)
            .bind(&pattern)
            .bind(kind)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MemoryEntry>(
                r#"
                SELECT * FROM memory_entries
                WHERE owner = ? AND content LIKE ?
                ORDER BY created_at DESC
                "#,
            )
            .bind(owner)
            .bind(&pattern)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(entries)
}

/// Highest-importance entries for an owner, importance then recency descending.
///
/// This is the long-term side of relevance ranking.
pub async fn top_entries(pool: &SqlitePool, owner: &str, limit: i64) -> DbResult<Vec<MemoryEntry>> {
    let entries = sqlx::query_as::<_, MemoryEntry>(
        r#"
        SELECT * FROM memory_entries
        WHERE owner = ?
        ORDER BY importance DESC, created_at DESC
        LIMIT ?
        "#,
    )
    .bind(owner)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SwitchboardDb;
    use chrono::{Duration, Utc};
    use sqlx::types::Json;

    fn entry(id: &str, content: &str, importance: f64, age_secs: i64) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            owner: "orchestrator".to_string(),
            content: content.to_string(),
            memory_type: MemoryType::Conversation,
            metadata: Json(serde_json::json!({})),
            importance,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn recent_entries_newest_first() {
        let db = SwitchboardDb::open_in_memory().await.unwrap();
        insert_entry(db.pool(), &entry("m1", "older", 0.1, 60)).await.unwrap();
        insert_entry(db.pool(), &entry("m2", "newer", 0.1, 10)).await.unwrap();

        let recent = recent_entries(db.pool(), "orchestrator", None, 10)
            .await
            .unwrap();
        assert_eq!(recent[0].content, "newer");
        assert_eq!(recent[1].content, "older");
    }

    #[tokio::test]
    async fn search_is_literal_substring() {
        let db = SwitchboardDb::open_in_memory().await.unwrap();
        insert_entry(db.pool(), &entry("m1", "invoice overdue", 0.5, 0))
            .await
            .unwrap();
        insert_entry(db.pool(), &entry("m2", "weather report", 0.5, 0))
            .await
            .unwrap();

        let hits = search_entries(db.pool(), "orchestrator", "invoice", None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "m1");
    }

    #[tokio::test]
    async fn top_entries_ranked_by_importance_then_recency() {
        let db = SwitchboardDb::open_in_memory().await.unwrap();
        insert_entry(db.pool(), &entry("m1", "low", 0.2, 0)).await.unwrap();
        insert_entry(db.pool(), &entry("m2", "high old", 0.9, 120)).await.unwrap();
        insert_entry(db.pool(), &entry("m3", "high new", 0.9, 5)).await.unwrap();

        let top = top_entries(db.pool(), "orchestrator", 2).await.unwrap();
        assert_eq!(top[0].id, "m3");
        assert_eq!(top[1].id, "m2");
    }
}
