//! Tiered memory: a short-term in-process buffer plus long-term SQLite rows.
//!
//! Writes are best-effort by policy: a memory failure must never abort the
//! request that produced it, so [`MemoryStore::add_memory`] logs and returns
//! `false` instead of propagating. Entries are immutable once written;
//! consolidation creates new entries rather than editing old ones.

use chrono::Utc;
use parking_lot::Mutex;
use sqlx::types::Json;
use tracing::{debug, warn};

use crate::config::MemoryConfig;
use crate::id::MemoryId;
use switchboard_db::queries::memory as memory_queries;
use switchboard_db::{MemoryEntry, MemoryType, SwitchboardDb};

/// Memory manager for one subsystem (the orchestrator or a single agent).
#[derive(Debug)]
pub struct MemoryStore {
    owner: String,
    db: SwitchboardDb,
    config: MemoryConfig,
    short_term: Mutex<Vec<MemoryEntry>>,
}

impl MemoryStore {
    pub fn new(owner: impl Into<String>, db: SwitchboardDb, config: MemoryConfig) -> Self {
        Self {
            owner: owner.into(),
            db,
            config,
            short_term: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Record a memory. Never propagates failures to the caller.
    ///
    /// Conversation entries land in the short-term buffer; overflowing the
    /// buffer triggers consolidation. Any entry important enough also goes
    /// straight to long-term storage.
    pub async fn add_memory(
        &self,
        content: impl Into<String>,
        memory_type: MemoryType,
        metadata: serde_json::Value,
        importance: f64,
    ) -> bool {
        let entry = self.make_entry(content.into(), memory_type, metadata, importance);

        // Mutate the buffer and derive the consolidation product under the
        // lock; persistence happens after it is released.
        let consolidated = {
            let mut buffer = self.short_term.lock();
            if memory_type == MemoryType::Conversation {
                buffer.push(entry.clone());
                if buffer.len() > self.config.short_term_cap {
                    Some(self.consolidate(&mut buffer))
                } else {
                    None
                }
            } else {
                None
            }
        };

        let mut ok = true;

        if let Some(summary) = consolidated {
            debug!(
                owner = %self.owner,
                importance = summary.importance,
                "consolidated short-term memory"
            );
            if summary.importance > self.config.long_term_threshold {
                ok &= self.persist(&summary).await;
            }
        }

        if entry.importance > self.config.long_term_threshold {
            ok &= self.persist(&entry).await;
        }

        ok
    }

    /// Most recent entries, newest first, optionally filtered by type.
    ///
    /// Merges the short-term buffer with long-term rows, deduplicated by id.
    pub async fn get_recent(&self, memory_type: Option<MemoryType>, limit: usize) -> Vec<MemoryEntry> {
        let mut entries: Vec<MemoryEntry> = {
            let buffer = self.short_term.lock();
            buffer
                .iter()
                .filter(|entry| memory_type.is_none_or(|t| entry.memory_type == t))
                .cloned()
                .collect()
        };

        match memory_queries::recent_entries(self.db.pool(), &self.owner, memory_type, limit as i64)
            .await
        {
            Ok(stored) => {
                for row in stored {
                    if !entries.iter().any(|entry| entry.id == row.id) {
                        entries.push(row);
                    }
                }
            }
            Err(err) => warn!(owner = %self.owner, "long-term memory read failed: {err}"),
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    /// Literal substring search, newest first. Not semantic search.
    pub async fn search(&self, query: &str, memory_type: Option<MemoryType>) -> Vec<MemoryEntry> {
        let mut entries: Vec<MemoryEntry> = {
            let buffer = self.short_term.lock();
            buffer
                .iter()
                .filter(|entry| {
                    entry.content.contains(query)
                        && memory_type.is_none_or(|t| entry.memory_type == t)
                })
                .cloned()
                .collect()
        };

        match memory_queries::search_entries(self.db.pool(), &self.owner, query, memory_type).await
        {
            Ok(stored) => {
                for row in stored {
                    if !entries.iter().any(|entry| entry.id == row.id) {
                        entries.push(row);
                    }
                }
            }
            Err(err) => warn!(owner = %self.owner, "long-term memory search failed: {err}"),
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    /// Entries most relevant to a query.
    ///
    /// Short-term entries score by lexical word overlap; long-term entries
    /// arrive ranked by importance then recency. The merged set re-sorts by
    /// `(relevance, importance)` descending and truncates to `limit`.
    pub async fn get_relevant(&self, query: &str, limit: usize) -> Vec<MemoryEntry> {
        let mut candidates: Vec<MemoryEntry> = {
            let buffer = self.short_term.lock();
            buffer.clone()
        };

        match memory_queries::top_entries(self.db.pool(), &self.owner, limit as i64).await {
            Ok(stored) => {
                for row in stored {
                    if !candidates.iter().any(|entry| entry.id == row.id) {
                        candidates.push(row);
                    }
                }
            }
            Err(err) => warn!(owner = %self.owner, "long-term memory read failed: {err}"),
        }

        candidates.sort_by(|a, b| {
            let score_a = (relevance(&a.content, query), a.importance);
            let score_b = (relevance(&b.content, query), b.importance);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        candidates
    }

    /// Number of entries currently in the short-term buffer.
    pub fn short_term_len(&self) -> usize {
        self.short_term.lock().len()
    }

    /// Fold the newest entries into one consolidated summary and trim the
    /// buffer. The summary's importance grows with buffer pressure, capped
    /// at 0.8, and consolidated entries are never re-consolidated.
    fn consolidate(&self, buffer: &mut Vec<MemoryEntry>) -> MemoryEntry {
        let window = self.config.consolidate_window.min(buffer.len());
        let summary: String = buffer[buffer.len() - window..]
            .iter()
            .map(|entry| entry.content.as_str())
            .collect::<Vec<&str>>()
            .join("\n");
        let importance = (buffer.len() as f64 * 0.1).min(0.8);

        let keep_from = buffer.len().saturating_sub(self.config.short_term_keep);
        buffer.drain(..keep_from);

        self.make_entry(
            summary,
            MemoryType::Consolidated,
            serde_json::json!({ "source": "short_term_consolidation" }),
            importance,
        )
    }

    async fn persist(&self, entry: &MemoryEntry) -> bool {
        match memory_queries::insert_entry(self.db.pool(), entry).await {
            Ok(()) => true,
            Err(err) => {
                warn!(owner = %self.owner, "long-term memory write failed: {err}");
                false
            }
        }
    }

    fn make_entry(
        &self,
        content: String,
        memory_type: MemoryType,
        metadata: serde_json::Value,
        importance: f64,
    ) -> MemoryEntry {
        MemoryEntry {
            id: MemoryId::generate().into_inner(),
            owner: self.owner.clone(),
            content,
            memory_type,
            metadata: Json(metadata),
            importance,
            created_at: Utc::now(),
        }
    }
}

/// Lexical word-overlap score: `|words(a) ∩ words(b)| / max(|words(a)|, |words(b)|)`.
fn relevance(content: &str, query: &str) -> f64 {
    let content_words: std::collections::HashSet<String> = content
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();
    let query_words: std::collections::HashSet<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();

    let larger = content_words.len().max(query_words.len());
    if larger == 0 {
        return 0.0;
    }
    let overlap = content_words.intersection(&query_words).count();
    overlap as f64 / larger as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn store() -> MemoryStore {
        let db = SwitchboardDb::open_in_memory().await.unwrap();
        MemoryStore::new("orchestrator", db, MemoryConfig::default())
    }

    #[tokio::test]
    async fn overflow_consolidates_and_trims_buffer() {
        let store = store().await;

        // Fill to the cap plus the overflow add
        for i in 0..11 {
            let ok = store
                .add_memory(
                    format!("turn {i}"),
                    MemoryType::Conversation,
                    serde_json::json!({}),
                    0.0,
                )
                .await;
            assert!(ok);
        }

        // Buffer trimmed to the configured keep size
        assert_eq!(store.short_term_len(), 5);

        // Exactly one consolidated entry, importance = min(11 * 0.1, 0.8)
        let consolidated = store
            .get_recent(Some(MemoryType::Consolidated), 10)
            .await;
        assert_eq!(consolidated.len(), 1);
        assert!((consolidated[0].importance - 0.8).abs() < f64::EPSILON);

        // The summary folds the newest five turns
        assert!(consolidated[0].content.contains("turn 10"));
        assert!(consolidated[0].content.contains("turn 6"));
        assert!(!consolidated[0].content.contains("turn 5"));
    }

    #[tokio::test]
    async fn important_entries_go_straight_to_long_term() {
        let store = store().await;
        store
            .add_memory(
                "the user prefers terse answers",
                MemoryType::System,
                serde_json::json!({}),
                0.9,
            )
            .await;

        let stored = memory_queries::recent_entries(store.db.pool(), "orchestrator", None, 10)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        // System entries never enter the conversation buffer
        assert_eq!(store.short_term_len(), 0);
    }

    #[tokio::test]
    async fn unimportant_entries_stay_short_term_only() {
        let store = store().await;
        store
            .add_memory("hello", MemoryType::Conversation, serde_json::json!({}), 0.1)
            .await;

        assert_eq!(store.short_term_len(), 1);
        let stored = memory_queries::recent_entries(store.db.pool(), "orchestrator", None, 10)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn relevance_ranking_prefers_higher_overlap() {
        let store = store().await;
        store
            .add_memory(
                "the invoice for march is overdue",
                MemoryType::Conversation,
                serde_json::json!({}),
                0.0,
            )
            .await;
        store
            .add_memory(
                "completely unrelated chatter about weather",
                MemoryType::Conversation,
                serde_json::json!({}),
                0.0,
            )
            .await;

        let relevant = store.get_relevant("is the march invoice overdue", 1).await;
        assert_eq!(relevant.len(), 1);
        assert!(relevant[0].content.contains("invoice"));
    }

    #[tokio::test]
    async fn search_matches_substring_across_tiers() {
        let store = store().await;
        store
            .add_memory("short term note", MemoryType::Conversation, serde_json::json!({}), 0.0)
            .await;
        store
            .add_memory("long term note", MemoryType::System, serde_json::json!({}), 0.9)
            .await;

        let hits = store.search("note", None).await;
        assert_eq!(hits.len(), 2);

        let filtered = store.search("note", Some(MemoryType::System)).await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].content, "long term note");
    }

    #[test]
    fn overlap_formula_matches_definition() {
        // words(a) = {a, b, c}, words(q) = {a, b} -> 2 / 3
        let score = relevance("a b c", "a b");
        assert!((score - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(relevance("", ""), 0.0);
    }
}
