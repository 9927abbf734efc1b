use sqlx::{PgPool, QueryBuilder};
use ufdr_core::models::BrowsingEntry;
use ufdr_core::AppError;
use uuid::Uuid;

/// Batch loader for browsing history, searches, and bookmarks.
#[derive(Clone)]
pub struct BrowsingLoader {
    pool: PgPool,
}

impl BrowsingLoader {
    pub const BATCH: usize = 100;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_batch(
        &self,
        upload_id: Uuid,
        entries: &[BrowsingEntry],
    ) -> Result<(), AppError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            r#"INSERT INTO browsing_entries (
                upload_id, model_id, entry_kind, source_browser, url, title,
                search_query, bookmark_path, last_visited_ms, last_visited,
                visit_count, url_cache_file,
                deleted_state, decoding_confidence, raw
            ) "#,
        );
        qb.push_values(entries, |mut b, entry| {
            b.push_bind(upload_id)
                .push_bind(&entry.model_id)
                .push_bind(entry.entry_kind.as_str())
                .push_bind(&entry.source_browser)
                .push_bind(&entry.url)
                .push_bind(&entry.title)
                .push_bind(&entry.search_query)
                .push_bind(&entry.bookmark_path)
                .push_bind(entry.last_visited_ms)
                .push_bind(entry.last_visited)
                .push_bind(entry.visit_count)
                .push_bind(&entry.url_cache_file)
                .push_bind(&entry.deleted_state)
                .push_bind(&entry.decoding_confidence)
                .push_bind(&entry.raw);
        });
        qb.push(
            r#" ON CONFLICT (upload_id, model_id) DO UPDATE SET
                entry_kind = EXCLUDED.entry_kind,
                source_browser = COALESCE(EXCLUDED.source_browser, browsing_entries.source_browser),
                url = COALESCE(EXCLUDED.url, browsing_entries.url),
                title = COALESCE(EXCLUDED.title, browsing_entries.title),
                search_query = COALESCE(EXCLUDED.search_query, browsing_entries.search_query),
                bookmark_path = COALESCE(EXCLUDED.bookmark_path, browsing_entries.bookmark_path),
                last_visited_ms = COALESCE(EXCLUDED.last_visited_ms, browsing_entries.last_visited_ms),
                last_visited = COALESCE(EXCLUDED.last_visited, browsing_entries.last_visited),
                visit_count = COALESCE(EXCLUDED.visit_count, browsing_entries.visit_count),
                url_cache_file = COALESCE(EXCLUDED.url_cache_file, browsing_entries.url_cache_file),
                deleted_state = COALESCE(EXCLUDED.deleted_state, browsing_entries.deleted_state),
                decoding_confidence = COALESCE(EXCLUDED.decoding_confidence, browsing_entries.decoding_confidence),
                raw = EXCLUDED.raw,
                updated_at = NOW()"#,
        );

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}
