use ufdr_core::models::{BrowsingEntry, BrowsingKind};

use crate::time::parse_timestamp;

use super::ModelNode;

/// Parse one `VisitedPage`, `SearchedItem`, or `WebBookmark` model into
/// the common browsing shape.
///
/// Visited pages and bookmarks need at least a url or a title; searches
/// need the query text.
pub fn parse_browsing(node: &ModelNode) -> Option<BrowsingEntry> {
    let model_id = node.id.clone()?;

    let kind = match node.model_type.as_str() {
        "VisitedPage" => BrowsingKind::VisitedPage,
        "SearchedItem" => BrowsingKind::SearchedItem,
        "WebBookmark" => BrowsingKind::WebBookmark,
        _ => return None,
    };

    let url = node.field("Url").map(str::to_string);
    let title = node.field("Title").map(str::to_string);
    // Searches carry their query in Value.
    let search_query = node.field("Value").map(str::to_string);

    match kind {
        BrowsingKind::SearchedItem => search_query.as_ref()?,
        _ => url.as_ref().or(title.as_ref())?,
    };

    let ts_field = match kind {
        BrowsingKind::VisitedPage => node.field("LastVisited"),
        _ => node.field("TimeStamp"),
    };
    let (last_visited_ms, last_visited) = ts_field
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    Some(BrowsingEntry {
        model_id,
        entry_kind: kind,
        source_browser: node.field("Source").map(str::to_string),
        url,
        title,
        search_query,
        bookmark_path: node.field("Path").map(str::to_string),
        last_visited_ms,
        last_visited,
        visit_count: node.field_i64("VisitCount"),
        url_cache_file: node.field("UrlCacheFile").map(str::to_string),
        deleted_state: node.deleted_state.clone(),
        decoding_confidence: node.decoding_confidence.clone(),
        raw: node.to_json(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_report;
    use std::io::Cursor;

    #[test]
    fn three_entry_kinds_normalize_to_one_shape() {
        let xml = r#"<root>
            <model type="VisitedPage" id="v1">
              <field name="Source"><value>Chrome</value></field>
              <field name="Url"><value>https://example.com</value></field>
              <field name="LastVisited"><value>2023-05-01T08:00:00Z</value></field>
              <field name="VisitCount"><value>7</value></field>
            </model>
            <model type="SearchedItem" id="s1">
              <field name="Source"><value>Chrome</value></field>
              <field name="Value"><value>tide times dover</value></field>
            </model>
            <model type="WebBookmark" id="b1">
              <field name="Source"><value>Safari</value></field>
              <field name="Title"><value>News</value></field>
              <field name="Path"><value>Favorites/Daily</value></field>
            </model>
        </root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.browsing.len(), 3);
        assert_eq!(records.browsing[0].entry_kind, BrowsingKind::VisitedPage);
        assert_eq!(records.browsing[0].visit_count, Some(7));
        assert_eq!(
            records.browsing[1].search_query.as_deref(),
            Some("tide times dover")
        );
        assert_eq!(
            records.browsing[2].bookmark_path.as_deref(),
            Some("Favorites/Daily")
        );
    }

    #[test]
    fn visited_page_without_url_or_title_dropped() {
        let xml = r#"<root><model type="VisitedPage" id="v2">
            <field name="Source"><value>Chrome</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert!(records.browsing.is_empty());
    }

    #[test]
    fn search_without_query_dropped() {
        let xml = r#"<root><model type="SearchedItem" id="s2">
            <field name="Source"><value>Chrome</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert!(records.browsing.is_empty());
    }
}
