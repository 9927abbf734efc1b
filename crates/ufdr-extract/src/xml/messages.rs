use ufdr_core::models::{Attachment, MessageRecord};

use crate::time::parse_timestamp;

use super::{convenience_parties, parse_parties, ModelNode};

/// Parse one `InstantMessage` model. Messages need both a vendor id and
/// a source application; without the app there is no way to interpret
/// the thread.
pub fn parse_message(node: &ModelNode) -> Option<MessageRecord> {
    let model_id = node.id.clone()?;
    let source_app = node
        .field("Source")
        .or_else(|| node.field("SourceApplication"))?
        .to_string();

    let (timestamp_ms, timestamp) = node
        .field("TimeStamp")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    let parties = parse_parties(node);
    let (from, to) = convenience_parties(&parties);
    let (from_identifier, from_name) = from
        .map(|p| (p.identifier.clone(), p.name.clone()))
        .unwrap_or((None, None));
    let (to_identifier, to_name) = to
        .map(|p| (p.identifier.clone(), p.name.clone()))
        .unwrap_or((None, None));

    let attachments: Vec<Attachment> = node
        .children_of_type("Attachment")
        .map(parse_attachment)
        .collect();

    Some(MessageRecord {
        model_id,
        source_app,
        body: node.field("Body").map(str::to_string),
        message_type: node.field("Type").map(str::to_string),
        platform: node.field("Platform").map(str::to_string),
        timestamp_ms,
        timestamp,
        parties,
        attachments,
        from_identifier,
        from_name,
        to_identifier,
        to_name,
        deleted_state: node.deleted_state.clone(),
        decoding_confidence: node.decoding_confidence.clone(),
        raw: node.to_json(),
    })
}

fn parse_attachment(node: &ModelNode) -> Attachment {
    Attachment {
        attachment_type: node.field("Type").map(str::to_string),
        filename: node.field("Filename").map(str::to_string),
        local_path: node.field("attachment_extracted_path").map(str::to_string),
        size: node.field_i64("FileSize"),
        content_type: node.field("ContentType").map(str::to_string),
    }
}
