use ufdr_core::models::CallRecord;

use crate::time::{parse_duration_seconds, parse_timestamp};

use super::{convenience_parties, parse_parties, ModelNode};

/// Parse one `Call` model. The vendor id is the natural key; calls
/// without one cannot be deduplicated and are dropped.
pub fn parse_call(node: &ModelNode) -> Option<CallRecord> {
    let model_id = node.id.clone()?;

    let (timestamp_ms, timestamp) = node
        .field("TimeStamp")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    let duration_raw = node.field("Duration").map(str::to_string);
    let duration_seconds = duration_raw.as_deref().and_then(parse_duration_seconds);

    let parties = parse_parties(node);
    let (from, to) = convenience_parties(&parties);
    let (from_identifier, from_name) = from
        .map(|p| (p.identifier.clone(), p.name.clone()))
        .unwrap_or((None, None));
    let (to_identifier, to_name) = to
        .map(|p| (p.identifier.clone(), p.name.clone()))
        .unwrap_or((None, None));

    Some(CallRecord {
        model_id,
        source_app: node.field("Source").map(str::to_string),
        direction: node.field("Direction").map(str::to_string),
        call_type: node.field("Type").map(str::to_string),
        status: node.field("Status").map(str::to_string),
        timestamp_ms,
        timestamp,
        duration_raw,
        duration_seconds,
        country_code: node.field("CountryCode").map(str::to_string),
        network_code: node.field("NetworkCode").map(str::to_string),
        account: node.field("Account").map(str::to_string),
        is_video_call: node.field_bool("VideoCall"),
        parties,
        from_identifier,
        from_name,
        to_identifier,
        to_name,
        deleted_state: node.deleted_state.clone(),
        decoding_confidence: node.decoding_confidence.clone(),
        raw: node.to_json(),
    })
}

#[cfg(test)]
mod tests {
    use crate::xml::parse_report;
    use std::io::Cursor;

    #[test]
    fn call_with_duration_and_parties() {
        let xml = r#"<root><model type="Call" id="c-77" deleted_state="Intact">
            <field name="Source"><value>Phone</value></field>
            <field name="Direction"><value>Outgoing</value></field>
            <field name="TimeStamp"><value>2022-03-04T12:30:00Z</value></field>
            <field name="Duration"><value>00:03:20</value></field>
            <field name="VideoCall"><value>false</value></field>
            <modelField name="From">
              <model type="Party">
                <field name="Identifier"><value>+1555000</value></field>
                <field name="Name"><value>Owner</value></field>
                <field name="IsPhoneOwner"><value>true</value></field>
              </model>
            </modelField>
            <multiModelField name="To">
              <model type="Party">
                <field name="Identifier"><value>+1555999</value></field>
              </model>
            </multiModelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        let call = &records.calls[0];
        assert_eq!(call.model_id, "c-77");
        assert_eq!(call.duration_seconds, Some(200));
        assert_eq!(call.is_video_call, Some(false));
        assert_eq!(call.from_identifier.as_deref(), Some("+1555000"));
        assert_eq!(call.to_identifier.as_deref(), Some("+1555999"));
        assert!(call.parties.iter().any(|p| p.is_phone_owner));
    }

    #[test]
    fn call_without_id_is_dropped() {
        let xml = r#"<root><model type="Call">
            <field name="Direction"><value>Incoming</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert!(records.calls.is_empty());
    }

    #[test]
    fn unparseable_timestamp_is_skipped_not_fatal() {
        let xml = r#"<root><model type="Call" id="c1">
            <field name="TimeStamp"><value>yesterday-ish</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.calls.len(), 1);
        assert_eq!(records.calls[0].timestamp_ms, None);
    }
}
