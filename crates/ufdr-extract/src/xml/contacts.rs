use ufdr_core::models::{ContactEntry, ContactRecord};

use crate::time::parse_timestamp;

use super::ModelNode;

/// Entry model types the vendor uses for ways of reaching a contact.
const ENTRY_TYPES: &[&str] = &[
    "PhoneNumber",
    "EmailAddress",
    "UserID",
    "WebAddress",
    "InstantMessengerID",
];

/// Parse one `Contact` model. A contact with neither a name nor any
/// entry carries no information and is dropped.
pub fn parse_contact(node: &ModelNode) -> Option<ContactRecord> {
    let model_id = node.id.clone()?;

    let entries: Vec<ContactEntry> = node
        .children
        .iter()
        .map(|(_, child)| child)
        .filter(|child| ENTRY_TYPES.contains(&child.model_type.as_str()))
        .filter_map(parse_entry)
        .collect();

    let name = node.field("Name").map(str::to_string);
    if name.is_none() && entries.is_empty() {
        return None;
    }

    let (created_ms, created_at) = node
        .field("TimeCreated")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    Some(ContactRecord {
        model_id,
        source_app: node.field("Source").map(str::to_string),
        service_identifier: node.field("ServiceIdentifier").map(str::to_string),
        name,
        account: node.field("Account").map(str::to_string),
        contact_type: node.field("Type").map(str::to_string),
        group: node.field("Group").map(str::to_string),
        created_ms,
        created_at,
        notes: node.multi_field("Notes"),
        interaction_statuses: node.multi_field("InteractionStatuses"),
        user_tags: node.multi_field("UserTags"),
        entries,
        deleted_state: node.deleted_state.clone(),
        decoding_confidence: node.decoding_confidence.clone(),
        raw: node.to_json(),
    })
}

/// Entries without a value are dropped; the value is the entry.
fn parse_entry(node: &ModelNode) -> Option<ContactEntry> {
    let value = node.field("Value")?.to_string();
    Some(ContactEntry {
        entry_type: node.model_type.clone(),
        category: node.field("Category").map(str::to_string),
        value,
        domain: node.field("Domain").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use crate::xml::parse_report;
    use std::io::Cursor;

    #[test]
    fn contact_with_phone_and_email_entries() {
        let xml = r#"<root><model type="Contact" id="ct-1">
            <field name="Source"><value>Android Contacts</value></field>
            <field name="Name"><value>Dana</value></field>
            <multiModelField name="Entries">
              <model type="PhoneNumber">
                <field name="Category"><value>Mobile</value></field>
                <field name="Value"><value>+49301234</value></field>
              </model>
              <model type="EmailAddress">
                <field name="Value"><value>dana@example.org</value></field>
                <field name="Domain"><value>example.org</value></field>
              </model>
            </multiModelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.contacts.len(), 1);
        let contact = &records.contacts[0];
        assert_eq!(contact.entries.len(), 2);
        assert_eq!(contact.entries[0].entry_type, "PhoneNumber");
        assert_eq!(contact.entries[0].value, "+49301234");
        assert_eq!(contact.entries[1].entry_type, "EmailAddress");
        assert_eq!(contact.entries[1].domain.as_deref(), Some("example.org"));
    }

    #[test]
    fn contact_without_name_or_entries_dropped() {
        let xml = r#"<root><model type="Contact" id="ct-2">
            <field name="Source"><value>SIM</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert!(records.contacts.is_empty());
    }

    #[test]
    fn entry_without_value_dropped_but_contact_kept() {
        let xml = r#"<root><model type="Contact" id="ct-3">
            <field name="Name"><value>Eve</value></field>
            <multiModelField name="Entries">
              <model type="PhoneNumber">
                <field name="Category"><value>Home</value></field>
              </model>
            </multiModelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.contacts.len(), 1);
        assert!(records.contacts[0].entries.is_empty());
    }
}
