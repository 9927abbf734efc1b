//! Evidence-tree extraction.
//!
//! One streaming pass over the document collects the six domains at
//! once; each model subtree is dispatched by its vendor type through a
//! closed [`ModelKind`] lookup and parsed by exactly one function.
//! Records missing their minimum identifying field are dropped silently
//! and parsing continues with the next sibling.

pub mod apps;
pub mod browsing;
pub mod calls;
pub mod contacts;
pub mod locations;
pub mod messages;
pub mod node;
pub mod reader;

use std::io::BufRead;

use ufdr_core::models::{
    BrowsingEntry, CallRecord, ContactRecord, InstalledApp, LocationRecord, MessageRecord,
};
use ufdr_core::AppError;

pub use node::ModelNode;
pub use reader::stream_models;

/// Vendor model types this pipeline understands at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    InstalledApplication,
    Call,
    InstantMessage,
    Contact,
    VisitedPage,
    SearchedItem,
    WebBookmark,
    Location,
}

impl ModelKind {
    pub fn from_type(model_type: &str) -> Option<Self> {
        Some(match model_type {
            "InstalledApplication" => ModelKind::InstalledApplication,
            "Call" => ModelKind::Call,
            "InstantMessage" => ModelKind::InstantMessage,
            "Contact" => ModelKind::Contact,
            "VisitedPage" => ModelKind::VisitedPage,
            "SearchedItem" => ModelKind::SearchedItem,
            "WebBookmark" => ModelKind::WebBookmark,
            "Location" => ModelKind::Location,
            _ => return None,
        })
    }
}

/// Everything one pass over the evidence tree produced, prior to dedup.
#[derive(Debug, Default)]
pub struct DomainRecords {
    pub apps: Vec<InstalledApp>,
    pub calls: Vec<CallRecord>,
    pub messages: Vec<MessageRecord>,
    pub locations: Vec<LocationRecord>,
    pub contacts: Vec<ContactRecord>,
    pub browsing: Vec<BrowsingEntry>,
}

/// Parse a whole evidence tree in one streaming pass.
///
/// Fails only when the document itself is unreadable; individual
/// malformed records are skipped.
pub fn parse_report<R: BufRead>(reader: R) -> Result<DomainRecords, AppError> {
    let mut records = DomainRecords::default();

    stream_models(
        reader,
        |model_type| ModelKind::from_type(model_type).is_some(),
        |node| {
            let Some(kind) = ModelKind::from_type(&node.model_type) else {
                return;
            };
            match kind {
                ModelKind::InstalledApplication => {
                    if let Some(app) = apps::parse_app(&node) {
                        records.apps.push(app);
                    }
                }
                ModelKind::Call => {
                    if let Some(call) = calls::parse_call(&node) {
                        records.calls.push(call);
                    }
                }
                ModelKind::InstantMessage => {
                    if let Some(msg) = messages::parse_message(&node) {
                        records.messages.push(msg);
                    }
                }
                ModelKind::Contact => {
                    if let Some(contact) = contacts::parse_contact(&node) {
                        records.contacts.push(contact);
                    }
                }
                ModelKind::VisitedPage | ModelKind::SearchedItem | ModelKind::WebBookmark => {
                    if let Some(entry) = browsing::parse_browsing(&node) {
                        records.browsing.push(entry);
                    }
                }
                ModelKind::Location => {
                    if let Some(loc) = locations::parse_location(&node) {
                        records.locations.push(loc);
                    }
                }
            }
        },
    )?;

    tracing::info!(
        apps = records.apps.len(),
        calls = records.calls.len(),
        messages = records.messages.len(),
        locations = records.locations.len(),
        contacts = records.contacts.len(),
        browsing = records.browsing.len(),
        "evidence tree parsed"
    );

    Ok(records)
}

/// Parse the Party sub-models of a call or message, regardless of
/// whether they arrive under `From`, `To`, or a combined `Parties` field.
pub(crate) fn parse_parties(node: &ModelNode) -> Vec<ufdr_core::models::Party> {
    use ufdr_core::models::{Party, PartyRole};

    let mut parties = Vec::new();
    for (field, child) in &node.children {
        if child.model_type != "Party" {
            continue;
        }
        let identifier = child.field("Identifier").map(str::to_string);
        let name = child.field("Name").map(str::to_string);
        if identifier.is_none() && name.is_none() {
            continue;
        }
        // An explicit Role field wins; otherwise the containing field
        // name carries the role.
        let role = child
            .field("Role")
            .and_then(PartyRole::parse)
            .or_else(|| PartyRole::parse(field));
        let Some(role) = role else { continue };
        parties.push(Party {
            role,
            identifier,
            name,
            is_phone_owner: child.field_bool("IsPhoneOwner").unwrap_or(false),
        });
    }
    parties
}

/// First From-role and first To-role party, independent of node order.
pub(crate) fn convenience_parties(
    parties: &[ufdr_core::models::Party],
) -> (
    Option<&ufdr_core::models::Party>,
    Option<&ufdr_core::models::Party>,
) {
    use ufdr_core::models::PartyRole;
    let from = parties.iter().find(|p| p.role == PartyRole::From);
    let to = parties.iter().find(|p| p.role == PartyRole::To);
    (from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn unknown_model_types_are_ignored() {
        let xml = r#"<root>
            <model type="SomethingVendorSpecific" id="x">
              <field name="A"><value>1</value></field>
            </model>
            <model type="Call" id="c1">
              <field name="Direction"><value>Incoming</value></field>
            </model>
        </root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.calls.len(), 1);
        assert!(records.apps.is_empty());
    }

    #[test]
    fn party_roles_resolve_from_field_name_or_role_field() {
        let xml = r#"<root><model type="Call" id="c1">
            <multiModelField name="Parties">
              <model type="Party"><field name="Role"><value>To</value></field>
                <field name="Identifier"><value>+1222</value></field></model>
              <model type="Party"><field name="Role"><value>From</value></field>
                <field name="Identifier"><value>+1111</value></field></model>
            </multiModelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        let call = &records.calls[0];
        assert_eq!(call.from_identifier.as_deref(), Some("+1111"));
        assert_eq!(call.to_identifier.as_deref(), Some("+1222"));
    }
}
