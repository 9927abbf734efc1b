use ufdr_core::models::InstalledApp;

use crate::time::parse_timestamp;

use super::ModelNode;

/// Parse one `InstalledApplication` model. Apps without an identifier
/// are dropped; there is nothing to key them on.
pub fn parse_app(node: &ModelNode) -> Option<InstalledApp> {
    let app_identifier = node.field("Identifier")?.to_string();

    let (install_ts, install_time) = node
        .field("PurchaseDate")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));
    let (last_launched_ts, last_launched) = node
        .field("LastLaunched")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    Some(InstalledApp {
        app_identifier,
        name: node.field("Name").map(str::to_string),
        version: node.field("Version").map(str::to_string),
        guid: node.field("AppGUID").map(str::to_string),
        install_ts,
        install_time,
        last_launched_ts,
        last_launched,
        decoding_status: node.field("DecodingStatus").map(str::to_string),
        is_emulatable: node.field_bool("IsEmulatable"),
        operation_mode: node.field("OperationMode").map(str::to_string),
        permissions: node.multi_field("Permissions"),
        categories: node.multi_field("Categories"),
        directory_paths: node.multi_field("AssociatedDirectoryPaths"),
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
    fn app_without_identifier_dropped_siblings_survive() {
        let xml = r#"<root>
            <model type="InstalledApplication" id="a1">
              <field name="Name"><value>Mystery</value></field>
            </model>
            <model type="InstalledApplication" id="a2">
              <field name="Identifier"><value>com.example.keeper</value></field>
              <field name="Name"><value>Keeper</value></field>
              <field name="Version"><value>2.1</value></field>
              <multiField name="Permissions">
                <value>CAMERA</value>
                <value>LOCATION</value>
              </multiField>
            </model>
        </root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.apps.len(), 1);
        let app = &records.apps[0];
        assert_eq!(app.app_identifier, "com.example.keeper");
        assert_eq!(app.name.as_deref(), Some("Keeper"));
        assert_eq!(app.permissions, vec!["CAMERA", "LOCATION"]);
    }

    #[test]
    fn install_date_parses_to_epoch_and_datetime() {
        let xml = r#"<root><model type="InstalledApplication" id="a">
            <field name="Identifier"><value>com.x</value></field>
            <field name="PurchaseDate"><value>2021-06-15T10:00:00+00:00</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        let app = &records.apps[0];
        assert_eq!(app.install_ts, Some(1_623_751_200_000));
        assert!(app.install_time.is_some());
    }
}
