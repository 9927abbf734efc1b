use ufdr_core::models::LocationRecord;

use crate::time::parse_timestamp;

use super::ModelNode;

/// Parse one `Location` model.
///
/// Coordinates arrive either as scalar fields or in a nested
/// `Coordinate` sub-model; address components in a nested
/// `StreetAddress`. A record with neither coordinates nor any address
/// component is dropped.
pub fn parse_location(node: &ModelNode) -> Option<LocationRecord> {
    let model_id = node.id.clone()?;

    let coordinate = node.children_of_type("Coordinate").next();
    let latitude = node
        .field_f64("Latitude")
        .or_else(|| coordinate.and_then(|c| c.field_f64("Latitude")));
    let longitude = node
        .field_f64("Longitude")
        .or_else(|| coordinate.and_then(|c| c.field_f64("Longitude")));
    let altitude = node
        .field_f64("Altitude")
        .or_else(|| coordinate.and_then(|c| c.field_f64("Elevation")));

    let address = node.children_of_type("StreetAddress").next();
    let street = address.and_then(|a| a.field("Street1")).map(str::to_string);
    let city = address.and_then(|a| a.field("City")).map(str::to_string);
    let state = address.and_then(|a| a.field("State")).map(str::to_string);
    let country = address.and_then(|a| a.field("Country")).map(str::to_string);
    let postal_code = address
        .and_then(|a| a.field("PostalCode"))
        .map(str::to_string);

    let has_coords = latitude.is_some() && longitude.is_some();
    let has_address = street.is_some()
        || city.is_some()
        || state.is_some()
        || country.is_some()
        || postal_code.is_some();
    if !has_coords && !has_address {
        return None;
    }

    let (timestamp_ms, timestamp) = node
        .field("TimeStamp")
        .and_then(parse_timestamp)
        .map(|(ms, dt)| (Some(ms), Some(dt)))
        .unwrap_or((None, None));

    Some(LocationRecord {
        model_id,
        source_app: node.field("Source").map(str::to_string),
        latitude,
        longitude,
        altitude,
        accuracy: node.field_f64("Accuracy"),
        bearing: node.field_f64("Bearing"),
        speed: node.field_f64("Speed"),
        location_type: node.field("Type").map(str::to_string),
        category: node.field("Category").map(str::to_string),
        street,
        city,
        state,
        country,
        postal_code,
        timestamp_ms,
        timestamp,
        platform: node.field("Platform").map(str::to_string),
        confidence: node.field("Confidence").map(str::to_string),
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
    fn coordinates_from_nested_model() {
        let xml = r#"<root><model type="Location" id="l1">
            <field name="Source"><value>Maps</value></field>
            <field name="TimeStamp"><value>2023-02-02T12:00:00Z</value></field>
            <modelField name="Position">
              <model type="Coordinate">
                <field name="Latitude"><value>52.5200</value></field>
                <field name="Longitude"><value>13.4050</value></field>
                <field name="Elevation"><value>34.0</value></field>
              </model>
            </modelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        let loc = &records.locations[0];
        assert_eq!(loc.latitude, Some(52.52));
        assert_eq!(loc.longitude, Some(13.405));
        assert_eq!(loc.altitude, Some(34.0));
    }

    #[test]
    fn address_only_location_is_kept() {
        let xml = r#"<root><model type="Location" id="l2">
            <modelField name="Address">
              <model type="StreetAddress">
                <field name="City"><value>Berlin</value></field>
                <field name="Country"><value>Germany</value></field>
              </model>
            </modelField>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert_eq!(records.locations.len(), 1);
        assert_eq!(records.locations[0].city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn location_without_coordinates_or_address_dropped() {
        let xml = r#"<root><model type="Location" id="l3">
            <field name="Source"><value>Maps</value></field>
        </model></root>"#;
        let records = parse_report(Cursor::new(xml)).unwrap();
        assert!(records.locations.is_empty());
    }
}
