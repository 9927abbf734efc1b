//! Generic representation of one `model` subtree from the evidence tree.

use std::collections::HashMap;

/// One fully accumulated `model` element with its scalar fields, multi
/// fields, and nested child models. Namespace prefixes are stripped
/// before anything lands here.
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    pub model_type: String,
    pub id: Option<String>,
    pub deleted_state: Option<String>,
    pub decoding_confidence: Option<String>,
    /// `field` children: name -> value text.
    pub fields: HashMap<String, String>,
    /// `multiField` children: name -> value texts.
    pub multi_fields: HashMap<String, Vec<String>>,
    /// `modelField` / `multiModelField` children: (field name, child model).
    pub children: Vec<(String, ModelNode)>,
}

impl ModelNode {
    pub fn new(model_type: &str) -> Self {
        ModelNode {
            model_type: model_type.to_string(),
            ..Default::default()
        }
    }

    /// Scalar field value, empty strings treated as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn multi_field(&self, name: &str) -> Vec<String> {
        self.multi_fields.get(name).cloned().unwrap_or_default()
    }

    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.field(name).map(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(|v| v.parse::<f64>().ok())
    }

    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(|v| v.parse::<i64>().ok())
    }

    /// Child models under a given field name.
    pub fn children_named<'a>(&'a self, field_name: &'a str) -> impl Iterator<Item = &'a ModelNode> {
        self.children
            .iter()
            .filter(move |(name, _)| name == field_name)
            .map(|(_, node)| node)
    }

    /// Child models of a given model type, under any field name.
    pub fn children_of_type<'a>(&'a self, model_type: &'a str) -> impl Iterator<Item = &'a ModelNode> {
        self.children
            .iter()
            .filter(move |(_, node)| node.model_type == model_type)
            .map(|(_, node)| node)
    }

    /// Lossless JSON rendering of the subtree, kept alongside the
    /// normalized record.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("type".into(), self.model_type.clone().into());
        if let Some(ref id) = self.id {
            obj.insert("id".into(), id.clone().into());
        }
        if let Some(ref ds) = self.deleted_state {
            obj.insert("deleted_state".into(), ds.clone().into());
        }
        if let Some(ref dc) = self.decoding_confidence {
            obj.insert("decoding_confidence".into(), dc.clone().into());
        }
        if !self.fields.is_empty() {
            let fields: serde_json::Map<String, serde_json::Value> = self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into()))
                .collect();
            obj.insert("fields".into(), fields.into());
        }
        if !self.multi_fields.is_empty() {
            let multi: serde_json::Map<String, serde_json::Value> = self
                .multi_fields
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            obj.insert("multi_fields".into(), multi.into());
        }
        if !self.children.is_empty() {
            let children: Vec<serde_json::Value> = self
                .children
                .iter()
                .map(|(name, node)| serde_json::json!({ "field": name, "model": node.to_json() }))
                .collect();
            obj.insert("children".into(), children.into());
        }
        obj.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_values_are_absent() {
        let mut node = ModelNode::new("Call");
        node.fields.insert("Status".into(), "".into());
        node.fields.insert("Direction".into(), "Incoming".into());
        assert_eq!(node.field("Status"), None);
        assert_eq!(node.field("Direction"), Some("Incoming"));
    }

    #[test]
    fn typed_accessors() {
        let mut node = ModelNode::new("Location");
        node.fields.insert("Latitude".into(), "48.8584".into());
        node.fields.insert("VisitCount".into(), "12".into());
        node.fields.insert("IsOwner".into(), "True".into());
        assert_eq!(node.field_f64("Latitude"), Some(48.8584));
        assert_eq!(node.field_i64("VisitCount"), Some(12));
        assert_eq!(node.field_bool("IsOwner"), Some(true));
    }
}
