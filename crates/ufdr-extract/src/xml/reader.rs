//! Streaming evidence-tree reader.
//!
//! The document can be many gigabytes; only one top-level `model`
//! subtree is held in memory at a time. Each completed subtree is handed
//! to the sink and dropped before the next one is accumulated.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;
use ufdr_core::AppError;

use super::node::ModelNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Scalar,
    Multi,
    Model,
}

struct Frame {
    node: ModelNode,
    /// Field name this model was entered under, in its parent.
    enter_field: String,
    pending_field: Option<(FieldKind, String)>,
    in_value: bool,
    value_buf: String,
}

/// Stream `model` subtrees out of an evidence tree.
///
/// `wanted` decides which top-level model types start a capture; nested
/// models (parties, attachments, entries) are always captured as
/// children of the model that contains them. Unknown elements and model
/// types are skipped without error.
pub fn stream_models<R, W, S>(reader: R, mut wanted: W, mut sink: S) -> Result<usize, AppError>
where
    R: BufRead,
    W: FnMut(&str) -> bool,
    S: FnMut(ModelNode),
{
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut emitted = 0usize;

    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| AppError::Parse(format!("evidence tree unreadable: {e}")))?;

        match event {
            Event::Start(ref e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"model" => {
                        let model_type = attr(e, b"type").unwrap_or_default();
                        if stack.is_empty() {
                            if !wanted(&model_type) {
                                // Not a domain model; skip the whole subtree.
                                let mut skip_buf = Vec::new();
                                xml.read_to_end_into(e.name(), &mut skip_buf).map_err(|e| {
                                    AppError::Parse(format!("evidence tree unreadable: {e}"))
                                })?;
                                buf.clear();
                                continue;
                            }
                        }
                        let enter_field = stack
                            .last()
                            .and_then(|f| f.pending_field.as_ref())
                            .map(|(_, name)| name.clone())
                            .unwrap_or_default();
                        let mut node = ModelNode::new(&model_type);
                        node.id = attr(e, b"id");
                        node.deleted_state = attr(e, b"deleted_state");
                        node.decoding_confidence = attr(e, b"decoding_confidence");
                        stack.push(Frame {
                            node,
                            enter_field,
                            pending_field: None,
                            in_value: false,
                            value_buf: String::new(),
                        });
                    }
                    b"field" | b"multiField" | b"modelField" | b"multiModelField"
                        if !stack.is_empty() =>
                    {
                        let kind = match local.as_ref() {
                            b"field" => FieldKind::Scalar,
                            b"multiField" => FieldKind::Multi,
                            _ => FieldKind::Model,
                        };
                        let name = attr(e, b"name").unwrap_or_default();
                        if let Some(top) = stack.last_mut() {
                            top.pending_field = Some((kind, name));
                        }
                    }
                    b"value" if !stack.is_empty() => {
                        if let Some(top) = stack.last_mut() {
                            top.in_value = true;
                            top.value_buf.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(top) = stack.last_mut() {
                    if top.in_value {
                        let text = t
                            .unescape()
                            .map_err(|e| AppError::Parse(format!("bad text content: {e}")))?;
                        top.value_buf.push_str(&text);
                    }
                }
            }
            Event::End(ref e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"value" => {
                        if let Some(top) = stack.last_mut() {
                            top.in_value = false;
                            let value = std::mem::take(&mut top.value_buf);
                            match top.pending_field.clone() {
                                Some((FieldKind::Scalar, name)) => {
                                    top.node.fields.insert(name, value);
                                }
                                Some((FieldKind::Multi, name)) => {
                                    top.node.multi_fields.entry(name).or_default().push(value);
                                }
                                _ => {}
                            }
                        }
                    }
                    b"field" | b"multiField" | b"modelField" | b"multiModelField" => {
                        if let Some(top) = stack.last_mut() {
                            top.pending_field = None;
                        }
                    }
                    b"model" => {
                        if let Some(frame) = stack.pop() {
                            match stack.last_mut() {
                                Some(parent) => {
                                    parent.node.children.push((frame.enter_field, frame.node));
                                }
                                None => {
                                    sink(frame.node);
                                    emitted += 1;
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(AppError::Parse(
            "evidence tree ended inside a model element".to_string(),
        ));
    }

    Ok(emitted)
}

fn attr(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<project xmlns="http://example/ns">
  <decodedData>
    <modelType type="Call">
      <model type="Call" id="call-1" deleted_state="Intact">
        <field name="Direction"><value>Incoming</value></field>
        <field name="Duration"><value>00:02:15</value></field>
        <multiModelField name="Parties">
          <model type="Party" id="p-1">
            <field name="Role"><value>From</value></field>
            <field name="Identifier"><value>+15551234</value></field>
          </model>
        </multiModelField>
      </model>
      <model type="SomethingElse" id="x-1">
        <field name="Ignored"><value>yes</value></field>
      </model>
      <model type="Call" id="call-2">
        <field name="Direction"><value>Outgoing</value></field>
      </model>
    </modelType>
  </decodedData>
</project>"#;

    #[test]
    fn captures_only_wanted_models() {
        let mut seen = Vec::new();
        let count = stream_models(
            Cursor::new(SAMPLE),
            |t| t == "Call",
            |node| seen.push(node),
        )
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[0].id.as_deref(), Some("call-1"));
        assert_eq!(seen[0].field("Direction"), Some("Incoming"));
        assert_eq!(seen[0].deleted_state.as_deref(), Some("Intact"));
        assert_eq!(seen[1].id.as_deref(), Some("call-2"));
    }

    #[test]
    fn nested_models_attach_under_field_name() {
        let mut seen = Vec::new();
        stream_models(Cursor::new(SAMPLE), |t| t == "Call", |node| seen.push(node)).unwrap();
        let parties: Vec<_> = seen[0].children_named("Parties").collect();
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].model_type, "Party");
        assert_eq!(parties[0].field("Identifier"), Some("+15551234"));
    }

    #[test]
    fn multi_field_collects_all_values() {
        let xml = r#"<root><model type="InstalledApplication" id="a">
            <multiField name="Permissions">
              <value>CAMERA</value>
              <value>CONTACTS</value>
            </multiField>
        </model></root>"#;
        let mut seen = Vec::new();
        stream_models(Cursor::new(xml), |_| true, |n| seen.push(n)).unwrap();
        assert_eq!(seen[0].multi_field("Permissions"), vec!["CAMERA", "CONTACTS"]);
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let xml = r#"<root><model type="Call" id="c"><field name="Direction">"#;
        let result = stream_models(Cursor::new(xml), |_| true, |_| {});
        assert!(result.is_err());
    }
}
