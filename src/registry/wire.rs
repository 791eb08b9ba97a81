//! XML-RPC envelope encode/decode (§4.5).
//!
//! Requests are written with `quick-xml`'s `Writer` (so text content is
//! escaped correctly); responses are parsed with `roxmltree`, the same
//! DOM library the launch-file compiler uses.

use std::io::Cursor;

use base64::Engine;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::Node;

use crate::error::{LaunchError, Result};

use super::value::XmlRpcValue;

/// Builds a full `<methodCall>` request body for `method` with
/// positional `params`.
pub fn encode_request(method: &str, params: &[XmlRpcValue]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_tag(&mut writer, "methodCall", |w| {
        write_text_tag(w, "methodName", method)?;
        write_tag(w, "params", |w| {
            for param in params {
                write_tag(w, "param", |w| write_value(w, param))?;
            }
            Ok(())
        })
    })?;
    let bytes = writer.into_inner().into_inner();
    let body = String::from_utf8(bytes)
        .map_err(|e| LaunchError::Registry(format!("non-UTF8 request body: {e}")))?;
    Ok(format!("<?xml version=\"1.0\"?>\n{body}"))
}

fn write_tag(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    body: impl FnOnce(&mut Writer<Cursor<Vec<u8>>>) -> Result<()>,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| LaunchError::Registry(e.to_string()))?;
    body(writer)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| LaunchError::Registry(e.to_string()))?;
    Ok(())
}

fn write_text_tag(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    write_tag(writer, name, |w| {
        w.write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| LaunchError::Registry(e.to_string()))
    })
}

fn write_value(writer: &mut Writer<Cursor<Vec<u8>>>, value: &XmlRpcValue) -> Result<()> {
    write_tag(writer, "value", |w| match value {
        XmlRpcValue::Int(i) => write_text_tag(w, "int", &i.to_string()),
        XmlRpcValue::Bool(b) => write_text_tag(w, "boolean", if *b { "1" } else { "0" }),
        XmlRpcValue::Double(d) => write_text_tag(w, "double", &d.to_string()),
        XmlRpcValue::String(s) => write_text_tag(w, "string", s),
        XmlRpcValue::Base64(bytes) => {
            write_text_tag(w, "base64", &base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        XmlRpcValue::Array(items) => write_tag(w, "array", |w| {
            write_tag(w, "data", |w| {
                for item in items {
                    write_value(w, item)?;
                }
                Ok(())
            })
        }),
        XmlRpcValue::Struct(members) => write_tag(w, "struct", |w| {
            for (name, member_value) in members {
                write_tag(w, "member", |w| {
                    write_text_tag(w, "name", name)?;
                    write_value(w, member_value)
                })?;
            }
            Ok(())
        }),
        XmlRpcValue::Nil => write_text_tag(w, "string", ""),
    })
}

/// Parses a `<methodResponse>` body, returning the single returned
/// value (usually the `[statusCode, statusMessage, value]` triple the
/// registry API wraps every call in) or a `Registry` error for a fault
/// response or malformed envelope.
pub fn parse_response(body: &str) -> Result<XmlRpcValue> {
    let doc = roxmltree::Document::parse(body)
        .map_err(|e| LaunchError::Registry(format!("malformed XML-RPC response: {e}")))?;
    let root = doc.root_element();
    if root.tag_name().name() != "methodResponse" {
        return Err(LaunchError::Registry(format!(
            "expected <methodResponse>, found <{}>",
            root.tag_name().name()
        )));
    }

    if let Some(fault) = find_child(root, "fault") {
        let value = find_child(fault, "value").ok_or_else(|| {
            LaunchError::Registry("<fault> missing <value>".to_string())
        })?;
        return Err(LaunchError::Registry(format!("XML-RPC fault: {}", describe_fault(value))));
    }

    let params = find_child(root, "params")
        .ok_or_else(|| LaunchError::Registry("<methodResponse> missing <params>".to_string()))?;
    let param = find_child(params, "param")
        .ok_or_else(|| LaunchError::Registry("<params> missing <param>".to_string()))?;
    let value = find_child(param, "value")
        .ok_or_else(|| LaunchError::Registry("<param> missing <value>".to_string()))?;

    decode_value(value)
}

fn describe_fault(value_node: Node<'_, '_>) -> String {
    decode_value(value_node)
        .ok()
        .and_then(|v| match v {
            XmlRpcValue::Struct(members) => members.get("faultString").cloned(),
            _ => None,
        })
        .and_then(|v| v.as_str().map(ToString::to_string))
        .unwrap_or_else(|| "unknown fault".to_string())
}

fn find_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Decodes a `<value>` element. A bare string (no type child, just
/// text) is legal XML-RPC and decodes as a string. An empty `<value/>`
/// decodes permissively to [`XmlRpcValue::Nil`] rather than an error
/// (§9 Open Question (a)).
fn decode_value(value_node: Node<'_, '_>) -> Result<XmlRpcValue> {
    let Some(type_node) = value_node.children().find(Node::is_element) else {
        let text = value_node.text().unwrap_or("").to_string();
        return Ok(if text.is_empty() { XmlRpcValue::Nil } else { XmlRpcValue::String(text) });
    };

    match type_node.tag_name().name() {
        "int" | "i4" => parse_text(type_node)?.parse::<i32>().map(XmlRpcValue::Int).map_err(|e| {
            LaunchError::Registry(format!("invalid <int>: {e}"))
        }),
        "boolean" => match parse_text(type_node)?.trim() {
            "1" => Ok(XmlRpcValue::Bool(true)),
            "0" => Ok(XmlRpcValue::Bool(false)),
            other => Err(LaunchError::Registry(format!("invalid <boolean>: '{other}'"))),
        },
        "double" => parse_text(type_node)?.parse::<f64>().map(XmlRpcValue::Double).map_err(|e| {
            LaunchError::Registry(format!("invalid <double>: {e}"))
        }),
        "string" => Ok(XmlRpcValue::String(parse_text(type_node)?)),
        "base64" => base64::engine::general_purpose::STANDARD
            .decode(parse_text(type_node)?.trim())
            .map(XmlRpcValue::Base64)
            .map_err(|e| LaunchError::Registry(format!("invalid <base64>: {e}"))),
        "array" => {
            let data = find_child(type_node, "data")
                .ok_or_else(|| LaunchError::Registry("<array> missing <data>".to_string()))?;
            let items = data
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(XmlRpcValue::Array(items))
        }
        "struct" => {
            let mut members = std::collections::BTreeMap::new();
            for member in type_node.children().filter(|n| n.is_element() && n.tag_name().name() == "member") {
                let name = find_child(member, "name")
                    .and_then(|n| n.text())
                    .ok_or_else(|| LaunchError::Registry("<member> missing <name>".to_string()))?
                    .to_string();
                let value = find_child(member, "value")
                    .ok_or_else(|| LaunchError::Registry("<member> missing <value>".to_string()))?;
                members.insert(name, decode_value(value)?);
            }
            Ok(XmlRpcValue::Struct(members))
        }
        "nil" => Ok(XmlRpcValue::Nil),
        other => Err(LaunchError::Registry(format!("unsupported XML-RPC type <{other}>"))),
    }
}

fn parse_text(node: Node<'_, '_>) -> Result<String> {
    Ok(node.text().unwrap_or("").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_round_trips_a_simple_request() {
        let body = encode_request("getParam", &[XmlRpcValue::String("/node".into()), XmlRpcValue::String("/foo".into())]).unwrap();
        assert!(body.contains("<methodName>getParam</methodName>"));
        assert!(body.contains("<string>/foo</string>"));
    }

    #[test]
    fn parses_a_successful_triple_response() {
        let body = r#"<?xml version="1.0"?>
<methodResponse><params><param><value><array><data>
<value><int>1</int></value>
<value><string>ok</string></value>
<value><int>42</int></value>
</data></array></value></param></params></methodResponse>"#;
        let value = parse_response(body).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0].as_int(), Some(1));
        assert_eq!(items[2].as_int(), Some(42));
    }

    #[test]
    fn fault_response_is_an_error() {
        let body = r#"<?xml version="1.0"?>
<methodResponse><fault><value><struct>
<member><name>faultCode</name><value><int>1</int></value></member>
<member><name>faultString</name><value><string>boom</string></value></member>
</struct></value></fault></methodResponse>"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn empty_value_decodes_as_nil() {
        let body = r#"<?xml version="1.0"?>
<methodResponse><params><param><value></value></param></params></methodResponse>"#;
        assert_eq!(parse_response(body).unwrap(), XmlRpcValue::Nil);
    }

    #[test]
    fn special_characters_round_trip_through_encode_and_decode() {
        let original = "quote\" amp& lt< gt> apos'";

        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_tag(&mut writer, "methodResponse", |w| {
            write_tag(w, "params", |w| {
                write_tag(w, "param", |w| write_value(w, &XmlRpcValue::String(original.to_string())))
            })
        })
        .unwrap();
        let bytes = writer.into_inner().into_inner();
        let body = String::from_utf8(bytes).unwrap();

        // The raw '<' and '&' must not appear unescaped, or the body
        // itself would not be well-formed XML.
        assert!(!body.contains("lt<"));
        assert!(!body.contains("amp&"));

        let decoded = parse_response(&body).unwrap();
        assert_eq!(decoded, XmlRpcValue::String(original.to_string()));
    }
}
