//! XML-RPC value model (§4.5).
//!
//! A minimal subset of the XML-RPC type system — enough to carry
//! everything the registry protocol actually uses: ints, booleans,
//! doubles, strings, base64 blobs, arrays and structs.

use std::collections::BTreeMap;

use crate::error::{LaunchError, Result};
use crate::tags::param::ParamValue;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlRpcValue {
    Int(i32),
    Bool(bool),
    Double(f64),
    String(String),
    Base64(Vec<u8>),
    Array(Vec<XmlRpcValue>),
    Struct(BTreeMap<String, XmlRpcValue>),
    /// The registry's "value absent" response — not a standard
    /// XML-RPC type, represented here as an empty string payload
    /// (§9 Open Question (a): preserved permissiveness).
    Nil,
}

impl XmlRpcValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmlRpcValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            XmlRpcValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[XmlRpcValue]> {
        match self {
            XmlRpcValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&ParamValue> for XmlRpcValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::String(s) => XmlRpcValue::String(s.clone()),
            ParamValue::Int(i) => XmlRpcValue::Int(*i as i32),
            ParamValue::Double(d) => XmlRpcValue::Double(*d),
            ParamValue::Bool(b) => XmlRpcValue::Bool(*b),
            ParamValue::Binary(bytes) => XmlRpcValue::Base64(bytes.clone()),
        }
    }
}

impl From<i32> for XmlRpcValue {
    fn from(v: i32) -> Self {
        XmlRpcValue::Int(v)
    }
}

impl From<&str> for XmlRpcValue {
    fn from(v: &str) -> Self {
        XmlRpcValue::String(v.to_string())
    }
}

impl From<String> for XmlRpcValue {
    fn from(v: String) -> Self {
        XmlRpcValue::String(v)
    }
}

impl From<bool> for XmlRpcValue {
    fn from(v: bool) -> Self {
        XmlRpcValue::Bool(v)
    }
}

/// Converts a parsed `<rosparam>` YAML document into the struct/array
/// tree the registry's `setParam` expects (§4.2 `<rosparam>`). Mapping
/// keys must be strings, since XML-RPC structs only have string keys.
impl TryFrom<&serde_yaml::Value> for XmlRpcValue {
    type Error = LaunchError;

    fn try_from(value: &serde_yaml::Value) -> Result<Self> {
        Ok(match value {
            serde_yaml::Value::Null => XmlRpcValue::Nil,
            serde_yaml::Value::Bool(b) => XmlRpcValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    XmlRpcValue::Int(i as i32)
                } else {
                    XmlRpcValue::Double(n.as_f64().unwrap_or_default())
                }
            }
            serde_yaml::Value::String(s) => XmlRpcValue::String(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                let converted = items.iter().map(XmlRpcValue::try_from).collect::<Result<Vec<_>>>()?;
                XmlRpcValue::Array(converted)
            }
            serde_yaml::Value::Mapping(map) => {
                let mut members = BTreeMap::new();
                for (key, val) in map {
                    let key_str = key.as_str().ok_or_else(|| {
                        LaunchError::Parse {
                            file: std::path::PathBuf::new(),
                            reason: format!("rosparam mapping key '{key:?}' is not a string"),
                        }
                    })?;
                    members.insert(key_str.to_string(), XmlRpcValue::try_from(val)?);
                }
                XmlRpcValue::Struct(members)
            }
            serde_yaml::Value::Tagged(tagged) => XmlRpcValue::try_from(&tagged.value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_yaml_mapping_to_struct() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: [true, 2.5]").unwrap();
        let value = XmlRpcValue::try_from(&yaml).unwrap();
        match value {
            XmlRpcValue::Struct(members) => {
                assert_eq!(members.get("a"), Some(&XmlRpcValue::Int(1)));
                assert_eq!(
                    members.get("b"),
                    Some(&XmlRpcValue::Array(vec![XmlRpcValue::Bool(true), XmlRpcValue::Double(2.5)]))
                );
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
