//! Reflection tree model.
//!
//! A reflection tree is the protobufjs JSON description of a protocol:
//! every object under `nested` is a message (`fields`), an enum
//! (`values`), a service (`methods`) or a plain namespace (`nested` only).
//! Object key order is significant and is kept as declared.

use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;
use serde_json::{Map, Value};

/// Cardinality keyword of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// No keyword
    #[default]
    Singular,
    /// `optional`
    Optional,
    /// `repeated`
    Repeated,
}

impl Cardinality {
    /// Returns the keyword prefix including its trailing space
    pub fn prefix(&self) -> &'static str {
        match self {
            Cardinality::Singular => "",
            Cardinality::Optional => "optional ",
            Cardinality::Repeated => "repeated ",
        }
    }
}

/// One field of a message node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Field number
    pub id: u32,
    /// Scalar, message or enum type reference
    pub type_name: String,
    /// Declared cardinality
    pub cardinality: Cardinality,
    /// Key type for map fields; `type_name` is then the value type
    pub key_type: Option<String>,
}

/// A `oneof` group of a message node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofSpec {
    /// Group name
    pub name: String,
    /// Member field names
    pub fields: Vec<String>,
}

impl OneofSpec {
    /// Synthetic groups are generated for proto3 `optional` fields
    pub fn is_synthetic(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// A reserved statement entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reserved {
    /// Inclusive field number range
    Range(u32, u32),
    /// Reserved field name
    Name(String),
}

/// Message payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageNode {
    /// Fields in declaration order
    pub fields: Vec<FieldSpec>,
    /// Oneof groups in declaration order
    pub oneofs: Vec<OneofSpec>,
    /// Reserved ranges and names
    pub reserved: Vec<Reserved>,
    /// Nested definitions in declaration order
    pub nested: Vec<(String, ReflectionNode)>,
    /// True when the node declares only `nested` entries
    pub namespace: bool,
}

impl MessageNode {
    /// Returns the oneof group a field belongs to, if any
    pub fn oneof_of(&self, field: &str) -> Option<&OneofSpec> {
        self.oneofs
            .iter()
            .find(|o| o.fields.iter().any(|f| f == field))
    }
}

/// Enum payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumNode {
    /// Symbols and values in declaration order
    pub values: Vec<(String, i32)>,
}

/// A service method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    /// Method name
    pub name: String,
    /// Request type, if declared
    pub request_type: Option<String>,
    /// Response type, if declared
    pub response_type: Option<String>,
    /// Client streaming
    pub request_stream: bool,
    /// Server streaming
    pub response_stream: bool,
}

/// Service payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceNode {
    /// Methods in declaration order
    pub methods: Vec<MethodSpec>,
}

/// One protocol construct of a reflection tree
#[derive(Debug, Clone, PartialEq)]
pub enum ReflectionNode {
    /// Message or namespace
    Message(MessageNode),
    /// Enum
    Enum(EnumNode),
    /// Service
    Service(ServiceNode),
    /// Anything else; renders to nothing
    Unknown,
}

impl ReflectionNode {
    /// Parse a reflection tree from raw JSON bytes
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)?;
        Self::from_json(&value)
    }

    /// Parse a reflection tree from a JSON value
    pub fn from_json(value: &Value) -> Result<Self> {
        parse_node(value, "")
    }

    /// Returns true unless this node is [`ReflectionNode::Unknown`]
    pub fn is_renderable(&self) -> bool {
        !matches!(self, ReflectionNode::Unknown)
    }

    /// Returns the message payload, if this is a message
    pub fn as_message(&self) -> Option<&MessageNode> {
        match self {
            ReflectionNode::Message(message) => Some(message),
            _ => None,
        }
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn parse_node(value: &Value, path: &str) -> Result<ReflectionNode> {
    let Some(obj) = value.as_object() else {
        return Ok(ReflectionNode::Unknown);
    };

    if let Some(values) = obj.get("values") {
        return parse_enum(values, path).map(ReflectionNode::Enum);
    }
    if let Some(methods) = obj.get("methods") {
        return parse_service(methods, path).map(ReflectionNode::Service);
    }
    if obj.contains_key("fields") || obj.contains_key("nested") {
        return parse_message(obj, path).map(ReflectionNode::Message);
    }

    Ok(ReflectionNode::Unknown)
}

fn object<'a>(value: &'a Value, path: &str, key: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_reflection(path, format!("'{}' is not an object", key)))
}

fn parse_message(obj: &Map<String, Value>, path: &str) -> Result<MessageNode> {
    let mut message = MessageNode {
        namespace: !obj.contains_key("fields"),
        ..Default::default()
    };

    if let Some(fields) = obj.get("fields") {
        for (name, spec) in object(fields, path, "fields")? {
            message.fields.push(parse_field(name, spec, &child_path(path, name))?);
        }
    }

    if let Some(oneofs) = obj.get("oneofs") {
        for (name, spec) in object(oneofs, path, "oneofs")? {
            let members = spec
                .get("oneof")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    Error::invalid_reflection(child_path(path, name), "oneof without member list")
                })?;
            message.oneofs.push(OneofSpec {
                name: name.clone(),
                fields: members
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect(),
            });
        }
    }

    if let Some(reserved) = obj.get("reserved").and_then(Value::as_array) {
        for entry in reserved {
            message.reserved.push(parse_reserved(entry, path)?);
        }
    }

    if let Some(nested) = obj.get("nested") {
        for (name, child) in object(nested, path, "nested")? {
            let node = parse_node(child, &child_path(path, name))?;
            message.nested.push((name.clone(), node));
        }
    }

    Ok(message)
}

fn parse_field(name: &str, spec: &Value, path: &str) -> Result<FieldSpec> {
    let type_name = spec
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_reflection(path, "field without type"))?;

    let id = spec
        .get("id")
        .and_then(Value::as_u64)
        .filter(|&id| id >= 1 && id <= u64::from(MAX_FIELD_NUMBER))
        .ok_or_else(|| Error::invalid_reflection(path, "field id missing or out of range"))?;

    let cardinality = match spec.get("rule").and_then(Value::as_str) {
        None | Some("required") => Cardinality::Singular,
        Some("optional") => Cardinality::Optional,
        Some("repeated") => Cardinality::Repeated,
        Some(other) => {
            return Err(Error::invalid_reflection(
                path,
                format!("unknown field rule '{}'", other),
            ))
        }
    };

    let proto3_optional = spec
        .get("options")
        .and_then(|o| o.get("proto3_optional"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(FieldSpec {
        name: name.to_string(),
        id: id as u32,
        type_name: type_name.to_string(),
        cardinality: if proto3_optional {
            Cardinality::Optional
        } else {
            cardinality
        },
        key_type: spec
            .get("keyType")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_reserved(entry: &Value, path: &str) -> Result<Reserved> {
    if let Some(name) = entry.as_str() {
        return Ok(Reserved::Name(name.to_string()));
    }

    let bound = |v: Option<&Value>| {
        v.and_then(Value::as_u64)
            .map(|n| n.min(u64::from(MAX_FIELD_NUMBER)) as u32)
    };
    match entry.as_array().map(|a| (bound(a.first()), bound(a.get(1)))) {
        Some((Some(start), Some(end))) => Ok(Reserved::Range(start, end)),
        _ => Err(Error::invalid_reflection(path, "malformed reserved entry")),
    }
}

fn parse_enum(values: &Value, path: &str) -> Result<EnumNode> {
    let mut node = EnumNode::default();
    for (symbol, value) in object(values, path, "values")? {
        let number = value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| {
                Error::invalid_reflection(child_path(path, symbol), "enum value is not an i32")
            })?;
        node.values.push((symbol.clone(), number));
    }
    Ok(node)
}

fn parse_service(methods: &Value, path: &str) -> Result<ServiceNode> {
    let mut node = ServiceNode::default();
    for (name, spec) in object(methods, path, "methods")? {
        let text = |key: &str| spec.get(key).and_then(Value::as_str).map(str::to_string);
        let flag = |key: &str| spec.get(key).and_then(Value::as_bool).unwrap_or(false);
        node.methods.push(MethodSpec {
            name: name.clone(),
            request_type: text("requestType"),
            response_type: text("responseType"),
            request_stream: flag("requestStream"),
            response_stream: flag("responseStream"),
        });
    }
    Ok(node)
}
