//! Projection of decoded rows into JSON records.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use prost_reflect::{DynamicMessage, FieldDescriptor, MapKey, ReflectMessage, Value};
use serde_json::{Map, Number, Value as JsonValue};

/// A decoded row: every declared field, in declaration order
pub type Record = Map<String, JsonValue>;

/// Project `message` into a [`Record`].
///
/// Every field of the message type is present, in the order the document
/// declares them. Absent fields take their default: the zero value for
/// scalars, `[]` for repeated fields and `null` for singular messages.
pub fn to_record(message: &DynamicMessage) -> Record {
    let descriptor = message.descriptor();
    descriptor
        .descriptor_proto()
        .field
        .iter()
        .filter_map(|proto| descriptor.get_field_by_name(proto.name()))
        .map(|field| (field.name().to_string(), field_json(message, &field)))
        .collect()
}

fn field_json(message: &DynamicMessage, field: &FieldDescriptor) -> JsonValue {
    let singular_message =
        field.kind().as_message().is_some() && !field.is_list() && !field.is_map();
    if singular_message && !message.has_field(field) {
        // a default sub-message of a self-referencing type never bottoms out
        return JsonValue::Null;
    }
    to_json(&message.get_field(field))
}

/// Convert a reflected value to JSON.
///
/// 64-bit integers become decimal strings so no consumer loses precision
/// past 2^53. Bytes become base64.
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::I32(n) => JsonValue::from(*n),
        Value::U32(n) => JsonValue::from(*n),
        Value::EnumNumber(n) => JsonValue::from(*n),
        Value::I64(n) => JsonValue::String(n.to_string()),
        Value::U64(n) => JsonValue::String(n.to_string()),
        Value::F32(f) => float(f64::from(*f)),
        Value::F64(f) => float(*f),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Bytes(b) => JsonValue::String(BASE64.encode(b)),
        Value::Message(m) => JsonValue::Object(to_record(m)),
        Value::List(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let mut pairs: Vec<_> = entries
                .iter()
                .map(|(k, v)| (map_key(k), to_json(v)))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            JsonValue::Object(pairs.into_iter().collect())
        }
    }
}

fn float(f: f64) -> JsonValue {
    match Number::from_f64(f) {
        Some(n) => JsonValue::Number(n),
        None if f.is_nan() => JsonValue::String("NaN".to_string()),
        None if f > 0.0 => JsonValue::String("Infinity".to_string()),
        None => JsonValue::String("-Infinity".to_string()),
    }
}

fn map_key(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(n) => n.to_string(),
        MapKey::I64(n) => n.to_string(),
        MapKey::U32(n) => n.to_string(),
        MapKey::U64(n) => n.to_string(),
        MapKey::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(to_json(&Value::I32(-7)), json!(-7));
        assert_eq!(to_json(&Value::U32(7)), json!(7));
        assert_eq!(to_json(&Value::Bool(true)), json!(true));
        assert_eq!(to_json(&Value::F64(1.5)), json!(1.5));
        assert_eq!(to_json(&Value::String("ok".into())), json!("ok"));
    }

    #[test]
    fn test_long_integers_are_strings() {
        assert_eq!(
            to_json(&Value::I64(9_007_199_254_740_993)),
            json!("9007199254740993")
        );
        assert_eq!(to_json(&Value::U64(u64::MAX)), json!("18446744073709551615"));
        assert_eq!(to_json(&Value::I64(-1)), json!("-1"));
    }

    #[test]
    fn test_bytes_and_non_finite_floats() {
        assert_eq!(
            to_json(&Value::Bytes(bytes::Bytes::from_static(b"hi"))),
            json!("aGk=")
        );
        assert_eq!(to_json(&Value::F64(f64::NAN)), json!("NaN"));
        assert_eq!(to_json(&Value::F32(f32::INFINITY)), json!("Infinity"));
        assert_eq!(to_json(&Value::F64(f64::NEG_INFINITY)), json!("-Infinity"));
    }

    #[test]
    fn test_lists() {
        let list = Value::List(vec![Value::I64(1), Value::I64(2)]);
        assert_eq!(to_json(&list), json!(["1", "2"]));
        assert_eq!(to_json(&Value::List(vec![])), json!([]));
    }
}
