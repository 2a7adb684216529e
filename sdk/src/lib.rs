//! brine-thrift
//!
//! Runtime crate that generated modules import from (`use brine_thrift::...`).
//!
//! - The binary protocol runtime: buffers, wire types, `ThriftStruct`
//! - `lazy_static!`, used by generated constant blocks
//! - JSON views of dynamic values, for inspecting payloads

pub use brine_thrift_schema::*;
pub use lazy_static::lazy_static;

use serde_json::{json, Map};

/// JSON view of a value without type information. Enums print as numbers,
/// binary as an array of bytes, and maps with non-string keys as an array
/// of `[key, value]` pairs.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::Byte(v) => json!(v),
        Value::I16(v) => json!(v),
        Value::I32(v) | Value::Enum(v) => json!(v),
        Value::I64(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Binary(v) => json!(v),
        Value::List(values) | Value::Set(values) => values.iter().map(value_to_json).collect(),
        Value::Map(entries) => map_to_json(entries.iter().map(|(k, v)| (k, value_to_json(v))), value_to_json),
        Value::Struct(_, fields) => fields
            .iter()
            .map(|(name, v)| (name.clone(), value_to_json(v)))
            .collect::<Map<_, _>>()
            .into(),
    }
}

fn map_to_json<'v, I, K>(entries: I, key: K) -> serde_json::Value
where
    I: Iterator<Item = (&'v Value, serde_json::Value)> + Clone,
    K: Fn(&Value) -> serde_json::Value,
{
    if entries.clone().all(|(k, _)| matches!(k, Value::String(_))) {
        entries
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect::<Map<_, _>>()
            .into()
    } else {
        entries.map(|(k, v)| json!([key(k), v])).collect()
    }
}

/// JSON view of `value` read as `type_id`. Known enum values print by
/// name.
pub fn typed_value_to_json(schema: &Schema, type_id: &TypeId, value: &Value) -> serde_json::Value {
    match (type_id, value) {
        (TypeId::Enum(index), Value::Enum(v)) => match schema.defs[*index].variant_name(*v) {
            Some(name) => json!(name),
            None => json!(v),
        },
        (TypeId::List(elem), Value::List(values)) | (TypeId::Set(elem), Value::Set(values)) => values
            .iter()
            .map(|v| typed_value_to_json(schema, elem, v))
            .collect(),
        (TypeId::Map(key, val), Value::Map(entries)) => map_to_json(
            entries.iter().map(|(k, v)| (k, typed_value_to_json(schema, val, v))),
            |k| typed_value_to_json(schema, key, k),
        ),
        (TypeId::Struct(index), Value::Struct(_, fields)) => {
            let def = &schema.defs[*index];
            fields
                .iter()
                .map(|(name, v)| {
                    let json = match def.field(name) {
                        Some(field) => typed_value_to_json(schema, &field.type_id, v),
                        None => value_to_json(v),
                    };
                    (name.clone(), json)
                })
                .collect::<Map<_, _>>()
                .into()
        }
        _ => value_to_json(value),
    }
}

/// Decodes a `name` struct from `bytes` and returns its JSON view.
pub fn decode_to_json(schema: &Schema, name: &str, bytes: &[u8]) -> Result<serde_json::Value, ProtocolError> {
    let value = Value::decode(schema, name, bytes)?;
    let index = schema
        .index_of(name)
        .ok_or_else(|| ProtocolError::UnknownType(name.to_string()))?;
    Ok(typed_value_to_json(schema, &TypeId::Struct(index), &value))
}
