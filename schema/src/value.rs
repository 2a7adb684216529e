use crate::{
    bb::{expect_wire_type, ByteBuffer, ByteBufferMut, DEFAULT_MAX_DEPTH},
    error::ProtocolError,
    schema::{Field, Requiredness, Schema, TypeId},
    wire::{WireType, FIELD_HEADER_LEN, LENGTH_PREFIX_LEN, LIST_HEADER_LEN, MAP_HEADER_LEN, STOP_LEN},
};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic binary-protocol data.
///
/// Values are converted to and from bytes against a [Schema](struct.Schema.html)
/// descriptor, following the same presence rules as generated code: a struct
/// field missing from the map is "not set", optional fields equal to their
/// default are omitted, and an unset boxed struct is written as a bare stop
/// marker.
#[derive(Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Enum(i32),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Struct(String, BTreeMap<String, Value>),
}

/// What the length and write routines do with one field. Both routines go
/// through [`plan_field`], so they cannot disagree about a field.
enum Emit<'v> {
    Skip,
    Stop,
    Value(Cow<'v, Value>),
}

fn plan_field<'v>(schema: &Schema, field: &Field, value: Option<&'v Value>) -> Emit<'v> {
    let optional = field.requiredness == Requiredness::Optional;
    let value = match value {
        Some(value) => Cow::Borrowed(value),
        None if field.boxed && optional => return Emit::Skip,
        None if field.boxed && matches!(field.type_id, TypeId::Struct(_)) => return Emit::Stop,
        None => Cow::Owned(Value::zero(schema, &field.type_id)),
    };
    if optional && !field.boxed {
        match field.default {
            Some(ref default) if *value == *default => return Emit::Skip,
            None if field.type_id.is_container() && value.len() == 0 => return Emit::Skip,
            _ => {}
        }
    }
    Emit::Value(value)
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Integer content of any integer or enum value, widened to `i64`.
    /// Returns `0` for other value kinds.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Byte(value) => value as i64,
            Value::I16(value) => value as i64,
            Value::I32(value) | Value::Enum(value) => value as i64,
            Value::I64(value) => value,
            _ => 0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Binary(ref value) => value.as_slice(),
            Value::String(ref value) => value.as_bytes(),
            _ => &[],
        }
    }

    /// Elements of a [List](#variant.List) or [Set](#variant.Set).
    /// Returns an empty slice for other value kinds.
    pub fn as_slice(&self) -> &[Value] {
        match *self {
            Value::List(ref values) | Value::Set(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Number of elements of a container. Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::List(ref values) | Value::Set(ref values) => values.len(),
            Value::Map(ref entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to a list or set. Does nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::List(ref mut values) | Value::Set(ref mut values) = *self {
            values.push(value);
        }
    }

    /// An empty struct value with no field set.
    pub fn new_struct(name: &str) -> Value {
        Value::Struct(name.to_string(), BTreeMap::new())
    }

    /// Builder-style [set](#method.set).
    pub fn with(mut self, name: &str, value: Value) -> Value {
        self.set(name, value);
        self
    }

    /// Extract a field out of a [Struct](#variant.Struct). Returns `None` for
    /// other value kinds or if the field isn't set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match *self {
            Value::Struct(_, ref fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Value::Struct(_, ref mut fields) = *self {
            fields.insert(name.to_string(), value);
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Value::Struct(_, ref mut fields) = *self {
            fields.remove(name);
        }
    }

    /// The value an inline field holds before anything is assigned to it.
    pub fn zero(schema: &Schema, type_id: &TypeId) -> Value {
        Value::zero_at(schema, type_id, 0)
    }

    fn zero_at(schema: &Schema, type_id: &TypeId, depth: usize) -> Value {
        match type_id {
            TypeId::Bool => Value::Bool(false),
            TypeId::Byte => Value::Byte(0),
            TypeId::I16 => Value::I16(0),
            TypeId::I32 => Value::I32(0),
            TypeId::I64 => Value::I64(0),
            TypeId::Double => Value::Double(0.0),
            TypeId::String => Value::String(String::new()),
            TypeId::Binary => Value::Binary(Vec::new()),
            TypeId::Enum(_) => Value::Enum(0),
            TypeId::List(_) => Value::List(Vec::new()),
            TypeId::Set(_) => Value::Set(Vec::new()),
            TypeId::Map(_, _) => Value::Map(Vec::new()),
            TypeId::Struct(index) => Value::default_struct_at(schema, *index, depth + 1),
        }
    }

    /// A struct with every inline field at its declared default (or zero)
    /// and every boxed field unset.
    pub fn default_struct(schema: &Schema, index: usize) -> Value {
        Value::default_struct_at(schema, index, 0)
    }

    fn default_struct_at(schema: &Schema, index: usize, depth: usize) -> Value {
        let def = &schema.defs[index];
        let mut fields = BTreeMap::new();
        if depth < DEFAULT_MAX_DEPTH {
            for field in def.fields.iter().filter(|field| !field.boxed) {
                let value = match field.default {
                    Some(ref default) => default.clone(),
                    None => Value::zero_at(schema, &field.type_id, depth),
                };
                fields.insert(field.name.clone(), value);
            }
        }
        Value::Struct(def.name.clone(), fields)
    }

    fn mismatch(&self, expected: &TypeId) -> ProtocolError {
        ProtocolError::ValueMismatch {
            value:    format!("{:?}", self),
            expected: format!("{:?}", expected),
        }
    }

    fn struct_index(&self, schema: &Schema) -> Result<usize, ProtocolError> {
        match *self {
            Value::Struct(ref name, _) => schema
                .index_of(name)
                .ok_or_else(|| ProtocolError::UnknownType(name.clone())),
            _ => Err(ProtocolError::UnknownType(format!("{:?}", self))),
        }
    }

    /// Decodes the struct named `name` from `bytes`.
    pub fn decode(schema: &Schema, name: &str, bytes: &[u8]) -> Result<Value, ProtocolError> {
        let index = schema
            .index_of(name)
            .ok_or_else(|| ProtocolError::UnknownType(name.to_string()))?;
        let mut bb = ByteBuffer::new(bytes);
        Value::decode_bb(schema, &TypeId::Struct(index), &mut bb, DEFAULT_MAX_DEPTH)
    }

    /// Encodes this struct value into bytes using the provided `schema`.
    pub fn encode(&self, schema: &Schema) -> Result<Vec<u8>, ProtocolError> {
        let index = self.struct_index(schema)?;
        let mut bb = ByteBufferMut::new();
        self.encode_bb(schema, &TypeId::Struct(index), &mut bb)?;
        Ok(bb.data())
    }

    /// Exact number of bytes [encode](#method.encode) produces.
    pub fn encoded_len(&self, schema: &Schema) -> Result<usize, ProtocolError> {
        let index = self.struct_index(schema)?;
        self.len_bb(schema, &TypeId::Struct(index))
    }

    /// Decodes a value of `type_id` from `bb` starting at the current index,
    /// nesting at most `max_depth` structs/containers deep.
    pub fn decode_bb(
        schema: &Schema,
        type_id: &TypeId,
        bb: &mut ByteBuffer,
        max_depth: usize,
    ) -> Result<Value, ProtocolError> {
        Value::decode_at(schema, type_id, bb, 0, 0, max_depth)
    }

    fn decode_at(
        schema: &Schema,
        type_id: &TypeId,
        bb: &mut ByteBuffer,
        field_id: i16,
        depth: usize,
        max_depth: usize,
    ) -> Result<Value, ProtocolError> {
        if depth >= max_depth && (type_id.is_container() || matches!(type_id, TypeId::Struct(_))) {
            return Err(ProtocolError::DepthLimitExceeded(max_depth));
        }
        match type_id {
            TypeId::Bool => Ok(Value::Bool(bb.read_bool()?)),
            TypeId::Byte => Ok(Value::Byte(bb.read_byte()?)),
            TypeId::I16 => Ok(Value::I16(bb.read_i16()?)),
            TypeId::I32 => Ok(Value::I32(bb.read_i32()?)),
            TypeId::I64 => Ok(Value::I64(bb.read_i64()?)),
            TypeId::Double => Ok(Value::Double(bb.read_double()?)),
            TypeId::String => Ok(Value::String(bb.read_string()?)),
            TypeId::Binary => Ok(Value::Binary(bb.read_binary()?)),
            TypeId::Enum(_) => Ok(Value::Enum(bb.read_i32()?)),

            TypeId::List(elem) | TypeId::Set(elem) => {
                let (found, count) = bb.read_list_header()?;
                expect_wire_type(field_id, elem.wire_type(), found, count)?;
                let mut values = Vec::with_capacity(bb.capacity_hint(count));
                for _ in 0..count {
                    values.push(Value::decode_at(schema, elem, bb, field_id, depth + 1, max_depth)?);
                }
                Ok(match type_id {
                    TypeId::Set(_) => Value::Set(values),
                    _ => Value::List(values),
                })
            }

            TypeId::Map(key, value) => {
                let (found_key, found_value, count) = bb.read_map_header()?;
                expect_wire_type(field_id, key.wire_type(), found_key, count)?;
                expect_wire_type(field_id, value.wire_type(), found_value, count)?;
                let mut entries = Vec::with_capacity(bb.capacity_hint(count));
                for _ in 0..count {
                    let k = Value::decode_at(schema, key, bb, field_id, depth + 1, max_depth)?;
                    let v = Value::decode_at(schema, value, bb, field_id, depth + 1, max_depth)?;
                    entries.push((k, v));
                }
                Ok(Value::Map(entries))
            }

            TypeId::Struct(index) => {
                let def = &schema.defs[*index];
                let mut value = Value::default_struct(schema, *index);
                let mut seen = vec![false; def.fields.len()];
                loop {
                    let (wire, id) = bb.read_field_header()?;
                    if wire == WireType::Stop {
                        break;
                    }
                    match def.field_id_to_index.get(&id) {
                        Some(&i) if def.fields[i].type_id.wire_type() == wire => {
                            let field = &def.fields[i];
                            let decoded = Value::decode_at(
                                schema,
                                &field.type_id,
                                bb,
                                id,
                                depth + 1,
                                max_depth,
                            )?;
                            value.set(&field.name, decoded);
                            seen[i] = true;
                        }
                        _ => bb.skip(wire, max_depth - depth)?,
                    }
                }
                // Fields are sorted by id, so the first miss is the lowest id.
                for (field, seen) in def.fields.iter().zip(seen) {
                    if field.requiredness == Requiredness::Required && !seen {
                        return Err(ProtocolError::missing_field(&def.name, &field.name));
                    }
                }
                Ok(value)
            }
        }
    }

    /// Encodes the current value as `type_id` to the end of `bb`.
    pub fn encode_bb(
        &self,
        schema: &Schema,
        type_id: &TypeId,
        bb: &mut ByteBufferMut,
    ) -> Result<(), ProtocolError> {
        match (type_id, self) {
            (TypeId::Bool, Value::Bool(value)) => bb.write_bool(*value),
            (TypeId::Byte, Value::Byte(value)) => bb.write_byte(*value),
            (TypeId::I16, Value::I16(value)) => bb.write_i16(*value),
            (TypeId::I32, Value::I32(value)) => bb.write_i32(*value),
            (TypeId::I64, Value::I64(value)) => bb.write_i64(*value),
            (TypeId::Double, Value::Double(value)) => bb.write_double(*value),
            (TypeId::String, Value::String(value)) => bb.write_string(value),
            (TypeId::Binary, Value::Binary(value)) => bb.write_binary(value),
            (TypeId::Enum(_), Value::Enum(value)) => bb.write_i32(*value),

            (TypeId::List(elem), Value::List(values)) | (TypeId::Set(elem), Value::Set(values)) => {
                bb.write_list_header(elem.wire_type(), values.len());
                for value in values {
                    value.encode_bb(schema, elem, bb)?;
                }
            }

            (TypeId::Map(key, value), Value::Map(entries)) => {
                bb.write_map_header(key.wire_type(), value.wire_type(), entries.len());
                for (k, v) in entries {
                    k.encode_bb(schema, key, bb)?;
                    v.encode_bb(schema, value, bb)?;
                }
            }

            (TypeId::Struct(index), Value::Struct(_, fields)) => {
                for field in &schema.defs[*index].fields {
                    match plan_field(schema, field, fields.get(field.name.as_str())) {
                        Emit::Skip => {}
                        Emit::Stop => {
                            bb.write_field_header(WireType::Struct, field.id);
                            bb.write_stop();
                        }
                        Emit::Value(value) => {
                            bb.write_field_header(field.type_id.wire_type(), field.id);
                            value.encode_bb(schema, &field.type_id, bb)?;
                        }
                    }
                }
                bb.write_stop();
            }

            _ => return Err(self.mismatch(type_id)),
        }
        Ok(())
    }

    fn len_bb(&self, schema: &Schema, type_id: &TypeId) -> Result<usize, ProtocolError> {
        if let Some(size) = type_id.wire_type().fixed_size() {
            return Ok(size);
        }
        Ok(match (type_id, self) {
            (TypeId::String, Value::String(value)) => LENGTH_PREFIX_LEN + value.len(),
            (TypeId::Binary, Value::Binary(value)) => LENGTH_PREFIX_LEN + value.len(),

            (TypeId::List(elem), Value::List(values)) | (TypeId::Set(elem), Value::Set(values)) => {
                let mut len = LIST_HEADER_LEN;
                for value in values {
                    len += value.len_bb(schema, elem)?;
                }
                len
            }

            (TypeId::Map(key, value), Value::Map(entries)) => {
                let mut len = MAP_HEADER_LEN;
                for (k, v) in entries {
                    len += k.len_bb(schema, key)? + v.len_bb(schema, value)?;
                }
                len
            }

            (TypeId::Struct(index), Value::Struct(_, fields)) => {
                let mut len = STOP_LEN;
                for field in &schema.defs[*index].fields {
                    len += match plan_field(schema, field, fields.get(field.name.as_str())) {
                        Emit::Skip => 0,
                        Emit::Stop => FIELD_HEADER_LEN + STOP_LEN,
                        Emit::Value(value) => FIELD_HEADER_LEN + value.len_bb(schema, &field.type_id)?,
                    };
                }
                len
            }

            _ => return Err(self.mismatch(type_id)),
        })
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a list or set, or if the provided
    /// index is out of bounds.
    fn index(&self, index: usize) -> &Value {
        &self.as_slice()[index]
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Byte(value) => value.fmt(f),
            Value::I16(value) => value.fmt(f),
            Value::I32(value) => value.fmt(f),
            Value::I64(value) => value.fmt(f),
            Value::Double(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Binary(ref value) => write!(f, "b{:?}", value),
            Value::Enum(value) => write!(f, "enum({})", value),
            Value::List(ref values) => values.fmt(f),
            Value::Set(ref values) => {
                write!(f, "{{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", value)?;
                }
                write!(f, "}}")
            }
            Value::Map(ref entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Struct(ref name, ref fields) => {
                write!(f, "{} {{", name)?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Def, DefKind};

    fn field(name: &str, id: i16, type_id: TypeId, requiredness: Requiredness) -> Field {
        Field {
            name: name.to_owned(),
            id,
            type_id,
            requiredness,
            boxed: false,
            default: None,
        }
    }

    /// `struct P { 1: required string name, 2: optional i32 age = 30 }`
    fn person_schema() -> Schema {
        let mut age = field("age", 2, TypeId::I32, Requiredness::Optional);
        age.default = Some(Value::I32(30));
        Schema::new(vec![Def::new(
            "P".to_owned(),
            DefKind::Struct,
            vec![field("name", 1, TypeId::String, Requiredness::Required), age],
        )])
    }

    fn person(name: &str, age: i32) -> Value {
        Value::new_struct("P")
            .with("name", Value::String(name.to_owned()))
            .with("age", Value::I32(age))
    }

    #[test]
    fn value_basic() {
        let value = Value::List(vec![
            Value::Bool(true),
            Value::Byte(-1),
            Value::I32(7),
            Value::Double(0.5),
            Value::String("abc".to_owned()),
            Value::Enum(2),
            Value::new_struct("Obj").with("key", Value::String("value".to_owned())),
        ]);

        assert_eq!(value.len(), 7);
        assert_eq!(value[0].as_bool(), true);
        assert_eq!(value[1].as_i64(), -1);
        assert_eq!(value[5].as_i64(), 2);
        assert_eq!(value[4].as_str(), "abc");
        assert_eq!(value.get("key"), None);
        assert_eq!(value[6].get("key"), Some(&Value::String("value".to_owned())));
        assert_eq!(
            format!("{:?}", value),
            "[true, -1, 7, 0.5, \"abc\", enum(2), Obj {key: \"value\"}]"
        );
    }

    #[test]
    fn value_set_and_remove() {
        let mut value = Value::new_struct("Foo");
        value.set("x", Value::I32(1));
        value.set("y", Value::I32(2));
        value.set("x", Value::I32(3));
        assert_eq!(value.get("x"), Some(&Value::I32(3)));
        value.remove("x");
        assert_eq!(value.get("x"), None);
        assert_eq!(value.get("y"), Some(&Value::I32(2)));
    }

    #[test]
    fn optional_default_is_omitted() {
        let schema = person_schema();
        let bytes = person("Ann", 30).encode(&schema).unwrap();
        assert_eq!(bytes, [11, 0, 1, 0, 0, 0, 3, b'A', b'n', b'n', 0]);
        assert_eq!(person("Ann", 30).encoded_len(&schema), Ok(bytes.len()));

        let bytes = person("Ann", 31).encode(&schema).unwrap();
        assert_eq!(
            bytes,
            [11, 0, 1, 0, 0, 0, 3, b'A', b'n', b'n', 8, 0, 2, 0, 0, 0, 31, 0]
        );
        assert_eq!(person("Ann", 31).encoded_len(&schema), Ok(bytes.len()));
    }

    #[test]
    fn decode_restores_defaults() {
        let schema = person_schema();
        let decoded = Value::decode(&schema, "P", &[11, 0, 1, 0, 0, 0, 3, b'A', b'n', b'n', 0]).unwrap();
        assert_eq!(decoded, person("Ann", 30));
    }

    #[test]
    fn missing_required_field_is_named() {
        let schema = person_schema();
        let err = Value::decode(&schema, "P", &[8, 0, 2, 0, 0, 0, 31, 0]).unwrap_err();
        assert_eq!(err.missing_field_name(), Some("name"));
    }

    #[test]
    fn field_order_in_stream_does_not_matter() {
        let schema = person_schema();
        let bytes = [8, 0, 2, 0, 0, 0, 31, 11, 0, 1, 0, 0, 0, 3, b'A', b'n', b'n', 0];
        assert_eq!(Value::decode(&schema, "P", &bytes), Ok(person("Ann", 31)));
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let schema = person_schema();
        // field 9: list<string> ["x"], then name.
        let bytes = [
            15, 0, 9, 11, 0, 0, 0, 1, 0, 0, 0, 1, b'x',
            11, 0, 1, 0, 0, 0, 0,
            0,
        ];
        assert_eq!(Value::decode(&schema, "P", &bytes), Ok(person("", 30)));
    }

    #[test]
    fn unset_boxed_struct_writes_stop() {
        let inner = Def::new("Inner".to_owned(), DefKind::Struct, vec![]);
        let mut child = field("child", 1, TypeId::Struct(0), Requiredness::Default);
        child.boxed = true;
        let mut maybe = field("maybe", 2, TypeId::Struct(0), Requiredness::Optional);
        maybe.boxed = true;
        let outer = Def::new("Outer".to_owned(), DefKind::Struct, vec![child, maybe]);
        let schema = Schema::new(vec![inner, outer]);

        let value = Value::new_struct("Outer");
        let bytes = value.encode(&schema).unwrap();
        assert_eq!(bytes, [12, 0, 1, 0, 0]);
        assert_eq!(value.encoded_len(&schema), Ok(5));
    }

    #[test]
    fn nested_containers_round_trip() {
        // map<string, list<set<i32>>>
        let ty = TypeId::Map(
            Box::new(TypeId::String),
            Box::new(TypeId::List(Box::new(TypeId::Set(Box::new(TypeId::I32))))),
        );
        let schema = Schema::new(vec![Def::new(
            "Deep".to_owned(),
            DefKind::Struct,
            vec![field("m", 1, ty, Requiredness::Required)],
        )]);
        let value = Value::new_struct("Deep").with(
            "m",
            Value::Map(vec![
                (
                    Value::String("a".to_owned()),
                    Value::List(vec![
                        Value::Set(vec![Value::I32(1), Value::I32(2)]),
                        Value::Set(vec![]),
                    ]),
                ),
                (Value::String("b".to_owned()), Value::List(vec![])),
            ]),
        );
        let bytes = value.encode(&schema).unwrap();
        assert_eq!(value.encoded_len(&schema), Ok(bytes.len()));
        assert_eq!(Value::decode(&schema, "Deep", &bytes), Ok(value));
    }

    #[test]
    fn optional_empty_container_is_omitted() {
        let schema = Schema::new(vec![Def::new(
            "Tags".to_owned(),
            DefKind::Struct,
            vec![field("tags", 1, TypeId::List(Box::new(TypeId::String)), Requiredness::Optional)],
        )]);
        let value = Value::new_struct("Tags").with("tags", Value::List(vec![]));
        assert_eq!(value.encode(&schema), Ok(vec![0]));
        assert_eq!(value.encoded_len(&schema), Ok(1));
    }

    #[test]
    fn wire_type_mismatch_in_container() {
        let schema = Schema::new(vec![Def::new(
            "L".to_owned(),
            DefKind::Struct,
            vec![field("xs", 1, TypeId::List(Box::new(TypeId::I32)), Requiredness::Default)],
        )]);
        let bytes = [15, 0, 1, 10, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        assert_eq!(
            Value::decode(&schema, "L", &bytes),
            Err(ProtocolError::WireTypeMismatch {
                field_id: 1,
                expected: WireType::I32,
                found:    WireType::I64,
            })
        );
    }

    #[test]
    fn value_mismatch_is_an_error() {
        let schema = person_schema();
        let value = Value::new_struct("P").with("name", Value::I32(1));
        assert!(matches!(value.encode(&schema), Err(ProtocolError::ValueMismatch { .. })));
        assert_eq!(
            Value::new_struct("Nope").encode(&schema),
            Err(ProtocolError::UnknownType("Nope".to_owned()))
        );
    }
}
