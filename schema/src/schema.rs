use crate::{value::Value, wire::WireType};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Enum,
    Struct,
    Union,
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requiredness {
    Required,
    Optional,
    Default,
}

/// The closed set of type categories a runtime descriptor can describe.
/// `Enum` and `Struct` index into [`Schema::defs`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeId {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Enum(usize),
    Struct(usize),
    List(Box<TypeId>),
    Set(Box<TypeId>),
    Map(Box<TypeId>, Box<TypeId>),
}

impl TypeId {
    pub fn wire_type(&self) -> WireType {
        match self {
            TypeId::Bool => WireType::Bool,
            TypeId::Byte => WireType::Byte,
            TypeId::I16 => WireType::I16,
            TypeId::I32 | TypeId::Enum(_) => WireType::I32,
            TypeId::I64 => WireType::I64,
            TypeId::Double => WireType::Double,
            TypeId::String | TypeId::Binary => WireType::String,
            TypeId::Struct(_) => WireType::Struct,
            TypeId::List(_) => WireType::List,
            TypeId::Set(_) => WireType::Set,
            TypeId::Map(_, _) => WireType::Map,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TypeId::List(_) | TypeId::Set(_) | TypeId::Map(_, _))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name:         String,
    pub id:           i16,
    pub type_id:      TypeId,
    pub requiredness: Requiredness,
    /// Held behind a nilable reference: absent means "not set".
    pub boxed:        bool,
    pub default:      Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name:     String,
    pub kind:     DefKind,
    /// Fields in ascending id order.
    pub fields:   Vec<Field>,
    /// `(name, value)` pairs of an enum.
    pub variants: Vec<(String, i32)>,
    pub field_id_to_index:   HashMap<i16, usize>,
    pub field_name_to_index: HashMap<String, usize>,
}

impl Def {
    pub fn new(name: String, kind: DefKind, mut fields: Vec<Field>) -> Def {
        fields.sort_by_key(|field| field.id);
        let mut field_id_to_index = HashMap::new();
        let mut field_name_to_index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            field_id_to_index.insert(field.id, i);
            field_name_to_index.insert(field.name.clone(), i);
        }
        Def {
            name,
            kind,
            fields,
            variants: Vec::new(),
            field_id_to_index,
            field_name_to_index,
        }
    }

    pub fn new_enum(name: String, variants: Vec<(String, i32)>) -> Def {
        let mut def = Def::new(name, DefKind::Enum, Vec::new());
        def.variants = variants;
        def
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_name_to_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_by_id(&self, id: i16) -> Option<&Field> {
        self.field_id_to_index.get(&id).map(|&i| &self.fields[i])
    }

    pub fn variant_name(&self, value: i32) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }
}

/// Runtime type descriptors for one generated file and everything it
/// includes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub defs: Vec<Def>,
    pub def_name_to_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(defs: Vec<Def>) -> Schema {
        let mut def_name_to_index = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            def_name_to_index.insert(def.name.clone(), i);
        }
        Schema { defs, def_name_to_index }
    }

    pub fn def(&self, name: &str) -> Option<&Def> {
        self.def_name_to_index.get(name).map(|&i| &self.defs[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.def_name_to_index.get(name).copied()
    }
}
