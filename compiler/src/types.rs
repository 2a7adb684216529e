//! The schema tree handed over by the parser/validator stage.
//!
//! Everything here is plain data; it derives serde so a parser written in
//! any language can hand the tree over as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of a file within one [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub usize);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaTree {
    pub files: Vec<FileNode>,
}

impl SchemaTree {
    pub fn file(&self, id: FileId) -> Option<&FileNode> {
        self.files.get(id.0)
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len()).map(FileId)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNode {
    pub path:       String,
    /// `namespace <lang> <name>` declarations, keyed by language.
    pub namespaces: BTreeMap<String, String>,
    pub includes:   Vec<IncludeNode>,
    pub constants:  Vec<ConstNode>,
    pub enums:      Vec<EnumNode>,
    pub typedefs:   Vec<TypedefNode>,
    pub structs:    Vec<StructNode>,
    pub services:   Vec<ServiceNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeNode {
    pub path: String,
    pub file: FileId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

impl BaseType {
    pub fn idl_name(self) -> &'static str {
        match self {
            BaseType::Bool   => "bool",
            BaseType::Byte   => "byte",
            BaseType::I16    => "i16",
            BaseType::I32    => "i32",
            BaseType::I64    => "i64",
            BaseType::Double => "double",
            BaseType::String => "string",
            BaseType::Binary => "binary",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, BaseType::Byte | BaseType::I16 | BaseType::I32 | BaseType::I64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNode {
    Base(BaseType),
    /// A declared type. `include` indexes the file's include list when the
    /// reference is qualified (`shared.Point`).
    Named {
        #[serde(default)]
        include: Option<usize>,
        name:    String,
    },
    List(Box<TypeNode>),
    Set(Box<TypeNode>),
    Map(Box<TypeNode>, Box<TypeNode>),
}

impl TypeNode {
    pub fn named(name: &str) -> TypeNode {
        TypeNode::Named { include: None, name: name.to_string() }
    }

    pub fn included(include: usize, name: &str) -> TypeNode {
        TypeNode::Named { include: Some(include), name: name.to_string() }
    }

    pub fn list(elem: TypeNode) -> TypeNode {
        TypeNode::List(Box::new(elem))
    }

    pub fn set(elem: TypeNode) -> TypeNode {
        TypeNode::Set(Box::new(elem))
    }

    pub fn map(key: TypeNode, value: TypeNode) -> TypeNode {
        TypeNode::Map(Box::new(key), Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// `NAME`, `Enum.VALUE`, `include.NAME` or `include.Enum.VALUE`.
    Identifier(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

impl ConstValue {
    /// Category name used in type-mismatch diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            ConstValue::Bool(_)       => "bool",
            ConstValue::Int(_)        => "integer",
            ConstValue::Double(_)     => "double",
            ConstValue::String(_)     => "string",
            ConstValue::Identifier(_) => "identifier",
            ConstValue::List(_)       => "list",
            ConstValue::Map(_)        => "map",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstNode {
    pub name:  String,
    pub ty:    TypeNode,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumNode {
    pub name:   String,
    pub values: Vec<EnumValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueNode {
    pub name:  String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefNode {
    pub name:   String,
    pub target: TypeNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requiredness {
    Required,
    Optional,
    #[default]
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub id:           i16,
    pub name:         String,
    pub ty:           TypeNode,
    #[serde(default)]
    pub requiredness: Requiredness,
    #[serde(default)]
    pub default:      Option<ConstValue>,
}

impl FieldNode {
    pub fn new(id: i16, name: &str, ty: TypeNode, requiredness: Requiredness) -> FieldNode {
        FieldNode {
            id,
            name: name.to_string(),
            ty,
            requiredness,
            default: None,
        }
    }

    pub fn with_default(mut self, value: ConstValue) -> FieldNode {
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructNode {
    pub name:   String,
    pub kind:   StructKind,
    pub fields: Vec<FieldNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub name:    String,
    /// `(include index, service name)` of the extended service.
    #[serde(default)]
    pub extends: Option<(Option<usize>, String)>,
    pub methods: Vec<MethodNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub name:    String,
    #[serde(default)]
    pub oneway:  bool,
    /// `None` for `void`.
    #[serde(default)]
    pub returns: Option<TypeNode>,
    #[serde(default)]
    pub params:  Vec<FieldNode>,
    #[serde(default)]
    pub throws:  Vec<FieldNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_tree_from_json() {
        let json = r#"{
            "files": [{
                "path": "person.thrift",
                "namespaces": { "rs": "people" },
                "structs": [{
                    "name": "P",
                    "kind": "struct",
                    "fields": [
                        { "id": 1, "name": "name", "ty": { "base": "string" }, "requiredness": "required" },
                        { "id": 2, "name": "age", "ty": { "base": "i32" }, "requiredness": "optional",
                          "default": { "int": 30 } },
                        { "id": 3, "name": "tags", "ty": { "map": [{ "base": "binary" }, { "named": { "name": "Tag" } }] } }
                    ]
                }]
            }]
        }"#;
        let tree: SchemaTree = serde_json::from_str(json).unwrap();
        let file = tree.file(FileId(0)).unwrap();
        assert_eq!(file.namespaces.get("rs").map(String::as_str), Some("people"));
        let fields = &file.structs[0].fields;
        assert_eq!(fields[0].requiredness, Requiredness::Required);
        assert_eq!(fields[1].default, Some(ConstValue::Int(30)));
        assert_eq!(fields[2].requiredness, Requiredness::Default);
        assert_eq!(
            fields[2].ty,
            TypeNode::map(TypeNode::Base(BaseType::Binary), TypeNode::named("Tag"))
        );
    }
}
