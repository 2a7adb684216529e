//! Type-directed naming and constant checking.
//!
//! The resolver turns type references into the Rust spelling used at a
//! given position (field, container element, map key) and turns constant
//! values into checked [`TypedConst`] trees that render either as Rust
//! expressions or as runtime [`Value`]s.

use crate::{
    error::{CompileError, Result},
    options::GenOptions,
    scope::{ConstSymbol, EnumSymbol, FieldSymbol, IdentTarget, NamedKind, Scope, StructSymbol},
    types::{BaseType, ConstValue, FieldNode, FileId, Requiredness, TypeNode},
    utils::string_literal,
};
use brine_thrift_schema::{Value, WireType};
use std::collections::{BTreeMap, HashSet};

/// Constant references nested deeper than this are treated as a cycle.
const MAX_CONST_DEPTH: usize = 64;

static STRING_TYPE: TypeNode = TypeNode::Base(BaseType::String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Enum,
    Struct,
    List,
    Set,
    Map,
}

impl Category {
    pub fn wire_type(self) -> WireType {
        match self {
            Category::Bool => WireType::Bool,
            Category::Byte => WireType::Byte,
            Category::I16 => WireType::I16,
            Category::I32 | Category::Enum => WireType::I32,
            Category::I64 => WireType::I64,
            Category::Double => WireType::Double,
            Category::String | Category::Binary => WireType::String,
            Category::Struct => WireType::Struct,
            Category::List => WireType::List,
            Category::Set => WireType::Set,
            Category::Map => WireType::Map,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Category::List | Category::Set | Category::Map)
    }

    /// Emitted as `pub const` rather than inside `lazy_static!`.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Category::Bool
                | Category::Byte
                | Category::I16
                | Category::I32
                | Category::I64
                | Category::Double
                | Category::Enum
        )
    }
}

/// A type reference with typedefs followed to the end of the chain. Nested
/// type nodes stay relative to the scope that declares them.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Base(BaseType),
    Enum(&'a Scope, &'a EnumSymbol),
    Struct(&'a Scope, &'a StructSymbol),
    List(&'a Scope, &'a TypeNode),
    Set(&'a Scope, &'a TypeNode),
    Map(&'a Scope, &'a TypeNode, &'a TypeNode),
}

impl<'a> Resolved<'a> {
    pub fn category(&self) -> Category {
        match *self {
            Resolved::Base(base) => match base {
                BaseType::Bool => Category::Bool,
                BaseType::Byte => Category::Byte,
                BaseType::I16 => Category::I16,
                BaseType::I32 => Category::I32,
                BaseType::I64 => Category::I64,
                BaseType::Double => Category::Double,
                BaseType::String => Category::String,
                BaseType::Binary => Category::Binary,
            },
            Resolved::Enum(..) => Category::Enum,
            Resolved::Struct(..) => Category::Struct,
            Resolved::List(..) => Category::List,
            Resolved::Set(..) => Category::Set,
            Resolved::Map(..) => Category::Map,
        }
    }
}

/// How a value is held at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Inline,
    /// `Option<T>`: optional base type or enum without a default.
    Option,
    /// `Option<Box<T>>`: struct-typed field.
    OptionBox,
    /// `Box<T>`: struct-typed container element or map value.
    Box,
}

impl Wrap {
    /// Held behind a nilable reference; absence means "not set".
    pub fn is_nilable(self) -> bool {
        matches!(self, Wrap::Option | Wrap::OptionBox)
    }

    pub fn wrap_type(self, inline: &str) -> String {
        match self {
            Wrap::Inline => inline.to_string(),
            Wrap::Option => format!("Option<{}>", inline),
            Wrap::OptionBox => format!("Option<Box<{}>>", inline),
            Wrap::Box => format!("Box<{}>", inline),
        }
    }

    pub fn wrap_expr(self, expr: &str) -> String {
        match self {
            Wrap::Inline => expr.to_string(),
            Wrap::Option => format!("Some({})", expr),
            Wrap::OptionBox => format!("Some(Box::new({}))", expr),
            Wrap::Box => format!("Box::new({})", expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Field {
        requiredness: Requiredness,
        has_default:  bool,
    },
    Element,
    Key,
}

impl Position {
    pub fn of_field(field: &FieldNode) -> Position {
        Position::Field {
            requiredness: field.requiredness,
            has_default:  field.default.is_some(),
        }
    }
}

/// The Rust spelling of a type at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Full type, wrapper included, e.g. `Option<Box<Point>>`.
    pub name:     String,
    /// Type without the wrapper, e.g. `Point`.
    pub inline:   String,
    pub wrap:     Wrap,
    /// Category of the inline value. Binary map keys report `String`.
    pub category: Category,
}

#[derive(Debug, Clone, Copy)]
pub enum Conversion<'a> {
    None,
    /// Integer constant of another width.
    Int(BaseType),
    EnumToInt(BaseType),
    IntToEnum(&'a Scope, &'a EnumSymbol),
    ToDouble,
    TextToBytes,
    ListToSet,
    SetToList,
}

/// A constant value checked against its declared type.
#[derive(Debug, Clone)]
pub enum TypedConst<'a> {
    Bool(bool),
    Int(i64, BaseType),
    Double(f64),
    Text(String),
    Bytes(String),
    Enum {
        scope:  &'a Scope,
        symbol: &'a EnumSymbol,
        value:  i32,
    },
    List {
        set:   bool,
        wrap:  Wrap,
        items: Vec<TypedConst<'a>>,
    },
    Map {
        wrap:    Wrap,
        entries: Vec<(TypedConst<'a>, TypedConst<'a>)>,
    },
    Struct {
        scope:  &'a Scope,
        symbol: &'a StructSymbol,
        fields: Vec<(&'a FieldSymbol, Wrap, TypedConst<'a>)>,
    },
    Ref {
        scope:   &'a Scope,
        symbol:  &'a ConstSymbol,
        scalar:  bool,
        convert: Conversion<'a>,
    },
}

pub fn base_name(base: BaseType) -> &'static str {
    match base {
        BaseType::Bool => "bool",
        BaseType::Byte => "i8",
        BaseType::I16 => "i16",
        BaseType::I32 => "i32",
        BaseType::I64 => "i64",
        BaseType::Double => "f64",
        BaseType::String => "String",
        BaseType::Binary => "Vec<u8>",
    }
}

/// IDL spelling of a type, for diagnostics.
pub fn describe(ty: &TypeNode) -> String {
    match ty {
        TypeNode::Base(base) => base.idl_name().to_string(),
        TypeNode::Named { name, .. } => name.clone(),
        TypeNode::List(elem) => format!("list<{}>", describe(elem)),
        TypeNode::Set(elem) => format!("set<{}>", describe(elem)),
        TypeNode::Map(key, value) => format!("map<{},{}>", describe(key), describe(value)),
    }
}

pub fn float_literal(value: f64) -> String {
    if value.is_nan() {
        "f64::NAN".to_string()
    } else if value == f64::INFINITY {
        "f64::INFINITY".to_string()
    } else if value == f64::NEG_INFINITY {
        "f64::NEG_INFINITY".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn int_fits(value: i64, base: BaseType) -> bool {
    match base {
        BaseType::Byte => i8::try_from(value).is_ok(),
        BaseType::I16 => i16::try_from(value).is_ok(),
        BaseType::I32 => i32::try_from(value).is_ok(),
        _ => true,
    }
}

fn int_value(value: i64, base: BaseType) -> Value {
    match base {
        BaseType::Byte => Value::Byte(value as i8),
        BaseType::I16 => Value::I16(value as i16),
        BaseType::I32 => Value::I32(value as i32),
        _ => Value::I64(value),
    }
}

fn same_decl(a: &Scope, a_ident: &str, b: &Scope, b_ident: &str) -> bool {
    a.file == b.file && a_ident == b_ident
}

pub struct Resolver<'o> {
    options: &'o GenOptions,
}

impl<'o> Resolver<'o> {
    pub fn new(options: &'o GenOptions) -> Resolver<'o> {
        Resolver { options }
    }

    pub fn options(&self) -> &GenOptions {
        self.options
    }

    /// Follows typedef chains until a non-alias type is reached.
    pub fn resolve<'a>(&self, at: &'a Scope, ty: &'a TypeNode) -> Result<Resolved<'a>> {
        let mut scope = at;
        let mut ty = ty;
        let mut seen: HashSet<(FileId, &str)> = HashSet::new();
        loop {
            match ty {
                TypeNode::Base(base) => return Ok(Resolved::Base(*base)),
                TypeNode::List(elem) => return Ok(Resolved::List(scope, elem)),
                TypeNode::Set(elem) => return Ok(Resolved::Set(scope, elem)),
                TypeNode::Map(key, value) => return Ok(Resolved::Map(scope, key, value)),
                TypeNode::Named { include, name } => {
                    let named = scope.lookup_type(*include, name)?;
                    match named.kind {
                        NamedKind::Enum(symbol) => return Ok(Resolved::Enum(named.scope, symbol)),
                        NamedKind::Struct(symbol) => return Ok(Resolved::Struct(named.scope, symbol)),
                        NamedKind::Service(_) => return Err(CompileError::UnresolvedType(name.clone())),
                        NamedKind::Typedef(symbol) => {
                            if !seen.insert((named.scope.file, symbol.name.as_str())) {
                                return Err(CompileError::CyclicTypedef(symbol.name.clone()));
                            }
                            scope = named.scope;
                            ty = &symbol.target;
                        }
                    }
                }
            }
        }
    }

    /// Names a declaration of `defining` as seen from the file being
    /// generated. Files `out` does not import are reached by absolute path.
    pub fn qualify(&self, out: &Scope, defining: &Scope, ident: &str) -> String {
        if out.file == defining.file {
            ident.to_string()
        } else if let Some(alias) = out.alias_for(defining.file) {
            format!("{}::{}", alias, ident)
        } else {
            format!("{}::{}::{}", self.options.module_root, defining.module, ident)
        }
    }

    /// Inline representation of `ty`, written in `at` and named from `out`.
    /// Typedefs keep their alias name.
    pub fn type_name(&self, out: &Scope, at: &Scope, ty: &TypeNode) -> Result<String> {
        Ok(match ty {
            TypeNode::Base(base) => base_name(*base).to_string(),
            TypeNode::Named { include, name } => {
                let named = at.lookup_type(*include, name)?;
                if let NamedKind::Service(_) = named.kind {
                    return Err(CompileError::UnresolvedType(name.clone()));
                }
                self.qualify(out, named.scope, named.ident())
            }
            TypeNode::List(elem) => format!("Vec<{}>", self.slot(out, at, elem, Position::Element)?.name),
            TypeNode::Set(elem) => {
                self.require_ordered(at, elem)?;
                format!("BTreeSet<{}>", self.slot(out, at, elem, Position::Element)?.name)
            }
            TypeNode::Map(key, value) => {
                self.require_ordered(at, key)?;
                format!(
                    "BTreeMap<{}, {}>",
                    self.slot(out, at, key, Position::Key)?.name,
                    self.slot(out, at, value, Position::Element)?.name
                )
            }
        })
    }

    pub fn wrap(&self, category: Category, position: Position) -> Wrap {
        match (position, category) {
            (Position::Key, _) => Wrap::Inline,
            (_, Category::Struct) if self.options.inline_containers => Wrap::Inline,
            (Position::Element, Category::Struct) => Wrap::Box,
            (Position::Element, _) => Wrap::Inline,
            (Position::Field { .. }, Category::Struct) => Wrap::OptionBox,
            (Position::Field { .. }, c) if c.is_container() => Wrap::Inline,
            (Position::Field { requiredness, has_default }, _) => {
                if requiredness == Requiredness::Optional && !has_default {
                    Wrap::Option
                } else {
                    Wrap::Inline
                }
            }
        }
    }

    pub fn slot(&self, out: &Scope, at: &Scope, ty: &TypeNode, position: Position) -> Result<Slot> {
        let category = self.resolve(at, ty)?.category();
        let (inline, category) = if position == Position::Key && category == Category::Binary {
            ("String".to_string(), Category::String)
        } else {
            (self.type_name(out, at, ty)?, category)
        };
        let wrap = self.wrap(category, position);
        Ok(Slot {
            name: wrap.wrap_type(&inline),
            inline,
            wrap,
            category,
        })
    }

    pub fn field_slot(&self, out: &Scope, at: &Scope, field: &FieldNode) -> Result<Slot> {
        self.slot(out, at, &field.ty, Position::of_field(field))
    }

    /// Whether `Eq`, `Hash` and `Ord` can be derived for values of `ty`.
    pub fn is_orderable(&self, at: &Scope, ty: &TypeNode) -> Result<bool> {
        self.orderable_at(at, ty, &mut HashSet::new())
    }

    /// Set elements and map keys live in ordered collections.
    fn require_ordered(&self, at: &Scope, ty: &TypeNode) -> Result<()> {
        if self.is_orderable(at, ty)? {
            Ok(())
        } else {
            Err(CompileError::UnorderedKey(describe(ty)))
        }
    }

    pub fn struct_is_orderable(&self, scope: &Scope, symbol: &StructSymbol) -> Result<bool> {
        self.struct_orderable_at(scope, symbol, &mut HashSet::new())
    }

    fn orderable_at(&self, at: &Scope, ty: &TypeNode, visiting: &mut HashSet<(FileId, String)>) -> Result<bool> {
        Ok(match self.resolve(at, ty)? {
            Resolved::Base(base) => base != BaseType::Double,
            Resolved::Enum(..) => true,
            Resolved::Struct(scope, symbol) => self.struct_orderable_at(scope, symbol, visiting)?,
            Resolved::List(scope, elem) | Resolved::Set(scope, elem) => self.orderable_at(scope, elem, visiting)?,
            Resolved::Map(scope, key, value) => {
                self.orderable_at(scope, key, visiting)? && self.orderable_at(scope, value, visiting)?
            }
        })
    }

    fn struct_orderable_at(
        &self,
        scope: &Scope,
        symbol: &StructSymbol,
        visiting: &mut HashSet<(FileId, String)>,
    ) -> Result<bool> {
        if !visiting.insert((scope.file, symbol.ident.clone())) {
            return Ok(true);
        }
        for field in &symbol.fields {
            if !self.orderable_at(scope, &field.node.ty, visiting)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A structural key for type equality across scopes.
    fn canonical(&self, at: &Scope, ty: &TypeNode) -> Result<String> {
        Ok(match self.resolve(at, ty)? {
            Resolved::Base(base) => base.idl_name().to_string(),
            Resolved::Enum(scope, symbol) => format!("{}:{}", scope.file.0, symbol.ident),
            Resolved::Struct(scope, symbol) => format!("{}:{}", scope.file.0, symbol.ident),
            Resolved::List(scope, elem) => format!("list<{}>", self.canonical(scope, elem)?),
            Resolved::Set(scope, elem) => format!("set<{}>", self.canonical(scope, elem)?),
            Resolved::Map(scope, key, value) => {
                format!("map<{},{}>", self.canonical(scope, key)?, self.canonical(scope, value)?)
            }
        })
    }

    /// Checks `value` against `ty`, both written in `at`. `name` labels
    /// diagnostics.
    pub fn check_const<'a>(
        &self,
        name: &str,
        at: &'a Scope,
        ty: &'a TypeNode,
        value: &ConstValue,
    ) -> Result<TypedConst<'a>> {
        let resolved = self.resolve(at, ty)?;
        let mismatch = || CompileError::TypeMismatch {
            name:     name.to_string(),
            declared: describe(ty),
            literal:  value.category().to_string(),
        };
        if let ConstValue::Identifier(ident) = value {
            return self.check_identifier(name, at, ty, resolved, ident);
        }
        Ok(match (resolved, value) {
            (Resolved::Base(BaseType::Bool), ConstValue::Bool(b)) => TypedConst::Bool(*b),
            (Resolved::Base(base), ConstValue::Int(v)) if base.is_integer() => {
                if !int_fits(*v, base) {
                    return Err(mismatch());
                }
                TypedConst::Int(*v, base)
            }
            (Resolved::Base(BaseType::Double), ConstValue::Int(v)) => TypedConst::Double(*v as f64),
            (Resolved::Base(BaseType::Double), ConstValue::Double(d)) => TypedConst::Double(*d),
            (Resolved::Base(BaseType::String), ConstValue::String(s)) => TypedConst::Text(s.clone()),
            (Resolved::Base(BaseType::Binary), ConstValue::String(s)) => TypedConst::Bytes(s.clone()),
            (Resolved::Enum(scope, symbol), ConstValue::Int(v)) => TypedConst::Enum {
                scope,
                symbol,
                value: i32::try_from(*v).map_err(|_| mismatch())?,
            },
            (Resolved::List(scope, elem), ConstValue::List(items))
            | (Resolved::Set(scope, elem), ConstValue::List(items)) => {
                let wrap = self.wrap(self.resolve(scope, elem)?.category(), Position::Element);
                TypedConst::List {
                    set: matches!(resolved, Resolved::Set(..)),
                    wrap,
                    items: items
                        .iter()
                        .map(|item| self.check_const(name, scope, elem, item))
                        .collect::<Result<_>>()?,
                }
            }
            (Resolved::Map(scope, key, value), ConstValue::Map(entries)) => {
                let key_ty = match self.resolve(scope, key)?.category() {
                    Category::Binary => &STRING_TYPE,
                    _ => key,
                };
                let wrap = self.wrap(self.resolve(scope, value)?.category(), Position::Element);
                let mut checked = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    checked.push((
                        self.check_const(name, scope, key_ty, k)?,
                        self.check_const(name, scope, value, v)?,
                    ));
                }
                TypedConst::Map { wrap, entries: checked }
            }
            (Resolved::Struct(scope, symbol), ConstValue::Map(entries)) => {
                let mut fields = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let field_name = match k {
                        ConstValue::String(s) => s,
                        _ => return Err(mismatch()),
                    };
                    let field = symbol.field(field_name).ok_or_else(|| CompileError::UnknownField {
                        strukt: symbol.name.clone(),
                        field:  field_name.clone(),
                    })?;
                    let category = self.resolve(scope, &field.node.ty)?.category();
                    let wrap = self.wrap(category, Position::of_field(&field.node));
                    fields.push((field, wrap, self.check_const(name, scope, &field.node.ty, v)?));
                }
                TypedConst::Struct { scope, symbol, fields }
            }
            _ => return Err(mismatch()),
        })
    }

    fn check_identifier<'a>(
        &self,
        name: &str,
        at: &'a Scope,
        ty: &TypeNode,
        target: Resolved<'a>,
        ident: &str,
    ) -> Result<TypedConst<'a>> {
        let mismatch = |literal: String| CompileError::TypeMismatch {
            name: name.to_string(),
            declared: describe(ty),
            literal,
        };
        match at.lookup_identifier(ident)? {
            IdentTarget::EnumValue(scope, symbol, value) => match target {
                Resolved::Enum(ts, te) if same_decl(ts, &te.ident, scope, &symbol.ident) => Ok(TypedConst::Enum {
                    scope,
                    symbol,
                    value: value.value,
                }),
                Resolved::Base(base) if base.is_integer() && int_fits(value.value as i64, base) => {
                    Ok(TypedConst::Int(value.value as i64, base))
                }
                _ => Err(mismatch(format!("enum value {}", ident))),
            },
            IdentTarget::Const(scope, symbol) => {
                let source = self.resolve(scope, &symbol.node.ty)?;
                let same_type = || -> Result<bool> {
                    Ok(self.canonical(at, ty)? == self.canonical(scope, &symbol.node.ty)?)
                };
                let same_elems = |a: (&Scope, &TypeNode), b: (&Scope, &TypeNode)| -> Result<bool> {
                    Ok(self.canonical(a.0, a.1)? == self.canonical(b.0, b.1)?)
                };
                let convert = match (target, source) {
                    (Resolved::Base(t), Resolved::Base(f)) if t == f => Conversion::None,
                    (Resolved::Base(t), Resolved::Base(f)) if t.is_integer() && f.is_integer() => Conversion::Int(t),
                    (Resolved::Base(t), Resolved::Enum(..)) if t.is_integer() => Conversion::EnumToInt(t),
                    (Resolved::Enum(ts, te), Resolved::Base(f)) if f.is_integer() => Conversion::IntToEnum(ts, te),
                    (Resolved::Enum(ts, te), Resolved::Enum(fs, fe)) if same_decl(ts, &te.ident, fs, &fe.ident) => {
                        Conversion::None
                    }
                    (Resolved::Base(BaseType::Double), Resolved::Base(f)) if f.is_integer() => Conversion::ToDouble,
                    (Resolved::Base(BaseType::Binary), Resolved::Base(BaseType::String)) => Conversion::TextToBytes,
                    (Resolved::List(..), Resolved::List(..))
                    | (Resolved::Set(..), Resolved::Set(..))
                    | (Resolved::Map(..), Resolved::Map(..))
                    | (Resolved::Struct(..), Resolved::Struct(..))
                        if same_type()? =>
                    {
                        Conversion::None
                    }
                    (Resolved::Set(ts, te), Resolved::List(fs, fe)) if same_elems((ts, te), (fs, fe))? => {
                        Conversion::ListToSet
                    }
                    (Resolved::List(ts, te), Resolved::Set(fs, fe)) if same_elems((ts, te), (fs, fe))? => {
                        Conversion::SetToList
                    }
                    _ => return Err(mismatch(format!("constant of type {}", describe(&symbol.node.ty)))),
                };
                let narrowed = match convert {
                    Conversion::Int(base) | Conversion::EnumToInt(base) => Some(base),
                    Conversion::IntToEnum(..) => Some(BaseType::I32),
                    _ => None,
                };
                if let Some(base) = narrowed {
                    if let Some(v) = self.const_int(scope, symbol, 0)? {
                        if !int_fits(v, base) {
                            return Err(mismatch(format!("constant {} = {}", ident, v)));
                        }
                    }
                }
                Ok(TypedConst::Ref {
                    scope,
                    symbol,
                    scalar: source.category().is_scalar(),
                    convert,
                })
            }
        }
    }

    /// Integer held by an integer or enum constant, following references.
    /// `None` when the value is not an integer literal at the end of the chain.
    fn const_int(&self, scope: &Scope, symbol: &ConstSymbol, depth: usize) -> Result<Option<i64>> {
        if depth >= MAX_CONST_DEPTH {
            return Err(CompileError::CyclicConstant(symbol.node.name.clone()));
        }
        match symbol.node.value {
            ConstValue::Int(v) => Ok(Some(v)),
            ConstValue::Identifier(ref ident) => match scope.lookup_identifier(ident)? {
                IdentTarget::EnumValue(_, _, value) => Ok(Some(value.value as i64)),
                IdentTarget::Const(scope, symbol) => self.const_int(scope, symbol, depth + 1),
            },
            _ => Ok(None),
        }
    }

    /// Rust expression for a checked constant, named from `out`.
    pub fn render(&self, out: &Scope, value: &TypedConst) -> String {
        match value {
            TypedConst::Bool(b) => b.to_string(),
            TypedConst::Int(v, _) => v.to_string(),
            TypedConst::Double(d) => float_literal(*d),
            TypedConst::Text(s) => format!("String::from({})", string_literal(s)),
            TypedConst::Bytes(s) => format!("{}.as_bytes().to_vec()", string_literal(s)),
            TypedConst::Enum { scope, symbol, value } => {
                let ty = self.qualify(out, scope, &symbol.ident);
                match symbol.values.iter().find(|v| v.value == *value) {
                    Some(v) => format!("{}::{}", ty, v.ident),
                    None => format!("{}({})", ty, value),
                }
            }
            TypedConst::List { set, wrap, items } => {
                let items: Vec<String> = items.iter().map(|item| wrap.wrap_expr(&self.render(out, item))).collect();
                match (set, items.is_empty()) {
                    (false, _) => format!("vec![{}]", items.join(", ")),
                    (true, true) => "BTreeSet::new()".to_string(),
                    (true, false) => format!("BTreeSet::from([{}])", items.join(", ")),
                }
            }
            TypedConst::Map { wrap, entries } => {
                if entries.is_empty() {
                    return "BTreeMap::new()".to_string();
                }
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("({}, {})", self.render(out, k), wrap.wrap_expr(&self.render(out, v))))
                    .collect();
                format!("BTreeMap::from([{}])", entries.join(", "))
            }
            TypedConst::Struct { scope, symbol, fields } => {
                let mut text = format!("{} {{ ", self.qualify(out, scope, &symbol.ident));
                for (field, wrap, value) in fields {
                    text.push_str(&format!("{}: {}, ", field.ident, wrap.wrap_expr(&self.render(out, value))));
                }
                text.push_str("..Default::default() }");
                text
            }
            TypedConst::Ref { scope, symbol, scalar, convert } => {
                let name = self.qualify(out, scope, &symbol.ident);
                match convert {
                    Conversion::None if *scalar => name,
                    Conversion::None => format!("{}.clone()", name),
                    Conversion::Int(base) => format!("({} as {})", name, base_name(*base)),
                    Conversion::EnumToInt(base) => format!("({}.0 as {})", name, base_name(*base)),
                    Conversion::IntToEnum(es, e) => format!("{}({} as i32)", self.qualify(out, es, &e.ident), name),
                    Conversion::ToDouble => format!("({} as f64)", name),
                    Conversion::TextToBytes => format!("{}.as_bytes().to_vec()", name),
                    Conversion::ListToSet | Conversion::SetToList => format!("{}.iter().cloned().collect()", name),
                }
            }
        }
    }

    /// Runtime value of a checked constant. Struct values carry the
    /// descriptor name of their type and only the fields the literal sets.
    pub fn evaluate(&self, out: &Scope, value: &TypedConst) -> Result<Value> {
        self.evaluate_at(out, value, 0)
    }

    fn evaluate_at(&self, out: &Scope, value: &TypedConst, depth: usize) -> Result<Value> {
        Ok(match value {
            TypedConst::Bool(b) => Value::Bool(*b),
            TypedConst::Int(v, base) => int_value(*v, *base),
            TypedConst::Double(d) => Value::Double(*d),
            TypedConst::Text(s) => Value::String(s.clone()),
            TypedConst::Bytes(s) => Value::Binary(s.clone().into_bytes()),
            TypedConst::Enum { value, .. } => Value::Enum(*value),
            TypedConst::List { set, items, .. } => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate_at(out, item, depth))
                    .collect::<Result<Vec<_>>>()?;
                if *set {
                    Value::Set(items)
                } else {
                    Value::List(items)
                }
            }
            TypedConst::Map { entries, .. } => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.evaluate_at(out, k, depth)?, self.evaluate_at(out, v, depth)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            TypedConst::Struct { scope, symbol, fields } => {
                let mut values = BTreeMap::new();
                for (field, _, value) in fields {
                    values.insert(field.node.name.clone(), self.evaluate_at(out, value, depth)?);
                }
                Value::Struct(self.qualify(out, scope, &symbol.ident), values)
            }
            TypedConst::Ref { scope, symbol, convert, .. } => {
                if depth >= MAX_CONST_DEPTH {
                    return Err(CompileError::CyclicConstant(symbol.node.name.clone()));
                }
                let checked = self.check_const(&symbol.node.name, scope, &symbol.node.ty, &symbol.node.value)?;
                let source = self.evaluate_at(out, &checked, depth + 1)?;
                match *convert {
                    Conversion::None => source,
                    Conversion::Int(base) | Conversion::EnumToInt(base) => int_value(source.as_i64(), base),
                    Conversion::IntToEnum(..) => Value::Enum(source.as_i64() as i32),
                    Conversion::ToDouble => Value::Double(source.as_i64() as f64),
                    Conversion::TextToBytes => Value::Binary(source.as_bytes().to_vec()),
                    Conversion::ListToSet => Value::Set(source.as_slice().to_vec()),
                    Conversion::SetToList => Value::List(source.as_slice().to_vec()),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::types::*;
    use pretty_assertions::assert_eq;

    fn shared() -> FileNode {
        FileNode {
            path: "shared.thrift".to_string(),
            enums: vec![EnumNode {
                name:   "Color".to_string(),
                values: vec![
                    EnumValueNode { name: "RED".to_string(), value: 1 },
                    EnumValueNode { name: "GREEN".to_string(), value: 2 },
                ],
            }],
            structs: vec![StructNode {
                name:   "Point".to_string(),
                kind:   StructKind::Struct,
                fields: vec![
                    FieldNode::new(1, "x", TypeNode::Base(BaseType::Double), Requiredness::Default),
                    FieldNode::new(2, "label", TypeNode::Base(BaseType::String), Requiredness::Optional),
                ],
            }],
            constants: vec![ConstNode {
                name:  "LIMIT".to_string(),
                ty:    TypeNode::Base(BaseType::I16),
                value: ConstValue::Int(7),
            }],
            ..Default::default()
        }
    }

    fn main_file() -> FileNode {
        FileNode {
            path: "main.thrift".to_string(),
            includes: vec![IncludeNode { path: "shared.thrift".to_string(), file: FileId(0) }],
            typedefs: vec![
                TypedefNode { name: "Blob".to_string(), target: TypeNode::Base(BaseType::Binary) },
                TypedefNode { name: "Loop".to_string(), target: TypeNode::named("Loop2") },
                TypedefNode { name: "Loop2".to_string(), target: TypeNode::named("Loop") },
            ],
            structs: vec![StructNode {
                name:   "Holder".to_string(),
                kind:   StructKind::Struct,
                fields: vec![FieldNode::new(1, "n", TypeNode::Base(BaseType::I64), Requiredness::Default)],
            }],
            constants: vec![ConstNode {
                name:  "SEED".to_string(),
                ty:    TypeNode::Base(BaseType::I32),
                value: ConstValue::Identifier("shared.LIMIT".to_string()),
            }],
            ..Default::default()
        }
    }

    fn tree() -> SchemaTree {
        SchemaTree { files: vec![shared(), main_file()] }
    }

    fn int() -> TypeNode {
        TypeNode::Base(BaseType::I32)
    }

    #[test]
    fn slots_follow_the_indirection_rules() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let field = |ty: TypeNode, req| FieldNode::new(1, "f", ty, req);

        let slot = resolver.field_slot(&scope, &scope, &field(int(), Requiredness::Optional)).unwrap();
        assert_eq!(slot.name, "Option<i32>");
        assert_eq!(slot.wrap, Wrap::Option);

        let with_default = field(int(), Requiredness::Optional).with_default(ConstValue::Int(3));
        assert_eq!(resolver.field_slot(&scope, &scope, &with_default).unwrap().name, "i32");

        let point = TypeNode::included(0, "Point");
        let slot = resolver.field_slot(&scope, &scope, &field(point.clone(), Requiredness::Required)).unwrap();
        assert_eq!(slot.name, "Option<Box<shared::Point>>");

        let list = TypeNode::list(point.clone());
        let slot = resolver.field_slot(&scope, &scope, &field(list, Requiredness::Optional)).unwrap();
        assert_eq!(slot.name, "Vec<Box<shared::Point>>");
        assert_eq!(slot.wrap, Wrap::Inline);

        let map = TypeNode::map(TypeNode::named("Holder"), TypeNode::named("Holder"));
        assert_eq!(
            resolver.type_name(&scope, &scope, &map).unwrap(),
            "BTreeMap<Holder, Box<Holder>>"
        );
    }

    #[test]
    fn unordered_keys_are_rejected() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let doubles = TypeNode::set(TypeNode::Base(BaseType::Double));
        assert!(matches!(
            resolver.type_name(&scope, &scope, &doubles),
            Err(CompileError::UnorderedKey(ty)) if ty == "double"
        ));
        // `Point` holds a double.
        let by_point = TypeNode::map(TypeNode::included(0, "Point"), int());
        let error = resolver.type_name(&scope, &scope, &by_point).unwrap_err();
        assert!(matches!(error, CompileError::UnorderedKey(_)));
        assert!(error.is_recoverable());
        // Doubles are fine as map values and list elements.
        let values = TypeNode::map(int(), TypeNode::list(TypeNode::Base(BaseType::Double)));
        assert_eq!(resolver.type_name(&scope, &scope, &values).unwrap(), "BTreeMap<i32, Vec<f64>>");
    }

    #[test]
    fn inline_containers_drop_boxes() {
        let tree = tree();
        let options = GenOptions { inline_containers: true, ..GenOptions::default() };
        let mut session = Session::new(&tree, options);
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let list = TypeNode::list(TypeNode::named("Holder"));
        assert_eq!(resolver.type_name(&scope, &scope, &list).unwrap(), "Vec<Holder>");
        let field = FieldNode::new(1, "h", TypeNode::named("Holder"), Requiredness::Optional);
        assert_eq!(resolver.field_slot(&scope, &scope, &field).unwrap().name, "Holder");
    }

    #[test]
    fn binary_map_keys_become_strings() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let direct = TypeNode::map(TypeNode::Base(BaseType::Binary), int());
        assert_eq!(resolver.type_name(&scope, &scope, &direct).unwrap(), "BTreeMap<String, i32>");
        let aliased = TypeNode::map(TypeNode::named("Blob"), int());
        assert_eq!(resolver.type_name(&scope, &scope, &aliased).unwrap(), "BTreeMap<String, i32>");
        assert_eq!(resolver.type_name(&scope, &scope, &TypeNode::named("Blob")).unwrap(), "Blob");
    }

    #[test]
    fn typedef_cycles_are_reported() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        assert!(matches!(
            resolver.resolve(&scope, &TypeNode::named("Loop")),
            Err(CompileError::CyclicTypedef(_))
        ));
    }

    #[test]
    fn doubles_are_not_orderable() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        assert!(resolver.is_orderable(&scope, &TypeNode::named("Holder")).unwrap());
        assert!(!resolver.is_orderable(&scope, &TypeNode::list(TypeNode::included(0, "Point"))).unwrap());
    }

    #[test]
    fn renders_constants() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let render = |ty: TypeNode, value: ConstValue| -> Result<String> {
            let checked = resolver.check_const("C", &scope, &ty, &value)?;
            Ok(resolver.render(&scope, &checked))
        };

        assert_eq!(render(int(), ConstValue::Int(-5)).unwrap(), "-5");
        assert_eq!(render(TypeNode::Base(BaseType::Double), ConstValue::Int(2)).unwrap(), "2.0");
        assert_eq!(
            render(TypeNode::Base(BaseType::String), ConstValue::String("hi".to_string())).unwrap(),
            "String::from(\"hi\")"
        );
        assert_eq!(
            render(TypeNode::included(0, "Color"), ConstValue::Identifier("shared.Color.GREEN".to_string())).unwrap(),
            "shared::Color::GREEN"
        );
        assert_eq!(render(TypeNode::included(0, "Color"), ConstValue::Int(9)).unwrap(), "shared::Color(9)");
        assert_eq!(
            render(TypeNode::Base(BaseType::I64), ConstValue::Identifier("SEED".to_string())).unwrap(),
            "(SEED as i64)"
        );
        assert_eq!(
            render(TypeNode::set(int()), ConstValue::List(vec![ConstValue::Int(1), ConstValue::Int(2)])).unwrap(),
            "BTreeSet::from([1, 2])"
        );
        assert_eq!(
            render(
                TypeNode::map(TypeNode::Base(BaseType::Binary), TypeNode::named("Holder")),
                ConstValue::Map(vec![(
                    ConstValue::String("k".to_string()),
                    ConstValue::Map(vec![(ConstValue::String("n".to_string()), ConstValue::Int(1))]),
                )])
            )
            .unwrap(),
            "BTreeMap::from([(String::from(\"k\"), Box::new(Holder { n: 1, ..Default::default() }))])"
        );
        assert_eq!(
            render(
                TypeNode::included(0, "Point"),
                ConstValue::Map(vec![(ConstValue::String("label".to_string()), ConstValue::String("o".to_string()))])
            )
            .unwrap(),
            "shared::Point { label: Some(String::from(\"o\")), ..Default::default() }"
        );
    }

    #[test]
    fn rejects_incompatible_constants() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let bool_ty = TypeNode::Base(BaseType::Bool);
        assert!(matches!(
            resolver.check_const("FLAG", &scope, &bool_ty, &ConstValue::Int(1)),
            Err(CompileError::TypeMismatch { .. })
        ));
        let byte_ty = TypeNode::Base(BaseType::Byte);
        assert!(matches!(
            resolver.check_const("B", &scope, &byte_ty, &ConstValue::Int(300)),
            Err(CompileError::TypeMismatch { .. })
        ));
        let holder = TypeNode::named("Holder");
        let unknown = ConstValue::Map(vec![(ConstValue::String("zzz".to_string()), ConstValue::Int(1))]);
        assert!(matches!(
            resolver.check_const("H", &scope, &holder, &unknown),
            Err(CompileError::UnknownField { .. })
        ));
        assert!(matches!(
            resolver.check_const("U", &scope, &bool_ty, &ConstValue::Identifier("NOPE".to_string())),
            Err(CompileError::UndefinedIdentifier(_))
        ));
    }

    #[test]
    fn narrowing_references_are_range_checked() {
        let int_const = |name: &str, ty: BaseType, value: ConstValue| ConstNode {
            name: name.to_string(),
            ty: TypeNode::Base(ty),
            value,
        };
        let tree = SchemaTree {
            files: vec![FileNode {
                path: "n.thrift".to_string(),
                enums: vec![EnumNode {
                    name:   "Mode".to_string(),
                    values: vec![EnumValueNode { name: "ON".to_string(), value: 1 }],
                }],
                constants: vec![
                    int_const("BIG", BaseType::I64, ConstValue::Int(100_000)),
                    int_const("SMALL", BaseType::I64, ConstValue::Int(5)),
                    int_const("VIA", BaseType::I64, ConstValue::Identifier("BIG".to_string())),
                    int_const("HUGE", BaseType::I64, ConstValue::Int(3_000_000_000)),
                ],
                ..Default::default()
            }],
        };
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(0)).unwrap();
        let resolver = session.resolver();
        let byte = TypeNode::Base(BaseType::Byte);
        let reference = |ident: &str| ConstValue::Identifier(ident.to_string());

        for ident in ["BIG", "VIA"] {
            assert!(matches!(
                resolver.check_const("B", &scope, &byte, &reference(ident)),
                Err(CompileError::TypeMismatch { .. })
            ));
        }
        let checked = resolver.check_const("S", &scope, &byte, &reference("SMALL")).unwrap();
        assert_eq!(resolver.render(&scope, &checked), "(SMALL as i8)");
        assert_eq!(resolver.evaluate(&scope, &checked).unwrap(), Value::Byte(5));

        let mode = TypeNode::named("Mode");
        assert!(matches!(
            resolver.check_const("M", &scope, &mode, &reference("HUGE")),
            Err(CompileError::TypeMismatch { .. })
        ));
        assert!(resolver.check_const("M", &scope, &mode, &reference("SMALL")).is_ok());
        // Widening never needs the value.
        assert!(resolver.check_const("W", &scope, &TypeNode::Base(BaseType::I64), &reference("BIG")).is_ok());
    }

    #[test]
    fn evaluates_constant_references() {
        let tree = tree();
        let mut session = Session::new(&tree, GenOptions::default());
        let scope = session.scope(FileId(1)).unwrap();
        let resolver = session.resolver();
        let ty = TypeNode::Base(BaseType::I64);
        let checked = resolver
            .check_const("C", &scope, &ty, &ConstValue::Identifier("SEED".to_string()))
            .unwrap();
        assert_eq!(resolver.evaluate(&scope, &checked).unwrap(), Value::I64(7));
    }
}
