//! Per-file symbol tables.
//!
//! A [`Scope`] is built once per file by the [`Session`], holds the Rust
//! identifier minted for every declaration, and links to the scopes of the
//! includes the file actually uses.

use crate::{
    error::{CompileError, Result},
    namespace::Namespace,
    session::Session,
    types::{
        ConstNode, ConstValue, FieldNode, FileId, FileNode, MethodNode, Requiredness, StructKind,
        StructNode, TypeNode,
    },
    utils::{const_ident, field_ident, module_path, type_ident},
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// Type names the generated code relies on; user types never take them.
pub const RESERVED_NAMES: [&str; 21] = [
    "Self", "Option", "Some", "None", "Box", "Vec", "String", "Result", "Ok", "Err",
    "Default", "BTreeMap", "BTreeSet", "ByteBuffer", "ByteBufferMut", "ProtocolError",
    "ThriftStruct", "WireType", "Error", "Display", "From",
];

const RESERVED_MODULES: [&str; 7] = ["std", "core", "alloc", "crate", "self", "super", "brine_thrift"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    Args,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SymbolKey {
    Type(String),
    Wrapper(String, String, WrapperKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueSymbol {
    pub name:  String,
    pub ident: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSymbol {
    pub name:   String,
    pub ident:  String,
    pub values: Vec<EnumValueSymbol>,
}

impl EnumSymbol {
    pub fn value(&self, name: &str) -> Option<&EnumValueSymbol> {
        self.values.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedefSymbol {
    pub name:   String,
    pub ident:  String,
    pub target: TypeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub node:  FieldNode,
    pub ident: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructOrigin {
    Declared,
    /// Synthesized argument or result wrapper of a service method.
    Wrapper {
        service: String,
        method:  String,
        kind:    WrapperKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSymbol {
    pub name:   String,
    pub ident:  String,
    pub kind:   StructKind,
    /// Fields in declaration order. Union fields are always optional.
    pub fields: Vec<FieldSymbol>,
    pub origin: StructOrigin,
}

impl StructSymbol {
    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.node.name == name)
    }

    /// Fields in ascending field-id order, the order every codec routine
    /// uses.
    pub fn fields_by_id(&self) -> Vec<&FieldSymbol> {
        let mut fields: Vec<&FieldSymbol> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.node.id);
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSymbol {
    pub node:   MethodNode,
    pub ident:  String,
    /// Index into [`Scope::structs`] of the argument wrapper.
    pub args:   usize,
    /// Index of the result wrapper; `None` for oneway methods.
    pub result: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSymbol {
    pub name:    String,
    pub ident:   String,
    pub extends: Option<(Option<usize>, String)>,
    pub methods: Vec<MethodSymbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstSymbol {
    pub node:  ConstNode,
    pub ident: String,
}

/// An included file as seen from the including scope.
#[derive(Debug, Clone)]
pub struct Import {
    pub file:  FileId,
    pub alias: String,
    pub scope: Rc<Scope>,
}

#[derive(Debug, Clone, Copy)]
enum TypeSlot {
    Enum(usize),
    Typedef(usize),
    Struct(usize),
    Service(usize),
}

/// A declared type found by name, together with the scope that declares it.
#[derive(Debug, Clone, Copy)]
pub struct Named<'a> {
    pub scope: &'a Scope,
    pub kind:  NamedKind<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum NamedKind<'a> {
    Enum(&'a EnumSymbol),
    Typedef(&'a TypedefSymbol),
    Struct(&'a StructSymbol),
    Service(&'a ServiceSymbol),
}

impl<'a> Named<'a> {
    pub fn ident(&self) -> &'a str {
        match self.kind {
            NamedKind::Enum(s) => &s.ident,
            NamedKind::Typedef(s) => &s.ident,
            NamedKind::Struct(s) => &s.ident,
            NamedKind::Service(s) => &s.ident,
        }
    }
}

/// What a constant-valued identifier refers to.
#[derive(Debug, Clone, Copy)]
pub enum IdentTarget<'a> {
    Const(&'a Scope, &'a ConstSymbol),
    EnumValue(&'a Scope, &'a EnumSymbol, &'a EnumValueSymbol),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub file:      FileId,
    pub path:      String,
    /// Module path of the generated file, e.g. `shared` or `com::example`.
    pub module:    String,
    pub enums:     Vec<EnumSymbol>,
    pub typedefs:  Vec<TypedefSymbol>,
    /// Declared structs, unions and exceptions followed by the synthesized
    /// service wrappers.
    pub structs:   Vec<StructSymbol>,
    pub services:  Vec<ServiceSymbol>,
    pub constants: Vec<ConstSymbol>,
    types:         HashMap<String, TypeSlot>,
    consts:        HashMap<String, usize>,
    /// Indexed like the file's include list; unused includes stay `None`.
    includes:      Vec<Option<Import>>,
    prefixes:      Vec<String>,
}

/// Prefix by which declarations of an included file are referenced.
fn include_prefix(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn scope_module(node: &FileNode) -> String {
    let namespace = ["rs", "rust", "*"]
        .iter()
        .find_map(|lang| node.namespaces.get(*lang))
        .cloned()
        .unwrap_or_else(|| include_prefix(&node.path));
    module_path(&namespace)
}

fn collect_type_includes(ty: &TypeNode, used: &mut BTreeSet<usize>) {
    match ty {
        TypeNode::Base(_) => {}
        TypeNode::Named { include, .. } => used.extend(*include),
        TypeNode::List(elem) | TypeNode::Set(elem) => collect_type_includes(elem, used),
        TypeNode::Map(key, value) => {
            collect_type_includes(key, used);
            collect_type_includes(value, used);
        }
    }
}

fn collect_value_includes(value: &ConstValue, prefixes: &[String], used: &mut BTreeSet<usize>) {
    match value {
        ConstValue::Identifier(ident) => {
            let mut parts = ident.split('.');
            if let (Some(first), Some(_)) = (parts.next(), parts.next()) {
                if let Some(i) = prefixes.iter().position(|p| p == first) {
                    used.insert(i);
                }
            }
        }
        ConstValue::List(items) => {
            for item in items {
                collect_value_includes(item, prefixes, used);
            }
        }
        ConstValue::Map(entries) => {
            for (k, v) in entries {
                collect_value_includes(k, prefixes, used);
                collect_value_includes(v, prefixes, used);
            }
        }
        _ => {}
    }
}

fn collect_field_includes(field: &FieldNode, prefixes: &[String], used: &mut BTreeSet<usize>) {
    collect_type_includes(&field.ty, used);
    if let Some(ref default) = field.default {
        collect_value_includes(default, prefixes, used);
    }
}

/// Argument and result wrapper declarations of one service method.
fn wrapper_nodes(method: &MethodNode) -> (Vec<FieldNode>, Option<Vec<FieldNode>>) {
    let args = method.params.clone();
    if method.oneway {
        return (args, None);
    }
    let mut result = Vec::with_capacity(method.throws.len() + 1);
    if let Some(ref returns) = method.returns {
        result.push(FieldNode::new(0, "success", returns.clone(), Requiredness::Optional));
    }
    for throw in &method.throws {
        let mut field = throw.clone();
        field.requiredness = Requiredness::Optional;
        result.push(field);
    }
    (args, Some(result))
}

fn field_symbols(kind: StructKind, fields: &[FieldNode]) -> Vec<FieldSymbol> {
    let mut names: Namespace<String> = Namespace::new();
    fields
        .iter()
        .map(|field| {
            let mut node = field.clone();
            if kind == StructKind::Union {
                node.requiredness = Requiredness::Optional;
            }
            FieldSymbol {
                ident: names.allocate(field.name.clone(), &field_ident(&field.name)),
                node,
            }
        })
        .collect()
}

impl Scope {
    /// Installs every declaration of `file`, resolves the includes it uses
    /// through `session`, and checks that every type reference resolves.
    #[tracing::instrument(level = "debug", skip(session), fields(file = file.0))]
    pub(crate) fn build(session: &mut Session, file: FileId) -> Result<Scope> {
        let node = session.tree().file(file).ok_or(CompileError::UnknownFile(file))?;
        let mut types: Namespace<SymbolKey> = Namespace::with_reserved(&RESERVED_NAMES);
        let mut values: Namespace<String> = Namespace::new();
        let mut declared: HashMap<String, TypeSlot> = HashMap::new();

        let mut declare = |name: &str, slot: TypeSlot| -> Result<()> {
            if declared.insert(name.to_string(), slot).is_some() {
                return Err(CompileError::DuplicateDeclaration(name.to_string()));
            }
            Ok(())
        };

        let mut enums = Vec::with_capacity(node.enums.len());
        for (i, e) in node.enums.iter().enumerate() {
            declare(&e.name, TypeSlot::Enum(i))?;
            let mut value_names: Namespace<String> = Namespace::with_reserved(&["VALUES"]);
            enums.push(EnumSymbol {
                name:   e.name.clone(),
                ident:  types.allocate(SymbolKey::Type(e.name.clone()), &type_ident(&e.name)),
                values: e
                    .values
                    .iter()
                    .map(|v| EnumValueSymbol {
                        name:  v.name.clone(),
                        ident: value_names.allocate(v.name.clone(), &const_ident(&v.name)),
                        value: v.value,
                    })
                    .collect(),
            });
        }

        let mut typedefs = Vec::with_capacity(node.typedefs.len());
        for (i, t) in node.typedefs.iter().enumerate() {
            declare(&t.name, TypeSlot::Typedef(i))?;
            typedefs.push(TypedefSymbol {
                name:   t.name.clone(),
                ident:  types.allocate(SymbolKey::Type(t.name.clone()), &type_ident(&t.name)),
                target: t.target.clone(),
            });
        }

        let mut structs = Vec::with_capacity(node.structs.len());
        for (i, s) in node.structs.iter().enumerate() {
            declare(&s.name, TypeSlot::Struct(i))?;
            structs.push(StructSymbol {
                name:   s.name.clone(),
                ident:  types.allocate(SymbolKey::Type(s.name.clone()), &type_ident(&s.name)),
                kind:   s.kind,
                fields: field_symbols(s.kind, &s.fields),
                origin: StructOrigin::Declared,
            });
        }

        let mut services = Vec::with_capacity(node.services.len());
        for (i, s) in node.services.iter().enumerate() {
            declare(&s.name, TypeSlot::Service(i))?;
            services.push(ServiceSymbol {
                name:    s.name.clone(),
                ident:   types.allocate(SymbolKey::Type(s.name.clone()), &type_ident(&s.name)),
                extends: s.extends.clone(),
                methods: Vec::with_capacity(s.methods.len()),
            });
        }

        // Wrappers come after every declared type so user names win.
        for (service, service_node) in services.iter_mut().zip(&node.services) {
            let mut method_names: Namespace<String> = Namespace::new();
            for method in &service_node.methods {
                let base = format!("{}{}", service.ident, type_ident(&method.name));
                let (args, result) = wrapper_nodes(method);
                let mut wrapper = |kind: WrapperKind, fields: Vec<FieldNode>| -> usize {
                    let suffix = match kind {
                        WrapperKind::Args => "Args",
                        WrapperKind::Result => "Result",
                    };
                    let key = SymbolKey::Wrapper(service.name.clone(), method.name.clone(), kind.clone());
                    let ident = types.allocate(key, &format!("{}{}", base, suffix));
                    structs.push(StructSymbol {
                        name: ident.clone(),
                        ident,
                        kind:   StructKind::Struct,
                        fields: field_symbols(StructKind::Struct, &fields),
                        origin: StructOrigin::Wrapper {
                            service: service.name.clone(),
                            method:  method.name.clone(),
                            kind,
                        },
                    });
                    structs.len() - 1
                };
                let args = wrapper(WrapperKind::Args, args);
                let result = result.map(|fields| wrapper(WrapperKind::Result, fields));
                service.methods.push(MethodSymbol {
                    node: method.clone(),
                    ident: method_names.allocate(method.name.clone(), &field_ident(&method.name)),
                    args,
                    result,
                });
            }
        }

        let mut constants = Vec::with_capacity(node.constants.len());
        let mut consts = HashMap::new();
        for (i, c) in node.constants.iter().enumerate() {
            if declared.contains_key(&c.name) || consts.insert(c.name.clone(), i).is_some() {
                return Err(CompileError::DuplicateDeclaration(c.name.clone()));
            }
            constants.push(ConstSymbol {
                node:  c.clone(),
                ident: values.allocate(c.name.clone(), &const_ident(&c.name)),
            });
        }

        let prefixes: Vec<String> = node.includes.iter().map(|inc| include_prefix(&inc.path)).collect();
        let includes = Scope::import_used(session, node, &prefixes)?;

        let scope = Scope {
            file,
            path: node.path.clone(),
            module: scope_module(node),
            enums,
            typedefs,
            structs,
            services,
            constants,
            types: declared,
            consts,
            includes,
            prefixes,
        };
        scope.check_references(node)?;
        tracing::debug!(
            path = %scope.path,
            module = %scope.module,
            structs = scope.structs.len(),
            "scope built"
        );
        Ok(scope)
    }

    fn import_used(session: &mut Session, node: &FileNode, prefixes: &[String]) -> Result<Vec<Option<Import>>> {
        let mut used = BTreeSet::new();
        for c in &node.constants {
            collect_type_includes(&c.ty, &mut used);
            collect_value_includes(&c.value, prefixes, &mut used);
        }
        for t in &node.typedefs {
            collect_type_includes(&t.target, &mut used);
        }
        for s in &node.structs {
            for field in &s.fields {
                collect_field_includes(field, prefixes, &mut used);
            }
        }
        for s in &node.services {
            if let Some((Some(i), _)) = s.extends {
                used.insert(i);
            }
            for m in &s.methods {
                if let Some(ref returns) = m.returns {
                    collect_type_includes(returns, &mut used);
                }
                for field in m.params.iter().chain(&m.throws) {
                    collect_field_includes(field, prefixes, &mut used);
                }
            }
        }

        let mut aliases: Namespace<FileId> = Namespace::with_reserved(&RESERVED_MODULES);
        let mut includes: Vec<Option<Import>> = vec![None; node.includes.len()];
        for index in used {
            let include = node.includes.get(index).ok_or_else(|| CompileError::UnresolvedInclude {
                file: node.path.clone(),
                index,
            })?;
            let scope = session.scope(include.file)?;
            let desired = scope.module.rsplit("::").next().unwrap_or(&scope.module).to_string();
            let alias = aliases.allocate(include.file, &desired);
            tracing::trace!(path = %include.path, %alias, "include imported");
            includes[index] = Some(Import { file: include.file, alias, scope });
        }
        Ok(includes)
    }

    fn check_references(&self, node: &FileNode) -> Result<()> {
        let mut types: Vec<&TypeNode> = Vec::new();
        types.extend(node.constants.iter().map(|c| &c.ty));
        types.extend(node.typedefs.iter().map(|t| &t.target));
        types.extend(node.structs.iter().flat_map(|s: &StructNode| s.fields.iter().map(|f| &f.ty)));
        for m in node.services.iter().flat_map(|s| &s.methods) {
            types.extend(m.returns.iter());
            types.extend(m.params.iter().chain(&m.throws).map(|f| &f.ty));
        }
        for ty in types {
            self.check_type(ty)?;
        }
        for s in &self.services {
            if let Some((include, ref name)) = s.extends {
                match self.lookup_type(include, name)?.kind {
                    NamedKind::Service(_) => {}
                    _ => return Err(CompileError::UnresolvedType(name.clone())),
                }
            }
        }
        Ok(())
    }

    fn check_type(&self, ty: &TypeNode) -> Result<()> {
        match ty {
            TypeNode::Base(_) => Ok(()),
            TypeNode::Named { include, name } => match self.lookup_type(*include, name)?.kind {
                NamedKind::Service(_) => Err(CompileError::UnresolvedType(name.clone())),
                _ => Ok(()),
            },
            TypeNode::List(elem) | TypeNode::Set(elem) => self.check_type(elem),
            TypeNode::Map(key, value) => {
                self.check_type(key)?;
                self.check_type(value)
            }
        }
    }

    pub fn import(&self, index: usize) -> Result<&Import> {
        self.includes
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| CompileError::UnresolvedInclude {
                file: self.path.clone(),
                index,
            })
    }

    /// Imported files in include-list order, each once. Unused includes are
    /// skipped.
    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        let mut seen = HashSet::new();
        self.includes.iter().flatten().filter(move |imp| seen.insert(imp.file))
    }

    /// Local alias under which `file` is imported into this scope.
    pub fn alias_for(&self, file: FileId) -> Option<&str> {
        self.imports().find(|imp| imp.file == file).map(|imp| imp.alias.as_str())
    }

    fn local_type(&self, name: &str) -> Option<NamedKind<'_>> {
        Some(match *self.types.get(name)? {
            TypeSlot::Enum(i) => NamedKind::Enum(&self.enums[i]),
            TypeSlot::Typedef(i) => NamedKind::Typedef(&self.typedefs[i]),
            TypeSlot::Struct(i) => NamedKind::Struct(&self.structs[i]),
            TypeSlot::Service(i) => NamedKind::Service(&self.services[i]),
        })
    }

    /// Finds a declared type, switching to the included scope for qualified
    /// references.
    pub fn lookup_type(&self, include: Option<usize>, name: &str) -> Result<Named<'_>> {
        let scope = match include {
            None => self,
            Some(index) => self.import(index)?.scope.as_ref(),
        };
        let kind = scope.local_type(name).ok_or_else(|| match include {
            None => CompileError::UnresolvedType(name.to_string()),
            Some(index) => CompileError::UnresolvedType(format!("{}.{}", self.prefixes[index], name)),
        })?;
        Ok(Named { scope, kind })
    }

    fn local_const(&self, name: &str) -> Option<IdentTarget<'_>> {
        self.consts
            .get(name)
            .map(|&i| IdentTarget::Const(self, &self.constants[i]))
    }

    fn local_enum_value(&self, enum_name: &str, value: &str) -> Option<IdentTarget<'_>> {
        match self.local_type(enum_name)? {
            NamedKind::Enum(e) => e.value(value).map(|v| IdentTarget::EnumValue(self, e, v)),
            _ => None,
        }
    }

    fn prefixed(&self, prefix: &str) -> Option<&Scope> {
        let index = self.prefixes.iter().position(|p| p == prefix)?;
        self.includes[index].as_ref().map(|imp| imp.scope.as_ref())
    }

    /// Resolves `NAME`, `Enum.VALUE`, `include.NAME` or `include.Enum.VALUE`.
    pub fn lookup_identifier(&self, ident: &str) -> Result<IdentTarget<'_>> {
        let parts: Vec<&str> = ident.split('.').collect();
        let found = match parts.as_slice() {
            [name] => self.local_const(name),
            [first, second] => self
                .local_enum_value(first, second)
                .or_else(|| self.prefixed(first).and_then(|s| s.local_const(second))),
            [prefix, enum_name, value] => self
                .prefixed(prefix)
                .and_then(|s| s.local_enum_value(enum_name, value)),
            _ => None,
        };
        found.ok_or_else(|| CompileError::UndefinedIdentifier(ident.to_string()))
    }

    pub fn struct_symbol(&self, index: usize) -> &StructSymbol {
        &self.structs[index]
    }
}
