use crate::{
    codec::{emit_codec, prepare},
    error::{Diagnostic, Result},
    options::ErrorPolicy,
    resolver::{Resolver, Slot},
    scope::{ConstSymbol, EnumSymbol, Scope, ServiceSymbol, StructSymbol, TypedefSymbol},
    session::Session,
    types::{FileId, StructKind},
    utils::{string_literal, CodeWriter},
};
use std::path::PathBuf;

/// Names the generated code takes from the runtime crate.
const RUNTIME_IMPORTS: &str = "use brine_thrift::{\n    expect_wire_type, lazy_static, struct_or_stop_len, write_struct_or_stop, ByteBuffer, ByteBufferMut,\n    ProtocolError, ThriftStruct, WireType,\n};";

/// Rust source for one schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub file:        FileId,
    /// Path of the schema file it was generated from.
    pub source:      String,
    /// Module path, e.g. `com::example`.
    pub module_path: String,
    pub code:        String,
}

impl GeneratedFile {
    /// `com::example` → `com/example.rs`.
    pub fn output_path(&self) -> PathBuf {
        let mut path: PathBuf = self.module_path.split("::").collect();
        path.set_extension("rs");
        path
    }
}

/// Keeps a failed declaration out of the output when the policy allows it.
fn recover<T>(
    policy: ErrorPolicy,
    diagnostics: &mut Vec<Diagnostic>,
    scope: &Scope,
    declaration: &str,
    result: Result<T>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if policy == ErrorPolicy::Continue && error.is_recoverable() => {
            tracing::warn!(file = %scope.path, declaration, %error, "declaration skipped");
            diagnostics.push(Diagnostic {
                file: scope.path.clone(),
                declaration: declaration.to_string(),
                error,
            });
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Renders the Rust module for `file`. Declarations that fail to resolve
/// abort the run or, under [`ErrorPolicy::Continue`], are dropped and
/// recorded in `diagnostics`.
#[tracing::instrument(level = "debug", skip_all, fields(file = file.0))]
pub fn generate_file(session: &mut Session, file: FileId, diagnostics: &mut Vec<Diagnostic>) -> Result<GeneratedFile> {
    let scope = session.scope(file)?;
    let resolver = session.resolver();
    let policy = resolver.options().error_policy;
    let mut sections: Vec<String> = Vec::new();

    sections.push(generate_header(&resolver, &scope));

    for symbol in &scope.enums {
        sections.push(generate_enum(symbol));
    }
    for symbol in &scope.typedefs {
        let result = generate_typedef(&resolver, &scope, symbol);
        sections.extend(recover(policy, diagnostics, &scope, &symbol.name, result)?);
    }
    let mut scalars = Vec::new();
    let mut lazies = Vec::new();
    for constant in &scope.constants {
        let result = generate_constant(&resolver, &scope, constant);
        if let Some((scalar, code)) = recover(policy, diagnostics, &scope, &constant.node.name, result)? {
            if scalar {
                scalars.push(code);
            } else {
                lazies.push(code);
            }
        }
    }
    if !scalars.is_empty() {
        sections.push(scalars.join("\n"));
    }
    if !lazies.is_empty() {
        sections.push(format!("lazy_static! {{\n{}\n}}", lazies.join("\n")));
    }

    for symbol in &scope.structs {
        let result = generate_struct(&resolver, &scope, symbol);
        sections.extend(recover(policy, diagnostics, &scope, &symbol.name, result)?);
    }
    for symbol in &scope.services {
        let result = generate_service(&resolver, &scope, symbol);
        sections.extend(recover(policy, diagnostics, &scope, &symbol.name, result)?);
    }

    let mut code = sections.join("\n\n");
    code.push('\n');
    tracing::debug!(path = %scope.path, module = %scope.module, bytes = code.len(), "file generated");
    Ok(GeneratedFile {
        file,
        source: scope.path.clone(),
        module_path: scope.module.clone(),
        code,
    })
}

fn generate_header(resolver: &Resolver, scope: &Scope) -> String {
    let mut lines = vec![
        format!("// Generated by bthrift from {}. Do not edit.", scope.path),
        "#![allow(dead_code, unused_imports, unused_mut, non_camel_case_types, clippy::all)]".to_string(),
        String::new(),
        RUNTIME_IMPORTS.to_string(),
        "use std::collections::{BTreeMap, BTreeSet};".to_string(),
    ];
    for import in scope.imports() {
        let module = &import.scope.module;
        let last = module.rsplit("::").next().unwrap_or(module);
        if last == import.alias {
            lines.push(format!("use {}::{};", resolver.options().module_root, module));
        } else {
            lines.push(format!("use {}::{} as {};", resolver.options().module_root, module, import.alias));
        }
    }
    lines.join("\n")
}

/// Returns whether the constant is a plain `const` together with its code.
fn generate_constant(resolver: &Resolver, scope: &Scope, constant: &ConstSymbol) -> Result<(bool, String)> {
    let node = &constant.node;
    let category = resolver.resolve(scope, &node.ty)?.category();
    let ty = resolver.type_name(scope, scope, &node.ty)?;
    let checked = resolver.check_const(&node.name, scope, &node.ty, &node.value)?;
    // Walks reference chains, so a cycle fails here rather than in rustc.
    resolver.evaluate(scope, &checked)?;
    let value = resolver.render(scope, &checked);
    if category.is_scalar() {
        Ok((true, format!("pub const {}: {} = {};", constant.ident, ty, value)))
    } else {
        Ok((false, format!("    pub static ref {}: {} = {};", constant.ident, ty, value)))
    }
}

fn generate_enum(symbol: &EnumSymbol) -> String {
    let name = &symbol.ident;
    let mut code = CodeWriter::new();
    code.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]");
    code.line("#[repr(transparent)]");
    code.line(format!("pub struct {}(pub i32);", name));
    code.line("");

    code.open(format!("impl {} {{", name));
    for value in &symbol.values {
        code.line(format!("pub const {}: {} = {}({});", value.ident, name, name, value.value));
    }
    if !symbol.values.is_empty() {
        code.line("");
    }
    let all: Vec<String> = symbol.values.iter().map(|v| format!("{}::{}", name, v.ident)).collect();
    code.line(format!("pub const VALUES: &'static [{}] = &[{}];", name, all.join(", ")));
    code.line("");
    code.line("/// Declared name of this value, if it has one.");
    code.open("pub fn variant_name(self) -> Option<&'static str> {");
    code.open("match self.0 {");
    let mut seen = std::collections::HashSet::new();
    for value in &symbol.values {
        // Aliased values report the first name declared.
        if seen.insert(value.value) {
            code.line(format!("{} => Some({}),", value.value, string_literal(&value.name)));
        }
    }
    code.line("_ => None,");
    code.close("}");
    code.close("}");
    code.close("}");
    code.line("");

    code.open(format!("impl std::fmt::Display for {} {{", name));
    code.open("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {");
    code.open("match self.variant_name() {");
    code.line("Some(name) => f.write_str(name),");
    code.line("None => write!(f, \"{}\", self.0),");
    code.close("}");
    code.close("}");
    code.close("}");
    code.line("");

    code.open(format!("impl From<i32> for {} {{", name));
    code.open("fn from(value: i32) -> Self {");
    code.line(format!("{}(value)", name));
    code.close("}");
    code.close("}");
    code.line("");

    code.open(format!("impl From<{}> for i32 {{", name));
    code.open(format!("fn from(value: {}) -> Self {{", name));
    code.line("value.0");
    code.close("}");
    code.close("}");
    code.finish().trim_end().to_string()
}

fn generate_typedef(resolver: &Resolver, scope: &Scope, symbol: &TypedefSymbol) -> Result<String> {
    // Resolving first reports alias cycles.
    resolver.resolve(scope, &symbol.target)?;
    let target = resolver.type_name(scope, scope, &symbol.target)?;
    Ok(format!("pub type {} = {};", symbol.ident, target))
}

fn generate_struct(resolver: &Resolver, scope: &Scope, symbol: &StructSymbol) -> Result<String> {
    let mut slots: Vec<Slot> = Vec::with_capacity(symbol.fields.len());
    let mut defaults: Vec<Option<String>> = Vec::with_capacity(symbol.fields.len());
    for field in &symbol.fields {
        let slot = resolver.field_slot(scope, scope, &field.node)?;
        let default = match field.node.default {
            Some(ref value) => {
                let checked = resolver.check_const(&field.node.name, scope, &field.node.ty, value)?;
                Some(slot.wrap.wrap_expr(&resolver.render(scope, &checked)))
            }
            None => None,
        };
        slots.push(slot);
        defaults.push(default);
    }

    let has_defaults = defaults.iter().any(Option::is_some);
    let mut derives = vec!["Debug", "Clone", "PartialEq"];
    if resolver.struct_is_orderable(scope, symbol)? {
        derives.extend(["Eq", "Hash", "PartialOrd", "Ord"]);
    }
    if !has_defaults {
        derives.push("Default");
    }

    let mut code = CodeWriter::new();
    code.line(format!("#[derive({})]", derives.join(", ")));
    code.open(format!("pub struct {} {{", symbol.ident));
    for (field, slot) in symbol.fields.iter().zip(&slots) {
        code.line(format!("pub {}: {},", field.ident, slot.name));
    }
    code.close("}");

    if has_defaults {
        code.line("");
        code.open(format!("impl Default for {} {{", symbol.ident));
        code.open("fn default() -> Self {");
        code.open(format!("{} {{", symbol.ident));
        for (field, default) in symbol.fields.iter().zip(&defaults) {
            match default {
                Some(value) => code.line(format!("{}: {},", field.ident, value)),
                None => code.line(format!("{}: Default::default(),", field.ident)),
            }
        }
        code.close("}");
        code.close("}");
        code.close("}");
    }

    match symbol.kind {
        StructKind::Union => {
            code.line("");
            code.open(format!("impl {} {{", symbol.ident));
            code.line("/// Number of fields that are set. A well-formed union has exactly one.");
            code.open("pub fn set_field_count(&self) -> usize {");
            code.line("let mut count = 0;");
            for f in prepare(resolver, scope, symbol)? {
                match f.presence.condition(&f.field.ident) {
                    Some(condition) => {
                        code.open(format!("if {} {{", condition));
                        code.line("count += 1;");
                        code.close("}");
                    }
                    None => code.line("count += 1;"),
                }
            }
            code.line("count");
            code.close("}");
            code.close("}");
        }
        StructKind::Exception => {
            code.line("");
            code.open(format!("impl std::fmt::Display for {} {{", symbol.ident));
            code.open("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {");
            code.line(format!("write!(f, \"{}: {{:?}}\", self)", symbol.name));
            code.close("}");
            code.close("}");
            code.line("");
            code.line(format!("impl std::error::Error for {} {{}}", symbol.ident));
        }
        StructKind::Struct => {}
    }

    if resolver.options().binary_codec {
        code.line("");
        code.extend(emit_codec(resolver, scope, symbol)?.lines());
    }
    Ok(code.finish().trim_end().to_string())
}

fn generate_service(resolver: &Resolver, scope: &Scope, symbol: &ServiceSymbol) -> Result<String> {
    let supertrait = match symbol.extends {
        Some((include, ref name)) => {
            let named = scope.lookup_type(include, name)?;
            format!(": {}", resolver.qualify(scope, named.scope, named.ident()))
        }
        None => String::new(),
    };
    let mut code = CodeWriter::new();
    code.open(format!("pub trait {}{} {{", symbol.ident, supertrait));
    for method in &symbol.methods {
        let args = &scope.struct_symbol(method.args).ident;
        match method.result {
            Some(result) => code.line(format!(
                "fn {}(&self, args: {}) -> {};",
                method.ident,
                args,
                scope.struct_symbol(result).ident
            )),
            None => code.line(format!("fn {}(&self, args: {});", method.ident, args)),
        }
    }
    code.close("}");
    Ok(code.finish().trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::options::GenOptions;
    use crate::types::*;
    use pretty_assertions::assert_eq;

    fn generate(tree: &SchemaTree, file: usize, options: GenOptions) -> (Result<GeneratedFile>, Vec<Diagnostic>) {
        let mut session = Session::new(tree, options);
        let mut diagnostics = Vec::new();
        let result = generate_file(&mut session, FileId(file), &mut diagnostics);
        (result, diagnostics)
    }

    fn single(file: FileNode) -> String {
        let tree = SchemaTree { files: vec![file] };
        generate(&tree, 0, GenOptions::default()).0.unwrap().code
    }

    #[test]
    fn enum_is_an_open_newtype() {
        let code = single(FileNode {
            path: "e.thrift".to_string(),
            enums: vec![EnumNode {
                name:   "Status".to_string(),
                values: vec![
                    EnumValueNode { name: "OK".to_string(), value: 0 },
                    EnumValueNode { name: "Failed".to_string(), value: 3 },
                ],
            }],
            ..Default::default()
        });
        assert!(code.contains("pub struct Status(pub i32);"));
        assert!(code.contains("    pub const OK: Status = Status(0);\n    pub const FAILED: Status = Status(3);"));
        assert!(code.contains("pub const VALUES: &'static [Status] = &[Status::OK, Status::FAILED];"));
        assert!(code.contains("            3 => Some(\"Failed\"),"));
    }

    #[test]
    fn struct_with_defaults_gets_a_default_impl() {
        let code = single(FileNode {
            path: "p.thrift".to_string(),
            structs: vec![StructNode {
                name:   "P".to_string(),
                kind:   StructKind::Struct,
                fields: vec![
                    FieldNode::new(1, "name", TypeNode::Base(BaseType::String), Requiredness::Required),
                    FieldNode::new(2, "age", TypeNode::Base(BaseType::I32), Requiredness::Optional)
                        .with_default(ConstValue::Int(30)),
                    FieldNode::new(3, "score", TypeNode::Base(BaseType::Double), Requiredness::Optional),
                ],
            }],
            ..Default::default()
        });
        let expected = "#[derive(Debug, Clone, PartialEq)]
pub struct P {
    pub name: String,
    pub age: i32,
    pub score: Option<f64>,
}

impl Default for P {
    fn default() -> Self {
        P {
            name: Default::default(),
            age: 30,
            score: Default::default(),
        }
    }
}
";
        assert!(code.contains(expected), "{}", code);
        assert!(code.contains("impl ThriftStruct for P {"));
    }

    #[test]
    fn orderable_struct_derives_ord() {
        let code = single(FileNode {
            path: "k.thrift".to_string(),
            structs: vec![StructNode {
                name:   "Key".to_string(),
                kind:   StructKind::Struct,
                fields: vec![FieldNode::new(1, "id", TypeNode::Base(BaseType::I64), Requiredness::Default)],
            }],
            ..Default::default()
        });
        assert!(code.contains("#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]\npub struct Key {"));
    }

    #[test]
    fn unions_exceptions_and_services() {
        let code = single(FileNode {
            path: "svc.thrift".to_string(),
            structs: vec![
                StructNode {
                    name:   "Shape".to_string(),
                    kind:   StructKind::Union,
                    fields: vec![
                        FieldNode::new(1, "radius", TypeNode::Base(BaseType::I32), Requiredness::Default),
                        FieldNode::new(2, "points", TypeNode::list(TypeNode::Base(BaseType::I32)), Requiredness::Default),
                    ],
                },
                StructNode {
                    name:   "Oops".to_string(),
                    kind:   StructKind::Exception,
                    fields: vec![FieldNode::new(1, "why", TypeNode::Base(BaseType::String), Requiredness::Default)],
                },
            ],
            services: vec![ServiceNode {
                name:    "Painter".to_string(),
                extends: None,
                methods: vec![
                    MethodNode {
                        name:    "paint".to_string(),
                        oneway:  false,
                        returns: Some(TypeNode::Base(BaseType::Bool)),
                        params:  vec![FieldNode::new(1, "shape", TypeNode::named("Shape"), Requiredness::Default)],
                        throws:  vec![FieldNode::new(1, "oops", TypeNode::named("Oops"), Requiredness::Default)],
                    },
                    MethodNode {
                        name:    "reset".to_string(),
                        oneway:  true,
                        returns: None,
                        params:  vec![],
                        throws:  vec![],
                    },
                ],
            }],
            ..Default::default()
        });
        assert!(code.contains("pub radius: Option<i32>,"));
        assert!(code.contains("        if self.radius.is_some() {\n            count += 1;\n        }"));
        assert!(code.contains("        if !self.points.is_empty() {"));
        assert!(code.contains("impl std::error::Error for Oops {}"));
        assert!(code.contains("pub struct PainterPaintArgs {\n    pub shape: Option<Box<Shape>>,\n}"));
        assert!(code.contains("pub struct PainterPaintResult {\n    pub success: Option<bool>,\n    pub oops: Option<Box<Oops>>,\n}"));
        assert!(code.contains(
            "pub trait Painter {\n    fn paint(&self, args: PainterPaintArgs) -> PainterPaintResult;\n    fn reset(&self, args: PainterResetArgs);\n}"
        ));
    }

    #[test]
    fn constants_split_into_const_and_lazy_static() {
        let code = single(FileNode {
            path: "c.thrift".to_string(),
            constants: vec![
                ConstNode { name: "maxRetries".to_string(), ty: TypeNode::Base(BaseType::I16), value: ConstValue::Int(5) },
                ConstNode {
                    name:  "NAMES".to_string(),
                    ty:    TypeNode::list(TypeNode::Base(BaseType::String)),
                    value: ConstValue::List(vec![ConstValue::String("a".to_string())]),
                },
            ],
            ..Default::default()
        });
        assert!(code.contains("pub const MAX_RETRIES: i16 = 5;"));
        assert!(code.contains("lazy_static! {\n    pub static ref NAMES: Vec<String> = vec![String::from(\"a\")];\n}"));
    }

    #[test]
    fn include_imports_and_qualified_names() {
        let tree = SchemaTree {
            files: vec![
                FileNode {
                    path: "base/shared.thrift".to_string(),
                    structs: vec![StructNode { name: "Point".to_string(), kind: StructKind::Struct, fields: vec![] }],
                    services: vec![ServiceNode { name: "Base".to_string(), extends: None, methods: vec![] }],
                    ..Default::default()
                },
                FileNode {
                    path: "main.thrift".to_string(),
                    namespaces: [("rs".to_string(), "app.main".to_string())].into_iter().collect(),
                    includes: vec![IncludeNode { path: "base/shared.thrift".to_string(), file: FileId(0) }],
                    typedefs: vec![TypedefNode { name: "Spot".to_string(), target: TypeNode::included(0, "Point") }],
                    services: vec![ServiceNode {
                        name:    "Derived".to_string(),
                        extends: Some((Some(0), "Base".to_string())),
                        methods: vec![],
                    }],
                    ..Default::default()
                },
            ],
        };
        let (result, _) = generate(&tree, 1, GenOptions::default());
        let generated = result.unwrap();
        assert_eq!(generated.module_path, "app::main");
        assert_eq!(generated.output_path(), PathBuf::from("app/main.rs"));
        assert!(generated.code.contains("use crate::shared;"));
        assert!(generated.code.contains("pub type Spot = shared::Point;"));
        assert!(generated.code.contains("pub trait Derived: shared::Base {"));
    }

    #[test]
    fn continue_policy_drops_bad_declarations() {
        let tree = SchemaTree {
            files: vec![FileNode {
                path: "bad.thrift".to_string(),
                constants: vec![
                    ConstNode { name: "GOOD".to_string(), ty: TypeNode::Base(BaseType::Bool), value: ConstValue::Bool(true) },
                    ConstNode { name: "BAD".to_string(), ty: TypeNode::Base(BaseType::Bool), value: ConstValue::Int(3) },
                ],
                ..Default::default()
            }],
        };
        let (result, _) = generate(&tree, 0, GenOptions::default());
        assert!(matches!(result, Err(CompileError::TypeMismatch { .. })));

        let options = GenOptions { error_policy: ErrorPolicy::Continue, ..GenOptions::default() };
        let (result, diagnostics) = generate(&tree, 0, options);
        let code = result.unwrap().code;
        assert!(code.contains("pub const GOOD: bool = true;"));
        assert!(!code.contains("BAD"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].declaration, "BAD");
    }

    #[test]
    fn types_only_without_codec() {
        let tree = SchemaTree {
            files: vec![FileNode {
                path: "t.thrift".to_string(),
                structs: vec![StructNode { name: "T".to_string(), kind: StructKind::Struct, fields: vec![] }],
                ..Default::default()
            }],
        };
        let options = GenOptions { binary_codec: false, ..GenOptions::default() };
        let code = generate(&tree, 0, options).0.unwrap().code;
        assert!(code.contains("pub struct T {\n}"));
        assert!(!code.contains("ThriftStruct for"));
    }
}
