//! Lowers the structured types visible from one file into runtime
//! descriptors for the dynamic `Value` codec.
//!
//! Defs are named the way generated code names the type from that file:
//! `Point` for its own declarations, `shared::Point` for included ones.

use crate::{
    error::{CompileError, Result},
    resolver::{Position, Resolved, Resolver},
    scope::Scope,
    session::Session,
    types::{BaseType, FileId, Requiredness, StructKind, TypeNode},
};
use brine_thrift_schema::{self as runtime, Def, DefKind, Field, Schema, TypeId, Value, DEFAULT_MAX_DEPTH};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

type DefIndex = HashMap<(FileId, String), usize>;

/// `file` first, then everything it imports, transitively.
fn visible_scopes(session: &mut Session, file: FileId) -> Result<Vec<Rc<Scope>>> {
    let root = session.scope(file)?;
    let mut seen = HashSet::from([root.file]);
    let mut scopes = vec![root];
    let mut next = 0;
    while next < scopes.len() {
        let imports: Vec<Rc<Scope>> = scopes[next].imports().map(|import| Rc::clone(&import.scope)).collect();
        for scope in imports {
            if seen.insert(scope.file) {
                scopes.push(scope);
            }
        }
        next += 1;
    }
    Ok(scopes)
}

fn lower_base(base: BaseType, position: Position) -> TypeId {
    match base {
        BaseType::Bool => TypeId::Bool,
        BaseType::Byte => TypeId::Byte,
        BaseType::I16 => TypeId::I16,
        BaseType::I32 => TypeId::I32,
        BaseType::I64 => TypeId::I64,
        BaseType::Double => TypeId::Double,
        BaseType::String => TypeId::String,
        BaseType::Binary if position == Position::Key => TypeId::String,
        BaseType::Binary => TypeId::Binary,
    }
}

fn lower_type(resolver: &Resolver, index: &DefIndex, at: &Scope, ty: &TypeNode, position: Position) -> Result<TypeId> {
    let def = |scope: &Scope, ident: &str| {
        index
            .get(&(scope.file, ident.to_string()))
            .copied()
            .ok_or_else(|| CompileError::UnresolvedType(ident.to_string()))
    };
    Ok(match resolver.resolve(at, ty)? {
        Resolved::Base(base) => lower_base(base, position),
        Resolved::Enum(scope, symbol) => TypeId::Enum(def(scope, &symbol.ident)?),
        Resolved::Struct(scope, symbol) => TypeId::Struct(def(scope, &symbol.ident)?),
        Resolved::List(scope, elem) => TypeId::List(Box::new(lower_type(resolver, index, scope, elem, Position::Element)?)),
        Resolved::Set(scope, elem) => TypeId::Set(Box::new(lower_type(resolver, index, scope, elem, Position::Element)?)),
        Resolved::Map(scope, key, value) => TypeId::Map(
            Box::new(lower_type(resolver, index, scope, key, Position::Key)?),
            Box::new(lower_type(resolver, index, scope, value, Position::Element)?),
        ),
    })
}

fn lower_requiredness(requiredness: Requiredness) -> runtime::Requiredness {
    match requiredness {
        Requiredness::Required => runtime::Requiredness::Required,
        Requiredness::Optional => runtime::Requiredness::Optional,
        Requiredness::Default => runtime::Requiredness::Default,
    }
}

/// Struct literals only carry the fields they name. Filling in the rest
/// makes a default compare equal to the value a decoder would build for it.
fn complete(schema: &Schema, value: &mut Value, type_id: &TypeId, depth: usize) {
    if depth >= DEFAULT_MAX_DEPTH {
        return;
    }
    match (type_id, value) {
        (TypeId::Struct(index), Value::Struct(_, fields)) => {
            for field in &schema.defs[*index].fields {
                match fields.get_mut(&field.name) {
                    Some(value) => complete(schema, value, &field.type_id, depth + 1),
                    None if !field.boxed => {
                        let mut value = match field.default {
                            Some(ref default) => default.clone(),
                            None => Value::zero(schema, &field.type_id),
                        };
                        complete(schema, &mut value, &field.type_id, depth + 1);
                        fields.insert(field.name.clone(), value);
                    }
                    None => {}
                }
            }
        }
        (TypeId::List(elem), Value::List(items)) | (TypeId::Set(elem), Value::Set(items)) => {
            for item in items {
                complete(schema, item, elem, depth + 1);
            }
        }
        (TypeId::Map(key, val), Value::Map(entries)) => {
            for (k, v) in entries {
                complete(schema, k, key, depth + 1);
                complete(schema, v, val, depth + 1);
            }
        }
        _ => {}
    }
}

/// Descriptors for every enum and structured type `file` can reach,
/// service wrappers included.
#[tracing::instrument(level = "debug", skip_all, fields(file = file.0))]
pub fn lower_file(session: &mut Session, file: FileId) -> Result<Schema> {
    let scopes = visible_scopes(session, file)?;
    let resolver = session.resolver();
    let out = &scopes[0];

    let mut index = DefIndex::new();
    for scope in &scopes {
        let idents = scope.enums.iter().map(|s| &s.ident).chain(scope.structs.iter().map(|s| &s.ident));
        for ident in idents {
            let next = index.len();
            index.insert((scope.file, ident.clone()), next);
        }
    }

    let mut defs = Vec::with_capacity(index.len());
    for scope in &scopes {
        for symbol in &scope.enums {
            let variants = symbol.values.iter().map(|v| (v.name.clone(), v.value)).collect();
            defs.push(Def::new_enum(resolver.qualify(out, scope, &symbol.ident), variants));
        }
        for symbol in &scope.structs {
            let mut fields = Vec::with_capacity(symbol.fields.len());
            for field in &symbol.fields {
                let node = &field.node;
                let default = match node.default {
                    Some(ref value) => {
                        let checked = resolver.check_const(&node.name, scope, &node.ty, value)?;
                        Some(resolver.evaluate(out, &checked)?)
                    }
                    None => None,
                };
                // The dynamic codec holds doubles in sets and keys, so no
                // Rust spelling of the type is needed here.
                let category = resolver.resolve(scope, &node.ty)?.category();
                fields.push(Field {
                    name: node.name.clone(),
                    id: node.id,
                    type_id: lower_type(&resolver, &index, scope, &node.ty, Position::of_field(node))?,
                    requiredness: lower_requiredness(node.requiredness),
                    boxed: resolver.wrap(category, Position::of_field(node)).is_nilable(),
                    default,
                });
            }
            let kind = match symbol.kind {
                StructKind::Struct => DefKind::Struct,
                StructKind::Union => DefKind::Union,
                StructKind::Exception => DefKind::Exception,
            };
            defs.push(Def::new(resolver.qualify(out, scope, &symbol.ident), kind, fields));
        }
    }

    let mut schema = Schema::new(defs);
    let snapshot = schema.clone();
    for def in &mut schema.defs {
        for field in &mut def.fields {
            if let Some(ref mut default) = field.default {
                complete(&snapshot, default, &field.type_id, 0);
            }
        }
    }
    tracing::debug!(defs = schema.defs.len(), scopes = scopes.len(), "descriptors lowered");
    Ok(schema)
}
