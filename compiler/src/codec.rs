//! Emits the binary protocol routines of a struct: exact encoded length,
//! write and read.
//!
//! The length and write routines share one presence decision per field
//! ([`Presence`]), so the length always matches what is written.

use crate::{
    bitset::{BitsetTracker, WordWidth},
    error::Result,
    resolver::{Category, Resolver, Wrap},
    rwctx::RwContext,
    scope::{FieldSymbol, Scope, StructSymbol},
    types::Requiredness,
    utils::{string_literal, CodeWriter},
};
use brine_thrift_schema::{WireType, FIELD_HEADER_LEN, LENGTH_PREFIX_LEN, LIST_HEADER_LEN, MAP_HEADER_LEN, STOP_LEN};

/// When a field goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Always,
    /// Optional and nilable: only when set.
    IfSome,
    /// Optional, inline, with a default: only when it differs from it.
    IfNotDefault(String),
    /// Optional inline container without a default: only when non-empty.
    IfNotEmpty,
    /// Nilable but not optional: an unset struct still writes a header and
    /// an empty struct.
    StructOrStop,
}

impl Presence {
    pub fn of(field: &FieldSymbol, ctx: &RwContext, default: Option<&str>) -> Presence {
        let optional = field.node.requiredness == Requiredness::Optional;
        match (ctx.slot.wrap, default) {
            (Wrap::Option, _) | (Wrap::OptionBox, _) if optional => Presence::IfSome,
            (Wrap::OptionBox, _) | (Wrap::Option, _) => Presence::StructOrStop,
            (_, Some(lit)) if optional => Presence::IfNotDefault(lit.to_string()),
            (_, None) if optional && ctx.slot.category.is_container() => Presence::IfNotEmpty,
            _ => Presence::Always,
        }
    }

    /// Condition under which the field is present, `None` when it always is.
    pub fn condition(&self, field: &str) -> Option<String> {
        match self {
            Presence::Always | Presence::StructOrStop => None,
            Presence::IfSome => Some(format!("self.{}.is_some()", field)),
            // Struct literals are not allowed bare in an `if` condition.
            Presence::IfNotDefault(lit) if lit.contains('{') => Some(format!("self.{} != ({})", field, lit)),
            Presence::IfNotDefault(lit) => Some(format!("self.{} != {}", field, lit)),
            Presence::IfNotEmpty => Some(format!("!self.{}.is_empty()", field)),
        }
    }
}

/// One field prepared for emission.
pub struct FieldCodec<'s> {
    pub field:    &'s FieldSymbol,
    pub ctx:      RwContext,
    pub presence: Presence,
}

/// Builds the per-field contexts of `symbol` in ascending id order.
pub fn prepare<'s>(resolver: &Resolver, out: &Scope, symbol: &'s StructSymbol) -> Result<Vec<FieldCodec<'s>>> {
    let mut fields = Vec::with_capacity(symbol.fields.len());
    for field in symbol.fields_by_id() {
        let ctx = RwContext::for_field(resolver, out, out, field)?;
        let default = match field.node.default {
            Some(ref value) => {
                let checked = resolver.check_const(&field.node.name, out, &field.node.ty, value)?;
                Some(resolver.render(out, &checked))
            }
            None => None,
        };
        let presence = Presence::of(field, &ctx, default.as_deref());
        fields.push(FieldCodec { field, ctx, presence });
    }
    Ok(fields)
}

fn wire(ty: WireType) -> String {
    format!("WireType::{}", ty.variant_name())
}

/// `&self.f` → `self.f`; a bound reference stays as is.
fn place(r: &str) -> &str {
    r.strip_prefix('&').unwrap_or(r)
}

/// Copy a scalar out of a reference expression.
fn deref(r: &str) -> String {
    match r.strip_prefix('&') {
        Some(place) => place.to_string(),
        None => format!("*{}", r),
    }
}

fn child(ctx: &RwContext) -> &RwContext {
    // Containers always carry their element context.
    ctx.value.as_deref().unwrap_or(ctx)
}

fn len_expr(ctx: &RwContext, r: &str) -> Option<String> {
    if let Some(size) = ctx.fixed_size() {
        return Some(size.to_string());
    }
    match ctx.slot.category {
        Category::String | Category::Binary => Some(format!("{} + {}.len()", LENGTH_PREFIX_LEN, place(r))),
        Category::Struct => Some(format!("{}.encoded_len()", place(r))),
        Category::List | Category::Set => child(ctx)
            .fixed_size()
            .map(|size| format!("{} + {}.len() * {}", LIST_HEADER_LEN, place(r), size)),
        Category::Map => {
            let key = ctx.key.as_ref()?.fixed_size()?;
            let value = child(ctx).fixed_size()?;
            Some(format!("{} + {}.len() * {}", MAP_HEADER_LEN, place(r), key + value))
        }
        _ => None,
    }
}

fn emit_len(code: &mut CodeWriter, ctx: &RwContext, r: &str) {
    if let Some(expr) = len_expr(ctx, r) {
        code.line(format!("len += {};", expr));
        return;
    }
    match (ctx.slot.category, ctx.key.as_ref(), ctx.value.as_ref()) {
        (Category::Map, Some(key), Some(value)) => {
            // A fixed-size side never reads its binding.
            let bind = |ctx: &RwContext| match ctx.fixed_size() {
                Some(_) => "_".to_string(),
                None => ctx.target.clone(),
            };
            code.line(format!("len += {};", MAP_HEADER_LEN));
            code.open(format!("for ({}, {}) in {} {{", bind(key), bind(value), r));
            emit_len(code, key, &key.target);
            emit_len(code, value, &value.target);
            code.close("}");
        }
        (_, _, Some(elem)) => {
            code.line(format!("len += {};", LIST_HEADER_LEN));
            code.open(format!("for {} in {} {{", elem.target, r));
            emit_len(code, elem, &elem.target);
            code.close("}");
        }
        _ => {}
    }
}

fn emit_write(code: &mut CodeWriter, ctx: &RwContext, r: &str) {
    match ctx.slot.category {
        Category::Bool => code.line(format!("out.write_bool({});", deref(r))),
        Category::Byte => code.line(format!("out.write_byte({});", deref(r))),
        Category::I16 => code.line(format!("out.write_i16({});", deref(r))),
        Category::I32 => code.line(format!("out.write_i32({});", deref(r))),
        Category::I64 => code.line(format!("out.write_i64({});", deref(r))),
        Category::Double => code.line(format!("out.write_double({});", deref(r))),
        Category::String => code.line(format!("out.write_string({});", r)),
        Category::Binary => code.line(format!("out.write_binary({});", r)),
        Category::Enum => code.line(format!("out.write_i32({}.0);", place(r))),
        Category::Struct => code.line(format!("{}.write(out);", place(r))),
        Category::List | Category::Set => {
            let elem = child(ctx);
            let header = match ctx.slot.category {
                Category::Set => "write_set_header",
                _ => "write_list_header",
            };
            code.line(format!("out.{}({}, {}.len());", header, wire(elem.wire_type()), place(r)));
            code.open(format!("for {} in {} {{", elem.target, r));
            emit_write(code, elem, &elem.target);
            code.close("}");
        }
        Category::Map => {
            if let (Some(key), Some(value)) = (ctx.key.as_ref(), ctx.value.as_ref()) {
                code.line(format!(
                    "out.write_map_header({}, {}, {}.len());",
                    wire(key.wire_type()),
                    wire(value.wire_type()),
                    place(r)
                ));
                code.open(format!("for ({}, {}) in {} {{", key.target, value.target, r));
                emit_write(code, key, &key.target);
                emit_write(code, value, &value.target);
                code.close("}");
            }
        }
    }
}

/// Pushes the statements reading one value and returns the expression
/// holding it, without the position's wrapper.
fn emit_read(code: &mut CodeWriter, ctx: &RwContext) -> String {
    let build = ctx.build.clone().unwrap_or_default();
    match ctx.slot.category {
        Category::Bool => "bb.read_bool()?".to_string(),
        Category::Byte => "bb.read_byte()?".to_string(),
        Category::I16 => "bb.read_i16()?".to_string(),
        Category::I32 => "bb.read_i32()?".to_string(),
        Category::I64 => "bb.read_i64()?".to_string(),
        Category::Double => "bb.read_double()?".to_string(),
        Category::String => "bb.read_string()?".to_string(),
        Category::Binary => "bb.read_binary()?".to_string(),
        // `From` also works through a typedef alias of the enum.
        Category::Enum => format!("{}::from(bb.read_i32()?)", ctx.slot.inline),
        Category::Struct => format!("{}::read_at(bb, depth + 1)?", ctx.slot.inline),
        Category::List | Category::Set => {
            let elem = child(ctx);
            let (header, init, add) = match ctx.slot.category {
                Category::Set => (
                    "read_set_header",
                    "BTreeSet::new()".to_string(),
                    "insert",
                ),
                _ => (
                    "read_list_header",
                    format!("Vec::with_capacity(bb.capacity_hint({}_len))", build),
                    "push",
                ),
            };
            code.line(format!("let ({b}_wire, {b}_len) = bb.{}()?;", header, b = build));
            code.line(format!(
                "expect_wire_type({}, {}, {b}_wire, {b}_len)?;",
                ctx.field_id,
                wire(elem.wire_type()),
                b = build
            ));
            code.line(format!("let mut {} = {};", build, init));
            code.open(format!("for _ in 0..{}_len {{", build));
            let value = emit_read(code, elem);
            code.line(format!("{}.{}({});", build, add, elem.slot.wrap.wrap_expr(&value)));
            code.close("}");
            build
        }
        Category::Map => {
            if let (Some(key), Some(value)) = (ctx.key.as_ref(), ctx.value.as_ref()) {
                code.line(format!("let ({b}_key_wire, {b}_val_wire, {b}_len) = bb.read_map_header()?;", b = build));
                code.line(format!(
                    "expect_wire_type({}, {}, {b}_key_wire, {b}_len)?;",
                    ctx.field_id,
                    wire(key.wire_type()),
                    b = build
                ));
                code.line(format!(
                    "expect_wire_type({}, {}, {b}_val_wire, {b}_len)?;",
                    ctx.field_id,
                    wire(value.wire_type()),
                    b = build
                ));
                code.line(format!("let mut {} = BTreeMap::new();", build));
                code.open(format!("for _ in 0..{}_len {{", build));
                let k = emit_read(code, key);
                code.line(format!("let {} = {};", key.target, k));
                let v = emit_read(code, value);
                code.line(format!("let {} = {};", value.target, value.slot.wrap.wrap_expr(&v)));
                code.line(format!("{}.insert({}, {});", build, key.target, value.target));
                code.close("}");
            }
            build
        }
    }
}

fn emit_encoded_len(code: &mut CodeWriter, fields: &[FieldCodec]) {
    code.open("fn encoded_len(&self) -> usize {");
    code.line(format!("let mut len = {};", STOP_LEN));
    for f in fields {
        let ident = &f.field.ident;
        let owned = format!("&self.{}", ident);
        match f.presence {
            Presence::StructOrStop => {
                code.line(format!("len += {} + struct_or_stop_len(self.{}.as_deref());", FIELD_HEADER_LEN, ident));
                continue;
            }
            Presence::IfSome => code.open(format!("if let Some(value) = &self.{} {{", ident)),
            ref presence => {
                if let Some(condition) = presence.condition(ident) {
                    code.open(format!("if {} {{", condition));
                }
            }
        }
        let r = match f.presence {
            Presence::IfSome => "value",
            _ => owned.as_str(),
        };
        match len_expr(&f.ctx, r) {
            Some(expr) => code.line(format!("len += {} + {};", FIELD_HEADER_LEN, expr)),
            None => {
                code.line(format!("len += {};", FIELD_HEADER_LEN));
                emit_len(code, &f.ctx, r);
            }
        }
        if f.presence != Presence::Always {
            code.close("}");
        }
    }
    code.line("len");
    code.close("}");
}

fn emit_write_fn(code: &mut CodeWriter, fields: &[FieldCodec]) {
    code.open("fn write(&self, out: &mut ByteBufferMut) -> usize {");
    code.line("let start = out.len();");
    for f in fields {
        let ident = &f.field.ident;
        let owned = format!("&self.{}", ident);
        let header = format!("out.write_field_header({}, {});", wire(f.ctx.wire_type()), f.field.node.id);
        match f.presence {
            Presence::StructOrStop => {
                code.line(header);
                code.line(format!("write_struct_or_stop(self.{}.as_deref(), out);", ident));
                continue;
            }
            Presence::IfSome => code.open(format!("if let Some(value) = &self.{} {{", ident)),
            ref presence => {
                if let Some(condition) = presence.condition(ident) {
                    code.open(format!("if {} {{", condition));
                }
            }
        }
        let r = match f.presence {
            Presence::IfSome => "value",
            _ => owned.as_str(),
        };
        code.line(header);
        emit_write(code, &f.ctx, r);
        if f.presence != Presence::Always {
            code.close("}");
        }
    }
    code.line("out.write_stop();");
    code.line("out.len() - start");
    code.close("}");
}

fn emit_read_fn(code: &mut CodeWriter, symbol: &StructSymbol, fields: &[FieldCodec], max_depth: usize) -> Result<()> {
    let required: Vec<&FieldCodec> = fields
        .iter()
        .filter(|f| f.field.node.requiredness == Requiredness::Required)
        .collect();
    let mut isset = BitsetTracker::new("isset", WordWidth::for_count(required.len()));
    for f in &required {
        isset.add(&f.field.node.name)?;
    }

    code.open("fn read_at(bb: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {");
    code.open(format!("if depth >= {} {{", max_depth));
    code.line(format!("return Err(ProtocolError::DepthLimitExceeded({}));", max_depth));
    code.close("}");
    code.line("let mut this = Self::default();");
    if !isset.is_empty() {
        code.line(isset.emit_declaration());
    }
    code.open("loop {");
    code.line("let (wire, id) = bb.read_field_header()?;");
    code.open("match (id, wire) {");
    code.line("(_, WireType::Stop) => break,");
    for f in fields {
        code.open(format!("({}, {}) => {{", f.field.node.id, wire(f.ctx.wire_type())));
        let value = emit_read(code, &f.ctx);
        code.line(format!("this.{} = {};", f.field.ident, f.ctx.slot.wrap.wrap_expr(&value)));
        if f.field.node.requiredness == Requiredness::Required {
            code.line(isset.emit_set_bit(&f.field.node.name)?);
        }
        code.close("}");
    }
    code.line(format!("_ => bb.skip(wire, {} - depth)?,", max_depth));
    code.close("}");
    code.close("}");
    let strukt = string_literal(&symbol.name);
    code.extend(isset.emit_absence_checks(|field| {
        format!(
            "return Err(ProtocolError::missing_field({}, {}));",
            strukt,
            string_literal(field)
        )
    }));
    code.line("Ok(this)");
    code.close("}");
    Ok(())
}

/// `impl ThriftStruct` for `symbol` plus its field-name table.
#[tracing::instrument(level = "trace", skip_all, fields(strukt = %symbol.ident))]
pub fn emit_codec(resolver: &Resolver, out: &Scope, symbol: &StructSymbol) -> Result<String> {
    let fields = prepare(resolver, out, symbol)?;
    let mut code = CodeWriter::new();

    code.open(format!("impl {} {{", symbol.ident));
    code.line("/// Field ids and names, in id order.");
    let names: Vec<String> = fields
        .iter()
        .map(|f| format!("({}, {})", f.field.node.id, string_literal(&f.field.node.name)))
        .collect();
    code.line(format!("pub const FIELD_NAMES: &'static [(i16, &'static str)] = &[{}];", names.join(", ")));
    code.close("}");
    code.line("");

    code.open(format!("impl ThriftStruct for {} {{", symbol.ident));
    emit_encoded_len(&mut code, &fields);
    code.line("");
    emit_write_fn(&mut code, &fields);
    code.line("");
    emit_read_fn(&mut code, symbol, &fields, resolver.options().max_skip_depth)?;
    code.close("}");
    Ok(code.finish())
}
