//! Per-field context trees for the codec emitter.
//!
//! A field's type is unfolded into one [`RwContext`] per nesting level.
//! Containers carry children for their elements (and keys), and every
//! temporary a routine introduces is minted here so nested loops never
//! shadow each other.

use crate::{
    error::Result,
    resolver::{Position, Resolved, Resolver, Slot},
    scope::{FieldSymbol, Scope},
    types::TypeNode,
};
use brine_thrift_schema::WireType;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type TempCounts = Rc<RefCell<HashMap<String, usize>>>;

#[derive(Debug, Clone)]
pub struct RwContext {
    /// Id of the field the tree belongs to, for wire-type diagnostics.
    pub field_id:   i16,
    pub slot:       Slot,
    /// Location expression: the field identifier at the root, a loop
    /// variable below it.
    pub target:     String,
    pub needs_decl: bool,
    pub depth:      usize,
    /// Collection a container is read into.
    pub build:      Option<String>,
    /// Key context of a map.
    pub key:        Option<Box<RwContext>>,
    /// Element context of a list or set, value context of a map.
    pub value:      Option<Box<RwContext>>,
    temps:          TempCounts,
}

/// `base` at depth 0, `base0` at depth 1, `base1` at depth 2 and so on.
/// Repeats of the same name get a counter suffix.
fn mint(temps: &TempCounts, base: &str, depth: usize) -> String {
    let bare = match depth {
        0 => base.to_string(),
        n => format!("{}{}", base, n - 1),
    };
    let mut counts = temps.borrow_mut();
    let count = counts.entry(bare.clone()).or_insert(0);
    let name = match *count {
        0 => bare,
        n => format!("{}_{}", bare, n),
    };
    *count += 1;
    name
}

impl RwContext {
    pub fn for_field(resolver: &Resolver, out: &Scope, at: &Scope, field: &FieldSymbol) -> Result<RwContext> {
        let temps: TempCounts = Rc::new(RefCell::new(HashMap::new()));
        let slot = resolver.field_slot(out, at, &field.node)?;
        RwContext::unfold(resolver, out, at, &field.node.ty, slot, field.ident.clone(), false, 0, field.node.id, temps)
    }

    #[allow(clippy::too_many_arguments)]
    fn unfold(
        resolver: &Resolver,
        out: &Scope,
        at: &Scope,
        ty: &TypeNode,
        slot: Slot,
        target: String,
        needs_decl: bool,
        depth: usize,
        field_id: i16,
        temps: TempCounts,
    ) -> Result<RwContext> {
        let child = |scope: &Scope, ty: &TypeNode, position: Position, base: &str| -> Result<Box<RwContext>> {
            let slot = resolver.slot(out, scope, ty, position)?;
            let target = mint(&temps, base, depth);
            let ctx = RwContext::unfold(resolver, out, scope, ty, slot, target, true, depth + 1, field_id, Rc::clone(&temps))?;
            Ok(Box::new(ctx))
        };
        let (build, key, value) = match resolver.resolve(at, ty)? {
            Resolved::List(scope, elem) => {
                let build = mint(&temps, "list", depth);
                (Some(build), None, Some(child(scope, elem, Position::Element, "elem")?))
            }
            Resolved::Set(scope, elem) => {
                let build = mint(&temps, "set", depth);
                (Some(build), None, Some(child(scope, elem, Position::Element, "elem")?))
            }
            Resolved::Map(scope, k, v) => {
                let build = mint(&temps, "map", depth);
                let key = child(scope, k, Position::Key, "key")?;
                let value = child(scope, v, Position::Element, "val")?;
                (Some(build), Some(key), Some(value))
            }
            _ => (None, None, None),
        };
        Ok(RwContext {
            field_id,
            slot,
            target,
            needs_decl,
            depth,
            build,
            key,
            value,
            temps,
        })
    }

    pub fn wire_type(&self) -> WireType {
        self.slot.category.wire_type()
    }

    /// Encoded size when it does not depend on the value.
    pub fn fixed_size(&self) -> Option<usize> {
        self.wire_type().fixed_size()
    }

    /// Mints a further temporary at this context's depth.
    pub fn temp(&self, base: &str) -> String {
        mint(&self.temps, base, self.depth)
    }

    /// Every context of the tree, parents before children.
    pub fn walk(&self) -> Vec<&RwContext> {
        let mut all = vec![self];
        for child in self.key.iter().chain(self.value.iter()) {
            all.extend(child.walk());
        }
        all
    }
}
