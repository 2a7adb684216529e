// Generated by bthrift from model.thrift. Do not edit.
#![allow(dead_code, unused_imports, unused_mut, non_camel_case_types, clippy::all)]

use brine_thrift::{
    expect_wire_type, lazy_static, struct_or_stop_len, write_struct_or_stop, ByteBuffer, ByteBufferMut,
    ProtocolError, ThriftStruct, WireType,
};
use std::collections::{BTreeMap, BTreeSet};
use crate::generated::colors;

pub type Hue = colors::Color;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct P {
    pub name: String,
    pub age: i32,
}

impl Default for P {
    fn default() -> Self {
        P {
            name: Default::default(),
            age: 30,
        }
    }
}

impl P {
    /// Field ids and names, in id order.
    pub const FIELD_NAMES: &'static [(i16, &'static str)] = &[(1, "name"), (2, "age")];
}

impl ThriftStruct for P {
    fn encoded_len(&self) -> usize {
        let mut len = 1;
        len += 3 + 4 + self.name.len();
        if self.age != 30 {
            len += 3 + 4;
        }
        len
    }

    fn write(&self, out: &mut ByteBufferMut) -> usize {
        let start = out.len();
        out.write_field_header(WireType::String, 1);
        out.write_string(&self.name);
        if self.age != 30 {
            out.write_field_header(WireType::I32, 2);
            out.write_i32(self.age);
        }
        out.write_stop();
        out.len() - start
    }

    fn read_at(bb: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {
        if depth >= 64 {
            return Err(ProtocolError::DepthLimitExceeded(64));
        }
        let mut this = Self::default();
        let mut isset: u8 = 0;
        loop {
            let (wire, id) = bb.read_field_header()?;
            match (id, wire) {
                (_, WireType::Stop) => break,
                (1, WireType::String) => {
                    this.name = bb.read_string()?;
                    isset |= 1 << 0;
                }
                (2, WireType::I32) => {
                    this.age = bb.read_i32()?;
                }
                _ => bb.skip(wire, 64 - depth)?,
            }
        }
        if (isset & (1 << 0)) == 0 {
            return Err(ProtocolError::missing_field("P", "name"));
        }
        Ok(this)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Index {
    pub groups: BTreeMap<String, Vec<BTreeSet<i32>>>,
    pub counts: BTreeMap<String, i32>,
    pub hue: Hue,
}

impl Index {
    /// Field ids and names, in id order.
    pub const FIELD_NAMES: &'static [(i16, &'static str)] = &[(1, "groups"), (2, "counts"), (3, "hue")];
}

impl ThriftStruct for Index {
    fn encoded_len(&self) -> usize {
        let mut len = 1;
        len += 3;
        len += 6;
        for (key, val) in &self.groups {
            len += 4 + key.len();
            len += 5;
            for elem0 in val {
                len += 5 + elem0.len() * 4;
            }
        }
        len += 3;
        len += 6;
        for (key, _) in &self.counts {
            len += 4 + key.len();
            len += 4;
        }
        len += 3 + 4;
        len
    }

    fn write(&self, out: &mut ByteBufferMut) -> usize {
        let start = out.len();
        out.write_field_header(WireType::Map, 1);
        out.write_map_header(WireType::String, WireType::List, self.groups.len());
        for (key, val) in &self.groups {
            out.write_string(key);
            out.write_list_header(WireType::Set, val.len());
            for elem0 in val {
                out.write_set_header(WireType::I32, elem0.len());
                for elem1 in elem0 {
                    out.write_i32(*elem1);
                }
            }
        }
        out.write_field_header(WireType::Map, 2);
        out.write_map_header(WireType::String, WireType::I32, self.counts.len());
        for (key, val) in &self.counts {
            out.write_string(key);
            out.write_i32(*val);
        }
        out.write_field_header(WireType::I32, 3);
        out.write_i32(self.hue.0);
        out.write_stop();
        out.len() - start
    }

    fn read_at(bb: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {
        if depth >= 64 {
            return Err(ProtocolError::DepthLimitExceeded(64));
        }
        let mut this = Self::default();
        loop {
            let (wire, id) = bb.read_field_header()?;
            match (id, wire) {
                (_, WireType::Stop) => break,
                (1, WireType::Map) => {
                    let (map_key_wire, map_val_wire, map_len) = bb.read_map_header()?;
                    expect_wire_type(1, WireType::String, map_key_wire, map_len)?;
                    expect_wire_type(1, WireType::List, map_val_wire, map_len)?;
                    let mut map = BTreeMap::new();
                    for _ in 0..map_len {
                        let key = bb.read_string()?;
                        let (list0_wire, list0_len) = bb.read_list_header()?;
                        expect_wire_type(1, WireType::Set, list0_wire, list0_len)?;
                        let mut list0 = Vec::with_capacity(bb.capacity_hint(list0_len));
                        for _ in 0..list0_len {
                            let (set1_wire, set1_len) = bb.read_set_header()?;
                            expect_wire_type(1, WireType::I32, set1_wire, set1_len)?;
                            let mut set1 = BTreeSet::new();
                            for _ in 0..set1_len {
                                set1.insert(bb.read_i32()?);
                            }
                            list0.push(set1);
                        }
                        let val = list0;
                        map.insert(key, val);
                    }
                    this.groups = map;
                }
                (2, WireType::Map) => {
                    let (map_key_wire, map_val_wire, map_len) = bb.read_map_header()?;
                    expect_wire_type(2, WireType::String, map_key_wire, map_len)?;
                    expect_wire_type(2, WireType::I32, map_val_wire, map_len)?;
                    let mut map = BTreeMap::new();
                    for _ in 0..map_len {
                        let key = bb.read_string()?;
                        let val = bb.read_i32()?;
                        map.insert(key, val);
                    }
                    this.counts = map;
                }
                (3, WireType::I32) => {
                    this.hue = Hue::from(bb.read_i32()?);
                }
                _ => bb.skip(wire, 64 - depth)?,
            }
        }
        Ok(this)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tree {
    pub value: i32,
    pub child: Option<Box<Tree>>,
}

impl Tree {
    /// Field ids and names, in id order.
    pub const FIELD_NAMES: &'static [(i16, &'static str)] = &[(1, "value"), (2, "child")];
}

impl ThriftStruct for Tree {
    fn encoded_len(&self) -> usize {
        let mut len = 1;
        len += 3 + 4;
        if let Some(value) = &self.child {
            len += 3 + value.encoded_len();
        }
        len
    }

    fn write(&self, out: &mut ByteBufferMut) -> usize {
        let start = out.len();
        out.write_field_header(WireType::I32, 1);
        out.write_i32(self.value);
        if let Some(value) = &self.child {
            out.write_field_header(WireType::Struct, 2);
            value.write(out);
        }
        out.write_stop();
        out.len() - start
    }

    fn read_at(bb: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {
        if depth >= 64 {
            return Err(ProtocolError::DepthLimitExceeded(64));
        }
        let mut this = Self::default();
        loop {
            let (wire, id) = bb.read_field_header()?;
            match (id, wire) {
                (_, WireType::Stop) => break,
                (1, WireType::I32) => {
                    this.value = bb.read_i32()?;
                }
                (2, WireType::Struct) => {
                    this.child = Some(Box::new(Tree::read_at(bb, depth + 1)?));
                }
                _ => bb.skip(wire, 64 - depth)?,
            }
        }
        Ok(this)
    }
}
