// Generated by bthrift from colors.thrift. Do not edit.
#![allow(dead_code, unused_imports, unused_mut, non_camel_case_types, clippy::all)]

use brine_thrift::{
    expect_wire_type, lazy_static, struct_or_stop_len, write_struct_or_stop, ByteBuffer, ByteBufferMut,
    ProtocolError, ThriftStruct, WireType,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Color(pub i32);

impl Color {
    pub const RED: Color = Color(1);
    pub const GREEN: Color = Color(2);

    pub const VALUES: &'static [Color] = &[Color::RED, Color::GREEN];

    /// Declared name of this value, if it has one.
    pub fn variant_name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("RED"),
            2 => Some("GREEN"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for Color {
    fn from(value: i32) -> Self {
        Color(value)
    }
}

impl From<Color> for i32 {
    fn from(value: Color) -> Self {
        value.0
    }
}
