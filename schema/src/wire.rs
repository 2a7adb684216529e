use std::fmt;

/// One-byte type tags of the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    Stop   = 0,
    Void   = 1,
    Bool   = 2,
    Byte   = 3,
    Double = 4,
    I16    = 6,
    I32    = 8,
    I64    = 10,
    String = 11,
    Struct = 12,
    Map    = 13,
    Set    = 14,
    List   = 15,
}

/// Bytes taken by a field header: type tag + big-endian field id.
pub const FIELD_HEADER_LEN: usize = 3;
/// Bytes taken by a list or set header: element tag + big-endian count.
pub const LIST_HEADER_LEN: usize = 5;
/// Bytes taken by a map header: key tag + value tag + big-endian count.
pub const MAP_HEADER_LEN: usize = 6;
/// Bytes taken by the length prefix of a string or binary payload.
pub const LENGTH_PREFIX_LEN: usize = 4;
/// Bytes taken by the stop marker that terminates a struct.
pub const STOP_LEN: usize = 1;

impl WireType {
    pub fn from_u8(tag: u8) -> Option<WireType> {
        Some(match tag {
            0 => WireType::Stop,
            1 => WireType::Void,
            2 => WireType::Bool,
            3 => WireType::Byte,
            4 => WireType::Double,
            6 => WireType::I16,
            8 => WireType::I32,
            10 => WireType::I64,
            11 => WireType::String,
            12 => WireType::Struct,
            13 => WireType::Map,
            14 => WireType::Set,
            15 => WireType::List,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Encoded size of a value of this type when it does not depend on the
    /// value itself.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            WireType::Bool | WireType::Byte => Some(1),
            WireType::I16 => Some(2),
            WireType::I32 => Some(4),
            WireType::I64 | WireType::Double => Some(8),
            _ => None,
        }
    }

    /// The name used for this variant in generated code (`WireType::I32`).
    pub fn variant_name(self) -> &'static str {
        match self {
            WireType::Stop => "Stop",
            WireType::Void => "Void",
            WireType::Bool => "Bool",
            WireType::Byte => "Byte",
            WireType::Double => "Double",
            WireType::I16 => "I16",
            WireType::I32 => "I32",
            WireType::I64 => "I64",
            WireType::String => "String",
            WireType::Struct => "Struct",
            WireType::Map => "Map",
            WireType::Set => "Set",
            WireType::List => "List",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant_name())
    }
}

#[test]
fn tags_round_trip() {
    for tag in 0..=255u8 {
        if let Some(ty) = WireType::from_u8(tag) {
            assert_eq!(ty.as_u8(), tag);
        }
    }
    assert_eq!(WireType::from_u8(5), None);
    assert_eq!(WireType::from_u8(16), None);
}

#[test]
fn fixed_sizes() {
    assert_eq!(WireType::Bool.fixed_size(), Some(1));
    assert_eq!(WireType::I16.fixed_size(), Some(2));
    assert_eq!(WireType::I32.fixed_size(), Some(4));
    assert_eq!(WireType::Double.fixed_size(), Some(8));
    assert_eq!(WireType::String.fixed_size(), None);
    assert_eq!(WireType::Struct.fixed_size(), None);
}
