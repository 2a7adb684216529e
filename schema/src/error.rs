use crate::wire::WireType;
use thiserror::Error;

/// Decode-time failures. Every variant carries enough context to diagnose a
/// producer/consumer schema mismatch; none of them are produced by panicking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        needed:    usize,
        remaining: usize,
    },

    #[error("Negative length prefix {0}")]
    NegativeLength(i32),

    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,

    #[error("Invalid bool byte {0}")]
    InvalidBool(u8),

    #[error("Unknown wire type tag {0}")]
    UnknownWireType(u8),

    #[error("Nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("Field {field_id}: expected wire type {expected}, found {found}")]
    WireTypeMismatch {
        field_id: i16,
        expected: WireType,
        found:    WireType,
    },

    #[error("Required field \"{field}\" of {strukt} was not set")]
    MissingRequiredField {
        strukt: String,
        field:  String,
    },

    #[error("Unknown type \"{0}\"")]
    UnknownType(String),

    #[error("Value {value} does not match descriptor type {expected}")]
    ValueMismatch {
        value:    String,
        expected: String,
    },
}

impl ProtocolError {
    /// Shorthand used by generated read routines.
    pub fn missing_field(strukt: &str, field: &str) -> ProtocolError {
        ProtocolError::MissingRequiredField {
            strukt: strukt.to_string(),
            field:  field.to_string(),
        }
    }

    /// Field name of a `MissingRequiredField` error.
    pub fn missing_field_name(&self) -> Option<&str> {
        match self {
            ProtocolError::MissingRequiredField { field, .. } => Some(field),
            _ => None,
        }
    }
}
