use crate::types::FileId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema tree error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown file {0:?}")]
    UnknownFile(FileId),

    #[error("Undefined identifier \"{0}\"")]
    UndefinedIdentifier(String),

    #[error("Type mismatch for \"{name}\": declared {declared}, literal is {literal}")]
    TypeMismatch {
        name:     String,
        declared: String,
        literal:  String,
    },

    #[error("Unresolved type \"{0}\"")]
    UnresolvedType(String),

    #[error("Unknown field \"{field}\" in default value for {strukt}")]
    UnknownField {
        strukt: String,
        field:  String,
    },

    #[error("Include #{index} of {file} cannot be resolved")]
    UnresolvedInclude {
        file:  String,
        index: usize,
    },

    #[error("\"{0}\" is declared twice")]
    DuplicateDeclaration(String),

    #[error("{0} cannot be a set element or map key: it has no total order")]
    UnorderedKey(String),

    #[error("Typedef \"{0}\" refers to itself")]
    CyclicTypedef(String),

    #[error("Constant \"{0}\" refers to itself")]
    CyclicConstant(String),

    #[error("Includes of {0} form a cycle")]
    CyclicInclude(String),

    #[error(transparent)]
    Bitset(#[from] BitsetError),

    #[error("Payload error: {0}")]
    Protocol(#[from] brine_thrift_schema::ProtocolError),
}

/// Faults of the required-field tracker. These are defects in the engine or
/// its caller, never a consequence of user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsetError {
    #[error("Field key \"{0}\" is already tracked")]
    DuplicateKey(String),

    #[error("Field key \"{0}\" is not tracked")]
    UnknownKey(String),
}

impl CompileError {
    /// Symbol and type errors affect one declaration; the driver may keep
    /// going. Everything else is fatal to the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CompileError::UndefinedIdentifier(_)
                | CompileError::TypeMismatch { .. }
                | CompileError::UnresolvedType(_)
                | CompileError::UnknownField { .. }
                | CompileError::UnorderedKey(_)
                | CompileError::CyclicTypedef(_)
                | CompileError::CyclicConstant(_)
        )
    }
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// A declaration dropped under [`ErrorPolicy::Continue`].
///
/// [`ErrorPolicy::Continue`]: crate::options::ErrorPolicy::Continue
#[derive(Debug)]
pub struct Diagnostic {
    pub file:        String,
    pub declaration: String,
    pub error:       CompileError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.file, self.declaration, self.error)
    }
}
