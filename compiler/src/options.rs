use serde::{Deserialize, Serialize};

/// What the driver does when a single declaration fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first error.
    #[default]
    Abort,
    /// Record a diagnostic, drop the declaration and keep generating.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    /// Hold struct-typed fields and elements inline instead of boxed.
    pub inline_containers: bool,
    pub error_policy:      ErrorPolicy,
    /// Nesting limit baked into generated read routines, for nested structs
    /// and for skipping unknown fields.
    pub max_skip_depth:    usize,
    /// Emit `ThriftStruct` impls (length, write and read routines).
    pub binary_codec:      bool,
    /// Path prefix under which every generated module lives.
    pub module_root:       String,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            inline_containers: false,
            error_policy:      ErrorPolicy::Abort,
            max_skip_depth:    brine_thrift_schema::DEFAULT_MAX_DEPTH,
            binary_codec:      true,
            module_root:       "crate".to_string(),
        }
    }
}

impl GenOptions {
    pub fn from_json(text: &str) -> Result<GenOptions, serde_json::Error> {
        serde_json::from_str(text)
    }
}
