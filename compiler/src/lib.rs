//! brine-thrift-compiler
//!
//! This crate turns a parsed and validated Thrift schema tree into Rust:
//!  1) Per-file scopes with collision-free Rust names (`scope`, `namespace`),
//!  2) Type and constant resolution across includes (`resolver`),
//!  3) Binary protocol codecs: length, write and read routines (`codec`),
//!  4) Whole-file generation and the include-ordered driver (`gen_rust`, `compiler`),
//!  5) Runtime descriptors for the dynamic value codec (`descriptor`).
//!
//! Parsing `.thrift` text is not part of this crate; the tree comes in as
//! [`types::SchemaTree`], usually deserialized from JSON.

pub mod bitset;
pub mod codec;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod gen_rust;
pub mod namespace;
pub mod options;
pub mod resolver;
pub mod rwctx;
pub mod scope;
pub mod session;
pub mod types;
pub mod utils;

pub use compiler::{generate_all, include_order, Generation};
pub use descriptor::lower_file;
pub use error::{CompileError, Diagnostic};
pub use gen_rust::{generate_file, GeneratedFile};
pub use options::{ErrorPolicy, GenOptions};
pub use session::Session;
pub use types::{FileId, SchemaTree};
