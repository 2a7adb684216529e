//! Runtime support for the binary protocol: byte buffers, wire types, the
//! generic skip routine, runtime type descriptors and dynamic values.
//!
//! ```
//! use brine_thrift_schema::*;
//!
//! let schema = Schema::new(vec![
//!     Def::new("Point".to_owned(), DefKind::Struct, vec![
//!         Field { name: "x".to_owned(), id: 1, type_id: TypeId::I32, requiredness: Requiredness::Required, boxed: false, default: None },
//!         Field { name: "y".to_owned(), id: 2, type_id: TypeId::I32, requiredness: Requiredness::Required, boxed: false, default: None },
//!     ]),
//! ]);
//!
//! let bytes = [8, 0, 1, 0, 0, 0, 3, 8, 0, 2, 255, 255, 255, 255, 0];
//! let value = Value::decode(&schema, "Point", &bytes).unwrap();
//! assert_eq!(format!("{:?}", value), "Point {x: 3, y: -1}");
//! assert_eq!(value.encode(&schema).unwrap(), bytes);
//! ```

pub mod bb;
pub mod error;
pub mod schema;
pub mod traits;
pub mod value;
pub mod wire;

pub use bb::*;
pub use error::*;
pub use schema::*;
pub use traits::*;
pub use value::*;
pub use wire::*;
