//! Binary persistence for cyclic, polymorphic object graphs.
//!
//! Application types implement [`Saveable`] and register a blank-instance
//! factory in a [`TypeRegistry`]. A [`GraphWriter`] walks a graph from one
//! or more roots and writes every reachable object once; a [`GraphReader`]
//! rebuilds the same shape, including cycles and references to objects that
//! appear later in the stream.
//!
//! # Overview
//!
//! - [`Saveable`] / [`FieldWriter`] / [`FieldValue`] - the per-object emit and
//!   receive surface
//! - [`ObjectRef`] - shared handle with pointer identity
//! - [`TypeRegistry`] - class id to factory mapping
//! - [`binary`] - the stream codec and its interning tables
//! - [`DynamicObject`] - schema-less object for unknown classes and tooling
//! - [`inspect::graph_to_json`] - JSON view of a graph for diagnostics
//!
//! # Example
//!
//! ```
//! use graph_pack::{decode, encode, FieldValue, FieldWriter, ObjectRef, Saveable, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Node {
//!     label: String,
//!     next: Option<ObjectRef>,
//! }
//!
//! impl Saveable for Node {
//!     fn class_id(&self) -> &str {
//!         "Node"
//!     }
//!
//!     fn save(&self, out: &mut FieldWriter) {
//!         out.write("label", self.label.as_str());
//!         out.write("next", self.next.clone());
//!     }
//!
//!     fn apply_field(&mut self, name: &str, value: FieldValue) {
//!         match name {
//!             "label" => self.label = value.into_string().unwrap_or_default(),
//!             "next" => self.next = value.into_object(),
//!             _ => {}
//!         }
//!     }
//! }
//!
//! let a = ObjectRef::new(Node { label: "a".into(), next: None });
//! let b = ObjectRef::new(Node { label: "b".into(), next: Some(a.clone()) });
//! a.downcast_mut::<Node>().unwrap().next = Some(b.clone());
//!
//! let bytes = encode(&a).unwrap();
//! let registry = TypeRegistry::new().with_type::<Node>();
//! let a2 = decode(&bytes, &registry).unwrap();
//! let b2 = a2.downcast_ref::<Node>().unwrap().next.clone().unwrap();
//! let back = b2.downcast_ref::<Node>().unwrap().next.clone().unwrap();
//! assert!(back.ptr_eq(&a2));
//! # a.downcast_mut::<Node>().unwrap().next = None;
//! # a2.downcast_mut::<Node>().unwrap().next = None;
//! ```

pub mod binary;
pub mod constants;
mod dynamic;
mod error;
pub mod inspect;
mod object;
mod options;
mod registry;
mod saveable;
mod value;

pub use binary::{GraphReader, GraphWriter};
pub use constants::TypeTag;
pub use dynamic::DynamicObject;
pub use error::{Corruption, GraphError};
pub use object::{ObjectRef, WeakObjectRef};
pub use options::{ReaderOptions, UnknownClassPolicy, WriterOptions};
pub use registry::{Factory, TypeRegistry};
pub use saveable::{AsAny, FieldWriter, Saveable};
pub use value::FieldValue;

/// Reads a single-root stream.
pub fn decode(bytes: &[u8], registry: &TypeRegistry) -> Result<ObjectRef, GraphError> {
    GraphReader::new(bytes, registry).read_object()
}

/// Reads a root-list stream.
pub fn decode_list(bytes: &[u8], registry: &TypeRegistry) -> Result<Vec<ObjectRef>, GraphError> {
    GraphReader::new(bytes, registry).read_all_in_list()
}

/// Writes `root` and everything reachable from it as a single-root stream.
pub fn encode(root: &ObjectRef) -> Result<Vec<u8>, GraphError> {
    GraphWriter::new().write_object(root)
}

/// Writes `roots` as a root-list stream.
pub fn encode_list(roots: &[ObjectRef]) -> Result<Vec<u8>, GraphError> {
    GraphWriter::new().write_all_in_list(roots)
}
