//! JSON documents
//!
//! - [`JsonPath`]: path compiler and in-memory evaluator
//! - streaming scanner: single forward pass over a document reader
//! - [`value_to_term`]: JSON value to RDF term
//! - [`JsonSurferIterator`]: the `iter:JSONSurfer` iterator function

mod path;
mod stream;
mod surfer;
mod term;

pub use path::{JsonPath, Key, Segment, Selector};
pub use surfer::JsonSurferIterator;
pub use term::value_to_term;
