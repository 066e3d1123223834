//! Core runtime for FacetDB: the entity store, its component and index
//! books, the ordered stream algebra behind query execution, and the
//! ergonomics exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod obs;
pub mod stream;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No books, streams, or metrics helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{Db, EntityId, IndexEntry, Kind, Record, RecordSet},
        error::Error,
        value::Value,
    };
}
