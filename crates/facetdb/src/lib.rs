//! FacetDB — an in-memory entity-component store with composable sorted-set
//! query execution.
//!
//! This is the public meta-crate. Downstream users depend on **facetdb**
//! only; it re-exports the stable surface of `facetdb-core`.

pub use facetdb_core as core;

pub use facetdb_core::{db, error, obs, stream, value};

pub use facetdb_core::{
    db::{Db, EntityId, IndexEntry, Kind, Record, RecordSet},
    error::Error,
    value::Value,
};

//
// Prelude
//

pub mod prelude {
    pub use facetdb_core::prelude::*;
}
