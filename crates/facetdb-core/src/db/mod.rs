//! The entity store: id lifecycle, component book, index book, and the
//! search surface that composes them.

pub mod data;
mod id;
pub mod index;
pub mod query;

pub use data::{DataBook, Kind, Record};
pub use id::EntityId;
pub use index::{IndexBook, IndexEntry, IndexName};
pub use query::{Matches, Search};

use crate::{
    error::Error,
    obs::{self, MetricsEvent},
};
use std::collections::BTreeSet;

///
/// Db
///
/// The store. Owns the live id set, the component book, and the index book,
/// and keeps the two books mutually consistent on every write path.
///
/// Single-threaded, single-writer: queries borrow the store immutably and
/// mutation requires exclusive access, so the borrow checker statically
/// rules out mutating a page while a stream derived from it is walked.
///

#[derive(Default)]
pub struct Db {
    data: DataBook,
    index: IndexBook,
    live: BTreeSet<EntityId>,
    last_id: EntityId,
}

impl Db {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity holding `records`, returning its id.
    ///
    /// Allocation is monotonic and skips ids still live, so an allocator
    /// that has wrapped never hands out an id twice. A full cycle without a
    /// free id is a capacity-class error (see [`Error::is_capacity`]).
    pub fn create<R: RecordSet>(&mut self, records: R) -> Result<EntityId, Error> {
        let id = self.allocate()?;
        let written = R::kinds().len() as u64;
        records.store(id, &mut self.data, &mut self.index)?;

        self.live.insert(id);
        self.last_id = id;
        obs::record(MetricsEvent::EntityCreated);
        obs::record(MetricsEvent::RecordsWritten { count: written });

        Ok(id)
    }

    /// Write `records` for `id` through both books. Last write wins per
    /// kind. Liveness is not consulted: the caller owns id hygiene outside
    /// `create`/`remove`, exactly as with any other handle it holds.
    pub fn set<R: RecordSet>(&mut self, id: EntityId, records: R) -> Result<(), Error> {
        records.store(id, &mut self.data, &mut self.index)?;
        obs::record(MetricsEvent::RecordsWritten {
            count: R::kinds().len() as u64,
        });

        Ok(())
    }

    /// Remove the `R` record for `id` from both books. Returns whether a
    /// record was present. The stored value's own index entries drive the
    /// bucket removal, so books cannot drift apart.
    pub fn unset<R: Record>(&mut self, id: EntityId) -> Result<bool, Error> {
        let Some(stored) = self.data.get::<R>(id)? else {
            return Ok(false);
        };

        self.index.remove(id, &stored.index_entries());
        self.data.remove::<R>(id)?;
        obs::record(MetricsEvent::RecordUnset);

        Ok(true)
    }

    /// Remove `id` entirely: liveness, every component page, every index
    /// bucket. Idempotent; removing an absent id is a no-op.
    pub fn remove(&mut self, id: EntityId) {
        let was_live = self.live.remove(&id);
        self.data.remove_all(id);
        self.index.remove_all(id);

        if was_live {
            obs::record(MetricsEvent::EntityRemoved);
        }
    }

    /// Fetch the requested record set for `id`, all-or-nothing: `Ok(None)`
    /// unless every requested record is present.
    pub fn get<R: RecordSet>(&self, id: EntityId) -> Result<Option<R>, Error> {
        R::fetch(&self.data, id)
    }

    /// Start building a query.
    #[must_use]
    pub fn search(&self) -> Search<'_, ()> {
        Search::new(self)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// Diagnostic: number of component pages still holding `id`.
    #[must_use]
    pub fn page_refs(&self, id: EntityId) -> usize {
        self.data.pages_holding(id)
    }

    /// Diagnostic: number of index pages still holding `id`.
    #[must_use]
    pub fn index_refs(&self, id: EntityId) -> usize {
        self.index.pages_holding(id)
    }

    pub(crate) const fn data_book(&self) -> &DataBook {
        &self.data
    }

    pub(crate) const fn index_book(&self) -> &IndexBook {
        &self.index
    }

    fn allocate(&mut self) -> Result<EntityId, Error> {
        let first = self.last_id.wrapping_next();
        let mut candidate = first;

        loop {
            if !self.live.contains(&candidate) {
                return Ok(candidate);
            }

            candidate = candidate.wrapping_next();
            if candidate == first {
                return Err(Error::store_capacity("entity id space exhausted"));
            }
        }
    }
}

///
/// RecordSet
///
/// A record tuple written or read as one unit: `()`, a single record, or a
/// tuple of up to eight records.
///

pub trait RecordSet: Sized {
    /// Kinds in declaration order.
    fn kinds() -> Vec<Kind>;

    #[doc(hidden)]
    fn store(
        self,
        id: EntityId,
        data: &mut DataBook,
        index: &mut IndexBook,
    ) -> Result<(), Error>;

    #[doc(hidden)]
    fn fetch(data: &DataBook, id: EntityId) -> Result<Option<Self>, Error>;
}

impl RecordSet for () {
    fn kinds() -> Vec<Kind> {
        Vec::new()
    }

    fn store(
        self,
        _id: EntityId,
        _data: &mut DataBook,
        _index: &mut IndexBook,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn fetch(_data: &DataBook, _id: EntityId) -> Result<Option<Self>, Error> {
        Ok(Some(()))
    }
}

impl<R: Record> RecordSet for R {
    fn kinds() -> Vec<Kind> {
        vec![R::KIND]
    }

    fn store(
        self,
        id: EntityId,
        data: &mut DataBook,
        index: &mut IndexBook,
    ) -> Result<(), Error> {
        index.set(id, self.index_entries());
        data.add(id, self)
    }

    fn fetch(data: &DataBook, id: EntityId) -> Result<Option<Self>, Error> {
        data.get::<R>(id)
    }
}

macro_rules! impl_record_set_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Record),+> RecordSet for ($($name,)+) {
            fn kinds() -> Vec<Kind> {
                vec![$($name::KIND),+]
            }

            #[allow(non_snake_case)]
            fn store(
                self,
                id: EntityId,
                data: &mut DataBook,
                index: &mut IndexBook,
            ) -> Result<(), Error> {
                let ($($name,)+) = self;
                $(
                    index.set(id, $name.index_entries());
                    data.add(id, $name)?;
                )+

                Ok(())
            }

            fn fetch(data: &DataBook, id: EntityId) -> Result<Option<Self>, Error> {
                Ok(Some(($(
                    match data.get::<$name>(id)? {
                        Some(record) => record,
                        None => return Ok(None),
                    },
                )+)))
            }
        }
    };
}

impl_record_set_for_tuple!(A);
impl_record_set_for_tuple!(A, B);
impl_record_set_for_tuple!(A, B, C);
impl_record_set_for_tuple!(A, B, C, D);
impl_record_set_for_tuple!(A, B, C, D, E);
impl_record_set_for_tuple!(A, B, C, D, E, F);
impl_record_set_for_tuple!(A, B, C, D, E, F, G);
impl_record_set_for_tuple!(A, B, C, D, E, F, G, H);
