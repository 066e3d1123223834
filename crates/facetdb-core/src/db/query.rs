//! Fluent query surface: predicate collection, lowering, and the result
//! cursor.

use crate::{
    db::{Db, EntityId, IndexEntry, RecordSet},
    error::Error,
    obs::{self, MetricsEvent},
    stream::{BoxedSeekStream, Empty, Intersect, SeekStream, StreamIter},
};
use std::marker::PhantomData;

///
/// Search
///
/// Declarative query builder. Each call contributes one lane — a seekable
/// stream of candidate ids — and `done` lowers the lanes to a single
/// stream: no lanes yield nothing, one lane passes through, more than one
/// are intersected.
///

#[must_use]
pub struct Search<'a, R: RecordSet> {
    db: &'a Db,
    lanes: Vec<BoxedSeekStream<'a, EntityId>>,
    _marker: PhantomData<R>,
}

impl<'a> Search<'a, ()> {
    pub(crate) fn new(db: &'a Db) -> Self {
        Self {
            db,
            lanes: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Bind the record set to populate. Constrains results to ids holding a
    /// record of every kind in `R`, and re-fetches those records per id as
    /// the result is walked. Bind once; tuples cover multi-kind queries.
    pub fn components<R: RecordSet>(self) -> Search<'a, R> {
        let Self { db, mut lanes, .. } = self;

        let kinds = R::kinds();
        if !kinds.is_empty() {
            lanes.push(db.data_book().all(&kinds));
        }

        Search {
            db,
            lanes,
            _marker: PhantomData,
        }
    }
}

impl<'a, R: RecordSet> Search<'a, R> {
    /// Presence-only constraint: require a record of every kind in `S`
    /// without populating values.
    pub fn with<S: RecordSet>(mut self) -> Self {
        let kinds = S::kinds();
        if !kinds.is_empty() {
            self.lanes.push(self.db.data_book().all(&kinds));
        }

        self
    }

    /// Equality-index constraint. Index lanes produce ids only; they never
    /// populate values.
    pub fn index(mut self, entry: IndexEntry) -> Self {
        self.lanes.push(self.db.index_book().search(&entry));
        self
    }

    /// Add a pre-built id stream as a lane.
    pub fn stream(mut self, lane: BoxedSeekStream<'a, EntityId>) -> Self {
        self.lanes.push(lane);
        self
    }

    /// Lower the collected lanes into the result cursor.
    pub fn done(self) -> Matches<'a, R> {
        obs::record(MetricsEvent::Search {
            lanes: self.lanes.len() as u64,
        });

        let mut lanes = self.lanes;
        let stream: BoxedSeekStream<'a, EntityId> = match lanes.len() {
            0 => Box::new(Empty::new()),
            1 => lanes.remove(0),
            _ => Box::new(Intersect::new(lanes)),
        };

        Matches {
            db: self.db,
            stream,
            _marker: PhantomData,
        }
    }
}

///
/// Matches
///
/// Result cursor. Yields (id, records) pairs in ascending id order,
/// re-fetching the bound record set per id as the caller advances — results
/// are never materialized eagerly. An id produced by the intersection whose
/// record is missing from its page indicates an engine defect and surfaces
/// as an invariant-violation error.
///

#[must_use]
pub struct Matches<'a, R: RecordSet> {
    db: &'a Db,
    stream: BoxedSeekStream<'a, EntityId>,
    _marker: PhantomData<R>,
}

impl<'a, R: RecordSet> Matches<'a, R> {
    /// Advance to the next matching id and populate its records.
    pub fn try_next(&mut self) -> Result<Option<(EntityId, R)>, Error> {
        let Some(id) = self.stream.next() else {
            return Ok(None);
        };

        let Some(records) = self.db.get::<R>(id)? else {
            return Err(Error::query_invariant(format!(
                "entity {id} was produced by the intersection but has no page entry"
            )));
        };

        Ok(Some((id, records)))
    }

    /// Forward-only skip-ahead: the next match will be the least id ≥ `to`.
    pub fn seek(&mut self, to: EntityId) {
        self.stream.seek(&to);
    }

    /// Ids only, as a plain iterator. Drops population and seek.
    pub fn ids(self) -> impl Iterator<Item = EntityId> + 'a {
        StreamIter::new(self.stream)
    }
}

impl<R: RecordSet> Iterator for Matches<'_, R> {
    type Item = Result<(EntityId, R), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}
