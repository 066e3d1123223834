//! Equality indices: value buckets of sorted entity ids.

use crate::{
    db::EntityId,
    stream::{BoxedSeekStream, Empty, SeekStream},
    value::{Value, ValueFamily},
};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet, btree_set},
    fmt,
};

///
/// IndexName
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct IndexName(&'static str);

impl IndexName {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// IndexEntry
///
/// One (index-name, value) pair. The same constructor serves both sides of
/// the index: a record declares its entries from `Record::index_entries`,
/// and a query hands the identical entry to `Search::index` as an equality
/// predicate.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IndexEntry {
    name: IndexName,
    value: Value,
}

impl IndexEntry {
    /// Equality entry on index `name` for `value`.
    #[must_use]
    pub fn eq(name: &'static str, value: impl Into<Value>) -> Self {
        Self {
            name: IndexName::new(name),
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> IndexName {
        self.name
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    const fn page_key(&self) -> PageKey {
        (self.name, self.value.family())
    }
}

/// Index pages are keyed by name plus value family: the same name used with
/// incompatible value families is a distinct page, never a query error.
type PageKey = (IndexName, ValueFamily);

///
/// IndexPage
///
/// Value buckets for one (index-name, value-family) pair. `by_id` is the
/// reverse map that makes replacing an id's value an exact two-bucket edit
/// instead of a scan; an id occupies at most one bucket per page.
///

#[derive(Default)]
struct IndexPage {
    by_id: BTreeMap<EntityId, Value>,
    buckets: BTreeMap<Value, BTreeSet<EntityId>>,
}

impl IndexPage {
    /// Place `id` in `value`'s bucket, removing it from the bucket it
    /// previously occupied in this page.
    fn set(&mut self, id: EntityId, value: Value) {
        if let Some(prev) = self.by_id.get(&id) {
            if *prev == value {
                return;
            }
            let prev = prev.clone();
            self.drop_from_bucket(&prev, id);
        }

        self.by_id.insert(id, value.clone());
        self.buckets.entry(value).or_default().insert(id);
    }

    fn remove(&mut self, id: EntityId) {
        let Some(value) = self.by_id.remove(&id) else {
            return;
        };
        self.drop_from_bucket(&value, id);
    }

    fn drop_from_bucket(&mut self, value: &Value, id: EntityId) {
        if let Some(bucket) = self.buckets.get_mut(value) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.buckets.remove(value);
            }
        }
    }

    fn ids(&self, value: &Value) -> BoxedSeekStream<'_, EntityId> {
        match self.buckets.get(value) {
            Some(bucket) => Box::new(BucketIds {
                bucket,
                range: bucket.range(..),
                floor: None,
            }),
            None => Box::new(Empty::new()),
        }
    }
}

/// Cursor over one bucket's sorted id set, with lower-bound seek.
struct BucketIds<'a> {
    bucket: &'a BTreeSet<EntityId>,
    range: btree_set::Range<'a, EntityId>,
    floor: Option<EntityId>,
}

impl SeekStream for BucketIds<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let &id = self.range.next()?;
        self.floor = Some(id);

        Some(id)
    }

    fn seek(&mut self, to: &EntityId) {
        if self.floor.is_some_and(|floor| *to <= floor) {
            return;
        }

        self.range = self.bucket.range(*to..);
        self.floor = Some(*to);
    }
}

///
/// IndexBook
///
/// All equality indices, paged by (index-name, value-family).
///

#[derive(Default)]
pub struct IndexBook {
    pages: BTreeMap<PageKey, IndexPage>,
}

impl IndexBook {
    /// Apply a record's declared entries for `id`, replacing stale values.
    pub(crate) fn set(&mut self, id: EntityId, entries: Vec<IndexEntry>) {
        for entry in entries {
            self.pages
                .entry(entry.page_key())
                .or_default()
                .set(id, entry.value);
        }
    }

    /// Remove `id` from the pages named by `entries`.
    pub(crate) fn remove(&mut self, id: EntityId, entries: &[IndexEntry]) {
        for entry in entries {
            if let Some(page) = self.pages.get_mut(&entry.page_key()) {
                page.remove(id);
            }
        }
    }

    /// Remove `id` from every page.
    pub(crate) fn remove_all(&mut self, id: EntityId) {
        for page in self.pages.values_mut() {
            page.remove(id);
        }
    }

    /// Seekable stream over the sorted id set for an exact (name, value)
    /// bucket. A bucket that does not exist is an empty stream.
    pub(crate) fn search(&self, entry: &IndexEntry) -> BoxedSeekStream<'_, EntityId> {
        match self.pages.get(&entry.page_key()) {
            Some(page) => page.ids(&entry.value),
            None => Box::new(Empty::new()),
        }
    }

    /// Number of pages currently holding an entry for `id`.
    pub(crate) fn pages_holding(&self, id: EntityId) -> usize {
        self.pages
            .values()
            .filter(|page| page.by_id.contains_key(&id))
            .count()
    }
}
