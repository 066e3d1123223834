//! Component pages and the book that routes records to them.

use crate::{
    db::{EntityId, index::IndexEntry},
    error::Error,
    stream::{BoxedSeekStream, Empty, Intersect, SeekStream},
};
use derive_more::{Deref, DerefMut};
use serde::Serialize;
use std::{
    any::Any,
    collections::{BTreeMap, btree_map},
    fmt,
};

///
/// Kind
///
/// Stable descriptor for one record type. One kind maps to exactly one
/// page; two record types sharing a kind name is a registration bug and is
/// reported as corruption at the page boundary.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Kind(&'static str);

impl Kind {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// Record
///
/// A typed component payload. `KIND` selects the storage page;
/// `index_entries` reports the (index-name, value) pairs that the equality
/// indices keep synchronized with every write and removal of this record.
///

pub trait Record: Clone + 'static {
    const KIND: Kind;

    fn index_entries(&self) -> Vec<IndexEntry> {
        Vec::new()
    }
}

///
/// Page
///
/// Sorted id → record storage for a single kind. Writing an id that is
/// already present replaces the prior value.
///

#[derive(Deref, DerefMut)]
pub(crate) struct Page<R: Record>(BTreeMap<EntityId, R>);

impl<R: Record> Page<R> {
    const fn new() -> Self {
        Self(BTreeMap::new())
    }
}

/// Object-safe face of a typed page, so the book can hold pages of every
/// kind in one registry. The `Any` hooks exist solely to recover the typed
/// page; routing itself is by `Kind`.
trait ErasedPage {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn holds(&self, id: EntityId) -> bool;
    fn drop_id(&mut self, id: EntityId) -> bool;
    fn population(&self) -> usize;
    fn ids(&self) -> BoxedSeekStream<'_, EntityId>;
}

impl<R: Record> ErasedPage for Page<R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn holds(&self, id: EntityId) -> bool {
        self.0.contains_key(&id)
    }

    fn drop_id(&mut self, id: EntityId) -> bool {
        self.0.remove(&id).is_some()
    }

    fn population(&self) -> usize {
        self.0.len()
    }

    fn ids(&self) -> BoxedSeekStream<'_, EntityId> {
        Box::new(PageIds {
            page: &self.0,
            range: self.0.range(..),
            floor: None,
        })
    }
}

/// Population cursor over one page. Seeks resolve through the tree's native
/// lower-bound lookup; the floor keeps the cursor forward-only.
struct PageIds<'a, R> {
    page: &'a BTreeMap<EntityId, R>,
    range: btree_map::Range<'a, EntityId, R>,
    floor: Option<EntityId>,
}

impl<R> SeekStream for PageIds<'_, R> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let (&id, _) = self.range.next()?;
        self.floor = Some(id);

        Some(id)
    }

    fn seek(&mut self, to: &EntityId) {
        if self.floor.is_some_and(|floor| *to <= floor) {
            return;
        }

        self.range = self.page.range(*to..);
        self.floor = Some(*to);
    }
}

///
/// DataBook
///
/// Kind-keyed registry of component pages. Pages are created on first write
/// of their kind; a lookup for a kind that was never written sees an empty
/// population.
///

#[derive(Default)]
pub struct DataBook {
    pages: BTreeMap<Kind, Box<dyn ErasedPage>>,
}

impl DataBook {
    /// Insert or replace the record for `id` in its kind's page.
    pub(crate) fn add<R: Record>(&mut self, id: EntityId, record: R) -> Result<(), Error> {
        self.page_mut_or_insert::<R>()?.insert(id, record);
        Ok(())
    }

    /// Remove the `R` record for `id`. Returns whether one was present.
    pub(crate) fn remove<R: Record>(&mut self, id: EntityId) -> Result<bool, Error> {
        match self.pages.get_mut(&R::KIND) {
            None => Ok(false),
            Some(page) => Ok(downcast_mut::<R>(page.as_mut())?.remove(&id).is_some()),
        }
    }

    /// Remove `id` from every kind's page.
    pub(crate) fn remove_all(&mut self, id: EntityId) {
        for page in self.pages.values_mut() {
            page.drop_id(id);
        }
    }

    pub(crate) fn get<R: Record>(&self, id: EntityId) -> Result<Option<R>, Error> {
        match self.pages.get(&R::KIND) {
            None => Ok(None),
            Some(page) => Ok(downcast_ref::<R>(page.as_ref())?.get(&id).cloned()),
        }
    }

    /// Seekable population stream for one kind.
    pub(crate) fn ids(&self, kind: Kind) -> BoxedSeekStream<'_, EntityId> {
        match self.pages.get(&kind) {
            Some(page) => page.ids(),
            None => Box::new(Empty::new()),
        }
    }

    /// Ids holding a record for every requested kind, as the intersection
    /// of the per-kind population streams. No kinds means no ids.
    pub(crate) fn all(&self, kinds: &[Kind]) -> BoxedSeekStream<'_, EntityId> {
        let lanes = kinds.iter().map(|kind| self.ids(*kind)).collect();

        Box::new(Intersect::new(lanes))
    }

    /// Number of pages currently holding a record for `id`.
    pub(crate) fn pages_holding(&self, id: EntityId) -> usize {
        self.pages.values().filter(|page| page.holds(id)).count()
    }

    /// Number of records stored in one kind's page.
    pub(crate) fn page_len(&self, kind: Kind) -> usize {
        self.pages.get(&kind).map_or(0, |page| page.population())
    }

    fn page_mut_or_insert<R: Record>(&mut self) -> Result<&mut Page<R>, Error> {
        let slot = self
            .pages
            .entry(R::KIND)
            .or_insert_with(|| Box::new(Page::<R>::new()));

        downcast_mut::<R>(slot.as_mut())
    }
}

fn downcast_ref<R: Record>(page: &dyn ErasedPage) -> Result<&Page<R>, Error> {
    page.as_any()
        .downcast_ref::<Page<R>>()
        .ok_or_else(kind_collision::<R>)
}

fn downcast_mut<R: Record>(page: &mut dyn ErasedPage) -> Result<&mut Page<R>, Error> {
    page.as_any_mut()
        .downcast_mut::<Page<R>>()
        .ok_or_else(kind_collision::<R>)
}

fn kind_collision<R: Record>() -> Error {
    Error::store_corruption(format!(
        "kind '{}' is registered with a different record type",
        R::KIND
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamIter;

    #[derive(Clone, Debug, PartialEq)]
    struct Label(String);

    impl Record for Label {
        const KIND: Kind = Kind::new("label");
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Weight(u32);

    impl Record for Weight {
        const KIND: Kind = Kind::new("weight");
    }

    #[derive(Clone, Debug, PartialEq)]
    struct MislabeledWeight(u32);

    impl Record for MislabeledWeight {
        const KIND: Kind = Kind::new("label");
    }

    fn id(raw: u64) -> EntityId {
        EntityId::new(raw)
    }

    fn book_with_defaults() -> DataBook {
        let mut book = DataBook::default();
        book.add(id(1), Label("l1".to_string())).expect("add label");
        book.add(id(3), Label("l3".to_string())).expect("add label");
        book.add(id(3), Weight(3)).expect("add weight");
        book.add(id(6), Weight(6)).expect("add weight");

        book
    }

    #[test]
    fn get_returns_the_stored_record() {
        let book = book_with_defaults();

        let label = book.get::<Label>(id(1)).expect("page type should match");
        assert_eq!(label, Some(Label("l1".to_string())));
    }

    #[test]
    fn get_miss_is_none_not_an_error() {
        let book = book_with_defaults();

        assert_eq!(book.get::<Weight>(id(1)).expect("page type"), None);
        assert_eq!(book.get::<Label>(id(9)).expect("page type"), None);
    }

    #[test]
    fn writing_the_same_id_and_kind_replaces() {
        let mut book = book_with_defaults();
        book.add(id(1), Label("latest".to_string())).expect("add");

        let label = book.get::<Label>(id(1)).expect("page type");
        assert_eq!(label, Some(Label("latest".to_string())));
        assert_eq!(book.page_len(Label::KIND), 2);
    }

    #[test]
    fn remove_drops_only_the_requested_kind() {
        let mut book = book_with_defaults();

        assert!(book.remove::<Label>(id(3)).expect("page type"));
        assert_eq!(book.get::<Label>(id(3)).expect("page type"), None);
        assert_eq!(book.get::<Weight>(id(3)).expect("page type"), Some(Weight(3)));
    }

    #[test]
    fn remove_of_an_absent_record_reports_false() {
        let mut book = book_with_defaults();

        assert!(!book.remove::<Weight>(id(1)).expect("page type"));
    }

    #[test]
    fn remove_all_purges_every_page() {
        let mut book = book_with_defaults();
        book.remove_all(id(3));

        assert_eq!(book.get::<Label>(id(3)).expect("page type"), None);
        assert_eq!(book.get::<Weight>(id(3)).expect("page type"), None);
        assert_eq!(book.pages_holding(id(3)), 0);
    }

    #[test]
    fn ids_stream_walks_the_page_population_in_order() {
        let book = book_with_defaults();

        let ids: Vec<EntityId> = StreamIter::new(book.ids(Label::KIND)).collect();
        assert_eq!(ids, vec![id(1), id(3)]);
    }

    #[test]
    fn ids_stream_for_an_unwritten_kind_is_empty() {
        let book = DataBook::default();

        let ids: Vec<EntityId> = StreamIter::new(book.ids(Label::KIND)).collect();
        assert_eq!(ids, Vec::new());
    }

    #[test]
    fn all_intersects_page_populations() {
        let book = book_with_defaults();

        let ids: Vec<EntityId> =
            StreamIter::new(book.all(&[Label::KIND, Weight::KIND])).collect();
        assert_eq!(ids, vec![id(3)]);
    }

    #[test]
    fn kind_collision_is_reported_as_corruption() {
        let book = book_with_defaults();

        let err = book
            .get::<MislabeledWeight>(id(1))
            .expect_err("a second record type on the same kind must be rejected");
        assert_eq!(err.class, crate::error::ErrorClass::Corruption);
    }

    #[test]
    fn page_cursor_seeks_by_lower_bound() {
        let mut book = DataBook::default();
        for raw in [1, 4, 6, 9] {
            book.add(id(raw), Weight(raw as u32)).expect("add");
        }

        let mut stream = book.ids(Weight::KIND);
        assert_eq!(stream.next(), Some(id(1)));

        stream.seek(&id(5));
        assert_eq!(stream.next(), Some(id(6)));

        stream.seek(&id(2));
        assert_eq!(stream.next(), Some(id(9)));
        assert_eq!(stream.next(), None);
    }
}
