//! Versioned storage of element correctors.
//!
//! Every computed corrector is stored exactly once in a [`CorrectorArena`] under a
//! [`CorrectorId`], which combines the element index with a generation stamp. Named sets of
//! correctors (origin, testing, active) are [`CorrectorView`]s mapping each coarse element to an
//! id, so copying a view never copies corrector data.
use crate::corrector::ElementCorrector;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrectorId {
    element: usize,
    generation: u64,
}

impl CorrectorId {
    pub fn element(&self) -> usize {
        self.element
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorrectorArena {
    records: FxHashMap<CorrectorId, ElementCorrector>,
    next_generation: u64,
}

impl CorrectorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a corrector for the given element under a fresh generation.
    pub fn insert(&mut self, element: usize, corrector: ElementCorrector) -> CorrectorId {
        let id = CorrectorId {
            element,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.records.insert(id, corrector);
        id
    }

    pub fn get(&self, id: CorrectorId) -> Option<&ElementCorrector> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: CorrectorId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record not referenced by any of the given views.
    ///
    /// Returns the number of dropped records.
    pub fn retain_referenced<'a>(&mut self, views: impl IntoIterator<Item = &'a CorrectorView>) -> usize {
        let live: FxHashSet<CorrectorId> = views.into_iter().flat_map(|view| view.ids()).collect();
        let before = self.records.len();
        self.records.retain(|id, _| live.contains(id));
        before - self.records.len()
    }
}

/// Assignment of a corrector record to each coarse element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectorView {
    entries: Vec<Option<CorrectorId>>,
}

impl CorrectorView {
    pub fn empty(num_elements: usize) -> Self {
        Self {
            entries: vec![None; num_elements],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, element: usize) -> Option<CorrectorId> {
        self.entries[element]
    }

    /// # Panics
    ///
    /// Panics if the id belongs to a different element.
    pub fn set(&mut self, element: usize, id: CorrectorId) {
        assert_eq!(id.element(), element, "Corrector id assigned to the wrong element");
        self.entries[element] = Some(id);
    }

    pub fn clear(&mut self, element: usize) {
        self.entries[element] = None;
    }

    /// Whether every element has a corrector assigned.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    pub fn num_missing(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_none()).count()
    }

    pub fn ids(&self) -> impl Iterator<Item = CorrectorId> + '_ {
        self.entries.iter().flatten().copied()
    }

    pub fn entries(&self) -> &[Option<CorrectorId>] {
        &self.entries
    }
}

/// Freshness of the corrector of one element in the active view.
///
/// An element becomes `Stale` when its error indicator breaches the tolerance, `Pending` once its
/// recomputation has been dispatched and `Fresh` again when the result is merged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CorrectorStatus {
    Fresh,
    Stale,
    Pending,
}

impl CorrectorStatus {
    /// The status after the error indicator exceeded the tolerance.
    ///
    /// # Panics
    ///
    /// Panics if the element is `Pending`.
    pub fn breached(self) -> Self {
        assert_ne!(self, Self::Pending, "A pending corrector cannot breach the tolerance");
        Self::Stale
    }

    /// The status after the recomputation has been dispatched.
    ///
    /// # Panics
    ///
    /// Panics unless the element is `Stale`.
    pub fn dispatched(self) -> Self {
        assert_eq!(self, Self::Stale, "Only stale correctors can be dispatched");
        Self::Pending
    }

    /// The status after the recomputed corrector has been merged.
    ///
    /// # Panics
    ///
    /// Panics unless the element is `Pending`.
    pub fn merged(self) -> Self {
        assert_eq!(self, Self::Pending, "Only pending correctors can be merged");
        Self::Fresh
    }
}
