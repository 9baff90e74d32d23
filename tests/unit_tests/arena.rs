use pglod::corrector::arena::{CorrectorArena, CorrectorStatus, CorrectorView};
use util::assert_panics;
use pglod::corrector::{CoarseScaleInformation, CorrectorKind, ElementCorrector};
use pglod::grid::PatchDescriptor;

fn dummy_corrector(element_index: usize) -> ElementCorrector {
    let patch = PatchDescriptor::new(vec![element_index], vec![1]);
    ElementCorrector::new(
        CorrectorKind::Basis,
        element_index,
        patch,
        CoarseScaleInformation::default(),
        None,
    )
}

#[test]
fn arena_insert_assigns_fresh_generations() {
    let mut arena = CorrectorArena::new();
    assert!(arena.is_empty());

    let a = arena.insert(0, dummy_corrector(0));
    let b = arena.insert(0, dummy_corrector(0));
    let c = arena.insert(1, dummy_corrector(1));

    assert_ne!(a, b);
    assert!(a.generation() < b.generation());
    assert!(b.generation() < c.generation());
    assert_eq!(a.element(), 0);
    assert_eq!(c.element(), 1);
    assert_eq!(arena.len(), 3);
    assert_eq!(arena.get(c).unwrap().element_index(), 1);
}

#[test]
fn cloned_views_are_independent() {
    let mut arena = CorrectorArena::new();
    let mut origin = CorrectorView::empty(3);
    for t in 0..3 {
        let id = arena.insert(t, dummy_corrector(t));
        origin.set(t, id);
    }
    assert!(origin.is_complete());

    let mut active = origin.clone();
    active.clear(1);
    assert_eq!(active.num_missing(), 1);
    assert!(!active.is_complete());
    assert!(origin.is_complete());

    let replacement = arena.insert(1, dummy_corrector(1));
    active.set(1, replacement);
    assert_ne!(active.get(1), origin.get(1));
    assert_eq!(active.get(0), origin.get(0));
    assert_eq!(active.get(2), origin.get(2));
}

#[test]
fn retain_referenced_drops_unreferenced_records() {
    let mut arena = CorrectorArena::new();
    let mut view = CorrectorView::empty(2);
    let kept = arena.insert(0, dummy_corrector(0));
    let replaced = arena.insert(1, dummy_corrector(1));
    view.set(0, kept);
    view.set(1, replaced);

    let mut other = view.clone();
    let newer = arena.insert(1, dummy_corrector(1));
    other.set(1, newer);

    // Both views keep all three records alive
    assert_eq!(arena.retain_referenced([&view, &other]), 0);
    assert_eq!(arena.len(), 3);

    // Once the first view is gone, its replaced record goes too
    assert_eq!(arena.retain_referenced([&other]), 1);
    assert!(!arena.contains(replaced));
    assert!(arena.contains(kept));
    assert!(arena.contains(newer));

    assert_eq!(arena.retain_referenced(std::iter::empty()), 2);
    assert!(arena.is_empty());
}

#[test]
#[should_panic]
fn view_rejects_id_of_other_element() {
    let mut arena = CorrectorArena::new();
    let id = arena.insert(0, dummy_corrector(0));
    let mut view = CorrectorView::empty(2);
    view.set(1, id);
}

#[test]
fn empty_view() {
    let view = CorrectorView::empty(4);
    assert_eq!(view.len(), 4);
    assert!(!view.is_empty());
    assert_eq!(view.num_missing(), 4);
    assert_eq!(view.ids().count(), 0);
    assert!(CorrectorView::empty(0).is_complete());
}

#[test]
fn status_transitions() {
    use CorrectorStatus::*;
    assert_eq!(Fresh.breached(), Stale);
    assert_eq!(Stale.breached(), Stale);
    assert_eq!(Stale.dispatched(), Pending);
    assert_eq!(Pending.merged(), Fresh);
    assert_eq!(Fresh.breached().dispatched().merged(), Fresh);

    assert_panics!(Pending.breached());
    assert_panics!(Fresh.dispatched());
    assert_panics!(Pending.dispatched());
    assert_panics!(Fresh.merged());
    assert_panics!(Stale.merged());
}
