//! Property-based tests for the reflow engine: conservation, the
//! no-overflow postcondition, consolidate idempotence and locked pages.

use folio_core::{
    Block, ChapterId, CharBudget, Document, LayoutMeasure, NodeId, consolidate_up,
};
use proptest::prelude::*;

fn chapter(lengths: &[usize]) -> Document {
    Document::from_blocks(
        ChapterId(1),
        "props",
        lengths.iter().enumerate().map(|(i, n)| {
            let c = char::from(b'a' + (i % 26) as u8);
            Block::paragraph(c.to_string().repeat(*n))
        }),
    )
}

fn layout(doc: &Document) -> Vec<Vec<NodeId>> {
    doc.pages()
        .iter()
        .map(|p| p.region.nodes().collect())
        .collect()
}

proptest! {
    #[test]
    fn reconcile_conserves_content_and_fits(
        lengths in prop::collection::vec(1usize..20, 0..40),
        capacity in 10usize..60,
    ) {
        let mut doc = chapter(&lengths);
        let before = doc.plain_text();
        let measure = CharBudget::new(capacity);
        doc.reconcile(&measure);

        prop_assert_eq!(doc.plain_text(), before);
        for page in doc.pages() {
            let over = measure.overflow(&page.region, doc.arena()).unwrap();
            prop_assert!(over == 0 || page.region.len() == 1);
        }
        if doc.page_count() > 1 {
            prop_assert!(!doc.pages().last().unwrap().is_empty());
        }
        prop_assert_eq!(doc.dirty_pages().count(), 0);
    }

    #[test]
    fn consolidate_is_idempotent(
        lengths in prop::collection::vec(1usize..20, 0..40),
        capacity in 10usize..60,
    ) {
        let mut doc = chapter(&lengths);
        let measure = CharBudget::new(capacity);
        doc.reconcile(&measure);
        let settled = layout(&doc);

        let report = consolidate_up(&mut doc, &measure);
        prop_assert_eq!(report.moved, 0);
        prop_assert_eq!(report.pages_pruned, 0);
        prop_assert_eq!(layout(&doc), settled);
    }

    #[test]
    fn shrinking_then_reconciling_conserves(
        lengths in prop::collection::vec(1usize..20, 2..40),
        capacity in 10usize..60,
        removals in prop::collection::vec(any::<prop::sample::Index>(), 1..5),
    ) {
        let mut doc = chapter(&lengths);
        let measure = CharBudget::new(capacity);
        doc.reconcile(&measure);

        for index in removals {
            let page = index.index(doc.page_count());
            if let Some(id) = doc.page(page).and_then(|p| p.region.leading()) {
                doc.remove_block(page, id).unwrap();
            }
        }
        let before = doc.plain_text();
        doc.reconcile(&measure);
        prop_assert_eq!(doc.plain_text(), before);
        prop_assert_eq!(consolidate_up(&mut doc, &measure).moved, 0);
    }

    #[test]
    fn locked_pages_are_stable(
        lengths in prop::collection::vec(1usize..20, 5..40),
        capacity in 10usize..40,
        lock in any::<prop::sample::Index>(),
        extra in prop::collection::vec(1usize..20, 1..10),
    ) {
        let mut doc = chapter(&lengths);
        let measure = CharBudget::new(capacity);
        doc.reconcile(&measure);
        prop_assume!(doc.page_count() > 1);

        let locked = lock.index(doc.page_count());
        doc.set_locked(locked, true).unwrap();
        let frozen: Vec<NodeId> = doc.page(locked).unwrap().region.nodes().collect();
        let frozen_stored = doc.page(locked).unwrap().stored.clone();

        let target = if locked == 0 { doc.page_count() - 1 } else { 0 };
        for n in extra {
            doc.push_block(target, Block::paragraph("z".repeat(n))).unwrap();
        }
        let before = doc.plain_text();
        doc.reconcile(&measure);

        prop_assert_eq!(doc.plain_text(), before);
        let locked_pages: Vec<_> = doc.pages().iter().filter(|p| p.is_locked()).collect();
        prop_assert_eq!(locked_pages.len(), 1);
        prop_assert_eq!(locked_pages[0].region.nodes().collect::<Vec<_>>(), frozen);
        prop_assert_eq!(&locked_pages[0].stored, &frozen_stored);
    }
}
