//! The reflow engine: overflow resolution, shrink resolution and pruning.
//!
//! Blocks are the unit of transfer. Reflow-down moves trailing blocks of an
//! overflowing page onto the front of the next page; consolidate-up pulls
//! leading blocks of later pages back while they fit. Both only ever transfer
//! ids between regions, so content is conserved and the chapter's plain-text
//! projection never changes.
//!
//! Locked pages are never a source or target of either pass.

use std::collections::BTreeSet;

use crate::document::Document;
use crate::platform::LayoutMeasure;
use crate::types::{NodeId, PageCursor};

/// Something reflow could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflowWarning {
    /// A page's only block overflows on its own. Moving it would just move
    /// the overflow, so the page is left as is.
    Unsplittable { page: usize, node: NodeId },
}

/// What one reflow or consolidate pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflowReport {
    /// Blocks transferred between pages.
    pub moved: usize,
    pub pages_created: usize,
    pub pages_pruned: usize,
    pub warnings: Vec<ReflowWarning>,
    /// Pages whose content changed, by current index.
    pub touched: BTreeSet<usize>,
}

impl ReflowReport {
    /// Keep touched indexes pointing at the same pages after a page is
    /// inserted at `at`.
    fn page_inserted(&mut self, at: usize) {
        self.touched = self
            .touched
            .iter()
            .map(|&i| if i >= at { i + 1 } else { i })
            .collect();
        self.pages_created += 1;
    }

    pub fn is_noop(&self) -> bool {
        self.moved == 0 && self.pages_created == 0 && self.pages_pruned == 0
    }
}

/// Result of [`Document::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub down: ReflowReport,
    pub up: ReflowReport,
    /// Pages whose stored content was rewritten.
    pub persisted: Vec<usize>,
}

impl ReconcileReport {
    pub fn warnings(&self) -> impl Iterator<Item = &ReflowWarning> {
        self.down.warnings.iter().chain(self.up.warnings.iter())
    }
}

fn overflow<M: LayoutMeasure + ?Sized>(doc: &Document, page: usize, measure: &M) -> u32 {
    let Some(p) = doc.pages.get(page) else {
        return 0;
    };
    match measure.overflow(&p.region, &doc.arena) {
        Ok(amount) => amount,
        Err(err) => {
            tracing::debug!(page, %err, "measurement failed, treating as no overflow");
            0
        }
    }
}

/// Resolve overflow starting at `page`, cascading down the chapter.
///
/// Pages created along the way are persisted together with the pages they
/// took content from, and focus follows the moved content to the start of
/// the next page.
pub fn reflow_down<M: LayoutMeasure + ?Sized>(
    doc: &mut Document,
    page: usize,
    measure: &M,
) -> ReflowReport {
    let mut report = ReflowReport::default();
    reflow_down_into(doc, page, measure, &mut report);
    for index in report.touched.clone() {
        doc.persist_unchecked(index);
    }
    report
}

fn reflow_down_into<M: LayoutMeasure + ?Sized>(
    doc: &mut Document,
    start: usize,
    measure: &M,
    report: &mut ReflowReport,
) {
    let mut index = start;
    while index < doc.pages.len() {
        if doc.pages[index].locked {
            tracing::debug!(page = index, "page locked, reflow stops");
            return;
        }

        let mut moved = 0;
        while overflow(doc, index, measure) > 0 {
            if doc.pages[index].region.len() <= 1 {
                if let Some(node) = doc.pages[index].region.leading() {
                    tracing::warn!(page = index, %node, "single block overflows its page");
                    report
                        .warnings
                        .push(ReflowWarning::Unsplittable { page: index, node });
                }
                break;
            }

            let target = index + 1;
            if target >= doc.pages.len() || doc.pages[target].locked {
                doc.insert_page_at(target);
                report.page_inserted(target);
                tracing::debug!(page = target, "created page for overflow");
            }

            let Some(node) = doc.pages[index].region.remove_trailing() else {
                break;
            };
            doc.pages[target].region.prepend_leading(node);
            tracing::debug!(from = index, to = target, %node, "moved block down");
            moved += 1;
            report.touched.insert(index);
            report.touched.insert(target);
        }

        if moved == 0 {
            return;
        }
        report.moved += moved;

        let next = index + 1;
        doc.focus = Some(PageCursor::new(
            next,
            doc.pages[next].region.start_position(),
        ));
        index = next;
    }
}

/// Pull content back up into pages with room, then prune the empty tail.
pub fn consolidate_up<M: LayoutMeasure + ?Sized>(
    doc: &mut Document,
    measure: &M,
) -> ReflowReport {
    let mut report = ReflowReport::default();
    consolidate_into(doc, measure, &mut report);
    for index in report.touched.clone() {
        doc.persist_unchecked(index);
    }
    report
}

fn consolidate_into<M: LayoutMeasure + ?Sized>(
    doc: &mut Document,
    measure: &M,
    report: &mut ReflowReport,
) {
    for current in 0..doc.pages.len() {
        if doc.pages[current].locked {
            continue;
        }
        let mut source = current + 1;
        while source < doc.pages.len() {
            if doc.pages[source].locked {
                break;
            }
            let Some(node) = doc.pages[source].region.leading() else {
                // Drained; keep pulling from the page after it.
                source += 1;
                continue;
            };

            doc.pages[current].region.append_trailing(node);
            if overflow(doc, current, measure) > 0 {
                doc.pages[current].region.remove_trailing();
                break;
            }
            doc.pages[source].region.remove_leading();
            tracing::debug!(from = source, to = current, %node, "moved block up");
            report.moved += 1;
            report.touched.insert(current);
            report.touched.insert(source);
        }
    }

    let pruned = prune_empty_tail(doc);
    report.pages_pruned += pruned;
    follow_focus(doc);
    let count = doc.pages.len();
    report.touched.retain(|&i| i < count);
}

/// Remove trailing pages that have no content, never page 0 and never past
/// a locked page. Returns how many pages were removed.
pub fn prune_empty_tail(doc: &mut Document) -> usize {
    let mut pruned = 0;
    while doc.pages.len() > 1 {
        let last = doc.pages.len() - 1;
        let page = &doc.pages[last];
        if page.locked || !page.is_empty() {
            break;
        }
        doc.pages.pop();
        doc.dirty.remove(&last);
        pruned += 1;
    }

    if pruned > 0 {
        tracing::debug!(pruned, "pruned empty pages");
        follow_focus(doc);
    }
    pruned
}

/// Point the focus at the page now holding its block, keeping the caret.
///
/// Falls back to the start of the nearest existing page when the block is
/// gone or the focus has no position past the last page.
fn follow_focus(doc: &mut Document) {
    let Some(focus) = doc.focus else {
        return;
    };
    if let Some(position) = focus.position {
        if let Some((page, _)) = doc.locate(position.node) {
            doc.focus = Some(PageCursor::new(page, Some(position)));
            return;
        }
    }
    let last = doc.pages.len() - 1;
    if focus.position.is_some() || focus.page > last {
        let page = focus.page.min(last);
        doc.focus = Some(PageCursor::new(page, doc.pages[page].region.start_position()));
    }
}

/// Phase two of an edit: settle every dirty page.
///
/// Dirty pages are reflowed highest index first, so pages inserted by one
/// reflow never shift the index of a page still waiting its turn. Then the
/// whole chapter is consolidated and pruned, and every touched page is
/// persisted.
#[tracing::instrument(level = "debug", skip_all, fields(chapter = %doc.id))]
pub fn reconcile<M: LayoutMeasure + ?Sized>(doc: &mut Document, measure: &M) -> ReconcileReport {
    let dirty = std::mem::take(&mut doc.dirty);
    let mut down = ReflowReport {
        touched: dirty.clone(),
        ..Default::default()
    };
    for page in dirty.into_iter().rev() {
        reflow_down_into(doc, page, measure, &mut down);
    }
    let count = doc.pages.len();
    down.touched.retain(|&i| i < count);

    let mut up = ReflowReport::default();
    consolidate_into(doc, measure, &mut up);

    let count = doc.pages.len();
    let persisted: Vec<usize> = down
        .touched
        .iter()
        .chain(up.touched.iter())
        .copied()
        .filter(|&i| i < count)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for &index in &persisted {
        doc.persist_unchecked(index);
    }

    if !down.warnings.is_empty() {
        tracing::debug!(warnings = down.warnings.len(), "reconcile left overflow");
    }
    ReconcileReport { down, up, persisted }
}
