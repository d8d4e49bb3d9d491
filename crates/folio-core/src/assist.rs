//! Assist preview flow: send selected text to a text transformation
//! service, show the result as an uncommitted preview, then approve or
//! discard it.
//!
//! ```text
//! Idle -> Requested -> Preview | Issues | Failed
//! Preview -> (approve) Idle
//! Preview -> (discard) Idle
//! Preview -> (regenerate) Requested
//! ```
//!
//! Every request gets a [`RequestTicket`]. A completion carrying any ticket
//! but the latest is stale and dropped.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::document::Document;
use crate::error::EditError;
use crate::fragment::{Block, InlineRun, InlineStyle};
use crate::types::{NodeId, NodePosition, Selection};

/// What the service is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistAction {
    /// Rewrite the selection, optionally following instructions and a tone.
    Rewrite,
    /// Return a corrected version of the selection.
    Proofread,
    /// List the issues found in the whole chapter.
    ProofreadChapter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Friendly,
    Excited,
    Formal,
    Concise,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Friendly,
        Tone::Excited,
        Tone::Formal,
        Tone::Concise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Excited => "excited",
            Tone::Formal => "formal",
            Tone::Concise => "concise",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tone {s:?}"))
    }
}

/// One request to the transformation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistRequest {
    pub action: AssistAction,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
}

impl AssistRequest {
    pub fn new(action: AssistAction, text: impl Into<String>) -> Self {
        Self {
            action,
            text: text.into(),
            instructions: None,
            tone: None,
        }
    }
}

/// A problem found by chapter proofreading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofreadIssue {
    /// Category such as "spelling" or "grammar".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(alias = "text")]
    pub original: String,
    pub suggestion: String,
    #[serde(rename = "description", alias = "explanation", default)]
    pub explanation: String,
}

/// What the service returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutput {
    Replacement(String),
    Issues(Vec<ProofreadIssue>),
}

/// An external text transformation service.
pub trait TextTransformer {
    type Error: fmt::Display;

    fn transform(
        &self,
        request: &AssistRequest,
    ) -> impl Future<Output = Result<AssistOutput, Self::Error>>;
}

/// Sequence number of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(pub u64);

/// Where the session is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssistState {
    #[default]
    Idle,
    Requested(RequestTicket),
    /// A replacement is shown in the document as a preview.
    Preview,
    Issues(Vec<ProofreadIssue>),
    /// The request failed; the message is shown inline.
    Failed(String),
}

/// The selection a request was made for.
#[derive(Debug, Clone)]
struct Target {
    start: NodePosition,
    end: NodePosition,
    /// Covered blocks as they were right before the preview went in.
    original: Vec<(NodeId, Block)>,
}

#[derive(Debug, Clone)]
struct Pending {
    ticket: RequestTicket,
    request: AssistRequest,
    target: Option<Target>,
}

/// Drives one assist interaction at a time.
#[derive(Debug, Default)]
pub struct AssistSession {
    next_ticket: u64,
    state: AssistState,
    pending: Option<Pending>,
}

impl AssistSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AssistState {
        &self.state
    }

    pub fn request(&self) -> Option<&AssistRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    pub fn issues(&self) -> &[ProofreadIssue] {
        match &self.state {
            AssistState::Issues(issues) => issues,
            _ => &[],
        }
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.next_ticket += 1;
        RequestTicket(self.next_ticket)
    }

    /// Start a request, superseding whatever the session was doing.
    ///
    /// `target` is the page and selection to work on; chapter proofreading
    /// ignores it and reads the whole chapter.
    pub fn begin(
        &mut self,
        doc: &mut Document,
        action: AssistAction,
        target: Option<(usize, Selection)>,
        instructions: Option<String>,
        tone: Option<Tone>,
    ) -> Result<(RequestTicket, AssistRequest), EditError> {
        self.discard(doc);
        let (text, target) = match action {
            AssistAction::ProofreadChapter => (doc.plain_text(), None),
            AssistAction::Rewrite | AssistAction::Proofread => {
                let (page, selection) = target.ok_or(EditError::EmptySelection)?;
                if selection.is_collapsed() {
                    return Err(EditError::EmptySelection);
                }
                doc.check_editable(page)?;
                let (text, target) = capture(doc, page, &selection)?;
                (text, Some(target))
            }
        };
        if text.trim().is_empty() {
            return Err(EditError::EmptySelection);
        }

        let request = AssistRequest {
            action,
            text,
            instructions: instructions.filter(|i| !i.trim().is_empty()),
            tone,
        };
        let ticket = self.issue_ticket();
        self.pending = Some(Pending {
            ticket,
            request: request.clone(),
            target,
        });
        self.state = AssistState::Requested(ticket);
        tracing::debug!(ticket = ticket.0, ?action, "assist request started");
        Ok((ticket, request))
    }

    /// Deliver the service's answer for `ticket`.
    ///
    /// Returns false when the answer is stale and was dropped. Failures are
    /// kept as a message and leave the document untouched.
    pub fn complete(
        &mut self,
        doc: &mut Document,
        ticket: RequestTicket,
        result: Result<AssistOutput, String>,
    ) -> bool {
        let current = matches!(self.state, AssistState::Requested(t) if t == ticket);
        let Some(pending) = self.pending.as_mut().filter(|p| current && p.ticket == ticket) else {
            tracing::debug!(ticket = ticket.0, "dropping stale assist result");
            return false;
        };

        self.state = match result {
            Err(message) => {
                tracing::warn!(ticket = ticket.0, %message, "assist request failed");
                AssistState::Failed(message)
            }
            Ok(AssistOutput::Issues(issues)) => AssistState::Issues(issues),
            Ok(AssistOutput::Replacement(text)) => match pending.target.as_mut() {
                None => AssistState::Failed(
                    "The assistant returned text where a list of issues was expected.".into(),
                ),
                Some(target) => match insert_preview(doc, target, text) {
                    Ok(()) => AssistState::Preview,
                    Err(err) => AssistState::Failed(format!("Couldn't show the suggestion: {err}")),
                },
            },
        };
        true
    }

    /// Await the service for the current request and deliver the answer.
    pub async fn run<T: TextTransformer>(&mut self, doc: &mut Document, transformer: &T) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        if self.state != AssistState::Requested(pending.ticket) {
            return false;
        }
        let ticket = pending.ticket;
        let request = pending.request.clone();
        let started = Instant::now();
        let result = transformer
            .transform(&request)
            .await
            .map_err(|err| err.to_string());
        tracing::debug!(
            ticket = ticket.0,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "assist request finished"
        );
        self.complete(doc, ticket, result)
    }

    /// Commit the preview as ordinary text.
    ///
    /// The page is marked dirty; the caller's next reconcile reflows and
    /// persists it.
    pub fn approve(&mut self, doc: &mut Document) -> bool {
        if self.state != AssistState::Preview {
            return false;
        }
        let first = self
            .pending
            .as_ref()
            .and_then(|p| p.target.as_ref())
            .and_then(|t| t.original.first())
            .map(|(id, _)| *id);
        if let Some(id) = first {
            if let Some(block) = doc.block_mut(id) {
                for run in &mut block.runs {
                    run.style.preview = false;
                }
                block.normalize();
            }
            if let Some((page, _)) = doc.locate(id) {
                doc.mark_dirty(page);
            }
        }
        self.pending = None;
        self.state = AssistState::Idle;
        true
    }

    /// Drop whatever the session holds. A shown preview is replaced by the
    /// original content, ids included, so the stored content is unchanged.
    ///
    /// Returns true if a preview was removed.
    pub fn discard(&mut self, doc: &mut Document) -> bool {
        let restored = self.restore_preview(doc);
        self.pending = None;
        self.state = AssistState::Idle;
        restored
    }

    /// Put the original text back and ask again with the same request.
    pub fn regenerate(&mut self, doc: &mut Document) -> Option<(RequestTicket, AssistRequest)> {
        if matches!(self.state, AssistState::Idle | AssistState::Requested(_)) {
            return None;
        }
        self.restore_preview(doc);
        let ticket = self.issue_ticket();
        let pending = self.pending.as_mut()?;
        pending.ticket = ticket;
        self.state = AssistState::Requested(ticket);
        Some((ticket, pending.request.clone()))
    }

    fn restore_preview(&mut self, doc: &mut Document) -> bool {
        if self.state != AssistState::Preview {
            return false;
        }
        let Some(target) = self.pending.as_ref().and_then(|p| p.target.as_ref()) else {
            return false;
        };
        restore(doc, target);
        true
    }

    /// Apply the suggestion of the issue at `index` and drop it from the list.
    pub fn apply_issue(&mut self, doc: &mut Document, index: usize) -> bool {
        let AssistState::Issues(issues) = &mut self.state else {
            return false;
        };
        let Some(issue) = issues.get(index) else {
            return false;
        };
        if !apply_fix(doc, issue) {
            return false;
        }
        issues.remove(index);
        true
    }
}

/// Replace the first occurrence of `issue.original` found inside a single
/// run of an unlocked page with the suggestion.
pub fn apply_fix(doc: &mut Document, issue: &ProofreadIssue) -> bool {
    if issue.original.is_empty() {
        return false;
    }
    let found = doc.pages().iter().enumerate().find_map(|(page, p)| {
        if p.locked {
            return None;
        }
        p.region
            .nodes()
            .find(|id| {
                doc.block(*id)
                    .is_some_and(|b| b.runs.iter().any(|r| r.text.contains(&issue.original)))
            })
            .map(|id| (page, id))
    });
    let Some((page, id)) = found else {
        return false;
    };
    if let Some(block) = doc.block_mut(id) {
        if let Some(run) = block.runs.iter_mut().find(|r| r.text.contains(&issue.original)) {
            run.text = run.text.replacen(&issue.original, &issue.suggestion, 1);
        }
        block.normalize();
    }
    doc.mark_dirty(page);
    true
}

/// Selected text (blocks joined with `\n`) and the target it came from.
fn capture(
    doc: &Document,
    page: usize,
    selection: &Selection,
) -> Result<(String, Target), EditError> {
    let region = &doc.pages()[page].region;
    let not_on_page = EditError::NodeNotOnPage {
        node: selection.anchor.node,
        page,
    };
    let (start, end) = region
        .order_selection(selection)
        .ok_or(not_on_page.clone())?;
    let nodes = region.covered_nodes(selection).ok_or(not_on_page)?;

    let mut parts = Vec::with_capacity(nodes.len());
    let mut original = Vec::with_capacity(nodes.len());
    for id in nodes {
        let block = doc.block(id).ok_or(EditError::UnknownNode(id))?;
        let text = block.plain_text();
        let from = if id == start.node { start.offset } else { 0 };
        let to = if id == end.node { end.offset } else { usize::MAX };
        parts.push(text.chars().skip(from).take(to.saturating_sub(from)).collect::<String>());
        original.push((id, block.clone()));
    }
    Ok((
        parts.join("\n"),
        Target {
            start,
            end,
            original,
        },
    ))
}

/// Swap the selected content for a preview run.
fn insert_preview(doc: &mut Document, target: &mut Target, text: String) -> Result<(), EditError> {
    let Some(&(first, _)) = target.original.first() else {
        return Err(EditError::EmptySelection);
    };
    let (page, _) = doc.locate(first).ok_or(EditError::UnknownNode(first))?;
    doc.check_editable(page)?;

    let ids: Vec<NodeId> = target.original.iter().map(|(id, _)| *id).collect();
    let mut snapshot = Vec::with_capacity(ids.len());
    for id in &ids {
        if !doc.pages()[page].region.contains(*id) {
            return Err(EditError::NodeNotOnPage { node: *id, page });
        }
        let block = doc.block(*id).ok_or(EditError::UnknownNode(*id))?;
        snapshot.push((*id, block.clone()));
    }
    target.original = snapshot;

    let preview = InlineRun::styled(
        text,
        InlineStyle {
            preview: true,
            ..Default::default()
        },
    );
    let last = ids[ids.len() - 1];
    if last == first {
        if let Some(block) = doc.block_mut(first) {
            block.replace_range(target.start.offset..target.end.offset, vec![preview]);
        }
    } else {
        let tail = doc
            .block_mut(last)
            .map(|b| b.split_off(target.end.offset))
            .unwrap_or_default();
        for id in &ids[1..] {
            doc.pages[page].region.remove(*id);
            doc.arena.remove(*id);
        }
        if let Some(block) = doc.block_mut(first) {
            block.split_off(target.start.offset);
            block.append_runs([preview]);
            block.append_runs(tail);
        }
    }
    Ok(())
}

fn restore(doc: &mut Document, target: &Target) {
    let Some((first, block)) = target.original.first() else {
        return;
    };
    let Some((page, index)) = doc.locate(*first) else {
        tracing::warn!(node = %first, "preview block vanished, nothing to restore");
        return;
    };
    if let Some(current) = doc.block_mut(*first) {
        *current = block.clone();
    }
    for (offset, (id, block)) in target.original[1..].iter().enumerate() {
        if doc.arena.restore(*id, block.clone()) {
            doc.pages[page].region.insert(index + 1 + offset, *id);
        }
    }
}
