//! Stream reconciliation
//!
//! Folds the fragments of a streaming completion into the assistant
//! placeholder message of a session, one fragment at a time and strictly in
//! arrival order.
//!
//! Upstream endpoints occasionally retransmit a fragment. The reconciler
//! drops a fragment when it already appears near the end of the accumulated
//! text (see [`should_suppress`]). This is a heuristic: legitimately
//! repeated text such as "ha" followed by "ha" is dropped too, and a repeat
//! that lands further back than the inspected window passes through.

use crate::error::Result;
use crate::session::SessionStore;
use futures::{Stream, StreamExt};

/// Returns true when `fragment` should be discarded as a retransmission
///
/// Inspects the trailing `2 * len(fragment)` code points of `accumulated`
/// (the whole string when it is shorter) and reports whether `fragment`
/// occurs anywhere inside that window. Empty input never suppresses.
///
/// # Examples
///
/// ```
/// use parley::reconciler::should_suppress;
///
/// assert!(should_suppress("Hello", "lo"));
/// assert!(!should_suppress("Hel", "lo!"));
/// assert!(!should_suppress("", "Hi"));
/// ```
pub fn should_suppress(accumulated: &str, fragment: &str) -> bool {
    if fragment.is_empty() || accumulated.is_empty() {
        return false;
    }

    let window = fragment.chars().count() * 2;
    let total = accumulated.chars().count();
    let start = if total > window {
        accumulated
            .char_indices()
            .nth(total - window)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    } else {
        0
    };

    accumulated[start..].contains(fragment)
}

/// What happened to a single fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Appended to the placeholder content
    Appended,
    /// Discarded as a retransmission
    Suppressed,
    /// Empty fragment, ignored
    Empty,
    /// The target session or message no longer exists
    MissingTarget,
}

/// Counters for a fully consumed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Fragments appended to the message
    pub appended: usize,
    /// Fragments dropped by duplicate suppression
    pub suppressed: usize,
}

/// Folds fragments into one assistant message of one session
#[derive(Debug, Clone)]
pub struct Reconciler {
    session_id: String,
    message_id: String,
    summary: StreamSummary,
}

impl Reconciler {
    /// Creates a reconciler targeting an existing placeholder message
    pub fn new(session_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
            summary: StreamSummary::default(),
        }
    }

    /// Id of the message being grown
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Folds a single fragment into the store
    pub fn fold(&mut self, store: &mut SessionStore, fragment: &str) -> FragmentOutcome {
        let outcome = store.append_fragment(&self.session_id, &self.message_id, fragment);
        match outcome {
            FragmentOutcome::Appended => {
                self.summary.appended += 1;
                tracing::debug!(fragment = ?fragment, "Appended fragment");
            }
            FragmentOutcome::Suppressed => {
                self.summary.suppressed += 1;
                tracing::debug!(fragment = ?fragment, "Skipping duplicate fragment");
            }
            FragmentOutcome::Empty => {}
            FragmentOutcome::MissingTarget => {
                tracing::warn!(
                    session_id = %self.session_id,
                    message_id = %self.message_id,
                    "Dropping fragment: target message no longer exists"
                );
            }
        }
        outcome
    }

    /// Consumes the whole stream, folding each fragment as it arrives
    ///
    /// `on_fragment` is invoked after every fold so a front end can repaint.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream. Fragments folded before
    /// the error stay in the message. The store is flushed in both cases.
    pub async fn run<S, F>(
        mut self,
        store: &mut SessionStore,
        stream: S,
        mut on_fragment: F,
    ) -> Result<StreamSummary>
    where
        S: Stream<Item = Result<String>> + Unpin,
        F: FnMut(&str, FragmentOutcome),
    {
        let mut stream = stream;
        let consumed = loop {
            match stream.next().await {
                Some(Ok(fragment)) => {
                    let outcome = self.fold(store, &fragment);
                    on_fragment(&fragment, outcome);
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            }
        };

        // Fragment writes are buffered; make the reply durable once.
        store.flush();
        consumed?;

        tracing::debug!(
            appended = self.summary.appended,
            suppressed = self.summary.suppressed,
            "Stream finished"
        );
        Ok(self.summary)
    }
}
