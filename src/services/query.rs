use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::conversation::{ConversationEntry, EntryKind};
use crate::services::BackendServiceTrait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank question, nothing happened
    Empty,
    /// Another question is still in flight, nothing happened
    Busy,
    Answered,
    Failed(String),
}

#[derive(Debug, Default)]
struct QueryState {
    transcript: Vec<ConversationEntry>,
    error: Option<String>,
    draft: String,
}

/// Releases the single-flight flag when the exchange settles, success or not.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Conversation with the backend's question answering endpoint.
///
/// The transcript is append-only and lives as long as the session, so it
/// survives view switches. Each question is sent on its own, without earlier
/// turns. At most one question is in flight; the session enforces that
/// itself rather than trusting callers to check `is_loading`.
pub struct QuerySession<B: BackendServiceTrait> {
    id: Uuid,
    backend: Arc<B>,
    state: Arc<Mutex<QueryState>>,
    in_flight: Arc<AtomicBool>,
}

impl<B: BackendServiceTrait> Clone for QuerySession<B> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            backend: self.backend.clone(),
            state: self.state.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<B: BackendServiceTrait> QuerySession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let id = Uuid::new_v4();
        info!("💬 Query session {} started", id);
        Self {
            id,
            backend,
            state: Arc::new(Mutex::new(QueryState::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn transcript(&self) -> Vec<ConversationEntry> {
        self.state().transcript.clone()
    }

    pub fn len(&self) -> usize {
        self.state().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last failure, as recorded
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Failure to show as a banner. Suppressed when the transcript's last
    /// error entry carries the same text. A failed question always appends
    /// that entry and the next submit clears the error, so query failures
    /// only ever show inline and this stays `None` for them.
    pub fn banner(&self) -> Option<String> {
        let state = self.state();
        let error = state.error.as_ref()?;
        let last_error = state
            .transcript
            .iter()
            .rev()
            .find(|entry| entry.kind == EntryKind::Error);
        match last_error {
            Some(entry) if entry.text == *error => None,
            _ => Some(error.clone()),
        }
    }

    pub fn draft(&self) -> String {
        self.state().draft.clone()
    }

    pub fn set_draft(&self, text: &str) {
        self.state().draft = text.to_string();
    }

    /// Submit whatever is staged in the draft.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.draft();
        self.submit(&draft).await
    }

    pub async fn submit(&self, question: &str) -> SubmitOutcome {
        let question = question.trim();
        if question.is_empty() {
            debug!("Ignoring blank question");
            return SubmitOutcome::Empty;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(
                "[Session-{}] Question rejected, another one is still being answered",
                self.id
            );
            return SubmitOutcome::Busy;
        }
        let _in_flight = InFlight(&self.in_flight);

        {
            let mut state = self.state();
            state.transcript.push(ConversationEntry::question(question));
            state.draft.clear();
            state.error = None;
        }

        info!("💬 [Session-{}] Asking: {}", self.id, question);
        match self.backend.ask(question).await {
            Ok(answer) => {
                info!(
                    "✅ [Session-{}] Answer received ({} chars)",
                    self.id,
                    answer.len()
                );
                self.state().transcript.push(ConversationEntry::answer(answer));
                SubmitOutcome::Answered
            }
            Err(e) => {
                error!("❌ [Session-{}] Query failed: {}", self.id, e);
                let mut state = self.state();
                state.transcript.push(ConversationEntry::error(e.message.clone()));
                state.error = Some(e.message.clone());
                SubmitOutcome::Failed(e.message)
            }
        }
    }
}
