//! Dataset chat session: upload, ready, query, answer.
//!
//! [`ChatState`] holds the synchronous transitions and invariants. Each
//! asynchronous operation is split into a `begin_*` call that hands out a
//! ticket stamped with the current session epoch and a `complete_*` call that
//! applies the service result only if the epoch still matches. [`ChatSession`]
//! drives both halves around the single transport await.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::config::{ApiConfig, AppConfig};
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::transport::{RequestBody, Transport, TransportError, TransportRequest};
use crate::types::{ConversationTurn, DatasetFile, Phase, SessionStatus};

/// The dataset currently bound to the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSession {
    status: SessionStatus,
    dataset_name: Option<String>,
}

impl DatasetSession {
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Present exactly when the status is `Ready`.
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset_name.as_deref()
    }
}

/// Append-only conversation log plus the single-flight flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
    pending: bool,
}

impl ConversationState {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }
}

/// Identifies the session a request was issued in. Bumped on every reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

/// Issued by [`ChatState::begin_upload`]; redeemed by [`ChatState::complete_upload`].
#[derive(Debug)]
pub struct UploadTicket {
    epoch: Epoch,
    dataset_name: String,
}

/// Issued by [`ChatState::begin_query`]; redeemed by [`ChatState::complete_query`].
#[derive(Debug)]
pub struct QueryTicket {
    epoch: Epoch,
    question: String,
}

impl QueryTicket {
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Whether a completion was applied or dropped because the session was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// Agent turn appended once a dataset is ready.
pub fn upload_acknowledgement(dataset_name: &str) -> String {
    format!(
        "Dataset \"{}\" analyzed successfully. How can I assist your research today?",
        dataset_name
    )
}

/// Session state and its transitions. Owned by exactly one [`ChatSession`].
#[derive(Debug, Clone)]
pub struct ChatState {
    epoch: Epoch,
    dataset: DatasetSession,
    conversation: ConversationState,
    fallback_message: String,
}

impl ChatState {
    pub fn new(fallback_message: impl Into<String>) -> Self {
        Self {
            epoch: Epoch::default(),
            dataset: DatasetSession::default(),
            conversation: ConversationState::default(),
            fallback_message: fallback_message.into(),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn dataset(&self) -> &DatasetSession {
        &self.dataset
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn status(&self) -> SessionStatus {
        self.dataset.status
    }

    pub fn phase(&self) -> Phase {
        match self.dataset.status {
            SessionStatus::Empty => Phase::Empty,
            SessionStatus::Uploading => Phase::Uploading,
            SessionStatus::Ready if self.conversation.pending => Phase::Querying,
            SessionStatus::Ready => Phase::Ready,
            SessionStatus::Error => Phase::Error,
        }
    }

    /// `Empty | Error → Uploading`.
    pub fn begin_upload(&mut self, dataset_name: &str) -> Result<UploadTicket, ClientError> {
        match self.dataset.status {
            SessionStatus::Empty | SessionStatus::Error => {}
            other => {
                return Err(ClientError::InvalidTransition {
                    action: "upload a dataset",
                    state: format!("{:?}", other),
                })
            }
        }
        debug!("Session {:?}: uploading {}", self.epoch, dataset_name);
        self.dataset.status = SessionStatus::Uploading;
        self.dataset.dataset_name = None;
        Ok(UploadTicket {
            epoch: self.epoch,
            dataset_name: dataset_name.to_string(),
        })
    }

    /// `Uploading → Ready` on success, `Uploading → Error` on failure.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: &Result<(), TransportError>,
    ) -> Completion {
        if ticket.epoch != self.epoch {
            debug!(
                "Dropping upload result for {} from stale session {:?}",
                ticket.dataset_name, ticket.epoch
            );
            return Completion::Stale;
        }
        match result {
            Ok(()) => {
                self.dataset.status = SessionStatus::Ready;
                self.conversation
                    .push(ConversationTurn::agent(upload_acknowledgement(&ticket.dataset_name)));
                self.dataset.dataset_name = Some(ticket.dataset_name);
            }
            Err(_) => {
                self.dataset.status = SessionStatus::Error;
                self.dataset.dataset_name = None;
            }
        }
        Completion::Applied
    }

    /// Append the user turn and mark a reply outstanding. `None` when the
    /// question is blank, a reply is already pending, or no dataset is ready.
    pub fn begin_query(&mut self, text: &str) -> Option<QueryTicket> {
        if text.trim().is_empty() {
            return None;
        }
        if self.conversation.pending {
            debug!("Query rejected: a reply is already pending");
            return None;
        }
        if self.dataset.status != SessionStatus::Ready {
            debug!("Query rejected: no dataset ready ({:?})", self.dataset.status);
            return None;
        }
        self.conversation.push(ConversationTurn::user(text));
        self.conversation.pending = true;
        Some(QueryTicket {
            epoch: self.epoch,
            question: text.to_string(),
        })
    }

    /// Append the agent turn (answer or fallback) and clear the pending flag.
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        result: &Result<String, TransportError>,
    ) -> Completion {
        if ticket.epoch != self.epoch {
            debug!("Dropping answer from stale session {:?}", ticket.epoch);
            return Completion::Stale;
        }
        let content = match result {
            Ok(answer) => answer.clone(),
            Err(_) => self.fallback_message.clone(),
        };
        self.conversation.push(ConversationTurn::agent(content));
        self.conversation.pending = false;
        Completion::Applied
    }

    /// Forget the dataset and the conversation. In-flight requests keep
    /// running but their results no longer match the epoch.
    pub fn reset(&mut self) {
        self.epoch = self.epoch.next();
        self.dataset = DatasetSession::default();
        self.conversation = ConversationState::default();
        debug!("Session reset, now {:?}", self.epoch);
    }
}

/// Read-only view handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnapshot {
    pub epoch: Epoch,
    pub status: SessionStatus,
    pub phase: Phase,
    pub dataset_name: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Ready,
    /// The session was reset while the upload was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Blank input, reply already pending, or no dataset; nothing was sent.
    Rejected,
    Answered,
    /// The fallback turn was appended and an error notification raised.
    Failed(TransportError),
    /// The session was reset while the query was in flight.
    Discarded,
}

impl QueryOutcome {
    /// The failure behind a `Failed` outcome.
    pub fn into_error(self) -> Option<ClientError> {
        match self {
            QueryOutcome::Failed(e) => Some(ClientError::QueryFailure(e)),
            _ => None,
        }
    }
}

/// Chat flow driver. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct ChatSession {
    state: Arc<Mutex<ChatState>>,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    notifier: Arc<dyn Notifier>,
    api: ApiConfig,
}

impl ChatSession {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChatState::new(config.chat.fallback_message.clone()))),
            transport,
            tokens,
            notifier,
            api: config.api.clone(),
        }
    }

    // Never held across an await.
    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.state();
        ChatSnapshot {
            epoch: state.epoch,
            status: state.dataset.status,
            phase: state.phase(),
            dataset_name: state.dataset.dataset_name.clone(),
            turns: state.conversation.turns.clone(),
            pending: state.conversation.pending,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state().phase()
    }

    /// Upload a dataset and bind the conversation to it.
    pub async fn begin_upload(&self, file: DatasetFile) -> Result<UploadOutcome, ClientError> {
        let ticket = self.state().begin_upload(&file.name)?;
        let name = file.name.clone();
        info!("Uploading dataset {} ({} bytes)", name, file.bytes.len());

        let request = TransportRequest::post(
            self.api.upload_path.clone(),
            RequestBody::csv(file.name, file.bytes),
        )
        .with_token(self.tokens.token());
        let result = self.transport.send(request).await.map(|_| ());

        let completion = self.state().complete_upload(ticket, &result);
        match (completion, result) {
            (Completion::Stale, _) => {
                debug!("Upload of {} finished after reset; discarded", name);
                Ok(UploadOutcome::Discarded)
            }
            (Completion::Applied, Ok(())) => {
                info!("Dataset {} ready", name);
                self.notifier.notify_success(&format!("Dataset \"{}\" is ready", name));
                Ok(UploadOutcome::Ready)
            }
            (Completion::Applied, Err(e)) => {
                warn!("Upload of {} failed: {}", name, e);
                self.notifier.notify_error(&format!("Upload failed: {}", e.message));
                Err(ClientError::UploadFailure(e))
            }
        }
    }

    /// Ask a question about the ready dataset.
    pub async fn submit_query(&self, text: &str) -> QueryOutcome {
        let ticket = match self.state().begin_query(text) {
            Some(ticket) => ticket,
            None => return QueryOutcome::Rejected,
        };

        let request = TransportRequest::post(self.api.chat_path.clone(), RequestBody::Empty)
            .with_query("question", ticket.question())
            .with_token(self.tokens.token());
        let result = self
            .transport
            .send(request)
            .await
            .and_then(|payload| extract_answer(&payload));

        let completion = self.state().complete_query(ticket, &result);
        match (completion, result) {
            (Completion::Stale, _) => QueryOutcome::Discarded,
            (Completion::Applied, Ok(_)) => QueryOutcome::Answered,
            (Completion::Applied, Err(e)) => {
                warn!("Query failed: {}", e);
                self.notifier.notify_error(&format!("Query failed: {}", e.message));
                QueryOutcome::Failed(e)
            }
        }
    }

    /// Start over: no dataset, no turns.
    pub fn reset_session(&self) {
        self.state().reset();
        info!("Chat session reset");
    }
}

/// `{"answer": "..."}` on success. The service also answers 200 with
/// `{"error": "..."}` when no dataset is bound; that is a failure too.
fn extract_answer(payload: &Value) -> Result<String, TransportError> {
    if let Some(answer) = payload.get("answer").and_then(Value::as_str) {
        return Ok(answer.to_string());
    }
    let message = payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Response did not contain an answer");
    Err(TransportError::new(Some(200), message))
}
