//! Conversation orchestrator: the public entry point of the engine.
//!
//! Per request: trim, record the user turn, detect emotion, run the cascade,
//! synthesize, record the assistant turn. The session lock is held for the whole
//! exchange so the two appends of one request stay adjacent.

use crate::categories::CategoryTable;
use crate::config::{CompanionConfig, EmptyMessagePolicy};
use crate::emotion::{self, EmotionSignal};
use crate::error::{CompanionError, CompanionResult};
use crate::knowledge::KnowledgeBase;
use crate::matcher::CascadeMatcher;
use crate::session::{lock_session, InMemorySessionStore, SessionStore, Turn, MAX_TURNS};
use crate::synthesizer::{RandomSource, ResponsePayload, ResponseSynthesizer, ThreadRandom};
use std::sync::Arc;

/// Session id used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Reply plus the classification details behind it.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub payload: ResponsePayload,
    pub category: String,
    pub emotion: EmotionSignal,
    /// Turns visible to this request, oldest first, ending with the user turn.
    /// Read for every request; classification does not consult it yet.
    pub context: Vec<Turn>,
}

pub struct ConversationOrchestrator {
    table: Arc<CategoryTable>,
    sessions: Arc<dyn SessionStore>,
    rng: Arc<dyn RandomSource>,
    matcher: CascadeMatcher,
    synthesizer: ResponseSynthesizer,
    empty_policy: EmptyMessagePolicy,
    context_window: usize,
}

impl ConversationOrchestrator {
    /// Orchestrator with default knobs: table priority order, 0.7 closing chance,
    /// blank input answered from the fallback pool.
    pub fn new(table: Arc<CategoryTable>, sessions: Arc<dyn SessionStore>, rng: Arc<dyn RandomSource>) -> Self {
        let synthesizer = ResponseSynthesizer::new(
            table.closings().to_vec(),
            crate::synthesizer::DEFAULT_CLOSING_PROBABILITY,
        );
        Self {
            table,
            sessions,
            rng,
            matcher: CascadeMatcher::new(),
            synthesizer,
            empty_policy: EmptyMessagePolicy::default(),
            context_window: MAX_TURNS,
        }
    }

    /// Wire everything from configuration: knowledge base, table (built-in or file),
    /// session store with the configured eviction policy, thread-local randomness.
    pub fn from_config(config: &CompanionConfig, knowledge: &KnowledgeBase) -> CompanionResult<Self> {
        let table = match config.category_table_path.as_deref() {
            Some(path) => CategoryTable::from_path(path, knowledge)?,
            None => CategoryTable::builtin(knowledge)?,
        };
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_boxed_policy(config.eviction_policy()));
        Ok(Self::new(Arc::new(table), sessions, Arc::new(ThreadRandom)).with_config(config))
    }

    /// Apply the tunable knobs from configuration.
    pub fn with_config(mut self, config: &CompanionConfig) -> Self {
        self.matcher = CascadeMatcher::with_emergency_prepass(config.emergency_prepass);
        self.synthesizer = ResponseSynthesizer::new(self.table.closings().to_vec(), config.closing_probability);
        self.empty_policy = config.empty_message_policy;
        self.context_window = config.context_window.min(MAX_TURNS);
        self
    }

    pub fn with_empty_policy(mut self, policy: EmptyMessagePolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    pub fn with_emergency_prepass(mut self, enabled: bool) -> Self {
        self.matcher = CascadeMatcher::with_emergency_prepass(enabled);
        self
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Handle one message and return the reply payload.
    pub fn handle(&self, message: &str, session_id: &str) -> CompanionResult<ResponsePayload> {
        self.handle_detailed(message, session_id).map(|o| o.payload)
    }

    /// Same as [`handle`](Self::handle), keeping the classification details.
    pub fn handle_detailed(&self, message: &str, session_id: &str) -> CompanionResult<ExchangeOutcome> {
        let message = message.trim();
        if message.is_empty() && self.empty_policy == EmptyMessagePolicy::Reject {
            tracing::warn!(session_id, "Rejected empty message");
            return Err(CompanionError::InvalidInput("message is empty".to_string()));
        }

        let slot = self.sessions.session(session_id);
        let mut session = lock_session(&slot);
        session.push(Turn::user(message));
        let context = session.recent(self.context_window).to_vec();

        let emotion = emotion::detect(message);
        let matched = self.matcher.classify(message, &self.table, emotion);
        let payload = self.synthesizer.synthesize(&matched, self.rng.as_ref());

        session.push(Turn::assistant(payload.text.clone()));
        drop(session);

        tracing::debug!(
            session_id,
            has_negative = emotion.has_negative,
            has_positive = emotion.has_positive,
            "Emotion signals"
        );
        tracing::info!(
            session_id,
            category = %matched.category.name,
            kind = payload.kind.as_str(),
            actions = payload.protocol.len(),
            "Companion reply"
        );
        if payload.is_emergency() {
            tracing::warn!(session_id, "Emergency category selected; crisis protocol attached");
        }

        Ok(ExchangeOutcome {
            category: matched.category.name.clone(),
            payload,
            emotion,
            context,
        })
    }
}
