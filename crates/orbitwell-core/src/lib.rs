//! Orbitwell core library.
//! Rule-based companion engine: emotion signals, intent cascade, response synthesis,
//! and bounded per-session conversation memory.

pub mod categories;
pub mod config;
pub mod emotion;
pub mod error;
pub mod knowledge;
pub mod matcher;
pub mod orchestrator;
pub mod session;
pub mod synthesizer;

pub use categories::{Category, CategoryTable, FactLookup, MatchRule, Severity, FALLBACK_CATEGORY};
pub use config::{CompanionConfig, EmptyMessagePolicy};
pub use emotion::{detect, EmotionSignal};
pub use error::{CompanionError, CompanionResult};
pub use knowledge::{KnowledgeBase, WellnessTopic};
pub use matcher::{match_category, CascadeMatch, CascadeMatcher};
pub use orchestrator::{ConversationOrchestrator, ExchangeOutcome, DEFAULT_SESSION_ID};
pub use session::{
    EvictionPolicy, InMemorySessionStore, LruPolicy, Role, SessionContext, SessionStore, SessionUsage, Turn,
    Unbounded, MAX_TURNS,
};
pub use synthesizer::{
    RandomSource, ResponsePayload, ResponseSynthesizer, SeededRandom, ThreadRandom, DEFAULT_CLOSING_PROBABILITY,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
