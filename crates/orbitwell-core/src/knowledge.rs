//! Knowledge base: read-only topic facts for the space categories and wellness tips.
//!
//! Embedded at build time from `data/knowledge_base.json`. The engine never mutates it;
//! the gateway serves it verbatim at `/api/knowledge-base`.

use crate::error::{CompanionError, CompanionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_KNOWLEDGE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/knowledge_base.json"));

/// One wellness tip (`{"content": "..."}` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellnessTopic {
    pub content: String,
}

/// Immutable mapping of topic key -> fact string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Space facts keyed by topic (e.g. `planet_mars`, `black_hole`).
    #[serde(default)]
    pub space_knowledge: BTreeMap<String, String>,
    /// Wellness tips keyed by topic (e.g. `stress_relief`).
    #[serde(default)]
    pub wellness_topics: BTreeMap<String, WellnessTopic>,
}

impl KnowledgeBase {
    /// The knowledge base shipped with the crate.
    pub fn builtin() -> CompanionResult<Self> {
        Self::from_json(BUILTIN_KNOWLEDGE)
    }

    /// Parse a knowledge base document. Empty fact strings are rejected.
    pub fn from_json(raw: &str) -> CompanionResult<Self> {
        let kb: KnowledgeBase = serde_json::from_str(raw)?;
        if let Some((key, _)) = kb.space_knowledge.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CompanionError::Knowledge(format!("space fact '{}' is empty", key)));
        }
        if let Some((key, _)) = kb.wellness_topics.iter().find(|(_, v)| v.content.trim().is_empty()) {
            return Err(CompanionError::Knowledge(format!("wellness topic '{}' is empty", key)));
        }
        Ok(kb)
    }

    /// Space fact for a topic key.
    pub fn fact(&self, key: &str) -> Option<&str> {
        self.space_knowledge.get(key).map(String::as_str)
    }

    pub fn wellness_tip(&self, key: &str) -> Option<&str> {
        self.wellness_topics.get(key).map(|t| t.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_all_planets() {
        let kb = KnowledgeBase::builtin().unwrap();
        for planet in ["mercury", "venus", "earth", "mars", "jupiter", "saturn", "uranus", "neptune"] {
            let fact = kb.fact(&format!("planet_{}", planet)).unwrap();
            assert!(!fact.is_empty());
        }
        assert!(kb.fact("black_hole").unwrap().contains("spacetime"));
        assert!(kb.wellness_tip("stress_relief").unwrap().contains("breathing"));
    }

    #[test]
    fn empty_fact_rejected() {
        let raw = r#"{"space_knowledge": {"planet_mars": "  "}}"#;
        let err = KnowledgeBase::from_json(raw).unwrap_err();
        assert!(matches!(err, CompanionError::Knowledge(_)));
    }

    #[test]
    fn serializes_with_wire_shape() {
        let kb = KnowledgeBase::builtin().unwrap();
        let json = serde_json::to_value(&kb).unwrap();
        assert!(json["space_knowledge"]["planet_mars"].is_string());
        assert!(json["wellness_topics"]["sleep_improvement"]["content"].is_string());
    }
}
