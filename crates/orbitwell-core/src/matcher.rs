//! Intent cascade matcher: walks the category table in priority order and stops at
//! the first category whose rule applies. Total (the fallback always applies) and
//! deterministic; no randomness is involved in choosing a category.

use crate::categories::{Category, CategoryTable, MatchRule};
use crate::emotion::EmotionSignal;

/// Outcome of one cascade pass.
#[derive(Debug, Clone)]
pub struct CascadeMatch<'a> {
    pub category: &'a Category,
    /// Looked-up fact (e.g. the planet named in the message). When present it
    /// replaces the random template pick.
    pub fact: Option<String>,
}

/// Cascade evaluator.
///
/// With `emergency_prepass` set, emergency-severity categories are tested before the
/// rest of the table so a crisis cue is never shadowed by an earlier emotional
/// category. Off by default: the table order is the priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeMatcher {
    emergency_prepass: bool,
}

impl CascadeMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emergency_prepass(emergency_prepass: bool) -> Self {
        Self { emergency_prepass }
    }

    pub fn emergency_prepass(&self) -> bool {
        self.emergency_prepass
    }

    /// First applicable category for `message`.
    pub fn match_category<'a>(
        &self,
        message: &str,
        table: &'a CategoryTable,
        emotion: EmotionSignal,
    ) -> &'a Category {
        let lowered = message.to_lowercase();
        self.match_lowered(&lowered, table, emotion)
    }

    /// Match plus the secondary fact lookup for categories that define one.
    pub fn classify<'a>(
        &self,
        message: &str,
        table: &'a CategoryTable,
        emotion: EmotionSignal,
    ) -> CascadeMatch<'a> {
        let lowered = message.to_lowercase();
        let category = self.match_lowered(&lowered, table, emotion);
        let fact = category.lookup.as_ref().and_then(|l| l.resolve(&lowered));
        CascadeMatch { category, fact }
    }

    fn match_lowered<'a>(
        &self,
        lowered: &str,
        table: &'a CategoryTable,
        emotion: EmotionSignal,
    ) -> &'a Category {
        if self.emergency_prepass {
            if let Some(c) = table
                .categories()
                .iter()
                .filter(|c| c.is_emergency())
                .find(|c| applies(c, lowered, emotion))
            {
                return c;
            }
        }
        table
            .categories()
            .iter()
            .find(|c| applies(c, lowered, emotion))
            .unwrap_or_else(|| table.fallback())
    }
}

/// Cascade with the table's own priority order.
pub fn match_category<'a>(message: &str, table: &'a CategoryTable, emotion: EmotionSignal) -> &'a Category {
    CascadeMatcher::new().match_category(message, table, emotion)
}

fn applies(category: &Category, lowered: &str, emotion: EmotionSignal) -> bool {
    match category.rule {
        MatchRule::Keywords => category.triggered_by(lowered),
        MatchRule::PositiveEmotion => emotion.has_positive,
        MatchRule::Fallback => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::detect;
    use crate::knowledge::KnowledgeBase;

    fn table() -> CategoryTable {
        CategoryTable::builtin(&KnowledgeBase::builtin().unwrap()).unwrap()
    }

    fn name_for(msg: &str) -> String {
        let t = table();
        match_category(msg, &t, detect(msg)).name.clone()
    }

    #[test]
    fn greeting_wins_over_stress() {
        assert_eq!(name_for("hi, I'm so stressed"), "greeting");
    }

    #[test]
    fn self_harm_reaches_emergency() {
        assert_eq!(name_for("I want to hurt myself"), "emergency");
    }

    #[test]
    fn loneliness_shadows_emergency_by_default() {
        assert_eq!(name_for("I feel so alone, I want to end it"), "loneliness");
    }

    #[test]
    fn prepass_lets_emergency_override() {
        let t = table();
        let msg = "I feel so alone, I want to end it";
        let m = CascadeMatcher::with_emergency_prepass(true).match_category(msg, &t, detect(msg));
        assert_eq!(m.name, "emergency");
    }

    #[test]
    fn multi_word_trigger_is_contiguous() {
        assert_eq!(name_for("Good Morning!"), "greeting");
        // "good" alone is only a positive-affect word
        assert_eq!(name_for("good cake"), "positive_emotion");
    }

    #[test]
    fn positive_emotion_sits_before_space_topics() {
        assert_eq!(name_for("I feel fantastic about rockets"), "positive_emotion");
        assert_eq!(name_for("tell me about rockets"), "rockets");
    }

    #[test]
    fn planet_lookup_selects_specific_fact() {
        let t = table();
        let m = CascadeMatcher::new().classify("tell me about mars", &t, detect("tell me about mars"));
        assert_eq!(m.category.name, "planets");
        let fact = m.fact.unwrap();
        assert!(fact.starts_with("🌟 Mars is the fourth planet"));
    }

    #[test]
    fn generic_planet_question_has_no_fact() {
        let t = table();
        let m = CascadeMatcher::new().classify("planet", &t, detect("planet"));
        assert_eq!(m.category.name, "planets");
        assert!(m.fact.is_none());
    }

    #[test]
    fn unmatched_text_falls_back() {
        assert_eq!(name_for("qwerty"), "fallback");
        assert_eq!(name_for(""), "fallback");
    }

    #[test]
    fn matching_is_pure() {
        let t = table();
        let msg = "I can't sleep and feel restless";
        let first = match_category(msg, &t, detect(msg)).name.clone();
        for _ in 0..20 {
            assert_eq!(match_category(msg, &t, detect(msg)).name, first);
        }
        assert_eq!(first, "sleep");
    }
}
