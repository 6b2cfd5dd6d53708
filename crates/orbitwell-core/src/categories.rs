//! Category table: the ordered, declarative intent cascade.
//!
//! Each record carries its triggers, response templates, suggested actions and severity.
//! Table order is priority order. The built-in table lives in `data/categories.toml`;
//! a deployment can point `category_table_path` at its own file with the same shape.
//! Everything is validated once at load so request handling never meets an empty pool.

use crate::error::{CompanionError, CompanionResult};
use crate::knowledge::KnowledgeBase;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATEGORIES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/categories.toml"));

/// Name of the terminal category every table must end with.
pub const FALLBACK_CATEGORY: &str = "fallback";

/// Severity tag carried into the reply `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Emergency,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Emergency => "emergency",
        }
    }
}

/// How a category decides it applies to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Any trigger phrase is a contiguous substring of the lower-cased message.
    #[default]
    Keywords,
    /// Applies when the emotion detector saw a positive-affect word.
    PositiveEmotion,
    /// Always applies; must be the last record.
    Fallback,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    closings: Vec<String>,
    #[serde(default)]
    category: Vec<CategoryRecord>,
}

#[derive(Debug, Deserialize)]
struct CategoryRecord {
    name: String,
    #[serde(default)]
    rule: MatchRule,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default)]
    templates: Vec<String>,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    lookup: Option<LookupRecord>,
}

#[derive(Debug, Deserialize)]
struct LookupRecord {
    #[serde(default)]
    prefix: String,
    topics: Vec<LookupTopic>,
}

#[derive(Debug, Deserialize)]
struct LookupTopic {
    needle: String,
    fact: String,
}

/// Secondary keyed lookup resolved against the knowledge base at load time.
/// The first needle (in table order) found in the message selects its fact.
#[derive(Debug, Clone)]
pub struct FactLookup {
    prefix: String,
    entries: Vec<(String, String)>,
}

impl FactLookup {
    /// Rendered fact for the first needle contained in `lowered`, if any.
    pub fn resolve(&self, lowered: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(needle, _)| lowered.contains(needle.as_str()))
            .map(|(_, fact)| format!("{}{}", self.prefix, fact))
    }

    pub fn needles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// A named intent bucket. Immutable after load.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    /// Position in the table (0 = highest priority).
    pub priority: usize,
    pub rule: MatchRule,
    /// Lower-cased trigger phrases.
    pub triggers: Vec<String>,
    pub templates: Vec<String>,
    pub actions: Vec<String>,
    pub severity: Severity,
    pub lookup: Option<FactLookup>,
}

impl Category {
    #[inline]
    pub fn is_emergency(&self) -> bool {
        matches!(self.severity, Severity::Emergency)
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self.rule, MatchRule::Fallback)
    }

    /// True when any trigger phrase occurs in the already lower-cased message.
    pub fn triggered_by(&self, lowered: &str) -> bool {
        self.triggers.iter().any(|t| lowered.contains(t.as_str()))
    }
}

/// Ordered category table plus the closing phrases shared by every reply.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
    closings: Vec<String>,
}

impl CategoryTable {
    /// The table shipped with the crate.
    pub fn builtin(knowledge: &KnowledgeBase) -> CompanionResult<Self> {
        Self::from_toml(BUILTIN_CATEGORIES, knowledge)
    }

    /// Load a table file from disk (same shape as the built-in one).
    pub fn from_path(path: impl AsRef<Path>, knowledge: &KnowledgeBase) -> CompanionResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_toml(&raw, knowledge)?;
        tracing::info!(
            path = %path.as_ref().display(),
            categories = table.len(),
            "Loaded category table from file"
        );
        Ok(table)
    }

    /// Parse and validate a TOML table.
    pub fn from_toml(raw: &str, knowledge: &KnowledgeBase) -> CompanionResult<Self> {
        let file: TableFile = toml::from_str(raw)?;
        Self::validate(file, knowledge)
    }

    fn validate(file: TableFile, knowledge: &KnowledgeBase) -> CompanionResult<Self> {
        if file.category.is_empty() {
            return Err(table_err("table has no categories"));
        }
        if file.closings.iter().any(|c| c.trim().is_empty()) {
            return Err(table_err("closing phrases must not be empty"));
        }

        let last = file.category.len() - 1;
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(file.category.len());

        for (priority, rec) in file.category.into_iter().enumerate() {
            let name = rec.name.trim().to_string();
            if name.is_empty() {
                return Err(table_err(format!("category #{} has no name", priority)));
            }
            if !seen.insert(name.clone()) {
                return Err(table_err(format!("duplicate category '{}'", name)));
            }
            if rec.templates.is_empty() || rec.templates.iter().any(|t| t.trim().is_empty()) {
                return Err(table_err(format!("category '{}' needs a non-empty template pool", name)));
            }
            match rec.rule {
                MatchRule::Keywords => {
                    if rec.triggers.is_empty() || rec.triggers.iter().any(|t| t.trim().is_empty()) {
                        return Err(table_err(format!("keyword category '{}' needs triggers", name)));
                    }
                }
                MatchRule::PositiveEmotion | MatchRule::Fallback => {
                    if !rec.triggers.is_empty() {
                        return Err(table_err(format!(
                            "category '{}' uses rule {:?}, which ignores triggers",
                            name, rec.rule
                        )));
                    }
                }
            }
            if rec.rule == MatchRule::Fallback && priority != last {
                return Err(table_err(format!("fallback '{}' must be the last category", name)));
            }
            if rec.rule != MatchRule::Fallback && priority == last {
                return Err(table_err("the last category must use the fallback rule"));
            }
            if rec.severity == Severity::Emergency && rec.actions.is_empty() {
                return Err(table_err(format!("emergency category '{}' needs crisis actions", name)));
            }

            let lookup = match rec.lookup {
                None => None,
                Some(l) => {
                    if rec.rule != MatchRule::Keywords {
                        return Err(table_err(format!("lookup on '{}' requires the keywords rule", name)));
                    }
                    let mut entries = Vec::with_capacity(l.topics.len());
                    for topic in l.topics {
                        let needle = topic.needle.trim().to_lowercase();
                        if needle.is_empty() {
                            return Err(table_err(format!("lookup on '{}' has an empty needle", name)));
                        }
                        let fact = knowledge.fact(&topic.fact).ok_or_else(|| {
                            table_err(format!("lookup on '{}' references unknown fact '{}'", name, topic.fact))
                        })?;
                        entries.push((needle, fact.to_string()));
                    }
                    Some(FactLookup { prefix: l.prefix, entries })
                }
            };

            categories.push(Category {
                name,
                priority,
                rule: rec.rule,
                triggers: rec.triggers.iter().map(|t| t.to_lowercase()).collect(),
                templates: rec.templates,
                actions: rec.actions,
                severity: rec.severity,
                lookup,
            });
        }

        Ok(Self {
            categories,
            closings: file.closings,
        })
    }

    /// Categories in priority order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn closings(&self) -> &[String] {
        &self.closings
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// The terminal category. Validation guarantees it exists.
    pub fn fallback(&self) -> &Category {
        &self.categories[self.categories.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn table_err(msg: impl Into<String>) -> CompanionError {
    CompanionError::CategoryTable(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::builtin().unwrap()
    }

    #[test]
    fn builtin_table_order() {
        let table = CategoryTable::builtin(&kb()).unwrap();
        let names: Vec<&str> = table.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "greeting", "stress", "sadness", "loneliness", "motivation", "low_energy", "sleep",
                "positive_emotion", "planets", "black_hole", "astronauts", "galaxy", "rockets",
                "relaxation", "gratitude", "emergency", "oxygen", "wellness", "fallback",
            ]
        );
        for (i, c) in table.categories().iter().enumerate() {
            assert_eq!(c.priority, i);
        }
        assert_eq!(table.fallback().name, FALLBACK_CATEGORY);
        assert_eq!(table.closings().len(), 6);
    }

    #[test]
    fn builtin_emergency_has_crisis_actions() {
        let table = CategoryTable::builtin(&kb()).unwrap();
        let emergency = table.get("emergency").unwrap();
        assert!(emergency.is_emergency());
        assert_eq!(emergency.actions.len(), 4);
        assert!(table.categories().iter().filter(|c| c.is_emergency()).count() == 1);
    }

    #[test]
    fn planets_lookup_resolves_in_order() {
        let table = CategoryTable::builtin(&kb()).unwrap();
        let lookup = table.get("planets").unwrap().lookup.as_ref().unwrap();
        let needles: Vec<&str> = lookup.needles().collect();
        assert_eq!(needles[0], "mercury");
        assert_eq!(needles[7], "neptune");
        // venus precedes mars in lookup order regardless of message order
        let fact = lookup.resolve("mars or venus?").unwrap();
        assert!(fact.starts_with("🌟 Venus"));
        assert!(lookup.resolve("which planet is best").is_none());
    }

    #[test]
    fn empty_template_pool_rejected() {
        let raw = r#"
[[category]]
name = "greeting"
triggers = ["hello"]
templates = []

[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]
"#;
        let err = CategoryTable::from_toml(raw, &kb()).unwrap_err();
        assert!(err.to_string().contains("template pool"));
    }

    #[test]
    fn fallback_must_be_last() {
        let raw = r#"
[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]

[[category]]
name = "greeting"
triggers = ["hello"]
templates = ["hi"]
"#;
        assert!(CategoryTable::from_toml(raw, &kb()).is_err());
    }

    #[test]
    fn emergency_without_actions_rejected() {
        let raw = r#"
[[category]]
name = "emergency"
severity = "emergency"
triggers = ["help"]
templates = ["call someone"]

[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]
"#;
        let err = CategoryTable::from_toml(raw, &kb()).unwrap_err();
        assert!(err.to_string().contains("crisis actions"));
    }

    #[test]
    fn unknown_fact_key_rejected() {
        let raw = r#"
[[category]]
name = "planets"
triggers = ["planet"]
templates = ["which one?"]

[category.lookup]
topics = [{ needle = "pluto", fact = "planet_pluto" }]

[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]
"#;
        let err = CategoryTable::from_toml(raw, &kb()).unwrap_err();
        assert!(err.to_string().contains("planet_pluto"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let raw = r#"
[[category]]
name = "greeting"
triggers = ["hello"]
templates = ["hi"]

[[category]]
name = "greeting"
triggers = ["hey"]
templates = ["hi"]

[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]
"#;
        assert!(CategoryTable::from_toml(raw, &kb()).is_err());
    }

    #[test]
    fn triggers_are_lowercased() {
        let raw = r#"
[[category]]
name = "greeting"
triggers = ["Good Morning"]
templates = ["hi"]

[[category]]
name = "fallback"
rule = "fallback"
templates = ["hm"]
"#;
        let table = CategoryTable::from_toml(raw, &kb()).unwrap();
        assert!(table.categories()[0].triggered_by("well, good morning!"));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.toml");
        std::fs::write(
            &path,
            "[[category]]\nname = \"fallback\"\nrule = \"fallback\"\ntemplates = [\"hm\"]\n",
        )
        .unwrap();
        let table = CategoryTable::from_path(&path, &kb()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.fallback().is_fallback());
    }
}
