//! Response synthesizer: template pick, optional closing line, payload assembly.
//!
//! All randomness goes through [`RandomSource`] so callers decide between the
//! thread-local generator and a seeded or scripted one.

use crate::categories::{Category, Severity};
use crate::matcher::CascadeMatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Default chance of appending a closing phrase.
pub const DEFAULT_CLOSING_PROBABILITY: f64 = 0.7;

/// Source of the synthesizer's random draws.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. Callers never pass `len == 0`.
    fn index(&self, len: usize) -> usize;
    /// Uniform value in `[0, 1)`.
    fn unit(&self) -> f64;
}

/// Thread-local generator; no shared state between request threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible generator for replays and tests.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..len)
    }

    fn unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>()
    }
}

/// Reply returned to the HTTP layer as `{response, type, protocol}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    #[serde(rename = "response")]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: Severity,
    /// Suggested follow-up actions; empty for most categories.
    pub protocol: Vec<String>,
}

impl ResponsePayload {
    pub fn is_emergency(&self) -> bool {
        self.kind == Severity::Emergency
    }
}

/// Builds replies for matched categories.
#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    closings: Vec<String>,
    closing_probability: f64,
}

impl ResponseSynthesizer {
    pub fn new(closings: Vec<String>, closing_probability: f64) -> Self {
        Self {
            closings,
            closing_probability: closing_probability.clamp(0.0, 1.0),
        }
    }

    pub fn closing_probability(&self) -> f64 {
        self.closing_probability
    }

    /// Reply for a cascade match. A looked-up fact replaces the template draw.
    pub fn synthesize(&self, matched: &CascadeMatch<'_>, rng: &dyn RandomSource) -> ResponsePayload {
        self.build(matched.category, matched.fact.as_deref(), rng)
    }

    /// Reply for a bare category (no secondary lookup).
    pub fn synthesize_category(&self, category: &Category, rng: &dyn RandomSource) -> ResponsePayload {
        self.build(category, None, rng)
    }

    fn build(&self, category: &Category, fact: Option<&str>, rng: &dyn RandomSource) -> ResponsePayload {
        let mut text = match fact {
            Some(f) => f.to_string(),
            None => category.templates[rng.index(category.templates.len())].clone(),
        };
        if !self.closings.is_empty() && rng.unit() < self.closing_probability {
            text.push_str(&self.closings[rng.index(self.closings.len())]);
        }
        ResponsePayload {
            text,
            kind: category.severity,
            protocol: category.actions.clone(),
        }
    }
}
