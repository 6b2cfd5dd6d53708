//! Emotion signal detector: negative/positive affect words in free text.

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "depressed", "down", "upset", "angry", "frustrated", "stressed",
    "anxious", "worried", "scared", "afraid", "lonely", "alone", "isolated",
    "tired", "exhausted", "drained", "lost", "confused", "hopeless", "empty",
];

const POSITIVE_WORDS: &[&str] = &[
    "happy", "excited", "good", "great", "wonderful", "amazing", "fantastic",
    "joyful", "grateful", "thankful", "blessed", "lucky", "proud", "confident",
];

/// Affect flags for one message.
///
/// Only `has_positive` feeds the cascade (the `positive_emotion` rule).
/// `has_negative` is computed and logged but no rule reads it yet; the negative
/// categories (stress, sadness, loneliness) carry their own triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmotionSignal {
    pub has_negative: bool,
    pub has_positive: bool,
}

/// Case-insensitive substring scan against the two word sets.
pub fn detect(message: &str) -> EmotionSignal {
    let lower = message.to_lowercase();
    detect_lowered(&lower)
}

/// Same as [`detect`] for text that is already lower-cased.
pub(crate) fn detect_lowered(lower: &str) -> EmotionSignal {
    EmotionSignal {
        has_negative: NEGATIVE_WORDS.iter().any(|w| lower.contains(w)),
        has_positive: POSITIVE_WORDS.iter().any(|w| lower.contains(w)),
    }
}
