//! Decides whether a request asks for a picture
//!
//! Substring mode reproduces the keyword behaviour the assistant has always
//! had, including its false positives ("withdraw" contains "draw"). Word mode
//! only matches trigger phrases on word boundaries.

use serde::{Deserialize, Serialize};

/// Phrases that signal a visual request
pub const IMAGE_TRIGGERS: &[&str] = &[
    "show me",
    "picture of",
    "image of",
    "photo of",
    "draw",
    "generate image",
    "generate an image",
    "create image",
    "create an image",
    "make an image",
    "illustrate",
    "sketch",
    "paint",
    "visualize",
];

/// How trigger phrases are matched against the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-insensitive substring containment
    #[default]
    Substring,
    /// Case-insensitive match on whole words
    Words,
}

/// Pure predicate over request text
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageIntentClassifier {
    mode: MatchMode,
}

impl ImageIntentClassifier {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Returns true if the text implies the user wants an image
    pub fn wants_image(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        match self.mode {
            MatchMode::Substring => IMAGE_TRIGGERS.iter().any(|t| lowered.contains(t)),
            MatchMode::Words => {
                let words = tokenize(&lowered);
                IMAGE_TRIGGERS.iter().any(|t| {
                    let phrase: Vec<&str> = t.split_whitespace().collect();
                    words.windows(phrase.len()).any(|w| w == phrase.as_slice())
                })
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_me_a_sunset() {
        let classifier = ImageIntentClassifier::default();
        assert!(classifier.wants_image("show me a sunset"));
        assert!(classifier.wants_image("Could you DRAW a dragon?"));
        assert!(classifier.wants_image("draw me a cat"));
    }

    #[test]
    fn test_plain_question() {
        let classifier = ImageIntentClassifier::default();
        assert!(!classifier.wants_image("what's 2+2"));
        assert!(!classifier.wants_image(""));
    }

    #[test]
    fn test_substring_mode_matches_inside_words() {
        let classifier = ImageIntentClassifier::new(MatchMode::Substring);
        assert!(classifier.wants_image("how do I withdraw money"));
    }

    #[test]
    fn test_word_mode_respects_boundaries() {
        let classifier = ImageIntentClassifier::new(MatchMode::Words);
        assert!(!classifier.wants_image("how do I withdraw money"));
        assert!(classifier.wants_image("please draw, quickly"));
        assert!(classifier.wants_image("Show me the moon"));
        assert!(!classifier.wants_image("the show meant a lot"));
    }

    #[test]
    fn test_mode_deserializes_lowercase() {
        let mode: MatchMode = serde_json::from_str("\"words\"").unwrap();
        assert_eq!(mode, MatchMode::Words);
    }
}
