//! Intent classification and conversation context.

pub mod context;

pub use context::{ContextWindow, Speaker, Turn};

use std::collections::HashMap;

/// A classified intent with extracted entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    /// Intent name, e.g. "greeting".
    pub name: String,
    /// Classifier confidence in [0.0, 1.0].
    pub confidence: f32,
    /// Extracted entities keyed by entity name.
    pub entities: HashMap<String, String>,
}

impl Intent {
    /// The catch-all intent used when nothing matches.
    pub fn unknown() -> Self {
        Self {
            name: "unknown".to_string(),
            confidence: 0.0,
            entities: HashMap::new(),
        }
    }
}

/// Trait for intent classification.
pub trait IntentClassifier: Send + Sync {
    /// Classify trimmed, non-empty text.
    fn classify(&self, text: &str) -> Intent;
}

/// One rule of the keyword classifier.
struct IntentRule {
    name: &'static str,
    phrases: &'static [&'static str],
}

/// Keyword phrases whose presence names a conversation scenario entity.
const SCENARIO_KEYWORDS: &[&str] = &["restaurant", "interview", "shopping", "travel", "hotel"];

const RULES: &[IntentRule] = &[
    IntentRule {
        name: "greeting",
        phrases: &["hello", "hi ", "hey", "good morning", "good afternoon", "good evening"],
    },
    IntentRule {
        name: "goodbye",
        phrases: &["goodbye", "bye", "see you", "take care", "talk to you later"],
    },
    IntentRule {
        name: "how_are_you",
        phrases: &["how are you", "how's it going", "how is it going", "how do you do"],
    },
    IntentRule {
        name: "request_practice",
        phrases: &["let's practice", "practice", "can we practice", "want to practice"],
    },
    IntentRule {
        name: "request_repeat",
        phrases: &["repeat", "say that again", "what did you say", "pardon", "one more time"],
    },
    IntentRule {
        name: "request_translation",
        phrases: &["how do you say", "translate", "what does", "meaning of"],
    },
    IntentRule {
        name: "question",
        phrases: &["who", "what", "when", "where", "why", "how"],
    },
];

/// Rule-based classifier matching keyword phrases against lowercased text.
///
/// Rules are checked in order; the first match wins. A scenario keyword
/// anywhere in the text adds a `scenario` entity.
#[derive(Debug, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    /// Creates the classifier with the built-in rule table.
    pub fn new() -> Self {
        Self
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();

        let mut entities = HashMap::new();
        for &keyword in SCENARIO_KEYWORDS {
            if lowered.contains(keyword) {
                entities.insert("scenario".to_string(), keyword.to_string());
                break;
            }
        }

        for rule in RULES {
            if rule.phrases.iter().any(|p| lowered.contains(p)) {
                return Intent {
                    name: rule.name.to_string(),
                    confidence: 0.9,
                    entities,
                };
            }
        }

        if !entities.is_empty() {
            return Intent {
                name: "request_scenario".to_string(),
                confidence: 0.8,
                entities,
            };
        }

        Intent {
            entities,
            ..Intent::unknown()
        }
    }
}

/// Mock classifier returning a fixed intent, for tests.
#[derive(Debug)]
pub struct MockIntentClassifier {
    intent: Intent,
}

impl MockIntentClassifier {
    /// Creates a mock that always returns an intent with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            intent: Intent {
                name: name.to_string(),
                confidence: 1.0,
                entities: HashMap::new(),
            },
        }
    }
}

impl IntentClassifier for MockIntentClassifier {
    fn classify(&self, _text: &str) -> Intent {
        self.intent.clone()
    }
}
