//! Response generation.

use crate::error::{Result, VoxpipeError};
use crate::nlp::Intent;
use std::collections::HashMap;
use std::sync::Mutex;

/// A generated response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Text to synthesize and speak.
    pub text: String,
}

/// Trait for response generation.
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply for a classified intent.
    fn generate(&self, intent: &Intent) -> Reply;
}

/// Template-based responder.
///
/// Each intent maps to a list of templates; consecutive hits on the same
/// intent rotate through its list so repeated questions do not repeat the
/// same wording. `{scenario}` in a template is filled from the intent's
/// entities.
pub struct TemplateResponder {
    templates: HashMap<String, Vec<String>>,
    cursors: Mutex<HashMap<String, usize>>,
    fallback: String,
}

impl TemplateResponder {
    /// Creates a responder with the built-in template table.
    pub fn new() -> Self {
        let mut templates: HashMap<String, Vec<String>> = HashMap::new();
        templates.insert(
            "greeting".to_string(),
            vec![
                "Hello! How can I help you?".to_string(),
                "Hi there! What would you like to practice?".to_string(),
            ],
        );
        templates.insert(
            "goodbye".to_string(),
            vec![
                "Goodbye! Have a great day!".to_string(),
                "See you next time!".to_string(),
            ],
        );
        templates.insert(
            "how_are_you".to_string(),
            vec!["I'm doing well, thanks for asking. How about you?".to_string()],
        );
        templates.insert(
            "request_practice".to_string(),
            vec!["Sure, let's practice. Pick a scenario to get started.".to_string()],
        );
        templates.insert(
            "request_scenario".to_string(),
            vec!["Great choice. Let's try a {scenario} conversation.".to_string()],
        );
        templates.insert(
            "request_repeat".to_string(),
            vec!["Of course, let me say that again.".to_string()],
        );
        templates.insert(
            "question".to_string(),
            vec!["That's a good question. Let me think about it.".to_string()],
        );

        Self {
            templates,
            cursors: Mutex::new(HashMap::new()),
            fallback: "I'm not sure I understood. Could you rephrase that?".to_string(),
        }
    }

    /// Loads a template table from JSON: `{"intent": ["template", ...], ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let templates: HashMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(|e| VoxpipeError::Other(format!(
                "Failed to parse response templates: {}",
                e
            )))?;
        Ok(Self {
            templates,
            ..Self::new()
        })
    }

    fn pick(&self, intent_name: &str) -> Option<String> {
        let list = self.templates.get(intent_name)?;
        if list.is_empty() {
            return None;
        }
        let mut cursors = self.cursors.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let cursor = cursors.entry(intent_name.to_string()).or_insert(0);
        let template = list[*cursor % list.len()].clone();
        *cursor += 1;
        Some(template)
    }
}

impl Default for TemplateResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGenerator for TemplateResponder {
    fn generate(&self, intent: &Intent) -> Reply {
        let template = self
            .pick(&intent.name)
            .unwrap_or_else(|| self.fallback.clone());

        let mut text = template;
        for (key, value) in &intent.entities {
            text = text.replace(&format!("{{{}}}", key), value);
        }

        Reply { text }
    }
}

/// Mock responder echoing the intent name, for tests.
#[derive(Debug, Default)]
pub struct MockResponder;

impl MockResponder {
    /// Creates the mock.
    pub fn new() -> Self {
        Self
    }
}

impl ResponseGenerator for MockResponder {
    fn generate(&self, intent: &Intent) -> Reply {
        Reply {
            text: format!("response to {}", intent.name),
        }
    }
}
