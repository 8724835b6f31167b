//! Canned replies for messages that are not commands.

use rand::{seq::SliceRandom, Rng};
use regex::Regex;

use crate::domain::UserId;

/// Which keyword rule matched a free-text message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Greeting,
    WellBeing,
    Gratitude,
    Fallback,
}

const GREETING: &[&str] = &[
    "Hello {sender}! 👋 How can I assist you today?",
    "Hi there {sender}! I'm your AI assistant. What can I help you with?",
    "Greetings {sender}! Ready to chat and help with your questions!",
];

const WELL_BEING: &[&str] = &[
    "I'm doing great! My database is running smoothly and I'm ready to help! 🤖",
    "Excellent! All systems are green and I'm processing messages efficiently! ⚡",
    "I'm fantastic! Thanks for asking. How are you doing today?",
];

const GRATITUDE: &[&str] = &[
    "You're very welcome! Happy to help! 😊",
    "No problem at all! That's what I'm here for! 🤖",
    "Glad I could assist! Feel free to ask anything else!",
];

const FALLBACK: &[&str] = &[
    "That's interesting, {sender}! {thought}",
    "I understand your message about '{preview}...' Let me process that...",
    "Thanks for sharing that with me, {sender}! Here's my thought on it...",
];

const THOUGHTS: &[&str] = &[
    "That's an interesting question! Let me think about that...",
    "I understand what you're asking. Here's my perspective:",
    "Based on my knowledge, I would say:",
    "That's a great point! My response would be:",
    "I'm processing that information. Here's what I think:",
];

const PREVIEW_CHARS: usize = 30;

/// Ordered keyword rules, first match wins.
pub struct ResponseGenerator {
    rules: Vec<(Regex, Category)>,
}

impl Default for ResponseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGenerator {
    pub fn new() -> Self {
        let rule = |pattern: &str, category| {
            let re = Regex::new(pattern).expect("response rule regex");
            (re, category)
        };

        Self {
            rules: vec![
                rule(r"(?i)\b(hello|hi|hey)\b", Category::Greeting),
                rule(r"(?i)\bhow\s+are\s+you\b", Category::WellBeing),
                rule(r"(?i)\bthank", Category::Gratitude),
            ],
        }
    }

    pub fn categorize(&self, text: &str) -> Category {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, c)| *c)
            .unwrap_or(Category::Fallback)
    }

    pub fn reply<R: Rng + ?Sized>(&self, text: &str, sender: &UserId, rng: &mut R) -> String {
        let templates = match self.categorize(text) {
            Category::Greeting => GREETING,
            Category::WellBeing => WELL_BEING,
            Category::Gratitude => GRATITUDE,
            Category::Fallback => FALLBACK,
        };
        let template = templates.choose(&mut *rng).copied().unwrap_or(FALLBACK[0]);
        let thought = THOUGHTS.choose(&mut *rng).copied().unwrap_or(THOUGHTS[0]);
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();

        template
            .replace("{sender}", &sender.0)
            .replace("{thought}", thought)
            .replace("{preview}", &preview)
    }
}
