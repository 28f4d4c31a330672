//! System prompt template for intent disambiguation.

use crate::retrieval::Candidate;
use std::path::Path;

const TEXT_PLACEHOLDER: &str = "{text}";
const CANDIDATES_PLACEHOLDER: &str = "{candidates}";

/// Built-in template. `{text}` and `{candidates}` are substituted; every
/// other brace is literal.
pub const DEFAULT_TEMPLATE: &str = r#"You classify voice commands for SeniorOS.

USER: "{text}"

CANDIDATES:
{candidates}

RULES:
- "remind me to take" + med -> MEDICATION_ADD (extract medicationName, dosage, frequency)
- "add medicine/pill" -> MEDICATION_ADD
- "book/call/get" + ride/taxi/cab/uber/ola -> BOOK_RIDE (extract destination)
- "go to" + place -> BOOK_RIDE (extract destination)
- "send/text/message" + name -> SEND_MESSAGE (extract contactName)
- "call/phone/dial" + name -> CALL_CONTACT (extract contactName)
- "set alarm/wake me" + time -> SET_ALARM (extract time as "HH:MM" 24-hour format)
- "timer" + duration -> SET_TIMER (extract duration as number in minutes)
- Use top candidate if score > 0.4

JSON OUTPUT:
{"intent":"X","reply":"Short confirmation","entities":{"contactName":null,"appName":null,"medicationName":null,"dosage":null,"frequency":null,"time":null,"duration":null,"destination":null}}

EXAMPLES:
"wake me at 7 am" -> {"intent":"SET_ALARM","reply":"Alarm set for 7:00 a.m.","entities":{"time":"07:00"}}
"book a ride to the doctor" -> {"intent":"BOOK_RIDE","reply":"Looking for a ride","entities":{"destination":"doctor"}}
"get me an uber to home" -> {"intent":"BOOK_RIDE","reply":"Opening Uber","entities":{"destination":"home"}}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        if !template.contains(CANDIDATES_PLACEHOLDER) {
            tracing::warn!("Prompt template has no {} placeholder", CANDIDATES_PLACEHOLDER);
        }
        Self { template }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    /// Substitute the query and candidate list in one pass, so braces in
    /// the user's text are never re-expanded.
    pub fn render(&self, text: &str, candidates: &[Candidate]) -> String {
        let candidates = format_candidates(candidates);
        self.template
            .split(TEXT_PLACEHOLDER)
            .map(|part| part.replace(CANDIDATES_PLACEHOLDER, &candidates))
            .collect::<Vec<_>>()
            .join(text)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// One `INTENT (0.87)` line per candidate
pub fn format_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{} ({:.2})", c.intent, c.score))
        .collect::<Vec<_>>()
        .join("\n")
}
