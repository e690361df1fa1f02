//! Turns a raw message-exchange response into one carrying a disambiguation
//! string when the backend produced no output of its own.

use serde_json::Value;

use crate::domain::message::{MessageExchange, MessageOutput, RecognizedIntent};

const INTENT_PLACEHOLDER: &str = "{intent}";

#[derive(Clone, Debug, PartialEq)]
pub struct ConfidenceTier {
    pub threshold: f64,
    pub template: String,
}

impl ConfidenceTier {
    pub fn new(threshold: f64, template: impl Into<String>) -> Self {
        Self { threshold, template: template.into() }
    }

    fn render(&self, intent: &RecognizedIntent) -> String {
        self.template.replace(INTENT_PLACEHOLDER, &intent.intent)
    }
}

/// Ordered confidence tiers evaluated top-down; the first tier whose
/// threshold the top intent reaches wins, otherwise `fallback` is used.
#[derive(Clone, Debug, PartialEq)]
pub struct DisambiguationPolicy {
    tiers: Vec<ConfidenceTier>,
    fallback: String,
}

impl Default for DisambiguationPolicy {
    fn default() -> Self {
        Self::new(
            vec![
                ConfidenceTier::new(0.75, "I understood your intent was {intent}"),
                ConfidenceTier::new(0.5, "I think your intent was {intent}"),
            ],
            "I did not understand your intent",
        )
    }
}

impl DisambiguationPolicy {
    pub fn new(tiers: Vec<ConfidenceTier>, fallback: impl Into<String>) -> Self {
        Self { tiers, fallback: fallback.into() }
    }

    pub fn tiers(&self) -> &[ConfidenceTier] {
        &self.tiers
    }

    pub fn message_for(&self, top_intent: Option<&RecognizedIntent>) -> String {
        let Some(intent) = top_intent else {
            return self.fallback.clone();
        };

        self.tiers
            .iter()
            .find(|tier| intent.confidence >= tier.threshold)
            .map(|tier| tier.render(intent))
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Fills `output.text` unless the backend already returned a non-empty
    /// output. Nothing other than `output` is touched.
    pub fn augment(&self, exchange: &mut MessageExchange) {
        if exchange.has_output() {
            return;
        }

        let text = self.message_for(exchange.top_intent());
        exchange.output.get_or_insert_with(MessageOutput::default).text = Some(Value::String(text));
    }
}
