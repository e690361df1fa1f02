use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Inbound conversational turn. Missing or null members are forwarded as `{}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MessageRequest {
    pub fn text(&self) -> Option<&str> {
        self.input.get("text").and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedIntent {
    pub intent: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_messages: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_visited: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageOutput {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.log_messages.is_none()
            && self.nodes_visited.is_none()
            && self.extra.is_empty()
    }
}

/// One request/response pair as returned by the backend for a message turn.
/// `intents` arrive sorted by descending confidence. Members the backend
/// omitted stay omitted when the exchange is serialized again.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageExchange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default)]
    pub intents: Vec<RecognizedIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<MessageOutput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageExchange {
    pub fn top_intent(&self) -> Option<&RecognizedIntent> {
        self.intents.first()
    }

    pub fn has_output(&self) -> bool {
        self.output.as_ref().is_some_and(|output| !output.is_empty())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.context.as_ref()?.get("conversation_id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MessageExchange, MessageRequest};

    #[test]
    fn empty_output_object_counts_as_no_output() {
        let exchange: MessageExchange = serde_json::from_value(json!({
            "intents": [{ "intent": "order_pizza", "confidence": 0.82 }],
            "output": {}
        }))
        .expect("decode");

        assert!(exchange.output.is_some());
        assert!(!exchange.has_output());
        assert_eq!(exchange.top_intent().map(|intent| intent.intent.as_str()), Some("order_pizza"));
    }

    #[test]
    fn backend_output_is_preserved_verbatim() {
        let document = json!({
            "input": { "text": "large pepperoni" },
            "context": { "conversation_id": "c-1", "system": { "dialog_turn_counter": 2 } },
            "intents": [],
            "entities": [{ "entity": "size", "value": "large" }],
            "output": {
                "text": ["Coming right up"],
                "log_messages": [],
                "nodes_visited": ["node_1"]
            },
            "alternate_intents": false
        });

        let exchange: MessageExchange = serde_json::from_value(document.clone()).expect("decode");
        assert!(exchange.has_output());
        assert_eq!(exchange.conversation_id(), Some("c-1"));
        assert_eq!(serde_json::to_value(&exchange).expect("encode"), document);
    }

    #[test]
    fn omitted_members_are_not_invented_on_the_way_back() {
        let document = json!({
            "intents": [{ "intent": "greeting", "confidence": 0.4 }],
            "output": { "text": "hello" }
        });

        let exchange: MessageExchange = serde_json::from_value(document.clone()).expect("decode");

        assert_eq!(exchange.conversation_id(), None);
        assert_eq!(serde_json::to_value(&exchange).expect("encode"), document);
    }

    #[test]
    fn request_defaults_missing_members_to_empty_objects() {
        let request: MessageRequest =
            serde_json::from_value(json!({ "context": null })).expect("decode");
        assert!(request.input.is_empty());
        assert!(request.context.is_empty());
        assert_eq!(
            serde_json::to_value(&request).expect("encode"),
            json!({ "input": {}, "context": {} })
        );
    }
}
