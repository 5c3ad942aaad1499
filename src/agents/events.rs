use axum::response::sse::Event;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

use crate::insight::InsightDocument;
use crate::models::string_or_number;
use crate::sse::DONE_SENTINEL;

// ============================================================================
// Upstream (provider) events
// ============================================================================

/// One decoded upstream `data:` frame. Anything with an unknown `event` tag
/// lands in [`UpstreamEvent::Ignored`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UpstreamEvent {
    NodeStarted(NodeStarted),
    TextChunk(TextIncrement),
    #[serde(alias = "agent_message")]
    Message(TextIncrement),
    NodeFinished(NodeFinished),
    MessageEnd(MessageEnd),
    #[serde(other)]
    Ignored,
}

impl UpstreamEvent {
    /// `None` when the payload is not a well-formed event.
    pub fn parse(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                log::debug!("skipping malformed upstream event: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct NodeData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    outputs: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeStarted {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    data: Option<NodeData>,
}

impl NodeStarted {
    pub fn new(task_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            title: Some(title.into()),
            data: None,
        }
    }

    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.title.as_deref()))
            .unwrap_or_default()
    }
}

/// `text_chunk`, `message` and `agent_message` all carry an increment, under
/// `data.text`, `text` or `answer` depending on the app type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextIncrement {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    data: Option<NodeData>,
}

impl TextIncrement {
    pub fn new(task_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            text: Some(text.into()),
            answer: None,
            data: None,
        }
    }

    pub fn text(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|d| d.text.as_deref())
            .or(self.text.as_deref())
            .or(self.answer.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeFinished {
    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,
    #[serde(default)]
    outputs: Option<Map<String, Value>>,
    #[serde(default)]
    data: Option<NodeData>,
}

impl NodeFinished {
    pub fn new(task_id: impl Into<String>, outputs: Map<String, Value>) -> Self {
        Self {
            task_id: task_id.into(),
            outputs: Some(outputs),
            data: None,
        }
    }

    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.outputs
            .as_ref()
            .or_else(|| self.data.as_ref().and_then(|d| d.outputs.as_ref()))
    }

    /// Batch result of the node: `output`, then `text`, then (summarizer only)
    /// `answer`. Empty strings count as absent.
    pub fn batch_output(&self, include_answer: bool) -> Option<&str> {
        let outputs = self.outputs()?;
        let keys: &[&str] = if include_answer {
            &["output", "text", "answer"]
        } else {
            &["output", "text"]
        };
        keys.iter()
            .filter_map(|key| outputs.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageEnd {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// ============================================================================
// Downstream (client) frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentEvent {
    Start,
    Content,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Insight(InsightDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFrame {
    pub bot_id: String,
    pub event: AgentEvent,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Discussion lifecycle frame tagged with its agent.
    Agent(AgentFrame),
    /// Plain chat text increment.
    Text { text: String },
    /// Plain chat completion marker.
    Finished { conversation_id: Option<String> },
    Done,
    Error { error: String },
}

impl StreamEvent {
    pub fn start(bot_id: impl Into<String>) -> Self {
        Self::agent(bot_id, AgentEvent::Start, None)
    }

    pub fn content(bot_id: impl Into<String>, payload: Payload) -> Self {
        Self::agent(bot_id, AgentEvent::Content, Some(payload))
    }

    pub fn done(bot_id: impl Into<String>) -> Self {
        Self::agent(bot_id, AgentEvent::Done, None)
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    fn agent(bot_id: impl Into<String>, event: AgentEvent, payload: Option<Payload>) -> Self {
        Self::Agent(AgentFrame {
            bot_id: bot_id.into(),
            event,
            payload,
        })
    }

    /// Body of the `data:` field.
    pub fn data(&self) -> String {
        match self {
            Self::Done => DONE_SENTINEL.to_string(),
            Self::Agent(frame) => serde_json::to_string(frame).unwrap_or_else(|e| {
                serde_json::json!({ "error": format!("Serialization error: {}", e) }).to_string()
            }),
            Self::Text { text } => serde_json::json!({ "text": text }).to_string(),
            Self::Finished { conversation_id } => {
                serde_json::json!({ "conversation_id": conversation_id, "is_finished": true })
                    .to_string()
            }
            Self::Error { error } => serde_json::json!({ "error": error }).to_string(),
        }
    }

    pub fn into_event(self) -> Event {
        Event::default().data(self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::extract_insight;
    use serde_json::json;

    #[test]
    fn decodes_known_events() {
        let started = UpstreamEvent::parse(
            r#"{"event":"node_started","task_id":"t1","data":{"title":"CEO","node_type":"llm"}}"#,
        );
        match started {
            Some(UpstreamEvent::NodeStarted(node)) => {
                assert_eq!(node.task_id, "t1");
                assert_eq!(node.title(), "CEO");
            }
            other => panic!("unexpected {:?}", other),
        }

        let chunk = UpstreamEvent::parse(r#"{"event":"text_chunk","task_id":7,"data":{"text":"Hi"}}"#);
        match chunk {
            Some(UpstreamEvent::TextChunk(inc)) => {
                assert_eq!(inc.task_id, "7");
                assert_eq!(inc.text(), "Hi");
            }
            other => panic!("unexpected {:?}", other),
        }

        let message = UpstreamEvent::parse(r#"{"event":"agent_message","task_id":"t","answer":"yo"}"#);
        assert!(matches!(message, Some(UpstreamEvent::Message(ref inc)) if inc.text() == "yo"));

        let end = UpstreamEvent::parse(r#"{"event":"message_end","conversation_id":"c9"}"#);
        assert_eq!(
            end,
            Some(UpstreamEvent::MessageEnd(MessageEnd {
                conversation_id: Some("c9".to_string())
            }))
        );
    }

    #[test]
    fn unknown_kind_is_ignored_and_garbage_is_rejected() {
        assert_eq!(
            UpstreamEvent::parse(r#"{"event":"workflow_started","task_id":"t"}"#),
            Some(UpstreamEvent::Ignored)
        );
        assert_eq!(UpstreamEvent::parse("not json"), None);
        assert_eq!(UpstreamEvent::parse(r#"{"event":"node_started"}"#), None);
        assert_eq!(UpstreamEvent::parse(r#"{"task_id":"t"}"#), None);
    }

    #[test]
    fn batch_output_precedence() {
        let node = NodeFinished::new(
            "t",
            json!({"output": "", "text": "from text", "answer": "from answer"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(node.batch_output(false), Some("from text"));

        let answer_only = NodeFinished::new("t", json!({"answer": "a"}).as_object().cloned().unwrap());
        assert_eq!(answer_only.batch_output(false), None);
        assert_eq!(answer_only.batch_output(true), Some("a"));

        let nested = UpstreamEvent::parse(
            r#"{"event":"node_finished","task_id":"t","data":{"outputs":{"output":"nested"}}}"#,
        );
        match nested {
            Some(UpstreamEvent::NodeFinished(node)) => assert_eq!(node.batch_output(false), Some("nested")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn encodes_agent_frames() {
        assert_eq!(
            StreamEvent::start("ceo").data(),
            "{\"bot_id\":\"ceo\",\"event\":\"start\",\"payload\":null}"
        );
        let content = StreamEvent::content("ceo", Payload::Text("Hello".to_string()));
        let body: Value = serde_json::from_str(&content.data()).unwrap();
        assert_eq!(body, json!({"bot_id": "ceo", "event": "content", "payload": "Hello"}));
    }

    #[test]
    fn encodes_insight_payload_as_object() {
        let doc = extract_insight("【サマリ】\nok");
        let body: Value = serde_json::from_str(&StreamEvent::content("insight", Payload::Insight(doc)).data()).unwrap();
        assert_eq!(body["payload"]["summary"]["content"], "ok");
        assert_eq!(body["payload"]["highlights"], json!([]));
    }

    #[test]
    fn encodes_terminal_frames() {
        assert_eq!(StreamEvent::Done.data(), "[DONE]");
        assert_eq!(
            StreamEvent::error("service unavailable").data(),
            "{\"error\":\"service unavailable\"}"
        );
    }

    #[test]
    fn encodes_plain_chat_frames() {
        let finished: Value = serde_json::from_str(
            &StreamEvent::Finished { conversation_id: Some("c1".to_string()) }.data(),
        )
        .unwrap();
        assert_eq!(finished, json!({"conversation_id": "c1", "is_finished": true}));
        assert_eq!(StreamEvent::Text { text: "a\"b".to_string() }.data(), r#"{"text":"a\"b"}"#);
    }

    #[test]
    fn agent_event_names() {
        assert_eq!(AgentEvent::Content.to_string(), "content");
    }
}
