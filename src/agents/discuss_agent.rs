//! Demultiplexes one upstream multi-agent workflow stream into per-agent turns.
//!
//! Every tracked workflow node runs through `INACTIVE -> ACTIVE -> INACTIVE`:
//! `node_started` opens a session and emits `start`, text increments are
//! forwarded as `content` immediately, `node_finished` emits the batch output
//! if nothing was streamed, then `done`. Nodes whose title is not in the
//! roster never get a session, so all their events are dropped.
//!
//! The summarizer agent is the exception to immediate forwarding: its text is
//! collected until `node_finished` and published once as an
//! [`InsightDocument`](crate::insight::InsightDocument).

use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::events::{
    AgentEvent, NodeFinished, NodeStarted, Payload, StreamEvent, TextIncrement, UpstreamEvent,
};
use crate::agents::relay::StreamDecoder;
use crate::agents::roster::{AgentIdentity, AgentRoster};
use crate::insight::extract_insight;

pub const DEFAULT_INSIGHT_MARKER: &str = "</think>";

#[derive(Debug)]
struct AgentSession {
    agent: AgentIdentity,
    has_streamed: bool,
    /// Summarizer text collected until the node finishes.
    collected: String,
}

pub struct DiscussAgent {
    roster: Arc<AgentRoster>,
    insight_marker: String,
    sessions: HashMap<String, AgentSession>,
    finished: bool,
}

impl DiscussAgent {
    pub fn new(roster: Arc<AgentRoster>, insight_marker: impl Into<String>) -> Self {
        Self {
            roster,
            insight_marker: insight_marker.into(),
            sessions: HashMap::new(),
            finished: false,
        }
    }

    /// Number of agent turns currently open.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn on_node_started(&mut self, node: NodeStarted) -> Vec<StreamEvent> {
        if self.sessions.contains_key(&node.task_id) {
            return Vec::new();
        }
        let Some(agent) = self.roster.resolve(node.title()) else {
            log::debug!("untracked node '{}' (task {})", node.title(), node.task_id);
            return Vec::new();
        };

        log::debug!("{} {} (task {})", AgentEvent::Start, agent.public_id, node.task_id);
        let start = StreamEvent::start(agent.public_id.clone());
        self.sessions.insert(
            node.task_id,
            AgentSession {
                agent,
                has_streamed: false,
                collected: String::new(),
            },
        );
        vec![start]
    }

    fn on_text(&mut self, increment: TextIncrement) -> Vec<StreamEvent> {
        let Some(session) = self.sessions.get_mut(&increment.task_id) else {
            return Vec::new();
        };
        let text = increment.text();
        if text.is_empty() {
            return Vec::new();
        }

        session.has_streamed = true;
        if session.agent.summarizer {
            session.collected.push_str(text);
            return Vec::new();
        }
        vec![StreamEvent::content(
            session.agent.public_id.clone(),
            Payload::Text(text.to_string()),
        )]
    }

    fn on_node_finished(&mut self, node: NodeFinished) -> Vec<StreamEvent> {
        let Some(session) = self.sessions.remove(&node.task_id) else {
            return Vec::new();
        };
        let AgentSession {
            agent,
            has_streamed,
            collected,
        } = session;

        let mut frames = Vec::with_capacity(2);
        if agent.summarizer {
            let text = if has_streamed {
                collected.as_str()
            } else {
                node.batch_output(true).unwrap_or_default()
            };
            if let Some(payload) = self.insight_payload(text) {
                frames.push(StreamEvent::content(agent.public_id.clone(), payload));
            }
        } else if !has_streamed {
            if let Some(text) = node.batch_output(false) {
                frames.push(StreamEvent::content(
                    agent.public_id.clone(),
                    Payload::Text(text.to_string()),
                ));
            }
        }
        log::debug!("{} {} (task {})", AgentEvent::Done, agent.public_id, node.task_id);
        frames.push(StreamEvent::done(agent.public_id));
        frames
    }

    /// Cuts the summarizer text to what follows the last marker, then extracts
    /// the structured document. `None` when nothing is left to publish.
    fn insight_payload(&self, text: &str) -> Option<Payload> {
        let text = match text.rfind(&self.insight_marker) {
            Some(pos) if !self.insight_marker.is_empty() => &text[pos + self.insight_marker.len()..],
            _ => text,
        };
        if text.trim().is_empty() {
            return None;
        }
        Some(Payload::Insight(extract_insight(text)))
    }
}

impl StreamDecoder for DiscussAgent {
    fn push_event(&mut self, event: UpstreamEvent) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        match event {
            UpstreamEvent::NodeStarted(node) => self.on_node_started(node),
            UpstreamEvent::TextChunk(increment) | UpstreamEvent::Message(increment) => {
                self.on_text(increment)
            }
            UpstreamEvent::NodeFinished(node) => self.on_node_finished(node),
            UpstreamEvent::MessageEnd(_) => self.finish(),
            UpstreamEvent::Ignored => Vec::new(),
        }
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if std::mem::replace(&mut self.finished, true) {
            return Vec::new();
        }
        if !self.sessions.is_empty() {
            log::debug!("discussion ended with {} open agent turns", self.sessions.len());
            self.sessions.clear();
        }
        vec![StreamEvent::Done]
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
