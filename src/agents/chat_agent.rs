use crate::agents::events::{StreamEvent, UpstreamEvent};
use crate::agents::relay::StreamDecoder;

/// Plain one-to-one chat relay: forwards answer increments as `{"text": ..}`
/// and closes with the conversation id.
#[derive(Debug, Default)]
pub struct ChatAgent {
    finished: bool,
}

impl ChatAgent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamDecoder for ChatAgent {
    fn push_event(&mut self, event: UpstreamEvent) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        match event {
            UpstreamEvent::Message(increment) => vec![StreamEvent::Text {
                text: increment.text().to_string(),
            }],
            UpstreamEvent::MessageEnd(end) => {
                self.finished = true;
                vec![
                    StreamEvent::Finished {
                        conversation_id: end.conversation_id,
                    },
                    StreamEvent::Done,
                ]
            }
            UpstreamEvent::NodeStarted(_)
            | UpstreamEvent::TextChunk(_)
            | UpstreamEvent::NodeFinished(_)
            | UpstreamEvent::Ignored => Vec::new(),
        }
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if std::mem::replace(&mut self.finished, true) {
            Vec::new()
        } else {
            vec![StreamEvent::Done]
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(agent: &mut ChatAgent, lines: &[&str]) -> Vec<String> {
        lines
            .iter()
            .flat_map(|line| agent.push_line(line))
            .map(|event| event.data())
            .collect()
    }

    #[test]
    fn relays_answers_and_conversation_id() {
        let mut agent = ChatAgent::new();
        let out = feed(
            &mut agent,
            &[
                r#"data: {"event":"workflow_started","task_id":"t"}"#,
                r#"data: {"event":"message","task_id":"t","answer":"Hel"}"#,
                "",
                r#"data: {"event":"agent_message","task_id":"t","answer":"lo"}"#,
                r#"data: {"event":"message_end","task_id":"t","conversation_id":"conv-1"}"#,
            ],
        );
        assert_eq!(
            out,
            vec![
                r#"{"text":"Hel"}"#.to_string(),
                r#"{"text":"lo"}"#.to_string(),
                r#"{"conversation_id":"conv-1","is_finished":true}"#.to_string(),
                "[DONE]".to_string(),
            ]
        );
        assert!(agent.is_finished());
    }

    #[test]
    fn events_after_end_are_dropped() {
        let mut agent = ChatAgent::new();
        feed(&mut agent, &[r#"data: {"event":"message_end"}"#]);
        assert!(feed(&mut agent, &[r#"data: {"event":"message","task_id":"t","answer":"late"}"#]).is_empty());
    }

    #[test]
    fn eof_without_message_end_still_terminates() {
        let mut agent = ChatAgent::new();
        assert_eq!(agent.finish(), vec![StreamEvent::Done]);
        assert!(agent.finish().is_empty());
    }
}
