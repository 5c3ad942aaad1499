use futures::{Stream, StreamExt};

use crate::agents::events::{StreamEvent, UpstreamEvent};
use crate::dify::{DifyClient, UpstreamError};
use crate::models::ChatMessagesPayload;
use crate::sse::{data_payload, LineDecoder, DONE_SENTINEL};

/// Turns upstream events into downstream frames for one request.
pub trait StreamDecoder: Send + 'static {
    fn push_event(&mut self, event: UpstreamEvent) -> Vec<StreamEvent>;

    /// Called when the upstream ends. Emits the terminal frame at most once.
    fn finish(&mut self) -> Vec<StreamEvent>;

    fn is_finished(&self) -> bool;

    /// Feeds one raw SSE line. Non-`data:` lines and malformed payloads
    /// produce nothing; an upstream `[DONE]` finishes the decoder.
    fn push_line(&mut self, line: &str) -> Vec<StreamEvent> {
        match data_payload(line) {
            None => Vec::new(),
            Some(DONE_SENTINEL) => self.finish(),
            Some(payload) => UpstreamEvent::parse(payload)
                .map(|event| self.push_event(event))
                .unwrap_or_default(),
        }
    }
}

/// Opens the upstream call and drives `decoder` over its body.
///
/// Frames are produced only as fast as the consumer polls. Dropping the stream
/// drops the upstream response, which closes that connection. Transport
/// failures and non-2xx answers end the stream with a single `error` frame.
pub fn relay_stream<D: StreamDecoder>(
    client: DifyClient,
    api_key: String,
    payload: ChatMessagesPayload,
    mut decoder: D,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let response = match client.chat_messages(&api_key, &payload).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("upstream call failed for user {}: {}", payload.user, e);
                yield StreamEvent::error(e.to_string());
                return;
            }
        };
        log::info!("upstream stream opened for user {}", payload.user);

        let mut body = response.bytes_stream();
        let mut lines = LineDecoder::new();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let err = UpstreamError::from(e);
                    log::warn!("upstream stream broke for user {}: {}", payload.user, err);
                    yield StreamEvent::error(err.to_string());
                    return;
                }
            };
            for line in lines.push(&bytes) {
                for event in decoder.push_line(&line) {
                    yield event;
                }
                if decoder.is_finished() {
                    log::info!("upstream stream finished for user {}", payload.user);
                    return;
                }
            }
        }

        if let Some(line) = lines.finish() {
            for event in decoder.push_line(&line) {
                yield event;
            }
        }
        for event in decoder.finish() {
            yield event;
        }
        log::info!("upstream stream closed for user {}", payload.user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::chat_agent::ChatAgent;

    #[test]
    fn push_line_filters_non_data_lines() {
        let mut agent = ChatAgent::new();
        assert!(agent.push_line("").is_empty());
        assert!(agent.push_line(": keep-alive").is_empty());
        assert!(agent.push_line("event: message").is_empty());
        assert!(agent.push_line("data: {broken").is_empty());
        assert!(!agent.is_finished());
    }

    #[test]
    fn upstream_done_sentinel_finishes() {
        let mut agent = ChatAgent::new();
        assert_eq!(agent.push_line("data: [DONE]"), vec![StreamEvent::Done]);
        assert!(agent.is_finished());
        assert!(agent.finish().is_empty());
    }
}
