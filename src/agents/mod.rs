// Public module exports
pub mod events;
pub mod roster;
pub mod relay;
pub mod chat_agent;
pub mod discuss_agent;

// Re-export main types for convenience
pub use events::{AgentEvent, AgentFrame, Payload, StreamEvent, UpstreamEvent};
pub use roster::{AgentIdentity, AgentRoster};
pub use relay::{relay_stream, StreamDecoder};
pub use chat_agent::ChatAgent;
pub use discuss_agent::{DiscussAgent, DEFAULT_INSIGHT_MARKER};
