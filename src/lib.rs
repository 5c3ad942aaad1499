pub mod agents;
pub mod error;
pub mod insight;

pub mod dify;
pub mod gamma;
pub mod handlers;
pub mod init;
pub mod models;
pub mod sse;

pub use crate::init::{AppState, Config};
pub use crate::agents::{AgentRoster, ChatAgent, DiscussAgent, StreamDecoder, StreamEvent};
pub use crate::insight::{extract_insight, InsightDocument};
