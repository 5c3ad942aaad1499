use std::collections::HashMap;

use crate::error::{AppError, Result};

pub const DEFAULT_SUMMARIZER_ID: &str = "insight";
pub const DEFAULT_INSIGHT_PUBLIC_ID: &str = "insight";

const BUILTIN_AGENTS: &[(&str, &str)] = &[
    ("CEO", "ceo"),
    ("Business Development", "biz_dev"),
    ("Biz Dev", "biz_dev"),
    ("Tech Lead", "tech_lead"),
    ("Facilitator", "facilitator"),
    ("Insight", "insight"),
    ("Answer Summary", "insight"),
];

/// Resolved identity of a workflow node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub id: String,
    /// Identifier written to `bot_id` downstream.
    pub public_id: String,
    pub summarizer: bool,
}

/// Maps workflow node titles to agent identifiers. Titles compare trimmed and
/// case-insensitively; one agent id is designated the summarizer and is
/// published under a separate public id.
#[derive(Debug, Clone)]
pub struct AgentRoster {
    titles: HashMap<String, String>,
    summarizer_id: String,
    insight_public_id: String,
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AgentRoster {
    pub fn new(summarizer_id: impl Into<String>, insight_public_id: impl Into<String>) -> Self {
        Self {
            titles: HashMap::new(),
            summarizer_id: summarizer_id.into(),
            insight_public_id: insight_public_id.into(),
        }
    }

    pub fn builtin() -> Self {
        BUILTIN_AGENTS.iter().fold(
            Self::new(DEFAULT_SUMMARIZER_ID, DEFAULT_INSIGHT_PUBLIC_ID),
            |roster, (title, id)| roster.with_agent(*title, *id),
        )
    }

    pub fn with_agent(mut self, title: impl AsRef<str>, id: impl Into<String>) -> Self {
        self.titles.insert(title_key(title.as_ref()), id.into());
        self
    }

    /// Reads `DISCUSS_AGENTS`, `DISCUSS_SUMMARIZER` and `DISCUSS_INSIGHT_ID`;
    /// the built-in roster is used when `DISCUSS_AGENTS` is unset or blank.
    pub fn from_env() -> Result<Self> {
        let summarizer = std::env::var("DISCUSS_SUMMARIZER")
            .unwrap_or_else(|_| DEFAULT_SUMMARIZER_ID.to_string());
        let public_id = std::env::var("DISCUSS_INSIGHT_ID")
            .unwrap_or_else(|_| DEFAULT_INSIGHT_PUBLIC_ID.to_string());

        let pairs = match std::env::var("DISCUSS_AGENTS") {
            Ok(spec) if !spec.trim().is_empty() => parse_agent_pairs(&spec)?,
            _ => BUILTIN_AGENTS
                .iter()
                .map(|(t, i)| (t.to_string(), i.to_string()))
                .collect(),
        };

        Ok(pairs
            .into_iter()
            .fold(Self::new(summarizer, public_id), |roster, (title, id)| {
                roster.with_agent(title, id)
            }))
    }

    pub fn resolve(&self, title: &str) -> Option<AgentIdentity> {
        let id = self.titles.get(&title_key(title))?;
        let summarizer = *id == self.summarizer_id;
        Some(AgentIdentity {
            id: id.clone(),
            public_id: if summarizer {
                self.insight_public_id.clone()
            } else {
                id.clone()
            },
            summarizer,
        })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Parses `Title=id` pairs separated by `,` or `;`.
pub fn parse_agent_pairs(spec: &str) -> Result<Vec<(String, String)>> {
    spec.split([',', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (title, id) = entry.split_once('=').ok_or_else(|| {
                AppError::bad_request(format!("DISCUSS_AGENTS entry '{}' is not Title=id", entry))
            })?;
            let (title, id) = (title.trim(), id.trim());
            if title.is_empty() || id.is_empty() {
                return Err(AppError::bad_request(format!(
                    "DISCUSS_AGENTS entry '{}' has an empty side",
                    entry
                )));
            }
            Ok((title.to_string(), id.to_string()))
        })
        .collect()
}
