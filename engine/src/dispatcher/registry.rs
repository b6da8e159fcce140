//! Static registry of design agents
//!
//! Agents are listed in a fixed table rather than discovered at runtime. The
//! table is checked once at start-up; callers only ever see the numeric id
//! the classifier picked.

use sdk::EngineError;
use serde::Serialize;
use std::collections::HashSet;

use crate::design::{AgentContext, DesignAgent, FirstOrderStableAgent};

/// Constructor selector for an agent family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFamily {
    FirstOrderStable,
}

impl AgentFamily {
    pub fn build(self, context: AgentContext) -> Box<dyn DesignAgent> {
        match self {
            AgentFamily::FirstOrderStable => Box::new(FirstOrderStableAgent::new(context)),
        }
    }
}

/// One registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentEntry {
    pub id: i64,
    pub name: &'static str,
    pub family: AgentFamily,
}

/// Agents shipped with the engine
pub const BUILTIN_AGENTS: &[AgentEntry] = &[AgentEntry {
    id: 1,
    name: FirstOrderStableAgent::NAME,
    family: AgentFamily::FirstOrderStable,
}];

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    entries: Vec<AgentEntry>,
}

impl AgentRegistry {
    /// Registry over [`BUILTIN_AGENTS`]
    pub fn builtin() -> Result<Self, EngineError> {
        Self::new(BUILTIN_AGENTS.to_vec())
    }

    /// Build a registry, rejecting empty or duplicate ids and names
    pub fn new(entries: Vec<AgentEntry>) -> Result<Self, EngineError> {
        if entries.is_empty() {
            return Err(EngineError::Registry("no agents registered".to_string()));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(EngineError::Registry(format!(
                    "agent {} has an empty name",
                    entry.id
                )));
            }
            if !ids.insert(entry.id) {
                return Err(EngineError::Registry(format!(
                    "duplicate agent id {}",
                    entry.id
                )));
            }
            if !names.insert(entry.name) {
                return Err(EngineError::Registry(format!(
                    "duplicate agent name '{}'",
                    entry.name
                )));
            }
        }

        tracing::debug!("Agent registry holds {} agent(s)", entries.len());
        Ok(Self { entries })
    }

    pub fn get(&self, id: i64) -> Option<&AgentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Markdown list of the agents, as shown to the classifier
    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- **Agent {}**: {}", e.id, e.name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
