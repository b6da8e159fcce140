//! Design Memory
//!
//! Append-only log of the design attempts made for one task. Each attempt
//! pairs the parameters the proposer suggested with the performance the
//! oracle measured. Attempts are never edited or removed, so the ordinal of
//! an attempt is fixed the moment it is added.

use sdk::{EngineError, Parameters, Performance, TaskDesignResult};

/// One recorded design attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DesignAttempt {
    pub parameters: Parameters,
    pub performance: Performance,
    /// 1-based insertion position
    pub ordinal: usize,
}

impl DesignAttempt {
    /// Externally visible snapshot of this attempt
    pub fn to_result(&self, success: bool) -> TaskDesignResult {
        TaskDesignResult::new(
            success,
            self.parameters.clone(),
            self.performance.clone(),
            self.ordinal as i64,
        )
    }
}

/// Ordered history of attempts for a single agent instance
#[derive(Debug, Clone, Default)]
pub struct DesignMemory {
    attempts: Vec<DesignAttempt>,
}

impl DesignMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt and return it
    pub fn add(&mut self, parameters: Parameters, performance: Performance) -> &DesignAttempt {
        let ordinal = self.attempts.len() + 1;
        self.attempts.push(DesignAttempt {
            parameters,
            performance,
            ordinal,
        });
        tracing::debug!("Recorded design attempt {}", ordinal);
        &self.attempts[ordinal - 1]
    }

    /// Most recent attempt
    pub fn latest(&self) -> Result<&DesignAttempt, EngineError> {
        self.attempts.last().ok_or(EngineError::EmptyMemory)
    }

    /// Every attempt in insertion order
    ///
    /// Each call starts a fresh pass over the history.
    pub fn all(&self) -> impl Iterator<Item = &DesignAttempt> + '_ {
        self.attempts.iter()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
