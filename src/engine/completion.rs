// src/engine/completion.rs

use std::{collections::HashSet, str::FromStr};

use crate::models::{course::ContentUnit, progress::CompletionStatus};

/// Which content units count toward course completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// Only units flagged `required`.
    #[default]
    RequiredOnly,
    /// Every unit of the course, regardless of its flag.
    AllUnits,
}

impl FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" | "required_only" => Ok(CompletionPolicy::RequiredOnly),
            "all" | "all_units" => Ok(CompletionPolicy::AllUnits),
            other => Err(format!("unknown completion policy '{}'", other)),
        }
    }
}

impl CompletionPolicy {
    pub fn counts(&self, unit: &ContentUnit) -> bool {
        match self {
            CompletionPolicy::RequiredOnly => unit.required,
            CompletionPolicy::AllUnits => true,
        }
    }

    /// Compares the learner's completed units with the units that count.
    ///
    /// Completed units outside the counted set (optional or deleted units)
    /// never contribute, and a course with nothing to count is never complete.
    pub fn evaluate(&self, units: &[ContentUnit], completed: &[i64]) -> CompletionStatus {
        let counted: HashSet<i64> = units
            .iter()
            .filter(|u| self.counts(u))
            .map(|u| u.id)
            .collect();
        let done: HashSet<i64> = completed.iter().copied().collect();

        let completed_count = counted.intersection(&done).count() as i64;
        let required_count = counted.len() as i64;

        CompletionStatus {
            completed_count,
            required_count,
            is_complete: required_count > 0 && completed_count == required_count,
        }
    }
}
