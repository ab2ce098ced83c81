// src/milestone/status.rs

//! Typed milestone status, parsed from the free-text status cells planning
//! documents use ("Complete (2025-01-03)", "🚧 In Progress", ...).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::errors::ForgeError;

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[^\w\s(]+\s*)?(completed?|done|in[\s_-]*progress|wip|planned|pending|not[\s_-]*started|todo)\s*(?:\(\s*(\d{4}-\d{2}-\d{2})\s*\))?\s*$",
    )
    .expect("milestone status regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MilestoneStatus {
    Planned,
    InProgress,
    Complete { date: Option<NaiveDate> },
}

impl MilestoneStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, MilestoneStatus::Complete { .. })
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneStatus::Planned => f.write_str("Planned"),
            MilestoneStatus::InProgress => f.write_str("In Progress"),
            MilestoneStatus::Complete { date: None } => f.write_str("Complete"),
            MilestoneStatus::Complete { date: Some(d) } => {
                write!(f, "Complete ({})", d.format("%Y-%m-%d"))
            }
        }
    }
}

impl FromStr for MilestoneStatus {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ForgeError::Validation(format!("unrecognised milestone status: {s:?}"));

        let caps = STATUS_RE.captures(s).ok_or_else(invalid)?;
        let keyword = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .ok_or_else(invalid)?;
        let date = match caps.get(2) {
            Some(m) => Some(
                NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").map_err(|e| {
                    ForgeError::Validation(format!("invalid date in milestone status {s:?}: {e}"))
                })?,
            ),
            None => None,
        };

        let keyword: String = keyword.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        let status = match keyword.as_str() {
            "complete" | "completed" | "done" => MilestoneStatus::Complete { date },
            "inprogress" | "wip" => MilestoneStatus::InProgress,
            "planned" | "pending" | "notstarted" | "todo" => MilestoneStatus::Planned,
            _ => return Err(invalid()),
        };

        if date.is_some() && !status.is_complete() {
            return Err(ForgeError::Validation(format!(
                "only completed milestones may carry a date: {s:?}"
            )));
        }

        Ok(status)
    }
}

/// Milestone numbers whose status is complete.
pub fn completed_from_statuses(statuses: &BTreeMap<u32, MilestoneStatus>) -> BTreeSet<u32> {
    statuses
        .iter()
        .filter(|(_, status)| status.is_complete())
        .map(|(n, _)| *n)
        .collect()
}
