//! Reduction of issue lists to a score and letter grade

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{validate, Severity, ValidationIssue};
use crate::types::WorkflowGraph;

/// Letter grade derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// Score an issue list from 0 to 100
///
/// Any error caps the score at 40, any warning at 90; info issues never
/// lower it.
pub fn score(issues: &[ValidationIssue]) -> u8 {
    let errors = count(issues, Severity::Error);
    let warnings = count(issues, Severity::Warning);

    if errors > 0 {
        40usize.saturating_sub(10 * errors) as u8
    } else if warnings > 0 {
        90usize.saturating_sub(10 * warnings).max(60) as u8
    } else {
        100
    }
}

pub fn grade(score: u8) -> Grade {
    match score {
        90.. => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

fn count(issues: &[ValidationIssue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

/// Issues for a graph together with their score and grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub score: u8,
    pub grade: Grade,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let score = score(&issues);
        Self {
            score,
            grade: grade(score),
            error_count: count(&issues, Severity::Error),
            warning_count: count(&issues, Severity::Warning),
            info_count: count(&issues, Severity::Info),
            issues,
        }
    }

    /// Validate `graph` and score the result
    pub fn analyze(graph: &WorkflowGraph) -> Self {
        Self::from_issues(validate(graph))
    }

    /// True when no error-severity issue was found
    pub fn can_execute(&self) -> bool {
        self.error_count == 0
    }
}
