//! Answer values and the canonical answer string sent to the backend.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{LABEL_NO, LABEL_PARTIAL, LABEL_YES};

/// Outcome of crossing a decision zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Partial,
}

impl Answer {
    pub const ALL: [Self; 3] = [Self::No, Self::Partial, Self::Yes];

    /// Lane index (left to right) that selects this answer.
    #[must_use]
    pub const fn lane_index(self) -> usize {
        match self {
            Self::No => 0,
            Self::Partial => 1,
            Self::Yes => 2,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Display labels written into answer strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLabels {
    #[serde(default = "AnswerLabels::default_yes")]
    pub yes: String,
    #[serde(default = "AnswerLabels::default_no")]
    pub no: String,
    #[serde(default = "AnswerLabels::default_partial")]
    pub partial: String,
}

impl AnswerLabels {
    fn default_yes() -> String {
        LABEL_YES.to_string()
    }

    fn default_no() -> String {
        LABEL_NO.to_string()
    }

    fn default_partial() -> String {
        LABEL_PARTIAL.to_string()
    }

    #[must_use]
    pub fn label(&self, answer: Answer) -> &str {
        match answer {
            Answer::Yes => &self.yes,
            Answer::No => &self.no,
            Answer::Partial => &self.partial,
        }
    }
}

impl Default for AnswerLabels {
    fn default() -> Self {
        Self {
            yes: Self::default_yes(),
            no: Self::default_no(),
            partial: Self::default_partial(),
        }
    }
}

/// Build the canonical `"<question>: <label>"` answer string.
///
/// The question text is passed through verbatim. A question that itself
/// contains `": "` cannot be split back unambiguously by the backend.
#[must_use]
pub fn format_answer(question_text: &str, answer_label: &str) -> String {
    format!("{question_text}: {answer_label}")
}
