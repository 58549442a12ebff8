//! User-facing notices.

use serde::{Deserialize, Serialize};

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Confirmation of something the user did.
    Info,
    /// A failure the user has to react to.
    Destructive,
}

/// A short message for the presentation layer (toast, alert, status line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            severity: Severity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            severity: Severity::Destructive,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_destructive(&self) -> bool {
        self.severity == Severity::Destructive
    }
}

impl core::fmt::Display for Notice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.title, description),
            None => f.write_str(&self.title),
        }
    }
}
