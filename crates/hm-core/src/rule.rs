//! Declared rules
//!
//! A declared rule is the user's intent: which header to touch, how, and on
//! which URLs. Records are validated once at creation and stored as-is.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::HeaderOperation;

/// Error type for rule creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Header name is required")]
    EmptyHeaderName,
    #[error("Header value is required unless removing")]
    MissingHeaderValue,
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

/// What a declared rule does to its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Set,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for Operation {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "set" => Ok(Self::Set),
            "remove" => Ok(Self::Remove),
            other => Err(RuleError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Operation> for HeaderOperation {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Set => HeaderOperation::Set,
            Operation::Remove => HeaderOperation::Remove,
        }
    }
}

/// A persisted, user-authored rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredRule {
    pub id: String,
    #[serde(default)]
    pub domain_pattern: String,
    pub operation: Operation,
    pub header_name: String,
    #[serde(default)]
    pub header_value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Form input for a new rule, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRule {
    pub domain_pattern: String,
    pub operation: Operation,
    pub header_name: String,
    pub header_value: String,
}

impl DeclaredRule {
    /// Validate form input and build an enabled rule with a fresh id.
    pub fn create(input: NewRule) -> Result<Self, RuleError> {
        Self::create_with_id(generate_rule_id(), input)
    }

    /// Same as [`DeclaredRule::create`] with a caller-chosen id.
    pub fn create_with_id(id: impl Into<String>, input: NewRule) -> Result<Self, RuleError> {
        let header_name = input.header_name.trim();
        if header_name.is_empty() {
            return Err(RuleError::EmptyHeaderName);
        }

        let header_value = match input.operation {
            Operation::Remove => String::new(),
            Operation::Set => {
                let value = input.header_value.trim();
                if value.is_empty() {
                    return Err(RuleError::MissingHeaderValue);
                }
                value.to_string()
            }
        };

        Ok(Self {
            id: id.into(),
            domain_pattern: input.domain_pattern.trim().to_string(),
            operation: input.operation,
            header_name: header_name.to_string(),
            header_value,
            enabled: true,
        })
    }

    /// True when the pattern is blank and the rule applies to every URL.
    #[inline]
    pub fn applies_to_all_sites(&self) -> bool {
        self.domain_pattern.trim().is_empty()
    }

    /// Site column for list display.
    pub fn site_label(&self) -> &str {
        if self.applies_to_all_sites() {
            "All Sites"
        } else {
            &self.domain_pattern
        }
    }

    /// Action column for list display, e.g. `Set X-Test -> "1"`.
    pub fn action_label(&self) -> String {
        match self.operation {
            Operation::Set => format!("Set {} -> \"{}\"", self.header_name, self.header_value),
            Operation::Remove => format!("Remove {}", self.header_name),
        }
    }
}

/// `rule_<unix millis>_<7 base-36 chars>`.
pub fn generate_rule_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut entropy = uuid::Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(7);
    for _ in 0..7 {
        let digit = (entropy % 36) as u32;
        entropy /= 36;
        suffix.push(char::from_digit(digit, 36).unwrap_or('0'));
    }
    format!("rule_{millis}_{suffix}")
}
