//! ARIA Support
//!
//! Roles, live-region modes and the attribute set attached to a field.

use std::collections::HashMap;
use std::str::FromStr;

use crate::A11yError;

/// Role of a message container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    /// At least one blocking error; announced assertively
    Alert,
    /// Warnings only; announced politely
    Status,
}

impl AriaRole {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_lowercase().as_str() {
            "alert" => Self::Alert,
            "status" => Self::Status,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Status => "status",
        }
    }

    /// Implicit `aria-live` value of the role
    pub fn live_mode(&self) -> LiveRegionMode {
        match self {
            Self::Alert => LiveRegionMode::Assertive,
            Self::Status => LiveRegionMode::Polite,
        }
    }
}

impl FromStr for AriaRole {
    type Err = A11yError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| A11yError::InvalidRole(s.to_string()))
    }
}

/// Live region mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveRegionMode {
    Off,
    Polite,
    Assertive,
}

impl LiveRegionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Polite => "polite",
            Self::Assertive => "assertive",
        }
    }
}

/// Attributes derived for one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibilityAttributes {
    /// `aria-invalid` on the control
    pub invalid: bool,
    /// `aria-describedby` on the control, errors before warnings
    pub described_by: Vec<String>,
    /// Role of the message container, `None` when nothing is displayed
    pub role: Option<AriaRole>,
}

impl AccessibilityAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_mode(&self) -> LiveRegionMode {
        self.role.map(|r| r.live_mode()).unwrap_or(LiveRegionMode::Off)
    }

    /// Attributes to set on the form control
    pub fn control_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("aria-invalid", self.invalid.to_string())];
        if !self.described_by.is_empty() {
            attrs.push(("aria-describedby", self.described_by.join(" ")));
        }
        attrs
    }

    /// Attributes to set on the message container
    pub fn container_attributes(&self) -> Vec<(&'static str, String)> {
        match self.role {
            Some(role) => vec![
                ("role", role.as_str().to_string()),
                ("aria-live", role.live_mode().as_str().to_string()),
            ],
            None => Vec::new(),
        }
    }

    /// Parse back from rendered HTML attributes (control and container merged)
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Result<Self, A11yError> {
        let mut aria = Self::new();

        if let Some(value) = attrs.get("aria-invalid") {
            aria.invalid = match value.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(A11yError::InvalidBoolean {
                        attribute: "aria-invalid".into(),
                        value: other.to_string(),
                    });
                }
            };
        }
        if let Some(ids) = attrs.get("aria-describedby") {
            aria.described_by = ids.split_whitespace().map(String::from).collect();
        }
        if let Some(role) = attrs.get("role") {
            aria.role = Some(role.parse()?);
        }

        Ok(aria)
    }
}

/// `aria-busy` for a form element
pub fn busy_attribute(busy: bool) -> (&'static str, String) {
    ("aria-busy", busy.to_string())
}
