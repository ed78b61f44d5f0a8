//! Configuration Scopes
//!
//! Options are plain records where every key is optional. Scopes form an
//! immutable chain; resolving a key walks outward from the nearest scope
//! until some scope sets it, and falls back to the documented default.
//!
//! | key | default |
//! |---|---|
//! | `autoAria` | `true` |
//! | `autoTouch` | `false` |
//! | `autoFormBusy` | `true` |
//! | `defaultErrorStrategy` | `on-touch` |
//! | `strictFieldResolution` | `false` |
//! | `debug` | `false` |

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ErrorDisplayStrategy};

/// One scope's overrides; `None` means inherit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_aria: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_touch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_form_busy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_error_strategy: Option<ErrorDisplayStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_field_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON options record
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn auto_aria(mut self, enabled: bool) -> Self {
        self.auto_aria = Some(enabled);
        self
    }

    pub fn auto_touch(mut self, enabled: bool) -> Self {
        self.auto_touch = Some(enabled);
        self
    }

    pub fn auto_form_busy(mut self, enabled: bool) -> Self {
        self.auto_form_busy = Some(enabled);
        self
    }

    pub fn strategy(mut self, strategy: ErrorDisplayStrategy) -> Self {
        self.default_error_strategy = Some(strategy);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_field_resolution = Some(strict);
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub auto_aria: bool,
    pub auto_touch: bool,
    pub auto_form_busy: bool,
    pub default_error_strategy: ErrorDisplayStrategy,
    pub strict_field_resolution: bool,
    pub debug: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            auto_aria: true,
            auto_touch: false,
            auto_form_busy: true,
            default_error_strategy: ErrorDisplayStrategy::OnTouch,
            strict_field_resolution: false,
            debug: false,
        }
    }
}

#[derive(Debug)]
struct ScopeNode {
    options: Options,
    parent: Option<ConfigScope>,
}

/// A link in the configuration chain. Cloning shares the link.
#[derive(Debug, Clone)]
pub struct ConfigScope {
    node: Rc<ScopeNode>,
}

impl Default for ConfigScope {
    fn default() -> Self {
        Self::root(Options::default())
    }
}

impl ConfigScope {
    /// Independent root scope
    pub fn root(options: Options) -> Self {
        let node = ScopeNode {
            options,
            parent: None,
        };
        Self { node: Rc::new(node) }
    }

    /// Nested scope overriding some keys of `self`
    pub fn child(&self, options: Options) -> Self {
        let node = ScopeNode {
            options,
            parent: Some(self.clone()),
        };
        Self { node: Rc::new(node) }
    }

    pub fn options(&self) -> &Options {
        &self.node.options
    }

    pub fn parent(&self) -> Option<&ConfigScope> {
        self.node.parent.as_ref()
    }

    /// Number of enclosing scopes
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |scope| scope.parent()).count()
    }

    /// Nearest value set for a key
    pub fn lookup<T>(&self, pick: impl Fn(&Options) -> Option<T>) -> Option<T> {
        std::iter::successors(Some(self), |scope| scope.parent())
            .find_map(|scope| pick(scope.options()))
    }

    pub fn resolve(&self) -> ResolvedConfig {
        let defaults = ResolvedConfig::default();
        ResolvedConfig {
            auto_aria: self.lookup(|o| o.auto_aria).unwrap_or(defaults.auto_aria),
            auto_touch: self.lookup(|o| o.auto_touch).unwrap_or(defaults.auto_touch),
            auto_form_busy: self.lookup(|o| o.auto_form_busy).unwrap_or(defaults.auto_form_busy),
            default_error_strategy: self
                .lookup(|o| o.default_error_strategy)
                .unwrap_or(defaults.default_error_strategy),
            strict_field_resolution: self
                .lookup(|o| o.strict_field_resolution)
                .unwrap_or(defaults.strict_field_resolution),
            debug: self.lookup(|o| o.debug).unwrap_or(defaults.debug),
        }
    }
}
