//! Validation rules
//!
//! A [`Rule`] pairs a `check` predicate with an optional `fix` transform, a
//! severity and a message. [`ValidationRule`] tags a rule with the part of the
//! font it applies to.

use crate::font::{FontMetrics, Glyph, ParsedFont};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How a rule failure affects the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  /// Stops the pass (font/metrics rules) or removes the glyph (glyph rules)
  #[default]
  Error,
  /// Recorded, but the pass continues and the glyph is kept
  Warning,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Error => f.write_str("error"),
      Severity::Warning => f.write_str("warning"),
    }
  }
}

/// The part of a font a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
  Font,
  Glyph,
  Metrics,
  Names,
  Tables,
}

impl fmt::Display for RuleCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RuleCategory::Font => "font",
      RuleCategory::Glyph => "glyph",
      RuleCategory::Metrics => "metrics",
      RuleCategory::Names => "names",
      RuleCategory::Tables => "tables",
    };
    f.write_str(name)
  }
}

type CheckFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type FixFn<T> = Arc<dyn Fn(&T) -> Option<T> + Send + Sync>;

/// A predicate with an optional corrective transform.
///
/// Rules are cheap to clone and can be shared across threads, so one rule set
/// can serve a whole batch of loads.
pub struct Rule<T> {
  check: CheckFn<T>,
  fix: Option<FixFn<T>>,
  pub severity: Severity,
  pub message: Option<String>,
}

impl<T> Clone for Rule<T> {
  fn clone(&self) -> Self {
    Self {
      check: Arc::clone(&self.check),
      fix: self.fix.clone(),
      severity: self.severity,
      message: self.message.clone(),
    }
  }
}

impl<T> fmt::Debug for Rule<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Rule")
      .field("has_fix", &self.fix.is_some())
      .field("severity", &self.severity)
      .field("message", &self.message)
      .finish()
  }
}

impl<T> Rule<T> {
  /// An `error`-severity rule with no fix.
  pub fn new(check: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
    Self {
      check: Arc::new(check),
      fix: None,
      severity: Severity::Error,
      message: None,
    }
  }

  /// Adds a fix. Returning `None` from it is the same as having no fix.
  pub fn with_fix(mut self, fix: impl Fn(&T) -> Option<T> + Send + Sync + 'static) -> Self {
    self.fix = Some(Arc::new(fix));
    self
  }

  pub fn with_severity(mut self, severity: Severity) -> Self {
    self.severity = severity;
    self
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn check(&self, value: &T) -> bool {
    (self.check)(value)
  }

  pub fn has_fix(&self) -> bool {
    self.fix.is_some()
  }

  pub fn fix(&self, value: &T) -> Option<T> {
    self.fix.as_ref().and_then(|fix| fix(value))
  }
}

/// A rule tagged with the stage it runs in.
#[derive(Debug, Clone)]
pub enum ValidationRule {
  Font(Rule<ParsedFont>),
  Names(Rule<ParsedFont>),
  Tables(Rule<ParsedFont>),
  Glyph(Rule<Glyph>),
  Metrics(Rule<FontMetrics>),
}

impl ValidationRule {
  pub fn category(&self) -> RuleCategory {
    match self {
      ValidationRule::Font(_) => RuleCategory::Font,
      ValidationRule::Names(_) => RuleCategory::Names,
      ValidationRule::Tables(_) => RuleCategory::Tables,
      ValidationRule::Glyph(_) => RuleCategory::Glyph,
      ValidationRule::Metrics(_) => RuleCategory::Metrics,
    }
  }

  pub fn severity(&self) -> Severity {
    match self {
      ValidationRule::Font(rule) | ValidationRule::Names(rule) | ValidationRule::Tables(rule) => {
        rule.severity
      }
      ValidationRule::Glyph(rule) => rule.severity,
      ValidationRule::Metrics(rule) => rule.severity,
    }
  }

  /// Font-level rule of `category`, if this is one.
  pub(crate) fn as_font_rule(&self, category: RuleCategory) -> Option<&Rule<ParsedFont>> {
    match (self, category) {
      (ValidationRule::Font(rule), RuleCategory::Font)
      | (ValidationRule::Names(rule), RuleCategory::Names)
      | (ValidationRule::Tables(rule), RuleCategory::Tables) => Some(rule),
      _ => None,
    }
  }

  pub(crate) fn as_glyph_rule(&self) -> Option<&Rule<Glyph>> {
    match self {
      ValidationRule::Glyph(rule) => Some(rule),
      _ => None,
    }
  }

  pub(crate) fn as_metrics_rule(&self) -> Option<&Rule<FontMetrics>> {
    match self {
      ValidationRule::Metrics(rule) => Some(rule),
      _ => None,
    }
  }
}
