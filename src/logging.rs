//! Per-loader log gate
//!
//! Each [`crate::FontLoader`] owns a [`Logger`] that filters by its configured
//! minimum level (and warning suppression) before handing events to `tracing`.
//! Subscribers still apply their own filters on top.

use crate::config::{LoaderOptions, LogLevel};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
  prefix: String,
  min_level: LogLevel,
  warnings_disabled: bool,
}

impl Default for Logger {
  fn default() -> Self {
    Self::new("FontLoader", LogLevel::Info)
  }
}

impl Logger {
  pub fn new(prefix: impl Into<String>, min_level: LogLevel) -> Self {
    Self {
      prefix: prefix.into(),
      min_level,
      warnings_disabled: false,
    }
  }

  pub fn from_options(options: &LoaderOptions) -> Self {
    Self::new("FontLoader", options.debug_level).with_warnings_disabled(options.disable_warnings)
  }

  pub fn with_warnings_disabled(mut self, disabled: bool) -> Self {
    self.warnings_disabled = disabled;
    self
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn min_level(&self) -> LogLevel {
    self.min_level
  }

  pub fn enabled(&self, level: LogLevel) -> bool {
    if level == LogLevel::Warn && self.warnings_disabled {
      return false;
    }
    level >= self.min_level
  }

  pub fn debug(&self, message: impl fmt::Display) {
    if self.enabled(LogLevel::Debug) {
      tracing::debug!(prefix = %self.prefix, "{}", message);
    }
  }

  pub fn info(&self, message: impl fmt::Display) {
    if self.enabled(LogLevel::Info) {
      tracing::info!(prefix = %self.prefix, "{}", message);
    }
  }

  pub fn warn(&self, message: impl fmt::Display) {
    if self.enabled(LogLevel::Warn) {
      tracing::warn!(prefix = %self.prefix, "{}", message);
    }
  }

  pub fn error(&self, message: impl fmt::Display) {
    if self.enabled(LogLevel::Error) {
      tracing::error!(prefix = %self.prefix, "{}", message);
    }
  }
}
