//! Categorized load failures
//!
//! Every failure the loader records ends up as a [`FontLoadError`] in the
//! loader's [`ErrorTable`], one entry per family. Typed errors are mapped to an
//! [`ErrorCategory`] by variant; opaque ones (I/O text, registry messages) fall
//! back to keyword matching on the message.

use crate::error::{Error, FontError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
  Timeout,
  Network,
  Format,
  Security,
  Validation,
  Sanitizer,
  /// The registry rejected the face
  #[serde(rename = "DOMException")]
  DomException,
  Unknown,
}

impl ErrorCategory {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorCategory::Timeout => "timeout",
      ErrorCategory::Network => "network",
      ErrorCategory::Format => "format",
      ErrorCategory::Security => "security",
      ErrorCategory::Validation => "validation",
      ErrorCategory::Sanitizer => "sanitizer",
      ErrorCategory::DomException => "DOMException",
      ErrorCategory::Unknown => "unknown",
    }
  }

  /// Human summary stored as the record message.
  pub fn summary(self) -> &'static str {
    match self {
      ErrorCategory::Timeout => "Font loading timed out",
      ErrorCategory::Network => "Network error while loading font",
      ErrorCategory::Format => "Invalid font format or corrupted font",
      ErrorCategory::Security => "Security error while loading font",
      ErrorCategory::Validation => "Font failed validation checks",
      ErrorCategory::Sanitizer => "Font could not be repaired by the sanitizer",
      ErrorCategory::DomException => "Font registry rejected the font",
      ErrorCategory::Unknown => "An unknown error occurred while loading font",
    }
  }

  /// Keyword fallback for errors that only carry text.
  pub fn classify(message: &str) -> Self {
    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
      ErrorCategory::Timeout
    } else if lower.contains("illegal string") {
      ErrorCategory::DomException
    } else if lower.contains("network") || lower.contains("fetch") {
      ErrorCategory::Network
    } else if lower.contains("format") || lower.contains("invalid font") {
      ErrorCategory::Format
    } else if lower.contains("security") || lower.contains("cors") {
      ErrorCategory::Security
    } else if lower.contains("validation") {
      ErrorCategory::Validation
    } else if lower.contains("sanitizer") {
      ErrorCategory::Sanitizer
    } else {
      ErrorCategory::Unknown
    }
  }

  pub fn of_font_error(err: &FontError) -> Self {
    match err {
      FontError::InvalidFamily { .. } | FontError::InvalidUrl { .. } => ErrorCategory::Validation,
      FontError::LoadTimeout { .. } => ErrorCategory::Timeout,
      FontError::LoadFailed { reason, .. } => Self::classify(reason),
      FontError::RegistrationFailed { .. } => ErrorCategory::DomException,
      FontError::InvalidFontData { .. } | FontError::GlyphExtraction { .. } => ErrorCategory::Format,
      FontError::RuleFailed { .. }
      | FontError::NoSurvivingGlyphs
      | FontError::SubsetFailed { .. }
      | FontError::MissingBuffer { .. }
      | FontError::Unresolved { .. } => ErrorCategory::Sanitizer,
      FontError::NotLoaded { .. } => ErrorCategory::Unknown,
    }
  }

  pub fn of(err: &Error) -> Self {
    match err {
      Error::Font(font) => Self::of_font_error(font),
      Error::Resource(_) => ErrorCategory::Network,
      Error::Io(io) => Self::classify(&io.to_string()),
      Error::Other(message) => Self::classify(message),
    }
  }
}

impl fmt::Display for ErrorCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One recorded failure.
#[derive(Debug, Clone)]
pub struct FontLoadError {
  pub category: ErrorCategory,
  pub message: String,
  pub details: Vec<String>,
  /// The error the record was built from
  pub source: Option<Arc<Error>>,
}

impl FontLoadError {
  pub fn new(category: ErrorCategory, details: Vec<String>) -> Self {
    Self {
      category,
      message: category.summary().to_string(),
      details,
      source: None,
    }
  }

  pub fn from_error(err: Error) -> Self {
    let category = ErrorCategory::of(&err);
    Self {
      details: vec![err.to_string()],
      source: Some(Arc::new(err)),
      ..Self::new(category, Vec::new())
    }
  }

  /// Record whose details list every error of a failed sanitize/resolve pass.
  pub fn from_chain(category: ErrorCategory, head: Error, chain: &[FontError]) -> Self {
    let mut details = vec![head.to_string()];
    details.extend(chain.iter().map(ToString::to_string));
    Self {
      details,
      source: Some(Arc::new(head)),
      ..Self::new(category, Vec::new())
    }
  }
}

impl From<FontError> for FontLoadError {
  fn from(err: FontError) -> Self {
    Self::from_error(Error::Font(err))
  }
}

impl From<Error> for FontLoadError {
  fn from(err: Error) -> Self {
    Self::from_error(err)
  }
}

impl fmt::Display for FontLoadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}] {}", self.category, self.message)?;
    if let Some(first) = self.details.first() {
      write!(f, ": {}", first)?;
    }
    Ok(())
  }
}

/// Latest error per family. Recording a family again replaces its entry.
#[derive(Debug, Clone, Default)]
pub struct ErrorTable {
  entries: BTreeMap<String, FontLoadError>,
}

impl ErrorTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, family: impl Into<String>, error: FontLoadError) {
    self.entries.insert(family.into(), error);
  }

  pub fn get(&self, family: &str) -> Option<&FontLoadError> {
    self.entries.get(family)
  }

  pub fn has(&self, family: &str) -> bool {
    self.entries.contains_key(family)
  }

  pub fn remove(&mut self, family: &str) -> Option<FontLoadError> {
    self.entries.remove(family)
  }

  pub fn families(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &FontLoadError)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
