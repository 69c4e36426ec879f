//! Error types for the font loader
//!
//! This module provides the error types for all subsystems:
//! - Font errors (family/URL validation, loading, registration)
//! - Sanitizer errors (rule failures, glyph extraction, subsetting)
//! - Resource errors (fetching font bytes)
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use crate::sanitizer::{RuleCategory, Severity};
use thiserror::Error;

/// Result type alias for loader operations
///
/// # Examples
///
/// ```
/// use fontface_loader::Result;
///
/// fn register() -> Result<()> {
///   Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
///
/// Each variant wraps a more specific error type for that subsystem.
///
/// # Examples
///
/// ```
/// use fontface_loader::Error;
/// use fontface_loader::error::FontError;
///
/// fn unload() -> Result<(), Error> {
///   Err(Error::Font(FontError::NotLoaded {
///     family: "Roboto".to_string(),
///   }))
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
  /// Font validation, loading, sanitizing or registration error
  #[error("Font error: {0}")]
  Font(#[from] FontError),

  /// Error while fetching font bytes
  #[error("Resource error: {0}")]
  Resource(#[from] ResourceError),

  /// I/O error (file reading)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues, usually reported by a registry
  #[error("{0}")]
  Other(String),
}

/// Errors raised while validating, loading, cleaning or registering a font
///
/// These are cheap to clone so that the sanitizer and resolver can carry
/// the full failure chain in their results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FontError {
  /// Family name contains characters outside word/space/hyphen, or is empty
  #[error("Font family '{family}' failed validation: {reason}")]
  InvalidFamily { family: String, reason: String },

  /// URL has a disallowed scheme, a non-font extension, or does not parse
  #[error("Font URL '{url}' failed validation: {reason}")]
  InvalidUrl { url: String, reason: String },

  /// Native load did not settle before the deadline
  #[error("Font loading timeout for '{family}' after {timeout_ms}ms")]
  LoadTimeout { family: String, timeout_ms: u64 },

  /// Native load rejected
  #[error("Failed to load font '{family}': {reason}")]
  LoadFailed { family: String, reason: String },

  /// The registry refused the decoded face
  #[error("Failed to register font '{family}': {reason}")]
  RegistrationFailed { family: String, reason: String },

  /// Bytes are not a font the parser understands
  #[error("Invalid font data: {reason}")]
  InvalidFontData { reason: String },

  /// Per-glyph data could not be read from the glyph table
  #[error("Failed to get glyph data: {reason}")]
  GlyphExtraction { reason: String },

  /// A validation rule failed and could not be fixed
  #[error("{category} rule #{index} failed validation ({severity}): {message}")]
  RuleFailed {
    category: RuleCategory,
    index: usize,
    severity: Severity,
    message: String,
  },

  /// Every glyph was removed by glyph rules
  #[error("No glyph survived validation")]
  NoSurvivingGlyphs,

  /// The cleaned font could not be serialized
  #[error("Failed to build subset font: {reason}")]
  SubsetFailed { reason: String },

  /// Resolution was requested for a family with no stored bytes
  #[error("No original buffer stored for '{family}'")]
  MissingBuffer { family: String },

  /// The resolver could not produce a loadable font
  #[error("Font '{family}' could not be resolved by the sanitizer: {message}")]
  Unresolved { family: String, message: String },

  /// Unload or lookup of a family that is not tracked as loaded
  #[error("Font '{family}' is not loaded")]
  NotLoaded { family: String },
}

/// Errors that occur while fetching font bytes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
  /// Transport or HTTP status failure
  #[error("Failed to fetch '{url}': {reason}")]
  FetchFailed { url: String, reason: String },

  /// Server answered with an empty body
  #[error("Empty response body from '{url}' during fetch")]
  EmptyBody { url: String },

  /// Only http and https are fetched
  #[error("Unsupported URL scheme for fetch: '{url}'")]
  UnsupportedScheme { url: String },

  /// Body exceeded the fetcher's size limit
  #[error("Response from '{url}' exceeds {limit} bytes")]
  TooLarge { url: String, limit: usize },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_font_error_wraps_into_error() {
    let err: Error = FontError::NotLoaded {
      family: "Roboto".to_string(),
    }
    .into();
    assert!(matches!(err, Error::Font(FontError::NotLoaded { .. })));
    assert_eq!(err.to_string(), "Font error: Font 'Roboto' is not loaded");
  }

  #[test]
  fn test_timeout_message_mentions_timeout() {
    let err = FontError::LoadTimeout {
      family: "Roboto".to_string(),
      timeout_ms: 5000,
    };
    assert!(err.to_string().contains("timeout"));
    assert!(err.to_string().contains("5000ms"));
  }

  #[test]
  fn test_rule_failure_display() {
    let err = FontError::RuleFailed {
      category: RuleCategory::Glyph,
      index: 2,
      severity: Severity::Warning,
      message: "glyph 7: bounds out of order".to_string(),
    };
    assert_eq!(
      err.to_string(),
      "glyph rule #2 failed validation (warning): glyph 7: bounds out of order"
    );
  }

  #[test]
  fn test_resource_error_into_error() {
    let err: Error = ResourceError::EmptyBody {
      url: "https://example.com/a.ttf".to_string(),
    }
    .into();
    assert!(err.to_string().starts_with("Resource error:"));
  }
}
