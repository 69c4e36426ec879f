//! Recovery path for fonts the registry refused
//!
//! The resolver re-parses the original bytes and sends them through the
//! [`Sanitizer`]. It never retries: one call is one parse and one sanitize pass.

use crate::error::FontError;
use crate::font::ParsedFont;
use crate::sanitizer::{Sanitizer, SanitizerResult, ValidationRule};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FontResolver {
  sanitizer: Sanitizer,
}

impl FontResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// Tries to turn `original` into a loadable font.
  ///
  /// `error` is the failure that triggered resolution; it heads the error list
  /// of the result either way. Parse failures come back as an unsuccessful
  /// result rather than an `Err`.
  pub fn resolve(&self, original: &[u8], error: FontError, rules: &[ValidationRule]) -> SanitizerResult {
    let mut errors = vec![error];

    let font = match ParsedFont::parse(original) {
      Ok(font) => font,
      Err(err) => {
        debug!(error = %err, bytes = original.len(), "resolver could not parse font");
        errors.push(err);
        return SanitizerResult::failure("Font could not be parsed for resolution", errors);
      }
    };

    let result = self.sanitizer.sanitize(&font, rules);
    errors.extend(result.errors);
    debug!(family = %font.family_name, success = result.success, "resolver finished");

    SanitizerResult {
      message: if result.success {
        result.message
      } else {
        format!("Font could not be resolved: {}", result.message)
      },
      errors,
      ..result
    }
  }
}
