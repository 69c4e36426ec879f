//! Font sanitizer
//!
//! Runs caller-supplied [`ValidationRule`]s over a [`ParsedFont`] and rebuilds a
//! clean TrueType binary from whatever survives.
//!
//! # Stages
//!
//! 1. **Font rules**: `font`, then `names`, then `tables` rules against the whole
//!    font. A fix replaces the working font.
//! 2. **Glyph extraction**: per-glyph records from `glyf`. Fonts without
//!    TrueType outlines stop here.
//! 3. **Glyph rules**: every glyph is checked; unfixable `error` failures remove
//!    the glyph, and composites that reference a removed glyph go with it.
//!    `.notdef` is blanked instead of dropped.
//! 4. **Metrics rules**: against [`FontMetrics`] recomputed from the working font.
//! 5. **Subset**: the surviving glyphs and (possibly fixed) metrics are written
//!    out through [`crate::font::subset`].
//!
//! An `error`-severity failure in stages 1 or 4, a failure in stages 2 or 5, or
//! the removal of every glyph is a hard stop. The result then carries
//! `success = false` and every error collected so far.

pub mod builtin;
pub mod rules;

pub use rules::{Rule, RuleCategory, Severity, ValidationRule};

use crate::error::FontError;
use crate::font::{subset, FontMetrics, Glyph, ParsedFont};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Counters for one rule category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
  /// Items inspected (rules for font/metrics, glyphs for glyph rules)
  pub total: usize,
  pub valid: usize,
  pub fixed: usize,
  pub removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SanitizerStats {
  pub font: CategoryStats,
  pub glyphs: CategoryStats,
  pub metrics: CategoryStats,
}

/// Outcome of one sanitize pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizerResult {
  pub success: bool,
  /// Cleaned TrueType binary, present on success
  pub font: Option<Vec<u8>>,
  pub message: String,
  /// Present on success only
  pub stats: Option<SanitizerStats>,
  /// Every failure recorded during the pass, in order
  pub errors: Vec<FontError>,
}

impl SanitizerResult {
  pub(crate) fn failure(message: impl Into<String>, errors: Vec<FontError>) -> Self {
    Self {
      success: false,
      font: None,
      message: message.into(),
      stats: None,
      errors,
    }
  }
}

enum Outcome<T> {
  Valid,
  Fixed(T),
  Failed,
}

fn apply<T>(rule: &Rule<T>, value: &T) -> Outcome<T> {
  if rule.check(value) {
    return Outcome::Valid;
  }
  match rule.fix(value) {
    Some(fixed) => Outcome::Fixed(fixed),
    None => Outcome::Failed,
  }
}

fn rule_failure<T>(category: RuleCategory, index: usize, rule: &Rule<T>, subject: Option<String>) -> FontError {
  let message = rule
    .message
    .clone()
    .unwrap_or_else(|| "check failed".to_string());
  FontError::RuleFailed {
    category,
    index,
    severity: rule.severity,
    message: match subject {
      Some(subject) => format!("{}: {}", subject, message),
      None => message,
    },
  }
}

/// Stateless sanitizer; one instance can serve any number of passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer;

impl Sanitizer {
  pub fn new() -> Self {
    Self
  }

  /// Validates `font` against `rules` and, if nothing hard-stops, returns a
  /// rebuilt font containing only the surviving glyphs.
  pub fn sanitize(&self, font: &ParsedFont, rules: &[ValidationRule]) -> SanitizerResult {
    let mut errors = Vec::new();
    let mut stats = SanitizerStats::default();

    // Stage 1: whole-font rules
    let mut working = font.clone();
    for category in [RuleCategory::Font, RuleCategory::Names, RuleCategory::Tables] {
      for (index, rule) in rules.iter().enumerate() {
        let Some(rule) = rule.as_font_rule(category) else {
          continue;
        };
        stats.font.total += 1;
        match apply(rule, &working) {
          Outcome::Valid => stats.font.valid += 1,
          Outcome::Fixed(fixed) => {
            trace!(%category, index, "font rule fixed");
            working = fixed;
            stats.font.fixed += 1;
          }
          Outcome::Failed => {
            let err = rule_failure(category, index, rule, None);
            errors.push(err.clone());
            if rule.severity == Severity::Error {
              debug!(family = %font.family_name, error = %err, "sanitizer stopped at font rules");
              return SanitizerResult::failure(err.to_string(), errors);
            }
          }
        }
      }
    }

    // Stage 2: glyph extraction
    let glyphs = match working.glyph_data() {
      Ok(glyphs) => glyphs,
      Err(err) => {
        debug!(family = %font.family_name, error = %err, "sanitizer could not extract glyphs");
        let message = err.to_string();
        errors.push(err);
        return SanitizerResult::failure(message, errors);
      }
    };

    // Stage 3: glyph rules
    let glyph_rules: Vec<(usize, &Rule<Glyph>)> = rules
      .iter()
      .enumerate()
      .filter_map(|(index, rule)| rule.as_glyph_rule().map(|rule| (index, rule)))
      .collect();
    let survivors = match self.run_glyph_rules(glyphs, &glyph_rules, &mut stats, &mut errors) {
      Some(survivors) => survivors,
      None => {
        let err = FontError::NoSurvivingGlyphs;
        let message = err.to_string();
        errors.push(err);
        return SanitizerResult::failure(message, errors);
      }
    };

    // Stage 4: metrics rules
    let mut metrics = working.metrics();
    for (index, rule) in rules.iter().enumerate() {
      let Some(rule) = rule.as_metrics_rule() else {
        continue;
      };
      stats.metrics.total += 1;
      match apply(rule, &metrics) {
        Outcome::Valid => stats.metrics.valid += 1,
        Outcome::Fixed(fixed) => {
          metrics = fixed;
          stats.metrics.fixed += 1;
        }
        Outcome::Failed => {
          let err = rule_failure(RuleCategory::Metrics, index, rule, None);
          errors.push(err.clone());
          if rule.severity == Severity::Error {
            debug!(family = %font.family_name, error = %err, "sanitizer stopped at metrics rules");
            return SanitizerResult::failure(err.to_string(), errors);
          }
        }
      }
    }

    // Stage 5: subset
    working.units_per_em = metrics.units_per_em;
    working.ascender = metrics.ascender;
    working.descender = metrics.descender;
    working.bounds = metrics.bounds();
    match subset::write_font(&working, &survivors, &metrics) {
      Ok(bytes) => {
        debug!(
          family = %working.family_name,
          glyphs = survivors.len(),
          removed = stats.glyphs.removed,
          bytes = bytes.len(),
          "sanitized font"
        );
        SanitizerResult {
          success: true,
          font: Some(bytes),
          message: format!(
            "Sanitized '{}': {} glyphs kept, {} fixed, {} removed",
            working.family_name,
            survivors.len(),
            stats.glyphs.fixed,
            stats.glyphs.removed
          ),
          stats: Some(stats),
          errors,
        }
      }
      Err(err) => {
        let message = err.to_string();
        errors.push(err);
        SanitizerResult::failure(message, errors)
      }
    }
  }

  /// Checks every glyph and returns the survivors in glyph order, or `None` if
  /// nothing survives.
  fn run_glyph_rules(
    &self,
    glyphs: BTreeMap<u16, Glyph>,
    rules: &[(usize, &Rule<Glyph>)],
    stats: &mut SanitizerStats,
    errors: &mut Vec<FontError>,
  ) -> Option<Vec<Glyph>> {
    let mut checked = BTreeMap::new();
    let mut removed = BTreeSet::new();
    let mut fixed = BTreeSet::new();

    for (gid, mut glyph) in glyphs {
      let mut remove = false;
      for &(index, rule) in rules {
        match apply(rule, &glyph) {
          Outcome::Valid => {}
          Outcome::Fixed(patched) => {
            glyph = patched;
            fixed.insert(gid);
          }
          Outcome::Failed => {
            errors.push(rule_failure(RuleCategory::Glyph, index, rule, Some(format!("glyph {}", gid))));
            if rule.severity == Severity::Error {
              remove = true;
            }
          }
        }
      }
      if remove {
        removed.insert(gid);
      }
      checked.insert(gid, glyph);
    }

    // Composites lose their meaning once a component is gone.
    loop {
      let orphaned: Vec<u16> = checked
        .iter()
        .filter(|(gid, glyph)| {
          !removed.contains(*gid)
            && glyph
              .components()
              .iter()
              .any(|c| removed.contains(c) || !checked.contains_key(c))
        })
        .map(|(gid, _)| *gid)
        .collect();
      if orphaned.is_empty() {
        break;
      }
      for gid in orphaned {
        trace!(glyph = gid, "removing composite with a removed component");
        removed.insert(gid);
      }
    }

    stats.glyphs.total = checked.len();
    stats.glyphs.removed = removed.len();
    stats.glyphs.fixed = fixed.difference(&removed).count();
    stats.glyphs.valid = stats.glyphs.total - stats.glyphs.removed - stats.glyphs.fixed;
    if removed.len() == checked.len() {
      return None;
    }

    Some(
      checked
        .into_iter()
        .filter_map(|(gid, glyph)| match (removed.contains(&gid), gid) {
          (false, _) => Some(glyph),
          (true, 0) => Some(glyph.cleared()),
          (true, _) => None,
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::font::GlyphBounds;

  fn fixture() -> ParsedFont {
    let mut font = ParsedFont::new("Sanitize Me", "Regular", 1000, 800, -200);
    font.push_glyph(Glyph::from_contours(0, 500, &[vec![(50, 0), (450, 0), (450, 700), (50, 700)]]));
    font.push_glyph(Glyph::new(0, 250).with_unicode(' '));
    font.push_glyph(Glyph::from_contours(0, 600, &[vec![(0, 0), (600, 0), (300, 700)]]).with_unicode('A'));
    font.push_glyph(Glyph::from_contours(0, 0, &[vec![(0, 0), (550, 0), (550, 700)]]).with_unicode('B'));
    font
  }

  fn glyph_rule(rule: Rule<Glyph>) -> ValidationRule {
    ValidationRule::Glyph(rule)
  }

  #[test]
  fn test_no_rules_is_trivial_success() {
    let result = Sanitizer::new().sanitize(&fixture(), &[]);
    assert!(result.success, "{}", result.message);
    assert!(result.errors.is_empty());
    let stats = result.stats.unwrap();
    assert_eq!(stats.glyphs.total, 4);
    assert_eq!(stats.glyphs.valid, 4);
    let cleaned = ParsedFont::parse(&result.font.unwrap()).unwrap();
    assert_eq!(cleaned.num_glyphs(), 4);
  }

  #[test]
  fn test_error_font_rule_is_hard_stop() {
    let rules = vec![
      ValidationRule::Font(Rule::new(|_: &ParsedFont| false).with_message("always fails")),
      glyph_rule(Rule::new(|_: &Glyph| panic!("glyph stage must not run"))),
    ];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(!result.success);
    assert!(result.font.is_none());
    assert!(result.stats.is_none());
    assert_eq!(result.errors.len(), 1);
    assert!(result.message.contains("always fails"));
  }

  #[test]
  fn test_warning_font_rule_continues() {
    let rules = vec![ValidationRule::Names(
      Rule::new(|f: &ParsedFont| f.family_name.is_empty()).with_severity(Severity::Warning),
    )];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(result.success);
    assert_eq!(result.errors.len(), 1);
  }

  #[test]
  fn test_font_fix_replaces_working_font() {
    let rules = vec![ValidationRule::Names(
      Rule::new(|f: &ParsedFont| f.family_name != "Sanitize Me").with_fix(|f: &ParsedFont| {
        let mut fixed = f.clone();
        fixed.family_name = "Sanitized".to_string();
        Some(fixed)
      }),
    )];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(result.success);
    assert_eq!(result.stats.unwrap().font.fixed, 1);
    let cleaned = ParsedFont::parse(&result.font.unwrap()).unwrap();
    assert_eq!(cleaned.family_name, "Sanitized");
  }

  #[test]
  fn test_glyph_removal_and_notdef_blanking() {
    let rules = vec![glyph_rule(Rule::new(|g: &Glyph| g.advance_width > 0 && g.index != 0))];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(result.success);

    let stats = result.stats.unwrap();
    assert_eq!(stats.glyphs.removed, 2);
    assert_eq!(stats.glyphs.valid, 2);

    let cleaned = ParsedFont::parse(&result.font.unwrap()).unwrap();
    assert_eq!(cleaned.num_glyphs(), 3);
    assert!(cleaned.glyphs[0].is_empty());
    assert_eq!(cleaned.glyphs[2].unicode(), Some('A'));
  }

  #[test]
  fn test_warning_glyph_failure_keeps_glyph() {
    let rules = vec![glyph_rule(
      Rule::new(|g: &Glyph| g.advance_width > 0).with_severity(Severity::Warning),
    )];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(result.success);
    assert_eq!(result.stats.unwrap().glyphs.removed, 0);
    assert_eq!(result.errors.len(), 1);
  }

  #[test]
  fn test_glyph_fix_counts_as_fixed() {
    let rules = vec![glyph_rule(Rule::new(|g: &Glyph| g.advance_width > 0).with_fix(|g: &Glyph| {
      let mut fixed = g.clone();
      fixed.advance_width = 550;
      Some(fixed)
    }))];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert_eq!(result.stats.unwrap().glyphs.fixed, 1);
    let cleaned = ParsedFont::parse(&result.font.unwrap()).unwrap();
    assert_eq!(cleaned.glyphs[3].advance_width, 550);
  }

  #[test]
  fn test_removing_every_glyph_is_hard_stop() {
    let rules = vec![glyph_rule(Rule::new(|_: &Glyph| false))];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(!result.success);
    assert_eq!(result.errors.last(), Some(&FontError::NoSurvivingGlyphs));
    // Four glyph failures precede the hard stop.
    assert_eq!(result.errors.len(), 5);
  }

  #[test]
  fn test_metrics_fix_reaches_output() {
    let rules = vec![ValidationRule::Metrics(
      Rule::new(|m: &FontMetrics| m.ascender >= 900).with_fix(|m: &FontMetrics| {
        Some(FontMetrics {
          ascender: 900,
          ..*m
        })
      }),
    )];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert_eq!(result.stats.unwrap().metrics.fixed, 1);
    let cleaned = ParsedFont::parse(&result.font.unwrap()).unwrap();
    assert_eq!(cleaned.ascender, 900);
  }

  #[test]
  fn test_metrics_error_is_hard_stop_after_glyphs() {
    let rules = vec![
      glyph_rule(Rule::new(|g: &Glyph| g.advance_width > 0).with_severity(Severity::Warning)),
      ValidationRule::Metrics(Rule::new(|m: &FontMetrics| m.units_per_em == 2048)),
    ];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert!(!result.success);
    // The earlier glyph warning is kept ahead of the metrics failure.
    assert_eq!(result.errors.len(), 2);
    assert!(matches!(
      result.errors[1],
      FontError::RuleFailed {
        category: RuleCategory::Metrics,
        index: 1,
        ..
      }
    ));
  }

  #[test]
  fn test_cff_font_fails_extraction() {
    let mut font = fixture();
    font.outlines = crate::font::OutlineFormat::Cff;
    let result = Sanitizer::new().sanitize(&font, &[]);
    assert!(!result.success);
    assert!(matches!(result.errors[0], FontError::GlyphExtraction { .. }));
  }

  #[test]
  fn test_glyph_bounds_patched_in_output() {
    let rules = vec![glyph_rule(
      Rule::new(|g: &Glyph| g.bounds.map_or(true, |b| b.y_max <= 600)).with_fix(|g: &Glyph| {
        let mut fixed = g.clone();
        fixed.bounds = g.bounds.map(|b| GlyphBounds { y_max: 600, ..b });
        Some(fixed)
      }),
    )];
    let result = Sanitizer::new().sanitize(&fixture(), &rules);
    assert_eq!(result.stats.unwrap().glyphs.fixed, 3);
  }
}
