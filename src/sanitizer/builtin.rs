//! Ready-made rules covering the usual structural problems of broken fonts.

use super::rules::{Rule, Severity, ValidationRule};
use crate::font::{sfnt, FontMetrics, Glyph, GlyphBounds, ParsedFont};

/// Tables a TrueType font cannot be rebuilt without.
pub const REQUIRED_TABLES: [sfnt::TableTag; 6] = [
  sfnt::HEAD,
  sfnt::HHEA,
  sfnt::MAXP,
  sfnt::HMTX,
  sfnt::GLYF,
  sfnt::LOCA,
];

pub fn positive_units_per_em() -> ValidationRule {
  ValidationRule::Metrics(
    Rule::new(|m: &FontMetrics| (16..=16384).contains(&m.units_per_em))
      .with_message("units per em must be between 16 and 16384"),
  )
}

pub fn ascender_above_descender() -> ValidationRule {
  ValidationRule::Metrics(
    Rule::new(|m: &FontMetrics| m.ascender > m.descender)
      .with_message("ascender must be above descender"),
  )
}

/// Empty family names are replaced with `fallback`.
pub fn family_name_present(fallback: impl Into<String>) -> ValidationRule {
  let fallback = fallback.into();
  ValidationRule::Names(
    Rule::new(|f: &ParsedFont| !f.family_name.trim().is_empty())
      .with_fix(move |f: &ParsedFont| {
        if fallback.is_empty() {
          return None;
        }
        let mut fixed = f.clone();
        fixed.family_name = fallback.clone();
        Some(fixed)
      })
      .with_message("family name is missing"),
  )
}

/// Parsed fonts keep their raw tables; hand-built fonts have none, so this rule
/// is only meaningful on fonts that came through [`ParsedFont::parse`].
pub fn required_tables_present() -> ValidationRule {
  ValidationRule::Tables(
    Rule::new(|f: &ParsedFont| REQUIRED_TABLES.iter().all(|tag| f.has_table(tag)))
      .with_message("required TrueType tables are missing"),
  )
}

pub fn glyph_bounds_ordered() -> ValidationRule {
  ValidationRule::Glyph(
    Rule::new(|g: &Glyph| g.bounds.map_or(true, |b| b.is_ordered()))
      .with_message("glyph bounds are out of order"),
  )
}

/// Clamps glyph boxes that stick out of `font_box`.
///
/// A disordered `font_box` (as read from a broken `head` table) is normalized.
pub fn glyph_bounds_within(font_box: GlyphBounds) -> ValidationRule {
  let font_box = font_box.normalized();
  ValidationRule::Glyph(
    Rule::new(move |g: &Glyph| g.bounds.map_or(true, |b| font_box.contains(&b)))
      .with_fix(move |g: &Glyph| {
        let bounds = g.bounds?.clamp_to(&font_box);
        if !bounds.is_ordered() {
          return None;
        }
        let mut fixed = g.clone();
        fixed.bounds = Some(bounds);
        Some(fixed)
      })
      .with_severity(Severity::Warning)
      .with_message("glyph bounds exceed the font bounding box"),
  )
}

/// Outlined glyphs with a zero advance are dropped.
pub fn glyph_advance_present() -> ValidationRule {
  ValidationRule::Glyph(
    Rule::new(|g: &Glyph| g.is_empty() || g.is_composite() || g.advance_width > 0)
      .with_message("outlined glyph has no advance width"),
  )
}

/// Family name given to fonts whose name table has none.
pub const FALLBACK_FAMILY: &str = "Untitled";

/// Every built-in rule, with the glyph box taken from `font`.
pub fn default_rules(font: &ParsedFont) -> Vec<ValidationRule> {
  vec![
    family_name_present(FALLBACK_FAMILY),
    required_tables_present(),
    glyph_bounds_ordered(),
    glyph_bounds_within(font.bounds),
    glyph_advance_present(),
    positive_units_per_em(),
    ascender_above_descender(),
  ]
}
