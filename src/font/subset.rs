//! TrueType writer for cleaned glyph sets
//!
//! Rebuilds a complete TrueType file from a list of surviving [`Glyph`] records.
//! Glyph ids are reassigned by position (the first glyph becomes id 0), composite
//! references are rewritten to match, and every table that depends on the glyph
//! set (`glyf`, `loca`, `hmtx`, `hhea`, `maxp`, `cmap`, `post`) is regenerated.
//! `head` takes its bounding box and units-per-em from the supplied metrics.
//! Metadata tables (`OS/2`, `cvt `, `fpgm`, `prep`) are copied through unchanged.

use super::sfnt::{self, TableTag};
use super::{FontMetrics, Glyph, ParsedFont};
use crate::error::FontError;
use std::collections::HashMap;

const HEAD_LEN: usize = 54;
const HHEA_LEN: usize = 36;
const MAXP_V1_LEN: usize = 32;
const POST_V3_LEN: usize = 32;
const HEAD_MAGIC: u32 = 0x5F0F_3CF5;
const VERSION_1_0: u32 = 0x0001_0000;
const POST_FORMAT_3: u32 = 0x0003_0000;

/// Short `loca` offsets are stored halved in a u16.
const SHORT_LOCA_LIMIT: usize = 0x1FFFE;

/// Serializes `glyphs` as a standalone TrueType font.
///
/// `font` supplies names and the raw tables that are copied through; `metrics`
/// supplies the vertical metrics and head bounding box.
///
/// # Errors
///
/// Returns [`FontError::SubsetFailed`] when there are no glyphs, more than
/// 65535 glyphs, or a composite glyph references a glyph that is not in the set.
pub fn write_font(font: &ParsedFont, glyphs: &[Glyph], metrics: &FontMetrics) -> Result<Vec<u8>, FontError> {
  if glyphs.is_empty() {
    return Err(FontError::SubsetFailed {
      reason: "no glyphs to write".to_string(),
    });
  }
  let num_glyphs = u16::try_from(glyphs.len()).map_err(|_| FontError::SubsetFailed {
    reason: format!("{} glyphs exceed the TrueType limit", glyphs.len()),
  })?;

  let remap: HashMap<u16, u16> = glyphs
    .iter()
    .enumerate()
    .map(|(new_gid, glyph)| (glyph.index, new_gid as u16))
    .collect();

  let (glyf, offsets) = build_glyf(glyphs, &remap)?;
  let long_loca = glyf.len() > SHORT_LOCA_LIMIT;

  let mut tables: Vec<(TableTag, Vec<u8>)> = vec![
    (sfnt::HEAD, build_head(font, metrics, long_loca)),
    (sfnt::HHEA, build_hhea(font, metrics, glyphs)),
    (sfnt::HMTX, build_hmtx(glyphs)),
    (sfnt::MAXP, build_maxp(font, glyphs, num_glyphs)),
    (sfnt::CMAP, build_cmap(glyphs)),
    (sfnt::POST, build_post(font)),
    (sfnt::NAME, build_name(font)),
    (sfnt::LOCA, build_loca(&offsets, long_loca)),
    (sfnt::GLYF, glyf),
  ];
  for tag in [sfnt::OS2, sfnt::CVT, sfnt::FPGM, sfnt::PREP] {
    if let Some(data) = font.table(&tag) {
      tables.push((tag, data.to_vec()));
    }
  }

  Ok(sfnt::write_sfnt(tables))
}

// ============================================================================
// Outline tables
// ============================================================================

fn build_glyf(glyphs: &[Glyph], remap: &HashMap<u16, u16>) -> Result<(Vec<u8>, Vec<usize>), FontError> {
  let mut glyf = Vec::new();
  let mut offsets = Vec::with_capacity(glyphs.len() + 1);

  for glyph in glyphs {
    offsets.push(glyf.len());
    if glyph.data.is_empty() {
      continue;
    }

    let mut data = glyph.data.clone();
    sfnt::remap_components(&mut data, remap).map_err(|missing| FontError::SubsetFailed {
      reason: format!(
        "composite glyph {} references glyph {} which is not in the font",
        glyph.index, missing
      ),
    })?;
    if let Some(bounds) = glyph.bounds {
      sfnt::write_glyph_bounds(&mut data, bounds);
    }

    glyf.extend_from_slice(&data);
    glyf.resize((glyf.len() + 3) & !3, 0);
  }
  offsets.push(glyf.len());

  Ok((glyf, offsets))
}

fn build_loca(offsets: &[usize], long: bool) -> Vec<u8> {
  if long {
    offsets.iter().flat_map(|&o| (o as u32).to_be_bytes()).collect()
  } else {
    offsets.iter().flat_map(|&o| ((o / 2) as u16).to_be_bytes()).collect()
  }
}

fn left_side_bearing(glyph: &Glyph) -> i16 {
  glyph.bounds.map_or(glyph.left_side_bearing, |b| b.x_min)
}

fn build_hmtx(glyphs: &[Glyph]) -> Vec<u8> {
  let mut hmtx = Vec::with_capacity(glyphs.len() * 4);
  for glyph in glyphs {
    hmtx.extend_from_slice(&glyph.advance_width.to_be_bytes());
    hmtx.extend_from_slice(&left_side_bearing(glyph).to_be_bytes());
  }
  hmtx
}

fn build_maxp(font: &ParsedFont, glyphs: &[Glyph], num_glyphs: u16) -> Vec<u8> {
  let mut maxp = match font.table(&sfnt::MAXP) {
    Some(original) if original.len() >= MAXP_V1_LEN => original[..MAXP_V1_LEN].to_vec(),
    _ => {
      let mut fresh = vec![0u8; MAXP_V1_LEN];
      sfnt::write_u16(&mut fresh, 14, 2); // maxZones
      fresh
    }
  };
  sfnt::write_u32(&mut maxp, 0, VERSION_1_0);
  sfnt::write_u16(&mut maxp, 4, num_glyphs);

  let (mut max_points, mut max_contours, mut max_components) = (0u16, 0u16, 0u16);
  for glyph in glyphs {
    if let Some((points, contours)) = sfnt::simple_glyph_extent(&glyph.data) {
      max_points = max_points.max(points);
      max_contours = max_contours.max(contours);
    }
    if glyph.is_composite() {
      max_components = max_components.max(glyph.components().len() as u16);
    }
  }
  sfnt::write_u16(&mut maxp, 6, max_points);
  sfnt::write_u16(&mut maxp, 8, max_contours);
  sfnt::write_u16(&mut maxp, 28, max_components);
  if max_components > 0 && sfnt::read_u16(&maxp, 30).unwrap_or(0) == 0 {
    sfnt::write_u16(&mut maxp, 30, 1);
  }
  maxp
}

// ============================================================================
// Header tables
// ============================================================================

fn build_head(font: &ParsedFont, metrics: &FontMetrics, long_loca: bool) -> Vec<u8> {
  let mut head = match font.table(&sfnt::HEAD) {
    Some(original) if original.len() >= HEAD_LEN => original[..HEAD_LEN].to_vec(),
    _ => {
      let mut fresh = vec![0u8; HEAD_LEN];
      sfnt::write_u32(&mut fresh, 0, VERSION_1_0);
      sfnt::write_u32(&mut fresh, 4, VERSION_1_0); // fontRevision
      sfnt::write_u32(&mut fresh, 12, HEAD_MAGIC);
      sfnt::write_u16(&mut fresh, 16, 0x000B); // baseline at y=0, lsb at x=0, integer ppem
      sfnt::write_u16(&mut fresh, 46, 8); // lowestRecPPEM
      sfnt::write_i16(&mut fresh, 48, 2); // fontDirectionHint
      fresh
    }
  };
  sfnt::write_u32(&mut head, 8, 0);
  sfnt::write_u16(&mut head, 18, metrics.units_per_em);
  sfnt::write_i16(&mut head, 36, metrics.x_min);
  sfnt::write_i16(&mut head, 38, metrics.y_min);
  sfnt::write_i16(&mut head, 40, metrics.x_max);
  sfnt::write_i16(&mut head, 42, metrics.y_max);
  sfnt::write_i16(&mut head, 50, i16::from(long_loca));
  sfnt::write_i16(&mut head, 52, 0);
  head
}

fn build_hhea(font: &ParsedFont, metrics: &FontMetrics, glyphs: &[Glyph]) -> Vec<u8> {
  let mut hhea = match font.table(&sfnt::HHEA) {
    Some(original) if original.len() >= HHEA_LEN => original[..HHEA_LEN].to_vec(),
    _ => {
      let mut fresh = vec![0u8; HHEA_LEN];
      sfnt::write_u32(&mut fresh, 0, VERSION_1_0);
      sfnt::write_i16(&mut fresh, 18, 1); // caretSlopeRise
      fresh
    }
  };

  let advance_max = glyphs.iter().map(|g| g.advance_width).max().unwrap_or(0);
  let outlined = || glyphs.iter().filter_map(|g| g.bounds.map(|b| (g, b)));
  let min_lsb = outlined().map(|(_, b)| b.x_min).min().unwrap_or(0);
  let min_rsb = outlined()
    .map(|(g, b)| clamp_i16(i32::from(g.advance_width) - i32::from(b.x_max)))
    .min()
    .unwrap_or(0);
  let max_extent = outlined()
    .map(|(_, b)| clamp_i16(i32::from(b.x_max)))
    .max()
    .unwrap_or(0);

  sfnt::write_i16(&mut hhea, 4, metrics.ascender);
  sfnt::write_i16(&mut hhea, 6, metrics.descender);
  sfnt::write_i16(&mut hhea, 8, font.line_gap);
  sfnt::write_u16(&mut hhea, 10, advance_max);
  sfnt::write_i16(&mut hhea, 12, min_lsb);
  sfnt::write_i16(&mut hhea, 14, min_rsb);
  sfnt::write_i16(&mut hhea, 16, max_extent);
  sfnt::write_i16(&mut hhea, 32, 0); // metricDataFormat
  sfnt::write_u16(&mut hhea, 34, glyphs.len() as u16);
  hhea
}

fn clamp_i16(value: i32) -> i16 {
  value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

// ============================================================================
// Mapping and naming tables
// ============================================================================

fn build_cmap(glyphs: &[Glyph]) -> Vec<u8> {
  let entries: Vec<(u32, u16)> = glyphs
    .iter()
    .enumerate()
    .flat_map(|(new_gid, glyph)| glyph.unicodes.iter().map(move |&ch| (u32::from(ch), new_gid as u16)))
    .collect();
  sfnt::build_cmap(&entries)
}

/// Format 3 keeps the header fields (italic angle, underline) but drops glyph names.
fn build_post(font: &ParsedFont) -> Vec<u8> {
  let mut post = vec![0u8; POST_V3_LEN];
  sfnt::write_u32(&mut post, 0, POST_FORMAT_3);
  if let Some(original) = font.table(&sfnt::POST).filter(|t| t.len() >= POST_V3_LEN) {
    post[4..POST_V3_LEN].copy_from_slice(&original[4..POST_V3_LEN]);
  }
  post
}

/// Keeps the source `name` table unless the family or style was changed.
fn build_name(font: &ParsedFont) -> Vec<u8> {
  if let Some(original) = font.table(&sfnt::NAME) {
    if original_names_match(original, font) {
      return original.to_vec();
    }
  }
  let full_name = if font.style_name.is_empty() {
    font.family_name.clone()
  } else {
    format!("{} {}", font.family_name, font.style_name)
  };
  let postscript_name: String = full_name
    .chars()
    .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%".contains(*c))
    .collect();
  sfnt::build_name(&[
    (ttf_parser::name_id::FAMILY, font.family_name.as_str()),
    (ttf_parser::name_id::SUBFAMILY, font.style_name.as_str()),
    (ttf_parser::name_id::FULL_NAME, full_name.as_str()),
    (ttf_parser::name_id::POST_SCRIPT_NAME, postscript_name.as_str()),
  ])
}

fn original_names_match(data: &[u8], font: &ParsedFont) -> bool {
  let Some(table) = ttf_parser::name::Table::parse(data) else {
    return false;
  };
  let lookup = |id: u16| {
    table
      .names
      .into_iter()
      .filter(|name| name.name_id == id)
      .find_map(|name| name.to_string())
      .unwrap_or_default()
  };
  lookup(ttf_parser::name_id::FAMILY) == font.family_name
    && lookup(ttf_parser::name_id::SUBFAMILY) == font.style_name
}
