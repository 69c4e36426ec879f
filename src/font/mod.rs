//! Parsed font model
//!
//! [`ParsedFont`] is the in-memory representation the sanitizer works on: the
//! names, vertical metrics and head bounding box, one [`Glyph`] record per glyph
//! (raw `glyf` bytes plus advance/bearing/bounds/unicode data), and a raw copy of
//! every table so metadata can be carried through into rebuilt fonts.
//!
//! Parsing is done with `ttf-parser`; writing goes through [`subset`].
//!
//! # Example
//!
//! ```rust,ignore
//! use fontface_loader::font::ParsedFont;
//!
//! let font = ParsedFont::parse(&bytes)?;
//! println!("{} has {} glyphs", font.family_name, font.num_glyphs());
//! let metrics = font.metrics();
//! println!("ascender {} / {} units", metrics.ascender, metrics.units_per_em);
//! ```

pub mod descriptors;
pub mod sfnt;
pub mod subset;

use crate::error::FontError;
use serde::{Deserialize, Serialize};
use sfnt::TableTag;
use std::collections::BTreeMap;
use ttf_parser::{Face, GlyphId};

pub use descriptors::{
  FontDisplay, FontFaceDescriptors, FontFaceOptions, FontStretch, FontStyle, FontWeight,
  MetricOverride,
};

/// Axis-aligned bounding box in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GlyphBounds {
  pub x_min: i16,
  pub y_min: i16,
  pub x_max: i16,
  pub y_max: i16,
}

impl GlyphBounds {
  pub fn new(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
    }
  }

  /// Smallest box containing every point; `None` for an empty slice.
  pub fn from_points(points: &[(i16, i16)]) -> Option<Self> {
    let (&(x, y), rest) = points.split_first()?;
    Some(rest.iter().fold(Self::new(x, y, x, y), |b, &(x, y)| Self {
      x_min: b.x_min.min(x),
      y_min: b.y_min.min(y),
      x_max: b.x_max.max(x),
      y_max: b.y_max.max(y),
    }))
  }

  /// Minimums do not exceed maximums.
  pub fn is_ordered(&self) -> bool {
    self.x_min <= self.x_max && self.y_min <= self.y_max
  }

  pub fn contains(&self, other: &GlyphBounds) -> bool {
    other.x_min >= self.x_min
      && other.y_min >= self.y_min
      && other.x_max <= self.x_max
      && other.y_max <= self.y_max
  }

  pub fn union(&self, other: &GlyphBounds) -> Self {
    Self {
      x_min: self.x_min.min(other.x_min),
      y_min: self.y_min.min(other.y_min),
      x_max: self.x_max.max(other.x_max),
      y_max: self.y_max.max(other.y_max),
    }
  }

  /// Same box with each axis' edges in ascending order.
  pub fn normalized(&self) -> Self {
    Self {
      x_min: self.x_min.min(self.x_max),
      y_min: self.y_min.min(self.y_max),
      x_max: self.x_min.max(self.x_max),
      y_max: self.y_min.max(self.y_max),
    }
  }

  /// Clamps every edge into `outer`. A disordered `outer` is normalized first.
  pub fn clamp_to(&self, outer: &GlyphBounds) -> Self {
    let outer = outer.normalized();
    Self {
      x_min: self.x_min.clamp(outer.x_min, outer.x_max),
      y_min: self.y_min.clamp(outer.y_min, outer.y_max),
      x_max: self.x_max.clamp(outer.x_min, outer.x_max),
      y_max: self.y_max.clamp(outer.y_min, outer.y_max),
    }
  }
}

impl From<ttf_parser::Rect> for GlyphBounds {
  fn from(rect: ttf_parser::Rect) -> Self {
    Self::new(rect.x_min, rect.y_min, rect.x_max, rect.y_max)
  }
}

/// Vertical metrics and head bounding box of a font.
///
/// Recomputed from the font on every sanitize pass. Metrics rules that fix a
/// value return a new record rather than mutating this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMetrics {
  pub x_min: i16,
  pub x_max: i16,
  pub y_min: i16,
  pub y_max: i16,
  pub ascender: i16,
  pub descender: i16,
  pub units_per_em: u16,
}

impl FontMetrics {
  pub fn from_font(font: &ParsedFont) -> Self {
    Self {
      x_min: font.bounds.x_min,
      x_max: font.bounds.x_max,
      y_min: font.bounds.y_min,
      y_max: font.bounds.y_max,
      ascender: font.ascender,
      descender: font.descender,
      units_per_em: font.units_per_em,
    }
  }

  pub fn bounds(&self) -> GlyphBounds {
    GlyphBounds::new(self.x_min, self.y_min, self.x_max, self.y_max)
  }
}

/// Outline technology of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineFormat {
  /// Quadratic outlines in `glyf`/`loca`
  TrueType,
  /// Cubic outlines in `CFF ` or `CFF2`
  Cff,
  /// No outline table (bitmap-only or broken)
  None,
}

/// One glyph of a parsed font.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
  /// Glyph id in the font the record was read from
  pub index: u16,
  pub name: Option<String>,
  /// Every codepoint the cmap maps to this glyph, ascending
  pub unicodes: Vec<char>,
  pub advance_width: u16,
  pub left_side_bearing: i16,
  /// `None` for glyphs without an outline (e.g. space)
  pub bounds: Option<GlyphBounds>,
  /// Raw `glyf` record; empty for blank glyphs and for CFF fonts
  pub data: Vec<u8>,
}

impl Glyph {
  /// A blank glyph with no outline.
  pub fn new(index: u16, advance_width: u16) -> Self {
    Self {
      index,
      name: None,
      unicodes: Vec::new(),
      advance_width,
      left_side_bearing: 0,
      bounds: None,
      data: Vec::new(),
    }
  }

  /// A glyph whose outline is made of straight on-curve contours.
  pub fn from_contours(index: u16, advance_width: u16, contours: &[Vec<(i16, i16)>]) -> Self {
    let mut glyph = Self::new(index, advance_width);
    if let Some((data, bounds)) = sfnt::encode_simple_glyph(contours) {
      glyph.left_side_bearing = bounds.x_min;
      glyph.bounds = Some(bounds);
      glyph.data = data;
    }
    glyph
  }

  pub fn with_unicode(mut self, ch: char) -> Self {
    if let Err(pos) = self.unicodes.binary_search(&ch) {
      self.unicodes.insert(pos, ch);
    }
    self
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// First mapped codepoint.
  pub fn unicode(&self) -> Option<char> {
    self.unicodes.first().copied()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn is_composite(&self) -> bool {
    sfnt::read_i16(&self.data, 0).map_or(false, |contours| contours < 0)
  }

  /// Glyph ids referenced by a composite glyph.
  pub fn components(&self) -> Vec<u16> {
    sfnt::composite_components(&self.data)
      .into_iter()
      .map(|(_, gid)| gid)
      .collect()
  }

  /// Same glyph with its outline removed.
  pub fn cleared(&self) -> Self {
    Self {
      bounds: None,
      data: Vec::new(),
      left_side_bearing: 0,
      ..self.clone()
    }
  }
}

/// A font parsed into an editable model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFont {
  pub family_name: String,
  pub style_name: String,
  pub units_per_em: u16,
  pub ascender: i16,
  pub descender: i16,
  pub line_gap: i16,
  /// Head table bounding box
  pub bounds: GlyphBounds,
  pub outlines: OutlineFormat,
  pub glyphs: Vec<Glyph>,
  tables: BTreeMap<TableTag, Vec<u8>>,
}

impl ParsedFont {
  /// An empty TrueType font with no glyphs and no raw tables.
  pub fn new(
    family_name: impl Into<String>,
    style_name: impl Into<String>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
  ) -> Self {
    Self {
      family_name: family_name.into(),
      style_name: style_name.into(),
      units_per_em,
      ascender,
      descender,
      line_gap: 0,
      bounds: GlyphBounds::default(),
      outlines: OutlineFormat::TrueType,
      glyphs: Vec::new(),
      tables: BTreeMap::new(),
    }
  }

  /// Parses the first face of a TrueType/OpenType font or collection.
  ///
  /// # Errors
  ///
  /// Returns [`FontError::InvalidFontData`] if `ttf-parser` rejects the data.
  pub fn parse(data: &[u8]) -> Result<Self, FontError> {
    let face = Face::parse(data, 0).map_err(|e| FontError::InvalidFontData {
      reason: format!("invalid font: {}", e),
    })?;
    let raw = face.raw_face();

    let mut tables = BTreeMap::new();
    for record in raw.table_records {
      if let Some(bytes) = raw.table(record.tag) {
        tables.insert(record.tag.to_bytes(), bytes.to_vec());
      }
    }

    let outlines = if tables.contains_key(&sfnt::GLYF) && tables.contains_key(&sfnt::LOCA) {
      OutlineFormat::TrueType
    } else if tables.contains_key(&sfnt::CFF) || tables.contains_key(&sfnt::CFF2) {
      OutlineFormat::Cff
    } else {
      OutlineFormat::None
    };

    let hhea = face.tables().hhea;
    let mut font = Self {
      family_name: find_name(&face, ttf_parser::name_id::FAMILY).unwrap_or_default(),
      style_name: find_name(&face, ttf_parser::name_id::SUBFAMILY).unwrap_or_default(),
      units_per_em: face.units_per_em(),
      ascender: hhea.ascender,
      descender: hhea.descender,
      line_gap: hhea.line_gap,
      bounds: face.global_bounding_box().into(),
      outlines,
      glyphs: Vec::new(),
      tables,
    };
    font.glyphs = font.read_glyphs(&face);
    Ok(font)
  }

  fn read_glyphs(&self, face: &Face) -> Vec<Glyph> {
    let unicodes = collect_unicodes(face);
    let locations = match self.outlines {
      OutlineFormat::TrueType => self.glyph_locations(face.number_of_glyphs()),
      _ => None,
    };
    let glyf = self.table(&sfnt::GLYF).unwrap_or_default();

    (0..face.number_of_glyphs())
      .map(|index| {
        let gid = GlyphId(index);
        let data = locations
          .as_ref()
          .and_then(|offsets| {
            let start = *offsets.get(index as usize)? as usize;
            let end = *offsets.get(index as usize + 1)? as usize;
            glyf.get(start..end)
          })
          .map(<[u8]>::to_vec)
          .unwrap_or_default();
        Glyph {
          index,
          name: face.glyph_name(gid).map(str::to_string),
          unicodes: unicodes.get(&index).cloned().unwrap_or_default(),
          advance_width: face.glyph_hor_advance(gid).unwrap_or(0),
          left_side_bearing: face.glyph_hor_side_bearing(gid).unwrap_or(0),
          bounds: face.glyph_bounding_box(gid).map(GlyphBounds::from),
          data,
        }
      })
      .collect()
  }

  /// Decodes `loca` into `num_glyphs + 1` byte offsets into `glyf`.
  fn glyph_locations(&self, num_glyphs: u16) -> Option<Vec<u32>> {
    let head = self.table(&sfnt::HEAD)?;
    let loca = self.table(&sfnt::LOCA)?;
    let long = sfnt::read_i16(head, 50)? != 0;
    (0..=num_glyphs as usize)
      .map(|i| {
        if long {
          sfnt::read_u32(loca, i * 4)
        } else {
          sfnt::read_u16(loca, i * 2).map(|v| u32::from(v) * 2)
        }
      })
      .collect()
  }

  pub fn metrics(&self) -> FontMetrics {
    FontMetrics::from_font(self)
  }

  pub fn num_glyphs(&self) -> usize {
    self.glyphs.len()
  }

  /// Appends a glyph, renumbering it to the next index and growing the head box.
  pub fn push_glyph(&mut self, mut glyph: Glyph) {
    glyph.index = self.glyphs.len() as u16;
    if let Some(bounds) = glyph.bounds {
      self.bounds = if self.glyphs.iter().any(|g| g.bounds.is_some()) {
        self.bounds.union(&bounds)
      } else {
        bounds
      };
    }
    self.glyphs.push(glyph);
  }

  /// Raw bytes of a table as found in the source font.
  pub fn table(&self, tag: &TableTag) -> Option<&[u8]> {
    self.tables.get(tag).map(Vec::as_slice)
  }

  pub fn has_table(&self, tag: &TableTag) -> bool {
    self.tables.contains_key(tag)
  }

  pub fn table_tags(&self) -> impl Iterator<Item = &TableTag> + '_ {
    self.tables.keys()
  }

  pub fn set_table(&mut self, tag: TableTag, data: Vec<u8>) {
    self.tables.insert(tag, data);
  }

  pub fn remove_table(&mut self, tag: &TableTag) -> Option<Vec<u8>> {
    self.tables.remove(tag)
  }

  /// Per-glyph data keyed by glyph index.
  ///
  /// # Errors
  ///
  /// Fails when the font has no glyphs or its outlines are not TrueType `glyf`
  /// outlines, since only those can be carried into a rebuilt font.
  pub fn glyph_data(&self) -> Result<BTreeMap<u16, Glyph>, FontError> {
    if self.outlines != OutlineFormat::TrueType {
      return Err(FontError::GlyphExtraction {
        reason: format!("{:?} outlines are not supported", self.outlines),
      });
    }
    if self.glyphs.is_empty() {
      return Err(FontError::GlyphExtraction {
        reason: "font has no glyphs".to_string(),
      });
    }
    Ok(self.glyphs.iter().map(|g| (g.index, g.clone())).collect())
  }

  /// Serializes the whole font as a TrueType binary.
  pub fn to_bytes(&self) -> Result<Vec<u8>, FontError> {
    subset::write_font(self, &self.glyphs, &self.metrics())
  }
}

fn find_name(face: &Face, name_id: u16) -> Option<String> {
  face
    .names()
    .into_iter()
    .filter(|name| name.name_id == name_id)
    .find_map(|name| name.to_string())
}

fn collect_unicodes(face: &Face) -> BTreeMap<u16, Vec<char>> {
  let mut unicodes: BTreeMap<u16, Vec<char>> = BTreeMap::new();
  let Some(cmap) = face.tables().cmap else {
    return unicodes;
  };
  for subtable in cmap.subtables {
    if !subtable.is_unicode() {
      continue;
    }
    subtable.codepoints(|code| {
      if let (Some(ch), Some(gid)) = (char::from_u32(code), subtable.glyph_index(code)) {
        unicodes.entry(gid.0).or_default().push(ch);
      }
    });
  }
  for chars in unicodes.values_mut() {
    chars.sort_unstable();
    chars.dedup();
  }
  unicodes
}
