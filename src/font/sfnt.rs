//! Byte-level helpers for the sfnt container used by TrueType/OpenType fonts.
//!
//! Reads are bounds-checked and return `None` on truncated data, since the bytes
//! usually come straight off the network. Writes are only ever applied to buffers
//! this crate sized itself.

use super::GlyphBounds;
use std::collections::HashMap;

/// Four-byte table tag, e.g. `*b"glyf"`.
pub type TableTag = [u8; 4];

pub const HEAD: TableTag = *b"head";
pub const HHEA: TableTag = *b"hhea";
pub const HMTX: TableTag = *b"hmtx";
pub const MAXP: TableTag = *b"maxp";
pub const NAME: TableTag = *b"name";
pub const OS2: TableTag = *b"OS/2";
pub const POST: TableTag = *b"post";
pub const CMAP: TableTag = *b"cmap";
pub const GLYF: TableTag = *b"glyf";
pub const LOCA: TableTag = *b"loca";
pub const CFF: TableTag = *b"CFF ";
pub const CFF2: TableTag = *b"CFF2";
pub const CVT: TableTag = *b"cvt ";
pub const FPGM: TableTag = *b"fpgm";
pub const PREP: TableTag = *b"prep";

const HEAD_CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;
const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;

// Composite glyph flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

const ON_CURVE_POINT: u8 = 0x01;

// ============================================================================
// Readers / writers
// ============================================================================

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
  let bytes = data.get(offset..offset.checked_add(2)?)?;
  Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_i16(data: &[u8], offset: usize) -> Option<i16> {
  read_u16(data, offset).map(|v| v as i16)
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
  let bytes = data.get(offset..offset.checked_add(4)?)?;
  Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn write_u16(data: &mut [u8], offset: usize, value: u16) {
  if let Some(slot) = data.get_mut(offset..offset + 2) {
    slot.copy_from_slice(&value.to_be_bytes());
  }
}

pub(crate) fn write_i16(data: &mut [u8], offset: usize, value: i16) {
  write_u16(data, offset, value as u16);
}

pub(crate) fn write_u32(data: &mut [u8], offset: usize, value: u32) {
  if let Some(slot) = data.get_mut(offset..offset + 4) {
    slot.copy_from_slice(&value.to_be_bytes());
  }
}

/// Returns `(entry_selector, search_range_units)` where `search_range_units` is the
/// largest power of two not above `count`.
fn binary_search_params(count: u16) -> (u16, u16) {
  let mut pow = 1u16;
  let mut selector = 0u16;
  while count > 0 && pow <= count / 2 {
    pow *= 2;
    selector += 1;
  }
  (selector, pow)
}

pub(crate) fn table_checksum(data: &[u8]) -> u32 {
  data.chunks(4).fold(0u32, |sum, chunk| {
    let mut word = [0u8; 4];
    word[..chunk.len()].copy_from_slice(chunk);
    sum.wrapping_add(u32::from_be_bytes(word))
  })
}

// ============================================================================
// glyf records
// ============================================================================

/// Walks the component records of a composite `glyf` record.
///
/// Returns the byte offset of each component's glyph index paired with the index.
/// Simple and empty glyphs have no components.
pub(crate) fn composite_components(glyph: &[u8]) -> Vec<(usize, u16)> {
  let mut components = Vec::new();
  if read_i16(glyph, 0).map_or(true, |contours| contours >= 0) {
    return components;
  }

  let mut pos = 10;
  while let (Some(flags), Some(gid)) = (read_u16(glyph, pos), read_u16(glyph, pos + 2)) {
    components.push((pos + 2, gid));
    pos += 4;
    pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
    if flags & WE_HAVE_A_SCALE != 0 {
      pos += 2;
    } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
      pos += 4;
    } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
      pos += 8;
    }
    if flags & MORE_COMPONENTS == 0 {
      break;
    }
  }
  components
}

/// Rewrites composite component references through `remap`.
///
/// Returns the first component index that has no mapping.
pub(crate) fn remap_components(glyph: &mut [u8], remap: &HashMap<u16, u16>) -> Result<(), u16> {
  for (offset, gid) in composite_components(glyph) {
    match remap.get(&gid) {
      Some(&new_gid) => write_u16(glyph, offset, new_gid),
      None => return Err(gid),
    }
  }
  Ok(())
}

/// Overwrites the bounding box stored in a `glyf` record header.
pub(crate) fn write_glyph_bounds(glyph: &mut [u8], bounds: GlyphBounds) {
  if glyph.len() < 10 {
    return;
  }
  write_i16(glyph, 2, bounds.x_min);
  write_i16(glyph, 4, bounds.y_min);
  write_i16(glyph, 6, bounds.x_max);
  write_i16(glyph, 8, bounds.y_max);
}

/// Point and contour counts of a simple glyph, used to fill `maxp`.
pub(crate) fn simple_glyph_extent(glyph: &[u8]) -> Option<(u16, u16)> {
  let contours = read_i16(glyph, 0)?;
  if contours <= 0 {
    return None;
  }
  let last_end = read_u16(glyph, 10 + (contours as usize - 1) * 2)?;
  Some((last_end.saturating_add(1), contours as u16))
}

/// Encodes contours made of on-curve points as a simple `glyf` record.
///
/// Empty contours are skipped; returns `None` when no point remains.
pub(crate) fn encode_simple_glyph(contours: &[Vec<(i16, i16)>]) -> Option<(Vec<u8>, GlyphBounds)> {
  let contours: Vec<&Vec<(i16, i16)>> = contours.iter().filter(|c| !c.is_empty()).collect();
  let points: Vec<(i16, i16)> = contours.iter().flat_map(|c| c.iter().copied()).collect();
  let bounds = GlyphBounds::from_points(&points)?;

  let mut data = Vec::with_capacity(12 + contours.len() * 2 + points.len() * 5);
  data.extend_from_slice(&(contours.len() as i16).to_be_bytes());
  data.extend_from_slice(&bounds.x_min.to_be_bytes());
  data.extend_from_slice(&bounds.y_min.to_be_bytes());
  data.extend_from_slice(&bounds.x_max.to_be_bytes());
  data.extend_from_slice(&bounds.y_max.to_be_bytes());

  let mut end = 0u16;
  for contour in &contours {
    end += contour.len() as u16;
    data.extend_from_slice(&(end - 1).to_be_bytes());
  }
  // instructionLength
  data.extend_from_slice(&0u16.to_be_bytes());
  data.extend(std::iter::repeat(ON_CURVE_POINT).take(points.len()));

  let mut prev = 0i16;
  for &(x, _) in &points {
    data.extend_from_slice(&x.wrapping_sub(prev).to_be_bytes());
    prev = x;
  }
  prev = 0;
  for &(_, y) in &points {
    data.extend_from_slice(&y.wrapping_sub(prev).to_be_bytes());
    prev = y;
  }

  Some((data, bounds))
}

// ============================================================================
// cmap / name builders
// ============================================================================

/// Builds a `cmap` table from `(codepoint, glyph id)` pairs.
///
/// BMP-only mappings produce a single format 4 subtable (3, 1). Mappings beyond
/// the BMP, or too many segments for format 4's 16-bit length, produce a single
/// format 12 subtable (3, 10).
pub(crate) fn build_cmap(entries: &[(u32, u16)]) -> Vec<u8> {
  let mut sorted = entries.to_vec();
  sorted.sort_unstable();
  sorted.dedup_by_key(|(code, _)| *code);

  let format4 = if sorted.iter().all(|(code, _)| *code <= 0xFFFF) {
    build_cmap_format4(&sorted)
  } else {
    None
  };
  let (encoding, subtable) = match format4 {
    Some(subtable) => (1u16, subtable),
    None => (10u16, build_cmap_format12(&sorted)),
  };

  let mut cmap = Vec::with_capacity(12 + subtable.len());
  cmap.extend_from_slice(&0u16.to_be_bytes()); // version
  cmap.extend_from_slice(&1u16.to_be_bytes()); // numTables
  cmap.extend_from_slice(&3u16.to_be_bytes()); // platformID (Windows)
  cmap.extend_from_slice(&encoding.to_be_bytes());
  cmap.extend_from_slice(&12u32.to_be_bytes());
  cmap.extend_from_slice(&subtable);
  cmap
}

/// Groups sorted mappings into runs where both codepoint and glyph id increase by one.
fn contiguous_runs(sorted: &[(u32, u16)]) -> Vec<(u32, u32, u16)> {
  let mut runs: Vec<(u32, u32, u16)> = Vec::new();
  for &(code, gid) in sorted {
    if let Some(last) = runs.last_mut() {
      let offset = code - last.0;
      if code == last.1 + 1 && u32::from(last.2) + offset == u32::from(gid) {
        last.1 = code;
        continue;
      }
    }
    runs.push((code, code, gid));
  }
  runs
}

/// `None` when the subtable would not fit its 16-bit length field.
fn build_cmap_format4(sorted: &[(u32, u16)]) -> Option<Vec<u8>> {
  let mut segments: Vec<(u16, u16, u16)> = contiguous_runs(sorted)
    .into_iter()
    .filter(|(start, _, _)| *start < 0xFFFF)
    .map(|(start, end, gid)| (start as u16, end.min(0xFFFE) as u16, gid))
    .collect();
  // Sentinel segment maps 0xFFFF to .notdef.
  segments.push((0xFFFF, 0xFFFF, 0));

  let length = 16 + segments.len() * 8;
  let length_field = u16::try_from(length).ok()?;
  // length <= 0xFFFF keeps seg_count * 2 within u16
  let seg_count = segments.len() as u16;
  let seg_count_x2 = seg_count * 2;
  let (entry_selector, pow) = binary_search_params(seg_count);
  let search_range = pow * 2;
  let range_shift = seg_count_x2.saturating_sub(search_range);

  let mut data = Vec::with_capacity(length);
  data.extend_from_slice(&4u16.to_be_bytes());
  data.extend_from_slice(&length_field.to_be_bytes());
  data.extend_from_slice(&0u16.to_be_bytes()); // language
  data.extend_from_slice(&seg_count_x2.to_be_bytes());
  data.extend_from_slice(&search_range.to_be_bytes());
  data.extend_from_slice(&entry_selector.to_be_bytes());
  data.extend_from_slice(&range_shift.to_be_bytes());
  for (_, end, _) in &segments {
    data.extend_from_slice(&end.to_be_bytes());
  }
  data.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
  for (start, _, _) in &segments {
    data.extend_from_slice(&start.to_be_bytes());
  }
  for (start, _, gid) in &segments {
    let delta = if *start == 0xFFFF { 1 } else { gid.wrapping_sub(*start) };
    data.extend_from_slice(&delta.to_be_bytes());
  }
  for _ in &segments {
    data.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset
  }
  Some(data)
}

fn build_cmap_format12(sorted: &[(u32, u16)]) -> Vec<u8> {
  let groups = contiguous_runs(sorted);
  let length = 16 + groups.len() * 12;

  let mut data = Vec::with_capacity(length);
  data.extend_from_slice(&12u16.to_be_bytes());
  data.extend_from_slice(&0u16.to_be_bytes()); // reserved
  data.extend_from_slice(&(length as u32).to_be_bytes());
  data.extend_from_slice(&0u32.to_be_bytes()); // language
  data.extend_from_slice(&(groups.len() as u32).to_be_bytes());
  for (start, end, gid) in groups {
    data.extend_from_slice(&start.to_be_bytes());
    data.extend_from_slice(&end.to_be_bytes());
    data.extend_from_slice(&u32::from(gid).to_be_bytes());
  }
  data
}

/// Builds a format 0 `name` table with Windows/Unicode/en-US records.
pub(crate) fn build_name(records: &[(u16, &str)]) -> Vec<u8> {
  let mut sorted: Vec<(u16, Vec<u8>)> = records
    .iter()
    .filter(|(_, text)| !text.is_empty())
    .map(|(id, text)| (*id, text.encode_utf16().flat_map(u16::to_be_bytes).collect()))
    .collect();
  sorted.sort_by_key(|(id, _)| *id);

  let string_offset = 6 + sorted.len() * 12;
  let mut data = Vec::new();
  data.extend_from_slice(&0u16.to_be_bytes()); // format
  data.extend_from_slice(&(sorted.len() as u16).to_be_bytes());
  data.extend_from_slice(&(string_offset as u16).to_be_bytes());

  let mut offset = 0u16;
  for (id, bytes) in &sorted {
    data.extend_from_slice(&3u16.to_be_bytes()); // platformID
    data.extend_from_slice(&1u16.to_be_bytes()); // encodingID
    data.extend_from_slice(&0x0409u16.to_be_bytes()); // languageID
    data.extend_from_slice(&id.to_be_bytes());
    data.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    data.extend_from_slice(&offset.to_be_bytes());
    offset += bytes.len() as u16;
  }
  for (_, bytes) in &sorted {
    data.extend_from_slice(bytes);
  }
  data
}

// ============================================================================
// Container writer
// ============================================================================

/// Assembles tables into a TrueType file with table checksums and the `head`
/// checksum adjustment filled in.
///
/// The `head` table must arrive with `checkSumAdjustment` zeroed.
pub(crate) fn write_sfnt(mut tables: Vec<(TableTag, Vec<u8>)>) -> Vec<u8> {
  tables.sort_by_key(|(tag, _)| *tag);

  let num_tables = tables.len() as u16;
  let (entry_selector, pow) = binary_search_params(num_tables);
  let search_range = pow * 16;
  let range_shift = (num_tables * 16).saturating_sub(search_range);

  let directory_len = 12 + tables.len() * 16;
  let total_len = directory_len + tables.iter().map(|(_, t)| (t.len() + 3) & !3).sum::<usize>();

  let mut output = Vec::with_capacity(total_len);
  output.extend_from_slice(&SFNT_VERSION_TRUETYPE.to_be_bytes());
  output.extend_from_slice(&num_tables.to_be_bytes());
  output.extend_from_slice(&search_range.to_be_bytes());
  output.extend_from_slice(&entry_selector.to_be_bytes());
  output.extend_from_slice(&range_shift.to_be_bytes());

  let mut offset = directory_len;
  let mut head_offset = None;
  for (tag, data) in &tables {
    if *tag == HEAD {
      head_offset = Some(offset);
    }
    output.extend_from_slice(tag);
    output.extend_from_slice(&table_checksum(data).to_be_bytes());
    output.extend_from_slice(&(offset as u32).to_be_bytes());
    output.extend_from_slice(&(data.len() as u32).to_be_bytes());
    offset += (data.len() + 3) & !3;
  }

  for (_, data) in &tables {
    output.extend_from_slice(data);
    output.resize((output.len() + 3) & !3, 0);
  }

  if let Some(head_offset) = head_offset {
    let adjustment = HEAD_CHECKSUM_MAGIC.wrapping_sub(table_checksum(&output));
    write_u32(&mut output, head_offset + 8, adjustment);
  }

  output
}

/// Locates a table in an sfnt buffer without parsing anything else.
pub(crate) fn find_table<'a>(data: &'a [u8], tag: &TableTag) -> Option<&'a [u8]> {
  let num_tables = read_u16(data, 4)? as usize;
  (0..num_tables).find_map(|i| {
    let record = 12 + i * 16;
    if data.get(record..record + 4)? != tag {
      return None;
    }
    let offset = read_u32(data, record + 8)? as usize;
    let length = read_u32(data, record + 12)? as usize;
    data.get(offset..offset.checked_add(length)?)
  })
}
