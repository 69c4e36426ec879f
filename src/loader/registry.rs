//! Font registry seam
//!
//! The loader never talks to a font database directly. It hands decoded faces to
//! a [`FontRegistry`], which owns the set of active fonts. [`FontDbRegistry`] is
//! the default, backed by `fontdb`; tests substitute their own.

use crate::error::{FontError, Result};
use crate::font::{FontFaceDescriptors, FontStretch, FontStyle};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A face that decoded successfully and is ready to register.
#[derive(Debug, Clone)]
pub struct LoadedFace {
  pub family: String,
  pub data: Arc<Vec<u8>>,
  pub descriptors: FontFaceDescriptors,
  /// Faces in the binary (more than one for collections)
  pub face_count: u32,
}

impl LoadedFace {
  /// Checks that `data` holds a font `ttf-parser` can open.
  pub fn decode(family: &str, data: Arc<Vec<u8>>, descriptors: FontFaceDescriptors) -> Result<Self> {
    let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    ttf_parser::Face::parse(&data, 0).map_err(|e| FontError::LoadFailed {
      family: family.to_string(),
      reason: format!("invalid font format: {}", e),
    })?;
    Ok(Self {
      family: family.to_string(),
      data,
      descriptors,
      face_count,
    })
  }
}

/// Table of active fonts
///
/// `load` is the native load the loader races against its timeout; it may block.
/// The remaining methods are expected to be quick.
pub trait FontRegistry: Send + Sync {
  fn load(&self, family: &str, data: Arc<Vec<u8>>, descriptors: &FontFaceDescriptors) -> Result<LoadedFace> {
    LoadedFace::decode(family, data, descriptors.clone())
  }

  fn has(&self, family: &str) -> bool;

  fn add(&self, face: LoadedFace) -> Result<()>;

  /// Returns whether the family was present.
  fn delete(&self, family: &str) -> bool;

  fn families(&self) -> Vec<String>;
}

impl<T: FontRegistry + ?Sized> FontRegistry for Arc<T> {
  fn load(&self, family: &str, data: Arc<Vec<u8>>, descriptors: &FontFaceDescriptors) -> Result<LoadedFace> {
    (**self).load(family, data, descriptors)
  }

  fn has(&self, family: &str) -> bool {
    (**self).has(family)
  }

  fn add(&self, face: LoadedFace) -> Result<()> {
    (**self).add(face)
  }

  fn delete(&self, family: &str) -> bool {
    (**self).delete(family)
  }

  fn families(&self) -> Vec<String> {
    (**self).families()
  }
}

// ============================================================================
// fontdb-backed registry
// ============================================================================

/// Registry backed by a `fontdb::Database`.
///
/// Faces are tracked by the family they were submitted under, which need not
/// match the family name stored inside the font. The submitted family is listed
/// first in each face's names, and any style, weight or stretch descriptor
/// replaces the value read from the font's OS/2 table. Relative weights
/// (`lighter`, `bolder`) leave the font's own weight in place.
#[derive(Default)]
pub struct FontDbRegistry {
  db: RwLock<fontdb::Database>,
  families: Mutex<BTreeMap<String, Vec<fontdb::ID>>>,
}

impl std::fmt::Debug for FontDbRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FontDbRegistry")
      .field("families", &self.families.lock().keys().collect::<Vec<_>>())
      .finish()
  }
}

impl FontDbRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Runs `f` against the underlying database.
  pub fn with_database<R>(&self, f: impl FnOnce(&fontdb::Database) -> R) -> R {
    f(&self.db.read())
  }

  /// Number of faces registered under `family`.
  pub fn face_count(&self, family: &str) -> usize {
    self.families.lock().get(family).map_or(0, Vec::len)
  }
}

impl FontRegistry for FontDbRegistry {
  fn has(&self, family: &str) -> bool {
    self.families.lock().contains_key(family)
  }

  fn add(&self, face: LoadedFace) -> Result<()> {
    let mut db = self.db.write();
    let before: HashSet<fontdb::ID> = db.faces().map(|info| info.id).collect();
    db.load_font_data(face.data.to_vec());
    let loaded: Vec<fontdb::FaceInfo> = db
      .faces()
      .filter(|info| !before.contains(&info.id))
      .cloned()
      .collect();
    let mut added = Vec::with_capacity(loaded.len());
    for mut info in loaded {
      db.remove_face(info.id);
      apply_descriptors(&mut info, &face.family, &face.descriptors);
      added.push(db.push_face_info(info));
    }
    drop(db);

    if added.is_empty() {
      return Err(
        FontError::RegistrationFailed {
          family: face.family,
          reason: "font database accepted no faces from the data".to_string(),
        }
        .into(),
      );
    }

    let replaced = self.families.lock().insert(face.family, added);
    if let Some(old) = replaced {
      let mut db = self.db.write();
      for id in old {
        db.remove_face(id);
      }
    }
    Ok(())
  }

  fn delete(&self, family: &str) -> bool {
    let Some(ids) = self.families.lock().remove(family) else {
      return false;
    };
    let mut db = self.db.write();
    for id in ids {
      db.remove_face(id);
    }
    true
  }

  fn families(&self) -> Vec<String> {
    self.families.lock().keys().cloned().collect()
  }
}

fn apply_descriptors(info: &mut fontdb::FaceInfo, family: &str, descriptors: &FontFaceDescriptors) {
  info.families.retain(|(name, _)| name != family);
  info
    .families
    .insert(0, (family.to_string(), fontdb::Language::English_UnitedStates));
  if let Some(style) = descriptors.style {
    info.style = match style {
      FontStyle::Normal => fontdb::Style::Normal,
      FontStyle::Italic => fontdb::Style::Italic,
      FontStyle::Oblique => fontdb::Style::Oblique,
    };
  }
  if let Some(weight) = descriptors.weight.and_then(|w| w.value()) {
    info.weight = fontdb::Weight(weight);
  }
  if let Some(stretch) = descriptors.stretch {
    info.stretch = match stretch {
      FontStretch::UltraCondensed => fontdb::Stretch::UltraCondensed,
      FontStretch::ExtraCondensed => fontdb::Stretch::ExtraCondensed,
      FontStretch::Condensed => fontdb::Stretch::Condensed,
      FontStretch::SemiCondensed => fontdb::Stretch::SemiCondensed,
      FontStretch::Normal => fontdb::Stretch::Normal,
      FontStretch::SemiExpanded => fontdb::Stretch::SemiExpanded,
      FontStretch::Expanded => fontdb::Stretch::Expanded,
      FontStretch::ExtraExpanded => fontdb::Stretch::ExtraExpanded,
      FontStretch::UltraExpanded => fontdb::Stretch::UltraExpanded,
    };
  }
}
