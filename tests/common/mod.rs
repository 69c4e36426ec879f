#![allow(dead_code)]

use fontface_loader::error::{FontError, ResourceError};
use fontface_loader::font::{FontFaceDescriptors, Glyph, ParsedFont};
use fontface_loader::loader::registry::{FontRegistry, LoadedFace};
use fontface_loader::resource::{FetchedResource, ResourceFetcher};
use fontface_loader::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A small TrueType font: `.notdef`, `A`, `B` and a space.
pub fn sample_font(family: &str) -> ParsedFont {
  let mut font = ParsedFont::new(family, "Regular", 1000, 800, -200);
  font.push_glyph(Glyph::from_contours(0, 500, &[vec![(50, 0), (450, 0), (450, 700), (50, 700)]]).with_name(".notdef"));
  font.push_glyph(Glyph::from_contours(0, 600, &[vec![(0, 0), (600, 0), (300, 700)]]).with_unicode('A'));
  font.push_glyph(Glyph::from_contours(0, 620, &[vec![(40, 0), (560, 0), (560, 690), (40, 690)]]).with_unicode('B'));
  font.push_glyph(Glyph::new(0, 250).with_unicode(' '));
  font
}

pub fn sample_bytes(family: &str) -> Vec<u8> {
  sample_font(family).to_bytes().expect("sample font serializes")
}

// ============================================================================
// Registry double
// ============================================================================

/// In-memory registry with scripted slowness and failures.
#[derive(Default)]
pub struct MockRegistry {
  families: Mutex<BTreeMap<String, LoadedFace>>,
  /// Families whose first `load` call sleeps this long
  slow_first: Mutex<HashMap<String, Duration>>,
  /// Families whose `load` always fails
  failing_loads: Mutex<BTreeSet<String>>,
  /// Families whose `add` always fails
  rejecting_adds: Mutex<BTreeSet<String>>,
  /// Families whose next `add` fails once
  rejecting_next_add: Mutex<BTreeSet<String>>,
  load_calls: Mutex<HashMap<String, usize>>,
  pub adds: AtomicUsize,
}

impl MockRegistry {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn slow_first_load(&self, family: &str, delay: Duration) {
    self.slow_first.lock().insert(family.to_string(), delay);
  }

  pub fn fail_loads(&self, family: &str) {
    self.failing_loads.lock().insert(family.to_string());
  }

  pub fn reject_adds(&self, family: &str) {
    self.rejecting_adds.lock().insert(family.to_string());
  }

  pub fn reject_next_add(&self, family: &str) {
    self.rejecting_next_add.lock().insert(family.to_string());
  }

  pub fn load_calls(&self, family: &str) -> usize {
    self.load_calls.lock().get(family).copied().unwrap_or(0)
  }

  pub fn preload(&self, family: &str) {
    let face = LoadedFace::decode(family, Arc::new(sample_bytes(family)), FontFaceDescriptors::default())
      .expect("sample font decodes");
    self.families.lock().insert(family.to_string(), face);
  }
}

impl FontRegistry for MockRegistry {
  fn load(&self, family: &str, data: Arc<Vec<u8>>, descriptors: &FontFaceDescriptors) -> Result<LoadedFace> {
    let call = {
      let mut calls = self.load_calls.lock();
      let count = calls.entry(family.to_string()).or_insert(0);
      *count += 1;
      *count
    };
    if call == 1 {
      let delay = self.slow_first.lock().get(family).copied();
      if let Some(delay) = delay {
        thread::sleep(delay);
      }
    }
    if self.failing_loads.lock().contains(family) {
      return Err(
        FontError::LoadFailed {
          family: family.to_string(),
          reason: "invalid font format: scripted failure".to_string(),
        }
        .into(),
      );
    }
    LoadedFace::decode(family, data, descriptors.clone())
  }

  fn has(&self, family: &str) -> bool {
    self.families.lock().contains_key(family)
  }

  fn add(&self, face: LoadedFace) -> Result<()> {
    self.adds.fetch_add(1, Ordering::SeqCst);
    let reject_once = self.rejecting_next_add.lock().remove(&face.family);
    if reject_once || self.rejecting_adds.lock().contains(&face.family) {
      return Err(
        FontError::RegistrationFailed {
          family: face.family,
          reason: "scripted rejection".to_string(),
        }
        .into(),
      );
    }
    self.families.lock().insert(face.family.clone(), face);
    Ok(())
  }

  fn delete(&self, family: &str) -> bool {
    self.families.lock().remove(family).is_some()
  }

  fn families(&self) -> Vec<String> {
    self.families.lock().keys().cloned().collect()
  }
}

// ============================================================================
// Fetcher double
// ============================================================================

/// Serves canned bodies by URL and counts requests.
#[derive(Default)]
pub struct MockFetcher {
  bodies: Mutex<HashMap<String, Vec<u8>>>,
  pub requests: AtomicUsize,
}

impl MockFetcher {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn serve(&self, url: &str, body: Vec<u8>) {
    self.bodies.lock().insert(url.to_string(), body);
  }
}

impl ResourceFetcher for MockFetcher {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    self.requests.fetch_add(1, Ordering::SeqCst);
    match self.bodies.lock().get(url) {
      Some(body) => Ok(FetchedResource::new(body.clone(), Some("font/ttf".to_string()))),
      None => Err(Error::Resource(ResourceError::FetchFailed {
        url: url.to_string(),
        reason: "HTTP status 404".to_string(),
      })),
    }
  }
}
