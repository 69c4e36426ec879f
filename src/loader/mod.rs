//! Font loader
//!
//! [`FontLoader`] turns family/source pairs into registered fonts:
//!
//! ```text
//! create_* ──> FontFace ──> load ──> native load (fetch + decode) ──> registry
//!                              │            │ timeout / error
//!                              │            v
//!                              │        resolver (sanitize original bytes)
//!                              │            │ cleaned font
//!                              │            v
//!                              └──────> native load again (no further resolution)
//! ```
//!
//! Each face of a batch is loaded on its own scoped worker, and each native load
//! runs on a detached thread raced against a timeout. A load that settles after
//! its timeout is dropped on the floor: the waiter has already recorded the
//! timeout and moved on.
//!
//! # Example
//!
//! ```rust,ignore
//! use fontface_loader::{FontLoader, LoadParams, LoaderOptions};
//!
//! let loader = FontLoader::new(LoaderOptions::default());
//! let face = loader.create_from_url("Roboto", "https://example.com/roboto.ttf", None);
//! let summary = loader.load(&face.into_iter().collect::<Vec<_>>(), &LoadParams::default());
//! println!("{} of {} faces loaded", summary.succeeded, summary.total);
//! ```

pub mod errors;
pub mod registry;
pub mod validate;

use crate::config::LoaderOptions;
use crate::error::{Error, FontError, Result};
use crate::events::{EventBus, EventKind, FontLoadEvent, FontLoadSummary, ListenerId};
use crate::font::{FontFaceDescriptors, FontFaceOptions, ParsedFont};
use crate::logging::Logger;
use crate::resolver::FontResolver;
use crate::resource::{HttpFetcher, ResourceFetcher};
use crate::sanitizer::ValidationRule;
use errors::{ErrorCategory, ErrorTable, FontLoadError};
use parking_lot::Mutex;
use registry::{FontDbRegistry, FontRegistry, LoadedFace};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

// ============================================================================
// Faces and parameters
// ============================================================================

/// Where a face's bytes come from.
#[derive(Clone)]
pub enum FaceSource {
  Url(Url),
  Buffer(Arc<Vec<u8>>),
}

impl fmt::Debug for FaceSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FaceSource::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
      FaceSource::Buffer(data) => write!(f, "Buffer({} bytes)", data.len()),
    }
  }
}

/// One family bound to a binary source, ready to be loaded.
#[derive(Debug, Clone)]
pub struct FontFace {
  pub family: String,
  pub source: FaceSource,
  pub descriptors: FontFaceDescriptors,
}

impl FontFace {
  pub fn new(family: impl Into<String>, source: FaceSource, descriptors: FontFaceDescriptors) -> Self {
    Self {
      family: family.into(),
      source,
      descriptors,
    }
  }
}

/// Per-call load settings.
#[derive(Debug, Clone, Default)]
pub struct LoadParams {
  /// Overrides [`LoaderOptions::default_timeout`]
  pub timeout: Option<Duration>,
  /// Rules handed to the resolver when a face fails
  pub rules: Vec<ValidationRule>,
}

impl LoadParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_rules(mut self, rules: Vec<ValidationRule>) -> Self {
    self.rules = rules;
    self
  }
}

#[derive(Debug, Clone)]
pub struct UrlFontRequest {
  pub family: String,
  pub url: String,
  pub options: Option<FontFaceOptions>,
}

#[derive(Debug, Clone)]
pub struct FileFontRequest {
  pub family: String,
  pub path: PathBuf,
  pub options: Option<FontFaceOptions>,
}

#[derive(Debug, Clone)]
pub struct BufferFontRequest {
  pub family: String,
  pub bytes: Vec<u8>,
  pub options: Option<FontFaceOptions>,
}

// ============================================================================
// Loader state
// ============================================================================

#[derive(Debug, Default)]
struct FontResource {
  original: Option<Arc<Vec<u8>>>,
  parsed: Option<ParsedFont>,
}

#[derive(Debug, Default)]
struct LoaderState {
  resources: BTreeMap<String, FontResource>,
  errors: ErrorTable,
  loaded: BTreeSet<String>,
  faces: BTreeMap<String, FontFace>,
}

enum WorkerMessage {
  /// URL bytes arrived; kept as the family's original buffer
  Fetched(Arc<Vec<u8>>),
  Settled(Result<LoadedFace>),
}

/// Loads, validates, repairs and registers fonts.
pub struct FontLoader {
  options: LoaderOptions,
  logger: Logger,
  registry: Arc<dyn FontRegistry>,
  fetcher: Arc<dyn ResourceFetcher>,
  resolver: FontResolver,
  state: Mutex<LoaderState>,
  events: EventBus,
}

impl fmt::Debug for FontLoader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("FontLoader")
      .field("options", &self.options)
      .field("faces", &state.faces.len())
      .field("loaded", &state.loaded)
      .field("errors", &state.errors.len())
      .finish()
  }
}

impl Default for FontLoader {
  fn default() -> Self {
    Self::new(LoaderOptions::default())
  }
}

impl FontLoader {
  /// A loader backed by a fresh `fontdb` registry and the HTTP fetcher.
  pub fn new(options: LoaderOptions) -> Self {
    Self {
      logger: Logger::from_options(&options),
      options,
      registry: Arc::new(FontDbRegistry::new()),
      fetcher: Arc::new(HttpFetcher::new()),
      resolver: FontResolver::new(),
      state: Mutex::new(LoaderState::default()),
      events: EventBus::new(),
    }
  }

  pub fn with_registry(mut self, registry: Arc<dyn FontRegistry>) -> Self {
    self.registry = registry;
    self
  }

  pub fn with_fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
    self.fetcher = fetcher;
    self
  }

  pub fn with_logger(mut self, logger: Logger) -> Self {
    self.logger = logger;
    self
  }

  pub fn options(&self) -> &LoaderOptions {
    &self.options
  }

  pub fn registry(&self) -> &Arc<dyn FontRegistry> {
    &self.registry
  }

  pub fn events(&self) -> &EventBus {
    &self.events
  }

  // ==========================================================================
  // Face creation
  // ==========================================================================

  /// Validates `family` and `url` and creates a face whose bytes are fetched on
  /// first load.
  ///
  /// Returns `None` after recording one `validation` error when either check
  /// fails. The family is checked first.
  pub fn create_from_url(&self, family: &str, url: &str, options: Option<&FontFaceOptions>) -> Option<FontFace> {
    let family = self.validated_family(family)?;
    let url = match validate::sanitize_url(url) {
      Ok(url) => url,
      Err(err) => {
        self.reject(&family, err);
        return None;
      }
    };
    Some(self.register_face(family, FaceSource::Url(url), options, None))
  }

  /// Reads `path` and creates a face from its bytes.
  pub fn create_from_file(
    &self,
    path: impl AsRef<Path>,
    family: &str,
    options: Option<&FontFaceOptions>,
  ) -> Option<FontFace> {
    let family = self.validated_family(family)?;
    let path = path.as_ref();
    match std::fs::read(path) {
      Ok(bytes) => {
        let data = Arc::new(bytes);
        Some(self.register_face(family, FaceSource::Buffer(Arc::clone(&data)), options, Some(data)))
      }
      Err(err) => {
        self
          .logger
          .error(format_args!("Failed to read font file {}: {}", path.display(), err));
        self.record_error(&family, FontLoadError::from(Error::Io(err)));
        None
      }
    }
  }

  pub fn create_from_buffer(
    &self,
    bytes: impl Into<Vec<u8>>,
    family: &str,
    options: Option<&FontFaceOptions>,
  ) -> Option<FontFace> {
    let family = self.validated_family(family)?;
    let data = Arc::new(bytes.into());
    Some(self.register_face(family, FaceSource::Buffer(Arc::clone(&data)), options, Some(data)))
  }

  fn validated_family(&self, family: &str) -> Option<String> {
    match validate::sanitize_family_name(family) {
      Ok(family) => Some(family),
      Err(err) => {
        self.reject(family, err);
        None
      }
    }
  }

  fn reject(&self, family: &str, err: FontError) {
    self.logger.warn(format_args!("Rejected font '{}': {}", family, err));
    self.record_error(family, FontLoadError::from(err));
  }

  /// Replaces any earlier buffer/parse state for the family.
  fn register_face(
    &self,
    family: String,
    source: FaceSource,
    options: Option<&FontFaceOptions>,
    original: Option<Arc<Vec<u8>>>,
  ) -> FontFace {
    let descriptors = options.map(FontFaceOptions::normalize).unwrap_or_default();
    let face = FontFace::new(family.clone(), source, descriptors);
    {
      let mut state = self.state.lock();
      state.resources.insert(family.clone(), FontResource { original, parsed: None });
      state.faces.insert(family.clone(), face.clone());
    }
    self.logger.debug(format_args!("Created font face '{}'", family));
    self.events.emit(&FontLoadEvent::Added { family });
    face
  }

  // ==========================================================================
  // Loading
  // ==========================================================================

  /// Loads every face concurrently and waits for all of them.
  ///
  /// Never fails: per-face failures are recorded in the error table and counted
  /// in the returned summary, which is also emitted as
  /// [`FontLoadEvent::Finished`].
  pub fn load(&self, faces: &[FontFace], params: &LoadParams) -> FontLoadSummary {
    self.load_batch(faces, params, Vec::new())
  }

  pub fn load_from_urls(&self, requests: &[UrlFontRequest], params: &LoadParams) -> FontLoadSummary {
    let mut faces = Vec::new();
    let mut rejected = Vec::new();
    for request in requests {
      match self.create_from_url(&request.family, &request.url, request.options.as_ref()) {
        Some(face) => faces.push(face),
        None => rejected.push(request.family.clone()),
      }
    }
    self.load_batch(&faces, params, rejected)
  }

  pub fn load_from_files(&self, requests: &[FileFontRequest], params: &LoadParams) -> FontLoadSummary {
    let mut faces = Vec::new();
    let mut rejected = Vec::new();
    for request in requests {
      match self.create_from_file(&request.path, &request.family, request.options.as_ref()) {
        Some(face) => faces.push(face),
        None => rejected.push(request.family.clone()),
      }
    }
    self.load_batch(&faces, params, rejected)
  }

  pub fn load_from_buffers(&self, requests: &[BufferFontRequest], params: &LoadParams) -> FontLoadSummary {
    let mut faces = Vec::new();
    let mut rejected = Vec::new();
    for request in requests {
      match self.create_from_buffer(request.bytes.clone(), &request.family, request.options.as_ref()) {
        Some(face) => faces.push(face),
        None => rejected.push(request.family.clone()),
      }
    }
    self.load_batch(&faces, params, rejected)
  }

  fn load_batch(&self, faces: &[FontFace], params: &LoadParams, rejected: Vec<String>) -> FontLoadSummary {
    let timeout = params.timeout.unwrap_or(self.options.default_timeout);
    let total = faces.len() + rejected.len();
    self.events.emit(&FontLoadEvent::Start {
      families: faces.iter().map(|f| f.family.clone()).collect(),
    });
    self.logger.info(format_args!(
      "Loading {} font face(s) with a {}ms timeout",
      faces.len(),
      timeout.as_millis()
    ));

    let completed = AtomicUsize::new(rejected.len());
    let outcomes: Vec<bool> = thread::scope(|scope| {
      let handles: Vec<_> = faces
        .iter()
        .map(|face| {
          let completed = &completed;
          scope.spawn(move || {
            let ok = self.load_face(face, params, timeout, self.options.use_resolvers);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.events.emit(&FontLoadEvent::Progress {
              family: face.family.clone(),
              completed: done,
              total,
            });
            ok
          })
        })
        .collect();
      handles.into_iter().map(|h| h.join().unwrap_or(false)).collect()
    });

    let mut failed_families = rejected;
    failed_families.extend(
      faces
        .iter()
        .zip(&outcomes)
        .filter(|(_, ok)| !**ok)
        .map(|(face, _)| face.family.clone()),
    );
    let summary = FontLoadSummary {
      total,
      succeeded: total - failed_families.len(),
      failed: failed_families.len(),
      failed_families,
    };

    self.logger.info(format_args!(
      "Font loading finished: {} succeeded, {} failed",
      summary.succeeded, summary.failed
    ));
    self.events.emit(&FontLoadEvent::Finished(summary.clone()));
    summary
  }

  /// Loads and registers one face; returns whether it ended up registered.
  fn load_face(&self, face: &FontFace, params: &LoadParams, timeout: Duration, resolve: bool) -> bool {
    let family = face.family.as_str();
    if self.registry.has(family) {
      self.logger.debug(format_args!("Font '{}' is already registered", family));
      self.mark_loaded(family);
      return true;
    }

    let outcome = self
      .native_load(face, timeout)
      .and_then(|loaded| self.registry.add(loaded));
    let err = match outcome {
      Ok(()) => {
        self.mark_loaded(family);
        self.logger.info(format_args!("Font '{}' loaded", family));
        self.events.emit(&FontLoadEvent::FontAdded {
          family: family.to_string(),
        });
        self.events.emit(&FontLoadEvent::Complete {
          family: family.to_string(),
        });
        return true;
      }
      Err(err) => err,
    };

    if matches!(err, Error::Font(FontError::LoadTimeout { .. })) {
      self.logger.warn(format_args!("Font '{}' timed out after {}ms", family, timeout.as_millis()));
      self.events.emit(&FontLoadEvent::Timeout {
        family: family.to_string(),
        timeout,
      });
    } else {
      self.logger.error(format_args!("Font '{}' failed to load: {}", family, err));
    }

    let trigger = match &err {
      Error::Font(font_err) => font_err.clone(),
      other => FontError::LoadFailed {
        family: family.to_string(),
        reason: other.to_string(),
      },
    };
    self.fail(family, FontLoadError::from(err));

    if resolve && self.options.use_resolvers {
      self.resolve_face(face, trigger, params, timeout)
    } else {
      false
    }
  }

  /// Runs the fetch + decode on a detached thread and waits at most `timeout`.
  fn native_load(&self, face: &FontFace, timeout: Duration) -> Result<LoadedFace> {
    let (tx, rx) = mpsc::channel();
    let registry = Arc::clone(&self.registry);
    let fetcher = Arc::clone(&self.fetcher);
    let family = face.family.clone();
    let descriptors = face.descriptors.clone();
    let source = match &face.source {
      FaceSource::Buffer(data) => FaceSource::Buffer(Arc::clone(data)),
      FaceSource::Url(url) => match self.original_buffer(&face.family) {
        Some(data) => FaceSource::Buffer(data),
        None => FaceSource::Url(url.clone()),
      },
    };

    thread::Builder::new()
      .name(format!("font-load-{}", family))
      .spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
          let data = match &source {
            FaceSource::Buffer(data) => Arc::clone(data),
            FaceSource::Url(url) => {
              let fetched = Arc::new(fetcher.fetch(url.as_str())?.bytes);
              let _ = tx.send(WorkerMessage::Fetched(Arc::clone(&fetched)));
              fetched
            }
          };
          registry.load(&family, data, &descriptors)
        }));
        let result = outcome
          .unwrap_or_else(|_| Err(Error::Other(format!("font load worker for '{}' panicked", family))));
        // The waiter may have given up already.
        let _ = tx.send(WorkerMessage::Settled(result));
      })
      .map_err(Error::Io)?;

    let deadline = Instant::now() + timeout;
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      match rx.recv_timeout(remaining) {
        Ok(WorkerMessage::Fetched(data)) => self.store_original(&face.family, data),
        Ok(WorkerMessage::Settled(result)) => return result,
        Err(RecvTimeoutError::Timeout) => {
          return Err(
            FontError::LoadTimeout {
              family: face.family.clone(),
              timeout_ms: timeout.as_millis() as u64,
            }
            .into(),
          )
        }
        Err(RecvTimeoutError::Disconnected) => {
          return Err(Error::Other(format!(
            "font load worker for '{}' exited without a result",
            face.family
          )))
        }
      }
    }
  }

  /// Sends the family's original bytes through the resolver and loads the
  /// cleaned font once.
  fn resolve_face(&self, face: &FontFace, trigger: FontError, params: &LoadParams, timeout: Duration) -> bool {
    let family = face.family.as_str();
    // Nothing to repair (e.g. the fetch itself failed); the load error stands.
    let Some(original) = self.original_buffer(family) else {
      self.logger.warn(format_args!(
        "No original buffer to resolve font '{}': {}",
        family, trigger
      ));
      return false;
    };

    self.logger.info(format_args!("Resolving font '{}'", family));
    let result = self.resolver.resolve(&original, trigger, &params.rules);
    let cleaned = match result.font {
      Some(bytes) if result.success => bytes,
      _ => {
        let category = if result.errors.iter().any(|e| {
          matches!(
            e,
            FontError::InvalidFontData { .. } | FontError::GlyphExtraction { .. }
          )
        }) {
          ErrorCategory::Format
        } else {
          ErrorCategory::Sanitizer
        };
        self.logger.error(format_args!("Font '{}' could not be resolved: {}", family, result.message));
        self.fail(
          family,
          FontLoadError::from_chain(
            category,
            Error::Font(FontError::Unresolved {
              family: family.to_string(),
              message: result.message,
            }),
            &result.errors,
          ),
        );
        return false;
      }
    };

    self.events.emit(&FontLoadEvent::Resolved {
      family: family.to_string(),
    });
    let resolved = FontFace::new(
      family,
      FaceSource::Buffer(Arc::new(cleaned)),
      face.descriptors.clone(),
    );
    self.load_face(&resolved, params, timeout, false)
  }

  // ==========================================================================
  // Unloading and parsing
  // ==========================================================================

  /// Drops all bookkeeping for a loaded family and removes it from the registry.
  ///
  /// # Errors
  ///
  /// [`FontError::NotLoaded`] when the family is not tracked as loaded; nothing
  /// is changed in that case.
  pub fn unload(&self, family: &str) -> Result<()> {
    {
      let mut state = self.state.lock();
      if !state.loaded.remove(family) {
        return Err(
          FontError::NotLoaded {
            family: family.to_string(),
          }
          .into(),
        );
      }
      state.resources.remove(family);
      state.errors.remove(family);
      state.faces.remove(family);
    }
    self.registry.delete(family);
    self.logger.info(format_args!("Font '{}' unloaded", family));
    self.events.emit(&FontLoadEvent::FontRemoved {
      family: family.to_string(),
    });
    Ok(())
  }

  /// Unloads every loaded family; returns how many were removed.
  pub fn unload_all(&self) -> usize {
    self
      .get_loaded_font_faces()
      .iter()
      .filter(|family| self.unload(family).is_ok())
      .count()
  }

  /// Parses the family's original bytes into a [`ParsedFont`], fetching them
  /// first for URL faces that have not been loaded yet.
  pub fn parse(&self, family: &str) -> Result<()> {
    let data = match self.original_buffer(family) {
      Some(data) => data,
      None => {
        let url = {
          let state = self.state.lock();
          match state.faces.get(family).map(|f| &f.source) {
            Some(FaceSource::Url(url)) => url.clone(),
            _ => {
              return Err(
                FontError::MissingBuffer {
                  family: family.to_string(),
                }
                .into(),
              )
            }
          }
        };
        let data = Arc::new(self.fetcher.fetch(url.as_str())?.bytes);
        self.store_original(family, Arc::clone(&data));
        data
      }
    };

    let parsed = ParsedFont::parse(&data)?;
    self.logger.debug(format_args!(
      "Parsed font '{}': {} glyphs, {} units per em",
      family,
      parsed.num_glyphs(),
      parsed.units_per_em
    ));
    self
      .state
      .lock()
      .resources
      .entry(family.to_string())
      .or_default()
      .parsed = Some(parsed);
    Ok(())
  }

  /// Unloads everything, forgets every face and error, and drops all listeners.
  pub fn destroy(&self) {
    self.unload_all();
    *self.state.lock() = LoaderState::default();
    self.events.remove_all_listeners(None);
    self.logger.debug("Font loader destroyed");
  }

  // ==========================================================================
  // Queries
  // ==========================================================================

  pub fn is_loaded(&self, family: &str) -> bool {
    self.state.lock().loaded.contains(family)
  }

  pub fn is_parsed(&self, family: &str) -> bool {
    self
      .state
      .lock()
      .resources
      .get(family)
      .map_or(false, |r| r.parsed.is_some())
  }

  pub fn is_errored(&self, family: &str) -> bool {
    self.state.lock().errors.has(family)
  }

  pub fn get_font_face_error(&self, family: &str) -> Option<FontLoadError> {
    self.state.lock().errors.get(family).cloned()
  }

  pub fn get_font_face_errors(&self) -> BTreeMap<String, FontLoadError> {
    self
      .state
      .lock()
      .errors
      .iter()
      .map(|(family, err)| (family.clone(), err.clone()))
      .collect()
  }

  pub fn get_failed_font_faces(&self) -> Vec<String> {
    self.state.lock().errors.families()
  }

  pub fn get_parsed_font_faces(&self) -> Vec<String> {
    self
      .state
      .lock()
      .resources
      .iter()
      .filter(|(_, r)| r.parsed.is_some())
      .map(|(family, _)| family.clone())
      .collect()
  }

  pub fn get_font_face_data(&self, family: &str) -> Option<ParsedFont> {
    self
      .state
      .lock()
      .resources
      .get(family)
      .and_then(|r| r.parsed.clone())
  }

  /// Every face created through this loader and not yet unloaded.
  pub fn get_font_faces(&self) -> Vec<FontFace> {
    self.state.lock().faces.values().cloned().collect()
  }

  pub fn get_loaded_font_faces(&self) -> Vec<String> {
    self.state.lock().loaded.iter().cloned().collect()
  }

  // ==========================================================================
  // Events
  // ==========================================================================

  pub fn on(&self, kind: EventKind, handler: impl Fn(&FontLoadEvent) + Send + Sync + 'static) -> ListenerId {
    self.events.on(kind, handler)
  }

  pub fn off(&self, id: ListenerId) -> bool {
    self.events.off(id)
  }

  pub fn listener_count(&self, kind: EventKind) -> usize {
    self.events.listener_count(kind)
  }

  pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
    self.events.remove_all_listeners(kind)
  }

  // ==========================================================================
  // Bookkeeping helpers
  // ==========================================================================

  fn original_buffer(&self, family: &str) -> Option<Arc<Vec<u8>>> {
    self
      .state
      .lock()
      .resources
      .get(family)
      .and_then(|r| r.original.clone())
  }

  fn store_original(&self, family: &str, data: Arc<Vec<u8>>) {
    self
      .state
      .lock()
      .resources
      .entry(family.to_string())
      .or_default()
      .original = Some(data);
  }

  fn mark_loaded(&self, family: &str) {
    let mut state = self.state.lock();
    state.loaded.insert(family.to_string());
    state.errors.remove(family);
  }

  fn record_error(&self, family: &str, error: FontLoadError) {
    self.state.lock().errors.record(family, error);
  }

  /// Records `error` and announces it.
  fn fail(&self, family: &str, error: FontLoadError) {
    self.record_error(family, error.clone());
    self.events.emit(&FontLoadEvent::Error {
      family: family.to_string(),
      error,
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::font::{FontStyle, Glyph};

  fn font_bytes(family: &str) -> Vec<u8> {
    let mut font = ParsedFont::new(family, "Regular", 1000, 800, -200);
    font.push_glyph(Glyph::from_contours(0, 500, &[vec![(0, 0), (500, 0), (250, 700)]]));
    font.to_bytes().unwrap()
  }

  #[test]
  fn test_create_from_url_validates_family_first() {
    let loader = FontLoader::default();
    assert!(loader.create_from_url("Bad;Name", "ftp://x.com/a.ttf", None).is_none());

    let errors = loader.get_font_face_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["Bad;Name"].category, ErrorCategory::Validation);
    assert!(matches!(
      errors["Bad;Name"].source.as_deref(),
      Some(Error::Font(FontError::InvalidFamily { .. }))
    ));
  }

  #[test]
  fn test_create_from_url_accepts_font_url() {
    let loader = FontLoader::default();
    let options = FontFaceOptions {
      style: Some("italic".to_string()),
      ..FontFaceOptions::default()
    };
    let face = loader
      .create_from_url("Roboto", "https://example.com/a.ttf", Some(&options))
      .unwrap();
    assert_eq!(face.family, "Roboto");
    assert_eq!(face.descriptors.style, Some(FontStyle::Italic));
    assert!(matches!(face.source, FaceSource::Url(_)));
    assert!(!loader.is_errored("Roboto"));
    assert_eq!(loader.get_font_faces().len(), 1);
  }

  #[test]
  fn test_bad_url_records_under_sanitized_family() {
    let loader = FontLoader::default();
    assert!(loader.create_from_url("  Open  Sans ", "https://example.com/a.png", None).is_none());
    assert!(loader.is_errored("Open Sans"));
  }

  #[test]
  fn test_create_from_buffer_then_parse() {
    let loader = FontLoader::default();
    loader.create_from_buffer(font_bytes("Parsed"), "Parsed", None).unwrap();
    assert!(!loader.is_parsed("Parsed"));

    loader.parse("Parsed").unwrap();
    assert!(loader.is_parsed("Parsed"));
    let data = loader.get_font_face_data("Parsed").unwrap();
    assert_eq!(data.units_per_em, 1000);
    assert_eq!(data.ascender, 800);
    assert_eq!(data.descender, -200);
    assert_eq!(loader.get_parsed_font_faces(), vec!["Parsed".to_string()]);
  }

  #[test]
  fn test_recreate_drops_parse_state() {
    let loader = FontLoader::default();
    loader.create_from_buffer(font_bytes("Again"), "Again", None).unwrap();
    loader.parse("Again").unwrap();
    loader.create_from_buffer(font_bytes("Again"), "Again", None).unwrap();
    assert!(!loader.is_parsed("Again"));
  }

  #[test]
  fn test_parse_without_buffer_fails() {
    let loader = FontLoader::default();
    assert!(loader.parse("Missing").is_err());
    assert!(!loader.is_errored("Missing"));
  }

  #[test]
  fn test_load_and_unload_with_fontdb() {
    let loader = FontLoader::default();
    let face = loader.create_from_buffer(font_bytes("Local"), "Local", None).unwrap();
    let summary = loader.load(&[face], &LoadParams::default());
    assert_eq!(summary.succeeded, 1);
    assert!(loader.is_loaded("Local"));
    assert!(loader.registry().has("Local"));

    loader.unload("Local").unwrap();
    assert!(!loader.is_loaded("Local"));
    assert!(!loader.registry().has("Local"));
    assert!(loader.unload("Local").is_err());
  }
}
