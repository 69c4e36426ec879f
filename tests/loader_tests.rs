mod common;

use common::{sample_bytes, MockFetcher, MockRegistry};
use fontface_loader::error::FontError;
use fontface_loader::loader::registry::FontRegistry;
use fontface_loader::loader::{BufferFontRequest, FileFontRequest, UrlFontRequest};
use fontface_loader::{
  Error, ErrorCategory, EventKind, FontLoadEvent, FontLoader, LoadParams, LoaderOptions,
};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ALL_KINDS: [EventKind; 10] = [
  EventKind::FontLoadStart,
  EventKind::FontLoadProgress,
  EventKind::FontLoadTimeout,
  EventKind::FontLoadError,
  EventKind::FontLoadComplete,
  EventKind::FontLoadFinished,
  EventKind::FontLoadAdded,
  EventKind::FontLoadResolved,
  EventKind::FontAdded,
  EventKind::FontRemoved,
];

fn loader_with(registry: &Arc<MockRegistry>, options: LoaderOptions) -> FontLoader {
  FontLoader::new(options)
    .with_registry(registry.clone())
    .with_fetcher(MockFetcher::new())
}

fn record_events(loader: &FontLoader) -> Arc<Mutex<Vec<FontLoadEvent>>> {
  let events = Arc::new(Mutex::new(Vec::new()));
  for kind in ALL_KINDS {
    let sink = Arc::clone(&events);
    loader.on(kind, move |event| sink.lock().push(event.clone()));
  }
  events
}

fn count(events: &Mutex<Vec<FontLoadEvent>>, kind: EventKind) -> usize {
  events.lock().iter().filter(|e| e.kind() == kind).count()
}

fn buffers(families: &[&str]) -> Vec<BufferFontRequest> {
  families
    .iter()
    .map(|family| BufferFontRequest {
      family: family.to_string(),
      bytes: sample_bytes(family),
      options: None,
    })
    .collect()
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn timeout_records_one_error_and_resolves_once() {
  let registry = MockRegistry::new();
  registry.slow_first_load("Sleepy", Duration::from_millis(400));
  let loader = loader_with(&registry, LoaderOptions::new());
  let events = record_events(&loader);

  let face = loader.create_from_buffer(sample_bytes("Sleepy"), "Sleepy", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::new().with_timeout(Duration::from_millis(50)));

  assert_eq!(summary.succeeded, 1);
  assert_eq!(count(&events, EventKind::FontLoadTimeout), 1);
  assert_eq!(count(&events, EventKind::FontLoadError), 1);
  assert_eq!(count(&events, EventKind::FontLoadResolved), 1);
  assert_eq!(registry.load_calls("Sleepy"), 2);
  assert!(loader.is_loaded("Sleepy"));
  assert!(!loader.is_errored("Sleepy"));

  let recorded = events.lock();
  let timeout_error = recorded
    .iter()
    .find_map(|e| match e {
      FontLoadEvent::Error { error, .. } => Some(error.category),
      _ => None,
    })
    .unwrap();
  assert_eq!(timeout_error, ErrorCategory::Timeout);
}

#[test]
fn late_result_after_timeout_is_discarded() {
  let registry = MockRegistry::new();
  registry.slow_first_load("Late", Duration::from_millis(200));
  let loader = loader_with(&registry, LoaderOptions::new().use_resolvers(false));

  let face = loader.create_from_buffer(sample_bytes("Late"), "Late", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::new().with_timeout(Duration::from_millis(20)));
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.failed_families, vec!["Late".to_string()]);

  // Give the abandoned worker time to settle.
  thread::sleep(Duration::from_millis(400));
  assert!(!loader.is_loaded("Late"));
  assert!(!registry.has("Late"));
  assert_eq!(registry.adds.load(Ordering::SeqCst), 0);

  let errors = loader.get_font_face_errors();
  assert_eq!(errors.len(), 1);
  assert_eq!(errors["Late"].category, ErrorCategory::Timeout);
  assert!(matches!(
    errors["Late"].source.as_deref(),
    Some(Error::Font(FontError::LoadTimeout { timeout_ms: 20, .. }))
  ));
}

#[test]
fn default_timeout_comes_from_options() {
  let registry = MockRegistry::new();
  registry.slow_first_load("Slow", Duration::from_millis(300));
  let loader = loader_with(
    &registry,
    LoaderOptions::new()
      .use_resolvers(false)
      .default_timeout(Duration::from_millis(30)),
  );
  let face = loader.create_from_buffer(sample_bytes("Slow"), "Slow", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::default());
  assert_eq!(summary.failed, 1);
  assert_eq!(
    loader.get_font_face_error("Slow").map(|e| e.category),
    Some(ErrorCategory::Timeout)
  );
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn summary_counts_successes_and_failures() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new().use_resolvers(false));
  let events = record_events(&loader);

  let mut requests = buffers(&["One", "Two", "Three"]);
  requests.push(BufferFontRequest {
    family: "Broken".to_string(),
    bytes: b"wOF2 definitely not a font".to_vec(),
    options: None,
  });
  let summary = loader.load_from_buffers(&requests, &LoadParams::default());

  assert_eq!(summary.total, 4);
  assert_eq!(summary.succeeded, 3);
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.failed_families, vec!["Broken".to_string()]);
  assert_eq!(loader.get_failed_font_faces(), vec!["Broken".to_string()]);
  assert_eq!(
    loader.get_loaded_font_faces(),
    vec!["One".to_string(), "Three".to_string(), "Two".to_string()]
  );

  assert_eq!(count(&events, EventKind::FontLoadStart), 1);
  assert_eq!(count(&events, EventKind::FontLoadProgress), 4);
  assert_eq!(count(&events, EventKind::FontLoadComplete), 3);
  let finished = events
    .lock()
    .iter()
    .find_map(|e| match e {
      FontLoadEvent::Finished(summary) => Some(summary.clone()),
      _ => None,
    })
    .unwrap();
  assert_eq!(finished, summary);
}

#[test]
fn unparseable_font_fails_resolution_as_format_error() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());
  let events = record_events(&loader);

  let face = loader
    .create_from_buffer(b"wOF2 definitely not a font".to_vec(), "Woff2", None)
    .unwrap();
  let summary = loader.load(&[face], &LoadParams::default());

  assert_eq!(summary.failed, 1);
  assert_eq!(count(&events, EventKind::FontLoadResolved), 0);
  let error = loader.get_font_face_error("Woff2").unwrap();
  assert_eq!(error.category, ErrorCategory::Format);
  assert!(error.details.len() >= 2);
}

#[test]
fn resolver_runs_at_most_once_per_face() {
  let registry = MockRegistry::new();
  registry.fail_loads("Stubborn");
  let loader = loader_with(&registry, LoaderOptions::new());
  let events = record_events(&loader);

  let face = loader.create_from_buffer(sample_bytes("Stubborn"), "Stubborn", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::default());

  assert_eq!(summary.failed, 1);
  assert_eq!(registry.load_calls("Stubborn"), 2);
  assert_eq!(count(&events, EventKind::FontLoadResolved), 1);
  assert_eq!(count(&events, EventKind::FontLoadError), 2);
  assert_eq!(
    loader.get_font_face_error("Stubborn").map(|e| e.category),
    Some(ErrorCategory::Format)
  );
}

#[test]
fn registry_rejection_is_dom_exception() {
  let registry = MockRegistry::new();
  registry.reject_adds("Refused");
  let loader = loader_with(&registry, LoaderOptions::new().use_resolvers(false));

  let face = loader.create_from_buffer(sample_bytes("Refused"), "Refused", None).unwrap();
  loader.load(&[face], &LoadParams::default());
  assert_eq!(
    loader.get_font_face_error("Refused").map(|e| e.category),
    Some(ErrorCategory::DomException)
  );
}

#[test]
fn registry_rejection_is_resolved_and_retried_once() {
  let registry = MockRegistry::new();
  registry.reject_next_add("Second Try");
  let loader = loader_with(&registry, LoaderOptions::new());
  let events = record_events(&loader);

  let face = loader.create_from_buffer(sample_bytes("Second Try"), "Second Try", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::default());

  assert_eq!(summary.succeeded, 1);
  assert_eq!(registry.adds.load(Ordering::SeqCst), 2);
  assert_eq!(registry.load_calls("Second Try"), 2);
  assert_eq!(count(&events, EventKind::FontLoadResolved), 1);
  assert_eq!(count(&events, EventKind::FontLoadError), 1);
  assert!(loader.is_loaded("Second Try"));
  assert!(!loader.is_errored("Second Try"));
  assert!(registry.has("Second Try"));

  let first_error = events
    .lock()
    .iter()
    .find_map(|e| match e {
      FontLoadEvent::Error { error, .. } => Some(error.category),
      _ => None,
    })
    .unwrap();
  assert_eq!(first_error, ErrorCategory::DomException);
}

#[test]
fn already_registered_family_counts_as_success() {
  let registry = MockRegistry::new();
  registry.preload("Known");
  let loader = loader_with(&registry, LoaderOptions::new());

  let face = loader.create_from_buffer(sample_bytes("Known"), "Known", None).unwrap();
  let summary = loader.load(&[face], &LoadParams::default());
  assert_eq!(summary.succeeded, 1);
  assert_eq!(registry.load_calls("Known"), 0);
  assert!(loader.is_loaded("Known"));
}

// ============================================================================
// Creation and validation
// ============================================================================

#[test]
fn invalid_family_is_rejected_before_loading() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());

  let requests = vec![UrlFontRequest {
    family: "Bad;Name".to_string(),
    url: "https://fonts.example.com/bad.ttf".to_string(),
    options: None,
  }];
  let summary = loader.load_from_urls(&requests, &LoadParams::default());

  assert_eq!(summary.total, 1);
  assert_eq!(summary.failed_families, vec!["Bad;Name".to_string()]);
  let errors = loader.get_font_face_errors();
  assert_eq!(errors.len(), 1);
  assert_eq!(errors["Bad;Name"].category, ErrorCategory::Validation);
  assert!(loader.get_font_faces().is_empty());
}

#[test]
fn url_faces_are_fetched_once() {
  let registry = MockRegistry::new();
  let fetcher = MockFetcher::new();
  fetcher.serve("https://fonts.example.com/remote.ttf", sample_bytes("Remote"));
  let loader = FontLoader::new(LoaderOptions::new())
    .with_registry(registry.clone())
    .with_fetcher(fetcher.clone());

  let face = loader
    .create_from_url("Remote", "https://fonts.example.com/remote.ttf", None)
    .unwrap();
  let summary = loader.load(&[face], &LoadParams::default());
  assert_eq!(summary.succeeded, 1);

  loader.parse("Remote").unwrap();
  assert!(loader.is_parsed("Remote"));
  assert_eq!(fetcher.requests.load(Ordering::SeqCst), 1);
}

#[test]
fn fetch_failure_keeps_network_error() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());

  let face = loader
    .create_from_url("Gone", "https://fonts.example.com/gone.woff2", None)
    .unwrap();
  let summary = loader.load(&[face], &LoadParams::default());
  assert_eq!(summary.failed, 1);
  assert_eq!(
    loader.get_font_face_error("Gone").map(|e| e.category),
    Some(ErrorCategory::Network)
  );
}

#[test]
fn files_are_read_from_disk() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("disk.ttf");
  std::fs::write(&path, sample_bytes("Disk")).unwrap();

  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());
  let requests = vec![
    FileFontRequest {
      family: "Disk".to_string(),
      path,
      options: None,
    },
    FileFontRequest {
      family: "Missing".to_string(),
      path: dir.path().join("missing.ttf"),
      options: None,
    },
  ];
  let summary = loader.load_from_files(&requests, &LoadParams::default());

  assert_eq!(summary.total, 2);
  assert_eq!(summary.succeeded, 1);
  assert!(loader.is_loaded("Disk"));
  assert!(loader.is_errored("Missing"));
}

// ============================================================================
// Unloading
// ============================================================================

#[test]
fn unload_removes_loaded_family() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());
  let events = record_events(&loader);
  loader.load_from_buffers(&buffers(&["Gone Soon"]), &LoadParams::default());

  loader.unload("Gone Soon").unwrap();
  assert!(!loader.is_loaded("Gone Soon"));
  assert!(!registry.has("Gone Soon"));
  assert!(loader.get_font_faces().is_empty());
  assert_eq!(count(&events, EventKind::FontRemoved), 1);
}

#[test]
fn unload_of_untracked_family_changes_nothing() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());
  loader.load_from_buffers(&buffers(&["Kept"]), &LoadParams::default());

  let err = loader.unload("Stranger").unwrap_err();
  assert!(matches!(err, Error::Font(FontError::NotLoaded { .. })));
  assert!(loader.is_loaded("Kept"));
  assert_eq!(loader.get_font_faces().len(), 1);
}

#[test]
fn destroy_clears_everything() {
  let registry = MockRegistry::new();
  let loader = loader_with(&registry, LoaderOptions::new());
  let _events = record_events(&loader);
  loader.load_from_buffers(&buffers(&["A", "B"]), &LoadParams::default());
  loader.create_from_url("Bad;Name", "https://x.com/a.ttf", None);

  loader.destroy();
  assert!(loader.get_loaded_font_faces().is_empty());
  assert!(loader.get_font_face_errors().is_empty());
  assert!(loader.get_font_faces().is_empty());
  assert!(registry.families().is_empty());
  assert!(loader.events().event_kinds().is_empty());
}
