//! Web font loading with validation, sanitizing and recovery.
//!
//! A [`FontLoader`] creates faces from URLs, files or in-memory buffers, loads
//! them concurrently under a timeout and registers the survivors with a
//! [`FontRegistry`]. Faces that fail are handed to the [`FontResolver`], which
//! runs the [`Sanitizer`] over the original bytes and retries once with the
//! cleaned font.

pub mod config;
pub mod error;
pub mod events;
pub mod font;
pub mod loader;
pub mod logging;
pub mod resolver;
pub mod resource;
pub mod sanitizer;

pub use config::{LoaderOptions, LogLevel, RuntimeToggles};
pub use error::{Error, FontError, ResourceError, Result};
pub use events::{EventBus, EventKind, FontLoadEvent, FontLoadSummary, ListenerId};
pub use font::{FontFaceDescriptors, FontFaceOptions, FontMetrics, Glyph, GlyphBounds, ParsedFont};
pub use loader::errors::{ErrorCategory, FontLoadError};
pub use loader::registry::{FontDbRegistry, FontRegistry, LoadedFace};
pub use loader::{FaceSource, FontFace, FontLoader, LoadParams};
pub use logging::Logger;
pub use resolver::FontResolver;
pub use resource::{FetchedResource, HttpFetcher, ResourceFetcher};
pub use sanitizer::{Rule, RuleCategory, Sanitizer, SanitizerResult, SanitizerStats, Severity, ValidationRule};
