//! Font byte fetching
//!
//! URL-sourced faces get their bytes through a [`ResourceFetcher`]. The loader
//! only needs "give me the bytes behind this URL", so tests and embedders can
//! swap in their own fetcher (offline fixtures, caches, rate limiting).
//!
//! # Example
//!
//! ```rust,ignore
//! use fontface_loader::resource::{HttpFetcher, ResourceFetcher};
//!
//! let fetcher = HttpFetcher::new();
//! let resource = fetcher.fetch("https://example.com/fonts/roboto.ttf")?;
//! println!("Got {} bytes", resource.bytes.len());
//! ```

use crate::error::{ResourceError, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!("fontface-loader/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

// ============================================================================
// Core types
// ============================================================================

/// Result of fetching a font resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
  pub bytes: Vec<u8>,
  /// Content-Type header value, if available (e.g. "font/woff2")
  pub content_type: Option<String>,
}

impl FetchedResource {
  pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
    Self { bytes, content_type }
  }

  /// Whether the server labelled the body as a font.
  pub fn is_font(&self) -> bool {
    self.content_type.as_deref().map_or(false, |ct| {
      let ct = ct.to_ascii_lowercase();
      ct.starts_with("font/")
        || ct.starts_with("application/font")
        || ct.starts_with("application/x-font")
        || ct == "application/vnd.ms-fontobject"
    })
  }
}

/// Source of font bytes for URL faces
///
/// Implementations must be `Send + Sync`: fetches run on the loader's worker
/// threads.
pub trait ResourceFetcher: Send + Sync {
  fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    (**self).fetch(url)
  }
}

// ============================================================================
// HttpFetcher - Default implementation
// ============================================================================

/// HTTP(S) fetcher built on `ureq`
///
/// # Example
///
/// ```rust,ignore
/// use fontface_loader::resource::HttpFetcher;
/// use std::time::Duration;
///
/// let fetcher = HttpFetcher::new()
///   .with_timeout(Duration::from_secs(10))
///   .with_user_agent("MyApp/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  timeout: Duration,
  user_agent: String,
  max_size: usize,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = user_agent.into();
    self
  }

  /// Set the maximum response size in bytes
  pub fn with_max_size(mut self, max_size: usize) -> Self {
    self.max_size = max_size;
    self
  }

  fn fetch_http(&self, url: &str) -> Result<FetchedResource> {
    let fetch_failed = |url: &str, reason: String| ResourceError::FetchFailed {
      url: url.to_string(),
      reason,
    };

    // Redirects and error statuses come back as responses; the loop below
    // resolves each hop against the current URL.
    let config = ureq::Agent::config_builder()
      .timeout_global(Some(self.timeout))
      .max_redirects(0)
      .http_status_as_error(false)
      .build();
    let agent: ureq::Agent = config.into();

    let mut current = url.to_string();
    for _ in 0..MAX_REDIRECTS {
      let mut response = agent
        .get(&current)
        .header("User-Agent", &self.user_agent)
        .header("Accept", "font/woff2, font/woff, font/ttf, font/otf, */*;q=0.5")
        .call()
        .map_err(|e| fetch_failed(&current, e.to_string()))?;

      let status = response.status();
      if status.is_redirection() {
        if let Some(loc) = response.headers().get("location").and_then(|h| h.to_str().ok()) {
          current = Url::parse(&current)
            .ok()
            .and_then(|base| base.join(loc).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| loc.to_string());
          continue;
        }
      }
      if !status.is_success() {
        return Err(fetch_failed(&current, format!("HTTP status {}", status.as_u16())).into());
      }

      let content_type = response
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

      let bytes = response
        .body_mut()
        .with_config()
        .limit(self.max_size as u64)
        .read_to_vec()
        .map_err(|e| match e {
          ureq::Error::BodyExceedsLimit(_) => ResourceError::TooLarge {
            url: current.clone(),
            limit: self.max_size,
          },
          other => fetch_failed(&current, other.to_string()),
        })?;

      if bytes.is_empty() {
        return Err(ResourceError::EmptyBody { url: current }.into());
      }
      return Ok(FetchedResource::new(bytes, content_type));
    }

    Err(fetch_failed(url, "too many redirects".to_string()).into())
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
      user_agent: DEFAULT_USER_AGENT.to_string(),
      max_size: 20 * 1024 * 1024,
    }
  }
}

impl ResourceFetcher for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    if url.starts_with("http://") || url.starts_with("https://") {
      self.fetch_http(url)
    } else {
      Err(
        ResourceError::UnsupportedScheme {
          url: url.to_string(),
        }
        .into(),
      )
    }
  }
}
