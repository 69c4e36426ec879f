use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_USE_RESOLVERS: &str = "FONTLOADER_USE_RESOLVERS";
pub const ENV_DISABLE_WARNINGS: &str = "FONTLOADER_DISABLE_WARNINGS";
pub const ENV_DEBUG_LEVEL: &str = "FONTLOADER_DEBUG_LEVEL";
pub const ENV_TIMEOUT_MS: &str = "FONTLOADER_TIMEOUT_MS";

/// Native load timeout used when neither the options nor the call override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Raw `FONTLOADER_*` environment variables.
///
/// Captured once via [`RuntimeToggles::from_env`]; tests and embedders can build
/// one from a map instead.
#[derive(Debug, Clone, Default)]
pub struct RuntimeToggles {
  raw: HashMap<String, String>,
}

impl RuntimeToggles {
  /// Collects every `FONTLOADER_*` environment variable.
  pub fn from_env() -> Self {
    let raw = std::env::vars()
      .filter(|(k, _)| k.starts_with("FONTLOADER_"))
      .collect::<HashMap<_, _>>();
    Self { raw }
  }

  pub fn from_map(raw: HashMap<String, String>) -> Self {
    Self { raw }
  }

  /// Returns the raw string value for a toggle, if set.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.raw.get(key).map(String::as_str)
  }

  /// Whether the toggle is truthy (anything but `0`/`false`/`off`/`no`),
  /// or `default` when unset.
  pub fn truthy_with_default(&self, key: &str, default: bool) -> bool {
    self
      .get(key)
      .map(|v| !matches_ignore_case(v, &["0", "false", "off", "no"]))
      .unwrap_or(default)
  }

  /// Parse a toggle as `u64`, returning `None` when unset or unparseable.
  pub fn u64(&self, key: &str) -> Option<u64> {
    self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
  }
}

fn matches_ignore_case(value: &str, candidates: &[&str]) -> bool {
  let lower = value.trim().to_ascii_lowercase();
  candidates.iter().any(|c| lower == *c)
}

/// Minimum level a [`crate::logging::Logger`] lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Debug,
  #[default]
  Info,
  Warn,
  Error,
}

impl LogLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Warn => "warn",
      LogLevel::Error => "error",
    }
  }
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LogLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      other => Err(format!("unknown log level '{}'", other)),
    }
  }
}

/// Loader-wide settings.
///
/// # Examples
///
/// ```
/// use fontface_loader::config::{LoaderOptions, LogLevel};
/// use std::time::Duration;
///
/// let options = LoaderOptions::new()
///   .use_resolvers(false)
///   .debug_level(LogLevel::Debug)
///   .default_timeout(Duration::from_millis(250));
/// assert!(!options.use_resolvers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
  /// Send failed faces through the resolver and retry once
  pub use_resolvers: bool,
  /// Drop warn-level log events
  pub disable_warnings: bool,
  pub debug_level: LogLevel,
  pub default_timeout: Duration,
}

impl Default for LoaderOptions {
  fn default() -> Self {
    Self {
      use_resolvers: true,
      disable_warnings: false,
      debug_level: LogLevel::Info,
      default_timeout: DEFAULT_TIMEOUT,
    }
  }
}

impl LoaderOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Defaults overridden by `FONTLOADER_*` environment variables.
  pub fn from_env() -> Self {
    Self::from_toggles(&RuntimeToggles::from_env())
  }

  /// Defaults overridden by whichever toggles are set. Unparseable values are ignored.
  pub fn from_toggles(toggles: &RuntimeToggles) -> Self {
    let defaults = Self::default();
    Self {
      use_resolvers: toggles.truthy_with_default(ENV_USE_RESOLVERS, defaults.use_resolvers),
      disable_warnings: toggles.truthy_with_default(ENV_DISABLE_WARNINGS, defaults.disable_warnings),
      debug_level: toggles
        .get(ENV_DEBUG_LEVEL)
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.debug_level),
      default_timeout: toggles
        .u64(ENV_TIMEOUT_MS)
        .map(Duration::from_millis)
        .unwrap_or(defaults.default_timeout),
    }
  }

  pub fn use_resolvers(mut self, enabled: bool) -> Self {
    self.use_resolvers = enabled;
    self
  }

  pub fn disable_warnings(mut self, disabled: bool) -> Self {
    self.disable_warnings = disabled;
    self
  }

  pub fn debug_level(mut self, level: LogLevel) -> Self {
    self.debug_level = level;
    self
  }

  pub fn default_timeout(mut self, timeout: Duration) -> Self {
    self.default_timeout = timeout;
    self
  }
}
