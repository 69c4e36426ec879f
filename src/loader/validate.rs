//! Creation-time checks for family names and font URLs.

use crate::error::FontError;
use url::Url;

pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];
pub const ALLOWED_EXTENSIONS: [&str; 6] = [".woff", ".woff2", ".ttf", ".otf", ".eot", ".svg"];

fn is_family_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace()
}

/// Trims and collapses whitespace in a family name.
///
/// # Errors
///
/// Any character outside ASCII word characters, whitespace and `-`, or a name
/// that is empty after trimming, is rejected.
pub fn sanitize_family_name(family: &str) -> Result<String, FontError> {
  let invalid = |reason: String| FontError::InvalidFamily {
    family: family.to_string(),
    reason,
  };

  if let Some(bad) = family.chars().find(|c| !is_family_char(*c)) {
    return Err(invalid(format!("contains disallowed character {:?}", bad)));
  }
  let collapsed = family.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed.is_empty() {
    return Err(invalid("family name is empty".to_string()));
  }
  Ok(collapsed)
}

/// Parses and normalizes a font URL.
///
/// # Errors
///
/// Rejects unparseable URLs, schemes other than http/https, and paths that do
/// not end in a known font extension (compared case-insensitively).
pub fn sanitize_url(url: &str) -> Result<Url, FontError> {
  let invalid = |reason: String| FontError::InvalidUrl {
    url: url.to_string(),
    reason,
  };

  let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
  if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
    return Err(invalid(format!("scheme '{}' is not allowed", parsed.scheme())));
  }
  let path = parsed.path().to_ascii_lowercase();
  if !ALLOWED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
    return Err(invalid("path does not end in a font file extension".to_string()));
  }
  Ok(parsed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_family_whitespace_is_collapsed() {
    assert_eq!(sanitize_family_name("  Open   Sans ").unwrap(), "Open Sans");
    assert_eq!(sanitize_family_name("Noto_Sans-Mono").unwrap(), "Noto_Sans-Mono");
  }

  #[test]
  fn test_family_rejects_stripped_characters() {
    for bad in ["Bad;Name", "Roboto\"", "a<b>", "Caf\u{e9}"] {
      assert!(
        matches!(sanitize_family_name(bad), Err(FontError::InvalidFamily { .. })),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn test_family_rejects_empty() {
    assert!(sanitize_family_name("").is_err());
    assert!(sanitize_family_name("   ").is_err());
  }

  #[test]
  fn test_url_accepts_font_paths() {
    let url = sanitize_url("https://example.com/fonts/a.ttf").unwrap();
    assert_eq!(url.as_str(), "https://example.com/fonts/a.ttf");
    assert!(sanitize_url("http://example.com/A.WOFF2?v=3").is_ok());
  }

  #[test]
  fn test_url_rejections() {
    for bad in [
      "ftp://x.com/a.ttf",
      "file:///etc/a.ttf",
      "https://example.com/a.png",
      "https://example.com/",
      "not a url",
    ] {
      assert!(
        matches!(sanitize_url(bad), Err(FontError::InvalidUrl { .. })),
        "{bad} should be rejected"
      );
    }
  }
}
