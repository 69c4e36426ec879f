//! Font-face descriptors
//!
//! Callers hand in loosely-typed [`FontFaceOptions`] (the strings one would put in
//! an `@font-face` rule); [`FontFaceOptions::normalize`] turns them into typed
//! [`FontFaceDescriptors`]. Values outside the allowed keyword sets are dropped,
//! except `display`, which falls back to `auto`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Font style (normal, italic, or oblique)
///
/// CSS font-style descriptor values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
  /// Normal upright text
  #[default]
  Normal,
  /// Italic text (designed italic letterforms)
  Italic,
  /// Oblique text (slanted version of normal)
  Oblique,
}

/// Font weight descriptor
///
/// Keywords plus the nine numeric weights `100..=900` in steps of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
  Normal,
  Bold,
  /// Relative to the inherited weight
  Lighter,
  /// Relative to the inherited weight
  Bolder,
  Numeric(u16),
}

impl FontWeight {
  /// Absolute weight value, `None` for relative keywords.
  pub fn value(self) -> Option<u16> {
    match self {
      FontWeight::Normal => Some(400),
      FontWeight::Bold => Some(700),
      FontWeight::Lighter | FontWeight::Bolder => None,
      FontWeight::Numeric(w) => Some(w),
    }
  }
}

impl Default for FontWeight {
  fn default() -> Self {
    Self::Normal
  }
}

/// Font stretch/width (condensed to expanded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStretch {
  /// Ultra Condensed (50%)
  UltraCondensed,
  /// Extra Condensed (62.5%)
  ExtraCondensed,
  /// Condensed (75%)
  Condensed,
  /// Semi Condensed (87.5%)
  SemiCondensed,
  /// Normal width (100%)
  #[default]
  Normal,
  /// Semi Expanded (112.5%)
  SemiExpanded,
  /// Expanded (125%)
  Expanded,
  /// Extra Expanded (150%)
  ExtraExpanded,
  /// Ultra Expanded (200%)
  UltraExpanded,
}

impl FontStretch {
  /// Convert to percentage value
  #[inline]
  pub fn to_percentage(self) -> f32 {
    match self {
      FontStretch::UltraCondensed => 50.0,
      FontStretch::ExtraCondensed => 62.5,
      FontStretch::Condensed => 75.0,
      FontStretch::SemiCondensed => 87.5,
      FontStretch::Normal => 100.0,
      FontStretch::SemiExpanded => 112.5,
      FontStretch::Expanded => 125.0,
      FontStretch::ExtraExpanded => 150.0,
      FontStretch::UltraExpanded => 200.0,
    }
  }
}

/// How a face is displayed while it loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
  #[default]
  Auto,
  Block,
  Swap,
  Fallback,
  Optional,
}

/// Value of `ascent-override`, `descent-override` and `line-gap-override`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricOverride {
  Normal,
  Inherit,
}

/// Error returned when a keyword is not part of a descriptor's value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKeyword(pub String);

impl fmt::Display for UnknownKeyword {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unknown descriptor keyword '{}'", self.0)
  }
}

impl std::error::Error for UnknownKeyword {}

macro_rules! keyword_enum {
  ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $ty {
      pub fn as_str(self) -> &'static str {
        match self {
          $($ty::$variant => $text),+
        }
      }
    }

    impl FromStr for $ty {
      type Err = UnknownKeyword;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok($ty::$variant),)+
          other => Err(UnknownKeyword(other.to_string())),
        }
      }
    }

    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

keyword_enum!(FontStyle {
  Normal => "normal",
  Italic => "italic",
  Oblique => "oblique",
});

keyword_enum!(FontStretch {
  UltraCondensed => "ultra-condensed",
  ExtraCondensed => "extra-condensed",
  Condensed => "condensed",
  SemiCondensed => "semi-condensed",
  Normal => "normal",
  SemiExpanded => "semi-expanded",
  Expanded => "expanded",
  ExtraExpanded => "extra-expanded",
  UltraExpanded => "ultra-expanded",
});

keyword_enum!(FontDisplay {
  Auto => "auto",
  Block => "block",
  Swap => "swap",
  Fallback => "fallback",
  Optional => "optional",
});

keyword_enum!(MetricOverride {
  Normal => "normal",
  Inherit => "inherit",
});

impl FromStr for FontWeight {
  type Err = UnknownKeyword;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "normal" => Ok(FontWeight::Normal),
      "bold" => Ok(FontWeight::Bold),
      "lighter" => Ok(FontWeight::Lighter),
      "bolder" => Ok(FontWeight::Bolder),
      "100" | "200" | "300" | "400" | "500" | "600" | "700" | "800" | "900" => s
        .parse::<u16>()
        .map(FontWeight::Numeric)
        .map_err(|_| UnknownKeyword(s.to_string())),
      other => Err(UnknownKeyword(other.to_string())),
    }
  }
}

impl fmt::Display for FontWeight {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FontWeight::Normal => f.write_str("normal"),
      FontWeight::Bold => f.write_str("bold"),
      FontWeight::Lighter => f.write_str("lighter"),
      FontWeight::Bolder => f.write_str("bolder"),
      FontWeight::Numeric(w) => write!(f, "{}", w),
    }
  }
}

/// Raw descriptor strings as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFaceOptions {
  pub style: Option<String>,
  pub weight: Option<String>,
  pub stretch: Option<String>,
  pub display: Option<String>,
  pub unicode_range: Option<String>,
  pub feature_settings: Option<String>,
  pub ascent_override: Option<String>,
  pub descent_override: Option<String>,
  pub line_gap_override: Option<String>,
}

/// Normalized descriptors attached to a face
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFaceDescriptors {
  pub style: Option<FontStyle>,
  pub weight: Option<FontWeight>,
  pub stretch: Option<FontStretch>,
  pub display: FontDisplay,
  pub unicode_range: Option<String>,
  pub feature_settings: Option<String>,
  pub ascent_override: Option<MetricOverride>,
  pub descent_override: Option<MetricOverride>,
  pub line_gap_override: Option<MetricOverride>,
}

fn keyword<T: FromStr>(value: &Option<String>) -> Option<T> {
  value.as_deref().and_then(|v| v.trim().parse().ok())
}

fn passthrough(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

impl FontFaceOptions {
  /// Keeps allowed keyword values, drops everything else.
  pub fn normalize(&self) -> FontFaceDescriptors {
    FontFaceDescriptors {
      style: keyword(&self.style),
      weight: keyword(&self.weight),
      stretch: keyword(&self.stretch),
      display: keyword(&self.display).unwrap_or_default(),
      unicode_range: passthrough(&self.unicode_range),
      feature_settings: passthrough(&self.feature_settings),
      ascent_override: keyword(&self.ascent_override),
      descent_override: keyword(&self.descent_override),
      line_gap_override: keyword(&self.line_gap_override),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options() -> FontFaceOptions {
    FontFaceOptions::default()
  }

  #[test]
  fn test_allowed_values_pass_through() {
    let descriptors = FontFaceOptions {
      style: Some("italic".to_string()),
      weight: Some("700".to_string()),
      stretch: Some("semi-condensed".to_string()),
      display: Some("swap".to_string()),
      unicode_range: Some("U+0000-00FF".to_string()),
      feature_settings: Some("\"liga\" 1".to_string()),
      ascent_override: Some("normal".to_string()),
      descent_override: Some("inherit".to_string()),
      line_gap_override: Some("normal".to_string()),
    }
    .normalize();

    assert_eq!(descriptors.style, Some(FontStyle::Italic));
    assert_eq!(descriptors.weight, Some(FontWeight::Numeric(700)));
    assert_eq!(descriptors.weight.and_then(FontWeight::value), Some(700));
    assert_eq!(descriptors.stretch, Some(FontStretch::SemiCondensed));
    assert_eq!(descriptors.display, FontDisplay::Swap);
    assert_eq!(descriptors.unicode_range.as_deref(), Some("U+0000-00FF"));
    assert_eq!(descriptors.feature_settings.as_deref(), Some("\"liga\" 1"));
    assert_eq!(descriptors.ascent_override, Some(MetricOverride::Normal));
    assert_eq!(descriptors.descent_override, Some(MetricOverride::Inherit));
  }

  #[test]
  fn test_out_of_enum_values_are_dropped() {
    let descriptors = FontFaceOptions {
      style: Some("slanty".to_string()),
      weight: Some("450".to_string()),
      stretch: Some("squished".to_string()),
      ascent_override: Some("90%".to_string()),
      ..options()
    }
    .normalize();

    assert_eq!(descriptors.style, None);
    assert_eq!(descriptors.weight, None);
    assert_eq!(descriptors.stretch, None);
    assert_eq!(descriptors.ascent_override, None);
  }

  #[test]
  fn test_display_falls_back_to_auto() {
    let invalid = FontFaceOptions {
      display: Some("eventually".to_string()),
      ..options()
    };
    assert_eq!(invalid.normalize().display, FontDisplay::Auto);
    assert_eq!(options().normalize().display, FontDisplay::Auto);
  }

  #[test]
  fn test_keyword_display_round_trip() {
    for stretch in [FontStretch::UltraCondensed, FontStretch::Normal, FontStretch::ExtraExpanded] {
      assert_eq!(stretch.to_string().parse::<FontStretch>(), Ok(stretch));
    }
    assert_eq!("bolder".parse::<FontWeight>(), Ok(FontWeight::Bolder));
    assert_eq!(FontWeight::Bolder.value(), None);
    assert_eq!(FontStretch::Condensed.to_percentage(), 75.0);
  }
}
