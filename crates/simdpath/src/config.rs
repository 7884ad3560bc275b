//! Environment configuration.
//!
//! `SIMDPATH_PATHS` pins the runtime-enabled paths to a fixed [`PathSet`],
//! written in hexadecimal with an optional `0x` prefix (`SIMDPATH_PATHS=0x3`
//! forces the universal paths only). Zero or an empty value means "detect".

use core::fmt;

use paths::PathSet;

/// Environment variable overriding runtime path detection.
pub const PATHS_ENV: &str = "SIMDPATH_PATHS";

/// A `SIMDPATH_PATHS` value that is not a hexadecimal [`PathSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathsEnvError {
  value: String,
}

impl PathsEnvError {
  /// The rejected value, trimmed.
  #[must_use]
  pub fn value(&self) -> &str {
    &self.value
  }
}

impl fmt::Display for PathsEnvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PATHS_ENV}={:?} is not a hexadecimal path set", self.value)
  }
}

impl core::error::Error for PathsEnvError {}

/// Parse a hexadecimal path set such as `0x1f`, `1F` or `3`.
///
/// Returns [`PathSet::NONE`] for an empty string; callers treat that the same
/// as an explicit zero.
pub fn parse_paths(value: &str) -> Result<PathSet, PathsEnvError> {
  let value = value.trim();
  let digits = value
    .strip_prefix("0x")
    .or_else(|| value.strip_prefix("0X"))
    .unwrap_or(value);
  if value.is_empty() {
    return Ok(PathSet::NONE);
  }
  // `from_str_radix` alone would also take a leading `+`.
  if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
    return Err(PathsEnvError { value: value.to_owned() });
  }
  u8::from_str_radix(digits, 16)
    .map(PathSet::from_bits)
    .map_err(|_| PathsEnvError { value: value.to_owned() })
}

/// The override from `SIMDPATH_PATHS`, if set to a usable non-zero value.
pub(crate) fn paths_from_env() -> Option<PathSet> {
  let value = match std::env::var_os(PATHS_ENV)?.into_string() {
    Ok(value) => value,
    Err(raw) => {
      log::warn!("simdpath: ignoring non-UTF-8 {PATHS_ENV}={raw:?}");
      return None;
    }
  };
  match parse_paths(&value) {
    Ok(paths) if paths.is_empty() => None,
    Ok(paths) => {
      log::debug!("simdpath: {PATHS_ENV} overrides runtime paths with {paths}");
      Some(paths)
    }
    Err(err) => {
      log::warn!("simdpath: ignoring {err}");
      None
    }
  }
}
