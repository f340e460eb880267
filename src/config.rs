//! Toolkit configuration.
//!
//! `UtilConfig` carries the few site-level settings the helpers need: the
//! default cookie path and the labels used when rendering dates and
//! durations. Sensible defaults are provided via [`Default`], and
//! [`UtilConfig::builder()`] offers a fluent, validated way to customize them.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_util::config::UtilConfig;
//! let cfg = UtilConfig::default();
//! assert_eq!(cfg.cookie.default_path, "/");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_util::config::UtilConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = UtilConfig::builder()
//!     .cookie_path("/app")
//!     .weekday_names(["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"])
//!     .duration_units(["d", "h", "m", "s"])
//!     .build()?;
//! assert_eq!(cfg.date.weekday_names[1], "Mon");
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`ConfigError`] when the cookie path does not
//! start with `/` or when a weekday name or duration unit is empty.

use std::fmt;

const DEFAULT_WEEKDAY_NAMES: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];
const DEFAULT_DURATION_UNITS: [&str; 4] = ["天", "时", "分", "秒"];

/// Defaults applied by [`crate::cookie::set`].
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Path used when the caller supplies none.
    pub default_path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            default_path: "/".to_string(),
        }
    }
}

/// Labels used by [`crate::date::format`] and [`crate::date::to_time`].
#[derive(Debug, Clone)]
pub struct DateConfig {
    /// Weekday names indexed by day of week, 0 = Sunday. Substituted for `W`.
    pub weekday_names: [String; 7],
    /// Unit labels for days, hours, minutes and seconds (in that order).
    pub duration_units: [String; 4],
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            weekday_names: DEFAULT_WEEKDAY_NAMES.map(String::from),
            duration_units: DEFAULT_DURATION_UNITS.map(String::from),
        }
    }
}

/// Main toolkit configuration.
#[derive(Debug, Clone, Default)]
pub struct UtilConfig {
    pub cookie: CookieConfig,
    pub date: DateConfig,
}

impl UtilConfig {
    pub fn builder() -> UtilConfigBuilder {
        UtilConfigBuilder::default()
    }
}

/// Builder for [`UtilConfig`].
#[derive(Debug, Clone, Default)]
pub struct UtilConfigBuilder {
    inner: UtilConfig,
}

impl UtilConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut UtilConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn cookie_path<S: Into<String>>(self, path: S) -> Self { self.map(|c| c.cookie.default_path = path.into()) }
    pub fn weekday_names<S: Into<String>>(self, names: [S; 7]) -> Self { self.map(|c| c.date.weekday_names = names.map(Into::into)) }
    pub fn duration_units<S: Into<String>>(self, units: [S; 4]) -> Self { self.map(|c| c.date.duration_units = units.map(Into::into)) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut UtilConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<UtilConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    RelativeCookiePath(String),
    EmptyWeekdayName(usize),
    EmptyDurationUnit(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RelativeCookiePath(p) =>
                write!(f, "cookie path {p:?} must start with '/'"),
            ConfigError::EmptyWeekdayName(i) =>
                write!(f, "weekday name at index {i} is empty"),
            ConfigError::EmptyDurationUnit(i) =>
                write!(f, "duration unit at index {i} is empty"),
        }
    }
}
impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::errors::UtilError {
    fn from(e: ConfigError) -> Self {
        crate::errors::UtilError::InvalidConfig(e.to_string())
    }
}

fn validate(c: &UtilConfig) -> Result<(), ConfigError> {
    if !c.cookie.default_path.starts_with('/') {
        return Err(ConfigError::RelativeCookiePath(c.cookie.default_path.clone()));
    }
    if let Some(i) = c.date.weekday_names.iter().position(|n| n.is_empty()) {
        return Err(ConfigError::EmptyWeekdayName(i));
    }
    if let Some(i) = c.date.duration_units.iter().position(|u| u.is_empty()) {
        return Err(ConfigError::EmptyDurationUnit(i));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = UtilConfig::builder().build().unwrap();
        assert_eq!(cfg.cookie.default_path, "/");
        assert_eq!(cfg.date.weekday_names[0], "日");
        assert_eq!(cfg.date.duration_units[3], "秒");
    }

    #[test]
    fn relative_cookie_path_is_rejected() {
        let err = UtilConfig::builder().cookie_path("app").build().unwrap_err();
        assert_eq!(err, ConfigError::RelativeCookiePath("app".into()));
    }

    #[test]
    fn empty_labels_are_rejected() {
        let err = UtilConfig::builder()
            .weekday_names(["Sun", "", "Tue", "Wed", "Thu", "Fri", "Sat"])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyWeekdayName(1));

        let err = UtilConfig::builder()
            .with(|c| c.date.duration_units[2] = String::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyDurationUnit(2));
    }
}
