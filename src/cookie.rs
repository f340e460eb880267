//! Cookies: [`get`], [`set`] and [`remove`] against an [`Environment`].
//!
//! Keys and values are URI-component encoded before they reach the
//! environment. `(` and `)` are escaped as well, since `encodeURIComponent`
//! leaves them alone but they are not valid in a cookie name.
//!
//! ```rust
//! use gosub_util::cookie::{self, CookieAttributes};
//! use gosub_util::env::InMemoryEnvironment;
//!
//! let env = InMemoryEnvironment::new("https://example.com/").unwrap();
//! let week = CookieAttributes::default().expires_in_days(7.0);
//! cookie::set(&env, "theme", "dark mode", &week).unwrap();
//! assert_eq!(cookie::get(&env, "theme").as_deref(), Some("dark mode"));
//!
//! cookie::remove(&env, "theme", &CookieAttributes::default()).unwrap();
//! assert_eq!(cookie::get(&env, "theme"), None);
//! ```

mod jar;
mod store;

use percent_encoding::{utf8_percent_encode, AsciiSet};
use time::macros::datetime;
use time::OffsetDateTime;

use crate::config::CookieConfig;
use crate::date;
use crate::env::Environment;
use crate::errors::UtilError;
use crate::url::{decode_uri_component, URI_COMPONENT};

pub use jar::{Cookie, CookieJar};
pub use store::JsonCookieStore;

const COOKIE_COMPONENT: &AsciiSet = &URI_COMPONENT.add(b'(').add(b')');

/// When a cookie expires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expires {
    /// Days from now. `0` (or NaN) means no expiry is written at all.
    Days(f64),
    At(OffsetDateTime),
}

/// Attributes written after the `key=value` pair.
///
/// Unset and falsy entries (empty strings, `Days(0.0)`, `secure: false`) are
/// left out of the cookie line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieAttributes {
    /// Falls back to [`CookieConfig::default_path`] when `None`.
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<Expires>,
    pub secure: bool,
}

impl CookieAttributes {
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn expires_in_days(mut self, days: f64) -> Self {
        self.expires = Some(Expires::Days(days));
        self
    }

    pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expires = Some(Expires::At(at));
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, COOKIE_COMPONENT).to_string()
}

/// Returns the decoded value stored under `key`, if any.
pub fn get(env: &dyn Environment, key: &str) -> Option<String> {
    let name = encode(key);
    env.read_cookie()
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| decode_uri_component(v))
}

/// Writes `key=value` with `attrs`, using the default cookie config.
///
/// Returns the encoded value as it was stored.
pub fn set(
    env: &dyn Environment,
    key: &str,
    value: &str,
    attrs: &CookieAttributes,
) -> Result<String, UtilError> {
    set_with(&CookieConfig::default(), env, key, value, attrs)
}

/// `now` plus `days`, clamped to the representable range. Overflowing
/// expiries land on the last second of year 9999 or, for negative counts,
/// on the epoch, which still reads as expired.
fn expiry_after(now: OffsetDateTime, days: f64) -> OffsetDateTime {
    // `as` saturates, so infinities become i64::MAX/MIN milliseconds.
    let offset = time::Duration::milliseconds((days * 86_400_000.0) as i64);
    now.checked_add(offset).unwrap_or_else(|| {
        log::debug!("cookie: expiry of {days} days is out of range, clamping");
        if days > 0.0 {
            datetime!(9999-12-31 23:59:59 UTC)
        } else {
            OffsetDateTime::UNIX_EPOCH
        }
    })
}

/// Writes `key=value` with `attrs`, taking defaults from `config`.
pub fn set_with(
    config: &CookieConfig,
    env: &dyn Environment,
    key: &str,
    value: &str,
    attrs: &CookieAttributes,
) -> Result<String, UtilError> {
    let key = encode(key);
    let value = encode(value);

    let mut line = format!("{key}={value}");

    let path = attrs.path.as_deref().unwrap_or(&config.default_path);
    if !path.is_empty() {
        line.push_str("; path=");
        line.push_str(path);
    }

    if let Some(domain) = attrs.domain.as_deref().filter(|d| !d.is_empty()) {
        line.push_str("; domain=");
        line.push_str(domain);
    }

    let expires_at = match attrs.expires {
        Some(Expires::Days(days)) if days != 0.0 && !days.is_nan() => {
            Some(expiry_after(env.now(), days))
        }
        Some(Expires::At(at)) => Some(at),
        _ => None,
    };
    if let Some(at) = expires_at {
        line.push_str("; expires=");
        line.push_str(&date::to_utc_string(at)?);
    }

    if attrs.secure {
        line.push_str("; secure");
    }

    log::debug!("cookie: set {line}");
    env.write_cookie(&line)
        .map_err(|e| UtilError::CookieStore(format!("{e:#}")))?;

    Ok(value)
}

/// Expires `key` immediately. `attrs` must carry the same path and domain
/// the cookie was set with.
pub fn remove(
    env: &dyn Environment,
    key: &str,
    attrs: &CookieAttributes,
) -> Result<String, UtilError> {
    remove_with(&CookieConfig::default(), env, key, attrs)
}

pub fn remove_with(
    config: &CookieConfig,
    env: &dyn Environment,
    key: &str,
    attrs: &CookieAttributes,
) -> Result<String, UtilError> {
    let attrs = attrs.clone().expires_in_days(-1.0);
    set_with(config, env, key, "", &attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryEnvironment;
    use std::sync::Mutex;

    /// Records raw cookie lines instead of interpreting them.
    #[derive(Default)]
    struct RecordingEnvironment {
        lines: Mutex<Vec<String>>,
        cookie: String,
    }

    impl Environment for RecordingEnvironment {
        fn read_cookie(&self) -> String { self.cookie.clone() }
        fn write_cookie(&self, line: &str) -> anyhow::Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
        fn read_query_string(&self) -> String { String::new() }
        fn now(&self) -> OffsetDateTime { datetime!(2024-01-01 0:00 UTC) }
    }

    fn last_line(env: &RecordingEnvironment) -> String {
        env.lines.lock().unwrap().last().cloned().unwrap()
    }

    #[test]
    fn set_serializes_attributes() {
        let env = RecordingEnvironment::default();
        let attrs = CookieAttributes::default()
            .domain("example.com")
            .expires_in_days(1.0)
            .secure(true);

        let stored = set(&env, "user id", "a(b)", &attrs).unwrap();
        assert_eq!(stored, "a%28b%29");
        assert_eq!(
            last_line(&env),
            "user%20id=a%28b%29; path=/; domain=example.com; \
             expires=Tue, 02 Jan 2024 00:00:00 GMT; secure"
        );
    }

    #[test]
    fn falsy_attributes_are_skipped() {
        let env = RecordingEnvironment::default();
        let attrs = CookieAttributes::default().path("").domain("").expires_in_days(0.0);
        set(&env, "k", "v", &attrs).unwrap();
        assert_eq!(last_line(&env), "k=v");
    }

    #[test]
    fn huge_expiry_is_clamped() {
        let env = RecordingEnvironment::default();
        for days in [1e7, f64::INFINITY] {
            set(&env, "k", "v", &CookieAttributes::default().expires_in_days(days)).unwrap();
            assert_eq!(last_line(&env), "k=v; path=/; expires=Fri, 31 Dec 9999 23:59:59 GMT");
        }

        let never = CookieAttributes::default().expires_in_days(f64::NEG_INFINITY);
        set(&env, "k", "v", &never).unwrap();
        assert_eq!(last_line(&env), "k=v; path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn huge_expiry_keeps_cookie_readable() {
        let env = InMemoryEnvironment::new("https://example.com/").unwrap();
        set(&env, "k", "v", &CookieAttributes::default().expires_in_days(1e7)).unwrap();
        assert_eq!(get(&env, "k").as_deref(), Some("v"));
    }

    #[test]
    fn explicit_expiry_and_config_path() {
        let env = RecordingEnvironment::default();
        let cfg = CookieConfig { default_path: "/app".into() };
        let attrs = CookieAttributes::default().expires_at(OffsetDateTime::UNIX_EPOCH);
        set_with(&cfg, &env, "k", "v", &attrs).unwrap();
        assert_eq!(last_line(&env), "k=v; path=/app; expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn remove_writes_past_expiry() {
        let env = RecordingEnvironment::default();
        remove(&env, "k", &CookieAttributes::default().domain("example.com")).unwrap();
        assert_eq!(
            last_line(&env),
            "k=; path=/; domain=example.com; expires=Sun, 31 Dec 2023 00:00:00 GMT"
        );
    }

    #[test]
    fn get_matches_encoded_key() {
        let env = RecordingEnvironment {
            cookie: "a=1; my%20key=hello%20world; f%28x%29=y".into(),
            ..Default::default()
        };
        assert_eq!(get(&env, "my key").as_deref(), Some("hello world"));
        assert_eq!(get(&env, "f(x)").as_deref(), Some("y"));
        assert_eq!(get(&env, "missing"), None);
    }

    #[test]
    fn set_get_remove_round_trip() {
        let env = InMemoryEnvironment::new("https://example.com/").unwrap();
        set(&env, "k", "v", &CookieAttributes::default()).unwrap();
        assert_eq!(get(&env, "k").as_deref(), Some("v"));

        remove(&env, "k", &CookieAttributes::default()).unwrap();
        assert_eq!(get(&env, "k"), None);
    }

    #[test]
    fn remove_needs_matching_path() {
        let env = InMemoryEnvironment::new("https://example.com/app/page").unwrap();
        set(&env, "k", "v", &CookieAttributes::default().path("/app")).unwrap();

        remove(&env, "k", &CookieAttributes::default()).unwrap();
        assert_eq!(get(&env, "k").as_deref(), Some("v"));

        remove(&env, "k", &CookieAttributes::default().path("/app")).unwrap();
        assert_eq!(get(&env, "k"), None);
    }
}
