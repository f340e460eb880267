//! Host environment seam.
//!
//! The helpers never touch host globals directly. Cookie reads and writes and
//! the page's query string go through an [`Environment`], so a browser
//! binding and the in-memory implementation below are interchangeable.
//!
//! # Concurrency model
//! - [`EnvironmentHandle`] is `Arc<dyn Environment + Send + Sync>`.
//! - Implementations manage their **own internal synchronization**; every
//!   trait method takes `&self`. Concurrent cookie writes are last write wins.

use std::sync::{Arc, RwLock};

use ::url::Url;
use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::cookie::{CookieJar, JsonCookieStore};

/// Ambient state the helpers read from and write to.
pub trait Environment: Send + Sync {
    /// The `document.cookie` string for the current location.
    fn read_cookie(&self) -> String;

    /// Applies one `document.cookie = line` assignment.
    fn write_cookie(&self, line: &str) -> Result<()>;

    /// The search part of the current location, including the leading `?`,
    /// or an empty string.
    fn read_query_string(&self) -> String;

    /// Current time, used to resolve relative cookie expiry.
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A shared, type-erased environment.
pub type EnvironmentHandle = Arc<dyn Environment + Send + Sync>;

/// Environment backed by a [`CookieJar`] and a fixed location.
///
/// When built with [`with_store`](Self::with_store) the jar is loaded from a
/// [`JsonCookieStore`] and written back after every cookie assignment.
pub struct InMemoryEnvironment {
    location: RwLock<Url>,
    jar: RwLock<CookieJar>,
    store: Option<JsonCookieStore>,
    clock: RwLock<Option<OffsetDateTime>>,
}

impl InMemoryEnvironment {
    /// Creates an environment positioned at `location`, with an empty jar.
    pub fn new(location: &str) -> Result<Self> {
        Ok(Self {
            location: RwLock::new(parse_location(location)?),
            jar: RwLock::new(CookieJar::new()),
            store: None,
            clock: RwLock::new(None),
        })
    }

    /// Like [`new`](Self::new), with cookies loaded from and persisted to `store`.
    pub fn with_store(location: &str, store: JsonCookieStore) -> Result<Self> {
        let jar = store.load()?;
        Ok(Self {
            location: RwLock::new(parse_location(location)?),
            jar: RwLock::new(jar),
            store: Some(store),
            clock: RwLock::new(None),
        })
    }

    /// Moves the environment to another page.
    pub fn navigate(&self, location: &str) -> Result<()> {
        let url = parse_location(location)?;
        log::debug!("environment: navigating to {url}");
        *self.location.write().unwrap_or_else(|e| e.into_inner()) = url;
        Ok(())
    }

    pub fn location(&self) -> Url {
        self.location.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Freezes the clock at `at`. Expiry decisions use this instead of the
    /// system time from now on.
    pub fn set_now(&self, at: OffsetDateTime) {
        *self.clock.write().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    /// Snapshot of the current jar.
    pub fn jar(&self) -> CookieJar {
        self.jar.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn parse_location(location: &str) -> Result<Url> {
    Url::parse(location).with_context(|| format!("invalid location {location:?}"))
}

impl Environment for InMemoryEnvironment {
    fn read_cookie(&self) -> String {
        let url = self.location();
        let now = self.now();
        self.jar
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .cookie_string(
                url.host_str().unwrap_or_default(),
                url.path(),
                url.scheme() == "https",
                now,
            )
    }

    fn write_cookie(&self, line: &str) -> Result<()> {
        let url = self.location();
        let now = self.now();

        let snapshot = {
            let mut jar = self.jar.write().unwrap_or_else(|e| e.into_inner());
            if !jar.store(line, url.host_str().unwrap_or_default(), url.path(), now) {
                return Ok(());
            }
            jar.evict_expired(now);
            jar.clone()
        };

        if let Some(store) = &self.store {
            store.save(&snapshot)?;
        }
        Ok(())
    }

    fn read_query_string(&self) -> String {
        self.location()
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default()
    }

    fn now(&self) -> OffsetDateTime {
        self.clock
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_else(OffsetDateTime::now_utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn query_string_follows_location() {
        let env = InMemoryEnvironment::new("https://example.com/p?a=1&b=2#frag").unwrap();
        assert_eq!(env.read_query_string(), "?a=1&b=2");

        env.navigate("https://example.com/other").unwrap();
        assert_eq!(env.read_query_string(), "");
        assert!(env.navigate("not a url").is_err());
    }

    #[test]
    fn cookies_are_scoped_to_location() {
        let env = InMemoryEnvironment::new("http://example.com/shop/cart").unwrap();
        env.write_cookie("a=1; path=/").unwrap();
        env.write_cookie("b=2").unwrap();
        env.write_cookie("s=3; path=/; secure").unwrap();
        assert_eq!(env.read_cookie(), "b=2; a=1");

        env.navigate("https://example.com/").unwrap();
        assert_eq!(env.read_cookie(), "a=1; s=3");
    }

    #[test]
    fn frozen_clock_drives_expiry() {
        let env = InMemoryEnvironment::new("https://example.com/").unwrap();
        env.set_now(datetime!(2030-01-01 0:00 UTC));
        assert_eq!(env.now(), datetime!(2030-01-01 0:00 UTC));

        env.write_cookie("k=v; path=/; expires=Tue, 01 Jan 2030 01:00:00 GMT").unwrap();
        assert_eq!(env.read_cookie(), "k=v");

        env.set_now(datetime!(2030-01-01 2:00 UTC));
        assert_eq!(env.read_cookie(), "");
    }

    #[test]
    fn store_backed_environment_persists_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let open = || {
            InMemoryEnvironment::with_store("https://example.com/", JsonCookieStore::new(&path))
                .unwrap()
        };

        {
            let env = open();
            env.write_cookie("persist=yes; path=/; expires=Fri, 31 Dec 9999 23:59:59 GMT")
                .unwrap();
            env.write_cookie("session=1; path=/").unwrap();
            assert_eq!(env.read_cookie(), "persist=yes; session=1");
        }

        let env = open();
        assert_eq!(env.read_cookie(), "persist=yes");
        assert_eq!(env.jar().len(), 1);
    }
}
