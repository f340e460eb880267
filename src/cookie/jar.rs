//! In-memory cookie jar with `document.cookie` semantics.
//!
//! The jar receives the raw lines a page script assigns to `document.cookie`
//! and answers reads with the `name=value; name2=value2` string a script
//! would see for the current location.
//!
//! ## Notes & limitations
//! - Attributes handled: `path`, `domain` (leading dot stripped), `expires`
//!   and `secure`. `max-age`, `samesite` and size limits are ignored.
//! - A cookie is identified by `(name, path, domain)`; writing the same
//!   triple again replaces the earlier entry (last write wins).
//! - Writing a cookie whose `expires` lies in the past removes the matching
//!   entry, which is how removal works from script.
//! - Not internally synchronized. [`InMemoryEnvironment`](crate::env::InMemoryEnvironment)
//!   wraps it in a `RwLock`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::date;

/// A cookie as stored by the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name as written (already URI-encoded by the writer).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Host the cookie was written from. Host-only cookies are returned for
    /// this host alone.
    pub host: String,

    /// Path scoping (e.g. `"/"`).
    pub path: String,

    /// Domain scoping. `None` means host-only.
    pub domain: Option<String>,

    /// Only returned to secure (https) pages.
    pub secure: bool,

    /// Expiry in `toUTCString` form. Session cookies have `None`.
    pub expires: Option<String>,
}

impl Cookie {
    fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires
            .as_deref()
            .and_then(|e| date::parse_utc_string(e).ok())
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    fn matches_host(&self, host: &str) -> bool {
        match &self.domain {
            Some(domain) => domain_matches(host, domain),
            None => self.host.eq_ignore_ascii_case(host),
        }
    }

    fn matches_path(&self, path: &str) -> bool {
        path == self.path
            || (path.starts_with(&self.path)
                && (self.path.ends_with('/') || path[self.path.len()..].starts_with('/')))
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.path == other.path && self.domain == other.domain
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
}

/// Directory of the request path, used when a cookie names no path.
fn default_path(request_path: &str) -> &str {
    request_path
        .rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
}

/// Cookies belonging to one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieJar {
    /// Cookies in the order they were first written.
    pub entries: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy holding only the cookies with an `expires`; session cookies are
    /// left out.
    pub fn persistent(&self) -> CookieJar {
        CookieJar {
            entries: self
                .entries
                .iter()
                .filter(|c| c.expires.is_some())
                .cloned()
                .collect(),
        }
    }

    /// Drops every cookie that expired at or before `now`.
    pub fn evict_expired(&mut self, now: OffsetDateTime) {
        self.entries.retain(|c| !c.is_expired(now));
    }

    /// Applies one `document.cookie` assignment made from `host` + `request_path`.
    ///
    /// Returns `false` when the line was rejected (no name/value pair, or a
    /// `domain` that does not cover `host`).
    pub fn store(
        &mut self,
        line: &str,
        host: &str,
        request_path: &str,
        now: OffsetDateTime,
    ) -> bool {
        let mut parts = line.split(';');
        let pair = parts.next().unwrap_or_default().trim();
        if pair.is_empty() {
            log::debug!("cookie jar: ignoring empty cookie line");
            return false;
        }
        let (name, value) = pair.split_once('=').unwrap_or(("", pair));

        let mut cookie = Cookie {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            host: host.to_string(),
            path: default_path(request_path).to_string(),
            domain: None,
            secure: false,
            expires: None,
        };

        for part in parts {
            let part = part.trim();
            match part.split_once('=') {
                Some((k, v)) => {
                    let v = v.trim();
                    match k.trim().to_ascii_lowercase().as_str() {
                        "path" if v.starts_with('/') => cookie.path = v.to_string(),
                        "domain" if !v.is_empty() => {
                            cookie.domain = Some(v.trim_start_matches('.').to_ascii_lowercase())
                        }
                        "expires" => match date::parse_utc_string(v) {
                            Ok(_) => cookie.expires = Some(v.to_string()),
                            Err(_) => log::debug!("cookie jar: ignoring unparsable expires {v:?}"),
                        },
                        _ => {}
                    }
                }
                None => {
                    if part.eq_ignore_ascii_case("secure") {
                        cookie.secure = true;
                    }
                }
            }
        }

        if let Some(domain) = &cookie.domain {
            if !domain_matches(host, domain) {
                log::warn!("cookie jar: {host} may not set a cookie for domain {domain}");
                return false;
            }
        }

        let expired = cookie.is_expired(now);
        match self.entries.iter().position(|c| c.same_slot(&cookie)) {
            Some(idx) if expired => {
                log::trace!("cookie jar: removing {}", cookie.name);
                self.entries.remove(idx);
            }
            Some(idx) => self.entries[idx] = cookie,
            None if expired => {}
            None => self.entries.push(cookie),
        }
        true
    }

    /// The `document.cookie` string visible to a page at `host` + `path`.
    ///
    /// Longer paths come first; cookies with equal paths keep write order.
    pub fn cookie_string(
        &self,
        host: &str,
        path: &str,
        secure: bool,
        now: OffsetDateTime,
    ) -> String {
        let mut visible: Vec<&Cookie> = self
            .entries
            .iter()
            .filter(|c| !c.is_expired(now))
            .filter(|c| c.matches_host(host))
            .filter(|c| c.matches_path(path))
            .filter(|c| !c.secure || secure)
            .collect();
        visible.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        visible
            .iter()
            .map(|c| {
                if c.name.is_empty() {
                    c.value.clone()
                } else {
                    format!("{}={}", c.name, c.value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    #[test]
    fn store_and_read_back() {
        let mut jar = CookieJar::new();
        assert!(jar.store("a=1; path=/", "example.com", "/index.html", NOW));
        assert!(jar.store("b=2", "example.com", "/docs/page", NOW));

        assert_eq!(jar.cookie_string("example.com", "/", false, NOW), "a=1");
        assert_eq!(jar.cookie_string("example.com", "/docs/x", false, NOW), "b=2; a=1");
        assert_eq!(jar.entries[1].path, "/docs");
        // path prefix must end on a segment boundary
        assert_eq!(jar.cookie_string("example.com", "/docsy", false, NOW), "a=1");
    }

    #[test]
    fn same_slot_is_replaced() {
        let mut jar = CookieJar::new();
        jar.store("k=old; path=/", "example.com", "/", NOW);
        jar.store("k=new; path=/", "example.com", "/", NOW);
        jar.store("k=other; path=/sub", "example.com", "/", NOW);
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.entries[0].value, "new");
    }

    #[test]
    fn past_expiry_removes() {
        let mut jar = CookieJar::new();
        jar.store("k=v; path=/", "example.com", "/", NOW);
        jar.store("k=; path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT", "example.com", "/", NOW);
        assert!(jar.is_empty());
    }

    #[test]
    fn expiry_is_honoured_on_read() {
        let mut jar = CookieJar::new();
        jar.store("k=v; expires=Sat, 01 Jun 2024 13:00:00 GMT", "example.com", "/", NOW);
        assert_eq!(jar.cookie_string("example.com", "/", false, NOW), "k=v");

        let later = datetime!(2024-06-01 14:00 UTC);
        assert_eq!(jar.cookie_string("example.com", "/", false, later), "");
        jar.evict_expired(later);
        assert!(jar.is_empty());
    }

    #[test]
    fn domain_and_secure_scoping() {
        let mut jar = CookieJar::new();
        assert!(jar.store("d=1; domain=.example.com", "www.example.com", "/", NOW));
        assert!(jar.store("h=1", "www.example.com", "/", NOW));
        assert!(jar.store("s=1; secure", "www.example.com", "/", NOW));
        assert!(!jar.store("x=1; domain=other.org", "www.example.com", "/", NOW));

        assert_eq!(jar.cookie_string("api.example.com", "/", false, NOW), "d=1");
        assert_eq!(jar.cookie_string("www.example.com", "/", false, NOW), "d=1; h=1");
        assert_eq!(jar.cookie_string("www.example.com", "/", true, NOW), "d=1; h=1; s=1");
    }

    #[test]
    fn rejects_empty_line() {
        let mut jar = CookieJar::new();
        assert!(!jar.store("   ; path=/", "example.com", "/", NOW));
        assert!(jar.is_empty());
    }
}
