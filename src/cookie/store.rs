//! JSON-backed cookie persistence.
//!
//! `JsonCookieStore` keeps a snapshot of a [`CookieJar`] in a single JSON
//! file so that cookies survive a restart of the environment that owns them.
//!
//! ### Design
//! - One file per jar (`CookieStoreFile { version, jar }`).
//! - [`InMemoryEnvironment`](crate::env::InMemoryEnvironment) calls
//!   [`JsonCookieStore::save`] after each cookie write.
//! - Only cookies with an `expires` are written. Session cookies end with
//!   the environment that holds them.
//! - A missing file loads as an empty jar. A file that fails to parse is an
//!   error, so that a corrupt store is never silently overwritten.
//!
//! ### I/O characteristics & caveats
//! - Every save rewrites the whole file. Writes go to a sibling temp file
//!   that is then renamed over the target.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cookie::jar::CookieJar;

const STORE_VERSION: u32 = 1;

/// On-disk representation of a jar.
#[derive(Debug, Serialize, Deserialize)]
struct CookieStoreFile {
    version: u32,
    jar: CookieJar,
}

#[derive(Debug, Clone)]
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
}

impl JsonCookieStore {
    /// Creates a store at `path`. Nothing touches the disk until the first
    /// [`load`](Self::load) or [`save`](Self::save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored jar, or an empty one when the file does not exist.
    pub fn load(&self) -> Result<CookieJar> {
        if !self.path.exists() {
            log::debug!("cookie store: {} does not exist yet", self.path.display());
            return Ok(CookieJar::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read cookie store {}", self.path.display()))?;
        let file: CookieStoreFile = serde_json::from_str(&contents)
            .with_context(|| format!("cannot parse cookie store {}", self.path.display()))?;

        if file.version != STORE_VERSION {
            bail!("unsupported cookie store version {} in {}", file.version, self.path.display());
        }

        log::debug!("cookie store: loaded {} cookies from {}", file.jar.len(), self.path.display());
        Ok(file.jar)
    }

    /// Writes the persistent part of `jar` as the new snapshot (pretty-printed).
    pub fn save(&self, jar: &CookieJar) -> Result<()> {
        let file = CookieStoreFile {
            version: STORE_VERSION,
            jar: jar.persistent(),
        };
        let contents = serde_json::to_string_pretty(&file).context("cannot serialize cookies")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("cannot write cookie store {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace cookie store {}", self.path.display()))?;

        log::trace!("cookie store: saved {} cookies to {}", file.jar.len(), self.path.display());
        Ok(())
    }
}
