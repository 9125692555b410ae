//! Session state persistence.
//!
//! Cookies and local storage captured from an authenticated browsing
//! context, written once by the bootstrap and loaded into every case that
//! needs a logged-in customer. The file layout matches Playwright's
//! `storageState` JSON so existing session files keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing session state
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session file does not exist
    #[error("Session file {} not found; run `storeprobe setup` first", .path.display())]
    Missing {
        /// File path
        path: PathBuf,
    },

    /// Session file could not be read or written
    #[error("Session file {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Session file is not valid JSON
    #[error("Session file {} is malformed: {source}", .path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Refused to persist a state with no cookies and no local storage
    #[error("Captured session state is empty; the context is not authenticated")]
    EmptyState,
}

/// Same site cookie setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Strict same site
    Strict,
    /// Lax same site
    #[default]
    Lax,
    /// No same site restriction
    None,
}

/// A browser cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain
    pub domain: String,
    /// Path
    #[serde(default = "default_path")]
    pub path: String,
    /// Expiration in seconds since epoch, `-1` for session cookies
    #[serde(default = "session_expiry")]
    pub expires: f64,
    /// HTTP only flag
    #[serde(default)]
    pub http_only: bool,
    /// Secure flag
    #[serde(default)]
    pub secure: bool,
    /// Same site setting
    #[serde(default)]
    pub same_site: SameSite,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl Cookie {
    /// Create a new session cookie
    #[must_use]
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: default_path(),
            expires: session_expiry(),
            http_only: false,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    /// Set path
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Set expiration (seconds since epoch)
    #[must_use]
    pub fn with_expires(mut self, expires: i64) -> Self {
        self.expires = expires as f64;
        self
    }

    /// Set HTTP only
    #[must_use]
    pub const fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Set secure
    #[must_use]
    pub const fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Set same site
    #[must_use]
    pub const fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Whether this cookie lives only for the browser session
    #[must_use]
    pub fn is_session(&self) -> bool {
        self.expires < 0.0
    }

    /// Expiry as a timestamp (`None` for session cookies)
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.is_session() {
            return None;
        }
        DateTime::from_timestamp(self.expires as i64, 0)
    }

    /// Whether the cookie has expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// A local storage entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    /// Key
    pub name: String,
    /// Value
    pub value: String,
}

impl NameValue {
    /// Create an entry
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Local storage captured for one origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    /// Origin (`scheme://host[:port]`)
    pub origin: String,
    /// Local storage entries
    #[serde(default)]
    pub local_storage: Vec<NameValue>,
}

/// Storage state for a browsing context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    /// Cookies
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// Local storage per origin
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl StorageState {
    /// Create empty storage state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Add (or replace) a local storage item
    #[must_use]
    pub fn with_local_storage(mut self, origin: &str, key: &str, value: &str) -> Self {
        let idx = match self.origins.iter().position(|o| o.origin == origin) {
            Some(idx) => idx,
            None => {
                self.origins.push(OriginState {
                    origin: origin.to_string(),
                    local_storage: Vec::new(),
                });
                self.origins.len() - 1
            }
        };
        let entries = &mut self.origins[idx].local_storage;
        entries.retain(|e| e.name != key);
        entries.push(NameValue::new(key, value));
        self
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }

    /// Number of local storage entries across all origins
    #[must_use]
    pub fn local_storage_len(&self) -> usize {
        self.origins.iter().map(|o| o.local_storage.len()).sum()
    }

    /// Look up a local storage value
    #[must_use]
    pub fn local_storage_value(&self, origin: &str, key: &str) -> Option<&str> {
        self.origins
            .iter()
            .find(|o| o.origin == origin)
            .and_then(|o| o.local_storage.iter().find(|e| e.name == key))
            .map(|e| e.value.as_str())
    }

    /// First local storage value under `key`, preferring `origin` when given
    #[must_use]
    pub fn find_local_storage(&self, origin: Option<&str>, key: &str) -> Option<&str> {
        origin
            .and_then(|origin| self.local_storage_value(origin, key))
            .or_else(|| {
                self.origins
                    .iter()
                    .flat_map(|o| o.local_storage.iter())
                    .find(|e| e.name == key)
                    .map(|e| e.value.as_str())
            })
    }

    /// Load a session file
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SessionError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                SessionError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&raw).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist as pretty JSON, refusing empty state.
    ///
    /// Writes to a temporary sibling and renames it into place so a crashed
    /// run never leaves a truncated session file behind.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if self.is_empty() {
            return Err(SessionError::EmptyState);
        }
        let io_err = |source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Summarize for display
    #[must_use]
    pub fn summarize(&self, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            cookies: self.cookies.len(),
            session_cookies: self.cookies.iter().filter(|c| c.is_session()).count(),
            expired_cookies: self
                .cookies
                .iter()
                .filter(|c| c.is_expired_at(now))
                .map(|c| c.name.clone())
                .collect(),
            earliest_expiry: self.cookies.iter().filter_map(Cookie::expires_at).min(),
            origins: self
                .origins
                .iter()
                .map(|o| {
                    (
                        o.origin.clone(),
                        o.local_storage.iter().map(|e| e.name.clone()).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Human-oriented overview of a session file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Total cookies
    pub cookies: usize,
    /// Cookies without an expiry
    pub session_cookies: usize,
    /// Names of cookies already expired
    pub expired_cookies: Vec<String>,
    /// Earliest expiry among persistent cookies
    pub earliest_expiry: Option<DateTime<Utc>>,
    /// Origins and their local storage keys
    pub origins: Vec<(String, Vec<String>)>,
}

impl SessionSummary {
    /// Whether any cookie has expired
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !self.expired_cookies.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod storage_state_tests {
        use super::*;

        #[test]
        fn test_new_is_empty() {
            let state = StorageState::new();
            assert!(state.is_empty());
            assert_eq!(state.local_storage_len(), 0);
        }

        #[test]
        fn test_with_cookie() {
            let state =
                StorageState::new().with_cookie(Cookie::new("session", "abc123", "example.com"));
            assert_eq!(state.cookies.len(), 1);
            assert!(!state.is_empty());
        }

        #[test]
        fn test_with_local_storage_replaces_key() {
            let state = StorageState::new()
                .with_local_storage("https://shop.test", "auth_token", "a")
                .with_local_storage("https://shop.test", "auth_token", "b")
                .with_local_storage("https://other.test", "k", "v");
            assert_eq!(state.origins.len(), 2);
            assert_eq!(state.local_storage_len(), 2);
            assert_eq!(
                state.local_storage_value("https://shop.test", "auth_token"),
                Some("b")
            );
            assert!(!state.is_empty());
        }

        #[test]
        fn test_find_local_storage_prefers_origin() {
            let state = StorageState::new()
                .with_local_storage("https://cdn.shop.test", "auth_token", "cdn")
                .with_local_storage("https://shop.test", "auth_token", "main");
            assert_eq!(
                state.find_local_storage(Some("https://shop.test"), "auth_token"),
                Some("main")
            );
            assert_eq!(
                state.find_local_storage(Some("https://elsewhere.test"), "auth_token"),
                Some("cdn")
            );
            assert_eq!(state.find_local_storage(None, "auth_token"), Some("cdn"));
            assert_eq!(state.find_local_storage(None, "missing"), None);
        }

        #[test]
        fn test_origin_without_entries_counts_as_empty() {
            let state = StorageState {
                cookies: vec![],
                origins: vec![OriginState {
                    origin: "https://shop.test".into(),
                    local_storage: vec![],
                }],
            };
            assert!(state.is_empty());
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_playwright_field_names() {
            let state = StorageState::new()
                .with_cookie(
                    Cookie::new("sid", "1", ".shop.test")
                        .http_only()
                        .secure()
                        .with_same_site(SameSite::None),
                )
                .with_local_storage("https://shop.test", "auth_token", "jwt");
            let json = serde_json::to_value(&state).unwrap();
            let cookie = &json["cookies"][0];
            assert_eq!(cookie["httpOnly"], true);
            assert_eq!(cookie["sameSite"], "None");
            assert_eq!(cookie["expires"], -1.0);
            assert_eq!(json["origins"][0]["localStorage"][0]["name"], "auth_token");
        }

        #[test]
        fn test_parses_playwright_file() {
            let raw = r#"{
              "cookies": [{"name":"PHPSESSID","value":"x","domain":"testingenv-2021.toolsvilla.in",
                           "path":"/","expires":1760943825.5,"httpOnly":true,"secure":true,"sameSite":"Lax"}],
              "origins": [{"origin":"https://testingenv-2021.toolsvilla.in",
                           "localStorage":[{"name":"auth_token","value":"eyJ"}]}]
            }"#;
            let state: StorageState = serde_json::from_str(raw).unwrap();
            assert_eq!(state.cookies[0].name, "PHPSESSID");
            assert!(state.cookies[0].http_only);
            assert!(!state.cookies[0].is_session());
            assert_eq!(
                state.local_storage_value("https://testingenv-2021.toolsvilla.in", "auth_token"),
                Some("eyJ")
            );
        }

        #[test]
        fn test_missing_optional_fields_default() {
            let raw = r#"{"cookies":[{"name":"a","value":"b","domain":"d"}]}"#;
            let state: StorageState = serde_json::from_str(raw).unwrap();
            assert_eq!(state.cookies[0].path, "/");
            assert!(state.cookies[0].is_session());
            assert!(state.origins.is_empty());
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_save_creates_parent_and_loads_back() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join(".auth").join("user.json");
            let state = StorageState::new().with_cookie(Cookie::new("sid", "1", "shop.test"));
            state.save(&path).unwrap();
            assert!(!path.with_extension("json.tmp").exists());
            assert_eq!(StorageState::load(&path).unwrap(), state);
        }

        #[test]
        fn test_save_refuses_empty_state() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("user.json");
            let err = StorageState::new().save(&path).unwrap_err();
            assert!(matches!(err, SessionError::EmptyState));
            assert!(!path.exists());
        }

        #[test]
        fn test_load_missing_and_malformed() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("none.json");
            assert!(matches!(
                StorageState::load(&missing).unwrap_err(),
                SessionError::Missing { .. }
            ));
            let bad = dir.path().join("bad.json");
            fs::write(&bad, "{not json").unwrap();
            assert!(matches!(
                StorageState::load(&bad).unwrap_err(),
                SessionError::Parse { .. }
            ));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_summary_flags_expired_cookies() {
            let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
            let state = StorageState::new()
                .with_cookie(Cookie::new("old", "1", "d").with_expires(1_600_000_000))
                .with_cookie(Cookie::new("fresh", "1", "d").with_expires(1_800_000_000))
                .with_cookie(Cookie::new("sess", "1", "d"))
                .with_local_storage("https://shop.test", "auth_token", "t");
            let summary = state.summarize(now);
            assert_eq!(summary.cookies, 3);
            assert_eq!(summary.session_cookies, 1);
            assert_eq!(summary.expired_cookies, vec!["old".to_string()]);
            assert!(summary.is_stale());
            assert_eq!(
                summary.earliest_expiry,
                DateTime::from_timestamp(1_600_000_000, 0)
            );
            assert_eq!(summary.origins[0].1, vec!["auth_token".to_string()]);
        }
    }
}
