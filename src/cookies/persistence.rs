//! Cookie persistence - save and load a store's cookies to/from disk.
//!
//! Cookies are written as a pretty-printed JSON array. Session cookies
//! (`Discard`) and cookies that have already expired are never written.

use crate::cookies::cookie::Cookie;
use crate::cookies::error::Result;
use crate::cookies::store::CookieStore;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Serializable representation of a cookie for persistence.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct PersistentCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    port_list: Option<String>,
    max_age: Option<i64>,
    version: u8,
    secure: bool,
    http_only: bool,
    comment: Option<String>,
    comment_url: Option<String>,
    created_unix_ms: i64,
}

impl From<&Cookie> for PersistentCookie {
    fn from(cookie: &Cookie) -> Self {
        let created_ms = cookie.creation_time().unix_timestamp_nanos() / 1_000_000;
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_owned),
            path: cookie.path().map(str::to_owned),
            port_list: cookie.port_list().map(str::to_owned),
            max_age: cookie.max_age(),
            version: cookie.version(),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            comment: cookie.comment().map(str::to_owned),
            comment_url: cookie.comment_url().map(str::to_owned),
            created_unix_ms: created_ms as i64,
        }
    }
}

impl PersistentCookie {
    /// Rebuild the cookie. Entries with an invalid name or timestamp yield `None`.
    fn into_cookie(self) -> Option<Cookie> {
        let nanos = i128::from(self.created_unix_ms) * 1_000_000;
        let created = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;

        let mut cookie = Cookie::with_creation_time(&self.name, self.value, created).ok()?;
        cookie.set_version(u32::from(self.version)).ok()?;
        if let Some(domain) = self.domain {
            cookie.set_domain(domain);
        }
        if let Some(path) = self.path {
            cookie.set_path(path);
        }
        if let Some(ports) = self.port_list {
            cookie.set_port_list(ports);
        }
        if let Some(max_age) = self.max_age {
            cookie.set_max_age(max_age);
        }
        if let Some(comment) = self.comment {
            cookie.set_comment(comment);
        }
        if let Some(url) = self.comment_url {
            cookie.set_comment_url(url);
        }
        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);
        Some(cookie)
    }
}

/// Save the persistent cookies of `store` to a file.
///
/// # Example
/// ```ignore
/// persistence::save_cookies(&store, Path::new("/path/to/cookies.json"))?;
/// ```
pub fn save_cookies(store: &dyn CookieStore, path: &Path) -> Result<()> {
    let persistent: Vec<PersistentCookie> = store
        .get_cookies()
        .iter()
        .filter(|cookie| !cookie.discard())
        .map(PersistentCookie::from)
        .collect();

    let json = serde_json::to_string_pretty(&persistent)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load cookies from a file into `store`, returning how many were added.
///
/// Cookies keep their original creation time, so ones whose max-age ran out
/// while on disk are skipped. Entries are added without a request url and are
/// found through their domain.
///
/// # Example
/// ```ignore
/// let loaded = persistence::load_cookies(&store, Path::new("/path/to/cookies.json"))?;
/// ```
pub fn load_cookies(store: &dyn CookieStore, path: &Path) -> Result<usize> {
    let json = fs::read_to_string(path)?;
    let persistent: Vec<PersistentCookie> = serde_json::from_str(&json)?;
    let now = OffsetDateTime::now_utc();

    let mut loaded = 0;
    for entry in persistent {
        let Some(cookie) = entry.into_cookie() else {
            tracing::warn!(path = %path.display(), "skipping unreadable persisted cookie");
            continue;
        };
        if cookie.has_expired_at(now) {
            continue;
        }
        store.add(None, cookie);
        loaded += 1;
    }

    tracing::debug!(path = %path.display(), loaded, "loaded cookies");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::error::CookieError;
    use crate::cookies::store::InMemoryCookieStore;
    use tempfile::tempdir;
    use time::Duration;

    #[test]
    fn test_save_load_roundtrip() {
        let store = InMemoryCookieStore::new();
        let created = OffsetDateTime::now_utc() - Duration::seconds(30);

        let mut cookie = Cookie::with_creation_time("session", "abc123", created).unwrap();
        cookie.set_domain(".example.com");
        cookie.set_path("/");
        cookie.set_port_list("80,443");
        cookie.set_max_age(3600);
        cookie.set_secure(true);
        cookie.set_http_only(true);
        store.add(None, cookie);

        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        save_cookies(&store, &path).unwrap();

        let loaded_store = InMemoryCookieStore::new();
        assert_eq!(load_cookies(&loaded_store, &path).unwrap(), 1);

        let url = url::Url::parse("https://www.example.com/").unwrap();
        let cookies = loaded_store.get(&url);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "session");
        assert_eq!(cookies[0].value(), "abc123");
        assert_eq!(cookies[0].port_list(), Some("80,443"));
        assert!(cookies[0].secure());
        assert!(cookies[0].http_only());
        assert_eq!(
            cookies[0].creation_time().unix_timestamp(),
            created.unix_timestamp()
        );
    }

    #[test]
    fn test_discard_cookies_are_not_saved() {
        let store = InMemoryCookieStore::new();
        let mut cookie = Cookie::new("temp", "1").unwrap();
        cookie.set_domain(".example.com");
        cookie.set_discard(true);
        store.add(None, cookie);

        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        save_cookies(&store, &path).unwrap();

        let loaded_store = InMemoryCookieStore::new();
        assert_eq!(load_cookies(&loaded_store, &path).unwrap(), 0);
        assert!(loaded_store.is_empty());
    }

    #[test]
    fn test_expired_on_disk_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(
            &path,
            r#"[{"name":"old","value":"1","domain":".example.com","path":"/",
                "port_list":null,"max_age":10,"version":1,"secure":false,
                "http_only":false,"comment":null,"comment_url":null,
                "created_unix_ms":1000}]"#,
        )
        .unwrap();

        let store = InMemoryCookieStore::new();
        assert_eq!(load_cookies(&store, &path).unwrap(), 0);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "not json").unwrap();

        let store = InMemoryCookieStore::new();
        assert!(matches!(
            load_cookies(&store, &path),
            Err(CookieError::Json(_))
        ));
        assert!(matches!(
            load_cookies(&store, &dir.path().join("missing.json")),
            Err(CookieError::Io(_))
        ));
    }
}
