//! Cookie storage.
//!
//! [`CookieStore`] is the pluggable contract a
//! [`CookieManager`](crate::cookies::manager::CookieManager) stores into.
//! [`InMemoryCookieStore`] is the default implementation.
//!
//! # Layout
//!
//! The in-memory store keeps one authoritative arena of cookies (the jar) keyed
//! by an assigned [`CookieId`], plus two lookup indices that only hold ids:
//!
//! - domain index: cookie `Domain` attribute -> ids
//! - url index: [`effective_url`] of the setting request -> ids
//!
//! Indices are never eagerly cleaned. Replacing or removing a cookie leaves its
//! old id behind; every scan re-checks ids against the jar and drops the ones
//! that no longer resolve.

use crate::cookies::cookie::{Cookie, CookieIdentity};
use crate::cookies::matching::{domain_matches, legacy_domain_matches};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use url::Url;

/// Storage contract for cookies.
///
/// Implementations must be safe to share between threads; several managers
/// may hold the same store.
pub trait CookieStore: Send + Sync {
    /// Add a cookie, replacing any cookie with the same identity.
    ///
    /// A cookie with max-age 0 is not stored; it only removes its predecessor.
    /// `url` is the request that set the cookie, if any.
    fn add(&self, url: Option<&Url>, cookie: Cookie);

    /// Candidate cookies for a request: domain matches plus cookies set by the
    /// same host. Unsorted and not filtered by path.
    fn get(&self, url: &Url) -> Vec<Cookie>;

    /// Every unexpired cookie in the store.
    fn get_cookies(&self) -> Vec<Cookie>;

    /// Effective urls that currently have cookies associated with them.
    fn get_urls(&self) -> Vec<Url>;

    /// Remove the cookie with the same identity. Returns whether one was removed.
    fn remove(&self, url: Option<&Url>, cookie: &Cookie) -> bool;

    /// Remove everything. Returns `false` if the store was already empty.
    fn remove_all(&self) -> bool;
}

/// Key of a cookie in the jar. Ids increase with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct CookieId(u64);

#[derive(Debug, Default)]
struct Arena {
    next_id: u64,
    cookies: BTreeMap<CookieId, Cookie>,
    by_identity: HashMap<CookieIdentity, CookieId>,
}

impl Arena {
    fn insert(&mut self, cookie: Cookie) -> CookieId {
        let id = CookieId(self.next_id);
        self.next_id += 1;
        self.by_identity.insert(cookie.identity(), id);
        self.cookies.insert(id, cookie);
        id
    }

    fn remove_identity(&mut self, identity: &CookieIdentity) -> Option<Cookie> {
        let id = self.by_identity.remove(identity)?;
        self.cookies.remove(&id)
    }

    fn evict(&mut self, id: CookieId) -> Option<Cookie> {
        let cookie = self.cookies.remove(&id)?;
        self.by_identity.remove(&cookie.identity());
        Some(cookie)
    }

    fn contains(&self, id: CookieId) -> bool {
        self.cookies.contains_key(&id)
    }
}

#[derive(Debug, Default)]
struct Jar {
    arena: Arena,
    domain_index: BTreeMap<String, Vec<CookieId>>,
    url_index: BTreeMap<Url, Vec<CookieId>>,
}

/// Per-call state shared by the bucket scans in [`InMemoryCookieStore::get`].
struct Scan<'a> {
    arena: &'a mut Arena,
    now: OffsetDateTime,
    secure_link: bool,
    seen: HashSet<CookieId>,
    found: Vec<Cookie>,
}

impl Scan<'_> {
    /// Walk one index bucket, dropping dead ids and evicting expired cookies.
    fn bucket(&mut self, bucket: &mut Vec<CookieId>, matches: impl Fn(&Cookie) -> bool) {
        bucket.retain(|&id| {
            let Some(cookie) = self.arena.cookies.get(&id) else {
                tracing::trace!(id = id.0, "purging stale index entry");
                return false;
            };
            if !matches(cookie) {
                return true;
            }
            if cookie.has_expired_at(self.now) {
                tracing::trace!(name = %cookie.name(), "evicting expired cookie");
                self.arena.evict(id);
                return false;
            }
            if (self.secure_link || !cookie.secure()) && self.seen.insert(id) {
                self.found.push(cookie.clone());
            }
            true
        });
    }
}

/// Thread-safe in-memory cookie store.
///
/// Every operation runs under one exclusive lock for its full duration.
///
/// ```rust
/// use cookiehandler::cookies::cookie::Cookie;
/// use cookiehandler::cookies::store::{CookieStore, InMemoryCookieStore};
/// use url::Url;
///
/// let store = InMemoryCookieStore::new();
/// let url = Url::parse("http://www.example.com/").unwrap();
/// let mut cookie = Cookie::new("id", "42").unwrap();
/// cookie.set_domain(".example.com");
/// store.add(Some(&url), cookie);
///
/// assert_eq!(store.get(&url).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    jar: Mutex<Jar>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cookies in the jar, including ones not yet evicted for expiry.
    pub fn len(&self) -> usize {
        self.lock().arena.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().arena.cookies.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Jar> {
        // Every mutation leaves the jar consistent, so a panic elsewhere is no
        // reason to stop serving cookies.
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for InMemoryCookieStore {
    fn add(&self, url: Option<&Url>, cookie: Cookie) {
        let mut jar = self.lock();
        let jar = &mut *jar;

        if jar.arena.remove_identity(&cookie.identity()).is_some() {
            tracing::trace!(name = %cookie.name(), "replacing cookie");
        }

        if cookie.max_age() == Some(0) {
            return;
        }

        let domain = cookie.domain().map(str::to_owned);
        let id = jar.arena.insert(cookie);

        if let Some(domain) = domain {
            append_to_bucket(&jar.arena, jar.domain_index.entry(domain).or_default(), id);
        }
        if let Some(url) = url {
            append_to_bucket(
                &jar.arena,
                jar.url_index.entry(effective_url(url)).or_default(),
                id,
            );
        }
    }

    fn get(&self, url: &Url) -> Vec<Cookie> {
        let mut jar = self.lock();
        let Jar {
            arena,
            domain_index,
            url_index,
        } = &mut *jar;

        let host = url.host_str().unwrap_or_default();
        let mut scan = Scan {
            arena,
            now: OffsetDateTime::now_utc(),
            secure_link: url.scheme() == "https",
            seen: HashSet::new(),
            found: Vec::new(),
        };

        for (domain, bucket) in domain_index.iter_mut() {
            scan.bucket(bucket, |cookie| {
                if cookie.version() == 0 {
                    legacy_domain_matches(domain, host)
                } else {
                    domain_matches(domain, host)
                }
            });
        }

        if let Some(bucket) = url_index.get_mut(&effective_url(url)) {
            scan.bucket(bucket, |_| true);
        }

        scan.found
    }

    fn get_cookies(&self) -> Vec<Cookie> {
        let mut jar = self.lock();
        let now = OffsetDateTime::now_utc();

        let expired: Vec<CookieId> = jar
            .arena
            .cookies
            .iter()
            .filter(|(_, cookie)| cookie.has_expired_at(now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(cookie) = jar.arena.evict(id) {
                tracing::trace!(name = %cookie.name(), "evicting expired cookie");
            }
        }

        jar.arena.cookies.values().cloned().collect()
    }

    fn get_urls(&self) -> Vec<Url> {
        let mut jar = self.lock();
        let Jar {
            arena, url_index, ..
        } = &mut *jar;

        url_index.retain(|_, bucket| {
            bucket.retain(|id| arena.contains(*id));
            !bucket.is_empty()
        });
        url_index.keys().cloned().collect()
    }

    fn remove(&self, _url: Option<&Url>, cookie: &Cookie) -> bool {
        self.lock()
            .arena
            .remove_identity(&cookie.identity())
            .is_some()
    }

    fn remove_all(&self) -> bool {
        let mut jar = self.lock();
        if jar.arena.cookies.is_empty() {
            return false;
        }
        *jar = Jar::default();
        true
    }
}

/// Append `id` to an index bucket, dropping ids the jar no longer holds.
fn append_to_bucket(arena: &Arena, bucket: &mut Vec<CookieId>, id: CookieId) {
    bucket.retain(|existing| arena.contains(*existing));
    bucket.push(id);
}

/// Collapse a request url to its host bucket: scheme `http`, host kept,
/// port, path, query and fragment dropped.
///
/// ```rust
/// use cookiehandler::cookies::store::effective_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.com:8443/a/b?q=1").unwrap();
/// assert_eq!(effective_url(&url).as_str(), "http://example.com/");
/// ```
pub fn effective_url(url: &Url) -> Url {
    url.host_str()
        .and_then(|host| Url::parse(&format!("http://{}/", host)).ok())
        .unwrap_or_else(|| url.clone())
}
