//! Request/response cookie orchestration.

use crate::cookies::cookie::Cookie;
use crate::cookies::error::{CookieError, Result};
use crate::cookies::matching::{
    default_path, effective_port, path_matches, port_list_contains, sort_by_path_and_age,
};
use crate::cookies::parser;
use crate::cookies::policy::{CookiePolicy, StandardPolicy};
use crate::cookies::store::{CookieStore, InMemoryCookieStore};
use http::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

const SET_COOKIE2: HeaderName = HeaderName::from_static("set-cookie2");

/// Connects a [`CookieStore`] to HTTP traffic.
///
/// [`put`](Self::put) files the cookies a response sets, [`get`](Self::get)
/// builds the `Cookie` header for a request. The manager keeps no state of its
/// own besides its store and policy, so several managers can share one store.
///
/// ```rust
/// use cookiehandler::cookies::manager::CookieManager;
/// use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
/// use url::Url;
///
/// let manager = CookieManager::new();
/// let url = Url::parse("http://www.example.com/").unwrap();
///
/// let mut response = HeaderMap::new();
/// response.insert(SET_COOKIE, HeaderValue::from_static("id=42; Version=1; Path=/"));
/// manager.put(&url, &response).unwrap();
///
/// let header = manager.cookie_header(&url).unwrap();
/// assert_eq!(header, "$Version=\"1\"; id=\"42\";$Path=\"/\";$Domain=\"www.example.com\"");
/// ```
pub struct CookieManager {
    store: Arc<dyn CookieStore>,
    policy: RwLock<Arc<dyn CookiePolicy>>,
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieManager {
    /// A manager over a fresh in-memory store that only accepts cookies for
    /// the server that set them.
    pub fn new() -> Self {
        Self::with_store_and_policy(
            Arc::new(InMemoryCookieStore::new()),
            Arc::new(StandardPolicy::AcceptOriginalServer),
        )
    }

    pub fn with_store_and_policy(
        store: Arc<dyn CookieStore>,
        policy: Arc<dyn CookiePolicy>,
    ) -> Self {
        Self {
            store,
            policy: RwLock::new(policy),
        }
    }

    /// Replace the accept/reject policy for subsequent [`put`](Self::put) calls.
    pub fn set_cookie_policy(&self, policy: Arc<dyn CookiePolicy>) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// The shared store handle.
    pub fn cookie_store(&self) -> Arc<dyn CookieStore> {
        Arc::clone(&self.store)
    }

    /// Build the cookie headers for a request to `url`.
    ///
    /// The returned map holds one `cookie` value per fragment, in send order,
    /// or nothing when no stored cookie applies. The request headers are not
    /// consulted by the built-in logic.
    pub fn get(&self, url: &Url, _request_headers: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for fragment in self.matching_fragments(url)? {
            match HeaderValue::from_str(&fragment) {
                Ok(value) => {
                    headers.append(COOKIE, value);
                }
                Err(_) => {
                    tracing::warn!(
                        url = %url,
                        fragment = %fragment,
                        "cookie is not a valid header value"
                    );
                }
            }
        }
        Ok(headers)
    }

    /// Store the cookies set by a response from `url`.
    ///
    /// Every `Set-Cookie` and `Set-Cookie2` value is parsed on its own; a value
    /// that fails to parse is logged and skipped.
    pub fn put(&self, url: &Url, response_headers: &HeaderMap) -> Result<()> {
        let Some(host) = url.host_str() else {
            return Err(CookieError::missing_host(url));
        };

        let values = response_headers
            .get_all(SET_COOKIE)
            .iter()
            .chain(response_headers.get_all(SET_COOKIE2).iter());

        for value in values {
            let Ok(header) = value.to_str() else {
                tracing::warn!(url = %url, "skipping non UTF-8 Set-Cookie value");
                continue;
            };

            let cookies = match parser::parse(header) {
                Ok(cookies) => cookies,
                Err(e) => {
                    tracing::warn!(url = %url, header = %header, error = %e, "invalid cookie");
                    continue;
                }
            };

            for cookie in cookies {
                self.store_cookie(url, host, cookie);
            }
        }
        Ok(())
    }

    /// The stored cookies for `url` as a single `Cookie` header value, with
    /// fragments joined by `"; "`.
    pub fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        let fragments = self.matching_fragments(url).ok()?;
        if fragments.is_empty() {
            return None;
        }
        HeaderValue::from_str(&fragments.join("; ")).ok()
    }

    /// Attach stored cookies to an outgoing request.
    ///
    /// Any `Cookie` header already in `headers` is treated as user supplied:
    /// it is appended after the stored cookies, separated by `;`, or kept on
    /// its own when nothing is stored for `url`.
    pub fn apply_to_request(&self, url: &Url, headers: &mut HeaderMap) -> Result<()> {
        if url.host_str().is_none() {
            return Err(CookieError::missing_host(url));
        }

        let user: Vec<u8> = headers
            .get_all(COOKIE)
            .iter()
            .map(HeaderValue::as_bytes)
            .collect::<Vec<_>>()
            .join(&b"; "[..]);
        headers.remove(COOKIE);

        let combined = match (self.cookie_header(url), user.is_empty()) {
            (Some(stored), true) => Some(stored),
            (Some(stored), false) => {
                let joined = [stored.as_bytes(), b";".as_slice(), user.as_slice()].concat();
                HeaderValue::from_bytes(&joined).ok()
            }
            (None, false) => HeaderValue::from_bytes(&user).ok(),
            (None, true) => None,
        };
        if let Some(value) = combined {
            headers.insert(COOKIE, value);
        }
        Ok(())
    }

    fn matching_fragments(&self, url: &Url) -> Result<Vec<String>> {
        if url.host_str().is_none() {
            return Err(CookieError::missing_host(url));
        }

        let secure_link = url.scheme() == "https";
        let http_scheme = matches!(url.scheme(), "http" | "https");
        let port = effective_port(url);
        let path = match url.path() {
            "" => "/",
            path => path,
        };

        let cookies: Vec<Cookie> = self
            .store
            .get(url)
            .into_iter()
            .filter(|cookie| path_matches(Some(path), cookie.path()))
            .filter(|cookie| secure_link || !cookie.secure())
            .filter(|cookie| !cookie.http_only() || http_scheme)
            .filter(|cookie| match cookie.port_list() {
                Some(ports) if !ports.is_empty() => port_list_contains(ports, port),
                _ => true,
            })
            .collect();

        Ok(sort_by_path_and_age(cookies))
    }

    fn store_cookie(&self, url: &Url, host: &str, mut cookie: Cookie) {
        if cookie.path().is_none() {
            cookie.set_path(default_path(url.path()));
        }
        if cookie.domain().is_none() {
            if host.contains('.') {
                cookie.set_domain(host);
            } else {
                cookie.set_domain(format!("{}.local", host));
            }
        }

        let port = effective_port(url);
        match cookie.port_list() {
            Some("") => cookie.set_port_list(port.to_string()),
            Some(ports) if !port_list_contains(ports, port) => {
                tracing::debug!(
                    name = %cookie.name(),
                    ports = %ports,
                    port,
                    "port not in cookie port list"
                );
                return;
            }
            _ => {}
        }

        if self.should_accept(url, &cookie) {
            tracing::debug!(name = %cookie.name(), domain = ?cookie.domain(), "accepted cookie");
            self.store.add(Some(url), cookie);
        } else {
            tracing::debug!(name = %cookie.name(), domain = ?cookie.domain(), "rejected cookie");
        }
    }

    /// Ask the policy, rejecting on error or panic.
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> bool {
        let policy = {
            let current = self.policy.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(&*current)
        };

        match panic::catch_unwind(AssertUnwindSafe(|| policy.should_accept(url, cookie))) {
            Ok(Ok(accept)) => accept,
            Ok(Err(e)) => {
                tracing::warn!(
                    url = %url,
                    name = %cookie.name(),
                    error = %e,
                    "cookie policy failed"
                );
                false
            }
            Err(_) => {
                tracing::warn!(url = %url, name = %cookie.name(), "cookie policy panicked");
                false
            }
        }
    }
}
