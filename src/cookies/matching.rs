//! Domain, path and port matching for cookies.
//!
//! Pure functions shared by the store (domain index lookups) and the manager
//! (request filtering and header ordering).

use crate::cookies::cookie::Cookie;
use url::Url;

/// RFC 2965 domain matching.
///
/// `domain` must be `.local` or contain an embedded dot that is neither its
/// first nor its last character. A dot-less `host` matches `.local` and
/// `host.local`. Otherwise the host either equals the domain, is the domain
/// without its leading dot, or is the domain prefixed by a single label
/// (`www.foo.com` matches `.foo.com`, `x.y.foo.com` does not).
pub fn domain_matches(domain: &str, host: &str) -> bool {
    match_domain(domain, host, true)
}

/// Netscape draft domain matching, used for version 0 cookies.
///
/// Identical to [`domain_matches`] except that any number of labels may
/// precede the domain, so `.foo.com` matches `x.y.foo.com`.
pub fn legacy_domain_matches(domain: &str, host: &str) -> bool {
    match_domain(domain, host, false)
}

fn match_domain(domain: &str, host: &str, single_label_prefix: bool) -> bool {
    let is_local_domain = domain.eq_ignore_ascii_case(".local");

    let mut embedded_dot = domain.find('.');
    if embedded_dot == Some(0) {
        embedded_dot = domain[1..].find('.').map(|i| i + 1);
    }
    if !is_local_domain && embedded_dot.map_or(true, |i| i == domain.len() - 1) {
        return false;
    }

    if !host.contains('.') {
        let host_local = format!("{}.local", host);
        if is_local_domain || domain.eq_ignore_ascii_case(&host_local) {
            return true;
        }
    }

    let host_bytes = host.as_bytes();
    let domain_bytes = domain.as_bytes();

    if host_bytes.len() == domain_bytes.len() {
        host_bytes.eq_ignore_ascii_case(domain_bytes)
    } else if host_bytes.len() > domain_bytes.len() {
        let (prefix, suffix) = host_bytes.split_at(host_bytes.len() - domain_bytes.len());
        if single_label_prefix && prefix.contains(&b'.') {
            return false;
        }
        suffix.eq_ignore_ascii_case(domain_bytes)
    } else if host_bytes.len() + 1 == domain_bytes.len() {
        domain_bytes[0] == b'.' && host_bytes.eq_ignore_ascii_case(&domain_bytes[1..])
    } else {
        false
    }
}

/// Whether a request path falls under a cookie path.
///
/// A literal prefix test, so `/ab` is covered by `/a`. A missing cookie path
/// only matches a missing request path.
pub fn path_matches(request_path: Option<&str>, cookie_path: Option<&str>) -> bool {
    match (request_path, cookie_path) {
        (None, None) => true,
        (Some(request), Some(cookie)) => request.starts_with(cookie),
        _ => false,
    }
}

/// Whether `port` appears in a comma separated port list.
///
/// Entries that are not decimal port numbers are skipped.
pub fn port_list_contains(ports: &str, port: u16) -> bool {
    ports
        .split(',')
        .filter_map(|entry| entry.trim().parse::<u16>().ok())
        .any(|p| p == port)
}

/// Order cookies for a `Cookie` request header and render them.
///
/// Longer paths come first; cookies with equal path length keep creation
/// order, oldest first. When the leading cookie is version 1 or later, a
/// `$Version="1"` fragment is emitted before it.
pub fn sort_by_path_and_age(mut cookies: Vec<Cookie>) -> Vec<String> {
    cookies.sort_by(|a, b| {
        let a_len = a.path().map_or(0, str::len);
        let b_len = b.path().map_or(0, str::len);
        b_len
            .cmp(&a_len)
            .then_with(|| a.creation_time().cmp(&b.creation_time()))
    });

    let mut fragments = Vec::with_capacity(cookies.len() + 1);
    if cookies.first().is_some_and(|c| c.version() > 0) {
        fragments.push("$Version=\"1\"".to_string());
    }
    fragments.extend(cookies.iter().map(Cookie::to_string));
    fragments
}

/// The directory of a request path, used as a cookie's default path.
///
/// `/docs/index.html` becomes `/docs/`; paths already ending in `/` are kept.
pub fn default_path(request_path: &str) -> String {
    if request_path.ends_with('/') {
        return request_path.to_string();
    }
    match request_path.rfind('/') {
        Some(i) if i > 0 => request_path[..=i].to_string(),
        _ => "/".to_string(),
    }
}

/// The port a request is made on: the explicit port, else 443 for https and
/// 80 for everything else.
pub fn effective_port(url: &Url) -> u16 {
    let default = if url.scheme() == "https" { 443 } else { 80 };
    url.port().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};

    #[test]
    fn test_domain_matches_single_label() {
        assert!(domain_matches(".foo.com", "www.foo.com"));
        assert!(domain_matches(".foo.com", "WWW.FOO.COM"));
        assert!(!domain_matches(".foo.com", "x.y.foo.com"));
        assert!(!domain_matches(".foo.com", "www.bar.com"));
    }

    #[test]
    fn test_legacy_domain_matches_any_depth() {
        assert!(legacy_domain_matches(".foo.com", "www.foo.com"));
        assert!(legacy_domain_matches(".foo.com", "x.y.foo.com"));
        assert!(!legacy_domain_matches(".foo.com", "x.y.bar.com"));
    }

    #[test]
    fn test_domain_requires_embedded_dot() {
        assert!(!domain_matches(".com", "foo.com"));
        assert!(!domain_matches("com", "com"));
        assert!(!domain_matches("foo.", "foo."));
        assert!(!legacy_domain_matches(".com", "x.foo.com"));
    }

    #[test]
    fn test_domain_equal_and_leading_dot() {
        assert!(domain_matches("foo.com", "foo.com"));
        assert!(domain_matches("foo.com", "FOO.com"));
        assert!(domain_matches(".foo.com", "foo.com"));
        assert!(!domain_matches("xfoo.com", "foo.com"));
    }

    #[test]
    fn test_local_domains() {
        assert!(domain_matches(".local", "localhost"));
        assert!(domain_matches("myhost.local", "myhost"));
        assert!(!domain_matches("other.local", "myhost"));
        assert!(legacy_domain_matches(".local", "intranet"));
    }

    #[test]
    fn test_domain_matches_non_ascii_host() {
        assert!(!domain_matches(".foo.com", "\u{e9}\u{e9}.foo.com.x"));
        assert!(domain_matches(".foo.com", "\u{e9}.foo.com"));
    }

    #[test]
    fn test_path_matches() {
        assert!(path_matches(Some("/a/b"), Some("/a")));
        assert!(!path_matches(Some("/a"), Some("/a/b")));
        assert!(path_matches(Some("/a"), Some("/a")));
        assert!(path_matches(Some("/ab"), Some("/a")));
        assert!(path_matches(None, None));
        assert!(!path_matches(Some("/"), None));
        assert!(!path_matches(None, Some("/")));
    }

    #[test]
    fn test_port_list_contains() {
        assert!(port_list_contains("80,443", 80));
        assert!(port_list_contains("80, 443", 443));
        assert!(!port_list_contains("80,443", 8080));
        assert!(port_list_contains("abc,8080", 8080));
        assert!(!port_list_contains("", 80));
        assert!(!port_list_contains("99999", 80));
    }

    fn cookie_at(name: &str, path: &str, secs: i64) -> Cookie {
        let created = OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs);
        let mut cookie = Cookie::with_creation_time(name, "v", created).unwrap();
        cookie.set_path(path);
        cookie
    }

    #[test]
    fn test_sort_by_path_then_age() {
        let cookies = vec![
            cookie_at("short", "/a", 5),
            cookie_at("young", "/a/b", 10),
            cookie_at("old", "/a/b", 1),
        ];
        let header = sort_by_path_and_age(cookies);
        assert_eq!(header[0], "$Version=\"1\"");
        assert!(header[1].starts_with("old="));
        assert!(header[2].starts_with("young="));
        assert!(header[3].starts_with("short="));
    }

    #[test]
    fn test_sort_treats_missing_path_as_empty() {
        let created = OffsetDateTime::UNIX_EPOCH;
        let pathless = Cookie::with_creation_time("none", "v", created).unwrap();
        let header = sort_by_path_and_age(vec![pathless, cookie_at("root", "/", 5)]);
        assert!(header[1].starts_with("root="));
        assert!(header[2].starts_with("none="));

        // Same length as an explicit empty path, so age decides.
        let pathless = Cookie::with_creation_time("none", "v", created).unwrap();
        let header = sort_by_path_and_age(vec![cookie_at("empty", "", 5), pathless]);
        assert!(header[1].starts_with("none="));
        assert!(header[2].starts_with("empty="));
    }

    #[test]
    fn test_sort_version_zero_has_no_version_fragment() {
        let mut cookie = cookie_at("n", "/", 0);
        cookie.set_version(0).unwrap();
        assert_eq!(sort_by_path_and_age(vec![cookie]), vec!["n=v".to_string()]);
        assert!(sort_by_path_and_age(Vec::new()).is_empty());
    }

    #[test]
    fn test_default_path() {
        assert_eq!(default_path("/docs/index.html"), "/docs/");
        assert_eq!(default_path("/docs/"), "/docs/");
        assert_eq!(default_path("/index.html"), "/");
        assert_eq!(default_path(""), "/");
    }

    fn port_of(url: &str) -> u16 {
        effective_port(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_effective_port() {
        assert_eq!(port_of("https://a.com/"), 443);
        assert_eq!(port_of("http://a.com/"), 80);
        assert_eq!(port_of("ftp://a.com/"), 80);
        assert_eq!(port_of("http://a.com:8080/"), 8080);
    }
}
