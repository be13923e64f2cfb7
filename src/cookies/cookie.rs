use crate::cookies::error::{CookieError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use time::OffsetDateTime;

/// A single HTTP cookie and its attributes.
///
/// Covers the Netscape draft (version 0) and the RFC 2965 dialect (version 1).
/// The name is fixed at construction; every other attribute can be changed
/// until the cookie is handed to a store.
///
/// Equality and hashing use the cookie's *identity*: the name and domain
/// compared case-insensitively, the path compared exactly. Two cookies with the
/// same identity replace each other in a [`CookieStore`](crate::cookies::store::CookieStore).
#[derive(Debug, Clone)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    port_list: Option<String>,
    max_age: Option<i64>,
    version: u8,
    secure: bool,
    http_only: bool,
    discard: bool,
    comment: Option<String>,
    comment_url: Option<String>,
    creation_time: OffsetDateTime,
}

/// The case-folded identity of a cookie, usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CookieIdentity {
    name: String,
    domain: Option<String>,
    path: Option<String>,
}

impl Cookie {
    /// Create a version 1 cookie stamped with the current time.
    ///
    /// The name is trimmed and must be a token: no control characters, no
    /// comma, semicolon, or space, and no leading `$`.
    pub fn new(name: impl AsRef<str>, value: impl Into<String>) -> Result<Self> {
        Self::with_creation_time(name, value, OffsetDateTime::now_utc())
    }

    /// Create a cookie with an explicit creation time.
    ///
    /// Used when restoring cookies whose age must survive a round trip.
    pub fn with_creation_time(
        name: impl AsRef<str>,
        value: impl Into<String>,
        creation_time: OffsetDateTime,
    ) -> Result<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() || !is_token(name) || name.starts_with('$') {
            return Err(CookieError::illegal_name(name));
        }

        Ok(Self {
            name: name.to_string(),
            value: value.into(),
            domain: None,
            path: None,
            port_list: None,
            max_age: None,
            version: 1,
            secure: false,
            http_only: false,
            discard: false,
            comment: None,
            comment_url: None,
            creation_time,
        })
    }

    /// Parse a `Set-Cookie` or `Set-Cookie2` header value.
    ///
    /// See [`parser::parse`](crate::cookies::parser::parse).
    pub fn parse(header: &str) -> Result<Vec<Cookie>> {
        crate::cookies::parser::parse(header)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// The domain attribute, always lowercase.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn set_domain(&mut self, domain: impl AsRef<str>) {
        self.domain = Some(domain.as_ref().to_lowercase());
    }

    pub fn clear_domain(&mut self) {
        self.domain = None;
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    /// The raw comma separated port list. `Some("")` is an explicit empty list.
    pub fn port_list(&self) -> Option<&str> {
        self.port_list.as_deref()
    }

    pub fn set_port_list(&mut self, ports: impl Into<String>) {
        self.port_list = Some(ports.into());
    }

    /// Max-age in seconds. `None` means unspecified; negative values never expire.
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn set_max_age(&mut self, seconds: i64) {
        self.max_age = Some(seconds);
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Set the cookie version. Only 0 (Netscape) and 1 (RFC 2965) exist.
    pub fn set_version(&mut self, version: u32) -> Result<()> {
        match version {
            0 | 1 => {
                self.version = version as u8;
                Ok(())
            }
            other => Err(CookieError::IllegalVersion(other)),
        }
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    pub fn discard(&self) -> bool {
        self.discard
    }

    pub fn set_discard(&mut self, discard: bool) {
        self.discard = discard;
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn comment_url(&self) -> Option<&str> {
        self.comment_url.as_deref()
    }

    pub fn set_comment_url(&mut self, url: impl Into<String>) {
        self.comment_url = Some(url.into());
    }

    pub fn creation_time(&self) -> OffsetDateTime {
        self.creation_time
    }

    /// Whether the cookie has outlived its max-age as of now.
    pub fn has_expired(&self) -> bool {
        self.has_expired_at(OffsetDateTime::now_utc())
    }

    /// Whether the cookie has outlived its max-age as of `now`.
    ///
    /// A max-age of 0 is always expired. A missing or negative max-age never
    /// expires by age alone.
    pub fn has_expired_at(&self, now: OffsetDateTime) -> bool {
        match self.max_age {
            Some(0) => true,
            Some(max_age) if max_age > 0 => (now - self.creation_time).whole_seconds() > max_age,
            _ => false,
        }
    }

    pub fn identity(&self) -> CookieIdentity {
        CookieIdentity {
            name: self.name.to_lowercase(),
            domain: self.domain.as_ref().map(|d| d.to_lowercase()),
            path: self.path.clone(),
        }
    }
}

impl PartialEq for Cookie {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Cookie {}

impl Hash for Cookie {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Renders the cookie as a `Cookie` request header fragment.
///
/// Version 0 cookies render as `name=value`. Version 1 cookies quote the value
/// and append `$Path`, `$Domain` and `$Port` for each attribute present.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version == 0 {
            return write!(f, "{}={}", self.name, self.value);
        }

        write!(f, "{}=\"{}\"", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, ";$Path=\"{}\"", path)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, ";$Domain=\"{}\"", domain)?;
        }
        if let Some(ports) = &self.port_list {
            write!(f, ";$Port=\"{}\"", ports)?;
        }
        Ok(())
    }
}

/// Token grammar for cookie names: printable ASCII minus `,`, `;` and space.
fn is_token(value: &str) -> bool {
    value.chars().all(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, ',' | ';')
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn is_illegal_name(name: &str) -> bool {
        matches!(Cookie::new(name, "v"), Err(CookieError::IllegalName(_)))
    }

    #[test]
    fn test_new_trims_and_validates_name() {
        let cookie = Cookie::new("  session ", "abc").unwrap();
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.version(), 1);

        for name in ["", "$Path", "a b", "a,b", "a;b", "a\tb", "caf\u{e9}"] {
            assert!(is_illegal_name(name), "{:?}", name);
        }
    }

    #[test]
    fn test_domain_is_lowercased() {
        let mut cookie = Cookie::new("a", "b").unwrap();
        cookie.set_domain(".Example.COM");
        assert_eq!(cookie.domain(), Some(".example.com"));
    }

    #[test]
    fn test_version_is_restricted() {
        let mut cookie = Cookie::new("a", "b").unwrap();
        assert!(cookie.set_version(0).is_ok());
        assert_eq!(cookie.version(), 0);
        let err = cookie.set_version(2);
        assert!(matches!(err, Err(CookieError::IllegalVersion(2))));
        assert_eq!(cookie.version(), 0);
    }

    #[test]
    fn test_expiry_rules() {
        let created = OffsetDateTime::now_utc() - Duration::seconds(100);
        let mut cookie = Cookie::with_creation_time("a", "b", created).unwrap();
        let now = OffsetDateTime::now_utc();

        assert!(!cookie.has_expired_at(now));

        cookie.set_max_age(-1);
        assert!(!cookie.has_expired_at(now));

        cookie.set_max_age(0);
        assert!(cookie.has_expired_at(now));

        cookie.set_max_age(50);
        assert!(cookie.has_expired_at(now));

        cookie.set_max_age(500);
        assert!(!cookie.has_expired_at(now));
    }

    #[test]
    fn test_identity_equality() {
        let mut a = Cookie::new("Name", "1").unwrap();
        a.set_domain("example.com");
        a.set_path("/p");

        let mut b = Cookie::new("NAME", "2").unwrap();
        b.set_domain("EXAMPLE.com");
        b.set_path("/p");
        assert_eq!(a, b);
        assert_eq!(a.identity(), b.identity());

        b.set_path("/P");
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_netscape() {
        let mut cookie = Cookie::new("foo", "bar").unwrap();
        cookie.set_version(0).unwrap();
        cookie.set_path("/");
        cookie.set_domain("example.com");
        assert_eq!(cookie.to_string(), "foo=bar");
    }

    #[test]
    fn test_display_rfc2965() {
        let mut cookie = Cookie::new("foo", "bar").unwrap();
        assert_eq!(cookie.to_string(), "foo=\"bar\"");

        cookie.set_path("/a");
        cookie.set_domain(".example.com");
        cookie.set_port_list("80,443");
        assert_eq!(
            cookie.to_string(),
            "foo=\"bar\";$Path=\"/a\";$Domain=\".example.com\";$Port=\"80,443\""
        );
    }
}
