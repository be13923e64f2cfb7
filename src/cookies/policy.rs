//! Accept/reject decisions for incoming cookies.

use crate::cookies::cookie::Cookie;
use crate::cookies::matching::domain_matches;
use url::Url;

/// Error a policy may report instead of a decision. The manager treats it as a
/// rejection.
pub type PolicyError = Box<dyn std::error::Error + Send + Sync>;

/// Decides whether a cookie set by `url` may be stored.
///
/// Runs outside the store's lock, so implementations may block.
pub trait CookiePolicy: Send + Sync {
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> Result<bool, PolicyError>;
}

/// The three built-in policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StandardPolicy {
    AcceptAll,
    AcceptNone,
    /// Only cookies whose domain covers the setting host. A cookie without a
    /// domain is host-only and is accepted when `url` names a host.
    #[default]
    AcceptOriginalServer,
}

impl CookiePolicy for StandardPolicy {
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> Result<bool, PolicyError> {
        Ok(match self {
            StandardPolicy::AcceptAll => true,
            StandardPolicy::AcceptNone => false,
            StandardPolicy::AcceptOriginalServer => match (cookie.domain(), url.host_str()) {
                (Some(domain), Some(host)) => domain_matches(domain, host),
                // `url` is the origin, so a domain-less cookie belongs to its host.
                (None, Some(_)) => true,
                (_, None) => false,
            },
        })
    }
}

impl<F> CookiePolicy for F
where
    F: Fn(&Url, &Cookie) -> bool + Send + Sync,
{
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> Result<bool, PolicyError> {
        Ok(self(url, cookie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_for(domain: Option<&str>) -> Cookie {
        let mut cookie = Cookie::new("a", "b").unwrap();
        if let Some(domain) = domain {
            cookie.set_domain(domain);
        }
        cookie
    }

    fn accepts(policy: &dyn CookiePolicy, url: &str, cookie: &Cookie) -> bool {
        let url = Url::parse(url).unwrap();
        policy.should_accept(&url, cookie).unwrap()
    }

    #[test]
    fn test_accept_all_and_none() {
        let url = "http://www.example.com/";
        let cookie = cookie_for(Some(".other.com"));
        assert!(accepts(&StandardPolicy::AcceptAll, url, &cookie));
        assert!(!accepts(&StandardPolicy::AcceptNone, url, &cookie));
    }

    #[test]
    fn test_accept_original_server() {
        let policy = StandardPolicy::default();
        let url = "http://www.example.com/";

        assert!(accepts(&policy, url, &cookie_for(Some(".example.com"))));
        assert!(accepts(&policy, url, &cookie_for(None)));
        assert!(!accepts(&policy, url, &cookie_for(Some(".other.com"))));

        let deep = "http://a.www.example.com/";
        assert!(!accepts(&policy, deep, &cookie_for(Some(".example.com"))));
    }

    #[test]
    fn test_original_server_needs_a_host() {
        let policy = StandardPolicy::AcceptOriginalServer;
        let hostless = "data:text/plain,x";

        let scoped = cookie_for(Some(".example.com"));
        assert!(!accepts(&policy, hostless, &cookie_for(None)));
        assert!(!accepts(&policy, hostless, &scoped));
        assert!(accepts(&policy, "http://intranet/", &cookie_for(None)));
    }

    #[test]
    fn test_closure_policy() {
        let policy = |_: &Url, cookie: &Cookie| cookie.name() != "tracker";
        let url = "http://example.com/";
        let session = Cookie::new("session", "1").unwrap();
        let tracker = Cookie::new("tracker", "1").unwrap();
        assert!(accepts(&policy, url, &session));
        assert!(!accepts(&policy, url, &tracker));
    }
}
