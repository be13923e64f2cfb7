//! # cookiehandler
//!
//! Client-side HTTP cookie handling for Rust.
//!
//! `cookiehandler` turns `Set-Cookie` and `Set-Cookie2` response headers into
//! stored cookies and rebuilds the `Cookie` header for later requests, with the
//! matching rules browsers and HTTP clients have used since the Netscape draft.
//!
//! ## Features
//!
//! - **Three dialects**: Netscape draft, RFC 2109 and RFC 2965, picked per header
//! - **Matching**: strict RFC 2965 domain matching, legacy matching for version 0
//! - **Indexed store**: in-memory jar with domain and origin indices
//! - **Policies**: accept-all, accept-none, original-server, or any closure
//! - **Persistence**: JSON save/load (feature `json`, enabled by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use cookiehandler::cookies::CookieManager;
//! use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
//! use url::Url;
//!
//! let manager = CookieManager::new();
//! let url = Url::parse("http://www.example.com/account").unwrap();
//!
//! let mut response = HeaderMap::new();
//! response.append(SET_COOKIE, HeaderValue::from_static("session=abc; Path=/; HttpOnly"));
//! manager.put(&url, &response).unwrap();
//!
//! let request = manager.get(&url, &HeaderMap::new()).unwrap();
//! assert_eq!(request["cookie"], "session=abc");
//! ```
//!
//! ## Modules
//!
//! - [`cookies`] - Cookie record, parser, matching, store, policy and manager
//!
//! ## Security
//!
//! - `Secure` cookies are only returned for `https` requests
//! - `HttpOnly` cookies are never handed to non-HTTP schemes
//! - Policy callbacks that fail or panic reject the cookie

pub mod cookies;

pub use cookies::{Cookie, CookieError, CookieManager, CookiePolicy, CookieStore};
