//! Client-side HTTP cookie management.
//!
//! This module provides the whole parse, store, match and reconstruct
//! pipeline for `Set-Cookie` / `Set-Cookie2` responses and `Cookie` requests:
//!
//! - **Parsing**: Netscape draft and RFC 2109/2965 headers ([`parser`])
//! - **Matching**: strict and legacy domain matching, path and port rules ([`matching`])
//! - **Storage**: pluggable [`CookieStore`](store::CookieStore) with an indexed in-memory default
//! - **Policy**: accept/reject callbacks, failing closed ([`policy`])
//! - **Persistence**: save/load a store as JSON (feature `json`)
//!
//! # Architecture
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`Cookie`](cookie::Cookie) | Single cookie and its attributes |
//! | [`InMemoryCookieStore`](store::InMemoryCookieStore) | Jar plus lazily purged domain and url indices |
//! | [`CookiePolicy`](policy::CookiePolicy) | Decides which cookies may be stored |
//! | [`CookieManager`](manager::CookieManager) | Glues headers, policy and store together |
//!
//! # Example
//!
//! ```rust
//! use cookiehandler::cookies::CookieManager;
//! use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
//! use url::Url;
//!
//! let manager = CookieManager::new();
//! let url = Url::parse("https://shop.example.com/cart").unwrap();
//!
//! let mut response = HeaderMap::new();
//! response.append(SET_COOKIE, HeaderValue::from_static("cart=7; Path=/"));
//! manager.put(&url, &response)?;
//!
//! let mut request = HeaderMap::new();
//! manager.apply_to_request(&url, &mut request)?;
//! assert_eq!(request["cookie"], "cart=7");
//! # Ok::<(), cookiehandler::cookies::error::CookieError>(())
//! ```
//!
//! # Sharing a store
//!
//! ```rust
//! use cookiehandler::cookies::{CookieManager, CookieStore, InMemoryCookieStore, StandardPolicy};
//! use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
//! use std::sync::Arc;
//! use url::Url;
//!
//! let store = Arc::new(InMemoryCookieStore::new());
//! let writer =
//!     CookieManager::with_store_and_policy(store.clone(), Arc::new(StandardPolicy::AcceptAll));
//! let reader =
//!     CookieManager::with_store_and_policy(store.clone(), Arc::new(StandardPolicy::AcceptNone));
//!
//! let url = Url::parse("http://www.example.com/").unwrap();
//! let mut response = HeaderMap::new();
//! response.append(SET_COOKIE, HeaderValue::from_static("id=1; Path=/"));
//! writer.put(&url, &response)?;
//!
//! assert_eq!(store.get_cookies().len(), 1);
//! assert!(reader.cookie_header(&url).is_some());
//! # Ok::<(), cookiehandler::cookies::error::CookieError>(())
//! ```

pub mod cookie;
pub mod error;
pub mod manager;
pub mod matching;
pub mod parser;
#[cfg(feature = "json")]
pub mod persistence;
pub mod policy;
pub mod store;

pub use cookie::{Cookie, CookieIdentity};
pub use error::CookieError;
pub use manager::CookieManager;
pub use policy::{CookiePolicy, PolicyError, StandardPolicy};
pub use store::{CookieStore, InMemoryCookieStore};
