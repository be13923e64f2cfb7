//! `Set-Cookie` / `Set-Cookie2` header parsing.
//!
//! Three grammars share these headers: the Netscape draft (version 0, with an
//! `Expires` date that itself contains commas) and the RFC 2109/2965 dialects
//! (version 1, several cookies per header separated by commas). The version is
//! sniffed from the header text before splitting.

use crate::cookies::cookie::Cookie;
use crate::cookies::error::{CookieError, Result};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::parsing::Parsed;
use time::{OffsetDateTime, PrimitiveDateTime};

const SET_COOKIE: &str = "set-cookie:";
const SET_COOKIE2: &str = "set-cookie2:";

/// Parse one header value into one or more cookies.
///
/// A leading `Set-Cookie:` or `Set-Cookie2:` token is stripped. Version 0
/// headers always yield exactly one cookie; version 1 headers yield one cookie
/// per comma separated chunk, each forced to version 1.
///
/// ```rust
/// use cookiehandler::cookies::parser::parse;
///
/// let cookies = parse("Set-Cookie2: a=1; Version=1, b=\"x,y\"; Version=1").unwrap();
/// assert_eq!(cookies.len(), 2);
/// assert_eq!(cookies[1].value(), "x,y");
/// ```
pub fn parse(header: &str) -> Result<Vec<Cookie>> {
    let version = guess_version(header);
    let body = strip_prefix_ignore_case(header, SET_COOKIE2)
        .or_else(|| strip_prefix_ignore_case(header, SET_COOKIE))
        .unwrap_or(header);

    if version == 0 {
        let mut cookie = parse_single(body)?;
        cookie.set_version(0)?;
        return Ok(vec![cookie]);
    }

    split_multi_cookies(body)
        .into_iter()
        .map(|chunk| {
            let mut cookie = parse_single(chunk)?;
            cookie.set_version(1)?;
            Ok(cookie)
        })
        .collect()
}

/// Sniff the cookie version from the raw header text.
///
/// `expires=` wins and means the Netscape draft. `version=`, `max-age` or a
/// `set-cookie2:` prefix mean version 1. Anything else is treated as version 0.
fn guess_version(header: &str) -> u8 {
    let header = header.to_ascii_lowercase();
    if header.contains("expires=") {
        0
    } else if header.contains("version=") || header.contains("max-age") {
        1
    } else if header.starts_with(SET_COOKIE2) {
        1
    } else {
        0
    }
}

fn strip_prefix_ignore_case<'a>(header: &'a str, prefix: &str) -> Option<&'a str> {
    header
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &header[prefix.len()..])
}

/// Split on commas that are not inside a double-quoted value.
fn split_multi_cookies(header: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut quotes = 0usize;
    let mut start = 0;

    for (i, c) in header.char_indices() {
        match c {
            '"' => quotes += 1,
            ',' if quotes % 2 == 0 => {
                chunks.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    chunks.push(&header[start..]);
    chunks
}

fn parse_single(chunk: &str) -> Result<Cookie> {
    let mut pairs = chunk.split(';').filter(|pair| !pair.is_empty());

    let first = pairs.next().ok_or(CookieError::EmptyHeader)?;
    let Some((name, value)) = first.split_once('=') else {
        return Err(CookieError::InvalidNameValuePair);
    };
    let value = strip_quotes(value.trim());
    let mut cookie = Cookie::with_creation_time(name, value, OffsetDateTime::now_utc())?;

    for pair in pairs {
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name.trim(), Some(strip_quotes(value.trim()))),
            None => (pair.trim(), None),
        };
        if let Some(attribute) = Attribute::from_name(name) {
            attribute.apply(&mut cookie, value)?;
        }
    }

    Ok(cookie)
}

/// Drop one pair of surrounding quotes. A bare `""` is kept as is.
fn strip_quotes(value: &str) -> &str {
    match value.as_bytes() {
        [b'"', _, .., b'"'] | [b'\'', _, .., b'\''] => &value[1..value.len() - 1],
        _ => value,
    }
}

/// The fixed set of attributes understood in a cookie header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Comment,
    CommentUrl,
    Discard,
    Domain,
    MaxAge,
    Path,
    Port,
    Secure,
    HttpOnly,
    Version,
    Expires,
}

impl Attribute {
    fn from_name(name: &str) -> Option<Self> {
        let attribute = match name.to_ascii_lowercase().as_str() {
            "comment" => Attribute::Comment,
            "commenturl" => Attribute::CommentUrl,
            "discard" => Attribute::Discard,
            "domain" => Attribute::Domain,
            "max-age" => Attribute::MaxAge,
            "path" => Attribute::Path,
            "port" => Attribute::Port,
            "secure" => Attribute::Secure,
            "httponly" => Attribute::HttpOnly,
            "version" => Attribute::Version,
            "expires" => Attribute::Expires,
            _ => return None,
        };
        Some(attribute)
    }

    /// Value attributes keep their first occurrence; flags only ever turn on;
    /// `version` overwrites.
    fn apply(self, cookie: &mut Cookie, value: Option<&str>) -> Result<()> {
        match self {
            Attribute::Comment => {
                if let (None, Some(value)) = (cookie.comment(), value) {
                    cookie.set_comment(value);
                }
            }
            Attribute::CommentUrl => {
                if let (None, Some(value)) = (cookie.comment_url(), value) {
                    cookie.set_comment_url(value);
                }
            }
            Attribute::Discard => cookie.set_discard(true),
            Attribute::Domain => {
                if let (None, Some(value)) = (cookie.domain(), value) {
                    cookie.set_domain(value);
                }
            }
            Attribute::MaxAge => {
                let raw = value.unwrap_or_default();
                let max_age = raw
                    .parse::<i64>()
                    .map_err(|_| CookieError::IllegalMaxAge(raw.to_string()))?;
                if cookie.max_age().is_none() {
                    cookie.set_max_age(max_age);
                }
            }
            Attribute::Path => {
                if let (None, Some(value)) = (cookie.path(), value) {
                    cookie.set_path(value);
                }
            }
            Attribute::Port => {
                if cookie.port_list().is_none() {
                    cookie.set_port_list(value.unwrap_or_default());
                }
            }
            Attribute::Secure => cookie.set_secure(true),
            Attribute::HttpOnly => cookie.set_http_only(true),
            Attribute::Version => {
                // Bogus versions fall back to whatever the header sniffing decides.
                if let Some(version) = value.and_then(|v| v.parse::<u32>().ok()) {
                    if version <= 1 {
                        cookie.set_version(version)?;
                    }
                }
            }
            Attribute::Expires => {
                if cookie.max_age().is_none() {
                    let created = cookie.creation_time();
                    let delta = value
                        .and_then(parse_cookie_date)
                        .map_or(0, |expiry| (expiry - created).whole_seconds());
                    cookie.set_max_age(delta.max(0));
                }
            }
        }
        Ok(())
    }
}

struct CookieDateFormat {
    items: &'static [BorrowedFormatItem<'static>],
    two_digit_year: bool,
    has_offset: bool,
}

/// Known `Expires` layouts, tried in order. The leading weekday is stripped
/// before matching and never validated.
const COOKIE_DATE_FORMATS: [CookieDateFormat; 6] = [
    CookieDateFormat {
        items: format_description!(
            "[day padding:none]-[month repr:short case_sensitive:false]-[year] [hour]:[minute]:[second] GMT"
        ),
        two_digit_year: false,
        has_offset: false,
    },
    CookieDateFormat {
        items: format_description!(
            "[day padding:none] [month repr:short case_sensitive:false] [year] [hour]:[minute]:[second] GMT"
        ),
        two_digit_year: false,
        has_offset: false,
    },
    CookieDateFormat {
        items: format_description!(
            "[month repr:short case_sensitive:false] [day padding:none] [year] [hour]:[minute]:[second] GMT[offset_hour sign:mandatory][offset_minute]"
        ),
        two_digit_year: false,
        has_offset: true,
    },
    CookieDateFormat {
        items: format_description!(
            "[day padding:none]-[month repr:short case_sensitive:false]-[year repr:last_two] [hour]:[minute]:[second] GMT"
        ),
        two_digit_year: true,
        has_offset: false,
    },
    CookieDateFormat {
        items: format_description!(
            "[day padding:none] [month repr:short case_sensitive:false] [year repr:last_two] [hour]:[minute]:[second] GMT"
        ),
        two_digit_year: true,
        has_offset: false,
    },
    CookieDateFormat {
        items: format_description!(
            "[month repr:short case_sensitive:false] [day padding:none] [year repr:last_two] [hour]:[minute]:[second] GMT[offset_hour sign:mandatory][offset_minute]"
        ),
        two_digit_year: true,
        has_offset: true,
    },
];

impl CookieDateFormat {
    fn parse(&self, input: &str) -> Option<OffsetDateTime> {
        let mut parsed = Parsed::new();
        let remaining = parsed.parse_items(input.as_bytes(), self.items).ok()?;
        if !remaining.is_empty() {
            return None;
        }

        if self.two_digit_year {
            let year = i32::from(parsed.year_last_two()?);
            let century = if year < 70 { 2000 } else { 1900 };
            parsed.set_year(century + year)?;
        }

        if self.has_offset {
            OffsetDateTime::try_from(parsed).ok()
        } else {
            let datetime = PrimitiveDateTime::try_from(parsed).ok()?;
            Some(datetime.assume_utc())
        }
    }
}

/// Parse a Netscape `Expires` date.
pub fn parse_cookie_date(date: &str) -> Option<OffsetDateTime> {
    let date = date.trim();
    let without_weekday = date.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let rest = match without_weekday.strip_prefix(',') {
        Some(rest) => rest.trim_start(),
        None => without_weekday.trim_start(),
    };

    COOKIE_DATE_FORMATS
        .iter()
        .find_map(|format| format.parse(rest))
}
