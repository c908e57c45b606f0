//! Cookie jar that remembers expiries so the session lifetime can be derived.
//!
//! The jar is scoped to a single backend host: domain and path attributes are
//! ignored and every stored cookie is sent with every request.

use std::collections::BTreeMap;

use cookie::Cookie;
use parking_lot::Mutex;
use reqwest::header::HeaderValue;
use time::OffsetDateTime;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieExpiry {
    pub name: String,
    /// `None` for browser-session cookies.
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug)]
struct StoredCookie {
    value: String,
    expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default)]
pub struct SessionCookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl SessionCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one `Set-Cookie` header value. Cookies that arrive already
    /// expired delete any stored cookie of the same name.
    pub fn store(&self, set_cookie: &str, now: OffsetDateTime) {
        let Ok(parsed) = Cookie::parse(set_cookie.to_owned()) else {
            tracing::debug!("ignoring unparsable Set-Cookie header");
            return;
        };

        let expires_at = parsed
            .max_age()
            .map(|age| now + age)
            .or_else(|| parsed.expires_datetime());

        let mut cookies = self.cookies.lock();
        if expires_at.is_some_and(|at| at <= now) {
            cookies.remove(parsed.name());
            return;
        }
        cookies.insert(
            parsed.name().to_owned(),
            StoredCookie {
                value: parsed.value().to_owned(),
                expires_at,
            },
        );
    }

    /// `Cookie` request header for all cookies still alive at `now`.
    #[must_use]
    pub fn header_value(&self, now: OffsetDateTime) -> Option<String> {
        let cookies = self.cookies.lock();
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|(_, c)| c.expires_at.is_none_or(|at| at > now))
            .map(|(name, c)| format!("{name}={}", c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Expiries of the cookies alive at `now`. Expired cookies are purged
    /// first, so one the server stopped re-issuing cannot pin the session
    /// expiry in the past.
    #[must_use]
    pub fn expiries(&self, now: OffsetDateTime) -> Vec<CookieExpiry> {
        let mut cookies = self.cookies.lock();
        cookies.retain(|_, c| c.expires_at.is_none_or(|at| at > now));
        cookies
            .iter()
            .map(|(name, c)| CookieExpiry {
                name: name.clone(),
                expires_at: c.expires_at,
            })
            .collect()
    }
}

impl reqwest::cookie::CookieStore for SessionCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        let now = OffsetDateTime::now_utc();
        for header in cookie_headers {
            if let Ok(raw) = header.to_str() {
                self.store(raw, now);
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        self.header_value(OffsetDateTime::now_utc())
            .and_then(|v| HeaderValue::from_str(&v).ok())
    }
}
