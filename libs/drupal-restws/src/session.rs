use farmwfs_utils::SecretString;
use time::{Duration, OffsetDateTime};

use crate::cookies::CookieExpiry;

/// Lifetime assumed when the backend sets no cookie expiry at all.
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::hours(24);

/// An authenticated backend session: the CSRF token and when it stops being valid.
///
/// Replaced wholesale on every login, never mutated in place.
#[derive(Debug, Clone)]
pub struct Session {
    pub csrf_token: SecretString,
    pub expires_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Drupal names its session cookie `SESS<hash>`, or `SSESS<hash>` over HTTPS.
#[must_use]
pub fn is_session_cookie(name: &str) -> bool {
    name.starts_with("SESS") || name.starts_with("SSESS")
}

/// Earliest expiry among session cookies, else among all cookies, else
/// [`DEFAULT_SESSION_LIFETIME`] from `now`.
#[must_use]
pub fn derive_session_expiry(cookies: &[CookieExpiry], now: OffsetDateTime) -> OffsetDateTime {
    let earliest = |session_only: bool| {
        cookies
            .iter()
            .filter(|c| !session_only || is_session_cookie(&c.name))
            .filter_map(|c| c.expires_at)
            .min()
    };

    earliest(true)
        .or_else(|| earliest(false))
        .unwrap_or(now + DEFAULT_SESSION_LIFETIME)
}
