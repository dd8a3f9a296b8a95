//! Signed session cookies.
//!
//! The cookie carries `<session id>.<hex HMAC-SHA256(secret, id)>`. A value
//! whose signature does not verify is treated as no cookie at all.

use axum::http::{header, HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "extranet.sid";

/// Signs session ids and renders the `Set-Cookie` header
#[derive(Clone)]
pub struct CookieSigner {
    secret: Arc<[u8]>,
    ttl: Duration,
    secure: bool,
}

impl CookieSigner {
    pub fn new(secret: &[u8], ttl: Duration, secure: bool) -> Self {
        Self {
            secret: Arc::from(secret),
            ttl,
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    /// `<id>.<signature>`
    pub fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        format!("{}.{}", session_id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Session id of a signed value, if the signature holds
    pub fn verify(&self, value: &str) -> Option<String> {
        let (session_id, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(session_id.to_string())
    }

    /// Verified session id from the request's `Cookie` headers
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| self.verify(value))
    }

    /// `Set-Cookie` value opening a session
    pub fn set_cookie(&self, session_id: &str) -> HeaderValue {
        self.render(&self.sign(session_id), self.ttl.as_secs())
    }

    /// `Set-Cookie` value expiring the session cookie
    pub fn clear_cookie(&self) -> HeaderValue {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> HeaderValue {
        let mut cookie =
            format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        // Ids are UUIDs and signatures hex, so the value is always visible ASCII.
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
