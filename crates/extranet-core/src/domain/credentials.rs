//! Generated passwords and reset tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::entities::UserId;
use crate::domain::errors::{ExtranetError, ExtranetResult};

const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%&*?";

/// Length of passwords generated for imported accounts.
pub const GENERATED_PASSWORD_LEN: usize = 20;

/// Random password with at least one lowercase, uppercase, digit and symbol.
pub fn generate_password(len: usize) -> String {
    let len = len.max(4);
    let mut rng = rand::thread_rng();
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    let all: Vec<u8> = classes.concat();
    while chars.len() < len {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// Short digest of a password hash. Embedded in reset tokens so a token
/// stops working as soon as the password it was issued against changes.
pub fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    hex::encode(&digest[..8])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResetClaims {
    sub: UserId,
    fpr: String,
    iat: i64,
    exp: i64,
}

/// A reset token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReset {
    pub user_id: UserId,
    pub fingerprint: String,
}

/// Signs and checks password-reset tokens (HS256).
#[derive(Clone)]
pub struct ResetTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ResetTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user_id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> ExtranetResult<String> {
        let claims = ResetClaims {
            sub: user_id,
            fpr: password_fingerprint(password_hash),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry against `now`. The fingerprint still has to
    /// be compared with the stored password hash by the caller.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> ExtranetResult<VerifiedReset> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the service clock below.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<ResetClaims>(token, &self.decoding, &validation)?;
        if data.claims.exp <= now.timestamp() {
            return Err(ExtranetError::unauthorized(
                crate::domain::errors::messages::LINK_EXPIRED,
            ));
        }

        Ok(VerifiedReset {
            user_id: data.claims.sub,
            fingerprint: data.claims.fpr,
        })
    }
}
