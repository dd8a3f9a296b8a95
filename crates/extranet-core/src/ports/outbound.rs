//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the extranet service needs from its host.
//!
//! Production adapters live in `crate::adapters`; the small in-memory
//! implementations at the bottom of this file back tests and local runs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::domain::errors::ExtranetResult;
use crate::domain::mail::OutgoingMail;

/// Directory tree holding document bytes.
///
/// Layout: `<root>/<syndicat>/<category>/<file>` with archived files under
/// `<root>/<syndicat>/<category>/archive/<file>`. Callers validate every
/// segment before it reaches the store.
pub trait DocumentStore: Send + Sync {
    /// Creates the category folder and its `archive/` sibling.
    fn create_category_dirs(&self, syndicat: &str, category: &str) -> ExtranetResult<()>;

    /// Names of the live documents of a category, sorted. `None` when the
    /// category folder does not exist.
    fn list_documents(&self, syndicat: &str, category: &str)
        -> ExtranetResult<Option<Vec<String>>>;

    /// Bytes of a live document, `None` when absent.
    fn read_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
    ) -> ExtranetResult<Option<Vec<u8>>>;

    /// Writes (or overwrites) a live document.
    fn write_document(
        &self,
        syndicat: &str,
        category: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> ExtranetResult<()>;

    /// Removes a live document. Missing files are not an error.
    fn remove_document(&self, syndicat: &str, category: &str, file_name: &str)
        -> ExtranetResult<()>;

    /// Moves a live document into `archive/`. Returns `false` when there was
    /// nothing to move.
    fn archive_document(&self, syndicat: &str, category: &str, file_name: &str)
        -> ExtranetResult<bool>;

    /// Moves an archived document back to the live folder.
    fn restore_document(&self, syndicat: &str, category: &str, file_name: &str)
        -> ExtranetResult<()>;

    /// Keeps a copy of an imported account sheet.
    fn store_account_sheet(&self, sheet_name: &str, bytes: &[u8]) -> ExtranetResult<()>;
}

/// Delivers outgoing mail.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> ExtranetResult<()>;
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> ExtranetResult<String>;

    fn verify(&self, password: &str, hash: &str) -> ExtranetResult<bool>;
}

/// Wall clock (for testability).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// DEFAULT AND IN-MEMORY IMPLEMENTATIONS
// =============================================================================

/// System time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a chosen instant; tests move it by hand.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Mailer that keeps every message in memory.
#[derive(Debug, Clone, Default)]
pub struct OutboxMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, mail: &OutgoingMail) -> ExtranetResult<()> {
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_moves_by_hand() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let shared = clock.clone();

        clock.advance(Duration::hours(3));
        assert_eq!(shared.now(), start + Duration::hours(3));
    }

    #[test]
    fn test_outbox_records_messages() {
        let outbox = OutboxMailer::new();
        let mail = OutgoingMail {
            to: vec!["a@x.fr".into()],
            bcc: vec![],
            subject: "s".into(),
            html: "<p>h</p>".into(),
        };
        outbox.send(&mail).unwrap();
        assert_eq!(outbox.sent(), vec![mail]);
        outbox.clear();
        assert!(outbox.sent().is_empty());
    }
}
