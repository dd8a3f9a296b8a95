//! # Extranet Service - ExpirySweepApi Implementation

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::ExtranetService;
use crate::adapters::sqlite::{files, users};
use crate::domain::entities::SweepReport;
use crate::domain::errors::ExtranetResult;
use crate::domain::mail;
use crate::ports::inbound::ExpirySweepApi;

impl ExpirySweepApi for ExtranetService {
    fn sweep_expired(&self, now: DateTime<Utc>) -> ExtranetResult<SweepReport> {
        let expired = self.db.transaction(|tx| {
            let due = files::due_for_expiry(tx, now)?;
            files::flag_due(tx, now)?;
            Ok(due)
        })?;

        if expired.is_empty() {
            debug!("no document expired");
            return Ok(SweepReport::default());
        }

        let admins = self.db.read(users::admin_emails)?;
        if admins.is_empty() {
            warn!(expired = expired.len(), "documents expired but no administrator to notify");
            return Ok(SweepReport {
                expired,
                notified: 0,
            });
        }

        let notice = mail::expired_files(&self.config.expiry_notice_to, &admins, &expired);
        let notified = match self.mailer.send(&notice) {
            Ok(()) => admins.len(),
            Err(err) => {
                error!(expired = expired.len(), error = %err, "expiry notice not delivered");
                0
            }
        };

        info!(expired = expired.len(), notified, "expiry sweep done");
        Ok(SweepReport { expired, notified })
    }
}
