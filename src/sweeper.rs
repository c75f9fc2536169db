// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expiry Sweeper
//!
//! Background task that deletes session rows and reset secrets whose
//! `expires_at` has passed. Expired rows are already inert (tokens carry
//! their own expiry, and redemption checks `expires_at`); the sweep keeps
//! the tables from accumulating them.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; cancelling the token stops
//! the loop between sweeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{AuthDatabase, PurgeReport, StorageResult};

pub struct ExpirySweeper {
    db: Arc<AuthDatabase>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(db: Arc<AuthDatabase>, interval: Duration) -> Self {
        Self { db, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry sweeper shutting down");
                return;
            }

            if let Err(e) = self.sweep_once() {
                warn!(error = %e, "Expiry sweep failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// One pass over both tables.
    pub fn sweep_once(&self) -> StorageResult<PurgeReport> {
        let report = self.db.purge_expired(Utc::now())?;
        if report.sessions > 0 || report.reset_secrets > 0 {
            info!(
                sessions = report.sessions,
                reset_secrets = report.reset_secrets,
                "Expired records purged"
            );
        } else {
            debug!("Expiry sweep found nothing to purge");
        }
        Ok(report)
    }
}
