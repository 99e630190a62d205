//! Guarded composite load backing the portfolio dashboard.
//!
//! Multiple panels used to fire this aggregate independently on mount; the
//! shared guard key means redesigned consumers declare what they need and
//! the client decides when a fetch actually runs.

use crate::domain::{DashboardView, EpochRecord};
use crate::error::WalletError;
use crate::guard::GuardOutcome;
use crate::ports::{ClockPort, WalletTransport};
use crate::session::WalletClient;

/// Shared guard key: one per query shape, not per consumer.
pub const DASHBOARD_GUARD_KEY: &str = "portfolio-dashboard";

impl<T: WalletTransport, C: ClockPort> WalletClient<T, C> {
    /// Load the user's properties (with fractionalization attached) and the
    /// recent epoch window, under the dashboard guard. Overlapping or
    /// too-frequent calls are skipped, not queued.
    pub fn load_dashboard(
        &self,
        user: &str,
    ) -> Result<GuardOutcome<DashboardView>, WalletError> {
        let now = self.clock.now_ms();
        self.guard.run(
            DASHBOARD_GUARD_KEY,
            self.policy.dashboard_min_interval_ms,
            now,
            || self.collect_dashboard(user),
        )
    }

    /// Run an arbitrary load under a caller-chosen guard key.
    pub fn guarded_load<V>(
        &self,
        key: &str,
        min_interval_ms: u64,
        load: impl FnOnce() -> Result<V, WalletError>,
    ) -> Result<GuardOutcome<V>, WalletError> {
        let now = self.clock.now_ms();
        self.guard.run(key, min_interval_ms, now, load)
    }

    fn collect_dashboard(&self, user: &str) -> Result<DashboardView, WalletError> {
        let scan = self.title().user_properties(user);
        let mut view = DashboardView {
            properties: scan.properties,
            epochs: Vec::new(),
            warnings: scan.warnings,
        };

        let fractionalizer = self.fractionalizer();
        for record in &mut view.properties {
            if fractionalizer.is_fractionalized(record.token_id) {
                record.fractionalization = fractionalizer.fractionalization_data(record.token_id);
            }
        }

        let rent_pool = self.rent_pool();
        for epoch_id in 1..=self.policy.dashboard_epoch_window {
            view.epochs.push(EpochRecord {
                epoch_id,
                total_deposits: rent_pool.epoch_total_deposits(epoch_id),
                is_claimed: rent_pool.is_claimed(epoch_id, user),
            });
        }
        Ok(view)
    }
}
