//! Batch appointment submission.
//!
//! A cart of patients is submitted as a set of independent creations; each item's
//! failure is isolated and tallied. There are no all-or-nothing semantics.

use serde::Serialize;

use crate::appointment::{AppointmentService, NewAppointment};
use crate::session::Identity;
use crate::ReferResult;

/// Success/failure tally of a batch submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub success: usize,
    pub failed: usize,
}

impl BatchOutcome {
    /// Whether the submitting UI should clear its cart.
    ///
    /// The cart clears whenever at least one item succeeded — which discards the
    /// failed items too. That matches the deployed behaviour exactly and looks
    /// like it may be unintended; flagged for product-owner confirmation rather
    /// than changed here.
    pub fn clears_cart(&self) -> bool {
        self.success > 0
    }
}

impl AppointmentService {
    /// Create a batch of appointments, isolating and counting per-item failures.
    pub fn submit_batch(
        &self,
        identity: &Identity,
        items: Vec<NewAppointment>,
    ) -> ReferResult<BatchOutcome> {
        identity.require_record_manager()?;

        let mut outcome = BatchOutcome::default();
        for item in items {
            match self.create(identity, item) {
                Ok(_) => outcome.success += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "batch appointment item failed");
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}
