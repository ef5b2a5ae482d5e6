//! Policy configuration for the booking core.

use crate::pricing::PricingPolicy;
use crate::schedule::OperatingHours;
use serde::{Deserialize, Serialize};

/// Deployment policy knobs consumed by the lifecycle manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Duration rounding for room cost
    pub pricing: PricingPolicy,
    /// Default operating window for availability queries
    pub operating_hours: OperatingHours,
}
