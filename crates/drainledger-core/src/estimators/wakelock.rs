//! Wakelock pricing: partial wakelock hold time at the cpu-awake draw.
//!
//! Accumulates every consumer's attributed hold time so the remainder can
//! hand the still-unexplained awake time to the system record: awake time
//! not covered by any wakelock or by the screen being on is supervisory
//! kernel overhead, and it has to be attributed somewhere.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::UidUsage;
use crate::window::CycleWindow;

pub struct WakelockEstimator {
    profile: Arc<PowerProfile>,
    total_app_wakelock_ms: u64,
}

impl WakelockEstimator {
    pub fn new(profile: Arc<PowerProfile>) -> Self {
        WakelockEstimator { profile, total_app_wakelock_ms: 0 }
    }
}

impl PowerEstimator for WakelockEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Wakelock
    }

    fn reset(&mut self) {
        self.total_app_wakelock_ms = 0;
    }

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        let held_ms = us_to_ms(usage.wakelock_partial_time_us.since(window.period));
        self.total_app_wakelock_ms += held_ms;
        let power = mah_from_ma_ms(self.profile.cpu_awake_ma, held_ms);
        Ok(Contribution::new(sanitize_power(Subsystem::Wakelock, power), held_ms))
    }

    fn estimate_remainder(&mut self, window: &CycleWindow) -> Result<Contribution, EstimatorError> {
        let awake_ms = us_to_ms(window.type_battery_uptime_us);
        let explained_ms = us_to_ms(window.screen_on_time_us) + self.total_app_wakelock_ms;
        let remainder_ms = awake_ms.saturating_sub(explained_ms);
        if remainder_ms == 0 {
            return Ok(Contribution::zero());
        }
        let power = mah_from_ma_ms(self.profile.cpu_awake_ma, remainder_ms);
        Ok(Contribution::new(sanitize_power(Subsystem::Wakelock, power), remainder_ms))
    }
}
