//! Flashlight pricing: torch-on time at the flashlight draw constant.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::UidUsage;
use crate::window::CycleWindow;

pub struct FlashlightEstimator {
    profile: Arc<PowerProfile>,
}

impl FlashlightEstimator {
    pub fn new(profile: Arc<PowerProfile>) -> Self {
        FlashlightEstimator { profile }
    }
}

impl PowerEstimator for FlashlightEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Flashlight
    }

    fn reset(&mut self) {}

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        let on_ms = us_to_ms(usage.flashlight_time_us.since(window.period));
        let power = mah_from_ma_ms(self.profile.flashlight_ma, on_ms);
        Ok(Contribution::new(sanitize_power(Subsystem::Flashlight, power), 0))
    }

    fn estimate_remainder(
        &mut self,
        _window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        Ok(Contribution::zero())
    }
}
