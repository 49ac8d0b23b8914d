//! CPU pricing: per-speed-step active time against the profile's per-step
//! draw table.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::UidUsage;
use crate::window::CycleWindow;

pub struct CpuEstimator {
    profile: Arc<PowerProfile>,
}

impl CpuEstimator {
    pub fn new(profile: Arc<PowerProfile>) -> Self {
        CpuEstimator { profile }
    }
}

impl PowerEstimator for CpuEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Cpu
    }

    fn reset(&mut self) {}

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        let steps = usage.cpu_step_times_us.len();
        let priced = self.profile.cpu_step_count();
        // A profile with no step table prices cpu at zero (unsupported); a
        // profile whose table is shorter than the snapshot's step data is a
        // real mismatch the model cannot recover from.
        if priced > 0 && steps > priced {
            return Err(EstimatorError::CpuStepMismatch {
                snapshot_steps: steps,
                profile_steps: priced,
            });
        }

        let mut power = 0.0;
        let mut time_ms = 0;
        for (step, t) in usage.cpu_step_times_us.iter().enumerate() {
            let step_ms = us_to_ms(t.since(window.period));
            power += mah_from_ma_ms(self.profile.cpu_step_ma(step), step_ms);
            time_ms += step_ms;
        }

        // Counters occasionally report more foreground time than run time;
        // trust the larger figure for the attributable duration.
        let fg_ms = us_to_ms(usage.cpu_foreground_time_us.since(window.period));
        if fg_ms > time_ms {
            time_ms = fg_ms;
        }

        Ok(Contribution::new(sanitize_power(Subsystem::Cpu, power), time_ms))
    }

    fn estimate_remainder(
        &mut self,
        _window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        Ok(Contribution::zero())
    }
}
