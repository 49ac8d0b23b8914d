//! Sensor pricing: per-sensor dwell against the profile's sensor map.
//! GPS is a reserved handle with its own constant. Sensors are fully
//! attributable, so there is no remainder.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::{GPS_SENSOR_HANDLE, UidUsage};
use crate::window::CycleWindow;

pub struct SensorEstimator {
    profile: Arc<PowerProfile>,
}

impl SensorEstimator {
    pub fn new(profile: Arc<PowerProfile>) -> Self {
        SensorEstimator { profile }
    }
}

impl PowerEstimator for SensorEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Sensors
    }

    fn reset(&mut self) {}

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        let mut power = 0.0;
        for sensor in &usage.sensors {
            let on_ms = us_to_ms(sensor.time_us.since(window.period));
            let ma = if sensor.handle == GPS_SENSOR_HANDLE {
                self.profile.gps_on_ma
            } else {
                self.profile.sensor_ma(sensor.handle)
            };
            power += mah_from_ma_ms(ma, on_ms);
        }
        Ok(Contribution::new(sanitize_power(Subsystem::Sensors, power), 0))
    }

    fn estimate_remainder(
        &mut self,
        _window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        Ok(Contribution::zero())
    }
}
