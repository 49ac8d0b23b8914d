//! Built-in subsystem pricing models.
//!
//! One estimator per [`crate::record::Subsystem`] slot. The wifi and
//! bluetooth models are tagged choices between a hardware-reported variant
//! and a timer-based modeled variant, picked per cycle by capability
//! checks (see [`crate::estimator::EstimatorSet::resolve`]).

mod bluetooth;
mod camera;
mod cpu;
mod flashlight;
mod mobile_radio;
mod sensor;
mod wakelock;
mod wifi;

pub use bluetooth::BluetoothEstimator;
pub use camera::CameraEstimator;
pub use cpu::CpuEstimator;
pub use flashlight::FlashlightEstimator;
pub use mobile_radio::MobileRadioEstimator;
pub use sensor::SensorEstimator;
pub use wakelock::WakelockEstimator;
pub use wifi::WifiEstimator;
