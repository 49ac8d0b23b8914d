//! # drainledger-core
//!
//! **Every milliamp-hour gets an owner.**
//!
//! `drainledger-core` turns a raw usage snapshot — per-app CPU steps,
//! radio controller timers, wakelocks, sensor dwell — into a ranked ledger
//! of battery drain, then squares the modeled total against the measured
//! discharge so the model can never quietly drift from the hardware.
//!
//! ## Quick Start
//!
//! ```
//! use drainledger_core::{
//!     AccountingPeriod, DrainEngine, PowerProfile, RefreshRequest, StaticProvider,
//!     UsageSnapshot,
//! };
//!
//! let profile = PowerProfile::reference();
//! let provider = StaticProvider::new(UsageSnapshot::default());
//! let mut engine = DrainEngine::new(profile, provider);
//!
//! let request = RefreshRequest::new(AccountingPeriod::SinceCharged);
//! let ledger = engine.refresh(&request)?;
//! println!(
//!     "{} records account for {} mAh",
//!     ledger.consumers.len(),
//!     ledger.total_power_mah
//! );
//! # Ok::<(), drainledger_core::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! Snapshot → Window → Estimators → Partition → Synthesis → Reconcile → Ledger
//!
//! A [`SnapshotProvider`] hands the engine one immutable [`UsageSnapshot`]
//! per refresh. The engine scopes its counters to an [`AccountingPeriod`],
//! prices each consumer through the eight [`PowerEstimator`] slots, buckets
//! the results, synthesizes category rollups (screen, idle, phone, wifi,
//! bluetooth, cell, per-user), and finally reconciles the ranked list
//! against the discharge envelope, inserting `unaccounted` or `overcounted`
//! correction records where the model and the battery disagree.
//!
//! Estimators are pluggable: anything implementing [`PowerEstimator`] can
//! fill a slot, and the built-ins under [`estimators`] show the expected
//! shape. Coefficients come from a [`PowerProfile`], a per-device table the
//! engine treats as opaque data.

pub mod aggregate;
pub mod engine;
pub mod estimator;
pub mod estimators;
pub mod ledger;
pub mod partition;
pub mod profile;
pub mod provider;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod uid;
pub mod window;

pub use engine::{DrainEngine, EngineConfig, EngineError, EngineState, RefreshRequest};
pub use estimator::{EstimatorError, EstimatorSet, PowerEstimator};
pub use estimators::{
    BluetoothEstimator, CameraEstimator, CpuEstimator, FlashlightEstimator, MobileRadioEstimator,
    SensorEstimator, WakelockEstimator, WifiEstimator,
};
pub use ledger::{Ledger, format_mah};
pub use partition::Partition;
pub use profile::{PowerProfile, ProfileError};
pub use provider::{CachedProvider, JsonFileProvider, SnapshotProvider, StaticProvider};
pub use reconcile::{Reconciliation, reconcile, sort_descending};
pub use record::{Contribution, DrainKind, DrainRecord, Subsystem};
pub use snapshot::{
    AccountingPeriod, ControllerActivity, GPS_SENSOR_HANDLE, NUM_BRIGHTNESS_BINS,
    NUM_SIGNAL_STRENGTH_BINS, Scoped, SensorUsage, UidUsage, UsageSnapshot,
};
pub use uid::{Uid, UserFilter, UserId};
pub use window::{ClockAnchors, ControllerWindow, CycleWindow};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
