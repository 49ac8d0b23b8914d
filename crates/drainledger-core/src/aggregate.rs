//! Category synthesis: rollups and device-wide records built after the
//! per-application pass.
//!
//! Every function here produces at most one record and applies the same
//! discard rule: a synthesized record with no positive power is not worth
//! a ledger row. The system identity is the one exception, handled by the
//! partitioner's keep rule instead.

use std::collections::BTreeMap;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, us_to_ms};
use crate::partition::Partition;
use crate::profile::PowerProfile;
use crate::record::{DrainKind, DrainRecord, Subsystem};
use crate::snapshot::NUM_BRIGHTNESS_BINS;
use crate::uid::UserId;
use crate::window::CycleWindow;

fn keep(record: DrainRecord) -> Option<DrainRecord> {
    (record.total_power_mah() > 0.0).then_some(record)
}

/// Charge the wakelock time no consumer claimed to the system identity's
/// record. A no-op when the cycle produced no system record.
pub fn absorb_unclaimed_wakelock(
    partition: &mut Partition,
    estimator: &mut dyn PowerEstimator,
    window: &CycleWindow,
) -> Result<(), EstimatorError> {
    let remainder = estimator.estimate_remainder(window)?;
    if remainder.is_zero() {
        return Ok(());
    }
    if let Some(system) = partition.system_record_mut() {
        system.apply(Subsystem::Wakelock, &remainder);
        system.derive_app_usage_time();
    }
    Ok(())
}

/// Derive the signaling-overhead ratio on every application record, then
/// return clones of the qualifying ones ranked worst-first.
///
/// Runs before user rollups so the per-app ratios survive aggregation.
pub fn signaling_records(
    default_list: &mut [DrainRecord],
    by_user: &mut BTreeMap<UserId, Vec<DrainRecord>>,
) -> Vec<DrainRecord> {
    let mut ranked = Vec::new();
    for record in default_list
        .iter_mut()
        .chain(by_user.values_mut().flatten())
    {
        record.compute_mobile_ms_per_packet();
        if record.mobile_ms_per_packet.is_some() {
            ranked.push(record.clone());
        }
    }
    ranked.sort_by(|a, b| {
        b.mobile_ms_per_packet
            .unwrap_or(0.0)
            .total_cmp(&a.mobile_ms_per_packet.unwrap_or(0.0))
    });
    ranked
}

/// Collapse each foreign user's bucket into a single rollup record.
pub fn user_rollups(by_user: &BTreeMap<UserId, Vec<DrainRecord>>) -> Vec<DrainRecord> {
    let mut rollups = Vec::new();
    for (user, records) in by_user {
        let mut rollup = DrainRecord::user_rollup(*user);
        for record in records {
            rollup.absorb(record);
        }
        rollup.compute_mobile_ms_per_packet();
        if let Some(rollup) = keep(rollup) {
            rollups.push(rollup);
        }
    }
    rollups
}

/// Synthesize a subsystem category record: the device-wide remainder plus
/// that subsystem's share of every bucketed service record.
pub fn subsystem_rollup(
    kind: DrainKind,
    subsystem: Subsystem,
    estimator: &mut dyn PowerEstimator,
    bucket: &[DrainRecord],
    window: &CycleWindow,
) -> Result<Option<DrainRecord>, EstimatorError> {
    let remainder = estimator.estimate_remainder(window)?;
    let mut rollup = DrainRecord::category(kind);
    rollup.apply(subsystem, &remainder);
    for member in bucket {
        rollup.fold_subsystem(subsystem, member);
    }
    Ok(keep(rollup))
}

/// Radio dwell while a call is active, priced at the active-call draw.
pub fn phone_record(profile: &PowerProfile, window: &CycleWindow) -> Option<DrainRecord> {
    let time_ms = us_to_ms(window.phone_on_time_us);
    let mut record = DrainRecord::category(DrainKind::Phone);
    record.usage_power_mah = mah_from_ma_ms(profile.radio_active_ma, time_ms);
    record.usage_time_ms = time_ms;
    keep(record)
}

/// Display cost: a base draw for any screen-on time plus the full-brightness
/// draw weighted by the midpoint of each brightness bin.
pub fn screen_record(profile: &PowerProfile, window: &CycleWindow) -> Option<DrainRecord> {
    let on_ms = us_to_ms(window.screen_on_time_us);
    let mut power = mah_from_ma_ms(profile.screen_on_ma, on_ms);
    for (bin, &bin_time_us) in window.screen_brightness_time_us.iter().enumerate() {
        let weight = (bin as f64 + 0.5) / NUM_BRIGHTNESS_BINS as f64;
        power += mah_from_ma_ms(profile.screen_full_ma * weight, us_to_ms(bin_time_us));
    }
    let mut record = DrainRecord::category(DrainKind::Screen);
    record.usage_power_mah = power;
    record.usage_time_ms = on_ms;
    keep(record)
}

/// Baseline awake cost of the screen-off portion of the window. The
/// screen-on duration is subtracted so display dwell is never counted in
/// both records.
pub fn idle_record(profile: &PowerProfile, window: &CycleWindow) -> Option<DrainRecord> {
    let idle_time_us = window
        .type_battery_realtime_us
        .saturating_sub(window.screen_on_time_us);
    let idle_ms = us_to_ms(idle_time_us);
    let mut record = DrainRecord::category(DrainKind::Idle);
    record.usage_power_mah = mah_from_ma_ms(profile.cpu_idle_ma, idle_ms);
    record.usage_time_ms = idle_ms;
    keep(record)
}

/// Cellular radio cost not attributed to any consumer.
pub fn cell_record(
    estimator: &mut dyn PowerEstimator,
    window: &CycleWindow,
) -> Result<Option<DrainRecord>, EstimatorError> {
    let remainder = estimator.estimate_remainder(window)?;
    let mut record = DrainRecord::category(DrainKind::Cell);
    record.apply(Subsystem::MobileRadio, &remainder);
    Ok(keep(record))
}
