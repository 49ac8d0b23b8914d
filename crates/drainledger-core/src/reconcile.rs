//! Reconciliation: rank the ledger and square the modeled total against
//! the measured discharge envelope.
//!
//! The envelope is authoritative. When the model underestimates, the gap
//! becomes a synthetic `unaccounted` record and the published total snaps
//! to the envelope floor; when it overestimates, the excess becomes an
//! `overcounted` record and the modeled total stands. Neither correction
//! ever changes an existing record.

use log::debug;

use crate::record::{DrainKind, DrainRecord};
use crate::window::CycleWindow;

/// Gap below which the model and the envelope floor are considered to
/// agree, absorbing float noise from the summation.
pub(crate) const GAP_EPSILON_MAH: f64 = 1e-6;

/// Scalars published alongside the ranked ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reconciliation {
    /// Sum of all modeled records, corrections excluded.
    pub computed_power_mah: f64,
    /// The headline figure: envelope floor when unaccounted, modeled sum
    /// otherwise.
    pub total_power_mah: f64,
    /// Largest ranked entry including corrections.
    pub max_power_mah: f64,
    /// Largest modeled entry, corrections excluded.
    pub max_real_power_mah: f64,
}

/// Stable descending order by total power; equal totals keep their
/// synthesis order.
pub fn sort_descending(records: &mut [DrainRecord]) {
    records.sort_by(|a, b| b.total_power_mah().total_cmp(&a.total_power_mah()));
}

/// Rank `records` and reconcile them against the window's discharge
/// envelope. Corrections are only attempted when the cycle drained enough
/// charge for the coarse discharge counters to carry signal.
pub fn reconcile(
    records: &mut Vec<DrainRecord>,
    window: &CycleWindow,
    min_discharge_pct: u32,
) -> Reconciliation {
    sort_descending(records);

    let computed: f64 = records.iter().map(|r| r.total_power_mah()).sum();
    let max_real = records.first().map(|r| r.total_power_mah()).unwrap_or(0.0);
    let mut total = computed;

    if window.discharge_lower_pct >= min_discharge_pct {
        let floor = window.min_drained_mah;
        let ceiling = window.max_drained_mah;
        if floor - computed > GAP_EPSILON_MAH {
            let gap = floor - computed;
            debug!("model under envelope floor by {gap:.3} mAh; adding unaccounted");
            insert_ranked(records, DrainRecord::correction(DrainKind::Unaccounted, gap));
            total = floor;
        } else if ceiling < computed {
            let excess = computed - ceiling;
            debug!("model over envelope ceiling by {excess:.3} mAh; adding overcounted");
            insert_ranked(records, DrainRecord::correction(DrainKind::Overcounted, excess));
        }
    }

    let max_power = records.first().map(|r| r.total_power_mah()).unwrap_or(0.0);
    Reconciliation {
        computed_power_mah: computed,
        total_power_mah: total,
        max_power_mah: max_power,
        max_real_power_mah: max_real,
    }
}

/// Insert into an already-descending list, before the first entry of equal
/// or smaller total.
fn insert_ranked(records: &mut Vec<DrainRecord>, record: DrainRecord) {
    let amount = record.total_power_mah();
    let at = records.partition_point(|r| r.total_power_mah() > amount);
    records.insert(at, record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Contribution, Subsystem};
    use crate::snapshot::AccountingPeriod;
    use crate::uid::Uid;

    fn app(uid: u32, power: f64) -> DrainRecord {
        let mut rec = DrainRecord::app(Uid(uid), None);
        rec.apply(Subsystem::Cpu, &Contribution::new(power, 0));
        rec
    }

    fn window(min_mah: f64, max_mah: f64, lower_pct: u32) -> CycleWindow {
        let mut w = CycleWindow::zero(AccountingPeriod::SinceCharged);
        w.min_drained_mah = min_mah;
        w.max_drained_mah = max_mah;
        w.discharge_lower_pct = lower_pct;
        w
    }

    fn totals(records: &[DrainRecord]) -> Vec<f64> {
        records.iter().map(|r| r.total_power_mah()).collect()
    }

    #[test]
    fn model_inside_envelope_needs_no_correction() {
        let mut records = vec![app(10_001, 5.0)];
        let outcome = reconcile(&mut records, &window(5.0, 6.0, 5), 2);
        assert_eq!(records.len(), 1);
        assert_eq!(outcome.computed_power_mah, 5.0);
        assert_eq!(outcome.total_power_mah, 5.0);
        assert_eq!(outcome.max_power_mah, 5.0);
        assert_eq!(outcome.max_real_power_mah, 5.0);
    }

    #[test]
    fn under_floor_adds_unaccounted_and_snaps_total() {
        let mut records = vec![app(10_001, 5.0)];
        let outcome = reconcile(&mut records, &window(8.0, 9.0, 5), 2);
        assert_eq!(totals(&records), vec![5.0, 3.0]);
        assert_eq!(records[1].kind, DrainKind::Unaccounted);
        assert_eq!(outcome.computed_power_mah, 5.0);
        assert_eq!(outcome.total_power_mah, 8.0);
        assert_eq!(outcome.max_power_mah, 5.0);
        assert_eq!(outcome.max_real_power_mah, 5.0);
    }

    #[test]
    fn over_ceiling_adds_overcounted_and_keeps_total() {
        let mut records = vec![app(10_001, 5.0)];
        let outcome = reconcile(&mut records, &window(1.0, 2.0, 5), 2);
        assert_eq!(totals(&records), vec![5.0, 3.0]);
        assert_eq!(records[1].kind, DrainKind::Overcounted);
        assert_eq!(outcome.total_power_mah, 5.0);
        assert_eq!(outcome.computed_power_mah, 5.0);
    }

    #[test]
    fn shallow_discharge_suppresses_corrections() {
        let mut records = vec![app(10_001, 5.0)];
        let outcome = reconcile(&mut records, &window(20.0, 30.0, 1), 2);
        assert_eq!(records.len(), 1);
        assert_eq!(outcome.total_power_mah, 5.0);
    }

    #[test]
    fn correction_outranking_every_record_becomes_max_power() {
        let mut records = vec![app(10_001, 2.0)];
        let outcome = reconcile(&mut records, &window(10.0, 12.0, 5), 2);
        assert_eq!(totals(&records), vec![8.0, 2.0]);
        assert_eq!(outcome.max_power_mah, 8.0);
        assert_eq!(outcome.max_real_power_mah, 2.0);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut records = vec![app(10_001, 1.0), app(10_002, 3.0), app(10_003, 3.0)];
        reconcile(&mut records, &window(7.0, 8.0, 0), 2);
        assert_eq!(totals(&records), vec![3.0, 3.0, 1.0]);
        assert_eq!(records[0].uid, Some(Uid(10_002)));
        assert_eq!(records[1].uid, Some(Uid(10_003)));
    }

    #[test]
    fn tied_correction_inserts_before_equal_records() {
        let mut records = vec![
            app(10_001, 5.0),
            app(10_002, 3.0),
            app(10_003, 3.0),
            app(10_004, 1.0),
        ];
        // Gap of 3.0 over the 12.0 modeled sum.
        let outcome = reconcile(&mut records, &window(15.0, 16.0, 5), 2);
        assert_eq!(totals(&records), vec![5.0, 3.0, 3.0, 3.0, 1.0]);
        assert_eq!(records[1].kind, DrainKind::Unaccounted);
        assert_eq!(records[2].uid, Some(Uid(10_002)));
        assert_eq!(outcome.total_power_mah, 15.0);
    }

    #[test]
    fn empty_ledger_can_still_gain_a_correction() {
        let mut records = Vec::new();
        let outcome = reconcile(&mut records, &window(4.0, 5.0, 5), 2);
        assert_eq!(totals(&records), vec![4.0]);
        assert_eq!(records[0].kind, DrainKind::Unaccounted);
        assert_eq!(outcome.max_power_mah, 4.0);
        assert_eq!(outcome.max_real_power_mah, 0.0);
        assert_eq!(outcome.computed_power_mah, 0.0);
    }

    #[test]
    fn float_noise_below_epsilon_is_not_a_gap() {
        let mut records = vec![app(10_001, 5.0)];
        let w = window(5.0 + 1e-9, 6.0, 5);
        let outcome = reconcile(&mut records, &w, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(outcome.total_power_mah, 5.0);
    }
}
