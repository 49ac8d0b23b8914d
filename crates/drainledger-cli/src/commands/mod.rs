pub mod profile;
pub mod report;
pub mod serve;
pub mod signaling;

use std::collections::BTreeSet;
use std::path::Path;

use drainledger_core::{AccountingPeriod, DrainKind, DrainRecord, PowerProfile, UserFilter, UserId};

/// Load a power profile document, or fall back to the built-in reference
/// table when no path is given. A path that fails to load is fatal.
pub fn load_profile(path: Option<&str>) -> PowerProfile {
    match path {
        Some(p) => match PowerProfile::load(Path::new(p)) {
            Ok(profile) => profile,
            Err(err) => {
                eprintln!("Failed to load power profile {p}: {err}");
                std::process::exit(1);
            }
        },
        None => PowerProfile::reference(),
    }
}

/// Parse an accounting period string into the enum.
pub fn parse_period(s: &str) -> AccountingPeriod {
    match s.parse() {
        Ok(period) => period,
        Err(_) => {
            eprintln!("Unknown accounting period '{s}', using charged");
            AccountingPeriod::SinceCharged
        }
    }
}

/// Build the user scope from the repeated `--user` flags and `--all-users`.
/// No flags means the primary user only.
pub fn user_filter(users: &[u32], all_users: bool) -> UserFilter {
    if all_users {
        UserFilter::All
    } else if users.is_empty() {
        UserFilter::default()
    } else {
        UserFilter::Only(users.iter().map(|u| UserId(*u)).collect::<BTreeSet<_>>())
    }
}

/// Human name for a ledger entry: label if the snapshot carried one, the
/// raw identity for unlabeled apps, the user for rollups, otherwise the
/// category name.
pub fn consumer_name(record: &DrainRecord) -> String {
    if let Some(label) = &record.label {
        return label.clone();
    }
    match (record.kind, record.uid, record.user) {
        (DrainKind::App, Some(uid), _) => format!("uid {uid}"),
        (DrainKind::User, _, Some(user)) => format!("user {user}"),
        (kind, _, _) => kind.to_string(),
    }
}

/// Render a µs duration as adaptive h/m/s.
pub fn format_duration(us: u64) -> String {
    let total_secs = us / 1_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}
