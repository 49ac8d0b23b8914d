//! Consumer identity model.
//!
//! Identities follow the convention of the usage snapshots this engine
//! consumes: a flat u32 space partitioned into per-user ranges, with a
//! handful of well-known service identities below the application range.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Width of one user's identity range.
pub const PER_USER_RANGE: u32 = 100_000;

/// First app-id within a user range that belongs to an installed
/// application; everything below is a system or shared service identity.
pub const FIRST_APPLICATION_APP_ID: u32 = 10_000;

/// Owning identity of a tracked consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl Uid {
    /// The privileged system identity. Always kept by the partitioner and
    /// the target of supervisory wakelock remainder absorption.
    pub const SYSTEM: Uid = Uid(0);

    /// Identity of the wifi control process.
    pub const WIFI: Uid = Uid(1010);

    /// Identity of the short-range-radio (bluetooth) service.
    pub const BLUETOOTH: Uid = Uid(1002);

    /// The user this identity belongs to.
    pub fn user_id(self) -> UserId {
        UserId(self.0 / PER_USER_RANGE)
    }

    /// The identity with the user range stripped.
    pub fn app_id(self) -> u32 {
        self.0 % PER_USER_RANGE
    }

    /// Whether this identity belongs to an installed application, as
    /// opposed to a system or shared service.
    pub fn is_application(self) -> bool {
        self.app_id() >= FIRST_APPLICATION_APP_ID
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user on the device, identified by range position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// Caller-supplied user scope for a refresh.
///
/// `All` is the wildcard: user bucketing is disabled and every application
/// record stays in the default list. `Only` keeps the named users' apps in
/// the default list and groups every other user's apps into per-user
/// rollups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Only(BTreeSet<UserId>),
}

impl UserFilter {
    /// Filter for a single user, the common case.
    pub fn single(user: UserId) -> Self {
        UserFilter::Only(BTreeSet::from([user]))
    }

    /// Whether `user`'s applications stay in the default list.
    pub fn includes(&self, user: UserId) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Only(users) => users.contains(&user),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, UserFilter::All)
    }
}

impl Default for UserFilter {
    fn default() -> Self {
        UserFilter::single(UserId(0))
    }
}
