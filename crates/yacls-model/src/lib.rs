//! yacls canonical model
//!
//! Defines the snapshot document shared by every ingester, the
//! normalization pass applied before serialization, and the diff engine
//! that compares two snapshots of the same platform.

pub mod artifact;
pub mod compare;
pub mod finalize;

pub use artifact::{
    Artifact, FirewallRule, FirewallRuleMeta, Group, Membership, Permissions, Source, User,
    DIRECT, SOURCE_DATE_FORMAT,
};
pub use compare::{summary, Change};
pub use finalize::finalize;
