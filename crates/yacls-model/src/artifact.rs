//! Snapshot document types.
//!
//! An [`Artifact`] is one snapshot of one platform. It is created by a
//! single ingester run, normalized by [`crate::finalize`], and then treated
//! as immutable for serialization and diffing.
//!
//! Field order in these structs is the key order of the rendered document.
//! Empty fields are omitted so that snapshots stay small and diff-able.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of [`Source::source_date`] (`YYYY-MM-DD`)
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Membership token for a principal bound to a role without a group in between
pub const DIRECT: &str = "DIRECT";

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One snapshot of one platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub metadata: Source,

    #[serde(skip_serializing_if = "is_zero")]
    pub users_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<FirewallRuleMeta>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<FirewallRuleMeta>,

    #[serde(skip_serializing_if = "is_zero")]
    pub bots_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bots: Vec<User>,

    #[serde(skip_serializing_if = "is_zero")]
    pub groups_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,

    #[serde(skip_serializing_if = "is_zero")]
    pub orgs_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<Group>,

    /// Derived: lowercased role label → accounts holding it
    #[serde(skip_serializing_if = "is_zero")]
    pub roles_total: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Derived: permission label → accounts holding it directly or via a group
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_permission: BTreeMap<String, Vec<String>>,

    #[serde(skip_serializing_if = "Permissions::is_empty")]
    pub permissions: Permissions,

    /// Account short-name → comma-joined groups, or [`DIRECT`]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub memberships: BTreeMap<String, String>,
}

impl Artifact {
    /// Start an empty artifact for the given provenance header
    pub fn new(metadata: Source) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Kind of the platform this snapshot describes
    pub fn kind(&self) -> &str {
        &self.metadata.kind
    }

    /// Every principal in `users` followed by every principal in `bots`
    pub fn principals(&self) -> impl Iterator<Item = &User> {
        self.users.iter().chain(self.bots.iter())
    }
}

/// Keyed views used by cloud IAM snapshots, where principals are
/// identified by short-name rather than listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    #[serde(skip_serializing_if = "is_zero")]
    pub users_total: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, User>,

    #[serde(skip_serializing_if = "is_zero")]
    pub service_accounts_total: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub service_accounts: BTreeMap<String, User>,

    #[serde(skip_serializing_if = "is_zero")]
    pub groups_total: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Group>,
}

impl Permissions {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.service_accounts.is_empty() && self.groups.is_empty()
    }
}

/// Provenance header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Stable ingester identifier
    pub kind: String,
    /// Human title
    pub name: String,
    /// Optional scope, e.g. a GCP project
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Date the input was produced (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_date: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    /// Operator instructions with placeholders already substituted
    pub process: Vec<String>,
}

/// A human or machine principal within one platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Membership>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub org: String,
    #[serde(skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub two_factor_disabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sso: String,
}

impl User {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Default::default()
        }
    }
}

/// A set of principals sharing a permission set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A principal's view of one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Membership {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Role within the group (OWNER, ADMIN); plain membership is empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Permissions inherited through this group and not already held
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

/// A firewall rule plus the metadata used for ordering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallRuleMeta {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub logging: bool,
    /// Lower wins; 0 is the highest priority and is always written
    pub priority: u32,
    pub rule: FirewallRule,
}

/// Targets of a firewall rule; lists are comma-joined in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallRule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub allow: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deny: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sources: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub destinations: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_tags: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_tags: String,
}
