//! Snapshot diff engine
//!
//! Compares two finalized artifacts of the same kind and produces a flat,
//! ordered list of changes. Absence is itself a change, so the engine
//! never fails; comparing an artifact with itself yields no changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, User};

/// One difference between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: String,
    /// Snapshot scope; the kind when the snapshot has no id
    pub id: String,
    /// Account or group the change applies to
    pub entity: String,
    #[serde(rename = "mod")]
    pub modification: String,
    pub from_date: String,
    pub to_date: String,
}

struct Recorder<'a> {
    kind: &'a str,
    id: &'a str,
    from_date: &'a str,
    to_date: &'a str,
    changes: Vec<Change>,
}

impl Recorder<'_> {
    fn push(&mut self, entity: &str, modification: String) {
        self.changes.push(Change {
            kind: self.kind.to_string(),
            id: self.id.to_string(),
            entity: entity.to_string(),
            modification,
            from_date: self.from_date.to_string(),
            to_date: self.to_date.to_string(),
        });
    }
}

/// Summarize what changed between `from` and `to`.
pub fn summary(from: &Artifact, to: &Artifact) -> Vec<Change> {
    let kind = to.metadata.kind.as_str();
    let id = if to.metadata.id.is_empty() {
        kind
    } else {
        to.metadata.id.as_str()
    };
    let mut rec = Recorder {
        kind,
        id,
        from_date: &from.metadata.source_date,
        to_date: &to.metadata.source_date,
        changes: Vec::new(),
    };

    diff_principals(&mut rec, &listed(from), &listed(to));
    diff_principals(&mut rec, &keyed(from), &keyed(to));

    let from_members = group_members(from);
    let to_members = group_members(to);
    for (group, member) in from_members.difference(&to_members) {
        rec.push(member, format!("left group: {group}"));
    }
    for (group, member) in to_members.difference(&from_members) {
        rec.push(member, format!("joined group: {group}"));
    }

    let from_perms = group_permissions(from);
    let to_perms = group_permissions(to);
    for (group, p) in from_perms.difference(&to_perms) {
        rec.push(group, format!("lost permission: {p}"));
    }
    for (group, p) in to_perms.difference(&from_perms) {
        rec.push(group, format!("gained permission: {p}"));
    }

    rec.changes
}

/// Principals listed in `users`, in document order
fn listed(a: &Artifact) -> Vec<(&str, &User)> {
    a.users.iter().map(|u| (u.account.as_str(), u)).collect()
}

/// Principals keyed by short-name under `permissions`
fn keyed(a: &Artifact) -> Vec<(&str, &User)> {
    a.permissions
        .users
        .iter()
        .chain(a.permissions.service_accounts.iter())
        .map(|(k, u)| (k.as_str(), u))
        .collect()
}

fn diff_principals(rec: &mut Recorder<'_>, from: &[(&str, &User)], to: &[(&str, &User)]) {
    let from_by_key: BTreeMap<&str, &User> = from.iter().copied().collect();
    let to_by_key: BTreeMap<&str, &User> = to.iter().copied().collect();

    for (key, _) in to {
        if !from_by_key.contains_key(key) {
            rec.push(key, "add user".to_string());
        }
    }

    for (key, fu) in from {
        let Some(tu) = to_by_key.get(key) else {
            rec.push(key, "remove user".to_string());
            continue;
        };

        if fu.status != tu.status {
            let m = if fu.status.is_empty() {
                format!("new status: {}", tu.status)
            } else {
                format!("status change: {:?} to {:?}", fu.status, tu.status)
            };
            rec.push(key, m);
        }
        if fu.role != tu.role {
            rec.push(key, format!("role change: {:?} to {:?}", fu.role, tu.role));
        }

        for r in &fu.roles {
            if !tu.roles.contains(r) {
                rec.push(key, format!("remove role: {r}"));
            }
        }
        for r in &tu.roles {
            if !fu.roles.contains(r) {
                rec.push(key, format!("add role: {r}"));
            }
        }

        for p in &fu.permissions {
            if !tu.permissions.contains(p) {
                rec.push(key, format!("remove permission: {p}"));
            }
        }
        for p in &tu.permissions {
            if !fu.permissions.contains(p) {
                rec.push(key, format!("add permission: {p}"));
            }
        }
    }
}

/// (group, member) pairs, from group member lists and principal memberships
fn group_members(a: &Artifact) -> BTreeSet<(&str, &str)> {
    let mut pairs = BTreeSet::new();
    for g in &a.groups {
        for m in &g.members {
            pairs.insert((g.name.as_str(), m.as_str()));
        }
    }
    for (key, g) in &a.permissions.groups {
        let name = if g.name.is_empty() { key } else { &g.name };
        for m in &g.members {
            pairs.insert((name.as_str(), m.as_str()));
        }
    }
    for (account, u) in listed(a).into_iter().chain(keyed(a)) {
        for m in &u.groups {
            pairs.insert((m.name.as_str(), account));
        }
    }
    pairs
}

/// (group, permission) pairs; keyed groups contribute their roles
fn group_permissions(a: &Artifact) -> BTreeSet<(&str, &str)> {
    let mut pairs: BTreeSet<(&str, &str)> = a
        .groups
        .iter()
        .flat_map(|g| g.permissions.iter().map(|p| (g.name.as_str(), p.as_str())))
        .collect();
    for (key, g) in &a.permissions.groups {
        let name = if g.name.is_empty() { key } else { &g.name };
        for p in g.permissions.iter().chain(g.roles.iter()) {
            pairs.insert((name.as_str(), p.as_str()));
        }
    }
    pairs
}
