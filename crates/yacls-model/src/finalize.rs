//! Snapshot normalization
//!
//! A single deterministic pass applied to every artifact before it is
//! serialized: collections are sorted, derived indices are rebuilt from
//! scratch and counts are recomputed. Running it twice is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::artifact::{Artifact, FirewallRuleMeta, Group, Membership, User};

/// Normalize an artifact in place.
pub fn finalize(a: &mut Artifact) {
    sort_principals(&mut a.users);
    sort_principals(&mut a.bots);

    let bots: BTreeSet<&str> = a.bots.iter().map(|b| b.account.as_str()).collect();
    let before = a.users.len();
    a.users.retain(|u| !bots.contains(u.account.as_str()));
    if a.users.len() != before {
        warn!(
            dropped = before - a.users.len(),
            "accounts listed as both user and bot; keeping the bot entry"
        );
    }

    a.orgs.sort_by(|x, y| x.name.cmp(&y.name));
    sort_rules(&mut a.ingress);
    sort_rules(&mut a.egress);

    for g in a.groups.iter_mut() {
        normalize_group(g);
    }
    a.groups.sort_by(|x, y| x.name.cmp(&y.name));
    for g in a.permissions.groups.values_mut() {
        normalize_group(g);
    }

    link_listed_memberships(a);
    link_keyed_memberships(a);

    a.roles = role_index(a);
    a.by_permission = permission_index(a);

    a.users_total = a.users.len();
    a.bots_total = a.bots.len();
    a.groups_total = a.groups.len();
    a.orgs_total = a.orgs.len();
    a.roles_total = a.roles.len();
    a.permissions.users_total = a.permissions.users.len();
    a.permissions.service_accounts_total = a.permissions.service_accounts.len();
    a.permissions.groups_total = a.permissions.groups.len();
}

fn sort_principals(users: &mut [User]) {
    users.sort_by(|x, y| {
        x.account
            .to_lowercase()
            .cmp(&y.account.to_lowercase())
            .then_with(|| x.account.cmp(&y.account))
    });
}

fn sort_rules(rules: &mut [FirewallRuleMeta]) {
    rules.sort_by(|x, y| x.priority.cmp(&y.priority).then_with(|| x.name.cmp(&y.name)));
}

fn sort_dedup(v: &mut Vec<String>) {
    v.sort();
    v.dedup();
}

fn normalize_group(g: &mut Group) {
    sort_dedup(&mut g.members);
    sort_dedup(&mut g.permissions);
    sort_dedup(&mut g.roles);
}

/// Ensure `u.groups` holds exactly one entry named `group`.
fn ensure_membership(u: &mut User, group: &str) {
    if !u.groups.iter().any(|m| m.name == group) {
        u.groups.push(Membership {
            name: group.to_string(),
            ..Default::default()
        });
    }
}

fn tidy_memberships(u: &mut User) {
    u.groups.sort_by(|x, y| x.name.cmp(&y.name));
    u.groups.dedup_by(|x, y| x.name == y.name);
}

fn link_listed_memberships(a: &mut Artifact) {
    let mut wanted: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for g in &a.groups {
        for m in &g.members {
            wanted.entry(m.as_str()).or_default().push(g.name.as_str());
        }
    }

    for u in a.users.iter_mut().chain(a.bots.iter_mut()) {
        if let Some(groups) = wanted.get(u.account.as_str()) {
            for g in groups {
                ensure_membership(u, g);
            }
        }
        tidy_memberships(u);
    }
}

fn link_keyed_memberships(a: &mut Artifact) {
    let perms = &mut a.permissions;
    for (key, g) in &perms.groups {
        let name = if g.name.is_empty() { key } else { &g.name };
        for m in &g.members {
            let target = match perms.users.get_mut(m) {
                Some(u) => Some(u),
                None => perms.service_accounts.get_mut(m),
            };
            if let Some(u) = target {
                ensure_membership(u, name);
            }
        }
    }

    for u in perms.users.values_mut().chain(perms.service_accounts.values_mut()) {
        tidy_memberships(u);
    }
}

fn role_index(a: &Artifact) -> BTreeMap<String, Vec<String>> {
    let mut roles: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for u in a.principals() {
        if !u.role.is_empty() {
            roles
                .entry(u.role.to_lowercase())
                .or_default()
                .push(u.account.clone());
        }
    }
    for accounts in roles.values_mut() {
        sort_dedup(accounts);
    }
    roles
}

fn permission_index(a: &Artifact) -> BTreeMap<String, Vec<String>> {
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    for u in a.principals() {
        for p in &u.permissions {
            seen.insert((p.as_str(), u.account.as_str()));
        }
    }

    // Inherited permissions
    for g in a.groups.iter().chain(a.permissions.groups.values()) {
        for m in &g.members {
            for p in &g.permissions {
                seen.insert((p.as_str(), m.as_str()));
            }
        }
    }

    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (p, account) in seen {
        index.entry(p.to_string()).or_default().push(account.to_string());
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{FirewallRule, Source};
    use pretty_assertions::assert_eq;

    fn user(account: &str, role: &str) -> User {
        User {
            account: account.to_string(),
            role: role.to_string(),
            ..Default::default()
        }
    }

    fn rule(name: &str, priority: u32) -> FirewallRuleMeta {
        FirewallRuleMeta {
            name: name.to_string(),
            priority,
            rule: FirewallRule::default(),
            ..Default::default()
        }
    }

    fn sample() -> Artifact {
        let mut a = Artifact::new(Source {
            kind: "test".to_string(),
            ..Default::default()
        });
        a.users = vec![
            user("carol", "Admin"),
            user("Bob", "member"),
            user("alice", "admin"),
            user("hubot", ""),
        ];
        a.bots = vec![user("hubot", "")];
        a.groups = vec![Group {
            name: "eng".to_string(),
            permissions: vec!["write".to_string(), "read".to_string(), "read".to_string()],
            members: vec!["carol".to_string(), "alice".to_string(), "carol".to_string()],
            ..Default::default()
        }];
        a.ingress = vec![rule("b", 1000), rule("a", 1000), rule("z", 10)];
        a
    }

    #[test]
    fn test_principals_sorted_case_insensitively() {
        let mut a = sample();
        finalize(&mut a);
        let accounts: Vec<_> = a.users.iter().map(|u| u.account.as_str()).collect();
        assert_eq!(accounts, vec!["alice", "Bob", "carol"]);
    }

    #[test]
    fn test_users_and_bots_disjoint() {
        let mut a = sample();
        finalize(&mut a);
        assert!(a.users.iter().all(|u| u.account != "hubot"));
        assert_eq!(a.bots.len(), 1);
        assert_eq!(a.users_total, 3);
        assert_eq!(a.bots_total, 1);
    }

    #[test]
    fn test_role_index_lowercases_keys() {
        let mut a = sample();
        finalize(&mut a);
        assert_eq!(a.roles["admin"], vec!["alice", "carol"]);
        assert_eq!(a.roles["member"], vec!["Bob"]);
        assert_eq!(a.roles.len(), 2);
        assert_eq!(a.roles_total, 2);
        // user.role keeps the emitted casing
        assert_eq!(a.users[2].role, "Admin");
    }

    #[test]
    fn test_rules_sorted_by_priority_then_name() {
        let mut a = sample();
        finalize(&mut a);
        let names: Vec<_> = a.ingress.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_group_lists_sorted_and_unique() {
        let mut a = sample();
        finalize(&mut a);
        assert_eq!(a.groups[0].members, vec!["alice", "carol"]);
        assert_eq!(a.groups[0].permissions, vec!["read", "write"]);
        assert_eq!(a.groups_total, 1);
    }

    #[test]
    fn test_group_members_get_one_membership() {
        let mut a = sample();
        a.users[0].groups.push(Membership {
            name: "eng".to_string(),
            role: "OWNER".to_string(),
            ..Default::default()
        });
        finalize(&mut a);

        for u in &a.users {
            let n = u.groups.iter().filter(|m| m.name == "eng").count();
            let expected = usize::from(u.account == "alice" || u.account == "carol");
            assert_eq!(n, expected, "{}", u.account);
        }
        let carol = a.users.iter().find(|u| u.account == "carol").unwrap();
        assert_eq!(carol.groups[0].role, "OWNER");
    }

    #[test]
    fn test_permissions_propagate_from_groups() {
        let mut a = sample();
        a.users[1].permissions = vec!["deploy".to_string(), "read".to_string()];
        finalize(&mut a);
        assert_eq!(a.by_permission["read"], vec!["Bob", "alice", "carol"]);
        assert_eq!(a.by_permission["write"], vec!["alice", "carol"]);
        assert_eq!(a.by_permission["deploy"], vec!["Bob"]);
    }

    #[test]
    fn test_keyed_group_members_linked() {
        let mut a = Artifact::default();
        a.permissions.users.insert("alice".to_string(), User::default());
        a.permissions.groups.insert(
            "eng".to_string(),
            Group {
                members: vec!["alice".to_string(), "ghost".to_string()],
                ..Default::default()
            },
        );
        finalize(&mut a);
        assert_eq!(a.permissions.users["alice"].groups[0].name, "eng");
        assert_eq!(a.permissions.users_total, 1);
        assert_eq!(a.permissions.groups_total, 1);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut once = sample();
        finalize(&mut once);
        let mut twice = once.clone();
        finalize(&mut twice);
        assert_eq!(once, twice);
    }
}
