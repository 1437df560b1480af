//! GCP project IAM ingester
//!
//! Walks the IAM policies of a project and its ancestors and turns every
//! binding into per-principal role labels. Group principals are expanded
//! through Cloud Identity; expansions are kept in a [`GcpMemberCache`] that
//! outlives a single project so each group is listed at most once per run.
//!
//! Group members get a [`Membership`] carrying their highest role within
//! the group and whichever of the group's roles they do not already hold.

mod cache;
mod identity;
mod roles;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};
use yacls_gcloud::{GcpClient, GroupMembership, MembershipRole, ServiceAccount};
use yacls_model::{Artifact, Group, Membership, User, DIRECT};

use super::{source, Config, Description, Processor};
use crate::error::Error;

pub use cache::GcpMemberCache;
use identity::Identity;
use roles::HIDDEN_ROLES;

/// IAM policies of a GCP project, fetched through a [`GcpClient`]
pub struct GoogleCloudProjectIam {
    client: Arc<dyn GcpClient>,
}

impl GoogleCloudProjectIam {
    pub fn new(client: Arc<dyn GcpClient>) -> Self {
        Self { client }
    }

    /// Members of the principal `reference`.
    ///
    /// Users and service accounts are their own single, non-expanded member.
    /// Groups are listed through the client once per cache lifetime.
    pub fn expand_members(
        &self,
        reference: &str,
        identity_project: &str,
        cache: &GcpMemberCache,
    ) -> Result<Vec<GroupMembership>, Error> {
        let id = Identity::parse(reference);
        if id.kind == "user" || id.is_service_account() || id.kind == "deleted:user" {
            return Ok(vec![GroupMembership::new(&id.email, &[])]);
        }

        if let Some(members) = cache.get(reference) {
            debug!(%reference, "member cache hit");
            return Ok(members);
        }

        let mut members = self.client.group_memberships(&id.email, identity_project)?;
        for m in members.iter_mut() {
            m.expanded = true;
        }
        cache.insert(reference, members.clone());
        Ok(members)
    }
}

/// Highest of `OWNER > ADMIN > MEMBER`; `MEMBER` is the default and renders empty
pub(crate) fn highest_role(roles: &[MembershipRole]) -> String {
    fn rank(name: &str) -> u8 {
        match name.to_uppercase().as_str() {
            "OWNER" => 3,
            "ADMIN" => 2,
            "MEMBER" => 1,
            _ => 0,
        }
    }

    let mut best: Option<&str> = None;
    for r in roles {
        if best.map_or(true, |b| rank(&r.name) > rank(b)) {
            best = Some(&r.name);
        }
    }
    match best {
        Some(name) if !name.eq_ignore_ascii_case("MEMBER") => name.to_string(),
        _ => String::new(),
    }
}

/// Principals and groups collected while walking the bindings
#[derive(Default)]
struct Assembly {
    users: BTreeMap<String, User>,
    service_accounts: BTreeMap<String, User>,
    groups: BTreeMap<String, Group>,
    /// (member, group) → role within the group
    group_roles: BTreeMap<(String, String), String>,
    memberships: BTreeMap<String, Vec<String>>,
}

/// Per-project facts used to describe principals
struct Lookup<'a> {
    orgs: &'a [String],
    project_number: &'a str,
    projects_by_number: &'a BTreeMap<String, String>,
    service_accounts: &'a BTreeMap<String, ServiceAccount>,
}

impl Assembly {
    /// Entry for `id`, created on first sight. `None` for GCP-internal agents.
    fn principal(&mut self, id: &Identity, lookup: &Lookup<'_>) -> Option<(String, &mut User)> {
        if id.is_internal_service_account(lookup.project_number) {
            debug!(email = %id.email, "skipping internal service account");
            return None;
        }

        let key = id.short_name(lookup.orgs);
        let map = if id.is_service_account() {
            &mut self.service_accounts
        } else {
            &mut self.users
        };

        let u = map.entry(key.clone()).or_insert_with(|| {
            let mut u = User::new(key.clone());
            u.email = id.email.clone();
            if id.is_service_account() {
                if let Some(sa) = lookup.service_accounts.get(&id.email) {
                    let display = sa.display_name.trim();
                    if display != id.username {
                        u.name = display.to_string();
                    }
                    if sa.disabled {
                        u.status = "Disabled".to_string();
                    }
                }
                u.project = id.owning_project(lookup.projects_by_number);
            }
            u
        });
        u.deleted |= id.deleted;
        Some((key, u))
    }

    fn add_membership(&mut self, key: &str, via: &str) {
        self.memberships
            .entry(key.to_string())
            .or_default()
            .push(via.to_string());
    }

    /// Give every group member a Membership, hiding roles already granted
    /// directly or through an earlier group.
    fn link_groups(&mut self) {
        let mut by_member: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (member, group) in self.group_roles.keys() {
            by_member.entry(member.as_str()).or_default().push(group.as_str());
        }

        for (member, groups) in by_member {
            let Some(u) = self
                .users
                .get_mut(member)
                .or_else(|| self.service_accounts.get_mut(member))
            else {
                continue;
            };

            let mut seen: BTreeSet<String> = u.roles.iter().cloned().collect();
            for group in groups {
                let granted = self
                    .groups
                    .get(group)
                    .map(|g| g.roles.clone())
                    .unwrap_or_default();
                let permissions: Vec<String> = granted
                    .into_iter()
                    .filter(|r| seen.insert(r.clone()))
                    .collect();
                let role = self
                    .group_roles
                    .get(&(member.to_string(), group.to_string()))
                    .cloned()
                    .unwrap_or_default();
                u.groups.push(Membership {
                    name: group.to_string(),
                    role,
                    permissions,
                    ..Default::default()
                });
            }
        }
    }
}

fn sort_dedup(v: &mut Vec<String>) {
    v.sort();
    v.dedup();
}

impl Processor for GoogleCloudProjectIam {
    fn description(&self) -> Description {
        Description {
            kind: "gcp",
            name: "Google Cloud Project IAM Policies",
            steps: vec!["Execute 'yacls --kind={kind} --project={project}'"],
            filter: BTreeMap::from([(
                "role",
                HIDDEN_ROLES.iter().map(|r| r.to_string()).collect(),
            )]),
            no_input_required: true,
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        if config.project.is_empty() {
            return Err(Error::Config("kind gcp requires a project".to_string()));
        }
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source);

        let project = config.project.as_str();
        let identity_project = if config.gcp_identity_project.is_empty() {
            project
        } else {
            config.gcp_identity_project.as_str()
        };

        let docs = self.client.ancestors_iam_policy(project)?;
        let catalogue = self.client.roles(project)?;
        let service_accounts: BTreeMap<String, ServiceAccount> = self
            .client
            .service_accounts(project)?
            .into_iter()
            .map(|sa| (sa.email.clone(), sa))
            .collect();
        let orgs = self.client.organizations()?;
        let project_number = self.client.project_number(project)?;
        let projects_by_number = self.client.projects_by_number()?;
        debug!(%project_number, ?orgs, "project context");

        let lookup = Lookup {
            orgs: &orgs,
            project_number: &project_number,
            projects_by_number: &projects_by_number,
            service_accounts: &service_accounts,
        };
        let mut asm = Assembly::default();

        for doc in &docs {
            if a.metadata.id.is_empty() {
                a.metadata.id = doc.id.clone();
            }

            for binding in &doc.policy.bindings {
                if roles::is_hidden(&binding.role) {
                    info!(role = %binding.role, "filtered hidden role");
                    continue;
                }
                let label = roles::label(&binding.role, &catalogue);

                for reference in &binding.members {
                    let id = Identity::parse(reference);
                    match id.kind.as_str() {
                        "domain" => continue,
                        "user" | "deleted:user" | "serviceAccount" | "deleted:serviceAccount" => {
                            if let Some((key, u)) = asm.principal(&id, &lookup) {
                                u.roles.push(label.clone());
                                asm.add_membership(&key, DIRECT);
                            }
                        }
                        "group" => {
                            let group = id.short_name(&orgs);
                            let members =
                                self.expand_members(reference, identity_project, &config.gcp_member_cache)?;
                            asm.groups
                                .entry(group.clone())
                                .or_insert_with(|| Group::new(group.clone()))
                                .roles
                                .push(label.clone());

                            for m in members {
                                let mid = Identity::parse(&m.member.id);
                                let Some((key, _)) = asm.principal(&mid, &lookup) else {
                                    continue;
                                };
                                asm.add_membership(&key, &group);
                                if let Some(g) = asm.groups.get_mut(&group) {
                                    g.members.push(key.clone());
                                }
                                asm.group_roles
                                    .entry((key, group.clone()))
                                    .or_insert_with(|| highest_role(&m.roles));
                            }
                        }
                        other => {
                            return Err(Error::Schema(format!(
                                "unknown principal kind {other:?}: {reference}"
                            )))
                        }
                    }
                }
            }
        }

        if a.metadata.id.is_empty() {
            a.metadata.id = project.to_string();
        }
        a.metadata.name = format!("Google Cloud IAM Policy for {}", a.metadata.id);

        for u in asm.users.values_mut().chain(asm.service_accounts.values_mut()) {
            sort_dedup(&mut u.roles);
        }
        for g in asm.groups.values_mut() {
            sort_dedup(&mut g.roles);
            sort_dedup(&mut g.members);
        }
        asm.link_groups();

        a.orgs = orgs.iter().map(Group::new).collect();
        a.memberships = asm
            .memberships
            .into_iter()
            .map(|(k, mut via)| {
                sort_dedup(&mut via);
                (k, via.join(","))
            })
            .collect();
        a.permissions.users = asm.users;
        a.permissions.service_accounts = asm.service_accounts;
        a.permissions.groups = asm.groups;

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<MembershipRole> {
        names
            .iter()
            .map(|n| MembershipRole {
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_highest_role() {
        assert_eq!(highest_role(&roles(&["MEMBER", "OWNER", "ADMIN"])), "OWNER");
        assert_eq!(highest_role(&roles(&["MEMBER", "ADMIN"])), "ADMIN");
        assert_eq!(highest_role(&roles(&["MEMBER"])), "");
        assert_eq!(highest_role(&roles(&[])), "");
        assert_eq!(highest_role(&roles(&["member", "Owner"])), "Owner");
    }

    #[test]
    fn test_description_surfaces_hidden_roles() {
        let p = GoogleCloudProjectIam::new(Arc::new(yacls_gcloud::MockGcloud::new()));
        let d = p.description();
        assert!(d.no_input_required);
        assert!(d.filter["role"].contains(&"roles/billing.user".to_string()));
    }

    #[test]
    fn test_project_is_required() {
        let p = GoogleCloudProjectIam::new(Arc::new(yacls_gcloud::MockGcloud::new()));
        let err = p.process(Config::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }
}
