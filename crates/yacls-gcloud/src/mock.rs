//! In-process stand-in for `gcloud`
//!
//! Holds canned responses and counts every call so tests can assert how
//! often the ingesters reach out (e.g. that group expansion is cached).

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::GcloudError;
use crate::types::{AncestorPolicy, FirewallEntry, GroupMembership, IamRole, ServiceAccount};
use crate::GcpClient;

/// Canned [`GcpClient`] for tests
#[derive(Debug, Default)]
pub struct MockGcloud {
    policies: BTreeMap<String, Vec<AncestorPolicy>>,
    service_accounts: BTreeMap<String, Vec<ServiceAccount>>,
    organizations: Vec<String>,
    project_numbers: BTreeMap<String, String>,
    roles: BTreeMap<String, IamRole>,
    groups: BTreeMap<String, Vec<GroupMembership>>,
    firewalls: BTreeMap<String, Vec<FirewallEntry>>,
    calls: Mutex<BTreeMap<String, usize>>,
}

impl MockGcloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, project: &str, docs: Vec<AncestorPolicy>) -> Self {
        self.policies.insert(project.to_string(), docs);
        self
    }

    pub fn with_service_accounts(mut self, project: &str, sas: Vec<ServiceAccount>) -> Self {
        self.service_accounts.insert(project.to_string(), sas);
        self
    }

    pub fn with_organizations(mut self, orgs: &[&str]) -> Self {
        self.organizations = orgs.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_project_number(mut self, project: &str, number: &str) -> Self {
        self.project_numbers
            .insert(project.to_string(), number.to_string());
        self
    }

    pub fn with_role(mut self, role: IamRole) -> Self {
        self.roles.insert(role.name.clone(), role);
        self
    }

    pub fn with_group(mut self, email: &str, members: Vec<GroupMembership>) -> Self {
        self.groups.insert(email.to_string(), members);
        self
    }

    pub fn with_firewall_rules(mut self, project: &str, rules: Vec<FirewallEntry>) -> Self {
        self.firewalls.insert(project.to_string(), rules);
        self
    }

    /// Number of calls made to `op` with any argument
    pub fn calls(&self, op: &str) -> usize {
        self.counter(op)
    }

    /// Number of calls made to `op` with argument `arg`
    pub fn calls_with(&self, op: &str, arg: &str) -> usize {
        self.counter(&format!("{op}:{arg}"))
    }

    fn counter(&self, key: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(key).copied().unwrap_or(0)
    }

    fn record(&self, op: &str, arg: &str) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        *calls.entry(op.to_string()).or_insert(0) += 1;
        *calls.entry(format!("{op}:{arg}")).or_insert(0) += 1;
    }

    fn not_found(command: String, what: &str) -> GcloudError {
        GcloudError::Failed {
            command,
            status: "exit status: 1".to_string(),
            stderr: format!("ERROR: (gcloud) NOT_FOUND: {what}"),
        }
    }
}

impl GcpClient for MockGcloud {
    fn ancestors_iam_policy(&self, project: &str) -> Result<Vec<AncestorPolicy>, GcloudError> {
        self.record("ancestors_iam_policy", project);
        self.policies.get(project).cloned().ok_or_else(|| {
            Self::not_found(
                format!("gcloud projects get-ancestors-iam-policy {project}"),
                project,
            )
        })
    }

    fn service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, GcloudError> {
        self.record("service_accounts", project);
        Ok(self
            .service_accounts
            .get(project)
            .cloned()
            .unwrap_or_default())
    }

    fn organizations(&self) -> Result<Vec<String>, GcloudError> {
        self.record("organizations", "");
        Ok(self.organizations.clone())
    }

    fn project_number(&self, project: &str) -> Result<String, GcloudError> {
        self.record("project_number", project);
        self.project_numbers.get(project).cloned().ok_or_else(|| {
            Self::not_found(
                format!("gcloud projects describe {project} --format=json"),
                project,
            )
        })
    }

    fn projects_by_number(&self) -> Result<BTreeMap<String, String>, GcloudError> {
        self.record("projects_by_number", "");
        Ok(self
            .project_numbers
            .iter()
            .map(|(id, number)| (number.clone(), id.clone()))
            .collect())
    }

    fn roles(&self, project: &str) -> Result<BTreeMap<String, IamRole>, GcloudError> {
        self.record("roles", project);
        Ok(self.roles.clone())
    }

    fn group_memberships(
        &self,
        group_email: &str,
        identity_project: &str,
    ) -> Result<Vec<GroupMembership>, GcloudError> {
        self.record("group_memberships", group_email);
        self.groups.get(group_email).cloned().ok_or_else(|| {
            Self::not_found(
                format!(
                    "gcloud identity groups memberships list --group-email={group_email} --project={identity_project}"
                ),
                group_email,
            )
        })
    }

    fn firewall_rules(&self, project: &str) -> Result<Vec<FirewallEntry>, GcloudError> {
        self.record("firewall_rules", project);
        Ok(self.firewalls.get(project).cloned().unwrap_or_default())
    }
}
