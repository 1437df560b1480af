//! gcloud adapter
//!
//! The GCP ingesters never run `gcloud` themselves. They talk to a
//! [`GcpClient`], which returns already-parsed documents:
//! - [`Gcloud`]: shells out to the `gcloud` CLI with the operator's ambient credentials
//! - [`MockGcloud`]: in-process canned responses with per-call counters for tests

pub mod cli;
pub mod error;
pub mod mock;
pub mod types;

use std::collections::BTreeMap;

pub use cli::Gcloud;
pub use error::GcloudError;
pub use mock::MockGcloud;
pub use types::{
    AncestorPolicy, Binding, FirewallEntry, FirewallTarget, GroupMembership, IamRole, LogConfig,
    MemberKey, MembershipRole, Policy, ServiceAccount,
};

/// The subset of GCP a snapshot needs, as pure functions of their arguments.
pub trait GcpClient: Send + Sync {
    /// IAM policies for the project and each of its ancestors, project first
    fn ancestors_iam_policy(&self, project: &str) -> Result<Vec<AncestorPolicy>, GcloudError>;

    /// Service accounts defined in the project
    fn service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, GcloudError>;

    /// Display names of the organizations visible to the operator
    fn organizations(&self) -> Result<Vec<String>, GcloudError>;

    /// Numeric identifier of the project
    fn project_number(&self, project: &str) -> Result<String, GcloudError>;

    /// Project number → project id for every visible project
    fn projects_by_number(&self) -> Result<BTreeMap<String, String>, GcloudError>;

    /// Global and project-local role catalogue, keyed by role name
    fn roles(&self, project: &str) -> Result<BTreeMap<String, IamRole>, GcloudError>;

    /// Members of a Cloud Identity group
    fn group_memberships(
        &self,
        group_email: &str,
        identity_project: &str,
    ) -> Result<Vec<GroupMembership>, GcloudError>;

    /// VPC firewall rules of the project
    fn firewall_rules(&self, project: &str) -> Result<Vec<FirewallEntry>, GcloudError>;
}
