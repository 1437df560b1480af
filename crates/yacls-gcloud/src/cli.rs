//! `gcloud` shell-out implementation of [`GcpClient`]
//!
//! Every call runs one command to completion, captures stdout for decoding
//! and stderr for error reporting, and releases the process before the next
//! operation. Credentials are whatever the operator's gcloud is logged in as.

use std::collections::BTreeMap;
use std::process::Command;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::GcloudError;
use crate::types::{
    parse_documents, AncestorPolicy, FirewallEntry, GroupMembership, IamRole, Organization,
    ProjectInfo, ServiceAccount,
};
use crate::GcpClient;

/// Runs the `gcloud` CLI
#[derive(Debug, Clone)]
pub struct Gcloud {
    program: String,
}

impl Gcloud {
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    /// Use a different executable, e.g. a wrapper script
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn render(&self, args: &[String]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion and return stdout
    fn output(&self, args: &[String]) -> Result<(String, Vec<u8>), GcloudError> {
        let command = self.render(args);
        info!(%command, "executing");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| GcloudError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GcloudError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(%command, output = %String::from_utf8_lossy(&output.stdout), "output");
        Ok((command, output.stdout))
    }

    fn json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, GcloudError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let (command, stdout) = self.output(&args)?;
        serde_json::from_slice(&stdout).map_err(|e| GcloudError::Decode {
            command,
            message: e.to_string(),
        })
    }

    fn documents<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>, GcloudError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let (command, stdout) = self.output(&args)?;
        parse_documents(&stdout).map_err(|e| GcloudError::Decode {
            command,
            message: e.to_string(),
        })
    }
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new()
    }
}

impl GcpClient for Gcloud {
    fn ancestors_iam_policy(&self, project: &str) -> Result<Vec<AncestorPolicy>, GcloudError> {
        self.documents(&["projects", "get-ancestors-iam-policy", project])
    }

    fn service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, GcloudError> {
        let project_flag = format!("--project={project}");
        self.json(&["iam", "service-accounts", "list", "--format=json", &project_flag])
    }

    fn organizations(&self) -> Result<Vec<String>, GcloudError> {
        let orgs: Vec<Organization> = self.json(&["organizations", "list", "--format=json"])?;
        Ok(orgs.into_iter().map(|o| o.display_name).collect())
    }

    fn project_number(&self, project: &str) -> Result<String, GcloudError> {
        let info: ProjectInfo = self.json(&["projects", "describe", project, "--format=json"])?;
        Ok(info.project_number)
    }

    fn projects_by_number(&self) -> Result<BTreeMap<String, String>, GcloudError> {
        let projects: Vec<ProjectInfo> = self.json(&["projects", "list", "--format=json"])?;
        Ok(projects
            .into_iter()
            .map(|p| (p.project_number, p.project_id))
            .collect())
    }

    fn roles(&self, project: &str) -> Result<BTreeMap<String, IamRole>, GcloudError> {
        let project_flag = format!("--project={project}");
        let mut roles = BTreeMap::new();

        // global roles, then project-local ones
        for args in [
            vec!["iam", "roles", "list"],
            vec!["iam", "roles", "list", project_flag.as_str()],
        ] {
            let docs: Vec<IamRole> = self.documents(&args)?;
            for role in docs {
                roles.insert(role.name.clone(), role);
            }
        }
        Ok(roles)
    }

    fn group_memberships(
        &self,
        group_email: &str,
        identity_project: &str,
    ) -> Result<Vec<GroupMembership>, GcloudError> {
        let group_flag = format!("--group-email={group_email}");
        let project_flag = format!("--project={identity_project}");
        self.documents(&[
            "identity",
            "groups",
            "memberships",
            "list",
            &group_flag,
            &project_flag,
        ])
    }

    fn firewall_rules(&self, project: &str) -> Result<Vec<FirewallEntry>, GcloudError> {
        self.json(&[
            "compute",
            "firewall-rules",
            "list",
            "--project",
            project,
            "--format=json",
        ])
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_is_failed() {
        let err = Gcloud::with_program("false").organizations().unwrap_err();
        match err {
            GcloudError::Failed { command, .. } => {
                assert_eq!(command, "false organizations list --format=json");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = Gcloud::with_program("/nonexistent/gcloud")
            .project_number("p")
            .unwrap_err();
        assert!(matches!(err, GcloudError::Spawn { .. }));
        assert_eq!(err.command(), "/nonexistent/gcloud projects describe p --format=json");
    }

    #[test]
    fn test_unexpected_output_is_decode_error() {
        // echo prints its arguments, which is not JSON
        let err = Gcloud::with_program("echo").projects_by_number().unwrap_err();
        assert!(matches!(err, GcloudError::Decode { .. }));
    }
}
