//! Principal references as they appear in IAM bindings
//!
//! A reference looks like `kind:name@domain`, optionally followed by
//! `?uid=<n>` for deleted principals. Group membership listings carry bare
//! e-mail addresses, which parse with kind `unknown` unless they belong to a
//! service account.

use std::collections::BTreeMap;

const SERVICE_ACCOUNT_DOMAIN: &str = "gserviceaccount.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub kind: String,
    pub username: String,
    pub domain: String,
    pub email: String,
    pub deleted: bool,
}

impl Identity {
    pub fn parse(reference: &str) -> Self {
        let (mut kind, id) = match reference.rfind(':') {
            Some(i) if i > 0 => (reference[..i].to_string(), &reference[i + 1..]),
            _ => ("unknown".to_string(), reference),
        };
        let id = id.split_once("?uid=").map_or(id, |(id, _)| id);
        let (username, domain) = id.split_once('@').unwrap_or((id, ""));

        if domain.ends_with(SERVICE_ACCOUNT_DOMAIN) && !kind.ends_with("serviceAccount") {
            kind = "serviceAccount".to_string();
        }

        Self {
            deleted: reference.starts_with("deleted:"),
            kind,
            username: username.to_string(),
            domain: domain.to_string(),
            email: format!("{username}@{domain}"),
        }
    }

    pub fn is_service_account(&self) -> bool {
        self.kind == "serviceAccount" || self.kind == "deleted:serviceAccount"
    }

    /// Readable key for this principal.
    ///
    /// With exactly one organization its domain is dropped; service accounts
    /// also lose the `.gserviceaccount.com` suffix.
    pub fn short_name(&self, orgs: &[String]) -> String {
        let mut name = self.email.clone();
        if let [org] = orgs {
            if let Some(stripped) = name.strip_suffix(&format!("@{org}")) {
                name = stripped.to_string();
            }
        }
        if self.is_service_account() {
            if let Some(stripped) = name.strip_suffix(".gserviceaccount.com") {
                name = stripped.to_string();
            }
        }
        name
    }

    /// Google-managed agents that are hidden from the console by default
    pub fn is_internal_service_account(&self, project_number: &str) -> bool {
        if !self.is_service_account() {
            return false;
        }
        let service_agent = self
            .username
            .strip_prefix("service-")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            && self.domain.ends_with(".iam.gserviceaccount.com");
        let cloud_services = !project_number.is_empty()
            && self.username == project_number
            && self.domain == "cloudservices.gserviceaccount.com";
        service_agent || cloud_services
    }

    /// Project a service account belongs to, from the digits in its name
    pub fn owning_project(&self, projects_by_number: &BTreeMap<String, String>) -> String {
        let name = self.username.strip_prefix("service-").unwrap_or(&self.username);
        let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return String::new();
        }
        projects_by_number.get(&digits).cloned().unwrap_or_default()
    }
}
