//! IAM role filtering and labels

use std::collections::BTreeMap;

use tracing::debug;
use yacls_gcloud::IamRole;

/// Roles with no bearing on project access, or internal to GCP
pub(crate) const HIDDEN_ROLES: &[&str] = &[
    "roles/billing.costsManager",
    "roles/billing.creator",
    "roles/billing.user",
    "roles/billing.viewer",
    "roles/dlp.orgdriver",
    "roles/project.Creator",
    "roles/recommender.exporter",
    "roles/resourcemanager.folderViewer",
    "roles/resourcemanager.organizationViewer",
    "roles/resourcemanager.projectCreator",
];

/// Applied in order, first occurrence only
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Access to ", ""),
    ("Read-only ", "read "),
    ("Read only ", "read "),
    ("Create and manage ", "Manage "),
    ("The permission to ", ""),
    ("Authorized to ", ""),
    ("Grants access to ", ""),
    ("Allows users to ", ""),
    ("Access and administer ", "Administer "),
    (" to all ", " to "),
    ("administer all ", "administer "),
    (" to get and list ", " to "),
    ("Admin(super user)", "Admin "),
    ("the Kubernetes Engine service account in the host ", "GKE SA "),
    ("standard (non-administrator) ", "standard "),
    ("(applicable for GCP Customer Care and Maps support)", ""),
];

const DROPPED_PREFIXES: &[&str] = &["Can ", "Allows "];

pub(crate) fn is_hidden(role: &str) -> bool {
    HIDDEN_ROLES.contains(&role)
}

/// `<short-id> (<short-description>)` for `name`, or `<short-id> (Custom)`
/// when the catalogue does not know it.
pub(crate) fn label(name: &str, catalogue: &BTreeMap<String, IamRole>) -> String {
    match catalogue.get(name) {
        Some(role) => short_label(role),
        None => {
            debug!(role = name, "not in role catalogue");
            format!("{} (Custom)", short_id(name))
        }
    }
}

fn short_id(name: &str) -> &str {
    name.strip_prefix("roles/").unwrap_or(name)
}

pub(crate) fn short_label(role: &IamRole) -> String {
    let id = short_id(&role.name);
    let mut desc = role
        .description
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();
    if desc.is_empty() {
        desc = role.title.clone();
    }

    for (from, to) in SUBSTITUTIONS {
        desc = desc.replacen(from, to, 1);
    }
    for prefix in DROPPED_PREFIXES {
        if let Some(rest) = desc.strip_prefix(prefix) {
            desc = rest.to_string();
        }
    }
    while desc.contains("  ") {
        desc = desc.replace("  ", " ");
    }
    let desc = desc.trim_end_matches('.').trim();

    if desc.is_empty() {
        id.to_string()
    } else {
        format!("{id} ({desc})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_label() {
        let role = IamRole::new(
            "roles/viewer",
            "Viewer",
            "Read-only access to all resources in the project.",
        );
        assert_eq!(short_label(&role), "viewer (read access to resources in the project)");
    }

    #[test]
    fn test_custom_role_label() {
        assert_eq!(label("roles/custom.thing", &BTreeMap::new()), "custom.thing (Custom)");
        assert_eq!(
            label("projects/p/roles/deployer", &BTreeMap::new()),
            "projects/p/roles/deployer (Custom)"
        );
    }

    #[test]
    fn test_title_fallback_and_bare_id() {
        let titled = IamRole::new("roles/run.invoker", "Cloud Run Invoker", "");
        assert_eq!(short_label(&titled), "run.invoker (Cloud Run Invoker)");
        let bare = IamRole::new("roles/empty", "", "");
        assert_eq!(short_label(&bare), "empty");
    }

    #[test]
    fn test_prefixes_are_rewritten() {
        let role = IamRole::new(
            "roles/storage.admin",
            "",
            "Grants access to  full control of buckets. More text.",
        );
        assert_eq!(short_label(&role), "storage.admin (full control of buckets)");
        let role = IamRole::new("roles/x", "", "Can view things");
        assert_eq!(short_label(&role), "x (view things)");
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden("roles/billing.user"));
        assert!(!is_hidden("roles/editor"));
    }
}
