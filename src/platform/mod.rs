//! Ingester framework
//!
//! Each platform export is turned into an [`Artifact`] by one [`Processor`].
//! Processors are looked up by kind in an ordered registry; their
//! [`Description`] is plain data that can be consulted without running them
//! (filename guessing, help text).

mod cloudflare;
pub mod gcp;
mod gcp_firewalls;
mod ghost;
mod google_workspace_audit;
mod google_workspace_users;
mod pulumi;
mod scrape;
mod secureframe;
mod slack;
pub mod source;
mod tabular;
mod vercel;
mod webflow;

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use tracing::{info, warn};
use yacls_gcloud::{GcpClient, Gcloud};
use yacls_model::Artifact;

use crate::error::Error;

pub use cloudflare::CloudflareMembers;
pub use gcp::{GcpMemberCache, GoogleCloudProjectIam};
pub use gcp_firewalls::GoogleCloudProjectFirewall;
pub use ghost::GhostStaff;
pub use google_workspace_audit::GoogleWorkspaceUserAudit;
pub use google_workspace_users::GoogleWorkspaceUsers;
pub use pulumi::PulumiPeople;
pub use secureframe::SecureframePersonnel;
pub use slack::SlackMembers;
pub use vercel::VercelMembers;
pub use webflow::WebflowMembers;

/// Static description of an ingester
#[derive(Debug, Clone, Default)]
pub struct Description {
    /// Stable identifier
    pub kind: &'static str,
    /// Human title
    pub name: &'static str,
    /// Operator instructions; may contain `{path}`, `{project}` and `{kind}`
    pub steps: Vec<&'static str>,
    /// Regex matched against an input's file name when guessing the kind
    pub matching_filename: Option<&'static str>,
    /// Values the ingester drops from its output, by field
    pub filter: BTreeMap<&'static str, Vec<String>>,
    /// The ingester fetches its own data and takes no input file
    pub no_input_required: bool,
}

impl Description {
    /// Whether `file_name` matches [`Description::matching_filename`]
    pub fn matches_filename(&self, file_name: &str) -> bool {
        let Some(pattern) = self.matching_filename else {
            return false;
        };
        match Regex::new(pattern) {
            Ok(re) => re.is_match(file_name),
            Err(e) => {
                warn!(kind = self.kind, %pattern, error = %e, "bad filename pattern");
                false
            }
        }
    }
}

/// Everything one ingester run needs
#[derive(Default)]
pub struct Config {
    pub path: Option<PathBuf>,
    pub reader: Option<Box<dyn Read>>,
    pub project: String,
    pub kind: String,
    pub gcp_identity_project: String,
    /// Shared across every GCP run of one invocation
    pub gcp_member_cache: GcpMemberCache,
    /// Fixed clock, for reproducible output
    pub generated_at: Option<DateTime<Utc>>,
    /// Fixed operator name, for reproducible output
    pub generated_by: Option<String>,
}

impl Config {
    /// Config reading from an in-memory export
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            reader: Some(Box::new(Cursor::new(content.into()))),
            ..Default::default()
        }
    }

    /// Config reading the export at `path`
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| Error::io_path("open", path, e))?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            reader: Some(Box::new(file)),
            ..Default::default()
        })
    }
}

/// A platform ingester
pub trait Processor {
    fn description(&self) -> Description;
    fn process(&self, config: Config) -> Result<Artifact, Error>;
}

/// Every registered ingester, alphabetical by kind, talking to `gcloud` for GCP
pub fn available() -> Vec<Box<dyn Processor>> {
    available_with(Arc::new(Gcloud::new()))
}

/// Every registered ingester, with GCP kinds using `client`
pub fn available_with(client: Arc<dyn GcpClient>) -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(CloudflareMembers),
        Box::new(GoogleCloudProjectIam::new(client.clone())),
        Box::new(GoogleCloudProjectFirewall::new(client)),
        Box::new(GhostStaff),
        Box::new(GoogleWorkspaceUserAudit),
        Box::new(GoogleWorkspaceUsers),
        Box::new(PulumiPeople),
        Box::new(SecureframePersonnel),
        Box::new(SlackMembers),
        Box::new(VercelMembers),
        Box::new(WebflowMembers),
    ]
}

/// Descriptions of every registered ingester
pub fn descriptions() -> Vec<Description> {
    available().iter().map(|p| p.description()).collect()
}

/// Registered kinds, sorted
pub fn available_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<_> = descriptions().iter().map(|d| d.kind).collect();
    kinds.sort_unstable();
    kinds
}

/// Look up the ingester for `kind`
pub fn new(kind: &str) -> Result<Box<dyn Processor>, Error> {
    new_with(kind, Arc::new(Gcloud::new()))
}

/// Look up the ingester for `kind`, with GCP kinds using `client`
pub fn new_with(kind: &str, client: Arc<dyn GcpClient>) -> Result<Box<dyn Processor>, Error> {
    available_with(client)
        .into_iter()
        .find(|p| p.description().kind == kind)
        .ok_or_else(|| Error::UnknownKind(kind.to_string()))
}

/// Guess the kind of an input from its file name.
///
/// Filename patterns are tried first across every kind; otherwise the
/// longest kind the file name starts with wins.
pub fn suggest_kind(path: &Path) -> Result<String, Error> {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let descs = descriptions();

    if let Some(d) = descs.iter().find(|d| d.matches_filename(&base)) {
        info!(kind = d.kind, file = %base, "kind matched by filename pattern");
        return Ok(d.kind.to_string());
    }

    descs
        .iter()
        .filter(|d| base.starts_with(d.kind))
        .max_by_key(|d| d.kind.len())
        .map(|d| {
            info!(kind = d.kind, file = %base, "kind matched by prefix");
            d.kind.to_string()
        })
        .ok_or_else(|| {
            Error::UnknownKind(format!("unable to find kind for {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_kinds_sorted() {
        let kinds = available_kinds();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
        assert!(kinds.contains(&"gcp"));
        assert!(kinds.contains(&"slack"));
        assert_eq!(kinds.len(), 11);
    }

    #[test]
    fn test_new_unknown_kind() {
        let err = new("myspace").err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::UnknownKind);
    }

    #[test]
    fn test_new_exact_match() {
        assert_eq!(new("gcp-firewalls").unwrap().description().kind, "gcp-firewalls");
        assert!(new("gcp-fire").is_err());
    }

    #[test]
    fn test_suggest_by_filename_pattern() {
        let kind = suggest_kind(Path::new("/tmp/Members - Team Settings - Vercel.html")).unwrap();
        assert_eq!(kind, "vercel");
        let kind = suggest_kind(Path::new("Pulumi People.html")).unwrap();
        assert_eq!(kind, "pulumi");
    }

    #[test]
    fn test_suggest_by_longest_prefix() {
        assert_eq!(suggest_kind(Path::new("in/slack-2024.csv")).unwrap(), "slack");
        assert_eq!(suggest_kind(Path::new("gcp-firewalls.json")).unwrap(), "gcp-firewalls");
        assert_eq!(suggest_kind(Path::new("gcp_prod.yaml")).unwrap(), "gcp");
    }

    #[test]
    fn test_suggest_miss() {
        let err = suggest_kind(Path::new("notes.txt")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnknownKind);
    }

    #[test]
    fn test_descriptions_are_complete() {
        for d in descriptions() {
            assert!(!d.name.is_empty(), "{}", d.kind);
            assert!(!d.steps.is_empty(), "{}", d.kind);
        }
    }
}
