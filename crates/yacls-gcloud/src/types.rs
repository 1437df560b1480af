//! Documents returned by the companion tool.
//!
//! `gcloud` emits JSON for some subcommands and a stream of YAML documents
//! for others; both are decoded into these types. Unknown fields are
//! ignored and missing ones default, so newer tool versions keep working.

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One entry of `projects get-ancestors-iam-policy`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AncestorPolicy {
    pub id: String,
    /// project, folder or organization
    #[serde(rename = "type")]
    pub kind: String,
    pub policy: Policy,
}

impl AncestorPolicy {
    pub fn new(id: &str, kind: &str, bindings: Vec<Binding>) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            policy: Policy { bindings },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub bindings: Vec<Binding>,
}

/// Relation of one role to a set of principal references
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Binding {
    pub role: String,
    pub members: Vec<String>,
}

impl Binding {
    pub fn new(role: &str, members: &[&str]) -> Self {
        Self {
            role: role.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One member of a Cloud Identity group
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupMembership {
    #[serde(rename = "preferredMemberKey")]
    pub member: MemberKey,
    pub roles: Vec<MembershipRole>,
    /// Set when this entry came from expanding a group
    #[serde(skip)]
    pub expanded: bool,
}

impl GroupMembership {
    pub fn new(id: &str, roles: &[&str]) -> Self {
        Self {
            member: MemberKey { id: id.to_string() },
            roles: roles
                .iter()
                .map(|r| MembershipRole {
                    name: r.to_string(),
                })
                .collect(),
            expanded: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemberKey {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MembershipRole {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAccount {
    pub email: String,
    pub display_name: String,
    pub disabled: bool,
}

/// Entry of the IAM role catalogue
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IamRole {
    pub name: String,
    pub title: String,
    pub description: String,
}

impl IamRole {
    pub fn new(name: &str, title: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Organization {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ProjectInfo {
    pub project_number: String,
    pub project_id: String,
}

/// One entry of `compute firewall-rules list`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FirewallEntry {
    pub name: String,
    pub description: String,
    pub direction: String,
    pub disabled: bool,
    pub priority: u32,
    /// Full URL of the VPC network
    pub network: String,
    pub log_config: LogConfig,
    pub allowed: Vec<FirewallTarget>,
    pub denied: Vec<FirewallTarget>,
    pub source_ranges: Vec<String>,
    pub destination_ranges: Vec<String>,
    pub source_tags: Vec<String>,
    pub target_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FirewallTarget {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    pub ports: Vec<String>,
}

/// Decode a stream of `---`-separated YAML documents, skipping empty ones.
pub fn parse_documents<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, serde_yaml::Error> {
    let mut docs = Vec::new();
    for doc in serde_yaml::Deserializer::from_slice(bytes) {
        if let Some(value) = Option::<T>::deserialize(doc)? {
            docs.push(value);
        }
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ANCESTORS: &str = r#"
id: my-project
policy:
  bindings:
  - members:
    - user:alice@example.com
    - group:eng@example.com
    role: roles/editor
  etag: BwX=
type: project
---
id: '1234567890'
policy:
  bindings:
  - members:
    - domain:example.com
    role: roles/billing.user
type: organization
"#;

    #[test]
    fn test_parse_ancestor_stream() {
        let docs: Vec<AncestorPolicy> = parse_documents(ANCESTORS.as_bytes()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "my-project");
        assert_eq!(docs[0].kind, "project");
        assert_eq!(
            docs[0].policy.bindings[0],
            Binding::new("roles/editor", &["user:alice@example.com", "group:eng@example.com"])
        );
        assert_eq!(docs[1].kind, "organization");
    }

    #[test]
    fn test_parse_membership_stream() {
        let raw = r#"
name: groups/01/memberships/1
preferredMemberKey:
  id: alice@example.com
roles:
- name: MEMBER
- name: OWNER
---
preferredMemberKey:
  id: bob@example.com
roles:
- name: MEMBER
"#;
        let docs: Vec<GroupMembership> = parse_documents(raw.as_bytes()).unwrap();
        assert_eq!(docs[0], GroupMembership::new("alice@example.com", &["MEMBER", "OWNER"]));
        assert_eq!(docs[1].member.id, "bob@example.com");
        assert!(!docs[1].expanded);
    }

    #[test]
    fn test_empty_stream_has_no_documents() {
        let docs: Vec<IamRole> = parse_documents(b"").unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_malformed_stream_is_an_error() {
        let res: Result<Vec<IamRole>, _> = parse_documents(b"name: [unterminated");
        assert!(res.is_err());
    }

    #[test]
    fn test_parse_firewall_json() {
        let raw = r#"[{
            "allowed": [{"IPProtocol": "tcp", "ports": ["22", "80"]}, {"IPProtocol": "icmp"}],
            "creationTimestamp": "2023-01-01T00:00:00.000-07:00",
            "direction": "INGRESS",
            "disabled": false,
            "logConfig": {"enable": true},
            "name": "allow-ssh",
            "network": "https://www.googleapis.com/compute/v1/projects/p/global/networks/default",
            "priority": 1000,
            "sourceRanges": ["10.0.0.0/8"],
            "targetTags": ["bastion"]
        }]"#;
        let rules: Vec<FirewallEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(rules[0].name, "allow-ssh");
        assert_eq!(rules[0].allowed[0].ports, vec!["22", "80"]);
        assert!(rules[0].allowed[1].ports.is_empty());
        assert!(rules[0].log_config.enable);
        assert_eq!(rules[0].target_tags, vec!["bastion"]);
    }
}
