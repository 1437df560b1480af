use std::sync::Arc;

use yacls_gcloud::{FirewallEntry, FirewallTarget, GcpClient};
use yacls_model::{Artifact, FirewallRule, FirewallRuleMeta};

use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Priority of the rules GCP applies when nothing else matches
const IMPLIED_PRIORITY: u32 = 65535;

/// VPC firewall rules of a GCP project, fetched through a [`GcpClient`]
pub struct GoogleCloudProjectFirewall {
    client: Arc<dyn GcpClient>,
}

impl GoogleCloudProjectFirewall {
    pub fn new(client: Arc<dyn GcpClient>) -> Self {
        Self { client }
    }
}

/// `proto:port` pairs, or the bare protocol when no ports are listed
fn targets(list: &[FirewallTarget]) -> String {
    let mut out: Vec<String> = Vec::new();
    for t in list {
        if t.ports.is_empty() {
            out.push(t.ip_protocol.clone());
            continue;
        }
        out.extend(t.ports.iter().map(|p| format!("{}:{p}", t.ip_protocol)));
    }
    out.sort();
    out.join(",")
}

/// Sorted and comma-joined
fn joined(list: &[String]) -> String {
    let mut sorted = list.to_vec();
    sorted.sort();
    sorted.join(",")
}

fn rule_meta(entry: &FirewallEntry) -> FirewallRuleMeta {
    let network = entry.network.rsplit('/').next().unwrap_or_default();
    FirewallRuleMeta {
        name: entry.name.clone(),
        description: entry.description.clone(),
        logging: entry.log_config.enable,
        priority: entry.priority,
        rule: FirewallRule {
            allow: targets(&entry.allowed),
            deny: targets(&entry.denied),
            network: if network == "default" {
                String::new()
            } else {
                network.to_string()
            },
            sources: joined(&entry.source_ranges),
            destinations: joined(&entry.destination_ranges),
            source_tags: joined(&entry.source_tags),
            target_tags: joined(&entry.target_tags),
        },
    }
}

/// The rules every VPC network has below all user rules
fn implied_rules() -> (FirewallRuleMeta, FirewallRuleMeta) {
    let ingress = FirewallRuleMeta {
        name: "gcp-ingress-fallback".to_string(),
        description: "GCP Implied Ingress Fallback".to_string(),
        priority: IMPLIED_PRIORITY,
        rule: FirewallRule {
            sources: "0.0.0.0/0".to_string(),
            deny: "all".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let egress = FirewallRuleMeta {
        name: "gcp-egress-fallback".to_string(),
        description: "GCP Implied Egress Fallback".to_string(),
        priority: IMPLIED_PRIORITY,
        rule: FirewallRule {
            destinations: "0.0.0.0/0".to_string(),
            allow: "all".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    (ingress, egress)
}

impl Processor for GoogleCloudProjectFirewall {
    fn description(&self) -> Description {
        Description {
            kind: "gcp-firewalls",
            name: "Google Cloud Project Firewalls",
            steps: vec!["Execute 'yacls --kind={kind} --project={project}'"],
            no_input_required: true,
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        if config.project.is_empty() {
            return Err(Error::Config("kind gcp-firewalls requires a project".to_string()));
        }
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source);
        a.metadata.id = config.project.clone();

        for entry in self.client.firewall_rules(&config.project)? {
            if entry.disabled {
                continue;
            }
            let meta = rule_meta(&entry);
            match entry.direction.as_str() {
                "INGRESS" => a.ingress.push(meta),
                "EGRESS" => a.egress.push(meta),
                other => {
                    return Err(Error::Schema(format!(
                        "firewall rule {}: unexpected direction {other:?}",
                        entry.name
                    )))
                }
            }
        }

        let (ingress, egress) = implied_rules();
        a.ingress.push(ingress);
        a.egress.push(egress);
        Ok(a)
    }
}
