use serde::Deserialize;
use yacls_model::{Artifact, User};

use super::tabular::read_records;
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Member list exported from Slack's admin pages
pub struct SlackMembers;

#[derive(Debug, Deserialize)]
struct Record {
    username: String,
    email: String,
    status: String,
    #[serde(default)]
    fullname: String,
    #[serde(default)]
    displayname: String,
}

impl Processor for SlackMembers {
    fn description(&self) -> Description {
        Description {
            kind: "slack",
            name: "Slack Members",
            steps: vec![
                "Open Slack",
                "Click <org name>",
                "Select 'Settings & Administration'",
                "Select 'Manage Members'",
                "Select 'Export Member List'",
                "Download resulting CSV file for analysis",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let records: Vec<Record> = read_records(&input.text(), &["username", "email", "status"])?;
        for r in records {
            if r.status == "Deactivated" {
                continue;
            }

            let mut name = r.fullname.trim();
            if name.is_empty() {
                name = r.displayname.trim();
            }

            if r.status == "Bot" {
                let mut u = User::new(format!("{}!{}", r.username, r.email));
                u.name = name.to_string();
                a.bots.push(u);
                continue;
            }

            let mut u = User::new(r.email);
            u.name = name.to_string();
            u.role = match r.status.as_str() {
                "Member" | "Active" => String::new(),
                other => other.to_string(),
            };
            a.users.push(u);
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
username,email,status,billing-active,has-2fa,has-sso,userid,fullname,displayname
hubot,hubot@ex.com,Bot,0,0,0,U01,Hubot,hubot
alice,alice@ex.com,Active,1,1,0,U02,Alice,al
carol,carol@ex.com,Admin,1,1,0,U03,,caz
dave,dave@ex.com,Deactivated,0,0,0,U04,Dave,dave
";

    #[test]
    fn test_bots_and_users_are_split() {
        let a = SlackMembers.process(Config::from_bytes(EXPORT)).unwrap();

        assert_eq!(a.bots.len(), 1);
        assert_eq!(a.bots[0].account, "hubot!hubot@ex.com");
        assert_eq!(a.bots[0].role, "");

        let accounts: Vec<&str> = a.users.iter().map(|u| u.account.as_str()).collect();
        assert_eq!(accounts, vec!["alice@ex.com", "carol@ex.com"]);
        assert_eq!(a.users[0].name, "Alice");
        assert_eq!(a.users[0].role, "");
        assert_eq!(a.users[1].name, "caz");
        assert_eq!(a.users[1].role, "Admin");
    }

    #[test]
    fn test_missing_status_column() {
        let err = SlackMembers
            .process(Config::from_bytes("username,email\nx,x@ex.com\n"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }
}
