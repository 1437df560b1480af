use std::collections::BTreeMap;

use yacls_model::{Artifact, User};

use super::tabular::{local_part, read_records, status};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Users CSV downloaded from the Google Workspace admin console
pub struct GoogleWorkspaceUsers;

const EMAIL: &str = "Email Address [Required]";
const STATUS: &str = "Status [READ ONLY]";
const FIRST_NAME: &str = "First Name [Required]";
const LAST_NAME: &str = "Last Name [Required]";
const TWO_FACTOR_ENFORCED: &str = "2sv Enforced [READ ONLY]";

/// One row, keyed by header
type Record = BTreeMap<String, String>;

fn field<'a>(r: &'a Record, column: &str) -> &'a str {
    r.get(column).map_or("", |v| v.trim())
}

impl Processor for GoogleWorkspaceUsers {
    fn description(&self) -> Description {
        Description {
            kind: "google-workspace-users",
            name: "Google Workspace Users",
            steps: vec![
                "Open https://admin.google.com/ac/users",
                "Click Download users",
                "Select 'All user info Columns'",
                "Select 'Comma-separated values (.csv)'",
                "Download resulting CSV file for analysis",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let records: Vec<Record> =
            read_records(&input.text(), &[EMAIL, STATUS, FIRST_NAME, LAST_NAME])?;
        for r in &records {
            let mut u = User::new(local_part(field(r, EMAIL)));
            u.name = format!("{} {}", field(r, FIRST_NAME), field(r, LAST_NAME))
                .trim()
                .to_string();
            u.status = status(field(r, STATUS));
            u.two_factor_disabled = field(r, TWO_FACTOR_ENFORCED) == "False";
            a.users.push(u);
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_keyed_by_local_part() {
        let csv = "\
First Name [Required],Last Name [Required],Email Address [Required],Status [READ ONLY],2sv Enforced [READ ONLY]
Alice ,Smith,alice@example.com,Active,True
Bob,Jones,bob@example.com,Suspended,False
";
        let a = GoogleWorkspaceUsers.process(Config::from_bytes(csv)).unwrap();
        assert_eq!(a.users.len(), 2);
        assert_eq!(a.users[0].account, "alice");
        assert_eq!(a.users[0].name, "Alice Smith");
        assert_eq!(a.users[0].status, "");
        assert!(!a.users[0].two_factor_disabled);
        assert_eq!(a.users[1].status, "Suspended");
        assert!(a.users[1].two_factor_disabled);
    }

    #[test]
    fn test_header_constants_drive_columns() {
        let csv = format!("{EMAIL},{FIRST_NAME},{LAST_NAME},{STATUS}\ncarol@example.com,Carol,,Active\n");
        let a = GoogleWorkspaceUsers.process(Config::from_bytes(csv)).unwrap();
        assert_eq!(a.users[0].account, "carol");
        assert_eq!(a.users[0].name, "Carol");
        assert!(!a.users[0].two_factor_disabled);

        let err = GoogleWorkspaceUsers
            .process(Config::from_bytes(format!("{EMAIL},{STATUS}\nx@example.com,Active\n")))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
        assert!(err.to_string().contains(FIRST_NAME));
    }
}
