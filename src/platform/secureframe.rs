use serde::Deserialize;
use yacls_model::{Artifact, User};

use super::tabular::{local_part, read_records};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Personnel CSV exported from Secureframe
pub struct SecureframePersonnel;

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "Name (email)")]
    email: String,
    #[serde(rename = "Access role")]
    role: String,
}

impl Processor for SecureframePersonnel {
    fn description(&self) -> Description {
        Description {
            kind: "secureframe",
            name: "Secureframe Personnel",
            steps: vec![
                "Open https://app.secureframe.com/personnel",
                "Deselect any active filters",
                "Click Export...",
                "Select 'Direct Download'",
                "Download resulting CSV file for analysis",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let records: Vec<Record> = read_records(&input.text(), &["Name (email)", "Access role"])?;
        // personnel without platform access have no role
        for r in records.into_iter().filter(|r| !r.role.is_empty()) {
            let mut u = User::new(local_part(&r.email));
            u.role = r.role;
            a.users.push(u);
        }

        Ok(a)
    }
}
