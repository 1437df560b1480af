use regex_lite::Regex;
use serde::Deserialize;
use tracing::info;
use yacls_model::{Artifact, User};

use super::tabular::{local_part, read_records, status};
use super::{source, Config, Description, Processor};
use crate::error::Error;

const AUDIT_DATE: &str = r" \[(\d{4}-\d{2}-\d{2}) GMT\]";

/// User accounts report from the Google Workspace admin console
pub struct GoogleWorkspaceUserAudit;

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "User")]
    user: String,
    #[serde(rename = "User account status")]
    status: String,
    #[serde(rename = "Admin status")]
    admin_status: String,
}

impl Processor for GoogleWorkspaceUserAudit {
    fn description(&self) -> Description {
        Description {
            kind: "google-workspace-audit",
            name: "Google Workspace User Audit",
            steps: vec![
                "Open https://admin.google.com/ac/reporting/report/user/accounts",
                "Click Download icon",
                "Select All Columns",
                "Click CSV",
                "Download resulting CSV file for analysis",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut src = input.source.clone();

        let (body, date) = extract_date(&input.text())?;
        if let Some(date) = date {
            src.source_date = date;
        }
        let mut a = Artifact::new(src);

        let records: Vec<Record> = read_records(
            &body,
            &["User", "User account status", "Admin status"],
        )?;
        for r in records {
            let mut u = User::new(local_part(&r.user));
            if r.admin_status != "None" {
                u.role = r.admin_status;
            }
            u.status = status(&r.status);
            a.users.push(u);
        }

        Ok(a)
    }
}

/// Pull the report date out of the first line and drop the preamble.
///
/// The date token is removed from the first line; any leading lines that
/// are not delimited rows are dropped so the CSV header comes first.
fn extract_date(content: &str) -> Result<(String, Option<String>), Error> {
    let re = Regex::new(AUDIT_DATE).map_err(|e| Error::parse("audit date pattern", e))?;
    let mut lines = content.lines();
    let Some(first) = lines.next() else {
        return Ok((String::new(), None));
    };

    let date = re
        .captures(first)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    if let Some(date) = &date {
        info!(%date, "found audit date");
    }

    let first = re.replace_all(first, "").into_owned();
    let body: Vec<&str> = std::iter::once(first.as_str())
        .chain(lines)
        .skip_while(|l| !l.contains(','))
        .collect();
    Ok((body.join("\n"), date))
}
