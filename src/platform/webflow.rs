use regex_lite::Regex;
use yacls_model::{Artifact, User};

use super::scrape::{document, select_text, selector};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// `Name (email)` as rendered in the member table
const MEMBER: &str = r"(.*?) \((.*?@.*?)\)";

/// Saved "Members" page of a Webflow site
pub struct WebflowMembers;

impl Processor for WebflowMembers {
    fn description(&self) -> Description {
        Description {
            kind: "webflow",
            name: "Webflow Site Permissions",
            steps: vec![
                "Open https://webflow.com/dashboard/sites/<site>/members",
                "Save this page (Complete)",
                "Collect resulting .html file for analysis (the other files are not necessary)",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let re = Regex::new(MEMBER).map_err(|e| Error::parse("member pattern", e))?;
        let doc = document(&input.content);
        let row_sel = selector("tr.member")?;
        let ident = selector("div.ng-binding")?;
        let role = selector("span.ng-binding")?;

        for row in doc.select(&row_sel) {
            let raw = select_text(row, &ident);
            let Some(caps) = re.captures(&raw) else {
                continue;
            };
            let (Some(name), Some(email)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            let mut u = User::new(email.as_str());
            u.name = name.as_str().to_string();
            u.role = select_text(row, &role);
            a.users.push(u);
        }

        Ok(a)
    }
}
