use scraper::ElementRef;
use tracing::debug;
use yacls_model::{Artifact, User};

use super::scrape::{document, select_text, selector, text};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Role labels Vercel renders for members who cannot change their own role
const ROLES: &[&str] = &["owner", "member", "developer", "billing", "viewer"];

/// Lowercased texts of `elements` that name a role, first occurrence only
fn known_roles<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for t in elements.map(|el| text(el).to_lowercase()) {
        if ROLES.contains(&t.as_str()) && !roles.contains(&t) {
            roles.push(t);
        }
    }
    roles
}

/// Saved "Members" page of a Vercel team
pub struct VercelMembers;

impl Processor for VercelMembers {
    fn description(&self) -> Description {
        Description {
            kind: "vercel",
            name: "Vercel Site Permissions",
            steps: vec![
                "Open https://vercel.com/",
                "Select your company/team",
                "Click 'Settings'",
                "Click 'Members'",
                "Save this page (Complete)",
                "Collect resulting .html file for analysis (the other files are not necessary)",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            matching_filename: Some(r"Vercel.html|Members - Team Settings.*?html$"),
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let doc = document(&input.content);
        let member = selector("div[data-geist-entity]")?;
        let email = selector("p[type=secondary]")?;
        let option = selector("option")?;
        let labels = selector("span, p")?;

        for row in doc.select(&member) {
            let account = select_text(row, &email);
            if account.is_empty() {
                continue;
            }

            let mut roles = known_roles(row.select(&option));
            if roles.is_empty() {
                roles = known_roles(row.select(&labels));
            }
            debug!(%account, ?roles, "member");

            let mut u = User::new(account);
            // the selected option is not in the saved page
            u.role = roles.join(" or ");
            a.users.push(u);
        }

        Ok(a)
    }
}
