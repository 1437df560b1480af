use regex_lite::Regex;
use tracing::info;
use yacls_model::{Artifact, User};

use super::scrape::{document, select_text, selector};
use super::{source, Config, Description, Processor};
use crate::error::Error;

const STAFF_LINK: &str = r"/staff/([\w-]+)";

/// Saved "Staff" settings page of a Ghost blog
pub struct GhostStaff;

impl Processor for GhostStaff {
    fn description(&self) -> Description {
        Description {
            kind: "ghost",
            name: "Ghost Blog Permissions",
            steps: vec![
                "Open the corporate Ghost blog",
                "Click 'Settings'",
                "Click 'Staff'",
                "Zoom out so that all users are visible on one screen",
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

        let re = Regex::new(STAFF_LINK).map_err(|e| Error::parse("staff link pattern", e))?;
        let doc = document(&input.content);
        let link = selector("a")?;
        let heading = selector("h3")?;
        let badge = selector("span.gh-badge")?;

        for el in doc.select(&link) {
            let href = el.value().attr("href").unwrap_or_default();
            let Some(username) = re.captures(href).and_then(|c| c.get(1)) else {
                continue;
            };
            info!(%href, "found staff link");

            let mut u = User::new(username.as_str());
            u.name = select_text(el, &heading);
            u.role = select_text(el, &badge);
            a.users.push(u);
        }

        Ok(a)
    }
}
