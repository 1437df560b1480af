use yacls_model::{Artifact, User};

use super::scrape::{document, select_text, selector};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Saved "People" page of a Pulumi organization
pub struct PulumiPeople;

impl Processor for PulumiPeople {
    fn description(&self) -> Description {
        Description {
            kind: "pulumi",
            name: "Pulumi Site Permissions",
            steps: vec![
                "Open https://app.pulumi.com/",
                "Select your organization",
                "Click 'Settings'",
                "Click 'People'",
                "Save this page (Complete)",
                "Collect resulting .html file for analysis (the other files are not necessary)",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            matching_filename: Some(r"Pulumi.*.html$"),
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let doc = document(&input.content);
        let row_sel = selector(".cdk-row")?;
        let login = selector("a.login")?;
        let name = selector("p.name")?;
        let role = selector("span.ng-star-inserted")?;
        let status = selector("div.invite-status-container")?;

        for row in doc.select(&row_sel) {
            let account = select_text(row, &login);
            if account.is_empty() {
                continue;
            }

            let mut u = User::new(account);
            u.name = select_text(row, &name);
            u.role = select_text(row, &role);
            // the role drop-down repeats every choice
            if u.role.starts_with("member") {
                u.role = "member".to_string();
            }
            u.status = select_text(row, &status);
            a.users.push(u);
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let page = r#"<table>
<tr class="cdk-row"><td><a class="login">alice</a><p class="name">Alice A</p></td>
  <td><span class="ng-star-inserted">admin</span></td></tr>
<tr class="cdk-row"><td><a class="login">bob</a><p class="name">Bob B</p></td>
  <td><span class="ng-star-inserted">membermembermember</span></td>
  <td><div class="invite-status-container">Pending</div></td></tr>
<tr class="cdk-row"><td>header</td></tr>
</table>"#;
        let a = PulumiPeople.process(Config::from_bytes(page)).unwrap();
        assert_eq!(a.users.len(), 2);
        assert_eq!(a.users[0].name, "Alice A");
        assert_eq!(a.users[0].role, "admin");
        assert_eq!(a.users[1].role, "member");
        assert_eq!(a.users[1].status, "Pending");
    }
}
