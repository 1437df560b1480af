use yacls_model::{Artifact, User};

use super::scrape::{document, selector, text};
use super::{source, Config, Description, Processor};
use crate::error::Error;

/// Saved "Members" page of a Cloudflare account
pub struct CloudflareMembers;

impl Processor for CloudflareMembers {
    fn description(&self) -> Description {
        Description {
            kind: "cloudflare",
            name: "Cloudflare Site Permissions",
            steps: vec![
                "Open https://dash.cloudflare.com/",
                "Select your account",
                "Click 'Manage Account'",
                "Click 'Members'",
                "Save this page (Complete)",
                "Collect resulting .html file for analysis (the other files are not necessary)",
                "Execute 'yacls --kind={kind} --input={path}'",
            ],
            matching_filename: Some(r".*Cloudflare.*.html$"),
            ..Default::default()
        }
    }

    fn process(&self, mut config: Config) -> Result<Artifact, Error> {
        let input = source::load(&mut config, &self.description())?;
        let mut a = Artifact::new(input.source.clone());

        let doc = document(&input.content);
        let row_sel = selector("div[role=row]")?;
        let cell = selector("div.c_sx")?;
        let badge = selector("span.c_lf")?;

        for row in doc.select(&row_sel) {
            let mut u = User::default();

            // e-mail address or role
            for el in row.select(&cell) {
                let val = text(el);
                if val.contains('@') {
                    u.account = val;
                } else {
                    u.role = val.split(" - ").next().unwrap_or_default().to_string();
                }
            }

            // account status, then 2FA status
            for (i, el) in row.select(&badge).enumerate() {
                let val = text(el);
                match i {
                    0 => u.deleted = val != "Active",
                    1 => u.two_factor_disabled = val != "Enabled",
                    _ => {}
                }
            }

            if !u.account.is_empty() {
                a.users.push(u);
            }
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let page = r#"<div role="table">
<div role="row"><div class="c_sx">Member</div><div class="c_sx">Roles</div></div>
<div role="row">
  <div class="c_sx">alice@example.com</div>
  <div class="c_sx">Super Administrator - All Privileges</div>
  <span class="c_lf">Active</span><span class="c_lf">Enabled</span>
</div>
<div role="row">
  <div class="c_sx">bob@example.com</div>
  <div class="c_sx">Administrator Read Only</div>
  <span class="c_lf">Invited</span><span class="c_lf">Disabled</span>
</div>
</div>"#;
        let a = CloudflareMembers.process(Config::from_bytes(page)).unwrap();
        assert_eq!(a.users.len(), 2);
        assert_eq!(a.users[0].account, "alice@example.com");
        assert_eq!(a.users[0].role, "Super Administrator");
        assert!(!a.users[0].deleted);
        assert!(!a.users[0].two_factor_disabled);
        assert_eq!(a.users[1].role, "Administrator Read Only");
        assert!(a.users[1].deleted);
        assert!(a.users[1].two_factor_disabled);
    }
}
