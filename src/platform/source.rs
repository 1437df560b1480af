//! Source factory
//!
//! Reads the raw export and builds the provenance header every artifact
//! starts from.

use std::io::Read;

use chrono::{DateTime, Local, Utc};
use yacls_model::{Source, SOURCE_DATE_FORMAT};

use super::{Config, Description};
use crate::error::Error;

/// Provenance header plus the raw bytes of the export
#[derive(Debug, Clone)]
pub struct Input {
    pub source: Source,
    pub content: Vec<u8>,
}

impl Input {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Consume the configured reader and stat the configured path.
///
/// `source_date` is the input's modification date, or today when there is
/// no input file.
pub fn load(config: &mut Config, desc: &Description) -> Result<Input, Error> {
    let mut content = Vec::new();
    if let Some(mut reader) = config.reader.take() {
        reader
            .read_to_end(&mut content)
            .map_err(|e| Error::io("readall", e))?;
    }

    let generated_at = config.generated_at.unwrap_or_else(Utc::now);
    let mtime: DateTime<Local> = match &config.path {
        Some(path) => {
            let modified = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .map_err(|e| Error::io_path("stat", path, e))?;
            modified.into()
        }
        None => generated_at.with_timezone(&Local),
    };

    let source = Source {
        kind: desc.kind.to_string(),
        name: desc.name.to_string(),
        source_date: mtime.format(SOURCE_DATE_FORMAT).to_string(),
        generated_at,
        generated_by: config.generated_by.clone().unwrap_or_else(current_username),
        process: render_steps(&desc.steps, config, desc.kind),
        ..Default::default()
    };

    Ok(Input { source, content })
}

/// OS account name of the current process
pub fn current_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Substitute `{path}`, `{project}` and `{kind}` in each step.
///
/// Missing values render as `<path>` / `<project>` so the instructions stay
/// readable.
pub fn render_steps(steps: &[&str], config: &Config, kind: &str) -> Vec<String> {
    let path = config
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "<path>".to_string());
    let project = if config.project.is_empty() {
        "<project>"
    } else {
        config.project.as_str()
    };
    let kind = if config.kind.is_empty() {
        kind
    } else {
        config.kind.as_str()
    };

    steps
        .iter()
        .map(|s| {
            s.replace("{path}", &path)
                .replace("{project}", project)
                .replace("{kind}", kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn desc() -> Description {
        Description {
            kind: "demo",
            name: "Demo Members",
            steps: vec!["Open the page", "Execute 'yacls --kind={kind} --input={path} --project={project}'"],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_placeholders_for_missing_values() {
        let steps = render_steps(&desc().steps, &Config::default(), "demo");
        assert_eq!(steps[0], "Open the page");
        assert_eq!(
            steps[1],
            "Execute 'yacls --kind=demo --input=<path> --project=<project>'"
        );
    }

    #[test]
    fn test_render_substitutes_values() {
        let config = Config {
            path: Some(PathBuf::from("in/demo.csv")),
            project: "prod".to_string(),
            ..Default::default()
        };
        let steps = render_steps(&desc().steps, &config, "demo");
        assert_eq!(steps[1], "Execute 'yacls --kind=demo --input=in/demo.csv --project=prod'");
    }

    #[test]
    fn test_load_reads_content_and_fixtures() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut config = Config::from_bytes("a,b\n1,2\n");
        config.generated_at = Some(at);
        config.generated_by = Some("auditor".to_string());

        let input = load(&mut config, &desc()).unwrap();
        assert_eq!(input.text(), "a,b\n1,2\n");
        assert_eq!(input.source.kind, "demo");
        assert_eq!(input.source.name, "Demo Members");
        assert_eq!(input.source.generated_at, at);
        assert_eq!(input.source.generated_by, "auditor");
        assert_eq!(
            input.source.source_date,
            at.with_timezone(&Local).format(SOURCE_DATE_FORMAT).to_string()
        );
        assert!(config.reader.is_none());
    }

    #[test]
    fn test_load_stat_failure_is_io_error() {
        let mut config = Config {
            path: Some(PathBuf::from("/nonexistent/export.csv")),
            ..Default::default()
        };
        let err = load(&mut config, &desc()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }

    #[test]
    fn test_load_uses_file_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.csv");
        std::fs::write(&path, "x\n").unwrap();

        let mut config = Config::open(&path).unwrap();
        let input = load(&mut config, &desc()).unwrap();
        let modified: DateTime<Local> = std::fs::metadata(&path).unwrap().modified().unwrap().into();
        assert_eq!(input.source.source_date, modified.format(SOURCE_DATE_FORMAT).to_string());
        assert_eq!(input.content, b"x\n");
    }
}
