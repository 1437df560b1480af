//! Text renderings of snapshots and change lists

use yacls_model::{Artifact, Change};

use crate::error::Error;

const CHANGE_HEADER: [&str; 6] = ["kind", "id", "entity", "mod", "from_date", "to_date"];

/// YAML document for a finalized artifact.
///
/// A blank line separates consecutive `- account` entries so individual
/// principals stand out when reviewing.
pub fn artifact_yaml(a: &Artifact) -> Result<String, Error> {
    let raw = serde_yaml::to_string(a).map_err(|e| Error::parse("yaml", e))?;

    let mut out = String::with_capacity(raw.len() + raw.len() / 16);
    let mut prev: Option<&str> = None;
    for line in raw.lines() {
        let opens_entry = line.trim_start().starts_with("- account:");
        if opens_entry && prev.is_some_and(|p| !p.trim_end().ends_with(':')) {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
        prev = Some(line);
    }
    Ok(out)
}

/// Parse a previously rendered snapshot
pub fn parse_artifact(content: &str) -> Result<Artifact, Error> {
    serde_yaml::from_str(content).map_err(|e| Error::parse("yaml", e))
}

/// CSV document with one row per change; the header is always present
pub fn changes_csv(changes: &[Change]) -> Result<String, Error> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    w.write_record(CHANGE_HEADER)
        .map_err(|e| Error::parse("csv", e))?;
    for c in changes {
        w.serialize(c).map_err(|e| Error::parse("csv", e))?;
    }
    let bytes = w
        .into_inner()
        .map_err(|e| Error::io("csv flush", e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
