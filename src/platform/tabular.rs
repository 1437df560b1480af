//! Shared helpers for CSV-shaped exports

use serde::de::DeserializeOwned;

use crate::error::Error;

const BOM: &str = "\u{feff}";

/// Decode every record of a CSV export.
///
/// Headers are matched by exact string. A column listed in `required` that
/// is absent from the header row is a schema error; anything the CSV reader
/// rejects is a parse error.
pub(crate) fn read_records<T: DeserializeOwned>(
    content: &str,
    required: &[&str],
) -> Result<Vec<T>, Error> {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::parse("csv header", e))?
        .clone();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Schema(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| Error::parse("csv", e))
}

/// Part of an e-mail address before the `@`
pub(crate) fn local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// `Active` is the unremarkable default and renders as empty
pub(crate) fn status(raw: &str) -> String {
    if raw == "Active" {
        String::new()
    } else {
        raw.to_string()
    }
}
