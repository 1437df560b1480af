//! Run driver
//!
//! Resolves inputs to ingesters, processes them sequentially with one
//! shared GCP member cache, finalizes and renders each snapshot. Compare
//! mode diffs previously rendered snapshots instead.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use walkdir::WalkDir;
use yacls_gcloud::{GcpClient, Gcloud};
use yacls_model::{finalize, summary, Artifact, Change};

use crate::error::Error;
use crate::platform::{self, Config, GcpMemberCache};
use crate::render;

/// Everything a run needs, after configuration layering
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: Option<PathBuf>,
    pub in_dir: Option<PathBuf>,
    pub kind: Option<String>,
    pub projects: Vec<String>,
    pub gcp_identity_project: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub compare: Option<PathBuf>,
    /// Fixed clock, for reproducible output
    pub generated_at: Option<DateTime<Utc>>,
    /// Fixed operator name, for reproducible output
    pub generated_by: Option<String>,
}

/// Runs ingesters against one GCP client and one member cache
pub struct Runner {
    client: Arc<dyn GcpClient>,
    cache: GcpMemberCache,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(Arc::new(Gcloud::new()))
    }
}

impl Runner {
    pub fn new(client: Arc<dyn GcpClient>) -> Self {
        Self {
            client,
            cache: GcpMemberCache::new(),
        }
    }

    /// The cache shared by every GCP ingestion of this runner
    pub fn member_cache(&self) -> &GcpMemberCache {
        &self.cache
    }

    /// Snapshot mode or compare mode, depending on `opts.compare`
    pub fn run(&self, opts: &RunOptions, out: &mut dyn Write) -> Result<(), Error> {
        if let Some(against) = &opts.compare {
            let changes = compare(opts, against)?;
            let csv = render::changes_csv(&changes)?;
            return out
                .write_all(csv.as_bytes())
                .map_err(|e| Error::io("write stdout", e));
        }

        for a in self.snapshots(opts)? {
            let doc = render::artifact_yaml(&a)?;
            match &opts.out_dir {
                Some(dir) => {
                    write_snapshot(dir, &a, &doc)?;
                }
                None => out
                    .write_all(format!("---\n{doc}").as_bytes())
                    .map_err(|e| Error::io("write stdout", e))?,
            }
        }
        Ok(())
    }

    /// Process and finalize every input, in order
    pub fn snapshots(&self, opts: &RunOptions) -> Result<Vec<Artifact>, Error> {
        let inputs = collect_inputs(opts)?;
        let first_project = opts.projects.first().cloned().unwrap_or_default();
        let mut artifacts = Vec::new();

        for path in &inputs {
            let kind = match &opts.kind {
                Some(kind) => kind.clone(),
                None => platform::suggest_kind(path)?,
            };
            artifacts.push(self.ingest(opts, Some(path), &kind, &first_project)?);
        }

        if inputs.is_empty() {
            let Some(kind) = &opts.kind else {
                return Err(Error::NoInput(
                    "found no inputs or kind to work with".to_string(),
                ));
            };
            let desc = platform::new_with(kind, self.client.clone())?.description();
            if !desc.no_input_required {
                return Err(Error::NoInput(format!(
                    "kind {kind} requires --input or --in-dir"
                )));
            }
            let projects = if opts.projects.is_empty() {
                vec![String::new()]
            } else {
                opts.projects.clone()
            };
            for project in &projects {
                artifacts.push(self.ingest(opts, None, kind, project)?);
            }
        }

        Ok(artifacts)
    }

    /// One ingester run plus finalization
    pub fn ingest(
        &self,
        opts: &RunOptions,
        path: Option<&Path>,
        kind: &str,
        project: &str,
    ) -> Result<Artifact, Error> {
        info!(%kind, %project, path = ?path, "processing");
        let processor = platform::new_with(kind, self.client.clone())?;

        let mut config = match path {
            Some(path) => Config::open(path)?,
            None => Config::default(),
        };
        config.project = project.to_string();
        config.kind = kind.to_string();
        config.gcp_identity_project = opts.gcp_identity_project.clone().unwrap_or_default();
        config.gcp_member_cache = self.cache.clone();
        config.generated_at = opts.generated_at;
        config.generated_by = opts.generated_by.clone();

        let mut a = processor.process(config)?;
        finalize(&mut a);
        Ok(a)
    }
}

/// `--input` followed by the files directly inside `--in-dir`, by name
pub fn collect_inputs(opts: &RunOptions) -> Result<Vec<PathBuf>, Error> {
    let mut inputs: Vec<PathBuf> = opts.input.iter().cloned().collect();
    if let Some(dir) = &opts.in_dir {
        inputs.extend(list_files(dir)?);
    }
    Ok(inputs)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            Error::io(
                format!("read dir {}", dir.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg)),
            )
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        info!(file = %entry.path().display(), "found input file");
        files.push(entry.into_path());
    }
    Ok(files)
}

/// `<kind>.yaml`, or `<kind>_<id>.yaml` for scoped snapshots
pub fn output_name(a: &Artifact) -> String {
    if a.metadata.id.is_empty() {
        format!("{}.yaml", a.metadata.kind)
    } else {
        format!("{}_{}.yaml", a.metadata.kind, a.metadata.id)
    }
}

fn write_snapshot(dir: &Path, a: &Artifact, doc: &str) -> Result<PathBuf, Error> {
    let path = dir.join(output_name(a));
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&path)
        .map_err(|e| Error::io_path("create", &path, e))?;
    file.write_all(doc.as_bytes())
        .map_err(|e| Error::io_path("write", &path, e))?;
    info!(path = %path.display(), bytes = doc.len(), "wrote snapshot");
    Ok(path)
}

fn read_snapshot(path: &Path) -> Result<Artifact, Error> {
    let content = fs::read_to_string(path).map_err(|e| Error::io_path("read", path, e))?;
    render::parse_artifact(&content)
}

/// Changes from the `--input` / `--in-dir` snapshots to their counterparts
/// under `against`
pub fn compare(opts: &RunOptions, against: &Path) -> Result<Vec<Change>, Error> {
    let mut pairs: Vec<(PathBuf, PathBuf)> = Vec::new();
    match &opts.in_dir {
        Some(dir) => {
            for from in list_files(dir)? {
                let Some(name) = from.file_name() else {
                    continue;
                };
                let to = against.join(name);
                pairs.push((from, to));
            }
        }
        None => {
            let Some(from) = &opts.input else {
                return Err(Error::NoInput(
                    "compare needs --input or --in-dir".to_string(),
                ));
            };
            pairs.push((from.clone(), against.to_path_buf()));
        }
    }

    let mut changes = Vec::new();
    for (from, to) in pairs {
        info!(from = %from.display(), to = %to.display(), "comparing");
        changes.extend(summary(&read_snapshot(&from)?, &read_snapshot(&to)?));
    }
    Ok(changes)
}
