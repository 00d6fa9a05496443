//! File plumbing around the codec: script discovery, output naming, and
//! parallel batch sealing.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use luaseal_core::config::SealConfig;
use luaseal_crypto::MasterKey;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One sealed script.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub payload_bytes: usize,
}

/// Result of sealing a directory tree.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub sealed: Vec<SealOutcome>,
    /// Inputs whose output already existed and `overwrite` was off
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.sealed.len() + self.skipped.len() + self.failed.len()
    }
}

/// Collect every script under `root` carrying `config.script_extension`,
/// honouring exclude patterns (matched against file and directory names)
/// and `config.recursive`. Sorted for deterministic order.
pub fn collect_scripts(root: &Path, config: &SealConfig) -> Result<Vec<PathBuf>> {
    let excludes: Vec<glob::Pattern> = config
        .exclude_patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %p, "ignoring invalid exclude pattern: {e}");
                None
            }
        })
        .collect();

    let mut files = Vec::new();
    collect_scripts_inner(root, &mut files, config, &excludes)?;
    files.sort();
    Ok(files)
}

fn collect_scripts_inner(
    dir: &Path,
    out: &mut Vec<PathBuf>,
    config: &SealConfig,
    excludes: &[glob::Pattern],
) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading dir: {}", dir.display()))? {
        let entry = entry.context("reading dir entry")?;
        let path = entry.path();
        let meta = entry.metadata().context("stat dir entry")?;

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if excludes.iter().any(|p| p.matches(name)) {
            debug!(path = %path.display(), "excluded");
            continue;
        }

        if meta.is_dir() {
            if config.recursive {
                collect_scripts_inner(&path, out, config, excludes)?;
            }
        } else if meta.is_file() && has_extension(&path, &config.script_extension) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Where the blob for `input` goes: next to it, or mirrored under `out_dir`
/// relative to `root`, with the extension replaced by `sealed_ext`.
pub fn sealed_path_for(input: &Path, root: &Path, out_dir: Option<&Path>, sealed_ext: &str) -> PathBuf {
    let relative = input.strip_prefix(root).unwrap_or(input);
    let relative = if relative.as_os_str().is_empty() {
        input.file_name().map(PathBuf::from).unwrap_or_default()
    } else {
        relative.to_path_buf()
    };
    match out_dir {
        Some(dir) => dir.join(relative).with_extension(sealed_ext),
        None => root.join(relative).with_extension(sealed_ext),
    }
}

/// Default plaintext path for an opened blob: the sealed extension is
/// swapped for the script extension, any other name gets it appended.
pub fn opened_path_for(blob: &Path, config: &SealConfig) -> PathBuf {
    if has_extension(blob, &config.sealed_extension) {
        blob.with_extension(&config.script_extension)
    } else {
        let mut name = blob.as_os_str().to_owned();
        name.push(".");
        name.push(&config.script_extension);
        PathBuf::from(name)
    }
}

/// Seal one script. Returns `None` when the output exists and `overwrite`
/// is off.
pub fn seal_file(master: &MasterKey, input: &Path, output: &Path, overwrite: bool) -> Result<Option<SealOutcome>> {
    if output.exists() && !overwrite {
        return Ok(None);
    }

    let script = std::fs::read(input).with_context(|| format!("reading script: {}", input.display()))?;
    let blob = luaseal_crypto::seal(master, &script).with_context(|| format!("sealing {}", input.display()))?;
    write_output(output, &blob, true)?;

    debug!(input = %input.display(), output = %output.display(), bytes = script.len(), "script sealed");
    Ok(Some(SealOutcome {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        payload_bytes: script.len(),
    }))
}

/// Seal every script under `root` in parallel, one blob per script.
///
/// Per-file failures are collected in the report rather than aborting the
/// batch.
pub fn seal_tree(
    master: &MasterKey,
    root: &Path,
    out_dir: Option<&Path>,
    config: &SealConfig,
    overwrite: bool,
    progress: Option<&ProgressBar>,
) -> Result<BatchReport> {
    let scripts = collect_scripts(root, config)?;
    info!(root = %root.display(), count = scripts.len(), "sealing script tree");
    if let Some(pb) = progress {
        pb.set_length(scripts.len() as u64);
    }

    let results: Vec<(PathBuf, Result<Option<SealOutcome>>)> = scripts
        .into_par_iter()
        .map(|input| {
            let output = sealed_path_for(&input, root, out_dir, &config.sealed_extension);
            let result = seal_file(master, &input, &output, overwrite);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            (input, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (input, result) in results {
        match result {
            Ok(Some(outcome)) => report.sealed.push(outcome),
            Ok(None) => report.skipped.push(input),
            Err(e) => {
                warn!(input = %input.display(), "seal failed: {e:#}");
                report.failed.push((input, format!("{e:#}")));
            }
        }
    }
    Ok(report)
}

/// Read a blob from disk and verify-then-decrypt it.
pub fn open_file(master: &MasterKey, blob_path: &Path) -> Result<Vec<u8>> {
    let blob = std::fs::read(blob_path).with_context(|| format!("reading blob: {}", blob_path.display()))?;
    luaseal_crypto::open(master, &blob).with_context(|| format!("opening {}", blob_path.display()))
}

/// Write `bytes` to `path` via a temp file in the same directory, so a
/// partially written blob is never observed.
pub fn write_output(path: &Path, bytes: &[u8], overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        anyhow::bail!("refusing to overwrite existing file: {} (use --force)", path.display());
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).with_context(|| format!("creating dir: {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("creating temp file in {}", parent.display()))?;
    tmp.write_all(bytes).context("writing output")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
