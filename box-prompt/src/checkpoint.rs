//! Checkpoint discovery.

use crate::common::*;

/// File extensions recognized as checkpoint files.
pub const CHECKPOINT_EXTENSIONS: &[&str] = &["pt", "pth"];

/// Resolve a checkpoint path into the list of checkpoint files to be evaluated.
///
/// A directory is taken as a collection of per-fold checkpoints. Files with a
/// checkpoint extension are picked and sorted by file name. Any other path is
/// taken as a single checkpoint file. A missing path is reported as an I/O
/// error.
pub fn resolve_checkpoints(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let metadata = fs::metadata(path)
        .with_context(|| format!("unable to access checkpoint path '{}'", path.display()))?;

    if !metadata.is_dir() {
        return Ok(vec![path.to_owned()]);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("unable to list directory '{}'", path.display()))?
        .map(|entry| -> Result<_> {
            let entry = entry?;
            let is_file = entry.file_type()?.is_file();
            let path = entry.path();
            Ok((is_file && is_checkpoint_file(&path)).then(|| path))
        })
        .filter_map(|result| result.transpose())
        .try_collect()?;
    paths.sort();

    if paths.is_empty() {
        warn!("no checkpoint files found in '{}'", path.display());
    }

    Ok(paths)
}

fn is_checkpoint_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CHECKPOINT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
