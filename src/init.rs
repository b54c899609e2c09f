//! Wildcard directory initialization
//!
//! Creates a starter wildcards/ directory with the user paths file and a
//! couple of sample wildcard files.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::paths::{self, USER_PATHS_FILE};

/// Initialize a wildcards directory at `dir`
pub fn init_wildcards_dir(dir: &Path) -> Result<InitResult> {
    if dir.join(USER_PATHS_FILE).exists() {
        anyhow::bail!("{} already exists in {}", USER_PATHS_FILE, dir.display());
    }

    fs::create_dir_all(dir)?;
    paths::ensure_user_paths_file(&dir.join(USER_PATHS_FILE))?;

    fs::write(dir.join("sample_colors.txt"), SAMPLE_COLORS)?;
    fs::write(dir.join("sample_subjects.txt"), SAMPLE_SUBJECTS)?;

    Ok(InitResult {
        dir: dir.display().to_string(),
        files_created: vec![
            USER_PATHS_FILE.to_string(),
            "sample_colors.txt".to_string(),
            "sample_subjects.txt".to_string(),
        ],
    })
}

pub struct InitResult {
    pub dir: String,
    pub files_created: Vec<String>,
}

const SAMPLE_COLORS: &str = "\
# One option per line; lines starting with # are comments
red
green
blue
{pale|deep} violet
";

const SAMPLE_SUBJECTS: &str = "\
a __sample_colors__ bird
a __sample_colors__ bicycle
an old lighthouse
";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_paths_file_and_samples() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("wildcards");
        let result = init_wildcards_dir(&dir).unwrap();
        assert_eq!(result.files_created.len(), 3);
        assert!(dir.join(USER_PATHS_FILE).exists());
        assert!(dir.join("sample_colors.txt").exists());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("wildcards");
        init_wildcards_dir(&dir).unwrap();
        assert!(init_wildcards_dir(&dir).is_err());
    }
}
