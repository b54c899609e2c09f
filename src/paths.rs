//! Search-root configuration for wildcard directories
//!
//! Roots come from two places: directories handed over by the host (or CLI
//! flags), and a user-editable `wildcard_paths.json` next to the wildcard
//! directory. The JSON file is parsed leniently: a quoted-string scan
//! instead of a strict parser, so Windows paths with unescaped backslashes
//! still load.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::WildcardError;

/// File name of the user-editable search path list
pub const USER_PATHS_FILE: &str = "wildcard_paths.json";

/// Matches any double-quoted string, tolerating invalid JSON around it
static QUOTED_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// Ordered, de-duplicated set of wildcard search roots
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl SearchRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root, keeping insertion order and dropping duplicates
    pub fn add(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    /// Add every path listed in a user paths file, if it exists
    pub fn add_user_paths_file(&mut self, file: &Path) {
        for path in read_user_paths(file) {
            self.add(path);
        }
    }

    /// Roots that exist on disk, in configuration order
    pub fn existing(&self) -> Vec<PathBuf> {
        self.roots.iter().filter(|r| r.is_dir()).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.roots.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The most specific root containing `file`: the longest root that is an
    /// ancestor of it. Nested roots resolve to the deeper one.
    pub fn owning_root<'a>(roots: &'a [PathBuf], file: &Path) -> Option<&'a Path> {
        roots
            .iter()
            .filter(|r| file.starts_with(r))
            .max_by_key(|r| r.as_os_str().len())
            .map(PathBuf::as_path)
    }
}

/// Create an empty user paths file if none exists yet
pub fn ensure_user_paths_file(file: &Path) -> Result<(), WildcardError> {
    if file.exists() {
        return Ok(());
    }
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    let empty = serde_json::to_string_pretty(&Vec::<String>::new())?;
    fs::write(file, empty)?;
    tracing::info!(path = %file.display(), "created user wildcard paths file");
    Ok(())
}

/// Read the user paths file with the lenient quoted-string scan
fn read_user_paths(file: &Path) -> Vec<PathBuf> {
    let content = match fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "could not read user wildcard paths file");
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    QUOTED_STRING
        .captures_iter(&content)
        .map(|c| c[1].to_string())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}
