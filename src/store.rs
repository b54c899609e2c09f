//! Wildcard file discovery and option caching
//!
//! The store owns two caches: the discovered `.txt` file list (rebuilt at
//! first use or on an explicit recache) and per-name option lists (the
//! comment- and blank-stripped lines of one resolved file). Both are safe
//! to share between concurrently running orchestrators.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::WildcardError;
use crate::paths::SearchRoots;
use crate::resolver;

/// Extension wildcard source files must carry
pub const WILDCARD_EXT: &str = "txt";

/// Shared wildcard file list + option cache
pub struct WildcardStore {
    roots: SearchRoots,
    /// Discovered `.txt` files; `None` until the first scan
    files: RwLock<Option<Arc<Vec<PathBuf>>>>,
    /// Option lists keyed by logical name; `None` caches a failed lookup
    options: DashMap<String, Option<Arc<Vec<String>>>>,
}

impl WildcardStore {
    pub fn new(roots: SearchRoots) -> Self {
        Self {
            roots,
            files: RwLock::new(None),
            options: DashMap::new(),
        }
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Existing search roots, in configuration order
    pub fn existing_roots(&self) -> Vec<PathBuf> {
        self.roots.existing()
    }

    /// The discovered file list, scanning on first use
    pub fn files(&self) -> Arc<Vec<PathBuf>> {
        if let Some(files) = self.files.read().expect("file list lock poisoned").as_ref() {
            return Arc::clone(files);
        }
        let mut guard = self.files.write().expect("file list lock poisoned");
        // Another thread may have scanned while we waited for the lock
        if let Some(files) = guard.as_ref() {
            return Arc::clone(files);
        }
        let files = Arc::new(self.scan());
        *guard = Some(Arc::clone(&files));
        files
    }

    /// Rescan all roots and drop every cached option list
    pub fn recache(&self) {
        debug!("re-caching wildcards: reloading search roots and re-scanning files");
        let files = Arc::new(self.scan());
        *self.files.write().expect("file list lock poisoned") = Some(files);
        self.options.clear();
    }

    /// Recursively collect `.txt` files under every existing root
    fn scan(&self) -> Vec<PathBuf> {
        let mut all_files = Vec::new();
        for root in self.existing_roots() {
            let before = all_files.len();
            for entry in WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(WILDCARD_EXT)
                {
                    all_files.push(path.to_path_buf());
                }
            }
            debug!(root = %root.display(), files = all_files.len() - before, "scanned wildcard root");
        }
        all_files
    }

    /// The option list for a (non-glob) wildcard name.
    ///
    /// Resolves the name against the file list via the best-match scorer,
    /// reads and caches the file's lines, and caches failed resolutions so
    /// repeated lookups of an unknown name stay cheap.
    pub fn options(&self, name: &str) -> Result<Option<Arc<Vec<String>>>, WildcardError> {
        if let Some(cached) = self.options.get(name) {
            return Ok(cached.value().clone());
        }

        let files = self.files();
        let roots = self.existing_roots();
        let resolved = resolver::find_best_match(name, &files, &roots).map(Path::to_path_buf);

        let entry = match resolved {
            Some(path) => Some(Arc::new(read_option_lines(&path)?)),
            None => None,
        };
        self.options.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    /// The combined option pool of every file matching a glob pattern.
    ///
    /// The pattern is matched against each file's root-relative path at any
    /// directory depth. Matched paths are sorted for determinism and their
    /// pools concatenated without de-duplication, so a line appearing in
    /// several files is proportionally more likely to be drawn.
    pub fn glob_pool(&self, pattern: &str) -> Result<Vec<String>, WildcardError> {
        let compiled = match Pattern::new(pattern) {
            Ok(p) => p,
            Err(e) => {
                warn!("invalid glob pattern '{pattern}': {e}");
                return Ok(Vec::new());
            }
        };
        let match_options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };

        let files = self.files();
        let roots = self.existing_roots();

        let mut matched: BTreeSet<PathBuf> = BTreeSet::new();
        for file in files.iter() {
            let rel = match SearchRoots::owning_root(&roots, file) {
                Some(root) => file.strip_prefix(root).unwrap_or(file),
                None => file.as_path(),
            };
            // Try the relative path and every suffix of it, so the pattern
            // matches at any depth below the root
            let mut probe = Some(rel);
            while let Some(p) = probe {
                if compiled.matches_path_with(p, match_options) {
                    matched.insert(file.clone());
                    break;
                }
                probe = strip_first_component(p);
            }
        }

        if matched.is_empty() {
            warn!("glob pattern '{pattern}' did not match any files");
            return Ok(Vec::new());
        }
        debug!(
            "glob pattern '{pattern}' matched {} files: {:?}",
            matched.len(),
            matched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()
        );

        let mut pool = Vec::new();
        for file in matched {
            let name = self.logical_name(&file, &roots);
            let lines = match self.options.get(&name).map(|e| e.value().clone()) {
                Some(cached) => cached,
                None => {
                    let lines = Arc::new(read_option_lines(&file)?);
                    self.options.insert(name, Some(Arc::clone(&lines)));
                    Some(lines)
                }
            };
            if let Some(lines) = lines {
                pool.extend(lines.iter().cloned());
            }
        }
        Ok(pool)
    }

    /// Root-relative path with the extension stripped, `/`-separated
    fn logical_name(&self, file: &Path, roots: &[PathBuf]) -> String {
        let rel = match SearchRoots::owning_root(roots, file) {
            Some(root) => file.strip_prefix(root).unwrap_or(file),
            None => file,
        };
        let rel = rel.with_extension("");
        rel.to_string_lossy().replace('\\', "/")
    }
}

fn strip_first_component(path: &Path) -> Option<&Path> {
    let mut components = path.components();
    components.next()?;
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Read one wildcard file into its option lines.
///
/// Lines are stripped of trailing CR/LF; blank lines and lines whose first
/// non-whitespace character is `#` are dropped. Files are read as UTF-8
/// with a latin-1 fallback for the odd legacy file.
fn read_option_lines(path: &Path) -> Result<Vec<String>, WildcardError> {
    let bytes = fs::read(path).map_err(|source| WildcardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                path = %path.display(),
                "could not decode as UTF-8, falling back to latin-1"
            );
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    Ok(content
        .lines()
        .filter(|line| !line.is_empty() && !line.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect())
}
