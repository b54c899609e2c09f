//! Tag/variable orchestration around the expansion engine
//!
//! One `process()` call owns its whole lifecycle: it seeds its own RNG,
//! collects and isolates `${name=!expr}` variable definitions, extracts
//! tag regions, expands what is left, and assembles the fixed six-part
//! output. Only the file/option caches outlive the call.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::WildcardError;
use crate::paths::{self, SearchRoots};
use crate::store::WildcardStore;

/// `${name=!expression}` variable definitions
static VAR_DEFINITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(.*?)=!(.*?)\}").unwrap());

/// Characters that belong to the wildcard grammar and are therefore
/// forbidden as tag delimiters
const RESERVED_DELIMITERS: &str = "(){}|";

/// Typed host-boundary request. The host hands these over as a loose bag
/// of keyword arguments; everything is named, typed and defaulted here.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// The template text to process
    pub wildcard_string: String,
    /// RNG seed; same seed and file set means identical output
    pub seed: u64,
    /// Joins multi-select picks, e.g. `", "` for `{2$$red|green|blue}`
    pub multiple_separator: String,
    /// Rescan wildcard directories and drop option caches before expanding
    pub recache_wildcards: bool,
    /// Comma-separated delimiter pairs for tag extraction, e.g. `"[],<>"`
    pub tag_extraction_tags: String,
}

impl Default for ProcessRequest {
    fn default() -> Self {
        Self {
            wildcard_string: String::new(),
            seed: 0,
            multiple_separator: " ".to_string(),
            recache_wildcards: false,
            tag_extraction_tags: String::new(),
        }
    }
}

impl ProcessRequest {
    pub fn new(wildcard_string: impl Into<String>, seed: u64) -> Self {
        Self {
            wildcard_string: wildcard_string.into(),
            seed,
            ..Self::default()
        }
    }
}

/// The six host outputs, in the host's fixed order
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub processed_text: String,
    /// The request seed, passed through unchanged
    pub seed: u64,
    /// Processed tag contents joined with `|`
    pub extracted_tags_string: String,
    pub extracted_tags_list: Vec<String>,
    /// Raw tags (delimiters included) concatenated with no separator
    pub raw_tags_string: String,
    pub raw_tags_list: Vec<String>,
}

impl ProcessOutput {
    /// The host return tuple, in contract order
    pub fn into_tuple(self) -> (String, u64, String, Vec<String>, String, Vec<String>) {
        (
            self.processed_text,
            self.seed,
            self.extracted_tags_string,
            self.extracted_tags_list,
            self.raw_tags_string,
            self.raw_tags_list,
        )
    }
}

/// The orchestrator: owns the store, processes one template per call
pub struct WildcardProcessor {
    store: WildcardStore,
}

impl WildcardProcessor {
    pub fn new(roots: SearchRoots) -> Self {
        Self {
            store: WildcardStore::new(roots),
        }
    }

    /// Build a processor from host-supplied roots plus the user-editable
    /// paths file, creating that file when missing.
    pub fn from_config(
        base_roots: Vec<PathBuf>,
        user_paths_file: Option<&Path>,
    ) -> Result<Self, WildcardError> {
        let mut roots = SearchRoots::new();
        for root in base_roots {
            roots.add(root);
        }
        if let Some(file) = user_paths_file {
            paths::ensure_user_paths_file(file)?;
            roots.add_user_paths_file(file);
        }
        Ok(Self::new(roots))
    }

    pub fn store(&self) -> &WildcardStore {
        &self.store
    }

    /// Process one template: variable definitions, tag extraction, then
    /// wildcard expansion of the remaining text.
    pub fn process(&self, request: &ProcessRequest) -> Result<ProcessOutput, WildcardError> {
        let mut rng = StdRng::seed_from_u64(request.seed);

        if request.recache_wildcards {
            self.store.recache();
        }

        debug!(seed = request.seed, input = %request.wildcard_string, "processing template");

        // 1. Collect variable definitions and strip their syntax. Every
        // definition is evaluated in isolation before any substitution, so
        // a reference earlier in the text than its definition still works.
        let mut variables = Vec::new();
        for caps in VAR_DEFINITION.captures_iter(&request.wildcard_string) {
            let name = caps[1].trim().to_string();
            let expression = caps[2].to_string();
            let value = self.evaluate_isolated(&expression, &request.multiple_separator, &mut rng)?;
            debug!("defined variable ${{{name}}} = {value}");
            variables.push((name, value));
        }
        let text = VAR_DEFINITION
            .replace_all(&request.wildcard_string, "")
            .into_owned();

        let mut engine = Engine::new(&self.store, request.multiple_separator.clone());
        engine.set_variables(variables);

        // 2. Extract tag regions and expand each one independently
        let (text, raw_tags) = extract_tags(&text, &request.tag_extraction_tags);
        let mut extracted_tags = Vec::with_capacity(raw_tags.len());
        for raw in &raw_tags {
            let inner = strip_delimiters(raw);
            extracted_tags.push(engine.expand(inner, &mut rng)?);
        }

        // 3. Expand the remaining main text
        let processed_text = engine.expand(&text, &mut rng)?;

        Ok(ProcessOutput {
            processed_text,
            seed: request.seed,
            extracted_tags_string: extracted_tags.join("|"),
            extracted_tags_list: extracted_tags,
            raw_tags_string: raw_tags.concat(),
            raw_tags_list: raw_tags,
        })
    }

    /// Expand an expression with a fresh engine and its own derived seed.
    /// Shares only the read-only store with the parent: no RNG position,
    /// no variable scope.
    fn evaluate_isolated(
        &self,
        expression: &str,
        separator: &str,
        parent_rng: &mut StdRng,
    ) -> Result<String, WildcardError> {
        let sub_seed = parent_rng.gen::<u64>();
        let mut sub_rng = StdRng::seed_from_u64(sub_seed);
        let engine = Engine::new(&self.store, separator);
        engine.expand(expression, &mut sub_rng)
    }
}

/// Parse a comma-separated delimiter spec into (start, end) pairs.
/// Pairs that are too short or use reserved grammar characters are
/// skipped with a warning; the rest still apply.
fn parse_delimiter_pairs(spec: &str) -> Vec<(char, char)> {
    let mut pairs = Vec::new();
    for raw_pair in spec.split(',') {
        let raw_pair = raw_pair.trim();
        let chars: Vec<char> = raw_pair.chars().collect();
        if chars.len() < 2 {
            if !raw_pair.is_empty() {
                warn!("tag pair '{raw_pair}' is too short, skipping");
            }
            continue;
        }
        let (start, end) = (chars[0], chars[chars.len() - 1]);
        if RESERVED_DELIMITERS.contains(start) || RESERVED_DELIMITERS.contains(end) {
            warn!("invalid characters in tag pair '{raw_pair}', skipping");
            continue;
        }
        pairs.push((start, end));
    }
    pairs
}

/// Cut every delimiter-bounded region out of `text`.
///
/// Regions are located with one alternation regex over all configured
/// pairs and removed in reverse source order so earlier offsets stay
/// valid; the returned raw tags keep their original left-to-right order
/// and include their delimiters.
fn extract_tags(text: &str, delimiter_spec: &str) -> (String, Vec<String>) {
    if delimiter_spec.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let pairs = parse_delimiter_pairs(delimiter_spec);
    if pairs.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let alternation = pairs
        .iter()
        .map(|(start, end)| {
            format!(
                "{}.*?{}",
                regex::escape(&start.to_string()),
                regex::escape(&end.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("|");
    let re = match Regex::new(&format!("(?s){alternation}")) {
        Ok(re) => re,
        Err(e) => {
            warn!("could not build tag regex from '{delimiter_spec}': {e}");
            return (text.to_string(), Vec::new());
        }
    };

    let matches: Vec<(usize, usize)> = re.find_iter(text).map(|m| (m.start(), m.end())).collect();

    let mut text = text.to_string();
    let mut raw_tags = Vec::with_capacity(matches.len());
    for &(start, end) in matches.iter().rev() {
        raw_tags.insert(0, text[start..end].to_string());
        text.replace_range(start..end, "");
    }

    (text, raw_tags)
}

/// Strip the single-character delimiters off a raw tag
fn strip_delimiters(raw: &str) -> &str {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else { return raw };
    let Some(last) = chars.next_back() else { return raw };
    &raw[first.len_utf8()..raw.len() - last.len_utf8()]
}
