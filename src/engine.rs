//! Fixed-point wildcard expansion
//!
//! The engine repeatedly rewrites the text until a pass changes nothing:
//! variable references first, then the innermost `{...}` choice groups,
//! then `__name__` file wildcards. Each substitution is a strict textual
//! replacement, so expansion terminates once all resolvable syntax is gone;
//! unknown tokens stay verbatim in the output.
//!
//! A wildcard file whose lines keep reintroducing unresolved syntax would
//! expand forever. That is a data error in the wildcard set, deliberately
//! not capped here.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::WildcardError;
use crate::store::WildcardStore;

/// Innermost brace groups only: no nested braces inside the match
static BRACE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());
/// `__name__` tokens, including glob metacharacters in the name
static FILE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([a-zA-Z0-9_./\\*?\[\]-]+?)__").unwrap());
/// Comment suffix inside a brace group (to end of line)
static GROUP_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#.*").unwrap());
/// Line continuations: a newline plus surrounding indentation
static LINE_JOIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());
/// Ranged multi-select prefix: `A-B$$rest`
static RANGE_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-(\d+)\$\$(.*)$").unwrap());
/// Fixed multi-select prefix: `N$$rest`
static FIXED_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\$\$(.*)$").unwrap());
/// Weighted option prefix: `W::option`
static OPTION_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)::(.*)$").unwrap());

/// Expansion engine over one store, with the variable bindings and
/// separator of a single orchestration run
pub struct Engine<'a> {
    store: &'a WildcardStore,
    separator: String,
    /// `${name}` bindings in definition order
    variables: Vec<(String, String)>,
}

impl<'a> Engine<'a> {
    pub fn new(store: &'a WildcardStore, separator: impl Into<String>) -> Self {
        Self {
            store,
            separator: separator.into(),
            variables: Vec::new(),
        }
    }

    pub fn set_variables(&mut self, variables: Vec<(String, String)>) {
        self.variables = variables;
    }

    /// Expand `text` to its fixed point: substitute variables, innermost
    /// choice groups and file wildcards until a pass changes nothing.
    pub fn expand(&self, text: &str, rng: &mut StdRng) -> Result<String, WildcardError> {
        let mut text = text.to_string();
        loop {
            let before = text.clone();

            text = self.substitute_variables(&text);
            text = replace_each(&BRACE_GROUP, &text, |caps| {
                self.evaluate_choice_group(&caps[1], rng)
            })?;
            text = replace_each(&FILE_TOKEN, &text, |caps| {
                self.evaluate_file_token(&caps[0], &caps[1], rng)
            })?;

            if text == before {
                return Ok(text);
            }
        }
    }

    fn substitute_variables(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (name, value) in &self.variables {
            text = text.replace(&format!("${{{name}}}"), value);
        }
        text
    }

    /// Evaluate one `{...}` group: comments stripped, optional `N$$` or
    /// `A-B$$` multi-select prefix, `|`-separated options with optional
    /// `W::` weights. Selected options are recursively expanded and joined
    /// with the configured separator.
    fn evaluate_choice_group(
        &self,
        content: &str,
        rng: &mut StdRng,
    ) -> Result<String, WildcardError> {
        let cleaned = GROUP_COMMENT.replace_all(content, "");
        let cleaned = LINE_JOIN.replace_all(&cleaned, "");

        let (count, body) = if let Some(caps) = RANGE_COUNT.captures(&cleaned) {
            let min: usize = caps[1].parse().unwrap_or(1);
            let max: usize = caps[2].parse().unwrap_or(min);
            let count = if min <= max { rng.gen_range(min..=max) } else { min };
            (count, caps[3].to_string())
        } else if let Some(caps) = FIXED_COUNT.captures(&cleaned) {
            (caps[1].parse().unwrap_or(1), caps[2].to_string())
        } else {
            (1, cleaned.to_string())
        };

        let mut choices = Vec::new();
        let mut weights = Vec::new();
        for option in body.split('|') {
            match OPTION_WEIGHT.captures(option) {
                Some(caps) => {
                    weights.push(caps[1].parse::<f64>().unwrap_or(1.0));
                    choices.push(caps[2].to_string());
                }
                None => {
                    weights.push(1.0);
                    choices.push(option.to_string());
                }
            }
        }

        let selected = select_options(&choices, &weights, count, rng);

        let mut expanded = Vec::with_capacity(selected.len());
        for option in &selected {
            expanded.push(self.expand(option, rng)?);
        }
        let result = expanded.join(&self.separator);

        debug!("evaluated {{{content}}} -> {result}");
        Ok(result)
    }

    /// Evaluate one `__name__` token: glob names aggregate every matching
    /// file's pool, plain names resolve to the single best-matching file.
    /// An unresolvable token is returned verbatim.
    fn evaluate_file_token(
        &self,
        token: &str,
        name: &str,
        rng: &mut StdRng,
    ) -> Result<String, WildcardError> {
        if name.contains(['*', '?', '[', ']']) {
            let pool = self.store.glob_pool(name)?;
            return match pool.choose(rng) {
                Some(line) => {
                    let chosen = self.expand(line, rng)?;
                    debug!("evaluated glob {token} -> {chosen}");
                    Ok(chosen)
                }
                None => Ok(token.to_string()),
            };
        }

        let options = self.store.options(name)?;
        let line = options.as_ref().and_then(|o| o.choose(rng).cloned());
        match line {
            Some(line) => {
                let chosen = self.expand(&line, rng)?;
                debug!("evaluated {token} -> {chosen}");
                Ok(chosen)
            }
            None => Ok(token.to_string()),
        }
    }
}

/// Select `count` options without replacement within one pass.
///
/// When `count` exceeds the pool, the whole unique-draw pass repeats until
/// enough items are collected: repeats only happen once the pool has been
/// exhausted in the current pass. Uniform weights use an unweighted sample;
/// otherwise options are drawn one at a time, each draw removing the chosen
/// option and weight from a working copy.
fn select_options(
    choices: &[String],
    weights: &[f64],
    count: usize,
    rng: &mut StdRng,
) -> Vec<String> {
    if choices.is_empty() {
        return Vec::new();
    }

    let uniform = weights.iter().all(|w| *w == 1.0);
    let mut selected = Vec::with_capacity(count);
    let mut remaining = count;

    while remaining > 0 {
        let num_to_pick = remaining.min(choices.len());

        if uniform {
            let picked = rand::seq::index::sample(rng, choices.len(), num_to_pick);
            selected.extend(picked.iter().map(|i| choices[i].clone()));
        } else {
            let mut pool: Vec<&String> = choices.iter().collect();
            let mut pool_weights = weights.to_vec();
            for _ in 0..num_to_pick {
                let idx = weighted_index(&pool_weights, rng);
                selected.push(pool.remove(idx).clone());
                pool_weights.remove(idx);
            }
        }

        remaining -= num_to_pick;
    }

    selected
}

/// One weighted draw over the remaining pool
fn weighted_index(weights: &[f64], rng: &mut StdRng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut target = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        target -= w;
        if target < 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

/// `Regex::replace_all` with a fallible replacer
fn replace_each<F>(re: &Regex, text: &str, mut eval: F) -> Result<String, WildcardError>
where
    F: FnMut(&Captures) -> Result<String, WildcardError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let m = caps.get(0).expect("capture 0 always present");
        out.push_str(&text[last..m.start()]);
        out.push_str(&eval(&caps)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
