//! End-to-end tests for the wildcard processor
//!
//! Each test builds a throwaway wildcard directory and drives the full
//! process() pipeline: variable definitions, tag extraction, expansion.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use wildcarder::paths::SearchRoots;
use wildcarder::processor::{ProcessRequest, WildcardProcessor};

fn write_wildcards(dir: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn processor_with(dir: &Path) -> WildcardProcessor {
    let mut roots = SearchRoots::new();
    roots.add(dir);
    WildcardProcessor::new(roots)
}

fn request(template: &str, seed: u64) -> ProcessRequest {
    ProcessRequest::new(template, seed)
}

#[test]
fn same_seed_same_output() {
    let dir = TempDir::new().unwrap();
    write_wildcards(
        dir.path(),
        &[
            ("colors.txt", "red\ngreen\nblue\n"),
            ("animals.txt", "cat\ndog\nfox\n"),
        ],
    );
    let processor = processor_with(dir.path());

    let template = "a __colors__ __animals__ wearing {a hat|boots|{2$$gloves|scarves|rings}}";
    let first = processor.process(&request(template, 1234)).unwrap();
    let second = processor.process(&request(template, 1234)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn different_seeds_eventually_differ() {
    let dir = TempDir::new().unwrap();
    write_wildcards(dir.path(), &[("colors.txt", "red\ngreen\nblue\nyellow\n")]);
    let processor = processor_with(dir.path());

    let outputs: Vec<String> = (0..20)
        .map(|seed| {
            processor
                .process(&request("__colors__", seed))
                .unwrap()
                .processed_text
        })
        .collect();
    assert!(
        outputs.iter().any(|o| o != &outputs[0]),
        "20 seeds all produced {}",
        outputs[0]
    );
}

#[test]
fn output_is_a_fixed_point_of_expansion() {
    let dir = TempDir::new().unwrap();
    write_wildcards(
        dir.path(),
        &[
            ("outer.txt", "__inner__ and {a|b}\n"),
            ("inner.txt", "nested\n"),
        ],
    );
    let processor = processor_with(dir.path());

    let output = processor.process(&request("__outer__", 7)).unwrap();
    // Feeding the result back in must change nothing
    let again = processor
        .process(&request(&output.processed_text, 99))
        .unwrap();
    assert_eq!(output.processed_text, again.processed_text);
}

#[test]
fn no_match_token_passes_through() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let output = processor.process(&request("__nonexistent__", 0)).unwrap();
    assert_eq!(output.processed_text, "__nonexistent__");
}

#[test]
fn seed_passes_through_unchanged() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());
    let output = processor.process(&request("plain", 987654321)).unwrap();
    assert_eq!(output.seed, 987654321);
}

#[test]
fn variable_references_all_get_the_same_value() {
    let dir = TempDir::new().unwrap();
    write_wildcards(dir.path(), &[("animals.txt", "cat\ndog\nfox\nowl\nbee\n")]);
    let processor = processor_with(dir.path());

    for seed in 0..20 {
        let output = processor
            .process(&request(
                "${animal=!__animals__} the ${animal} met another ${animal}",
                seed,
            ))
            .unwrap();
        let words: Vec<&str> = output.processed_text.split_whitespace().collect();
        assert_eq!(words[1], words[4], "seed {seed}: {}", output.processed_text);
    }
}

#[test]
fn variable_reference_before_definition_resolves() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let output = processor
        .process(&request("the ${x} again ${x=!foo}", 3))
        .unwrap();
    assert_eq!(output.processed_text.trim(), "the foo again");
}

#[test]
fn literal_variable_round_trip() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let output = processor.process(&request("${x=!foo} ${x} ${x}", 0)).unwrap();
    assert_eq!(output.processed_text, " foo foo");
}

#[test]
fn tag_extraction_scenario() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let mut req = request("A [red] B [blue]", 0);
    req.tag_extraction_tags = "[]".to_string();
    let output = processor.process(&req).unwrap();

    assert_eq!(output.processed_text, "A  B ");
    assert_eq!(output.extracted_tags_list, vec!["red", "blue"]);
    assert_eq!(output.extracted_tags_string, "red|blue");
    assert_eq!(output.raw_tags_list, vec!["[red]", "[blue]"]);
    assert_eq!(output.raw_tags_string, "[red][blue]");
}

#[test]
fn tags_are_wildcard_resolved() {
    let dir = TempDir::new().unwrap();
    write_wildcards(dir.path(), &[("colors.txt", "red\n")]);
    let processor = processor_with(dir.path());

    let mut req = request("portrait [__colors__ light]", 5);
    req.tag_extraction_tags = "[]".to_string();
    let output = processor.process(&req).unwrap();

    assert_eq!(output.processed_text, "portrait ");
    assert_eq!(output.extracted_tags_list, vec!["red light"]);
    // Raw keeps the unresolved form
    assert_eq!(output.raw_tags_list, vec!["[__colors__ light]"]);
}

#[test]
fn invalid_tag_pair_is_skipped_but_valid_one_applies() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let mut req = request("x {y} [z]", 0);
    req.tag_extraction_tags = "{},[]".to_string();
    let output = processor.process(&req).unwrap();

    // {} is reserved and skipped; [] still extracts. The surviving {y}
    // group then expands normally in the main text.
    assert_eq!(output.raw_tags_list, vec!["[z]"]);
    assert_eq!(output.processed_text, "x y ");
}

#[test]
fn multi_select_uses_separator() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let mut req = request("{3$$a|b|c}", 11);
    req.multiple_separator = ", ".to_string();
    let output = processor.process(&req).unwrap();

    let mut items: Vec<&str> = output.processed_text.split(", ").collect();
    items.sort_unstable();
    assert_eq!(items, vec!["a", "b", "c"]);
}

#[test]
fn recache_sees_files_added_after_first_use() {
    let dir = TempDir::new().unwrap();
    write_wildcards(dir.path(), &[("colors.txt", "red\n")]);
    let processor = processor_with(dir.path());

    // Populate the caches
    let output = processor.process(&request("__colors__", 0)).unwrap();
    assert_eq!(output.processed_text, "red");

    write_wildcards(dir.path(), &[("animals.txt", "cat\n")]);
    let stale = processor.process(&request("__animals__", 0)).unwrap();
    assert_eq!(stale.processed_text, "__animals__");

    let mut req = request("__animals__", 0);
    req.recache_wildcards = true;
    let fresh = processor.process(&req).unwrap();
    assert_eq!(fresh.processed_text, "cat");
}

#[test]
fn glob_token_aggregates_and_unmatched_glob_passes_through() {
    let dir = TempDir::new().unwrap();
    write_wildcards(
        dir.path(),
        &[
            ("styles-bold.txt", "bold\n"),
            ("styles-soft.txt", "soft\n"),
        ],
    );
    let processor = processor_with(dir.path());

    let mut seen = std::collections::HashSet::new();
    for seed in 0..40 {
        let output = processor.process(&request("__styles-*__", seed)).unwrap();
        seen.insert(output.processed_text);
    }
    assert_eq!(
        seen,
        std::collections::HashSet::from(["bold".to_string(), "soft".to_string()])
    );

    let output = processor.process(&request("__nope-*__", 0)).unwrap();
    assert_eq!(output.processed_text, "__nope-*__");
}

#[test]
fn fuzzy_name_resolves_to_best_file() {
    let dir = TempDir::new().unwrap();
    write_wildcards(
        dir.path(),
        &[
            ("colors.txt", "shallow\n"),
            ("themes/colors.txt", "deep\n"),
        ],
    );
    let processor = processor_with(dir.path());

    // Both files are exact stem matches; the shallower one must win
    let output = processor.process(&request("__colors__", 4)).unwrap();
    assert_eq!(output.processed_text, "shallow");
}

#[test]
fn host_tuple_order_is_fixed() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let mut req = request("A [t] B", 42);
    req.tag_extraction_tags = "[]".to_string();
    let (text, seed, tags, tags_list, raw, raw_list) =
        processor.process(&req).unwrap().into_tuple();

    assert_eq!(text, "A  B");
    assert_eq!(seed, 42);
    assert_eq!(tags, "t");
    assert_eq!(tags_list, vec!["t"]);
    assert_eq!(raw, "[t]");
    assert_eq!(raw_list, vec!["[t]"]);
}

#[test]
fn weighted_choice_bias_holds_end_to_end() {
    let dir = TempDir::new().unwrap();
    let processor = processor_with(dir.path());

    let mut a_count = 0;
    for seed in 0..300 {
        let output = processor.process(&request("{1000::a|1::b}", seed)).unwrap();
        if output.processed_text == "a" {
            a_count += 1;
        }
    }
    assert!(a_count > 270, "expected heavy bias toward a, got {a_count}/300");
}

#[test]
fn variable_defined_from_wildcard_is_stable_within_one_run() {
    let dir = TempDir::new().unwrap();
    write_wildcards(dir.path(), &[("colors.txt", "red\ngreen\nblue\n")]);
    let processor = processor_with(dir.path());

    for seed in [0, 1, 2, 3, 4] {
        let output = processor
            .process(&request("${c=!__colors__} ${c}/${c}", seed))
            .unwrap();
        let text = output.processed_text.trim().to_string();
        let parts: Vec<&str> = text.split('/').collect();
        assert_eq!(parts[0], parts[1], "seed {seed}");
    }
}
