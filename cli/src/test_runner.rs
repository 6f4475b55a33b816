use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use drill::{Node, Query};
use drill_markdown::{MarkdownOptions, open};
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::query::{format_tokens, walk};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Query tokens: strings select by name, integers by position.
    #[serde(default)]
    pub query: Vec<toml::Value>,

    /// Expected fragment of the result (trimmed comparison).
    #[serde(default)]
    pub expect_fragment: Option<String>,

    /// Substrings that must appear in the fragment of the result.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// If true, the query must find nothing.
    #[serde(default)]
    pub expect_not_found: bool,

    /// Names of the direct child sections of the result, in order. Orphans
    /// are named "".
    #[serde(default)]
    pub expect_sections: Option<Vec<String>>,

    #[serde(default)]
    pub markdown: MarkdownOptions,
}

/// Converts a TOML value to a query token. Other kinds of value are not
/// tokens; a query containing one finds nothing.
fn toml_to_query(value: &toml::Value) -> Option<Query> {
    match value {
        toml::Value::String(s) => Some(Query::Key(s.clone())),
        toml::Value::Integer(n) => isize::try_from(*n).ok().map(Query::Index),
        _ => None,
    }
}

/// Splits a `.test.md` file into its TOML config and the document under test.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let frontmatter = after_open[..close].trim_end_matches('\r');
    let rest = &after_open[close + 4..];
    let document = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(frontmatter).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, document))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".test.md"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description, reason| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };
    let (config, document) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let outcome = match check(&config, document) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Runs the query of `config` against `document`. Returns `Some(reason)` on
/// mismatch.
fn check(config: &TestConfig, document: &str) -> Option<String> {
    let root = open(document, &config.markdown);
    let tokens: Option<Vec<Query>> = config.query.iter().map(toml_to_query).collect();

    let found = match &tokens {
        Some(tokens) => drill::query(root.clone().into_ref(), tokens),
        None => {
            debug!(query = ?config.query, "query holds a non-token value");
            None
        }
    };
    let shown = tokens
        .as_deref()
        .map(format_tokens)
        .unwrap_or_else(|| format!("{:?}", config.query));

    if config.expect_not_found {
        return found.map(|node| {
            format!(
                "expected query [{}] to find nothing, found:\n{}",
                shown,
                node.fragment().trim()
            )
        });
    }
    let Some(found) = found else {
        return Some(format!("query [{}] found nothing", shown));
    };

    let fragment = found.fragment();
    if let Some(expected) = &config.expect_fragment {
        if fragment.trim() != expected.trim() {
            return Some(format!(
                "fragment mismatch\n  expected: {}\n  actual:   {}",
                expected.trim(),
                fragment.trim()
            ));
        }
    }
    for needle in &config.expect_contains {
        if !fragment.contains(needle.as_str()) {
            return Some(format!(
                "fragment does not contain {:?}\n  actual: {}",
                needle,
                fragment.trim()
            ));
        }
    }

    if let Some(expected) = &config.expect_sections {
        // The query found a node, so the tokens are valid and lead somewhere.
        let section = walk(&root, tokens.as_deref().unwrap_or_default()).ok()?;
        let actual: Vec<&str> = section
            .child_sections()
            .map(|(_, s)| s.name.as_str())
            .collect();
        if actual != *expected {
            return Some(format!(
                "section mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    None
}

/// Discovers `.test.md` files grouped by category (directory relative to
/// `root`). Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                continue;
            }
        };
        let is_test = entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.ends_with(".test.md"));
        if !is_test || !entry.file_type().is_file() {
            continue;
        }
        let category = entry
            .path()
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        categories
            .entry(category)
            .or_default()
            .push(entry.into_path());
    }
    categories
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

/// Terminal styling, disabled by `--no-color`.
struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        } else {
            s.to_string()
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }
}

/// Selects the categories named in `requested`, including their
/// subcategories. Everything when `requested` is empty.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Runs all `.test.md` files under `path` (or a single file). If
/// `categories` is non-empty, only tests in those categories run.
/// Returns the exit code: 0 if all pass, 1 otherwise.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };

    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select(&all, &[])
    } else {
        select(&all, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.bold(if cat.is_empty() { "(root)" } else { *cat }));
        }
        for file in *files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
