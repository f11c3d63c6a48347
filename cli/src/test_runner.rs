use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calc::RecordingBackend;
use serde::Deserialize;

use crate::config::Config;
use crate::document::{assemble, split};

const FIXTURE_SUFFIX: &str = ".test.rvt";

#[derive(Debug, Default, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected calc text (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substrings that must each appear in the calc text.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// The first failing string's error must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// Split a fixture into its TOML front matter and the document.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

#[derive(Debug, PartialEq)]
pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

/// Run one fixture document; tables and text files resolve against the
/// fixture's directory.
fn check(config: &TestConfig, source: &str, dir: &Path) -> Option<String> {
    let run = split(source).map_err(|e| e.to_string()).and_then(|strings| {
        let mut ctx = Config::default().context(dir);
        let assembly = assemble(&strings, &mut ctx, &mut RecordingBackend::new(), false);
        match assembly.failures.into_iter().next() {
            Some(failure) => Err(failure.error.to_string()),
            None => Ok(assembly.text),
        }
    });

    let output = match (&config.expect_error, run) {
        (Some(expected), Err(actual)) => {
            return if actual.contains(expected.as_str()) {
                None
            } else {
                Some(format!(
                    "error mismatch\n  expected substring: {}\n  actual error:       {}",
                    expected, actual
                ))
            };
        }
        (Some(expected), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but conversion succeeded",
                expected
            ));
        }
        (None, Err(actual)) => return Some(format!("unexpected error: {}", actual)),
        (None, Ok(output)) => output,
    };

    if let Some(expected) = &config.expect_output {
        let expected = expected.trim();
        let actual = output.trim();
        if expected != actual {
            return Some(format!(
                "output mismatch\n  expected:\n{}\n  actual:\n{}",
                indent(expected),
                indent(actual)
            ));
        }
    }

    for needle in &config.expect_contains {
        if !output.contains(needle.as_str()) {
            return Some(format!(
                "output does not contain \"{}\"\n  actual:\n{}",
                needle,
                indent(output.trim())
            ));
        }
    }
    None
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("invalid test file: {}", e)),
            };
        }
    };

    let dir = path.parent().unwrap_or(Path::new("."));
    let outcome = match check(&config, source, dir) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };

    TestResult {
        path: path.to_path_buf(),
        description: config.description,
        outcome,
    }
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(FIXTURE_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn label(no_color: bool, pass: bool) -> &'static str {
    match (pass, no_color) {
        (true, true) => "PASS",
        (true, false) => "\x1b[32mPASS\x1b[0m",
        (false, true) => "FAIL",
        (false, false) => "\x1b[31mFAIL\x1b[0m",
    }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Run every fixture under `path` (or a single fixture file), optionally
/// restricted to `categories`. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let groups: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if categories.is_empty() {
            all
        } else {
            all.into_iter()
                .filter(|(cat, _)| {
                    categories.iter().any(|req| {
                        let req = req.trim_matches('/');
                        cat == req || cat.starts_with(&format!("{}/", req))
                    })
                })
                .collect()
        }
    };

    if groups.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        eprintln!();
        eprintln!("{}", bold(if cat.is_empty() { "(root)" } else { cat.as_str() }, no_color));

        for file in files {
            let result = run_single_test(file);
            let name = result.description.clone().unwrap_or_else(|| {
                file.file_name()
                    .and_then(|s| s.to_str())
                    .map(|s| s.trim_end_matches(FIXTURE_SUFFIX).to_string())
                    .unwrap_or_else(|| "?".to_string())
            });
            let pass = result.outcome == TestOutcome::Pass;
            eprintln!("  {}  {}", label(no_color, pass), name);
            if pass {
                passed += 1;
            } else {
                failures.push(result);
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
    let failed = failures.len();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let bad = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            bad,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

/// List the fixture categories under `path`.
pub fn list_categories(path: &Path) {
    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for (cat, files) in &categories {
        let name = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", name, files.len());
    }
}
