//! Inline `[...]_` tag expansion.

use log::debug;
use rivet::scanner::TAG;

use crate::format::{center, rjust};
use crate::state::{Reference, RunningState};

/// Known tags, highest priority first.
const PRIORITY: &[&str] = &[
    "page", "line", "link", "r", "c", "e", "t", "foot", "cite", "#", "@",
];

/// Expand the highest-priority tag in `line`. Lines without a tag are
/// returned unchanged.
pub fn expand(line: &str, state: &mut RunningState) -> String {
    let width = state.section_width;

    let found = PRIORITY.iter().find_map(|name| {
        let marker = format!("[{}]_", name);
        line.find(&marker).map(|at| (*name, at, marker.len()))
    });
    let Some((name, at, len)) = found else {
        // Unknown tag: keep the bracketed word, drop the underscore
        return match TAG.captures(line) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
                format!("{}[{}]{}", &line[..whole.start], &caps[1], &line[whole.end..])
            }
            None => line.to_string(),
        };
    };

    let before = &line[..at];
    let after = &line[at + len..];
    let content = || format!("{}{}", before, after).trim().to_string();
    debug!("expanding [{}]_ tag", name);

    match name {
        "page" => ".".repeat(width),
        "line" => "-".repeat(width),
        "link" => format!("{}link: {}", before, after.trim()),
        "r" => rjust(&content(), width),
        "c" => center(&content(), width),
        "e" => {
            let n = state.next_equation();
            rjust(&format!("{} [{}]", content(), state.report_label(n)), width)
        }
        "t" => {
            let n = state.next_table();
            rjust(&format!("{} [{}]", content(), state.report_label(n)), width)
        }
        "foot" => {
            let n = state.take(Reference::Footnote);
            format!("{}[{}] {}", before, n, after.trim())
        }
        "cite" => {
            let n = state.take(Reference::Citation);
            format!("{}[{}] {}", before, n, after.trim())
        }
        "#" => {
            let n = state.declare(Reference::Footnote);
            format!("{}[{}]{}", before, n, after)
        }
        "@" => {
            let n = state.declare(Reference::Citation);
            format!("{}[{}]{}", before, n, after)
        }
        _ => line.to_string(),
    }
}

/// Expand every tag in `line`, one at a time in priority order.
pub fn expand_all(line: &str, state: &mut RunningState) -> String {
    let count = TAG.find_iter(line).count();
    let mut text = line.to_string();
    for _ in 0..count {
        if !TAG.is_match(&text) {
            break;
        }
        text = expand(&text, state);
    }
    text
}
