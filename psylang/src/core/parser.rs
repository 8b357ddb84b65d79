//! Source decomposition.
//!
//! A program source is split, in this order, into:
//!
//! 1. scheduled tasks `$[<interval>][<code>]`, removed from the text;
//! 2. key bindings `<letter>[<code>]`, removed from what is left;
//! 3. the `showVal()` / `showCell()` toggles, detected on the unmodified source
//!    and then removed;
//! 4. the trimmed remainder, which is the main program.
//!
//! Parsing never fails. A malformed interval becomes a zero interval.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::core::interpreter::matching_close;

const SHOW_VALUES: &str = "showVal()";
const SHOW_CELL: &str = "showCell()";

static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\[(.*?)\]\[(.*?)\]").expect("task pattern"));
static BINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\w)\[(.*?)\]").expect("binding pattern"));

/// How the closing `]` of a task or key-binding body is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketMode {
    /// The first `]` closes the body. A body containing `]` is cut short.
    #[default]
    Lazy,
    /// The `]` that balances the opening `[` closes the body, and a key
    /// letter must not follow another word character (so `Op[..]` is left
    /// alone).
    Balanced,
}

/// Display toggles consumed by the renderer only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToggleFlags {
    /// `showVal()`: overlay each cell's color index.
    pub show_values: bool,
    /// `showCell()`: outline the pointer's cell.
    pub show_cell: bool,
}

/// Upper-cased key name to bound code.
pub type KeyBindings = BTreeMap<String, String>;

/// A `$[interval][code]` block as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    #[serde(rename = "interval_secs", serialize_with = "duration_secs")]
    pub interval: Duration,
    pub code: String,
}

/// Everything a source file declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedProgram {
    pub flags: ToggleFlags,
    pub bindings: KeyBindings,
    /// Tasks in declaration order.
    pub tasks: Vec<TaskSpec>,
    pub main: String,
}

/// Split `source` into flags, bindings, tasks and the main program.
pub fn parse_source(source: &str, mode: BracketMode) -> ParsedProgram {
    let flags = ToggleFlags {
        show_values: source.contains(SHOW_VALUES),
        show_cell: source.contains(SHOW_CELL),
    };

    let (rest, raw_tasks) = match mode {
        BracketMode::Lazy => extract_tasks_lazy(source),
        BracketMode::Balanced => extract_tasks_balanced(source),
    };
    let tasks: Vec<TaskSpec> = raw_tasks
        .into_iter()
        .map(|(interval, code)| TaskSpec {
            interval: parse_interval(&interval),
            code,
        })
        .collect();

    let (rest, bindings) = match mode {
        BracketMode::Lazy => extract_bindings_lazy(&rest),
        BracketMode::Balanced => extract_bindings_balanced(&rest),
    };

    let main = rest
        .replace(SHOW_VALUES, "")
        .replace(SHOW_CELL, "")
        .trim()
        .to_string();

    debug!(
        ?mode,
        bindings = bindings.len(),
        tasks = tasks.len(),
        show_values = flags.show_values,
        show_cell = flags.show_cell,
        main_len = main.len(),
        "parsed source"
    );

    ParsedProgram {
        flags,
        bindings,
        tasks,
        main,
    }
}

/// Interval text as seconds.
///
/// Text that does not parse, or parses to NaN or a negative number, becomes
/// zero. A positive value too large for a `Duration` (including `inf`) becomes
/// `Duration::MAX`, so that task never comes due.
pub fn parse_interval(text: &str) -> Duration {
    match text.trim().parse::<f64>() {
        Ok(secs) if secs >= 0.0 => Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
        _ => {
            warn!(interval = text, "malformed task interval, using zero");
            Duration::ZERO
        }
    }
}

fn extract_tasks_lazy(source: &str) -> (String, Vec<(String, String)>) {
    let tasks = TASK_RE
        .captures_iter(source)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();
    (TASK_RE.replace_all(source, "").into_owned(), tasks)
}

fn extract_bindings_lazy(text: &str) -> (String, KeyBindings) {
    let mut bindings = KeyBindings::new();
    for caps in BINDING_RE.captures_iter(text) {
        bindings.insert(caps[1].to_uppercase(), caps[2].to_string());
    }
    (BINDING_RE.replace_all(text, "").into_owned(), bindings)
}

fn extract_tasks_balanced(source: &str) -> (String, Vec<(String, String)>) {
    let bytes = source.as_bytes();
    let mut rest = String::with_capacity(source.len());
    let mut tasks = Vec::new();
    let mut copied = 0;
    let mut at = 0;
    while at < bytes.len() {
        if bytes[at..].starts_with(b"$[") {
            if let Some((interval, code, end)) = balanced_task_at(source, at) {
                rest.push_str(&source[copied..at]);
                tasks.push((interval.to_string(), code.to_string()));
                copied = end;
                at = end;
                continue;
            }
        }
        at += 1;
    }
    rest.push_str(&source[copied..]);
    (rest, tasks)
}

/// `$[..][..]` starting at `at`: interval text, code text and the offset just
/// past the final `]`.
fn balanced_task_at(source: &str, at: usize) -> Option<(&str, &str, usize)> {
    let interval_start = at + 2;
    let interval_close = matching_close(source, interval_start, b'[', b']')?;
    if source.as_bytes().get(interval_close + 1) != Some(&b'[') {
        return None;
    }
    let code_start = interval_close + 2;
    let code_close = matching_close(source, code_start, b'[', b']')?;
    Some((
        &source[interval_start..interval_close],
        &source[code_start..code_close],
        code_close + 1,
    ))
}

fn extract_bindings_balanced(text: &str) -> (String, KeyBindings) {
    let bytes = text.as_bytes();
    let mut rest = String::with_capacity(text.len());
    let mut bindings = KeyBindings::new();
    let mut copied = 0;
    let mut at = 0;
    while at < bytes.len() {
        if bytes[at] == b'[' {
            if let Some((key_start, key)) = key_before(text, at) {
                if let Some(close) = matching_close(text, at + 1, b'[', b']') {
                    rest.push_str(&text[copied..key_start]);
                    bindings.insert(
                        key.to_uppercase().collect(),
                        text[at + 1..close].to_string(),
                    );
                    copied = close + 1;
                    at = close + 1;
                    continue;
                }
            }
        }
        at += 1;
    }
    rest.push_str(&text[copied..]);
    (rest, bindings)
}

/// The key letter owning a `[` at `open`, with its byte offset. The letter
/// must be a word character that does not itself follow a word character.
fn key_before(text: &str, open: usize) -> Option<(usize, char)> {
    let (key_start, key) = text[..open].char_indices().next_back()?;
    if !is_word(key) {
        return None;
    }
    match text[..key_start].chars().next_back() {
        Some(previous) if is_word(previous) => None,
        _ => Some((key_start, key)),
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn duration_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy(source: &str) -> ParsedProgram {
        parse_source(source, BracketMode::Lazy)
    }

    fn balanced(source: &str) -> ParsedProgram {
        parse_source(source, BracketMode::Balanced)
    }

    #[test]
    fn splits_bindings_tasks_and_main() {
        let parsed = lazy("A[+++]B[---]$[1.0][>]rest-of-program");

        assert_eq!(parsed.bindings.len(), 2);
        assert_eq!(parsed.bindings.get("A").map(String::as_str), Some("+++"));
        assert_eq!(parsed.bindings.get("B").map(String::as_str), Some("---"));
        assert_eq!(
            parsed.tasks,
            vec![TaskSpec {
                interval: Duration::from_secs(1),
                code: ">".to_string(),
            }]
        );
        assert_eq!(parsed.main, "rest-of-program");
        assert!(!parsed.main.contains('[') && !parsed.main.contains(']'));
    }

    #[test]
    fn later_binding_wins() {
        let parsed = lazy("a[+]\nA[--]\n");
        assert_eq!(parsed.bindings.len(), 1);
        assert_eq!(parsed.bindings.get("A").map(String::as_str), Some("--"));
    }

    #[test]
    fn key_names_are_upper_cased() {
        let parsed = lazy("q[>] 7[<] _[.]");
        let keys: Vec<&str> = parsed.bindings.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["7", "Q", "_"]);
        assert_eq!(parsed.main, "");
    }

    #[test]
    fn tasks_keep_declaration_order_and_never_reach_main() {
        let parsed = lazy("$[2][+]++$[0.5][-]");
        let intervals: Vec<f64> = parsed
            .tasks
            .iter()
            .map(|task| task.interval.as_secs_f64())
            .collect();
        assert_eq!(intervals, vec![2.0, 0.5]);
        assert_eq!(parsed.main, "++");
    }

    #[test]
    fn task_body_is_not_read_as_a_binding() {
        let parsed = lazy("$[1][A[+]]");
        // Lazy matching ends the code at the first `]`; the stray `]` remains.
        assert_eq!(parsed.tasks[0].code, "A[+");
        assert!(parsed.bindings.is_empty());
        assert_eq!(parsed.main, "]");
    }

    #[test]
    fn malformed_interval_becomes_zero() {
        for interval in ["abc", "", "-1", "nan", "-inf"] {
            let parsed = lazy(&format!("$[{interval}][+]"));
            assert_eq!(parsed.tasks.len(), 1, "{interval}");
            assert_eq!(parsed.tasks[0].interval, Duration::ZERO, "{interval}");
        }
        assert_eq!(parse_interval(" 0.25 "), Duration::from_millis(250));
    }

    #[test]
    fn huge_interval_saturates_instead_of_zeroing() {
        for interval in ["1e20", "1e30", "inf"] {
            let parsed = lazy(&format!("$[{interval}][+]"));
            assert_eq!(parsed.tasks[0].interval, Duration::MAX, "{interval}");
        }
    }

    #[test]
    fn toggles_are_detected_and_stripped() {
        let parsed = lazy("showVal()\n+>+\nshowCell()\n");
        assert_eq!(
            parsed.flags,
            ToggleFlags {
                show_values: true,
                show_cell: true,
            }
        );
        assert_eq!(parsed.main, "+>+");

        let parsed = lazy("+");
        assert_eq!(parsed.flags, ToggleFlags::default());
    }

    #[test]
    fn bodies_may_span_lines() {
        let parsed = lazy("A[+\n>\n+]\n$[1][\n-\n]");
        assert_eq!(parsed.bindings.get("A").map(String::as_str), Some("+\n>\n+"));
        assert_eq!(parsed.tasks[0].code, "\n-\n");
    }

    #[test]
    fn lazy_mode_reads_opacity_as_a_binding() {
        let parsed = lazy("+Op[100]");
        assert_eq!(parsed.bindings.get("P").map(String::as_str), Some("100"));
        assert_eq!(parsed.main, "+O");
    }

    #[test]
    fn balanced_mode_keeps_nested_brackets() {
        let parsed = balanced("A[Op[100]+]$[1][%[1/3]{+}]+Op[5]");
        assert_eq!(parsed.bindings.get("A").map(String::as_str), Some("Op[100]+"));
        assert_eq!(parsed.bindings.len(), 1);
        assert_eq!(parsed.tasks[0].code, "%[1/3]{+}");
        assert_eq!(parsed.main, "+Op[5]");
    }

    #[test]
    fn balanced_mode_matches_lazy_on_simple_sources() {
        let source = "A[+++]B[---]$[1.0][>]rest-of-program";
        assert_eq!(balanced(source), lazy(source));
    }

    #[test]
    fn balanced_mode_leaves_unclosed_blocks_in_main() {
        let parsed = balanced("A[++ $[1][+");
        assert!(parsed.bindings.is_empty());
        assert!(parsed.tasks.is_empty());
        assert_eq!(parsed.main, "A[++ $[1][+");
    }

    #[test]
    fn balanced_mode_later_binding_wins() {
        let parsed = balanced("A[+] a[-]");
        assert_eq!(parsed.bindings.get("A").map(String::as_str), Some("-"));
        assert_eq!(parsed.main, "");
    }

    #[test]
    fn parse_result_serializes_intervals_as_seconds() {
        let parsed = lazy("$[1.5][>]");
        let json = serde_json::to_value(&parsed).expect("serialize");
        assert_eq!(json["tasks"][0]["interval_secs"], 1.5);
        assert_eq!(json["tasks"][0]["code"], ">");
    }
}
