//! Structured tracebacks.
//!
//! Formatted traceback text is parsed line by line into a [`TraceBlock`]:
//! frame headers (`File "...", line N, in func`) collapse with their source
//! statements into [`TraceFrame`] entries, everything else is kept verbatim,
//! and a chaining marker opens a nested block that receives the rest of the
//! trace.
//!
//! JSON shape:
//!
//! ```text
//! [
//!   "Traceback (most recent call last):",
//!   [["app.main.py", "line 45", "handler"], "    foo()"],
//!   "NameError: name 'foo' is not defined",
//!   "During handling of the above exception, another exception occurred:",
//!   [ "Traceback (most recent call last):", ... ]
//! ]
//! ```

use std::path::MAIN_SEPARATOR;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Emitted before the raw input when a frame header cannot be parsed.
pub const NO_MATCH_MARKER: &str = "no match for exception formatter, showing raw input";

/// Suffix of the line that starts a chained exception.
pub const CHAIN_SUFFIX: &str = "another exception occurred:";

static FRAME_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(.*)", (line [0-9]+), in (.+)$"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub location: String,
    /// `line N`
    pub line: String,
    pub function: String,
    pub body: Vec<String>,
}

impl Serialize for TraceFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + self.body.len()))?;
        seq.serialize_element(&(&self.location, &self.line, &self.function))?;
        for statement in &self.body {
            seq.serialize_element(statement)?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceElement {
    Line(String),
    Frame(TraceFrame),
    Block(TraceBlock),
}

impl Serialize for TraceElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TraceElement::Line(line) => serializer.serialize_str(line),
            TraceElement::Frame(frame) => frame.serialize(serializer),
            TraceElement::Block(block) => block.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceBlock(Vec<TraceElement>);

impl TraceBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[TraceElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, element: TraceElement) {
        self.0.push(element);
    }

    /// Frames directly in this block, not in nested ones.
    pub fn frames(&self) -> impl Iterator<Item = &TraceFrame> {
        self.0.iter().filter_map(|e| match e {
            TraceElement::Frame(frame) => Some(frame),
            _ => None,
        })
    }

    /// Plain lines directly in this block.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|e| match e {
            TraceElement::Line(line) => Some(line.as_str()),
            _ => None,
        })
    }

    /// The nested block holding a chained exception, if any.
    pub fn nested(&self) -> Option<&TraceBlock> {
        self.0.iter().find_map(|e| match e {
            TraceElement::Block(block) => Some(block),
            _ => None,
        })
    }
}

impl Serialize for TraceBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.0)
    }
}

/// Parse one formatted traceback chunk.
///
/// Returns the structured fragment and whether the chunk starts a chained
/// exception. `project_dir_name`, when set and present in a frame path,
/// becomes the start of the reported location.
pub fn format_traceback_line(line: &str, project_dir_name: Option<&str>) -> (Vec<TraceElement>, bool) {
    let normalized = line.replace("\r\n", "\n");
    let project_dir_name = project_dir_name.filter(|dir| !dir.is_empty());

    let mut out = Vec::new();
    let mut open_frame: Option<usize> = None;
    let mut in_body = false;
    let mut chained = false;

    for sub_line in normalized.split('\n').filter(|s| !s.is_empty()) {
        if sub_line.trim().starts_with("File ") {
            let located = project_dir_name
                .and_then(|dir| sub_line.find(dir).map(|start| &sub_line[start..]))
                .unwrap_or(sub_line);
            let dotted = located.replace(MAIN_SEPARATOR, ".");

            match FRAME_HEADER_RE.captures(&dotted) {
                Some(caps) => {
                    out.push(TraceElement::Frame(TraceFrame {
                        location: caps[1].to_string(),
                        line: caps[2].to_string(),
                        function: caps[3].to_string(),
                        body: Vec::new(),
                    }));
                    open_frame = Some(out.len() - 1);
                }
                None => {
                    out.push(TraceElement::Line(NO_MATCH_MARKER.to_string()));
                    out.push(TraceElement::Line(dotted.trim().to_string()));
                    out.push(TraceElement::Line(line.to_string()));
                    open_frame = None;
                }
            }
            in_body = true;
        } else if in_body {
            match open_frame.and_then(|i| out.get_mut(i)) {
                Some(TraceElement::Frame(frame)) => frame.body.push(sub_line.to_string()),
                _ => out.push(TraceElement::Line(sub_line.to_string())),
            }
        } else {
            out.push(TraceElement::Line(sub_line.to_string()));
            if sub_line.ends_with(CHAIN_SUFFIX) {
                chained = true;
            }
        }
    }

    (out, chained)
}

/// Parse a full formatted traceback, nesting at every chained exception.
pub fn format_traceback<I, S>(lines: I, project_dir_name: Option<&str>) -> TraceBlock
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // Open blocks, outermost first. Output always goes to the innermost.
    let mut stack = vec![TraceBlock::new()];

    for line in lines {
        let (fragment, chained) = format_traceback_line(line.as_ref(), project_dir_name);
        if let Some(top) = stack.last_mut() {
            top.0.extend(fragment);
        }
        if chained {
            stack.push(TraceBlock::new());
        }
    }

    let mut block = stack.pop().unwrap_or_default();
    while let Some(mut parent) = stack.pop() {
        parent.push(TraceElement::Block(block));
        block = parent;
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Exception, Frame, CONTEXT_MARKER, TRACEBACK_HEADER};
    use serde_json::json;

    fn sep(parts: &[&str]) -> String {
        parts.join(std::path::MAIN_SEPARATOR_STR)
    }

    #[test]
    fn line_without_path_passes_through() {
        let input = sep(&["one", "two", "three", "four"]);
        let (fragment, chained) = format_traceback_line(&input, None);
        assert_eq!(fragment, vec![TraceElement::Line(input.clone())]);
        assert!(!chained);
    }

    #[test]
    fn project_dir_name_truncates_location() {
        let path = sep(&["foo", "bar", "Blah", "blah", "test.foo"]);
        let function = sep(&["two", "three", "four"]);
        let input = format!("File \"{path}\", line 1, in {function}");

        let expected_full = json!([[["File \"foo.bar.Blah.blah.test.foo", "line 1", "two.three.four"]]]);
        for dir in [None, Some("bad project name test")] {
            let (fragment, _) = format_traceback_line(&input, dir);
            assert_eq!(serde_json::to_value(&fragment).unwrap(), expected_full);
        }

        let (fragment, _) = format_traceback_line(&input, Some("blah"));
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!([[["blah.test.foo", "line 1", "two.three.four"]]])
        );
    }

    #[test]
    fn malformed_header_falls_back_to_raw_input() {
        let input = "File test string lalala";
        let (fragment, chained) = format_traceback_line(input, None);
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!([NO_MATCH_MARKER, input, input])
        );
        assert!(!chained);
    }

    #[test]
    fn malformed_indented_header_reports_trimmed_line() {
        let input = "  File garbage\n    stray()\n";
        let (fragment, _) = format_traceback_line(input, None);
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!([NO_MATCH_MARKER, "File garbage", input, "    stray()"])
        );
    }

    #[test]
    fn header_collects_following_statement() {
        let input = format!(
            "  File \"{}\", line 12, in run\n    do_work()\n",
            sep(&["", "srv", "app", "jobs.py"])
        );
        let (fragment, _) = format_traceback_line(&input, Some("app"));
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!([[["app.jobs.py", "line 12", "run"], "    do_work()"]])
        );
    }

    #[test]
    fn chaining_marker_sets_flag() {
        let (fragment, chained) = format_traceback_line(&format!("\n{CONTEXT_MARKER}\n\n"), None);
        assert_eq!(fragment, vec![TraceElement::Line(CONTEXT_MARKER.to_string())]);
        assert!(chained);
    }

    #[test]
    fn flat_trace_has_header_frames_and_final_line() {
        let exc = Exception::new("RuntimeError", "boom")
            .with_frame(Frame::new("/srv/app/a.py", 1, "outer").with_statement("middle()"))
            .with_frame(Frame::new("/srv/app/b.py", 2, "middle").with_statement("inner()"))
            .with_frame(Frame::new("/srv/app/c.py", 3, "inner").with_statement("raise"));

        let block = format_traceback(exc.format_exception(), Some("app"));
        assert_eq!(block.lines().collect::<Vec<_>>(), vec![TRACEBACK_HEADER, "RuntimeError: boom"]);
        assert_eq!(block.frames().count(), 3);
        assert!(block.nested().is_none());
        assert_eq!(block.len(), 5);
    }

    #[test]
    fn chained_trace_nests_after_marker() {
        let file = sep(&["", "home", "ci", "advanced_logger", "tests", "test_traceback_logging.py"]);
        let first = Exception::new("NameError", "name 'foo' is not defined")
            .with_frame(Frame::new(&file, 45, "double_nested_foo").with_statement("foo()"));
        let second = Exception::new("NameError", "name 'foo' is not defined")
            .with_frame(Frame::new(&file, 51, "test_traceback_logging").with_statement("double_nested_foo()"))
            .with_frame(Frame::new(&file, 47, "double_nested_foo").with_statement("nested_foo()"))
            .with_frame(Frame::new(&file, 40, "nested_foo").with_statement("foo()"))
            .during_handling_of(first);

        let block = format_traceback(second.format_exception(), Some("advanced_logger"));
        let location = "advanced_logger.tests.test_traceback_logging.py";

        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!([
                "Traceback (most recent call last):",
                [[location, "line 45", "double_nested_foo"], "    foo()"],
                "NameError: name 'foo' is not defined",
                "During handling of the above exception, another exception occurred:",
                [
                    "Traceback (most recent call last):",
                    [[location, "line 51", "test_traceback_logging"], "    double_nested_foo()"],
                    [[location, "line 47", "double_nested_foo"], "    nested_foo()"],
                    [[location, "line 40", "nested_foo"], "    foo()"],
                    "NameError: name 'foo' is not defined"
                ]
            ])
        );
        assert!(matches!(block.elements().last(), Some(TraceElement::Block(_))));
    }

    #[test]
    fn cause_marker_does_not_nest() {
        let exc = Exception::new("OuterError", "outer").caused_by(Exception::new("InnerError", "inner"));
        let block = format_traceback(exc.format_exception(), None);
        assert!(block.nested().is_none());
        assert_eq!(block.lines().filter(|l| *l == TRACEBACK_HEADER).count(), 2);
    }
}
