//! Exceptions with call-stack frames.
//!
//! An [`Exception`] is the traceback-carrying error the exception logger
//! consumes. It renders to the standard formatted traceback text (one string
//! per chunk, chunks may span several lines), which the traceback formatter
//! then parses back into structure.

use std::fmt;

/// First line of every formatted traceback.
pub const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";

/// Separates an exception from the one raised while handling it.
pub const CONTEXT_MARKER: &str =
    "During handling of the above exception, another exception occurred:";

/// Separates an exception from the one it directly caused.
pub const CAUSE_MARKER: &str =
    "The above exception was the direct cause of the following exception:";

/// One call-stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Source statement executing in this frame, if known.
    pub statement: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            statement: None,
        }
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    fn format(&self) -> String {
        let mut out = format!(
            "  File \"{}\", line {}, in {}\n",
            self.file, self.line, self.function
        );
        if let Some(statement) = &self.statement {
            out.push_str("    ");
            out.push_str(statement.trim());
            out.push('\n');
        }
        out
    }
}

/// Capture a [`Frame`] for the current source location.
///
/// `frame!()` records file, line and enclosing function; `frame!("stmt")`
/// also attaches the statement text.
#[macro_export]
macro_rules! frame {
    () => {{
        fn __advlog_here() {}
        let name = $crate::exception::type_name_of(__advlog_here);
        let function = name.strip_suffix("::__advlog_here").unwrap_or(name);
        $crate::Frame::new(file!(), line!(), $crate::exception::short_path(function))
    }};
    ($statement:expr) => {
        $crate::frame!().with_statement($statement)
    };
}

#[doc(hidden)]
pub fn type_name_of<T>(_: T) -> &'static str {
    std::any::type_name::<T>()
}

/// Last path segment, ignoring generic arguments and closure suffixes.
#[doc(hidden)]
pub fn short_path(path: &str) -> &str {
    let path = path.split('<').next().unwrap_or(path);
    let path = path.trim_end_matches("::{{closure}}");
    path.rsplit("::").next().unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    type_name: String,
    message: String,
    frames: Vec<Frame>,
    context: Option<Box<Exception>>,
    cause: Option<Box<Exception>>,
}

impl Exception {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            frames: Vec::new(),
            context: None,
            cause: None,
        }
    }

    /// Append a frame. Frames are ordered outermost call first.
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Mark this exception as raised while `context` was being handled.
    pub fn during_handling_of(mut self, context: Exception) -> Self {
        self.context = Some(Box::new(context));
        self
    }

    /// Mark this exception as directly caused by `cause`.
    pub fn caused_by(mut self, cause: Exception) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Convert an error and its `source()` chain. Each source becomes the
    /// cause of the error above it. Only the outermost error has a known
    /// type name; sources are labelled `Error`.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let mut chain: Vec<String> = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            chain.push(inner.to_string());
            source = inner.source();
        }

        let root = chain
            .into_iter()
            .rev()
            .fold(None::<Exception>, |cause, message| {
                let exc = Exception::new("Error", message);
                Some(match cause {
                    Some(cause) => exc.caused_by(cause),
                    None => exc,
                })
            });

        let exc = Exception::new(error_type_name::<E>(), err.to_string());
        match root {
            Some(cause) => exc.caused_by(cause),
            None => exc,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn context(&self) -> Option<&Exception> {
        self.context.as_deref()
    }

    pub fn cause(&self) -> Option<&Exception> {
        self.cause.as_deref()
    }

    /// Render the traceback, earliest chained exception first.
    pub fn format_exception(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.format_into(&mut lines);
        lines
    }

    fn format_into(&self, lines: &mut Vec<String>) {
        if let Some(cause) = &self.cause {
            cause.format_into(lines);
            lines.push(format!("\n{CAUSE_MARKER}\n\n"));
        } else if let Some(context) = &self.context {
            context.format_into(lines);
            lines.push(format!("\n{CONTEXT_MARKER}\n\n"));
        }

        lines.push(format!("{TRACEBACK_HEADER}\n"));
        lines.extend(self.frames.iter().map(Frame::format));
        if self.message.is_empty() {
            lines.push(format!("{}\n", self.type_name));
        } else {
            lines.push(format!("{}: {}\n", self.type_name, self.message));
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .or(self.context.as_deref())
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<&anyhow::Error> for Exception {
    fn from(err: &anyhow::Error) -> Self {
        let mut messages: Vec<String> = err.chain().map(ToString::to_string).collect();
        let outer = if messages.is_empty() {
            err.to_string()
        } else {
            messages.remove(0)
        };

        let cause = messages.into_iter().rev().fold(None::<Exception>, |cause, message| {
            let exc = Exception::new("Error", message);
            Some(match cause {
                Some(cause) => exc.caused_by(cause),
                None => exc,
            })
        });

        let exc = Exception::new("Error", outer);
        match cause {
            Some(cause) => exc.caused_by(cause),
            None => exc,
        }
    }
}

fn error_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    if full.starts_with("dyn ") {
        return "Error".to_string();
    }
    short_path(full).to_string()
}
