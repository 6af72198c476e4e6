//! Log envelopes and per-call options.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use advlog_core::Level;

use crate::exception::Exception;
use crate::sampling::Sampling;
use crate::traceback::TraceBlock;
use crate::value::LogValue;

/// `e` value when no exception is supplied.
pub const NO_EXCEPTION: &str = "None";

/// Traceback value used when no exception object is supplied.
pub const TRACEBACK_NOT_PROVIDED: &str = "traceback not provided";

/// Message logged when a payload cannot be encoded.
pub const ENCODE_FAILURE_MSG: &str = "Error while converting log msg to JSON";

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub name: String,
    #[serde(serialize_with = "crate::encoder::serialize_timestamp")]
    pub time: DateTime<Utc>,
    pub level: String,
}

/// `{"meta": {"name", "time", "level"}, "msg": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct LogEnvelope {
    pub meta: Meta,
    pub msg: LogValue,
}

impl LogEnvelope {
    pub fn new(name: impl Into<String>, level: Level, msg: LogValue) -> Self {
        Self {
            meta: Meta {
                name: name.into(),
                time: Utc::now(),
                level: level.name().into_owned(),
            },
            msg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traceback {
    Formatted(TraceBlock),
    NotProvided,
}

impl Traceback {
    pub fn block(&self) -> Option<&TraceBlock> {
        match self {
            Traceback::Formatted(block) => Some(block),
            Traceback::NotProvided => None,
        }
    }
}

impl Serialize for Traceback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Traceback::Formatted(block) => block.serialize(serializer),
            Traceback::NotProvided => serializer.serialize_str(TRACEBACK_NOT_PROVIDED),
        }
    }
}

/// `{"e": ..., "traceback": ..., "msg": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionEnvelope {
    /// String form of the exception.
    pub e: String,
    pub traceback: Traceback,
    pub msg: Option<String>,
}

/// What the caller passed as the exception of an exception-info call.
#[derive(Debug, Clone)]
pub enum ExceptionArg<'a> {
    None,
    Message(Cow<'a, str>),
    Exception(Cow<'a, Exception>),
}

impl ExceptionArg<'_> {
    /// String form stored in the envelope's `e` field.
    pub fn describe(&self) -> String {
        match self {
            ExceptionArg::None => NO_EXCEPTION.to_string(),
            ExceptionArg::Message(message) => message.to_string(),
            ExceptionArg::Exception(exc) => exc.to_string(),
        }
    }
}

impl<'a> From<&'a Exception> for ExceptionArg<'a> {
    fn from(exc: &'a Exception) -> Self {
        ExceptionArg::Exception(Cow::Borrowed(exc))
    }
}

impl From<Exception> for ExceptionArg<'_> {
    fn from(exc: Exception) -> Self {
        ExceptionArg::Exception(Cow::Owned(exc))
    }
}

impl From<&anyhow::Error> for ExceptionArg<'_> {
    fn from(err: &anyhow::Error) -> Self {
        ExceptionArg::Exception(Cow::Owned(Exception::from(err)))
    }
}

impl<'a> From<&'a str> for ExceptionArg<'a> {
    fn from(message: &'a str) -> Self {
        ExceptionArg::Message(Cow::Borrowed(message))
    }
}

impl From<String> for ExceptionArg<'_> {
    fn from(message: String) -> Self {
        ExceptionArg::Message(Cow::Owned(message))
    }
}

impl<'a, T: Into<ExceptionArg<'a>>> From<Option<T>> for ExceptionArg<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(ExceptionArg::None, Into::into)
    }
}

/// Controls for a single log call.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Hand the record to the emitter.
    pub log_it: bool,
    /// Return the rendered record to the caller.
    pub return_it: bool,
    pub sampling: Sampling,
    pub args: Vec<LogValue>,
    pub exc_info: Option<Exception>,
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
    pub stack_info: bool,
    /// Pretty-print exception records with this many spaces.
    pub indent: Option<usize>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_it: true,
            return_it: false,
            sampling: Sampling::default(),
            args: Vec::new(),
            exc_info: None,
            extra: None,
            stack_info: false,
            indent: None,
        }
    }
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and return the record without emitting it.
    pub fn capture() -> Self {
        Self::default().log_it(false).return_it(true)
    }

    pub fn log_it(mut self, log_it: bool) -> Self {
        self.log_it = log_it;
        self
    }

    pub fn return_it(mut self, return_it: bool) -> Self {
        self.return_it = return_it;
        self
    }

    pub fn sample(mut self, likelihood: u32, out_of: u32) -> Self {
        self.sampling = Sampling::new(likelihood, out_of);
        self
    }

    pub fn arg(mut self, arg: impl Into<LogValue>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn exc_info(mut self, exc: Exception) -> Self {
        self.exc_info = Some(exc);
        self
    }

    pub fn extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn stack_info(mut self, stack_info: bool) -> Self {
        self.stack_info = stack_info;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }
}
