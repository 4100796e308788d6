//! Typed configuration arguments and the configuration error collector.
//!
//! The configuration-language front end is out of scope; what reaches an
//! element is an ordered list of already-tokenized, typed [`ConfigArg`]
//! values plus an [`Errors`] collector that records problems with element
//! context and decides whether the graph may start.

use crate::error::{CoreError, CoreResult};
use crate::time::Duration;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// A single typed configuration argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigArg {
    /// Free-form string
    Str(String),
    /// Unsigned integer
    Unsigned(u64),
    /// Signed integer
    Integer(i64),
    /// Boolean flag
    Bool(bool),
    /// IPv4 address
    Address(Ipv4Addr),
    /// IPv4 prefix (address + mask)
    Prefix {
        /// Network address
        addr: Ipv4Addr,
        /// Network mask
        mask: Ipv4Addr,
    },
    /// Filename
    Filename(PathBuf),
    /// Time interval
    Interval(Duration),
}

impl ConfigArg {
    /// Short name of the argument kind, for error messages
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Unsigned(_) => "unsigned",
            Self::Integer(_) => "integer",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::Prefix { .. } => "prefix",
            Self::Filename(_) => "filename",
            Self::Interval(_) => "interval",
        }
    }
}

/// Cursor over an element's argument list with typed extraction.
///
/// Every extraction method names what it expects, so errors read like
/// "argument 1 (unqueueing rate): expected unsigned, found string".
#[derive(Debug)]
pub struct Args<'a> {
    args: &'a [ConfigArg],
    pos: usize,
}

impl<'a> Args<'a> {
    /// Create a cursor over an argument list
    #[must_use]
    pub fn new(args: &'a [ConfigArg]) -> Self {
        Self { args, pos: 0 }
    }

    /// Number of arguments not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.args.len() - self.pos
    }

    /// Whether all arguments have been consumed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Peek at the next argument without consuming it
    #[must_use]
    pub fn peek(&self) -> Option<&'a ConfigArg> {
        self.args.get(self.pos)
    }

    fn next(&mut self, what: &str) -> CoreResult<&'a ConfigArg> {
        match self.args.get(self.pos) {
            Some(arg) => {
                self.pos += 1;
                Ok(arg)
            }
            None => Err(CoreError::Parse {
                message: format!("argument {} ({}): missing", self.pos + 1, what),
            }),
        }
    }

    fn mismatch(&self, what: &str, expected: &str, found: &ConfigArg) -> CoreError {
        CoreError::Parse {
            message: format!(
                "argument {} ({}): expected {}, found {}",
                self.pos, what, expected, found.kind_name()
            ),
        }
    }

    /// Extract a string
    pub fn string(&mut self, what: &str) -> CoreResult<String> {
        match self.next(what)? {
            ConfigArg::Str(s) => Ok(s.clone()),
            other => Err(self.mismatch(what, "string", other)),
        }
    }

    /// Extract an unsigned integer
    pub fn unsigned(&mut self, what: &str) -> CoreResult<u64> {
        match self.next(what)? {
            ConfigArg::Unsigned(v) => Ok(*v),
            other => Err(self.mismatch(what, "unsigned", other)),
        }
    }

    /// Extract a signed integer
    pub fn integer(&mut self, what: &str) -> CoreResult<i64> {
        match self.next(what)? {
            ConfigArg::Integer(v) => Ok(*v),
            ConfigArg::Unsigned(v) if *v <= i64::MAX as u64 => Ok(*v as i64),
            other => Err(self.mismatch(what, "integer", other)),
        }
    }

    /// Extract a boolean
    pub fn boolean(&mut self, what: &str) -> CoreResult<bool> {
        match self.next(what)? {
            ConfigArg::Bool(v) => Ok(*v),
            other => Err(self.mismatch(what, "bool", other)),
        }
    }

    /// Extract an IPv4 address
    pub fn address(&mut self, what: &str) -> CoreResult<Ipv4Addr> {
        match self.next(what)? {
            ConfigArg::Address(a) => Ok(*a),
            other => Err(self.mismatch(what, "address", other)),
        }
    }

    /// Extract an IPv4 prefix
    pub fn prefix(&mut self, what: &str) -> CoreResult<(Ipv4Addr, Ipv4Addr)> {
        match self.next(what)? {
            ConfigArg::Prefix { addr, mask } => Ok((*addr, *mask)),
            other => Err(self.mismatch(what, "prefix", other)),
        }
    }

    /// Extract a filename
    pub fn filename(&mut self, what: &str) -> CoreResult<PathBuf> {
        match self.next(what)? {
            ConfigArg::Filename(p) => Ok(p.clone()),
            other => Err(self.mismatch(what, "filename", other)),
        }
    }

    /// Extract a time interval
    pub fn interval(&mut self, what: &str) -> CoreResult<Duration> {
        match self.next(what)? {
            ConfigArg::Interval(d) => Ok(*d),
            other => Err(self.mismatch(what, "interval", other)),
        }
    }

    /// Extract an optional trailing unsigned, or the default
    pub fn optional_unsigned(&mut self, what: &str, default: u64) -> CoreResult<u64> {
        if self.is_empty() {
            Ok(default)
        } else {
            self.unsigned(what)
        }
    }

    /// Require that all arguments were consumed
    pub fn finish(self) -> CoreResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Parse {
                message: format!("{} excess argument(s)", self.remaining()),
            })
        }
    }
}

/// Configuration error collector.
///
/// Errors are recorded with the element's name as context; any recorded
/// error makes the graph refuse to start. Warnings are logged but allow
/// configuration to continue.
#[derive(Debug)]
pub struct Errors {
    context: String,
    errors: Vec<String>,
    warnings: usize,
}

impl Errors {
    /// Create a collector with element context
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            errors: Vec::new(),
            warnings: 0,
        }
    }

    /// Record an error and return it as a [`CoreError`] for propagation
    pub fn error(&mut self, reason: impl Into<String>) -> CoreError {
        let reason = reason.into();
        tracing::warn!(element = %self.context, "{reason}");
        self.errors.push(reason.clone());
        CoreError::Configure {
            element: self.context.clone(),
            reason,
        }
    }

    /// Record a warning; configuration continues
    pub fn warning(&mut self, reason: impl Into<String>) {
        tracing::warn!(element = %self.context, "{}", reason.into());
        self.warnings += 1;
    }

    /// Element context this collector reports against
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Number of recorded errors
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of recorded warnings
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Recorded error messages
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_typed_extraction() {
        let args = vec![
            ConfigArg::Unsigned(10),
            ConfigArg::Address(Ipv4Addr::new(10, 0, 0, 1)),
            ConfigArg::Str("out".to_string()),
        ];
        let mut cursor = Args::new(&args);

        assert_eq!(cursor.unsigned("rate").unwrap(), 10);
        assert_eq!(
            cursor.address("source addr").unwrap(),
            Ipv4Addr::new(10, 0, 0, 1)
        );
        assert_eq!(cursor.string("label").unwrap(), "out");
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_args_mismatch() {
        let args = vec![ConfigArg::Str("ten".to_string())];
        let mut cursor = Args::new(&args);

        let err = cursor.unsigned("rate").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("rate"));
        assert!(msg.contains("unsigned"));
        assert!(msg.contains("string"));
    }

    #[test]
    fn test_args_missing_and_excess() {
        let mut cursor = Args::new(&[]);
        assert!(cursor.unsigned("rate").is_err());

        let args = vec![ConfigArg::Unsigned(1), ConfigArg::Unsigned(2)];
        let mut cursor = Args::new(&args);
        cursor.unsigned("rate").unwrap();
        assert!(cursor.finish().is_err());
    }

    #[test]
    fn test_args_optional() {
        let args = vec![ConfigArg::Unsigned(7)];
        let mut cursor = Args::new(&args);
        assert_eq!(cursor.optional_unsigned("burst", 1).unwrap(), 7);

        let mut cursor = Args::new(&[]);
        assert_eq!(cursor.optional_unsigned("burst", 1).unwrap(), 1);
    }

    #[test]
    fn test_args_peek_for_variadic_forms() {
        let args = vec![
            ConfigArg::Prefix {
                addr: Ipv4Addr::new(10, 0, 0, 0),
                mask: Ipv4Addr::new(255, 0, 0, 0),
            },
            ConfigArg::Unsigned(0),
        ];
        let mut cursor = Args::new(&args);
        cursor.prefix("destination").unwrap();
        assert!(!matches!(cursor.peek(), Some(ConfigArg::Address(_))));
        assert_eq!(cursor.unsigned("output").unwrap(), 0);
    }

    #[test]
    fn test_errors_collector() {
        let mut errh = Errors::new("rated@3");
        assert_eq!(errh.error_count(), 0);

        let err = errh.error("rate must be an integer");
        assert!(matches!(err, CoreError::Configure { .. }));
        assert_eq!(errh.error_count(), 1);
        assert_eq!(errh.messages()[0], "rate must be an integer");

        errh.warning("no routes");
        assert_eq!(errh.warning_count(), 1);
        assert_eq!(errh.error_count(), 1);
    }

    #[test]
    fn test_config_arg_serde_round_trip() {
        let args = vec![
            ConfigArg::Unsigned(10),
            ConfigArg::Prefix {
                addr: Ipv4Addr::new(18, 26, 4, 0),
                mask: Ipv4Addr::new(255, 255, 255, 0),
            },
            ConfigArg::Interval(Duration::from_millis(3_000)),
        ];
        let json = serde_json::to_string(&args).unwrap();
        let back: Vec<ConfigArg> = serde_json::from_str(&json).unwrap();
        assert_eq!(args, back);
    }
}
