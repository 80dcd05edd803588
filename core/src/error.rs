//! User-facing parse errors.
//!
//! Every problem found while resolving arguments is a [`CliError`] tagged
//! with a [`CliErrorType`]. The taxonomy separates resolution errors, binding
//! errors, intent signals (help/version requests, which are not failures but
//! share the return channel) and semantic validation failures.

use std::fmt;

use serde::Serialize;

use crate::tree::CommandId;
use crate::validate::ValidationIssue;
use crate::value::ConversionError;

/// Closed set of parse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CliErrorType {
    /// A token in command position names no command.
    UnknownCommand,
    /// No command was named and there is no default command.
    MissingCommand,
    /// The resolved command is a group without a default child.
    CommandNotExecutable,
    /// An option is not declared on the command.
    UnknownOption,
    /// More positional tokens than declared values.
    UnknownValue,
    /// An option was given without its value, or a required option is absent.
    MissingOptionValue,
    /// A required positional value is absent.
    MissingRequiredValue,
    /// An option value failed conversion.
    WrongOptionFormat,
    /// A positional value failed conversion.
    WrongValueFormat,
    /// An option value is well-formed but not allowed.
    BadOptionValue,
    /// `help`, `--help`, `-h` or `-?` was requested.
    HelpRequested,
    /// `version` or `--version` was requested.
    VersionRequested,
    /// Semantic validation reported issues.
    ValidationFailed,
}

impl CliErrorType {
    /// Help and version requests: a change of intent rather than a mistake.
    pub fn is_intent(self) -> bool {
        matches!(self, Self::HelpRequested | Self::VersionRequested)
    }
}

/// One parse problem, with whatever context was available.
///
/// # Examples
///
/// ```
/// use command_tree_core::{CliError, CliErrorType};
///
/// let err = CliError::new(CliErrorType::UnknownOption).with_token("--bogus");
/// assert_eq!(err.to_string(), "unknown option '--bogus'");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CliError {
    /// Category.
    pub kind: CliErrorType,
    /// Most specific command resolved when the error was found.
    pub command: Option<CommandId>,
    /// Member involved, by name.
    pub member: Option<String>,
    /// The offending argument as typed (option, value or command name).
    pub token: Option<String>,
    /// Conversion failure behind a format error.
    #[serde(skip)]
    pub cause: Option<ConversionError>,
    /// Issues behind a [`CliErrorType::ValidationFailed`] error.
    pub issues: Vec<ValidationIssue>,
}

impl CliError {
    /// Creates an error with no context.
    pub fn new(kind: CliErrorType) -> Self {
        Self {
            kind,
            command: None,
            member: None,
            token: None,
            cause: None,
            issues: Vec::new(),
        }
    }

    /// Sets the command context.
    pub fn with_command(mut self, command: Option<CommandId>) -> Self {
        self.command = command;
        self
    }

    /// Sets the member.
    pub fn with_member(mut self, member: &str) -> Self {
        self.member = Some(member.to_string());
        self
    }

    /// Sets the offending token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Attaches the conversion failure.
    pub fn with_cause(mut self, cause: ConversionError) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Attaches validation issues.
    pub fn with_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issues = issues;
        self
    }

    /// Returns `true` for help/version requests.
    pub fn is_intent(&self) -> bool {
        self.kind.is_intent()
    }

    fn token_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.token
            .as_deref()
            .or(self.member.as_deref())
            .unwrap_or(fallback)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CliErrorType::UnknownCommand => {
                write!(f, "unknown command '{}'", self.token_or("?"))
            }
            CliErrorType::MissingCommand => f.write_str("no command given"),
            CliErrorType::CommandNotExecutable => {
                f.write_str("command cannot be executed on its own; choose a subcommand")
            }
            CliErrorType::UnknownOption => {
                write!(f, "unknown option '{}'", self.token_or("?"))
            }
            CliErrorType::UnknownValue => {
                write!(f, "unexpected value '{}'", self.token_or("?"))
            }
            CliErrorType::MissingOptionValue => {
                write!(f, "missing value for option '{}'", self.token_or("?"))
            }
            CliErrorType::MissingRequiredValue => {
                write!(f, "missing required value '{}'", self.token_or("?"))
            }
            CliErrorType::WrongOptionFormat
            | CliErrorType::WrongValueFormat
            | CliErrorType::BadOptionValue => {
                let what = if self.kind == CliErrorType::WrongValueFormat {
                    "value"
                } else {
                    "option"
                };
                write!(f, "invalid {what} '{}'", self.token_or("?"))?;
                if let Some(cause) = &self.cause {
                    write!(f, ": {cause}")?;
                }
                Ok(())
            }
            CliErrorType::HelpRequested => f.write_str("help requested"),
            CliErrorType::VersionRequested => f.write_str("version requested"),
            CliErrorType::ValidationFailed => {
                f.write_str("validation failed")?;
                for issue in &self.issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::schema::ValueKind;
    use crate::value::convert;

    #[test]
    fn test_format_error_carries_cause() {
        let cause = convert(&ValueKind::Integer, "x").unwrap_err();
        let err = CliError::new(CliErrorType::WrongOptionFormat)
            .with_member("jobs")
            .with_token("--jobs")
            .with_cause(cause);

        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("invalid option '--jobs': 'x' is not a valid integer"));
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let err = CliError::new(CliErrorType::ValidationFailed).with_issues(vec![
            ValidationIssue::new("first"),
            ValidationIssue::for_member("port", "out of range"),
        ]);
        assert_eq!(err.to_string(), "validation failed\n  first\n  port: out of range");
    }

    #[test]
    fn test_intent_kinds() {
        assert!(CliErrorType::HelpRequested.is_intent());
        assert!(CliErrorType::VersionRequested.is_intent());
        assert!(!CliErrorType::UnknownOption.is_intent());
    }
}
