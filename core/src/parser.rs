//! Resolving raw arguments against a [`CommandTree`].
//!
//! [`ArgumentParser::parse`] runs in stages:
//!
//! 1. **Command path.** Leading bare tokens that name a child of the current
//!    command are consumed, descending into the tree. A group without a
//!    default child cannot be executed; with nothing named, the tree's
//!    default command is used.
//! 2. **Built-ins.** A literal `help`/`version` in command position and the
//!    `--help`/`-h`/`-?`/`--version` options stop parsing and report the
//!    request against the most specific command the user named. User-declared
//!    commands and options shadow them.
//! 3. **Token loop.** Long (`--name`, `--name=value`), short (`-n`) and
//!    bundled (`-abc`) options, positional values, and the `--` escape after
//!    which every token is positional. Tokens that read as negative numbers
//!    are values.
//! 4. **Defaults.** Members the user did not supply get their defaults;
//!    missing required members are reported.
//! 5. **Validation.** Only when the previous stages found nothing wrong.
//!
//! Errors accumulate; help and version requests short-circuit.
//!
//! # Examples
//!
//! ```
//! use command_tree_core::*;
//!
//! let mut tree = CommandTree::new();
//! tree.register(
//!     CommandNode::new("build").with_option(
//!         OptionMember::new("output", PropertyType::scalar(ValueKind::Path))
//!             .with_short('o')
//!             .with_default("out"),
//!     ),
//!     None,
//! )
//! .unwrap();
//!
//! let parser = ArgumentParser::new(&tree);
//!
//! let resolved = parser.parse(&["build", "-o", "bin"]).into_result().unwrap();
//! assert_eq!(tree.node(resolved.command).name, "build");
//! assert_eq!(resolved.options.get::<String>("output").unwrap(), "bin");
//!
//! let outcome = parser.parse(&["frobnicate"]);
//! assert_eq!(outcome.errors()[0].kind, CliErrorType::UnknownCommand);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::binder::{BindError, apply_default, bind_member};
use crate::config::ParserSettings;
use crate::error::{CliError, CliErrorType};
use crate::options::Options;
use crate::policy::{ParserPolicy, effective_policy};
use crate::schema::{CommandNode, Member, OptionMember};
use crate::tree::{CommandId, CommandTree};
use crate::validate::{Validator, validate_parsed};
use crate::value::{ConversionError, parse_bool};

const ESCAPE: &str = "--";

/// Supplies the options instance a resolved command binds into.
///
/// Called once per parse, after the command is known. Values already present
/// in the returned instance count as supplied: they are neither defaulted nor
/// reported as missing.
pub trait OptionsProvider: Send + Sync {
    /// Returns a fresh instance for `id`.
    fn provide(&self, id: CommandId, node: &CommandNode) -> Options;
}

/// Hands out empty instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOptionsProvider;

impl OptionsProvider for DefaultOptionsProvider {
    fn provide(&self, id: CommandId, _node: &CommandNode) -> Options {
        Options::new(id)
    }
}

/// A command with its bound options.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The command to execute.
    pub command: CommandId,
    /// Bound and defaulted members.
    pub options: Options,
}

/// Everything that went wrong, plus how far resolution got.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// At least one error; a single one for help/version requests.
    pub errors: Vec<CliError>,
    /// Resolved command, if resolution got that far.
    pub command: Option<CommandId>,
    /// Options bound so far, if binding started.
    pub options: Option<Options>,
}

impl ParseFailure {
    fn single(error: CliError) -> Self {
        Self {
            command: error.command,
            errors: vec![error],
            options: None,
        }
    }

    /// The help or version request, if that is what stopped the parse.
    pub fn intent(&self) -> Option<&CliError> {
        self.errors.iter().find(|e| e.is_intent())
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.errors.iter();
        if let Some(first) = errors.next() {
            write!(f, "{first}")?;
        }
        for error in errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseFailure {}

/// Result of [`ArgumentParser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A command resolved and bound cleanly.
    Success(Resolved),
    /// Errors, or a help/version request.
    Failure(ParseFailure),
}

impl ParseOutcome {
    /// Returns `true` for [`ParseOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Errors of a failed parse; empty on success.
    pub fn errors(&self) -> &[CliError] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(failure) => &failure.errors,
        }
    }

    /// The resolved command, when known.
    pub fn command(&self) -> Option<CommandId> {
        match self {
            Self::Success(resolved) => Some(resolved.command),
            Self::Failure(failure) => failure.command,
        }
    }

    /// The bound options, when binding took place.
    pub fn options(&self) -> Option<&Options> {
        match self {
            Self::Success(resolved) => Some(&resolved.options),
            Self::Failure(failure) => failure.options.as_ref(),
        }
    }

    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseFailure`] of a failed parse.
    pub fn into_result(self) -> Result<Resolved, ParseFailure> {
        match self {
            Self::Success(resolved) => Ok(resolved),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// Resolves argument lists against a borrowed [`CommandTree`].
///
/// The parser is immutable while parsing; one instance can serve any number
/// of concurrent parses.
#[derive(Clone)]
pub struct ArgumentParser<'t> {
    tree: &'t CommandTree,
    settings: ParserSettings,
    validators: Vec<Arc<dyn Validator>>,
    provider: Arc<dyn OptionsProvider>,
}

impl fmt::Debug for ArgumentParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentParser")
            .field("commands", &self.tree.len())
            .field("settings", &self.settings)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl<'t> ArgumentParser<'t> {
    /// Creates a parser with default settings.
    pub fn new(tree: &'t CommandTree) -> Self {
        Self {
            tree,
            settings: ParserSettings::default(),
            validators: Vec::new(),
            provider: Arc::new(DefaultOptionsProvider),
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a validator that runs for every command.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Replaces the options provider.
    pub fn with_provider(mut self, provider: impl OptionsProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// The tree being parsed against.
    pub fn tree(&self) -> &'t CommandTree {
        self.tree
    }

    /// Effective policy for `command` (or the application defaults).
    pub fn policy_for(&self, command: Option<CommandId>) -> ParserPolicy {
        effective_policy(self.tree, command, &self.settings.policy)
    }

    /// Resolves `args` (without the program name).
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> ParseOutcome {
        let tokens: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let outcome = self.parse_tokens(&tokens);
        debug!(
            command = ?outcome.command().map(|id| self.tree.node(id).name.as_str()),
            errors = outcome.errors().len(),
            "Parsed arguments"
        );
        outcome
    }

    fn parse_tokens(&self, tokens: &[&str]) -> ParseOutcome {
        let path = match self.resolve_path(tokens) {
            Ok(path) => path,
            Err(error) => return ParseOutcome::Failure(ParseFailure::single(error)),
        };

        let node = self.tree.node(path.command);
        let mut walk = TokenWalk {
            node,
            command: path.command,
            explicit: path.explicit,
            policy: self.policy_for(Some(path.command)),
            options: self.provider.provide(path.command, node),
            errors: Vec::new(),
            tokens: &tokens[path.consumed..],
            pos: 0,
            value_index: 0,
            escaped: false,
            extra_reported: false,
            rejected: HashSet::new(),
        };
        if let Err(intent) = walk.run() {
            return ParseOutcome::Failure(ParseFailure::single(intent));
        }
        walk.apply_defaults();

        let TokenWalk {
            command,
            options,
            mut errors,
            ..
        } = walk;
        if errors.is_empty() {
            let issues = validate_parsed(&self.validators, node, &options);
            if issues.is_empty() {
                return ParseOutcome::Success(Resolved { command, options });
            }
            errors.push(
                CliError::new(CliErrorType::ValidationFailed)
                    .with_command(Some(command))
                    .with_issues(issues),
            );
        }
        ParseOutcome::Failure(ParseFailure {
            errors,
            command: Some(command),
            options: Some(options),
        })
    }

    fn resolve_path(&self, tokens: &[&str]) -> Result<CommandPath, CliError> {
        let mut current: Option<CommandId> = None;
        let mut pos = 0;

        while let Some(&token) = tokens.get(pos) {
            if looks_like_option(token) {
                break;
            }
            if let Some(child) = self.tree.find_child(current, token) {
                current = Some(child);
                pos += 1;
                continue;
            }
            if let Some(intent) = self.builtin_command(current, token, &tokens[pos + 1..]) {
                return Err(intent);
            }
            break;
        }

        let rest = &tokens[pos..];
        let bare_next = rest.first().copied().filter(|t| !looks_like_option(t));
        let resolution_error = |kind: CliErrorType| {
            let error = CliError::new(kind).with_command(current);
            match bare_next {
                Some(token) if kind == CliErrorType::UnknownCommand => error.with_token(token),
                _ => error,
            }
        };

        let command = match current {
            Some(id) if self.tree.node(id).is_executable => id,
            Some(id) => match self.tree.default_child(id) {
                Some(child) => child,
                None if bare_next.is_some() => {
                    return Err(self.scan_builtin_options(current, rest).unwrap_or_else(|| {
                        resolution_error(CliErrorType::UnknownCommand)
                    }));
                }
                None => {
                    return Err(self.scan_builtin_options(current, rest).unwrap_or_else(|| {
                        resolution_error(CliErrorType::CommandNotExecutable)
                    }));
                }
            },
            None => match self.tree.default_command() {
                Some(default) => default,
                None => {
                    let kind = if bare_next.is_some() {
                        CliErrorType::UnknownCommand
                    } else {
                        CliErrorType::MissingCommand
                    };
                    return Err(self
                        .scan_builtin_options(None, rest)
                        .unwrap_or_else(|| resolution_error(kind)));
                }
            },
        };

        if !self.tree.node(command).is_executable {
            return Err(self
                .scan_builtin_options(current, rest)
                .unwrap_or_else(|| {
                    CliError::new(CliErrorType::CommandNotExecutable).with_command(Some(command))
                }));
        }

        Ok(CommandPath {
            command,
            explicit: current,
            consumed: pos,
        })
    }

    /// `help`/`version` typed where a command name was expected.
    ///
    /// Not intercepted once the named command takes positional values, so
    /// `search help` still searches for "help".
    fn builtin_command(
        &self,
        current: Option<CommandId>,
        token: &str,
        rest: &[&str],
    ) -> Option<CliError> {
        if current.is_some_and(|id| !self.tree.node(id).values.is_empty()) {
            return None;
        }
        let policy = self.policy_for(current);
        if policy.provide_help_command && token.eq_ignore_ascii_case("help") {
            let mut target = current;
            for name in rest {
                match self.tree.find_child(target, name) {
                    Some(child) => target = Some(child),
                    None => break,
                }
            }
            return Some(CliError::new(CliErrorType::HelpRequested).with_command(target));
        }
        if policy.provide_version_command && token.eq_ignore_ascii_case("version") {
            return Some(CliError::new(CliErrorType::VersionRequested).with_command(current));
        }
        None
    }

    /// Looks for built-in options among tokens that will not be parsed.
    fn scan_builtin_options(&self, current: Option<CommandId>, rest: &[&str]) -> Option<CliError> {
        let policy = self.policy_for(current);
        let node = current.map(|id| self.tree.node(id));
        rest.iter()
            .take_while(|t| **t != ESCAPE)
            .find_map(|token| builtin_option(&policy, node, token))
            .map(|kind| CliError::new(kind).with_command(current))
    }
}

struct CommandPath {
    command: CommandId,
    explicit: Option<CommandId>,
    consumed: usize,
}

/// State of the token loop for one parse.
struct TokenWalk<'a> {
    node: &'a CommandNode,
    command: CommandId,
    explicit: Option<CommandId>,
    policy: ParserPolicy,
    options: Options,
    errors: Vec<CliError>,
    tokens: &'a [&'a str],
    pos: usize,
    value_index: usize,
    escaped: bool,
    extra_reported: bool,
    /// Members the user supplied but that failed to bind.
    rejected: HashSet<String>,
}

impl<'a> TokenWalk<'a> {
    /// Consumes every token. `Err` carries a help/version request.
    fn run(&mut self) -> Result<(), CliError> {
        while let Some(token) = self.next() {
            if self.escaped {
                self.positional(token);
            } else if token == ESCAPE {
                self.escaped = true;
            } else if let Some(body) = token.strip_prefix("--") {
                self.long_option(token, body)?;
            } else if looks_like_option(token) {
                self.short_options(token)?;
            } else {
                self.positional(token);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn intent(&self, kind: CliErrorType) -> CliError {
        CliError::new(kind).with_command(self.explicit)
    }

    fn error(&self, kind: CliErrorType, token: &str) -> CliError {
        CliError::new(kind)
            .with_command(Some(self.command))
            .with_token(token)
    }

    fn long_option(&mut self, token: &str, body: &str) -> Result<(), CliError> {
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        match self.node.find_long_option(name) {
            Some(option) => self.option_value(option, token, inline),
            None => {
                if let Some(kind) = builtin_option(&self.policy, Some(self.node), &format!("--{name}")) {
                    return Err(self.intent(kind));
                }
                self.unknown_option(token);
            }
        }
        Ok(())
    }

    fn short_options(&mut self, token: &str) -> Result<(), CliError> {
        let body = &token[1..];
        let mut chars = body.chars();
        let Some(first) = chars.next() else {
            return Ok(());
        };
        let tail = chars.as_str();

        if tail.is_empty() || tail.starts_with('=') {
            let inline = tail.strip_prefix('=');
            match self.node.find_short_option(first) {
                Some(option) => self.option_value(option, token, inline),
                None => {
                    if let Some(kind) = builtin_option(&self.policy, Some(self.node), token) {
                        return Err(self.intent(kind));
                    }
                    self.unknown_option(token);
                }
            }
            return Ok(());
        }

        for alias in body.chars() {
            let display = format!("-{alias}");
            match self.node.find_short_option(alias) {
                Some(option) if option.member.property_type.is_flag() => {
                    self.bind_option(option, &display, &["true"]);
                }
                Some(option) => {
                    let error = self
                        .error(CliErrorType::MissingOptionValue, &display)
                        .with_member(&option.member.name);
                    self.errors.push(error);
                    self.rejected.insert(option.member.name.clone());
                }
                None => {
                    if let Some(kind) = builtin_option(&self.policy, Some(self.node), &display) {
                        return Err(self.intent(kind));
                    }
                    self.unknown_option(&display);
                }
            }
        }
        Ok(())
    }

    /// Collects the raw tokens for `option` and binds them.
    fn option_value(&mut self, option: &OptionMember, token: &str, inline: Option<&str>) {
        let property_type = &option.member.property_type;
        let raw: Vec<&str> = if let Some(value) = inline {
            vec![value]
        } else if property_type.is_flag() {
            match self.peek() {
                Some(next) if parse_bool(next).is_some() => {
                    self.pos += 1;
                    vec![next]
                }
                _ => vec!["true"],
            }
        } else if property_type.is_list() {
            let mut values = Vec::new();
            while let Some(next) = self.peek().filter(|t| !looks_like_option(t)) {
                self.pos += 1;
                values.push(next);
            }
            if values.is_empty() && property_type.kind.is_bool() {
                values.push("true");
            }
            values
        } else {
            match self.peek().filter(|t| !looks_like_option(t)) {
                Some(next) => {
                    self.pos += 1;
                    vec![next]
                }
                None => Vec::new(),
            }
        };

        if raw.is_empty() {
            let error = self
                .error(CliErrorType::MissingOptionValue, token)
                .with_member(&option.member.name);
            self.errors.push(error);
            self.rejected.insert(option.member.name.clone());
            return;
        }
        self.bind_option(option, token, &raw);
    }

    fn bind_option(&mut self, option: &OptionMember, token: &str, raw: &[&str]) {
        if let Err(BindError { member, cause }) = bind_member(&option.member, &mut self.options, raw) {
            let kind = match cause {
                ConversionError::InvalidChoice { .. } => CliErrorType::BadOptionValue,
                _ => CliErrorType::WrongOptionFormat,
            };
            let error = self.error(kind, token).with_member(&member).with_cause(cause);
            self.errors.push(error);
            self.rejected.insert(member);
        }
    }

    fn unknown_option(&mut self, token: &str) {
        if self.policy.ignore_unknown_options {
            debug!(option = token, "Ignoring unknown option");
            return;
        }
        let error = self.error(CliErrorType::UnknownOption, token);
        self.errors.push(error);
    }

    fn positional(&mut self, token: &str) {
        let first = self.value_index == 0 && !self.extra_reported;
        let Some(value) = self.node.values.get(self.value_index) else {
            self.extra_value(token, first);
            return;
        };

        if !value.member.property_type.is_list() {
            self.value_index += 1;
        }
        if let Err(BindError { member, cause }) = bind_member(&value.member, &mut self.options, &[token]) {
            let error = self
                .error(CliErrorType::WrongValueFormat, token)
                .with_member(&member)
                .with_cause(cause);
            self.errors.push(error);
            self.rejected.insert(member);
        }
    }

    /// A positional token with no value left to bind to.
    fn extra_value(&mut self, token: &str, first: bool) {
        let takes_no_values = self.node.values.is_empty();
        let implicit = self.explicit != Some(self.command);
        if first && takes_no_values && !self.escaped && (implicit || !self.node.children().is_empty()) {
            self.extra_reported = true;
            let error = self.error(CliErrorType::UnknownCommand, token);
            self.errors.push(error);
            return;
        }
        if self.policy.ignore_additional_values {
            debug!(value = token, "Ignoring additional value");
            return;
        }
        if !self.extra_reported {
            self.extra_reported = true;
            let error = self.error(CliErrorType::UnknownValue, token);
            self.errors.push(error);
        }
    }

    /// Defaults every member not supplied, reporting missing required ones.
    ///
    /// A required member whose value was rejected already has its error.
    fn apply_defaults(&mut self) {
        let node = self.node;
        for option in &node.options {
            if self.options.is_explicitly_set(&option.member.name) {
                continue;
            }
            if option.member.required {
                if self.rejected.contains(&option.member.name) {
                    continue;
                }
                let error = self
                    .error(CliErrorType::MissingOptionValue, &option.display_name())
                    .with_member(&option.member.name);
                self.errors.push(error);
            } else {
                self.default_member(&option.member);
            }
        }
        for value in &node.values {
            if self.options.is_explicitly_set(&value.member.name) {
                continue;
            }
            if value.member.required {
                if self.rejected.contains(&value.member.name) {
                    continue;
                }
                let error = self
                    .error(CliErrorType::MissingRequiredValue, &value.display_name)
                    .with_member(&value.member.name);
                self.errors.push(error);
            } else {
                self.default_member(&value.member);
            }
        }
    }

    fn default_member(&mut self, member: &Member) {
        if let Err(BindError { member, cause }) = apply_default(member, &mut self.options) {
            let error = CliError::new(CliErrorType::WrongOptionFormat)
                .with_command(Some(self.command))
                .with_member(&member)
                .with_cause(cause);
            self.errors.push(error);
        }
    }
}

/// Whether `token` is an option (or the escape) rather than a value.
///
/// A lone `-` is a value, as are negative numbers such as `-3` or `-.5`.
fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && !is_negative_number(token)
}

fn is_negative_number(token: &str) -> bool {
    let mut chars = token.chars().skip(1);
    chars
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
        && token.parse::<f64>().is_ok()
}

/// Built-in help/version option named by `token`, unless disabled by `policy`
/// or shadowed by an option of `node`.
fn builtin_option(
    policy: &ParserPolicy,
    node: Option<&CommandNode>,
    token: &str,
) -> Option<CliErrorType> {
    let shadowed = |long: Option<&str>, short: Option<char>| {
        node.is_some_and(|node| {
            long.is_some_and(|l| node.find_long_option(l).is_some())
                || short.is_some_and(|s| node.find_short_option(s).is_some())
        })
    };

    if policy.provide_help_option {
        let hit = if token.eq_ignore_ascii_case("--help") {
            !shadowed(Some("help"), None)
        } else if token == "-h" || token == "-?" {
            !shadowed(None, token.chars().nth(1))
        } else {
            false
        };
        if hit {
            return Some(CliErrorType::HelpRequested);
        }
    }
    if policy.provide_version_option
        && token.eq_ignore_ascii_case("--version")
        && !shadowed(Some("version"), None)
    {
        return Some(CliErrorType::VersionRequested);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyType, ValueKind, ValueMember};
    use crate::value::Value;

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("build")
                .with_option(
                    OptionMember::new("output", PropertyType::scalar(ValueKind::Path))
                        .with_short('o')
                        .with_default("out"),
                )
                .with_option(OptionMember::flag("release").with_short('r'))
                .with_option(OptionMember::flag("verbose").with_short('v'))
                .with_option(
                    OptionMember::new("jobs", PropertyType::scalar(ValueKind::Integer)).with_short('j'),
                )
                .with_option(OptionMember::new(
                    "feature",
                    PropertyType::list(ValueKind::String),
                ))
                .with_option(OptionMember::new(
                    "format",
                    PropertyType::scalar(ValueKind::Choice(vec!["json".into(), "text".into()])),
                )),
            None,
        )
        .unwrap();
        tree.register(
            CommandNode::new("test").with_value(ValueMember::new(
                "pattern",
                PropertyType::list(ValueKind::String),
                0,
            )),
            None,
        )
        .unwrap();
        tree.register(
            CommandNode::new("move")
                .with_value(ValueMember::new("from", PropertyType::scalar(ValueKind::Path), 0).required())
                .with_value(ValueMember::new("to", PropertyType::scalar(ValueKind::Path), 1).required()),
            None,
        )
        .unwrap();
        tree.register(
            CommandNode::new("offset").with_value(ValueMember::new(
                "delta",
                PropertyType::scalar(ValueKind::Float),
                0,
            )),
            None,
        )
        .unwrap();
        tree.register(CommandNode::group("remote"), None).unwrap();
        tree.register(
            CommandNode::new("add").with_value(ValueMember::new(
                "url",
                PropertyType::scalar(ValueKind::String),
                0,
            )),
            Some("remote"),
        )
        .unwrap();
        tree
    }

    fn kinds(outcome: &ParseOutcome) -> Vec<CliErrorType> {
        outcome.errors().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_long_forms() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser
            .parse(&["build", "--output=bin", "--JOBS", "4", "--release"])
            .into_result()
            .unwrap();
        assert_eq!(resolved.options.get::<String>("output").unwrap(), "bin");
        assert_eq!(resolved.options.get::<i64>("jobs"), Ok(4));
        assert_eq!(resolved.options.get::<bool>("release"), Ok(true));
        assert_eq!(resolved.options.get::<bool>("verbose"), Ok(false));
        assert!(!resolved.options.is_explicitly_set("verbose"));
    }

    #[test]
    fn test_flag_consumes_only_bool_literal() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser
            .parse(&["build", "--release", "no", "-v"])
            .into_result()
            .unwrap();
        assert_eq!(resolved.options.get::<bool>("release"), Ok(false));
        assert_eq!(resolved.options.get::<bool>("verbose"), Ok(true));

        let outcome = parser.parse(&["build", "--release", "later"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::UnknownValue]);
    }

    #[test]
    fn test_list_option_takes_contiguous_values() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser
            .parse(&["build", "--feature", "a", "b", "-r", "--feature", "c"])
            .into_result()
            .unwrap();
        assert_eq!(
            resolved.options.get::<Vec<String>>("feature").unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_missing_and_malformed_option_values() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["build", "--jobs", "--output"]);
        assert_eq!(
            kinds(&outcome),
            vec![CliErrorType::MissingOptionValue, CliErrorType::MissingOptionValue]
        );

        let outcome = parser.parse(&["build", "-j", "lots"]);
        let error = &outcome.errors()[0];
        assert_eq!(error.kind, CliErrorType::WrongOptionFormat);
        assert_eq!(error.member.as_deref(), Some("jobs"));
        assert_eq!(error.token.as_deref(), Some("-j"));
        assert!(error.cause.is_some());

        let outcome = parser.parse(&["build", "--format", "xml"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::BadOptionValue]);
        assert!(outcome.options().is_some());
    }

    #[test]
    fn test_rejected_required_members_reported_once() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("serve")
                .with_option(
                    OptionMember::new("port", PropertyType::scalar(ValueKind::Integer))
                        .with_short('p')
                        .required(),
                )
                .with_option(
                    OptionMember::new("host", PropertyType::scalar(ValueKind::String)).required(),
                )
                .with_option(OptionMember::flag("tls").with_short('t'))
                .with_value(
                    ValueMember::new("workers", PropertyType::scalar(ValueKind::Integer), 0)
                        .required(),
                ),
            None,
        )
        .unwrap();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["serve", "--port", "abc", "--host", "h", "2"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::WrongOptionFormat]);

        let outcome = parser.parse(&["serve", "--port", "1", "--host", "h", "many"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::WrongValueFormat]);

        let outcome = parser.parse(&["serve", "-tp", "--host", "h", "2"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::MissingOptionValue]);

        let outcome = parser.parse(&["serve", "--host", "h", "2"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::MissingOptionValue]);
        assert_eq!(outcome.errors()[0].member.as_deref(), Some("port"));
    }

    #[test]
    fn test_bare_bool_list_option() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("audit")
                .with_option(OptionMember::new("check", PropertyType::list(ValueKind::Bool))),
            None,
        )
        .unwrap();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser.parse(&["audit", "--check"]).into_result().unwrap();
        assert_eq!(resolved.options.get::<Vec<bool>>("check"), Ok(vec![true]));

        let resolved = parser
            .parse(&["audit", "--check", "no", "yes"])
            .into_result()
            .unwrap();
        assert_eq!(resolved.options.get::<Vec<bool>>("check"), Ok(vec![false, true]));
    }

    #[test]
    fn test_short_inline_value() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);
        let resolved = parser.parse(&["build", "-j=8"]).into_result().unwrap();
        assert_eq!(resolved.options.get::<i64>("jobs"), Ok(8));
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser.parse(&["offset", "-2.5"]).into_result().unwrap();
        assert_eq!(resolved.options.get::<f64>("delta"), Ok(-2.5));

        let resolved = parser.parse(&["build", "-j", "-3"]).into_result().unwrap();
        assert_eq!(resolved.options.get::<i64>("jobs"), Ok(-3));
    }

    #[test]
    fn test_required_values() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["move", "a"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::MissingRequiredValue]);
        assert_eq!(outcome.errors()[0].member.as_deref(), Some("to"));

        let resolved = parser.parse(&["move", "a", "b"]).into_result().unwrap();
        assert_eq!(resolved.options.value("to"), Some(&Value::Path("b".into())));
    }

    #[test]
    fn test_unknown_value_reported_once() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["move", "a", "b", "c", "d"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::UnknownValue]);
        assert_eq!(outcome.errors()[0].token.as_deref(), Some("c"));
    }

    #[test]
    fn test_ignore_additional_values_from_settings() {
        let tree = tree();
        let mut settings = ParserSettings::default();
        settings.policy.ignore_additional_values = true;
        let parser = ArgumentParser::new(&tree).with_settings(settings);

        assert!(parser.parse(&["move", "a", "b", "c"]).is_success());
    }

    #[test]
    fn test_group_resolution_errors() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);
        let remote = tree.find("remote");

        let outcome = parser.parse(&["remote"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::CommandNotExecutable]);
        assert_eq!(outcome.command(), remote);

        let outcome = parser.parse(&["remote", "rename"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::UnknownCommand]);
        assert_eq!(outcome.errors()[0].token.as_deref(), Some("rename"));

        let outcome = parser.parse(&["--verbose"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::MissingCommand]);
    }

    #[test]
    fn test_help_command_targets_path() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["help", "remote", "add"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::HelpRequested]);
        assert_eq!(outcome.command(), tree.find("add"));

        let outcome = parser.parse(&["remote", "help"]);
        assert_eq!(outcome.command(), tree.find("remote"));

        let outcome = parser.parse(&["version"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::VersionRequested]);
        assert_eq!(outcome.command(), None);
    }

    #[test]
    fn test_help_word_is_a_value_where_values_are_taken() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser.parse(&["test", "help"]).into_result().unwrap();
        assert_eq!(
            resolved.options.get::<Vec<String>>("pattern").unwrap(),
            vec!["help"]
        );
    }

    #[test]
    fn test_help_option_after_errors_wins() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);

        let outcome = parser.parse(&["build", "--bogus", "-?"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::HelpRequested]);
        assert_eq!(outcome.command(), tree.find("build"));

        let outcome = parser.parse(&["remote", "--help"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::HelpRequested]);
        assert_eq!(outcome.command(), tree.find("remote"));
    }

    #[test]
    fn test_user_options_shadow_builtins() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("ls")
                .with_option(OptionMember::flag("human").with_short('h'))
                .with_option(OptionMember::new("version", PropertyType::scalar(ValueKind::String))),
            None,
        )
        .unwrap();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser
            .parse(&["ls", "-h", "--version", "2"])
            .into_result()
            .unwrap();
        assert_eq!(resolved.options.get::<bool>("human"), Ok(true));
        assert_eq!(resolved.options.get::<String>("version").unwrap(), "2");
        assert_eq!(
            kinds(&parser.parse(&["ls", "--help"])),
            vec![CliErrorType::HelpRequested]
        );
    }

    #[test]
    fn test_disabled_builtins_are_plain_tokens() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("run")
                .provide_help_option(false)
                .provide_version_option(false),
            None,
        )
        .unwrap();
        let parser = ArgumentParser::new(&tree);

        assert_eq!(
            kinds(&parser.parse(&["run", "--help", "--version"])),
            vec![CliErrorType::UnknownOption, CliErrorType::UnknownOption]
        );
    }

    #[test]
    fn test_validation_skipped_after_structural_errors() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("x").with_validator(|_: &CommandNode, _: &Options| {
                vec![crate::ValidationIssue::new("always")]
            }),
            None,
        )
        .unwrap();
        let parser = ArgumentParser::new(&tree);

        assert_eq!(kinds(&parser.parse(&["x", "--nope"])), vec![CliErrorType::UnknownOption]);
        let outcome = parser.parse(&["x"]);
        assert_eq!(kinds(&outcome), vec![CliErrorType::ValidationFailed]);
        assert_eq!(outcome.errors()[0].issues.len(), 1);
        assert!(outcome.options().is_some());
    }

    #[test]
    fn test_looks_like_option() {
        assert!(looks_like_option("--"));
        assert!(looks_like_option("-x"));
        assert!(looks_like_option("-1a"));
        assert!(!looks_like_option("-"));
        assert!(!looks_like_option("-1"));
        assert!(!looks_like_option("-.5"));
        assert!(!looks_like_option("plain"));
    }
}
