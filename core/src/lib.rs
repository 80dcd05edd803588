//! Command tree model and argument resolution engine.
//!
//! This crate turns a declarative tree of commands into a resolver for raw
//! process arguments:
//!
//! - [`CommandNode`] describes a command: aliases, named options
//!   ([`OptionMember`]), positional values ([`ValueMember`]), parser policy
//!   overrides and an optional execution strategy.
//! - [`CommandTree`] registers nodes, enforcing alias uniqueness among
//!   siblings and a single default command.
//! - [`ArgumentParser`] resolves `argv` into a command plus a populated
//!   [`Options`] instance, or a list of [`CliError`]s.
//! - [`Validator`]s check the parsed result semantically.
//! - [`CommandExecutor`] strategies run the resolved command.
//!
//! Help and version requests come back as [`CliErrorType::HelpRequested`] and
//! [`CliErrorType::VersionRequested`]; rendering is left to a
//! [`HelpRenderer`], fed by the metadata in [`describe_tree`].
//!
//! # Example
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
//! tree.register(
//!     CommandNode::new("test")
//!         .with_value(ValueMember::new("pattern", PropertyType::list(ValueKind::String), 0))
//!         .run_with(|options| options.get::<Vec<String>>("pattern").map_or(1, |p| p.len() as i32)),
//!     None,
//! )
//! .unwrap();
//!
//! let parser = ArgumentParser::new(&tree);
//! let resolved = parser.parse(&["test", "a", "b", "c"]).into_result().unwrap();
//! assert_eq!(tree.execute(&resolved).unwrap(), 3);
//!
//! let outcome = parser.parse(&["build", "--help"]);
//! assert_eq!(outcome.errors()[0].kind, CliErrorType::HelpRequested);
//! ```

mod binder;
mod config;
mod describe;
mod error;
mod execute;
mod options;
mod parser;
mod policy;
mod schema;
mod tree;
mod unparse;
mod validate;
mod value;

pub use binder::{BindError, apply_default, bind_member};
pub use config::{AppInfo, ConfigError, ParserSettings};
pub use describe::{
    AppDescription, CommandDescription, HelpRenderer, OptionDescription, ValueDescription,
    describe_command, describe_tree, resolve_version, usage,
};
pub use error::{CliError, CliErrorType};
pub use execute::{
    AsyncFnRunner, AsyncOptionsRunner, AsyncRun, CommandExecutor, CommandHandler, CommandOptions,
    ExecutionError, FnRunner, HandlerRunner, OptionsRunner, Run,
};
pub use options::{ExtractError, Options};
pub use parser::{
    ArgumentParser, DefaultOptionsProvider, OptionsProvider, ParseFailure, ParseOutcome, Resolved,
};
pub use policy::{ParserPolicy, PolicyOverrides, effective_policy};
pub use schema::{
    CommandNode, Member, Multiplicity, OptionMember, PropertyType, ValueKind, ValueMember,
};
pub use tree::{CommandId, CommandTree, RegistryError};
pub use unparse::to_args;
pub use validate::{Conflicts, Requires, ValidationIssue, Validator, validate_parsed};
pub use value::{ConversionError, FromValue, Value, convert, parse_bool};
