//! Semantic validation of a parsed command.
//!
//! Runs after structurally clean parsing. Three stages, all accumulated:
//!
//! 1. cross-cutting [`Validator`]s registered on the
//!    [`ArgumentParser`](crate::ArgumentParser);
//! 2. the options type's own [`CommandOptions::validate`](crate::CommandOptions::validate);
//! 3. validators attached to the command itself.
//!
//! [`Conflicts`] and [`Requires`] cover the common member relationships.
//!
//! # Examples
//!
//! ```
//! use command_tree_core::*;
//!
//! let mut tree = CommandTree::new();
//! tree.register(
//!     CommandNode::new("log")
//!         .with_option(OptionMember::flag("json"))
//!         .with_option(OptionMember::flag("pretty"))
//!         .with_validator(Conflicts::new(["json", "pretty"])),
//!     None,
//! )
//! .unwrap();
//!
//! let parser = ArgumentParser::new(&tree);
//! let outcome = parser.parse(&["log", "--json", "--pretty"]);
//! assert_eq!(outcome.errors()[0].kind, CliErrorType::ValidationFailed);
//! assert!(parser.parse(&["log", "--json"]).is_success());
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::options::Options;
use crate::schema::CommandNode;

/// One semantic problem found by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Member the issue is about, if any.
    pub member: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    /// Issue about the command as a whole.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            member: None,
            message: message.into(),
        }
    }

    /// Issue about one member.
    pub fn for_member(member: &str, message: impl Into<String>) -> Self {
        Self {
            member: Some(member.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{member}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A check over a parsed command and its options.
///
/// Closures of the matching signature implement this trait.
pub trait Validator: Send + Sync {
    /// Returns every problem found; empty means valid.
    fn validate(&self, command: &CommandNode, options: &Options) -> Vec<ValidationIssue>;
}

impl<F> Validator for F
where
    F: Fn(&CommandNode, &Options) -> Vec<ValidationIssue> + Send + Sync,
{
    fn validate(&self, command: &CommandNode, options: &Options) -> Vec<ValidationIssue> {
        self(command, options)
    }
}

/// At most one of the listed members may be explicitly set.
#[derive(Debug, Clone)]
pub struct Conflicts {
    members: Vec<String>,
}

impl Conflicts {
    /// Creates a mutual-exclusion group.
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for Conflicts {
    fn validate(&self, _command: &CommandNode, options: &Options) -> Vec<ValidationIssue> {
        let set: Vec<&str> = self
            .members
            .iter()
            .map(String::as_str)
            .filter(|m| options.is_explicitly_set(m))
            .collect();
        if set.len() > 1 {
            vec![ValidationIssue::new(format!(
                "{} cannot be used together",
                set.join(", ")
            ))]
        } else {
            Vec::new()
        }
    }
}

/// When `member` is explicitly set, every member in `requires` must be too.
#[derive(Debug, Clone)]
pub struct Requires {
    member: String,
    requires: Vec<String>,
}

impl Requires {
    /// Creates a dependency of `member` on `requires`.
    pub fn new<I, S>(member: &str, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            member: member.to_string(),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for Requires {
    fn validate(&self, _command: &CommandNode, options: &Options) -> Vec<ValidationIssue> {
        if !options.is_explicitly_set(&self.member) {
            return Vec::new();
        }
        self.requires
            .iter()
            .filter(|r| !options.is_explicitly_set(r))
            .map(|r| ValidationIssue::for_member(&self.member, format!("requires {r}")))
            .collect()
    }
}

/// Runs all validation stages for `command` and concatenates their issues.
pub fn validate_parsed(
    validators: &[Arc<dyn Validator>],
    command: &CommandNode,
    options: &Options,
) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = validators
        .iter()
        .flat_map(|v| v.validate(command, options))
        .collect();

    if let Some(hook) = command.options_validation() {
        issues.extend(hook(options));
    }
    for validator in command.validators() {
        issues.extend(validator.validate(command, options));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandTree, bind_member};
    use crate::schema::{OptionMember, PropertyType};

    fn setup() -> (CommandTree, Options) {
        let mut tree = CommandTree::new();
        let id = tree
            .register(
                CommandNode::new("push")
                    .with_option(OptionMember::flag("force"))
                    .with_option(OptionMember::flag("dry-run"))
                    .with_option(OptionMember::flag("yes")),
                None,
            )
            .unwrap();
        (tree, Options::new(id))
    }

    #[test]
    fn test_conflicts_only_counts_explicit_members() {
        let (tree, mut options) = setup();
        let node = tree.node(options.command()).clone();
        let conflicts = Conflicts::new(["force", "dry-run"]);

        bind_member(&node.options[0].member, &mut options, &["true"]).unwrap();
        assert!(conflicts.validate(&node, &options).is_empty());

        bind_member(&node.options[1].member, &mut options, &["false"]).unwrap();
        let issues = conflicts.validate(&node, &options);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "force, dry-run cannot be used together");
    }

    #[test]
    fn test_requires_reports_each_missing_member() {
        let (tree, mut options) = setup();
        let node = tree.node(options.command()).clone();
        let requires = Requires::new("force", ["yes", "dry-run"]);

        assert!(requires.validate(&node, &options).is_empty());
        bind_member(&node.options[0].member, &mut options, &["true"]).unwrap();
        let issues = requires.validate(&node, &options);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].to_string(), "force: requires yes");
    }

    #[test]
    fn test_pipeline_runs_all_stages_in_order() {
        let node = CommandNode::new("x")
            .with_option(OptionMember::new("n", PropertyType::flag()))
            .with_validator(|_: &CommandNode, _: &Options| vec![ValidationIssue::new("command")]);
        let mut tree = CommandTree::new();
        let id = tree.register(node, None).unwrap();
        let global: Arc<dyn Validator> =
            Arc::new(|_: &CommandNode, _: &Options| vec![ValidationIssue::new("global")]);

        let issues = validate_parsed(&[global], tree.node(id), &Options::new(id));
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["global", "command"]);
    }
}
