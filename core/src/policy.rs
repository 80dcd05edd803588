//! Parser policies and their inheritance through the command tree.
//!
//! Each command may override any policy with a tri-state value: `Some(true)`,
//! `Some(false)` or `None` (inherit). [`effective_policy`] flattens the chain
//! from the application defaults down to one command into a plain
//! [`ParserPolicy`], once per check site, instead of re-walking the parent
//! chain for every flag.

use serde::{Deserialize, Serialize};

use crate::tree::{CommandId, CommandTree};

/// Fully resolved parser behavior.
///
/// Used both as the application-level defaults (see
/// [`ParserSettings`](crate::ParserSettings)) and as the effective policy of a
/// resolved command.
///
/// # Examples
///
/// ```
/// use command_tree_core::ParserPolicy;
///
/// let policy = ParserPolicy::default();
/// assert!(!policy.ignore_unknown_options);
/// assert!(policy.provide_help_option);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPolicy {
    /// Drop unknown options silently instead of reporting them.
    pub ignore_unknown_options: bool,
    /// Drop positional tokens beyond the declared values instead of reporting them.
    pub ignore_additional_values: bool,
    /// Intercept a literal `help` command.
    pub provide_help_command: bool,
    /// Intercept a literal `version` command.
    pub provide_version_command: bool,
    /// Intercept `--help`, `-h` and `-?`.
    pub provide_help_option: bool,
    /// Intercept `--version`.
    pub provide_version_option: bool,
}

impl Default for ParserPolicy {
    fn default() -> Self {
        Self {
            ignore_unknown_options: false,
            ignore_additional_values: false,
            provide_help_command: true,
            provide_version_command: true,
            provide_help_option: true,
            provide_version_option: true,
        }
    }
}

/// Per-command policy overrides; `None` inherits from the parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    /// Override for [`ParserPolicy::ignore_unknown_options`].
    pub ignore_unknown_options: Option<bool>,
    /// Override for [`ParserPolicy::ignore_additional_values`].
    pub ignore_additional_values: Option<bool>,
    /// Override for [`ParserPolicy::provide_help_command`].
    pub provide_help_command: Option<bool>,
    /// Override for [`ParserPolicy::provide_version_command`].
    pub provide_version_command: Option<bool>,
    /// Override for [`ParserPolicy::provide_help_option`].
    pub provide_help_option: Option<bool>,
    /// Override for [`ParserPolicy::provide_version_option`].
    pub provide_version_option: Option<bool>,
}

impl PolicyOverrides {
    /// Applies the set overrides on top of `base`.
    pub fn apply(&self, base: ParserPolicy) -> ParserPolicy {
        ParserPolicy {
            ignore_unknown_options: self
                .ignore_unknown_options
                .unwrap_or(base.ignore_unknown_options),
            ignore_additional_values: self
                .ignore_additional_values
                .unwrap_or(base.ignore_additional_values),
            provide_help_command: self
                .provide_help_command
                .unwrap_or(base.provide_help_command),
            provide_version_command: self
                .provide_version_command
                .unwrap_or(base.provide_version_command),
            provide_help_option: self
                .provide_help_option
                .unwrap_or(base.provide_help_option),
            provide_version_option: self
                .provide_version_option
                .unwrap_or(base.provide_version_option),
        }
    }

    /// Returns `true` when no policy is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Resolves the policy in effect for `command`.
///
/// Overrides are applied root-first, so the closest command that sets a
/// policy wins. `None` yields the application defaults unchanged.
pub fn effective_policy(
    tree: &CommandTree,
    command: Option<CommandId>,
    defaults: &ParserPolicy,
) -> ParserPolicy {
    let Some(command) = command else {
        return *defaults;
    };
    tree.path(command)
        .into_iter()
        .fold(*defaults, |policy, id| tree.node(id).policy.apply(policy))
}
