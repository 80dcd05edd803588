//! Static description of commands and their members.
//!
//! A [`CommandNode`] is built once with chained builder methods and handed to
//! [`CommandTree::register`](crate::CommandTree::register). Its options
//! ([`OptionMember`]) and positional values ([`ValueMember`]) share the
//! [`Member`] description: name, [`PropertyType`], required-ness, default and
//! help text.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::execute::{AsyncFnRunner, CommandExecutor, CommandOptions, FnRunner};
use crate::options::Options;
use crate::policy::PolicyOverrides;
use crate::tree::CommandId;
use crate::validate::{ValidationIssue, Validator};
use crate::value::Value;

/// Kind of value a member accepts.
///
/// Selects the converter used for every raw token bound to the member.
///
/// # Examples
///
/// ```
/// use command_tree_core::{Value, ValueKind};
///
/// assert_eq!(ValueKind::default(), ValueKind::String);
/// assert_eq!(ValueKind::Integer.type_default(), Value::Integer(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValueKind {
    /// Boolean switch.
    Bool,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Free text (the default).
    #[default]
    String,
    /// Filesystem path.
    Path,
    /// One of specific choices, matched ignoring ASCII case.
    Choice(Vec<String>),
}

impl ValueKind {
    /// Returns `true` for [`ValueKind::Bool`].
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Value a scalar member of this kind takes when nothing else applies.
    pub fn type_default(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Integer => Value::Integer(0),
            Self::Float => Value::Float(0.0),
            Self::String => Value::String(String::new()),
            Self::Path => Value::Path(Default::default()),
            Self::Choice(choices) => choices
                .first()
                .map_or(Value::String(String::new()), |c| Value::String(c.clone())),
        }
    }
}

/// How many values a member holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Multiplicity {
    /// Exactly one value; defaults to the kind's type default.
    #[default]
    Scalar,
    /// One value or null; defaults to null.
    Nullable,
    /// Any number of values, accumulated across occurrences.
    List,
}

/// Declared type of a member.
///
/// # Examples
///
/// ```
/// use command_tree_core::{PropertyType, Value, ValueKind};
///
/// assert!(PropertyType::list(ValueKind::String).is_list());
/// assert_eq!(PropertyType::nullable(ValueKind::Integer).default_value(), Value::Null);
/// assert!(PropertyType::flag().is_flag());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PropertyType {
    /// Element kind.
    pub kind: ValueKind,
    /// Scalar, nullable or list.
    pub multiplicity: Multiplicity,
}

impl PropertyType {
    /// Single value of `kind`.
    pub fn scalar(kind: ValueKind) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::Scalar,
        }
    }

    /// Single optional value of `kind`.
    pub fn nullable(kind: ValueKind) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::Nullable,
        }
    }

    /// List of `kind` values.
    pub fn list(kind: ValueKind) -> Self {
        Self {
            kind,
            multiplicity: Multiplicity::List,
        }
    }

    /// Scalar boolean.
    pub fn flag() -> Self {
        Self::scalar(ValueKind::Bool)
    }

    /// Returns `true` for list members.
    pub fn is_list(&self) -> bool {
        self.multiplicity == Multiplicity::List
    }

    /// Returns `true` for non-list boolean members.
    pub fn is_flag(&self) -> bool {
        self.kind.is_bool() && !self.is_list()
    }

    /// Default when no `default_value` is declared.
    pub fn default_value(&self) -> Value {
        match self.multiplicity {
            Multiplicity::List => Value::List(Vec::new()),
            Multiplicity::Nullable => Value::Null,
            Multiplicity::Scalar => self.kind.type_default(),
        }
    }
}

/// Description shared by options and positional values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Key under which the bound value is stored; unique per command.
    pub name: String,
    /// Declared type.
    pub property_type: PropertyType,
    /// Whether the member must be supplied.
    pub required: bool,
    /// Raw default token, converted like user input.
    pub default_value: Option<String>,
    /// Help text.
    pub help: Option<String>,
    /// Hidden from help output.
    pub hidden: bool,
}

impl Member {
    /// Creates an optional, visible member.
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        Self {
            name: name.to_string(),
            property_type,
            required: false,
            default_value: None,
            help: None,
            hidden: false,
        }
    }
}

/// A named option (`--output`, `-o`).
///
/// Long aliases are stored without the leading `--` and matched ignoring
/// ASCII case; short aliases are single characters matched exactly.
///
/// # Examples
///
/// ```
/// use command_tree_core::{OptionMember, PropertyType, ValueKind};
///
/// let output = OptionMember::new("output", PropertyType::scalar(ValueKind::Path))
///     .with_short('o')
///     .with_default("out");
/// assert!(output.matches_long("OUTPUT"));
/// assert!(output.matches_short('o'));
/// assert_eq!(output.display_name(), "--output");
///
/// let verbose = OptionMember::flag("verbose").with_short('v');
/// assert!(verbose.member.property_type.is_flag());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMember {
    /// Shared member description.
    pub member: Member,
    /// Long forms without the leading `--`.
    pub long_aliases: Vec<String>,
    /// Short forms.
    pub short_aliases: Vec<char>,
}

impl OptionMember {
    /// Creates an option whose only long alias is its name.
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        Self {
            member: Member::new(name, property_type),
            long_aliases: vec![name.to_string()],
            short_aliases: Vec::new(),
        }
    }

    /// Creates a boolean switch.
    pub fn flag(name: &str) -> Self {
        Self::new(name, PropertyType::flag())
    }

    /// Adds a long alias (a leading `--` is stripped).
    pub fn with_long(mut self, alias: &str) -> Self {
        let alias = alias.trim_start_matches("--").to_string();
        if !self.long_aliases.contains(&alias) {
            self.long_aliases.push(alias);
        }
        self
    }

    /// Removes all long aliases, leaving a short-only option.
    pub fn short_only(mut self) -> Self {
        self.long_aliases.clear();
        self
    }

    /// Adds a short alias.
    pub fn with_short(mut self, alias: char) -> Self {
        if !self.short_aliases.contains(&alias) {
            self.short_aliases.push(alias);
        }
        self
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.member.required = true;
        self
    }

    /// Sets the raw default token.
    pub fn with_default(mut self, raw: &str) -> Self {
        self.member.default_value = Some(raw.to_string());
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.member.help = Some(help.to_string());
        self
    }

    /// Hides the option from help output.
    pub fn hidden(mut self) -> Self {
        self.member.hidden = true;
        self
    }

    /// Matches a long alias, ignoring ASCII case.
    pub fn matches_long(&self, name: &str) -> bool {
        self.long_aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// Matches a short alias exactly.
    pub fn matches_short(&self, alias: char) -> bool {
        self.short_aliases.contains(&alias)
    }

    /// Preferred spelling: the first long alias, else the first short one.
    pub fn display_name(&self) -> String {
        match (self.long_aliases.first(), self.short_aliases.first()) {
            (Some(long), _) => format!("--{long}"),
            (None, Some(short)) => format!("-{short}"),
            (None, None) => self.member.name.clone(),
        }
    }
}

/// A positional value, bound in ascending `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMember {
    /// Shared member description.
    pub member: Member,
    /// Name shown in usage lines.
    pub display_name: String,
    /// Binding position; lower binds first.
    pub order: i32,
}

impl ValueMember {
    /// Creates a positional value displayed under its own name.
    pub fn new(name: &str, property_type: PropertyType, order: i32) -> Self {
        Self {
            member: Member::new(name, property_type),
            display_name: name.to_string(),
            order,
        }
    }

    /// Sets the usage name.
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    /// Marks the value as required.
    pub fn required(mut self) -> Self {
        self.member.required = true;
        self
    }

    /// Sets the raw default token.
    pub fn with_default(mut self, raw: &str) -> Self {
        self.member.default_value = Some(raw.to_string());
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.member.help = Some(help.to_string());
        self
    }

    /// Hides the value from help output.
    pub fn hidden(mut self) -> Self {
        self.member.hidden = true;
        self
    }
}

pub(crate) type OptionsHook = Arc<dyn Fn(&Options) -> Vec<ValidationIssue> + Send + Sync>;

/// One command of the tree.
///
/// The canonical `name` is always the first entry of `aliases`. The `key` is
/// the registration identity: it defaults to the name (or to the Rust type
/// name for [`typed`](CommandNode::typed) commands) and must be unique across
/// the whole tree, while aliases only need to be unique among siblings.
///
/// # Examples
///
/// ```
/// use command_tree_core::{CommandNode, OptionMember, PropertyType, ValueKind, ValueMember};
///
/// let test = CommandNode::new("test")
///     .with_alias("t")
///     .with_description("Run the test suite")
///     .with_option(OptionMember::flag("release").with_short('r'))
///     .with_value(ValueMember::new("pattern", PropertyType::list(ValueKind::String), 0));
///
/// assert_eq!(test.key(), "test");
/// assert!(test.matches_alias("T"));
/// assert!(test.find_short_option('r').is_some());
/// assert!(test.is_executable);
/// ```
#[derive(Clone)]
pub struct CommandNode {
    key: String,
    /// Canonical name.
    pub name: String,
    /// Every alias, canonical name first.
    pub aliases: Vec<String>,
    /// Short description.
    pub description: Option<String>,
    /// Selected when no command is named.
    pub is_default: bool,
    /// Whether the command can be invoked (groups are not).
    pub is_executable: bool,
    /// Hidden from help output.
    pub hidden: bool,
    /// Sort key for help listings.
    pub help_order: i32,
    /// Version shown instead of the application version.
    pub version: Option<String>,
    /// Named options.
    pub options: Vec<OptionMember>,
    /// Positional values, sorted by `order` on registration.
    pub values: Vec<ValueMember>,
    /// Parser policy overrides.
    pub policy: PolicyOverrides,
    pub(crate) parent: Option<CommandId>,
    pub(crate) children: Vec<CommandId>,
    executor: Option<Arc<dyn CommandExecutor>>,
    options_validation: Option<OptionsHook>,
    validators: Vec<Arc<dyn Validator>>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("is_default", &self.is_default)
            .field("is_executable", &self.is_executable)
            .field("options", &self.options)
            .field("values", &self.values)
            .field("policy", &self.policy)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("has_executor", &self.executor.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandNode {
    /// Creates an executable command.
    pub fn new(name: &str) -> Self {
        Self {
            key: name.to_string(),
            name: name.to_string(),
            aliases: vec![name.to_string()],
            description: None,
            is_default: false,
            is_executable: true,
            hidden: false,
            help_order: 0,
            version: None,
            options: Vec::new(),
            values: Vec::new(),
            policy: PolicyOverrides::default(),
            parent: None,
            children: Vec::new(),
            executor: None,
            options_validation: None,
            validators: Vec::new(),
        }
    }

    /// Creates a non-executable grouping command.
    pub fn group(name: &str) -> Self {
        let mut node = Self::new(name);
        node.is_executable = false;
        node
    }

    /// Creates a command identified by its options type.
    ///
    /// The key is the type name of `T` and `T`'s self-validation runs after
    /// every successful parse of this command.
    pub fn typed<T: CommandOptions>(name: &str) -> Self {
        Self::new(name)
            .with_key(std::any::type_name::<T>())
            .with_options_type::<T>()
    }

    /// Registration identity.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overrides the registration identity.
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    /// Adds an alias; duplicates (ignoring case) are skipped.
    pub fn with_alias(mut self, alias: &str) -> Self {
        if !self.matches_alias(alias) {
            self.aliases.push(alias.to_string());
        }
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Marks the command as the default command.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Hides the command from help output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Sets the help listing order.
    pub fn with_help_order(mut self, order: i32) -> Self {
        self.help_order = order;
        self
    }

    /// Sets a command-specific version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Adds a named option.
    pub fn with_option(mut self, option: OptionMember) -> Self {
        self.options.push(option);
        self
    }

    /// Adds a positional value.
    pub fn with_value(mut self, value: ValueMember) -> Self {
        self.values.push(value);
        self
    }

    /// Replaces all policy overrides.
    pub fn with_policy(mut self, policy: PolicyOverrides) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides [`ignore_unknown_options`](crate::ParserPolicy::ignore_unknown_options).
    pub fn ignore_unknown_options(mut self, value: bool) -> Self {
        self.policy.ignore_unknown_options = Some(value);
        self
    }

    /// Overrides [`ignore_additional_values`](crate::ParserPolicy::ignore_additional_values).
    pub fn ignore_additional_values(mut self, value: bool) -> Self {
        self.policy.ignore_additional_values = Some(value);
        self
    }

    /// Overrides [`provide_help_command`](crate::ParserPolicy::provide_help_command).
    pub fn provide_help_command(mut self, value: bool) -> Self {
        self.policy.provide_help_command = Some(value);
        self
    }

    /// Overrides [`provide_version_command`](crate::ParserPolicy::provide_version_command).
    pub fn provide_version_command(mut self, value: bool) -> Self {
        self.policy.provide_version_command = Some(value);
        self
    }

    /// Overrides [`provide_help_option`](crate::ParserPolicy::provide_help_option).
    pub fn provide_help_option(mut self, value: bool) -> Self {
        self.policy.provide_help_option = Some(value);
        self
    }

    /// Overrides [`provide_version_option`](crate::ParserPolicy::provide_version_option).
    pub fn provide_version_option(mut self, value: bool) -> Self {
        self.policy.provide_version_option = Some(value);
        self
    }

    /// Attaches an execution strategy and marks the command executable.
    pub fn with_executor(mut self, executor: impl CommandExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self.is_executable = true;
        self
    }

    /// Executes the command with a plain closure.
    pub fn run_with<F>(self, f: F) -> Self
    where
        F: Fn(&Options) -> i32 + Send + Sync + 'static,
    {
        self.with_executor(FnRunner::new(f))
    }

    /// Executes the command with an async closure.
    pub fn run_async_with<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Options) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = i32> + Send + 'static,
    {
        self.with_executor(AsyncFnRunner::new(f))
    }

    /// Runs `T`'s self-validation after every successful parse.
    pub fn with_options_type<T: CommandOptions>(mut self) -> Self {
        self.options_validation = Some(Arc::new(|options: &Options| {
            match T::from_options(options) {
                Ok(typed) => typed.validate(),
                Err(err) => vec![ValidationIssue::new(err.to_string())],
            }
        }));
        self
    }

    /// Adds a command-level validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Parent command, if any.
    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    /// Child commands in registration order.
    pub fn children(&self) -> &[CommandId] {
        &self.children
    }

    /// Attached execution strategy.
    pub fn executor(&self) -> Option<&Arc<dyn CommandExecutor>> {
        self.executor.as_ref()
    }

    pub(crate) fn options_validation(&self) -> Option<&OptionsHook> {
        self.options_validation.as_ref()
    }

    pub(crate) fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    /// Matches any alias, ignoring case.
    pub fn matches_alias(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.aliases.iter().any(|alias| alias.to_lowercase() == token)
    }

    /// Finds an option by long alias (without `--`).
    pub fn find_long_option(&self, name: &str) -> Option<&OptionMember> {
        self.options.iter().find(|o| o.matches_long(name))
    }

    /// Finds an option by short alias.
    pub fn find_short_option(&self, alias: char) -> Option<&OptionMember> {
        self.options.iter().find(|o| o.matches_short(alias))
    }

    /// Every member, options first, then values.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.options
            .iter()
            .map(|o| &o.member)
            .chain(self.values.iter().map(|v| &v.member))
    }

    /// Finds a member by name.
    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members().find(|m| m.name == name)
    }
}
