//! Serializable command metadata for help and version renderers.
//!
//! Rendering itself lives outside this crate. Renderers implement
//! [`HelpRenderer`] and either walk the [`CommandTree`] directly or use the
//! [`CommandDescription`] snapshot, which skips hidden commands and members
//! and orders subcommands by their help order. The same snapshot is what
//! [`AppDescription::to_json_pretty`] exports for out-of-process tooling.
//!
//! # Examples
//!
//! ```
//! use command_tree_core::*;
//!
//! let mut tree = CommandTree::new();
//! tree.register(CommandNode::group("remote").with_description("Manage remotes"), None)
//!     .unwrap();
//! let add = tree
//!     .register(
//!         CommandNode::new("add")
//!             .with_value(ValueMember::new("url", PropertyType::scalar(ValueKind::String), 0).required()),
//!         Some("remote"),
//!     )
//!     .unwrap();
//!
//! let settings = ParserSettings::new(AppInfo::new("git").with_version("2.0"));
//! let add = describe_command(&tree, add, &settings);
//! assert_eq!(add.usage, "git remote add <url>");
//! assert_eq!(add.version.as_deref(), Some("2.0"));
//! ```

use serde::Serialize;

use crate::config::ParserSettings;
use crate::schema::{CommandNode, Member, ValueKind};
use crate::tree::{CommandId, CommandTree};

/// A visible named option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDescription {
    /// Member name.
    pub name: String,
    /// Spellings as typed: long forms first (`--output`), then short (`-o`).
    pub aliases: Vec<String>,
    /// Value type label, e.g. `integer` or `json|text`.
    pub value_type: String,
    /// Whether the option can be repeated to collect a list.
    pub list: bool,
    /// Boolean switch that takes no value.
    pub flag: bool,
    /// Must be supplied.
    pub required: bool,
    /// Raw default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A visible positional value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDescription {
    /// Member name.
    pub name: String,
    /// Usage name.
    pub display_name: String,
    /// Value type label.
    pub value_type: String,
    /// Collects all remaining positional tokens.
    pub list: bool,
    /// Must be supplied.
    pub required: bool,
    /// Raw default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Snapshot of one command and its visible subcommands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescription {
    /// Canonical name.
    pub name: String,
    /// Canonical names from the root down to this command.
    pub path: Vec<String>,
    /// Additional aliases.
    pub aliases: Vec<String>,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One-line usage, starting with the program name.
    pub usage: String,
    /// Can be invoked directly.
    pub executable: bool,
    /// Selected when no command is named.
    pub is_default: bool,
    /// Version shown for this command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Visible options.
    pub options: Vec<OptionDescription>,
    /// Visible positional values, in binding order.
    pub values: Vec<ValueDescription>,
    /// Visible subcommands, by help order.
    pub subcommands: Vec<CommandDescription>,
}

/// Snapshot of the whole application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppDescription {
    /// Program name.
    pub name: String,
    /// Application version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Copyright year.
    pub year: i32,
    /// Visible root commands, by help order.
    pub commands: Vec<CommandDescription>,
}

impl AppDescription {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the description types themselves always
    /// serialize.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Renders help and version text for a help/version request.
///
/// `target` is the command the request was made for (`None` for the
/// application as a whole).
pub trait HelpRenderer {
    /// Full help text.
    fn render_help(
        &self,
        target: Option<CommandId>,
        tree: &CommandTree,
        settings: &ParserSettings,
    ) -> String;

    /// Version line; `<name> <version>` unless overridden.
    fn render_version(
        &self,
        target: Option<CommandId>,
        tree: &CommandTree,
        settings: &ParserSettings,
    ) -> String {
        let version = resolve_version(tree, target, settings).unwrap_or_else(|| "unknown".to_string());
        format!("{} {version}", settings.app.name)
    }
}

/// Version for `target`: the closest command-level override, else the
/// application version.
pub fn resolve_version(
    tree: &CommandTree,
    target: Option<CommandId>,
    settings: &ParserSettings,
) -> Option<String> {
    target
        .and_then(|id| {
            tree.path(id)
                .into_iter()
                .rev()
                .find_map(|id| tree.node(id).version.clone())
        })
        .or_else(|| settings.app.version.clone())
}

/// Describes `id` and its visible subtree.
pub fn describe_command(
    tree: &CommandTree,
    id: CommandId,
    settings: &ParserSettings,
) -> CommandDescription {
    let node = tree.node(id);
    let path: Vec<String> = tree
        .path_names(id)
        .into_iter()
        .map(str::to_string)
        .collect();

    CommandDescription {
        name: node.name.clone(),
        aliases: node.aliases.iter().skip(1).cloned().collect(),
        description: node.description.clone(),
        usage: usage(tree, id, &settings.app.name),
        executable: node.is_executable,
        is_default: node.is_default,
        version: resolve_version(tree, Some(id), settings),
        options: node
            .options
            .iter()
            .filter(|o| !o.member.hidden)
            .map(|o| OptionDescription {
                name: o.member.name.clone(),
                aliases: o
                    .long_aliases
                    .iter()
                    .map(|l| format!("--{l}"))
                    .chain(o.short_aliases.iter().map(|s| format!("-{s}")))
                    .collect(),
                value_type: type_label(&o.member),
                list: o.member.property_type.is_list(),
                flag: o.member.property_type.is_flag(),
                required: o.member.required,
                default: o.member.default_value.clone(),
                help: o.member.help.clone(),
            })
            .collect(),
        values: node
            .values
            .iter()
            .filter(|v| !v.member.hidden)
            .map(|v| ValueDescription {
                name: v.member.name.clone(),
                display_name: v.display_name.clone(),
                value_type: type_label(&v.member),
                list: v.member.property_type.is_list(),
                required: v.member.required,
                default: v.member.default_value.clone(),
                help: v.member.help.clone(),
            })
            .collect(),
        subcommands: visible(tree, node.children())
            .into_iter()
            .map(|child| describe_command(tree, child, settings))
            .collect(),
        path,
    }
}

/// Describes the application and every visible command.
///
/// # Examples
///
/// ```
/// use command_tree_core::*;
///
/// let mut tree = CommandTree::new();
/// tree.register(CommandNode::new("zeta").with_help_order(1), None).unwrap();
/// tree.register(CommandNode::new("alpha").with_help_order(2), None).unwrap();
/// tree.register(CommandNode::new("debug").hidden(), None).unwrap();
///
/// let app = describe_tree(&tree, &ParserSettings::new(AppInfo::new("tool")));
/// let names: Vec<_> = app.commands.iter().map(|c| c.name.as_str()).collect();
/// assert_eq!(names, vec!["zeta", "alpha"]);
/// assert!(app.to_json_pretty().unwrap().contains("\"zeta\""));
/// ```
pub fn describe_tree(tree: &CommandTree, settings: &ParserSettings) -> AppDescription {
    AppDescription {
        name: settings.app.name.clone(),
        version: settings.app.version.clone(),
        author: settings.app.author.clone(),
        year: settings.app.year,
        commands: visible(tree, tree.root_commands())
            .into_iter()
            .map(|id| describe_command(tree, id, settings))
            .collect(),
    }
}

/// One-line usage for `id`, e.g. `tool remote add [options] <url>`.
pub fn usage(tree: &CommandTree, id: CommandId, program: &str) -> String {
    let node = tree.node(id);
    let mut parts: Vec<String> = Vec::new();
    if !program.is_empty() {
        parts.push(program.to_string());
    }
    parts.extend(tree.path_names(id).into_iter().map(str::to_string));

    if node.options.iter().any(|o| !o.member.hidden) {
        parts.push("[options]".to_string());
    }
    for value in node.values.iter().filter(|v| !v.member.hidden) {
        let ellipsis = if value.member.property_type.is_list() { "..." } else { "" };
        parts.push(if value.member.required {
            format!("<{}>{ellipsis}", value.display_name)
        } else {
            format!("[{}]{ellipsis}", value.display_name)
        });
    }
    if has_visible_children(tree, node) {
        parts.push("<command>".to_string());
    }
    parts.join(" ")
}

fn has_visible_children(tree: &CommandTree, node: &CommandNode) -> bool {
    node.children().iter().any(|c| !tree.node(*c).hidden)
}

/// Non-hidden ids, stable-sorted by help order.
fn visible(tree: &CommandTree, ids: &[CommandId]) -> Vec<CommandId> {
    let mut ids: Vec<CommandId> = ids
        .iter()
        .copied()
        .filter(|id| !tree.node(*id).hidden)
        .collect();
    ids.sort_by_key(|id| tree.node(*id).help_order);
    ids
}

fn type_label(member: &Member) -> String {
    match &member.property_type.kind {
        ValueKind::Bool => "bool".to_string(),
        ValueKind::Integer => "integer".to_string(),
        ValueKind::Float => "number".to_string(),
        ValueKind::String => "string".to_string(),
        ValueKind::Path => "path".to_string(),
        ValueKind::Choice(choices) => choices.join("|"),
    }
}
