//! The command registry.
//!
//! [`CommandTree`] owns every [`CommandNode`] in an arena addressed by
//! [`CommandId`]. Children are stored as id lists and parents as ids, so the
//! tree never holds cross references. Registration validates the node and its
//! members completely before touching the arena: a rejected node leaves the
//! tree exactly as it was.
//!
//! # Example
//!
//! ```
//! use command_tree_core::*;
//!
//! let mut tree = CommandTree::new();
//! let remote = tree.register(CommandNode::group("remote"), None).unwrap();
//! let add = tree.register(CommandNode::new("add"), Some("remote")).unwrap();
//!
//! assert_eq!(tree.root_commands(), &[remote]);
//! assert_eq!(tree.find_child(Some(remote), "ADD"), Some(add));
//!
//! // Aliases only collide among siblings.
//! let err = tree.register(CommandNode::new("add2").with_alias("add"), Some("remote"));
//! assert!(matches!(err, Err(RegistryError::AliasCollision { .. })));
//! assert!(tree.register(CommandNode::new("add").with_key("top-add"), None).is_ok());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::execute::ExecutionError;
use crate::parser::Resolved;
use crate::schema::{CommandNode, Member};
use crate::value::{ConversionError, convert};

/// Command aliases: no whitespace or control characters, no leading dash.
static COMMAND_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\p{Cc}-][^\s\p{Cc}]*$").expect("static regex must compile"));

/// Long option aliases (without `--`): additionally no `=`.
static LONG_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\p{Cc}=-][^\s\p{Cc}=]*$").expect("static regex must compile"));

/// Handle of a registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CommandId(usize);

impl CommandId {
    /// Arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Schema declaration mistakes detected at registration.
///
/// These are programmer errors: applications should abort initialization
/// rather than recover from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command with the same key is already registered.
    #[error("command type '{0}' is already registered")]
    DuplicateCommandType(String),
    /// The declared parent has not been registered (yet).
    #[error("parent '{parent}' of command '{command}' is not registered")]
    UnknownParent {
        /// Key of the rejected command.
        command: String,
        /// Missing parent key.
        parent: String,
    },
    /// An alias is already used by a sibling.
    #[error("alias '{alias}' of command '{command}' collides with sibling '{existing}'")]
    AliasCollision {
        /// Key of the rejected command.
        command: String,
        /// Colliding alias.
        alias: String,
        /// Key of the sibling that owns the alias.
        existing: String,
    },
    /// Another default command exists.
    #[error("command '{command}' cannot be the default: '{existing}' already is")]
    DuplicateDefault {
        /// Key of the rejected command.
        command: String,
        /// Key of the current default.
        existing: String,
    },
    /// A group that cannot run on its own is marked as the default.
    #[error("command '{0}' cannot be the default: it is not executable")]
    DefaultNotExecutable(String),
    /// A command alias is empty or contains whitespace or control characters.
    #[error("invalid alias {alias:?} on command '{command}'")]
    InvalidAlias {
        /// Key of the rejected command.
        command: String,
        /// Offending alias.
        alias: String,
    },
    /// Two members of one command share a name.
    #[error("member '{member}' is declared twice on command '{command}'")]
    DuplicateMember {
        /// Key of the rejected command.
        command: String,
        /// Duplicated member name.
        member: String,
    },
    /// Two options of one command share an alias.
    #[error("option alias '{alias}' is declared twice on command '{command}'")]
    DuplicateOptionAlias {
        /// Key of the rejected command.
        command: String,
        /// Duplicated alias as typed (`--name` or `-n`).
        alias: String,
    },
    /// An option alias cannot be typed as a single token.
    #[error("invalid option alias {alias:?} on command '{command}'")]
    InvalidOptionAlias {
        /// Key of the rejected command.
        command: String,
        /// Offending alias.
        alias: String,
    },
    /// A declared default does not convert to the member's type.
    #[error("default {value:?} of member '{member}' on command '{command}' is invalid: {source}")]
    InvalidDefault {
        /// Key of the rejected command.
        command: String,
        /// Member name.
        member: String,
        /// Declared default.
        value: String,
        /// Conversion failure.
        #[source]
        source: ConversionError,
    },
    /// A list-typed positional value is followed by other values.
    #[error("list value '{member}' on command '{command}' must be the last positional value")]
    ListValueNotLast {
        /// Key of the rejected command.
        command: String,
        /// Member name.
        member: String,
    },
    /// No command is registered under the key.
    #[error("command '{0}' is not registered")]
    UnknownCommand(String),
}

/// Arena-backed command registry.
///
/// Populated during a single-threaded setup phase, then shared read-only
/// (`&CommandTree` is `Send + Sync`) by any number of parses.
#[derive(Debug, Default)]
pub struct CommandTree {
    nodes: Vec<Option<CommandNode>>,
    roots: Vec<CommandId>,
    default: Option<CommandId>,
    by_key: HashMap<String, CommandId>,
}

impl CommandTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` at the root or under the command keyed `parent`.
    ///
    /// Values are sorted by their declared order before the checks run.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] describing the first problem found; the
    /// tree is not modified in that case.
    pub fn register(
        &mut self,
        mut node: CommandNode,
        parent: Option<&str>,
    ) -> Result<CommandId, RegistryError> {
        let key = node.key().to_string();
        if self.by_key.contains_key(&key) {
            return Err(RegistryError::DuplicateCommandType(key));
        }

        let parent_id = match parent {
            Some(parent) => Some(*self.by_key.get(parent).ok_or_else(|| {
                RegistryError::UnknownParent {
                    command: key.clone(),
                    parent: parent.to_string(),
                }
            })?),
            None => None,
        };

        node.values.sort_by_key(|value| value.order);
        validate_aliases(&key, &node)?;
        validate_members(&key, &node)?;
        self.check_siblings(&key, &node, parent_id)?;

        if node.is_default && !node.is_executable {
            return Err(RegistryError::DefaultNotExecutable(key));
        }
        if node.is_default {
            if let Some(existing) = self.default {
                return Err(RegistryError::DuplicateDefault {
                    command: key,
                    existing: self.node(existing).key().to_string(),
                });
            }
        }

        let id = CommandId(self.nodes.len());
        node.parent = parent_id;
        node.children.clear();
        if node.is_default {
            self.default = Some(id);
        }
        debug!(command = %key, parent = ?parent, default = node.is_default, "Registered command");
        self.nodes.push(Some(node));
        self.by_key.insert(key, id);
        match parent_id {
            Some(parent_id) => self.node_mut(parent_id).children.push(id),
            None => self.roots.push(id),
        }

        Ok(id)
    }

    /// Removes the command keyed `key` together with all its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownCommand`] if nothing is registered
    /// under `key`.
    pub fn unregister(&mut self, key: &str) -> Result<(), RegistryError> {
        let id = self
            .find(key)
            .ok_or_else(|| RegistryError::UnknownCommand(key.to_string()))?;
        self.remove_subtree(id);
        Ok(())
    }

    fn remove_subtree(&mut self, id: CommandId) {
        for child in self.node(id).children.clone() {
            self.remove_subtree(child);
        }

        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        match node.parent {
            Some(parent) => self.node_mut(parent).children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }
        if self.default == Some(id) {
            self.default = None;
        }
        self.by_key.remove(node.key());
        debug!(command = %node.key(), "Unregistered command");
    }

    fn check_siblings(
        &self,
        key: &str,
        node: &CommandNode,
        parent: Option<CommandId>,
    ) -> Result<(), RegistryError> {
        for &sibling in self.scope(parent) {
            let sibling = self.node(sibling);
            if let Some(alias) = node.aliases.iter().find(|a| sibling.matches_alias(a)) {
                return Err(RegistryError::AliasCollision {
                    command: key.to_string(),
                    alias: alias.clone(),
                    existing: sibling.key().to_string(),
                });
            }
        }
        Ok(())
    }

    fn scope(&self, parent: Option<CommandId>) -> &[CommandId] {
        match parent {
            Some(parent) => &self.node(parent).children,
            None => &self.roots,
        }
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was unregistered. Ids handed out by this tree stay
    /// valid until [`unregister`](Self::unregister) removes them.
    pub fn node(&self, id: CommandId) -> &CommandNode {
        self.get(id)
            .unwrap_or_else(|| panic!("command {id:?} is not registered"))
    }

    fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("command {id:?} is not registered"))
    }

    /// Returns the node for `id`, if still registered.
    pub fn get(&self, id: CommandId) -> Option<&CommandNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Looks up a command by registration key.
    pub fn find(&self, key: &str) -> Option<CommandId> {
        self.by_key.get(key).copied()
    }

    /// Root-scope commands in registration order.
    pub fn root_commands(&self) -> &[CommandId] {
        &self.roots
    }

    /// Children of `id` in registration order.
    pub fn children(&self, id: CommandId) -> &[CommandId] {
        &self.node(id).children
    }

    /// Parent of `id`.
    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.node(id).parent
    }

    /// The tree-wide default command.
    pub fn default_command(&self) -> Option<CommandId> {
        self.default
    }

    /// The default command, if it is a direct child of `id`.
    pub fn default_child(&self, id: CommandId) -> Option<CommandId> {
        self.default.filter(|d| self.parent(*d) == Some(id))
    }

    /// Ancestor chain of `id`, root first, ending with `id`.
    pub fn path(&self, id: CommandId) -> Vec<CommandId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Canonical names along [`path`](Self::path).
    pub fn path_names(&self, id: CommandId) -> Vec<&str> {
        self.path(id)
            .into_iter()
            .map(|id| self.node(id).name.as_str())
            .collect()
    }

    /// Finds the child of `scope` (or root command) matching `alias`, ignoring case.
    pub fn find_child(&self, scope: Option<CommandId>, alias: &str) -> Option<CommandId> {
        self.scope(scope)
            .iter()
            .copied()
            .find(|id| self.node(*id).matches_alias(alias))
    }

    /// Registered commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CommandId, &CommandNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_ref().map(|node| (CommandId(i), node)))
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Executes a parsed command with its registered strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NotExecutable`] for groups,
    /// [`ExecutionError::NoExecutor`] when no strategy is attached, or the
    /// strategy's own error.
    pub fn execute(&self, resolved: &Resolved) -> Result<i32, ExecutionError> {
        let node = self.node(resolved.command);
        if !node.is_executable {
            return Err(ExecutionError::NotExecutable(node.name.clone()));
        }
        let executor = node
            .executor()
            .ok_or_else(|| ExecutionError::NoExecutor(node.name.clone()))?;
        executor.execute(&resolved.options)
    }

    /// Async counterpart of [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute); lookup failures resolve immediately.
    pub async fn execute_async(&self, resolved: Resolved) -> Result<i32, ExecutionError> {
        let node = self.node(resolved.command);
        if !node.is_executable {
            return Err(ExecutionError::NotExecutable(node.name.clone()));
        }
        let executor = node
            .executor()
            .cloned()
            .ok_or_else(|| ExecutionError::NoExecutor(node.name.clone()))?;
        executor.execute_async(resolved.options).await
    }
}

fn validate_aliases(key: &str, node: &CommandNode) -> Result<(), RegistryError> {
    if node.aliases.is_empty() {
        return Err(RegistryError::InvalidAlias {
            command: key.to_string(),
            alias: String::new(),
        });
    }
    match node.aliases.iter().find(|a| !COMMAND_ALIAS_RE.is_match(a)) {
        Some(alias) => Err(RegistryError::InvalidAlias {
            command: key.to_string(),
            alias: alias.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_members(key: &str, node: &CommandNode) -> Result<(), RegistryError> {
    let mut names = HashSet::new();
    for member in node.members() {
        if !names.insert(member.name.as_str()) {
            return Err(RegistryError::DuplicateMember {
                command: key.to_string(),
                member: member.name.clone(),
            });
        }
        validate_default(key, member)?;
    }

    let mut seen = HashSet::new();
    for option in &node.options {
        for long in &option.long_aliases {
            if !LONG_ALIAS_RE.is_match(long) {
                return Err(RegistryError::InvalidOptionAlias {
                    command: key.to_string(),
                    alias: long.clone(),
                });
            }
            if !seen.insert(format!("--{}", long.to_ascii_lowercase())) {
                return Err(RegistryError::DuplicateOptionAlias {
                    command: key.to_string(),
                    alias: format!("--{long}"),
                });
            }
        }
        for short in &option.short_aliases {
            // `-1` and `-.` are read as negative numbers.
            if short.is_whitespace()
                || short.is_control()
                || short.is_ascii_digit()
                || matches!(*short, '-' | '.')
            {
                return Err(RegistryError::InvalidOptionAlias {
                    command: key.to_string(),
                    alias: short.to_string(),
                });
            }
            if !seen.insert(format!("-{short}")) {
                return Err(RegistryError::DuplicateOptionAlias {
                    command: key.to_string(),
                    alias: format!("-{short}"),
                });
            }
        }
    }

    let last = node.values.len().saturating_sub(1);
    match node
        .values
        .iter()
        .enumerate()
        .find(|(i, v)| v.member.property_type.is_list() && *i != last)
    {
        Some((_, value)) => Err(RegistryError::ListValueNotLast {
            command: key.to_string(),
            member: value.member.name.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_default(key: &str, member: &Member) -> Result<(), RegistryError> {
    let Some(raw) = &member.default_value else {
        return Ok(());
    };
    convert(&member.property_type.kind, raw)
        .map(|_| ())
        .map_err(|source| RegistryError::InvalidDefault {
            command: key.to_string(),
            member: member.name.clone(),
            value: raw.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OptionMember, PropertyType, ValueKind, ValueMember};

    #[test]
    fn test_register_rejects_duplicate_key() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::new("build"), None).unwrap();

        let err = tree.register(CommandNode::new("build"), None).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCommandType("build".to_string()));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_register_requires_parent_first() {
        let mut tree = CommandTree::new();
        let err = tree
            .register(CommandNode::new("add"), Some("remote"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownParent { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_alias_collision_is_case_insensitive_and_leaves_tree_unchanged() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::new("build").with_alias("b"), None)
            .unwrap();

        let err = tree
            .register(CommandNode::new("bench").with_alias("B"), None)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AliasCollision {
                command: "bench".to_string(),
                alias: "B".to_string(),
                existing: "build".to_string(),
            }
        );
        assert_eq!(tree.root_commands().len(), 1);
        assert!(tree.find("bench").is_none());
    }

    #[test]
    fn test_alias_scopes_are_independent() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::group("a"), None).unwrap();
        tree.register(CommandNode::group("b"), Some("a")).unwrap();
        tree.register(CommandNode::group("c"), Some("b")).unwrap();
        let deep = tree
            .register(CommandNode::new("a").with_key("a/b/c/a"), Some("c"))
            .unwrap();
        assert_eq!(tree.path_names(deep), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_single_default_tree_wide() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::group("remote"), None).unwrap();
        let list = tree
            .register(CommandNode::new("list").as_default(), Some("remote"))
            .unwrap();

        let err = tree
            .register(CommandNode::new("status").as_default(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDefault { .. }));
        assert_eq!(tree.default_command(), Some(list));
        assert_eq!(tree.default_child(tree.find("remote").unwrap()), Some(list));
        assert!(tree.find("status").is_none());
    }

    #[test]
    fn test_default_must_be_executable() {
        let mut tree = CommandTree::new();
        let err = tree
            .register(CommandNode::group("remote").as_default(), None)
            .unwrap_err();
        assert_eq!(err, RegistryError::DefaultNotExecutable("remote".to_string()));
        assert!(tree.is_empty());
        assert_eq!(tree.default_command(), None);

        let status = tree
            .register(CommandNode::group("status").as_default().run_with(|_| 0), None)
            .unwrap();
        assert_eq!(tree.default_command(), Some(status));
    }

    #[test]
    fn test_invalid_aliases_rejected() {
        let mut tree = CommandTree::new();
        for alias in ["", "two words", "tab\there", "-dash"] {
            let err = tree
                .register(CommandNode::new("ok").with_key(alias).with_alias(alias), None)
                .unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidAlias { .. }),
                "{alias:?}: {err}"
            );
        }
    }

    #[test]
    fn test_member_declarations_checked() {
        let mut tree = CommandTree::new();

        let dup = CommandNode::new("a")
            .with_option(OptionMember::flag("x"))
            .with_value(ValueMember::new("x", PropertyType::scalar(ValueKind::String), 0));
        assert!(matches!(
            tree.register(dup, None),
            Err(RegistryError::DuplicateMember { .. })
        ));

        let dup_short = CommandNode::new("b")
            .with_option(OptionMember::flag("all").with_short('a'))
            .with_option(OptionMember::flag("append").with_short('a'));
        assert_eq!(
            tree.register(dup_short, None),
            Err(RegistryError::DuplicateOptionAlias {
                command: "b".to_string(),
                alias: "-a".to_string(),
            })
        );

        let bad_long = CommandNode::new("c").with_option(OptionMember::flag("x").with_long("a=b"));
        assert!(matches!(
            tree.register(bad_long, None),
            Err(RegistryError::InvalidOptionAlias { .. })
        ));

        for short in ['1', '0', '.'] {
            let numeric = CommandNode::new("n").with_option(OptionMember::flag("one").with_short(short));
            assert_eq!(
                tree.register(numeric, None),
                Err(RegistryError::InvalidOptionAlias {
                    command: "n".to_string(),
                    alias: short.to_string(),
                })
            );
        }

        let bad_default = CommandNode::new("d").with_option(
            OptionMember::new("jobs", PropertyType::scalar(ValueKind::Integer)).with_default("many"),
        );
        assert!(matches!(
            tree.register(bad_default, None),
            Err(RegistryError::InvalidDefault { .. })
        ));

        let list_first = CommandNode::new("e")
            .with_value(ValueMember::new("files", PropertyType::list(ValueKind::Path), 0))
            .with_value(ValueMember::new("dest", PropertyType::scalar(ValueKind::Path), 1));
        assert!(matches!(
            tree.register(list_first, None),
            Err(RegistryError::ListValueNotLast { .. })
        ));

        assert!(tree.is_empty());
    }

    #[test]
    fn test_values_sorted_by_order() {
        let mut tree = CommandTree::new();
        let id = tree
            .register(
                CommandNode::new("cp")
                    .with_value(ValueMember::new("dest", PropertyType::scalar(ValueKind::Path), 2))
                    .with_value(ValueMember::new("src", PropertyType::scalar(ValueKind::Path), 1)),
                None,
            )
            .unwrap();
        let names: Vec<_> = tree
            .node(id)
            .values
            .iter()
            .map(|v| v.member.name.as_str())
            .collect();
        assert_eq!(names, vec!["src", "dest"]);
    }

    #[test]
    fn test_unregister_removes_descendants() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::group("remote"), None).unwrap();
        tree.register(CommandNode::group("add"), Some("remote"))
            .unwrap();
        tree.register(CommandNode::new("url").as_default(), Some("add"))
            .unwrap();
        let other = tree.register(CommandNode::new("status"), None).unwrap();

        tree.unregister("remote").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_commands(), &[other]);
        assert_eq!(tree.default_command(), None);
        assert!(tree.find("url").is_none());

        // Keys are free again.
        assert!(tree.register(CommandNode::new("remote"), None).is_ok());
        assert_eq!(
            tree.unregister("missing"),
            Err(RegistryError::UnknownCommand("missing".to_string()))
        );
    }
}
