//! The per-invocation options instance.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::tree::CommandId;
use crate::value::{FromValue, Value};

/// Failure to read a typed value out of an [`Options`] instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No value is bound under the member name.
    #[error("member '{0}' has no value")]
    Missing(String),
    /// The bound value has a different shape than requested.
    #[error("member '{member}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        /// Member name.
        member: String,
        /// Requested Rust type.
        expected: &'static str,
        /// Kind of the bound value.
        found: &'static str,
    },
}

/// Values bound for one parse of one command.
///
/// Besides the `name → value` map, the instance records which members were
/// explicitly supplied. That state belongs to the instance, so concurrent
/// parses against the same command never share it.
///
/// # Examples
///
/// ```
/// use command_tree_core::{CommandNode, CommandTree, Options};
///
/// let mut tree = CommandTree::new();
/// let id = tree.register(CommandNode::new("serve"), None).unwrap();
///
/// let mut options = Options::new(id);
/// options.insert("port", 8080_i64);
/// assert_eq!(options.get::<u16>("port"), Ok(8080));
/// assert!(options.is_explicitly_set("port"));
/// assert!(options.get::<u16>("host").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    #[serde(skip)]
    command: CommandId,
    values: BTreeMap<String, Value>,
    #[serde(skip)]
    explicit: BTreeSet<String>,
}

impl Options {
    /// Creates an empty instance for `command`.
    pub fn new(command: CommandId) -> Self {
        Self {
            command,
            values: BTreeMap::new(),
            explicit: BTreeSet::new(),
        }
    }

    /// Command this instance belongs to.
    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Raw bound value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Typed bound value.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Missing`] when nothing is bound under `name`
    /// and [`ExtractError::TypeMismatch`] when the value has another shape.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ExtractError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ExtractError::Missing(name.to_string()))?;
        T::from_value(value).ok_or_else(|| ExtractError::TypeMismatch {
            member: name.to_string(),
            expected: T::expected(),
            found: value.kind_name(),
        })
    }

    /// Whether `name` was supplied rather than defaulted.
    pub fn is_explicitly_set(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Stores a value as if it had been supplied on the command line.
    ///
    /// Used by [`OptionsProvider`](crate::OptionsProvider)s to inject values.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
        self.explicit.insert(name.to_string());
    }

    /// Bound values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bound members.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn store(&mut self, name: &str, value: Value, explicit: bool) {
        self.values.insert(name.to_string(), value);
        if explicit {
            self.explicit.insert(name.to_string());
        } else {
            self.explicit.remove(name);
        }
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    pub(crate) fn mark_explicit(&mut self, name: &str) {
        self.explicit.insert(name.to_string());
    }
}
