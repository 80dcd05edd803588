//! Binding raw tokens to members of an options instance.

use thiserror::Error;

use crate::options::Options;
use crate::schema::{Member, Multiplicity};
use crate::value::{ConversionError, Value, convert};

/// A raw token could not be converted to the member's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot bind '{member}': {cause}")]
pub struct BindError {
    /// Member name.
    pub member: String,
    /// Conversion failure.
    #[source]
    pub cause: ConversionError,
}

/// Converts `raw` tokens and binds them to `member` on `options`.
///
/// List members append to whatever was explicitly bound before on this
/// instance, so `--tag a --tag b` accumulates. Scalar members keep the last
/// token. On success the member is marked explicitly set; on failure the
/// instance is left untouched.
///
/// # Errors
///
/// Returns [`BindError`] when any token fails conversion.
///
/// # Examples
///
/// ```
/// use command_tree_core::{bind_member, CommandNode, CommandTree, Member, Options, PropertyType, Value, ValueKind};
///
/// let mut tree = CommandTree::new();
/// let id = tree.register(CommandNode::new("tag"), None).unwrap();
/// let member = Member::new("tags", PropertyType::list(ValueKind::String));
///
/// let mut options = Options::new(id);
/// bind_member(&member, &mut options, &["a"]).unwrap();
/// bind_member(&member, &mut options, &["b", "c"]).unwrap();
/// assert_eq!(options.value("tags"), Some(&Value::from(vec!["a", "b", "c"])));
/// ```
pub fn bind_member<S: AsRef<str>>(
    member: &Member,
    options: &mut Options,
    raw: &[S],
) -> Result<(), BindError> {
    let kind = &member.property_type.kind;
    let mut converted = raw
        .iter()
        .map(|token| convert(kind, token.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|cause| BindError {
            member: member.name.clone(),
            cause,
        })?;

    if member.property_type.is_list() {
        let append = options.is_explicitly_set(&member.name);
        match options.slot_mut(&member.name) {
            Some(Value::List(items)) if append => items.extend(converted),
            _ => options.store(&member.name, Value::List(converted), true),
        }
        options.mark_explicit(&member.name);
    } else if let Some(last) = converted.pop() {
        options.store(&member.name, last, true);
    }

    Ok(())
}

/// Gives `member` its default value and marks it not explicitly set.
///
/// Lists become empty; other members take the converted `default_value`, or
/// null (nullable) / the kind's type default (scalar).
///
/// # Errors
///
/// Returns [`BindError`] when the declared default does not convert.
/// Registration rejects such defaults, so this only happens for members that
/// never went through a [`CommandTree`](crate::CommandTree).
pub fn apply_default(member: &Member, options: &mut Options) -> Result<(), BindError> {
    let property_type = &member.property_type;
    let value = match (&member.default_value, property_type.multiplicity) {
        (_, Multiplicity::List) | (None, _) => property_type.default_value(),
        (Some(raw), _) => convert(&property_type.kind, raw).map_err(|cause| BindError {
            member: member.name.clone(),
            cause,
        })?,
    };
    options.store(&member.name, value, false);
    Ok(())
}
