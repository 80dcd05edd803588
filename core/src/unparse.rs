//! Turning a bound options instance back into argument tokens.
//!
//! [`to_args`] writes only what the user would have had to type: the command
//! path, explicitly set options, and positional values. Parsing its output
//! against the same tree yields the same values.

use crate::options::Options;
use crate::schema::OptionMember;
use crate::tree::CommandTree;
use crate::value::Value;

/// Serializes `options` to the arguments that produce it.
///
/// Options are written in inline form (`--name=value`, or `-n=value` for
/// short-only options) so values that start with a dash survive. List
/// options repeat once per element. Positional values follow a `--`.
///
/// # Panics
///
/// Panics if the command of `options` is not registered in `tree`.
///
/// # Examples
///
/// ```
/// use command_tree_core::*;
///
/// let mut tree = CommandTree::new();
/// tree.register(
///     CommandNode::new("grep")
///         .with_option(OptionMember::flag("count").with_short('c'))
///         .with_option(OptionMember::new("exclude", PropertyType::list(ValueKind::String)))
///         .with_value(ValueMember::new("pattern", PropertyType::scalar(ValueKind::String), 0)),
///     None,
/// )
/// .unwrap();
///
/// let parser = ArgumentParser::new(&tree);
/// let resolved = parser
///     .parse(&["grep", "-c", "--exclude", "a", "b", "-x-"])
///     .into_result();
/// assert!(resolved.is_err()); // "-x-" reads as an unknown option
///
/// let resolved = parser
///     .parse(&["grep", "-c", "--exclude", "a", "b", "--", "-x-"])
///     .into_result()
///     .unwrap();
/// let args = to_args(&tree, &resolved.options);
/// assert_eq!(
///     args,
///     vec!["grep", "--count=true", "--exclude=a", "--exclude=b", "--", "-x-"]
/// );
/// assert_eq!(parser.parse(&args).into_result().unwrap(), resolved);
/// ```
pub fn to_args(tree: &CommandTree, options: &Options) -> Vec<String> {
    let id = options.command();
    let node = tree.node(id);
    let mut args: Vec<String> = tree
        .path_names(id)
        .into_iter()
        .map(str::to_string)
        .collect();

    for option in &node.options {
        let name = &option.member.name;
        if !options.is_explicitly_set(name) {
            continue;
        }
        match options.value(name) {
            Some(Value::List(items)) => {
                args.extend(items.iter().filter_map(|item| option_arg(option, item)));
            }
            Some(value) => args.extend(option_arg(option, value)),
            None => {}
        }
    }

    let last_set = node
        .values
        .iter()
        .rposition(|v| options.is_explicitly_set(&v.member.name));
    if let Some(last_set) = last_set {
        args.push("--".to_string());
        for value in &node.values[..=last_set] {
            match options.value(&value.member.name) {
                Some(Value::List(items)) => args.extend(items.iter().filter_map(Value::to_token)),
                Some(value) => args.extend(value.to_token()),
                None => {}
            }
        }
    }

    args
}

fn option_arg(option: &OptionMember, value: &Value) -> Option<String> {
    let token = value.to_token()?;
    match (option.long_aliases.first(), option.short_aliases.first()) {
        (Some(long), _) => Some(format!("--{long}={token}")),
        (None, Some(short)) => Some(format!("-{short}={token}")),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ArgumentParser;
    use crate::schema::{CommandNode, PropertyType, ValueKind, ValueMember};

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::group("db"), None).unwrap();
        tree.register(
            CommandNode::new("migrate")
                .with_option(
                    OptionMember::new("steps", PropertyType::scalar(ValueKind::Integer))
                        .short_only()
                        .with_short('n'),
                )
                .with_option(OptionMember::new("limit", PropertyType::nullable(ValueKind::Integer)))
                .with_value(ValueMember::new("from", PropertyType::scalar(ValueKind::String), 0))
                .with_value(ValueMember::new("to", PropertyType::scalar(ValueKind::String), 1)),
            Some("db"),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_short_only_and_defaults_are_omitted() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);
        let resolved = parser
            .parse(&["db", "migrate", "-n", "-2"])
            .into_result()
            .unwrap();

        assert_eq!(to_args(&tree, &resolved.options), vec!["db", "migrate", "-n=-2"]);
    }

    #[test]
    fn test_earlier_positionals_are_written_to_keep_position() {
        let tree = tree();
        let parser = ArgumentParser::new(&tree);
        let resolved = parser
            .parse(&["db", "migrate", "v1", "v2"])
            .into_result()
            .unwrap();

        let args = to_args(&tree, &resolved.options);
        assert_eq!(args, vec!["db", "migrate", "--", "v1", "v2"]);
        assert_eq!(parser.parse(&args).into_result().unwrap(), resolved);
    }
}
