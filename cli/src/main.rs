use std::fmt::{self, Write as _};
use std::path::PathBuf;

use command_tree_core::{
    AppDescription, AppInfo, ArgumentParser, CliErrorType, CommandDescription, CommandId,
    CommandNode, CommandTree, Conflicts, HelpRenderer, OptionMember, Options, ParseOutcome,
    ParserSettings, PropertyType, RegistryError, ValidationIssue, ValueKind, ValueMember,
    describe_command, describe_tree,
};
use tracing::debug;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming an optional YAML settings file.
const SETTINGS_ENV: &str = "COMMAND_TREE_SETTINGS";

/// Key of the command that prints the tree description.
const SCHEMA_COMMAND: &str = "schema";

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<i32, String> {
    let settings = load_settings()?;
    let tree = build_tree().map_err(|e| format!("invalid command tree: {e}"))?;
    let parser = ArgumentParser::new(&tree).with_settings(settings.clone());

    match parser.parse(args) {
        ParseOutcome::Success(resolved) => {
            if tree.node(resolved.command).key() == SCHEMA_COMMAND {
                return run_schema(&tree, &settings);
            }
            tree.execute(&resolved).map_err(|e| e.to_string())
        }
        ParseOutcome::Failure(failure) => {
            if let Some(intent) = failure.intent() {
                let text = match intent.kind {
                    CliErrorType::VersionRequested => {
                        PlainRenderer.render_version(intent.command, &tree, &settings)
                    }
                    _ => PlainRenderer.render_help(intent.command, &tree, &settings),
                };
                println!("{text}");
                return Ok(0);
            }
            debug!(errors = failure.errors.len(), "Parse failed");
            let messages: Vec<String> = failure.errors.iter().map(ToString::to_string).collect();
            Err(format!(
                "{}\n(run with --help for usage)",
                messages.join("\nerror: ")
            ))
        }
    }
}

fn load_settings() -> Result<ParserSettings, String> {
    let default_app = AppInfo::new("command-tree-demo").with_version(PACKAGE_VERSION);
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            let mut settings = ParserSettings::load(&path)
                .map_err(|e| format!("failed to load settings from {}: {e}", path.display()))?;
            if settings.app.name.is_empty() {
                settings.app.name = default_app.name;
            }
            if settings.app.version.is_none() {
                settings.app.version = default_app.version;
            }
            Ok(settings)
        }
        None => Ok(ParserSettings::new(default_app)),
    }
}

fn run_schema(tree: &CommandTree, settings: &ParserSettings) -> Result<i32, String> {
    let json = describe_tree(tree, settings)
        .to_json_pretty()
        .map_err(|e| format!("failed to serialize command tree: {e}"))?;
    println!("{json}");
    Ok(0)
}

/// A small task manager: enough surface to exercise groups, defaults,
/// lists, choices and validation.
fn build_tree() -> Result<CommandTree, RegistryError> {
    let mut tree = CommandTree::new();

    tree.register(
        CommandNode::new("add")
            .with_description("Add a task")
            .with_help_order(1)
            .with_option(
                OptionMember::new("tag", PropertyType::list(ValueKind::String))
                    .with_short('t')
                    .with_help("Tag to attach (repeatable)"),
            )
            .with_option(
                OptionMember::new(
                    "priority",
                    PropertyType::scalar(ValueKind::Choice(vec![
                        "normal".into(),
                        "low".into(),
                        "high".into(),
                    ])),
                )
                .with_short('p')
                .with_help("Task priority"),
            )
            .with_option(
                OptionMember::new("due", PropertyType::nullable(ValueKind::Integer))
                    .with_help("Due in this many days"),
            )
            .with_value(
                ValueMember::new("title", PropertyType::list(ValueKind::String), 0)
                    .required()
                    .with_help("Task title"),
            )
            .with_validator(|_: &CommandNode, options: &Options| {
                match options.get::<Option<i64>>("due") {
                    Ok(Some(days)) if days < 0 => {
                        vec![ValidationIssue::for_member("due", "cannot be in the past")]
                    }
                    _ => Vec::new(),
                }
            })
            .run_with(run_add),
        None,
    )?;

    tree.register(
        CommandNode::new("list")
            .with_alias("ls")
            .with_description("List tasks")
            .with_help_order(0)
            .as_default()
            .with_option(OptionMember::flag("all").with_short('a').with_help("Include done tasks"))
            .with_option(OptionMember::flag("json").with_help("Print JSON"))
            .with_option(OptionMember::flag("plain").with_help("Print plain text"))
            .with_option(
                OptionMember::new("limit", PropertyType::scalar(ValueKind::Integer))
                    .with_short('n')
                    .with_default("10")
                    .with_help("Maximum number of tasks"),
            )
            .with_validator(Conflicts::new(["json", "plain"]))
            .run_with(run_list),
        None,
    )?;

    tree.register(
        CommandNode::group("config")
            .with_description("Read or change settings")
            .with_help_order(2),
        None,
    )?;
    tree.register(
        CommandNode::new("get")
            .with_key("config-get")
            .with_description("Print a setting")
            .with_value(ValueMember::new("key", PropertyType::scalar(ValueKind::String), 0).required())
            .run_with(|options| {
                let key = options.get::<String>("key").unwrap_or_default();
                println!("{key} is not set");
                0
            }),
        Some("config"),
    )?;
    tree.register(
        CommandNode::new("set")
            .with_key("config-set")
            .with_description("Change a setting")
            .with_value(ValueMember::new("key", PropertyType::scalar(ValueKind::String), 0).required())
            .with_value(ValueMember::new("value", PropertyType::scalar(ValueKind::String), 1).required())
            .run_with(|options| {
                let key = options.get::<String>("key").unwrap_or_default();
                let value = options.get::<String>("value").unwrap_or_default();
                println!("{key} = {value}");
                0
            }),
        Some("config"),
    )?;

    tree.register(
        CommandNode::new(SCHEMA_COMMAND)
            .with_description("Print the command tree as JSON")
            .with_help_order(3),
        None,
    )?;

    Ok(tree)
}

fn run_add(options: &Options) -> i32 {
    let title = options
        .get::<Vec<String>>("title")
        .unwrap_or_default()
        .join(" ");
    let tags = options.get::<Vec<String>>("tag").unwrap_or_default();
    let priority = options.get::<String>("priority").unwrap_or_default();

    let mut line = format!("added: {title} [{priority}]");
    if !tags.is_empty() {
        line.push_str(&format!(" #{}", tags.join(" #")));
    }
    if let Ok(Some(days)) = options.get::<Option<i64>>("due") {
        line.push_str(&format!(" due in {days}d"));
    }
    println!("{line}");
    0
}

fn run_list(options: &Options) -> i32 {
    let all = options.get::<bool>("all").unwrap_or(false);
    let limit = options.get::<i64>("limit").unwrap_or(10);
    if options.get::<bool>("json").unwrap_or(false) {
        println!("{}", serde_json::json!({ "all": all, "limit": limit, "tasks": [] }));
    } else {
        println!("no tasks (all: {all}, limit: {limit})");
    }
    0
}

/// Plain-text help in the usual `Usage / Options / Commands` layout.
struct PlainRenderer;

impl HelpRenderer for PlainRenderer {
    fn render_help(
        &self,
        target: Option<CommandId>,
        tree: &CommandTree,
        settings: &ParserSettings,
    ) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = match target {
            Some(id) => write_command_help(&mut out, &describe_command(tree, id, settings)),
            None => write_app_help(&mut out, &describe_tree(tree, settings)),
        };
        out.trim_end().to_string()
    }
}

fn write_app_help(out: &mut String, app: &AppDescription) -> fmt::Result {
    writeln!(out, "{} {}", app.name, app.version.as_deref().unwrap_or(""))?;
    if let Some(author) = &app.author {
        writeln!(out, "(c) {} {author}", app.year)?;
    }
    writeln!(out, "\nUsage: {} <command> [options]", app.name)?;
    write_commands(out, &app.commands)
}

fn write_command_help(out: &mut String, command: &CommandDescription) -> fmt::Result {
    if let Some(description) = &command.description {
        writeln!(out, "{description}\n")?;
    }
    writeln!(out, "Usage: {}", command.usage)?;
    if !command.aliases.is_empty() {
        writeln!(out, "Aliases: {}", command.aliases.join(", "))?;
    }
    write_members(out, command)?;
    write_commands(out, &command.subcommands)
}

fn write_members(out: &mut String, command: &CommandDescription) -> fmt::Result {
    if !command.values.is_empty() {
        writeln!(out, "\nArguments:")?;
        for value in &command.values {
            let help = value.help.as_deref().unwrap_or("");
            writeln!(out, "  {:<24}{help}", value.display_name)?;
        }
    }
    if !command.options.is_empty() {
        writeln!(out, "\nOptions:")?;
        for option in &command.options {
            let mut spelling = option.aliases.join(", ");
            if !option.flag {
                write!(spelling, " <{}>", option.value_type)?;
            }
            let mut help = option.help.clone().unwrap_or_default();
            if let Some(default) = &option.default {
                write!(help, " (default: {default})")?;
            }
            writeln!(out, "  {spelling:<24}{}", help.trim())?;
        }
    }
    Ok(())
}

fn write_commands(out: &mut String, commands: &[CommandDescription]) -> fmt::Result {
    if commands.is_empty() {
        return Ok(());
    }
    writeln!(out, "\nCommands:")?;
    for command in commands {
        let marker = if command.is_default { " (default)" } else { "" };
        let description = command.description.as_deref().unwrap_or("");
        writeln!(out, "  {:<24}{description}{marker}", command.name)?;
    }
    Ok(())
}
