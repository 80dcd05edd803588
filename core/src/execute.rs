//! Execution strategies for resolved commands.
//!
//! Every executable command exposes the same contract through
//! [`CommandExecutor`]: take the parsed [`Options`], return an exit code,
//! synchronously or as a future. Which strategy backs a command is fixed when
//! the command is built; the parser only cares whether a command is
//! executable.
//!
//! - [`OptionsRunner`]: the options type runs itself ([`Run`]).
//! - [`AsyncOptionsRunner`]: same, asynchronously ([`AsyncRun`]).
//! - [`HandlerRunner`]: an external [`CommandHandler`] receives the options.
//! - [`FnRunner`] / [`AsyncFnRunner`]: a closure registered with the command.
//!
//! # Example
//!
//! ```
//! use command_tree_core::*;
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl CommandOptions for Greet {
//!     fn from_options(options: &Options) -> Result<Self, ExtractError> {
//!         Ok(Self { name: options.get("name")? })
//!     }
//! }
//!
//! impl Run for Greet {
//!     fn run(self) -> i32 {
//!         if self.name.is_empty() { 1 } else { 0 }
//!     }
//! }
//!
//! let mut tree = CommandTree::new();
//! tree.register(
//!     CommandNode::typed::<Greet>("greet")
//!         .with_value(ValueMember::new("name", PropertyType::scalar(ValueKind::String), 0))
//!         .with_executor(OptionsRunner::<Greet>::new()),
//!     None,
//! )
//! .unwrap();
//!
//! let resolved = ArgumentParser::new(&tree).parse(&["greet", "ada"]).into_result().unwrap();
//! assert_eq!(tree.execute(&resolved).unwrap(), 0);
//! ```

use std::fmt;
use std::marker::PhantomData;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::options::{ExtractError, Options};
use crate::validate::ValidationIssue;

/// Failure to invoke a resolved command.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The command is a non-executable group.
    #[error("command '{0}' is not executable")]
    NotExecutable(String),
    /// The command is executable but has no strategy attached.
    #[error("command '{0}' has no executor")]
    NoExecutor(String),
    /// The options could not be converted to the strategy's options type.
    #[error("options do not fit the command's options type: {0}")]
    Extract(#[from] ExtractError),
}

/// A typed view over a parsed [`Options`] instance.
pub trait CommandOptions: Sized + Send + 'static {
    /// Builds the typed options from bound values.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when a member is missing or has the wrong shape.
    fn from_options(options: &Options) -> Result<Self, ExtractError>;

    /// Self-validation, run after every successful parse of a command built
    /// with [`CommandNode::typed`](crate::CommandNode::typed) or
    /// [`with_options_type`](crate::CommandNode::with_options_type).
    fn validate(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }
}

/// Options types that carry their own behavior.
pub trait Run: CommandOptions {
    /// Runs the command, returning its exit code.
    fn run(self) -> i32;
}

/// Options types that carry their own asynchronous behavior.
pub trait AsyncRun: CommandOptions {
    /// Runs the command, resolving to its exit code.
    fn run(self) -> BoxFuture<'static, i32>;
}

/// External behavior invoked with typed options.
pub trait CommandHandler<T: CommandOptions>: Send + Sync {
    /// Handles one invocation, returning its exit code.
    fn handle(&self, options: T) -> i32;
}

/// Uniform invocation contract for executable commands.
pub trait CommandExecutor: Send + Sync {
    /// Executes synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the options do not fit the strategy.
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError>;

    /// Executes asynchronously. Synchronous strategies complete immediately.
    fn execute_async(&self, options: Options) -> BoxFuture<'static, Result<i32, ExecutionError>> {
        futures::future::ready(self.execute(&options)).boxed()
    }
}

/// Runs an options type that implements [`Run`].
pub struct OptionsRunner<T>(PhantomData<fn() -> T>);

impl<T> OptionsRunner<T> {
    /// Creates the runner.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for OptionsRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OptionsRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionsRunner<{}>", std::any::type_name::<T>())
    }
}

impl<T: Run> CommandExecutor for OptionsRunner<T> {
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError> {
        Ok(T::from_options(options)?.run())
    }
}

/// Runs an options type that implements [`AsyncRun`].
pub struct AsyncOptionsRunner<T>(PhantomData<fn() -> T>);

impl<T> AsyncOptionsRunner<T> {
    /// Creates the runner.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for AsyncOptionsRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AsyncRun> CommandExecutor for AsyncOptionsRunner<T> {
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError> {
        futures::executor::block_on(self.execute_async(options.clone()))
    }

    fn execute_async(&self, options: Options) -> BoxFuture<'static, Result<i32, ExecutionError>> {
        match T::from_options(&options) {
            Ok(typed) => typed.run().map(Ok).boxed(),
            Err(err) => futures::future::ready(Err(err.into())).boxed(),
        }
    }
}

/// Passes typed options to an external handler.
pub struct HandlerRunner<H, T> {
    handler: H,
    _options: PhantomData<fn(T)>,
}

impl<H, T> HandlerRunner<H, T> {
    /// Wraps a handler instance.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _options: PhantomData,
        }
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: Default, T> Default for HandlerRunner<H, T> {
    fn default() -> Self {
        Self::new(H::default())
    }
}

impl<H, T> CommandExecutor for HandlerRunner<H, T>
where
    H: CommandHandler<T>,
    T: CommandOptions,
{
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError> {
        Ok(self.handler.handle(T::from_options(options)?))
    }
}

/// Runs a closure over the untyped options.
pub struct FnRunner<F>(F);

impl<F> FnRunner<F>
where
    F: Fn(&Options) -> i32 + Send + Sync,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CommandExecutor for FnRunner<F>
where
    F: Fn(&Options) -> i32 + Send + Sync,
{
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError> {
        Ok((self.0)(options))
    }
}

/// Runs an async closure over the untyped options.
pub struct AsyncFnRunner<F>(F);

impl<F, Fut> AsyncFnRunner<F>
where
    F: Fn(Options) -> Fut + Send + Sync,
    Fut: Future<Output = i32> + Send + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut> CommandExecutor for AsyncFnRunner<F>
where
    F: Fn(Options) -> Fut + Send + Sync,
    Fut: Future<Output = i32> + Send + 'static,
{
    fn execute(&self, options: &Options) -> Result<i32, ExecutionError> {
        Ok(futures::executor::block_on((self.0)(options.clone())))
    }

    fn execute_async(&self, options: Options) -> BoxFuture<'static, Result<i32, ExecutionError>> {
        (self.0)(options).map(Ok).boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;

    use super::*;
    use crate::{ArgumentParser, CommandNode, CommandTree, OptionMember, PropertyType, ValueKind};

    #[derive(Debug)]
    struct Deploy {
        target: String,
        dry_run: bool,
    }

    impl CommandOptions for Deploy {
        fn from_options(options: &Options) -> Result<Self, ExtractError> {
            Ok(Self {
                target: options.get("target")?,
                dry_run: options.get("dry-run")?,
            })
        }
    }

    impl Run for Deploy {
        fn run(self) -> i32 {
            if self.dry_run { 0 } else { self.target.len() as i32 }
        }
    }

    impl AsyncRun for Deploy {
        fn run(self) -> BoxFuture<'static, i32> {
            async move { if self.dry_run { 10 } else { 20 } }.boxed()
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl CommandHandler<Deploy> for Counter {
        fn handle(&self, options: Deploy) -> i32 {
            self.0.fetch_add(1, Ordering::SeqCst);
            i32::from(options.dry_run)
        }
    }

    fn deploy_node(name: &str) -> CommandNode {
        CommandNode::new(name)
            .with_option(OptionMember::new("target", PropertyType::scalar(ValueKind::String)).with_default("prod"))
            .with_option(OptionMember::flag("dry-run"))
    }

    #[test]
    fn test_all_strategies_share_the_contract() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut tree = CommandTree::new();
        tree.register(deploy_node("typed").with_executor(OptionsRunner::<Deploy>::new()), None)
            .unwrap();
        tree.register(deploy_node("async-typed").with_executor(AsyncOptionsRunner::<Deploy>::new()), None)
            .unwrap();
        tree.register(deploy_node("handler").with_executor(HandlerRunner::<Counter, Deploy>::default()), None)
            .unwrap();
        tree.register(
            deploy_node("closure").run_with(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                7
            }),
            None,
        )
        .unwrap();
        tree.register(
            deploy_node("async-closure").run_async_with(|options: Options| async move {
                i32::from(options.get::<bool>("dry-run").unwrap_or(false)) + 40
            }),
            None,
        )
        .unwrap();

        let parser = ArgumentParser::new(&tree);
        let run = |args: &[&str]| {
            let resolved = parser.parse(args).into_result().unwrap();
            (tree.execute(&resolved).unwrap(), block_on(tree.execute_async(resolved)).unwrap())
        };

        assert_eq!(run(&["typed"]), (4, 4));
        assert_eq!(run(&["typed", "--dry-run"]), (0, 0));
        assert_eq!(run(&["async-typed", "--dry-run"]), (10, 10));
        assert_eq!(run(&["handler", "--dry-run"]), (1, 1));
        assert_eq!(run(&["closure"]), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(run(&["async-closure", "--dry-run"]), (41, 41));
    }

    #[test]
    fn test_execute_reports_missing_strategy() {
        let mut tree = CommandTree::new();
        tree.register(CommandNode::group("remote"), None).unwrap();
        tree.register(CommandNode::new("add"), Some("remote")).unwrap();
        let parser = ArgumentParser::new(&tree);

        let resolved = parser.parse(&["remote", "add"]).into_result().unwrap();
        assert!(matches!(tree.execute(&resolved), Err(ExecutionError::NoExecutor(name)) if name == "add"));
    }

    #[test]
    fn test_type_mismatch_surfaces_as_extract_error() {
        let mut tree = CommandTree::new();
        tree.register(
            CommandNode::new("typed")
                .with_option(OptionMember::new("target", PropertyType::scalar(ValueKind::Integer)))
                .with_executor(OptionsRunner::<Deploy>::new()),
            None,
        )
        .unwrap();
        let resolved = ArgumentParser::new(&tree).parse(&["typed"]).into_result().unwrap();
        assert!(matches!(tree.execute(&resolved), Err(ExecutionError::Extract(_))));
    }
}
