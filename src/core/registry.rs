//! Hierarchical logger registry
//!
//! Loggers form a trie keyed by the dot-separated segments of their names.
//! Every node owns the current [`Config`] of its logger together with the
//! [`LevelGuard`] derived from it; both are swapped as one [`LoggerState`],
//! so a log call sees either the old or the new pair, never a mix.
//!
//! - New nodes copy the state of their nearest existing ancestor.
//! - [`LoggerRegistry::update_config`] hands every node of a subtree its
//!   *own* config to transform, so changing one setting tree-wide keeps the
//!   other settings each node already has.
//! - Lookups only take read locks. Creating a child takes the parent's
//!   creation lock, which updates also hold while they replace that parent's
//!   state and snapshot its children.

use super::config::{self, Config, ConfigUpdate, ExceptionHandling, LogField};
use super::error::{LoggerError, Result};
use super::level_guard::LevelGuard;
use super::log_level::LogLevel;
use super::logger::Logger;
use super::metrics::LoggerMetrics;
use super::stack_trace_filter::{self, StackTraceFilter};
use crate::sinks::{SinkBackend, SinkFactory, SinkTarget};
use parking_lot::{Mutex, RwLock};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Config of a node together with everything derived from it
#[derive(Debug)]
pub(crate) struct LoggerState {
    pub(crate) config: Config,
    pub(crate) guard: LevelGuard,
    pub(crate) filter: Arc<StackTraceFilter>,
}

/// Registry-wide collaborators shared by every logger
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) sinks: SinkFactory,
    pub(crate) metrics: LoggerMetrics,
    filter: Arc<StackTraceFilter>,
    pass_through: Arc<StackTraceFilter>,
}

impl Shared {
    fn state(&self, config: Config) -> Arc<LoggerState> {
        let filter = if config.exception_handling.deduplicate {
            Arc::clone(&self.filter)
        } else {
            Arc::clone(&self.pass_through)
        };
        Arc::new(LoggerState {
            guard: LevelGuard::from_config(&config),
            config,
            filter,
        })
    }
}

#[derive(Debug)]
pub(crate) struct LoggerNode {
    pub(crate) name: Arc<str>,
    state: RwLock<Arc<LoggerState>>,
    creation: Mutex<()>,
    children: RwLock<HashMap<String, Arc<LoggerNode>>>,
}

impl LoggerNode {
    fn new(name: Arc<str>, state: Arc<LoggerState>) -> Self {
        Self {
            name,
            state: RwLock::new(state),
            creation: Mutex::new(()),
            children: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> Arc<LoggerState> {
        Arc::clone(&self.state.read())
    }

    #[inline]
    pub(crate) fn guard(&self) -> LevelGuard {
        self.state.read().guard
    }

    fn child(&self, segment: &str) -> Option<Arc<LoggerNode>> {
        self.children.read().get(segment).cloned()
    }

    fn child_name(&self, segment: &str) -> Arc<str> {
        if self.name.is_empty() {
            Arc::from(segment)
        } else {
            Arc::from(format!("{}.{}", self.name, segment))
        }
    }
}

struct RegistryInner {
    root: Arc<LoggerNode>,
    shared: Arc<Shared>,
    node_count: AtomicUsize,
    updates: Mutex<()>,
}

thread_local! {
    /// Registries whose update is running on this thread
    static UPDATING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a registry as updating on the current thread until dropped
struct UpdateScope {
    registry: usize,
}

impl UpdateScope {
    /// `None` when this thread is already updating `registry`
    fn enter(registry: usize) -> Option<Self> {
        UPDATING.with(|updating| {
            let mut updating = updating.borrow_mut();
            if updating.contains(&registry) {
                return None;
            }
            updating.push(registry);
            Some(Self { registry })
        })
    }
}

impl Drop for UpdateScope {
    fn drop(&mut self) {
        UPDATING.with(|updating| {
            let mut updating = updating.borrow_mut();
            if let Some(index) = updating.iter().rposition(|&r| r == self.registry) {
                updating.remove(index);
            }
        });
    }
}

/// The logger hierarchy of one application
///
/// Cloning is cheap and yields a handle on the same hierarchy.
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let (target, buffer) = SinkTarget::memory();
/// let registry = LoggerRegistry::builder().target(target).build().unwrap();
///
/// let logger = registry.get_logger("service.orders");
/// logger.at_debug().log("not written");
/// logger.at_info().add_argument(42).log("order {} placed");
///
/// registry.set_level("service", LogLevel::Warn).unwrap();
/// logger.at_info().log("not written either");
///
/// assert_eq!(buffer.lines().len(), 1);
/// assert!(buffer.contents().contains("order 42 placed"));
/// ```
#[derive(Clone)]
pub struct LoggerRegistry {
    inner: Arc<RegistryInner>,
}

impl LoggerRegistry {
    /// Registry writing JSON to stdout with default settings
    pub fn new() -> Self {
        Self::with_sinks(
            Config::default(),
            SinkFactory::new(SinkBackend::Json, SinkTarget::Stdout),
            StackTraceFilter::default(),
        )
    }

    fn with_sinks(root: Config, sinks: SinkFactory, filter: StackTraceFilter) -> Self {
        let shared = Arc::new(Shared {
            sinks,
            metrics: LoggerMetrics::new(),
            filter: Arc::new(filter),
            pass_through: Arc::new(StackTraceFilter::PassThrough),
        });
        let root = Arc::new(LoggerNode::new(Arc::from(""), shared.state(root)));

        Self {
            inner: Arc::new(RegistryInner {
                root,
                shared,
                node_count: AtomicUsize::new(1),
                updates: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn logger(&self, node: Arc<LoggerNode>) -> Logger {
        Logger::new(node, Arc::clone(&self.inner.shared))
    }

    /// Logger for `name`, creating it and any missing ancestors.
    ///
    /// Never fails: empty segments are ignored, so `""` and `"."` both name
    /// the root logger.
    pub fn get_logger(&self, name: &str) -> Logger {
        let node = self.create_recursively(config::name_segments(name));
        self.logger(node)
    }

    pub fn root_logger(&self) -> Logger {
        self.logger(Arc::clone(&self.inner.root))
    }

    /// Existing logger for `name`, without creating anything
    pub fn find(&self, name: &str) -> Option<Logger> {
        self.find_node(config::name_segments(name))
            .map(|node| self.logger(node))
    }

    fn find_node<'a, I>(&self, segments: I) -> Option<Arc<LoggerNode>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = Arc::clone(&self.inner.root);
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }

    fn create_recursively<'a, I>(&self, segments: I) -> Arc<LoggerNode>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = Arc::clone(&self.inner.root);
        for segment in segments {
            node = match node.child(segment) {
                Some(child) => child,
                None => self.create_child(&node, segment),
            };
        }
        node
    }

    fn create_child(&self, parent: &LoggerNode, segment: &str) -> Arc<LoggerNode> {
        let _creation = parent.creation.lock();
        // another thread may have won the race for the lock
        if let Some(child) = parent.child(segment) {
            return child;
        }

        // states are immutable, so sharing the parent's is a copy
        let child = Arc::new(LoggerNode::new(parent.child_name(segment), parent.state()));
        parent
            .children
            .write()
            .insert(segment.to_string(), Arc::clone(&child));
        self.inner.node_count.fetch_add(1, Ordering::Relaxed);
        child
    }

    /// Apply `change` to the config of every node under `scope`, itself included.
    ///
    /// `change` receives each node's own current config. The empty scope is
    /// the whole tree; a scope naming a logger that does not exist yet is
    /// created first, so loggers created under it later inherit the result.
    ///
    /// Updates are serialized. `change` runs while this registry's update
    /// lock is held, so it must not update the same registry: such a nested
    /// call on the same thread fails instead of deadlocking. Reading configs
    /// and creating loggers from `change` is fine.
    ///
    /// Fails with [`LoggerError::InvalidConfiguration`] for a malformed scope
    /// or a nested update, before anything changes.
    pub fn update_config<F>(&self, scope: &str, change: F) -> Result<()>
    where
        F: Fn(&Config) -> Config,
    {
        let segments = config::parse_scope(scope)?;
        let _scope = UpdateScope::enter(Arc::as_ptr(&self.inner) as usize).ok_or_else(|| {
            LoggerError::config("update", "config change closures must not update the registry")
        })?;
        let _update = self.inner.updates.lock();
        let start = self.create_recursively(segments);

        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            // only updates replace states, and they are serialized
            let state = self.inner.shared.state(change(&node.state().config));

            // children created before the swap are in the snapshot, later ones
            // inherit the new state
            let _creation = node.creation.lock();
            *node.state.write() = state;
            pending.extend(node.children.read().values().cloned());
        }
        Ok(())
    }

    /// Replace the config of every node under `scope` with `config`
    pub fn set_config(&self, scope: &str, config: Config) -> Result<()> {
        self.update_config(scope, move |_| config.clone())
    }

    /// Set the level of every node under `scope`, keeping their other settings
    pub fn set_level(&self, scope: &str, level: LogLevel) -> Result<()> {
        self.update_config(scope, |config| config.with_level(level))
    }

    /// Turn off every logger under `scope`
    pub fn disable(&self, scope: &str) -> Result<()> {
        self.update_config(scope, Config::disabled)
    }

    /// Set a level given as text (`"debug"`, `"WARN"`, `"off"`, ...)
    pub fn set_level_str(&self, scope: &str, level: &str) -> Result<()> {
        match config::parse_level(level)? {
            Some(level) => self.set_level(scope, level),
            None => self.disable(scope),
        }
    }

    /// Apply updates in order, stopping at the first failure
    pub fn apply<I>(&self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = ConfigUpdate>,
    {
        for update in updates {
            self.update_config(&update.scope, |config| (update.change)(config))?;
        }
        Ok(())
    }

    /// Current config of an existing logger
    pub fn config_of(&self, name: &str) -> Option<Config> {
        self.find_node(config::name_segments(name))
            .map(|node| node.state().config.clone())
    }

    /// Number of nodes in the hierarchy, root included
    pub fn node_count(&self) -> usize {
        self.inner.node_count.load(Ordering::Relaxed)
    }

    /// Names of all existing loggers (root excluded), sorted
    pub fn logger_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut pending = vec![Arc::clone(&self.inner.root)];
        while let Some(node) = pending.pop() {
            if !node.name.is_empty() {
                names.push(node.name.to_string());
            }
            pending.extend(node.children.read().values().cloned());
        }
        names.sort();
        names
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.shared.metrics
    }

    /// The deduplication filter shared by loggers with `deduplicate` enabled
    pub fn stack_trace_filter(&self) -> &StackTraceFilter {
        &self.inner.shared.filter
    }

    pub fn sink_backend(&self) -> Option<SinkBackend> {
        self.inner.shared.sinks.backend()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("node_count", &self.node_count())
            .field("sink_backend", &self.sink_backend())
            .finish_non_exhaustive()
    }
}

enum PendingTarget {
    Ready(SinkTarget),
    File(PathBuf),
}

/// Builder for [`LoggerRegistry`]
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let registry = LoggerRegistry::builder()
///     .level(LogLevel::Debug)
///     .backend(SinkBackend::Json)
///     .target(SinkTarget::Stderr)
///     .deduplicate_stack_traces(true)
///     .update(ConfigUpdate::level("noisy.dependency", LogLevel::Error))
///     .build()
///     .unwrap();
///
/// assert!(registry.get_logger("app").is_debug_enabled());
/// assert!(!registry.get_logger("noisy.dependency.pool").is_warn_enabled());
/// ```
pub struct RegistryBuilder {
    root: Config,
    backend: SinkBackend,
    target: PendingTarget,
    colors: Option<bool>,
    filter_capacity: usize,
    filter_false_positive_rate: f64,
    updates: Vec<ConfigUpdate>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            root: Config::default(),
            backend: SinkBackend::Json,
            target: PendingTarget::Ready(SinkTarget::Stdout),
            colors: None,
            filter_capacity: stack_trace_filter::DEFAULT_CAPACITY,
            filter_false_positive_rate: stack_trace_filter::DEFAULT_FALSE_POSITIVE_RATE,
            updates: Vec::new(),
        }
    }

    /// Config of the root logger, inherited by every logger created later
    #[must_use = "builder methods return a new value"]
    pub fn root_config(mut self, config: Config) -> Self {
        self.root = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.root = self.root.with_level(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = LogField>,
    {
        self.root = self.root.with_fields(fields);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exception_handling(mut self, exception_handling: ExceptionHandling) -> Self {
        self.root = self.root.with_exception_handling(exception_handling);
        self
    }

    /// Shortcut for toggling `exception_handling.deduplicate` on the root
    #[must_use = "builder methods return a new value"]
    pub fn deduplicate_stack_traces(mut self, deduplicate: bool) -> Self {
        let handling = self.root.exception_handling.with_deduplication(deduplicate);
        self.root = self.root.with_exception_handling(handling);
        self
    }

    /// Preferred serialization backend, probed at build time
    #[must_use = "builder methods return a new value"]
    pub fn backend(mut self, backend: SinkBackend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn target(mut self, target: SinkTarget) -> Self {
        self.target = PendingTarget::Ready(target);
        self
    }

    /// Append to a file, opened at build time
    #[must_use = "builder methods return a new value"]
    pub fn target_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = PendingTarget::File(path.into());
        self
    }

    /// Force coloured console output on or off (default: only on terminals)
    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, colors: bool) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Size the shared stack trace filter
    #[must_use = "builder methods return a new value"]
    pub fn stack_trace_filter(mut self, capacity: usize, false_positive_rate: f64) -> Self {
        self.filter_capacity = capacity;
        self.filter_false_positive_rate = false_positive_rate;
        self
    }

    /// Queue a configuration update, applied in order after the root config
    #[must_use = "builder methods return a new value"]
    pub fn update(mut self, update: ConfigUpdate) -> Self {
        self.updates.push(update);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn updates<I>(mut self, updates: I) -> Self
    where
        I: IntoIterator<Item = ConfigUpdate>,
    {
        self.updates.extend(updates);
        self
    }

    /// Build the registry.
    ///
    /// An unavailable backend or an unopenable file is reported through the
    /// diagnostic writer and replaced by diagnostic output; only a malformed
    /// queued update fails the build.
    pub fn build(self) -> Result<LoggerRegistry> {
        let sinks = match self.target {
            PendingTarget::Ready(target) => SinkFactory::new(self.backend, target),
            PendingTarget::File(path) => match SinkTarget::file(&path) {
                Ok(target) => SinkFactory::new(self.backend, target),
                Err(e) => {
                    super::diagnostic::error_with("falling back to diagnostic output", &e);
                    SinkFactory::diagnostic()
                }
            },
        };
        let sinks = match self.colors {
            Some(colors) => sinks.with_colors(colors),
            None => sinks,
        };
        let filter = StackTraceFilter::bloom(self.filter_capacity, self.filter_false_positive_rate);

        let registry = LoggerRegistry::with_sinks(self.root, sinks, filter);
        registry.apply(self.updates)?;
        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggerError;

    fn registry() -> LoggerRegistry {
        LoggerRegistry::builder()
            .backend(SinkBackend::Discard)
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_logger_creates_ancestors_once() {
        let registry = registry();
        assert_eq!(registry.node_count(), 1);

        let logger = registry.get_logger("a.b.c");
        assert_eq!(logger.name(), "a.b.c");
        assert_eq!(registry.node_count(), 4);

        registry.get_logger("a.b.c");
        registry.get_logger("a.b");
        assert_eq!(registry.node_count(), 4);
        assert_eq!(registry.logger_names(), vec!["a", "a.b", "a.b.c"]);
    }

    #[test]
    fn test_same_node_for_same_name() {
        let registry = registry();
        let first = registry.get_logger("x.y");
        let second = registry.get_logger("x..y.");
        assert!(first.same_node(&second));
    }

    #[test]
    fn test_find_does_not_create() {
        let registry = registry();
        assert!(registry.find("missing").is_none());
        assert_eq!(registry.node_count(), 1);

        registry.get_logger("present.child");
        assert!(registry.find("present").is_some());
        assert!(registry.find("").is_some());
    }

    #[test]
    fn test_new_nodes_inherit_nearest_ancestor() {
        let registry = registry();
        registry.get_logger("a");
        registry.set_level("a", LogLevel::Debug).unwrap();

        let config = registry.get_logger("a.b.c").config();
        assert_eq!(config.level, Some(LogLevel::Debug));
        assert_eq!(registry.config_of("a.b"), Some(config));
    }

    #[test]
    fn test_update_keeps_per_node_overrides() {
        let registry = registry();
        registry.get_logger("a.b.c");
        registry
            .update_config("a.b.c", |config| config.with_fields([LogField::Message]))
            .unwrap();

        registry.set_level("a", LogLevel::Warn).unwrap();

        let config = registry.config_of("a.b.c").unwrap();
        assert_eq!(config.level, Some(LogLevel::Warn));
        assert_eq!(config.fields, vec![LogField::Message]);
        assert_eq!(registry.config_of("a").unwrap().fields, Config::default().fields);
        // outside the scope
        assert_eq!(registry.config_of("").unwrap().level, Some(LogLevel::Info));
    }

    #[test]
    fn test_empty_scope_updates_whole_tree() {
        let registry = registry();
        let logger = registry.get_logger("p.q");
        registry.disable("").unwrap();

        assert!(!logger.is_error_enabled());
        assert!(!registry.root_logger().is_error_enabled());
    }

    #[test]
    fn test_update_of_missing_scope_materializes_it() {
        let registry = registry();
        registry.set_level("late.scope", LogLevel::Error).unwrap();
        assert!(registry.find("late.scope").is_some());

        let logger = registry.get_logger("late.scope.child");
        assert!(!logger.is_warn_enabled());
        assert!(logger.is_error_enabled());
    }

    #[test]
    fn test_invalid_scope_changes_nothing() {
        let registry = registry();
        for scope in ["a..b", ".a", "a.", "bad scope"] {
            let err = registry.set_level(scope, LogLevel::Error).unwrap_err();
            assert!(matches!(err, LoggerError::InvalidConfiguration { .. }), "{}", scope);
        }
        assert_eq!(registry.node_count(), 1);
    }

    #[test]
    fn test_set_level_str() {
        let registry = registry();
        let logger = registry.get_logger("svc");

        registry.set_level_str("svc", "debug").unwrap();
        assert!(logger.is_debug_enabled());

        registry.set_level_str("svc", "off").unwrap();
        assert!(!logger.is_error_enabled());

        assert!(registry.set_level_str("svc", "loud").is_err());
    }

    #[test]
    fn test_apply_stops_at_first_error() {
        let registry = registry();
        let result = registry.apply(vec![
            ConfigUpdate::level("a", LogLevel::Error),
            ConfigUpdate::level("b..c", LogLevel::Error),
            ConfigUpdate::level("d", LogLevel::Error),
        ]);

        assert!(result.is_err());
        assert_eq!(registry.config_of("a").unwrap().level, Some(LogLevel::Error));
        assert!(registry.find("d").is_none());
    }

    #[test]
    fn test_dedup_setting_selects_filter() {
        let registry = registry();
        let plain = registry.get_logger("plain");
        registry
            .update_config("dedup", |config| {
                config.with_exception_handling(
                    config.exception_handling.with_deduplication(true),
                )
            })
            .unwrap();
        let dedup = registry.get_logger("dedup.child");

        assert!(plain.state().filter.is_pass_through());
        assert!(!dedup.state().filter.is_pass_through());
    }

    #[test]
    fn test_builder_file_target_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LoggerRegistry::builder()
            .target_file(dir.path().join("missing").join("app.log"))
            .build()
            .unwrap();
        assert_eq!(registry.sink_backend(), None);

        // still usable
        registry.get_logger("x").info("through the diagnostic writer");
    }

    #[test]
    fn test_builder_rejects_bad_update() {
        let result = LoggerRegistry::builder()
            .target(SinkTarget::memory().0)
            .update(ConfigUpdate::level(" ", LogLevel::Debug))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_update_fails_instead_of_deadlocking() {
        let registry = registry();
        registry.get_logger("a.child");
        let nested = std::cell::RefCell::new(Vec::new());

        registry
            .update_config("a", |config| {
                nested.borrow_mut().push(registry.set_level("b", LogLevel::Warn));
                config.with_level(LogLevel::Error)
            })
            .unwrap();

        let nested = nested.into_inner();
        assert_eq!(nested.len(), 2);
        assert!(nested
            .iter()
            .all(|result| matches!(result, Err(LoggerError::InvalidConfiguration { .. }))));
        assert_eq!(registry.config_of("a.child").unwrap().level, Some(LogLevel::Error));
        assert!(registry.find("b").is_none());

        // the flag is cleared once the outer update returns
        registry.set_level("b", LogLevel::Warn).unwrap();
        assert_eq!(registry.config_of("b").unwrap().level, Some(LogLevel::Warn));
    }

    #[test]
    fn test_change_may_update_another_registry() {
        let outer = registry();
        let other = registry();

        outer
            .update_config("a", |config| {
                other.set_level("b", LogLevel::Debug).unwrap();
                config.clone()
            })
            .unwrap();
        assert_eq!(other.config_of("b").unwrap().level, Some(LogLevel::Debug));
    }
}
