//! Process-global registry of executor implementations

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::executor::{Executor, LocalExecutor};

/// Name the built-in in-process executor is registered under
pub const DEFAULT_EXECUTOR: &str = "default";

/// Factory producing a fresh executor instance
pub type ExecutorFactory = Arc<dyn Fn() -> Arc<dyn Executor> + Send + Sync>;

static REGISTRY: Lazy<RwLock<HashMap<String, ExecutorFactory>>> = Lazy::new(|| {
    let mut factories: HashMap<String, ExecutorFactory> = HashMap::new();
    factories.insert(
        DEFAULT_EXECUTOR.to_string(),
        Arc::new(|| Arc::new(LocalExecutor::new()) as Arc<dyn Executor>),
    );
    RwLock::new(factories)
});

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No factory registered under this name
    #[error("unknown executor: {0}")]
    UnknownExecutor(String),
}

/// Register an executor factory under a name
///
/// # Panics
///
/// Panics on an empty name or a duplicate registration. Registration
/// happens at process start; both conditions are programming errors.
pub fn register(name: impl Into<String>, factory: ExecutorFactory) {
    let name = name.into();
    if name.is_empty() {
        panic!("executor name must not be empty");
    }
    let mut registry = REGISTRY.write();
    if registry.contains_key(&name) {
        panic!("executor {name:?} already registered");
    }
    registry.insert(name, factory);
}

/// Construct an executor by registered name
pub fn create(name: &str) -> Result<Arc<dyn Executor>, RegistryError> {
    let registry = REGISTRY.read();
    let factory = registry
        .get(name)
        .ok_or_else(|| RegistryError::UnknownExecutor(name.to_string()))?;
    Ok(factory())
}

/// Names of all registered executors, sorted
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}
