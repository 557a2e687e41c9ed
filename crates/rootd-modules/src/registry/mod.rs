//! Module registry owning lifecycle and capability reachability.
//!
//! The [`ModuleRegistry`] is the single path by which a module's capabilities
//! become reachable: a module is present in the registry if and only if its
//! [`initialize`](crate::Module::initialize) succeeded. The backing map is
//! ordered so listings are deterministic, and guarded by an `RwLock` so many
//! connection workers can resolve modules concurrently while registration
//! and teardown stay confined to startup and shutdown.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{error, info};

use rootd_protocol::ModuleInfo;

use crate::error::ModuleError;
use crate::module::Module;

const REGISTRY_TARGET: &str = "rootd_modules::registry";

/// Registry of initialised module instances keyed by unique name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<BTreeMap<String, Arc<dyn Module>>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialises and registers a module.
    ///
    /// The duplicate-name check runs first so a failed registration can never
    /// displace an existing module; initialisation runs second so only
    /// successfully initialised modules become reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::AlreadyRegistered`] for a duplicate name and
    /// [`ModuleError::Initialization`] when the module's setup fails.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<(), ModuleError> {
        let name = module.name().to_owned();
        let mut modules = self
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if modules.contains_key(&name) {
            return Err(ModuleError::AlreadyRegistered { name });
        }

        module
            .initialize()
            .map_err(|source| ModuleError::Initialization {
                name: name.clone(),
                source: Box::new(source),
            })?;

        info!(
            target: REGISTRY_TARGET,
            module = %name,
            version = module.version(),
            "module registered"
        );
        modules.insert(name, module);
        Ok(())
    }

    /// Shuts a module down and removes it from the registry.
    ///
    /// Shutdown failures are logged; the module is removed regardless so a
    /// broken module cannot linger in the reachable set.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotFound`] when no module has the given name.
    pub fn unregister(&self, name: &str) -> Result<(), ModuleError> {
        let module = {
            let mut modules = self
                .modules
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            modules
                .remove(name)
                .ok_or_else(|| ModuleError::not_found(name))?
        };
        shutdown_module(module.as_ref());
        info!(target: REGISTRY_TARGET, module = name, "module unregistered");
        Ok(())
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(Arc::clone)
    }

    /// Returns the registered module names in sorted order.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Returns each module's self-description, derived from its live
    /// capability list rather than a cached snapshot.
    #[must_use]
    pub fn modules_info(&self) -> Vec<ModuleInfo> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|module| module.info())
            .collect()
    }

    /// Returns the number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no modules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shuts down every module, tolerating individual failures.
    ///
    /// One broken module must not block teardown of the others, so shutdown
    /// errors are logged and the map is cleared unconditionally.
    pub fn shutdown_all(&self) {
        let drained = {
            let mut modules = self
                .modules
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *modules)
        };
        for module in drained.values() {
            shutdown_module(module.as_ref());
        }
        info!(target: REGISTRY_TARGET, "all modules shut down");
    }
}

fn shutdown_module(module: &dyn Module) {
    if let Err(shutdown_error) = module.shutdown() {
        error!(
            target: REGISTRY_TARGET,
            module = module.name(),
            error = %shutdown_error,
            "module shutdown failed"
        );
    }
}
