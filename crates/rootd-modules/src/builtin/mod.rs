//! Built-in modules and the compiled-in registration table.
//!
//! The daemon never discovers modules by scanning the filesystem; the set of
//! loadable modules is this static constructor table, filtered at startup by
//! the configured allow-list. That keeps the privileged surface statically
//! auditable: what is not in this table cannot be loaded.

pub mod firewalld;
pub mod systeminfo;

use std::sync::Arc;

use crate::module::Module;

pub use self::firewalld::FirewalldModule;
pub use self::systeminfo::SystemInfoModule;

/// Constructor for one built-in module.
pub type ModuleConstructor = fn() -> Arc<dyn Module>;

/// Returns the compiled-in module table in registration order.
///
/// The system information module comes first so it is available even when
/// every optional module fails its prerequisites.
#[must_use]
pub fn builtin_modules() -> Vec<(&'static str, ModuleConstructor)> {
    vec![
        ("systeminfo", || Arc::new(SystemInfoModule::new())),
        ("firewalld", || Arc::new(FirewalldModule::new())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_match_module_names() {
        for (name, constructor) in builtin_modules() {
            let module = constructor();
            assert_eq!(module.name(), name);
        }
    }

    #[test]
    fn table_names_are_unique() {
        let table = builtin_modules();
        let mut names: Vec<&str> = table.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), table.len());
    }
}
