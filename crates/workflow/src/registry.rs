//! Workflow registry: binds engine dispatch names to entry points.
//!
//! Filled once at start-up and handed to the worker bootstrap; read-only
//! afterwards. The name is the only dispatch key. `version` travels with
//! the entry for logging and is passed to workflows as a call argument.

use std::collections::HashMap;

use engine::{RegisterOptions, WorkflowFn};

use crate::builtin::{dsl_workflow_fn, sample_workflow_fn};
use crate::RegistryError;

/// Produces a fresh entry point each time it is called.
pub type WorkflowFactory = fn() -> WorkflowFn;

#[derive(Debug, Clone)]
pub struct RegisteredWorkflow {
    pub name: String,
    pub version: String,
    pub factory: WorkflowFactory,
    pub is_default: bool,
}

impl RegisteredWorkflow {
    pub fn new(name: impl Into<String>, version: impl Into<String>, factory: WorkflowFactory) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            factory,
            is_default: false,
        }
    }

    pub fn default_version(mut self) -> Self {
        self.is_default = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    entries: Vec<RegisteredWorkflow>,
    index: HashMap<String, usize>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A name that is already bound is rejected.
    pub fn insert(&mut self, entry: RegisteredWorkflow) -> Result<(), RegistryError> {
        if self.index.contains_key(&entry.name) {
            return Err(RegistryError::Conflict { name: entry.name });
        }
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Entries in registration order.
    pub fn list(&self) -> &[RegisteredWorkflow] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredWorkflow> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Engine registration options for `entry`. Only the name is carried over.
pub fn register_options(entry: &RegisteredWorkflow) -> RegisterOptions {
    RegisterOptions {
        name: entry.name.clone(),
    }
}

/// `SampleWorkflow` and `DSLWorkflow`, both `v1` and marked default.
pub fn builtin() -> Result<WorkflowRegistry, RegistryError> {
    let mut registry = WorkflowRegistry::new();
    registry.insert(
        RegisteredWorkflow::new("SampleWorkflow", "v1", sample_workflow_fn).default_version(),
    )?;
    registry.insert(
        RegisteredWorkflow::new("DSLWorkflow", "v1", dsl_workflow_fn).default_version(),
    )?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn builtin_registry_lists_both_workflows_in_order() {
        let registry = builtin().unwrap();
        let names: Vec<&str> = registry.list().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["SampleWorkflow", "DSLWorkflow"]);
        assert!(registry.list().iter().all(|e| e.version == "v1" && e.is_default));
    }

    #[test]
    fn k_inserts_yield_k_retrievable_entries() {
        let mut registry = WorkflowRegistry::new();
        for i in 0..10 {
            registry
                .insert(RegisteredWorkflow::new(format!("wf{i}"), "v1", sample_workflow_fn))
                .unwrap();
        }
        assert_eq!(registry.len(), 10);
        for i in 0..10 {
            let entry = registry.get(&format!("wf{i}")).unwrap();
            assert_eq!(entry.name, format!("wf{i}"));
        }
        assert!(registry.get("wf10").is_none());
    }

    #[test]
    fn duplicate_name_is_a_conflict() {
        let mut registry = builtin().unwrap();
        let err = registry
            .insert(RegisteredWorkflow::new("DSLWorkflow", "v2", dsl_workflow_fn))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                name: "DSLWorkflow".into()
            }
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("DSLWorkflow").unwrap().version, "v1");
    }

    #[test]
    fn factory_yields_a_fresh_function_each_call() {
        let registry = builtin().unwrap();
        let entry = registry.get("SampleWorkflow").unwrap();
        let first = (entry.factory)();
        let second = (entry.factory)();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn register_options_carry_only_the_name() {
        let entry = RegisteredWorkflow::new("Billing", "v7", sample_workflow_fn).default_version();
        assert_eq!(
            register_options(&entry),
            RegisterOptions {
                name: "Billing".into()
            }
        );
    }
}
