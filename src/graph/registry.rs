//! Name → behavior bindings.
//!
//! Graphs are data: a node holds a stage *name* and an edge holds a
//! condition *name*. The registry owns the executable side, so a serialized
//! graph round-trips losslessly and bindings are re-resolved on import.

use std::collections::HashMap;
use std::sync::Arc;

use super::context::Context;
use super::errors::StageError;

/// A stage function: consumes the session Context, returns the updated one.
pub type StageFn = dyn Fn(Context) -> Result<Context, StageError> + Send + Sync;

/// A named edge predicate. Pure: reads the Context, decides, mutates nothing.
pub type ConditionFn = dyn Fn(&Context) -> bool + Send + Sync;

/// Registry of stage and condition bindings, shared read-only between
/// executors. Cloning is cheap (the bindings are reference-counted).
#[derive(Default, Clone)]
pub struct Registry {
    stages: HashMap<String, Arc<StageFn>>,
    conditions: HashMap<String, Arc<ConditionFn>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_stage<F>(&mut self, name: impl Into<String>, stage: F)
    where
        F: Fn(Context) -> Result<Context, StageError> + Send + Sync + 'static,
    {
        self.stages.insert(name.into(), Arc::new(stage));
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, condition: F)
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.conditions.insert(name.into(), Arc::new(condition));
    }

    pub fn stage(&self, name: &str) -> Option<Arc<StageFn>> {
        self.stages.get(name).cloned()
    }

    pub fn condition(&self, name: &str) -> Option<Arc<ConditionFn>> {
        self.conditions.get(name).cloned()
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_bindings_resolve_by_name() {
        let mut registry = Registry::new();
        registry.register_stage("greet", |mut ctx: Context| {
            ctx.set("greeting", "hello");
            Ok(ctx)
        });
        registry.register_condition("greeted", |ctx: &Context| ctx.contains("greeting"));

        assert!(registry.has_stage("greet"));
        assert!(registry.has_condition("greeted"));
        assert!(registry.stage("missing").is_none());

        let stage = registry.stage("greet").unwrap();
        let ctx = stage(Context::new()).unwrap();
        assert!(registry.condition("greeted").unwrap()(&ctx));
    }

    #[test]
    fn clones_share_bindings() {
        let mut registry = Registry::new();
        registry.register_condition("always", |_: &Context| true);
        let clone = registry.clone();
        assert!(clone.has_condition("always"));
    }
}
