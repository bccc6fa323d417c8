// src/lambda/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::HandlerRef;
use crate::error::InvokeError;
use crate::lambda::demo::{ExecFail, ForwardMessages, PrintMessages, DEMO_MODULE};
use crate::lambda::Handler;

/// Handlers available to lambda definitions, keyed by module then function.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    modules: BTreeMap<String, BTreeMap<String, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the bundled demo handlers.
    pub fn builtin() -> Self {
        let demo = |function: &str| HandlerRef {
            module: DEMO_MODULE.to_string(),
            function: function.to_string(),
        };

        let mut registry = Self::new();
        registry.register(demo("print_messages"), Arc::new(PrintMessages::stdout()));
        registry.register(demo("exec_fail"), Arc::new(ExecFail));
        registry.register(demo("forward_messages"), Arc::new(ForwardMessages));
        registry
    }

    /// Register `handler` under `handler_ref`, replacing any previous one.
    pub fn register(&mut self, handler_ref: HandlerRef, handler: Arc<dyn Handler>) {
        self.modules
            .entry(handler_ref.module)
            .or_default()
            .insert(handler_ref.function, handler);
    }

    pub fn resolve(&self, handler_ref: &HandlerRef) -> Result<Arc<dyn Handler>, InvokeError> {
        let module = self
            .modules
            .get(&handler_ref.module)
            .ok_or_else(|| InvokeError::ModuleNotFound {
                module: handler_ref.module.clone(),
            })?;

        module
            .get(&handler_ref.function)
            .cloned()
            .ok_or_else(|| InvokeError::FunctionNotFound {
                module: handler_ref.module.clone(),
                function: handler_ref.function.clone(),
            })
    }
}
