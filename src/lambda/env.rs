// src/lambda/env.rs

use std::collections::BTreeMap;
use std::env;

use crate::error::InvokeError;

/// Whether the OS accepts `key` as an environment variable name.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}

/// Whether the OS accepts `value` as an environment variable value.
pub fn is_valid_value(value: &str) -> bool {
    !value.contains('\0')
}

/// Sets process environment variables for as long as it lives.
///
/// On drop every variable goes back to what it was before: prior values
/// are restored, variables that did not exist are removed. Callers must
/// hold the invocation lock while a guard is alive.
#[derive(Debug)]
pub struct ScopedEnv {
    previous: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    /// Fails without touching the environment if any pair is not settable.
    pub fn apply(vars: &BTreeMap<String, String>) -> Result<Self, InvokeError> {
        if let Some((key, _)) = vars
            .iter()
            .find(|(k, v)| !is_valid_key(k) || !is_valid_value(v))
        {
            return Err(InvokeError::InvalidEnvironment { key: key.clone() });
        }

        // the guard exists before the first write, so a partial apply is
        // still undone on unwind
        let mut guard = Self {
            previous: Vec::with_capacity(vars.len()),
        };
        for (key, value) in vars {
            let prior = env::var(key).ok();
            env::set_var(key, value);
            guard.previous.push((key.clone(), prior));
        }

        Ok(guard)
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, prior) in self.previous.drain(..).rev() {
            match prior {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}
