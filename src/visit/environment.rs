//! Parameter bindings supplied to the interpreter.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::ast::{ExprId, GlobalEnv};
use crate::visit::interpret::Value;

/// Supplies values for symbolic parameters, looked up by node identity.
pub trait Environment {
    fn parameter(&self, parameter: ExprId) -> Option<Value>;

    /// Whether the simulated build system accepts `target_compile_features`.
    fn supports_compiler_features(&self) -> bool {
        true
    }
}

/// A concrete platform binding of the well-known parameters.
///
/// ```rust,ignore
/// let bindings = Bindings::android(globals, 21, "c++_shared", "x86_64")
///     .with_exploded_root("/home/me/.cdep/exploded");
/// ```
#[derive(Debug, Clone)]
pub struct Bindings {
    globals: GlobalEnv,
    values: HashMap<ExprId, Value>,
    supports_compiler_features: bool,
}

impl Bindings {
    /// Bindings with only the none-runtime sentinel bound.
    pub fn new(globals: GlobalEnv) -> Self {
        let mut values = HashMap::new();
        values.insert(globals.none_runtime, Value::String("none".to_string()));
        Bindings {
            globals,
            values,
            supports_compiler_features: true,
        }
    }

    pub fn android(globals: GlobalEnv, api_level: i64, runtime: &str, abi: &str) -> Self {
        Self::new(globals)
            .bind(globals.target_system, Value::String("Android".to_string()))
            .bind(globals.target_platform, Value::Integer(api_level))
            .bind(globals.android_runtime, Value::String(runtime.to_string()))
            .bind(globals.android_abi, Value::String(abi.to_string()))
    }

    pub fn darwin(globals: GlobalEnv, sysroot: &str, architectures: &[&str]) -> Self {
        let architectures = architectures
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect();
        Self::new(globals)
            .bind(globals.target_system, Value::String("Darwin".to_string()))
            .bind(globals.osx_sysroot, Value::Path(PathBuf::from(sysroot)))
            .bind(globals.osx_architectures, Value::Array(architectures))
    }

    pub fn linux(globals: GlobalEnv) -> Self {
        Self::new(globals).bind(globals.target_system, Value::String("Linux".to_string()))
    }

    /// Bind an arbitrary target system name, e.g. to probe unsupported platforms.
    pub fn system(globals: GlobalEnv, name: &str) -> Self {
        Self::new(globals).bind(globals.target_system, Value::String(name.to_string()))
    }

    pub fn with_exploded_root(self, root: impl Into<PathBuf>) -> Self {
        let parameter = self.globals.exploded_root;
        self.bind(parameter, Value::Path(root.into()))
    }

    pub fn with_compiler_features(mut self, supported: bool) -> Self {
        self.supports_compiler_features = supported;
        self
    }

    pub fn bind(mut self, parameter: ExprId, value: Value) -> Self {
        self.values.insert(parameter, value);
        self
    }

    pub fn globals(&self) -> &GlobalEnv {
        &self.globals
    }
}

impl Environment for Bindings {
    fn parameter(&self, parameter: ExprId) -> Option<Value> {
        self.values.get(&parameter).cloned()
    }

    fn supports_compiler_features(&self) -> bool {
        self.supports_compiler_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arena;

    #[test]
    fn test_android_bindings() {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        let bindings = Bindings::android(globals, 21, "c++_shared", "x86_64");

        assert_eq!(
            bindings.parameter(globals.target_platform),
            Some(Value::Integer(21))
        );
        assert_eq!(
            bindings.parameter(globals.none_runtime),
            Some(Value::String("none".to_string()))
        );
        assert_eq!(bindings.parameter(globals.osx_sysroot), None);
    }

    #[test]
    fn test_bindings_are_keyed_by_identity() {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        let other = GlobalEnv::alloc(&mut arena);
        let bindings = Bindings::linux(globals);

        assert!(bindings.parameter(globals.target_system).is_some());
        assert!(bindings.parameter(other.target_system).is_none());
    }
}
