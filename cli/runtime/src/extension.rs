use crate::error::{ModuleError, Result};
use ext_console::Console;
use ext_encoding::Encoding;
use ext_process::Process;
use rquickjs::{Ctx, Value};
use std::collections::BTreeMap;
use std::fmt;
use utils::ExtensionDef;

type Factory = Box<dyn for<'js> Fn(&Ctx<'js>) -> rquickjs::Result<Value<'js>>>;

/// Host-implemented modules, by name.
///
/// Names live in their own namespace: a registered name is never handed to
/// the resolver, even when a file of that name exists.
#[derive(Default)]
pub struct ExtensionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `factory` under `name`. It runs lazily, at most once per
    /// environment, the first time a script requires `name`.
    ///
    /// # Errors
    /// Returns [`ModuleError::DuplicateExtension`] if `name` is taken
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: for<'js> Fn(&Ctx<'js>) -> rquickjs::Result<Value<'js>> + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ModuleError::DuplicateExtension(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// # Errors
    /// Returns [`ModuleError::DuplicateExtension`] if the name is taken
    pub fn with_extension<E: ExtensionDef + 'static>(mut self) -> Result<Self> {
        self.register(E::name(), E::exports)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub(crate) fn instantiate<'js>(
        &self,
        ctx: &Ctx<'js>,
        name: &str,
    ) -> Option<rquickjs::Result<Value<'js>>> {
        self.factories.get(name).map(|factory| factory(ctx))
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// The extensions shipped with the workspace
pub struct DefaultExtensions;

impl DefaultExtensions {
    /// `console`, `process` and `encoding`
    ///
    /// # Errors
    /// Only fails if two shipped extensions share a name
    pub fn create() -> Result<ExtensionRegistry> {
        ExtensionRegistry::new()
            .with_extension::<Console>()?
            .with_extension::<Process>()?
            .with_extension::<Encoding>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rquickjs::{Context, IntoJs, Runtime};

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register("answer", |ctx| 42.into_js(ctx))
            .unwrap();
        let err = registry
            .register("answer", |ctx| 43.into_js(ctx))
            .unwrap_err();
        assert!(matches!(err, ModuleError::DuplicateExtension(name) if name == "answer"));
    }

    #[test]
    fn test_defaults() {
        let registry = DefaultExtensions::create().unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["console", "encoding", "process"]
        );
        assert!(!registry.contains("fs"));
    }

    #[test]
    fn test_instantiate() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register("answer", |ctx| 42.into_js(ctx))
            .unwrap();

        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let value = registry.instantiate(&ctx, "answer").unwrap().unwrap();
            assert_eq!(value.as_int(), Some(42));
            assert!(registry.instantiate(&ctx, "question").is_none());
        });
    }
}
