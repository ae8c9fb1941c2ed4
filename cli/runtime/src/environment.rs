use crate::cache::{ModuleKey, ModuleStatus};
use crate::config::EnvironmentConfig;
use crate::error::{ModuleError, Result};
use crate::extension::ExtensionRegistry;
use crate::loader::ModuleLoader;
use crate::location::Location;
use crate::resolver::Resolver;
use rquickjs::{Context, Ctx, Runtime, Value};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Handle to the exports of a module loaded by an [`Environment`].
///
/// The value itself stays in the environment's cache; read it with
/// [`Environment::with_exports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exports {
    key: ModuleKey,
}

impl Exports {
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }
}

// Field order is drop order: engine handles held by the loader go first,
// the runtime last.
struct Inner {
    loader: Rc<ModuleLoader>,
    context: Context,
    runtime: Runtime,
}

/// A CommonJS module environment: one script runtime, one module cache, one
/// set of extensions.
///
/// Not `Send`; create one per thread.
pub struct Environment {
    inner: Option<Inner>,
}

impl Environment {
    /// # Errors
    /// Returns an error if the script runtime cannot be created
    pub fn new(resolver: Arc<dyn Resolver>, root: Location) -> Result<Self> {
        Self::with_config(resolver, root, EnvironmentConfig::default())
    }

    /// # Errors
    /// Returns an error if the script runtime cannot be created
    pub fn with_config(
        resolver: Arc<dyn Resolver>,
        root: Location,
        config: EnvironmentConfig,
    ) -> Result<Self> {
        let runtime = Runtime::new()?;
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = config.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        let context = Context::full(&runtime)?;

        tracing::debug!(root = %root, "environment created");
        let loader = Rc::new(ModuleLoader::new(resolver, root, &config));
        Ok(Self {
            inner: Some(Inner {
                loader,
                context,
                runtime,
            }),
        })
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner.as_ref().ok_or(ModuleError::EnvironmentClosed)
    }

    /// Replace the extension set. Only allowed before the first require.
    ///
    /// # Errors
    /// Returns [`ModuleError::ExtensionsSealed`] once a module was required
    pub fn set_extensions(&self, registry: ExtensionRegistry) -> Result<()> {
        self.inner()?.loader.set_extensions(registry)
    }

    /// Load `specifier`, relative to `caller` or the environment root.
    ///
    /// # Errors
    /// Returns a [`ModuleError`] describing the first failure on the way
    pub fn require(
        &self,
        specifier: &str,
        is_main: bool,
        caller: Option<&Location>,
    ) -> Result<Exports> {
        let inner = self.inner()?;
        inner.context.with(|ctx| {
            inner
                .loader
                .require(&ctx, specifier, is_main, caller)
                .map(|(key, _)| Exports { key })
        })
    }

    /// [`Environment::require`] from code already running in this
    /// environment's context
    ///
    /// # Errors
    /// Returns a [`ModuleError`] describing the first failure on the way
    pub fn require_in<'js>(
        &self,
        ctx: &Ctx<'js>,
        specifier: &str,
        is_main: bool,
        caller: Option<&Location>,
    ) -> Result<Value<'js>> {
        let inner = self.inner()?;
        inner
            .loader
            .require(ctx, specifier, is_main, caller)
            .map(|(_, exports)| exports)
    }

    /// Resolve without loading
    ///
    /// # Errors
    /// Returns [`ModuleError::Resolution`] if nothing matches
    pub fn resolve(&self, specifier: &str, caller: Option<&Location>) -> Result<ModuleKey> {
        self.inner()?.loader.resolve(specifier, caller)
    }

    /// Run `source` as the main module. Each call executes afresh.
    ///
    /// # Errors
    /// Returns [`ModuleError::Execution`] if the script throws
    pub fn evaluate(&self, source: &str) -> Result<()> {
        let inner = self.inner()?;
        inner
            .context
            .with(|ctx| inner.loader.evaluate(&ctx, source))
    }

    /// # Errors
    /// Returns [`ModuleError::EnvironmentClosed`] after release
    pub fn with<F, R>(&self, f: F) -> Result<R>
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R,
    {
        Ok(self.inner()?.context.with(f))
    }

    /// Run `f` with the exports value behind `exports`
    ///
    /// # Errors
    /// Returns [`ModuleError::EnvironmentClosed`] after release
    pub fn with_exports<F, R>(&self, exports: &Exports, f: F) -> Result<R>
    where
        F: for<'js> FnOnce(&Ctx<'js>, Value<'js>) -> R,
    {
        let inner = self.inner()?;
        inner.context.with(|ctx| -> Result<R> {
            let value = inner.loader.exports(&ctx, &exports.key)?;
            Ok(f(&ctx, value))
        })
    }

    /// # Errors
    /// Returns [`ModuleError::EnvironmentClosed`] after release
    pub fn module_status(&self, key: &ModuleKey) -> Result<Option<ModuleStatus>> {
        Ok(self.inner()?.loader.status(key))
    }

    /// Every cached module and its state, ordered by key
    ///
    /// # Errors
    /// Returns [`ModuleError::EnvironmentClosed`] after release
    pub fn modules(&self) -> Result<Vec<(ModuleKey, ModuleStatus)>> {
        Ok(self.inner()?.loader.modules())
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Tear down the cache, the context and the runtime.
    ///
    /// # Errors
    /// Returns [`ModuleError::EnvironmentClosed`] if already released
    pub fn release(&mut self) -> Result<()> {
        let inner = self.inner.take().ok_or(ModuleError::EnvironmentClosed)?;
        inner.context.with(|_| inner.loader.clear());
        tracing::debug!(root = %inner.loader.root(), "environment released");

        let Inner {
            loader,
            context,
            runtime,
        } = inner;
        drop(loader);
        drop(context);
        drop(runtime);
        Ok(())
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.release();
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Environment")
                .field("root", inner.loader.root())
                .field("modules", &inner.loader.modules().len())
                .finish(),
            None => f.write_str("Environment(released)"),
        }
    }
}
