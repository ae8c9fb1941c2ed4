//! The `require` algorithm.
//!
//! A [`ModuleLoader`] is shared (through `Rc`) between the owning
//! environment and the `require` functions it injects into scripts; the
//! injected functions only hold a `Weak` reference. Cache borrows are never
//! held across a call into script code, so nested requires can re-enter.

use crate::cache::{CachedFailure, ModuleCache, ModuleKey, ModuleState, ModuleStatus};
use crate::config::EnvironmentConfig;
use crate::error::{ModuleError, Result};
use crate::extension::ExtensionRegistry;
use crate::location::Location;
use crate::resolver::{ResolveError, Resolver};
use crate::unwrap::{ScriptError, unwrap_result};
use rquickjs::function::This;
use rquickjs::{Ctx, Exception, Function, Object, Persistent, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

const EVAL_MODULE: &str = "$mcjs$eval.js";

pub(crate) struct ModuleLoader {
    resolver: Arc<dyn Resolver>,
    root: Location,
    max_cause_depth: usize,
    globals: Vec<String>,
    extensions: RefCell<Rc<ExtensionRegistry>>,
    cache: RefCell<ModuleCache>,
    main: RefCell<Option<Persistent<Object<'static>>>>,
    sealed: Cell<bool>,
    globals_bound: Cell<bool>,
}

impl ModuleLoader {
    pub(crate) fn new(
        resolver: Arc<dyn Resolver>,
        root: Location,
        config: &EnvironmentConfig,
    ) -> Self {
        Self {
            resolver,
            root,
            max_cause_depth: config.max_cause_depth,
            globals: config.globals.clone(),
            extensions: RefCell::new(Rc::new(ExtensionRegistry::new())),
            cache: RefCell::new(ModuleCache::default()),
            main: RefCell::new(None),
            sealed: Cell::new(false),
            globals_bound: Cell::new(false),
        }
    }

    pub(crate) fn root(&self) -> &Location {
        &self.root
    }

    pub(crate) fn set_extensions(&self, registry: ExtensionRegistry) -> Result<()> {
        if self.sealed.get() {
            return Err(ModuleError::ExtensionsSealed);
        }
        *self.extensions.borrow_mut() = Rc::new(registry);
        Ok(())
    }

    pub(crate) fn status(&self, key: &ModuleKey) -> Option<ModuleStatus> {
        self.cache.borrow().status(key)
    }

    pub(crate) fn modules(&self) -> Vec<(ModuleKey, ModuleStatus)> {
        self.cache.borrow().modules()
    }

    /// Drop every engine handle. Must run inside the context, before the
    /// runtime goes away.
    pub(crate) fn clear(&self) {
        self.cache.borrow_mut().clear();
        self.main.borrow_mut().take();
    }

    /// Map a specifier to its cache key. Extension names win over the
    /// resolver.
    pub(crate) fn resolve(&self, specifier: &str, caller: Option<&Location>) -> Result<ModuleKey> {
        if self.extensions.borrow().contains(specifier) {
            return Ok(ModuleKey::Extension(specifier.to_string()));
        }

        let base = caller.unwrap_or(&self.root);
        let resolved = if specifier.is_empty() {
            Err(ResolveError::EmptySpecifier)
        } else {
            self.resolver.resolve(base, specifier)
        };

        match resolved {
            Ok(location) => {
                tracing::debug!(specifier, base = %base, location = %location, "resolved module");
                Ok(ModuleKey::Location(location))
            }
            Err(source) => {
                tracing::debug!(specifier, base = %base, error = %source, "resolution failed");
                Err(ModuleError::Resolution {
                    specifier: specifier.to_string(),
                    base: base.to_string(),
                    source,
                })
            }
        }
    }

    pub(crate) fn require<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        specifier: &str,
        is_main: bool,
        caller: Option<&Location>,
    ) -> Result<(ModuleKey, Value<'js>)> {
        self.sealed.set(true);
        self.bind_globals(ctx)?;
        let key = self.resolve(specifier, caller)?;
        let exports = self.load(ctx, &key, is_main)?;
        Ok((key, exports))
    }

    /// The cached exports of a finished module
    pub(crate) fn exports<'js>(&self, ctx: &Ctx<'js>, key: &ModuleKey) -> Result<Value<'js>> {
        match self.cache.borrow().get(key) {
            Some(ModuleState::Loaded { exports }) => Ok(exports.restore(ctx)?),
            Some(ModuleState::Failed(failure)) => Err(failure.to_error(key)),
            _ => Err(ModuleError::NotLoaded(key.clone())),
        }
    }

    /// Run `source` as a fresh main module. The result is not cached.
    pub(crate) fn evaluate(self: &Rc<Self>, ctx: &Ctx<'_>, source: &str) -> Result<()> {
        self.sealed.set(true);
        self.bind_globals(ctx)?;
        let location = self.root.join(EVAL_MODULE);
        let base = self.root.clone();
        self.run_module(ctx, &location, base, source, true, None)
            .map(|_| ())
            .map_err(|error| ModuleError::Execution {
                module: ModuleKey::Location(location),
                error,
            })
    }

    fn load<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        key: &ModuleKey,
        is_main: bool,
    ) -> Result<Value<'js>> {
        let state = self.cache.borrow().get(key);
        match state {
            Some(ModuleState::Loaded { exports }) => {
                tracing::trace!(module = %key, "cache hit");
                return Ok(exports.restore(ctx)?);
            }
            Some(ModuleState::Failed(failure)) => {
                tracing::debug!(module = %key, "module failed earlier");
                return Err(failure.to_error(key));
            }
            Some(ModuleState::Executing { module }) => {
                tracing::debug!(module = %key, "circular require");
                let module = module.restore(ctx)?;
                return Ok(module.get("exports")?);
            }
            // An extension factory requiring itself
            Some(ModuleState::Pending) => {
                tracing::debug!(module = %key, "circular require");
                return Ok(Value::new_undefined(ctx.clone()));
            }
            None => {}
        }

        match key {
            ModuleKey::Extension(name) => self.instantiate_extension(ctx, key, name),
            ModuleKey::Location(location) => self.execute(ctx, key, location, is_main),
        }
    }

    fn instantiate_extension<'js>(
        &self,
        ctx: &Ctx<'js>,
        key: &ModuleKey,
        name: &str,
    ) -> Result<Value<'js>> {
        let registry = Rc::clone(&self.extensions.borrow());
        self.cache.borrow_mut().transition(key, ModuleState::Pending);

        let result = registry.instantiate(ctx, name).unwrap_or_else(|| {
            Err(Exception::throw_message(
                ctx,
                &format!("Unknown extension '{name}'"),
            ))
        });
        self.settle(ctx, key, unwrap_result(ctx, result, self.max_cause_depth))
    }

    fn execute<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        key: &ModuleKey,
        location: &Location,
        is_main: bool,
    ) -> Result<Value<'js>> {
        let source = match self.resolver.load(location) {
            Ok(source) => source,
            Err(err) => {
                let reason = err.to_string();
                tracing::debug!(module = %key, reason, "load failed");
                self.cache
                    .borrow_mut()
                    .transition(key, ModuleState::Failed(CachedFailure::Load(reason.clone())));
                return Err(ModuleError::Load {
                    module: key.clone(),
                    reason,
                });
            }
        };
        self.cache.borrow_mut().transition(key, ModuleState::Pending);

        let outcome = if location.is_json() {
            unwrap_result(ctx, ctx.json_parse(source), self.max_cause_depth)
        } else {
            self.run_module(ctx, location, location.clone(), &source, is_main, Some(key))
        };
        self.settle(ctx, key, outcome)
    }

    /// Record the outcome of a first execution
    fn settle<'js>(
        &self,
        ctx: &Ctx<'js>,
        key: &ModuleKey,
        outcome: std::result::Result<Value<'js>, ScriptError>,
    ) -> Result<Value<'js>> {
        match outcome {
            Ok(exports) => {
                let saved = Persistent::save(ctx, exports.clone());
                self.cache
                    .borrow_mut()
                    .transition(key, ModuleState::Loaded { exports: saved });
                Ok(exports)
            }
            Err(error) => {
                tracing::debug!(module = %key, %error, "module threw");
                self.cache
                    .borrow_mut()
                    .transition(key, ModuleState::Failed(CachedFailure::Execution(error.clone())));
                Err(ModuleError::Execution {
                    module: key.clone(),
                    error,
                })
            }
        }
    }

    /// Build the `module` object, run the wrapped body against it and
    /// return the final `module.exports`.
    fn run_module<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        location: &Location,
        base: Location,
        source: &str,
        is_main: bool,
        key: Option<&ModuleKey>,
    ) -> std::result::Result<Value<'js>, ScriptError> {
        let result = self.module_object(ctx, location, base, is_main).and_then(|module| {
            if let Some(key) = key {
                let saved = Persistent::save(ctx, module.clone());
                self.cache
                    .borrow_mut()
                    .transition(key, ModuleState::Executing { module: saved });
            }
            call_body(ctx, &module, location, source)?;
            let exports: Value = module.get("exports")?;
            module.set("loaded", true)?;
            Ok(exports)
        });
        unwrap_result(ctx, result, self.max_cause_depth)
    }

    fn module_object<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        location: &Location,
        base: Location,
        is_main: bool,
    ) -> rquickjs::Result<Object<'js>> {
        let name = location.display_name();
        let module = Object::new(ctx.clone())?;
        module.set("id", name.as_str())?;
        module.set("filename", name.as_str())?;
        module.set("path", location.parent().display_name())?;
        module.set("loaded", false)?;
        module.set("exports", Object::new(ctx.clone())?)?;

        if is_main {
            *self.main.borrow_mut() = Some(Persistent::save(ctx, module.clone()));
        }
        module.set("require", self.require_function(ctx, base)?)?;
        Ok(module)
    }

    /// The `require` a script sees, bound to `base`
    fn require_function<'js>(
        self: &Rc<Self>,
        ctx: &Ctx<'js>,
        base: Location,
    ) -> rquickjs::Result<Function<'js>> {
        let loader = Rc::downgrade(self);
        let caller = base.clone();
        let require = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, specifier: String| -> rquickjs::Result<Value<'js>> {
                let loader = upgrade(&ctx, &loader)?;
                match loader.require(&ctx, &specifier, false, Some(&caller)) {
                    Ok((_, exports)) => Ok(exports),
                    Err(err) => Err(Exception::throw_message(&ctx, &err.to_string())),
                }
            },
        )?;

        let loader = Rc::downgrade(self);
        let resolve = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, specifier: String| -> rquickjs::Result<String> {
                let loader = upgrade(&ctx, &loader)?;
                match loader.resolve(&specifier, Some(&base)) {
                    Ok(ModuleKey::Location(location)) => Ok(location.display_name()),
                    Ok(ModuleKey::Extension(name)) => Ok(name),
                    Err(err) => Err(Exception::throw_message(&ctx, &err.to_string())),
                }
            },
        )?;
        require.set("resolve", resolve)?;

        let main = self.main.borrow().clone();
        match main {
            Some(main) => require.set("main", main.restore(ctx)?)?,
            None => require.set("main", Value::new_undefined(ctx.clone()))?,
        }
        Ok(require)
    }

    /// Bind the configured extensions as globals. Retried on every call
    /// until all of them are bound.
    fn bind_globals(self: &Rc<Self>, ctx: &Ctx<'_>) -> Result<()> {
        if self.globals_bound.get() {
            return Ok(());
        }
        let globals = ctx.globals();
        for name in &self.globals {
            if !self.extensions.borrow().contains(name) {
                return Err(ModuleError::Resolution {
                    specifier: name.clone(),
                    base: self.root.to_string(),
                    source: ResolveError::NotFound,
                });
            }
            let exports = self.load(ctx, &ModuleKey::Extension(name.clone()), false)?;
            globals.set(name.as_str(), exports)?;
        }
        self.globals_bound.set(true);
        Ok(())
    }
}

fn upgrade(ctx: &Ctx<'_>, loader: &Weak<ModuleLoader>) -> rquickjs::Result<Rc<ModuleLoader>> {
    loader
        .upgrade()
        .ok_or_else(|| Exception::throw_message(ctx, &ModuleError::EnvironmentClosed.to_string()))
}

/// Module source without a leading `#!` line
fn strip_shebang(source: &str) -> &str {
    if source.starts_with("#!") {
        source.find('\n').map_or("", |end| &source[end..])
    } else {
        source
    }
}

fn call_body<'js>(
    ctx: &Ctx<'js>,
    module: &Object<'js>,
    location: &Location,
    source: &str,
) -> rquickjs::Result<()> {
    let wrapped = format!(
        "(function (exports, require, module, __filename, __dirname) {{\n{}\n}})",
        strip_shebang(source)
    );
    let body: Function = ctx.eval(wrapped)?;

    let exports: Value = module.get("exports")?;
    let require: Function = module.get("require")?;
    let filename = location.display_name();
    let dirname = location.parent().display_name();
    body.call::<_, Value>((
        This(exports.clone()),
        exports,
        require,
        module.clone(),
        filename,
        dirname,
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_shebang() {
        assert_eq!(strip_shebang("#!/usr/bin/env mcjs\nexports.a = 1;"), "\nexports.a = 1;");
        assert_eq!(strip_shebang("#!/usr/bin/env mcjs"), "");
        assert_eq!(strip_shebang("exports.a = 1;"), "exports.a = 1;");
    }
}
