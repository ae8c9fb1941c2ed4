//! CommonJS `require` for an embedded QuickJS engine.
//!
//! An [`Environment`] owns one script runtime and a module cache. Modules are
//! resolved through a pluggable [`Resolver`], executed at most once per
//! canonical [`Location`], and may require each other in cycles. Thrown
//! script values come back as flattened [`ScriptError`]s.

mod cache;
mod config;
mod environment;
mod error;
mod extension;
mod loader;
mod location;
mod resolver;
mod source_map;
mod unwrap;

pub use cache::{ModuleKey, ModuleStatus};
pub use config::EnvironmentConfig;
pub use environment::{Environment, Exports};
pub use error::{ModuleError, Result};
pub use extension::{DefaultExtensions, ExtensionRegistry};
pub use location::Location;
pub use resolver::{FsResolver, ResolveError, Resolver, ResolverOptions};
pub use source_map::SourceMapResolver;
pub use unwrap::{
    DEFAULT_MAX_CAUSE_DEPTH, ScriptError, Throwable, Thrown, unwrap_caught, unwrap_result,
    unwrap_thrown,
};

/// Script arguments exposed as `require('process').argv`
pub fn set_script_args(args: Vec<String>) {
    ext_process::set_script_args(args);
}
