pub mod eval;
pub mod run;

use mcjs_runtime::{DefaultExtensions, Environment, EnvironmentConfig, FsResolver, Location};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// A filesystem-backed environment rooted at `root`, with the default
/// extensions installed
fn create_environment(
    root: &Path,
    config: EnvironmentConfig,
) -> Result<Environment, Box<dyn Error>> {
    let resolver = FsResolver::with_options(config.resolver.clone());
    let env = Environment::with_config(Arc::new(resolver), Location::from_path(root), config)?;
    env.set_extensions(DefaultExtensions::create()?)?;
    Ok(env)
}
