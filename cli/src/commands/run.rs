use super::create_environment;
use crate::error_fmt::format_error_chain;
use mcjs_path_util::{strip_unc_prefix, to_file_url};
use mcjs_runtime::EnvironmentConfig;
use std::error::Error;
use std::fs;
use std::path::Path;

pub fn execute(file_path: &str, config: EnvironmentConfig) -> Result<(), Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let file_path_buf = Path::new(file_path);
    let absolute_file_path = if file_path_buf.is_absolute() {
        file_path_buf.to_path_buf()
    } else {
        cwd.join(file_path_buf)
    };

    if !absolute_file_path.is_file() {
        let file_url = to_file_url(&absolute_file_path);
        return Err(format!("Module not found \"{file_url}\".").into());
    }

    // Resolve symlinks and `..` so the entry shares its identity with later requires
    let canonical_file_path = strip_unc_prefix(fs::canonicalize(&absolute_file_path)?);
    let entry_file_url = to_file_url(&canonical_file_path);

    let mut env = create_environment(&cwd, config)?;
    if let Err(e) = env.require(&entry_file_url, true, None) {
        let error_chain = format_error_chain(&e);
        return Err(format!("Module '{entry_file_url}' failed.{error_chain}").into());
    }
    env.release()?;

    Ok(())
}
