use super::create_environment;
use crate::error_fmt::format_error_chain;
use mcjs_runtime::EnvironmentConfig;
use std::error::Error;

pub fn execute(code: &str, config: EnvironmentConfig) -> Result<(), Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let mut env = create_environment(&cwd, config)?;
    if let Err(e) = env.evaluate(code) {
        let error_chain = format_error_chain(&e);
        return Err(format!("Eval failed.{error_chain}").into());
    }
    env.release()?;

    Ok(())
}
