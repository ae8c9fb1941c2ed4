use rquickjs::{Ctx, Exception, Result, Value};
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;
use utils::{ExtensionDef, export_function, new_exports};

static SCRIPT_ARGS: OnceLock<Vec<String>> = OnceLock::new();

/// Set script arguments (called by the host before the first require)
pub fn set_script_args(args: Vec<String>) {
    let _ = SCRIPT_ARGS.set(args);
}

fn script_args() -> Vec<String> {
    SCRIPT_ARGS.get().cloned().unwrap_or_default()
}

/// The `process` extension: arguments, environment and platform details.
pub struct Process;

impl ExtensionDef for Process {
    fn name() -> &'static str {
        "process"
    }

    fn exports<'js>(ctx: &Ctx<'js>) -> Result<Value<'js>> {
        let exports = new_exports(ctx)?;

        exports.set("argv", script_args())?;
        exports.set(
            "env",
            env::vars().collect::<HashMap<String, String>>(),
        )?;
        exports.set("platform", platform())?;
        exports.set("arch", env::consts::ARCH)?;

        export_function!(exports, "cwd", |ctx: Ctx<'js>| -> Result<String> {
            env::current_dir()
                .map(|dir| dir.display().to_string())
                .map_err(|e| Exception::throw_message(&ctx, &e.to_string()))
        });

        export_function!(exports, "exit", |code: Option<i32>| -> i32 {
            #[allow(clippy::exit)] // Intentional: implements process.exit()
            {
                std::process::exit(code.unwrap_or(0));
            }
        });

        Ok(exports.into_value())
    }
}

/// Node-style platform names
fn platform() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_platform_name() {
        if cfg!(target_os = "linux") {
            assert_eq!(platform(), "linux");
        } else if cfg!(windows) {
            assert_eq!(platform(), "win32");
        }
    }

    #[test]
    fn test_process_exports() {
        set_script_args(vec!["--flag".to_string(), "value".to_string()]);

        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let exports = Process::exports(&ctx).unwrap();
            ctx.globals().set("process", exports).unwrap();

            let argv: Vec<String> = ctx.eval("process.argv").unwrap();
            assert_eq!(argv, vec!["--flag", "value"]);

            let cwd: String = ctx.eval("process.cwd()").unwrap();
            assert_eq!(cwd, env::current_dir().unwrap().display().to_string());

            let has_env: bool = ctx.eval("typeof process.env === 'object'").unwrap();
            assert!(has_env);

            let exit_type: String = ctx.eval("typeof process.exit").unwrap();
            assert_eq!(exit_type, "function");
        });
    }
}
