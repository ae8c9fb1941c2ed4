use rquickjs::function::Rest;
use rquickjs::{Ctx, Result, Value};
use utils::{ExtensionDef, display_value, export_function, new_exports};

/// The `console` extension: `log`, `info` and `debug` write to stdout,
/// `warn` and `error` to stderr.
pub struct Console;

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn render<'js>(ctx: &Ctx<'js>, args: &[Value<'js>]) -> String {
    args.iter()
        .map(|value| display_value(ctx, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[allow(clippy::print_stdout, clippy::print_stderr)] // Intentional: console implementation
fn printer<'js>(stream: Stream) -> impl Fn(Ctx<'js>, Rest<Value<'js>>) + 'js {
    move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
        let line = render(&ctx, &args.0);
        match stream {
            Stream::Stdout => println!("{line}"),
            Stream::Stderr => eprintln!("{line}"),
        }
    }
}

impl ExtensionDef for Console {
    fn name() -> &'static str {
        "console"
    }

    fn exports<'js>(ctx: &Ctx<'js>) -> Result<Value<'js>> {
        let exports = new_exports(ctx)?;
        export_function!(exports, "log", printer(Stream::Stdout));
        export_function!(exports, "info", printer(Stream::Stdout));
        export_function!(exports, "debug", printer(Stream::Stdout));
        export_function!(exports, "warn", printer(Stream::Stderr));
        export_function!(exports, "error", printer(Stream::Stderr));
        Ok(exports.into_value())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rquickjs::{Context, Function, Object, Runtime};

    #[test]
    fn test_console_exports_functions() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let exports = Console::exports(&ctx).unwrap();
            let exports: Object = exports.get().unwrap();
            for name in ["log", "info", "debug", "warn", "error"] {
                assert!(exports.get::<_, Function>(name).is_ok(), "missing {name}");
            }
        });
    }

    #[test]
    fn test_render_joins_arguments() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let values: Vec<Value> = vec![
                ctx.eval("'total'").unwrap(),
                ctx.eval("42").unwrap(),
                ctx.eval("({ a: [1, 2] })").unwrap(),
            ];
            assert_eq!(render(&ctx, &values), r#"total 42 {"a":[1,2]}"#);
        });
    }
}
