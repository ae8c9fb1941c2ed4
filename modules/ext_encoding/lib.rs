use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rquickjs::{Ctx, Exception, Result, Value};
use utils::{ExtensionDef, export_function, new_exports};

/// The `encoding` extension: base64 `btoa` / `atob`.
pub struct Encoding;

/// Binary to ASCII (Base64 encode)
fn btoa(data: &str) -> String {
    STANDARD.encode(data.as_bytes())
}

/// ASCII to Binary (Base64 decode)
fn atob(data: &str) -> std::result::Result<String, String> {
    let decoded = STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Invalid base64 string: {e}"))?;
    String::from_utf8(decoded).map_err(|e| format!("Invalid UTF-8 sequence: {e}"))
}

impl ExtensionDef for Encoding {
    fn name() -> &'static str {
        "encoding"
    }

    fn exports<'js>(ctx: &Ctx<'js>) -> Result<Value<'js>> {
        let exports = new_exports(ctx)?;
        export_function!(exports, "btoa", |data: String| -> String { btoa(&data) });
        export_function!(
            exports,
            "atob",
            |ctx: Ctx<'js>, data: String| -> Result<String> {
                atob(&data).map_err(|message| Exception::throw_message(&ctx, &message))
            }
        );
        Ok(exports.into_value())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_btoa_atob() {
        assert_eq!(btoa("hello"), "aGVsbG8=");
        assert_eq!(atob(" aGVsbG8= ").unwrap(), "hello");
    }

    #[test]
    fn test_atob_rejects_garbage() {
        let err = atob("%%%").unwrap_err();
        assert!(err.starts_with("Invalid base64 string"));
        // 0xff is not valid UTF-8
        assert!(atob("/w==").unwrap_err().starts_with("Invalid UTF-8"));
    }

    #[test]
    fn test_atob_throws_into_script() {
        use rquickjs::{CatchResultExt, Context, Runtime};

        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let exports = Encoding::exports(&ctx).unwrap();
            ctx.globals().set("encoding", exports).unwrap();
            let caught: String = ctx
                .eval(
                    r"
                    try { encoding.atob('%%%'); 'no error' } catch (e) { e.message }
                    ",
                )
                .catch(&ctx)
                .unwrap();
            assert!(caught.starts_with("Invalid base64 string"));
        });
    }
}
