use rquickjs::{Ctx, Object, Result, Value};

/// A native module that scripts can `require` by name.
///
/// The exports are built lazily, at most once per environment.
pub trait ExtensionDef {
    fn name() -> &'static str;

    /// # Errors
    /// Returns an error if the exports object cannot be built
    fn exports<'js>(ctx: &Ctx<'js>) -> Result<Value<'js>>;
}

/// Create an empty exports object for an extension.
///
/// # Errors
/// Returns an error if the object cannot be allocated
pub fn new_exports<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
    Object::new(ctx.clone())
}

/// Render a script value as display text.
///
/// Strings are returned verbatim, objects go through `JSON.stringify`, and
/// everything else through string coercion.
pub fn display_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> String {
    use rquickjs::convert::Coerced;

    if let Some(text) = value.as_string() {
        return text.to_string().unwrap_or_default();
    }
    // Symbols refuse string coercion
    if let Some(symbol) = value.as_symbol() {
        let description = symbol
            .description()
            .ok()
            .and_then(|description| description.as_string().and_then(|s| s.to_string().ok()))
            .unwrap_or_default();
        return format!("Symbol({description})");
    }
    if value.is_object() && !value.is_function() {
        match ctx.json_stringify(value.clone()) {
            Ok(Some(json)) => {
                if let Ok(json) = json.to_string() {
                    return json;
                }
            }
            Ok(None) => {}
            // Cyclic structures make stringify throw; drop the pending exception
            Err(_) => {
                let _ = ctx.catch();
            }
        }
    }
    match value.get::<Coerced<String>>() {
        Ok(Coerced(text)) => text,
        Err(_) => {
            let _ = ctx.catch();
            format!("{value:?}")
        }
    }
}

#[macro_export]
macro_rules! export_function {
    ($exports:expr, $name:expr, $func:expr) => {{
        use rquickjs::function::Func;
        $exports.set($name, Func::from($func))?
    }};
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    fn render(source: &str) -> String {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let value: Value = ctx.eval(source).unwrap();
            display_value(&ctx, &value)
        })
    }

    #[test]
    fn test_display_value() {
        assert_eq!(render("'plain'"), "plain");
        assert_eq!(render("({ a: [1, 2] })"), r#"{"a":[1,2]}"#);
        assert_eq!(render("12.5"), "12.5");
        assert_eq!(render("null"), "null");
    }

    #[test]
    fn test_symbol_keeps_description() {
        assert_eq!(render("Symbol('s')"), "Symbol(s)");
        assert_eq!(render("Symbol()"), "Symbol()");
    }

    #[test]
    fn test_cyclic_object_falls_back_to_coercion() {
        assert_eq!(render("const o = {}; o.self = o; o"), "[object Object]");
    }
}
