//! Flattening of thrown script values into host errors.
//!
//! A thrown value is classified by capability: objects carrying a `message`
//! or a `cause` are *structured*, everything else is an opaque primitive that
//! is rendered as text. Structured values are followed through their `cause`
//! with an explicit loop that stops at a fixed depth or at the first value it
//! has already seen, so self-referential causes and proxies that keep
//! producing fresh causes both terminate.

use rquickjs::{CatchResultExt, CaughtError, Ctx, Value};
use std::fmt;
use utils::display_value;

pub const DEFAULT_MAX_CAUSE_DEPTH: usize = 32;

/// A thrown script value reduced to host data.
///
/// `messages` runs from the outermost error to the innermost cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    messages: Vec<String>,
    name: Option<String>,
    stack: Option<String>,
    truncated: bool,
}

impl ScriptError {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            name: None,
            stack: None,
            truncated: false,
        }
    }

    /// The outermost message
    pub fn message(&self) -> &str {
        self.messages.first().map_or("", String::as_str)
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// `name` of the outermost error object (`TypeError`, ...)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Whether the cause chain was cut short by the depth bound or a cycle
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn push(&mut self, message: String) {
        if message.is_empty() || self.messages.last() == Some(&message) {
            return;
        }
        self.messages.push(message);
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages.join(": "))?;
        if self.truncated {
            f.write_str(": ...")?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {}

/// What a thrown value looks like to the unwrapper
pub enum Thrown<T> {
    Primitive(String),
    Structured {
        name: Option<String>,
        message: Option<String>,
        stack: Option<String>,
        cause: Option<T>,
    },
}

/// A value that can be thrown and inspected for a message and a cause
pub trait Throwable: Sized {
    fn classify(&self) -> Thrown<Self>;

    /// Identity, used to stop on cycles
    fn is_same(&self, other: &Self) -> bool;
}

/// Flatten `raw` and its cause chain into a [`ScriptError`].
///
/// Visits at most `max_depth` values (at least one).
pub fn unwrap_thrown<T: Throwable>(raw: T, max_depth: usize) -> ScriptError {
    let max_depth = max_depth.max(1);
    let mut error = ScriptError {
        messages: Vec::new(),
        name: None,
        stack: None,
        truncated: false,
    };
    let mut visited: Vec<T> = Vec::with_capacity(max_depth.min(DEFAULT_MAX_CAUSE_DEPTH));
    let mut next = Some(raw);

    while let Some(current) = next.take() {
        if visited.len() >= max_depth || visited.iter().any(|seen| seen.is_same(&current)) {
            error.truncated = true;
            break;
        }

        match current.classify() {
            Thrown::Primitive(text) => error.push(text),
            Thrown::Structured {
                name,
                message,
                stack,
                cause,
            } => {
                if visited.is_empty() {
                    error.stack = stack;
                }
                match message {
                    Some(message) if !message.is_empty() => error.push(message),
                    _ => error.push(name.clone().unwrap_or_else(|| "Error".to_string())),
                }
                if visited.is_empty() {
                    error.name = name;
                }
                next = cause;
            }
        }
        visited.push(current);
    }

    if error.messages.is_empty() {
        error.messages.push(String::new());
    }
    error
}

fn text_property<'js>(
    ctx: &Ctx<'js>,
    object: &rquickjs::Object<'js>,
    key: &str,
) -> Option<Value<'js>> {
    match object.get::<_, Value>(key) {
        Ok(value) if value.is_undefined() || value.is_null() => None,
        Ok(value) => Some(value),
        // A throwing getter counts as absent
        Err(_) => {
            let _ = ctx.catch();
            None
        }
    }
}

impl<'js> Throwable for Value<'js> {
    fn classify(&self) -> Thrown<Self> {
        let ctx = self.ctx();
        let Some(object) = self.as_object() else {
            return Thrown::Primitive(display_value(ctx, self));
        };

        let message = text_property(ctx, object, "message");
        let cause = text_property(ctx, object, "cause");
        if message.is_none() && cause.is_none() {
            return Thrown::Primitive(display_value(ctx, self));
        }

        let text = |value: Option<Value<'js>>| value.map(|value| display_value(ctx, &value));
        Thrown::Structured {
            name: text(text_property(ctx, object, "name")),
            message: text(message),
            stack: text(text_property(ctx, object, "stack")),
            cause,
        }
    }

    fn is_same(&self, other: &Self) -> bool {
        self == other
    }
}

/// Flatten an error caught from the engine
pub fn unwrap_caught(caught: CaughtError<'_>, max_depth: usize) -> ScriptError {
    match caught {
        CaughtError::Exception(exception) => {
            unwrap_thrown(exception.into_object().into_value(), max_depth)
        }
        CaughtError::Value(value) => unwrap_thrown(value, max_depth),
        CaughtError::Error(error) => ScriptError::from_message(error.to_string()),
    }
}

/// Catch a pending exception behind `result` and flatten it
///
/// # Errors
/// Returns the flattened error when `result` failed
pub fn unwrap_result<'js, T>(
    ctx: &Ctx<'js>,
    result: rquickjs::Result<T>,
    max_depth: usize,
) -> Result<T, ScriptError> {
    result
        .catch(ctx)
        .map_err(|caught| unwrap_caught(caught, max_depth))
}
