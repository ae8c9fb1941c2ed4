//! Error types returned by the module environment

use crate::cache::ModuleKey;
use crate::resolver::ResolveError;
use crate::unwrap::ScriptError;
use thiserror::Error;

/// Result type for module environment operations
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors surfaced by `Environment::require` and friends.
///
/// Every variant is a flattened host value; no engine object escapes.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The specifier could not be mapped to a location or an extension
    #[error("Cannot find module '{specifier}' from '{base}'")]
    Resolution {
        specifier: String,
        base: String,
        #[source]
        source: ResolveError,
    },

    /// The module source could not be retrieved
    #[error("Cannot load module '{module}': {reason}")]
    Load { module: ModuleKey, reason: String },

    /// The module body (or extension factory) raised
    #[error("{error}")]
    Execution {
        module: ModuleKey,
        #[source]
        error: ScriptError,
    },

    /// The handle names a module this environment has not finished loading
    #[error("Module '{0}' is not loaded in this environment")]
    NotLoaded(ModuleKey),

    /// An extension with the same name is already registered
    #[error("Extension '{0}' is already registered")]
    DuplicateExtension(String),

    /// The extension set can only be replaced before the first require
    #[error("Extensions cannot be replaced after the first require")]
    ExtensionsSealed,

    /// The environment has been released
    #[error("Environment has been released")]
    EnvironmentClosed,

    /// The script runtime or context could not be created
    #[error("Script engine error: {0}")]
    Engine(#[from] rquickjs::Error),
}

impl ModuleError {
    /// The module the error is attached to, if any
    pub fn module(&self) -> Option<&ModuleKey> {
        match self {
            Self::Load { module, .. } | Self::Execution { module, .. } => Some(module),
            _ => None,
        }
    }

    /// The unwrapped script error for execution failures
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            Self::Execution { error, .. } => Some(error),
            _ => None,
        }
    }
}
