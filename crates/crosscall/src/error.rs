//! Typed errors for every fallible operation in the crate.
//!
//! Errors accumulate context while they propagate: converters push field
//! path segments with [`CallError::join_field`], and the marshaling
//! boundary finalizes them once with [`CallError::flush_fields`], producing
//! messages like `Failed to deserialize value. Field: args[0].node.pos`.

use std::fmt;

use thiserror::Error;

/// Closed set of failure codes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Unknown,
    InvalidName,
    AlreadyExists,
    NotExported,
    ProviderDisabled,
    ArgsCountNotMatch,
    UnexpectedType,
    UnsupportedValue,
    IndexOutOfRange,
    KeyNotFound,
}

/// Error value returned by the registry, the conversion engine, and every
/// generated proxy. Nothing in the crate throws for control flow.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CallError {
    reason: Reason,
    message: String,
    #[source]
    origin: Option<Box<dyn std::error::Error + Send + Sync>>,
    fields: Vec<String>,
}

impl CallError {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            origin: None,
            fields: Vec::new(),
        }
    }

    /// Wraps a foreign error once into the crate taxonomy, keeping the
    /// original inspectable through [`std::error::Error::source`].
    pub fn unknown(context: &str, origin: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            reason: Reason::Unknown,
            message: format!("{context}: {origin}"),
            origin: Some(origin),
            fields: Vec::new(),
        }
    }

    pub fn unexpected_type(target: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            Reason::UnexpectedType,
            format!("Failed to parse value to {target}. Expected alternative {expected}. Holding alternative {actual}."),
        )
    }

    pub fn unsupported_value(value: impl fmt::Display, target: &str, detail: &str) -> Self {
        Self::new(
            Reason::UnsupportedValue,
            format!("Failed to convert \"{value}\" to {target}. {detail}"),
        )
    }

    pub fn key_not_found(field: &str) -> Self {
        Self::new(
            Reason::KeyNotFound,
            format!("missing required field \"{field}\" when deserializing"),
        )
    }

    pub fn index_out_of_range(index: usize) -> Self {
        Self::new(Reason::IndexOutOfRange, format!("index \"{index}\" out of range"))
    }

    pub fn args_count(required: usize, provided: usize) -> Self {
        Self::new(
            Reason::ArgsCountNotMatch,
            format!("Fail to invoke! function requires {required} args, but {provided} provided."),
        )
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Full diagnostic text, including the wrapped origin when present.
    pub fn message(&self) -> String {
        match &self.origin {
            None => self.message.clone(),
            Some(origin) => format!("{}\nOrigin Error: {origin}", self.message),
        }
    }

    /// Appends a line to the message.
    pub fn append(mut self, text: &str) -> Self {
        if !self.message.is_empty() && !self.message.ends_with('\n') {
            self.message.push('\n');
        }
        self.message.push_str(text);
        self
    }

    /// Stamps function identity, resolving the owning provider's name
    /// through the registry at error-construction time, best-effort.
    pub fn append_function(self, namespace: &str, name: &str, signature: &str) -> Self {
        let provider = crate::registry::get_provider(namespace, name)
            .upgrade()
            .map(|module| module.name().to_string())
            .unwrap_or_else(|| "unknown provider".to_string());
        self.append(&format!(
            "Function: [{namespace}::{name}](signature {signature}) provided by <{provider}>."
        ))
    }

    /// Pushes a field path segment without finalizing the message.
    pub fn join_field(mut self, segment: impl Into<String>) -> Self {
        self.fields.push(segment.into());
        self
    }

    /// Pops the accumulated path segments into the message, innermost last,
    /// then clears the stack.
    pub fn flush_fields(mut self, prefix: &str, root: &str) -> Self {
        let mut path = String::from(root);
        for segment in self.fields.drain(..).rev() {
            path.push_str(&segment);
        }
        self.append(&format!("{prefix} Field: {path}"))
    }
}
