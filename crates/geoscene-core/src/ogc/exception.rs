//! Protocol exception taxonomy and its JSON rendering.
//!
//! The four codes below are the only user-visible errors. Infrastructure
//! failures never reach this type; they degrade to placeholder success
//! responses instead.

use serde_json::{json, Value};

/// The four OGC exception codes this profile can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    /// A required query parameter is absent.
    MissingParameterValue,
    /// A parameter is present but carries a disallowed value.
    InvalidParameterValue,
    /// The request or service is unknown or deliberately unimplemented.
    OperationNotSupported,
    /// The request names a protocol version this profile does not speak,
    /// or a WFS parameter value the profile cannot process.
    OperationProcessingFailed,
}

impl ExceptionCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingParameterValue => "MissingParameterValue",
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::OperationNotSupported => "OperationNotSupported",
            Self::OperationProcessingFailed => "OperationProcessingFailed",
        }
    }
}

/// One protocol exception, carrying the version of the protocol that was
/// addressed, the offending parameter (if any), and a human-readable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolException {
    pub version: String,
    pub code: ExceptionCode,
    pub locator: Option<String>,
    pub text: String,
}

impl ProtocolException {
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        code: ExceptionCode,
        locator: impl Into<Option<String>>,
        text: impl Into<String>,
    ) -> Self {
        Self { version: version.into(), code, locator: locator.into(), text: text.into() }
    }

    /// Renders the wire shape:
    /// `{"version":v,"exceptions":[{"code":c,"locator":l,"text":t}]}`.
    ///
    /// An absent locator renders as the literal `"noLocator"`.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "version": self.version,
            "exceptions": [{
                "code": self.code.as_str(),
                "locator": self.locator.as_deref().unwrap_or("noLocator"),
                "text": self.text,
            }]
        })
    }
}
