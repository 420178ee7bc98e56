/*
Copyright 2022 Daniel Brotsky. All rights reserved.

All of the copyrighted work in this repository is licensed under the
GNU Affero General Public License, reproduced in the LICENSE-AGPL file.

Attribution:

Some source files in this repository are derived from files in two Adobe Open
Source projects: the Adobe License Decoder repository found at this URL:
    https://github.com/adobe/adobe-license-decoder.rs
and the FRL Online Proxy repository found at this URL:
    https://github.com/adobe/frl-online-proxy

The files in those original works are copyright 2022 Adobe and the use of those
materials in this work is permitted by the MIT license under which they were
released.  That license is reproduced here in the LICENSE-MIT file.
*/
use plist::Dictionary;

/// Every way an operation against the store (or against a downloaded package)
/// can fail.  The first group are classifications of store responses; the
/// second group come from package signing; the last group are transport-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidCredentials,
    CodeRequired,
    InvalidAccount,
    InvalidCountry,
    InvalidItem,
    InvalidLicense,
    PasswordTokenExpired,
    PasswordChanged,
    PriceMismatch,
    LockedAccount,
    GenericError,
    UnknownError,
    InvalidBundle,
    InvalidSignature,
    NotLoaded,
    TransportError,
    Cancelled,
}

impl FailureKind {
    /// Classify the `failureType` code the store puts in a failure response.
    /// Codes we don't know about are reported as unknown errors; the raw code
    /// stays available in the [`FailureRecord`] fields.
    pub fn from_failure_type(code: &str) -> Self {
        match code.trim() {
            "-5000" => FailureKind::InvalidCredentials,
            "1" => FailureKind::CodeRequired,
            "5001" => FailureKind::InvalidAccount,
            "-128" => FailureKind::InvalidCountry,
            "-10000" => FailureKind::InvalidItem,
            "9610" => FailureKind::InvalidLicense,
            "2034" => FailureKind::PasswordTokenExpired,
            "2002" => FailureKind::PasswordChanged,
            "2019" => FailureKind::PriceMismatch,
            "-10001" => FailureKind::LockedAccount,
            "5002" => FailureKind::GenericError,
            _ => FailureKind::UnknownError,
        }
    }

    /// The wire code for kinds that have one.
    pub fn failure_type(&self) -> Option<&'static str> {
        match self {
            FailureKind::InvalidCredentials => Some("-5000"),
            FailureKind::CodeRequired => Some("1"),
            FailureKind::InvalidAccount => Some("5001"),
            FailureKind::InvalidCountry => Some("-128"),
            FailureKind::InvalidItem => Some("-10000"),
            FailureKind::InvalidLicense => Some("9610"),
            FailureKind::PasswordTokenExpired => Some("2034"),
            FailureKind::PasswordChanged => Some("2002"),
            FailureKind::PriceMismatch => Some("2019"),
            FailureKind::LockedAccount => Some("-10001"),
            FailureKind::GenericError => Some("5002"),
            FailureKind::UnknownError => Some("0"),
            _ => None,
        }
    }

    /// A price mismatch on a free item means the account already owns it.
    pub fn is_already_licensed(&self) -> bool {
        matches!(self, FailureKind::PriceMismatch)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::InvalidCredentials => "INVALID_CREDENTIALS",
            FailureKind::CodeRequired => "CODE_REQUIRED",
            FailureKind::InvalidAccount => "INVALID_ACCOUNT",
            FailureKind::InvalidCountry => "INVALID_COUNTRY",
            FailureKind::InvalidItem => "INVALID_ITEM",
            FailureKind::InvalidLicense => "INVALID_LICENSE",
            FailureKind::PasswordTokenExpired => "PASSWORD_TOKEN_EXPIRED",
            FailureKind::PasswordChanged => "PASSWORD_CHANGED",
            FailureKind::PriceMismatch => "PRICE_MISMATCH",
            FailureKind::LockedAccount => "LOCKED_ACCOUNT",
            FailureKind::GenericError => "GENERIC_ERROR",
            FailureKind::UnknownError => "UNKNOWN_ERROR",
            FailureKind::InvalidBundle => "INVALID_BUNDLE",
            FailureKind::InvalidSignature => "INVALID_SIGNATURE",
            FailureKind::NotLoaded => "NOT_LOADED",
            FailureKind::TransportError => "TRANSPORT_ERROR",
            FailureKind::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// A store response that was classified as a failure.  We keep all
/// the decoded fields so nothing the server said is lost.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub customer_message: String,
    pub raw_fields: Dictionary,
}

impl FailureRecord {
    pub fn new(kind: FailureKind, customer_message: impl Into<String>) -> Self {
        Self { kind, customer_message: customer_message.into(), raw_fields: Dictionary::new() }
    }

    pub fn with_fields(mut self, raw_fields: Dictionary) -> Self {
        self.raw_fields = raw_fields;
        self
    }

    /// The `failureType` code as sent by the server, if there was one.
    pub fn failure_type(&self) -> Option<String> {
        crate::field_string(&self.raw_fields, "failureType").filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.customer_message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} ({})", self.customer_message, self.kind)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Store(FailureRecord),
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid store request: {0}")]
    Request(String),
    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
    #[error("Request was cancelled")]
    Cancelled,
    #[error("Can't determine device identifier: {0}")]
    DeviceId(String),
    #[error("Invalid app bundle: {0}")]
    InvalidBundle(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("No package has been loaded")]
    NotLoaded,
    #[error("Malformed package archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn store(kind: FailureKind, message: impl Into<String>) -> Self {
        Error::Store(FailureRecord::new(kind, message))
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Store(record) => record.kind,
            Error::Transport(_) | Error::Io(_) => FailureKind::TransportError,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Request(_) | Error::MalformedResponse(_) | Error::DeviceId(_) => {
                FailureKind::GenericError
            }
            Error::Plist(_) => FailureKind::GenericError,
            Error::InvalidBundle(_) | Error::Archive(_) => FailureKind::InvalidBundle,
            Error::InvalidSignature(_) => FailureKind::InvalidSignature,
            Error::NotLoaded => FailureKind::NotLoaded,
        }
    }

    /// The server's failure record, when this error is a classified response.
    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Error::Store(record) => Some(record),
            _ => None,
        }
    }
}

impl From<FailureRecord> for Error {
    fn from(record: FailureRecord) -> Self {
        Error::Store(record)
    }
}
