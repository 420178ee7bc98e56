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

use ipa_base::{field_string, plist_decode, Error, FailureKind, FailureRecord, Result};

/// The customer message the store sends when a sign-in needs a
/// two-factor code, without a failure type that says so.
pub const CODE_REQUIRED_MESSAGE: &str = "MZFinance.BadLogin.Configurator_message";

/// A decoded store response.  Every endpoint's responses go through
/// [`StoreResponse::decode`] so they are all classified the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResponse {
    Success(Dictionary),
    Failure(FailureRecord),
}

impl StoreResponse {
    pub fn decode(body: &[u8]) -> Result<Self> {
        let fields = plist_decode(body)?;
        Ok(Self::classify(fields))
    }

    pub fn classify(fields: Dictionary) -> Self {
        let message = field_string(&fields, "customerMessage").unwrap_or_default();
        let failure_type = field_string(&fields, "failureType").filter(|s| !s.is_empty());
        let kind = if message == CODE_REQUIRED_MESSAGE {
            Some(FailureKind::CodeRequired)
        } else {
            failure_type.as_deref().map(FailureKind::from_failure_type)
        };
        match kind {
            Some(kind) => {
                StoreResponse::Failure(FailureRecord::new(kind, message).with_fields(fields))
            }
            None => StoreResponse::Success(fields),
        }
    }

    pub fn into_result(self) -> Result<Dictionary> {
        match self {
            StoreResponse::Success(fields) => Ok(fields),
            StoreResponse::Failure(record) => Err(Error::Store(record)),
        }
    }
}
