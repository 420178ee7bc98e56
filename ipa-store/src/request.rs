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
use std::fmt::{Debug, Formatter};

use plist::{Dictionary, Value};

use ipa_base::{plist_encode, Result};

use crate::endpoint::Endpoint;

/// One call to the store: which endpoint, the fields that make up the
/// property-list body (in insertion order), and any identity headers
/// that go on top of the client's baseline headers.
#[derive(Clone)]
pub struct StoreRequest {
    pub endpoint: Endpoint,
    pub fields: Dictionary,
    pub headers: Vec<(String, String)>,
}

impl StoreRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        StoreRequest { endpoint, fields: Dictionary::new(), headers: Vec::new() }
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Later headers with the same name replace earlier ones.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(&self) -> Result<Vec<u8>> {
        plist_encode(&self.fields)
    }
}

impl Debug for StoreRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&String> = self.fields.keys().collect();
        let headers: Vec<&String> = self.headers.iter().map(|(n, _)| n).collect();
        f.debug_struct("StoreRequest")
            .field("endpoint", &self.endpoint)
            .field("fields", &fields)
            .field("headers", &headers)
            .finish()
    }
}
