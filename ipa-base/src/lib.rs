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
use std::io::Cursor;

use plist::{Dictionary, Value};

pub use credential::{delete_saved_session, get_saved_session, save_session};
pub use error::{Error, FailureKind, FailureRecord};
pub use guid::{device_guid, normalize_hardware_address};
pub use item::{SignatureBlock, StoreItem};
pub use session::Session;
pub use signal::cancel_on_interrupt;

mod credential;
mod error;
mod guid;
mod item;
mod session;
mod signal;

pub type Result<T> = std::result::Result<T, Error>;

/// Encode a dictionary as an XML property list, which is what the store
/// expects in request bodies and what packages expect in metadata entries.
pub fn plist_encode(dict: &Dictionary) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    Value::Dictionary(dict.clone()).to_writer_xml(&mut buffer)?;
    Ok(buffer)
}

/// Decode a property list (XML or binary) whose root must be a dictionary.
pub fn plist_decode(bytes: &[u8]) -> Result<Dictionary> {
    match Value::from_reader(Cursor::new(bytes))? {
        Value::Dictionary(dict) => Ok(dict),
        other => Err(Error::MalformedResponse(format!(
            "expected a dictionary at the root of the property list, found {:?}",
            other
        ))),
    }
}

/// The store is inconsistent about whether identifiers are strings
/// or integers, so we accept either and hand back a string.
pub fn field_string(dict: &Dictionary, key: &str) -> Option<String> {
    match dict.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn field_dict<'a>(dict: &'a Dictionary, key: &str) -> Option<&'a Dictionary> {
    dict.get(key).and_then(Value::as_dictionary)
}
