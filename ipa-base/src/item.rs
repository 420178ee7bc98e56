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
use std::convert::TryFrom;

use plist::{Dictionary, Value};

use crate::{field_string, Error, FailureKind, Result};

/// A per-account signature (a "sinf") for a downloaded package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBlock {
    pub id: i64,
    pub bytes: Vec<u8>,
}

/// The signed descriptor of a licensed item, as returned by the
/// store's download endpoint.  The metadata dictionary is kept whole,
/// because it's written verbatim into the re-signed package.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreItem {
    pub url: String,
    pub md5: String,
    pub signatures: Vec<SignatureBlock>,
    pub metadata: Dictionary,
}

impl StoreItem {
    /// The signature block that gets injected into the package.
    /// There must be exactly one block with id 0.
    pub fn signature(&self) -> Result<&SignatureBlock> {
        let mut candidates = self.signatures.iter().filter(|block| block.id == 0);
        match (candidates.next(), candidates.next()) {
            (Some(block), None) => Ok(block),
            (None, _) => {
                Err(Error::InvalidSignature("item has no signature with id 0".to_string()))
            }
            (Some(_), Some(_)) => Err(Error::InvalidSignature(
                "item has more than one signature with id 0".to_string(),
            )),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        field_string(&self.metadata, "bundleDisplayName")
    }

    pub fn short_version(&self) -> Option<String> {
        field_string(&self.metadata, "bundleShortVersionString")
    }

    pub fn bundle_id(&self) -> Option<String> {
        field_string(&self.metadata, "softwareVersionBundleId")
    }

    pub fn external_version_id(&self) -> Option<String> {
        field_string(&self.metadata, "softwareVersionExternalIdentifier")
    }

    /// Where to save the package if the user doesn't say.
    pub fn default_file_name(&self) -> String {
        let name = self.display_name().unwrap_or_else(|| "app".to_string());
        let name: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
            .collect();
        match self.short_version() {
            Some(version) => format!("{}_{}.ipa", name, version),
            None => format!("{}.ipa", name),
        }
    }
}

impl TryFrom<&Dictionary> for StoreItem {
    type Error = Error;

    fn try_from(dict: &Dictionary) -> Result<Self> {
        let url = field_string(dict, "URL").ok_or_else(|| {
            Error::store(FailureKind::InvalidItem, "The store item has no download URL")
        })?;
        let md5 = field_string(dict, "md5").unwrap_or_default();
        let signatures = match dict.get("sinfs").and_then(Value::as_array) {
            Some(sinfs) => sinfs.iter().filter_map(signature_block).collect(),
            None => Vec::new(),
        };
        let metadata = dict.get("metadata").and_then(Value::as_dictionary).cloned();
        Ok(StoreItem { url, md5, signatures, metadata: metadata.unwrap_or_default() })
    }
}

fn signature_block(value: &Value) -> Option<SignatureBlock> {
    let dict = value.as_dictionary()?;
    let id = match dict.get("id")? {
        Value::Integer(i) => i.as_signed()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    let bytes = dict.get("sinf")?.as_data()?.to_vec();
    Some(SignatureBlock { id, bytes })
}
