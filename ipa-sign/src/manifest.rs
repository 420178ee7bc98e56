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
use lazy_static::lazy_static;
use plist::Value;
use regex::Regex;

use ipa_base::{plist_decode, Error, Result};

use crate::archive::PackageArchive;

lazy_static! {
    static ref MANIFEST_PATH: Regex =
        Regex::new(r"^Payload/([^/]+)\.app/SC_Info/Manifest\.plist$").unwrap();
}

/// Where in a package the account signature goes, as declared by
/// the package's own signature manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureManifest {
    pub bundle_name: String,
    pub manifest_path: String,
    pub sinf_paths: Vec<String>,
}

impl SignatureManifest {
    /// Find and parse the manifest of the package's one top-level app bundle.
    pub fn discover(archive: &mut impl PackageArchive) -> Result<Self> {
        let mut found: Vec<(String, String)> = archive
            .list()
            .into_iter()
            .filter_map(|name| {
                let bundle = MANIFEST_PATH.captures(&name)?.get(1)?.as_str().to_string();
                Some((bundle, name))
            })
            .collect();
        let (bundle_name, manifest_path) = match found.len() {
            0 => {
                return Err(Error::InvalidBundle(
                    "package has no app bundle with a signature manifest".to_string(),
                ))
            }
            1 => found.remove(0),
            n => {
                return Err(Error::InvalidBundle(format!(
                    "package has {} app bundles with signature manifests",
                    n
                )))
            }
        };
        let bytes = archive.read(&manifest_path)?.ok_or_else(|| {
            Error::InvalidBundle(format!("can't read manifest {}", manifest_path))
        })?;
        let manifest = plist_decode(&bytes).map_err(|err| {
            Error::InvalidSignature(format!("unreadable manifest {}: {}", manifest_path, err))
        })?;
        let sinf_paths: Vec<String> = manifest
            .get("SinfPaths")
            .and_then(Value::as_array)
            .map(|paths| paths.iter().filter_map(Value::as_string).map(str::to_string).collect())
            .unwrap_or_default();
        if sinf_paths.is_empty() {
            return Err(Error::InvalidSignature(format!(
                "manifest {} declares no signature paths",
                manifest_path
            )));
        }
        Ok(SignatureManifest { bundle_name, manifest_path, sinf_paths })
    }

    /// The archive entry the signature is written to.
    pub fn target_path(&self) -> Result<String> {
        let first = self.sinf_paths.first().ok_or_else(|| {
            Error::InvalidSignature(format!("manifest {} has no signature paths", self.manifest_path))
        })?;
        Ok(format!("Payload/{}.app/{}", self.bundle_name, first.trim_start_matches('/')))
    }
}
