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
use std::path::Path;

use log::{debug, info};
use plist::Value;

use ipa_base::{plist_encode, Error, Result, StoreItem};

use crate::archive::{PackageArchive, ZipPackage};
use crate::manifest::SignatureManifest;

/// The name of the descriptive entry at the root of a signed package.
pub const METADATA_ENTRY: &str = "iTunesMetadata.plist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    Empty,
    Loaded,
    MetadataSet,
    Signed,
    Written,
}

/// Turns a downloaded package into one that installs for the account
/// that licensed it.  Both injections have to happen before
/// [`PackageSigner::write`] for the result to be signed, but they can
/// happen in either order.
pub struct PackageSigner<A: PackageArchive = ZipPackage> {
    item: StoreItem,
    archive: Option<A>,
    metadata_set: bool,
    signed: bool,
    written: bool,
}

impl<A: PackageArchive> PackageSigner<A> {
    /// The item has to carry its primary signature, or there's nothing to sign with.
    pub fn new(item: StoreItem) -> Result<Self> {
        item.signature()?;
        Ok(PackageSigner { item, archive: None, metadata_set: false, signed: false, written: false })
    }

    pub fn load_archive(&mut self, archive: A) {
        self.archive = Some(archive);
        self.metadata_set = false;
        self.signed = false;
        self.written = false;
    }

    pub fn state(&self) -> SignerState {
        if self.archive.is_none() {
            SignerState::Empty
        } else if self.written {
            SignerState::Written
        } else if self.signed {
            SignerState::Signed
        } else if self.metadata_set {
            SignerState::MetadataSet
        } else {
            SignerState::Loaded
        }
    }

    pub fn archive(&self) -> Option<&A> {
        self.archive.as_ref()
    }

    pub fn into_archive(self) -> Option<A> {
        self.archive
    }

    /// Add the item metadata, stamped with the licensing account, at the package root.
    pub fn inject_metadata(&mut self, account_email: &str) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(Error::NotLoaded)?;
        let mut metadata = self.item.metadata.clone();
        metadata.insert("apple-id".to_string(), Value::String(account_email.to_string()));
        metadata.insert("userName".to_string(), Value::String(account_email.to_string()));
        archive.write(METADATA_ENTRY, plist_encode(&metadata)?);
        debug!("Staged {} with {} fields", METADATA_ENTRY, metadata.len());
        self.metadata_set = true;
        self.written = false;
        Ok(())
    }

    /// Put the account signature where the package's manifest says it goes.
    pub fn inject_signature(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(Error::NotLoaded)?;
        let manifest = SignatureManifest::discover(archive)?;
        let target = manifest.target_path()?;
        let signature = self.item.signature()?;
        archive.write(&target, signature.bytes.clone());
        debug!("Staged {} byte signature at {}", signature.bytes.len(), &target);
        self.signed = true;
        self.written = false;
        Ok(())
    }

    /// Save the package.  Writing with no injections just rewrites the
    /// package with the same entries.
    pub fn write(&mut self) -> Result<()> {
        let archive = self.archive.as_mut().ok_or(Error::NotLoaded)?;
        archive.serialize()?;
        self.written = true;
        Ok(())
    }
}

impl PackageSigner<ZipPackage> {
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let package = ZipPackage::open(path)?;
        self.load_archive(package);
        Ok(())
    }

    /// Load, inject both, and write, all in one go.  If an injection
    /// fails, the file on disk is left as it was.
    pub fn sign(item: StoreItem, path: impl AsRef<Path>, account_email: &str) -> Result<()> {
        let path = path.as_ref();
        let mut signer = Self::new(item)?;
        signer.load(path)?;
        signer.inject_metadata(account_email)?;
        signer.inject_signature()?;
        signer.write()?;
        info!("Signed package {} for {}", path.display(), account_email);
        Ok(())
    }
}
