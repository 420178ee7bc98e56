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
//! Re-signing of downloaded app packages: the licensing account's
//! metadata and signature are written into the package so it installs
//! without going back to the store.
pub use archive::{PackageArchive, ZipPackage};
pub use manifest::SignatureManifest;
pub use signer::{PackageSigner, SignerState, METADATA_ENTRY};

mod archive;
mod manifest;
mod signer;
#[cfg(test)]
mod testing;
