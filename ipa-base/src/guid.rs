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
use std::sync::OnceLock;

use crate::{Error, Result};

static DEVICE_GUID: OnceLock<String> = OnceLock::new();

/// The device identifier sent with every store request.  It's derived
/// from the primary network interface's hardware address the first
/// time it's asked for, and the same value is handed back for the
/// rest of the process.
pub fn device_guid() -> Result<&'static str> {
    if let Some(guid) = DEVICE_GUID.get() {
        return Ok(guid.as_str());
    }
    let address = mac_address::get_mac_address()
        .map_err(|err| Error::DeviceId(err.to_string()))?
        .ok_or_else(|| Error::DeviceId("no network interface has a hardware address".into()))?;
    let guid = normalize_hardware_address(&address.to_string());
    if guid.is_empty() {
        return Err(Error::DeviceId(format!("unusable hardware address '{}'", address)));
    }
    log::debug!("Device GUID is {}", guid);
    Ok(DEVICE_GUID.get_or_init(|| guid).as_str())
}

/// Strip separators and upper-case a hardware address,
/// so `aa:bb:cc:00:11:22` becomes `AABBCC001122`.
pub fn normalize_hardware_address(address: &str) -> String {
    address.chars().filter(char::is_ascii_hexdigit).map(|c| c.to_ascii_uppercase()).collect()
}
