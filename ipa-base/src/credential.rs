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
use eyre::{eyre, Result, WrapErr};

use crate::Session;

fn entry(service: &str, account: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(service, account)
        .wrap_err_with(|| format!("Can't access credential for service '{}'", service))
}

/// Save a session in the platform credential store, replacing any
/// session saved earlier under the same service and account.
pub fn save_session(service: &str, account: &str, session: &Session) -> Result<()> {
    let json = session.to_json().wrap_err("Can't serialize session")?;
    match entry(service, account)?.set_password(&json) {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoStorageAccess(err)) => {
            eprintln!("Credential store could not be accessed.  Is it unlocked?");
            Err(eyre!(err))
        }
        Err(err) => Err(eyre!(err)),
    }
}

/// Fetch the saved session, if there is one.  A saved value that doesn't
/// decode as a session is treated as an error rather than as absent,
/// so that a corrupt entry gets noticed.
pub fn get_saved_session(service: &str, account: &str) -> Result<Option<Session>> {
    match entry(service, account)?.get_password() {
        Ok(s) => {
            let session = Session::from_json(&s).wrap_err("Saved session is not readable")?;
            Ok(Some(session))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(keyring::Error::NoStorageAccess(err)) => {
            eprintln!("Credential store could not be accessed.  Is it unlocked?");
            Err(eyre!(err))
        }
        Err(err) => Err(eyre!(err)),
    }
}

/// Remove the saved session.  Returns whether there was one to remove.
pub fn delete_saved_session(service: &str, account: &str) -> Result<bool> {
    match entry(service, account)?.delete_password() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(keyring::Error::NoStorageAccess(err)) => {
            eprintln!("Credential store could not be accessed.  Is it unlocked?");
            Err(eyre!(err))
        }
        Err(err) => Err(eyre!(err)),
    }
}
