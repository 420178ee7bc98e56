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
use std::sync::Mutex;

use eyre::{eyre, Result};
use log::{error, info};
use tokio_util::sync::CancellationToken;

/// Install an interrupt handler and return a token that is cancelled
/// by the first interrupt.  In-flight store requests watch the token and
/// give up with a cancellation error.  A second interrupt exits at once.
pub fn cancel_on_interrupt() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let first = Mutex::new(Some(token.clone()));
    ctrlc::set_handler(move || {
        let pending = match first.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(token) = pending {
            info!("Caught initial interrupt");
            token.cancel();
        } else {
            error!("Caught subsequent interrupt");
            std::process::exit(130);
        }
    })
    .map_err(|err| eyre!("Can't install interrupt handler: {}", err))?;
    Ok(token)
}
