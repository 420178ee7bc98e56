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
use eyre::{eyre, Report, Result};
use log::debug;
use tokio_util::sync::CancellationToken;

use ipa_base::{get_saved_session, Error, FailureKind, Session};
use ipa_store::StoreClient;

use crate::cli::TargetArgs;
use crate::settings::Settings;

pub mod auth;
pub mod download;
pub mod purchase;
pub mod search;

pub fn store_client(settings: &Settings) -> Result<StoreClient> {
    Ok(StoreClient::new(settings.endpoints.clone(), settings.network.clone())?)
}

/// The session saved by `auth login`, if there is one.
pub fn saved_session(settings: &Settings) -> Result<Session> {
    let keychain = &settings.keychain;
    match get_saved_session(&keychain.service, &keychain.account)? {
        Some(session) => {
            debug!("Using saved session: {:?}", &session);
            Ok(session)
        }
        None => Err(eyre!("Authentication required. Run the 'auth login' command.")),
    }
}

/// The store id of the target app, looking up its bundle id if need be.
pub async fn resolve_app_id(
    client: &StoreClient,
    settings: &Settings,
    target: &TargetArgs,
    cancel: &CancellationToken,
) -> Result<String> {
    if let Some(app_id) = &target.app_id {
        return Ok(app_id.clone());
    }
    let bundle_id = target
        .bundle_identifier
        .as_deref()
        .ok_or_else(|| eyre!("Either a bundle identifier or an app id is required"))?;
    let store = &settings.store;
    match client.lookup(bundle_id, &store.country, store.device_family, cancel).await? {
        Some(entry) => {
            debug!("Bundle {} has app id {}", bundle_id, entry.track_id);
            Ok(entry.track_id.to_string())
        }
        None => Err(eyre!("Couldn't find app with bundle identifier {}", bundle_id)),
    }
}

/// Explain a failure the way a user needs to hear it.
pub fn failure_message(err: &Error) -> String {
    let server_says = || match err.failure() {
        Some(record) if !record.customer_message.is_empty() => {
            format!(": {}", record.customer_message)
        }
        _ => String::new(),
    };
    match err.kind() {
        FailureKind::InvalidCountry => "The country provided does not match your account. \
            Use the -c, --country flag to supply a valid one."
            .to_string(),
        FailureKind::PasswordTokenExpired => "Login session expired. Login again.".to_string(),
        FailureKind::PasswordChanged => "Your password has changed. Login again.".to_string(),
        FailureKind::InvalidItem => "Received invalid store item.".to_string(),
        FailureKind::InvalidLicense => "Your Apple ID does not have a license for this app. \
            Use the purchase command to obtain one."
            .to_string(),
        FailureKind::PriceMismatch => "A license already exists for this item.".to_string(),
        FailureKind::InvalidCredentials => format!("Couldn't log in{}", server_says()),
        FailureKind::CodeRequired => {
            "A two-factor code is required. Supply it with the -m, --auth-code flag.".to_string()
        }
        FailureKind::LockedAccount => format!("Your account is locked{}", server_says()),
        FailureKind::Cancelled => "Cancelled.".to_string(),
        _ => match err.failure() {
            Some(record) => format!(
                "The store reported a failure{} ({})",
                server_says(),
                record.failure_type().unwrap_or_else(|| record.kind.to_string())
            ),
            None => err.to_string(),
        },
    }
}

/// Turn a library failure into a report carrying the user-facing message.
pub fn report(err: Error) -> Report {
    let message = failure_message(&err);
    Report::new(err).wrap_err(message)
}
