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
use eyre::Result;
use log::info;
use tokio_util::sync::CancellationToken;

use ipa_base::Session;
use ipa_store::{PurchaseOutcome, StoreClient};

use crate::cli::TargetArgs;
use crate::settings::Settings;

use super::{report, resolve_app_id};

/// Obtain a license for the target app.
pub async fn purchase(
    settings: &Settings,
    client: &StoreClient,
    session: &Session,
    target: &TargetArgs,
    cancel: &CancellationToken,
) -> Result<PurchaseOutcome> {
    client.restore_session(session);
    let app_id = resolve_app_id(client, settings, target, cancel).await?;
    let outcome = license(settings, client, session, &app_id, cancel).await?;
    match &outcome {
        PurchaseOutcome::Licensed => eprintln!("Obtained a license for app {}", app_id),
        PurchaseOutcome::AlreadyLicensed { .. } => {
            eprintln!("A license already exists for app {}", app_id)
        }
    }
    Ok(outcome)
}

/// Purchase an app by its id, with the session's cookies already
/// restored in the client.
pub(crate) async fn license(
    settings: &Settings,
    client: &StoreClient,
    session: &Session,
    app_id: &str,
    cancel: &CancellationToken,
) -> Result<PurchaseOutcome> {
    let outcome = client
        .purchase(
            app_id,
            &session.directory_service_id,
            &session.password_token,
            &settings.store.country,
            cancel,
        )
        .await
        .map_err(report)?;
    info!("Purchase of app {}: {:?}", app_id, &outcome);
    Ok(outcome)
}
