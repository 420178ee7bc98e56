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
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use ipa_base::{FailureKind, Session, StoreItem};
use ipa_sign::PackageSigner;
use ipa_store::StoreClient;

use crate::cli::TargetArgs;
use crate::download::{download_file, DownloadProgress};
use crate::settings::Settings;

use super::purchase::license;
use super::{report, resolve_app_id};

/// Download the target app's package and sign it for the session's
/// account.  The package is fetched and signed under a temporary name
/// and only moved into place once it's complete.
pub async fn download(
    settings: &Settings,
    client: &StoreClient,
    session: &Session,
    target: &TargetArgs,
    output: Option<&str>,
    purchase: bool,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    client.restore_session(session);
    let app_id = resolve_app_id(client, settings, target, cancel).await?;
    let item = acquire_item(settings, client, session, &app_id, purchase, cancel).await?;
    let dest = output_path(output, &item);
    let partial = partial_path(&dest);
    if let Err(err) = fetch_and_sign(settings, item, &partial, &session.email, cancel).await {
        if partial.exists() {
            if let Err(e) = std::fs::remove_file(&partial) {
                warn!("Couldn't remove partial download {}: {}", partial.display(), e);
            }
        }
        return Err(err);
    }
    std::fs::rename(&partial, &dest)
        .wrap_err(format!("Cannot move package into place at {}", dest.display()))?;
    eprintln!("Saved signed package to {}", dest.display());
    Ok(dest)
}

async fn acquire_item(
    settings: &Settings,
    client: &StoreClient,
    session: &Session,
    app_id: &str,
    purchase: bool,
    cancel: &CancellationToken,
) -> Result<StoreItem> {
    let dsid = &session.directory_service_id;
    match client.acquire(app_id, dsid, cancel).await {
        Ok(item) => Ok(item),
        Err(err) if err.kind() == FailureKind::InvalidLicense && purchase => {
            info!("No license for app {}, purchasing it first", app_id);
            eprintln!("Obtaining a license for app {}...", app_id);
            license(settings, client, session, app_id, cancel).await?;
            client.acquire(app_id, dsid, cancel).await.map_err(report)
        }
        Err(err) => Err(report(err)),
    }
}

async fn fetch_and_sign(
    settings: &Settings,
    item: StoreItem,
    path: &Path,
    email: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut shown = None;
    download_file(&settings.network, &item.url, path, cancel, |p: DownloadProgress| {
        if let Some(percent) = p.percent() {
            if shown != Some(percent) {
                shown = Some(percent);
                eprint!("\rDownloading: {:>3}%", percent);
            }
        }
    })
    .await?;
    if shown.is_some() {
        eprintln!();
    }
    let path = path.to_path_buf();
    let email = email.to_string();
    tokio::task::spawn_blocking(move || PackageSigner::sign(item, &path, &email))
        .await
        .wrap_err("Signing task failed")?
        .map_err(report)
}

/// Where the finished package goes: the given file, or a file named
/// for the app in the given directory or the current one.
pub fn output_path(output: Option<&str>, item: &StoreItem) -> PathBuf {
    match output {
        Some(output) => {
            let path = PathBuf::from(output);
            if path.is_dir() {
                path.join(item.default_file_name())
            } else {
                path
            }
        }
        None => PathBuf::from(item.default_file_name()),
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
