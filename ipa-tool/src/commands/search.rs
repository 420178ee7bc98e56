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
use log::debug;
use tokio_util::sync::CancellationToken;

use ipa_store::{CatalogEntry, StoreClient};

use crate::settings::Settings;

use super::report;

/// Search the catalog of the configured store and list the matches.
pub async fn search(
    settings: &Settings,
    client: &StoreClient,
    term: &str,
    limit: u32,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogEntry>> {
    let store = &settings.store;
    debug!(
        "Searching {} store for {} apps matching '{}'",
        &store.country, store.device_family, term
    );
    let entries = client
        .search(term, limit, &store.country, store.device_family, cancel)
        .await
        .map_err(report)?;
    if entries.is_empty() {
        eprintln!("No apps found matching '{}'", term);
    }
    for line in format_entries(&entries) {
        println!("{}", line);
    }
    Ok(entries)
}

fn format_entries(entries: &[CatalogEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let price =
                if e.price > 0.0 { format!("{:.2}", e.price) } else { "free".to_string() };
            format!(
                "{}. {}: {} ({}) version {} [{}]",
                i + 1,
                e.track_id,
                e.track_name,
                e.bundle_id,
                e.version,
                price
            )
        })
        .collect()
}
