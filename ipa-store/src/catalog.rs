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
use log::debug;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use ipa_base::{Error, Result};

use crate::client::StoreClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    Iphone,
    Ipad,
}

impl Default for DeviceFamily {
    fn default() -> Self {
        DeviceFamily::Iphone
    }
}

impl DeviceFamily {
    fn entity(&self) -> &'static str {
        match self {
            DeviceFamily::Iphone => "software",
            DeviceFamily::Ipad => "iPadSoftware",
        }
    }
}

impl std::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceFamily::Iphone => write!(f, "iphone"),
            DeviceFamily::Ipad => write!(f, "ipad"),
        }
    }
}

impl std::str::FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let sl = s.to_ascii_lowercase();
        if sl.is_empty() {
            Err("device family can't be empty".to_string())
        } else if "iphone".starts_with(&sl) {
            Ok(DeviceFamily::Iphone)
        } else if "ipad".starts_with(&sl) {
            Ok(DeviceFamily::Ipad)
        } else {
            Err(format!("device family '{}' must be iphone or ipad", s))
        }
    }
}

/// One app as the public catalog describes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub track_id: u64,
    pub track_name: String,
    pub bundle_id: String,
    pub version: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResponse {
    result_count: usize,
    results: Vec<CatalogEntry>,
}

impl StoreClient {
    pub async fn search(
        &self,
        term: &str,
        limit: u32,
        country: &str,
        family: DeviceFamily,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>> {
        let limit = limit.to_string();
        let query = [
            ("media", "software"),
            ("term", term),
            ("limit", limit.as_str()),
            ("country", country),
            ("entity", family.entity()),
        ];
        let response = self.catalog_get("search", &query, cancel).await?;
        Ok(response.results)
    }

    /// Find the app with this bundle id, if the catalog has it.
    pub async fn lookup(
        &self,
        bundle_id: &str,
        country: &str,
        family: DeviceFamily,
        cancel: &CancellationToken,
    ) -> Result<Option<CatalogEntry>> {
        let query = [
            ("media", "software"),
            ("bundleId", bundle_id),
            ("limit", "1"),
            ("country", country),
            ("entity", family.entity()),
        ];
        let response = self.catalog_get("lookup", &query, cancel).await?;
        if response.result_count == 0 {
            return Ok(None);
        }
        Ok(response.results.into_iter().next())
    }

    async fn catalog_get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<CatalogResponse> {
        let url = format!("{}/{}", self.endpoints().catalog_host, path);
        debug!("Catalog {} with {:?}", &url, query);
        let request = async {
            let response = self.http().get(&url).query(query).send().await?;
            response.error_for_status()?.json::<CatalogResponse>().await
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = request => result.map_err(Error::Transport),
        }
    }
}
