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
use serde::{Deserialize, Serialize};

/// The hosts that store requests go to.  Paths are fixed by the protocol,
/// but hosts are configurable so a client can be pointed at a test server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub auth_host: String,
    pub auth_code_host: String,
    pub download_host: String,
    pub purchase_host: String,
    pub catalog_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            auth_host: "https://p25-buy.itunes.apple.com".to_string(),
            auth_code_host: "https://p71-buy.itunes.apple.com".to_string(),
            download_host: "https://p25-buy.itunes.apple.com".to_string(),
            purchase_host: "https://buy.itunes.apple.com".to_string(),
            catalog_host: "https://itunes.apple.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Send everything to one host, which is what a mock server needs.
    pub fn uniform(host: &str) -> Self {
        let host = host.trim_end_matches('/').to_string();
        Endpoints {
            auth_host: host.clone(),
            auth_code_host: host.clone(),
            download_host: host.clone(),
            purchase_host: host.clone(),
            catalog_host: host,
        }
    }

    /// The distinct store origins, so saved cookies can be replayed to each.
    pub fn origins(&self) -> Vec<&str> {
        let mut origins: Vec<&str> = Vec::new();
        for host in [&self.auth_host, &self.auth_code_host, &self.download_host, &self.purchase_host] {
            if !origins.contains(&host.as_str()) {
                origins.push(host.as_str());
            }
        }
        origins
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Authenticate,
    /// Sign-in with a two-factor code goes to a different host.
    AuthenticateWithCode,
    Download,
    Purchase,
}

impl Endpoint {
    pub fn url(&self, endpoints: &Endpoints, guid: &str) -> String {
        match self {
            Endpoint::Authenticate => format!(
                "{}/WebObjects/MZFinance.woa/wa/authenticate?guid={}",
                endpoints.auth_host, guid
            ),
            Endpoint::AuthenticateWithCode => format!(
                "{}/WebObjects/MZFinance.woa/wa/authenticate?guid={}",
                endpoints.auth_code_host, guid
            ),
            Endpoint::Download => format!(
                "{}/WebObjects/MZFinance.woa/wa/volumeStoreDownloadProduct?guid={}",
                endpoints.download_host, guid
            ),
            Endpoint::Purchase => {
                format!("{}/WebObjects/MZBuy.woa/wa/buyProduct", endpoints.purchase_host)
            }
        }
    }
}
