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
use std::path::Path;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use ipa_store::NetConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    /// Zero when the server didn't say how big the file is.
    pub total: u64,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u64> {
        if self.total == 0 {
            None
        } else {
            Some(self.downloaded.min(self.total) * 100 / self.total)
        }
    }
}

/// Fetch a URL into a file, reporting progress after every chunk.
/// Returns the number of bytes written.  There is no overall timeout,
/// because packages can be very large, but connecting is bounded.
pub async fn download_file<F>(
    net: &NetConfig,
    url: &str,
    dest: &Path,
    cancel: &CancellationToken,
    mut progress: F,
) -> Result<u64>
where
    F: FnMut(DownloadProgress),
{
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(net.connect_timeout_secs))
        .build()
        .wrap_err("Cannot create download client")?;
    info!("Downloading {} to {}", url, dest.display());
    let mut response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(eyre!("Download cancelled")),
        response = client.get(url).send() => response.wrap_err("Download request failed")?,
    };
    response = response.error_for_status().wrap_err("Download was refused")?;
    let total = response.content_length().unwrap_or(0);
    let mut file = tokio::fs::File::create(dest)
        .await
        .wrap_err(format!("Cannot create file: {}", dest.display()))?;
    let mut downloaded = 0u64;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(eyre!("Download cancelled")),
            chunk = response.chunk() => chunk.wrap_err("Download interrupted")?,
        };
        let chunk = match chunk {
            Some(chunk) => chunk,
            None => break,
        };
        file.write_all(&chunk).await.wrap_err("Cannot write downloaded data")?;
        downloaded += chunk.len() as u64;
        progress(DownloadProgress { downloaded, total });
    }
    file.flush().await.wrap_err("Cannot write downloaded data")?;
    debug!("Downloaded {} bytes (expected {})", downloaded, total);
    if total > 0 && downloaded != total {
        return Err(eyre!("Download ended after {} of {} bytes", downloaded, total));
    }
    Ok(downloaded)
}
