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
use std::convert::TryFrom;

use log::{debug, info};
use plist::Value;
use tokio_util::sync::CancellationToken;

use ipa_base::{Error, FailureKind, Result, StoreItem};

use crate::client::StoreClient;
use crate::endpoint::Endpoint;
use crate::request::StoreRequest;
use crate::response::StoreResponse;

impl StoreClient {
    /// Fetch the signed descriptor of an item the account already has
    /// a license for.  Store failures are passed back as they are.
    pub async fn acquire(
        &self,
        item_id: &str,
        directory_service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<StoreItem> {
        info!("Requesting download descriptor for item {}", item_id);
        let request = StoreRequest::new(Endpoint::Download)
            .field("creditDisplay", "")
            .field("guid", self.guid())
            .field("salableAdamId", item_id)
            .header("X-Dsid", directory_service_id)
            .header("iCloud-DSID", directory_service_id);
        let fields = self.issue(&request, cancel).await.and_then(StoreResponse::into_result)?;
        let first = fields
            .get("songList")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(Value::as_dictionary)
            .ok_or_else(|| {
                Error::store(FailureKind::InvalidItem, "The store returned no items for this id")
            })?;
        let item = StoreItem::try_from(first)?;
        debug!("Item {} has {} signature block(s)", item_id, item.signatures.len());
        Ok(item)
    }
}
