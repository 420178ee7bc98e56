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
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use ipa_base::{field_string, Error, FailureKind, Result};

use crate::client::{decode_response, StoreClient};
use crate::endpoint::Endpoint;
use crate::request::StoreRequest;
use crate::storefront::storefront_id;

/// The store answers a purchase of something the account already owns
/// with this status instead of a failure record.
const ALREADY_LICENSED_STATUS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Licensed,
    AlreadyLicensed { message: String },
}

impl StoreClient {
    /// Get a license for a free item.  Owning the item already is not
    /// a failure: it comes back as [`PurchaseOutcome::AlreadyLicensed`]
    /// however the store chose to say so.
    pub async fn purchase(
        &self,
        item_id: &str,
        directory_service_id: &str,
        password_token: &str,
        country: &str,
        cancel: &CancellationToken,
    ) -> Result<PurchaseOutcome> {
        let storefront = storefront_id(country).ok_or_else(|| {
            Error::store(
                FailureKind::InvalidCountry,
                format!("'{}' is not a known store country", country),
            )
        })?;
        info!("Purchasing item {} in storefront {}", item_id, storefront);
        let request = purchase_request(item_id, self.guid())
            .header("X-Dsid", directory_service_id)
            .header("iCloud-DSID", directory_service_id)
            .header("X-Token", password_token)
            .header("X-Apple-Store-Front", format!("{}-1", storefront));
        let raw = self.send(&request, cancel).await?;
        if raw.status == ALREADY_LICENSED_STATUS {
            info!("Store reports item {} is already licensed", item_id);
            return Ok(PurchaseOutcome::AlreadyLicensed {
                message: "The account already has a license for this item".to_string(),
            });
        }
        let fields = match decode_response(&raw)?.into_result() {
            Ok(fields) => fields,
            Err(Error::Store(record)) if record.kind.is_already_licensed() => {
                info!("Store reports a price mismatch for item {}", item_id);
                return Ok(PurchaseOutcome::AlreadyLicensed { message: record.customer_message });
            }
            Err(err) => return Err(err),
        };
        let doc_type = field_string(&fields, "jingleDocType").unwrap_or_default();
        let status = field_string(&fields, "status").unwrap_or_default();
        debug!("Purchase response has doc type '{}' and status '{}'", doc_type, status);
        if doc_type != "purchaseSuccess" || status != "0" {
            let message = field_string(&fields, "customerMessage")
                .unwrap_or_else(|| "The store did not confirm the purchase".to_string());
            return Err(Error::store(FailureKind::GenericError, message));
        }
        info!("Purchased item {}", item_id);
        Ok(PurchaseOutcome::Licensed)
    }
}

fn purchase_request(item_id: &str, guid: &str) -> StoreRequest {
    StoreRequest::new(Endpoint::Purchase)
        .field("appExtVrsId", "0")
        .field("hasAskedToFulfillPreorder", "true")
        .field("buyWithoutAuthorization", "true")
        .field("hasDoneAgeCheck", "true")
        .field("guid", guid)
        .field("needDiv", "0")
        .field("origPage", format!("Software-{}", item_id))
        .field("origPageLocation", "Buy")
        .field("price", "0")
        .field("pricingParameters", "STDQ")
        .field("productType", "C")
        .field("salableAdamId", item_id)
}
