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
//! A client for the app store's licensing protocol: sign-in, license
//! purchase, and retrieval of signed download descriptors.  Requests and
//! responses are property lists; failures are classified into
//! [`ipa_base::FailureKind`]s.
pub use auth::AuthState;
pub use catalog::{CatalogEntry, DeviceFamily};
pub use client::{NetConfig, RawResponse, StoreClient, STORE_CONTENT_TYPE, STORE_USER_AGENT};
pub use cookies::StoreCookies;
pub use endpoint::{Endpoint, Endpoints};
pub use purchase::PurchaseOutcome;
pub use request::StoreRequest;
pub use response::{StoreResponse, CODE_REQUIRED_MESSAGE};
pub use storefront::{is_known_country, storefront_id};

mod acquire;
mod auth;
mod catalog;
mod client;
mod cookies;
mod endpoint;
mod purchase;
mod request;
mod response;
mod storefront;
