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
use log::{debug, info, warn};
use plist::Dictionary;
use tokio_util::sync::CancellationToken;

use ipa_base::{field_dict, field_string, Error, FailureKind, Result, Session};

use crate::client::StoreClient;
use crate::endpoint::Endpoint;
use crate::request::StoreRequest;
use crate::response::StoreResponse;

/// The server sometimes reports invalid credentials on the first sign-in
/// from a device even when they are fine, so a sign-in without a code
/// gets exactly one more try.
const MAX_SIGN_IN_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    CodeRequired,
    Failed,
}

impl StoreClient {
    /// Sign in.  A failure comes back as `Err(Error::Store(..))` whose kind
    /// tells the caller what happened: in particular, `CodeRequired` means
    /// the sign-in should be repeated with the two-factor code.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        code: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Session> {
        let mut state = AuthState::Unauthenticated;
        debug!("Sign-in state for {}: {:?}", email, state);
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let request = sign_in_request(email, password, code, self.guid());
        let attempts = if code.is_some() { 1 } else { MAX_SIGN_IN_ATTEMPTS };
        let mut attempt = 1;
        let outcome = loop {
            state = AuthState::Authenticating;
            debug!("Sign-in state for {}: {:?} (attempt {})", email, state, attempt);
            let outcome = self.issue(&request, cancel).await.and_then(StoreResponse::into_result);
            let retry = matches!(&outcome, Err(err) if err.kind() == FailureKind::InvalidCredentials)
                && attempt < attempts;
            if !retry {
                break outcome;
            }
            warn!("Sign-in reported invalid credentials, trying once more");
            attempt += 1;
        };
        match outcome {
            Ok(fields) => {
                let session = self.session_from(email, &fields)?;
                state = AuthState::Authenticated;
                info!("Sign-in state for {}: {:?}", email, state);
                Ok(session)
            }
            Err(err) => {
                state = if err.kind() == FailureKind::CodeRequired {
                    AuthState::CodeRequired
                } else {
                    AuthState::Failed
                };
                info!("Sign-in state for {}: {:?} ({})", email, state, err);
                Err(err)
            }
        }
    }

    fn session_from(&self, email: &str, fields: &Dictionary) -> Result<Session> {
        let message = field_string(fields, "customerMessage").unwrap_or_default();
        let malformed = |what: &str| {
            let text = if message.is_empty() {
                format!("Sign-in response has no {}", what)
            } else {
                format!("Sign-in response has no {}: {}", what, message)
            };
            Error::store(FailureKind::GenericError, text)
        };
        let directory_service_id = field_string(fields, "dsPersonId")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("account identifier"))?;
        let password_token = field_string(fields, "passwordToken")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("password token"))?;
        let account = field_dict(fields, "accountInfo");
        let address = account.and_then(|a| field_dict(a, "address"));
        let name_part = |key: &str| address.and_then(|a| field_string(a, key)).unwrap_or_default();
        let display_name = format!("{} {}", name_part("firstName"), name_part("lastName"))
            .trim()
            .to_string();
        let email = account
            .and_then(|a| field_string(a, "appleId"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| email.to_string());
        Ok(Session {
            display_name,
            email,
            password_token,
            directory_service_id,
            cookies: self.cookies().received(),
        })
    }
}

fn sign_in_request(email: &str, password: &str, code: Option<&str>, guid: &str) -> StoreRequest {
    let (endpoint, attempt, password) = match code {
        Some(code) => (Endpoint::AuthenticateWithCode, 2i64, format!("{}{}", password, code)),
        None => (Endpoint::Authenticate, 4i64, password.to_string()),
    };
    StoreRequest::new(endpoint)
        .field("appleId", email)
        .field("attempt", attempt)
        .field("createSession", "true")
        .field("guid", guid)
        .field("password", password)
        .field("rmp", 0i64)
        .field("why", "signIn")
}
