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
use dialoguer::{Input, Password};
use eyre::{Result, WrapErr};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use ipa_base::{delete_saved_session, save_session, FailureKind, Session};
use ipa_store::StoreClient;

use crate::settings::Settings;

use super::report;

/// Sign in, prompting for whatever wasn't supplied, and save the
/// resulting session in the keychain.
pub async fn login(
    settings: &Settings,
    client: &StoreClient,
    email: Option<String>,
    password: Option<String>,
    code: Option<String>,
    cancel: &CancellationToken,
) -> Result<Session> {
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Apple ID email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Apple ID password").interact()?,
    };
    let session = sign_in(client, &email, &password, code, cancel, prompt_for_code).await?;
    let keychain = &settings.keychain;
    save_session(&keychain.service, &keychain.account, &session)
        .wrap_err("Signed in, but couldn't save the session")?;
    eprintln!("Signed in as {} ({})", session.display_name, session.email);
    Ok(session)
}

/// Sign in with the given credentials.  If the store wants a two-factor
/// code and none was given, ask `get_code` for one and try again.
pub async fn sign_in<F>(
    client: &StoreClient,
    email: &str,
    password: &str,
    code: Option<String>,
    cancel: &CancellationToken,
    get_code: F,
) -> Result<Session>
where
    F: FnOnce() -> Result<String>,
{
    let first = client.login(email, password, code.as_deref(), cancel).await;
    let result = match first {
        Err(err) if err.kind() == FailureKind::CodeRequired && code.is_none() => {
            info!("Store requires a two-factor code for {}", email);
            let code = get_code()?;
            client.login(email, password, Some(&code), cancel).await
        }
        other => other,
    };
    let session = result.map_err(report)?;
    debug!("Signed in: {:?}", &session);
    Ok(session)
}

fn prompt_for_code() -> Result<String> {
    eprintln!("Enter the two-factor code sent to your devices.");
    let code: String = Input::new()
        .with_prompt("Two-factor code")
        .validate_with(|s: &String| -> std::result::Result<(), &str> {
            if !s.trim().is_empty() && s.trim().chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err("The code is all digits")
            }
        })
        .interact_text()?;
    Ok(code.trim().to_string())
}

/// Report the account of the saved session.
pub fn info(settings: &Settings) -> Result<Session> {
    let session = super::saved_session(settings)?;
    println!("Name: {}", session.display_name);
    println!("Email: {}", session.email);
    Ok(session)
}

/// Forget the saved session.  Forgetting when there's nothing saved is fine.
pub fn revoke(settings: &Settings) -> Result<()> {
    let keychain = &settings.keychain;
    if delete_saved_session(&keychain.service, &keychain.account)? {
        eprintln!("Signed out.");
    } else {
        debug!("No saved session in service {}", &keychain.service);
        eprintln!("There was no saved session.");
    }
    Ok(())
}

