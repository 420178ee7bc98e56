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
//! A command-line client for the app store: sign in, search the
//! catalog, license free apps, and download packages re-signed for
//! the signed-in account.
use eyre::{eyre, Result};
use log::debug;
use tokio_util::sync::CancellationToken;

use cli::{AuthCommand, Command, ToolArgs};
use settings::Settings;

pub mod cli;
pub mod commands;
pub mod download;
pub mod logging;
pub mod settings;

pub async fn run(settings: Settings, args: ToolArgs, cancel: CancellationToken) -> Result<()> {
    let cmd = match args.cmd {
        // no logging on this path, because it might interfere with the interview
        Command::Configure => {
            return settings::update_config_file(Some(&settings), &args.config_file)
        }
        cmd => cmd,
    };
    logging::init(&settings)?;
    debug!("Loaded config: {:?}", &settings);
    if !cmd.uses_store() {
        return run_offline(&settings, cmd);
    }
    let client = commands::store_client(&settings)?;
    match cmd {
        Command::Auth { cmd: AuthCommand::Login { email, password, auth_code } } => {
            commands::auth::login(&settings, &client, email, password, auth_code, &cancel).await?;
        }
        Command::Search { term, limit } => {
            commands::search::search(&settings, &client, &term, limit, &cancel).await?;
        }
        Command::Purchase { target } => {
            let session = commands::saved_session(&settings)?;
            commands::purchase::purchase(&settings, &client, &session, &target, &cancel).await?;
        }
        Command::Download { target, output, purchase } => {
            let session = commands::saved_session(&settings)?;
            commands::download::download(
                &settings,
                &client,
                &session,
                &target,
                output.as_deref(),
                purchase,
                &cancel,
            )
            .await?;
        }
        other => run_offline(&settings, other)?,
    }
    Ok(())
}

/// Commands that only touch the keychain.
fn run_offline(settings: &Settings, cmd: Command) -> Result<()> {
    match cmd {
        Command::Auth { cmd: AuthCommand::Info } => {
            commands::auth::info(settings)?;
            Ok(())
        }
        Command::Auth { cmd: AuthCommand::Revoke } => commands::auth::revoke(settings),
        other => Err(eyre!("The {:?} command needs the store", other)),
    }
}
