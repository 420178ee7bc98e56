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
use clap::{Args, Parser, Subcommand};

use ipa_store::DeviceFamily;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "Apple ID information can also be passed through the environment \
    variables IPATOOL_EMAIL, IPATOOL_PASSWORD and IPATOOL_2FA_CODE.")]
pub struct ToolArgs {
    #[clap(short = 'f', long, default_value = "ipatool.toml")]
    /// Path to config file.
    pub config_file: String,

    #[clap(short, long, action = clap::ArgAction::Count)]
    /// Specify once to force log level to debug.
    /// Specify twice to force log level to trace.
    pub debug: u8,

    #[clap(short, long)]
    /// Override configured log destination: 'console' or 'file'.
    /// You can use just the first letter, so '-l c' and '-l f' work.
    pub log_to: Option<String>,

    #[clap(short, long, global = true)]
    /// Two-letter country code of the store to use.
    /// Overrides the config file setting.
    pub country: Option<String>,

    #[clap(long, global = true)]
    /// Device family to search for: 'iphone' or 'ipad'.
    /// Overrides the config file setting.
    pub device_family: Option<DeviceFamily>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
/// Tool commands
pub enum Command {
    /// Sign in and out of the store
    Auth {
        #[clap(subcommand)]
        cmd: AuthCommand,
    },
    /// Search the catalog for apps
    Search {
        /// The term to search for
        term: String,

        #[clap(short, long, default_value_t = 5)]
        /// The maximum number of results.
        limit: u32,
    },
    /// Obtain a license for a free app
    Purchase {
        #[clap(flatten)]
        target: TargetArgs,
    },
    /// Download and sign an app the account has a license for
    Download {
        #[clap(flatten)]
        target: TargetArgs,

        #[clap(short, long)]
        /// Where to save the package.
        /// Defaults to the app's name and version.
        output: Option<String>,

        #[clap(long)]
        /// Obtain a license for the app if the account doesn't have one.
        purchase: bool,
    },
    /// Interactively create the config file
    Configure,
}

impl Command {
    /// Whether the command talks to the store.  Only those need a
    /// store client, and so a device identifier.
    pub fn uses_store(&self) -> bool {
        !matches!(
            self,
            Command::Configure | Command::Auth { cmd: AuthCommand::Info | AuthCommand::Revoke }
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in and save the session in the keychain
    Login {
        #[clap(short, long, env = "IPATOOL_EMAIL")]
        /// Apple ID email address.  Prompted for if not given.
        email: Option<String>,

        #[clap(short, long, env = "IPATOOL_PASSWORD", hide_env_values = true)]
        /// Apple ID password.  Prompted for if not given.
        password: Option<String>,

        #[clap(short = 'm', long = "auth-code", env = "IPATOOL_2FA_CODE", hide_env_values = true)]
        /// Two-factor code.  Prompted for if the store asks for one.
        auth_code: Option<String>,
    },
    /// Show the saved session's account
    Info,
    /// Forget the saved session
    Revoke,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    #[clap(short, long)]
    /// The app's bundle identifier.
    pub bundle_identifier: Option<String>,

    #[clap(short = 'i', long)]
    /// The app's numeric store identifier.
    pub app_id: Option<String>,
}
