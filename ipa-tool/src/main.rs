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
use clap::Parser;
use eyre::{Result, WrapErr};

use ipa_base::cancel_on_interrupt;
use ipa_tool::cli::{Command, ToolArgs};
use ipa_tool::settings;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ToolArgs::parse();
    let settings = match settings::load_config_file(&args) {
        Ok(settings) => settings,
        Err(err) => {
            if let Command::Configure = args.cmd {
                eprintln!("Couldn't read the configuration file, creating a new one...");
                settings::default_config()
            } else {
                return Err(err).wrap_err("Run the 'configure' command to fix your configuration");
            }
        }
    };
    let cancel = cancel_on_interrupt()?;
    ipa_tool::run(settings, args, cancel).await
}
