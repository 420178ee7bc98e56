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
use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

/// The result of a successful sign-in.  A session is never refreshed:
/// when the server stops honoring it, calls fail with a
/// password-token-expired failure and the user has to sign in again.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub display_name: String,
    pub email: String,
    pub password_token: String,
    pub directory_service_id: String,
    #[serde(default)]
    pub cookies: Vec<String>,
}

impl Session {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("directory_service_id", &self.directory_service_id)
            .field("password_token", &"[OBSCURED]")
            .field("cookies", &format!("[{} OBSCURED]", self.cookies.len()))
            .finish()
    }
}
