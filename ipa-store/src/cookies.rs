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
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;

/// The client's cookie jar.  Cookies are matched and replayed by the
/// wrapped [`Jar`]; we also keep the raw `Set-Cookie` strings the store
/// sent, so they can be saved in the session and restored later.
#[derive(Default)]
pub struct StoreCookies {
    jar: Jar,
    received: Mutex<Vec<String>>,
}

impl StoreCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seed the jar from saved `Set-Cookie` strings, for each of the
    /// given origins.
    pub fn restore(&self, cookies: &[String], origins: &[&str]) {
        for origin in origins {
            let url = match Url::parse(origin) {
                Ok(url) => url,
                Err(err) => {
                    warn!("Can't restore cookies for origin '{}': {}", origin, err);
                    continue;
                }
            };
            for cookie in cookies {
                self.jar.add_cookie_str(cookie, &url);
            }
        }
        let mut received = self.received.lock().unwrap_or_else(PoisonError::into_inner);
        for cookie in cookies {
            remember(&mut received, cookie);
        }
    }

    /// All the cookies seen so far, one per cookie name, latest wins.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CookieStore for StoreCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        {
            let mut received = self.received.lock().unwrap_or_else(PoisonError::into_inner);
            for value in headers.iter() {
                if let Ok(s) = value.to_str() {
                    remember(&mut received, s);
                }
            }
        }
        debug!("Received {} cookie(s) from {}", headers.len(), url.host_str().unwrap_or(""));
        self.jar.set_cookies(&mut headers.into_iter(), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

fn cookie_name(cookie: &str) -> &str {
    cookie.split(';').next().unwrap_or("").split('=').next().unwrap_or("").trim()
}

fn remember(received: &mut Vec<String>, cookie: &str) {
    let name = cookie_name(cookie);
    received.retain(|c| cookie_name(c) != name);
    received.push(cookie.to_string());
}
