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
use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    static ref STOREFRONTS: HashMap<&'static str, &'static str> = [
        ("AE", "143481"),
        ("AR", "143505"),
        ("AT", "143445"),
        ("AU", "143460"),
        ("BE", "143446"),
        ("BG", "143526"),
        ("BR", "143503"),
        ("CA", "143455"),
        ("CH", "143459"),
        ("CL", "143483"),
        ("CN", "143465"),
        ("CO", "143501"),
        ("CZ", "143489"),
        ("DE", "143443"),
        ("DK", "143458"),
        ("EG", "143516"),
        ("ES", "143454"),
        ("FI", "143447"),
        ("FR", "143442"),
        ("GB", "143444"),
        ("GR", "143448"),
        ("HK", "143463"),
        ("HU", "143482"),
        ("ID", "143476"),
        ("IE", "143449"),
        ("IL", "143491"),
        ("IN", "143467"),
        ("IT", "143450"),
        ("JP", "143462"),
        ("KR", "143466"),
        ("MX", "143468"),
        ("MY", "143473"),
        ("NL", "143452"),
        ("NO", "143457"),
        ("NZ", "143461"),
        ("PH", "143474"),
        ("PL", "143478"),
        ("PT", "143453"),
        ("RO", "143487"),
        ("RU", "143469"),
        ("SA", "143479"),
        ("SE", "143456"),
        ("SG", "143464"),
        ("TH", "143475"),
        ("TR", "143480"),
        ("TW", "143470"),
        ("UA", "143492"),
        ("US", "143441"),
        ("VN", "143471"),
        ("ZA", "143472"),
    ]
    .into_iter()
    .collect();
}

/// The storefront id for a two-letter country code, in any case.
pub fn storefront_id(country: &str) -> Option<&'static str> {
    STOREFRONTS.get(country.trim().to_ascii_uppercase().as_str()).copied()
}

pub fn is_known_country(country: &str) -> bool {
    storefront_id(country).is_some()
}
