// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the AW2401 port status page.
//!
//! `/get_port_mode.html` is a small HTML form with one `<input>` per port,
//! in port order, whose `value` holds the port mode.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::ParseError;
use crate::types::{OutletReading, OutletState};

static INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("static selector is valid"));

/// Parses an AW2401 status page into one reading per port, in document
/// order.
///
/// # Errors
///
/// Returns `ParseError::MissingAttribute` if an `<input>` has no `value`,
/// or `ParseError::UnknownPortMode` if a value is neither `on` nor `off`.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::parser::parse_aw2401_status;
/// use powerstrip_lib::types::OutletState;
///
/// let html = r#"<form><input value="on"><input value="off"></form>"#;
/// let readings = parse_aw2401_status(html).unwrap();
/// assert_eq!(readings[0].state, OutletState::On);
/// assert_eq!(readings[1].state, OutletState::Off);
/// ```
pub fn parse_status(body: &str) -> Result<Vec<OutletReading>, ParseError> {
    let document = Html::parse_document(body);

    document
        .select(&INPUT)
        .enumerate()
        .map(|(index, element)| {
            let value = element
                .value()
                .attr("value")
                .ok_or(ParseError::MissingAttribute { index })?;
            parse_mode(value).map(OutletReading::new)
        })
        .collect()
}

fn parse_mode(value: &str) -> Result<OutletState, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" => Ok(OutletState::On),
        "off" => Ok(OutletState::Off),
        _ => Err(ParseError::UnknownPortMode(value.to_string())),
    }
}
