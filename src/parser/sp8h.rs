// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the SP8H status frame.
//!
//! The status page is a script blob with the outlet data embedded as
//! nested JavaScript arrays. Only the shape below is relied on:
//!
//! ```text
//! body    := prefix "],[" states "],[" currents [ "],[" rest ]* suffix
//! states  := "'" code ( "','" code )* "'"        code := "0" | "1"
//! currents:= "'" raw ( "','" raw )* "'"
//! ```
//!
//! `suffix` is the two characters closing the outer array. It is only
//! present on the currents group when that group is the last one.
//!
//! The appliance sometimes stalls mid-read and answers with an empty body
//! or the literal `TimeOut`; both decode to an empty list.

use crate::error::ParseError;
use crate::types::{OutletReading, OutletState};

const GROUP_SEPARATOR: &str = "],[";
const ITEM_SEPARATOR: &str = "','";
const TRAILER_LEN: usize = 2;
const STATES_GROUP: usize = 1;
const CURRENTS_GROUP: usize = 2;

/// Parses an SP8H status body into one reading per outlet, in outlet order.
///
/// Current readings are paired by position; if the device sends fewer
/// currents than states, the extra outlets get `None`.
///
/// # Errors
///
/// Returns `ParseError` if the body has fewer than three bracket groups,
/// a group is not quote-delimited, or a state code is not `0`/`1`.
///
/// # Examples
///
/// ```
/// use powerstrip_lib::parser::parse_sp8h_status;
/// use powerstrip_lib::types::OutletState;
///
/// let body = "...],['1','0','1'],['0.1','0.0','0.2']xx";
/// let readings = parse_sp8h_status(body).unwrap();
///
/// let states: Vec<_> = readings.iter().map(|r| r.state).collect();
/// assert_eq!(states, [OutletState::On, OutletState::Off, OutletState::On]);
/// assert_eq!(readings[2].current.as_deref(), Some("0.2"));
///
/// assert!(parse_sp8h_status("TimeOut").unwrap().is_empty());
/// ```
pub fn parse_status(body: &str) -> Result<Vec<OutletReading>, ParseError> {
    if is_stalled(body) {
        return Ok(Vec::new());
    }

    let groups: Vec<&str> = body.split(GROUP_SEPARATOR).collect();
    if groups.len() <= CURRENTS_GROUP {
        return Err(ParseError::MissingGroup {
            expected: CURRENTS_GROUP + 1,
            found: groups.len(),
        });
    }

    let states = split_quoted(groups[STATES_GROUP])?
        .into_iter()
        .map(parse_code)
        .collect::<Result<Vec<_>, _>>()?;

    let mut currents_group = groups[CURRENTS_GROUP];
    if groups.len() == CURRENTS_GROUP + 1 {
        currents_group = strip_trailer(currents_group);
    }
    let currents = split_quoted(currents_group)?;

    Ok(states
        .into_iter()
        .enumerate()
        .map(|(i, state)| match currents.get(i) {
            Some(current) => OutletReading::new(state).with_current(*current),
            None => OutletReading::new(state),
        })
        .collect())
}

fn is_stalled(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("timeout")
}

fn strip_trailer(group: &str) -> &str {
    let cut = group
        .char_indices()
        .rev()
        .nth(TRAILER_LEN - 1)
        .map_or(0, |(idx, _)| idx);
    &group[..cut]
}

/// Splits `'a','b','c'` (optionally wrapped in brackets) into its items.
fn split_quoted(group: &str) -> Result<Vec<&str>, ParseError> {
    let inner = group.trim().trim_start_matches('[').trim_end_matches(']');
    let inner = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(|| ParseError::MalformedGroup(group.to_string()))?;
    Ok(inner.split(ITEM_SEPARATOR).collect())
}

fn parse_code(code: &str) -> Result<OutletState, ParseError> {
    match code {
        "1" => Ok(OutletState::On),
        "0" => Ok(OutletState::Off),
        other => Err(ParseError::UnknownStateCode(other.to_string())),
    }
}
