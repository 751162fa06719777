// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test program: switch SP8H outlets and verify them by reading back.
//!
//! Ctrl-C stops the run between machines and between retry rounds; the
//! session is logged out before the program exits.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example sp8h_switch -- <host> <machines> <outlets> <on|off|reset> [retries] [username] [password]
//! ```
//!
//! # Example
//!
//! ```bash
//! # Turn off outlets 1 and 2 on machine 1, retrying twice
//! cargo run --example sp8h_switch -- 192.168.1.20 1 1,2 off 2
//!
//! # Reset outlet 8 on machines 1 and 2 with custom credentials
//! cargo run --example sp8h_switch -- 192.168.1.20 1,2 8 reset 0 ops secret
//! ```

use std::env;

use powerstrip_lib::types::{Credentials, DeviceEndpoint, PowerAction};
use powerstrip_lib::{DeviceSession, RetryPolicy, Sp8hSession, SwitchCommand, VerifiedSwitch};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 5 || args.len() > 8 {
        eprintln!(
            "Usage: {} <host> <machines> <outlets> <on|off|reset> [retries] [username] [password]",
            args[0]
        );
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example sp8h_switch -- 192.168.1.20 1 1,2 off 2");
        std::process::exit(1);
    }

    let host = &args[1];
    let machines = parse_ids(&args[2])?;
    let outlets = parse_ids(&args[3])?;
    let action: PowerAction = args[4].parse()?;
    let retries = args.get(5).map_or(Ok(0), |s| s.parse::<u32>())?;
    let credentials = match (args.get(6), args.get(7)) {
        (Some(user), Some(pass)) => Credentials::new(user.as_str(), pass.as_str()),
        (Some(user), None) => Credentials::new(user.as_str(), Credentials::DEFAULT_PASSWORD),
        _ => Credentials::default(),
    };

    let command = SwitchCommand::sp8h(&machines, &outlets, action)?;
    let policy = RetryPolicy::new().with_max_retries(retries);
    policy.validate()?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Interrupted, finishing current outlet...");
            let _ = stop_tx.send(true);
        }
    });

    println!("Connecting to {host}...");
    let mut session = Sp8hSession::new(DeviceEndpoint::sp8h(host.as_str()), credentials)?;
    session.open().await?;
    if let Err(e) = session.login().await {
        session.shutdown().await;
        return Err(e.into());
    }
    println!("Logged in.");

    let result = VerifiedSwitch::new(&mut session, policy)
        .with_stop_signal(stop_rx)
        .execute(&command)
        .await;

    session.shutdown().await;
    let report = result?;

    println!();
    println!("Action: {}  rounds: {}", report.action(), report.rounds());
    for entry in report.outlets() {
        println!(
            "  {:<12} {:?} (attempts: {})",
            entry.address.to_string(),
            entry.outcome,
            entry.attempts
        );
    }
    if report.interrupted() {
        println!("Run was interrupted.");
    }

    let failed = report.mismatched().count();
    if failed > 0 {
        eprintln!("{failed} outlet(s) not in the expected state.");
        std::process::exit(2);
    }
    if report.all_confirmed() {
        println!("All outlets confirmed.");
    }
    Ok(())
}

fn parse_ids(list: &str) -> Result<Vec<u8>, std::num::ParseIntError> {
    list.split(',').map(|id| id.trim().parse()).collect()
}
