// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `powerstrip_lib` - A Rust library to switch networked power strips.
//!
//! This library provides async APIs to drive two families of rack power
//! strips over their embedded web interfaces, and to confirm that a switch
//! actually took effect.
//!
//! # Supported Devices
//!
//! - **SP8H**: up to four chained machines with eight outlets each; form
//!   login with a session cookie; on, off and reset; per-outlet current
//!   readings
//! - **AW2401**: four ports, no authentication; on and off
//!
//! # Supported Features
//!
//! - **Sessions**: connect, log in and out, switch and read outlets
//! - **Status parsing**: SP8H script blob and AW2401 HTML form
//! - **Verified switching**: switch, settle, read back and retry outlets
//!   still in the wrong state, with a caller-visible report
//!
//! # Quick Start
//!
//! ## SP8H with Verification
//!
//! ```no_run
//! use powerstrip_lib::{Credentials, DeviceEndpoint, PowerAction, RetryPolicy, Sp8hSession,
//!     SwitchCommand, VerifiedSwitch};
//!
//! #[tokio::main]
//! async fn main() -> powerstrip_lib::Result<()> {
//!     let endpoint = DeviceEndpoint::sp8h("192.168.1.20");
//!     let mut session = Sp8hSession::new(endpoint, Credentials::new("admin", "secret"))?;
//!     session.login().await?;
//!
//!     // Outlets 1 and 3 on machines 1 and 2
//!     let command = SwitchCommand::sp8h(&[1, 2], &[1, 3], PowerAction::On)?;
//!     let report = VerifiedSwitch::new(&mut session, RetryPolicy::new().with_max_retries(3))
//!         .execute(&command)
//!         .await?;
//!
//!     if !report.all_confirmed() {
//!         eprintln!("{} outlet(s) did not switch", report.mismatched().count());
//!     }
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## AW2401
//!
//! ```no_run
//! use powerstrip_lib::{Aw2401Session, DeviceEndpoint, DeviceSession, OutletState, PortId};
//!
//! #[tokio::main]
//! async fn main() -> powerstrip_lib::Result<()> {
//!     let mut session = Aw2401Session::new(DeviceEndpoint::aw2401("192.168.1.30"))?;
//!     session.open().await?;
//!
//!     session.switch_outlets(&[PortId::new(2)?], OutletState::Off).await?;
//!     for (i, reading) in session.query_status().await?.iter().enumerate() {
//!         println!("port {}: {}", i + 1, reading.state);
//!     }
//!
//!     session.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Interrupting a Run
//!
//! ```no_run
//! use powerstrip_lib::{Credentials, DeviceEndpoint, PowerAction, RetryPolicy, Sp8hSession,
//!     SwitchCommand, VerifiedSwitch};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> powerstrip_lib::Result<()> {
//!     let (stop_tx, stop_rx) = watch::channel(false);
//!     tokio::spawn(async move {
//!         // e.g. a shutdown request from elsewhere in the application
//!         tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!         stop_tx.send_replace(true);
//!     });
//!
//!     let mut session = Sp8hSession::new(DeviceEndpoint::sp8h("192.168.1.20"), Credentials::default())?;
//!     session.login().await?;
//!
//!     let command = SwitchCommand::sp8h(&[1], &[1, 2, 3, 4], PowerAction::Off)?;
//!     let report = VerifiedSwitch::new(&mut session, RetryPolicy::new().with_max_retries(5))
//!         .with_stop_signal(stop_rx)
//!         .execute(&command)
//!         .await?;
//!
//!     // Log out whether or not the run finished
//!     session.shutdown().await;
//!     if report.interrupted() {
//!         eprintln!("stopped early");
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod controller;
pub mod error;
pub mod parser;
pub mod session;
pub mod transport;
pub mod types;

pub use command::{Command, SwitchCommand};
pub use controller::{OutletOutcome, Outcome, RetryPolicy, SwitchReport, VerifiedSwitch};
pub use error::{AuthError, Error, MisuseError, ParseError, Result, TransportError};
pub use parser::{parse_aw2401_status, parse_sp8h_status};
pub use session::{Aw2401Session, DeviceSession, SessionState, Sp8hSession};
pub use transport::{HttpTransport, Request, Response, Transport};
pub use types::{
    Credentials, DeviceEndpoint, DeviceFamily, MachineId, OutletAddress, OutletId, OutletReading,
    OutletState, PortId, PowerAction,
};
