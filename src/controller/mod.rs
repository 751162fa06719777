// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch-then-verify with bounded retries.
//!
//! The appliances accept a switch request without confirming it, and an
//! outlet can silently ignore one. [`VerifiedSwitch`] switches, waits for
//! the relays to settle, reads the outlets back and re-sends the command to
//! those still in the wrong state, up to the policy's retry budget.
//!
//! Targets are processed one machine at a time, in the order they first
//! appear in the command. An AW2401 is a single group.

mod policy;
mod report;

pub use policy::RetryPolicy;
pub use report::{OutletOutcome, Outcome, SwitchReport};

use tokio::sync::watch;
use tokio::time::sleep;

use crate::command::SwitchCommand;
use crate::error::{Error, MisuseError, Result};
use crate::session::DeviceSession;
use crate::types::{MachineId, OutletAddress, OutletReading, OutletState, PowerAction};

/// Runs a [`SwitchCommand`] against one session and verifies the result.
///
/// # Examples
///
/// ```no_run
/// use powerstrip_lib::command::SwitchCommand;
/// use powerstrip_lib::controller::{RetryPolicy, VerifiedSwitch};
/// use powerstrip_lib::session::Sp8hSession;
/// use powerstrip_lib::types::{Credentials, DeviceEndpoint, PowerAction};
///
/// # async fn example() -> powerstrip_lib::Result<()> {
/// let mut session = Sp8hSession::new(DeviceEndpoint::sp8h("192.168.1.20"), Credentials::default())?;
/// session.login().await?;
///
/// let command = SwitchCommand::sp8h(&[1, 2], &[1, 5], PowerAction::Off)?;
/// let policy = RetryPolicy::new().with_max_retries(2);
/// let report = VerifiedSwitch::new(&mut session, policy)
///     .execute(&command)
///     .await?;
///
/// for outlet in report.mismatched() {
///     eprintln!("{} did not switch", outlet.address);
/// }
/// session.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct VerifiedSwitch<'a, S> {
    session: &'a mut S,
    policy: RetryPolicy,
    stop: Option<watch::Receiver<bool>>,
}

/// Outlets still mismatched in the group being verified, by report index.
#[derive(Debug, Default)]
struct RetryLedger {
    entries: Vec<(usize, Option<OutletState>)>,
}

impl RetryLedger {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|(index, _)| *index).collect()
    }
}

impl<'a, S: DeviceSession> VerifiedSwitch<'a, S> {
    /// Creates a controller over `session`.
    ///
    /// The session must already be open (and logged in for SP8H).
    #[must_use]
    pub fn new(session: &'a mut S, policy: RetryPolicy) -> Self {
        Self {
            session,
            policy,
            stop: None,
        }
    }

    /// Checks `stop` before each machine group and each retry round.
    ///
    /// Once it reads `true`, no further commands are sent and the report
    /// comes back with [`SwitchReport::interrupted`] set.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Switches every target and verifies the result.
    ///
    /// Outlets that never reach the expected state are reported as
    /// [`Outcome::Mismatched`], not returned as errors.
    ///
    /// # Errors
    ///
    /// Returns `MisuseError::WrongFamily` if the command does not match the
    /// session's device. Transport, HTTP status, authentication and misuse
    /// errors from the session are propagated and end the run.
    pub async fn execute(&mut self, command: &SwitchCommand) -> Result<SwitchReport> {
        let family = self.session.endpoint().family();
        if command.family() != family {
            return Err(MisuseError::WrongFamily {
                expected: family,
                actual: command.family(),
            }
            .into());
        }

        let action = command.action();
        let mut report = SwitchReport::new(
            action,
            command
                .targets()
                .iter()
                .copied()
                .map(OutletOutcome::pending)
                .collect(),
        );

        for group in group_by_machine(command.targets()) {
            if self.stopped() {
                tracing::info!("Stop requested, skipping remaining outlets");
                report.mark_interrupted();
                break;
            }
            self.run_group(&group, action, &mut report).await?;
            if report.interrupted() {
                break;
            }
        }

        Ok(report)
    }

    async fn run_group(
        &mut self,
        group: &[usize],
        action: PowerAction,
        report: &mut SwitchReport,
    ) -> Result<()> {
        self.switch_all(group, action, report).await?;

        let Some(expected) = action.expected_state() else {
            for &index in group {
                report.outlets_mut()[index].outcome = Outcome::Unverified;
            }
            return Ok(());
        };

        let mut ledger = self.verify(group, expected, report, None).await?;

        let mut round = 0;
        while !ledger.is_empty() && round < self.policy.max_retries() {
            if self.stopped() {
                tracing::info!(round, "Stop requested, abandoning retries");
                report.mark_interrupted();
                break;
            }
            round += 1;
            report.add_round();

            sleep(self.policy.retry_interval()).await;
            let pending = ledger.indices();
            self.switch_all(&pending, action, report).await?;
            ledger = self.verify(&pending, expected, report, Some(round)).await?;
        }

        for (index, observed) in ledger.entries {
            report.outlets_mut()[index].outcome = Outcome::Mismatched { observed };
        }
        Ok(())
    }

    async fn switch_all(
        &mut self,
        indices: &[usize],
        action: PowerAction,
        report: &mut SwitchReport,
    ) -> Result<()> {
        for &index in indices {
            sleep(self.policy.command_interval()).await;
            let entry = &mut report.outlets_mut()[index];
            self.session.switch_outlet(entry.address, action).await?;
            entry.attempts += 1;
        }
        Ok(())
    }

    /// Reads the group back and records every outlet that matches.
    /// `round` is `None` for the first pass.
    async fn verify(
        &mut self,
        indices: &[usize],
        expected: OutletState,
        report: &mut SwitchReport,
        round: Option<u32>,
    ) -> Result<RetryLedger> {
        let Some(&first) = indices.first() else {
            return Ok(RetryLedger::default());
        };

        sleep(self.policy.settle_delay()).await;
        let readings = self.read(report.outlets()[first].address).await?;

        let mut ledger = RetryLedger::default();
        for &index in indices {
            let entry = &mut report.outlets_mut()[index];
            let observed = readings.get(entry.address.slot()).map(|r| r.state);
            if observed == Some(expected) {
                entry.outcome = match round {
                    None => Outcome::Confirmed,
                    Some(round) => {
                        tracing::info!(outlet = %entry.address, round, "Outlet confirmed after retry");
                        Outcome::ConfirmedAfterRetry { round }
                    }
                };
            } else {
                tracing::warn!(
                    outlet = %entry.address,
                    expected = %expected,
                    observed = ?observed,
                    "Outlet state mismatch"
                );
                ledger.entries.push((index, observed));
            }
        }
        Ok(ledger)
    }

    /// Reads the status list containing `address`. A malformed body counts
    /// as an empty read.
    async fn read(&mut self, address: OutletAddress) -> Result<Vec<OutletReading>> {
        let readings = match self.session.query_outlets(address).await {
            Ok(readings) => readings,
            Err(Error::Parse(e)) => {
                tracing::warn!(outlet = %address, error = %e, "Unreadable status, treating as empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        if readings.is_empty() {
            tracing::warn!(outlet = %address, "Empty status read");
        }
        Ok(readings)
    }

    fn stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| *stop.borrow())
    }
}

/// Groups target indices by machine, keeping first-appearance order.
fn group_by_machine(targets: &[OutletAddress]) -> Vec<Vec<usize>> {
    let mut keys: Vec<Option<MachineId>> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, target) in targets.iter().enumerate() {
        let key = target.machine();
        if let Some(pos) = keys.iter().position(|k| *k == key) {
            groups[pos].push(index);
        } else {
            keys.push(key);
            groups.push(vec![index]);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::error::ParseError;
    use crate::session::SessionState;
    use crate::types::{DeviceEndpoint, DeviceFamily, OutletId, PortId};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Switch(OutletAddress, PowerAction),
        Query(OutletAddress),
    }

    /// In-memory strip. Outlets listed in `ignore` drop that many switch
    /// requests before obeying.
    struct FakeSession {
        endpoint: DeviceEndpoint,
        outlets: HashMap<OutletAddress, OutletState>,
        ignore: HashMap<OutletAddress, u32>,
        reads: VecDeque<Result<Vec<OutletReading>>>,
        calls: Vec<(Instant, Call)>,
        stop_after_queries: Option<(usize, watch::Sender<bool>)>,
        fail_switch: bool,
    }

    impl FakeSession {
        fn new(family: DeviceFamily) -> Self {
            Self {
                endpoint: DeviceEndpoint::new("fake", family),
                outlets: HashMap::new(),
                ignore: HashMap::new(),
                reads: VecDeque::new(),
                calls: Vec::new(),
                stop_after_queries: None,
                fail_switch: false,
            }
        }

        fn sp8h() -> Self {
            Self::new(DeviceFamily::Sp8h)
        }

        fn ignoring(mut self, address: OutletAddress, times: u32) -> Self {
            self.ignore.insert(address, times);
            self
        }

        fn scripted_read(mut self, read: Result<Vec<OutletReading>>) -> Self {
            self.reads.push_back(read);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.iter().map(|(_, c)| c.clone()).collect()
        }

        fn query_count(&self) -> usize {
            self.calls
                .iter()
                .filter(|(_, c)| matches!(c, Call::Query(_)))
                .count()
        }

        fn neighbours(address: OutletAddress) -> Vec<OutletAddress> {
            match address {
                OutletAddress::Sp8h { machine, .. } => (OutletId::MIN..=OutletId::MAX)
                    .map(|o| OutletAddress::Sp8h {
                        machine,
                        outlet: OutletId::new(o).unwrap(),
                    })
                    .collect(),
                OutletAddress::Aw2401 { .. } => (PortId::MIN..=PortId::MAX)
                    .map(|p| OutletAddress::Aw2401 {
                        port: PortId::new(p).unwrap(),
                    })
                    .collect(),
            }
        }
    }

    impl DeviceSession for FakeSession {
        fn endpoint(&self) -> &DeviceEndpoint {
            &self.endpoint
        }

        fn state(&self) -> SessionState {
            SessionState::Authenticated
        }

        async fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {}

        async fn switch_outlet(
            &mut self,
            address: OutletAddress,
            action: PowerAction,
        ) -> Result<()> {
            self.calls
                .push((Instant::now(), Call::Switch(address, action)));
            if self.fail_switch {
                return Err(Error::HttpStatus {
                    path: "/fake".into(),
                    status: 500,
                });
            }
            if let Some(left) = self.ignore.get_mut(&address) {
                if *left > 0 {
                    *left -= 1;
                    return Ok(());
                }
            }
            if let Some(state) = action.expected_state() {
                self.outlets.insert(address, state);
            }
            Ok(())
        }

        async fn query_outlets(&mut self, address: OutletAddress) -> Result<Vec<OutletReading>> {
            self.calls.push((Instant::now(), Call::Query(address)));
            if let Some((after, stop)) = &self.stop_after_queries {
                if self.query_count() >= *after {
                    stop.send_replace(true);
                }
            }
            if let Some(read) = self.reads.pop_front() {
                return read;
            }
            Ok(Self::neighbours(address)
                .into_iter()
                .map(|a| {
                    OutletReading::new(self.outlets.get(&a).copied().unwrap_or(OutletState::Off))
                })
                .collect())
        }
    }

    fn sp8h(machine: u8, outlet: u8) -> OutletAddress {
        OutletAddress::sp8h(machine, outlet).unwrap()
    }

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new().with_max_retries(max_retries)
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_on_first_pass() {
        let mut session = FakeSession::sp8h();
        let command = SwitchCommand::sp8h(&[1], &[2, 3], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(3))
            .execute(&command)
            .await
            .unwrap();

        assert!(report.all_confirmed());
        assert_eq!(report.rounds(), 0);
        assert!(!report.interrupted());
        assert!(report.outlets().iter().all(|o| o.attempts == 1));
        assert_eq!(
            session.calls(),
            [
                Call::Switch(sp8h(1, 2), PowerAction::On),
                Call::Switch(sp8h(1, 3), PowerAction::On),
                Call::Query(sp8h(1, 2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_then_match_retries_once() {
        let mut session = FakeSession::sp8h().ignoring(sp8h(1, 4), 1);
        let command = SwitchCommand::sp8h(&[1], &[4], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(2))
            .execute(&command)
            .await
            .unwrap();

        let outcome = report.outcome(sp8h(1, 4)).unwrap();
        assert_eq!(outcome.outcome, Outcome::ConfirmedAfterRetry { round: 1 });
        assert_eq!(outcome.attempts, 2);
        assert_eq!(report.rounds(), 1);
        assert_eq!(session.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_reports_mismatch() {
        let mut session = FakeSession::sp8h().ignoring(sp8h(2, 8), 1);
        let command = SwitchCommand::sp8h(&[2], &[8], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, RetryPolicy::default())
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            report.outlets()[0].outcome,
            Outcome::Mismatched {
                observed: Some(OutletState::Off)
            }
        );
        assert_eq!(report.outlets()[0].attempts, 1);
        assert_eq!(
            session.calls(),
            [
                Call::Switch(sp8h(2, 8), PowerAction::On),
                Call::Query(sp8h(2, 8)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhausted_keeps_last_observation() {
        let mut session = FakeSession::sp8h().ignoring(sp8h(1, 1), 10);
        let command = SwitchCommand::sp8h(&[1], &[1], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(3))
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(report.rounds(), 3);
        assert_eq!(report.outlets()[0].attempts, 4);
        assert_eq!(report.mismatched().count(), 1);
        assert_eq!(session.query_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn only_ledgered_outlets_are_resent() {
        let mut session = FakeSession::sp8h().ignoring(sp8h(1, 2), 1);
        let command = SwitchCommand::sp8h(&[1], &[1, 2, 3], PowerAction::Off).unwrap();
        // start everything on so that "off" is a real change
        for o in 1..=3 {
            session.outlets.insert(sp8h(1, o), OutletState::On);
        }

        let report = VerifiedSwitch::new(&mut session, quick_policy(1))
            .execute(&command)
            .await
            .unwrap();

        assert!(report.all_confirmed());
        let resent: Vec<_> = session.calls()[4..].to_vec();
        assert_eq!(
            resent,
            [
                Call::Switch(sp8h(1, 2), PowerAction::Off),
                Call::Query(sp8h(1, 2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_read_counts_as_mismatch() {
        let mut session = FakeSession::sp8h().scripted_read(Ok(Vec::new()));
        let command = SwitchCommand::sp8h(&[3], &[5], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(1))
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            report.outlets()[0].outcome,
            Outcome::ConfirmedAfterRetry { round: 1 }
        );
        assert_eq!(report.outlets()[0].attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_read_without_budget_has_no_observation() {
        let mut session = FakeSession::sp8h().scripted_read(Ok(Vec::new()));
        let command = SwitchCommand::sp8h(&[3], &[5], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, RetryPolicy::default())
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            report.outlets()[0].outcome,
            Outcome::Mismatched { observed: None }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn parse_error_counts_as_empty_read() {
        let mut session = FakeSession::sp8h().scripted_read(Err(ParseError::MissingGroup {
            expected: 3,
            found: 1,
        }
        .into()));
        let command = SwitchCommand::sp8h(&[1], &[1], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(1))
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            report.outlets()[0].outcome,
            Outcome::ConfirmedAfterRetry { round: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_sent_but_not_verified() {
        let mut session = FakeSession::sp8h();
        let command = SwitchCommand::sp8h(&[1], &[6, 7], PowerAction::Reset).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(3))
            .execute(&command)
            .await
            .unwrap();

        assert!(
            report
                .outlets()
                .iter()
                .all(|o| o.outcome == Outcome::Unverified && o.attempts == 1)
        );
        assert!(!report.all_confirmed());
        assert_eq!(session.query_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn groups_by_machine_in_first_appearance_order() {
        let mut session = FakeSession::sp8h();
        let command = SwitchCommand::new(
            [sp8h(2, 1), sp8h(1, 3), sp8h(2, 4)],
            PowerAction::On,
        )
        .unwrap();

        VerifiedSwitch::new(&mut session, RetryPolicy::default())
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            session.calls(),
            [
                Call::Switch(sp8h(2, 1), PowerAction::On),
                Call::Switch(sp8h(2, 4), PowerAction::On),
                Call::Query(sp8h(2, 1)),
                Call::Switch(sp8h(1, 3), PowerAction::On),
                Call::Query(sp8h(1, 3)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn honours_policy_delays() {
        let mut session = FakeSession::sp8h().ignoring(sp8h(1, 1), 1);
        let command = SwitchCommand::sp8h(&[1], &[1], PowerAction::On).unwrap();
        let start = Instant::now();

        VerifiedSwitch::new(&mut session, quick_policy(1))
            .execute(&command)
            .await
            .unwrap();

        let offsets: Vec<Duration> = session
            .calls
            .iter()
            .map(|(at, _)| at.duration_since(start))
            .collect();
        // switch 0.7s, read 1.9s, retry after 5s + 0.7s, read 1.2s later
        let expected = [700, 1900, 7600, 8800].map(Duration::from_millis);
        for (offset, want) in offsets.iter().zip(expected) {
            assert!(
                *offset >= want && *offset < want + Duration::from_millis(10),
                "call at {offset:?}, expected {want:?}"
            );
        }
        assert_eq!(offsets.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_sends_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send_replace(true);
        let mut session = FakeSession::sp8h();
        let command = SwitchCommand::sp8h(&[1, 2], &[1], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(2))
            .with_stop_signal(rx)
            .execute(&command)
            .await
            .unwrap();

        assert!(report.interrupted());
        assert!(
            report
                .outlets()
                .iter()
                .all(|o| o.outcome == Outcome::NotAttempted && o.attempts == 0)
        );
        assert!(session.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_first_group_abandons_retries() {
        let (tx, rx) = watch::channel(false);
        let mut session = FakeSession::sp8h().ignoring(sp8h(1, 1), 5);
        session.stop_after_queries = Some((1, tx));
        let command = SwitchCommand::sp8h(&[1, 2], &[1], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(5))
            .with_stop_signal(rx)
            .execute(&command)
            .await
            .unwrap();

        assert!(report.interrupted());
        assert_eq!(report.rounds(), 0);
        assert_eq!(
            report.outcome(sp8h(1, 1)).unwrap().outcome,
            Outcome::Mismatched {
                observed: Some(OutletState::Off)
            }
        );
        assert_eq!(
            report.outcome(sp8h(2, 1)).unwrap().outcome,
            Outcome::NotAttempted
        );
        assert_eq!(session.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn session_errors_propagate() {
        let mut session = FakeSession::sp8h();
        session.fail_switch = true;
        let command = SwitchCommand::sp8h(&[1], &[1], PowerAction::On).unwrap();

        let err = VerifiedSwitch::new(&mut session, RetryPolicy::default())
            .execute(&command)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn command_family_must_match_session() {
        let mut session = FakeSession::sp8h();
        let command = SwitchCommand::aw2401(&[1], PowerAction::On).unwrap();

        let err = VerifiedSwitch::new(&mut session, RetryPolicy::default())
            .execute(&command)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Misuse(MisuseError::WrongFamily { .. })
        ));
        assert!(session.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn verifies_aw2401_ports() {
        let port = OutletAddress::aw2401(2).unwrap();
        let mut session = FakeSession::new(DeviceFamily::Aw2401).ignoring(port, 1);
        let command = SwitchCommand::aw2401(&[2, 4], PowerAction::On).unwrap();

        let report = VerifiedSwitch::new(&mut session, quick_policy(1))
            .execute(&command)
            .await
            .unwrap();

        assert_eq!(
            report.outcome(port).unwrap().outcome,
            Outcome::ConfirmedAfterRetry { round: 1 }
        );
        assert_eq!(
            report
                .outcome(OutletAddress::aw2401(4).unwrap())
                .unwrap()
                .outcome,
            Outcome::Confirmed
        );
    }

    #[test]
    fn grouping_keeps_order() {
        let targets = [sp8h(3, 1), sp8h(1, 1), sp8h(3, 2), sp8h(1, 2), sp8h(4, 1)];
        assert_eq!(
            group_by_machine(&targets),
            vec![vec![0, 2], vec![1, 3], vec![4]]
        );
    }
}
