use crate::error::{CoreError, Result};
use crate::github::{DeviceAuthSession, TokenGrant};
use crate::session::SessionToken;

/// Seconds added to the poll interval on `slow_down` when GitHub names none.
pub const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Countdown and poll bookkeeping for a live device code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub session: DeviceAuthSession,
    pub remaining_secs: u64,
    pub interval_secs: u64,
    pub since_last_poll: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAuthState {
    Idle,
    CodeRequested,
    AwaitingUserAction(PendingSession),
    Verifying(PendingSession),
    Authenticated(TokenGrant),
    Failed(String),
    Expired,
}

#[derive(Debug)]
pub enum DeviceAuthEvent {
    Initiate,
    CodeIssued(DeviceAuthSession),
    CodeFailed(CoreError),
    /// One second of wall time.
    Tick,
    PollResolved(Result<TokenGrant>),
    Cancel,
}

/// Side effects the driver performs after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestDeviceCode,
    StartTimers,
    Poll { device_code: String },
    StopTimers,
    PersistToken(SessionToken),
}

impl DeviceAuthState {
    /// A device code is live and timers are running.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            DeviceAuthState::AwaitingUserAction(_) | DeviceAuthState::Verifying(_)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeviceAuthState::Authenticated(_)
                | DeviceAuthState::Failed(_)
                | DeviceAuthState::Expired
        )
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        match self {
            DeviceAuthState::AwaitingUserAction(p) | DeviceAuthState::Verifying(p) => Some(p),
            _ => None,
        }
    }
}

/// Advance the machine by one event. No I/O happens here.
pub fn transition(state: DeviceAuthState, event: DeviceAuthEvent) -> (DeviceAuthState, Vec<Command>) {
    use DeviceAuthEvent as E;
    use DeviceAuthState as S;

    match (state, event) {
        (S::Idle | S::Failed(_) | S::Expired | S::Authenticated(_), E::Initiate) => {
            (S::CodeRequested, vec![Command::RequestDeviceCode])
        }
        (S::CodeRequested, E::CodeIssued(session)) => begin_waiting(session),
        (S::CodeRequested, E::CodeFailed(err)) => (S::Failed(err.to_string()), vec![]),
        (S::CodeRequested, E::Cancel) => (S::Idle, vec![]),
        (S::AwaitingUserAction(pending), E::Tick) => on_tick(pending, false),
        (S::Verifying(pending), E::Tick) => on_tick(pending, true),
        (S::Verifying(pending), E::PollResolved(result)) => on_poll(pending, result),
        (S::AwaitingUserAction(_) | S::Verifying(_), E::Cancel) => {
            (S::Idle, vec![Command::StopTimers])
        }
        // Late poll results, ticks after expiry and the like.
        (state, _) => (state, vec![]),
    }
}

fn begin_waiting(session: DeviceAuthSession) -> (DeviceAuthState, Vec<Command>) {
    if session.expires_in == 0 {
        return (DeviceAuthState::Expired, vec![]);
    }

    let poll = Command::Poll {
        device_code: session.device_code.clone(),
    };
    let pending = PendingSession {
        remaining_secs: session.expires_in,
        interval_secs: session.interval.max(1),
        since_last_poll: 0,
        session,
    };

    (
        DeviceAuthState::Verifying(pending),
        vec![Command::StartTimers, poll],
    )
}

fn on_tick(mut pending: PendingSession, verifying: bool) -> (DeviceAuthState, Vec<Command>) {
    pending.remaining_secs = pending.remaining_secs.saturating_sub(1);
    pending.since_last_poll += 1;

    if pending.remaining_secs == 0 {
        return (DeviceAuthState::Expired, vec![Command::StopTimers]);
    }

    // One poll in flight at most; a due poll waits for the current one.
    if verifying {
        return (DeviceAuthState::Verifying(pending), vec![]);
    }

    if pending.since_last_poll >= pending.interval_secs {
        pending.since_last_poll = 0;
        let poll = Command::Poll {
            device_code: pending.session.device_code.clone(),
        };
        return (DeviceAuthState::Verifying(pending), vec![poll]);
    }

    (DeviceAuthState::AwaitingUserAction(pending), vec![])
}

fn on_poll(
    mut pending: PendingSession,
    result: Result<TokenGrant>,
) -> (DeviceAuthState, Vec<Command>) {
    match result {
        Ok(grant) => {
            let persist = Command::PersistToken(grant.access_token.clone());
            (
                DeviceAuthState::Authenticated(grant),
                vec![Command::StopTimers, persist],
            )
        }
        Err(CoreError::AuthPending) => (DeviceAuthState::AwaitingUserAction(pending), vec![]),
        Err(CoreError::AuthSlowDown { interval }) => {
            let current = pending.interval_secs;
            pending.interval_secs = interval
                .unwrap_or(current + SLOW_DOWN_STEP_SECS)
                .max(current);
            (DeviceAuthState::AwaitingUserAction(pending), vec![])
        }
        Err(CoreError::AuthExpired) => (DeviceAuthState::Expired, vec![Command::StopTimers]),
        Err(err) => (
            DeviceAuthState::Failed(err.to_string()),
            vec![Command::StopTimers],
        ),
    }
}
