use std::collections::VecDeque;
use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, error, info};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::machine::{transition, Command, DeviceAuthEvent, DeviceAuthState};
use crate::error::Result;
use crate::github::{DeviceFlowGateway, TokenGrant};
use crate::session::{SessionTokenHolder, TokenStore};

const TICK: Duration = Duration::from_secs(1);

/// Runs the device-flow machine against a gateway with real timers.
///
/// The countdown ticker and any in-flight poll live only inside [`run`];
/// whichever way the session ends they are dropped with it.
///
/// [`run`]: DeviceAuthDriver::run
pub struct DeviceAuthDriver<'g> {
    gateway: &'g dyn DeviceFlowGateway,
    state: DeviceAuthState,
}

impl<'g> DeviceAuthDriver<'g> {
    pub fn new(gateway: &'g dyn DeviceFlowGateway) -> Self {
        Self {
            gateway,
            state: DeviceAuthState::Idle,
        }
    }

    pub fn state(&self) -> &DeviceAuthState {
        &self.state
    }

    /// Start a fresh session and drive it to a resting state.
    ///
    /// `observe` sees every state the machine passes through. Cancelling
    /// `cancel` returns the machine to `Idle`.
    pub async fn run<S, F>(
        &mut self,
        holder: &mut SessionTokenHolder<S>,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> DeviceAuthState
    where
        S: TokenStore,
        F: FnMut(&DeviceAuthState),
    {
        let gateway = self.gateway;
        let mut commands = VecDeque::new();
        let mut ticker: Option<Interval> = None;
        let mut in_flight: Option<BoxFuture<'g, Result<TokenGrant>>> = None;

        self.apply(DeviceAuthEvent::Initiate, &mut commands, &mut observe);

        loop {
            while let Some(command) = commands.pop_front() {
                match command {
                    Command::RequestDeviceCode => {
                        let event = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => DeviceAuthEvent::Cancel,
                            result = gateway.request_device_code() => match result {
                                Ok(session) => DeviceAuthEvent::CodeIssued(session),
                                Err(e) => DeviceAuthEvent::CodeFailed(e),
                            },
                        };
                        self.apply(event, &mut commands, &mut observe);
                    }
                    Command::StartTimers => {
                        let mut interval = interval_at(Instant::now() + TICK, TICK);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        ticker = Some(interval);
                    }
                    Command::Poll { device_code } => {
                        debug!("Polling for device authorization");
                        in_flight = Some(Box::pin(async move {
                            gateway.poll_for_token(&device_code).await
                        }));
                    }
                    Command::StopTimers => {
                        ticker = None;
                        in_flight = None;
                    }
                    Command::PersistToken(token) => {
                        if let Err(e) = holder.save(token) {
                            error!("Failed to persist session token: {}", e);
                            self.state = DeviceAuthState::Failed(e.to_string());
                            observe(&self.state);
                        }
                    }
                }
            }

            if !self.state.is_waiting() {
                break;
            }
            let Some(tick) = ticker.as_mut() else {
                break;
            };

            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => DeviceAuthEvent::Cancel,
                result = resolve(&mut in_flight) => {
                    in_flight = None;
                    DeviceAuthEvent::PollResolved(result)
                }
                _ = tick.tick() => DeviceAuthEvent::Tick,
            };
            self.apply(event, &mut commands, &mut observe);
        }

        info!("Device authorization settled: {}", describe(&self.state));
        self.state.clone()
    }

    fn apply<F>(&mut self, event: DeviceAuthEvent, commands: &mut VecDeque<Command>, observe: &mut F)
    where
        F: FnMut(&DeviceAuthState),
    {
        let state = std::mem::replace(&mut self.state, DeviceAuthState::Idle);
        let (next, produced) = transition(state, event);
        self.state = next;
        commands.extend(produced);
        observe(&self.state);
    }
}

/// Await the in-flight poll, or never resolve when there is none.
async fn resolve(in_flight: &mut Option<BoxFuture<'_, Result<TokenGrant>>>) -> Result<TokenGrant> {
    match in_flight {
        Some(poll) => poll.await,
        None => std::future::pending().await,
    }
}

fn describe(state: &DeviceAuthState) -> &'static str {
    match state {
        DeviceAuthState::Idle => "idle",
        DeviceAuthState::CodeRequested => "code requested",
        DeviceAuthState::AwaitingUserAction(_) => "awaiting user",
        DeviceAuthState::Verifying(_) => "verifying",
        DeviceAuthState::Authenticated(_) => "authenticated",
        DeviceAuthState::Failed(_) => "failed",
        DeviceAuthState::Expired => "expired",
    }
}
