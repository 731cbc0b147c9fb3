use std::fmt;

use async_channel::{Receiver, Sender};
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::{FutureExt, select};
use locbridge_location::{LocationPlatform, LocationSession, PermissionState};
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::{BridgeConfig, BridgeError, BridgeMessage, Command, CommandResult, Payload, Response};

const PERMISSION_NOT_GRANTED: &str = "Location permission not granted";

/// Routes bridge commands to a [`LocationSession`].
///
/// Denied permission is an ordinary `false` for `requestPermission` and
/// `startGps`, and a `PERMISSION_DENIED` error only for `getLocation`,
/// where `null` already means "no fix cached".
pub struct Dispatcher<P: LocationPlatform> {
    session: LocationSession<P>,
    channel: String,
}

impl<P: LocationPlatform> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channel", &self.channel)
            .field("session", &self.session)
            .finish()
    }
}

/// One turn of the serve loop.
enum Step {
    Inbound(Option<BridgeMessage>),
    Completed(Response),
}

impl<P: LocationPlatform> Dispatcher<P> {
    /// Create a dispatcher with the default configuration.
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, &BridgeConfig::default())
    }

    /// Create a dispatcher.
    pub fn with_config(platform: P, config: &BridgeConfig) -> Self {
        Self {
            session: LocationSession::with_config(
                platform,
                config.update_config(),
                config.location_timeout(),
            ),
            channel: config.channel.clone(),
        }
    }

    /// The session this dispatcher drives.
    pub const fn session(&self) -> &LocationSession<P> {
        &self.session
    }

    /// Channel name this bridge serves.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Run the command called `method`.
    ///
    /// `args` is accepted for wire compatibility; no command uses it.
    ///
    /// # Errors
    /// Unknown names yield [`BridgeError::NotImplemented`]; see
    /// [`execute`](Self::execute) for the rest.
    pub async fn dispatch(&self, method: &str, args: Option<&Value>) -> CommandResult {
        if args.is_some() {
            debug!("ignoring arguments to {method}");
        }
        let command = method.parse::<Command>().inspect_err(|_| {
            warn!("unknown bridge method {method:?}");
        })?;
        self.execute(command).await
    }

    /// Run a command.
    ///
    /// # Errors
    /// `getLocation` without permission fails with
    /// [`BridgeError::PermissionDenied`]. Platform failures while starting,
    /// stopping or looking up are mapped through `From<LocationError>`.
    pub async fn execute(&self, command: Command) -> CommandResult {
        debug!("dispatching {command}");
        match command {
            Command::IsGpsEnabled => Ok(Payload::Bool(self.session.provider_enabled().await)),
            Command::HasPermission => Ok(Payload::Bool(self.granted().await)),
            Command::RequestPermission => {
                if self.granted().await {
                    return Ok(Payload::Bool(true));
                }
                self.prompt().await;
                Ok(Payload::Bool(false))
            }
            Command::StartGps => {
                if !self.granted().await {
                    self.prompt().await;
                    return Ok(Payload::Bool(false));
                }
                self.session.start().await?;
                Ok(Payload::Bool(true))
            }
            Command::StopGps => {
                self.session.stop().await?;
                Ok(Payload::Bool(true))
            }
            Command::GetLocation => {
                if !self.granted().await {
                    return Err(BridgeError::PermissionDenied(
                        PERMISSION_NOT_GRANTED.to_owned(),
                    ));
                }
                Ok(Payload::Position(self.session.last_position().await?))
            }
        }
    }

    async fn granted(&self) -> bool {
        self.session.permission().await.is_granted()
    }

    /// Fire-and-forget prompt; the caller always answers `false`.
    async fn prompt(&self) {
        if let Err(err) = self.session.request_permission().await {
            error!("failed to show permission prompt: {err}");
        }
    }

    /// Handle the user's answer to a permission prompt.
    ///
    /// A grant starts continuous updates right away, the same as a
    /// successful `startGps`.
    pub async fn permission_result(&self, state: PermissionState) {
        self.session.permission_resolved();
        info!("permission prompt answered: {state:?}");

        if state.is_granted() {
            if let Err(err) = self.session.start().await {
                error!("failed to start updates after permission grant: {err}");
            }
        }
    }

    /// Tear down: release the subscription if one is active.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }

    /// Serve messages from `inbound` until it closes, answering on
    /// `outbound`.
    ///
    /// Commands run one at a time in arrival order, except `getLocation`,
    /// which is parked while the platform looks the fix up so later
    /// commands keep flowing. Its response is sent whenever it completes,
    /// tagged with the original request id. Once `inbound` closes, pending
    /// lookups are drained and the session is torn down.
    pub async fn serve(&self, inbound: Receiver<BridgeMessage>, outbound: Sender<Response>) {
        info!("serving location bridge on {}", self.channel);
        let mut lookups: FuturesUnordered<LocalBoxFuture<'_, Response>> =
            FuturesUnordered::new();

        loop {
            let step = select! {
                message = inbound.recv().fuse() => Step::Inbound(message.ok()),
                response = lookups.select_next_some() => Step::Completed(response),
            };

            match step {
                Step::Inbound(Some(BridgeMessage::Request(request))) => {
                    match request.method.parse::<Command>() {
                        Ok(Command::GetLocation) => {
                            let lookup = self.respond(request.id, Command::GetLocation);
                            lookups.push(lookup.boxed_local());
                        }
                        Ok(command) => {
                            let response = self.respond(request.id, command).await;
                            send(&outbound, response).await;
                        }
                        Err(err) => {
                            warn!("unknown bridge method {:?}", request.method);
                            send(&outbound, Response::new(request.id, Err(err))).await;
                        }
                    }
                }
                Step::Inbound(Some(BridgeMessage::PermissionResult(state))) => {
                    self.permission_result(state).await;
                }
                Step::Inbound(None) => break,
                Step::Completed(response) => send(&outbound, response).await,
            }
        }

        while let Some(response) = lookups.next().await {
            send(&outbound, response).await;
        }
        self.shutdown().await;
        info!("location bridge on {} stopped", self.channel);
    }

    async fn respond(&self, id: u64, command: Command) -> Response {
        Response::new(id, self.execute(command).await)
    }
}

async fn send(outbound: &Sender<Response>, response: Response) {
    let id = response.id;
    if outbound.send(response).await.is_err() {
        warn!("response channel closed, dropping response {id}");
    }
}
