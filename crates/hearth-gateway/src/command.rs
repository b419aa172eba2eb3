//! Outbound gateway commands.

use tokio::sync::{mpsc, watch};

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    GatewayPayload, PresenceUpdate, RequestGuildMembers, VoiceStateCommand, opcode,
};
use crate::session::ConnectionState;

/// A command queued for the live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Update the client's presence (`op=3`).
    UpdatePresence(PresenceUpdate),
    /// Join, move or leave a voice channel (`op=5`).
    UpdateVoiceState(VoiceStateCommand),
    /// Request guild members (`op=8`).
    RequestGuildMembers(RequestGuildMembers),
}

impl GatewayCommand {
    /// Wrap the command in a gateway envelope.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`] if the payload cannot be serialized.
    pub fn into_payload(self) -> GatewayResult<GatewayPayload> {
        match self {
            Self::UpdatePresence(p) => GatewayPayload::command(opcode::PRESENCE_UPDATE, &p),
            Self::UpdateVoiceState(v) => GatewayPayload::command(opcode::VOICE_STATE_UPDATE, &v),
            Self::RequestGuildMembers(r) => {
                GatewayPayload::command(opcode::REQUEST_GUILD_MEMBERS, &r)
            },
        }
    }
}

/// Cloneable handle for queueing commands and watching the session state.
///
/// Commands are buffered and forwarded only while the session is
/// [`ConnectionState::Active`].
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<GatewayCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl GatewayHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<GatewayCommand>,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Queue a command without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CommandQueueFull`] if the queue is full and
    /// [`GatewayError::NotConnected`] if the session is gone.
    pub fn send(&self, command: GatewayCommand) -> GatewayResult<()> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GatewayError::CommandQueueFull,
            mpsc::error::TrySendError::Closed(_) => GatewayError::NotConnected,
        })
    }

    /// Queue a presence update.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn update_presence(&self, presence: PresenceUpdate) -> GatewayResult<()> {
        self.send(GatewayCommand::UpdatePresence(presence))
    }

    /// Queue a voice state update.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn update_voice_state(&self, voice: VoiceStateCommand) -> GatewayResult<()> {
        self.send(GatewayCommand::UpdateVoiceState(voice))
    }

    /// Queue a guild member request.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn request_guild_members(&self, request: RequestGuildMembers) -> GatewayResult<()> {
        self.send(GatewayCommand::RequestGuildMembers(request))
    }

    /// The session state right now.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}
