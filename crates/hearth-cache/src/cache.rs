//! Top-level guild registry and the per-event cache mutations.
//!
//! Each `apply_*` method is the single mutation for one dispatch event. The
//! methods return `true` when the event reached its target, and `false` when
//! it was dropped because its guild scope or target entity was unknown. A
//! dropped mutation is logged as a warning and leaves the cache untouched.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::events::{
    ChannelCreate, ChannelDelete, ChannelUpdate, DispatchEvent, GuildCreate, GuildDelete,
    GuildEmojisUpdate, GuildMemberAdd, GuildMemberRemove, GuildMemberUpdate, GuildMembersChunk,
    GuildRoleCreate, GuildRoleDelete, GuildRoleUpdate, GuildStickersUpdate, GuildUpdate,
    IntegrationCreate, IntegrationDelete, IntegrationUpdate, Ready, ThreadCreate, ThreadDelete,
    ThreadListSync, ThreadMemberUpdate, ThreadMembersUpdate, ThreadUpdate, UserUpdate,
    VoiceStateUpdate,
};
use crate::guild::GuildState;
use crate::model::{Channel, Member, User};

/// The reconstructed view of every guild the session can see.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    guilds: HashMap<String, GuildState>,
    current_user: Option<User>,
}

impl StateCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a guild scope.
    #[must_use]
    pub fn guild(&self, guild_id: &str) -> Option<&GuildState> {
        self.guilds.get(guild_id)
    }

    /// All guild scopes.
    pub fn guilds(&self) -> impl Iterator<Item = &GuildState> {
        self.guilds.values()
    }

    /// Number of known guilds, available or not.
    #[must_use]
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    /// Every member cached for a guild. Empty if the guild is unknown.
    #[must_use]
    pub fn members(&self, guild_id: &str) -> Vec<&Member> {
        self.guilds
            .get(guild_id)
            .map(GuildState::members)
            .unwrap_or_default()
    }

    /// Look up a channel or thread in a guild.
    #[must_use]
    pub fn channel(&self, guild_id: &str, channel_id: &str) -> Option<&Channel> {
        self.guilds.get(guild_id)?.channel(channel_id)
    }

    /// The user this session is authenticated as.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    fn scope_mut(&mut self, guild_id: &str, event: &'static str) -> Option<&mut GuildState> {
        let scope = self.guilds.get_mut(guild_id);
        if scope.is_none() {
            warn!(guild_id, event, "Dropping event for unknown guild");
        }
        scope
    }

    fn channel_scope_mut(
        &mut self,
        channel: &Channel,
        event: &'static str,
    ) -> Option<&mut GuildState> {
        let Some(guild_id) = channel.guild_id.as_deref() else {
            debug!(channel_id = %channel.id, event, "Ignoring channel outside any guild");
            return None;
        };
        self.scope_mut(guild_id, event)
    }

    // ── Session ─────────────────────────────────────────────

    /// Reconcile guild scopes against the authoritative READY guild list.
    ///
    /// Listed guilds that are not cached get an unavailable placeholder;
    /// cached ones take the listed availability and keep their data until
    /// their next guild-create. Cached guilds missing from the list are gone.
    pub fn apply_ready(&mut self, event: &Ready) -> bool {
        self.current_user = Some(event.user.clone());

        self.guilds
            .retain(|id, _| event.guilds.iter().any(|g| &g.id == id));
        for listed in &event.guilds {
            self.guilds
                .entry(listed.id.clone())
                .and_modify(|g| g.set_unavailable(listed.unavailable))
                .or_insert_with(|| GuildState::placeholder(listed.id.clone(), listed.unavailable));
        }
        debug!(guilds = self.guilds.len(), "Reconciled guild list from READY");
        true
    }

    /// Refresh the current user and every member snapshot of that user.
    pub fn apply_user_update(&mut self, event: &UserUpdate) -> bool {
        let user = &event.0;
        if self
            .current_user
            .as_ref()
            .is_none_or(|current| current.id == user.id)
        {
            self.current_user = Some(user.clone());
        }
        let mut touched = 0usize;
        for guild in self.guilds.values_mut() {
            if guild.update_user(user) {
                touched = touched.saturating_add(1);
            }
        }
        debug!(user_id = %user.id, guilds = touched, "Applied user update");
        true
    }

    // ── Guilds ──────────────────────────────────────────────

    /// Create or fully replace a guild scope from its snapshot.
    pub fn apply_guild_create(&mut self, event: &GuildCreate) -> bool {
        let guild = GuildState::from_create(event);
        debug!(
            guild_id = %guild.id(),
            members = guild.member_count(),
            "Guild available"
        );
        self.guilds.insert(guild.id().to_owned(), guild);
        true
    }

    /// Replace guild metadata.
    pub fn apply_guild_update(&mut self, event: &GuildUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.0.id, GuildUpdate::NAME) else {
            return false;
        };
        guild.replace_info(&event.0);
        true
    }

    /// Remove a guild scope, or mark it unavailable during an outage.
    pub fn apply_guild_delete(&mut self, event: &GuildDelete) -> bool {
        let id = event.0.id.as_str();
        if event.0.unavailable {
            self.guilds
                .entry(id.to_owned())
                .or_insert_with(|| GuildState::placeholder(id, true))
                .set_unavailable(true);
            debug!(guild_id = id, "Guild unavailable");
            return true;
        }
        let removed = self.guilds.remove(id).is_some();
        if removed {
            debug!(guild_id = id, "Guild removed");
        } else {
            warn!(guild_id = id, "Guild delete for unknown guild");
        }
        removed
    }

    // ── Channels & threads ──────────────────────────────────

    /// Insert a newly created channel.
    pub fn apply_channel_create(&mut self, event: &ChannelCreate) -> bool {
        self.upsert_channel(&event.0, ChannelCreate::NAME)
    }

    /// Replace a channel.
    pub fn apply_channel_update(&mut self, event: &ChannelUpdate) -> bool {
        self.upsert_channel(&event.0, ChannelUpdate::NAME)
    }

    /// Remove a channel.
    pub fn apply_channel_delete(&mut self, event: &ChannelDelete) -> bool {
        self.remove_channel(&event.0, ChannelDelete::NAME)
    }

    /// Insert a newly visible thread.
    pub fn apply_thread_create(&mut self, event: &ThreadCreate) -> bool {
        self.upsert_channel(&event.0, ThreadCreate::NAME)
    }

    /// Replace a thread.
    pub fn apply_thread_update(&mut self, event: &ThreadUpdate) -> bool {
        self.upsert_channel(&event.0, ThreadUpdate::NAME)
    }

    /// Remove a thread.
    pub fn apply_thread_delete(&mut self, event: &ThreadDelete) -> bool {
        self.remove_channel(&event.0, ThreadDelete::NAME)
    }

    /// Replace the active threads of the synced channels.
    pub fn apply_thread_list_sync(&mut self, event: &ThreadListSync) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, ThreadListSync::NAME) else {
            return false;
        };
        guild.sync_threads(event);
        true
    }

    /// Attach the current user's updated membership to its thread.
    pub fn apply_thread_member_update(&mut self, event: &ThreadMemberUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, ThreadMemberUpdate::NAME) else {
            return false;
        };
        let Some(thread_id) = event.member.id.as_deref() else {
            return false;
        };
        let Some(thread) = guild.channel_mut(thread_id) else {
            warn!(thread_id, "Thread member update for unknown thread");
            return false;
        };
        thread.member = Some(event.member.clone());
        true
    }

    /// Refresh a thread's member count.
    pub fn apply_thread_members_update(&mut self, event: &ThreadMembersUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, ThreadMembersUpdate::NAME) else {
            return false;
        };
        let Some(thread) = guild.channel_mut(&event.id) else {
            warn!(thread_id = %event.id, "Thread members update for unknown thread");
            return false;
        };
        thread.member_count = Some(event.member_count);
        true
    }

    fn upsert_channel(&mut self, channel: &Channel, event: &'static str) -> bool {
        let Some(guild) = self.channel_scope_mut(channel, event) else {
            return false;
        };
        guild.upsert_channel(channel);
        true
    }

    fn remove_channel(&mut self, channel: &Channel, event: &'static str) -> bool {
        let Some(guild) = self.channel_scope_mut(channel, event) else {
            return false;
        };
        guild.remove_channel(&channel.id).is_some()
    }

    // ── Members ─────────────────────────────────────────────

    /// Insert a new member.
    pub fn apply_member_add(&mut self, event: &GuildMemberAdd) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildMemberAdd::NAME) else {
            return false;
        };
        guild.add_member(event.member.clone());
        true
    }

    /// Merge a partial update into the cached member.
    pub fn apply_member_update(&mut self, event: &GuildMemberUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildMemberUpdate::NAME) else {
            return false;
        };
        if guild.update_member(event) {
            return true;
        }
        warn!(
            guild_id = %event.guild_id,
            user_id = %event.user.id,
            "Member update for uncached member"
        );
        false
    }

    /// Remove a member.
    pub fn apply_member_remove(&mut self, event: &GuildMemberRemove) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildMemberRemove::NAME) else {
            return false;
        };
        guild.remove_member(&event.user.id).is_some()
    }

    /// Insert every member of a chunk.
    pub fn apply_members_chunk(&mut self, event: &GuildMembersChunk) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildMembersChunk::NAME) else {
            return false;
        };
        for member in &event.members {
            guild.add_member(member.clone());
        }
        debug!(
            guild_id = %event.guild_id,
            chunk = event.chunk_index,
            of = event.chunk_count,
            "Applied member chunk"
        );
        true
    }

    // ── Roles, emoji, stickers ──────────────────────────────

    /// Insert a new role.
    pub fn apply_role_create(&mut self, event: &GuildRoleCreate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildRoleCreate::NAME) else {
            return false;
        };
        guild.upsert_role(&event.role);
        true
    }

    /// Replace a role in place; appends it if it was never seen.
    pub fn apply_role_update(&mut self, event: &GuildRoleUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildRoleUpdate::NAME) else {
            return false;
        };
        guild.upsert_role(&event.role);
        true
    }

    /// Remove a role.
    pub fn apply_role_delete(&mut self, event: &GuildRoleDelete) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildRoleDelete::NAME) else {
            return false;
        };
        guild.remove_role(&event.role_id)
    }

    /// Replace the emoji list.
    pub fn apply_emojis_update(&mut self, event: &GuildEmojisUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildEmojisUpdate::NAME) else {
            return false;
        };
        guild.replace_emojis(&event.emojis);
        true
    }

    /// Replace the sticker list.
    pub fn apply_stickers_update(&mut self, event: &GuildStickersUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, GuildStickersUpdate::NAME) else {
            return false;
        };
        guild.replace_stickers(&event.stickers);
        true
    }

    // ── Integrations ────────────────────────────────────────

    /// Insert a new integration.
    pub fn apply_integration_create(&mut self, event: &IntegrationCreate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, IntegrationCreate::NAME) else {
            return false;
        };
        guild.upsert_integration(&event.integration);
        true
    }

    /// Replace an integration.
    pub fn apply_integration_update(&mut self, event: &IntegrationUpdate) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, IntegrationUpdate::NAME) else {
            return false;
        };
        guild.upsert_integration(&event.integration);
        true
    }

    /// Remove an integration.
    pub fn apply_integration_delete(&mut self, event: &IntegrationDelete) -> bool {
        let Some(guild) = self.scope_mut(&event.guild_id, IntegrationDelete::NAME) else {
            return false;
        };
        guild.remove_integration(&event.id)
    }

    // ── Voice ───────────────────────────────────────────────

    /// Record a user joining, moving, or leaving voice.
    pub fn apply_voice_state_update(&mut self, event: &VoiceStateUpdate) -> bool {
        let Some(guild_id) = event.0.guild_id.as_deref() else {
            debug!(user_id = %event.0.user_id, "Ignoring voice state outside any guild");
            return false;
        };
        let Some(guild) = self.scope_mut(guild_id, VoiceStateUpdate::NAME) else {
            return false;
        };
        guild.apply_voice_state(&event.0);
        true
    }
}
