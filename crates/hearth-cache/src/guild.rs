//! Per-guild state scope.

use std::collections::HashMap;

use tracing::debug;

use crate::events::{GuildCreate, GuildMemberUpdate, ThreadListSync};
use crate::model::{
    Channel, Emoji, GuildInfo, Integration, Member, Role, Sticker, User, VoiceState,
};

/// Everything cached for one guild.
///
/// Channels and threads share one map keyed by channel id. Members are keyed
/// by user id; members whose account is gone (`user: null`) cannot be
/// addressed by any later event, so they are kept in a separate list and
/// only dropped with the whole guild.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildState {
    id: String,
    info: Option<GuildInfo>,
    unavailable: bool,
    roles: Vec<Role>,
    emojis: Vec<Emoji>,
    stickers: Vec<Sticker>,
    channels: HashMap<String, Channel>,
    members: HashMap<String, Member>,
    detached_members: Vec<Member>,
    voice_states: HashMap<String, VoiceState>,
    integrations: HashMap<String, Integration>,
}

impl GuildState {
    /// An empty scope for a guild known only by id.
    pub(crate) fn placeholder(id: impl Into<String>, unavailable: bool) -> Self {
        Self {
            id: id.into(),
            info: None,
            unavailable,
            roles: Vec::new(),
            emojis: Vec::new(),
            stickers: Vec::new(),
            channels: HashMap::new(),
            members: HashMap::new(),
            detached_members: Vec::new(),
            voice_states: HashMap::new(),
            integrations: HashMap::new(),
        }
    }

    /// Build a scope from a guild-create snapshot.
    pub(crate) fn from_create(event: &GuildCreate) -> Self {
        let mut info = event.guild.clone();
        let mut state = Self::placeholder(info.id.clone(), event.unavailable.unwrap_or(false));
        state.roles = info.roles.take().unwrap_or_default();
        state.emojis = info.emojis.take().unwrap_or_default();
        state.stickers = info.stickers.take().unwrap_or_default();
        state.info = Some(info);

        for channel in event.channels.iter().chain(&event.threads) {
            let mut channel = channel.clone();
            // Snapshot entries omit the guild id.
            channel.guild_id.get_or_insert_with(|| state.id.clone());
            state.channels.insert(channel.id.clone(), channel);
        }
        for member in &event.members {
            state.add_member(member.clone());
        }
        for voice in &event.voice_states {
            let mut voice = voice.clone();
            voice.guild_id.get_or_insert_with(|| state.id.clone());
            if voice.member.is_none() {
                voice.member = state.members.get(&voice.user_id).cloned();
            }
            state.voice_states.insert(voice.user_id.clone(), voice);
        }
        state
    }

    /// Guild id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Metadata snapshot; `None` until the guild has been loaded once.
    #[must_use]
    pub fn info(&self) -> Option<&GuildInfo> {
        self.info.as_ref()
    }

    /// Whether the guild is currently unavailable due to an outage.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Roles in the order they were received.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Look up a role by id.
    #[must_use]
    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    /// Custom emoji.
    #[must_use]
    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    /// Custom stickers.
    #[must_use]
    pub fn stickers(&self) -> &[Sticker] {
        &self.stickers
    }

    /// Look up a channel or thread by id.
    #[must_use]
    pub fn channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    /// All channels and threads.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Threads only.
    pub fn threads(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values().filter(|c| c.is_thread())
    }

    /// Look up a member by user id.
    #[must_use]
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.get(user_id)
    }

    /// Every cached member, including those without a user reference.
    #[must_use]
    pub fn members(&self) -> Vec<&Member> {
        self.members
            .values()
            .chain(self.detached_members.iter())
            .collect()
    }

    /// Number of cached members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len().saturating_add(self.detached_members.len())
    }

    /// Voice state of a user.
    #[must_use]
    pub fn voice_state(&self, user_id: &str) -> Option<&VoiceState> {
        self.voice_states.get(user_id)
    }

    /// All voice states.
    pub fn voice_states(&self) -> impl Iterator<Item = &VoiceState> {
        self.voice_states.values()
    }

    /// Look up an integration by id.
    #[must_use]
    pub fn integration(&self, integration_id: &str) -> Option<&Integration> {
        self.integrations.get(integration_id)
    }

    // ── Mutations ───────────────────────────────────────────

    pub(crate) fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Replace the metadata wholesale. Role, emoji and sticker lists are
    /// replaced too when the payload carries them.
    pub(crate) fn replace_info(&mut self, info: &GuildInfo) {
        let mut info = info.clone();
        if let Some(roles) = info.roles.take() {
            self.roles = roles;
        }
        if let Some(emojis) = info.emojis.take() {
            self.emojis = emojis;
        }
        if let Some(stickers) = info.stickers.take() {
            self.stickers = stickers;
        }
        self.info = Some(info);
    }

    pub(crate) fn upsert_channel(&mut self, channel: &Channel) {
        self.channels.insert(channel.id.clone(), channel.clone());
    }

    pub(crate) fn remove_channel(&mut self, channel_id: &str) -> Option<Channel> {
        self.channels.remove(channel_id)
    }

    pub(crate) fn channel_mut(&mut self, channel_id: &str) -> Option<&mut Channel> {
        self.channels.get_mut(channel_id)
    }

    /// Replace the active thread set for the synced parents.
    ///
    /// Cached threads under a synced parent (or under any parent when the
    /// event names none) that are absent from the payload are dropped. The
    /// current user's thread memberships are attached to their threads.
    pub(crate) fn sync_threads(&mut self, event: &ThreadListSync) {
        let keep: Vec<&str> = event.threads.iter().map(|t| t.id.as_str()).collect();
        self.channels.retain(|id, channel| {
            if !channel.is_thread() || keep.contains(&id.as_str()) {
                return true;
            }
            match (&event.channel_ids, &channel.parent_id) {
                (None, _) => false,
                (Some(parents), Some(parent)) => !parents.contains(parent),
                (Some(_), None) => true,
            }
        });

        for thread in &event.threads {
            let mut thread = thread.clone();
            thread.guild_id.get_or_insert_with(|| self.id.clone());
            if let Some(member) = event
                .members
                .iter()
                .find(|m| m.id.as_deref() == Some(thread.id.as_str()))
            {
                thread.member = Some(member.clone());
            }
            self.channels.insert(thread.id.clone(), thread);
        }
    }

    pub(crate) fn add_member(&mut self, member: Member) {
        match member.user_id() {
            Some(user_id) => {
                let user_id = user_id.to_owned();
                self.members.insert(user_id, member);
            },
            None => self.detached_members.push(member),
        }
    }

    /// Merge a partial update into an existing member.
    ///
    /// Returns `false` if the member is not cached.
    pub(crate) fn update_member(&mut self, update: &GuildMemberUpdate) -> bool {
        let Some(member) = self.members.get_mut(&update.user.id) else {
            return false;
        };

        member.user = Some(update.user.clone());
        member.roles.clone_from(&update.roles);
        if let Some(nick) = &update.nick {
            member.nick.clone_from(nick);
        }
        if let Some(avatar) = &update.avatar {
            member.avatar.clone_from(avatar);
        }
        if let Some(joined_at) = update.joined_at {
            member.joined_at = Some(joined_at);
        }
        if let Some(premium_since) = update.premium_since {
            member.premium_since = premium_since;
        }
        if let Some(deaf) = update.deaf {
            member.deaf = deaf;
        }
        if let Some(mute) = update.mute {
            member.mute = mute;
        }
        if update.pending.is_some() {
            member.pending = update.pending;
        }
        if let Some(until) = update.communication_disabled_until {
            member.communication_disabled_until = until;
        }

        if let Some(voice) = self.voice_states.get_mut(&update.user.id) {
            voice.member = Some(member.clone());
        }
        true
    }

    pub(crate) fn remove_member(&mut self, user_id: &str) -> Option<Member> {
        self.members.remove(user_id)
    }

    /// Insert or replace a role, keeping its position in the list.
    pub(crate) fn upsert_role(&mut self, role: &Role) {
        if let Some(existing) = self.roles.iter_mut().find(|r| r.id == role.id) {
            *existing = role.clone();
        } else {
            self.roles.push(role.clone());
        }
    }

    pub(crate) fn remove_role(&mut self, role_id: &str) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| r.id != role_id);
        self.roles.len() != before
    }

    pub(crate) fn replace_emojis(&mut self, emojis: &[Emoji]) {
        self.emojis = emojis.to_vec();
    }

    pub(crate) fn replace_stickers(&mut self, stickers: &[Sticker]) {
        self.stickers = stickers.to_vec();
    }

    pub(crate) fn upsert_integration(&mut self, integration: &Integration) {
        self.integrations
            .insert(integration.id.clone(), integration.clone());
    }

    pub(crate) fn remove_integration(&mut self, integration_id: &str) -> bool {
        self.integrations.remove(integration_id).is_some()
    }

    /// Apply a voice state change. A `None` channel removes the entry.
    pub(crate) fn apply_voice_state(&mut self, voice: &VoiceState) {
        if voice.channel_id.is_none() {
            self.voice_states.remove(&voice.user_id);
            return;
        }
        let mut voice = voice.clone();
        if voice.member.is_none() {
            voice.member = self.members.get(&voice.user_id).cloned();
        }
        self.voice_states.insert(voice.user_id.clone(), voice);
    }

    /// Refresh the embedded user snapshot of a member.
    ///
    /// Returns `true` if the user is a member of this guild.
    pub(crate) fn update_user(&mut self, user: &User) -> bool {
        let Some(member) = self.members.get_mut(&user.id) else {
            return false;
        };
        member.user = Some(user.clone());
        if let Some(voice) = self.voice_states.get_mut(&user.id)
            && let Some(snapshot) = voice.member.as_mut()
        {
            snapshot.user = Some(user.clone());
        }
        debug!(guild_id = %self.id, user_id = %user.id, "Refreshed member user snapshot");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(value: serde_json::Value) -> GuildState {
        let event: GuildCreate = serde_json::from_value(value).unwrap();
        GuildState::from_create(&event)
    }

    fn role(id: &str, name: &str) -> Role {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    #[test]
    fn from_create_seeds_all_mappings() {
        let guild = create(json!({
            "id": "g1",
            "name": "Hearth",
            "roles": [{"id": "r1", "name": "@everyone"}],
            "emojis": [{"id": "e1", "name": "wave"}],
            "members": [
                {"user": {"id": "u1"}, "roles": ["r1"]},
                {"user": null, "roles": []},
            ],
            "channels": [{"id": "c1", "type": 0, "name": "general"}],
            "threads": [{"id": "t1", "type": 11, "parent_id": "c1"}],
            "voice_states": [{"user_id": "u1", "channel_id": "c1"}],
        }));

        assert_eq!(guild.id(), "g1");
        assert!(!guild.is_unavailable());
        assert_eq!(guild.info().unwrap().name, "Hearth");
        assert!(guild.info().unwrap().roles.is_none());
        assert_eq!(guild.roles().len(), 1);
        assert_eq!(guild.emojis().len(), 1);
        assert_eq!(guild.member_count(), 2);
        assert_eq!(guild.channel("c1").unwrap().guild_id.as_deref(), Some("g1"));
        assert_eq!(guild.threads().count(), 1);

        let voice = guild.voice_state("u1").unwrap();
        assert_eq!(voice.guild_id.as_deref(), Some("g1"));
        assert_eq!(voice.member.as_ref().unwrap().user_id(), Some("u1"));
    }

    #[test]
    fn upsert_role_replaces_in_place() {
        let mut guild = GuildState::placeholder("g1", false);
        guild.upsert_role(&role("r1", "a"));
        guild.upsert_role(&role("r2", "b"));
        guild.upsert_role(&role("r1", "renamed"));

        let names: Vec<_> = guild.roles().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["renamed", "b"]);
    }

    #[test]
    fn remove_role_only_removes_target() {
        let mut guild = GuildState::placeholder("g1", false);
        for id in ["r1", "r2", "r3"] {
            guild.upsert_role(&role(id, id));
        }
        assert!(guild.remove_role("r2"));
        assert!(!guild.remove_role("r2"));

        let ids: Vec<_> = guild.roles().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }

    #[test]
    fn leaving_voice_removes_state() {
        let mut guild = create(json!({
            "id": "g1",
            "voice_states": [{"user_id": "u1", "channel_id": "c1"}],
        }));
        let left: VoiceState = serde_json::from_value(json!({
            "guild_id": "g1", "channel_id": null, "user_id": "u1",
        }))
        .unwrap();
        guild.apply_voice_state(&left);
        assert!(guild.voice_state("u1").is_none());
    }

    #[test]
    fn sync_without_channel_ids_replaces_every_thread() {
        let mut guild = create(json!({
            "id": "g1",
            "channels": [{"id": "c1", "type": 0}],
            "threads": [
                {"id": "t1", "type": 11, "parent_id": "c1"},
                {"id": "t2", "type": 11, "parent_id": "c9"},
            ],
        }));
        let sync: ThreadListSync = serde_json::from_value(json!({
            "guild_id": "g1",
            "threads": [{"id": "t3", "type": 11, "parent_id": "c1"}],
            "members": [{"id": "t3", "user_id": "me", "flags": 1}],
        }))
        .unwrap();
        guild.sync_threads(&sync);

        assert!(guild.channel("c1").is_some());
        assert!(guild.channel("t1").is_none());
        assert!(guild.channel("t2").is_none());
        let t3 = guild.channel("t3").unwrap();
        assert_eq!(t3.member.as_ref().unwrap().flags, 1);
    }
}
