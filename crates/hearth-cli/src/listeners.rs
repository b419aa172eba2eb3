//! Listeners the `hearth` binary registers: lifecycle and guild activity
//! logged through `tracing`.

use hearth_cache::events::{GuildCreate, GuildDelete, GuildMemberRemove, MessageCreate, Ready};
use hearth_gateway::Client;
use hearth_gateway::protocol::RequestGuildMembers;
use tracing::{debug, info};

/// Register the logging listeners on `client`.
///
/// With `request_members`, every guild that becomes available gets a full
/// member request.
pub(crate) fn register(client: &mut Client, request_members: bool) {
    client.on::<Ready, _>(|_ctx, ready| {
        info!(
            user = %ready.user.username,
            session_id = %ready.session_id,
            guilds = ready.guilds.len(),
            "Logged in"
        );
        Ok(())
    });

    client.on::<GuildCreate, _>(move |ctx, event| {
        let members = ctx.guild().map_or(0, |guild| guild.member_count());
        info!(
            guild_id = %event.guild.id,
            name = %event.guild.name,
            members,
            "Guild available"
        );
        if request_members {
            ctx.request_guild_members(RequestGuildMembers::all(event.guild.id.clone()))?;
        }
        Ok(())
    });

    client.on::<GuildDelete, _>(|ctx, event| {
        info!(
            guild_id = %event.0.id,
            unavailable = event.0.unavailable,
            cached_guilds = ctx.cache().guild_count(),
            "Guild gone"
        );
        Ok(())
    });

    client.on::<GuildMemberRemove, _>(|ctx, event| {
        let remaining = ctx.guild().map_or(0, |guild| guild.member_count());
        info!(
            guild_id = %event.guild_id,
            user_id = %event.user.id,
            remaining,
            "Member left"
        );
        Ok(())
    });

    client.on::<MessageCreate, _>(|ctx, event| {
        let message = &event.0;
        let author = message.author.as_ref().map_or("unknown", |a| a.username.as_str());
        let channel = ctx
            .guild()
            .and_then(|guild| guild.channel(&message.channel_id))
            .and_then(|channel| channel.name.as_deref())
            .unwrap_or(message.channel_id.as_str());
        debug!(channel, author, len = message.content.len(), "Message");
        Ok(())
    });
}
