//! Cooldown Scopes and Key Composition
//!
//! A cooldown key is `command:scope:scope_id`. The format is stable; other
//! processes and tests rebuild keys with [`cooldown_key`] and expect the exact
//! same string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scope id used for guild/channel scopes outside a guild (direct messages).
///
/// Every DM user shares this one bucket.
pub const DM_SCOPE_ID: &str = "dm";

/// Scope id used for the global scope
pub const GLOBAL_SCOPE_ID: &str = "global";

/// Identity axis a cooldown is partitioned by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per invoking user
    User,
    /// Per guild (DM context shares one bucket)
    Guild,
    /// Per channel (DM context shares one bucket)
    Channel,
    /// One bucket for everyone
    Global,
}

impl Scope {
    /// All scopes, in key-check order
    pub const ALL: [Scope; 4] = [Scope::User, Scope::Guild, Scope::Channel, Scope::Global];

    /// Name used in the composite key
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Guild => "guild",
            Scope::Channel => "channel",
            Scope::Global => "global",
        }
    }

    /// Resolve the scope id for an invocation context
    pub fn scope_id<'a>(&self, ctx: &CooldownContext<'a>) -> &'a str {
        match self {
            Scope::User => ctx.user_id,
            Scope::Guild => ctx.guild_id.unwrap_or(DM_SCOPE_ID),
            Scope::Channel => ctx.channel_id.unwrap_or(DM_SCOPE_ID),
            Scope::Global => GLOBAL_SCOPE_ID,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Scope::User),
            "guild" => Ok(Scope::Guild),
            "channel" => Ok(Scope::Channel),
            "global" => Ok(Scope::Global),
            other => Err(format!("unknown cooldown scope: {}", other)),
        }
    }
}

/// Who invoked a command, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownContext<'a> {
    /// Invoking user
    pub user_id: &'a str,
    /// Guild, absent in direct messages
    pub guild_id: Option<&'a str>,
    /// Channel, absent when unknown
    pub channel_id: Option<&'a str>,
}

impl<'a> CooldownContext<'a> {
    /// Context for a user with no guild or channel (direct message)
    pub fn user(user_id: &'a str) -> Self {
        Self {
            user_id,
            guild_id: None,
            channel_id: None,
        }
    }

    /// Set the guild
    pub fn in_guild(mut self, guild_id: &'a str) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Set the channel
    pub fn in_channel(mut self, channel_id: &'a str) -> Self {
        self.channel_id = Some(channel_id);
        self
    }
}

/// Build the composite key `command:scope:scope_id`
pub fn cooldown_key(command: &str, scope: Scope, ctx: &CooldownContext<'_>) -> String {
    format!("{}:{}:{}", command, scope.as_str(), scope.scope_id(ctx))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let ctx = CooldownContext::user("u1").in_guild("g1").in_channel("c1");
        assert_eq!(cooldown_key("play", Scope::User, &ctx), "play:user:u1");
        assert_eq!(cooldown_key("play", Scope::Guild, &ctx), "play:guild:g1");
        assert_eq!(cooldown_key("play", Scope::Channel, &ctx), "play:channel:c1");
        assert_eq!(cooldown_key("play", Scope::Global, &ctx), "play:global:global");
    }

    #[test]
    fn test_dm_sentinel() {
        let alice = CooldownContext::user("alice");
        let bob = CooldownContext::user("bob");

        assert_eq!(cooldown_key("skip", Scope::Guild, &alice), "skip:guild:dm");
        assert_eq!(cooldown_key("skip", Scope::Channel, &alice), "skip:channel:dm");
        // DM users share the guild bucket
        assert_eq!(
            cooldown_key("skip", Scope::Guild, &alice),
            cooldown_key("skip", Scope::Guild, &bob)
        );
        assert_ne!(
            cooldown_key("skip", Scope::User, &alice),
            cooldown_key("skip", Scope::User, &bob)
        );
    }

    #[test]
    fn test_scope_parse_and_display() {
        for scope in Scope::ALL {
            assert_eq!(scope.to_string().parse::<Scope>().unwrap(), scope);
        }
        assert_eq!("GUILD".parse::<Scope>().unwrap(), Scope::Guild);
        assert!("server".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_serde() {
        let scope: Scope = serde_json::from_str("\"channel\"").unwrap();
        assert_eq!(scope, Scope::Channel);
        assert_eq!(serde_json::to_string(&Scope::Global).unwrap(), "\"global\"");
    }
}
