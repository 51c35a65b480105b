//! Command Cooldowns
//!
//! Tracks "last used" timestamps per command, keyed by any combination of user,
//! guild, channel and global scope.
//!
//! ```text
//!   set_cooldown("play", [user, guild], 5s)
//!        │
//!        ├─▶ "play:user:u1"   expires now+5s
//!        └─▶ "play:guild:g1"  expires now+5s
//!
//!   is_on_cooldown("play", [user, guild])  ─▶ active if ANY key is live,
//!                                             longest time left reported
//! ```

mod scope;
mod tracker;

pub use scope::{cooldown_key, CooldownContext, Scope, DM_SCOPE_ID, GLOBAL_SCOPE_ID};
pub use tracker::{
    CooldownConfig, CooldownStats, CooldownStatus, CooldownTracker, CooldownTrackerConfig,
};

use std::time::Duration;

/// Default background sweep interval (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Approximate bytes per cooldown entry (key, command name, two instants)
pub const ENTRY_SIZE_ESTIMATE: u64 = 200;
