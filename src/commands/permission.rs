//! Permission levels and the gate that checks them.

/// Ordered authorization tier. Higher levels can run everything lower ones can.
pub type PermissionLevel = u32;

pub const EVERYONE: PermissionLevel = 0;
pub const CHANNEL_ADMIN: PermissionLevel = 1;
pub const OWNER: PermissionLevel = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny,
}

pub fn authorize(caller: PermissionLevel, required: PermissionLevel) -> Authorization {
    if caller < required {
        Authorization::Deny
    } else {
        Authorization::Allow
    }
}

/// Human name for a level, used in denial messages.
pub fn level_name(level: PermissionLevel) -> String {
    match level {
        EVERYONE => "everyone".to_string(),
        CHANNEL_ADMIN => "channel admin".to_string(),
        OWNER => "bot owner".to_string(),
        other => format!("level {}", other),
    }
}
