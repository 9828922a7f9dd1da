// Store key layout shared by every process

/// General waiting pool (list)
pub const MATCHMAKING_QUEUE: &str = "matchmaking_queue";
/// Start-confirmation pool (list)
pub const MATCH_START_QUEUE: &str = "match_start_queue";
/// Membership set mirroring the general waiting pool
pub const QUEUED_PLAYERS: &str = "queued_players";

/// Pairing trigger channel
pub const MATCHMAKING_CHANNEL: &str = "matchmaking_channel";
/// Event fan-out channel consumed by the notification relay
pub const NOTIFICATIONS_CHANNEL: &str = "notifications";

const ROOM_PREFIX: &str = "room:";

/// Member set of a room
pub fn room(room_id: &str) -> String {
    format!("{}{}", ROOM_PREFIX, room_id)
}

/// Prefix of every key scoped to a room (excluding the member set itself)
pub fn room_scope(room_id: &str) -> String {
    format!("{}{}:", ROOM_PREFIX, room_id)
}

pub fn board(room_id: &str, player: &str) -> String {
    format!("{}board:{}", room_scope(room_id), player)
}

pub fn game(room_id: &str) -> String {
    format!("{}game", room_scope(room_id))
}

pub fn attacks(room_id: &str, player: &str) -> String {
    format!("{}attacks:{}", room_scope(room_id), player)
}

/// Extracts the room id from a member-set key (`room:{id}`), ignoring scoped keys
pub fn room_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(ROOM_PREFIX)
        .filter(|rest| !rest.is_empty() && !rest.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_scoped_keys_share_prefix() {
        let scope = room_scope("abc");
        assert!(board("abc", "p1").starts_with(&scope));
        assert!(game("abc").starts_with(&scope));
        assert!(attacks("abc", "p1").starts_with(&scope));
        assert!(!room("abc").starts_with(&scope));
    }

    #[test]
    fn test_room_id_from_key() {
        assert_eq!(room_id_from_key("room:abc"), Some("abc"));
        assert_eq!(room_id_from_key("room:abc:game"), None);
        assert_eq!(room_id_from_key("room:"), None);
        assert_eq!(room_id_from_key("queued_players"), None);
    }
}
