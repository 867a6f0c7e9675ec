pub const MAX_PLAYER_NAME_LENGTH: usize = 24;

/// Collapses runs of whitespace, caps the length, and falls back when
/// nothing printable is left. Rename events pass through here before the
/// name reaches the snapshot.
pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}
