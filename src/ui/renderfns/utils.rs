use pcdb::cache::CacheEntry;
use pcdb::error::TransportError;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Border color for a card or panel showing `entry`
pub fn entry_color(entry: Option<&CacheEntry>) -> Color {
  match entry {
    Some(e) if e.error().is_some() => Color::Red,
    Some(e) if e.is_fetching() => Color::DarkGray,
    _ => Color::White,
  }
}

/// Text color for a failed request: unreachable server vs. unexpected body
pub fn error_color(err: &TransportError) -> Color {
  if err.is_decode() {
    Color::Magenta
  } else {
    Color::Red
  }
}
