use crossterm::event::KeyEvent;
use pcdb::cache::QueryCache;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views read server data through the shared [`QueryCache`] and never hold
/// their own copies of records. Reads happen in `tick()` via the cache's
/// `observe_*` calls; writes go through its mutation runners, whose hooks
/// fire during a later `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, cache: &mut QueryCache) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, cache: &QueryCache);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self, cache: &QueryCache) -> String;

  /// Called on each tick, after the cache has applied finished requests
  fn tick(&mut self, _cache: &mut QueryCache) -> ViewAction {
    ViewAction::None
  }

  /// Called once when the view leaves the stack
  fn close(&mut self, _cache: &mut QueryCache) {}

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(90)]
  }
}
