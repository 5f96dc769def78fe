pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb
    ])
    .split(frame.area());

  draw_header(
    frame,
    chunks[0],
    app.title(),
    app.api_host(),
    &app.shortcuts(),
  );

  app.render_view(frame, chunks[1]);

  draw_footer(frame, chunks[2], &app.breadcrumb(), app.cache().in_flight());
}

/// Keep a selection index inside a list of `len` items
pub fn ensure_valid_selection(selected: &mut usize, len: usize) {
  if len == 0 {
    *selected = 0;
  } else if *selected >= len {
    *selected = len - 1;
  }
}
