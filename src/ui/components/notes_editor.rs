use super::input::{InputResult, TextInput};
use super::key_result::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Events emitted by the notes editor that the parent view acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesEvent {
  /// Enter pressed with this text
  Save(String),
  /// Editing abandoned
  Cancel,
}

/// Inline editor for the notes field.
///
/// Stays open while a save is in flight and ignores input until the parent
/// calls [`NotesEditor::close`] from the mutation's settle hook.
#[derive(Debug, Clone, Default)]
pub struct NotesEditor {
  input: TextInput,
  active: bool,
  saving: bool,
}

impl NotesEditor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn open(&mut self, current: &str) {
    self.input = TextInput::with_value(current);
    self.active = true;
    self.saving = false;
  }

  pub fn close(&mut self) {
    self.active = false;
    self.saving = false;
    self.input.clear();
  }

  pub fn set_saving(&mut self, saving: bool) {
    self.saving = saving;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<NotesEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }
    if self.saving {
      return KeyResult::Handled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(text) => KeyResult::Event(NotesEvent::Save(text)),
      InputResult::Cancelled => {
        self.close();
        KeyResult::Event(NotesEvent::Cancel)
      }
      // Swallow everything else while editing
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let (title, color) = if self.saving {
      (" Notes (saving...) ", Color::DarkGray)
    } else {
      (" Notes (Enter save, Esc cancel) ", Color::Yellow)
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color));

    let (before, after) = self.input.split_at_cursor();
    let line = Line::from(vec![
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);

    let paragraph = Paragraph::new(line)
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }
}
