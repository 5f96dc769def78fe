use crate::ui::components::{KeyResult, NotesEditor, NotesEvent};
use crate::ui::renderfns::{entry_color, error_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use pcdb::api::labels::{DiskField, PcField, RamStickField};
use pcdb::api::types::{Pc, PcId};
use pcdb::cache::{MutationHooks, QueryCache, QueryKey, SubscriptionId};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::warn;

const INDENT: &str = "    ";

/// State shared with mutation hooks. Hooks only record what happened; the
/// view acts on it in `tick()`.
#[derive(Default)]
struct PanelFlags {
  saving: Cell<bool>,
  save_settled: Cell<bool>,
  deleting: Cell<bool>,
  delete_settled: Cell<bool>,
  message: RefCell<Option<(String, bool)>>,
}

impl PanelFlags {
  fn set_message(&self, text: impl Into<String>, is_error: bool) {
    *self.message.borrow_mut() = Some((text.into(), is_error));
  }
}

/// Detail panel for one record, with notes editing and deletion
pub struct PcDetailView {
  id: PcId,
  editor: NotesEditor,
  scroll: u16,
  subscription: Option<SubscriptionId>,
  flags: Rc<PanelFlags>,
}

impl PcDetailView {
  pub fn new(id: PcId) -> Self {
    Self {
      id,
      editor: NotesEditor::new(),
      scroll: 0,
      subscription: None,
      flags: Rc::new(PanelFlags::default()),
    }
  }

  fn key(&self) -> QueryKey {
    QueryKey::pc(self.id.clone())
  }

  fn save_notes(&mut self, cache: &mut QueryCache, notes: String) {
    self.flags.saving.set(true);
    self.editor.set_saving(true);
    self.flags.message.replace(None);

    let success = Rc::clone(&self.flags);
    let failure = Rc::clone(&self.flags);
    let settled = Rc::clone(&self.flags);
    cache.run_update_notes(
      self.id.clone(),
      notes,
      MutationHooks::new()
        .on_success(move |_| success.set_message("Notes saved", false))
        .on_error(move |err| failure.set_message(format!("Save failed: {}", err), true))
        .on_settled(move || {
          settled.saving.set(false);
          settled.save_settled.set(true);
        }),
    );
  }

  fn delete(&mut self, cache: &mut QueryCache) {
    self.flags.deleting.set(true);

    let id = self.id.clone();
    let settled = Rc::clone(&self.flags);
    cache.run_delete(
      self.id.clone(),
      MutationHooks::new()
        .on_error(move |err| warn!(pc = %id, error = %err, "delete failed"))
        .on_settled(move || {
          settled.deleting.set(false);
          settled.delete_settled.set(true);
        }),
    );
  }

  fn status_line(&self, fetching: bool) -> Line<'static> {
    if self.flags.deleting.get() {
      return Line::styled("Deleting...", Style::default().fg(Color::Yellow));
    }
    if let Some((text, is_error)) = self.flags.message.borrow().as_ref() {
      let color = if *is_error { Color::Red } else { Color::Green };
      return Line::styled(text.clone(), Style::default().fg(color));
    }
    if fetching {
      return Line::styled("Refreshing...", Style::default().fg(Color::DarkGray));
    }
    Line::default()
  }
}

/// Value of a single-line field; `None` for the list fields
fn field_value(pc: &Pc, field: PcField) -> Option<String> {
  let value = match field {
    PcField::Cpu => pc.cpu.clone(),
    PcField::Host => pc.host.clone(),
    PcField::Id => pc.id.to_string(),
    PcField::Mainboard => pc.mainboard.clone(),
    PcField::RamSlots => pc.ram_slots.map(|n| n.to_string()).unwrap_or_default(),
    PcField::RamTotalGb => format!("{} GB", pc.ram_total_gb),
    PcField::Resolution => pc.resolution.clone(),
    PcField::Serial => pc.serial.clone(),
    PcField::Notes => pc.notes.clone(),
    PcField::Disks | PcField::Gpus | PcField::RamSticks => return None,
  };
  Some(value)
}

fn label_line(label: &str, value: String, indent: &str) -> Line<'static> {
  let value = if value.is_empty() { "-".to_string() } else { value };
  Line::from(vec![
    Span::styled(
      format!("{}{}: ", indent, label),
      Style::default().fg(Color::DarkGray),
    ),
    Span::raw(value),
  ])
}

fn heading_line(label: &str, empty: bool) -> Line<'static> {
  let mut spans = vec![Span::styled(
    format!("{}:", label),
    Style::default().fg(Color::DarkGray),
  )];
  if empty {
    spans.push(Span::raw(" -"));
  }
  Line::from(spans)
}

fn separator(first: bool) -> Option<Line<'static>> {
  (!first).then(|| Line::styled(format!("{}──", INDENT), Style::default().fg(Color::DarkGray)))
}

/// Every field of a record in panel order, with nested records expanded
fn detail_lines(pc: &Pc) -> Vec<Line<'static>> {
  let mut lines = Vec::new();

  for field in PcField::ALL {
    match field {
      PcField::Disks => {
        lines.push(heading_line(field.label(), pc.disks.is_empty()));
        for (i, disk) in pc.disks.iter().enumerate() {
          lines.extend(separator(i == 0));
          for sub in DiskField::ALL {
            lines.push(label_line(sub.label(), disk.value(sub), INDENT));
          }
        }
      }
      PcField::RamSticks => {
        lines.push(heading_line(field.label(), pc.ram_sticks.is_empty()));
        for (i, stick) in pc.ram_sticks.iter().enumerate() {
          lines.extend(separator(i == 0));
          for sub in RamStickField::ALL {
            lines.push(label_line(sub.label(), stick.value(sub), INDENT));
          }
        }
      }
      PcField::Gpus => {
        lines.push(heading_line(field.label(), pc.gpus.is_empty()));
        for gpu in &pc.gpus {
          lines.push(Line::raw(format!("{}{}", INDENT, gpu)));
        }
      }
      _ => {
        if let Some(value) = field_value(pc, field) {
          lines.push(label_line(field.label(), value, ""));
        }
      }
    }
  }

  lines
}

impl View for PcDetailView {
  fn handle_key(&mut self, key: KeyEvent, cache: &mut QueryCache) -> ViewAction {
    match self.editor.handle_key(key) {
      KeyResult::Event(NotesEvent::Save(notes)) => {
        self.save_notes(cache, notes);
        return ViewAction::None;
      }
      KeyResult::Event(NotesEvent::Cancel) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let busy = self.flags.deleting.get();
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Char('e') if !busy => {
        if let Some(pc) = cache.peek(&self.key()).and_then(|e| e.pc()) {
          self.editor.open(&pc.notes);
          self.flags.message.replace(None);
        }
      }
      KeyCode::Char('d') if !busy => self.delete(cache),
      KeyCode::Char('r') => {
        cache.refetch(&self.key());
      }
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
    let entry = cache.peek(&self.key());
    let pc = entry.and_then(|e| e.pc());

    let title = match pc {
      Some(pc) => format!(" {} ", pc.host),
      None => format!(" PC {} ", self.id),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(entry_color(entry)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let editor_height = if self.editor.is_active() { 3 } else { 0 };
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Min(1),
        Constraint::Length(editor_height),
        Constraint::Length(1),
      ])
      .split(inner);

    let body = match (pc, entry.and_then(|e| e.error())) {
      (_, Some(err)) => Paragraph::new(err.to_string())
        .style(Style::default().fg(error_color(err)))
        .wrap(Wrap { trim: false }),
      (Some(pc), None) => Paragraph::new(detail_lines(pc))
        .wrap(Wrap { trim: false })
        .scroll((self.scroll, 0)),
      (None, None) => Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(body, chunks[0]);

    if self.editor.is_active() {
      self.editor.render(frame, chunks[1]);
    }

    let fetching = entry.is_some_and(|e| e.is_fetching() && e.data().is_some());
    frame.render_widget(Paragraph::new(self.status_line(fetching)), chunks[2]);
  }

  fn breadcrumb_label(&self, cache: &QueryCache) -> String {
    cache
      .peek(&self.key())
      .and_then(|e| e.pc())
      .map(|pc| pc.host.clone())
      .unwrap_or_else(|| self.id.to_string())
  }

  fn tick(&mut self, cache: &mut QueryCache) -> ViewAction {
    let key = self.key();
    cache.observe(&key);
    if self.subscription.is_none() {
      // A listener marks the record as on screen, so invalidation refetches it at once
      self.subscription = Some(cache.subscribe(key, Box::new(|_, _| {})));
    }

    self.editor.set_saving(self.flags.saving.get());
    if self.flags.save_settled.replace(false) {
      self.editor.close();
    }

    if self.flags.delete_settled.replace(false) {
      cache.refetch(&QueryKey::Pcs);
      return ViewAction::Pop;
    }
    ViewAction::None
  }

  fn close(&mut self, cache: &mut QueryCache) {
    if let Some(sub) = self.subscription.take() {
      cache.unsubscribe(sub);
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit notes").with_priority(10),
      ShortcutInfo::new("d", "delete").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
