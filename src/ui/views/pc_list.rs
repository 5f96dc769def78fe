use super::PcDetailView;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{entry_color, error_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use pcdb::api::labels::PcField;
use pcdb::api::types::{Pc, PcId};
use pcdb::cache::{CacheEntry, QueryCache, QueryKey, SubscriptionId};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

const CARD_HEIGHT: u16 = 6;
const CARD_MIN_WIDTH: u16 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardLayout {
  Grid,
  List,
}

/// Root view: one card per record in the collection.
///
/// Every visible card observes its own item query, so a record's card fills
/// in as soon as that record arrives.
pub struct PcListView {
  selected: usize,
  layout: CardLayout,
  /// Cards per row in the last frame
  columns: usize,
  subscriptions: HashMap<QueryKey, SubscriptionId>,
  /// Set by listeners when any watched entry changes
  changed: Rc<Cell<bool>>,
}

impl PcListView {
  pub fn new() -> Self {
    Self {
      selected: 0,
      layout: CardLayout::Grid,
      columns: 1,
      subscriptions: HashMap::new(),
      changed: Rc::new(Cell::new(false)),
    }
  }

  fn ids(cache: &QueryCache) -> Vec<PcId> {
    cache
      .peek(&QueryKey::Pcs)
      .and_then(|entry| entry.pcs())
      .map(|refs| refs.iter().map(|r| r.id.clone()).collect())
      .unwrap_or_default()
  }

  /// Subscribe to exactly `keys`, dropping subscriptions for anything else
  fn sync_subscriptions(&mut self, cache: &mut QueryCache, keys: Vec<QueryKey>) {
    self.subscriptions.retain(|key, sub| {
      let keep = keys.contains(key);
      if !keep {
        cache.unsubscribe(*sub);
      }
      keep
    });

    for key in keys {
      if self.subscriptions.contains_key(&key) {
        continue;
      }
      let changed = Rc::clone(&self.changed);
      let sub = cache.subscribe(key.clone(), Box::new(move |_, _| changed.set(true)));
      self.subscriptions.insert(key, sub);
    }
  }

  fn step(&self) -> usize {
    match self.layout {
      CardLayout::Grid => self.columns.max(1),
      CardLayout::List => 1,
    }
  }

  fn move_by(&mut self, delta: isize, len: usize) {
    if len == 0 {
      return;
    }
    let next = self.selected as isize + delta;
    self.selected = next.clamp(0, len as isize - 1) as usize;
  }

  fn draw_cards(&mut self, frame: &mut Frame, area: Rect, ids: &[PcId], cache: &QueryCache) {
    let columns = match self.layout {
      CardLayout::Grid => (area.width / CARD_MIN_WIDTH).max(1) as usize,
      CardLayout::List => 1,
    };
    self.columns = columns;

    let rows_visible = (area.height / CARD_HEIGHT).max(1) as usize;
    let selected_row = self.selected / columns;
    let first_row = (selected_row + 1).saturating_sub(rows_visible);
    let card_width = area.width / columns as u16;

    for slot in 0..rows_visible * columns {
      let idx = first_row * columns + slot;
      let Some(id) = ids.get(idx) else {
        break;
      };
      let row = (slot / columns) as u16;
      let col = (slot % columns) as u16;
      let top = row * CARD_HEIGHT;
      if top >= area.height {
        break;
      }

      let rect = Rect::new(
        area.x + col * card_width,
        area.y + top,
        card_width,
        CARD_HEIGHT.min(area.height - top),
      );
      let entry = cache.peek(&QueryKey::pc(id.clone()));
      draw_card(frame, rect, id, entry, idx == self.selected);
    }
  }
}

impl Default for PcListView {
  fn default() -> Self {
    Self::new()
  }
}

fn draw_card(frame: &mut Frame, area: Rect, id: &PcId, entry: Option<&CacheEntry>, selected: bool) {
  let width = area.width.saturating_sub(2) as usize;
  let pc = entry.and_then(|e| e.pc());

  let title = match pc {
    Some(pc) => format!(" {} ", truncate(&pc.host, width.saturating_sub(2))),
    None => format!(" {} ", id),
  };
  let border = if selected {
    Color::Yellow
  } else {
    entry_color(entry)
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let lines = match (pc, entry.and_then(|e| e.error())) {
    (_, Some(err)) => vec![Line::styled(
      truncate(&err.to_string(), width),
      Style::default().fg(error_color(err)),
    )],
    (Some(pc), None) => card_lines(pc, width),
    (None, None) => vec![Line::styled(
      "Loading...",
      Style::default().fg(Color::DarkGray),
    )],
  };

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn card_lines(pc: &Pc, width: usize) -> Vec<Line<'static>> {
  let fields = [
    (PcField::Cpu, pc.cpu.clone()),
    (PcField::RamTotalGb, format!("{} GB", pc.ram_total_gb)),
    (PcField::Resolution, pc.resolution.clone()),
    (PcField::Notes, pc.notes.clone()),
  ];

  fields
    .into_iter()
    .map(|(field, value)| {
      let label = format!("{}: ", field.label());
      let room = width.saturating_sub(label.chars().count());
      Line::from(vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::raw(truncate(&value, room)),
      ])
    })
    .collect()
}

impl View for PcListView {
  fn handle_key(&mut self, key: KeyEvent, cache: &mut QueryCache) -> ViewAction {
    let ids = Self::ids(cache);
    let step = self.step() as isize;

    match key.code {
      KeyCode::Char('q') => return ViewAction::Pop,
      KeyCode::Char('j') | KeyCode::Down => self.move_by(step, ids.len()),
      KeyCode::Char('k') | KeyCode::Up => self.move_by(-step, ids.len()),
      KeyCode::Char('l') | KeyCode::Right => self.move_by(1, ids.len()),
      KeyCode::Char('h') | KeyCode::Left => self.move_by(-1, ids.len()),
      KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
      KeyCode::Char('G') | KeyCode::End => self.selected = ids.len().saturating_sub(1),
      KeyCode::Char('r') => {
        cache.refetch(&QueryKey::Pcs);
      }
      KeyCode::Char('v') => {
        self.layout = match self.layout {
          CardLayout::Grid => CardLayout::List,
          CardLayout::List => CardLayout::Grid,
        };
      }
      KeyCode::Enter => {
        if let Some(id) = ids.get(self.selected) {
          return ViewAction::Push(Box::new(PcDetailView::new(id.clone())));
        }
      }
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, cache: &QueryCache) {
    let entry = cache.peek(&QueryKey::Pcs);
    let ids = Self::ids(cache);

    let mut title = format!(" PCs ({}) ", ids.len());
    if entry.is_some_and(|e| e.is_fetching()) {
      title.push_str("refreshing ");
    }
    let border = if entry.is_some_and(|e| e.error().is_some()) {
      Color::Red
    } else {
      Color::Cyan
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match (entry.and_then(|e| e.pcs()), entry.and_then(|e| e.error())) {
      (_, Some(err)) => {
        let error = Paragraph::new(err.to_string()).style(Style::default().fg(error_color(err)));
        frame.render_widget(error, inner);
      }
      (Some(_), None) if ids.is_empty() => {
        let empty = Paragraph::new("No PCs").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
      }
      (Some(_), None) => self.draw_cards(frame, inner, &ids, cache),
      (None, None) => {
        let loading = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, inner);
      }
    }
  }

  fn breadcrumb_label(&self, _cache: &QueryCache) -> String {
    "PCs".to_string()
  }

  fn tick(&mut self, cache: &mut QueryCache) -> ViewAction {
    cache.observe_collection();
    let ids = Self::ids(cache);
    for id in &ids {
      cache.observe_item(id);
    }

    let mut keys: Vec<QueryKey> = ids.iter().map(|id| QueryKey::pc(id.clone())).collect();
    keys.push(QueryKey::Pcs);
    self.sync_subscriptions(cache, keys);

    if self.changed.replace(false) {
      ensure_valid_selection(&mut self.selected, ids.len());
    }
    ViewAction::None
  }

  fn close(&mut self, cache: &mut QueryCache) {
    for (_, sub) in self.subscriptions.drain() {
      cache.unsubscribe(sub);
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "details").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("v", "layout").with_priority(30),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::super::stub::{cache_with, pc, render_text};
  use super::*;
  use crossterm::event::KeyModifiers;
  use std::sync::atomic::Ordering;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_tick_loads_collection_and_cards() {
    let (_api, mut cache) = cache_with(vec![pc("p1", "lab-01", ""), pc("p2", "lab-02", "")], false);
    let mut view = PcListView::new();

    view.tick(&mut cache);
    cache.settle().await;
    // Item queries start once the collection is known
    view.tick(&mut cache);
    cache.settle().await;

    let card = cache.peek(&QueryKey::pc("p2")).and_then(|e| e.pc()).unwrap();
    assert_eq!(card.host, "lab-02");
    assert!(cache.is_observed(&QueryKey::Pcs));
    assert!(cache.is_observed(&QueryKey::pc("p1")));
  }

  #[tokio::test]
  async fn test_selection_clamped_when_collection_shrinks() {
    let (api, mut cache) = cache_with(vec![pc("p1", "a", ""), pc("p2", "b", "")], false);
    let mut view = PcListView::new();
    view.tick(&mut cache);
    cache.settle().await;
    view.tick(&mut cache);

    view.layout = CardLayout::List;
    view.handle_key(key(KeyCode::Char('j')), &mut cache);
    assert_eq!(view.selected, 1);

    api.pcs.lock().unwrap().pop();
    view.handle_key(key(KeyCode::Char('r')), &mut cache);
    cache.settle().await;
    view.tick(&mut cache);

    assert_eq!(view.selected, 0);
    assert!(!cache.is_observed(&QueryKey::pc("p2")));
  }

  #[tokio::test]
  async fn test_enter_opens_detail_and_close_unsubscribes() {
    let (_api, mut cache) = cache_with(vec![pc("p1", "a", "")], false);
    let mut view = PcListView::new();
    view.tick(&mut cache);
    cache.settle().await;
    view.tick(&mut cache);

    let action = view.handle_key(key(KeyCode::Enter), &mut cache);
    assert!(matches!(action, ViewAction::Push(_)));

    view.close(&mut cache);
    assert!(!cache.is_observed(&QueryKey::Pcs));
  }

  #[tokio::test]
  async fn test_failed_refresh_replaces_cards_with_error() {
    let (api, mut cache) = cache_with(vec![pc("p1", "lab-01", ""), pc("p2", "lab-02", "")], false);
    let mut view = PcListView::new();
    view.tick(&mut cache);
    cache.settle().await;
    view.tick(&mut cache);
    cache.settle().await;
    assert!(render_text(&mut view, &cache, 80, 20).contains("lab-01"));

    api.fail_reads.store(true, Ordering::SeqCst);
    view.handle_key(key(KeyCode::Char('r')), &mut cache);
    cache.settle().await;

    let screen = render_text(&mut view, &cache, 80, 20);
    assert!(screen.contains("Failed to fetch data"));
    assert!(!screen.contains("lab-01"));
  }

  #[tokio::test]
  async fn test_failed_card_refresh_shows_error_on_that_card() {
    let (api, mut cache) = cache_with(vec![pc("p1", "lab-01", ""), pc("p2", "lab-02", "")], false);
    let mut view = PcListView::new();
    view.tick(&mut cache);
    cache.settle().await;
    view.tick(&mut cache);
    cache.settle().await;

    api.fail_reads.store(true, Ordering::SeqCst);
    cache.refetch(&QueryKey::pc("p1"));
    cache.settle().await;

    let screen = render_text(&mut view, &cache, 80, 20);
    assert!(screen.contains("Failed to fetch data"));
    // only the healthy card still lists its fields
    assert_eq!(screen.matches("CPU:").count(), 1);
    assert!(screen.contains("lab-02"));
  }

  #[test]
  fn test_card_lines_show_summary_fields() {
    let lines = card_lines(&pc("p1", "lab-01", "fan noisy"), 40);
    let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    assert_eq!(
      text,
      vec![
        "CPU: Ryzen 5 3600",
        "RAM total: 16 GB",
        "Resolution: 1920x1080",
        "Notes: fan noisy",
      ]
    );
  }
}
