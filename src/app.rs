use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::PcListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use pcdb::api::ApiClient;
use pcdb::cache::{CacheOptions, QueryCache};
use pcdb::config::Config;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Shared server-state cache, read and written by every view
  cache: QueryCache,

  /// Header title
  title: String,

  /// API host shown in the header
  api_host: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = ApiClient::new(&config.api)?;
    let api_host = client
      .base_url()
      .host_str()
      .map(|host| match client.base_url().port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
      })
      .unwrap_or_default();

    let cache = QueryCache::new(Arc::new(client), CacheOptions::from(&config.cache));
    Ok(Self::with_cache(cache, config.title().to_string(), api_host))
  }

  fn with_cache(cache: QueryCache, title: String, api_host: String) -> Self {
    Self {
      view_stack: vec![Box::new(PcListView::new())],
      cache,
      title,
      api_host,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Outstanding requests are cancelled and pending mutation hooks settle here
    self.cache.shutdown();
    while let Some(mut view) = self.view_stack.pop() {
      view.close(&mut self.cache);
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    // First tick so the root view's queries start before the first frame
    self.tick();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  /// Apply finished requests to the cache, then let the current view react
  fn tick(&mut self) {
    if self.cache.poll() {
      debug!(in_flight = self.cache.in_flight(), "cache updated");
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.tick(&mut self.cache),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key, &mut self.cache),
      None => ViewAction::None,
    };
    self.apply(action);
    // Ticks stall while keys keep arriving
    self.tick();
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.view_stack.push(view);
        // Start the new view's queries without waiting a tick
        self.tick();
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          if let Some(mut view) = self.view_stack.pop() {
            view.close(&mut self.cache);
          }
        } else {
          info!("quit requested");
          self.should_quit = true;
        }
      }
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn api_host(&self) -> &str {
    &self.api_host
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label(&self.cache))
      .collect()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default();
    shortcuts.sort_by_key(|s| s.priority);
    shortcuts
  }

  /// Render the top of the stack
  pub fn render_view(&mut self, frame: &mut Frame, area: Rect) {
    let cache = &self.cache;
    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, area, cache);
    }
  }
}
