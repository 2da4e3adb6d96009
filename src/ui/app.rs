use super::events::{deck_action, prompt_action, DeckAction, PromptAction};
use super::{AppEvent, EventHandler, TerminalManager};
use crate::deck::{Friend, Item, RankedItem};
use crate::engine::{CardView, DeckSummary, EngineEvent, EngineServices, EngineSettings, RankingEngine, ReleaseOutcome};
use crate::transition::CardVisual;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(33);
/// Release velocity used for the Tab "flick"
const FLICK_VELOCITY: f64 = 1.0;
const CARD_WIDTH: u16 = 48;
const CARD_HEIGHT: u16 = 11;

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Deck,
    /// Typing the playlist name
    Naming(String),
    Exporting,
}

pub struct App {
    terminal: TerminalManager,
    event_handler: EventHandler,
    services: EngineServices,
    settings: EngineSettings,
    items: Vec<Item>,
    friends: Vec<Friend>,
    engine: RankingEngine,
    engine_events: mpsc::UnboundedReceiver<EngineEvent>,

    // UI state
    drag_x: f64,
    mode: Mode,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(items: Vec<Item>, friends: Vec<Friend>, services: EngineServices, settings: EngineSettings) -> Result<Self> {
        let (engine, engine_events) = build_engine(&items, &friends, &services, &settings);
        let terminal = TerminalManager::new()?;

        Ok(Self {
            terminal,
            event_handler: EventHandler::new(TICK_RATE),
            services,
            settings,
            items,
            friends,
            engine,
            engine_events,
            drag_x: 0.0,
            mode: Mode::Deck,
            status: None,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.event_handler.spawn_terminal_reader();
        self.engine.start(Instant::now()).await;

        while !self.should_quit {
            self.drain_engine_events();
            self.render()?;

            match self.event_handler.next_event().await {
                Some(AppEvent::Key(key)) => self.handle_key(key).await,
                Some(AppEvent::Tick) => self.engine.tick(Instant::now()).await,
                Some(AppEvent::Resize) => {}
                None => break,
            }
        }

        // Let in-flight rank submissions land before the runtime goes away
        self.engine.shutdown().await;
        self.engine.flush_submissions().await;
        info!("Session {} closed", self.engine.session_id());

        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        match &mut self.mode {
            Mode::Naming(name) => {
                match prompt_action(key) {
                    Some(PromptAction::Input(c)) => name.push(c),
                    Some(PromptAction::Backspace) => {
                        name.pop();
                    }
                    Some(PromptAction::Submit) => {
                        let name = name.clone();
                        self.start_export(&name);
                    }
                    Some(PromptAction::Cancel) => self.mode = Mode::Deck,
                    None => {}
                }
                return;
            }
            Mode::Exporting => {
                if let Some(DeckAction::Quit) = deck_action(key) {
                    self.should_quit = true;
                }
                return;
            }
            Mode::Deck => {}
        }

        let Some(action) = deck_action(key) else {
            return;
        };
        if !self.engine.summary().exhausted {
            if let Some(message) = blocked_until_exhausted(action) {
                self.status = Some(message.to_string());
                return;
            }
        }
        let now = Instant::now();

        match action {
            DeckAction::Quit => self.should_quit = true,
            DeckAction::Nudge(step) => {
                let dx = self.drag_x + step * self.settings.screen_width;
                if self.engine.drag(dx, 0.0).is_some() {
                    self.drag_x = dx;
                }
            }
            DeckAction::Release => self.release(0.0, now),
            DeckAction::Flick => self.release(FLICK_VELOCITY, now),
            DeckAction::Like => {
                let outcome = self.engine.like(now);
                self.after_release(outcome);
            }
            DeckAction::Dislike => {
                let outcome = self.engine.dislike(now);
                self.after_release(outcome);
            }
            DeckAction::TogglePlayback => self.engine.toggle_playback().await,
            DeckAction::OpenExport => self.mode = Mode::Naming(String::new()),
            DeckAction::Restart => self.restart().await,
        }
    }

    fn release(&mut self, vx: f64, now: Instant) {
        let outcome = self.engine.release(self.drag_x, vx, now);
        self.after_release(outcome);
    }

    fn after_release(&mut self, outcome: ReleaseOutcome) {
        if outcome != ReleaseOutcome::Ignored {
            self.drag_x = 0.0;
        }
    }

    fn start_export(&mut self, name: &str) {
        match self.engine.export(name) {
            // The task reports back through the event stream
            Ok(_task) => {
                self.mode = Mode::Exporting;
                self.status = Some(format!("Exporting \"{}\"...", name.trim()));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    async fn restart(&mut self) {
        let (engine, events) = build_engine(&self.items, &self.friends, &self.services, &self.settings);
        let previous = std::mem::replace(&mut self.engine, engine);
        self.engine_events = events;
        previous.complete_session().await;

        self.drag_x = 0.0;
        self.mode = Mode::Deck;
        self.status = None;
        self.engine.start(Instant::now()).await;
    }

    fn drain_engine_events(&mut self) {
        while let Ok(event) = self.engine_events.try_recv() {
            match event {
                EngineEvent::CardPresented { .. } => self.drag_x = 0.0,
                EngineEvent::Notice(message) => self.status = Some(message),
                EngineEvent::DeckExhausted { liked, disliked } => {
                    self.status = Some(format!(
                        "Done! {} liked, {} passed. Press e to export",
                        liked, disliked
                    ));
                }
                EngineEvent::ExportCompleted(report) => {
                    self.mode = Mode::Deck;
                    self.status = Some(format!(
                        "Exported {} tracks to \"{}\"",
                        report.exported, report.name
                    ));
                }
                EngineEvent::ExportFailed => self.mode = Mode::Deck,
                other => debug!("Engine event: {:?}", other),
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let engine = &self.engine;
        let mode = &self.mode;
        let status = self.status.as_deref();
        let settings = &self.settings;

        self.terminal
            .draw(|f| Self::render_ui(f, engine, mode, status, settings))
    }

    fn render_ui(
        f: &mut Frame,
        engine: &RankingEngine,
        mode: &Mode,
        status: Option<&str>,
        settings: &EngineSettings,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Card or summary
                Constraint::Length(3), // Status / help
            ])
            .split(f.area());

        Self::render_header(f, chunks[0], engine.summary());

        match engine.current_card() {
            Some(card) => Self::render_card(f, chunks[1], engine, card, settings.screen_width),
            None => Self::render_summary(f, chunks[1], engine.liked()),
        }

        Self::render_footer(f, chunks[2], status);

        if let Mode::Naming(name) = mode {
            Self::render_prompt(f, chunks[1], &settings.export.name_prefix, name);
        }
    }

    fn render_header(f: &mut Frame, area: Rect, summary: DeckSummary) {
        let progress = if summary.exhausted {
            format!("{} cards done", summary.total)
        } else {
            format!("card {}/{}", summary.position + 1, summary.total)
        };

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "rankdeck",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "   {}   ♥ {}   ✗ {}",
                progress, summary.liked, summary.disliked
            )),
        ]))
        .block(Block::default().borders(Borders::ALL));

        f.render_widget(header, area);
    }

    fn render_card(f: &mut Frame, area: Rect, engine: &RankingEngine, card: CardView<'_>, screen_width: f64) {
        let visual = engine.visual();
        let rect = card_rect(area, &visual, screen_width);

        let text_style = if visual.opacity < 0.5 {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let border_style = if visual.offset_x < 0.0 {
            Style::default().fg(Color::Red)
        } else if visual.rank_preview > 0 {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        let item = card.item;
        let mut lines = vec![
            Line::from(Span::styled(
                item.title.clone(),
                text_style.add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(item.artist.clone(), text_style)),
            Line::from(Span::styled(item.display_album(), text_style.fg(Color::Gray))),
        ];
        if let Some(friend) = card.shared_by {
            lines.push(Line::from(Span::styled(
                format!("shared by {}", friend),
                text_style.fg(Color::Magenta),
            )));
        }
        lines.push(Line::raw(""));
        lines.push(rank_line(&visual));
        lines.push(playback_line(engine, item));

        let widget = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {}/{} ", card.position + 1, card.total)),
            );

        f.render_widget(Clear, rect);
        f.render_widget(widget, rect);
    }

    fn render_summary(f: &mut Frame, area: Rect, liked: &[RankedItem]) {
        let items: Vec<ListItem> = liked
            .iter()
            .map(|ranked| {
                ListItem::new(format!("{}  {}", stars(ranked.rank.get()), ranked.item.display_line()))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Liked - e export · r restart · q quit "),
        );
        f.render_widget(list, area);
    }

    fn render_footer(f: &mut Frame, area: Rect, status: Option<&str>) {
        let text = status.unwrap_or(
            "←/→ drag  ⏎ release  ⇥ flick  l like  d dislike  ␣ play/pause  r restart  q quit",
        );
        let footer = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, area);
    }

    fn render_prompt(f: &mut Frame, area: Rect, prefix: &str, name: &str) {
        let width = area.width.min(50);
        let rect = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + area.height.saturating_sub(3) / 2,
            width,
            3.min(area.height),
        );

        let prompt = Paragraph::new(format!("{} {}_", prefix, name)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Playlist name (⏎ export, esc cancel) "),
        );
        f.render_widget(Clear, rect);
        f.render_widget(prompt, rect);
    }
}

/// Export and restart are the only ways out of a finished deck, and only
/// from a finished deck
fn blocked_until_exhausted(action: DeckAction) -> Option<&'static str> {
    match action {
        DeckAction::OpenExport => Some("Finish the deck before exporting"),
        DeckAction::Restart => Some("Finish the deck before restarting"),
        _ => None,
    }
}

fn build_engine(
    items: &[Item],
    friends: &[Friend],
    services: &EngineServices,
    settings: &EngineSettings,
) -> (RankingEngine, mpsc::UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut engine = RankingEngine::new(items, friends, services.clone(), settings.clone());
    engine.set_event_sender(tx);
    (engine, rx)
}

/// Where the card sits inside `area`, shifted by the drag offset
fn card_rect(area: Rect, visual: &CardVisual, screen_width: f64) -> Rect {
    let width = area.width.min(CARD_WIDTH);
    let height = area.height.min(CARD_HEIGHT);
    let centered = area.x + (area.width - width) / 2;

    // A full screen-width drag moves the card half the terminal over
    let shift = if screen_width > 0.0 {
        (visual.offset_x / screen_width * f64::from(area.width) / 2.0).round() as i32
    } else {
        0
    };
    let min_x = i32::from(area.x);
    let max_x = i32::from(area.x + area.width - width);
    let x = (i32::from(centered) + shift).clamp(min_x, max_x) as u16;

    Rect::new(x, area.y + (area.height - height) / 2, width, height)
}

fn stars(rank: u8) -> String {
    let filled = usize::from(rank.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn rank_line(visual: &CardVisual) -> Line<'static> {
    if visual.offset_x < 0.0 {
        Line::from(Span::styled("PASS", Style::default().fg(Color::Red)))
    } else if visual.rank_preview > 0 {
        Line::from(Span::styled(
            stars(visual.rank_preview),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::raw("")
    }
}

fn playback_line(engine: &RankingEngine, item: &Item) -> Line<'static> {
    let audio = engine.audio();
    if item.preview_url.is_none() {
        return Line::from(Span::styled("no preview", Style::default().fg(Color::DarkGray)));
    }

    let icon = if audio.is_playing() { "▶" } else { "⏸" };
    let time = match audio.duration() {
        Some(total) => format!("{} / {}", format_time(audio.elapsed()), format_time(total)),
        None => format_time(audio.elapsed()),
    };
    Line::raw(format!("{} {}", icon, time))
}

fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
