use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// What a key means while the deck is on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeckAction {
    Quit,

    // Keyboard stand-ins for the drag gesture
    Nudge(f64),
    Release,
    Flick,

    Like,
    Dislike,
    TogglePlayback,

    OpenExport,
    Restart,
}

/// Keys while the export name prompt is open
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAction {
    Input(char),
    Backspace,
    Submit,
    Cancel,
}

/// Fraction of the screen width one arrow press moves the card
pub const NUDGE_STEP: f64 = 0.05;

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
            tick_rate,
        }
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Pump terminal input on a blocking thread. Ends when the app drops
    /// the receiver.
    pub fn spawn_terminal_reader(&self) {
        let sender = self.event_sender.clone();
        let tick_rate = self.tick_rate;

        tokio::task::spawn_blocking(move || loop {
            let event = match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                    Ok(Event::Resize(_, _)) => Some(AppEvent::Resize),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Terminal read failed: {}", e);
                        None
                    }
                },
                Ok(false) => None,
                Err(e) => {
                    warn!("Terminal poll failed: {}", e);
                    None
                }
            };

            if let Some(event) = event {
                if sender.send(event).is_err() {
                    break;
                }
            }
            // Periodic tick drives the animations
            if sender.send(AppEvent::Tick).is_err() {
                break;
            }
        });
    }
}

pub fn deck_action(key: KeyEvent) -> Option<DeckAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(DeckAction::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(DeckAction::Quit),

        KeyCode::Left | KeyCode::Char(',') => Some(DeckAction::Nudge(-NUDGE_STEP)),
        KeyCode::Right | KeyCode::Char('.') => Some(DeckAction::Nudge(NUDGE_STEP)),
        KeyCode::Enter => Some(DeckAction::Release),
        KeyCode::Tab => Some(DeckAction::Flick),

        KeyCode::Char('l') | KeyCode::Char('+') => Some(DeckAction::Like),
        KeyCode::Char('d') | KeyCode::Char('-') => Some(DeckAction::Dislike),
        KeyCode::Char(' ') => Some(DeckAction::TogglePlayback),

        KeyCode::Char('e') => Some(DeckAction::OpenExport),
        KeyCode::Char('r') => Some(DeckAction::Restart),

        _ => None,
    }
}

pub fn prompt_action(key: KeyEvent) -> Option<PromptAction> {
    match key.code {
        KeyCode::Enter => Some(PromptAction::Submit),
        KeyCode::Esc => Some(PromptAction::Cancel),
        KeyCode::Backspace => Some(PromptAction::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(PromptAction::Input(c)),
        _ => None,
    }
}
