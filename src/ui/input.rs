use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::types::{EventSender, SessionEvent};

/// Polls for keyboard input during a watch session.
/// Polling stops while `paused` is set so that a freshly restarted instance
/// can take the terminal without both processes competing for input.
pub fn keyboard_worker(tx: EventSender, paused: Arc<AtomicBool>) {
    loop {
        if paused.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }

        // Poll every 200ms - humans won't notice the difference
        if event::poll(Duration::from_millis(200)).unwrap_or(false)
            && let Ok(event) = event::read()
            && let Event::Key(key) = event
        {
            handle_key_event(key, &tx);
        }

        // Check if we should shutdown (channel closed)
        if tx.is_closed() {
            break;
        }
    }
}

fn handle_key_event(key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let _ = tx.blocking_send(SessionEvent::Quit);
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            let _ = tx.blocking_send(SessionEvent::Quit);
        }
        KeyCode::Char('u') | KeyCode::Char('U') => {
            let _ = tx.blocking_send(SessionEvent::CheckNow);
        }
        _ => {}
    }
}
