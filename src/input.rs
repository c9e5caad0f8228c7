//! Key bindings and held-key tracking.

use crate::orchestrator::InputDeltas;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Without release events, a key counts as held this long after its last press or repeat.
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(500);

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    RotateCw,
    RotateCcw,
    HardDrop,
    Pause,
    ToggleSound,
    Quit,
    None,
}

impl Action {
    /// Actions that repeat while the key stays down.
    fn is_held(self) -> bool {
        matches!(
            self,
            Self::MoveLeft
                | Self::MoveRight
                | Self::MoveUp
                | Self::MoveDown
                | Self::RotateCw
                | Self::RotateCcw
        )
    }
}

/// Map key event to game action. Arrows, WASD and the ZQSD layout all move.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !modifiers.is_empty() && modifiers != KeyModifiers::SHIFT {
        return Action::None;
    }
    let code = match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };
    match code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('m') => Action::ToggleSound,
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('q') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('d') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('z') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('s') => Action::MoveDown,
        KeyCode::Char(' ') | KeyCode::Char('0') => Action::RotateCw,
        KeyCode::Char('1') => Action::RotateCcw,
        KeyCode::Enter => Action::HardDrop,
        _ => Action::None,
    }
}

/// Which movement keys are down right now.
#[derive(Debug, Clone, Default)]
pub struct Controls {
    held: Vec<(Action, Instant)>,
    hard_drop: bool,
    /// Terminal reports key releases, so holds never time out.
    release_events: bool,
}

impl Controls {
    pub fn new(release_events: bool) -> Self {
        Self {
            release_events,
            ..Self::default()
        }
    }

    /// Feed a key event. Returns the action for presses and repeats, `Action::None` otherwise.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        let action = key_to_action(key);
        if key.kind == KeyEventKind::Release {
            self.held.retain(|(a, _)| *a != action);
            return Action::None;
        }
        if action.is_held() {
            match self.held.iter_mut().find(|(a, _)| *a == action) {
                Some((_, since)) => *since = now,
                None => self.held.push((action, now)),
            }
        } else if action == Action::HardDrop && key.kind == KeyEventKind::Press {
            self.hard_drop = true;
        }
        action
    }

    fn is_down(&self, action: Action, now: Instant) -> bool {
        self.held.iter().any(|&(a, since)| {
            a == action
                && (self.release_events || now.saturating_duration_since(since) < HOLD_TIMEOUT)
        })
    }

    /// Forget every held key, e.g. after focus loss.
    pub fn clear(&mut self) {
        self.held.clear();
        self.hard_drop = false;
    }

    /// Inputs for this tick. A hard drop is reported once per press.
    pub fn deltas(&mut self, now: Instant) -> InputDeltas {
        if !self.release_events {
            self.held
                .retain(|&(_, since)| now.saturating_duration_since(since) < HOLD_TIMEOUT);
        }
        let axis = |plus: Action, minus: Action| {
            i8::from(self.is_down(plus, now)) - i8::from(self.is_down(minus, now))
        };
        let deltas = InputDeltas {
            rotate: axis(Action::RotateCw, Action::RotateCcw),
            vertical: axis(Action::MoveDown, Action::MoveUp),
            lateral: axis(Action::MoveRight, Action::MoveLeft),
            hard_drop: self.hard_drop,
        };
        self.hard_drop = false;
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    #[test]
    fn test_bindings() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('q'))), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('Z'))), Action::MoveUp);
        assert_eq!(key_to_action(press(KeyCode::Char('s'))), Action::MoveDown);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('0'))), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('1'))), Action::RotateCcw);
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let alt_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_a), Action::None);
    }

    #[test]
    fn test_held_keys_until_release() {
        let mut controls = Controls::new(true);
        let t0 = Instant::now();
        controls.handle_key(press(KeyCode::Left), t0);
        controls.handle_key(press(KeyCode::Down), t0);
        let later = t0 + Duration::from_secs(3);
        let d = controls.deltas(later);
        assert_eq!((d.lateral, d.vertical, d.rotate), (-1, 1, 0));
        controls.handle_key(key(KeyCode::Left, KeyEventKind::Release), later);
        let d = controls.deltas(later);
        assert_eq!((d.lateral, d.vertical), (0, 1));
    }

    #[test]
    fn test_hold_times_out_without_release_events() {
        let mut controls = Controls::new(false);
        let t0 = Instant::now();
        controls.handle_key(press(KeyCode::Char('d')), t0);
        assert_eq!(controls.deltas(t0 + Duration::from_millis(100)).lateral, 1);
        // A terminal repeat refreshes the hold.
        controls.handle_key(press(KeyCode::Char('d')), t0 + Duration::from_millis(400));
        assert_eq!(controls.deltas(t0 + Duration::from_millis(800)).lateral, 1);
        assert_eq!(controls.deltas(t0 + Duration::from_millis(950)).lateral, 0);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut controls = Controls::new(true);
        let now = Instant::now();
        controls.handle_key(press(KeyCode::Char(' ')), now);
        controls.handle_key(press(KeyCode::Char('1')), now);
        assert_eq!(controls.deltas(now).rotate, 0);
    }

    #[test]
    fn test_hard_drop_fires_once_per_press() {
        let mut controls = Controls::new(true);
        let now = Instant::now();
        controls.handle_key(press(KeyCode::Enter), now);
        assert!(controls.deltas(now).hard_drop);
        assert!(!controls.deltas(now).hard_drop);
        controls.handle_key(key(KeyCode::Enter, KeyEventKind::Repeat), now);
        assert!(!controls.deltas(now).hard_drop);
    }
}
