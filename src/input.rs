//! Key bindings: arrows + Z/X/C, and vim-style aliases.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Restart,
    Pause,
    Quit,
    None,
}

impl Action {
    /// Keys tracked while held: moves auto-repeat, soft drop speeds up the fall.
    pub fn repeats(self) -> bool {
        matches!(self, Self::MoveLeft | Self::MoveRight | Self::SoftDrop)
    }
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Up | KeyCode::Enter | KeyCode::Char(' ' | 'k') => Action::HardDrop,
        KeyCode::Char('z' | 'Z' | 'x' | 'X' | 'i') => Action::RotateCw,
        KeyCode::Char('c' | 'C' | 'u') => Action::RotateCcw,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_letters() {
        assert_eq!(press(KeyCode::Left), Action::MoveLeft);
        assert_eq!(press(KeyCode::Right), Action::MoveRight);
        assert_eq!(press(KeyCode::Down), Action::SoftDrop);
        assert_eq!(press(KeyCode::Up), Action::HardDrop);
        assert_eq!(press(KeyCode::Char('z')), Action::RotateCw);
        assert_eq!(press(KeyCode::Char('x')), Action::RotateCw);
        assert_eq!(press(KeyCode::Char('c')), Action::RotateCcw);
        assert_eq!(press(KeyCode::Char('r')), Action::Restart);
        assert_eq!(press(KeyCode::Esc), Action::Quit);
        assert_eq!(press(KeyCode::Char('w')), Action::None);
    }

    #[test]
    fn vim_aliases() {
        assert_eq!(press(KeyCode::Char('h')), Action::MoveLeft);
        assert_eq!(press(KeyCode::Char('l')), Action::MoveRight);
        assert_eq!(press(KeyCode::Char('j')), Action::SoftDrop);
        assert_eq!(press(KeyCode::Char('u')), Action::RotateCcw);
    }

    #[test]
    fn shift_allowed_control_ignored() {
        let shifted = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT);
        assert_eq!(key_to_action(shifted), Action::Restart);
        let ctrl_z = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_z), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }

    #[test]
    fn only_moves_and_soft_drop_repeat() {
        assert!(Action::MoveLeft.repeats());
        assert!(Action::SoftDrop.repeats());
        assert!(!Action::HardDrop.repeats());
        assert!(!Action::RotateCw.repeats());
    }
}
