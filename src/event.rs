use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::Surface;

/// Payload for key-down and after-key-down
#[derive(Debug, Clone)]
pub struct KeyArgs {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    /// The character the key produces, if any
    pub ch: Option<char>,
    /// Set by a subscriber to stop the key from travelling any further
    pub handled: bool,
}

impl KeyArgs {
    pub fn new(event: KeyEvent) -> Self {
        let ch = match event.code {
            KeyCode::Char(ch) if !event.modifiers.contains(KeyModifiers::CONTROL) => Some(ch),
            _ => None,
        };
        Self {
            code: event.code,
            modifiers: event.modifiers,
            ch,
            handled: false,
        }
    }

    pub fn is(&self, chord: KeyChord) -> bool {
        chord.matches(self.code, self.modifiers)
    }
}

/// Payload for validating; any subscriber may veto
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelArgs {
    pub cancel: bool,
}

/// Payload for erase-background, draw-content and draw-border.
///
/// `surface` is already clipped and translated for the window being drawn:
/// content events see the client area at (0, 0), border events see the
/// parent's client area so the frame can be drawn outside the window's own
/// clip. Setting `handled` suppresses the engine's default drawing.
pub struct DrawArgs<'a> {
    pub surface: &'a mut Surface,
    pub has_focus: bool,
    pub handled: bool,
}

impl<'a> DrawArgs<'a> {
    pub fn new(surface: &'a mut Surface, has_focus: bool) -> Self {
        Self {
            surface,
            has_focus,
            handled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.code != code {
            return false;
        }
        // Terminals disagree on whether BackTab carries SHIFT
        if code == KeyCode::BackTab {
            return (modifiers - KeyModifiers::SHIFT) == (self.modifiers - KeyModifiers::SHIFT);
        }
        modifiers == self.modifiers
    }
}

/// Keys the tree handles itself when nothing else claimed them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub next_control: KeyChord,
    pub previous_control: KeyChord,
    pub repaint: KeyChord,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            next_control: KeyChord::plain(KeyCode::Tab),
            previous_control: KeyChord::new(KeyCode::BackTab, KeyModifiers::SHIFT),
            repaint: KeyChord::new(KeyCode::Char('l'), KeyModifiers::CONTROL),
        }
    }
}
