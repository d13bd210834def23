//! Keyboard shortcut table.

use crate::commands::NavCommand;

/// One key press as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    /// DOM-style key name: "ArrowDown", "j", "Escape", "1".
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    /// Focus is in a text field (search box).
    pub in_text_field: bool,
}

impl KeyInput {
    pub fn key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }
}

/// Map a key press to a command. Chorded keys are left to the host; while
/// typing only Escape is intercepted.
pub fn command_for_key(input: &KeyInput) -> Option<NavCommand> {
    if input.ctrl || input.alt || input.meta {
        return None;
    }
    if input.in_text_field {
        return (input.key == "Escape").then_some(NavCommand::Escape);
    }
    let command = match input.key.as_str() {
        "ArrowDown" | "PageDown" | "j" | "J" => NavCommand::Next,
        "ArrowUp" | "PageUp" | "k" | "K" => NavCommand::Previous,
        "Home" => NavCommand::First,
        "End" => NavCommand::Last,
        "1" => NavCommand::Spotlight(0),
        "2" => NavCommand::Spotlight(1),
        "3" => NavCommand::Spotlight(2),
        "Escape" => NavCommand::Escape,
        "d" | "D" => NavCommand::ToggleDeck,
        "f" | "F" => NavCommand::ToggleFavorite,
        "/" => NavCommand::FocusSearch,
        _ => return None,
    };
    Some(command)
}
