/// A key press, identified the way surfaces name keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Character(char),
    Other(String),
}

impl Key {
    /// Map a key name (`"Enter"`, `"ArrowLeft"`, `"a"`) to a key
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Tab" => Key::Tab,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c),
                    _ => Key::Other(other.to_string()),
                }
            }
        }
    }

    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight
        )
    }
}

/// What the surface should do with the event after the editor saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the surface apply its built-in behaviour
    Default,
    /// Suppress the surface's built-in behaviour
    PreventDefault,
}

/// A plugin's answer to a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Continue,
    /// The plugin consumed the key; the editor does nothing more
    Handled,
}
