//! Key alias table and canonical key names.
//!
//! Shortcut files are written by people (or scraped from documentation), so the
//! same key shows up under several spellings: `command`, `control`, `pgdn`,
//! `numpad+`. Everything is folded onto one canonical lowercase name before it
//! is validated, injected or bound.

use evdev::KeyCode as Key;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Direction of a synthetic scroll-wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    /// Value of one `REL_WHEEL` tick in this direction.
    pub fn delta(self) -> i32 {
        match self {
            WheelDirection::Up => 1,
            WheelDirection::Down => -1,
        }
    }
}

/// What has to be sent to the uinput device for one canonical key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStroke {
    Key(Key),
    /// The host layout has no dedicated key for this name; it is typed as
    /// shift plus another key.
    Shifted(Key),
    Wheel(WheelDirection),
}

const ALIASES: &[(&str, &str)] = &[
    ("command", "ctrl"),
    ("control", "ctrl"),
    ("cmd", "ctrl"),
    ("numpad+", "+"),
    ("numpad-", "-"),
    ("numpad*", "*"),
    ("numpad/", "/"),
    ("plus", "+"),
    ("minus", "-"),
    ("pgup", "pageup"),
    ("pgdn", "pagedown"),
    ("pgdown", "pagedown"),
    ("escape", "esc"),
    ("return", "enter"),
    ("del", "delete"),
    ("ins", "insert"),
    ("bs", "backspace"),
    ("super", "win"),
    ("meta", "win"),
    ("windows", "win"),
    ("option", "alt"),
];

// First entry for a name is the one injected; later entries for the same name
// only widen the reverse lookup used for physical keys.
const KEY_TABLE: &[(&str, Key)] = &[
    ("ctrl", Key::KEY_LEFTCTRL),
    ("ctrl", Key::KEY_RIGHTCTRL),
    ("shift", Key::KEY_LEFTSHIFT),
    ("shift", Key::KEY_RIGHTSHIFT),
    ("alt", Key::KEY_LEFTALT),
    ("alt", Key::KEY_RIGHTALT),
    ("win", Key::KEY_LEFTMETA),
    ("win", Key::KEY_RIGHTMETA),
    ("esc", Key::KEY_ESC),
    ("enter", Key::KEY_ENTER),
    ("enter", Key::KEY_KPENTER),
    ("tab", Key::KEY_TAB),
    ("space", Key::KEY_SPACE),
    ("backspace", Key::KEY_BACKSPACE),
    ("delete", Key::KEY_DELETE),
    ("insert", Key::KEY_INSERT),
    ("up", Key::KEY_UP),
    ("down", Key::KEY_DOWN),
    ("left", Key::KEY_LEFT),
    ("right", Key::KEY_RIGHT),
    ("home", Key::KEY_HOME),
    ("end", Key::KEY_END),
    ("pageup", Key::KEY_PAGEUP),
    ("pagedown", Key::KEY_PAGEDOWN),
    ("capslock", Key::KEY_CAPSLOCK),
    ("printscreen", Key::KEY_SYSRQ),
    ("menu", Key::KEY_COMPOSE),
    ("+", Key::KEY_KPPLUS),
    ("-", Key::KEY_KPMINUS),
    ("-", Key::KEY_MINUS),
    ("*", Key::KEY_KPASTERISK),
    ("/", Key::KEY_KPSLASH),
    ("/", Key::KEY_SLASH),
    ("\\", Key::KEY_BACKSLASH),
    ("=", Key::KEY_EQUAL),
    (",", Key::KEY_COMMA),
    (".", Key::KEY_DOT),
    ("'", Key::KEY_APOSTROPHE),
    ("`", Key::KEY_GRAVE),
    ("[", Key::KEY_LEFTBRACE),
    ("]", Key::KEY_RIGHTBRACE),
    ("a", Key::KEY_A),
    ("b", Key::KEY_B),
    ("c", Key::KEY_C),
    ("d", Key::KEY_D),
    ("e", Key::KEY_E),
    ("f", Key::KEY_F),
    ("g", Key::KEY_G),
    ("h", Key::KEY_H),
    ("i", Key::KEY_I),
    ("j", Key::KEY_J),
    ("k", Key::KEY_K),
    ("l", Key::KEY_L),
    ("m", Key::KEY_M),
    ("n", Key::KEY_N),
    ("o", Key::KEY_O),
    ("p", Key::KEY_P),
    ("q", Key::KEY_Q),
    ("r", Key::KEY_R),
    ("s", Key::KEY_S),
    ("t", Key::KEY_T),
    ("u", Key::KEY_U),
    ("v", Key::KEY_V),
    ("w", Key::KEY_W),
    ("x", Key::KEY_X),
    ("y", Key::KEY_Y),
    ("z", Key::KEY_Z),
    ("0", Key::KEY_0),
    ("1", Key::KEY_1),
    ("2", Key::KEY_2),
    ("3", Key::KEY_3),
    ("4", Key::KEY_4),
    ("5", Key::KEY_5),
    ("6", Key::KEY_6),
    ("7", Key::KEY_7),
    ("8", Key::KEY_8),
    ("9", Key::KEY_9),
    ("f1", Key::KEY_F1),
    ("f2", Key::KEY_F2),
    ("f3", Key::KEY_F3),
    ("f4", Key::KEY_F4),
    ("f5", Key::KEY_F5),
    ("f6", Key::KEY_F6),
    ("f7", Key::KEY_F7),
    ("f8", Key::KEY_F8),
    ("f9", Key::KEY_F9),
    ("f10", Key::KEY_F10),
    ("f11", Key::KEY_F11),
    ("f12", Key::KEY_F12),
];

// `?` is shift+ß and `;` is shift+, on the host layout; ß sits on KEY_MINUS.
const SHIFTED: &[(&str, Key)] = &[("?", Key::KEY_MINUS), (";", Key::KEY_COMMA)];

const WHEEL: &[(&str, WheelDirection)] = &[
    ("wheelup", WheelDirection::Up),
    ("wheeldown", WheelDirection::Down),
];

lazy_static! {
    static ref ALIAS_MAP: HashMap<&'static str, &'static str> = ALIASES.iter().copied().collect();
    static ref STROKES: HashMap<&'static str, KeyStroke> = {
        let mut strokes = HashMap::new();
        for &(name, key) in KEY_TABLE {
            strokes.entry(name).or_insert(KeyStroke::Key(key));
        }
        for &(name, key) in SHIFTED {
            strokes.insert(name, KeyStroke::Shifted(key));
        }
        for &(name, direction) in WHEEL {
            strokes.insert(name, KeyStroke::Wheel(direction));
        }
        strokes
    };
    static ref NAMES_BY_CODE: HashMap<Key, &'static str> = {
        let mut names = HashMap::new();
        for &(name, key) in KEY_TABLE {
            names.entry(key).or_insert(name);
        }
        names
    };
}

/// Maps an alias onto its canonical name. Unknown names (including `?`) are
/// returned unchanged and left for [`is_valid`] to judge.
pub fn resolve(token: &str) -> &str {
    ALIAS_MAP.get(token).copied().unwrap_or(token)
}

pub fn is_valid(name: &str) -> bool {
    STROKES.contains_key(name)
}

pub fn stroke(name: &str) -> Option<KeyStroke> {
    STROKES.get(name).copied()
}

/// Canonical name of a physical key, with left and right modifiers folded
/// together.
pub fn name_of(key: Key) -> Option<&'static str> {
    NAMES_BY_CODE.get(&key).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_fold_onto_canonical_names() {
        assert_eq!(resolve("command"), "ctrl");
        assert_eq!(resolve("control"), "ctrl");
        assert_eq!(resolve("pgdn"), "pagedown");
        assert_eq!(resolve("numpad+"), "+");
        assert_eq!(resolve("ctrl"), "ctrl");
        assert_eq!(resolve("?"), "?");
        assert_eq!(resolve("fizz"), "fizz");
    }

    #[test]
    fn every_alias_target_is_valid() {
        for (alias, target) in ALIASES {
            assert!(is_valid(target), "{alias} -> {target} is not a canonical key");
        }
    }

    #[test]
    fn layout_substitutions() {
        assert_eq!(stroke("?"), Some(KeyStroke::Shifted(Key::KEY_MINUS)));
        assert_eq!(stroke(";"), Some(KeyStroke::Shifted(Key::KEY_COMMA)));
        assert_eq!(stroke("wheeldown"), Some(KeyStroke::Wheel(WheelDirection::Down)));
        assert_eq!(stroke("ctrl"), Some(KeyStroke::Key(Key::KEY_LEFTCTRL)));
        assert!(!is_valid("fizz"));
    }

    #[test]
    fn physical_modifiers_share_a_name() {
        assert_eq!(name_of(Key::KEY_LEFTCTRL), Some("ctrl"));
        assert_eq!(name_of(Key::KEY_RIGHTCTRL), Some("ctrl"));
        assert_eq!(name_of(Key::KEY_SLASH), Some("/"));
        assert_eq!(name_of(Key::KEY_P), Some("p"));
    }
}
