use evdev::KeyCode as Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyValue {
    Release,
    Press,
    Repeat,
}

impl KeyValue {
    pub fn from_raw(value: i32) -> Option<KeyValue> {
        match value {
            0 => Some(KeyValue::Release),
            1 => Some(KeyValue::Press),
            2 => Some(KeyValue::Repeat),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            KeyValue::Release => 0,
            KeyValue::Press => 1,
            KeyValue::Repeat => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    key: Key,
    value: KeyValue,
}

impl KeyEvent {
    pub fn new(key: Key, value: KeyValue) -> KeyEvent {
        KeyEvent { key, value }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn code(&self) -> u16 {
        self.key.code()
    }

    pub fn value(&self) -> KeyValue {
        self.value
    }
}

/// One primitive handed to an output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    KeyEvent(KeyEvent),
    /// Vertical scroll; positive is up.
    Wheel(i32),
}

impl Action {
    pub fn press(key: Key) -> Action {
        Action::KeyEvent(KeyEvent::new(key, KeyValue::Press))
    }

    pub fn release(key: Key) -> Action {
        Action::KeyEvent(KeyEvent::new(key, KeyValue::Release))
    }
}
