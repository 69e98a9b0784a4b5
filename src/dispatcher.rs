//! Process-wide hotkey bindings.
//!
//! The listener thread reports every physical key event here. A binding with
//! modifiers fires only when the held keys, minus the trigger, are exactly its
//! modifier set, so `ctrl+p` and `ctrl+shift+p` can share a trigger key.

use crate::combo::{self, Combo};
use crate::error::{Error, Result};
use crate::event::{KeyEvent, KeyValue};
use crate::keys::{self, KeyStroke};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Callback = Arc<dyn Fn() + Send + Sync>;

struct Binding {
    combo: String,
    /// `None` binds the bare trigger regardless of held keys.
    modifiers: Option<BTreeSet<String>>,
    callback: Callback,
}

#[derive(Default)]
struct State {
    bindings: HashMap<String, Vec<Binding>>,
    held: HashMap<String, u32>,
    swallowed: HashSet<String>,
}

impl State {
    fn press(&mut self, key: &str) {
        *self.held.entry(key.to_string()).or_insert(0) += 1;
    }

    fn release(&mut self, key: &str) {
        if let Some(count) = self.held.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.held.remove(key);
            }
        }
    }

    fn find(&self, trigger: &str) -> Option<&Binding> {
        let candidates = self.bindings.get(trigger)?;
        let others: BTreeSet<String> = self.held.keys().filter(|k| k.as_str() != trigger).cloned().collect();
        candidates
            .iter()
            .find(|b| b.modifiers.as_ref() == Some(&others))
            .or_else(|| candidates.iter().find(|b| b.modifiers.is_none()))
    }
}

#[derive(Default)]
pub struct Dispatcher {
    state: Mutex<State>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callback` for `combo`. Binding a combo that is already bound
    /// replaces the old handler, which is returned.
    pub fn bind(&self, combo: &str, callback: Callback) -> Result<Option<Callback>> {
        let parsed = Combo::parse(combo)?;
        let normalized = parsed.to_string();

        // Layout-substituted keys arrive as shift plus the physical key.
        let (trigger, implied_shift) = match keys::stroke(&parsed.terminal) {
            Some(KeyStroke::Key(key)) => (keys::name_of(key), false),
            Some(KeyStroke::Shifted(key)) => (keys::name_of(key), true),
            Some(KeyStroke::Wheel(_)) | None => (None, false),
        };
        let Some(trigger) = trigger else {
            return Err(Error::InvalidKey {
                combo: combo.to_string(),
                key: parsed.terminal,
            });
        };

        let mut held: BTreeSet<String> = parsed.held.iter().cloned().collect();
        if implied_shift {
            held.insert("shift".to_string());
        }
        let modifiers = if held.is_empty() { None } else { Some(held) };
        let binding = Binding {
            combo: normalized.clone(),
            modifiers,
            callback,
        };

        let mut state = self.lock();
        let slot = state.bindings.entry(trigger.to_string()).or_default();
        match slot.iter_mut().find(|b| b.combo == normalized) {
            Some(existing) => {
                debug!("Replacing binding for {normalized}");
                let previous = std::mem::replace(existing, binding);
                Ok(Some(previous.callback))
            }
            None => {
                debug!("Bound {normalized}");
                slot.push(binding);
                Ok(None)
            }
        }
    }

    /// Removes the binding for `combo`. Returns whether one existed.
    pub fn unbind(&self, combo: &str) -> bool {
        let normalized = combo::canonical(combo);
        let mut state = self.lock();
        let mut removed = false;
        state.bindings.retain(|_, slot| {
            let before = slot.len();
            slot.retain(|b| b.combo != normalized);
            removed |= slot.len() != before;
            !slot.is_empty()
        });
        if removed {
            debug!("Unbound {normalized}");
        }
        removed
    }

    pub fn is_bound(&self, combo: &str) -> bool {
        let normalized = combo::canonical(combo);
        self.lock().bindings.values().flatten().any(|b| b.combo == normalized)
    }

    /// Feeds one key transition. Returns `true` when the event belongs to a
    /// bound combination and must not reach the focused application.
    pub fn on_key(&self, key: &str, value: KeyValue) -> bool {
        let callback = {
            let mut state = self.lock();
            match value {
                KeyValue::Repeat => return state.swallowed.contains(key),
                KeyValue::Release => {
                    state.release(key);
                    return state.swallowed.remove(key);
                }
                KeyValue::Press => {
                    state.press(key);
                    let callback = state.find(key).map(|b| Arc::clone(&b.callback));
                    if callback.is_some() {
                        state.swallowed.insert(key.to_string());
                    }
                    callback
                }
            }
        };

        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn on_key_event(&self, event: &KeyEvent) -> bool {
        match keys::name_of(event.key()) {
            Some(name) => self.on_key(name, event.value()),
            None => self.on_key(&format!("<{}>", event.code()), event.value()),
        }
    }

    /// Drops every binding and forgets held keys.
    pub fn teardown(&self) {
        let mut state = self.lock();
        let count: usize = state.bindings.values().map(Vec::len).sum();
        if count > 0 {
            info!("Removing {count} hotkey bindings");
        }
        *state = State::default();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::KeyCode as Key;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        let callback: Callback = Arc::new(move || {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    fn chord(dispatcher: &Dispatcher, keys: &[&str]) -> bool {
        let mut suppressed = false;
        for key in keys {
            suppressed = dispatcher.on_key(key, KeyValue::Press);
        }
        for key in keys.iter().rev() {
            dispatcher.on_key(key, KeyValue::Release);
        }
        suppressed
    }

    #[test]
    fn bindings_sharing_a_trigger_are_distinct() {
        let dispatcher = Dispatcher::new();
        let (plain, cb1) = counter();
        let (shifted, cb2) = counter();
        dispatcher.bind("ctrl+p", cb1).unwrap();
        dispatcher.bind("ctrl+shift+p", cb2).unwrap();

        assert!(chord(&dispatcher, &["ctrl", "p"]));
        assert_eq!((plain.load(Ordering::SeqCst), shifted.load(Ordering::SeqCst)), (1, 0));

        assert!(chord(&dispatcher, &["ctrl", "shift", "p"]));
        assert_eq!((plain.load(Ordering::SeqCst), shifted.load(Ordering::SeqCst)), (1, 1));
    }

    #[test]
    fn superset_and_subset_do_not_fire() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl+shift+p", cb).unwrap();

        assert!(!chord(&dispatcher, &["ctrl", "alt", "shift", "p"]));
        assert!(!chord(&dispatcher, &["shift", "p"]));
        assert!(!chord(&dispatcher, &["p"]));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unrelated_keys_pass_through() {
        let dispatcher = Dispatcher::new();
        let (_, cb) = counter();
        dispatcher.bind("ctrl+p", cb).unwrap();

        assert!(!dispatcher.on_key("ctrl", KeyValue::Press));
        assert!(!dispatcher.on_key("a", KeyValue::Press));
        assert!(!dispatcher.on_key("a", KeyValue::Release));
        assert!(!dispatcher.on_key("ctrl", KeyValue::Release));
    }

    #[test]
    fn repeat_and_release_of_trigger_are_swallowed() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl+p", cb).unwrap();

        dispatcher.on_key("ctrl", KeyValue::Press);
        assert!(dispatcher.on_key("p", KeyValue::Press));
        assert!(dispatcher.on_key("p", KeyValue::Repeat));
        assert!(dispatcher.on_key("p", KeyValue::Release));
        assert!(!dispatcher.on_key("ctrl", KeyValue::Release));
        assert!(!dispatcher.on_key("p", KeyValue::Release));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_key_binding_fires_on_any_press() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("f9", cb).unwrap();

        assert!(chord(&dispatcher, &["f9"]));
        assert!(chord(&dispatcher, &["shift", "f9"]));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rebinding_replaces_and_returns_previous() {
        let dispatcher = Dispatcher::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        assert!(dispatcher.bind("ctrl+p", cb1).unwrap().is_none());
        let previous = dispatcher.bind("Control+P", cb2).unwrap();
        assert!(previous.is_some());

        chord(&dispatcher, &["ctrl", "p"]);
        assert_eq!((first.load(Ordering::SeqCst), second.load(Ordering::SeqCst)), (0, 1));
    }

    #[test]
    fn unbind_removes_the_handler() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl++", cb).unwrap();
        assert!(dispatcher.is_bound("ctrl+plus"));
        assert!(dispatcher.unbind("ctrl++"));
        assert!(!dispatcher.unbind("ctrl++"));
        assert!(!chord(&dispatcher, &["ctrl", "+"]));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_combos_are_rejected() {
        let dispatcher = Dispatcher::new();
        let (_, cb) = counter();
        assert!(matches!(dispatcher.bind("ctrl+fizz", Arc::clone(&cb)), Err(Error::InvalidKey { .. })));
        assert!(matches!(dispatcher.bind("ctrl+wheelup", cb), Err(Error::InvalidKey { .. })));
    }

    #[test]
    fn left_and_right_modifiers_are_the_same_key() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl+p", cb).unwrap();

        dispatcher.on_key_event(&KeyEvent::new(Key::KEY_RIGHTCTRL, KeyValue::Press));
        assert!(dispatcher.on_key_event(&KeyEvent::new(Key::KEY_P, KeyValue::Press)));
        dispatcher.on_key_event(&KeyEvent::new(Key::KEY_P, KeyValue::Release));
        dispatcher.on_key_event(&KeyEvent::new(Key::KEY_RIGHTCTRL, KeyValue::Release));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn substituted_key_binds_its_physical_chord() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl+?", cb).unwrap();

        assert!(!chord(&dispatcher, &["ctrl", "-"]));
        dispatcher.on_key_event(&KeyEvent::new(Key::KEY_LEFTCTRL, KeyValue::Press));
        dispatcher.on_key_event(&KeyEvent::new(Key::KEY_LEFTSHIFT, KeyValue::Press));
        assert!(dispatcher.on_key_event(&KeyEvent::new(Key::KEY_MINUS, KeyValue::Press)));
        assert!(dispatcher.on_key_event(&KeyEvent::new(Key::KEY_MINUS, KeyValue::Release)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(dispatcher.is_bound("ctrl+?"));
        assert!(dispatcher.unbind("ctrl+?"));
    }

    #[test]
    fn callback_may_rebind_without_deadlock() {
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher
            .bind("ctrl+p", Arc::new(move || {
                inner.unbind("ctrl+p");
            }))
            .unwrap();

        assert!(chord(&dispatcher, &["ctrl", "p"]));
        assert!(!dispatcher.is_bound("ctrl+p"));
    }

    #[test]
    fn teardown_clears_everything() {
        let dispatcher = Dispatcher::new();
        let (count, cb) = counter();
        dispatcher.bind("ctrl+p", cb).unwrap();
        dispatcher.teardown();
        assert!(!chord(&dispatcher, &["ctrl", "p"]));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
