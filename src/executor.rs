use crate::client::{FocusTracker, WindowHandle};
use crate::combo::Combo;
use crate::dispatcher::{Callback, Dispatcher};
use crate::entry::{EntryAction, ShortcutEntry, Step};
use crate::error::{Error, Result};
use crate::event::Action;
use crate::keys::{self, KeyStroke};
use evdev::KeyCode as Key;
use log::{debug, error, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Destination of synthetic input.
pub trait InputSink: Send {
    fn send(&mut self, action: Action) -> io::Result<()>;
}

/// How a call to [`SequenceExecutor::execute`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The abort hotkey was pressed; remaining steps were skipped.
    Aborted,
    /// A combo failed validation; nothing was sent.
    Invalid,
    /// Injection failed part-way.
    Failed,
}

enum PlannedStep {
    Press(Combo),
    Sleep(Duration),
}

struct ExecutionState {
    /// Keys currently held by this execution, in press order.
    pressed: Vec<Key>,
    saved_foreground: Option<WindowHandle>,
}

struct AbortBinding {
    combo: String,
    previous: Option<Callback>,
}

pub struct SequenceExecutor {
    sink: Box<dyn InputSink>,
    focus: Box<dyn FocusTracker>,
    dispatcher: Option<Arc<Dispatcher>>,
    aborted: Arc<AtomicBool>,
    key_delay: Duration,
}

impl SequenceExecutor {
    pub fn new(sink: impl InputSink + 'static, focus: impl FocusTracker + 'static, key_delay: Duration) -> Self {
        Self {
            sink: Box::new(sink),
            focus: Box::new(focus),
            dispatcher: None,
            aborted: Arc::new(AtomicBool::new(false)),
            key_delay,
        }
    }

    /// Lets macros bind their first combo as an abort hotkey while playing.
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Plays `entry`. Never fails: problems are logged and reported through
    /// the returned [`Outcome`].
    pub fn execute(&mut self, entry: &ShortcutEntry) -> Outcome {
        info!("Executing {:?} ({})", entry.name, entry.describe());
        let plan = match build_plan(entry) {
            Ok(plan) => plan,
            Err(e) => {
                error!("Skipping {:?}: {e}", entry.name);
                return Outcome::Invalid;
            }
        };

        self.aborted.store(false, Ordering::SeqCst);
        let abort_binding = match &entry.action {
            EntryAction::Sequence(steps) => self.arm_abort(steps),
            EntryAction::SingleCombo(_) => None,
        };

        let mut state = ExecutionState {
            pressed: Vec::new(),
            saved_foreground: self.focus.foreground(),
        };
        let result = self.play(&plan, &mut state);

        self.release_all(&mut state);
        self.restore_foreground(&state);
        self.disarm_abort(abort_binding);
        self.aborted.store(false, Ordering::SeqCst);

        match result {
            Ok(true) => {
                info!("Aborted {:?}", entry.name);
                Outcome::Aborted
            }
            Ok(false) => Outcome::Completed,
            Err(e) => {
                error!("{:?} failed: {e}", entry.name);
                Outcome::Failed
            }
        }
    }

    /// Returns whether playback stopped because of an abort request.
    fn play(&mut self, plan: &[PlannedStep], state: &mut ExecutionState) -> Result<bool> {
        for step in plan {
            if self.aborted.load(Ordering::SeqCst) {
                return Ok(true);
            }
            match step {
                PlannedStep::Sleep(duration) => thread::sleep(*duration),
                PlannedStep::Press(combo) => {
                    self.press_combo(combo, state).map_err(|source| Error::Injection {
                        combo: combo.to_string(),
                        source,
                    })?;
                }
            }
        }
        Ok(false)
    }

    fn press_combo(&mut self, combo: &Combo, state: &mut ExecutionState) -> io::Result<()> {
        debug!("Sending {combo}");
        let mark = state.pressed.len();

        for token in &combo.held {
            match keys::stroke(token) {
                Some(KeyStroke::Key(key)) => self.hold(key, state)?,
                Some(KeyStroke::Shifted(key)) => {
                    self.hold(Key::KEY_LEFTSHIFT, state)?;
                    self.hold(key, state)?;
                }
                Some(KeyStroke::Wheel(_)) | None => {}
            }
        }

        match keys::stroke(&combo.terminal) {
            Some(KeyStroke::Wheel(direction)) => {
                self.sink.send(Action::Wheel(direction.delta()))?;
                self.pause();
            }
            Some(KeyStroke::Key(key)) => self.hold(key, state)?,
            Some(KeyStroke::Shifted(key)) => {
                self.hold(Key::KEY_LEFTSHIFT, state)?;
                self.hold(key, state)?;
            }
            None => {}
        }

        while state.pressed.len() > mark {
            if let Some(key) = state.pressed.pop() {
                self.sink.send(Action::release(key))?;
                self.pause();
            }
        }
        Ok(())
    }

    fn hold(&mut self, key: Key, state: &mut ExecutionState) -> io::Result<()> {
        self.sink.send(Action::press(key))?;
        state.pressed.push(key);
        self.pause();
        Ok(())
    }

    fn pause(&self) {
        if !self.key_delay.is_zero() {
            thread::sleep(self.key_delay);
        }
    }

    // Only non-empty after an injection error; the release may fail as well.
    fn release_all(&mut self, state: &mut ExecutionState) {
        while let Some(key) = state.pressed.pop() {
            if let Err(e) = self.sink.send(Action::release(key)) {
                warn!("Failed to release {key:?}: {e}");
            }
        }
    }

    fn restore_foreground(&mut self, state: &ExecutionState) {
        if let Some(window) = &state.saved_foreground {
            if let Err(e) = self.focus.activate(window) {
                warn!("Failed to restore focus to {window}: {e}");
            }
        }
    }

    fn arm_abort(&mut self, steps: &[Step]) -> Option<AbortBinding> {
        let dispatcher = self.dispatcher.as_ref()?;
        let combo = match steps.first()? {
            Step::PressCombo(combo) => combo.clone(),
            Step::Sleep(_) => return None,
        };

        let aborted = Arc::clone(&self.aborted);
        let callback: Callback = Arc::new(move || {
            aborted.store(true, Ordering::SeqCst);
        });
        match dispatcher.bind(&combo, callback) {
            Ok(previous) => {
                debug!("Abort hotkey {combo} armed");
                Some(AbortBinding { combo, previous })
            }
            Err(e) => {
                warn!("Could not bind abort hotkey {combo}: {e}");
                None
            }
        }
    }

    fn disarm_abort(&mut self, binding: Option<AbortBinding>) {
        let (Some(dispatcher), Some(binding)) = (&self.dispatcher, binding) else {
            return;
        };
        match binding.previous {
            Some(previous) => {
                if let Err(e) = dispatcher.bind(&binding.combo, previous) {
                    warn!("Could not restore binding {}: {e}", binding.combo);
                }
            }
            None => {
                dispatcher.unbind(&binding.combo);
            }
        }
    }
}

/// Validates every combo of `entry` up front so an invalid macro sends
/// nothing at all.
fn build_plan(entry: &ShortcutEntry) -> Result<Vec<PlannedStep>> {
    match &entry.action {
        EntryAction::SingleCombo(combo) => Ok(vec![PlannedStep::Press(Combo::parse(combo)?)]),
        EntryAction::Sequence(steps) => steps
            .iter()
            .map(|step| match step {
                Step::PressCombo(combo) => Combo::parse(combo).map(PlannedStep::Press),
                Step::Sleep(duration) => Ok(PlannedStep::Sleep(*duration)),
            })
            .collect(),
    }
}
