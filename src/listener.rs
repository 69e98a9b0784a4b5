use crate::device::{self, SharedDevice};
use crate::dispatcher::Dispatcher;
use crate::event::{KeyEvent, KeyValue};
use anyhow::Context;
use evdev::{Device, EventType, InputEvent, KeyCode as Key};
use log::{error, info, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::fd::AsFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const POLL_INTERVAL_MS: u16 = 200;

/// Background thread reading physical keyboards. Dropping the handle stops it
/// and releases the grabbed devices.
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Listener thread panicked");
            }
        }
    }
}

/// Starts listening on `devices`. With `grab`, devices are taken exclusively
/// and every event the dispatcher does not swallow is re-emitted on `output`;
/// without it, bound combos also reach the focused application.
pub fn spawn(
    devices: Vec<(PathBuf, Device)>,
    dispatcher: Arc<Dispatcher>,
    output: SharedDevice,
    grab: bool,
) -> anyhow::Result<ListenerHandle> {
    anyhow::ensure!(!devices.is_empty(), "no keyboard devices found (is /dev/input readable?)");

    let mut devices: Vec<Device> = devices
        .into_iter()
        .map(|(path, mut device)| -> anyhow::Result<Device> {
            info!("Listening on {} ({})", path.display(), device.name().unwrap_or("unnamed"));
            if grab {
                device.grab().with_context(|| format!("failed to grab {}", path.display()))?;
            }
            Ok(device)
        })
        .collect::<anyhow::Result<_>>()?;
    if !grab {
        warn!("Keyboards are not grabbed; bound hotkeys will leak to the focused window");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let thread = thread::Builder::new()
        .name("fasthotkey-listener".to_string())
        .spawn(move || {
            if let Err(e) = run(&mut devices, &dispatcher, &output, grab, &thread_stop) {
                error!("Listener stopped: {e}");
            }
            for device in devices.iter_mut().filter(|_| grab) {
                if let Err(e) = device.ungrab() {
                    warn!("Failed to release {}: {e}", device.name().unwrap_or("unnamed"));
                }
            }
        })?;

    Ok(ListenerHandle {
        stop,
        thread: Some(thread),
    })
}

fn run(
    devices: &mut [Device],
    dispatcher: &Dispatcher,
    output: &SharedDevice,
    grab: bool,
    stop: &AtomicBool,
) -> anyhow::Result<()> {
    while !stop.load(Ordering::SeqCst) {
        let ready: Vec<usize> = {
            let mut fds: Vec<PollFd> = devices
                .iter()
                .map(|device| PollFd::new(device.as_fd(), PollFlags::POLLIN))
                .collect();
            match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
                Ok(0) | Err(Errno::EINTR) => continue,
                Ok(_) => {}
                Err(e) => return Err(e).context("poll on input devices failed"),
            }
            fds.iter()
                .enumerate()
                .filter(|(_, fd)| fd.revents().is_some_and(|r| r.intersects(PollFlags::POLLIN)))
                .map(|(idx, _)| idx)
                .collect()
        };

        for idx in ready {
            let events: Vec<InputEvent> = match devices[idx].fetch_events() {
                Ok(events) => events.collect(),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e).context("failed to read input events"),
            };
            let forward = filter_events(&events, dispatcher);
            if grab && !forward.is_empty() {
                device::emit(output, &forward)?;
            }
        }
    }
    Ok(())
}

/// Events that should reach the rest of the system. Key events are offered
/// to the dispatcher first; synchronization events are dropped because the
/// uinput device adds its own.
fn filter_events(events: &[InputEvent], dispatcher: &Dispatcher) -> Vec<InputEvent> {
    events
        .iter()
        .filter(|event| match event.event_type() {
            EventType::SYNCHRONIZATION => false,
            EventType::KEY => match KeyValue::from_raw(event.value()) {
                Some(value) => !dispatcher.on_key_event(&KeyEvent::new(Key::new(event.code()), value)),
                None => true,
            },
            _ => true,
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn key(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY.0, key.code(), value)
    }

    fn syn() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION.0, 0, 0)
    }

    fn summary(events: &[InputEvent]) -> Vec<(u16, u16, i32)> {
        events.iter().map(|e| (e.event_type().0, e.code(), e.value())).collect()
    }

    #[test]
    fn bound_combo_is_not_forwarded() {
        let dispatcher = Dispatcher::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        dispatcher
            .bind("ctrl+shift+p", Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let batches = [
            vec![key(Key::KEY_LEFTCTRL, 1), syn()],
            vec![key(Key::KEY_LEFTSHIFT, 1), syn()],
            vec![key(Key::KEY_P, 1), syn()],
            vec![key(Key::KEY_P, 0), syn()],
            vec![key(Key::KEY_LEFTSHIFT, 0), key(Key::KEY_LEFTCTRL, 0), syn()],
        ];
        let forwarded: Vec<Vec<InputEvent>> = batches.iter().map(|b| filter_events(b, &dispatcher)).collect();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(summary(&forwarded[0]), summary(&[key(Key::KEY_LEFTCTRL, 1)]));
        assert_eq!(summary(&forwarded[1]), summary(&[key(Key::KEY_LEFTSHIFT, 1)]));
        assert!(forwarded[2].is_empty());
        assert!(forwarded[3].is_empty());
        assert_eq!(
            summary(&forwarded[4]),
            summary(&[key(Key::KEY_LEFTSHIFT, 0), key(Key::KEY_LEFTCTRL, 0)])
        );
    }

    #[test]
    fn other_events_pass_through() {
        let dispatcher = Dispatcher::new();
        let led = InputEvent::new(EventType::LED.0, 0, 1);
        let typed = vec![key(Key::KEY_A, 1), led, syn(), key(Key::KEY_A, 0)];
        assert_eq!(
            summary(&filter_events(&typed, &dispatcher)),
            summary(&[key(Key::KEY_A, 1), led, key(Key::KEY_A, 0)])
        );
    }
}
