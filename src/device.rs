use crate::event::Action;
use crate::executor::InputSink;
use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, Device, EventType, InputEvent, KeyCode as Key, RelativeAxisCode};
use log::{debug, info};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

pub const DEVICE_NAME: &str = "fasthotkey virtual input";

/// The uinput device shared by the listener (pass-through) and the executor.
pub type SharedDevice = Arc<Mutex<VirtualDevice>>;

pub fn output_device() -> io::Result<SharedDevice> {
    let mut keys: AttributeSet<Key> = AttributeSet::new();
    for code in Key::KEY_RESERVED.code()..Key::BTN_TRIGGER_HAPPY40.code() {
        keys.insert(Key::new(code));
    }

    let mut axes: AttributeSet<RelativeAxisCode> = AttributeSet::new();
    for axis in [
        RelativeAxisCode::REL_X,
        RelativeAxisCode::REL_Y,
        RelativeAxisCode::REL_WHEEL,
        RelativeAxisCode::REL_HWHEEL,
        RelativeAxisCode::REL_WHEEL_HI_RES,
        RelativeAxisCode::REL_HWHEEL_HI_RES,
    ] {
        axes.insert(axis);
    }

    let device = VirtualDevice::builder()?
        .name(DEVICE_NAME)
        .with_keys(&keys)?
        .with_relative_axes(&axes)?
        .build()?;
    info!("Created uinput device {DEVICE_NAME:?}");
    Ok(Arc::new(Mutex::new(device)))
}

pub fn emit(device: &SharedDevice, events: &[InputEvent]) -> io::Result<()> {
    let mut device = device.lock().unwrap_or_else(PoisonError::into_inner);
    device.emit(events)
}

/// Sends executor actions to the shared uinput device.
pub struct UinputSink {
    device: SharedDevice,
}

impl UinputSink {
    pub fn new(device: SharedDevice) -> Self {
        Self { device }
    }
}

impl InputSink for UinputSink {
    fn send(&mut self, action: Action) -> io::Result<()> {
        match action {
            Action::KeyEvent(event) => {
                debug!("{:?}: {:?}", event.value(), event.key());
                emit(
                    &self.device,
                    &[InputEvent::new(EventType::KEY.0, event.code(), event.value().raw())],
                )
            }
            Action::Wheel(delta) => emit(
                &self.device,
                &[
                    InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_WHEEL.0, delta),
                    InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_WHEEL_HI_RES.0, delta * 120),
                ],
            ),
        }
    }
}

/// Physical keyboards, excluding our own virtual device. When `names` is not
/// empty only devices whose name contains one of them are returned.
pub fn keyboards(names: &[String]) -> Vec<(PathBuf, Device)> {
    evdev::enumerate()
        .filter(|(_, device)| {
            let name = device.name().unwrap_or_default();
            name != DEVICE_NAME
                && is_keyboard(device)
                && (names.is_empty() || names.iter().any(|wanted| name.contains(wanted.as_str())))
        })
        .collect()
}

fn is_keyboard(device: &Device) -> bool {
    device.supported_keys().is_some_and(|keys| {
        keys.contains(Key::KEY_SPACE) && keys.contains(Key::KEY_A) && keys.contains(Key::KEY_Z)
    })
}
