//! uinput virtual keyboard
//!
//! Creates a kernel-level virtual keyboard through /dev/uinput and emits raw
//! key events on it. Works on X11 and every Wayland compositor, and needs no
//! daemon.
//!
//! Requires:
//! - User in 'input' group (or a udev rule granting access to /dev/uinput)

use super::{KeyDirection, KeyEvent, KeyEventSink};
use crate::error::{InjectionError, SendError};
use crate::keymap::PhysicalKey;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};

/// Name shown by libinput / `evtest` for the virtual device
pub const DEVICE_NAME: &str = "dictype virtual keyboard";

/// Highest evdev key code the device advertises
pub const MAX_KEY_CODE: u16 = 248;

/// Time the compositor needs to notice a freshly created device
pub const SETTLE_MS: u64 = 200;

pub struct UinputSink {
    device: VirtualDevice,
}

impl UinputSink {
    pub fn new() -> Result<Self, InjectionError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1..=MAX_KEY_CODE {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|b| b.name(DEVICE_NAME).with_keys(&keys))
            .and_then(|b| b.build())
            .map_err(|e| InjectionError::DeviceSetup(e.to_string()))?;

        tracing::debug!("Created uinput device '{}'", DEVICE_NAME);
        Ok(Self { device })
    }
}

#[async_trait::async_trait]
impl KeyEventSink for UinputSink {
    async fn send(&mut self, event: KeyEvent) -> Result<(), SendError> {
        let code = event.key.code();
        if !self.supports(event.key) {
            return Err(SendError::key_unavailable(format!(
                "key code {} is not supported by the virtual keyboard",
                code
            )));
        }

        let value = match event.direction {
            KeyDirection::Press => 1,
            KeyDirection::Release => 0,
        };
        // emit() appends the SYN_REPORT
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, value)])
            .map_err(classify_io_error)
    }

    fn supports(&self, key: PhysicalKey) -> bool {
        (1..=MAX_KEY_CODE).contains(&key.code())
    }

    fn name(&self) -> &'static str {
        "uinput"
    }
}

/// Map a write(2) failure on the uinput fd to a send error kind
fn classify_io_error(e: std::io::Error) -> SendError {
    match e.raw_os_error() {
        Some(libc::EAGAIN) | Some(libc::EINTR) | Some(libc::ENOBUFS) => {
            SendError::transient(e.to_string())
        }
        _ if e.kind() == std::io::ErrorKind::Interrupted => SendError::transient(e.to_string()),
        _ => SendError::target_gone(e.to_string()),
    }
}
