//! Input device enumeration and key event translation

use std::path::PathBuf;

use anyhow::Result;
use evdev::{Device, InputEvent, InputEventKind, Key};
use flowkeys::KeyEvent;

use crate::KeyEventStream;

/// Event values for EV_KEY events
mod event_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

/// Information about an input device
#[derive(Debug)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "3434:0361")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// Open every keyboard under /dev/input.
///
/// When `names` is non-empty only devices whose name is listed are returned.
pub fn open_keyboards(names: &[String]) -> Result<Vec<(DeviceInfo, Device)>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input")? {
        let entry = entry?;
        let path = entry.path();

        // Only look at event* devices
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                if !is_keyboard(&device) {
                    continue;
                }

                let name = device.name().unwrap_or("Unknown").to_string();
                if !names.is_empty() && !names.iter().any(|n| *n == name) {
                    tracing::debug!("Skipping {} ({}): not in device list", name, path.display());
                    continue;
                }

                let id = device.input_id();
                devices.push((
                    DeviceInfo {
                        path,
                        name,
                        vendor: id.vendor(),
                        product: id.product(),
                    },
                    device,
                ));
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    Ok(devices)
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device
        .supported_events()
        .contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(Key::KEY_A))
            .unwrap_or(false)
}

/// Turn a device into a stream of key events.
///
/// The device is not grabbed: other clients keep receiving its input. The
/// stream ends when the device disappears or returns a read error.
pub fn key_events(device: Device, name: String) -> Result<KeyEventStream> {
    let events = device.into_event_stream()?;

    let stream = futures::stream::unfold((events, name), |(mut events, name)| async move {
        loop {
            match events.next_event().await {
                Ok(event) => {
                    if let Some(key_event) = translate(&event) {
                        return Some((key_event, (events, name)));
                    }
                }
                Err(e) => {
                    tracing::warn!("Stopped reading {}: {}", name, e);
                    return None;
                }
            }
        }
    });

    Ok(Box::pin(stream))
}

/// Translate an evdev event into a key event.
///
/// Auto-repeat becomes another press; the engine ignores presses of keys
/// that are already down.
pub fn translate(event: &InputEvent) -> Option<KeyEvent> {
    let InputEventKind::Key(key) = event.kind() else {
        return None;
    };

    match event.value() {
        event_value::PRESS | event_value::REPEAT => Some(KeyEvent::press(key_name(key))),
        event_value::RELEASE => Some(KeyEvent::release(key_name(key))),
        _ => None,
    }
}

/// Name of an evdev key, spelled the way the engine's normalization table
/// expects (`"Control"`, `"ArrowLeft"`, `"a"`).
///
/// Keys without a known name fall back to the kernel name without its
/// `KEY_` prefix, lowercased (`KEY_PROG1` -> `"prog1"`).
pub fn key_name(key: Key) -> String {
    known_key_name(key).map(str::to_string).unwrap_or_else(|| {
        let raw = format!("{:?}", key);
        raw.strip_prefix("KEY_").unwrap_or(&raw).to_lowercase()
    })
}

fn known_key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::KEY_ESC => "Escape",
        Key::KEY_ENTER | Key::KEY_KPENTER => "Enter",
        Key::KEY_TAB => "Tab",
        Key::KEY_SPACE => " ",
        Key::KEY_BACKSPACE => "Backspace",
        Key::KEY_CAPSLOCK => "CapsLock",
        Key::KEY_NUMLOCK => "NumLock",

        // Modifiers (left and right collapse)
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "Control",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "Shift",
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => "Alt",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "Meta",

        // Letters
        Key::KEY_A => "a",
        Key::KEY_B => "b",
        Key::KEY_C => "c",
        Key::KEY_D => "d",
        Key::KEY_E => "e",
        Key::KEY_F => "f",
        Key::KEY_G => "g",
        Key::KEY_H => "h",
        Key::KEY_I => "i",
        Key::KEY_J => "j",
        Key::KEY_K => "k",
        Key::KEY_L => "l",
        Key::KEY_M => "m",
        Key::KEY_N => "n",
        Key::KEY_O => "o",
        Key::KEY_P => "p",
        Key::KEY_Q => "q",
        Key::KEY_R => "r",
        Key::KEY_S => "s",
        Key::KEY_T => "t",
        Key::KEY_U => "u",
        Key::KEY_V => "v",
        Key::KEY_W => "w",
        Key::KEY_X => "x",
        Key::KEY_Y => "y",
        Key::KEY_Z => "z",

        // Number row and numpad digits
        Key::KEY_0 | Key::KEY_KP0 => "0",
        Key::KEY_1 | Key::KEY_KP1 => "1",
        Key::KEY_2 | Key::KEY_KP2 => "2",
        Key::KEY_3 | Key::KEY_KP3 => "3",
        Key::KEY_4 | Key::KEY_KP4 => "4",
        Key::KEY_5 | Key::KEY_KP5 => "5",
        Key::KEY_6 | Key::KEY_KP6 => "6",
        Key::KEY_7 | Key::KEY_KP7 => "7",
        Key::KEY_8 | Key::KEY_KP8 => "8",
        Key::KEY_9 | Key::KEY_KP9 => "9",

        // Symbols
        Key::KEY_MINUS | Key::KEY_KPMINUS => "-",
        Key::KEY_EQUAL => "=",
        Key::KEY_KPPLUS => "+",
        Key::KEY_KPASTERISK => "*",
        Key::KEY_LEFTBRACE => "[",
        Key::KEY_RIGHTBRACE => "]",
        Key::KEY_SEMICOLON => ";",
        Key::KEY_APOSTROPHE => "'",
        Key::KEY_GRAVE => "`",
        Key::KEY_BACKSLASH => "\\",
        Key::KEY_COMMA => ",",
        Key::KEY_DOT | Key::KEY_KPDOT => ".",
        Key::KEY_SLASH | Key::KEY_KPSLASH => "/",

        // Arrows
        Key::KEY_UP => "ArrowUp",
        Key::KEY_DOWN => "ArrowDown",
        Key::KEY_LEFT => "ArrowLeft",
        Key::KEY_RIGHT => "ArrowRight",

        // Navigation
        Key::KEY_HOME => "Home",
        Key::KEY_END => "End",
        Key::KEY_PAGEUP => "PageUp",
        Key::KEY_PAGEDOWN => "PageDown",
        Key::KEY_INSERT => "Insert",
        Key::KEY_DELETE => "Delete",

        // Function keys
        Key::KEY_F1 => "F1",
        Key::KEY_F2 => "F2",
        Key::KEY_F3 => "F3",
        Key::KEY_F4 => "F4",
        Key::KEY_F5 => "F5",
        Key::KEY_F6 => "F6",
        Key::KEY_F7 => "F7",
        Key::KEY_F8 => "F8",
        Key::KEY_F9 => "F9",
        Key::KEY_F10 => "F10",
        Key::KEY_F11 => "F11",
        Key::KEY_F12 => "F12",
        Key::KEY_F13 => "F13",
        Key::KEY_F14 => "F14",
        Key::KEY_F15 => "F15",
        Key::KEY_F16 => "F16",
        Key::KEY_F17 => "F17",
        Key::KEY_F18 => "F18",
        Key::KEY_F19 => "F19",
        Key::KEY_F20 => "F20",
        Key::KEY_F21 => "F21",
        Key::KEY_F22 => "F22",
        Key::KEY_F23 => "F23",
        Key::KEY_F24 => "F24",

        _ => return None,
    };
    Some(name)
}
