//! Dedicated OS-thread key listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! The listener tracks the held modifier set locally and emits a
//! [`RawKeyEvent`] of kind `ModifierChange` whenever it changes, plus a
//! `KeyDown` for every ordinary key press.  Ordinary key *releases* are not
//! forwarded; the matcher infers combo release from modifier transitions.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.  This is safe and
//! expected — rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{KeyEventKind, Modifiers, RawKeyEvent};

// ---------------------------------------------------------------------------
// rdev key mapping
// ---------------------------------------------------------------------------

/// Modifier bit for an rdev key, or `None` for ordinary keys.
fn modifier_bit(key: rdev::Key) -> Option<Modifiers> {
    use rdev::Key;
    match key {
        Key::ShiftLeft | Key::ShiftRight => Some(Modifiers::SHIFT),
        Key::ControlLeft | Key::ControlRight => Some(Modifiers::CONTROL),
        Key::Alt | Key::AltGr => Some(Modifiers::ALT),
        Key::MetaLeft | Key::MetaRight => Some(Modifiers::META),
        Key::Function => Some(Modifiers::GLOBE),
        _ => None,
    }
}

/// Map an ordinary rdev key onto the crate's stable key-code numbering
/// (the same codes [`super::parse_key_name`] produces).  Keys outside the
/// supported set map to `None` and are not forwarded.
fn key_code(key: rdev::Key) -> Option<u32> {
    use rdev::Key;
    let code = match key {
        Key::F1 => 1,
        Key::F2 => 2,
        Key::F3 => 3,
        Key::F4 => 4,
        Key::F5 => 5,
        Key::F6 => 6,
        Key::F7 => 7,
        Key::F8 => 8,
        Key::F9 => 9,
        Key::F10 => 10,
        Key::F11 => 11,
        Key::F12 => 12,
        Key::Space => 0x20,
        Key::Return => 0x0D,
        Key::Tab => 0x09,
        Key::Escape => 0x1B,
        Key::KeyA => 'A' as u32,
        Key::KeyB => 'B' as u32,
        Key::KeyC => 'C' as u32,
        Key::KeyD => 'D' as u32,
        Key::KeyE => 'E' as u32,
        Key::KeyF => 'F' as u32,
        Key::KeyG => 'G' as u32,
        Key::KeyH => 'H' as u32,
        Key::KeyI => 'I' as u32,
        Key::KeyJ => 'J' as u32,
        Key::KeyK => 'K' as u32,
        Key::KeyL => 'L' as u32,
        Key::KeyM => 'M' as u32,
        Key::KeyN => 'N' as u32,
        Key::KeyO => 'O' as u32,
        Key::KeyP => 'P' as u32,
        Key::KeyQ => 'Q' as u32,
        Key::KeyR => 'R' as u32,
        Key::KeyS => 'S' as u32,
        Key::KeyT => 'T' as u32,
        Key::KeyU => 'U' as u32,
        Key::KeyV => 'V' as u32,
        Key::KeyW => 'W' as u32,
        Key::KeyX => 'X' as u32,
        Key::KeyY => 'Y' as u32,
        Key::KeyZ => 'Z' as u32,
        Key::Num0 => '0' as u32,
        Key::Num1 => '1' as u32,
        Key::Num2 => '2' as u32,
        Key::Num3 => '3' as u32,
        Key::Num4 => '4' as u32,
        Key::Num5 => '5' as u32,
        Key::Num6 => '6' as u32,
        Key::Num7 => '7' as u32,
        Key::Num8 => '8' as u32,
        Key::Num9 => '9' as u32,
        _ => return None,
    };
    Some(code)
}

// ---------------------------------------------------------------------------
// KeyListener
// ---------------------------------------------------------------------------

/// Handle to a running key listener thread.
///
/// Construct one with [`KeyListener::start`].  Drop it to stop forwarding
/// events.
///
/// The underlying OS thread will continue to exist until the process exits
/// because `rdev::listen` cannot be interrupted, but it will silently discard
/// all events once the stop flag is set.
pub struct KeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle.  Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn a dedicated OS thread that listens for global key events and
    /// forwards [`RawKeyEvent`]s on `tx`.
    ///
    /// The background thread uses `blocking_send` so it works correctly
    /// from a non-async context.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(tx: mpsc::Sender<RawKeyEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("key-listener".into())
            .spawn(move || {
                let mut held = Modifiers::NONE;

                let result = rdev::listen(move |event| {
                    // Bail out if the listener has been stopped.
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(k) => {
                            if let Some(bit) = modifier_bit(k) {
                                if !held.contains(bit) {
                                    held.insert(bit);
                                    let _ = tx.blocking_send(RawKeyEvent {
                                        modifiers: held,
                                        key_code: 0,
                                        kind: KeyEventKind::ModifierChange,
                                    });
                                }
                            } else if let Some(code) = key_code(k) {
                                let _ = tx.blocking_send(RawKeyEvent {
                                    modifiers: held,
                                    key_code: code,
                                    kind: KeyEventKind::KeyDown,
                                });
                            }
                        }
                        rdev::EventType::KeyRelease(k) => {
                            // Only modifier releases change the event stream.
                            if let Some(bit) = modifier_bit(k) {
                                if held.contains(bit) {
                                    held.remove(bit);
                                    let _ = tx.blocking_send(RawKeyEvent {
                                        modifiers: held,
                                        key_code: 0,
                                        kind: KeyEventKind::ModifierChange,
                                    });
                                }
                            }
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("key-listener: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn key-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for KeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread continues to exist blocked inside rdev::listen until
        // the process exits — this is safe and requires no further cleanup.
    }
}
