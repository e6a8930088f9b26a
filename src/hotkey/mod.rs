//! Hotkey event model, matcher and activation state machine.
//!
//! # Architecture
//!
//! ```text
//! OS key events (rdev thread) ──▶ RawKeyEvent (mpsc)
//!                                     │
//!                                     ▼
//!                              HotkeyMatcher ──▶ HotkeyEdge { Down, Up }
//!                                     │
//!                                     ▼
//!                          ActivationStateMachine ──▶ SessionCommand
//! ```
//!
//! The matcher and the activation machine are pure state-transition
//! functions over explicit state values, so they are unit-testable without
//! any OS dependency.  Only [`listener::KeyListener`] touches `rdev`.
//!
//! A [`HotkeyDefinition`] is an immutable value: reconfiguration swaps the
//! whole definition rather than mutating it in place, so the event-matching
//! loop and a configuration writer can never race on a half-updated binding.

pub mod activation;
pub mod listener;
pub mod matcher;

pub use activation::{ActivationStateMachine, SessionCommand};
pub use listener::KeyListener;
pub use matcher::{HotkeyMatcher, MatchOutcome};

use std::ops::BitOr;

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Bitmask of the tracked modifier keys.
///
/// `GLOBE` is the function-layer key (the "Globe"/Fn key on Mac-style
/// keyboards); the other four are the conventional modifiers.  Untracked
/// keys never appear in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const CONTROL: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const META: Modifiers = Modifiers(1 << 3);
    pub const GLOBE: Modifiers = Modifiers(1 << 4);

    /// `true` when every bit of `other` is set in `self`.
    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when no tracked modifier is held.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `self` with the bits of `other` cleared.
    pub fn without(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 & !other.0)
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: Modifiers) {
        self.0 &= !other.0;
    }

    /// `true` when exactly one tracked modifier bit is set.
    pub fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Human-readable names of the held modifiers, in canonical order.
    pub fn names(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(Self::GLOBE) {
            out.push("Globe");
        }
        if self.contains(Self::CONTROL) {
            out.push("Ctrl");
        }
        if self.contains(Self::ALT) {
            out.push("Alt");
        }
        if self.contains(Self::SHIFT) {
            out.push("Shift");
        }
        if self.contains(Self::META) {
            out.push("Meta");
        }
        out
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// RawKeyEvent
// ---------------------------------------------------------------------------

/// The kind of raw event the key-event source delivers.
///
/// Note the asymmetry: key *releases* of ordinary keys are not part of the
/// event model — the matcher infers combo release from modifier state (see
/// [`matcher`] for the documented limitation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    /// The set of held modifiers changed; `key_code` is `0`.
    ModifierChange,
    /// An ordinary (non-modifier) key went down.
    KeyDown,
}

/// One raw event from the key-event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Modifiers held at the time of the event (after applying it).
    pub modifiers: Modifiers,
    /// Key code for `KeyDown` events; `0` for `ModifierChange`.
    pub key_code: u32,
    pub kind: KeyEventKind,
}

// ---------------------------------------------------------------------------
// HotkeyDefinition
// ---------------------------------------------------------------------------

/// Which class of gesture a hotkey definition matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyKind {
    /// The function-layer key alone, with no other modifier held.
    GlobeOnly,
    /// A single designated modifier key held exclusively.
    SingleModifier,
    /// An ordinary key plus an exact set of modifiers.
    KeyCombo,
}

/// An immutable hotkey binding.
///
/// Replaced wholesale on reconfiguration — never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyDefinition {
    pub kind: HotkeyKind,
    /// Key code for `KeyCombo`; `0` otherwise.
    pub key_code: u32,
    /// Required modifier set.  For `SingleModifier` this is the single
    /// designated bit; for `GlobeOnly` it is `Modifiers::GLOBE`.
    pub modifiers: Modifiers,
    /// Display label, e.g. `"Ctrl+Space"`.
    pub label: String,
}

impl HotkeyDefinition {
    /// Build the display label for a kind/modifiers/key combination.
    pub fn describe(kind: HotkeyKind, modifiers: Modifiers, key_code: u32) -> String {
        match kind {
            HotkeyKind::GlobeOnly => "Globe".to_string(),
            HotkeyKind::SingleModifier => {
                modifiers.names().first().copied().unwrap_or("?").to_string()
            }
            HotkeyKind::KeyCombo => {
                let mut parts: Vec<String> =
                    modifiers.names().into_iter().map(str::to_string).collect();
                parts.push(key_name(key_code));
                parts.join("+")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyEdge
// ---------------------------------------------------------------------------

/// A matched transition of the configured hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEdge {
    Down,
    Up,
}

// ---------------------------------------------------------------------------
// Key names and codes
// ---------------------------------------------------------------------------

/// Parse a single key name into its stable key code.
///
/// Supports F1–F12, letters, digits and a handful of named keys.  Key codes
/// are an internal stable numbering (they are not OS scan codes); the
/// listener maps `rdev` keys onto the same numbering.
pub fn parse_key_name(name: &str) -> Option<u32> {
    // F1..F12 → 1..12
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=12).contains(&n) {
            return Some(n);
        }
    }

    match name {
        "Space" => return Some(0x20),
        "Return" | "Enter" => return Some(0x0D),
        "Tab" => return Some(0x09),
        "Escape" | "Esc" => return Some(0x1B),
        _ => {}
    }

    // Single ASCII letter or digit → its uppercase code point.
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase() as u32),
        _ => None,
    }
}

/// Reverse of [`parse_key_name`] for display labels.
pub fn key_name(code: u32) -> String {
    match code {
        1..=12 => format!("F{code}"),
        0x20 => "Space".to_string(),
        0x0D => "Return".to_string(),
        0x09 => "Tab".to_string(),
        0x1B => "Escape".to_string(),
        c => char::from_u32(c).map(|c| c.to_string()).unwrap_or_else(|| format!("#{c}")),
    }
}

/// Parse a modifier name into its bit.
fn modifier_name(name: &str) -> Option<Modifiers> {
    match name {
        "Shift" => Some(Modifiers::SHIFT),
        "Ctrl" | "Control" => Some(Modifiers::CONTROL),
        "Alt" | "Option" => Some(Modifiers::ALT),
        "Meta" | "Cmd" | "Super" => Some(Modifiers::META),
        "Globe" | "Fn" => Some(Modifiers::GLOBE),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// parse_hotkey
// ---------------------------------------------------------------------------

/// Parse a config binding string into a [`HotkeyDefinition`].
///
/// Three forms are recognised:
///
/// - `"Globe"` / `"Fn"` — the function-layer key alone ([`HotkeyKind::GlobeOnly`]).
/// - A single modifier name (`"Shift"`, `"Ctrl"`, `"Alt"`, `"Meta"`) —
///   that modifier held exclusively ([`HotkeyKind::SingleModifier`]).
/// - `"Mod+...+Key"` or a bare key name (`"Ctrl+Space"`, `"F9"`) —
///   a key combo ([`HotkeyKind::KeyCombo`]).
///
/// Returns `None` for unrecognised names so callers can fall back to a
/// default or surface an error.
///
/// # Examples
///
/// ```
/// use dictate::hotkey::{parse_hotkey, HotkeyKind, Modifiers};
///
/// let combo = parse_hotkey("Ctrl+Space").unwrap();
/// assert_eq!(combo.kind, HotkeyKind::KeyCombo);
/// assert_eq!(combo.modifiers, Modifiers::CONTROL);
///
/// let globe = parse_hotkey("Globe").unwrap();
/// assert_eq!(globe.kind, HotkeyKind::GlobeOnly);
///
/// assert!(parse_hotkey("Hyper+Q").is_none());
/// ```
pub fn parse_hotkey(binding: &str) -> Option<HotkeyDefinition> {
    let parts: Vec<&str> = binding.split('+').map(str::trim).collect();

    if parts.len() == 1 {
        let name = parts[0];
        if matches!(name, "Globe" | "Fn") {
            return Some(HotkeyDefinition {
                kind: HotkeyKind::GlobeOnly,
                key_code: 0,
                modifiers: Modifiers::GLOBE,
                label: "Globe".into(),
            });
        }
        if let Some(bit) = modifier_name(name) {
            return Some(HotkeyDefinition {
                kind: HotkeyKind::SingleModifier,
                key_code: 0,
                modifiers: bit,
                label: HotkeyDefinition::describe(HotkeyKind::SingleModifier, bit, 0),
            });
        }
        // Bare key — a combo with no required modifiers.  Release detection
        // for this form is unreliable; see the matcher docs.
        let key_code = parse_key_name(name)?;
        return Some(HotkeyDefinition {
            kind: HotkeyKind::KeyCombo,
            key_code,
            modifiers: Modifiers::NONE,
            label: key_name(key_code),
        });
    }

    // "Mod+...+Key": every part but the last must be a modifier.
    let (key, mods) = parts.split_last()?;
    let mut modifiers = Modifiers::NONE;
    for m in mods {
        modifiers.insert(modifier_name(m)?);
    }
    let key_code = parse_key_name(key)?;

    Some(HotkeyDefinition {
        kind: HotkeyKind::KeyCombo,
        key_code,
        modifiers,
        label: HotkeyDefinition::describe(HotkeyKind::KeyCombo, modifiers, key_code),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
