//! Matching raw key events against the configured hotkey.
//!
//! The matcher turns the raw event stream into clean [`HotkeyEdge`]s: one
//! `Down` per physical press and one `Up` per release, with OS key-repeat
//! suppressed by a latch.  It also implements one-shot capture mode, where
//! the next gesture becomes a new [`HotkeyDefinition`] instead of matching.
//!
//! # Release inference
//!
//! The raw stream carries no release events for ordinary keys, so a
//! `KeyCombo` release is inferred from the modifier state: while latched,
//! any modifier change that breaks the combo's required set emits `Up`.
//! A combo with an empty modifier set therefore has no detectable release;
//! such bindings only work with toggle activation.  This is a known
//! limitation of the event model, not something to patch around here.

use log::debug;

use super::{
    HotkeyDefinition, HotkeyEdge, HotkeyKind, KeyEventKind, Modifiers, RawKeyEvent,
};

/// What the matcher concluded about one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Event is unrelated to the binding (or a suppressed repeat).
    Ignored,
    /// The configured hotkey went down or up.
    Edge(HotkeyEdge),
    /// Capture mode was armed and this event defined a new binding.
    Captured(HotkeyDefinition),
}

/// Stateful matcher for one hotkey binding.
///
/// `latched` is `true` between an emitted `Down` and the matching `Up`;
/// while latched, further press events of the same gesture are ignored so
/// OS auto-repeat never produces duplicate edges.
#[derive(Debug, Default)]
pub struct HotkeyMatcher {
    latched: bool,
    capture_next: bool,
}

impl HotkeyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm one-shot capture: the next defining gesture is returned as
    /// [`MatchOutcome::Captured`] instead of being matched.
    pub fn arm_capture(&mut self) {
        debug!("hotkey: capture armed");
        self.capture_next = true;
        self.latched = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_next
    }

    /// Feed one raw event; returns the matching outcome.
    pub fn process(&mut self, event: &RawKeyEvent, def: &HotkeyDefinition) -> MatchOutcome {
        if self.capture_next {
            return self.capture(event);
        }
        match def.kind {
            HotkeyKind::GlobeOnly => self.match_globe(event),
            HotkeyKind::SingleModifier => self.match_single_modifier(event, def),
            HotkeyKind::KeyCombo => self.match_combo(event, def),
        }
    }

    // ---- per-kind matching -------------------------------------------------

    fn match_globe(&mut self, event: &RawKeyEvent) -> MatchOutcome {
        if event.kind != KeyEventKind::ModifierChange {
            return MatchOutcome::Ignored;
        }
        let globe_alone =
            event.modifiers.contains(Modifiers::GLOBE) && event.modifiers.is_single();
        if globe_alone && !self.latched {
            self.latched = true;
            return MatchOutcome::Edge(HotkeyEdge::Down);
        }
        if self.latched && !event.modifiers.contains(Modifiers::GLOBE) {
            self.latched = false;
            return MatchOutcome::Edge(HotkeyEdge::Up);
        }
        MatchOutcome::Ignored
    }

    fn match_single_modifier(
        &mut self,
        event: &RawKeyEvent,
        def: &HotkeyDefinition,
    ) -> MatchOutcome {
        if event.kind != KeyEventKind::ModifierChange {
            return MatchOutcome::Ignored;
        }
        let exclusive = event.modifiers == def.modifiers;
        if exclusive && !self.latched {
            self.latched = true;
            return MatchOutcome::Edge(HotkeyEdge::Down);
        }
        if self.latched && !event.modifiers.contains(def.modifiers) {
            self.latched = false;
            return MatchOutcome::Edge(HotkeyEdge::Up);
        }
        MatchOutcome::Ignored
    }

    fn match_combo(&mut self, event: &RawKeyEvent, def: &HotkeyDefinition) -> MatchOutcome {
        match event.kind {
            KeyEventKind::KeyDown => {
                // Exact modifier set: Ctrl+Shift+Space must not fire Ctrl+Space.
                let hit = event.key_code == def.key_code && event.modifiers == def.modifiers;
                if hit && !self.latched {
                    self.latched = true;
                    return MatchOutcome::Edge(HotkeyEdge::Down);
                }
                MatchOutcome::Ignored
            }
            KeyEventKind::ModifierChange => {
                // No release detection for a modifier-less combo.
                if self.latched
                    && !def.modifiers.is_empty()
                    && !event.modifiers.contains(def.modifiers)
                {
                    self.latched = false;
                    return MatchOutcome::Edge(HotkeyEdge::Up);
                }
                MatchOutcome::Ignored
            }
        }
    }

    // ---- capture mode ------------------------------------------------------

    fn capture(&mut self, event: &RawKeyEvent) -> MatchOutcome {
        let def = match event.kind {
            KeyEventKind::KeyDown => HotkeyDefinition {
                kind: HotkeyKind::KeyCombo,
                key_code: event.key_code,
                modifiers: event.modifiers,
                label: HotkeyDefinition::describe(
                    HotkeyKind::KeyCombo,
                    event.modifiers,
                    event.key_code,
                ),
            },
            KeyEventKind::ModifierChange => {
                if event.modifiers == Modifiers::GLOBE {
                    HotkeyDefinition {
                        kind: HotkeyKind::GlobeOnly,
                        key_code: 0,
                        modifiers: Modifiers::GLOBE,
                        label: "Globe".into(),
                    }
                } else if event.modifiers.is_single() {
                    HotkeyDefinition {
                        kind: HotkeyKind::SingleModifier,
                        key_code: 0,
                        modifiers: event.modifiers,
                        label: HotkeyDefinition::describe(
                            HotkeyKind::SingleModifier,
                            event.modifiers,
                            0,
                        ),
                    }
                } else {
                    // All modifiers released, or an ambiguous multi-modifier
                    // state: stay armed and wait for a defining gesture.
                    return MatchOutcome::Ignored;
                }
            }
        };
        debug!("hotkey: captured new binding '{}'", def.label);
        self.capture_next = false;
        self.latched = false;
        MatchOutcome::Captured(def)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::parse_hotkey;

    fn modifier_change(modifiers: Modifiers) -> RawKeyEvent {
        RawKeyEvent { modifiers, key_code: 0, kind: KeyEventKind::ModifierChange }
    }

    fn key_down(key_code: u32, modifiers: Modifiers) -> RawKeyEvent {
        RawKeyEvent { modifiers, key_code, kind: KeyEventKind::KeyDown }
    }

    // ---- GlobeOnly ---------------------------------------------------------

    #[test]
    fn globe_down_and_up() {
        let def = parse_hotkey("Globe").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&modifier_change(Modifiers::GLOBE), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
        assert_eq!(
            m.process(&modifier_change(Modifiers::NONE), &def),
            MatchOutcome::Edge(HotkeyEdge::Up)
        );
    }

    #[test]
    fn globe_with_other_modifier_does_not_fire() {
        let def = parse_hotkey("Globe").unwrap();
        let mut m = HotkeyMatcher::new();

        let combined = Modifiers::GLOBE | Modifiers::SHIFT;
        assert_eq!(m.process(&modifier_change(combined), &def), MatchOutcome::Ignored);
    }

    #[test]
    fn globe_up_when_other_modifier_still_held() {
        let def = parse_hotkey("Globe").unwrap();
        let mut m = HotkeyMatcher::new();

        m.process(&modifier_change(Modifiers::GLOBE), &def);
        // Globe released while Shift got pressed in between.
        assert_eq!(
            m.process(&modifier_change(Modifiers::GLOBE | Modifiers::SHIFT), &def),
            MatchOutcome::Ignored
        );
        assert_eq!(
            m.process(&modifier_change(Modifiers::SHIFT), &def),
            MatchOutcome::Edge(HotkeyEdge::Up)
        );
    }

    // ---- SingleModifier ----------------------------------------------------

    #[test]
    fn single_modifier_down_and_up() {
        let def = parse_hotkey("Alt").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&modifier_change(Modifiers::ALT), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
        assert_eq!(
            m.process(&modifier_change(Modifiers::NONE), &def),
            MatchOutcome::Edge(HotkeyEdge::Up)
        );
    }

    #[test]
    fn single_modifier_requires_exclusivity() {
        let def = parse_hotkey("Alt").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&modifier_change(Modifiers::ALT | Modifiers::SHIFT), &def),
            MatchOutcome::Ignored
        );
    }

    // ---- KeyCombo ----------------------------------------------------------

    #[test]
    fn combo_down_on_exact_match() {
        let def = parse_hotkey("Ctrl+Space").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&key_down(0x20, Modifiers::CONTROL), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
    }

    #[test]
    fn combo_requires_exact_modifier_set() {
        let def = parse_hotkey("Ctrl+Space").unwrap();
        let mut m = HotkeyMatcher::new();

        // A superset of the required modifiers is a different chord.
        assert_eq!(
            m.process(&key_down(0x20, Modifiers::CONTROL | Modifiers::SHIFT), &def),
            MatchOutcome::Ignored
        );
        // Right key, no modifier.
        assert_eq!(m.process(&key_down(0x20, Modifiers::NONE), &def), MatchOutcome::Ignored);
        // Wrong key.
        assert_eq!(
            m.process(&key_down('A' as u32, Modifiers::CONTROL), &def),
            MatchOutcome::Ignored
        );
    }

    #[test]
    fn combo_release_inferred_from_modifier_drop() {
        let def = parse_hotkey("Ctrl+Space").unwrap();
        let mut m = HotkeyMatcher::new();

        m.process(&key_down(0x20, Modifiers::CONTROL), &def);
        assert_eq!(
            m.process(&modifier_change(Modifiers::NONE), &def),
            MatchOutcome::Edge(HotkeyEdge::Up)
        );
    }

    #[test]
    fn modifierless_combo_never_releases() {
        let def = parse_hotkey("F9").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&key_down(9, Modifiers::NONE), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
        // No modifier transition can break an empty required set.
        assert_eq!(
            m.process(&modifier_change(Modifiers::SHIFT), &def),
            MatchOutcome::Ignored
        );
        assert_eq!(m.process(&modifier_change(Modifiers::NONE), &def), MatchOutcome::Ignored);
    }

    // ---- latch -------------------------------------------------------------

    #[test]
    fn key_repeat_emits_single_down() {
        let def = parse_hotkey("Ctrl+Space").unwrap();
        let mut m = HotkeyMatcher::new();

        assert_eq!(
            m.process(&key_down(0x20, Modifiers::CONTROL), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
        // OS auto-repeat re-delivers the chord.
        for _ in 0..5 {
            assert_eq!(
                m.process(&key_down(0x20, Modifiers::CONTROL), &def),
                MatchOutcome::Ignored
            );
        }
        assert_eq!(
            m.process(&modifier_change(Modifiers::NONE), &def),
            MatchOutcome::Edge(HotkeyEdge::Up)
        );
        // Matcher is rearmed after the release.
        assert_eq!(
            m.process(&key_down(0x20, Modifiers::CONTROL), &def),
            MatchOutcome::Edge(HotkeyEdge::Down)
        );
    }

    // ---- capture mode ------------------------------------------------------

    #[test]
    fn capture_key_down_becomes_combo() {
        let def = parse_hotkey("Globe").unwrap();
        let mut m = HotkeyMatcher::new();
        m.arm_capture();

        let outcome = m.process(&key_down('D' as u32, Modifiers::CONTROL | Modifiers::SHIFT), &def);
        match outcome {
            MatchOutcome::Captured(new_def) => {
                assert_eq!(new_def.kind, HotkeyKind::KeyCombo);
                assert_eq!(new_def.key_code, 'D' as u32);
                assert_eq!(new_def.modifiers, Modifiers::CONTROL | Modifiers::SHIFT);
                assert_eq!(new_def.label, "Ctrl+Shift+D");
            }
            other => panic!("expected capture, got {other:?}"),
        }
        assert!(!m.is_capturing());
    }

    #[test]
    fn capture_globe_and_single_modifier() {
        let def = parse_hotkey("Ctrl+Space").unwrap();

        let mut m = HotkeyMatcher::new();
        m.arm_capture();
        match m.process(&modifier_change(Modifiers::GLOBE), &def) {
            MatchOutcome::Captured(d) => assert_eq!(d.kind, HotkeyKind::GlobeOnly),
            other => panic!("expected capture, got {other:?}"),
        }

        let mut m = HotkeyMatcher::new();
        m.arm_capture();
        match m.process(&modifier_change(Modifiers::META), &def) {
            MatchOutcome::Captured(d) => {
                assert_eq!(d.kind, HotkeyKind::SingleModifier);
                assert_eq!(d.modifiers, Modifiers::META);
                assert_eq!(d.label, "Meta");
            }
            other => panic!("expected capture, got {other:?}"),
        }
    }

    #[test]
    fn capture_stays_armed_on_empty_modifier_change() {
        let def = parse_hotkey("Globe").unwrap();
        let mut m = HotkeyMatcher::new();
        m.arm_capture();

        assert_eq!(m.process(&modifier_change(Modifiers::NONE), &def), MatchOutcome::Ignored);
        assert!(m.is_capturing());
    }
}
