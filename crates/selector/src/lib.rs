//! Effect catalog and the policy that decides which single effect renders each frame.
//!
//! Manual toggles own the [`ActiveEffectSet`]. Gesture triggers are mapped through a
//! [`GestureTable`] and, depending on [`GestureMode`], are either surfaced for display only or
//! consulted when the manual set is empty.

use std::collections::BTreeMap;
use std::fmt;

use glitchconfig::GestureSection;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use glitchconfig::GestureMode;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unknown effect '{0}'")]
    UnknownEffect(String),
    #[error("gesture '{gesture}' maps to unknown effect '{effect}'")]
    UnknownMappedEffect { gesture: String, effect: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    #[serde(rename = "liquify")]
    Liquify,
    #[serde(rename = "vhs")]
    Vhs,
    #[serde(rename = "pixel_sort")]
    PixelSort,
    #[serde(rename = "matrix")]
    Matrix,
    #[serde(rename = "flipGravity")]
    FlipGravity,
    #[serde(rename = "slow_motion")]
    SlowMotion,
    #[serde(rename = "portal_ripple")]
    PortalRipple,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Liquify,
        EffectKind::Vhs,
        EffectKind::PixelSort,
        EffectKind::Matrix,
        EffectKind::FlipGravity,
        EffectKind::SlowMotion,
        EffectKind::PortalRipple,
    ];

    pub fn id(self) -> &'static str {
        self.descriptor().id
    }

    pub fn from_id(id: &str) -> Option<Self> {
        CATALOG
            .iter()
            .find(|descriptor| descriptor.id == id)
            .map(|descriptor| descriptor.kind)
    }

    pub fn descriptor(self) -> &'static EffectDescriptor {
        // CATALOG is indexed in declaration order.
        &CATALOG[self as usize]
    }

    pub fn shader_name(self) -> &'static str {
        self.descriptor().shader
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub id: &'static str,
    pub display_name: &'static str,
    pub trigger_gesture: &'static str,
    pub shader: &'static str,
}

pub const CATALOG: [EffectDescriptor; 7] = [
    EffectDescriptor {
        kind: EffectKind::Liquify,
        id: "liquify",
        display_name: "Liquify",
        trigger_gesture: "smile",
        shader: "liquify",
    },
    EffectDescriptor {
        kind: EffectKind::Vhs,
        id: "vhs",
        display_name: "VHS",
        trigger_gesture: "head_tilt",
        shader: "vhs",
    },
    EffectDescriptor {
        kind: EffectKind::PixelSort,
        id: "pixel_sort",
        display_name: "Pixel Sort",
        trigger_gesture: "eyebrow_raise",
        shader: "pixel_sort",
    },
    EffectDescriptor {
        kind: EffectKind::Matrix,
        id: "matrix",
        display_name: "Matrix",
        trigger_gesture: "raise_hand",
        shader: "matrix",
    },
    EffectDescriptor {
        kind: EffectKind::FlipGravity,
        id: "flipGravity",
        display_name: "Gravity Flip",
        trigger_gesture: "blink",
        shader: "gravity",
    },
    EffectDescriptor {
        kind: EffectKind::SlowMotion,
        id: "slow_motion",
        display_name: "Slow Motion",
        trigger_gesture: "both_hands_up",
        shader: "slow_motion",
    },
    EffectDescriptor {
        kind: EffectKind::PortalRipple,
        id: "portal_ripple",
        display_name: "Portal Ripple",
        trigger_gesture: "mouth_open",
        shader: "portal",
    },
];

/// Manually enabled effects in the order they were switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveEffectSet {
    order: Vec<EffectKind>,
}

impl ActiveEffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `kind`. Returns `true` when the effect is now enabled.
    pub fn toggle(&mut self, kind: EffectKind) -> bool {
        if self.remove(kind) {
            false
        } else {
            self.order.push(kind);
            true
        }
    }

    pub fn insert(&mut self, kind: EffectKind) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.order.push(kind);
        true
    }

    pub fn remove(&mut self, kind: EffectKind) -> bool {
        match self.order.iter().position(|existing| *existing == kind) {
            Some(index) => {
                self.order.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.order.contains(&kind)
    }

    pub fn first(&self) -> Option<EffectKind> {
        self.order.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = EffectKind> + '_ {
        self.order.iter().copied()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(EffectKind::id).collect()
    }

    pub fn as_slice(&self) -> &[EffectKind] {
        &self.order
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureTable {
    entries: BTreeMap<String, Vec<EffectKind>>,
}

impl Default for GestureTable {
    fn default() -> Self {
        let mut entries: BTreeMap<String, Vec<EffectKind>> = BTreeMap::new();
        for descriptor in &CATALOG {
            entries
                .entry(descriptor.trigger_gesture.to_string())
                .or_default()
                .push(descriptor.kind);
        }
        Self { entries }
    }
}

impl GestureTable {
    /// Builds the table from `[gestures.mappings]`, falling back to the catalog triggers when the
    /// section is empty.
    pub fn from_config(section: &GestureSection) -> Result<Self, SelectorError> {
        if section.mappings.is_empty() {
            return Ok(Self::default());
        }
        let mut entries = BTreeMap::new();
        for (gesture, ids) in &section.mappings {
            let mut kinds = Vec::with_capacity(ids.len());
            for id in ids {
                let kind =
                    EffectKind::from_id(id).ok_or_else(|| SelectorError::UnknownMappedEffect {
                        gesture: gesture.clone(),
                        effect: id.clone(),
                    })?;
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            entries.insert(gesture.clone(), kinds);
        }
        Ok(Self { entries })
    }

    pub fn effects_for(&self, gesture: &str) -> &[EffectKind] {
        self.entries.get(gesture).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Effects triggered by the gestures flagged `true`, deduplicated and in catalog order.
    pub fn triggered<'a, I>(&self, gestures: I) -> Vec<EffectKind>
    where
        I: IntoIterator<Item = (&'a String, &'a bool)>,
    {
        let mut triggered: Vec<EffectKind> = gestures
            .into_iter()
            .filter(|(_, active)| **active)
            .flat_map(|(label, _)| self.effects_for(label).iter().copied())
            .collect();
        triggered.sort();
        triggered.dedup();
        triggered
    }
}

/// Merges manual toggles and gesture triggers into the one effect to render.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    manual: ActiveEffectSet,
    table: GestureTable,
    mode: GestureMode,
    triggered: Vec<EffectKind>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::new(GestureTable::default(), GestureMode::Advisory)
    }
}

impl SelectionPolicy {
    pub fn new(table: GestureTable, mode: GestureMode) -> Self {
        Self {
            manual: ActiveEffectSet::new(),
            table,
            mode,
            triggered: Vec::new(),
        }
    }

    pub fn from_config(section: &GestureSection) -> Result<Self, SelectorError> {
        Ok(Self::new(GestureTable::from_config(section)?, section.mode))
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn table(&self) -> &GestureTable {
        &self.table
    }

    pub fn manual(&self) -> &ActiveEffectSet {
        &self.manual
    }

    pub fn toggle_effect(&mut self, id: &str) -> Result<&ActiveEffectSet, SelectorError> {
        let kind = EffectKind::from_id(id).ok_or_else(|| SelectorError::UnknownEffect(id.into()))?;
        let enabled = self.manual.toggle(kind);
        debug!(effect = id, enabled, "toggled effect");
        Ok(&self.manual)
    }

    /// Records the latest gesture signals. Never touches the manual set.
    pub fn observe_gestures<'a, I>(&mut self, gestures: I)
    where
        I: IntoIterator<Item = (&'a String, &'a bool)>,
    {
        self.triggered = self.table.triggered(gestures);
    }

    pub fn suggested(&self) -> &[EffectKind] {
        &self.triggered
    }

    /// The effect to render this frame, or `None` for an identity pass.
    pub fn select(&self) -> Option<EffectKind> {
        self.manual.first().or_else(|| match self.mode {
            GestureMode::Authoritative => self.triggered.first().copied(),
            GestureMode::Advisory => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gestures(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs
            .iter()
            .map(|(label, active)| (label.to_string(), *active))
            .collect()
    }

    #[test]
    fn catalog_is_indexed_by_kind() {
        for kind in EffectKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
            assert_eq!(EffectKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(EffectKind::FlipGravity.shader_name(), "gravity");
        assert_eq!(EffectKind::PortalRipple.shader_name(), "portal");
        assert_eq!(EffectKind::from_id("sepia"), None);
    }

    #[test]
    fn first_enabled_effect_wins() {
        let mut policy = SelectionPolicy::default();
        policy.toggle_effect("vhs").unwrap();
        policy.toggle_effect("matrix").unwrap();
        assert_eq!(policy.select(), Some(EffectKind::Vhs));

        policy.toggle_effect("vhs").unwrap();
        assert_eq!(policy.select(), Some(EffectKind::Matrix));

        policy.toggle_effect("matrix").unwrap();
        assert_eq!(policy.select(), None);
    }

    #[test]
    fn re_enabling_moves_effect_to_the_back() {
        let mut set = ActiveEffectSet::new();
        assert!(set.toggle(EffectKind::Liquify));
        assert!(set.toggle(EffectKind::Vhs));
        assert!(!set.toggle(EffectKind::Liquify));
        assert!(set.toggle(EffectKind::Liquify));
        assert_eq!(set.ids(), vec!["vhs", "liquify"]);
        assert!(!set.insert(EffectKind::Vhs));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unknown_toggle_is_rejected_without_changes() {
        let mut policy = SelectionPolicy::default();
        policy.toggle_effect("liquify").unwrap();
        let err = policy.toggle_effect("sepia").unwrap_err();
        assert_eq!(err, SelectorError::UnknownEffect("sepia".into()));
        assert_eq!(policy.manual().ids(), vec!["liquify"]);
    }

    #[test]
    fn advisory_gestures_never_render() {
        let mut policy = SelectionPolicy::default();
        policy.observe_gestures(&gestures(&[("smile", true), ("blink", false)]));
        assert_eq!(policy.suggested(), &[EffectKind::Liquify]);
        assert_eq!(policy.select(), None);
        assert!(policy.manual().is_empty());
    }

    #[test]
    fn authoritative_gestures_fill_an_empty_manual_set() {
        let mut policy = SelectionPolicy::new(GestureTable::default(), GestureMode::Authoritative);
        policy.observe_gestures(&gestures(&[("mouth_open", true), ("blink", true)]));
        // Catalog order: flipGravity precedes portal_ripple.
        assert_eq!(policy.select(), Some(EffectKind::FlipGravity));

        policy.toggle_effect("pixel_sort").unwrap();
        assert_eq!(policy.select(), Some(EffectKind::PixelSort));
        assert_eq!(policy.manual().ids(), vec!["pixel_sort"]);

        policy.toggle_effect("pixel_sort").unwrap();
        policy.observe_gestures(&gestures(&[("mouth_open", false)]));
        assert_eq!(policy.select(), None);
    }

    #[test]
    fn gesture_table_from_config() {
        let mut section = GestureSection::default();
        section
            .mappings
            .insert("wink".into(), vec!["vhs".into(), "vhs".into(), "matrix".into()]);
        let table = GestureTable::from_config(&section).unwrap();
        assert_eq!(table.effects_for("wink"), &[EffectKind::Vhs, EffectKind::Matrix]);
        assert!(table.effects_for("smile").is_empty());

        section.mappings.insert("nod".into(), vec!["sepia".into()]);
        let err = GestureTable::from_config(&section).unwrap_err();
        assert!(matches!(err, SelectorError::UnknownMappedEffect { .. }));
    }

    #[test]
    fn default_table_follows_catalog_triggers() {
        let table = GestureTable::from_config(&GestureSection::default()).unwrap();
        for descriptor in &CATALOG {
            assert_eq!(table.effects_for(descriptor.trigger_gesture), &[descriptor.kind]);
        }
    }
}
