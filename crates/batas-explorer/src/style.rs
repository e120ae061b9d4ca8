//! Overlay styling for the boundary layer.
//!
//! The overlay has exactly two looks. [`StyleRule`] decides per feature which
//! one applies, based on the selection it was built from; the map engine
//! evaluates the rule while drawing.

use crate::selection::Selection;
use batas_core::feature::FeatureProperties;
use batas_core::types::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with straight alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Stroke and fill of a rendered boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub stroke: Rgba,
    pub stroke_width: f32,
    pub fill: Rgba,
}

impl OverlayStyle {
    /// Thin blue outline, faint fill.
    pub const DEFAULT: OverlayStyle = OverlayStyle {
        stroke: Rgba::opaque(0x00, 0x77, 0xcc),
        stroke_width: 1.0,
        fill: Rgba::new(0, 119, 204, 0.1),
    };

    /// Thicker red outline, stronger red fill.
    pub const SELECTED: OverlayStyle = OverlayStyle {
        stroke: Rgba::opaque(0xff, 0x00, 0x00),
        stroke_width: 2.0,
        fill: Rgba::new(255, 0, 0, 0.2),
    };
}

/// Which of the two overlay styles a feature gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleVariant {
    Default,
    Selected,
}

impl StyleVariant {
    pub fn style(&self) -> &'static OverlayStyle {
        match self {
            StyleVariant::Default => &OverlayStyle::DEFAULT,
            StyleVariant::Selected => &OverlayStyle::SELECTED,
        }
    }
}

/// Per-feature style function for one selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleRule {
    selected: Option<EntityId>,
}

impl StyleRule {
    pub fn for_selection(selection: &Selection) -> Self {
        Self {
            selected: selection.current(),
        }
    }

    /// The selection this rule highlights.
    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    pub fn variant_for(&self, feature_id: Option<EntityId>) -> StyleVariant {
        match (feature_id, self.selected) {
            (Some(id), Some(selected)) if id == selected => StyleVariant::Selected,
            _ => StyleVariant::Default,
        }
    }

    pub fn style_for(&self, feature_id: Option<EntityId>) -> &'static OverlayStyle {
        self.variant_for(feature_id).style()
    }

    pub fn style_for_feature(&self, feature: &FeatureProperties) -> &'static OverlayStyle {
        self.style_for(feature.id())
    }
}
