use crate::game::checkpoint::NextCheckpoint;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Alpha above which an indicator counts as shown.
pub const VISIBLE_ALPHA: f32 = 0.1;
// Indicators shrink slightly while faded out.
const HIDDEN_SCALE: f32 = 0.8;

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub u64);

/// Per-agent indicator state. The owner writes the targets, the smoother
/// moves the current values toward them.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentProgress {
    pub id: AgentId,
    pub raw_z: f64,
    pub target_normalized: f32,
    pub current_normalized: f32,
    pub target_offset: Vec2,
    pub current_offset: Vec2,
    pub alpha: f32,
    pub force_hidden: bool,
}

impl AgentProgress {
    /// Starts settled at `normalized` and fully transparent so the indicator
    /// fades in where the agent already is.
    pub fn new(id: AgentId, raw_z: f64, normalized: f32) -> Self {
        Self {
            id,
            raw_z,
            target_normalized: normalized,
            current_normalized: normalized,
            target_offset: Vec2::ZERO,
            current_offset: Vec2::ZERO,
            alpha: 0.0,
            force_hidden: false,
        }
    }

    #[inline(always)]
    pub fn set_target(&mut self, raw_z: f64, normalized: f32) {
        self.raw_z = raw_z;
        self.target_normalized = normalized;
    }

    #[inline(always)]
    pub fn is_visible(&self) -> bool {
        self.alpha > VISIBLE_ALPHA
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SmoothingSettings {
    pub position_rate: f32,
    pub offset_rate: f32,
    pub alpha_rate: f32,
    /// Normalized distance from either end over which indicators fade out.
    pub edge_band: f32,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            position_rate: 5.0,
            offset_rate: 8.0,
            alpha_rate: 10.0,
            edge_band: 0.05,
        }
    }
}

#[inline(always)]
fn approach_factor(dt: f32, rate: f32) -> f32 {
    // `clamp` passes NaN through, so reject it before it reaches the state.
    if !dt.is_finite() {
        return 0.0;
    }
    (dt * rate).clamp(0.0, 1.0)
}

#[inline(always)]
fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((v - a) / (b - a)).clamp(0.0, 1.0)
}

#[inline(always)]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Exponential smoothing of indicator position, label offset and alpha.
/// Holds only settings; all per-agent state lives in `AgentProgress`.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndicatorSmoother {
    settings: SmoothingSettings,
}

impl IndicatorSmoother {
    pub const fn new(settings: SmoothingSettings) -> Self {
        Self { settings }
    }

    #[inline(always)]
    pub const fn settings(&self) -> &SmoothingSettings {
        &self.settings
    }

    /// Alpha the indicator should settle at for a given smoothed position.
    pub fn target_alpha(&self, normalized: f32, force_hidden: bool) -> f32 {
        if force_hidden {
            return 0.0;
        }
        let band = self.settings.edge_band;
        if band > 0.0 && (normalized < band || normalized > 1.0 - band) {
            return inverse_lerp(0.0, band, normalized.min(1.0 - normalized));
        }
        1.0
    }

    /// One tick of smoothing. `dt` is the elapsed time in seconds; a
    /// non-positive or non-finite `dt` leaves the state untouched.
    pub fn step(&self, p: &mut AgentProgress, dt: f32) {
        let s = &self.settings;
        let k_pos = approach_factor(dt, s.position_rate);
        p.current_normalized += (p.target_normalized - p.current_normalized) * k_pos;

        let k_off = approach_factor(dt, s.offset_rate);
        p.current_offset += (p.target_offset - p.current_offset) * k_off;

        let target_alpha = self.target_alpha(p.current_normalized, p.force_hidden);
        let k_alpha = approach_factor(dt, s.alpha_rate);
        p.alpha = (p.alpha + (target_alpha - p.alpha) * k_alpha).clamp(0.0, 1.0);
    }
}

/// Where the indicator sits on screen: the marker rides the altitude bar,
/// the label hangs off it at `label_offset` plus the cluster offset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IndicatorLayout {
    pub bar_left: f32,
    pub bar_bottom: f32,
    pub bar_height: f32,
    pub label_offset: Vec2,
}

impl Default for IndicatorLayout {
    fn default() -> Self {
        Self {
            bar_left: 80.0,
            bar_bottom: 140.0,
            bar_height: 400.0,
            label_offset: Vec2::new(25.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub id: AgentId,
    pub position: Vec2,
    pub label_offset: Vec2,
    pub label_position: Vec2,
    pub alpha: f32,
    pub scale: f32,
    pub visible: bool,
    pub display_height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_checkpoint: Option<NextCheckpoint>,
}

impl IndicatorLayout {
    #[inline(always)]
    pub fn anchor(&self, normalized: f32) -> Vec2 {
        Vec2::new(self.bar_left, self.bar_bottom + self.bar_height * normalized)
    }

    pub fn frame(
        &self,
        p: &AgentProgress,
        display_height: f32,
        next_checkpoint: Option<NextCheckpoint>,
    ) -> IndicatorFrame {
        IndicatorFrame {
            id: p.id,
            position: self.anchor(p.current_normalized),
            label_offset: p.current_offset,
            label_position: self.label_offset + p.current_offset,
            alpha: p.alpha,
            scale: lerp(HIDDEN_SCALE, 1.0, p.alpha),
            visible: p.is_visible(),
            display_height,
            next_checkpoint,
        }
    }
}
