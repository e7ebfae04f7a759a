use crate::config::Config;
use crate::game::altitude::AltitudeAxis;
use crate::game::checkpoint::Checkpoint;
use crate::game::cluster::{ClusterEngine, ClusterSample, ClusterStats};
use crate::game::indicator::{AgentId, AgentProgress, IndicatorFrame, IndicatorSmoother};
use log::{debug, info};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One agent as reported by the game for the current tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: AgentId,
    pub world_z: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub suppress_visibility: bool,
}

const fn default_active() -> bool {
    true
}

impl RosterEntry {
    pub const fn new(id: AgentId, world_z: f64) -> Self {
        Self {
            id,
            world_z,
            active: true,
            suppress_visibility: false,
        }
    }

    #[inline(always)]
    fn is_trackable(&self) -> bool {
        self.active && self.world_z.is_finite()
    }
}

/// Per-session driver: owns one `AgentProgress` per tracked agent and runs
/// normalization, clustering and smoothing once per tick.
pub struct HeightMeter {
    config: Config,
    axis: AltitudeAxis,
    // Arrival order; `index` maps ids into it.
    agents: Vec<AgentProgress>,
    index: FxHashMap<AgentId, usize>,
    clusters: ClusterEngine,
    smoother: IndicatorSmoother,
    last_target_refresh: Option<f64>,
    samples: Vec<ClusterSample>,
    frames: Vec<IndicatorFrame>,
}

impl HeightMeter {
    pub fn new(config: Config, axis: AltitudeAxis) -> Self {
        Self {
            clusters: ClusterEngine::new(config.cluster),
            smoother: IndicatorSmoother::new(config.smoothing),
            config,
            axis,
            agents: Vec::new(),
            index: FxHashMap::default(),
            last_target_refresh: None,
            samples: Vec::new(),
            frames: Vec::new(),
        }
    }

    #[inline(always)]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline(always)]
    pub const fn axis(&self) -> &AltitudeAxis {
        &self.axis
    }

    /// Swaps in a freshly aggregated axis (new session). Targets are refreshed
    /// and clusters recomputed on the next tick.
    pub fn set_axis(&mut self, axis: AltitudeAxis) {
        info!(
            "Height axis replaced ({} checkpoints).",
            axis.checkpoints().len()
        );
        self.axis = axis;
        self.last_target_refresh = None;
        self.clusters.reset();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            info!("Height meter {}", if enabled { "enabled" } else { "disabled" });
        }
        self.config.enabled = enabled;
    }

    #[inline(always)]
    pub fn agents(&self) -> &[AgentProgress] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentProgress> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    /// Frames produced by the last tick that reported a change.
    #[inline(always)]
    pub fn frames(&self) -> &[IndicatorFrame] {
        &self.frames
    }

    #[inline(always)]
    pub const fn cluster_stats(&self) -> ClusterStats {
        self.clusters.stats()
    }

    /// Checkpoint markers for the altitude bar, empty when markers are off.
    pub fn markers(&self) -> &[Checkpoint] {
        if self.config.show_progress_markers {
            self.axis.checkpoints()
        } else {
            &[]
        }
    }

    /// Runs one tick. `now` is the session clock and `dt` the time since the
    /// previous tick, both in seconds. Returns the new frames only when they
    /// differ from the previous tick's.
    pub fn tick(
        &mut self,
        now: f64,
        dt: f64,
        roster: &[RosterEntry],
    ) -> Option<&[IndicatorFrame]> {
        if !self.config.enabled {
            if self.frames.is_empty() {
                return None;
            }
            self.frames.clear();
            return Some(&self.frames);
        }

        let live: FxHashMap<AgentId, &RosterEntry> = roster
            .iter()
            .filter(|e| e.is_trackable())
            .map(|e| (e.id, e))
            .collect();
        let roster_changed = self.sync_roster(roster, &live);

        let refresh_due = roster_changed
            || self
                .last_target_refresh
                .is_none_or(|last| now < last || now - last >= self.config.update_interval);
        if refresh_due {
            for agent in &mut self.agents {
                if let Some(entry) = live.get(&agent.id) {
                    agent.set_target(entry.world_z, self.axis.normalize(entry.world_z));
                }
            }
            self.last_target_refresh = Some(now);
        }
        for agent in &mut self.agents {
            agent.force_hidden = live.get(&agent.id).is_some_and(|e| e.suppress_visibility);
        }

        self.samples.clear();
        self.samples.extend(self.agents.iter().map(|a| ClusterSample {
            id: a.id,
            normalized: a.current_normalized,
            active: true,
        }));
        self.clusters.process(now, &self.samples);

        let dt = dt as f32;
        for agent in &mut self.agents {
            agent.target_offset = self.clusters.offset_for(agent.id);
            self.smoother.step(agent, dt);
        }

        let frames: Vec<IndicatorFrame> = self
            .agents
            .iter()
            .map(|a| {
                let next = if self.config.show_next_checkpoint {
                    self.axis.next_unreached_checkpoint(a.raw_z)
                } else {
                    None
                };
                self.config
                    .layout
                    .frame(a, self.axis.to_display_units(a.raw_z), next)
            })
            .collect();

        if frames == self.frames {
            return None;
        }
        self.frames = frames;
        Some(&self.frames)
    }

    /// Drops agents that are no longer trackable and starts tracking new ones.
    /// Returns true when the tracked set changed.
    fn sync_roster(
        &mut self,
        roster: &[RosterEntry],
        live: &FxHashMap<AgentId, &RosterEntry>,
    ) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| {
            let keep = live.contains_key(&a.id);
            if !keep {
                debug!("Agent {:?} removed", a.id);
            }
            keep
        });
        let mut changed = self.agents.len() != before;
        if changed {
            self.index.clear();
            for (i, a) in self.agents.iter().enumerate() {
                self.index.insert(a.id, i);
            }
        }

        for entry in roster.iter().filter(|e| e.is_trackable()) {
            if self.index.contains_key(&entry.id) {
                continue;
            }
            let normalized = self.axis.normalize(entry.world_z);
            debug!("Agent {:?} added at {normalized:.3}", entry.id);
            self.index.insert(entry.id, self.agents.len());
            self.agents
                .push(AgentProgress::new(entry.id, entry.world_z, normalized));
            changed = true;
        }
        changed
    }
}
