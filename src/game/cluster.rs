use crate::game::indicator::AgentId;
use glam::Vec2;
use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClusterSettings {
    /// Max normalized gap between neighbours that still chains them together.
    pub height_threshold: f32,
    pub vertical_spacing: f32,
    /// Seconds between recomputations while the active count stays the same.
    pub recompute_interval: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            height_threshold: 0.02,
            vertical_spacing: 25.0,
            recompute_interval: 0.1,
        }
    }
}

/// What the clustering pass needs to know about one agent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClusterSample {
    pub id: AgentId,
    pub normalized: f32,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub clusters: usize,
    pub largest: usize,
}

impl ClusterStats {
    #[inline(always)]
    fn record(&mut self, members: usize) {
        if members == 0 {
            return;
        }
        self.clusters += 1;
        self.largest = self.largest.max(members);
    }
}

type Member = (AgentId, f32);

/// Groups agents with close progress values and stacks their labels
/// vertically so they stay readable.
///
/// Grouping is single-linkage along the sorted progress values: each agent is
/// compared with the previous member of the running cluster only, so a long
/// chain of close neighbours ends up in one cluster even when its ends are
/// further apart than the threshold.
#[derive(Debug, Default)]
pub struct ClusterEngine {
    settings: ClusterSettings,
    offsets: FxHashMap<AgentId, Vec2>,
    stats: ClusterStats,
    last_active_count: usize,
    last_recompute: Option<f64>,
}

impl ClusterEngine {
    pub fn new(settings: ClusterSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[inline(always)]
    pub const fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    #[inline(always)]
    pub const fn stats(&self) -> ClusterStats {
        self.stats
    }

    /// Target offset for `id` from the last recomputation. Agents that were
    /// not part of a multi-member cluster (or not seen at all) get zero.
    #[inline(always)]
    pub fn offset_for(&self, id: AgentId) -> Vec2 {
        self.offsets.get(&id).copied().unwrap_or(Vec2::ZERO)
    }

    pub fn offsets(&self) -> &FxHashMap<AgentId, Vec2> {
        &self.offsets
    }

    pub fn should_recompute(&self, now: f64, active_count: usize) -> bool {
        match self.last_recompute {
            None => true,
            Some(last) => {
                // A clock that went backwards counts as due.
                active_count != self.last_active_count
                    || now < last
                    || now - last > self.settings.recompute_interval
            }
        }
    }

    /// Throttled entry point called once per tick. Returns true when the
    /// offsets were recomputed on this call.
    pub fn process(&mut self, now: f64, samples: &[ClusterSample]) -> bool {
        let active_count = samples.iter().filter(|s| is_usable(s)).count();
        if !self.should_recompute(now, active_count) {
            return false;
        }
        self.recompute(samples);
        self.last_active_count = active_count;
        self.last_recompute = Some(now);
        true
    }

    /// Unthrottled clustering pass over `samples`.
    pub fn recompute(&mut self, samples: &[ClusterSample]) {
        self.offsets.clear();
        self.stats = ClusterStats::default();

        let mut active: Vec<Member> = samples
            .iter()
            .filter(|s| is_usable(s))
            .map(|s| (s.id, s.normalized))
            .collect();
        for (id, _) in &active {
            self.offsets.insert(*id, Vec2::ZERO);
        }
        if active.len() <= 1 {
            self.stats.record(active.len());
            return;
        }

        // Stable, so equal progress values keep arrival order.
        active.sort_by(|a, b| a.1.total_cmp(&b.1));

        let threshold = self.settings.height_threshold;
        let spacing = self.settings.vertical_spacing;
        let mut cluster: SmallVec<[Member; 8]> = SmallVec::new();
        for &member in &active {
            if let Some(&(_, prev)) = cluster.last()
                && (member.1 - prev).abs() > threshold
            {
                self.stats.record(cluster.len());
                stack_cluster(&mut cluster, spacing, &mut self.offsets);
                cluster.clear();
            }
            cluster.push(member);
        }
        self.stats.record(cluster.len());
        stack_cluster(&mut cluster, spacing, &mut self.offsets);

        trace!(
            "Clustered {} agents into {} groups (largest {})",
            active.len(),
            self.stats.clusters,
            self.stats.largest
        );
    }

    pub fn reset(&mut self) {
        self.offsets.clear();
        self.stats = ClusterStats::default();
        self.last_active_count = 0;
        self.last_recompute = None;
    }
}

#[inline(always)]
fn is_usable(sample: &ClusterSample) -> bool {
    sample.active && sample.normalized.is_finite()
}

/// Highest progress value gets the largest upward offset, the lowest sits at 0.
fn stack_cluster(
    members: &mut [Member],
    spacing: f32,
    offsets: &mut FxHashMap<AgentId, Vec2>,
) {
    let count = members.len();
    if count < 2 {
        return;
    }
    members.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (i, (id, _)) in members.iter().enumerate() {
        let y = (count - 1 - i) as f32 * spacing;
        offsets.insert(*id, Vec2::new(0.0, y));
    }
}
