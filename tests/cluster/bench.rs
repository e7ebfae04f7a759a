use heightmeter::AgentId;
use heightmeter::game::cluster::{ClusterEngine, ClusterSample, ClusterSettings};
use std::hint::black_box;
use std::time::Instant;

const ROSTER_SIZES: [usize; 4] = [4, 16, 64, 1024];
const ITERATIONS: usize = 20_000;

// Low-discrepancy spread so every run sees the same mix of tight groups and
// loners.
fn roster(n: usize) -> Vec<ClusterSample> {
    const GOLDEN: f32 = 0.618_034;
    (0..n)
        .map(|i| ClusterSample {
            id: AgentId(i as u64),
            normalized: (i as f32 * GOLDEN).fract(),
            active: i % 17 != 0,
        })
        .collect()
}

fn main() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .try_init();

    for &n in &ROSTER_SIZES {
        let samples = roster(n);
        let mut engine = ClusterEngine::new(ClusterSettings::default());
        let iterations = (ITERATIONS / n.max(1)).max(100);

        let start = Instant::now();
        for _ in 0..iterations {
            engine.recompute(black_box(&samples));
        }
        let elapsed = start.elapsed();
        let stats = engine.stats();
        println!(
            "agents={n:5} iters={iterations:6} per_pass={:8.2}us clusters={} largest={}",
            elapsed.as_secs_f64() * 1e6 / iterations as f64,
            stats.clusters,
            stats.largest
        );
    }
}
