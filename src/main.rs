use heightmeter::config::{self, CONFIG_PATH};
use heightmeter::game::checkpoint::{Checkpoint, SegmentBoundary, Waypoint};
use heightmeter::game::indicator::IndicatorFrame;
use heightmeter::ui::label;
use heightmeter::{AgentId, AltitudeAxis, HeightMeter, RosterEntry};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;

const SYNTHETIC_DT: f64 = 1.0 / 60.0;
const SYNTHETIC_TICKS: usize = 900;

#[derive(Debug, Deserialize)]
struct Session {
    #[serde(default)]
    checkpoints: Vec<Waypoint>,
    #[serde(default)]
    segments: Vec<SegmentBoundary>,
    #[serde(default)]
    local_z: Option<f64>,
    ticks: Vec<TickInput>,
}

#[derive(Debug, Deserialize)]
struct TickInput {
    dt: f64,
    roster: Vec<RosterEntry>,
}

#[derive(Serialize)]
struct MarkerLine<'a> {
    markers: &'a [Checkpoint],
}

#[derive(Serialize)]
struct FrameLine<'a> {
    t: f64,
    frames: &'a [IndicatorFrame],
}

/// Six climbers on a 0..1200 climb. Two move in lockstep so their labels
/// stack, one leaves halfway through.
fn synthetic_session() -> Session {
    let checkpoints = vec![
        Waypoint::new("Shore", 0.0, true),
        Waypoint::new("Ledge", 180.0, false),
        Waypoint::new("Cave", 640.0, false),
    ];
    let segments = vec![
        SegmentBoundary::new("Beach", 0.02),
        SegmentBoundary::new("Tropics", 300.0),
        SegmentBoundary::new("Alpine", 750.0),
        SegmentBoundary::new("Caldera", 1200.0),
    ];
    let speeds = [30.0, 30.0, 42.0, 18.0, 55.0, 31.5];

    let mut ticks = Vec::with_capacity(SYNTHETIC_TICKS);
    for step in 0..SYNTHETIC_TICKS {
        let t = step as f64 * SYNTHETIC_DT;
        let roster = speeds
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != 4 || t < 7.5)
            .map(|(i, speed)| RosterEntry::new(AgentId(i as u64), 20.0 + speed * t))
            .collect();
        ticks.push(TickInput {
            dt: SYNTHETIC_DT,
            roster,
        });
    }

    Session {
        checkpoints,
        segments,
        local_z: Some(20.0),
        ticks,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    log::set_max_level(log::LevelFilter::Warn);

    let cfg = config::load(CONFIG_PATH);
    log::set_max_level(cfg.log_level.as_level_filter());

    let session = match std::env::args_os().nth(1) {
        Some(path) => {
            info!("Replaying session from {}", path.to_string_lossy());
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Session>(&text)?
        }
        None => {
            info!("No session file given, running the synthetic climb.");
            synthetic_session()
        }
    };

    let axis = match AltitudeAxis::aggregate_with_span(
        &session.checkpoints,
        &session.segments,
        session.local_z,
        cfg.display_span,
    ) {
        Ok(axis) => axis,
        Err(e) => {
            warn!("Height axis unavailable: {e}");
            return Err(e.into());
        }
    };

    let mut meter = HeightMeter::new(cfg, axis);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    serde_json::to_writer(
        &mut out,
        &MarkerLine {
            markers: meter.markers(),
        },
    )?;
    writeln!(out)?;
    for cp in meter.markers() {
        debug!("{}", label::marker_label(cp));
    }

    let mut now = 0.0_f64;
    let mut changed_ticks = 0usize;
    for tick in &session.ticks {
        now += tick.dt;
        let Some(frames) = meter.tick(now, tick.dt, &tick.roster) else {
            continue;
        };
        changed_ticks += 1;
        serde_json::to_writer(&mut out, &FrameLine { t: now, frames })?;
        writeln!(out)?;

        if log::log_enabled!(log::Level::Trace) {
            for f in frames {
                let name = format!("Agent {}", f.id.0);
                log::trace!("{}", label::indicator_label(&name, f.display_height));
                if let Some(next) = &f.next_checkpoint {
                    log::trace!("  {}", label::next_checkpoint_label(next));
                }
            }
        }
    }

    let stats = meter.cluster_stats();
    info!(
        "Replayed {} ticks ({} changed); final clusters: {} (largest {})",
        session.ticks.len(),
        changed_ticks,
        stats.clusters,
        stats.largest
    );
    Ok(())
}
