use crate::game::altitude::DISPLAY_SPAN;
use crate::game::cluster::ClusterSettings;
use crate::game::indicator::{IndicatorLayout, SmoothingSettings};
use ini::Ini;
use log::{info, warn};
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH: &str = "heightmeter.ini";

const MIN_UPDATE_INTERVAL: f64 = 0.05;
const MAX_UPDATE_INTERVAL: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub enabled: bool,
    pub log_level: LogLevel,
    pub show_progress_markers: bool,
    pub show_next_checkpoint: bool,
    pub display_span: f64,
    pub layout: IndicatorLayout,
    pub cluster: ClusterSettings,
    pub smoothing: SmoothingSettings,
    /// Seconds between refreshes of agent targets from world positions.
    pub update_interval: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: LogLevel::Warn,
            show_progress_markers: true,
            show_next_checkpoint: false,
            display_span: DISPLAY_SPAN,
            layout: IndicatorLayout::default(),
            cluster: ClusterSettings::default(),
            smoothing: SmoothingSettings::default(),
            update_interval: 0.1,
        }
    }
}

// --- Value parsing ---

fn parse_bool(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

#[inline(always)]
fn get_bool(conf: &Ini, section: &str, key: &str, default: bool) -> bool {
    conf.get_from(Some(section), key)
        .and_then(parse_bool)
        .unwrap_or(default)
}

#[inline(always)]
fn get_f32(conf: &Ini, section: &str, key: &str, default: f32) -> f32 {
    conf.get_from(Some(section), key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[inline(always)]
fn get_f64(conf: &Ini, section: &str, key: &str, default: f64) -> f64 {
    conf.get_from(Some(section), key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[inline(always)]
const fn bool_str(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

impl Config {
    /// Builds a config from parsed INI data, using defaults for missing or
    /// malformed keys and clamping values to their usable ranges.
    pub fn from_ini(conf: &Ini) -> Self {
        let d = Self::default();

        let layout = IndicatorLayout {
            bar_left: get_f32(conf, "Display", "BarLeft", d.layout.bar_left),
            bar_bottom: get_f32(conf, "Display", "BarBottom", d.layout.bar_bottom),
            bar_height: get_f32(conf, "Display", "BarHeight", d.layout.bar_height).max(0.0),
            label_offset: glam::Vec2::new(
                get_f32(conf, "Display", "LabelOffsetX", d.layout.label_offset.x),
                get_f32(conf, "Display", "LabelOffsetY", d.layout.label_offset.y),
            ),
        };
        let cluster = ClusterSettings {
            height_threshold: get_f32(
                conf,
                "Clustering",
                "HeightThreshold",
                d.cluster.height_threshold,
            )
            .max(0.0),
            vertical_spacing: get_f32(
                conf,
                "Clustering",
                "VerticalSpacing",
                d.cluster.vertical_spacing,
            )
            .max(0.0),
            recompute_interval: get_f64(
                conf,
                "Clustering",
                "RecomputeInterval",
                d.cluster.recompute_interval,
            )
            .max(0.0),
        };
        let smoothing = SmoothingSettings {
            position_rate: get_f32(conf, "Smoothing", "PositionRate", d.smoothing.position_rate)
                .max(0.0),
            offset_rate: get_f32(conf, "Smoothing", "OffsetRate", d.smoothing.offset_rate)
                .max(0.0),
            alpha_rate: get_f32(conf, "Smoothing", "AlphaRate", d.smoothing.alpha_rate).max(0.0),
            edge_band: get_f32(conf, "Smoothing", "EdgeBand", d.smoothing.edge_band)
                .clamp(0.0, 0.5),
        };

        Self {
            enabled: get_bool(conf, "General", "Enabled", d.enabled),
            log_level: conf
                .get_from(Some("General"), "LogLevel")
                .and_then(|v| LogLevel::from_str(v).ok())
                .unwrap_or(d.log_level),
            show_progress_markers: get_bool(
                conf,
                "Display",
                "ShowProgressMarkers",
                d.show_progress_markers,
            ),
            show_next_checkpoint: get_bool(
                conf,
                "Display",
                "ShowNextCheckpoint",
                d.show_next_checkpoint,
            ),
            display_span: {
                let span = get_f64(conf, "Display", "DisplaySpan", d.display_span);
                if span > 0.0 { span } else { d.display_span }
            },
            layout,
            cluster,
            smoothing,
            update_interval: get_f64(conf, "Performance", "UpdateInterval", d.update_interval)
                .clamp(MIN_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL),
        }
    }

    pub fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        conf.with_section(Some("General"))
            .set("Enabled", bool_str(self.enabled))
            .set("LogLevel", self.log_level.as_str());
        conf.with_section(Some("Display"))
            .set("BarBottom", self.layout.bar_bottom.to_string())
            .set("BarHeight", self.layout.bar_height.to_string())
            .set("BarLeft", self.layout.bar_left.to_string())
            .set("DisplaySpan", self.display_span.to_string())
            .set("LabelOffsetX", self.layout.label_offset.x.to_string())
            .set("LabelOffsetY", self.layout.label_offset.y.to_string())
            .set("ShowNextCheckpoint", bool_str(self.show_next_checkpoint))
            .set("ShowProgressMarkers", bool_str(self.show_progress_markers));
        conf.with_section(Some("Clustering"))
            .set("HeightThreshold", self.cluster.height_threshold.to_string())
            .set("RecomputeInterval", self.cluster.recompute_interval.to_string())
            .set("VerticalSpacing", self.cluster.vertical_spacing.to_string());
        conf.with_section(Some("Smoothing"))
            .set("AlphaRate", self.smoothing.alpha_rate.to_string())
            .set("EdgeBand", self.smoothing.edge_band.to_string())
            .set("OffsetRate", self.smoothing.offset_rate.to_string())
            .set("PositionRate", self.smoothing.position_rate.to_string());
        conf.with_section(Some("Performance"))
            .set("UpdateInterval", self.update_interval.to_string());
        conf
    }
}

// --- File I/O ---

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    Config::default().to_ini().write_to_file(path)
}

/// Loads the config at `path`, writing a default file first when it does not
/// exist. Any failure is logged and the defaults are returned.
pub fn load(path: impl AsRef<Path>) -> Config {
    let path = path.as_ref();
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(path) {
        Ok(conf) => {
            let cfg = Config::from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!(
                "Failed to load '{}': {e}. Using default settings.",
                path.display()
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        let conf = Ini::load_from_str(text).expect("test INI should parse");
        Config::from_ini(&conf)
    }

    #[test]
    fn empty_ini_yields_defaults() {
        assert_eq!(parse(""), Config::default());
    }

    #[test]
    fn reads_every_section() {
        let cfg = parse(
            "[General]\nEnabled=0\nLogLevel=debug\n\
             [Display]\nShowNextCheckpoint=yes\nShowProgressMarkers=off\nDisplaySpan=1000\nBarHeight=300\nLabelOffsetX=30\n\
             [Clustering]\nHeightThreshold=0.03\nVerticalSpacing=20\nRecomputeInterval=0.25\n\
             [Smoothing]\nPositionRate=4\nOffsetRate=9\nAlphaRate=12\nEdgeBand=0.1\n\
             [Performance]\nUpdateInterval=0.2\n",
        );
        assert!(!cfg.enabled);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert!(cfg.show_next_checkpoint);
        assert!(!cfg.show_progress_markers);
        assert_eq!(cfg.display_span, 1000.0);
        assert_eq!(cfg.layout.bar_height, 300.0);
        assert_eq!(cfg.layout.label_offset.x, 30.0);
        assert_eq!(cfg.layout.bar_left, 80.0);
        assert_eq!(cfg.cluster.height_threshold, 0.03);
        assert_eq!(cfg.cluster.vertical_spacing, 20.0);
        assert_eq!(cfg.cluster.recompute_interval, 0.25);
        assert_eq!(cfg.smoothing.position_rate, 4.0);
        assert_eq!(cfg.smoothing.offset_rate, 9.0);
        assert_eq!(cfg.smoothing.alpha_rate, 12.0);
        assert_eq!(cfg.smoothing.edge_band, 0.1);
        assert_eq!(cfg.update_interval, 0.2);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = parse(
            "[Performance]\nUpdateInterval=5\n\
             [Smoothing]\nEdgeBand=0.9\nPositionRate=-3\n\
             [Display]\nDisplaySpan=-10\n",
        );
        assert_eq!(cfg.update_interval, MAX_UPDATE_INTERVAL);
        assert_eq!(cfg.smoothing.edge_band, 0.5);
        assert_eq!(cfg.smoothing.position_rate, 0.0);
        assert_eq!(cfg.display_span, DISPLAY_SPAN);

        let cfg = parse("[Performance]\nUpdateInterval=0.001\n");
        assert_eq!(cfg.update_interval, MIN_UPDATE_INTERVAL);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let cfg = parse(
            "[General]\nEnabled=maybe\nLogLevel=loud\n\
             [Clustering]\nHeightThreshold=abc\nVerticalSpacing=NaN\n",
        );
        let d = Config::default();
        assert_eq!(cfg.enabled, d.enabled);
        assert_eq!(cfg.log_level, d.log_level);
        assert_eq!(cfg.cluster.height_threshold, d.cluster.height_threshold);
        assert_eq!(cfg.cluster.vertical_spacing, d.cluster.vertical_spacing);
    }

    #[test]
    fn written_defaults_read_back_identically() {
        let mut buf = Vec::new();
        Config::default()
            .to_ini()
            .write_to(&mut buf)
            .expect("writing to memory should not fail");
        let text = String::from_utf8(buf).expect("INI output should be UTF-8");
        assert_eq!(parse(&text), Config::default());
    }

    #[test]
    fn load_creates_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "heightmeter-config-test-{}.ini",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let cfg = load(&path);
        assert_eq!(cfg, Config::default());
        assert!(path.exists(), "default config should have been written");

        std::fs::write(&path, "[Clustering]\nVerticalSpacing=40\n").unwrap();
        assert_eq!(load(&path).cluster.vertical_spacing, 40.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn log_levels_parse_case_insensitively() {
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("off".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Info.as_level_filter(), log::LevelFilter::Info);
    }
}
