//! # Geomaker CLI
//!
//! Command-line front end for the geometry generators.
//!
//! ## Commands
//! - `geometry` - Box collision geometry
//! - `view-geometry` - Box view geometry
//! - `fire-geometry` - Tessellated fire geometry
//! - `view-pilot` - View pilot copy
//! - `memory` - Memory points
//! - `lods` - LOD chain
//! - `all` - Every generator in turn
//! - `config` - Print the default configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use geomaker_assets::{ImportSettings, load_scene, save_scene};
use geomaker_core::Scene;
use geomaker_engine::{GenerationReport, GeneratorConfig, LodPolicy, PointCategories, Session};

/// Geomaker derived-geometry generator
#[derive(Parser)]
#[command(name = "geomaker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scene to read (.json scene or .obj mesh)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Source object name, defaults to the only mesh object
    #[arg(short = 's', long)]
    pub object: Option<String>,

    /// Scene to write, defaults to the input with a .json extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Generator configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Uniform scale applied when importing meshes
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// LOD simplification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Collapse,
    Merge,
}

impl From<PolicyArg> for LodPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Collapse => LodPolicy::Collapse,
            PolicyArg::Merge => LodPolicy::MergeByDistance,
        }
    }
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Box collision geometry
    Geometry,

    /// Box view geometry
    ViewGeometry,

    /// Tessellated fire geometry
    FireGeometry {
        /// Subdivision levels, 1 to 10
        #[arg(short, long)]
        quality: Option<u32>,
    },

    /// View pilot copy with per-group materials
    ViewPilot,

    /// Memory points
    Memory {
        /// ce_radius
        #[arg(long)]
        radius: bool,

        /// ce_center
        #[arg(long)]
        center: bool,

        /// konec hlavne, usti hlavne
        #[arg(long)]
        bullet_travel: bool,

        /// bolt_axis
        #[arg(long)]
        bolt_axis: bool,

        /// nabojnicestart, nabojniceend
        #[arg(long)]
        bullet_eject: bool,

        /// eye
        #[arg(long)]
        eye_ads: bool,

        /// Skip the bounding box and invview points
        #[arg(long)]
        no_default: bool,
    },

    /// LOD chain
    Lods {
        /// LOD indices to build, e.g. 1,2,3
        #[arg(short, long, value_delimiter = ',')]
        levels: Option<Vec<u8>>,

        /// Simplification past the first LOD
        #[arg(short, long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Every generator in turn
    All,

    /// Print the default configuration
    Config,
}

impl Commands {
    /// Fold command options into the configuration
    fn apply(&self, config: &mut GeneratorConfig) {
        match self {
            Commands::FireGeometry { quality: Some(quality) } => {
                config.shell.fire_quality = *quality;
            }
            Commands::Memory {
                radius,
                center,
                bullet_travel,
                bolt_axis,
                bullet_eject,
                eye_ads,
                no_default,
            } => {
                let mut requested = PointCategories::empty();
                requested.set(PointCategories::RADIUS, *radius);
                requested.set(PointCategories::CENTER, *center);
                requested.set(PointCategories::BULLET_TRAVEL, *bullet_travel);
                requested.set(PointCategories::BOLT_AXIS, *bolt_axis);
                requested.set(PointCategories::BULLET_EJECT, *bullet_eject);
                requested.set(PointCategories::EYE_ADS, *eye_ads);

                if !requested.is_empty() || *no_default {
                    if !*no_default {
                        requested |= PointCategories::DEFAULT;
                    }
                    config.memory.categories = requested;
                }
            }
            Commands::Lods { levels, policy } => {
                if let Some(levels) = levels {
                    config.lod.levels = levels.clone();
                }
                if let Some(policy) = policy {
                    config.lod.policy = (*policy).into();
                }
            }
            _ => {}
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = GeneratorConfig::from_json(&json)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// The only mesh object of the scene, if there is exactly one
fn sole_mesh_object(scene: &Scene) -> Option<String> {
    let mut meshes = scene.objects().filter(|o| o.mesh().is_some());
    let first = meshes.next()?;
    meshes.next().is_none().then(|| first.name.clone())
}

fn log_report(scene: &Scene, report: &GenerationReport) {
    for id in &report.created {
        if let Some(object) = scene.object(*id) {
            log::info!("  Created {}", object.name);
        }
    }
    for id in &report.modified {
        if let Some(object) = scene.object(*id) {
            log::info!("  Updated {}", object.name);
        }
    }
    if let Some(note) = &report.note {
        log::info!("{}", note);
    }
    if !report.warnings.is_empty() {
        log::warn!("{} budget warning(s)", report.warnings.len());
    }
}

/// Run a command without touching the logger
pub fn run(cli: Cli) -> Result<GenerationReport> {
    if let Commands::Config = cli.command {
        println!("{}", GeneratorConfig::default().to_json()?);
        return Ok(GenerationReport::default());
    }

    let Some(input) = cli.input.as_deref() else {
        bail!("No input scene given (use --input)");
    };

    let mut config = load_config(cli.config.as_deref())?;
    cli.command.apply(&mut config);

    let settings = ImportSettings {
        scale: cli.scale,
        ..ImportSettings::default()
    };
    let scene = load_scene(input, &settings)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    log::info!("Loaded {} objects from {}", scene.object_count(), input.display());

    let mut session = Session::new(scene);
    session.set_config(config)?;

    if let Some(name) = cli.object.clone().or_else(|| sole_mesh_object(session.scene())) {
        session.select_by_name(&name)?;
    }

    let report = match cli.command {
        Commands::Geometry => session.create_geometry()?,
        Commands::ViewGeometry => session.create_view_geometry()?,
        Commands::FireGeometry { .. } => session.create_fire_geometry()?,
        Commands::ViewPilot => session.create_view_pilot()?,
        Commands::Memory { .. } => session.create_memory_points()?,
        Commands::Lods { .. } => session.create_lods()?,
        Commands::All => session.create_all()?,
        Commands::Config => GenerationReport::default(),
    };
    log_report(session.scene(), &report);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("json"));
    save_scene(session.scene(), &output)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    Ok(report)
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    run(cli)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geomaker-cli-{}-{}", std::process::id(), name))
    }

    const QUAD_BOX: &str = "\
o Crate
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 3 4 8 7
f 2 3 7 6
f 1 5 8 4
";

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["geomaker", "-i", "scene.json", "geometry"]);
        assert!(matches!(cli.command, Commands::Geometry));
        assert_eq!(cli.input, Some(PathBuf::from("scene.json")));
    }

    #[test]
    fn test_lods_command() {
        let cli = Cli::parse_from(["geomaker", "lods", "--levels", "1,3,5", "-p", "merge"]);
        let mut config = GeneratorConfig::default();
        cli.command.apply(&mut config);
        assert_eq!(config.lod.levels, vec![1, 3, 5]);
        assert_eq!(config.lod.policy, LodPolicy::MergeByDistance);
    }

    #[test]
    fn test_memory_flags() {
        let mut config = GeneratorConfig::default();
        Cli::parse_from(["geomaker", "memory"]).command.apply(&mut config);
        assert_eq!(config.memory.categories, PointCategories::DEFAULT);

        Cli::parse_from(["geomaker", "memory", "--radius", "--eye-ads"])
            .command
            .apply(&mut config);
        assert_eq!(
            config.memory.categories,
            PointCategories::DEFAULT | PointCategories::RADIUS | PointCategories::EYE_ADS
        );

        Cli::parse_from(["geomaker", "memory", "--no-default", "--center"])
            .command
            .apply(&mut config);
        assert_eq!(config.memory.categories, PointCategories::CENTER);
    }

    #[test]
    fn test_fire_quality_override() {
        let mut config = GeneratorConfig::default();
        Cli::parse_from(["geomaker", "fire-geometry", "-q", "4"])
            .command
            .apply(&mut config);
        assert_eq!(config.shell.fire_quality, 4);
    }

    #[test]
    fn test_run_requires_input() {
        let cli = Cli::parse_from(["geomaker", "geometry"]);
        assert!(run(cli).is_err());
    }

    #[test]
    fn test_run_geometry_on_obj() {
        let input = temp_path("crate.obj");
        let output = temp_path("crate-out.json");
        std::fs::write(&input, QUAD_BOX).unwrap();

        let cli = Cli::parse_from([
            "geomaker",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "geometry",
        ]);
        let report = run(cli).unwrap();
        assert_eq!(report.created.len(), 1);

        let scene = load_scene(&output, &ImportSettings::default()).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        assert!(scene.find_by_name("Crate").is_some());
        assert!(scene.find_by_name("Geometry").is_some());
    }

    #[test]
    fn test_run_rejects_bad_config() {
        let input = temp_path("bad-config.obj");
        let config = temp_path("bad-config.json");
        std::fs::write(&input, QUAD_BOX).unwrap();
        std::fs::write(&config, r#"{ "lod": { "levels": [9] } }"#).unwrap();

        let cli = Cli::parse_from([
            "geomaker",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "lods",
        ]);
        let result = run(cli);
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&config).ok();

        assert!(result.is_err());
    }
}
