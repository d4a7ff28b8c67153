//! CLI tool for the camera rig.
//!
//! Subcommands:
//! - `home`: run the boundary homing sequence
//! - `status`: print the calibration state as JSON
//! - `goto`: move to a calibrated marker or an absolute step location
//! - `rotate`: rotate the mount to an absolute heading
//! - `scan`: execute the full capture plan, logging each waypoint

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hardware::gpio::{GpioRail, GpioRotary, RailPins, StepTiming};
use rig::planner::Waypoint;
use rig::{Cart, RigConfig};

/// Hold time per rotation micro-step.
const ROTATE_DWELL: Duration = Duration::from_millis(3);

/// Camera rig motion control tool
#[derive(Parser, Debug)]
#[command(name = "rig_tool")]
#[command(about = "Homing, motion, and capture planning for the camera rig")]
#[command(version)]
struct Args {
    /// Path to the rig configuration file
    #[arg(long, global = true, default_value = "rig.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the boundary homing sequence, discarding stored calibration
    Home,

    /// Print the calibration state as JSON
    Status,

    /// Move the rail
    Goto {
        /// Calibrated marker index to move to
        #[arg(short, long, conflicts_with = "location")]
        index: Option<u32>,

        /// Absolute step location to move to
        #[arg(short, long)]
        location: Option<i64>,
    },

    /// Rotate the mount to an absolute heading in degrees
    Rotate {
        degrees: f64,

        /// De-energize the coils after the move
        #[arg(long)]
        release: bool,
    },

    /// Execute the full capture plan, logging each waypoint
    Scan,
}

fn open_cart(config: &RigConfig) -> Result<Cart<GpioRail, GpioRotary>> {
    let gpio = config
        .gpio
        .as_ref()
        .context("configuration has no [gpio] section; this tool drives real hardware")?;

    let pins = RailPins {
        step: gpio.step_line,
        dir: gpio.dir_line,
        enable: gpio.enable_line,
        boundary_a: gpio.boundary_a_line,
        boundary_b: gpio.boundary_b_line,
        marker: gpio.marker_line,
    };
    let rail = GpioRail::open(&gpio.chip, pins, StepTiming::default())
        .context("opening rail GPIO lines")?;
    let rotary = GpioRotary::open(&gpio.chip, gpio.coil_lines, ROTATE_DWELL)
        .context("opening rotation GPIO lines")?;

    Ok(Cart::new(rail, rotary, config)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = RigConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let mut cart = open_cart(&config)?;

    match args.command {
        Command::Home => {
            let outcome = cart.home()?;
            info!(
                "Homed: envelope {} steps, {} markers",
                outcome.max_steps,
                outcome.positions.len()
            );
        }
        Command::Status => {
            cart.initialize(false)?;
            println!("{}", serde_json::to_string_pretty(&cart.status())?);
        }
        Command::Goto { index, location } => {
            cart.initialize(false)?;
            match (index, location) {
                (Some(index), _) => {
                    let at = cart.move_to_index(index)?;
                    info!("At marker {index} (location {at})");
                }
                (None, Some(location)) => {
                    cart.linear_mut().move_to_absolute(location)?;
                    info!("At location {location}");
                }
                (None, None) => anyhow::bail!("goto needs --index or --location"),
            }
        }
        Command::Rotate { degrees, release } => {
            cart.rotator_mut().move_to(degrees)?;
            if release {
                cart.rotator_mut().release()?;
            }
        }
        Command::Scan => {
            cart.initialize(false)?;
            let mut log_waypoint = |w: &Waypoint| -> Result<
                String,
                Box<dyn std::error::Error + Send + Sync>,
            > {
                info!("Captured {}", w.label);
                Ok(w.label.clone())
            };
            let labels = cart.follow_all(&mut log_waypoint)?;
            info!("Scan complete: {} waypoints", labels.len());
        }
    }

    Ok(())
}
