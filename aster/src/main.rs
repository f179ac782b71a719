//! # Aster Mount Controller
//!
//! Firmware entry point: loads configuration, spawns the motion
//! worker thread and runs the link main loop on this thread until
//! interrupted.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aster::telemetry::{status_response, FixedEnv, StatusTicker};
use aster::transport::SerialTransport;
use aster_common::clock::{Clock, MonotonicClock};
use aster_common::config::{AsterConfig, ConfigLoader};
use aster_common::consts::MAIN_LOOP_SLEEP_MS;
use aster_link::{Dispatcher, LinkEngine, LoopTransport, Transport};
use aster_motion::io::SimMotionIo;
use aster_motion::{MotionHandle, MotionShared, Scheduler};

#[derive(Debug, Parser)]
#[command(name = "aster", about = "Three-axis equatorial mount controller")]
struct Args {
    /// Configuration file (TOML); built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device override.
    #[arg(long)]
    device: Option<String>,

    /// Use the in-memory loop transport instead of a serial port.
    #[arg(long)]
    sim: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AsterConfig::load(path)?,
        None => AsterConfig::default(),
    };
    if let Some(device) = args.device {
        config.link.device = device;
    }
    config.validate()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .log_level
                .map(|level| level.as_directive())
                .unwrap_or("info"),
        )
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("aster mount controller starting");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })?;
    }

    let clock = Arc::new(MonotonicClock::new());
    let shared = Arc::new(MotionShared::new());
    let handle = MotionHandle::new(shared.clone(), config.mount);

    // A board GPIO driver slots in here once one exists; until then
    // the simulation driver records pin activity.
    let io = SimMotionIo::new(clock.clone());
    let scheduler = Scheduler::new(
        shared,
        io,
        clock.clone(),
        config.mount,
        config.motion,
        stop.clone(),
    );
    let motion_thread = scheduler.spawn()?;

    let dispatcher = Dispatcher::new(handle.clone());
    if args.sim {
        info!("running with loop transport (no serial device)");
        let engine = LinkEngine::new(LoopTransport::new());
        serve(engine, dispatcher, handle, &config, clock.as_ref(), &stop);
    } else {
        let transport = SerialTransport::open(&config.link.device, config.link.baud)?;
        let engine = LinkEngine::new(transport);
        serve(engine, dispatcher, handle, &config, clock.as_ref(), &stop);
    }

    motion_thread
        .join()
        .map_err(|_| "motion thread panicked")?;
    info!("aster mount controller stopped");
    Ok(())
}

/// Main-loop tick: drain the link, service timers, queue telemetry.
fn serve<T: Transport>(
    mut engine: LinkEngine<T>,
    mut dispatcher: Dispatcher,
    handle: MotionHandle,
    config: &AsterConfig,
    clock: &dyn Clock,
    stop: &AtomicBool,
) {
    let mut env = FixedEnv {
        temperature_c: 20.0,
        fan_duty_percent: config.telemetry.fan_duty_percent,
    };
    let mut ticker = StatusTicker::new(config.telemetry.status_interval_ms, clock.now_us());

    while !stop.load(Ordering::Relaxed) {
        let now = clock.now_us();
        engine.poll(now, &mut dispatcher);
        if ticker.due(now) {
            if let Some(status) = status_response(&handle.snapshot(), &mut env) {
                engine.queue_response(status);
            }
        }
        thread::sleep(Duration::from_millis(MAIN_LOOP_SLEEP_MS));
    }
}
