//! petfeeder: main entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  MotorAdapter      JsonStateStore   LogEventSink  LocalClock │
//! │  (MotorPort)       (FeedStore)      (EventSink)   (Clock)    │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  FeederService                                         │  │
//! │  │  Scheduler · RecoveryPolicy · FeedController           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::Parser;
use log::{info, warn};

use petfeeder::adapters::hardware::MotorAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::state_file::JsonStateStore;
use petfeeder::adapters::time::LocalClock;
use petfeeder::app::controller::FeedController;
use petfeeder::app::ports::{Clock, FeedStore};
use petfeeder::app::service::FeederService;
use petfeeder::app::status::status_report;
use petfeeder::config::{ConfigSource, FeederConfig, RecoveryMode};
use petfeeder::scheduler::latest_occurrence;
use petfeeder::shutdown::ShutdownToken;
use petfeeder::state::{FeedOutcome, FeedState};

use cli::{Args, Command};

type Service = FeederService<MotorAdapter, JsonStateStore, LogEventSink>;

fn main() -> Result<()> {
    let args = Args::parse();

    // ── 1. Config + logging ───────────────────────────────────
    let (mut config, source) = FeederConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    config.simulate |= args.simulate;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("petfeeder v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File(path) => info!("Config loaded from {}", path.display()),
        ConfigSource::Defaults => warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        ),
    }

    // ── 2. Shutdown token ─────────────────────────────────────
    let shutdown = ShutdownToken::new();
    ctrlc::set_handler({
        let shutdown = shutdown.clone();
        move || {
            warn!("Interrupt received, shutting down");
            shutdown.cancel();
        }
    })
    .context("installing signal handler")?;

    // ── 3. Dispatch ───────────────────────────────────────────
    let clock = LocalClock;
    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let mut service = build_service(&config, JsonStateStore::new(&config.state_path))?;
            service.start(clock.now());
            service.run(&clock, &shutdown, None);
        }
        Command::Test {
            iterations,
            interval,
        } => {
            let iterations = iterations.unwrap_or(config.test.iterations);
            let interval = Duration::from_secs(interval.unwrap_or(config.test.interval_secs));
            let mut service = build_service(&config, JsonStateStore::new(&config.state_path))?;
            info!("Test mode: {} feeds, {}s apart", iterations, interval.as_secs());
            let run = service.run_test_feeds(iterations, interval, &clock, &shutdown);
            info!(
                "Test mode finished: {} ok, {} failed{}",
                run.succeeded,
                run.failed,
                if run.interrupted { " (interrupted)" } else { "" }
            );
        }
        Command::Calibrate { steps } => {
            let steps = match steps {
                Some(steps) => steps,
                None => i32::try_from(config.motor.calibration_steps)
                    .context("motor.calibration_steps out of range")?,
            };
            let motor = MotorAdapter::from_config(&config).context("initialising motor")?;
            let mut controller =
                FeedController::new(&config, motor, JsonStateStore::new(&config.state_path));
            let result = controller.calibrate(steps);
            if let Err(e) = controller.release() {
                warn!("Motor release failed: {}", e);
            }
            result.context("calibration run")?;
            info!("Calibration complete: {} steps", steps);
        }
        Command::ScheduleTest { delay } => {
            let delay = delay.unwrap_or(config.test.schedule_delay_secs);
            let now = clock.now();
            let mut test_config = config.clone();
            test_config.feed_time = (now + secs(delay)).time();
            test_config.recovery.enabled = false;
            info!("Schedule test: feed due in {}s", delay);

            let mut service = build_service(&test_config, JsonStateStore::new(&config.state_path))?
                .with_heartbeat(Duration::from_secs(config.test.heartbeat_secs));
            service.start(now);
            let fires = service.run(&clock, &shutdown, Some(1));
            info!("Schedule test finished after {} scheduled feed(s)", fires);
        }
        Command::Status => status(&config, &clock)?,
        Command::RecoveryTest { late } => recovery_test(&config, &clock, late)?,
    }

    Ok(())
}

fn build_service(config: &FeederConfig, store: JsonStateStore) -> Result<Service> {
    let motor = MotorAdapter::from_config(config).context("initialising motor")?;
    Ok(FeederService::new(config, motor, store, LogEventSink::new()))
}

fn secs(s: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(s).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}

fn status(config: &FeederConfig, clock: &LocalClock) -> Result<()> {
    let store = JsonStateStore::new(&config.state_path);
    let report = status_report(&store, config.feed_time, clock.now())
        .with_context(|| format!("reading {}", config.state_path.display()))?;
    println!("State file:      {}", store.path().display());
    print!("{report}");
    Ok(())
}

/// Seed a scratch store with "fed yesterday", pretend today's feed was
/// due `late` seconds ago, and run startup recovery.
fn recovery_test(config: &FeederConfig, clock: &LocalClock, late: u64) -> Result<()> {
    let scratch = tempfile::tempdir().context("creating scratch directory")?;
    let now = clock.now();

    let mut test_config = config.clone();
    test_config.feed_time = (now - secs(late)).time();
    test_config.recovery.enabled = true;
    test_config.recovery.mode = RecoveryMode::Feed;

    let occurrence = latest_occurrence(test_config.feed_time, now);
    let mut seeded = FeedState::default();
    seeded.apply(
        FeedOutcome::Success,
        occurrence - TimeDelta::days(1),
        Some(occurrence),
        None,
    );
    let mut store = JsonStateStore::new(scratch.path().join("feeder_state.json"));
    store.seed(&seeded).context("seeding scratch state")?;

    info!(
        "Recovery test: last feed {}, feed due {} ({}s late, window {}s)",
        occurrence - TimeDelta::days(1),
        occurrence,
        late,
        test_config.recovery.max_delay_secs
    );
    let mut service = build_service(&test_config, store)?;
    let decision = service.start(now);
    service.stop();

    println!("Recovery decision: {decision:?}");
    print!("{}", service.controller().state().render());
    Ok(())
}
