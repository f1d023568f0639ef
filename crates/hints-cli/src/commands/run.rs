use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use hints_core::sim::{SimulatedAudio, SimulatedGaze, SimulatedHead};
use hints_core::{
    Collaborators, Config, Event, Examination, FileCalibrationStore, FileStorageWriter,
    PhaseSequencer, ReadinessMode, SequencerSettings,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Pace ticks against the wall clock instead of running as fast as possible
    #[arg(long)]
    realtime: bool,
    /// Stop after this many simulated seconds even if nothing was saved
    #[arg(long)]
    max_seconds: Option<f64>,
    /// Print every event as a JSON line
    #[arg(long)]
    events: bool,
    /// Perform calibration first if it has not been performed yet
    #[arg(long)]
    calibrated: bool,
    /// Probability of an invalid gaze reading (0..=1)
    #[arg(long, default_value_t = 0.0)]
    dropout: f64,
    /// Seed for the simulated gaze, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Directory saved sessions go under (overrides storage.output_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Default)]
struct Outcome {
    saved_to: Option<String>,
    save_error: Option<String>,
}

impl Outcome {
    fn is_finished(&self) -> bool {
        self.saved_to.is_some() || self.save_error.is_some()
    }

    fn observe(&mut self, event: &Event) {
        match event {
            Event::SessionSaved { location, .. } => self.saved_to = Some(location.clone()),
            Event::SaveFailed { message, .. } => self.save_error = Some(message.clone()),
            _ => {}
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    config.validate()?;
    if args.max_seconds.is_none() && !readiness_reachable(config.readiness.mode, args.dropout) {
        return Err(format!(
            "readiness is never reached in {:?} mode with --dropout {}; change one or pass --max-seconds",
            config.readiness.mode, args.dropout
        )
        .into());
    }

    let root = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => config.output_root()?,
    };
    let interval = config.tick_interval_secs();
    let devices = Collaborators::new(
        SimulatedGaze::new(args.seed, args.dropout),
        SimulatedHead::new(interval),
        SimulatedAudio::from_config(&config.audio),
        FileStorageWriter::new(root, config.storage.file_suffix.clone()),
    );
    let sequencer = PhaseSequencer::new(SequencerSettings::from(&config), devices)?;
    let mut exam = Examination::new(sequencer, FileCalibrationStore::open_default()?)?;

    if args.calibrated && !exam.is_calibrated() {
        exam.launch_calibration()?;
    }
    let Some(started) = exam.start()? else {
        return Err("calibration has not been performed (run `hints-cli calibration launch` or pass --calibrated)".into());
    };
    emit(&started, args.events)?;

    let outcome = if args.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(drive_realtime(&mut exam, interval, &args))?
    } else {
        drive(&mut exam, interval, &args)?
    };

    if let Some(message) = &outcome.save_error {
        warn!(%message, "session was not saved");
    }
    let sequencer = exam.sequencer();
    let summary = serde_json::json!({
        "session_id": sequencer.session().id(),
        "label": sequencer.session().label(),
        "phase": sequencer.current_phase(),
        "clock_secs": sequencer.clock(),
        "records": sequencer.records_written(),
        "saved_to": outcome.saved_to,
        "save_error": outcome.save_error,
    });
    println!("{summary}");
    Ok(())
}

/// Whether the simulated gaze can ever satisfy the readiness gate.
///
/// A NaN dropout is treated as zero by the simulator.
fn readiness_reachable(mode: ReadinessMode, dropout: f64) -> bool {
    match mode {
        ReadinessMode::DeviceTracking => dropout.is_nan() || dropout < 1.0,
        ReadinessMode::EditorSimulation => dropout > 0.0,
    }
}

fn emit(event: &Event, print: bool) -> Result<(), Box<dyn Error>> {
    if print {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

fn out_of_time(exam: &Examination, args: &RunArgs) -> bool {
    args.max_seconds
        .is_some_and(|limit| exam.sequencer().clock() >= limit)
}

/// Feeds fixed steps of simulated time with no pacing.
fn drive(exam: &mut Examination, interval: f64, args: &RunArgs) -> Result<Outcome, Box<dyn Error>> {
    let mut outcome = Outcome::default();
    while !outcome.is_finished() && !out_of_time(exam, args) {
        for event in exam.tick(interval) {
            outcome.observe(&event);
            emit(&event, args.events)?;
        }
    }
    info!(clock = exam.sequencer().clock(), "run finished");
    Ok(outcome)
}

/// Ticks on a wall-clock interval and feeds the measured elapsed time.
async fn drive_realtime(
    exam: &mut Examination,
    interval: f64,
    args: &RunArgs,
) -> Result<Outcome, Box<dyn Error>> {
    let mut ticker = time::interval(Duration::from_secs_f64(interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut outcome = Outcome::default();
    let mut last = Instant::now();

    while !outcome.is_finished() && !out_of_time(exam, args) {
        ticker.tick().await;
        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f64();
        last = now;
        for event in exam.tick(delta) {
            outcome.observe(&event);
            emit(&event, args.events)?;
        }
    }
    info!(clock = exam.sequencer().clock(), "run finished");
    Ok(outcome)
}
