use hints_core::sim::SimulatedAudio;
use hints_core::{ClipLengths, Config, PhaseDescriptor, PhaseTable};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let clips = ClipLengths::capture(&SimulatedAudio::from_config(&config.audio))?;
    let table = PhaseTable::resolve(
        &config.phases,
        config.timing.notification_extra_delay_secs,
        &clips,
    )?;
    let phases: Vec<&PhaseDescriptor> = table.iter().collect();
    let json = serde_json::json!({
        "phases": phases,
        "timed_total_secs": table.timed_total_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
