mod audio;
mod cli;
mod config;
mod error;
mod fingerprint;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use cli::{Cli, Command};
use config::{Config, OutputFormat};

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run(cli) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match config::find_config(cli.config) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("Ignoring config {} ({}), using defaults", path.display(), err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    config
        .analysis
        .validate()
        .context("Invalid [analysis] settings")?;

    match cli.command {
        Command::Record { output } => record_command(&output, &config),
        Command::Spectrogram { input, output } => {
            let output = output.unwrap_or_else(|| config.output.spectrogram_image.clone());
            spectrogram_command(&input, &output, &config)
        }
        Command::Fingerprint { input } => fingerprint_command(&input, &config),
    }
}

#[cfg(feature = "capture")]
fn record_command(output: &Path, config: &Config) -> Result<()> {
    use audio::capture::Recorder;
    use audio::microphone::Microphone;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Duration;

    let duration = Duration::from_secs(config.record.duration_secs);

    let microphone = Microphone::open_default().context("Failed to initialize recorder")?;
    let mut recorder = Recorder::create(microphone, output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples")?
            .progress_chars("=>-"),
    );

    let captured = recorder
        .start(duration, |done, target| {
            pb.set_length(target);
            pb.set_position(done);
        })
        .context("Recording failed")?;
    pb.finish_with_message("Recording complete");

    let total = recorder.close().context("Failed to finalize WAV file")?;
    log::info!(
        "Audio recording saved: {} ({} of {} samples)",
        output.display(),
        total,
        captured
    );
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn record_command(_output: &Path, _config: &Config) -> Result<()> {
    anyhow::bail!(
        "Recording requires the 'capture' feature. \
         Rebuild with: cargo build --features capture"
    );
}

fn spectrogram_command(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let waveform = audio::decode::decode_wav_file(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let matrix = fingerprint::compute_spectrogram(&waveform, &config.analysis)
        .context("Failed to compute spectrogram")?;

    render::raster::save_spectrogram_png(&matrix, output)
        .with_context(|| format!("Failed to save spectrogram image {}", output.display()))?;
    Ok(())
}

fn fingerprint_command(input: &Path, config: &Config) -> Result<()> {
    let waveform = audio::decode::decode_wav_file(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let fingerprints = fingerprint::fingerprint_waveform(&waveform, &config.analysis)
        .context("Failed to extract fingerprints")?;

    let limit = match config.output.max_printed {
        0 => fingerprints.len(),
        n => n.min(fingerprints.len()),
    };
    let shown = &fingerprints[..limit];

    match config.output.format {
        OutputFormat::Text => {
            for fp in shown {
                println!("{}", fp);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(shown)?);
        }
    }

    log::info!(
        "Fingerprinting completed: {} fingerprints ({} shown)",
        fingerprints.len(),
        limit
    );
    Ok(())
}
