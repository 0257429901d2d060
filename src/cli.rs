use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "peakprint", about = "Landmark audio fingerprinting from spectrogram peaks")]
pub struct Cli {
    /// TOML config file (defaults to peakprint.toml or ~/.config/peakprint/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record from the default input device to a 44.1 kHz mono WAV file
    Record {
        /// Output WAV file
        output: PathBuf,
    },

    /// Render the spectrogram of a WAV file as a grayscale PNG
    Spectrogram {
        /// Input WAV file (44.1 kHz, mono, 16-bit)
        input: PathBuf,

        /// Output image (defaults to output.spectrogram_image from config)
        output: Option<PathBuf>,
    },

    /// Print the landmark fingerprints of a WAV file
    Fingerprint {
        /// Input WAV file (44.1 kHz, mono, 16-bit)
        input: PathBuf,
    },
}
