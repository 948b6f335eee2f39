use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate junction temperature and estimate lifetime for a device catalog
    Simulate {
        /// Device catalog YAML
        #[arg(short, long)]
        devices: String,
        /// Mission profile YAML
        #[arg(short, long)]
        profile: String,
        /// Output results JSON file
        #[arg(short, long)]
        output: String,
        /// Ambient temperature in °C
        #[arg(short, long, default_value_t = 50.0, allow_negative_numbers = true)]
        ambient: f64,
        /// Only simulate the named device (repeatable)
        #[arg(long = "device")]
        device: Vec<String>,
        /// Upper bound on the integration sub-step in seconds
        #[arg(long)]
        max_step: Option<f64>,
        /// Ignore thermal cycles with a smaller range in K
        #[arg(long, default_value_t = 0.1)]
        min_cycle_range: f64,
        /// Also render the traces to <output>.png
        #[arg(long)]
        plot: bool,
    },
    /// Plot junction temperature, voltage, current and loss traces from a results file
    Plot {
        /// Results JSON file
        #[arg(short, long)]
        input: String,
        /// Output PNG file
        #[arg(short, long)]
        output: String,
        /// Only plot the named device (repeatable)
        #[arg(long = "device")]
        device: Vec<String>,
        /// Start of the plotted time window in seconds
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,
        /// End of the plotted time window in seconds
        #[arg(long, allow_negative_numbers = true)]
        end: Option<f64>,
    },
    /// Print a lifetime comparison of all devices in a results file
    Summary {
        /// Results JSON file
        #[arg(short, long)]
        input: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
