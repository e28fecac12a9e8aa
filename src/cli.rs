use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Play audio in realtime
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true")]
    pub play: bool,

    /// Mirror rendered audio to a wav file
    #[arg(long)]
    pub wav: Option<String>,

    /// Path to config TOML
    #[arg(long, default_value = "keegan.toml")]
    pub config: String,

    /// Mood pack JSON (overrides the config paths section)
    #[arg(long)]
    pub moods: Option<String>,

    /// Stories JSON (overrides the config paths section)
    #[arg(long)]
    pub stories: Option<String>,

    /// Starting intensity [0..1] (overrides the config)
    #[arg(long)]
    pub intensity: Option<f32>,

    /// Start paused instead of playing
    #[arg(long, default_value_t = false)]
    pub paused: bool,
}
