use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "scsarc")]
#[command(version)]
#[command(about = "Inspect and extract SCS game archives (HashFS v1 and ZIP)", long_about = None)]
#[command(after_help = "Examples:\n  \
  scsarc def.scs -l                     list every entry in def.scs\n  \
  scsarc def.scs -p def/city.sii        print one file to stdout\n  \
  scsarc mod.scs 'def/*' -d out         extract matching files into out/\n  \
  scsarc --hash def/vehicle/truck.sii   print the path hash")]
pub struct Cli {
    /// Archive path, or the path to hash with --hash
    #[arg(value_name = "ARCHIVE")]
    pub file: String,

    /// Entry paths or glob patterns to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List entries (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely, and log at debug level
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Print the hash of ARCHIVE as an entry path instead of opening it
    #[arg(long)]
    pub hash: bool,

    /// Strip the top-level folder in archives whose name matches PATTERN
    #[arg(long = "trim-root", value_name = "PATTERN")]
    pub trim_root: Vec<String>,

    /// Fail on malformed central directory records instead of stopping
    #[arg(long)]
    pub strict: bool,

    /// Return still-compressed bytes when an entry fails to decode
    #[arg(long)]
    pub passthrough: bool,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.is_very_quiet() {
            "error"
        } else {
            "warn"
        }
    }
}
