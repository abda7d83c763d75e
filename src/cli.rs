use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Translate text between two languages
    Translate {
        /// Text to translate
        text: String,

        /// Source language code (detected when omitted)
        #[arg(short, long)]
        source: Option<String>,

        /// Target language code
        #[arg(short, long)]
        target: String,
    },

    /// Transcribe an audio file to text
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Synthesize speech into a WAV file
    Synthesize {
        /// Text to speak
        text: String,

        /// Language of the text
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Detect the language of a text
    Detect {
        /// Text to inspect
        text: String,
    },

    /// List language codes and display names
    Languages,

    /// List directly supported translation pairs
    Pairs,

    /// Write the default configuration to a file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "parley.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_arguments() {
        let args = Args::parse_from(["parley", "translate", "Bonjour", "-s", "fr", "-t", "de", "-v"]);
        assert!(args.verbose);
        match args.command {
            Commands::Translate { text, source, target } => {
                assert_eq!(text, "Bonjour");
                assert_eq!(source.as_deref(), Some("fr"));
                assert_eq!(target, "de");
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_synthesize_defaults_to_english() {
        let args = Args::parse_from(["parley", "synthesize", "hello", "-o", "out.wav"]);
        match args.command {
            Commands::Synthesize { lang, .. } => assert_eq!(lang, "en"),
            _ => panic!("expected synthesize"),
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
