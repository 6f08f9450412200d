use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stowzip")]
#[command(version)]
#[command(about = "Build stored ZIP archives from text files and verify them", long_about = None)]
#[command(after_help = "Examples:\n  \
  stowzip create -o notes.zip notes/ README.md   archive a directory and a file\n  \
  stowzip bundle toolkit.json                     build the toolkit archive\n  \
  stowzip test notes.zip                          check every entry's CRC\n  \
  stowzip extract -p notes.zip | more             send contents of notes.zip via pipe into more")]
pub struct Cli {
    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Archive files and directories (UTF-8 text only)
    Create {
        /// Output archive
        #[arg(short = 'o', value_name = "ZIP")]
        output: PathBuf,

        /// Modification time for every entry (RFC 3339), default now
        #[arg(long, value_name = "TIME")]
        mtime: Option<DateTime<FixedOffset>>,

        /// Files or directories to add
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Build a toolkit archive from a manifest
    Bundle {
        /// Manifest JSON
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Output archive (default: claude-code-toolkit-YYYY-MM-DD.zip)
        #[arg(short = 'o', value_name = "ZIP")]
        output: Option<PathBuf>,
    },

    /// List archive contents
    List {
        #[arg(value_name = "ZIP")]
        archive: PathBuf,

        /// List verbosely
        #[arg(short = 'v')]
        verbose: bool,
    },

    /// Test archive integrity
    Test {
        #[arg(value_name = "ZIP")]
        archive: PathBuf,
    },

    /// Extract an archive
    Extract {
        #[arg(value_name = "ZIP")]
        archive: PathBuf,

        /// Extract files into exdir
        #[arg(short = 'd', value_name = "DIR", default_value = ".")]
        extract_dir: PathBuf,

        /// Overwrite files WITHOUT prompting
        #[arg(short = 'o')]
        overwrite: bool,

        /// Extract files to pipe, no messages
        #[arg(short = 'p', conflicts_with = "extract_dir")]
        pipe: bool,
    },

    /// Serve toolkit archives over HTTP
    Serve {
        /// Manifest JSON, re-read on every request
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => "info",
            1 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_mtime() {
        let cli = Cli::parse_from([
            "stowzip",
            "create",
            "-o",
            "out.zip",
            "--mtime",
            "2024-05-06T07:08:10+02:00",
            "a",
            "b/",
        ]);
        match cli.command {
            Command::Create { output, mtime, paths } => {
                assert_eq!(output, PathBuf::from("out.zip"));
                assert_eq!(mtime.unwrap().to_rfc3339(), "2024-05-06T07:08:10+02:00");
                assert_eq!(paths.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn quiet_is_global() {
        let cli = Cli::parse_from(["stowzip", "test", "a.zip", "-qq"]);
        assert!(cli.is_very_quiet());
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn extract_pipe_flag() {
        let cli = Cli::parse_from(["stowzip", "extract", "-p", "a.zip"]);
        match cli.command {
            Command::Extract { pipe, overwrite, .. } => {
                assert!(pipe);
                assert!(!overwrite);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["stowzip", "extract", "-p", "-d", "out", "a.zip"]).is_err());
    }

    #[test]
    fn create_requires_paths() {
        assert!(Cli::try_parse_from(["stowzip", "create", "-o", "x.zip"]).is_err());
    }
}
