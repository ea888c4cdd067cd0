//! onionreq command-line configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use onionreq::{EncryptionType, MAX_HOPS};
use std::path::PathBuf;

/// Build onion requests and exercise them against a loopback path
#[derive(Parser, Debug, Clone)]
#[command(name = "onionreq")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Log format
    #[arg(long, value_enum, default_value = "pretty", env = "ONIONREQ_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a request for the path in a path file and print it as hex
    Build(BuildArgs),
    /// Build requests through generated relays and check the echoed responses
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path file with destination and hop keys (JSON)
    #[arg(long, env = "ONIONREQ_PATH_FILE")]
    pub path: PathBuf,

    /// Payload as a UTF-8 string
    #[arg(long, conflicts_with = "payload_file")]
    pub payload: Option<String>,

    /// Read the payload from a file
    #[arg(long)]
    pub payload_file: Option<PathBuf>,

    /// Override the path file's encryption (aes-gcm or xchacha20)
    #[arg(long)]
    pub encryption: Option<EncryptionType>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of relays on the path
    #[arg(long, default_value = "3")]
    pub hops: usize,

    /// Layer encryption (aes-gcm or xchacha20)
    #[arg(long, default_value = "xchacha20")]
    pub encryption: EncryptionType,

    /// Requests to build concurrently
    #[arg(long, default_value = "1")]
    pub requests: usize,

    /// Payload sent with every request
    #[arg(long, default_value = "hello")]
    pub payload: String,

    /// Address the destination as an application server at this host
    #[arg(long)]
    pub server_host: Option<String>,
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::Build(args) => {
                if args.payload.is_none() && args.payload_file.is_none() {
                    anyhow::bail!("one of --payload or --payload-file is required");
                }
            }
            Command::Simulate(args) => {
                if args.hops == 0 || args.hops > MAX_HOPS {
                    anyhow::bail!("--hops must be between 1 and {MAX_HOPS}");
                }
                if args.requests == 0 {
                    anyhow::bail!("--requests must be at least 1");
                }
            }
        }
        Ok(())
    }

    /// Default tracing directive
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "onionreq=debug"
        } else {
            "onionreq=info"
        }
    }
}

impl BuildArgs {
    /// Payload bytes from whichever source was given
    pub fn payload(&self) -> anyhow::Result<Vec<u8>> {
        match (&self.payload, &self.payload_file) {
            (Some(text), _) => Ok(text.clone().into_bytes()),
            (None, Some(path)) => Ok(std::fs::read(path)?),
            (None, None) => anyhow::bail!("no payload given"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate_defaults() {
        let config = Config::try_parse_from(["onionreq", "simulate"]).unwrap();
        config.validate().unwrap();
        match config.command {
            Command::Simulate(args) => {
                assert_eq!(args.hops, 3);
                assert_eq!(args.encryption, EncryptionType::XChaCha20Poly1305);
                assert_eq!(args.requests, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_build() {
        let config = Config::try_parse_from([
            "onionreq",
            "--log-format",
            "json",
            "build",
            "--path",
            "path.json",
            "--payload",
            "hi",
            "--encryption",
            "aes-gcm",
        ])
        .unwrap();
        config.validate().unwrap();
        match &config.command {
            Command::Build(args) => {
                assert_eq!(args.encryption, Some(EncryptionType::AesGcm));
                assert_eq!(args.payload().unwrap(), b"hi");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_validation() {
        let config = Config::try_parse_from(["onionreq", "simulate", "--hops", "0"]).unwrap();
        assert!(config.validate().is_err());

        let config = Config::try_parse_from(["onionreq", "build", "--path", "p.json"]).unwrap();
        assert!(config.validate().is_err());

        assert!(Config::try_parse_from(["onionreq", "simulate", "--encryption", "des"]).is_err());
    }
}
