//! prtoken: per-epoch probabilistic reveal token issuance.
//!
//! ```text
//! prtoken [--config <toml>] issue --ip <addr> [--num-tokens N] [--p-reveal P]
//!         [--output-dir DIR] [--custom-db-filename NAME] [--reveal-policy prefix|sampled]
//! prtoken verify
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use prt_cli::{issue, IssueConfig, IssueReport, RunError, EXIT_CONFIG};
use prt_issuer::RevealPolicy;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log targets enabled at `info` unless `RUST_LOG` says otherwise.
const DEFAULT_LOG_DIRECTIVES: &[&str] = &[
    "prtoken=info",
    "prt_cli=info",
    "prt_issuer=info",
    "prt_store=info",
];

#[derive(Parser)]
#[command(name = "prtoken")]
#[command(version, about = "Probabilistic reveal token issuance", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(long, global = true, env = "PRTOKEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate epoch keys and mint a token batch for one address
    Issue(IssueArgs),
    /// Check issued tokens (not implemented)
    Verify,
}

#[derive(Args)]
struct IssueArgs {
    /// Client IPv4 or IPv6 address
    #[arg(long)]
    ip: Option<String>,

    /// How many tokens to generate
    #[arg(long)]
    num_tokens: Option<usize>,

    /// Fraction of tokens that are publicly openable
    #[arg(long)]
    p_reveal: Option<f32>,

    /// Where to store the key file and token database
    #[arg(long, env = "PRTOKEN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Append to this database in the output directory instead of a per-epoch one
    #[arg(long)]
    custom_db_filename: Option<String>,

    /// Which positions of the batch are revealed
    #[arg(long)]
    reveal_policy: Option<RevealPolicy>,
}

impl IssueArgs {
    fn apply(self, config: &mut IssueConfig) {
        if let Some(ip) = self.ip {
            config.ip = ip;
        }
        if let Some(n) = self.num_tokens {
            config.num_tokens = n;
        }
        if let Some(p) = self.p_reveal {
            config.p_reveal = p;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(name) = self.custom_db_filename {
            config.custom_db_filename = Some(name);
        }
        if let Some(policy) = self.reveal_policy {
            config.reveal_policy = policy;
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

fn run_issue(config_path: Option<&Path>, args: IssueArgs) -> Result<IssueReport, RunError> {
    let mut config = match config_path {
        Some(path) => IssueConfig::load(path)?,
        None => IssueConfig::default(),
    };
    args.apply(&mut config);
    issue(&config, chrono::Utc::now())
}

/// `--help` and `--version` succeed; anything else clap rejects is a
/// configuration error.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        EXIT_CONFIG
    } else {
        0
    }
}

fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };
    match cli.command {
        Command::Issue(args) => match run_issue(cli.config.as_deref(), args) {
            Ok(report) => {
                info!(
                    keys = %report.key_path.display(),
                    tokens = %report.token_db_path.display(),
                    "artifacts written"
                );
                println!("{}", report.key_path.display());
                println!("{}", report.token_db_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("issuance failed: {e}");
                ExitCode::from(e.exit_code())
            }
        },
        Command::Verify => {
            warn!("verify is not implemented");
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_exit_with_config_code() {
        for argv in [
            &["prtoken"][..],
            &["prtoken", "mint"],
            &["prtoken", "issue", "--num-tokens", "many"],
        ] {
            let err = Cli::try_parse_from(argv.iter().copied())
                .err()
                .expect("usage error");
            assert_eq!(usage_exit_code(&err), EXIT_CONFIG);
        }
    }

    #[test]
    fn test_help_exits_cleanly() {
        let err = Cli::try_parse_from(["prtoken", "--help"])
            .err()
            .expect("help is reported as an error");
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "prtoken",
            "issue",
            "--ip",
            "::1",
            "--p-reveal",
            "0.5",
            "--reveal-policy",
            "sampled",
        ])
        .expect("parse");
        let Command::Issue(args) = cli.command else {
            unreachable!("issue subcommand")
        };
        let mut config = IssueConfig::default();
        args.apply(&mut config);
        assert_eq!(config.ip, "::1");
        assert_eq!(config.p_reveal, 0.5);
        assert_eq!(config.reveal_policy, RevealPolicy::Sampled);
        assert_eq!(config.num_tokens, 100);
    }
}
