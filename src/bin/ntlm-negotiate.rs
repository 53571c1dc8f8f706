//! Interactive NTLM handshake driver
//!
//! Prints the negotiate token, then reads one server challenge token per line
//! from stdin and prints each response until the handshake completes.

use clap::Parser;
use ntlm_negotiator::auth::{ContextRequirements, NegotiationEngine, NegotiationState};
use ntlm_negotiator::config::{DEFAULT_PACKAGE, DEFAULT_TARGET_NAME};
use ntlm_negotiator::{NegotiatorConfig, NtlmNegotiator};
use std::io::{self, BufRead, Write};

#[derive(Parser, Debug)]
#[command(name = "ntlm-negotiate")]
#[command(about = "Drive a client-side NTLM handshake", long_about = None)]
struct Args {
    /// Domain of the account
    #[arg(short = 'd', long, default_value = "")]
    domain: String,

    /// User name
    #[arg(short = 'u', long, default_value = "")]
    user: String,

    /// Password
    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// Target service name
    #[arg(short = 't', long, default_value = DEFAULT_TARGET_NAME)]
    target: String,

    /// Security package
    #[arg(long, default_value = DEFAULT_PACKAGE)]
    package: String,

    /// Context requirement flags (ISC_REQ_* bits, hex)
    #[arg(long, value_parser = parse_requirements, default_value = "0")]
    requirements: ContextRequirements,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn parse_requirements(s: &str) -> Result<ContextRequirements, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16)
        .map(ContextRequirements::from_bits_truncate)
        .map_err(|e| format!("invalid requirement flags '{}': {}", s, e))
}

#[cfg_attr(not(windows), allow(dead_code))]
fn run<E: NegotiationEngine>(engine: E, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = NegotiatorConfig::default()
        .with_package(args.package.clone())
        .with_target_name(args.target.clone())
        .with_requirements(args.requirements);
    let mut negotiator = NtlmNegotiator::with_config(engine, config);

    tracing::info!("Authenticating as {}\\{}", args.domain, args.user);
    negotiator.initialise(&args.domain, &args.user, &args.password)?;

    let mut stdout = io::stdout().lock();
    let negotiate = negotiator.continue_token(None)?;
    writeln!(stdout, "{}", negotiate.unwrap_or_default())?;
    stdout.flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if negotiator.state() != NegotiationState::ContextInProgress {
            break;
        }
        let line = line?;
        let challenge = line.trim().trim_start_matches("NTLM ").trim();
        if challenge.is_empty() {
            continue;
        }

        let response = negotiator.continue_token(Some(challenge))?;
        writeln!(stdout, "{}", response.unwrap_or_default())?;
        stdout.flush()?;
    }

    tracing::info!("Handshake finished in state {:?}", negotiator.state());
    negotiator.reset();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tokens go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    #[cfg(windows)]
    {
        run(ntlm_negotiator::auth::sspi::SspiEngine::new(), &args)
    }

    #[cfg(not(windows))]
    {
        Err("the SSPI engine is only available on Windows".into())
    }
}
