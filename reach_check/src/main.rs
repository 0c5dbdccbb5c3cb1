use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_ip_reachability::{
    CheckConfiguration, CheckTarget, Checker, IcmpChecker, Report, TcpChecker,
};

#[derive(Debug, Parser)]
#[command(
    name = "reach_check",
    version,
    about = "Check that a host answers ICMP echo requests or accepts TCP connections"
)]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send ICMP echo requests and report the average round trip time
    Icmp {
        hostname: String,
        /// Number of echo requests to send
        #[arg(short = 'c', long)]
        count: Option<u16>,
        /// Milliseconds to wait for a reply before sending the next request
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Try to open a TCP connection to a port
    Tcp {
        hostname: String,
        port: u16,
        /// Milliseconds to wait for the connection
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

impl Args {
    fn configuration(&self) -> anyhow::Result<CheckConfiguration> {
        let mut conf = match &self.config {
            Some(path) => CheckConfiguration::load(path)?,
            None => CheckConfiguration::default(),
        };
        match self.command {
            Command::Icmp {
                count, timeout_ms, ..
            } => {
                if let Some(count) = count {
                    conf.sequence_max = count;
                }
                if let Some(timeout_ms) = timeout_ms {
                    conf.timeout = Duration::from_millis(timeout_ms);
                }
            }
            Command::Tcp { timeout_ms, .. } => {
                if let Some(timeout_ms) = timeout_ms {
                    conf.connect_timeout = Duration::from_millis(timeout_ms);
                }
            }
        }
        conf.validate().context("bad command line")?;
        log::debug!("configuration: {:?}", conf);
        Ok(conf)
    }
}

fn print_report<R: Report>(report: &R, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(match report.error() {
        Some(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    })
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let conf = args.configuration()?;
    match &args.command {
        Command::Icmp { hostname, .. } => {
            let mut checker = match IcmpChecker::open(conf) {
                Ok(checker) => checker,
                Err(e) => {
                    eprintln!("error: {}", e);
                    eprintln!("raw ICMP sockets need root or the CAP_NET_RAW capability");
                    return Ok(ExitCode::FAILURE);
                }
            };
            let result = checker.check_until(hostname, ctrl_c()).await;
            print_report(&result, args.json)
        }
        Command::Tcp { hostname, port, .. } => {
            let mut checker = TcpChecker::new(&conf);
            let result = checker
                .check(&CheckTarget::new(hostname.as_str(), *port))
                .await;
            print_report(&result, args.json)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
