use clap::{Args, Parser, Subcommand};
use pathprobe::packet::DEFAULT_PAYLOAD_SIZE;
use pathprobe::tracer::DEFAULT_MAX_HOPS;
use pathprobe::{PingConfig, ProbeError, TraceConfig, pinger, tracer};
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log probe details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Tool,
}

#[derive(Subcommand, Debug)]
enum Tool {
    /// Send ICMP echo requests to a host
    Ping(PingArgs),
    /// Discover the route to a host by increasing the TTL
    Traceroute(TracerouteArgs),
}

#[derive(Args, Debug)]
struct PingArgs {
    /// Host name or IPv4 address to ping
    host: String,

    /// Number of packets to send
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Seconds to wait between packets
    #[arg(short, long, default_value = "1", value_parser = parse_seconds)]
    interval: Duration,

    /// Payload size in bytes
    #[arg(short, long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    size: usize,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value = "1", value_parser = parse_seconds)]
    timeout: Duration,
}

#[derive(Args, Debug)]
struct TracerouteArgs {
    /// Host name or IPv4 address to trace
    host: String,

    /// Print hop addresses numerically instead of resolving them
    #[arg(short, long)]
    numeric: bool,

    /// Print how many probes went unanswered at each hop
    #[arg(short, long)]
    summary: bool,

    /// Maximum number of hops to probe
    #[arg(short, long, default_value_t = DEFAULT_MAX_HOPS, value_parser = clap::value_parser!(u8).range(1..))]
    max_hops: u8,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value = "5", value_parser = parse_seconds)]
    wait: Duration,

    /// Probes sent per hop
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=10))]
    queries: u8,
}

impl From<PingArgs> for PingConfig {
    fn from(args: PingArgs) -> Self {
        PingConfig { count: args.count, interval: args.interval, payload_size: args.size, timeout: args.timeout }
    }
}

impl From<&TracerouteArgs> for TraceConfig {
    fn from(args: &TracerouteArgs) -> Self {
        TraceConfig {
            max_hops: args.max_hops,
            probes_per_hop: args.queries,
            timeout: args.wait,
            numeric: args.numeric,
            summary: args.summary,
            ..TraceConfig::default()
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("invalid number of seconds: {}", e))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid number of seconds: {}", e))
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut out = io::stdout().lock();
    let result: Result<(), ProbeError> = match cli.command {
        Tool::Ping(args) => {
            let host = args.host.clone();
            pinger::ping(&host, &PingConfig::from(args), &mut out).map(|_| ())
        }
        Tool::Traceroute(args) => tracer::traceroute(&args.host, &TraceConfig::from(&args), &mut out).map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
