//! `chariot`: host process for a Chariot endpoint.
//!
//! Connects to a peer over TCP (typically a serial-to-TCP bridge), waits for
//! it to come online, registers the configured resources and then serves the
//! peer's commands until interrupted. Operator commands are read from stdin.

mod console;

use std::error::Error;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chariot_endpoint::{
    describe_metrics, Clock, CommandRouter, Endpoint, EndpointConfig, EndpointError,
    EndpointResult, ResourceConfig, Routed, SimulatedPins, TcpTransport, Transport,
};
use clap::Parser;
use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleInput;

/// Chariot endpoint host
#[derive(Parser, Debug)]
#[command(name = "chariot", version, about, long_about = None)]
struct Args {
    /// Peer data stream (host:port)
    #[arg(long, value_name = "ADDR")]
    tcp: String,

    /// Out-of-band signal stream (host:port)
    #[arg(long, value_name = "ADDR")]
    signal: Option<String>,

    /// Endpoint configuration (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Location announced at startup, overrides the configuration
    #[arg(long)]
    location: Option<String>,

    /// Delay between polls while the link is quiet, in milliseconds
    #[arg(long, default_value_t = 5)]
    idle_ms: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            EndpointConfig::load(path)?
        }
        None => EndpointConfig::default(),
    };
    if args.location.is_some() {
        config.location = args.location.clone();
    }
    let resources = std::mem::take(&mut config.resources);

    info!("connecting to peer at {}", args.tcp);
    let transport = TcpTransport::connect(args.tcp.as_str(), args.signal.as_deref())?;
    let mut endpoint = Endpoint::new(transport, config)?;
    describe_metrics();

    let banner = endpoint.begin()?;
    debug!("startup banner: {}", banner);
    register_resources(&mut endpoint, &resources)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("shutdown requested");
        r.store(false, Ordering::SeqCst);
    })?;

    let (console, _console_thread) = console::spawn(BufReader::new(io::stdin()))?;
    let mut router = CommandRouter::new(SimulatedPins::new());
    let idle = Duration::from_millis(args.idle_ms);

    let result = serve(&mut endpoint, &mut router, &console, &running, idle);

    info!(
        "requests: {} sent, {} succeeded, {} failed; inbound: {} routed, {} dropped",
        endpoint.requests_sent(),
        endpoint.requests_succeeded(),
        endpoint.requests_failed(),
        router.lines_routed(),
        router.lines_dropped()
    );
    result.map_err(Into::into)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Create every configured resource on the peer.
fn register_resources<T: Transport, C: Clock>(
    endpoint: &mut Endpoint<T, C>,
    resources: &[ResourceConfig],
) -> EndpointResult<()> {
    for resource in resources {
        let handle = endpoint.create_resource(&resource.uri, resource.max_len, &resource.attr)?;
        if resource.echo_puts {
            endpoint
                .registry_mut()
                .set_put_handler(handle, |params: &str| Some(params.to_string()))?;
        }
        info!("registered {} as resource {}", resource.uri, handle);
    }
    Ok(())
}

/// Poll loop: one console command or one inbound line per pass.
fn serve<C: Clock>(
    endpoint: &mut Endpoint<TcpTransport, C>,
    router: &mut CommandRouter<SimulatedPins>,
    console: &Receiver<ConsoleInput>,
    running: &AtomicBool,
    idle: Duration,
) -> EndpointResult<()> {
    let mut console_open = true;

    while running.load(Ordering::SeqCst) {
        if endpoint.transport().is_closed() {
            return Err(EndpointError::Io(io::ErrorKind::ConnectionAborted.into()));
        }

        if console_open {
            match console.try_recv() {
                Ok(input) => {
                    run_console(endpoint, input);
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    debug!("console closed, serving peer only");
                    console_open = false;
                }
            }
        }

        match router.poll(endpoint) {
            Ok(Routed::Idle) => std::thread::sleep(idle),
            Ok(Routed::Deferred) => match endpoint.await_response() {
                Ok(response) => info!("unsolicited response: {}", response),
                Err(e) => warn!("discarding unsolicited frame: {}", e),
            },
            Ok(routed) => debug!("routed {:?}", routed),
            Err(EndpointError::Io(e)) => return Err(EndpointError::Io(e)),
            // already logged by the router or the endpoint
            Err(e) => debug!("inbound command failed: {}", e),
        }
    }
    Ok(())
}

fn run_console<T: Transport, C: Clock>(endpoint: &mut Endpoint<T, C>, input: ConsoleInput) {
    let outcome = match &input {
        ConsoleInput::Search { mote, resource } => endpoint
            .search_resources(mote, resource)
            .map(|response| response.content().to_string()),
        ConsoleInput::Motes => endpoint.get_motes().map(|motes| motes.join("\n")),
        ConsoleInput::Command(command) => endpoint.local_command(command),
    };
    match outcome {
        Ok(reply) => println!("{reply}"),
        Err(e) => warn!("console {:?} failed: {}", input, e),
    }
}
