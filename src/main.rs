use std::fs::{self, File};
use std::io::BufWriter;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tunnel_pcap::relay::relay;
use tunnel_pcap::Endpoints;

mod dump;

#[derive(Parser, Debug)]
#[command(
    name = "tunnel-pcap",
    version,
    about = "Relay TCP connections and record the forwarded bytes as pcap"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept connections, relay them to a target and record client traffic
    Record {
        /// Address to accept connections on
        #[arg(long, env = "TUNNEL_PCAP_LISTEN")]
        listen: SocketAddr,

        /// Address every accepted connection is relayed to
        #[arg(long, env = "TUNNEL_PCAP_TARGET")]
        target: SocketAddr,

        /// Directory receiving one capture file per connection
        #[arg(long, env = "TUNNEL_PCAP_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,
    },
    /// Print the records of a capture file
    Dump {
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Record {
            listen,
            target,
            output_dir,
        } => record(listen, target, &output_dir),
        Command::Dump { input } => dump::dump(&input),
    }
}

fn record(listen: SocketAddr, target: SocketAddr, output_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let listener = TcpListener::bind(listen).with_context(|| format!("binding {listen}"))?;
    info!(%listen, %target, "accepting connections");

    for (id, client) in listener.incoming().enumerate() {
        let client = match client {
            Ok(client) => client,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        let path = output_dir.join(format!("tunnel-{id}.pcap"));
        if let Err(err) = spawn_connection(client, target, path) {
            warn!(id, "dropping connection: {err:#}");
        }
    }
    Ok(())
}

fn spawn_connection(client: TcpStream, target: SocketAddr, path: PathBuf) -> anyhow::Result<()> {
    let upstream = TcpStream::connect(target).with_context(|| format!("connecting {target}"))?;
    let endpoints = Endpoints::from_sockets(client.peer_addr()?, upstream.peer_addr()?);
    // refuse early rather than relaying a tunnel that can never be recorded
    endpoints.resolve()?;

    let sink = BufWriter::new(
        File::create(&path).with_context(|| format!("creating {}", path.display()))?,
    );
    thread::spawn(move || match relay(client, upstream, endpoints, sink) {
        Ok(stats) => info!(path = %path.display(), records = stats.records, "capture written"),
        Err(err) => error!(path = %path.display(), %err, "relay failed"),
    });
    Ok(())
}
