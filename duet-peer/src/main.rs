//! Duet peer: one side of a two-device shared canvas, run headless.
//!
//! ```text
//! duet-peer listen [ADDR] [--config FILE] [--size WxH] [--demo]
//! duet-peer connect URL [--config FILE] [--size WxH] [--demo]
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to follow the session.

mod demo;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use duet_collab::{LinkConfig, LinkEvent, PeerLink, SessionConfig, StrokeSynchronizer};
use duet_core::{PathStore, SharedViewport, ViewportSize};
use duet_render::RenderLoop;
use log::info;

use crate::surface::HeadlessSurface;

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
const DEMO_PACE: Duration = Duration::from_millis(4);
const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    name = "duet-peer",
    version,
    about = "One side of a two-device shared canvas, run headless"
)]
struct Args {
    #[command(subcommand)]
    role: Role,

    /// Session config (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Viewport size in pixels
    #[arg(
        long,
        global = true,
        value_name = "WxH",
        default_value = "1080x1920",
        value_parser = parse_size
    )]
    size: ViewportSize,

    /// Draw scripted gestures once a peer connects
    #[arg(long, global = true)]
    demo: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Role {
    /// Wait for a peer to connect
    Listen {
        /// Address to bind (default 127.0.0.1:9191)
        addr: Option<String>,
    },
    /// Connect to a listening peer
    Connect {
        /// WebSocket URL, e.g. ws://192.168.1.20:9191
        url: String,
    },
}

fn parse_size(text: &str) -> Result<ViewportSize, String> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| format!("bad size {text:?}, expected WxH"))?;
    let parse = |v: &str| {
        v.parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| format!("bad size {text:?}, expected WxH"))
    };
    Ok(ViewportSize::new(parse(w)?, parse(h)?))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let session = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    info!("Session framing: {:?}", session.framing);

    let mut link_config = LinkConfig::default();
    if let Role::Listen { addr: Some(addr) } = &args.role {
        link_config.bind_addr = addr.clone();
    }
    let link = PeerLink::new(link_config);
    let mut events = link.take_event_rx().ok_or("link events already taken")?;

    let viewport = Arc::new(SharedViewport::new(args.size));
    let store = PathStore::new();
    let sync = Arc::new(StrokeSynchronizer::new(
        &session,
        viewport,
        store.clone(),
        link.clone(),
    ));

    let surface = Arc::new(HeadlessSurface::new(FRAME_INTERVAL));
    let mut render = RenderLoop::start(surface.clone(), store)?;

    match &args.role {
        Role::Listen { .. } => {
            let addr = link.listen(sync.clone()).await?;
            info!("Waiting for a peer on ws://{addr}");
        }
        Role::Connect { url } => {
            link.connect(url, sync.clone()).await?;
        }
    }

    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(LinkEvent::Connected(peer)) => {
                    info!("Drawing with peer {peer}");
                    if args.demo {
                        let sync = sync.clone();
                        let size = args.size;
                        tokio::task::spawn_blocking(move || demo::play(&sync, size, DEMO_PACE));
                    }
                }
                Some(LinkEvent::Disconnected(peer)) => {
                    info!("Peer {peer} left");
                    if matches!(args.role, Role::Connect { .. }) {
                        break;
                    }
                }
                Some(LinkEvent::Rejected(addr)) => {
                    info!("Turned away {addr}: already paired");
                }
                None => break,
            },
            _ = stats_tick.tick() => {
                let frames = render.stats();
                let strokes = sync.stats();
                let wire = link.stats();
                let shown = surface.last_frame();
                info!(
                    "frames: {} painted, {} skipped | on screen: {} local, {} remote, {} vertices | \
                     chunks: {} sent, {} lost, {} received ({} malformed) | bytes: {} out, {} in",
                    frames.frames_painted, frames.frames_skipped,
                    shown.local_paths, shown.remote_paths, shown.vertices,
                    strokes.chunks_sent, strokes.chunks_lost,
                    strokes.payloads_received, strokes.malformed_payloads,
                    wire.bytes_sent, wire.bytes_received,
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    link.shutdown();
    render.stop()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
