//! top level entry point called by main to run the vj server unit
//!
//! This function will never return in normal operation.  It loads the
//! settings file, brings up the OSC control listener on the configured
//! transport, and then settles into the frame-paced drain loop: every
//! tick it empties the control event queue into frame-local state and
//! forwards parameter payloads to the session sink.
//!
//! A bind failure is the one fatal condition: run() returns the error
//! and the process is expected to exit.  Everything after bind is
//! handled where it happens; a dropped connection or malformed packet
//! never takes the loop down.
//!
//! The GL-facing particle engine is owned by whichever host holds the
//! GL context; it is ticked from the host frame callback, not from here.
use log::{debug, error, info};
use simple_error::bail;
use std::{net::SocketAddr, sync::mpsc, thread, time::Duration};
use thread_priority::{ThreadBuilder, ThreadPriority};

use crate::common::box_error::BoxError;
use crate::common::config::Config;
use crate::common::session::ChannelSink;
use crate::common::stream_time_stat::{MicroTimer, StreamTimeStat};
use crate::control::receiver::{ControlReceiver, ListenerHandle, Transport};
use crate::control::state::{drain_events, ControlEvent, ControlState};
use crate::control::surface::{register_control_surface, SurfaceConfig};
use crate::utils::get_micro_time;

/// drain loop pacing, nominal 60 ticks per second
const FRAME_INTERVAL_US: u128 = 16_667;

pub struct VjConfig {
    pub port: u16,
    pub transport: Transport,
    /// the one originator retained in tcp mode
    pub allowed_peer: SocketAddr,
    pub render_width: u32,
    pub render_height: u32,
}

/// This is the entry point for the vj server unit.
///
/// # Parameters
///
/// - `config_file`: optional settings file name (defaults to settings.json)
/// - `port_override`: command line port, wins over the settings file
/// - `force_tcp`: switch the control endpoint to connection-oriented mode
pub fn run(
    config_file: Option<&str>,
    port_override: Option<u16>,
    force_tcp: bool,
) -> Result<(), BoxError> {
    info!("client - starting run function");
    let mut cfg = init_config(config_file)?;
    if let Some(port) = port_override {
        cfg.port = port;
    }
    if force_tcp {
        cfg.transport = Transport::Tcp;
    }
    debug!("client::run - config init complete");

    let (event_tx, event_rx) = mpsc::channel();
    let (sink, session_rx) = ChannelSink::new();

    // Stand-in relay for the external session runtime.  The real thing
    // owns a websocket; all it sees from us is the payload text.
    let _session_handle = thread::spawn(move || {
        for text in session_rx {
            debug!("session <- {}", text);
        }
    });

    // Bind failure lands here and the process dies with it
    let (listener, port) = start_listener(&cfg, event_tx)?;
    info!("control listener up on port {} ({:?})", port, cfg.transport);

    let builder = ThreadBuilder::default()
        .name("Control Drain Thread".to_string())
        .priority(ThreadPriority::Max);
    let drain_handle = builder.spawn(move |_result| {
        run_drain_loop(event_rx, sink);
    })?;
    let _res = drain_handle.join();
    listener.stop();
    Ok(())
}

/// Build the receiver, register the control surface and get the
/// transport running.  Returns the handle and the actual bound port.
pub fn start_listener(
    cfg: &VjConfig,
    events: mpsc::Sender<ControlEvent>,
) -> Result<(ListenerHandle, u16), BoxError> {
    let mut receiver = ControlReceiver::new(cfg.transport);
    register_control_surface(
        &mut receiver,
        events,
        SurfaceConfig {
            render_width: cfg.render_width as f32,
            render_height: cfg.render_height as f32,
        },
    );
    receiver.bind(cfg.port).map_err(|e| {
        error!("{}", e);
        e
    })?;
    let port = receiver.local_port().unwrap_or(cfg.port);
    let listener = match cfg.transport {
        Transport::Udp => receiver.listen(|err| {
            error!("{}", err);
            false
        })?,
        Transport::Tcp => {
            let expected = cfg.allowed_peer;
            receiver.accept(
                |err| {
                    error!("{}", err);
                    false
                },
                // retain a connection only when it comes from the one
                // expected originator
                move |peer, _id| peer == expected,
            )?
        }
    };
    Ok((listener, port))
}

fn init_config(config_file: Option<&str>) -> Result<VjConfig, BoxError> {
    let default_params = json::object! {
        "osc_port": 7000,
        "osc_transport": "udp",
        "allowed_peer": "127.0.0.1:10000",
        "render_width": 640,
        "render_height": 480
    };

    // Default to settings.json if no file is provided
    let filename = config_file.unwrap_or("settings.json");
    info!("Using config file: {}", filename);

    let config = Config::build(String::from(filename), default_params).map_err(|e| {
        error!("Issue with config file or parameter: {}", e);
        e
    })?;

    let port = config.get_u32_value("osc_port", None)? as u16;
    let transport = match config.get_str_value("osc_transport", None)?.as_str() {
        "udp" => Transport::Udp,
        "tcp" => Transport::Tcp,
        other => bail!("unknown osc_transport '{}' (use udp or tcp)", other),
    };
    let allowed_peer: SocketAddr = config.get_str_value("allowed_peer", None)?.parse()?;
    let render_width = config.get_u32_value("render_width", None)?;
    let render_height = config.get_u32_value("render_height", None)?;

    info!(
        "Config values: osc_port: {}, osc_transport: {:?}, allowed_peer: {}",
        port, transport, allowed_peer
    );

    Ok(VjConfig {
        port,
        transport,
        allowed_peer,
        render_width,
        render_height,
    })
}

/// Frame-paced consumer side of the control channel.  Never returns.
fn run_drain_loop(event_rx: mpsc::Receiver<ControlEvent>, sink: ChannelSink) -> () {
    let mut state = ControlState::new();
    let mut stats = StreamTimeStat::build(100);
    let now = get_micro_time();
    let mut frame_timer = MicroTimer::new(now, FRAME_INTERVAL_US);
    let mut report_timer = MicroTimer::new(now, 10_000_000);

    loop {
        let now = get_micro_time();
        if frame_timer.expired(now) {
            frame_timer.advance(FRAME_INTERVAL_US);
            let handled = drain_events(&event_rx, &mut state, &sink);
            stats.add_sample(handled as f64);
            if report_timer.expired(now) {
                report_timer.reset(now);
                debug!("control {} load {}", state, stats);
            }
        }
        thread::sleep(Duration::new(0, 200_000));
    }
}

#[cfg(test)]
mod test_client {
    use super::*;
    use std::net::UdpSocket;

    #[test]
    fn init_config_defaults() {
        // no file on disk: everything comes from the defaults object
        let cfg = init_config(Some("no_such_vj_settings.json")).unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.transport, Transport::Udp);
        assert_eq!(cfg.allowed_peer, "127.0.0.1:10000".parse().unwrap());
        assert_eq!(cfg.render_width, 640);
        assert_eq!(cfg.render_height, 480);
    }

    #[test]
    fn init_config_bad_filename() {
        let result = init_config(Some("Illegal*File$Name"));
        assert!(result.is_err());
    }

    #[test]
    fn bind_failure_is_fatal() {
        // occupy a port, then ask the listener for it
        let squatter = UdpSocket::bind("0.0.0.0:0").unwrap();
        let port = squatter.local_addr().unwrap().port();
        let cfg = VjConfig {
            port,
            transport: Transport::Udp,
            allowed_peer: "127.0.0.1:10000".parse().unwrap(),
            render_width: 640,
            render_height: 480,
        };
        let (tx, _rx) = mpsc::channel();
        let boom = start_listener(&cfg, tx);
        assert!(boom.is_err());
        assert!(boom.err().unwrap().to_string().starts_with("Error binding:"));
    }

    #[test]
    fn listener_comes_up_on_ephemeral_port() {
        let cfg = VjConfig {
            port: 0,
            transport: Transport::Udp,
            allowed_peer: "127.0.0.1:10000".parse().unwrap(),
            render_width: 640,
            render_height: 480,
        };
        let (tx, _rx) = mpsc::channel();
        let (listener, port) = start_listener(&cfg, tx).unwrap();
        assert!(port != 0);
        listener.stop();
    }
}
