use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use log::{debug, error, info, warn};
use pnet::datalink::{self, Channel::Ethernet};

use flowtbag::{decoder, Config, CsvSink, FlowError, FlowTable, Result, Sink};

/// Single-pass flow feature extraction from a pcap file or a live interface.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Read packets from this pcap file instead of a live interface.
    #[arg(long, conflicts_with = "interface")]
    pcap: Option<String>,

    /// Capture live from this network interface (by name).
    #[arg(long)]
    interface: Option<String>,

    /// Destination CSV file for exported flow records.
    #[arg(long, default_value = "flow_features.csv")]
    output: String,

    /// Seconds of inactivity after which a flow is considered expired.
    #[arg(long, default_value_t = Config::DEFAULT_FLOW_TIMEOUT_SECS)]
    timeout: f64,

    /// Seconds of inactivity after which a sub-flow is considered idle.
    #[arg(long, default_value_t = Config::DEFAULT_IDLE_THRESHOLD_SECS)]
    idle_threshold: f64,

    /// How often (in seconds of wall-clock time) to sweep stale flows during
    /// a live capture.
    #[arg(long, default_value_t = 5.0)]
    sweep_interval: f64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::new(args.timeout, args.idle_threshold);
    let mut table = FlowTable::new(config);
    let mut sink = CsvSink::create(&args.output)?;

    let emitted = match (&args.pcap, &args.interface) {
        (Some(path), None) => run_offline(path, &mut table, &mut sink)?,
        (None, Some(name)) => run_live(name, args.sweep_interval, &mut table, &mut sink)?,
        (None, None) => {
            list_interfaces();
            return Err(FlowError::Config(
                "pass --pcap <file> or --interface <name>".to_string(),
            ));
        }
        (Some(_), Some(_)) => unreachable!("clap enforces mutual exclusion"),
    };

    sink.flush()?;
    info!("wrote {} flow records to {}", emitted, args.output);
    Ok(())
}

fn list_interfaces() {
    println!("Available network interfaces:");
    for iface in datalink::interfaces() {
        let ips: Vec<String> = iface
            .ips
            .iter()
            .filter_map(|net| match net.ip() {
                IpAddr::V4(ip) => Some(ip.to_string()),
                IpAddr::V6(_) => None,
            })
            .collect();
        println!(
            "  {} - {}",
            iface.name,
            if ips.is_empty() { "no IPv4 address".to_string() } else { ips.join(", ") }
        );
    }
}

fn run_offline(path: &str, table: &mut FlowTable, sink: &mut dyn Sink) -> Result<usize> {
    let mut capture = pcap::Capture::from_file(path)?;
    let datalink = capture.get_datalink();
    let mut emitted = 0;

    while let Ok(raw) = capture.next() {
        let time = raw.header.ts.tv_sec as f64 + raw.header.ts.tv_usec as f64 / 1_000_000.0;
        let view = match datalink.0 {
            // DLT_EN10MB
            1 => decoder::decode_ethernet_frame(time, raw.data),
            // DLT_RAW and friends: no link layer, IPv4 starts at byte 0
            _ => decoder::decode_ipv4(time, raw.data),
        };
        let Some(view) = view else {
            debug!("skipping undecodable packet");
            continue;
        };
        emitted += table.ingest(&view, sink)?;
    }

    emitted += table.drain(sink)?;
    Ok(emitted)
}

fn run_live(interface_name: &str, sweep_interval: f64, table: &mut FlowTable, sink: &mut dyn Sink) -> Result<usize> {
    let interface = datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == interface_name)
        .ok_or_else(|| FlowError::Config(format!("no such interface: {}", interface_name)))?;

    let mut config = datalink::Config::default();
    config.promiscuous = true;
    let (_, mut rx) = match datalink::channel(&interface, config) {
        Ok(Ethernet(_, rx)) => ((), rx),
        Ok(_) => return Err(FlowError::Capture("unsupported channel type".to_string())),
        Err(err) => return Err(FlowError::Capture(err.to_string())),
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            info!("signal received, draining flows...");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let start = Instant::now();
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    let mut last_sweep = Instant::now();
    let mut emitted = 0;

    info!("capturing on {}... press Ctrl+C to stop", interface.name);
    while running.load(Ordering::SeqCst) {
        match rx.next() {
            Ok(frame) => {
                let time = epoch + start.elapsed().as_secs_f64();
                if let Some(view) = decoder::decode_ethernet_frame(time, frame) {
                    emitted += table.ingest(&view, sink)?;
                }
            }
            Err(err) => {
                warn!("error reading packet: {}", err);
                continue;
            }
        }
        if last_sweep.elapsed().as_secs_f64() >= sweep_interval {
            let now = epoch + start.elapsed().as_secs_f64();
            emitted += table.sweep(now, sink)?;
            last_sweep = Instant::now();
        }
    }

    emitted += table.drain(sink)?;
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcap_and_interface_together_are_rejected() {
        let result = Args::try_parse_from([
            "flowtbag",
            "--pcap",
            "capture.pcap",
            "--interface",
            "eth0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn pcap_alone_parses() {
        let args = Args::try_parse_from(["flowtbag", "--pcap", "capture.pcap"]).unwrap();
        assert_eq!(args.pcap.as_deref(), Some("capture.pcap"));
        assert_eq!(args.interface, None);
    }

    #[test]
    fn interface_alone_parses() {
        let args = Args::try_parse_from(["flowtbag", "--interface", "eth0"]).unwrap();
        assert_eq!(args.interface.as_deref(), Some("eth0"));
        assert_eq!(args.pcap, None);
    }

    #[test]
    fn timeout_and_idle_threshold_default_to_the_spec_constants() {
        let args = Args::try_parse_from(["flowtbag", "--interface", "eth0"]).unwrap();
        assert_eq!(args.timeout, Config::DEFAULT_FLOW_TIMEOUT_SECS);
        assert_eq!(args.idle_threshold, Config::DEFAULT_IDLE_THRESHOLD_SECS);
    }
}
