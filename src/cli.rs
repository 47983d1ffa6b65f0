//! Argument parsing for the `flowcrush` binary (spec.md §6, extended per
//! SPEC_FULL.md §9.1 with a standalone `attack` subcommand).

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "flowcrush")]
#[command(about = "Black-box flow-table timeout inference and saturation tool")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Ethernet interface to send and receive probe/attack frames on.
    #[arg(short, long, global = true, default_value = "eth0")]
    pub iface: String,

    /// Where to append CSV probe results.
    #[arg(long, global = true, default_value = "results.csv")]
    pub results: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run HardTimeoutProber then IdleTimeoutProber against one server, and
    /// append the outcome to the results file.
    Probe {
        /// Source address to probe from (this host's attacker-facing IP).
        attacker_ip: Ipv4Addr,

        /// Target server address behind the switch under test.
        server_ip: Ipv4Addr,

        /// Validate the measurement channel with the MAC field-presence
        /// probe (spec.md §4.3) before running the timeout probers.
        #[arg(long)]
        field_probe: bool,
    },

    /// Classify the discovered timeouts and run the saturating injection
    /// loop until interrupted.
    Attack {
        attacker_ip: Ipv4Addr,
        server_ip: Ipv4Addr,

        /// Hard timeout in seconds, as already discovered by `probe`.
        #[arg(long, default_value_t = 0)]
        hard_timeout: u64,

        /// Idle timeout in seconds, as already discovered by `probe`.
        #[arg(long, default_value_t = 0)]
        idle_timeout: u64,

        #[arg(long, default_value_t = crate::config::DEFAULT_PAYLOAD_LEN)]
        payload_len: u32,

        #[arg(long, default_value_t = crate::config::DEFAULT_MAX_COUNT)]
        max_count: u32,
    },

    /// Sets up the emulated topology (external responsibility) and launches
    /// `probe` on the designated attacker host, optionally cross-checking
    /// against the out-of-band Ryu observer.
    Experiment {
        attacker_ip: Ipv4Addr,
        server_ip: Ipv4Addr,

        /// Ryu controller host:port for ground-truth flow counts.
        #[arg(long)]
        controller: Option<String>,

        /// Switch datapath IDs to sum flow counts across.
        #[arg(long, value_delimiter = ',')]
        dpids: Vec<u64>,
    },
}
