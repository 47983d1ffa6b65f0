//! `HardTimeoutProber`: linear-wait probe for the absolute flow-rule lifetime.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::mac::MacIdentity;
use crate::packet::{PacketIo, ProbePacket};
use crate::sampler::sample_batch;
use crate::stats::{welch_t_test, Alternative};

pub struct HardTimeoutConfig {
    pub n: usize,
    pub t_wait: Duration,
    pub t_max: Duration,
    pub alpha: f64,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub bit: u8,
}

impl Default for HardTimeoutConfig {
    fn default() -> Self {
        Self {
            n: 5,
            t_wait: Duration::from_millis(500),
            t_max: Duration::from_secs(60),
            alpha: 0.05,
            src_ip: Ipv4Addr::new(10, 0, 0, 1),
            dst_ip: Ipv4Addr::new(10, 0, 0, 3),
            bit: 0,
        }
    }
}

fn build_batch(cfg: &HardTimeoutConfig) -> Vec<ProbePacket> {
    let mut mac = MacIdentity::random();
    (0..cfg.n)
        .map(|i| {
            mac.flip(cfg.bit + i as u8, true).expect("bit stays in range for reasonable n");
            ProbePacket::new(mac.to_bytes(), cfg.src_ip, cfg.dst_ip)
        })
        .collect()
}

/// Returns the inferred hard timeout in whole seconds, or `0` if none was
/// detected within `t_max`.
pub fn probe_hard_timeout(
    io: &mut dyn PacketIo,
    cfg: &HardTimeoutConfig,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> u64 {
    let pkts = build_batch(cfg);

    let t_start = clock.now();
    let rtt0 = sample_batch(io, &pkts);

    let mut t_end = t_start;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        clock.sleep(cfg.t_wait);
        t_end = clock.now();
        let rtt1 = sample_batch(io, &pkts);
        let p = welch_t_test(&rtt0, &rtt1, Alternative::TwoSided);
        if p > cfg.alpha || t_end.saturating_sub(t_start) > cfg.t_max {
            break;
        }
    }

    let elapsed = t_end.saturating_sub(t_start);
    if elapsed > cfg.t_max {
        0
    } else {
        elapsed.as_secs_f64().round() as u64
    }
}
