//! The MAC field-presence probe (spec.md §4.3).
//!
//! Validates the measurement channel: if the switch matches flow rules on
//! the exact source MAC, a freshly-flipped MAC should pay an install cost
//! the first time it is seen and not the second. The engine only consumes
//! the positive (bitmask-is-all-ones) outcome elsewhere; this probe exists
//! to confirm that assumption holds against a given target before the
//! timeout probers are trusted.

use std::net::Ipv4Addr;

use crate::mac::MacIdentity;
use crate::packet::{PacketIo, ProbePacket};
use crate::sampler::sample_batch;
use crate::stats::{welch_t_test, Alternative};

pub struct FieldProbeConfig {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub n: usize,
    pub alpha: f64,
}

impl Default for FieldProbeConfig {
    fn default() -> Self {
        Self {
            src_ip: Ipv4Addr::new(10, 0, 0, 1),
            dst_ip: Ipv4Addr::new(10, 0, 0, 3),
            n: 10,
            alpha: 0.05,
        }
    }
}

/// Returns the inferred bitmask: `ff:ff:ff:ff:ff:ff` if the source MAC is
/// matched exactly, `00:00:00:00:00:00` otherwise.
pub fn probe_mac_field(io: &mut dyn PacketIo, cfg: &FieldProbeConfig) -> [u8; 6] {
    let mut mac = MacIdentity::random();
    let mut pkt = ProbePacket::new(mac.to_bytes(), cfg.src_ip, cfg.dst_ip);

    let mut rtt0 = Vec::with_capacity(cfg.n);
    let mut rtt1 = Vec::with_capacity(cfg.n);

    for i in 0..cfg.n {
        io.send(&pkt);
        mac.flip(i as u8, true).expect("n bounded well under 48");
        pkt = ProbePacket::new(mac.to_bytes(), cfg.src_ip, cfg.dst_ip);

        rtt0.extend(sample_batch(io, std::slice::from_ref(&pkt)));
        rtt1.extend(sample_batch(io, std::slice::from_ref(&pkt)));
    }

    let p = welch_t_test(&rtt0, &rtt1, Alternative::Greater);
    if p < cfg.alpha {
        [0xff; 6]
    } else {
        [0x00; 6]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Rtt;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays a scripted RTT sequence regardless of packet content.
    struct ScriptedIo(VecDeque<Rtt>);
    impl PacketIo for ScriptedIo {
        fn send_and_recv(&mut self, _pkt: &ProbePacket) -> Rtt {
            self.0.pop_front().unwrap_or(Rtt::Infinite)
        }
        fn send(&mut self, _pkt: &ProbePacket) {}
        fn pacing_send(&mut self, _pkts: &[ProbePacket], _pps: u32) {}
    }

    #[test]
    fn install_cost_shift_is_detected_as_exact_match() {
        // rtt0 (just-flipped, first touch) pays an install cost; rtt1 (second
        // touch) is cheap, matching "the field is matched exactly".
        let mut script = VecDeque::new();
        for _ in 0..10 {
            script.push_back(Rtt::Finite(Duration::from_millis(50)));
            script.push_back(Rtt::Finite(Duration::from_millis(1)));
        }
        let mut io = ScriptedIo(script);
        let bitmask = probe_mac_field(&mut io, &FieldProbeConfig::default());
        assert_eq!(bitmask, [0xff; 6]);
    }

    #[test]
    fn uniform_cost_is_detected_as_unmatched() {
        let mut script = VecDeque::new();
        for _ in 0..20 {
            script.push_back(Rtt::Finite(Duration::from_millis(5)));
        }
        let mut io = ScriptedIo(script);
        let bitmask = probe_mac_field(&mut io, &FieldProbeConfig::default());
        assert_eq!(bitmask, [0x00; 6]);
    }
}
