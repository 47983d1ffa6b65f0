//! `IdleTimeoutProber`: binary search over sleep intervals.
//!
//! Preserves the reference's sign convention exactly as written (spec.md
//! §4.5, §9.1): `p > alpha` (RTTs indistinguishable, rule still alive)
//! narrows `r` *downward*, which reads backwards from the natural
//! "idle survived `mid` seconds -> true idle >= mid" intuition. This is a
//! deliberate preservation, not an oversight -- see DESIGN.md for the
//! decision record and the scenario test below for the pinned behavior.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::mac::MacIdentity;
use crate::packet::{PacketIo, ProbePacket};
use crate::sampler::sample_batch;
use crate::stats::{welch_t_test, Alternative};

pub struct IdleTimeoutConfig {
    pub n: usize,
    pub t_sup: u64,
    pub alpha: f64,
    pub bit: u8,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

impl IdleTimeoutConfig {
    pub fn with_t_sup(t_sup: u64) -> Self {
        Self { t_sup, ..Self::default() }
    }
}

impl Default for IdleTimeoutConfig {
    fn default() -> Self {
        Self {
            n: 5,
            t_sup: 60,
            alpha: 0.05,
            bit: 0,
            src_ip: Ipv4Addr::new(10, 0, 0, 1),
            dst_ip: Ipv4Addr::new(10, 0, 0, 3),
        }
    }
}

fn build_batch(cfg: &IdleTimeoutConfig) -> Vec<ProbePacket> {
    let mut mac = MacIdentity::random();
    (0..cfg.n)
        .map(|i| {
            mac.flip(cfg.bit + i as u8, true).expect("bit stays in range for reasonable n");
            ProbePacket::new(mac.to_bytes(), cfg.src_ip, cfg.dst_ip)
        })
        .collect()
}

/// Returns the inferred idle timeout in whole seconds, or `0` ("no
/// detectable idle timeout") when the search saturates `l >= t_sup`.
///
/// The batch is built once and reused across every iteration: idle-timer
/// semantics are measured against one fixed flow, not regenerated each step.
pub fn probe_idle_timeout(
    io: &mut dyn PacketIo,
    cfg: &IdleTimeoutConfig,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> u64 {
    let pkts = build_batch(cfg);

    let mut l: i64 = 0;
    let mut r: i64 = cfg.t_sup as i64;

    while l < r {
        if cancel.is_cancelled() {
            break;
        }

        let rtt0 = sample_batch(io, &pkts);
        let mid = (l + r).div_euclid(2);
        clock.sleep(Duration::from_secs(mid.max(0) as u64));
        let rtt1 = sample_batch(io, &pkts);

        let p = welch_t_test(&rtt0, &rtt1, Alternative::TwoSided);
        if p > cfg.alpha {
            r = mid - 1;
        } else {
            l = mid + 1;
        }

        clock.sleep(Duration::from_secs(r.max(0) as u64));
    }

    let l = l.max(0) as u64;
    if l >= cfg.t_sup {
        0
    } else {
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::packet::Rtt;
    use std::cell::Cell;

    /// Models a single shared flow entry refreshed by every touch: a touch
    /// arriving `idle_timeout` or more seconds after the last one pays an
    /// install cost; a zero `idle_timeout` never expires.
    struct IdleOracle<'a> {
        clock: &'a VirtualClock,
        idle_timeout: Duration,
        last_activity: Cell<Option<Duration>>,
        install_rtt: Duration,
        cached_rtt: Duration,
    }

    impl PacketIo for IdleOracle<'_> {
        fn send_and_recv(&mut self, _pkt: &ProbePacket) -> Rtt {
            let now = self.clock.now();
            let expired = match self.last_activity.get() {
                None => true,
                Some(last) => !self.idle_timeout.is_zero() && now.saturating_sub(last) >= self.idle_timeout,
            };
            self.last_activity.set(Some(now));
            Rtt::Finite(if expired { self.install_rtt } else { self.cached_rtt })
        }
        fn send(&mut self, pkt: &ProbePacket) {
            let _ = self.send_and_recv(pkt);
        }
        fn pacing_send(&mut self, pkts: &[ProbePacket], _pps: u32) {
            for p in pkts {
                self.send(p);
            }
        }
    }

    #[test]
    fn pins_seven_second_idle_timeout() {
        let clock = VirtualClock::new();
        let mut io = IdleOracle {
            clock: &clock,
            idle_timeout: Duration::from_secs(7),
            last_activity: Cell::new(None),
            install_rtt: Duration::from_millis(50),
            cached_rtt: Duration::from_millis(1),
        };
        let cfg = IdleTimeoutConfig::with_t_sup(60);
        let cancel = CancelToken::new();
        let result = probe_idle_timeout(&mut io, &cfg, &clock, &cancel);
        assert_eq!(result, 7);
    }

    #[test]
    fn binary_search_terminates_within_log2_bound() {
        // Count iterations via a wrapper that increments a counter per touch pair.
        let clock = VirtualClock::new();
        let t_sup = 60u64;
        let io = IdleOracle {
            clock: &clock,
            idle_timeout: Duration::from_secs(1),
            last_activity: Cell::new(None),
            install_rtt: Duration::from_millis(50),
            cached_rtt: Duration::from_millis(1),
        };
        struct Counting<'a> {
            inner: IdleOracle<'a>,
            calls: Cell<u32>,
        }
        impl PacketIo for Counting<'_> {
            fn send_and_recv(&mut self, pkt: &ProbePacket) -> Rtt {
                self.calls.set(self.calls.get() + 1);
                self.inner.send_and_recv(pkt)
            }
            fn send(&mut self, pkt: &ProbePacket) {
                self.inner.send(pkt)
            }
            fn pacing_send(&mut self, pkts: &[ProbePacket], pps: u32) {
                self.inner.pacing_send(pkts, pps)
            }
        }
        let mut counting = Counting { inner: io, calls: Cell::new(0) };
        let cfg = IdleTimeoutConfig::with_t_sup(t_sup);
        let cancel = CancelToken::new();
        probe_idle_timeout(&mut counting, &cfg, &clock, &cancel);

        let n = cfg.n as u32;
        let max_iterations = (t_sup as f64 + 1.0).log2().ceil() as u32 + 1;
        let max_calls = max_iterations * 2 * n;
        assert!(
            counting.calls.get() <= max_calls,
            "used {} sample calls, expected <= {}",
            counting.calls.get(),
            max_calls
        );
    }
}
