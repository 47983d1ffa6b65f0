//! `RttSampler`: one measurement pass over a probe batch.

use crate::packet::{PacketIo, ProbePacket, Rtt};

/// Sends each packet in `packets` exactly once, recording its RTT.
pub fn sample_batch(io: &mut dyn PacketIo, packets: &[ProbePacket]) -> Vec<Rtt> {
    packets.iter().map(|pkt| io.send_and_recv(pkt)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    struct FixedRtt(Duration);
    impl PacketIo for FixedRtt {
        fn send_and_recv(&mut self, _pkt: &ProbePacket) -> Rtt {
            Rtt::Finite(self.0)
        }
        fn send(&mut self, _pkt: &ProbePacket) {}
        fn pacing_send(&mut self, _pkts: &[ProbePacket], _pps: u32) {}
    }

    #[test]
    fn samples_one_rtt_per_packet() {
        let mut io = FixedRtt(Duration::from_millis(10));
        let pkts = vec![
            ProbePacket::new([0; 6], Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
            5
        ];
        let rtts = sample_batch(&mut io, &pkts);
        assert_eq!(rtts.len(), 5);
        assert!(rtts.iter().all(|r| r.is_finite()));
    }
}
