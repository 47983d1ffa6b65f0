//! Probe packets, RTT measurement, and the `PacketIo` collaborator.
//!
//! `RawPacketIo` is the real implementation, built the way
//! `debug-net/timing-attack` builds its frames: innermost layer out
//! (ICMP -> IPv4 -> Ethernet), each buffer sized exactly for its payload.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{Ipv4Packet, MutableIpv4Packet};
use pnet::packet::{MutablePacket, Packet};
use pnet::util::MacAddr;
use rand::Rng;

/// A round-trip time measurement, or the reference's `+inf` sentinel for a
/// reply that never arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rtt {
    Finite(Duration),
    Infinite,
}

impl Rtt {
    /// Builds from a raw, possibly-negative duration in seconds, applying the
    /// clock-glitch coercion spec.md §3 requires (negative -> 0, logged).
    pub fn from_secs_f64(raw: f64) -> Self {
        if raw.is_infinite() && raw.is_sign_positive() {
            Rtt::Infinite
        } else if raw < 0.0 {
            log::warn!("negative RTT {raw}s (clock glitch) coerced to 0");
            Rtt::Finite(Duration::ZERO)
        } else {
            Rtt::Finite(Duration::from_secs_f64(raw))
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        match self {
            Rtt::Finite(d) => d.as_secs_f64(),
            Rtt::Infinite => f64::INFINITY,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Rtt::Finite(_))
    }
}

/// The conceptual `(src_mac, src_ip, dst_ip, icmp_id)` probe tuple.
#[derive(Debug, Clone, Copy)]
pub struct ProbePacket {
    pub src_mac: [u8; 6],
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub icmp_id: u16,
}

impl ProbePacket {
    /// Builds a packet with a fresh random ICMP id, reducing RTT cross-talk
    /// between in-flight requests (spec.md §3).
    pub fn new(src_mac: [u8; 6], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Self {
        Self {
            src_mac,
            src_ip,
            dst_ip,
            icmp_id: rand::thread_rng().gen(),
        }
    }
}

/// The required collaborator: send a frame and (optionally) await its reply.
pub trait PacketIo {
    fn send_and_recv(&mut self, pkt: &ProbePacket) -> Rtt;
    fn send(&mut self, pkt: &ProbePacket);
    fn pacing_send(&mut self, pkts: &[ProbePacket], pps: u32);
}

const RTT_TIMEOUT: Duration = Duration::from_secs(5);

/// A raw-socket `PacketIo` built on `pnet`'s datalink channel.
pub struct RawPacketIo {
    sender: Box<dyn DataLinkSender>,
    receiver: Box<dyn DataLinkReceiver>,
    dst_mac: MacAddr,
}

impl RawPacketIo {
    pub fn new(iface_name: &str, dst_mac: MacAddr) -> anyhow::Result<Self> {
        let interfaces = datalink::interfaces();
        let interface: NetworkInterface = interfaces
            .into_iter()
            .find(|i| i.name == iface_name)
            .ok_or_else(|| anyhow::anyhow!("could not find interface '{iface_name}'"))?;

        let mut cfg = datalink::Config::default();
        cfg.read_timeout = Some(Duration::from_millis(50));
        let (sender, receiver) = match datalink::channel(&interface, cfg)? {
            Channel::Ethernet(tx, rx) => (tx, rx),
            _ => anyhow::bail!("unsupported channel type for '{iface_name}'"),
        };

        Ok(Self { sender, receiver, dst_mac })
    }

    fn build_frame(&self, pkt: &ProbePacket) -> Vec<u8> {
        let mut icmp_buf = vec![0u8; 8];
        {
            let mut echo = MutableEchoRequestPacket::new(&mut icmp_buf).unwrap();
            echo.set_icmp_type(IcmpTypes::EchoRequest);
            echo.set_identifier(pkt.icmp_id);
            echo.set_sequence_number(0);
            let checksum = icmp::checksum(&IcmpPacket::new(echo.packet()).unwrap());
            echo.set_checksum(checksum);
        }

        let total_len = Ipv4Packet::minimum_packet_size() + icmp_buf.len();
        let mut ip_buf = vec![0u8; total_len];
        {
            let mut ip = MutableIpv4Packet::new(&mut ip_buf).unwrap();
            ip.set_version(4);
            ip.set_header_length(5);
            ip.set_total_length(total_len as u16);
            ip.set_ttl(64);
            ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
            ip.set_source(pkt.src_ip);
            ip.set_destination(pkt.dst_ip);
            ip.set_payload(&icmp_buf);
            let checksum = pnet::packet::ipv4::checksum(&ip.to_immutable());
            ip.set_checksum(checksum);
        }

        let eth_len = EthernetPacket::minimum_packet_size() + ip_buf.len();
        let mut eth_buf = vec![0u8; eth_len];
        {
            let mut eth = MutableEthernetPacket::new(&mut eth_buf).unwrap();
            eth.set_destination(self.dst_mac);
            eth.set_source(MacAddr::new(
                pkt.src_mac[0],
                pkt.src_mac[1],
                pkt.src_mac[2],
                pkt.src_mac[3],
                pkt.src_mac[4],
                pkt.src_mac[5],
            ));
            eth.set_ethertype(EtherTypes::Ipv4);
            eth.set_payload(&ip_buf);
        }

        eth_buf
    }

    /// True if `data` is an ICMP echo reply matching `pkt`'s identifier and
    /// address pair.
    fn matches(data: &[u8], pkt: &ProbePacket) -> bool {
        let Some(eth) = EthernetPacket::new(data) else { return false };
        if eth.get_ethertype() != EtherTypes::Ipv4 {
            return false;
        }
        let Some(ip) = Ipv4Packet::new(eth.payload()) else { return false };
        if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
            return false;
        }
        if ip.get_source() != pkt.dst_ip || ip.get_destination() != pkt.src_ip {
            return false;
        }
        let Some(icmp_pkt) = IcmpPacket::new(ip.payload()) else { return false };
        if icmp_pkt.get_icmp_type() != IcmpTypes::EchoReply {
            return false;
        }
        icmp_pkt.payload().get(0..2).map(|b| u16::from_be_bytes([b[0], b[1]])) == Some(pkt.icmp_id)
    }
}

impl PacketIo for RawPacketIo {
    fn send_and_recv(&mut self, pkt: &ProbePacket) -> Rtt {
        let frame = self.build_frame(pkt);
        let start = Instant::now();
        match self.sender.send_to(&frame, None) {
            Some(Ok(())) => {}
            _ => return Rtt::Infinite,
        }

        loop {
            if start.elapsed() > RTT_TIMEOUT {
                return Rtt::Infinite;
            }
            match self.receiver.next() {
                Ok(data) if Self::matches(data, pkt) => return Rtt::Finite(start.elapsed()),
                _ => continue,
            }
        }
    }

    fn send(&mut self, pkt: &ProbePacket) {
        let frame = self.build_frame(pkt);
        let _ = self.sender.send_to(&frame, None);
    }

    fn pacing_send(&mut self, pkts: &[ProbePacket], pps: u32) {
        if pps == 0 || pkts.is_empty() {
            for p in pkts {
                self.send(p);
            }
            return;
        }
        let gap = Duration::from_secs_f64(1.0 / pps as f64);
        for p in pkts {
            self.send(p);
            std::thread::sleep(gap);
        }
    }
}
