//! `AttackClassifier`: maps `(t_hard, t_idle)` to an attack category.

/// Discrete SDN timeout configuration class, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackCategory {
    /// Neither timeout enforced; impossible to exhaust via timeouts.
    NoTimeout = 1,
    /// Hard timeout only; rule lifetime fixed.
    HardOnly = 2,
    /// Idle timeout only; rule survives while traffic flows.
    IdleOnly = 3,
    /// Both enforced.
    Both = 4,
}

impl AttackCategory {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

pub fn classify(t_hard: u64, t_idle: u64) -> AttackCategory {
    match (t_hard, t_idle) {
        (0, 0) => AttackCategory::NoTimeout,
        (_, 0) => AttackCategory::HardOnly,
        (0, _) => AttackCategory::IdleOnly,
        _ => AttackCategory::Both,
    }
}
