// crates/import-profile-server/src/gate.rs
// ============================================================================
// Module: Abuse Gate
// Description: Per-client fixed window request limiter with blackout.
// Purpose: Refuse over-eager callers before any store access.
// Dependencies: import-profile-config, import-profile-core
// ============================================================================

//! ## Overview
//! [`AbuseGate`] counts requests per peer address inside a fixed window. A
//! client that exceeds `max_requests` is blacked out for `blackout_ms`, and
//! never less than the remainder of its current window. The table holds at
//! most `max_entries` clients; expired entries are evicted first, then the
//! entry with the oldest window.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use import_profile_config::AbuseGateConfig;
use import_profile_core::GateVerdict;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct GateEntry {
    /// Start of the current window (ms since epoch).
    window_start_ms: u64,
    /// Requests seen in the current window.
    count: u32,
    /// Blackout end (ms since epoch); zero when not blacked out.
    blocked_until_ms: u64,
}

impl GateEntry {
    /// Returns true when neither the window nor a blackout is active.
    const fn is_expired(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms >= self.window_start_ms.saturating_add(window_ms)
            && now_ms >= self.blocked_until_ms
    }
}

/// Per-client request limiter.
#[derive(Debug)]
pub struct AbuseGate {
    /// Gate thresholds.
    config: AbuseGateConfig,
    /// Client counters keyed by peer address.
    entries: Mutex<BTreeMap<IpAddr, GateEntry>>,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

impl AbuseGate {
    /// Creates an empty gate.
    #[must_use]
    pub const fn new(config: AbuseGateConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Evaluates one request from `client` at the current wall-clock time.
    #[must_use]
    pub fn check_now(&self, client: IpAddr) -> GateVerdict {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        self.check(client, u64::try_from(now).unwrap_or(u64::MAX))
    }

    /// Evaluates one request from `client` at `now_ms`.
    #[must_use]
    pub fn check(&self, client: IpAddr, now_ms: u64) -> GateVerdict {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&client) && entries.len() >= self.config.max_entries {
            self.evict(&mut entries, now_ms);
        }
        let entry = entries.entry(client).or_insert(GateEntry {
            window_start_ms: now_ms,
            count: 0,
            blocked_until_ms: 0,
        });
        if now_ms < entry.blocked_until_ms {
            return GateVerdict::Blocked;
        }
        let window_end = entry.window_start_ms.saturating_add(self.config.window_ms);
        if now_ms >= window_end {
            entry.window_start_ms = now_ms;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        if entry.count > self.config.max_requests {
            let window_end = entry.window_start_ms.saturating_add(self.config.window_ms);
            entry.blocked_until_ms = now_ms.saturating_add(self.config.blackout_ms).max(window_end);
            return GateVerdict::Blocked;
        }
        GateVerdict::Admitted
    }

    /// Returns the number of tracked clients.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Frees room for one new client.
    fn evict(&self, entries: &mut BTreeMap<IpAddr, GateEntry>, now_ms: u64) {
        let window_ms = self.config.window_ms;
        entries.retain(|_, entry| !entry.is_expired(now_ms, window_ms));
        while entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.window_start_ms)
                .map(|(client, _)| *client);
            match oldest {
                Some(client) => {
                    entries.remove(&client);
                }
                None => break,
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::net::IpAddr;
    use std::net::Ipv4Addr;

    use import_profile_config::AbuseGateConfig;
    use import_profile_core::GateVerdict;

    use super::AbuseGate;

    fn gate(max_requests: u32, max_entries: usize) -> AbuseGate {
        AbuseGate::new(AbuseGateConfig {
            max_requests,
            window_ms: 1_000,
            blackout_ms: 5_000,
            max_entries,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn admits_up_to_limit_then_blocks() {
        let gate = gate(3, 16);
        for offset in 0 .. 3 {
            assert_eq!(gate.check(ip(1), 100 + offset), GateVerdict::Admitted);
        }
        assert_eq!(gate.check(ip(1), 104), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(2), 104), GateVerdict::Admitted);
    }

    #[test]
    fn blackout_outlasts_window() {
        let gate = gate(1, 16);
        assert_eq!(gate.check(ip(1), 0), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 10), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(1), 2_000), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(1), 5_009), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(1), 5_010), GateVerdict::Admitted);
    }

    #[test]
    fn zero_blackout_still_covers_window() {
        let gate = AbuseGate::new(AbuseGateConfig {
            max_requests: 1,
            window_ms: 1_000,
            blackout_ms: 0,
            max_entries: 4,
        });
        assert_eq!(gate.check(ip(1), 0), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 500), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(1), 999), GateVerdict::Blocked);
        assert_eq!(gate.check(ip(1), 1_000), GateVerdict::Admitted);
    }

    #[test]
    fn window_rollover_resets_count() {
        let gate = gate(2, 16);
        assert_eq!(gate.check(ip(1), 0), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 1), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 1_000), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 1_001), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(1), 1_002), GateVerdict::Blocked);
    }

    #[test]
    fn full_table_evicts_expired_entries_first() {
        let gate = gate(5, 2);
        assert_eq!(gate.check(ip(1), 0), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(2), 900), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(3), 1_500), GateVerdict::Admitted);
        assert_eq!(gate.tracked_clients(), 2);
        let entries = gate.entries.lock().unwrap();
        assert!(!entries.contains_key(&ip(1)));
        assert!(entries.contains_key(&ip(2)));
    }

    #[test]
    fn full_table_evicts_oldest_window_when_nothing_expired() {
        let gate = gate(5, 2);
        assert_eq!(gate.check(ip(1), 0), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(2), 100), GateVerdict::Admitted);
        assert_eq!(gate.check(ip(3), 200), GateVerdict::Admitted);
        let entries = gate.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key(&ip(1)));
        assert!(entries.contains_key(&ip(3)));
    }
}
