use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sketchify_core::models::{period_key, period_resets_at};
use sketchify_core::SketchError;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Handle for an admitted quota slot. Passed back to `confirm` or `release`.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub period: String,
}

/// Usage snapshot for an account's current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUsage {
    /// Permanently charged slots.
    pub used: u32,
    /// Slots held by outstanding reservations.
    pub reserved: u32,
}

#[derive(Clone)]
pub struct QuotaGateConfig {
    /// Reservations older than this are auto-released by the sweep.
    pub reservation_ttl: Duration,
    pub sweep_interval: Duration,
    pub shard_count: usize,
}

impl Default for QuotaGateConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            shard_count: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReservationStatus {
    Pending,
    Confirmed,
    Released,
}

#[derive(Debug)]
struct ReservationState {
    account_id: Uuid,
    period: String,
    created_at: DateTime<Utc>,
    status: ReservationStatus,
}

#[derive(Debug, Default)]
struct Ledger {
    used: u32,
    reserved: u32,
}

/// Per-shard state: usage ledgers keyed by (account, period) plus the
/// reservation table for those accounts.
#[derive(Default)]
struct Shard {
    ledgers: HashMap<(Uuid, String), Ledger>,
    reservations: HashMap<Uuid, ReservationState>,
}

/// Sharded quota gate.
///
/// The check-and-increment in `reserve` happens under one shard lock, so two
/// concurrent reservations for the same account can never both slip past the
/// last remaining slot. Different accounts typically hash to different
/// shards and do not contend.
pub struct QuotaGate {
    shards: Vec<Mutex<Shard>>,
    shard_count: usize,
    reservation_ttl: chrono::Duration,
    shutdown_tx: mpsc::Sender<()>,
}

impl QuotaGate {
    /// Create a gate and spawn its expiry sweep. Requires a tokio runtime.
    pub fn new(config: QuotaGateConfig) -> Arc<Self> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let gate = Arc::new(Self {
            shards: (0..config.shard_count).map(|_| Mutex::new(Shard::default())).collect(),
            shard_count: config.shard_count,
            reservation_ttl: chrono::Duration::from_std(config.reservation_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(600)),
            shutdown_tx,
        });

        let weak = Arc::downgrade(&gate);
        let sweep_interval = config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match weak.upgrade() {
                            Some(gate) => {
                                let released = gate.sweep_expired().await;
                                if released > 0 {
                                    tracing::warn!(released, "Expiry sweep released stale quota reservations");
                                }
                            }
                            None => break,
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        gate
    }

    /// Signal the sweep task to stop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    fn shard_index(&self, account_id: &Uuid) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        account_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    /// Atomically admit one job for the account's current period.
    ///
    /// Fails with `QuotaExceeded` when charged plus in-flight usage has
    /// reached `limit`.
    pub async fn reserve(&self, account_id: Uuid, limit: u32) -> Result<Reservation, SketchError> {
        let now = Utc::now();
        let period = period_key(now);
        let mut shard = self.shards[self.shard_index(&account_id)].lock().await;

        let ledger = shard
            .ledgers
            .entry((account_id, period.clone()))
            .or_default();

        let in_flight = ledger.used + ledger.reserved;
        if in_flight >= limit {
            tracing::debug!(
                %account_id,
                used = ledger.used,
                reserved = ledger.reserved,
                limit,
                "Quota reservation rejected"
            );
            return Err(SketchError::QuotaExceeded {
                used: in_flight,
                limit,
                resets_at: period_resets_at(now),
            });
        }

        ledger.reserved += 1;

        let reservation = Reservation {
            id: Uuid::new_v4(),
            account_id,
            period: period.clone(),
        };
        shard.reservations.insert(
            reservation.id,
            ReservationState {
                account_id,
                period,
                created_at: now,
                status: ReservationStatus::Pending,
            },
        );

        tracing::debug!(
            %account_id,
            reservation_id = %reservation.id,
            limit,
            "Quota slot reserved"
        );
        Ok(reservation)
    }

    /// Convert a reservation into a permanent charge. Idempotent: confirming
    /// twice charges once.
    pub async fn confirm(&self, reservation: &Reservation) {
        let mut shard = self.shards[self.shard_index(&reservation.account_id)].lock().await;

        let Some(state) = shard.reservations.get_mut(&reservation.id) else {
            tracing::debug!(reservation_id = %reservation.id, "Confirm for unknown reservation ignored");
            return;
        };
        if state.status != ReservationStatus::Pending {
            return;
        }
        state.status = ReservationStatus::Confirmed;

        let key = (reservation.account_id, reservation.period.clone());
        if let Some(ledger) = shard.ledgers.get_mut(&key) {
            ledger.reserved = ledger.reserved.saturating_sub(1);
            ledger.used += 1;
        }

        tracing::debug!(
            account_id = %reservation.account_id,
            reservation_id = %reservation.id,
            "Quota reservation confirmed"
        );
    }

    /// Cancel a reservation without charging. Idempotent: releasing twice,
    /// or releasing after a confirm, is a no-op.
    pub async fn release(&self, reservation: &Reservation) {
        let mut shard = self.shards[self.shard_index(&reservation.account_id)].lock().await;

        let Some(state) = shard.reservations.get_mut(&reservation.id) else {
            return;
        };
        if state.status != ReservationStatus::Pending {
            return;
        }
        state.status = ReservationStatus::Released;

        let key = (reservation.account_id, reservation.period.clone());
        if let Some(ledger) = shard.ledgers.get_mut(&key) {
            ledger.reserved = ledger.reserved.saturating_sub(1);
        }

        tracing::debug!(
            account_id = %reservation.account_id,
            reservation_id = %reservation.id,
            "Quota reservation released"
        );
    }

    /// Usage snapshot for the account's current period.
    pub async fn usage(&self, account_id: Uuid) -> QuotaUsage {
        let period = period_key(Utc::now());
        let shard = self.shards[self.shard_index(&account_id)].lock().await;
        match shard.ledgers.get(&(account_id, period)) {
            Some(ledger) => QuotaUsage {
                used: ledger.used,
                reserved: ledger.reserved,
            },
            None => QuotaUsage { used: 0, reserved: 0 },
        }
    }

    /// Release reservations older than the TTL and drop settled entries.
    /// Returns the number of stale reservations released. Called by the
    /// background sweep; exposed for deterministic tests.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.reservation_ttl;
        let mut released = 0;

        for shard in &self.shards {
            let mut shard = shard.lock().await;
            let expired: Vec<Uuid> = shard
                .reservations
                .iter()
                .filter(|(_, state)| state.created_at < cutoff)
                .map(|(id, _)| *id)
                .collect();

            for id in expired {
                let Some(state) = shard.reservations.remove(&id) else {
                    continue;
                };
                if state.status == ReservationStatus::Pending {
                    released += 1;
                    let key = (state.account_id, state.period.clone());
                    if let Some(ledger) = shard.ledgers.get_mut(&key) {
                        ledger.reserved = ledger.reserved.saturating_sub(1);
                    }
                    tracing::warn!(
                        account_id = %state.account_id,
                        reservation_id = %id,
                        "Released expired quota reservation"
                    );
                }
            }
        }

        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gate() -> Arc<QuotaGate> {
        QuotaGate::new(QuotaGateConfig {
            reservation_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(3600),
            shard_count: 4,
        })
    }

    #[tokio::test]
    async fn test_reserve_confirm_charges_once() {
        let gate = test_gate();
        let account = Uuid::new_v4();

        let reservation = gate.reserve(account, 5).await.unwrap();
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 0, reserved: 1 });

        gate.confirm(&reservation).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 1, reserved: 0 });

        // Idempotent: second confirm must not double-charge
        gate.confirm(&reservation).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 1, reserved: 0 });
    }

    #[tokio::test]
    async fn test_release_undoes_reservation() {
        let gate = test_gate();
        let account = Uuid::new_v4();

        let reservation = gate.reserve(account, 1).await.unwrap();
        gate.release(&reservation).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 0, reserved: 0 });

        // Idempotent: double release is a no-op
        gate.release(&reservation).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 0, reserved: 0 });

        // The slot is available again
        assert!(gate.reserve(account, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_after_confirm_keeps_charge() {
        let gate = test_gate();
        let account = Uuid::new_v4();

        let reservation = gate.reserve(account, 5).await.unwrap();
        gate.confirm(&reservation).await;
        gate.release(&reservation).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 1, reserved: 0 });
    }

    #[tokio::test]
    async fn test_reserve_rejects_at_limit() {
        let gate = test_gate();
        let account = Uuid::new_v4();

        for _ in 0..3 {
            let reservation = gate.reserve(account, 3).await.unwrap();
            gate.confirm(&reservation).await;
        }

        let result = gate.reserve(account, 3).await;
        match result {
            Err(SketchError::QuotaExceeded { used, limit, resets_at }) => {
                assert_eq!(used, 3);
                assert_eq!(limit, 3);
                assert!(resets_at > Utc::now());
            }
            other => panic!("expected QuotaExceeded, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_concurrent_reserves_never_oversubscribe() {
        let gate = test_gate();
        let account = Uuid::new_v4();
        let limit = 3u32;

        // 20 concurrent attempts for 3 slots: exactly 3 may win
        let mut handles = Vec::new();
        for _ in 0..20 {
            let gate = gate.clone();
            handles.push(tokio::spawn(
                async move { gate.reserve(account, limit).await },
            ));
        }

        let mut granted = Vec::new();
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(reservation) => granted.push(reservation),
                Err(SketchError::QuotaExceeded { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(granted.len(), 3);
        assert_eq!(rejected, 17);

        // Settle them all; total used never exceeds the limit
        for reservation in &granted {
            gate.confirm(reservation).await;
        }
        let usage = gate.usage(account).await;
        assert_eq!(usage.used, limit);
        assert_eq!(usage.reserved, 0);
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let gate = test_gate();
        let account_a = Uuid::new_v4();
        let account_b = Uuid::new_v4();

        let reservation = gate.reserve(account_a, 1).await.unwrap();
        gate.confirm(&reservation).await;
        assert!(gate.reserve(account_a, 1).await.is_err());

        // A's exhaustion does not affect B
        assert!(gate.reserve(account_b, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_releases_only_expired_pending() {
        let gate = Arc::new(QuotaGate {
            shards: (0..4).map(|_| Mutex::new(Shard::default())).collect(),
            shard_count: 4,
            reservation_ttl: chrono::Duration::zero(),
            shutdown_tx: mpsc::channel(1).0,
        });
        let account = Uuid::new_v4();

        let stale = gate.reserve(account, 5).await.unwrap();
        let confirmed = gate.reserve(account, 5).await.unwrap();
        gate.confirm(&confirmed).await;

        // TTL is zero, so the pending reservation is immediately stale
        tokio::time::sleep(Duration::from_millis(5)).await;
        let released = gate.sweep_expired().await;
        assert_eq!(released, 1);

        let usage = gate.usage(account).await;
        assert_eq!(usage, QuotaUsage { used: 1, reserved: 0 });

        // Releasing the swept reservation later stays a no-op
        gate.release(&stale).await;
        assert_eq!(gate.usage(account).await, QuotaUsage { used: 1, reserved: 0 });
    }
}
