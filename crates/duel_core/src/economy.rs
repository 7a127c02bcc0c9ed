//! Duel point economy.
//!
//! The balance accrues continuously (`regen_per_second * dt` each tick) up
//! to a cap and is exposed as whole points, floored on read. Spending is
//! check-and-deduct in one step so a failed spend changes nothing.
//!
//! Per-action cooldowns share the same tick so deploy timers advance in
//! lockstep with regeneration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::components::KindId;
use crate::math::{decimal_serde, Fixed};

/// Largest cap the fixed-point balance can hold.
pub const MAX_CAP: u32 = i32::MAX.unsigned_abs();

/// Economy configuration for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomySettings {
    /// Balance at level start.
    pub starting_balance: u32,
    /// Upper bound on the balance.
    pub cap: u32,
    /// Points gained per second.
    #[serde(with = "decimal_serde")]
    pub regen_per_second: Fixed,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            starting_balance: 100,
            cap: 1000,
            regen_per_second: Fixed::from_num(5),
        }
    }
}

/// Name of a rate-limited action, e.g. `deploy:archer`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    /// Create an action identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Cooldown key for deploying `kind`.
    #[must_use]
    pub fn deploy(kind: &KindId) -> Self {
        Self(format!("deploy:{kind}"))
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capped, regenerating currency with per-action cooldowns.
#[derive(Debug, Clone)]
pub struct ResourceEconomy {
    balance: Fixed,
    cap: Fixed,
    regen_rate: Fixed,
    cooldowns: BTreeMap<ActionId, Fixed>,
}

impl ResourceEconomy {
    /// Create an economy. The starting balance is clamped to the cap.
    #[must_use]
    pub fn new(settings: EconomySettings) -> Self {
        if settings.cap > MAX_CAP {
            tracing::warn!(cap = settings.cap, max = MAX_CAP, "Economy cap clamped");
        }
        let cap = Fixed::saturating_from_num(settings.cap.min(MAX_CAP));
        let start = Fixed::saturating_from_num(settings.starting_balance).min(cap);
        Self {
            balance: start,
            cap,
            regen_rate: settings.regen_per_second.max(Fixed::ZERO),
            cooldowns: BTreeMap::new(),
        }
    }

    /// Whole points available.
    #[must_use]
    pub fn balance(&self) -> u32 {
        to_points(self.balance)
    }

    /// Balance including the fractional part accrued so far.
    #[must_use]
    pub fn exact_balance(&self) -> Fixed {
        self.balance
    }

    /// Upper bound on the balance.
    #[must_use]
    pub fn cap(&self) -> u32 {
        to_points(self.cap)
    }

    /// Points gained per second.
    #[must_use]
    pub fn regen_rate(&self) -> Fixed {
        self.regen_rate
    }

    /// Whether `amount` can be spent right now.
    #[must_use]
    pub fn can_afford(&self, amount: u32) -> bool {
        self.balance >= Fixed::saturating_from_num(amount)
    }

    /// Deduct `amount` if affordable. On `false` nothing changed.
    pub fn try_spend(&mut self, amount: u32) -> bool {
        if !self.can_afford(amount) {
            tracing::debug!(amount, balance = self.balance(), "Spend refused");
            return false;
        }
        self.balance -= Fixed::saturating_from_num(amount);
        true
    }

    /// Credit a reward, clamped to the cap. Returns points actually gained.
    ///
    /// Non-positive amounts are rejected with a warning.
    pub fn add(&mut self, amount: i64) -> u32 {
        if amount <= 0 {
            tracing::warn!(amount, "Ignoring non-positive credit");
            return 0;
        }
        let before = self.balance();
        self.balance = self
            .balance
            .saturating_add(Fixed::saturating_from_num(amount))
            .min(self.cap);
        self.balance().saturating_sub(before)
    }

    /// Remove up to `amount`, stopping at zero. Returns points removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let before = self.balance();
        self.balance = (self.balance - Fixed::saturating_from_num(amount).min(self.balance))
            .max(Fixed::ZERO);
        before.saturating_sub(self.balance())
    }

    /// Advance regeneration and cooldowns by `dt` seconds.
    pub fn tick(&mut self, dt: Fixed) {
        if dt <= Fixed::ZERO {
            return;
        }
        if self.balance < self.cap {
            self.balance = self
                .balance
                .saturating_add(self.regen_rate.saturating_mul(dt))
                .min(self.cap);
        }
        for remaining in self.cooldowns.values_mut() {
            *remaining -= dt;
        }
        self.cooldowns.retain(|_, remaining| *remaining > Fixed::ZERO);
    }

    /// Start (or restart) the cooldown of `action`.
    pub fn start_cooldown(&mut self, action: ActionId, duration: Fixed) {
        if duration <= Fixed::ZERO {
            self.cooldowns.remove(&action);
            return;
        }
        self.cooldowns.insert(action, duration);
    }

    /// Whether `action` is still cooling down.
    #[must_use]
    pub fn is_on_cooldown(&self, action: &ActionId) -> bool {
        self.cooldowns.contains_key(action)
    }

    /// Seconds until `action` is available again.
    #[must_use]
    pub fn cooldown_remaining(&self, action: &ActionId) -> Fixed {
        self.cooldowns.get(action).copied().unwrap_or(Fixed::ZERO)
    }
}

fn to_points(value: Fixed) -> u32 {
    value
        .max(Fixed::ZERO)
        .to_num::<i64>()
        .clamp(0, i64::from(u32::MAX)) as u32
}

/// Economy shared between the simulation and outside callers.
///
/// Every operation holds the lock for its whole check-and-deduct, so
/// concurrent spends can never overdraw the balance.
#[derive(Debug, Clone)]
pub struct SharedEconomy(Arc<Mutex<ResourceEconomy>>);

impl SharedEconomy {
    /// Wrap an economy for sharing.
    #[must_use]
    pub fn new(economy: ResourceEconomy) -> Self {
        Self(Arc::new(Mutex::new(economy)))
    }

    fn lock(&self) -> MutexGuard<'_, ResourceEconomy> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`ResourceEconomy::try_spend`].
    pub fn try_spend(&self, amount: u32) -> bool {
        self.lock().try_spend(amount)
    }

    /// See [`ResourceEconomy::can_afford`].
    #[must_use]
    pub fn can_afford(&self, amount: u32) -> bool {
        self.lock().can_afford(amount)
    }

    /// See [`ResourceEconomy::add`].
    pub fn add(&self, amount: i64) -> u32 {
        self.lock().add(amount)
    }

    /// See [`ResourceEconomy::tick`].
    pub fn tick(&self, dt: Fixed) {
        self.lock().tick(dt);
    }

    /// See [`ResourceEconomy::balance`].
    #[must_use]
    pub fn balance(&self) -> u32 {
        self.lock().balance()
    }

    /// Run `f` with exclusive access to the economy.
    pub fn with<R>(&self, f: impl FnOnce(&mut ResourceEconomy) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy(start: u32, cap: u32, regen: i32) -> ResourceEconomy {
        ResourceEconomy::new(EconomySettings {
            starting_balance: start,
            cap,
            regen_per_second: Fixed::from_num(regen),
        })
    }

    #[test]
    fn test_cap_clamped_to_representable_range() {
        let economy = economy(u32::MAX, u32::MAX, 0);
        assert_eq!(economy.cap(), MAX_CAP);
        assert_eq!(economy.balance(), MAX_CAP);
    }

    #[test]
    fn test_try_spend_insufficient_leaves_balance() {
        let mut eco = economy(50, 1000, 0);
        assert!(!eco.try_spend(100));
        assert_eq!(eco.balance(), 50);
        assert!(eco.try_spend(50));
        assert_eq!(eco.balance(), 0);
    }

    #[test]
    fn test_regen_is_capped() {
        let mut eco = economy(95, 100, 10);
        eco.tick(Fixed::ONE);
        assert_eq!(eco.balance(), 100);
        eco.tick(Fixed::ONE);
        assert_eq!(eco.balance(), 100);
    }

    #[test]
    fn test_fractional_accrual_floors_on_read() {
        let mut eco = economy(0, 100, 1);
        let quarter = Fixed::from_num(0.25);
        for _ in 0..3 {
            eco.tick(quarter);
        }
        assert_eq!(eco.balance(), 0);
        eco.tick(quarter);
        assert_eq!(eco.balance(), 1);
    }

    #[test]
    fn test_add_rejects_non_positive_and_clamps() {
        let mut eco = economy(10, 50, 0);
        assert_eq!(eco.add(0), 0);
        assert_eq!(eco.add(-5), 0);
        assert_eq!(eco.balance(), 10);
        assert_eq!(eco.add(100), 40);
        assert_eq!(eco.balance(), 50);
    }

    #[test]
    fn test_drain_saturates_at_zero() {
        let mut eco = economy(30, 100, 0);
        assert_eq!(eco.drain(20), 20);
        assert_eq!(eco.drain(20), 10);
        assert_eq!(eco.balance(), 0);
    }

    #[test]
    fn test_starting_balance_clamped_to_cap() {
        let eco = economy(500, 200, 0);
        assert_eq!(eco.balance(), 200);
    }

    #[test]
    fn test_cooldowns_expire_with_ticks() {
        let mut eco = economy(0, 100, 0);
        let action = ActionId::deploy(&KindId::from("archer"));
        eco.start_cooldown(action.clone(), Fixed::ONE);
        assert!(eco.is_on_cooldown(&action));

        eco.tick(Fixed::from_num(0.5));
        assert_eq!(eco.cooldown_remaining(&action), Fixed::from_num(0.5));
        eco.tick(Fixed::from_num(0.5));
        assert!(!eco.is_on_cooldown(&action));
    }

    #[test]
    fn test_shared_economy_never_overdraws() {
        let shared = SharedEconomy::new(economy(100, 100, 0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || (0..10).filter(|_| shared.try_spend(3)).count())
            })
            .collect();
        let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(successes, 33);
        assert_eq!(shared.balance(), 1);
    }
}
