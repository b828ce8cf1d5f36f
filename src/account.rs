// src/account.rs
//
// Per-account position accounting: share count, cash balance, and the
// historical extrema used for the scoreboard. Updated atomically with every
// trade (`apply_trade`) using saturating arithmetic: positions are small
// toy values, but the backend must never panic or wrap on pathological
// input, so every update clamps to ±(2^31 - 1) rather than using
// checked/wrapping semantics.

use crate::types::{saturate, Side, MAX_ACCOUNTS};

/// A trader's account. Created lazily on first use, never destroyed.
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    /// Ids of every order this account has ever placed, in arrival order.
    pub orders: Vec<u64>,
    pub shares: i64,
    pub cents: i64,
    pub pos_min: i64,
    pub pos_max: i64,
}

impl Account {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            orders: Vec::new(),
            shares: 0,
            cents: 0,
            pos_min: 0,
            pos_max: 0,
        }
    }

    /// Apply one side of a trade: `qty` shares change hands at `price` cents,
    /// in the direction of `side` (BUY increases shares and decreases cash;
    /// SELL is the mirror image). All arithmetic saturates to ±(2^31 - 1).
    pub fn apply_trade(&mut self, qty: i64, price: i64, side: Side) {
        let signed_qty = match side {
            Side::Buy => qty,
            Side::Sell => -qty,
        };
        let notional = (price as i128) * (signed_qty as i128);

        let new_shares = (self.shares as i128) + (signed_qty as i128);
        let new_cents = (self.cents as i128) - notional;

        self.shares = saturate(clamp_i128(new_shares));
        self.cents = saturate(clamp_i128(new_cents));

        self.pos_min = self.pos_min.min(self.shares);
        self.pos_max = self.pos_max.max(self.shares);
    }

    /// Net asset value: `shares * last_price + cents`, saturating in 64-bit
    /// intermediates (the product alone can exceed 32-bit range even when
    /// both factors fit in it).
    pub fn nav(&self, last_price: i64) -> i64 {
        let notional = (self.shares as i128) * (last_price as i128);
        let nav = notional + (self.cents as i128);
        saturate(clamp_i128(nav))
    }
}

/// Clamp a wide intermediate down into `i64` range before the final
/// `saturate` call narrows it to ±(2^31 - 1); guards against the i128
/// computation itself exceeding i64 (astronomically unlikely at this scale,
/// but cheap to make total rather than partial).
fn clamp_i128(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Sparse mapping from account id to account record. The frontend may use
/// non-contiguous ids, so unused slots hold `None`; the backing `Vec` grows
/// in blocks of 64 as higher ids arrive, capped at `MAX_ACCOUNTS`.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    slots: Vec<Option<Account>>,
}

const GROWTH_BLOCK: usize = 64;

impl AccountRegistry {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Return the existing account at `id`, or create one named `name` if
    /// this is the first time `id` has been seen. Fails if `id >= MAX_ACCOUNTS`.
    pub fn lookup_or_create(&mut self, id: u64, name: &str) -> Result<&mut Account, ()> {
        if id >= MAX_ACCOUNTS {
            return Err(());
        }
        let idx = id as usize;
        if idx >= self.slots.len() {
            let new_len = ((idx / GROWTH_BLOCK) + 1) * GROWTH_BLOCK;
            self.slots.resize_with(new_len, || None);
        }
        if self.slots[idx].is_none() {
            self.slots[idx] = Some(Account::new(name));
        }
        Ok(self.slots[idx].as_mut().unwrap())
    }

    pub fn get(&self, id: u64) -> Option<&Account> {
        self.slots.get(id as usize).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Account> {
        self.slots.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    /// Append an order id to an account's order list. Append-then-increment,
    /// resolving the off-by-one the original C had in one revision where
    /// `orders[count]` was written *after* `count` was incremented (a
    /// skipped slot and a one-past-end write) — `Vec::push` does the correct
    /// thing by construction.
    pub fn attach_order(&mut self, id: u64, order_id: u64) {
        if let Some(account) = self.get_mut(id) {
            account.orders.push(order_id);
        }
    }

    /// Iterate over every account that has been created, with its id.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Account)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|acc| (idx as u64, acc)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
