//! Restock tracking and notification eligibility.
//!
//! A watched item is worth announcing only once per restock of its shop.
//! Timer-bearing shops are gated on their refresh epoch; night/easter shops
//! publish none and follow the configured `TimerlessPolicy`.

use std::collections::{BTreeMap, HashSet};

use common::config::TimerlessPolicy;
use common::{Category, Shop, ShopContainer, WantedItem};
use tracing::debug;

/// What has already been announced. Owned by the polling task alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestockState {
    /// Last accepted refresh epoch per timer-bearing shop.
    epochs: BTreeMap<Category, i64>,
    /// Lower-cased in-stock names per timerless shop, as of the last poll.
    timerless_in_stock: BTreeMap<Category, HashSet<String>>,
    first_run_completed: bool,
}

impl RestockState {
    pub fn recorded_epoch(&self, category: Category) -> Option<i64> {
        self.epochs.get(&category).copied()
    }

    pub fn first_run_completed(&self) -> bool {
        self.first_run_completed
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestockTracker {
    state: RestockState,
    policy: TimerlessPolicy,
}

impl RestockTracker {
    pub fn new(policy: TimerlessPolicy) -> Self {
        Self {
            state: RestockState::default(),
            policy,
        }
    }

    pub fn state(&self) -> &RestockState {
        &self.state
    }

    /// Decide what to announce for this poll, then record the poll.
    ///
    /// Call exactly once per accepted poll.
    pub fn evaluate(
        &mut self,
        watch_list: &[String],
        container: &ShopContainer,
        force: bool,
    ) -> Vec<WantedItem> {
        let eligible = self.eligible(watch_list, container, force);
        self.advance(container);
        eligible
    }

    /// Watched items that are in stock and not yet announced for the
    /// current restock of their shop, in watch-list order.
    ///
    /// Shops are scanned in category order; the first shop where the item
    /// qualifies wins.
    pub fn eligible(
        &self,
        watch_list: &[String],
        container: &ShopContainer,
        force: bool,
    ) -> Vec<WantedItem> {
        let mut found = Vec::new();

        for name in watch_list {
            for (category, shop) in container.shops() {
                let Some((_, quantity)) = shop.find(name) else {
                    continue;
                };
                if quantity <= 0 {
                    continue;
                }
                if force || self.is_fresh(category, shop, name) {
                    debug!("{} eligible from {} shop (x{})", name, category, quantity);
                    found.push(WantedItem::from_shop(name.clone(), quantity, shop));
                    break;
                }
            }
        }

        found
    }

    fn is_fresh(&self, category: Category, shop: &Shop, name: &str) -> bool {
        if !self.state.first_run_completed {
            return true;
        }

        if category.has_timer() {
            let recorded = self.state.epochs.get(&category).copied().unwrap_or(0);
            return shop.last_refresh_epoch > recorded;
        }

        match self.policy {
            TimerlessPolicy::Always => true,
            TimerlessPolicy::OnAppearance => !self
                .state
                .timerless_in_stock
                .get(&category)
                .is_some_and(|seen| seen.contains(&name.to_lowercase())),
        }
    }

    /// Record the poll: epochs only move forward, timerless stock is replaced.
    pub fn advance(&mut self, container: &ShopContainer) {
        for (category, shop) in container.shops() {
            if category.has_timer() {
                let recorded = self.state.epochs.entry(category).or_insert(0);
                *recorded = (*recorded).max(shop.last_refresh_epoch);
            } else {
                let in_stock = shop
                    .items
                    .iter()
                    .filter(|(_, qty)| **qty > 0)
                    .map(|(name, _)| name.to_lowercase())
                    .collect();
                self.state.timerless_in_stock.insert(category, in_stock);
            }
        }

        self.state.first_run_completed = true;
    }
}
