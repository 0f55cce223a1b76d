//! Upstream JSON document and its conversion to `RawStockSnapshot`.
//!
//! Every field is optional on the wire; missing values decode as empty/zero.

use std::collections::{BTreeMap, HashMap};

use common::{Category, CategoryRefresh, LastSeenItem, RawStockSnapshot, StockItem};
use serde::Deserialize;

/// Response body of `GET /api/stock`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockResponse {
    pub seeds_stock: Vec<StockItem>,
    pub gear_stock: Vec<StockItem>,
    pub egg_stock: Vec<StockItem>,
    pub merchants_stock: Vec<StockItem>,
    pub cosmetics_stock: Vec<StockItem>,
    pub event_stock: Vec<StockItem>,
    pub night_stock: Vec<StockItem>,
    pub easter_stock: Vec<StockItem>,
    pub last_seen: Vec<LastSeenItem>,
    pub restock_timers: RestockTimers,
    pub category_refresh_status: CategoryRefreshStatus,
    pub timer_calculated_at: i64,
    pub server_start_time: i64,
    pub last_api_fetch: i64,
    pub next_scheduled_fetch: i64,
    pub image_data: HashMap<String, String>,
}

/// Milliseconds until the next restock, per timer-bearing shop.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RestockTimers {
    pub seeds: i64,
    pub gears: i64,
    pub eggs: i64,
    pub merchants: i64,
    pub cosmetics: i64,
    pub event: i64,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshStatus {
    pub was_refreshed: bool,
    pub last_refresh: i64,
    pub time_since_refresh: i64,
    pub expecting_update: bool,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CategoryRefreshStatus {
    pub seeds: RefreshStatus,
    pub gears: RefreshStatus,
    pub eggs: RefreshStatus,
    pub merchants: RefreshStatus,
    pub cosmetics: RefreshStatus,
    pub event: RefreshStatus,
}

impl RestockTimers {
    fn get(&self, category: Category) -> Option<i64> {
        match category {
            Category::Seeds => Some(self.seeds),
            Category::Gears => Some(self.gears),
            Category::Eggs => Some(self.eggs),
            Category::Merchants => Some(self.merchants),
            Category::Cosmetics => Some(self.cosmetics),
            Category::Event => Some(self.event),
            Category::Night | Category::Easter => None,
        }
    }
}

impl CategoryRefreshStatus {
    fn get(&self, category: Category) -> Option<RefreshStatus> {
        match category {
            Category::Seeds => Some(self.seeds),
            Category::Gears => Some(self.gears),
            Category::Eggs => Some(self.eggs),
            Category::Merchants => Some(self.merchants),
            Category::Cosmetics => Some(self.cosmetics),
            Category::Event => Some(self.event),
            Category::Night | Category::Easter => None,
        }
    }
}

impl StockResponse {
    fn take_stock(&mut self, category: Category) -> Vec<StockItem> {
        let list = match category {
            Category::Seeds => &mut self.seeds_stock,
            Category::Gears => &mut self.gear_stock,
            Category::Eggs => &mut self.egg_stock,
            Category::Merchants => &mut self.merchants_stock,
            Category::Cosmetics => &mut self.cosmetics_stock,
            Category::Event => &mut self.event_stock,
            Category::Night => &mut self.night_stock,
            Category::Easter => &mut self.easter_stock,
        };
        std::mem::take(list)
    }
}

impl From<StockResponse> for RawStockSnapshot {
    fn from(mut resp: StockResponse) -> Self {
        let mut categories = BTreeMap::new();
        let mut category_refresh = BTreeMap::new();
        let mut restock_interval_ms = BTreeMap::new();

        for category in Category::ALL {
            categories.insert(category, resp.take_stock(category));

            if let Some(status) = resp.category_refresh_status.get(category) {
                category_refresh.insert(
                    category,
                    CategoryRefresh {
                        last_refresh_epoch: status.last_refresh,
                        expecting_update: status.expecting_update,
                    },
                );
            }
            if let Some(interval) = resp.restock_timers.get(category) {
                restock_interval_ms.insert(category, interval);
            }
        }

        RawStockSnapshot {
            fetch_id: resp.last_api_fetch,
            categories,
            category_refresh,
            restock_interval_ms,
            timer_calculated_at: resp.timer_calculated_at,
            last_seen: resp.last_seen,
            image_data: resp.image_data,
        }
    }
}
