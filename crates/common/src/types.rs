//! Domain types shared across the watcher.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize, Serializer};

// ── Categories ────────────────────────────────────────────────────────

/// One rotating shop. Declaration order is the eligibility scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Seeds,
    Gears,
    Eggs,
    Merchants,
    Cosmetics,
    Event,
    Night,
    Easter,
}

impl Category {
    /// Every category in scan order.
    pub const ALL: [Category; 8] = [
        Category::Seeds,
        Category::Gears,
        Category::Eggs,
        Category::Merchants,
        Category::Cosmetics,
        Category::Event,
        Category::Night,
        Category::Easter,
    ];

    /// Whether upstream publishes a refresh epoch and restock timer for this shop.
    pub fn has_timer(self) -> bool {
        !matches!(self, Category::Night | Category::Easter)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Seeds => "seeds",
            Category::Gears => "gears",
            Category::Eggs => "eggs",
            Category::Merchants => "merchants",
            Category::Cosmetics => "cosmetics",
            Category::Event => "event",
            Category::Night => "night",
            Category::Easter => "easter",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Raw snapshot (one poll) ───────────────────────────────────────────

/// A single `{name, value}` stock line as published upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub name: String,
    pub value: i64,
}

/// When an item was last seen in any shop. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSeenItem {
    pub name: String,
    pub seen: Option<String>,
}

/// Refresh bookkeeping for one timer-bearing category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryRefresh {
    pub last_refresh_epoch: i64,
    pub expecting_update: bool,
}

/// Everything one upstream fetch produced, already decoded.
///
/// Lives only for the duration of a poll.
#[derive(Debug, Clone, Default)]
pub struct RawStockSnapshot {
    /// Upstream refresh identifier; equal ids mean nothing changed.
    pub fetch_id: i64,
    pub categories: BTreeMap<Category, Vec<StockItem>>,
    pub category_refresh: BTreeMap<Category, CategoryRefresh>,
    /// Milliseconds from `timer_calculated_at` until the next restock.
    pub restock_interval_ms: BTreeMap<Category, i64>,
    pub timer_calculated_at: i64,
    pub last_seen: Vec<LastSeenItem>,
    pub image_data: HashMap<String, String>,
}

// ── Normalized view ───────────────────────────────────────────────────

/// One shop's current contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Shop {
    pub items: HashMap<String, i64>,
    pub last_refresh_epoch: i64,
    /// `None` for shops without a restock timer.
    pub predicted_restock_epoch: Option<i64>,
}

impl Shop {
    /// Case-insensitive lookup, returning the upstream spelling and quantity.
    pub fn find(&self, name: &str) -> Option<(&str, i64)> {
        let wanted = name.to_lowercase();
        self.items
            .iter()
            .find(|(item, _)| item.to_lowercase() == wanted)
            .map(|(item, qty)| (item.as_str(), *qty))
    }

    /// Quantity in stock, zero when absent.
    pub fn quantity_of(&self, name: &str) -> i64 {
        self.find(name).map(|(_, qty)| qty).unwrap_or(0)
    }
}

/// Cache-resident, per-shop view of one accepted poll.
///
/// Immutable once built; every accepted poll replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopContainer {
    shops: BTreeMap<Category, Shop>,
    last_seen: Vec<LastSeenItem>,
    #[serde(skip)]
    image_data: HashMap<String, String>,
    fetch_epoch: i64,
}

impl ShopContainer {
    pub fn new(
        shops: BTreeMap<Category, Shop>,
        last_seen: Vec<LastSeenItem>,
        image_data: HashMap<String, String>,
        fetch_epoch: i64,
    ) -> Self {
        Self {
            shops,
            last_seen,
            image_data,
            fetch_epoch,
        }
    }

    pub fn shop(&self, category: Category) -> Option<&Shop> {
        self.shops.get(&category)
    }

    /// Shops in scan order.
    pub fn shops(&self) -> impl Iterator<Item = (Category, &Shop)> {
        self.shops.iter().map(|(cat, shop)| (*cat, shop))
    }

    pub fn last_seen(&self) -> &[LastSeenItem] {
        &self.last_seen
    }

    pub fn image_data(&self) -> &HashMap<String, String> {
        &self.image_data
    }

    pub fn fetch_epoch(&self) -> i64 {
        self.fetch_epoch
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }

    /// Every watched item currently in stock, regardless of whether it was
    /// already announced. An item stocked by several shops appears once per shop.
    pub fn wanted_stock(&self, watch_list: &[String]) -> Vec<WantedItem> {
        let mut found = Vec::new();

        for name in watch_list {
            for (_, shop) in self.shops() {
                let count = shop.quantity_of(name);
                if count > 0 {
                    found.push(WantedItem::from_shop(name.clone(), count, shop));
                }
            }
        }

        found
    }

    /// Every item of every shop, in scan order then by name.
    pub fn all_items(&self) -> Vec<WantedItem> {
        let mut found = Vec::new();

        for (_, shop) in self.shops() {
            let mut items: Vec<_> = shop.items.iter().collect();
            items.sort_by(|a, b| a.0.cmp(b.0));
            found.extend(
                items
                    .into_iter()
                    .map(|(name, count)| WantedItem::from_shop(name.clone(), *count, shop)),
            );
        }

        found
    }

    /// Fetch time in local time, RFC 822 with a numeric zone.
    pub fn fetch_time_string(&self) -> String {
        format_fetch_time(self.fetch_epoch, &Local)
    }
}

/// Renders a millisecond epoch as `02 Jan 06 15:04 -0700` in `tz`.
pub fn format_fetch_time<Tz: TimeZone>(epoch_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    let utc = DateTime::from_timestamp_millis(epoch_ms).unwrap_or_default();
    utc.with_timezone(tz).format("%d %b %y %H:%M %z").to_string()
}

// ── Query output ──────────────────────────────────────────────────────

/// An in-stock item together with its shop's timing.
///
/// Serialized in the shape the web UI reads:
/// `{name, count, stockTime, restockTime}`, with `restockTime` 0 when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WantedItem {
    pub name: String,
    #[serde(rename = "count")]
    pub quantity: i64,
    #[serde(rename = "stockTime")]
    pub shop_refresh_epoch: i64,
    #[serde(rename = "restockTime", serialize_with = "epoch_or_zero")]
    pub predicted_restock_epoch: Option<i64>,
}

impl WantedItem {
    pub fn from_shop(name: String, quantity: i64, shop: &Shop) -> Self {
        Self {
            name,
            quantity,
            shop_refresh_epoch: shop.last_refresh_epoch,
            predicted_restock_epoch: shop.predicted_restock_epoch,
        }
    }
}

fn epoch_or_zero<S: Serializer>(epoch: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(epoch.unwrap_or(0))
}
