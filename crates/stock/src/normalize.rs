//! Raw poll → per-shop view.

use std::collections::BTreeMap;

use common::{RawStockSnapshot, Shop, ShopContainer};

/// Five minutes in milliseconds.
const RESTOCK_ROUNDING_MS: i64 = 5 * 60 * 1000;

/// Round a millisecond epoch half-up to the nearest 5-minute boundary.
///
/// Saturates instead of overflowing near `i64::MAX`.
pub fn round_to_nearest_5_minutes(ts: i64) -> i64 {
    (ts.saturating_add(RESTOCK_ROUNDING_MS / 2) / RESTOCK_ROUNDING_MS) * RESTOCK_ROUNDING_MS
}

/// Predicted restock epoch, or `None` when the upstream values overflow.
fn predict_restock(calculated_at: i64, interval_ms: i64) -> Option<i64> {
    let due = calculated_at.checked_add(interval_ms)?;
    due.checked_add(RESTOCK_ROUNDING_MS / 2)?;
    Some(round_to_nearest_5_minutes(due))
}

/// Build the cache-resident view of one poll.
///
/// Every category in the snapshot gets exactly one shop. Shops without a
/// restock timer keep `predicted_restock_epoch = None`.
pub fn normalize(raw: &RawStockSnapshot) -> ShopContainer {
    let mut shops = BTreeMap::new();

    for (category, items) in &raw.categories {
        let last_refresh_epoch = raw
            .category_refresh
            .get(category)
            .map(|r| r.last_refresh_epoch)
            .unwrap_or(0);

        let predicted_restock_epoch = if category.has_timer() {
            raw.restock_interval_ms
                .get(category)
                .and_then(|interval| predict_restock(raw.timer_calculated_at, *interval))
        } else {
            None
        };

        let shop = Shop {
            items: items
                .iter()
                .map(|item| (item.name.clone(), item.value))
                .collect(),
            last_refresh_epoch,
            predicted_restock_epoch,
        };
        shops.insert(*category, shop);
    }

    ShopContainer::new(
        shops,
        raw.last_seen.clone(),
        raw.image_data.clone(),
        raw.fetch_id,
    )
}
