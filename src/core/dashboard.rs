//! Back-office dashboard: sales KPIs, order status breakdown, best sellers and
//! catalog availability.
//!
//! The overview is recomputed from every stored order, so [`DashboardCache`]
//! memoizes it for a few seconds.

use crate::{
    core::pricing::{Priced, round_currency},
    entities::{Order, OrderStatus, Pack, Product},
    errors::Result,
};
use chrono::{DateTime, Datelike, Days, TimeZone, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// How many entries each best-seller ranking keeps.
pub const TOP_LIMIT: usize = 5;
/// How long a computed overview is served from cache.
pub const CACHE_TTL: Duration = Duration::from_secs(10);

/// Revenue and order counts for the current day, week and month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// Revenue since midnight
    pub revenue_day: f64,
    /// Revenue since Monday midnight
    pub revenue_week: f64,
    /// Revenue since the first of the month
    pub revenue_month: f64,
    /// Orders since midnight
    pub orders_day: u64,
    /// Orders since Monday midnight
    pub orders_week: u64,
    /// Orders since the first of the month
    pub orders_month: u64,
}

/// Order counts per status; both cancellation statuses count as `cancelled`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBuckets {
    /// Pending orders
    pub pending: u64,
    /// Unreachable customers
    pub no_answer: u64,
    /// Confirmed orders
    pub confirmed: u64,
    /// Out for delivery
    pub delivering: u64,
    /// Delivered orders
    pub delivered: u64,
    /// Cancelled by phone or at delivery
    pub cancelled: u64,
}

impl StatusBuckets {
    fn record(&mut self, status: OrderStatus) {
        let bucket = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::NoAnswer => &mut self.no_answer,
            OrderStatus::Confirmed => &mut self.confirmed,
            OrderStatus::Delivering => &mut self.delivering,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::CancelledPhone | OrderStatus::CancelledDelivery => &mut self.cancelled,
        };
        *bucket += 1;
    }
}

/// Kind of catalog item a sales line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A single product
    Product,
    /// A pack
    Pack,
}

/// Sales of one catalog item across all orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSales {
    /// Product or pack id
    pub id: i64,
    /// Whether `id` is a product or a pack
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Current title
    pub title: String,
    /// Units sold
    pub quantity: i64,
    /// Units sold times the current final price
    pub revenue: f64,
}

/// Available / unavailable item counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// Orderable items
    pub available: u64,
    /// Items switched off
    pub unavailable: u64,
}

/// Catalog availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    /// Products
    pub products: Availability,
    /// Packs
    pub packs: Availability,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    /// Sales KPIs
    pub kpis: Kpis,
    /// Status breakdown
    pub status: StatusBuckets,
    /// Best sellers by units
    pub top_quantity: Vec<ItemSales>,
    /// Best sellers by revenue
    pub top_revenue: Vec<ItemSales>,
    /// Catalog availability
    pub catalog: CatalogCounts,
}

/// Midnight of the day, the Monday and the first of the month containing `now`.
fn period_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let monday = today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        .unwrap_or(today);
    let first = today.with_day(1).unwrap_or(today);

    let midnight = |date: chrono::NaiveDate| {
        date.and_hms_opt(0, 0, 0)
            .map_or(now, |naive| Utc.from_utc_datetime(&naive))
    };
    (midnight(today), midnight(monday), midnight(first))
}

/// Computes the overview at instant `now`.
pub async fn compute_overview(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<Overview> {
    let orders = Order::find()
        .order_by_desc(crate::entities::order::Column::CreatedAt)
        .all(db)
        .await?;
    let products: HashMap<i64, _> = Product::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let packs: HashMap<i64, _> = Pack::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (day, week, month) = period_starts(now);
    let mut kpis = Kpis::default();
    let mut status = StatusBuckets::default();
    let mut items: Vec<ItemSales> = Vec::new();
    let mut index: HashMap<(ItemKind, i64), usize> = HashMap::new();

    for order in &orders {
        if order.created_at >= day {
            kpis.revenue_day += order.total;
            kpis.orders_day += 1;
        }
        if order.created_at >= week {
            kpis.revenue_week += order.total;
            kpis.orders_week += 1;
        }
        if order.created_at >= month {
            kpis.revenue_month += order.total;
            kpis.orders_month += 1;
        }
        status.record(order.status);

        for line in &order.products.0 {
            let (kind, title, price) = if line.is_pack {
                packs.get(&line.product_id).map_or_else(
                    || (ItemKind::Pack, format!("Pack #{}", line.product_id), 0.0),
                    |pack| (ItemKind::Pack, pack.title.clone(), pack.final_price()),
                )
            } else {
                products.get(&line.product_id).map_or_else(
                    || (ItemKind::Product, String::new(), 0.0),
                    |product| (ItemKind::Product, product.title.clone(), product.final_price()),
                )
            };

            let position = *index.entry((kind, line.product_id)).or_insert_with(|| {
                items.push(ItemSales {
                    id: line.product_id,
                    kind,
                    title,
                    quantity: 0,
                    revenue: 0.0,
                });
                items.len() - 1
            });
            let entry = &mut items[position];
            entry.quantity += i64::from(line.quantity);
            entry.revenue += price * f64::from(line.quantity);
        }
    }

    kpis.revenue_day = round_currency(kpis.revenue_day);
    kpis.revenue_week = round_currency(kpis.revenue_week);
    kpis.revenue_month = round_currency(kpis.revenue_month);
    for item in &mut items {
        item.revenue = round_currency(item.revenue);
    }

    let mut top_quantity = items.clone();
    top_quantity.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    top_quantity.truncate(TOP_LIMIT);

    let mut top_revenue = items;
    top_revenue.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    top_revenue.truncate(TOP_LIMIT);

    let available_products = products.values().filter(|p| p.status).count() as u64;
    let available_packs = packs.values().filter(|p| p.availability).count() as u64;
    let catalog = CatalogCounts {
        products: Availability {
            available: available_products,
            unavailable: products.len() as u64 - available_products,
        },
        packs: Availability {
            available: available_packs,
            unavailable: packs.len() as u64 - available_packs,
        },
    };

    Ok(Overview {
        kpis,
        status,
        top_quantity,
        top_revenue,
        catalog,
    })
}

/// Memoizes the overview for [`CACHE_TTL`].
#[derive(Debug, Clone)]
pub struct DashboardCache {
    entry: Arc<RwLock<Option<(Instant, Overview)>>>,
    ttl: Duration,
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::new(CACHE_TTL)
    }
}

impl DashboardCache {
    /// Creates an empty cache with the given lifetime.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    /// Returns the cached overview, recomputing it when missing or expired.
    pub async fn overview(&self, db: &DatabaseConnection) -> Result<Overview> {
        if let Some((computed_at, overview)) = self.entry.read().await.as_ref() {
            if computed_at.elapsed() < self.ttl {
                tracing::trace!("Serving dashboard overview from cache");
                return Ok(overview.clone());
            }
        }

        let mut writer = self.entry.write().await;
        // Another request may have refreshed it while we waited for the lock
        if let Some((computed_at, overview)) = writer.as_ref() {
            if computed_at.elapsed() < self.ttl {
                return Ok(overview.clone());
            }
        }

        let overview = compute_overview(db, Utc::now()).await?;
        *writer = Some((Instant::now(), overview.clone()));
        tracing::debug!("Dashboard overview recomputed");
        Ok(overview)
    }

    /// Drops the cached overview.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}
