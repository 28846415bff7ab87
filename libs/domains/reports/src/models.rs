use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ReportError, ReportResult};

/// Days covered when no range is given
pub const DEFAULT_RANGE_DAYS: u64 = 30;
pub const MAX_RANGE_DAYS: u64 = 366;
pub const DEFAULT_TOP: usize = 10;
pub const MAX_TOP: usize = 100;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;
/// Low-stock products listed on a report
pub const LOW_STOCK_LIMIT: i64 = 50;

/// Inclusive range of calendar days (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Resolve optional bounds against `today`. `to` defaults to today and
    /// `from` to the 30 days ending at `to`.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ReportResult<Self> {
        let to = to.unwrap_or(today);
        let from = match from {
            Some(from) => from,
            None => to
                .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS - 1))
                .unwrap_or(NaiveDate::MIN),
        };
        if from > to {
            return Err(ReportError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }
        let range = Self { from, to };
        if range.days() > MAX_RANGE_DAYS {
            return Err(ReportError::Validation(format!(
                "Date range is limited to {MAX_RANGE_DAYS} days"
            )));
        }
        Ok(range)
    }

    /// Last `days` days ending at `today`
    pub fn trailing(days: u64, today: NaiveDate) -> Self {
        let from = today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to: today }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    pub fn days(&self) -> u64 {
        (self.to - self.from).num_days() as u64 + 1
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.from && day <= self.to
    }

    /// Every day of the range in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }
}

/// Range and tuning of a sales report
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// First day, inclusive (default: 29 days before `to`)
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (default: today)
    pub to: Option<NaiveDate>,
    /// Number of top products (default 10)
    pub top: Option<usize>,
    /// Stock level at or below which a product counts as low (default 10)
    pub low_stock_threshold: Option<i32>,
}

impl ReportQuery {
    pub fn top(&self) -> usize {
        self.top.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP)
    }

    pub fn low_stock_threshold(&self) -> i32 {
        self.low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
            .max(0)
    }
}

/// Headline figures over shop orders. Cancelled orders count towards
/// `order_count` and `cancelled_count` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub order_count: u64,
    pub cancelled_count: u64,
    /// Cents
    pub gross_revenue: i64,
    pub items_sold: i64,
    /// Cents, rounded half up
    pub average_order_value: i64,
    pub shipping_collected: i64,
    pub tax_collected: i64,
}

/// Count of documents sharing a key (a status, a paper size)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MethodRevenue {
    pub payment_method: String,
    pub orders: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub orders: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrintSummary {
    pub count: u64,
    /// Final price where set, else the quote; cancelled jobs excluded
    pub revenue: i64,
    pub by_status: Vec<KeyCount>,
    pub by_paper_size: Vec<KeyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LowStockItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesReport {
    pub range: DateRange,
    pub summary: OrderSummary,
    pub by_status: Vec<KeyCount>,
    pub by_payment_method: Vec<MethodRevenue>,
    pub daily: Vec<DailyRevenue>,
    pub top_products: Vec<TopProduct>,
    pub print_orders: PrintSummary,
    pub new_customers: u64,
    pub low_stock: Vec<LowStockItem>,
    pub generated_at: DateTime<Utc>,
}

/// Figures for one dashboard period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Headline {
    pub orders: u64,
    pub revenue: i64,
    pub print_orders: u64,
    pub print_revenue: i64,
    pub new_customers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub today: Headline,
    pub last_30_days: Headline,
    pub pending_orders: u64,
    pub open_print_jobs: u64,
    pub low_stock_products: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Table exported on its own (CSV) or as one worksheet (XLSX)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Dataset {
    #[default]
    Summary,
    Daily,
    TopProducts,
    Orders,
    PrintOrders,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::Summary,
        Dataset::Daily,
        Dataset::TopProducts,
        Dataset::Orders,
        Dataset::PrintOrders,
    ];
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub top: Option<usize>,
    /// `csv` (default) or `xlsx`
    #[serde(default)]
    pub format: ExportFormat,
    /// Dataset of a CSV export (default `summary`); XLSX holds them all
    #[serde(default)]
    pub dataset: Dataset,
}

impl ExportQuery {
    pub fn report_query(&self) -> ReportQuery {
        ReportQuery {
            from: self.from,
            to: self.to,
            top: self.top,
            low_stock_threshold: None,
        }
    }
}

/// A generated download
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}
