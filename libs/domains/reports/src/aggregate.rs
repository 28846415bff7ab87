//! Report figures computed from loaded documents.

use chrono::{DateTime, NaiveDate, Utc};
use domain_orders::{Order, OrderStatus};
use domain_print_orders::{PrintOrder, PrintStatus};
use domain_products::Product;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::models::{
    DailyRevenue, DateRange, Headline, KeyCount, LowStockItem, MethodRevenue, OrderSummary,
    PrintSummary, SalesReport, TopProduct,
};

/// Everything a sales report is computed from
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub orders: Vec<Order>,
    pub print_orders: Vec<PrintOrder>,
    pub new_customers: u64,
    pub low_stock: Vec<Product>,
}

fn counts(order: &Order) -> bool {
    order.status != OrderStatus::Cancelled
}

fn print_counts(job: &PrintOrder) -> bool {
    job.status != PrintStatus::Cancelled
}

fn round_div(amount: i64, by: i64) -> i64 {
    if by == 0 { 0 } else { (amount + by / 2) / by }
}

pub fn summarize_orders(orders: &[Order]) -> OrderSummary {
    let mut summary = OrderSummary {
        order_count: orders.len() as u64,
        ..Default::default()
    };
    let mut billable = 0i64;
    for order in orders {
        if !counts(order) {
            summary.cancelled_count += 1;
            continue;
        }
        billable += 1;
        summary.gross_revenue += order.total;
        summary.shipping_collected += order.shipping_fee;
        summary.tax_collected += order.tax;
        summary.items_sold += order.items.iter().map(|i| i64::from(i.quantity)).sum::<i64>();
    }
    summary.average_order_value = round_div(summary.gross_revenue, billable);
    summary
}

fn key_counts(keys: impl Iterator<Item = String>) -> Vec<KeyCount> {
    let mut map: BTreeMap<String, u64> = BTreeMap::new();
    for key in keys {
        *map.entry(key).or_default() += 1;
    }
    map.into_iter()
        .map(|(key, count)| KeyCount { key, count })
        .collect()
}

/// Orders per status, including cancelled ones, keyed alphabetically
pub fn orders_by_status(orders: &[Order]) -> Vec<KeyCount> {
    key_counts(orders.iter().map(|o| o.status.to_string()))
}

/// Revenue per payment method, highest first
pub fn revenue_by_payment_method(orders: &[Order]) -> Vec<MethodRevenue> {
    let mut map: BTreeMap<String, (u64, i64)> = BTreeMap::new();
    for order in orders.iter().filter(|o| counts(o)) {
        let entry = map.entry(order.payment_method.to_string()).or_default();
        entry.0 += 1;
        entry.1 += order.total;
    }
    let mut rows: Vec<MethodRevenue> = map
        .into_iter()
        .map(|(payment_method, (orders, revenue))| MethodRevenue {
            payment_method,
            orders,
            revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    rows
}

/// One row per day of the range, zero-filled
pub fn daily_revenue(orders: &[Order], range: &DateRange) -> Vec<DailyRevenue> {
    let mut by_day: HashMap<NaiveDate, (u64, i64)> = HashMap::new();
    for order in orders.iter().filter(|o| counts(o) && range.contains(o.created_at)) {
        let entry = by_day.entry(order.created_at.date_naive()).or_default();
        entry.0 += 1;
        entry.1 += order.total;
    }
    range
        .dates()
        .map(|date| {
            let (orders, revenue) = by_day.get(&date).copied().unwrap_or_default();
            DailyRevenue {
                date,
                orders,
                revenue,
            }
        })
        .collect()
}

/// Best sellers by line revenue; ties go to the larger quantity, then name
pub fn top_products(orders: &[Order], limit: usize) -> Vec<TopProduct> {
    let mut map: HashMap<Uuid, TopProduct> = HashMap::new();
    for item in orders.iter().filter(|o| counts(o)).flat_map(|o| &o.items) {
        let entry = map.entry(item.product_id).or_insert_with(|| TopProduct {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: 0,
            revenue: 0,
        });
        entry.quantity += i64::from(item.quantity);
        entry.revenue += item.line_total;
    }
    let mut rows: Vec<TopProduct> = map.into_values().collect();
    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.quantity.cmp(&a.quantity))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

pub fn summarize_print_orders(jobs: &[PrintOrder]) -> PrintSummary {
    PrintSummary {
        count: jobs.len() as u64,
        revenue: jobs
            .iter()
            .filter(|j| print_counts(j))
            .map(PrintOrder::amount_due)
            .sum(),
        by_status: key_counts(jobs.iter().map(|j| j.status.to_string())),
        by_paper_size: key_counts(jobs.iter().map(|j| j.specs.paper_size.to_string())),
    }
}

pub fn low_stock_items(products: &[Product]) -> Vec<LowStockItem> {
    let mut rows: Vec<LowStockItem> = products
        .iter()
        .map(|p| LowStockItem {
            product_id: p.id,
            name: p.name.clone(),
            sku: p.sku.clone(),
            stock: p.stock,
        })
        .collect();
    rows.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Dashboard figures for documents created within `range`
pub fn headline(
    orders: &[Order],
    jobs: &[PrintOrder],
    new_customers: u64,
    range: &DateRange,
) -> Headline {
    let in_range = |at: DateTime<Utc>| range.contains(at);
    let billable: Vec<&Order> = orders
        .iter()
        .filter(|o| counts(o) && in_range(o.created_at))
        .collect();
    let print_jobs: Vec<&PrintOrder> = jobs
        .iter()
        .filter(|j| print_counts(j) && in_range(j.created_at))
        .collect();
    Headline {
        orders: billable.len() as u64,
        revenue: billable.iter().map(|o| o.total).sum(),
        print_orders: print_jobs.len() as u64,
        print_revenue: print_jobs.iter().map(|j| j.amount_due()).sum(),
        new_customers,
    }
}

pub fn sales_report(range: DateRange, data: &ReportData, top: usize) -> SalesReport {
    SalesReport {
        range,
        summary: summarize_orders(&data.orders),
        by_status: orders_by_status(&data.orders),
        by_payment_method: revenue_by_payment_method(&data.orders),
        daily: daily_revenue(&data.orders, &range),
        top_products: top_products(&data.orders, top),
        print_orders: summarize_print_orders(&data.print_orders),
        new_customers: data.new_customers,
        low_stock: low_stock_items(&data.low_stock),
        generated_at: Utc::now(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use domain_orders::PaymentMethod;
    use domain_print_orders::PaperSize;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample() -> (Uuid, Uuid, Vec<Order>) {
        let cards = Uuid::now_v7();
        let flyers = Uuid::now_v7();
        let orders = vec![
            order(
                "2024-05-01",
                OrderStatus::Delivered,
                PaymentMethod::CashOnDelivery,
                vec![line(cards, "Business cards", 2000, 2), line(flyers, "Flyers", 1000, 1)],
            ),
            order(
                "2024-05-03",
                OrderStatus::Pending,
                PaymentMethod::BankTransfer,
                vec![line(flyers, "Flyers", 1000, 5)],
            ),
            order(
                "2024-05-03",
                OrderStatus::Cancelled,
                PaymentMethod::BankTransfer,
                vec![line(cards, "Business cards", 2000, 10)],
            ),
        ];
        (cards, flyers, orders)
    }

    #[test]
    fn test_summary_excludes_cancelled_revenue() {
        let (_, _, orders) = sample();
        let summary = summarize_orders(&orders);
        // 5000 + 500 + 500 and 5000 + 500 + 500
        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.gross_revenue, 12000);
        assert_eq!(summary.items_sold, 8);
        assert_eq!(summary.average_order_value, 6000);
        assert_eq!(summary.shipping_collected, 1000);
        assert_eq!(summary.tax_collected, 1000);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize_orders(&[]);
        assert_eq!(summary, OrderSummary::default());
    }

    #[test]
    fn test_daily_revenue_is_zero_filled() {
        let (_, _, orders) = sample();
        let range = DateRange {
            from: date("2024-05-01"),
            to: date("2024-05-04"),
        };
        let daily = daily_revenue(&orders, &range);
        assert_eq!(daily.len(), 4);
        assert_eq!(daily[0].revenue, 6000);
        assert_eq!(daily[1].revenue, 0);
        assert_eq!(daily[2].orders, 1);
        assert_eq!(daily[3].date, date("2024-05-04"));
    }

    #[test]
    fn test_top_products_by_revenue() {
        let (cards, flyers, orders) = sample();
        let top = top_products(&orders, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, flyers);
        assert_eq!(top[0].quantity, 6);
        assert_eq!(top[0].revenue, 6000);
        assert_eq!(top[1].product_id, cards);
        assert_eq!(top_products(&orders, 1).len(), 1);
    }

    #[test]
    fn test_breakdowns() {
        let (_, _, orders) = sample();
        let by_status = orders_by_status(&orders);
        assert_eq!(by_status.len(), 3);
        assert!(by_status.iter().all(|k| k.count == 1));

        let by_method = revenue_by_payment_method(&orders);
        assert_eq!(by_method[0].payment_method, "bank_transfer");
        assert_eq!(by_method[0].orders, 1);
        assert_eq!(by_method[1].revenue, 6000);
    }

    #[test]
    fn test_print_summary_prefers_final_price() {
        let jobs = vec![
            print_job("2024-05-01", PaperSize::A4, PrintStatus::Completed, Some(2500)),
            print_job("2024-05-02", PaperSize::A4, PrintStatus::Submitted, None),
            print_job("2024-05-02", PaperSize::A3, PrintStatus::Cancelled, Some(9999)),
        ];
        let quoted = jobs[1].quote.total;
        let summary = summarize_print_orders(&jobs);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.revenue, 2500 + quoted);
        assert_eq!(
            summary.by_paper_size,
            vec![
                KeyCount { key: "a3".into(), count: 1 },
                KeyCount { key: "a4".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_headline_filters_by_range() {
        let (_, _, orders) = sample();
        let jobs = vec![print_job("2024-05-03", PaperSize::A5, PrintStatus::Ready, Some(700))];
        let today = headline(&orders, &jobs, 2, &DateRange::single(date("2024-05-03")));
        assert_eq!(today.orders, 1);
        assert_eq!(today.revenue, 6000);
        assert_eq!(today.print_orders, 1);
        assert_eq!(today.print_revenue, 700);
        assert_eq!(today.new_customers, 2);
    }

    #[test]
    fn test_sales_report_assembles_sections() {
        let (_, _, orders) = sample();
        let range = DateRange {
            from: date("2024-05-01"),
            to: date("2024-05-31"),
        };
        let data = ReportData {
            orders,
            new_customers: 4,
            ..Default::default()
        };
        let report = sales_report(range, &data, 1);
        assert_eq!(report.daily.len(), 31);
        assert_eq!(report.top_products.len(), 1);
        assert_eq!(report.new_customers, 4);
        assert_eq!(report.print_orders, PrintSummary::default());
    }
}
