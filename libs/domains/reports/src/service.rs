use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::aggregate::{ReportData, headline, sales_report};
use crate::error::ReportResult;
use crate::export;
use crate::models::{
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_RANGE_DAYS, Dashboard, DateRange, ExportFile,
    ExportQuery, LOW_STOCK_LIMIT, ReportQuery, SalesReport,
};
use crate::source::ReportSource;

pub struct ReportService<S: ReportSource> {
    source: Arc<S>,
}

impl<S: ReportSource> Clone for ReportService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ReportSource> ReportService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    async fn load(&self, range: &DateRange, low_stock_threshold: i32) -> ReportResult<ReportData> {
        let (orders, print_orders, new_customers, low_stock) = tokio::try_join!(
            self.source.orders_between(range.from, range.to),
            self.source.print_orders_between(range.from, range.to),
            self.source.new_customers(range.from, range.to),
            self.source.low_stock(low_stock_threshold, LOW_STOCK_LIMIT),
        )?;
        Ok(ReportData {
            orders,
            print_orders,
            new_customers,
            low_stock,
        })
    }

    /// Sales report for the query's range, resolved against `today`
    #[instrument(skip(self))]
    pub async fn sales_report_on(
        &self,
        query: &ReportQuery,
        today: NaiveDate,
    ) -> ReportResult<SalesReport> {
        let range = DateRange::resolve(query.from, query.to, today)?;
        let data = self.load(&range, query.low_stock_threshold()).await?;
        let report = sales_report(range, &data, query.top());
        tracing::info!(
            from = %range.from,
            to = %range.to,
            orders = report.summary.order_count,
            "Sales report generated"
        );
        Ok(report)
    }

    pub async fn sales_report(&self, query: &ReportQuery) -> ReportResult<SalesReport> {
        self.sales_report_on(query, Utc::now().date_naive()).await
    }

    #[instrument(skip(self))]
    pub async fn dashboard_on(&self, today: NaiveDate) -> ReportResult<Dashboard> {
        let month = DateRange::trailing(DEFAULT_RANGE_DAYS, today);
        let (orders, jobs, customers_today, customers_month, pending, open, low_stock) = tokio::try_join!(
            self.source.orders_between(month.from, month.to),
            self.source.print_orders_between(month.from, month.to),
            self.source.new_customers(today, today),
            self.source.new_customers(month.from, month.to),
            self.source.pending_orders(),
            self.source.open_print_jobs(),
            self.source.low_stock(DEFAULT_LOW_STOCK_THRESHOLD, LOW_STOCK_LIMIT),
        )?;

        Ok(Dashboard {
            today: headline(&orders, &jobs, customers_today, &DateRange::single(today)),
            last_30_days: headline(&orders, &jobs, customers_month, &month),
            pending_orders: pending,
            open_print_jobs: open,
            low_stock_products: low_stock.len() as u64,
            generated_at: Utc::now(),
        })
    }

    pub async fn dashboard(&self) -> ReportResult<Dashboard> {
        self.dashboard_on(Utc::now().date_naive()).await
    }

    #[instrument(skip(self))]
    pub async fn export_on(&self, query: &ExportQuery, today: NaiveDate) -> ReportResult<ExportFile> {
        let report_query = query.report_query();
        let range = DateRange::resolve(report_query.from, report_query.to, today)?;
        let data = self
            .load(&range, report_query.low_stock_threshold())
            .await?;
        let report = sales_report(range, &data, report_query.top());
        export::export(
            query.format,
            query.dataset,
            &report,
            &data.orders,
            &data.print_orders,
        )
    }

    pub async fn export(&self, query: &ExportQuery) -> ReportResult<ExportFile> {
        self.export_on(query, Utc::now().date_naive()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::{line, order, print_job};
    use crate::error::ReportError;
    use crate::models::{Dataset, ExportFormat};
    use crate::source::MockReportSource;
    use domain_orders::{OrderStatus, PaymentMethod};
    use domain_print_orders::{PaperSize, PrintStatus};
    use mockall::predicate::*;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn empty_source() -> MockReportSource {
        let mut source = MockReportSource::new();
        source.expect_orders_between().returning(|_, _| Ok(vec![]));
        source
            .expect_print_orders_between()
            .returning(|_, _| Ok(vec![]));
        source.expect_new_customers().returning(|_, _| Ok(0));
        source.expect_low_stock().returning(|_, _| Ok(vec![]));
        source
    }

    #[tokio::test]
    async fn test_default_range_queries_last_30_days() {
        let mut source = MockReportSource::new();
        source
            .expect_orders_between()
            .with(eq(date("2024-06-01")), eq(date("2024-06-30")))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        source
            .expect_print_orders_between()
            .returning(|_, _| Ok(vec![]));
        source.expect_new_customers().returning(|_, _| Ok(3));
        source
            .expect_low_stock()
            .with(eq(5), eq(LOW_STOCK_LIMIT))
            .returning(|_, _| Ok(vec![]));

        let service = ReportService::new(source);
        let query = ReportQuery {
            low_stock_threshold: Some(5),
            ..Default::default()
        };
        let report = service
            .sales_report_on(&query, date("2024-06-30"))
            .await
            .unwrap();
        assert_eq!(report.daily.len(), 30);
        assert_eq!(report.new_customers, 3);
    }

    #[tokio::test]
    async fn test_rejects_oversized_range() {
        let service = ReportService::new(MockReportSource::new());
        let query = ReportQuery {
            from: Some(date("2023-01-01")),
            to: Some(date("2024-06-30")),
            ..Default::default()
        };
        let result = service.sales_report_on(&query, date("2024-06-30")).await;
        assert!(matches!(result, Err(ReportError::Validation(_))));
    }

    #[tokio::test]
    async fn test_dashboard_splits_today_from_month() {
        let product = Uuid::now_v7();
        let orders = vec![
            order(
                "2024-06-30",
                OrderStatus::Pending,
                PaymentMethod::CashOnDelivery,
                vec![line(product, "Stickers", 300, 10)],
            ),
            order(
                "2024-06-12",
                OrderStatus::Delivered,
                PaymentMethod::BankTransfer,
                vec![line(product, "Stickers", 300, 5)],
            ),
        ];
        let jobs = vec![print_job(
            "2024-06-12",
            PaperSize::A5,
            PrintStatus::Completed,
            Some(800),
        )];

        let mut source = MockReportSource::new();
        source
            .expect_orders_between()
            .returning(move |_, _| Ok(orders.clone()));
        source
            .expect_print_orders_between()
            .returning(move |_, _| Ok(jobs.clone()));
        source
            .expect_new_customers()
            .returning(|from, to| Ok(if from == to { 1 } else { 6 }));
        source.expect_pending_orders().returning(|| Ok(4));
        source.expect_open_print_jobs().returning(|| Ok(2));
        source.expect_low_stock().returning(|_, _| Ok(vec![]));

        let service = ReportService::new(source);
        let dashboard = service.dashboard_on(date("2024-06-30")).await.unwrap();
        // 3000 + 500 + 300
        assert_eq!(dashboard.today.orders, 1);
        assert_eq!(dashboard.today.revenue, 3800);
        assert_eq!(dashboard.today.print_orders, 0);
        assert_eq!(dashboard.today.new_customers, 1);
        assert_eq!(dashboard.last_30_days.orders, 2);
        assert_eq!(dashboard.last_30_days.print_revenue, 800);
        assert_eq!(dashboard.last_30_days.new_customers, 6);
        assert_eq!(dashboard.pending_orders, 4);
        assert_eq!(dashboard.open_print_jobs, 2);
    }

    #[tokio::test]
    async fn test_export_csv_dataset() {
        let service = ReportService::new(empty_source());
        let query = ExportQuery {
            from: Some(date("2024-06-01")),
            to: Some(date("2024-06-02")),
            format: ExportFormat::Csv,
            dataset: Dataset::Orders,
            ..Default::default()
        };
        let file = service.export_on(&query, date("2024-06-30")).await.unwrap();
        assert_eq!(
            file.file_name,
            "sales-report-orders-2024-06-01-to-2024-06-02.csv"
        );
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(text.starts_with("order_number,created_at,customer"));
    }
}
