//! Report downloads. CSV carries one dataset per file; XLSX carries every
//! dataset as a worksheet with a bold header row.

use domain_orders::Order;
use domain_print_orders::PrintOrder;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ReportError, ReportResult};
use crate::models::{Dataset, DateRange, ExportFile, ExportFormat, SalesReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(i64),
    /// Cents; written as a decimal amount
    Money(i64),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn count(value: impl TryInto<i64>) -> Self {
        Cell::Count(value.try_into().unwrap_or(i64::MAX))
    }

    fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => n.to_string(),
            Cell::Money(cents) => format_cents(*cents),
        }
    }
}

/// `1234` -> `"12.34"`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[derive(Debug, Clone)]
pub struct Table {
    pub sheet_name: &'static str,
    pub header: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

fn summary_table(report: &SalesReport) -> Table {
    let s = &report.summary;
    let p = &report.print_orders;
    let rows = vec![
        ("from", Cell::text(report.range.from.to_string())),
        ("to", Cell::text(report.range.to.to_string())),
        ("orders", Cell::count(s.order_count)),
        ("cancelled_orders", Cell::count(s.cancelled_count)),
        ("gross_revenue", Cell::Money(s.gross_revenue)),
        ("items_sold", Cell::Count(s.items_sold)),
        ("average_order_value", Cell::Money(s.average_order_value)),
        ("shipping_collected", Cell::Money(s.shipping_collected)),
        ("tax_collected", Cell::Money(s.tax_collected)),
        ("print_orders", Cell::count(p.count)),
        ("print_revenue", Cell::Money(p.revenue)),
        ("new_customers", Cell::count(report.new_customers)),
        ("low_stock_products", Cell::count(report.low_stock.len())),
    ];
    Table {
        sheet_name: "Summary",
        header: vec!["metric", "value"],
        rows: rows
            .into_iter()
            .map(|(metric, value)| vec![Cell::text(metric), value])
            .collect(),
    }
}

fn daily_table(report: &SalesReport) -> Table {
    Table {
        sheet_name: "Daily",
        header: vec!["date", "orders", "revenue"],
        rows: report
            .daily
            .iter()
            .map(|d| {
                vec![
                    Cell::text(d.date.to_string()),
                    Cell::count(d.orders),
                    Cell::Money(d.revenue),
                ]
            })
            .collect(),
    }
}

fn top_products_table(report: &SalesReport) -> Table {
    Table {
        sheet_name: "Top products",
        header: vec!["product_id", "name", "quantity", "revenue"],
        rows: report
            .top_products
            .iter()
            .map(|p| {
                vec![
                    Cell::text(p.product_id.to_string()),
                    Cell::text(p.name.clone()),
                    Cell::Count(p.quantity),
                    Cell::Money(p.revenue),
                ]
            })
            .collect(),
    }
}

fn orders_table(orders: &[Order]) -> Table {
    Table {
        sheet_name: "Orders",
        header: vec![
            "order_number",
            "created_at",
            "customer",
            "email",
            "status",
            "payment_method",
            "payment_status",
            "items",
            "subtotal",
            "shipping",
            "tax",
            "total",
        ],
        rows: orders
            .iter()
            .map(|o| {
                vec![
                    Cell::text(o.order_number.clone()),
                    Cell::text(o.created_at.to_rfc3339()),
                    Cell::text(o.customer.name.clone()),
                    Cell::text(o.customer.email.clone()),
                    Cell::text(o.status.to_string()),
                    Cell::text(o.payment_method.to_string()),
                    Cell::text(o.payment_status.to_string()),
                    Cell::Count(o.items.iter().map(|i| i64::from(i.quantity)).sum()),
                    Cell::Money(o.subtotal),
                    Cell::Money(o.shipping_fee),
                    Cell::Money(o.tax),
                    Cell::Money(o.total),
                ]
            })
            .collect(),
    }
}

fn print_orders_table(jobs: &[PrintOrder]) -> Table {
    Table {
        sheet_name: "Print orders",
        header: vec![
            "reference",
            "created_at",
            "contact",
            "email",
            "status",
            "paper_size",
            "pages",
            "copies",
            "quote",
            "final_price",
            "amount_due",
        ],
        rows: jobs
            .iter()
            .map(|j| {
                vec![
                    Cell::text(j.reference.clone()),
                    Cell::text(j.created_at.to_rfc3339()),
                    Cell::text(j.contact.name.clone()),
                    Cell::text(j.contact.email.clone()),
                    Cell::text(j.status.to_string()),
                    Cell::text(j.specs.paper_size.to_string()),
                    Cell::count(j.specs.pages),
                    Cell::count(j.specs.copies),
                    Cell::Money(j.quote.total),
                    j.final_price.map(Cell::Money).unwrap_or(Cell::text("")),
                    Cell::Money(j.amount_due()),
                ]
            })
            .collect(),
    }
}

pub fn table(
    dataset: Dataset,
    report: &SalesReport,
    orders: &[Order],
    jobs: &[PrintOrder],
) -> Table {
    match dataset {
        Dataset::Summary => summary_table(report),
        Dataset::Daily => daily_table(report),
        Dataset::TopProducts => top_products_table(report),
        Dataset::Orders => orders_table(orders),
        Dataset::PrintOrders => print_orders_table(jobs),
    }
}

pub fn to_csv(table: &Table) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::to_text))?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Export(e.to_string()))
}

pub fn to_xlsx(tables: &[Table]) -> ReportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");

    for table in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(table.sheet_name)?;
        for (col, title) in table.header.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &bold)?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let r = i as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                    Cell::Count(n) => {
                        sheet.write_number(r, c, *n as f64)?;
                    }
                    Cell::Money(cents) => {
                        sheet.write_number_with_format(r, c, *cents as f64 / 100.0, &money)?;
                    }
                }
            }
        }
        sheet.set_freeze_panes(1, 0)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// `sales-report[-dataset]-<from>-to-<to>.<ext>`
pub fn file_name(range: &DateRange, format: ExportFormat, dataset: Option<Dataset>) -> String {
    let dataset = dataset
        .map(|d| format!("-{}", d.to_string().replace('_', "-")))
        .unwrap_or_default();
    format!(
        "sales-report{dataset}-{}-to-{}.{format}",
        range.from, range.to
    )
}

/// Render a report download
pub fn export(
    format: ExportFormat,
    dataset: Dataset,
    report: &SalesReport,
    orders: &[Order],
    jobs: &[PrintOrder],
) -> ReportResult<ExportFile> {
    let (file_name, bytes) = match format {
        ExportFormat::Csv => (
            file_name(&report.range, format, Some(dataset)),
            to_csv(&table(dataset, report, orders, jobs))?,
        ),
        ExportFormat::Xlsx => {
            let tables: Vec<Table> = Dataset::ALL
                .iter()
                .map(|d| table(*d, report, orders, jobs))
                .collect();
            (file_name(&report.range, format, None), to_xlsx(&tables)?)
        }
    };
    tracing::info!(%format, %dataset, file_name = %file_name, size = bytes.len(), "Report exported");
    Ok(ExportFile {
        file_name,
        content_type: format.content_type(),
        bytes,
    })
}
