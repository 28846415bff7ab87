//! Header detection, column aliases and cell coercion.

use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use super::spreadsheet::SheetRow;
use crate::models::{ProductCategory, ProductStatus};

/// Rows scanned for a header before falling back to positional columns.
const HEADER_SCAN_ROWS: usize = 10;

/// Column order assumed when no header row is found.
const POSITIONAL: [Column; 7] = [
    Column::Name,
    Column::Description,
    Column::Price,
    Column::Stock,
    Column::Category,
    Column::Sku,
    Column::Images,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Description,
    Price,
    CompareAtPrice,
    Stock,
    Category,
    Sku,
    Brand,
    Tags,
    Images,
    Featured,
    Status,
    MinOrderQuantity,
}

impl Column {
    /// Normalized header spellings accepted for this column.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Name => &["name", "productname", "product", "title", "itemname", "item"],
            Column::Description => &[
                "description",
                "desc",
                "details",
                "productdescription",
                "summary",
            ],
            Column::Price => &[
                "price",
                "unitprice",
                "sellingprice",
                "saleprice",
                "retailprice",
                "cost",
                "amount",
                "priceusd",
            ],
            Column::CompareAtPrice => &[
                "compareatprice",
                "compareprice",
                "originalprice",
                "listprice",
                "regularprice",
                "oldprice",
                "msrp",
            ],
            Column::Stock => &[
                "stock",
                "quantity",
                "qty",
                "inventory",
                "stockquantity",
                "onhand",
                "available",
                "units",
            ],
            Column::Category => &["category", "categoryname", "type", "producttype", "group"],
            Column::Sku => &[
                "sku",
                "code",
                "productcode",
                "itemcode",
                "ref",
                "reference",
                "partnumber",
            ],
            Column::Brand => &["brand", "manufacturer", "vendor", "maker"],
            Column::Tags => &["tags", "tag", "keywords", "labels"],
            Column::Images => &[
                "images",
                "image",
                "imagefile",
                "imagefiles",
                "imageurl",
                "imageurls",
                "photo",
                "photos",
                "picture",
                "pictures",
                "filename",
            ],
            Column::Featured => &["featured", "isfeatured", "highlight"],
            Column::Status => &["status", "state", "visibility"],
            Column::MinOrderQuantity => &[
                "minorderquantity",
                "minimumorderquantity",
                "minqty",
                "moq",
                "minimumorder",
                "minorder",
            ],
        }
    }

    const ALL: [Column; 13] = [
        Column::Name,
        Column::Description,
        Column::Price,
        Column::CompareAtPrice,
        Column::Stock,
        Column::Category,
        Column::Sku,
        Column::Brand,
        Column::Tags,
        Column::Images,
        Column::Featured,
        Column::Status,
        Column::MinOrderQuantity,
    ];

    pub fn from_header(header: &str) -> Option<Column> {
        let key = normalize_key(header);
        if key.is_empty() {
            return None;
        }
        Column::ALL
            .into_iter()
            .find(|c| c.aliases().contains(&key.as_str()))
    }
}

/// How the column layout was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HeaderMode {
    /// Header found on this 1-based sheet row
    Detected { row: usize },
    /// No header; columns read in the default order
    Positional,
}

#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub mode: HeaderMode,
    columns: HashMap<Column, usize>,
    /// Index into the sheet rows where data starts
    pub data_start: usize,
}

impl ColumnMap {
    pub fn index(&self, column: Column) -> Option<usize> {
        self.columns.get(&column).copied()
    }

    pub fn get<'a>(&self, row: &'a SheetRow, column: Column) -> &'a str {
        self.index(column).map(|i| row.cell(i)).unwrap_or("")
    }
}

/// Lower-case alphanumerics only: "Unit Price ($)" becomes "unitprice".
pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find the header among the first rows, or fall back to positional columns.
///
/// A header needs at least two recognized columns, one of them a name column.
pub fn detect_columns(rows: &[SheetRow]) -> ColumnMap {
    for (position, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let mut columns = HashMap::new();
        for (index, cell) in row.cells.iter().enumerate() {
            if let Some(column) = Column::from_header(cell) {
                columns.entry(column).or_insert(index);
            }
        }
        if columns.len() >= 2 && columns.contains_key(&Column::Name) {
            return ColumnMap {
                mode: HeaderMode::Detected { row: row.number },
                columns,
                data_start: position + 1,
            };
        }
    }

    ColumnMap {
        mode: HeaderMode::Positional,
        columns: POSITIONAL
            .iter()
            .enumerate()
            .map(|(index, column)| (*column, index))
            .collect(),
        data_start: 0,
    }
}

/// Parse a price into cents.
///
/// Accepts currency symbols, thousands separators and decimal commas:
/// `"$1,234.50"`, `"1.234,50 €"` and `"12"` are all valid.
pub fn parse_price_cents(raw: &str) -> Result<i64, String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid price '{}'", raw.trim()));
    }
    if cleaned.starts_with('-') {
        return Err(format!("Price must not be negative: '{}'", raw.trim()));
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let decimal = match (last_dot, last_comma) {
        // Whichever comes last separates the decimals
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(d), None)
            if cleaned.matches('.').count() == 1 && !is_thousands_group(&cleaned, d) =>
        {
            Some(d)
        }
        (None, Some(c))
            if cleaned.matches(',').count() == 1 && cleaned.len() - c - 1 <= 2 =>
        {
            Some(c)
        }
        _ => None,
    };

    let (integer, fraction) = match decimal {
        Some(at) => (&cleaned[..at], &cleaned[at + 1..]),
        None => (cleaned.as_str(), ""),
    };
    let integer: String = integer.chars().filter(char::is_ascii_digit).collect();
    if fraction.contains(['.', ',', '-']) || cleaned[1..].contains('-') {
        return Err(format!("Invalid price '{}'", raw.trim()));
    }

    let units: i64 = if integer.is_empty() {
        0
    } else {
        integer
            .parse()
            .map_err(|_| format!("Invalid price '{}'", raw.trim()))?
    };

    let digits: Vec<i64> = fraction
        .chars()
        .filter_map(|c| c.to_digit(10).map(i64::from))
        .collect();
    let tenths = digits.first().copied().unwrap_or(0);
    let hundredths = digits.get(1).copied().unwrap_or(0);
    let round_up = digits.get(2).is_some_and(|d| *d >= 5);

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
        .ok_or_else(|| format!("Price out of range: '{}'", raw.trim()))
}

/// A lone dot is read as grouping thousands (`1.234`, `2.500`) when
/// three digits follow it and one to three non-zero-led digits precede it.
/// `0.125` stays a decimal.
fn is_thousands_group(cleaned: &str, at: usize) -> bool {
    let integer = &cleaned[..at];
    let fraction = &cleaned[at + 1..];
    fraction.len() == 3
        && (1..=3).contains(&integer.len())
        && !integer.starts_with('0')
}

/// Parse a non-negative whole quantity, accepting `"1,200"` and `"12.0"`.
pub fn parse_quantity(raw: &str) -> Result<i32, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '_'))
        .collect();

    let value = match cleaned.parse::<i64>() {
        Ok(v) => v,
        Err(_) => match cleaned.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => f as i64,
            _ => return Err(format!("Invalid quantity '{}'", raw.trim())),
        },
    };

    if value < 0 {
        return Err(format!("Quantity must not be negative: '{}'", raw.trim()));
    }
    i32::try_from(value).map_err(|_| format!("Quantity out of range: '{}'", raw.trim()))
}

/// Map a free-form category to a known one, falling back to `Other`.
pub fn parse_category(raw: &str) -> ProductCategory {
    let key = normalize_key(raw);
    if key.is_empty() {
        return ProductCategory::Other;
    }

    for category in ProductCategory::all() {
        let slug = normalize_key(&category.to_string());
        let label = normalize_key(category.label());
        if key == slug || key == label || format!("{key}s") == slug {
            return category;
        }
    }

    const KEYWORDS: &[(&str, ProductCategory)] = &[
        ("businesscard", ProductCategory::BusinessCards),
        ("card", ProductCategory::BusinessCards),
        ("flyer", ProductCategory::Flyers),
        ("flier", ProductCategory::Flyers),
        ("leaflet", ProductCategory::Flyers),
        ("brochure", ProductCategory::Brochures),
        ("booklet", ProductCategory::Brochures),
        ("catalog", ProductCategory::Brochures),
        ("poster", ProductCategory::Posters),
        ("banner", ProductCategory::Banners),
        ("rollup", ProductCategory::Banners),
        ("sticker", ProductCategory::Stickers),
        ("label", ProductCategory::Stickers),
        ("decal", ProductCategory::Stickers),
        ("stationer", ProductCategory::Stationery),
        ("letterhead", ProductCategory::Stationery),
        ("envelope", ProductCategory::Stationery),
        ("notepad", ProductCategory::Stationery),
        ("shirt", ProductCategory::Apparel),
        ("hoodie", ProductCategory::Apparel),
        ("apparel", ProductCategory::Apparel),
        ("clothing", ProductCategory::Apparel),
        ("photo", ProductCategory::PhotoPrints),
        ("canvas", ProductCategory::PhotoPrints),
        ("sign", ProductCategory::Signage),
        ("packag", ProductCategory::Packaging),
        ("box", ProductCategory::Packaging),
    ];

    KEYWORDS
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(ProductCategory::Other)
}

/// `None` for blank cells.
pub fn parse_bool(raw: &str) -> Result<Option<bool>, String> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "yes" | "true" | "1" | "y" | "x" => Ok(Some(true)),
        "no" | "false" | "0" | "n" => Ok(Some(false)),
        other => Err(format!("Invalid yes/no value '{}'", other)),
    }
}

pub fn parse_status(raw: &str) -> Result<ProductStatus, String> {
    let key = normalize_key(raw);
    ProductStatus::VISIBLE
        .into_iter()
        .chain([
            ProductStatus::Inactive,
            ProductStatus::Discontinued,
            ProductStatus::Draft,
        ])
        .find(|s| normalize_key(&s.to_string()) == key)
        .ok_or_else(|| format!("Unknown status '{}'", raw.trim()))
}

/// Split a list cell on `,`, `;` or `|`.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
