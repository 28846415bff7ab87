//! Bulk product upload: a spreadsheet of products plus an optional zip of
//! images.
//!
//! ```text
//! spreadsheet ──► spreadsheet::read_sheet ──► columns::detect_columns ──► rows
//! images.zip  ──► archive::ImageArchive ───────────────┐                   │
//!                                                      ▼                   ▼
//!                                      match images ◄── ProductService::bulk_import
//!                                                      │
//!                                                      ▼
//!                                              BulkImportReport
//! ```
//!
//! Row problems never abort the import; they are collected in the report with
//! the row number the admin sees in their spreadsheet program.

pub mod archive;
pub mod columns;
pub mod spreadsheet;

use media_store::MediaKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumString};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateProduct, Product, ProductCategory, ProductImage, ProductStatus, UpdateProduct,
};
use crate::repository::ProductRepository;
use crate::service::ProductService;
use archive::{ImageArchive, is_remote};
use columns::{
    Column, ColumnMap, HeaderMode, detect_columns, parse_bool, parse_category, parse_price_cents,
    parse_quantity, parse_status, split_list,
};
use spreadsheet::{ALLOWED_EXTENSIONS, SheetFormat, SheetRow, extension, read_sheet};

/// Archive entry size cap used for dry runs without a media store.
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// What to do with rows whose SKU (or name) already exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DuplicateMode {
    #[default]
    Skip,
    Update,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkImportOptions {
    pub on_duplicate: DuplicateMode,
    /// Parse and match without writing anything
    pub dry_run: bool,
}

/// The uploaded files.
#[derive(Debug, Clone)]
pub struct BulkUpload {
    pub file_name: String,
    pub file: Vec<u8>,
    pub images: Option<Vec<u8>>,
    pub options: BulkImportOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkRowResult {
    /// 1-based sheet row
    pub row: usize,
    pub action: RowAction,
    /// Absent for creations in a dry run
    pub product_id: Option<Uuid>,
    pub name: String,
    /// Stored image URLs, or archive paths in a dry run
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkRowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkImportReport {
    pub format: SheetFormat,
    /// Worksheet the rows came from
    pub sheet: Option<String>,
    pub header: HeaderMode,
    /// Non-blank data rows
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub rows: Vec<BulkRowResult>,
    pub errors: Vec<BulkRowError>,
    /// Problems that did not fail the row, e.g. an image reference not found
    pub warnings: Vec<BulkRowError>,
    /// Archive images no row used
    pub unmatched_images: Vec<String>,
}

/// A data row coerced to typed values. `None` means the cell was blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub row: usize,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub compare_at_price: Option<i64>,
    pub stock: Option<i32>,
    pub category: Option<ProductCategory>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    pub image_refs: Vec<String>,
    pub featured: Option<bool>,
    pub status: Option<ProductStatus>,
    pub min_order_quantity: Option<i32>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Coerce one sheet row. Every bad cell is reported, not just the first.
pub fn parse_row(map: &ColumnMap, row: &SheetRow) -> Result<ProductRow, String> {
    let mut problems = Vec::new();
    let cell = |column: Column| map.get(row, column);

    fn collect<T>(result: Result<T, String>, problems: &mut Vec<String>) -> Option<T> {
        result.map_err(|e| problems.push(e)).ok()
    }

    let name = cell(Column::Name).to_string();
    if name.is_empty() {
        problems.push("Name is required".to_string());
    }

    let price = non_empty(cell(Column::Price))
        .and_then(|raw| collect(parse_price_cents(&raw), &mut problems));
    let compare_at_price = non_empty(cell(Column::CompareAtPrice))
        .and_then(|raw| collect(parse_price_cents(&raw), &mut problems));
    let stock =
        non_empty(cell(Column::Stock)).and_then(|raw| collect(parse_quantity(&raw), &mut problems));
    let min_order_quantity = non_empty(cell(Column::MinOrderQuantity))
        .and_then(|raw| collect(parse_quantity(&raw), &mut problems));
    if min_order_quantity == Some(0) {
        problems.push("Minimum order quantity must be at least 1".to_string());
    }
    let featured = collect(parse_bool(cell(Column::Featured)), &mut problems).flatten();
    let status = non_empty(cell(Column::Status))
        .and_then(|raw| collect(parse_status(&raw), &mut problems));

    if !problems.is_empty() {
        return Err(problems.join("; "));
    }

    Ok(ProductRow {
        row: row.number,
        name,
        description: non_empty(cell(Column::Description)),
        price,
        compare_at_price,
        stock,
        category: non_empty(cell(Column::Category)).map(|raw| parse_category(&raw)),
        sku: non_empty(cell(Column::Sku)).map(|s| s.to_uppercase()),
        brand: non_empty(cell(Column::Brand)),
        tags: split_list(cell(Column::Tags)),
        image_refs: split_list(cell(Column::Images)),
        featured,
        status,
        min_order_quantity,
    })
}

impl ProductRow {
    fn to_create(&self) -> ProductResult<CreateProduct> {
        let price = self
            .price
            .ok_or_else(|| ProductError::Validation("Price is required".to_string()))?;
        Ok(CreateProduct {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            price,
            compare_at_price: self.compare_at_price,
            stock: self.stock.unwrap_or(0),
            category: self.category.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            images: Vec::new(),
            sku: self.sku.clone(),
            brand: self.brand.clone(),
            tags: self.tags.clone(),
            attributes: BTreeMap::new(),
            featured: self.featured.unwrap_or(false),
            min_order_quantity: self.min_order_quantity.unwrap_or(1),
        })
    }

    /// Only cells that were filled in overwrite the existing product.
    fn to_update(&self) -> UpdateProduct {
        UpdateProduct {
            name: Some(self.name.clone()),
            description: self.description.clone(),
            price: self.price,
            compare_at_price: self.compare_at_price,
            stock: self.stock,
            category: self.category,
            status: self.status,
            images: None,
            sku: self.sku.clone(),
            brand: self.brand.clone(),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            attributes: None,
            featured: self.featured,
            min_order_quantity: self.min_order_quantity,
        }
    }
}

/// Running state of one import.
struct ImportRun<'a> {
    archive: &'a ImageArchive,
    used_images: Vec<bool>,
    report: BulkImportReport,
    seen_skus: HashMap<String, usize>,
    seen_names: HashMap<String, usize>,
}

impl ImportRun<'_> {
    fn fail(&mut self, row: usize, message: impl Into<String>) {
        self.report.failed += 1;
        self.report.errors.push(BulkRowError {
            row,
            message: message.into(),
        });
    }

    fn warn(&mut self, row: usize, message: impl Into<String>) {
        self.report.warnings.push(BulkRowError {
            row,
            message: message.into(),
        });
    }

    fn record(&mut self, result: BulkRowResult) {
        match result.action {
            RowAction::Created => self.report.created += 1,
            RowAction::Updated => self.report.updated += 1,
            RowAction::Skipped => self.report.skipped += 1,
        }
        self.report.rows.push(result);
    }

    /// Returns the earlier row number when this SKU or name was already seen
    /// in the file.
    fn check_in_file_duplicates(&mut self, row: &ProductRow) -> Option<String> {
        if let Some(sku) = &row.sku {
            if let Some(first) = self.seen_skus.get(sku) {
                return Some(format!("Duplicate SKU '{}' (first seen on row {})", sku, first));
            }
        }
        let name_key = row.name.to_lowercase();
        if let Some(first) = self.seen_names.get(&name_key) {
            return Some(format!(
                "Duplicate name '{}' (first seen on row {})",
                row.name, first
            ));
        }
        if let Some(sku) = &row.sku {
            self.seen_skus.insert(sku.clone(), row.row);
        }
        self.seen_names.insert(name_key, row.row);
        None
    }

    /// Archive indices of the row's images plus any remote URLs, in order.
    fn match_images(&mut self, row: &ProductRow) -> Vec<ImageSource> {
        let mut sources = Vec::new();

        if row.image_refs.is_empty() {
            let by_key = row
                .sku
                .as_deref()
                .and_then(|sku| self.archive.by_key(sku))
                .or_else(|| self.archive.by_key(&row.name));
            sources.extend(by_key.map(ImageSource::Archive));
        } else {
            for reference in &row.image_refs {
                if is_remote(reference) {
                    sources.push(ImageSource::Remote(reference.clone()));
                } else if let Some(index) = self.archive.resolve(reference) {
                    sources.push(ImageSource::Archive(index));
                } else {
                    self.warn(row.row, format!("Image '{}' not found in archive", reference));
                }
            }
        }

        sources.dedup();
        for source in &sources {
            if let ImageSource::Archive(index) = source {
                if let Some(used) = self.used_images.get_mut(*index) {
                    *used = true;
                }
            }
        }
        sources
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageSource {
    Archive(usize),
    Remote(String),
}

impl<R: ProductRepository> ProductService<R> {
    /// Create or update products from an uploaded spreadsheet.
    #[instrument(skip(self, upload), fields(file = %upload.file_name, dry_run = upload.options.dry_run))]
    pub async fn bulk_import(&self, upload: BulkUpload) -> ProductResult<BulkImportReport> {
        if let Some(ext) = extension(&upload.file_name) {
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(ProductError::InvalidUpload(format!(
                    "Unsupported spreadsheet type '{}'; allowed: {}",
                    ext,
                    ALLOWED_EXTENSIONS.join(", ")
                )));
            }
        }

        let options = upload.options;
        let needs_media = upload.images.is_some() && !options.dry_run;
        if needs_media {
            self.media()?;
        }
        let max_image_bytes = self
            .media
            .as_deref()
            .map(|m| m.limit_for(MediaKind::ProductImage))
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES);

        let sheet = read_sheet(&upload.file_name, &upload.file)?;
        let map = detect_columns(&sheet.rows);
        let archive = match upload.images.as_deref() {
            Some(bytes) if !bytes.is_empty() => ImageArchive::from_zip(bytes, max_image_bytes)?,
            _ => ImageArchive::default(),
        };

        tracing::info!(
            format = %sheet.format,
            header = ?map.mode,
            rows = sheet.rows.len().saturating_sub(map.data_start),
            images = archive.len(),
            "Bulk import started"
        );

        let mut run = ImportRun {
            archive: &archive,
            used_images: vec![false; archive.len()],
            report: BulkImportReport {
                format: sheet.format,
                sheet: sheet.name.clone(),
                header: map.mode,
                total_rows: 0,
                created: 0,
                updated: 0,
                skipped: 0,
                failed: 0,
                dry_run: options.dry_run,
                rows: Vec::new(),
                errors: Vec::new(),
                warnings: Vec::new(),
                unmatched_images: Vec::new(),
            },
            seen_skus: HashMap::new(),
            seen_names: HashMap::new(),
        };

        for sheet_row in &sheet.rows[map.data_start.min(sheet.rows.len())..] {
            if sheet_row.is_blank() {
                continue;
            }
            run.report.total_rows += 1;

            let row = match parse_row(&map, sheet_row) {
                Ok(row) => row,
                Err(message) => {
                    run.fail(sheet_row.number, message);
                    continue;
                }
            };
            if let Some(message) = run.check_in_file_duplicates(&row) {
                run.fail(row.row, message);
                continue;
            }

            let number = row.row;
            if let Err(e) = self.import_row(&mut run, row, options).await {
                match e {
                    ProductError::Database(_) | ProductError::Internal(_) => return Err(e),
                    other => run.fail(number, other.to_string()),
                }
            }
        }

        run.report.unmatched_images = archive
            .unused(&run.used_images)
            .map(str::to_string)
            .collect();

        let report = run.report;
        tracing::info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "Bulk import finished"
        );
        Ok(report)
    }

    async fn import_row(
        &self,
        run: &mut ImportRun<'_>,
        row: ProductRow,
        options: BulkImportOptions,
    ) -> ProductResult<()> {
        let existing = self.find_existing(&row).await?;

        if let Some(ref product) = existing {
            if options.on_duplicate == DuplicateMode::Skip {
                run.record(BulkRowResult {
                    row: row.row,
                    action: RowAction::Skipped,
                    product_id: Some(product.id),
                    name: product.name.clone(),
                    images: Vec::new(),
                });
                return Ok(());
            }
            if row.name != product.name && self.repository.exists_by_name(&row.name).await? {
                return Err(ProductError::DuplicateName(row.name));
            }
        }

        // Images are claimed only once the row itself is valid
        let draft = match existing {
            Some(product) => {
                let update = row.to_update();
                update
                    .validate()
                    .map_err(|e| ProductError::Validation(e.to_string()))?;
                Draft::Update(product, update)
            }
            None => {
                let input = row.to_create()?;
                input
                    .validate()
                    .map_err(|e| ProductError::Validation(e.to_string()))?;
                Draft::Create(input)
            }
        };

        let sources = run.match_images(&row);
        let images = if options.dry_run {
            dry_run_images(run.archive, &sources)
        } else {
            self.store_images(run, &row, &sources).await?
        };
        let image_urls: Vec<String> = if options.dry_run {
            sources
                .iter()
                .map(|s| match s {
                    ImageSource::Archive(i) => run.archive.get(*i).path.clone(),
                    ImageSource::Remote(url) => url.clone(),
                })
                .collect()
        } else {
            images.iter().map(|i| i.url.clone()).collect()
        };

        match draft {
            Draft::Update(product, mut update) => {
                update.images = (!images.is_empty()).then_some(images);
                let name = update.name.clone().unwrap_or_else(|| product.name.clone());
                if !options.dry_run {
                    self.repository.update(product.id, update).await?;
                }
                run.record(BulkRowResult {
                    row: row.row,
                    action: RowAction::Updated,
                    product_id: Some(product.id),
                    name,
                    images: image_urls,
                });
            }
            Draft::Create(mut input) => {
                input.images = images;
                let name = input.name.clone();
                let product_id = if options.dry_run {
                    None
                } else {
                    Some(self.repository.create(Product::new(input)).await?.id)
                };
                run.record(BulkRowResult {
                    row: row.row,
                    action: RowAction::Created,
                    product_id,
                    name,
                    images: image_urls,
                });
            }
        }
        Ok(())
    }

    /// Match by SKU when the row has one, otherwise by name. A row whose SKU
    /// is new but whose name is taken conflicts.
    async fn find_existing(&self, row: &ProductRow) -> ProductResult<Option<Product>> {
        match &row.sku {
            Some(sku) => match self.repository.get_by_sku(sku).await? {
                Some(product) => Ok(Some(product)),
                None if self.repository.exists_by_name(&row.name).await? => {
                    Err(ProductError::DuplicateName(row.name.clone()))
                }
                None => Ok(None),
            },
            None => self.repository.get_by_name(&row.name).await,
        }
    }

    async fn store_images(
        &self,
        run: &mut ImportRun<'_>,
        row: &ProductRow,
        sources: &[ImageSource],
    ) -> ProductResult<Vec<ProductImage>> {
        let archive = run.archive;
        let mut images = Vec::with_capacity(sources.len());
        for source in sources {
            let (url, key) = match source {
                ImageSource::Remote(url) => (url.clone(), None),
                ImageSource::Archive(index) => {
                    let image = archive.get(*index);
                    match self
                        .media()?
                        .store(MediaKind::ProductImage, &image.file_name, &image.data)
                        .await
                    {
                        Ok(stored) => (stored.url, Some(stored.key)),
                        Err(e) => {
                            run.warn(row.row, format!("Image '{}' rejected: {}", image.path, e));
                            continue;
                        }
                    }
                }
            };
            images.push(ProductImage {
                url,
                alt: Some(row.name.clone()),
                is_primary: images.is_empty(),
                sort_order: images.len() as i32,
                key,
            });
        }
        Ok(images)
    }
}

/// A validated row waiting for its images.
enum Draft {
    Create(CreateProduct),
    Update(Product, UpdateProduct),
}

fn dry_run_images(archive: &ImageArchive, sources: &[ImageSource]) -> Vec<ProductImage> {
    sources
        .iter()
        .enumerate()
        .map(|(position, source)| ProductImage {
            url: match source {
                ImageSource::Archive(i) => archive.get(*i).path.clone(),
                ImageSource::Remote(url) => url.clone(),
            },
            alt: None,
            is_primary: position == 0,
            sort_order: position as i32,
            key: None,
        })
        .collect()
}
