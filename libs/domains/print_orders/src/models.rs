use chrono::{DateTime, NaiveDate, Utc};
use media_store::StoredMedia;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::pricing::PrintQuote;

pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_FILES: usize = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    BusinessCard,
    /// Uses `width_mm` and `height_mm`
    Custom,
}

impl PaperSize {
    /// Sheet dimensions in millimetres, `None` for custom sizes
    pub fn dimensions_mm(self) -> Option<(u32, u32)> {
        match self {
            PaperSize::A3 => Some((297, 420)),
            PaperSize::A4 => Some((210, 297)),
            PaperSize::A5 => Some((148, 210)),
            PaperSize::Letter => Some((216, 279)),
            PaperSize::Legal => Some((216, 356)),
            PaperSize::Tabloid => Some((279, 432)),
            PaperSize::BusinessCard => Some((85, 55)),
            PaperSize::Custom => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaperType {
    #[default]
    Standard,
    Premium,
    Glossy,
    Matte,
    Cardstock,
    Photo,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorMode {
    #[default]
    BlackWhite,
    Color,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sides {
    #[default]
    Single,
    Double,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Binding {
    #[default]
    None,
    Staple,
    Spiral,
    Perfect,
    Hardcover,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Turnaround {
    #[default]
    Standard,
    Rush,
}

/// What to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_specs"))]
pub struct PrintSpecs {
    pub paper_size: PaperSize,
    /// Custom sizes only
    pub width_mm: Option<u32>,
    /// Custom sizes only
    pub height_mm: Option<u32>,
    #[serde(default)]
    pub paper_type: PaperType,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default)]
    pub sides: Sides,
    /// Pages per copy
    #[validate(range(min = 1, max = 2000))]
    pub pages: u32,
    #[validate(range(min = 1, max = 10000))]
    pub copies: u32,
    #[serde(default)]
    pub binding: Binding,
    #[serde(default)]
    pub turnaround: Turnaround,
}

const CUSTOM_MIN_MM: u32 = 20;
const CUSTOM_MAX_MM: u32 = 1500;

fn validate_specs(specs: &PrintSpecs) -> Result<(), ValidationError> {
    if specs.paper_size != PaperSize::Custom {
        return Ok(());
    }
    match (specs.width_mm, specs.height_mm) {
        (Some(w), Some(h))
            if (CUSTOM_MIN_MM..=CUSTOM_MAX_MM).contains(&w)
                && (CUSTOM_MIN_MM..=CUSTOM_MAX_MM).contains(&h) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::new("custom_size").with_message(
            format!(
                "Custom paper needs width_mm and height_mm between {} and {}",
                CUSTOM_MIN_MM, CUSTOM_MAX_MM
            )
            .into(),
        )),
    }
}

impl PrintSpecs {
    /// Width and height in millimetres
    pub fn dimensions_mm(&self) -> (u32, u32) {
        self.paper_size
            .dimensions_mm()
            .unwrap_or((self.width_mm.unwrap_or(0), self.height_mm.unwrap_or(0)))
    }
}

/// Print job lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrintStatus {
    #[default]
    Submitted,
    Reviewing,
    Approved,
    Printing,
    Ready,
    Completed,
    Cancelled,
}

impl PrintStatus {
    pub const OPEN: [PrintStatus; 5] = [
        PrintStatus::Submitted,
        PrintStatus::Reviewing,
        PrintStatus::Approved,
        PrintStatus::Printing,
        PrintStatus::Ready,
    ];

    pub fn next_statuses(self) -> &'static [PrintStatus] {
        use PrintStatus::*;
        match self {
            Submitted => &[Reviewing, Cancelled],
            Reviewing => &[Approved, Cancelled],
            Approved => &[Printing, Cancelled],
            Printing => &[Ready],
            Ready => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: PrintStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    /// The submitter may cancel until the job is approved
    pub fn customer_cancellable(self) -> bool {
        matches!(self, PrintStatus::Submitted | PrintStatus::Reviewing)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FulfillmentMethod {
    #[default]
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliveryAddress {
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 56))]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_fulfillment"))]
pub struct Fulfillment {
    #[serde(default)]
    pub method: FulfillmentMethod,
    #[validate(nested)]
    pub address: Option<DeliveryAddress>,
}

fn validate_fulfillment(fulfillment: &Fulfillment) -> Result<(), ValidationError> {
    if fulfillment.method == FulfillmentMethod::Delivery && fulfillment.address.is_none() {
        return Err(ValidationError::new("address_required")
            .with_message("Delivery needs an address".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Contact {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: PrintStatus,
    pub note: Option<String>,
    pub by: Option<Uuid>,
    pub at: DateTime<Utc>,
}

/// Internal note left by staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrintNote {
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

/// Print job as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrintOrder {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// `PRN-YYYYMMDD-XXXXXX`
    pub reference: String,
    /// `None` for guest submissions
    pub user_id: Option<Uuid>,
    pub contact: Contact,
    pub files: Vec<StoredMedia>,
    pub specs: PrintSpecs,
    pub instructions: Option<String>,
    /// Price computed at submission
    pub quote: PrintQuote,
    /// Price set by staff after review, overrides the quote
    pub final_price: Option<i64>,
    pub fulfillment: Fulfillment,
    pub status: PrintStatus,
    pub status_history: Vec<StatusChange>,
    pub notes: Vec<PrintNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrintOrder {
    /// What the customer pays: the final price once set, else the quote
    pub fn amount_due(&self) -> i64 {
        self.final_price.unwrap_or(self.quote.total)
    }

    pub fn transition(&mut self, next: PrintStatus, note: Option<String>, by: Option<Uuid>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        self.status = next;
        self.status_history.push(StatusChange {
            status: next,
            note,
            by,
            at: now,
        });
        self.updated_at = now;
        true
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

/// `PRN-20240501-3FA9C2`
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "PRN-{}-{}",
        now.format("%Y%m%d"),
        random[..6].to_ascii_uppercase()
    )
}

/// The `details` part of a print order submission
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitPrintOrder {
    /// Required for guests; signed-in users default to their account
    #[validate(nested)]
    pub contact: Option<Contact>,
    #[validate(nested)]
    pub specs: PrintSpecs,
    #[validate(length(max = 2000))]
    pub instructions: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub fulfillment: Fulfillment,
}

/// One uploaded file of a submission
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
pub struct TrackQuery {
    #[validate(length(min = 1, max = 32))]
    pub reference: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelPrintOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePrintStatusRequest {
    pub status: PrintStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetFinalPriceRequest {
    /// Cents
    #[validate(range(min = 0))]
    pub final_price: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddNoteRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// Admin print order filters
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PrintOrderFilter {
    pub status: Option<PrintStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Reference, contact name or email
    pub search: Option<String>,
    #[serde(skip)]
    pub user_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for PrintOrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            from: None,
            to: None,
            search: None,
            user_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PrintOrderFilter {
    pub fn for_user(user_id: Uuid, limit: i64, offset: u64) -> Self {
        Self {
            user_id: Some(user_id),
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrintOrderList {
    pub data: Vec<PrintOrder>,
    pub total: u64,
    pub limit: i64,
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(size: PaperSize) -> PrintSpecs {
        PrintSpecs {
            paper_size: size,
            width_mm: None,
            height_mm: None,
            paper_type: PaperType::Standard,
            color_mode: ColorMode::BlackWhite,
            sides: Sides::Single,
            pages: 10,
            copies: 1,
            binding: Binding::None,
            turnaround: Turnaround::Standard,
        }
    }

    #[test]
    fn test_status_machine() {
        use PrintStatus::*;
        assert!(Submitted.can_transition_to(Reviewing));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Printing.can_transition_to(Cancelled));
        assert!(!Submitted.can_transition_to(Printing));
        assert!(Ready.can_transition_to(Completed));
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
        assert!(Reviewing.customer_cancellable());
        assert!(!Approved.customer_cancellable());
        assert!(PrintStatus::OPEN.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn test_custom_size_needs_dimensions() {
        let mut custom = specs(PaperSize::Custom);
        assert!(custom.validate().is_err());

        custom.width_mm = Some(600);
        custom.height_mm = Some(900);
        assert!(custom.validate().is_ok());
        assert_eq!(custom.dimensions_mm(), (600, 900));

        custom.height_mm = Some(5000);
        assert!(custom.validate().is_err());
    }

    #[test]
    fn test_spec_ranges() {
        let mut s = specs(PaperSize::A4);
        s.pages = 0;
        assert!(s.validate().is_err());
        s.pages = 2000;
        s.copies = 10_001;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_delivery_needs_address() {
        let delivery = Fulfillment {
            method: FulfillmentMethod::Delivery,
            address: None,
        };
        assert!(delivery.validate().is_err());
        assert!(Fulfillment::default().validate().is_ok());
    }

    #[test]
    fn test_reference_format() {
        let now = DateTime::parse_from_rfc3339("2024-12-31T23:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let reference = generate_reference(now);
        assert!(reference.starts_with("PRN-20241231-"));
        assert_eq!(reference.len(), 19);
    }
}
