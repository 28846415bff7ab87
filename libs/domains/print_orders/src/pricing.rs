//! Print job pricing, all amounts in cents.
//!
//! 1. Every printed side costs the base price for its size and colour mode,
//!    scaled by the paper type multiplier.
//! 2. Double-sided jobs take 10% off the print cost.
//! 3. Large runs take a quantity discount off what is left of the print cost.
//! 4. Binding is charged per copy.
//! 5. Rush turnaround adds 25% of everything above.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Binding, ColorMode, PaperSize, PaperType, PrintSpecs, Sides, Turnaround};

const A4_AREA_MM2: u64 = 210 * 297;
const DOUBLE_SIDED_DISCOUNT_PERCENT: i64 = 10;
const RUSH_PERCENT: i64 = 25;

/// `(minimum copies, percent off)`, largest first
const QUANTITY_DISCOUNTS: [(u32, u32); 3] = [(1000, 15), (500, 10), (100, 5)];

/// Price breakdown of a print job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrintQuote {
    /// Price of one printed side before discounts
    pub per_side: i64,
    /// Printed sides across all copies
    pub sides: i64,
    /// Physical sheets across all copies
    pub sheets: i64,
    pub print_cost: i64,
    pub double_sided_discount: i64,
    pub quantity_discount_percent: u32,
    pub quantity_discount: i64,
    pub binding_cost: i64,
    pub subtotal: i64,
    pub rush_fee: i64,
    pub total: i64,
}

fn base_per_side(size: PaperSize, color: ColorMode) -> i64 {
    let (black_white, colour) = match size {
        PaperSize::BusinessCard => (3, 10),
        PaperSize::A5 => (5, 20),
        PaperSize::A4 | PaperSize::Letter | PaperSize::Custom => (10, 40),
        PaperSize::Legal => (12, 50),
        PaperSize::A3 | PaperSize::Tabloid => (20, 80),
    };
    match color {
        ColorMode::BlackWhite => black_white,
        ColorMode::Color => colour,
    }
}

fn paper_multiplier_percent(paper: PaperType) -> i64 {
    match paper {
        PaperType::Standard => 100,
        PaperType::Premium => 130,
        PaperType::Matte => 140,
        PaperType::Glossy => 150,
        PaperType::Cardstock => 180,
        PaperType::Photo => 250,
    }
}

fn binding_fee(binding: Binding) -> i64 {
    match binding {
        Binding::None => 0,
        Binding::Staple => 50,
        Binding::Spiral => 300,
        Binding::Perfect => 500,
        Binding::Hardcover => 1500,
    }
}

pub fn quantity_discount_percent(copies: u32) -> u32 {
    QUANTITY_DISCOUNTS
        .iter()
        .find(|(min, _)| copies >= *min)
        .map(|(_, percent)| *percent)
        .unwrap_or(0)
}

/// `amount * percent / 100`, rounded half up
fn percent_of(amount: i64, percent: i64) -> i64 {
    (amount * percent + 50) / 100
}

/// Base price of one side. Custom sizes scale the A4 price by area,
/// rounding up.
fn per_side(specs: &PrintSpecs) -> i64 {
    let base = base_per_side(specs.paper_size, specs.color_mode);
    if specs.paper_size != PaperSize::Custom {
        return base;
    }
    let (w, h) = specs.dimensions_mm();
    let area = u64::from(w) * u64::from(h);
    let scaled = (base as u64 * area).div_ceil(A4_AREA_MM2);
    (scaled as i64).max(1)
}

/// Price a print job. Expects validated specs.
pub fn quote(specs: &PrintSpecs) -> PrintQuote {
    let per_side = per_side(specs);
    let copies = i64::from(specs.copies);
    let pages = i64::from(specs.pages);

    let sides = pages * copies;
    let sheets_per_copy = match specs.sides {
        Sides::Single => pages,
        Sides::Double => (pages + 1) / 2,
    };

    let print_cost = percent_of(per_side * sides, paper_multiplier_percent(specs.paper_type));
    let double_sided_discount = match specs.sides {
        Sides::Single => 0,
        Sides::Double => percent_of(print_cost, DOUBLE_SIDED_DISCOUNT_PERCENT),
    };

    let quantity_discount_percent = quantity_discount_percent(specs.copies);
    let quantity_discount = percent_of(
        print_cost - double_sided_discount,
        i64::from(quantity_discount_percent),
    );

    let binding_cost = binding_fee(specs.binding) * copies;
    let subtotal = print_cost - double_sided_discount - quantity_discount + binding_cost;
    let rush_fee = match specs.turnaround {
        Turnaround::Standard => 0,
        Turnaround::Rush => percent_of(subtotal, RUSH_PERCENT),
    };

    PrintQuote {
        per_side,
        sides,
        sheets: sheets_per_copy * copies,
        print_cost,
        double_sided_discount,
        quantity_discount_percent,
        quantity_discount,
        binding_cost,
        subtotal,
        rush_fee,
        total: subtotal + rush_fee,
    }
}
