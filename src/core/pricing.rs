//! Pricing engine - turns a booking configuration into a cost breakdown.
//!
//! [`calculate_budget`] is pure and deterministic: it performs no I/O and the same
//! configuration always yields the same [`CalculationResult`]. All arithmetic is
//! done in [`Decimal`] currency units; rounding happens only in
//! [`CalculationResult::charge_amounts`].
//!
//! The calculation runs in order:
//!
//! 1. duration of the time window in hours
//! 2. rental fee by pricing model
//! 3. venue consumption (venue-scoped packages)
//! 4. minimum-spend gap, topping the venue subtotal up to the minimum spend
//! 5. extras (global packages)
//! 6. platform fee on venue subtotal plus extras
//! 7. total

use crate::{
    core::{
        money::{from_minor_units, round_to_minor, to_minor_units},
        schedule::TimeWindow,
    },
    entities::{package, pricing_rule},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat platform fee applied to the venue subtotal plus extras.
pub const PLATFORM_FEE_RATE: Decimal = dec!(0.10);

const MINUTES_PER_HOUR: Decimal = dec!(60);

/// How a pricing rule charges for the venue itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Base price per hour of the window
    Hourly,
    /// Base price once per booking
    Daily,
    /// Base price per guest
    PerPerson,
}

impl PricingModel {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::PerPerson => "per_person",
        }
    }
}

impl FromStr for PricingModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "per_person" => Ok(Self::PerPerson),
            other => Err(Error::integrity(format!("unknown pricing model '{other}'"))),
        }
    }
}

/// How a package price scales with the guest count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// Charged once
    Fixed,
    /// Charged per guest
    PerPerson,
}

impl PriceType {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::PerPerson => "per_person",
        }
    }
}

impl FromStr for PriceType {
    type Err = Error;

    /// Unknown price types fail closed rather than pricing the package at zero.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "per_person" => Ok(Self::PerPerson),
            other => Err(Error::integrity(format!("unknown package price type '{other}'"))),
        }
    }
}

/// Package category, used for display grouping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageCategory {
    /// Catering
    Food,
    /// Drinks
    Beverage,
    /// Waiters, security, cleaning
    Staff,
    /// Furniture, sound, lighting
    Equipment,
    /// Photo and video
    Photography,
    /// Music
    Dj,
}

impl PackageCategory {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Beverage => "beverage",
            Self::Staff => "staff",
            Self::Equipment => "equipment",
            Self::Photography => "photography",
            Self::Dj => "dj",
        }
    }
}

impl FromStr for PackageCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "food" => Ok(Self::Food),
            "beverage" => Ok(Self::Beverage),
            "staff" => Ok(Self::Staff),
            "equipment" => Ok(Self::Equipment),
            "photography" => Ok(Self::Photography),
            "dj" => Ok(Self::Dj),
            other => Err(Error::integrity(format!("unknown package category '{other}'"))),
        }
    }
}

impl fmt::Display for PackageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terms of the pricing rule that applies to the event date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingTerms {
    /// Pricing model
    pub model: PricingModel,
    /// Base price in currency units
    pub base_price: Decimal,
    /// Minimum venue spend in currency units
    pub minimum_spend: Decimal,
    /// Minimum hours the host expects
    pub min_hours: u32,
}

impl TryFrom<&pricing_rule::Model> for PricingTerms {
    type Error = Error;

    fn try_from(rule: &pricing_rule::Model) -> Result<Self> {
        Ok(Self {
            model: rule.pricing_model.parse()?,
            base_price: from_minor_units(rule.base_price_cents),
            minimum_spend: from_minor_units(rule.minimum_spend_cents),
            min_hours: u32::try_from(rule.min_hours)
                .map_err(|_| Error::integrity(format!("rule {} has negative min_hours", rule.id)))?,
        })
    }
}

/// A package as it was priced at booking time.
///
/// Persisted with the booking so later catalog changes never alter what was agreed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSnapshot {
    /// Package ID at the time of booking
    pub id: i64,
    /// Package name at the time of booking
    pub name: String,
    /// Owning venue, None for global packages
    pub venue_id: Option<i64>,
    /// Unit price in currency units
    pub price: Decimal,
    /// How the price scales
    pub price_type: PriceType,
    /// Display category
    pub category: PackageCategory,
}

impl PackageSnapshot {
    /// Venue-scoped packages count toward the venue's minimum spend.
    #[must_use]
    pub const fn is_venue_scoped(&self) -> bool {
        self.venue_id.is_some()
    }

    /// Cost of this package for the given number of guests.
    #[must_use]
    pub fn cost_for(&self, guest_count: u32) -> Decimal {
        match self.price_type {
            PriceType::Fixed => self.price,
            PriceType::PerPerson => self.price * Decimal::from(guest_count),
        }
    }
}

impl TryFrom<&package::Model> for PackageSnapshot {
    type Error = Error;

    fn try_from(model: &package::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            name: model.name.clone(),
            venue_id: model.venue_id,
            price: from_minor_units(model.price_cents),
            price_type: model.price_type.parse()?,
            category: model.category.parse()?,
        })
    }
}

/// Everything the engine needs to price one booking.
///
/// Guest count is validated by the caller (positive, within standing capacity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfiguration {
    /// Booking window
    pub window: TimeWindow,
    /// Number of guests
    pub guest_count: u32,
    /// Selected add-ons
    pub packages: Vec<PackageSnapshot>,
    /// Terms of the rule for the event's day of week
    pub terms: PricingTerms,
}

/// Audit figures that explain how the amounts were reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    /// Window length in hours
    pub hours_duration: Decimal,
    /// Minimum spend that was applied
    pub applied_min_spend: Decimal,
    /// Whether the window meets the rule's minimum hours (advisory)
    pub meets_minimum_hours: bool,
}

/// Unrounded result of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationResult {
    /// Rental fee for the venue itself
    pub rental_fee: Decimal,
    /// Venue-scoped packages
    pub venue_consumption: Decimal,
    /// Venue total after the minimum-spend top-up
    pub venue_subtotal: Decimal,
    /// Top-up needed to reach the minimum spend
    pub min_spend_gap: Decimal,
    /// Global packages
    pub extras: Decimal,
    /// Platform fee
    pub platform_fee: Decimal,
    /// Grand total
    pub total_amount: Decimal,
    /// Audit figures
    pub breakdown: Breakdown,
}

/// Calculation figures rounded to the currency's minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeAmounts {
    /// Rental fee
    pub rental_fee: Decimal,
    /// Venue-scoped packages
    pub venue_consumption: Decimal,
    /// Venue subtotal after top-up
    pub venue_subtotal: Decimal,
    /// Minimum-spend top-up
    pub min_spend_gap: Decimal,
    /// Global packages
    pub extras: Decimal,
    /// Platform fee
    pub platform_fee: Decimal,
    /// Amount to charge
    pub total_amount: Decimal,
}

impl CalculationResult {
    /// Rounds every figure half-up to the minor unit for display and charging.
    #[must_use]
    pub fn charge_amounts(&self) -> ChargeAmounts {
        ChargeAmounts {
            rental_fee: round_to_minor(self.rental_fee),
            venue_consumption: round_to_minor(self.venue_consumption),
            venue_subtotal: round_to_minor(self.venue_subtotal),
            min_spend_gap: round_to_minor(self.min_spend_gap),
            extras: round_to_minor(self.extras),
            platform_fee: round_to_minor(self.platform_fee),
            total_amount: round_to_minor(self.total_amount),
        }
    }

    /// Amount to charge, in minor units.
    pub fn total_minor_units(&self) -> Result<i64> {
        to_minor_units(self.total_amount)
    }
}

/// Computes the cost breakdown for a booking configuration.
#[must_use]
pub fn calculate_budget(config: &BookingConfiguration) -> CalculationResult {
    let terms = &config.terms;
    let guests = Decimal::from(config.guest_count);

    let duration_minutes = config.window.duration_minutes();
    let hours_duration = Decimal::from(duration_minutes) / MINUTES_PER_HOUR;

    let rental_fee = match terms.model {
        PricingModel::Hourly => hours_duration * terms.base_price,
        PricingModel::Daily => terms.base_price,
        PricingModel::PerPerson => guests * terms.base_price,
    };

    let venue_consumption = sum_packages(config, true);

    let before_gap = rental_fee + venue_consumption;
    let (venue_subtotal, min_spend_gap) = if before_gap < terms.minimum_spend {
        (terms.minimum_spend, terms.minimum_spend - before_gap)
    } else {
        (before_gap, Decimal::ZERO)
    };

    let extras = sum_packages(config, false);

    let fee_base = venue_subtotal + extras;
    let platform_fee = fee_base * PLATFORM_FEE_RATE;
    let total_amount = fee_base + platform_fee;

    CalculationResult {
        rental_fee,
        venue_consumption,
        venue_subtotal,
        min_spend_gap,
        extras,
        platform_fee,
        total_amount,
        breakdown: Breakdown {
            hours_duration,
            applied_min_spend: terms.minimum_spend,
            meets_minimum_hours: duration_minutes >= terms.min_hours * 60,
        },
    }
}

fn sum_packages(config: &BookingConfiguration, venue_scoped: bool) -> Decimal {
    config
        .packages
        .iter()
        .filter(|p| p.is_venue_scoped() == venue_scoped)
        .map(|p| p.cost_for(config.guest_count))
        .sum()
}
