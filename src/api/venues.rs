//! Venue endpoints used while a guest configures a booking.
//!
//! - `POST /api/venues/:venue_id/quote` - live estimate for a configuration
//! - `GET /api/venues/:venue_id/availability` - whether a window is free
//! - `GET /api/venues/:venue_id/packages` - packages that can be added

use super::{
    AppError, AppState,
    extract::{JsonBody, PathParam, QueryParams},
};
use crate::{
    core::{
        availability::has_conflict,
        booking::{BookingRequest, prepare_booking},
        package::list_packages_for_venue,
        pricing::{Breakdown, ChargeAmounts, PackageSnapshot},
        schedule::TimeWindow,
        venue::require_active_venue,
    },
    errors::Error,
};
use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Configuration to price.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Event date
    pub event_date: NaiveDate,
    /// Start time, `HH:mm`
    pub start_time: String,
    /// End time, `HH:mm`
    pub end_time: String,
    /// Set for overnight windows
    #[serde(default)]
    pub spans_midnight: bool,
    /// Number of guests
    pub guest_count: i64,
    /// Selected package IDs
    #[serde(default)]
    pub package_ids: Vec<i64>,
}

/// A live estimate.
///
/// `bookable` is false when the venue has no pricing rule for the date's day of
/// week; no figures are returned in that case.
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// Whether the configuration can be booked at all
    pub bookable: bool,
    /// Why not, when not bookable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Figures rounded for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amounts: Option<ChargeAmounts>,
    /// Duration and applied minimum spend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,
}

/// Prices a configuration without persisting anything.
pub async fn quote(
    State(state): State<AppState>,
    PathParam(venue_id): PathParam<i64>,
    JsonBody(request): JsonBody<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let request = BookingRequest {
        venue_id,
        event_date: request.event_date,
        start_time: request.start_time,
        end_time: request.end_time,
        spans_midnight: request.spans_midnight,
        guest_count: request.guest_count,
        package_ids: request.package_ids,
        expected_total: None,
    };

    match prepare_booking(&state.db, &request).await {
        Ok(prepared) => Ok(Json(QuoteResponse {
            bookable: true,
            reason: None,
            amounts: Some(prepared.calculation.charge_amounts()),
            breakdown: Some(prepared.calculation.breakdown),
        })),
        Err(err @ Error::NoPricingRule { .. }) => Ok(Json(QuoteResponse {
            bookable: false,
            reason: Some(err.to_string()),
            amounts: None,
            breakdown: None,
        })),
        Err(err) => Err(err.into()),
    }
}

/// Query for an availability check.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Event date
    pub date: NaiveDate,
    /// Start time, `HH:mm`
    pub start_time: String,
    /// End time, `HH:mm`
    pub end_time: String,
    /// Set for overnight windows
    #[serde(default)]
    pub spans_midnight: bool,
}

/// Availability of one window.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// True when no live booking overlaps the window
    pub available: bool,
}

/// Checks whether a window is free on the venue's calendar.
pub async fn availability(
    State(state): State<AppState>,
    PathParam(venue_id): PathParam<i64>,
    QueryParams(query): QueryParams<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let window = TimeWindow::parse(&query.start_time, &query.end_time, query.spans_midnight)?;
    require_active_venue(&state.db, venue_id).await?;
    let conflict = has_conflict(&state.db, venue_id, query.date, &window).await?;
    Ok(Json(AvailabilityResponse {
        available: !conflict,
    }))
}

/// Lists the active packages a guest can add on this venue.
pub async fn packages(
    State(state): State<AppState>,
    PathParam(venue_id): PathParam<i64>,
) -> Result<Json<Vec<PackageSnapshot>>, AppError> {
    require_active_venue(&state.db, venue_id).await?;
    let packages = list_packages_for_venue(&state.db, venue_id)
        .await?
        .iter()
        .map(PackageSnapshot::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(packages))
}
