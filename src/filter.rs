//! Pre-calculation filtering of the rate set.
//!
//! The rate database carries many rates that are not useful candidates for an EV charging cost
//! comparison: expired rates, lighting tariffs and specialty rates identified by keyword. These
//! filters reduce the set before normalization and billing run; they do not affect how any
//! individual rate is computed.
use crate::rate::RawRateRecord;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use indexmap::IndexMap;
use log::info;

/// Name keywords marking specialty rates unlikely to apply to EV charging
const EXCLUDED_KEYWORDS: [&str; 7] = [
    "agriculture",
    "water heat",
    "space heat",
    "space cool",
    "unmetered",
    "irrigation",
    "pumping",
];

/// The lighting sector, excluded outright
const LIGHTING_SECTOR: &str = "Lighting";

/// The customer classes a calculation can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SectorFilter {
    /// Keep rates from every sector
    All,
    /// Keep residential rates only
    Residential,
    /// Keep commercial rates only
    Commercial,
    /// Keep industrial rates only
    Industrial,
}

impl SectorFilter {
    /// Whether a rate in the given sector passes this filter
    fn matches(self, sector: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Residential => sector == Some("Residential"),
            Self::Commercial => sector == Some("Commercial"),
            Self::Industrial => sector == Some("Industrial"),
        }
    }
}

/// Whether the rate is still offered as of `now`. Rates without an end date are kept.
fn is_current(record: &RawRateRecord, now: DateTime<Utc>) -> bool {
    match record.enddate {
        Some(enddate) => enddate >= now.timestamp(),
        None => true,
    }
}

/// Whether the rate's name contains one of the specialty keywords
fn has_excluded_keyword(record: &RawRateRecord) -> bool {
    let Some(name) = &record.rate_name else {
        return false;
    };
    let name = name.to_lowercase();
    EXCLUDED_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword))
}

/// Filter the rate set down to current, applicable candidates.
///
/// Removes expired rates, lighting rates and specialty rates matched by keyword, then restricts
/// to the requested sector. Order of the surviving rates is preserved.
pub fn filter_rates(
    rates: IndexMap<String, RawRateRecord>,
    sector: SectorFilter,
) -> IndexMap<String, RawRateRecord> {
    let now = Utc::now();
    let total = rates.len();

    let rates: IndexMap<_, _> = rates
        .into_iter()
        .filter(|(_, record)| is_current(record, now))
        .filter(|(_, record)| record.sector.as_deref() != Some(LIGHTING_SECTOR))
        .filter(|(_, record)| !has_excluded_keyword(record))
        .filter(|(_, record)| sector.matches(record.sector.as_deref()))
        .collect();

    info!("{} of {} rates passed filtering", rates.len(), total);
    rates
}
