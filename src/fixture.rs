//! Fixtures for tests

use crate::rate::{
    FlatDemandRates, NormalizedRate, ObjectId, RateField, RateMetadata, RatePeriod, RateTier,
    RawRateRecord,
};
use crate::usage::{HOURS, MONTHS, UsageProfile, UsageProfileRow};
use rstest::fixture;

/// A tier entry with the given rate and optional adjustment and upper bound
pub fn tier(rate: f64, adj: Option<f64>, max: Option<f64>) -> RateTier {
    RateTier {
        rate: Some(rate),
        adj,
        max,
    }
}

/// A structure period holding the given tiers
pub fn period(tiers: Vec<RateTier>) -> RatePeriod {
    RatePeriod { tiers }
}

/// A 12x24 schedule referencing a single period in every cell
pub fn uniform_schedule(period: usize) -> Vec<Vec<usize>> {
    vec![vec![period; HOURS]; MONTHS]
}

/// A raw rate record with no charge data of any kind
#[fixture]
pub fn empty_raw_record() -> RawRateRecord {
    RawRateRecord {
        id: ObjectId {
            oid: "rate1".into(),
        },
        energy_structure: None,
        energy_weekday_schedule: None,
        energy_weekend_schedule: None,
        demand_structure: None,
        demand_weekday_schedule: None,
        demand_weekend_schedule: None,
        flat_demand_structure: None,
        flat_demand_months: None,
        enddate: None,
        rate_name: Some("Test Rate".into()),
        utility_name: Some("Test Utility".into()),
        eia_id: Some(12345),
        sector: Some("Commercial".into()),
        fixed_charge_first_meter: Some(10.0),
        source_reference: None,
        description: None,
        demand_max: None,
        demand_min: None,
    }
}

/// A normalized rate with every charge category absent
#[fixture]
pub fn empty_normalized_rate() -> NormalizedRate {
    NormalizedRate {
        id: "rate1".into(),
        metadata: RateMetadata::default(),
        energy_tier_bounds: RateField::Absent,
        energy_tier_rates: RateField::Absent,
        energy_tou_weekday_rates: RateField::Absent,
        energy_tou_weekend_rates: RateField::Absent,
        demand_tou_weekday_rates: RateField::Absent,
        demand_tou_weekend_rates: RateField::Absent,
        demand_flat_rates: RateField::Absent,
        demand_flat_bounds: RateField::Absent,
    }
}

/// A three-tier energy rate with bounds [500, 1000] kWh and rates [0.10, 0.15, 0.20] $/kWh,
/// identical for every month
#[fixture]
pub fn tiered_energy_rate(empty_normalized_rate: NormalizedRate) -> NormalizedRate {
    NormalizedRate {
        energy_tier_bounds: RateField::Value(vec![vec![500.0, 1000.0]; MONTHS]),
        energy_tier_rates: RateField::Value(vec![vec![0.10, 0.15, 0.20]; MONTHS]),
        ..empty_normalized_rate
    }
}

/// A flat-rate demand charge of 10 $/kW for every month
#[fixture]
pub fn flat_demand_rate(empty_normalized_rate: NormalizedRate) -> NormalizedRate {
    NormalizedRate {
        demand_flat_rates: RateField::Value(FlatDemandRates::Flat([10.0; MONTHS])),
        ..empty_normalized_rate
    }
}

/// A usage profile with uniform energy and power in every cell
pub fn uniform_usage_profile(energy_kwh: f64, power_kw: f64) -> UsageProfile {
    let rows = (1..=MONTHS as u32).flat_map(|month| {
        (0..HOURS as u32).map(move |hour| UsageProfileRow {
            month,
            hour,
            energy_kwh,
            power_kw,
        })
    });
    UsageProfile::from_rows(rows).unwrap()
}
