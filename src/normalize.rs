//! The rate normalizer: translating loosely-typed rate records into computable shapes.
//!
//! Each of the three charge categories (energy, TOU demand, flat demand) is classified
//! independently by pattern matching on which parts of the record are present: a tier structure,
//! a tier upper-bound array and an applicable schedule. Combinations the billing engine cannot
//! represent resolve to [`RateField::Unsupported`] rather than an error, so one unrepresentable
//! rate never aborts processing of the rest of the set.
use crate::rate::{
    FlatDemandRates, NormalizedRate, RateField, RateMetadata, RatePeriod, RawRateRecord,
};
use crate::usage::{HOURS, HourlyGrid, MONTHS};

/// Normalize one raw rate record into the closed set of computable shapes.
///
/// This function never fails: every data-shape problem in the record resolves to the
/// `Unsupported` sentinel on the affected charge category.
pub fn normalize(record: &RawRateRecord) -> NormalizedRate {
    let energy = classify_energy(record);
    let (demand_tou_weekday_rates, demand_tou_weekend_rates) = classify_tou_demand(record);
    let (demand_flat_rates, demand_flat_bounds) = classify_flat_demand(record);

    NormalizedRate {
        id: record.id.oid.clone(),
        metadata: RateMetadata {
            rate_name: record.rate_name.clone(),
            utility_name: record.utility_name.clone(),
            eia_id: record.eia_id,
            sector: record.sector.clone(),
            fixed_charge_first_meter: record.fixed_charge_first_meter,
            source_reference: record.source_reference.clone(),
            description: record.description.clone(),
            demand_max: record.demand_max,
            demand_min: record.demand_min,
        },
        energy_tier_bounds: energy.tier_bounds,
        energy_tier_rates: energy.tier_rates,
        energy_tou_weekday_rates: energy.tou_weekday_rates,
        energy_tou_weekend_rates: energy.tou_weekend_rates,
        demand_tou_weekday_rates,
        demand_tou_weekend_rates,
        demand_flat_rates,
        demand_flat_bounds,
    }
}

/// Per-tier rates for each period of a structure, with the adjustment folded in.
///
/// Returns `None` if any tier lacks a base rate, which marks the whole category unsupported.
fn period_rates(periods: &[RatePeriod]) -> Option<Vec<Vec<f64>>> {
    periods
        .iter()
        .map(|period| {
            period
                .tiers
                .iter()
                .map(|tier| Some(tier.rate? + tier.adj.unwrap_or(0.0)))
                .collect()
        })
        .collect()
}

/// Per-tier upper bounds for each period of a tiered structure.
///
/// A structure counts as tiered when the first tier of the first period carries an upper bound;
/// in that case every tier except the last of each period must carry one. Untiered structures
/// (and malformed ones with bounds missing mid-schedule) yield `None`.
fn period_bounds(periods: &[RatePeriod]) -> Option<Vec<Vec<f64>>> {
    periods.first()?.tiers.first()?.max?;

    periods
        .iter()
        .map(|period| {
            let closed_tiers = period.tiers.len().saturating_sub(1);
            period.tiers[..closed_tiers]
                .iter()
                .map(|tier| tier.max)
                .collect()
        })
        .collect()
}

/// Flatten an untiered structure to one rate per period.
///
/// Periods with anything other than exactly one tier cannot be addressed by a TOU schedule.
fn single_rate_per_period(rates: &[Vec<f64>]) -> Option<Vec<f64>> {
    rates
        .iter()
        .map(|tier_rates| match tier_rates.as_slice() {
            &[rate] => Some(rate),
            _ => None,
        })
        .collect()
}

/// Map a 12x24 grid of period indices to the corresponding per-period rates.
///
/// Wrong grid dimensions or a period index with no matching rate yield `None` (the
/// schedule-invalid case, folded into `Unsupported` by the caller).
fn map_hourly_schedule(schedule: &[Vec<usize>], rates: &[f64]) -> Option<HourlyGrid> {
    if schedule.len() != MONTHS || schedule.iter().any(|hours| hours.len() != HOURS) {
        return None;
    }

    let mut grid = [[0.0; HOURS]; MONTHS];
    for (month, hours) in schedule.iter().enumerate() {
        for (hour, &index) in hours.iter().enumerate() {
            grid[month][hour] = *rates.get(index)?;
        }
    }
    Some(grid)
}

/// Collapse a 12x24 schedule to one period per month.
///
/// Tiered rates cannot vary by time of day, so every hour of a month must reference the same
/// period; a month mixing periods yields `None`.
fn collapse_monthly_schedule(schedule: &[Vec<usize>]) -> Option<Vec<usize>> {
    if schedule.len() != MONTHS {
        return None;
    }

    schedule
        .iter()
        .map(|hours| {
            let (&first, rest) = hours.split_first()?;
            rest.iter().all(|&index| index == first).then_some(first)
        })
        .collect()
}

/// Map a 12-entry month schedule of period indices to the corresponding per-period values.
///
/// A period index with no matching value yields `None`.
fn map_month_schedule<T: Clone>(schedule: &[usize], values: &[T]) -> Option<Vec<T>> {
    if schedule.len() != MONTHS {
        return None;
    }

    schedule
        .iter()
        .map(|&index| values.get(index).cloned())
        .collect()
}

/// The four energy fields of a [`NormalizedRate`]
struct EnergyFields {
    tier_bounds: RateField<Vec<Vec<f64>>>,
    tier_rates: RateField<Vec<Vec<f64>>>,
    tou_weekday_rates: RateField<HourlyGrid>,
    tou_weekend_rates: RateField<HourlyGrid>,
}

impl EnergyFields {
    fn absent() -> Self {
        Self {
            tier_bounds: RateField::Absent,
            tier_rates: RateField::Absent,
            tou_weekday_rates: RateField::Absent,
            tou_weekend_rates: RateField::Absent,
        }
    }

    fn unsupported() -> Self {
        Self {
            tier_bounds: RateField::Unsupported,
            tier_rates: RateField::Unsupported,
            tou_weekday_rates: RateField::Unsupported,
            tou_weekend_rates: RateField::Unsupported,
        }
    }
}

/// Classify the energy category of a record.
///
/// An energy rate with tier bounds is tiered (one period per month); without bounds it is TOU
/// (rates addressed by the hourly schedules). Tiered-and-TOU combinations, bounds without
/// rates, missing schedules and invalid schedule indices are all unsupported.
fn classify_energy(record: &RawRateRecord) -> EnergyFields {
    let structure = record.energy_structure.as_deref();
    let rates = structure.and_then(period_rates);
    let bounds = structure.and_then(period_bounds);

    match (bounds, rates) {
        (None, None) => EnergyFields::absent(),
        (None, Some(rates)) => {
            let mapped = (|| {
                let per_period = single_rate_per_period(&rates)?;
                let weekday =
                    map_hourly_schedule(record.energy_weekday_schedule.as_ref()?, &per_period)?;
                let weekend =
                    map_hourly_schedule(record.energy_weekend_schedule.as_ref()?, &per_period)?;
                Some((weekday, weekend))
            })();
            match mapped {
                Some((weekday, weekend)) => EnergyFields {
                    tier_bounds: RateField::Absent,
                    tier_rates: RateField::Absent,
                    tou_weekday_rates: RateField::Value(weekday),
                    tou_weekend_rates: RateField::Value(weekend),
                },
                None => EnergyFields::unsupported(),
            }
        }
        (Some(bounds), Some(rates)) => {
            let mapped = (|| {
                let months =
                    collapse_monthly_schedule(record.energy_weekday_schedule.as_ref()?)?;
                let bounds = map_month_schedule(&months, &bounds)?;
                let rates = map_month_schedule(&months, &rates)?;
                Some((bounds, rates))
            })();
            match mapped {
                Some((bounds, rates)) => EnergyFields {
                    tier_bounds: RateField::Value(bounds),
                    tier_rates: RateField::Value(rates),
                    tou_weekday_rates: RateField::Absent,
                    tou_weekend_rates: RateField::Absent,
                },
                None => EnergyFields::unsupported(),
            }
        }
        (Some(_), None) => EnergyFields::unsupported(),
    }
}

/// Classify the TOU demand category of a record.
///
/// Only untiered TOU demand is representable; any tier bound forces `Unsupported`.
fn classify_tou_demand(record: &RawRateRecord) -> (RateField<HourlyGrid>, RateField<HourlyGrid>) {
    let structure = record.demand_structure.as_deref();
    let rates = structure.and_then(period_rates);
    let bounds = structure.and_then(period_bounds);

    match (bounds, rates) {
        (None, None) => (RateField::Absent, RateField::Absent),
        (None, Some(rates)) => {
            let mapped = (|| {
                let per_period = single_rate_per_period(&rates)?;
                let weekday =
                    map_hourly_schedule(record.demand_weekday_schedule.as_ref()?, &per_period)?;
                let weekend =
                    map_hourly_schedule(record.demand_weekend_schedule.as_ref()?, &per_period)?;
                Some((weekday, weekend))
            })();
            match mapped {
                Some((weekday, weekend)) => {
                    (RateField::Value(weekday), RateField::Value(weekend))
                }
                None => (RateField::Unsupported, RateField::Unsupported),
            }
        }
        (Some(_), _) => (RateField::Unsupported, RateField::Unsupported),
    }
}

/// Classify the flat demand category of a record.
///
/// Flat demand is driven by the month-to-period schedule. With rates alone it yields one $/kW
/// value per month; with a tier bound array it yields a per-month tier schedule. Rate data
/// without the monthly schedule, or bounds without rates, are unsupported.
fn classify_flat_demand(
    record: &RawRateRecord,
) -> (RateField<FlatDemandRates>, RateField<Vec<Vec<f64>>>) {
    let structure = record.flat_demand_structure.as_deref();
    let rates = structure.and_then(period_rates);
    let bounds = structure.and_then(period_bounds);
    let months = record.flat_demand_months.as_deref();

    match (bounds, rates) {
        (None, None) => (RateField::Absent, RateField::Absent),
        (None, Some(rates)) => {
            let mapped = (|| {
                let monthly = map_month_schedule(months?, &rates)?;
                let mut flat = [0.0; MONTHS];
                for (month, tier_rates) in monthly.iter().enumerate() {
                    let &[rate] = tier_rates.as_slice() else {
                        return None;
                    };
                    flat[month] = rate;
                }
                Some(flat)
            })();
            match mapped {
                Some(flat) => (
                    RateField::Value(FlatDemandRates::Flat(flat)),
                    RateField::Absent,
                ),
                None => (RateField::Unsupported, RateField::Unsupported),
            }
        }
        (Some(bounds), Some(rates)) => {
            let mapped = (|| {
                let months = months?;
                let rates = map_month_schedule(months, &rates)?;
                let bounds = map_month_schedule(months, &bounds)?;
                Some((rates, bounds))
            })();
            match mapped {
                Some((rates, bounds)) => (
                    RateField::Value(FlatDemandRates::Tiered(rates)),
                    RateField::Value(bounds),
                ),
                None => (RateField::Unsupported, RateField::Unsupported),
            }
        }
        (Some(_), None) => (RateField::Unsupported, RateField::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{empty_raw_record, period, tier, uniform_schedule};
    use crate::rate::RateTier;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// A weekday/weekend TOU schedule pair alternating between two periods at hour 12
    fn two_period_schedule() -> Vec<Vec<usize>> {
        let mut schedule = uniform_schedule(0);
        for hours in &mut schedule {
            for cell in hours.iter_mut().skip(12) {
                *cell = 1;
            }
        }
        schedule
    }

    #[rstest]
    fn test_normalize_empty_record(empty_raw_record: RawRateRecord) {
        // A record with no charge data of any kind normalizes to all-absent
        let rate = normalize(&empty_raw_record);
        assert_eq!(rate.id, "rate1");
        assert_eq!(rate.metadata.rate_name.as_deref(), Some("Test Rate"));
        assert_eq!(rate.energy_tier_bounds, RateField::Absent);
        assert_eq!(rate.energy_tier_rates, RateField::Absent);
        assert_eq!(rate.energy_tou_weekday_rates, RateField::Absent);
        assert_eq!(rate.energy_tou_weekend_rates, RateField::Absent);
        assert_eq!(rate.demand_tou_weekday_rates, RateField::Absent);
        assert_eq!(rate.demand_tou_weekend_rates, RateField::Absent);
        assert_eq!(rate.demand_flat_rates, RateField::Absent);
        assert_eq!(rate.demand_flat_bounds, RateField::Absent);
    }

    #[rstest]
    fn test_normalize_tou_energy(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![
            period(vec![tier(0.08, None, None)]),
            period(vec![tier(0.20, None, None)]),
        ]);
        record.energy_weekday_schedule = Some(two_period_schedule());
        record.energy_weekend_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        let weekday = rate.energy_tou_weekday_rates.as_value().unwrap();
        let weekend = rate.energy_tou_weekend_rates.as_value().unwrap();
        assert_approx_eq!(f64, weekday[0][0], 0.08);
        assert_approx_eq!(f64, weekday[0][12], 0.20);
        assert_approx_eq!(f64, weekend[5][23], 0.08);
        assert_eq!(rate.energy_tier_rates, RateField::Absent);
    }

    #[rstest]
    fn test_normalize_tou_energy_with_adjustment(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![period(vec![tier(0.08, Some(0.02), None)])]);
        record.energy_weekday_schedule = Some(uniform_schedule(0));
        record.energy_weekend_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        let weekday = rate.energy_tou_weekday_rates.as_value().unwrap();
        assert_approx_eq!(f64, weekday[3][7], 0.10);
    }

    #[rstest]
    fn test_normalize_schedule_index_out_of_range(empty_raw_record: RawRateRecord) {
        // The schedule references period 1 but only one period exists
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![period(vec![tier(0.08, None, None)])]);
        record.energy_weekday_schedule = Some(two_period_schedule());
        record.energy_weekend_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        assert_eq!(rate.energy_tou_weekday_rates, RateField::Unsupported);
        assert_eq!(rate.energy_tier_rates, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_tou_energy_missing_schedule(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![period(vec![tier(0.08, None, None)])]);
        record.energy_weekday_schedule = Some(uniform_schedule(0));
        // No weekend schedule

        let rate = normalize(&record);
        assert_eq!(rate.energy_tou_weekday_rates, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_tiered_energy(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![
            period(vec![
                tier(0.10, None, Some(500.0)),
                tier(0.15, None, Some(1000.0)),
                tier(0.20, None, None),
            ]),
            period(vec![tier(0.12, None, Some(800.0)), tier(0.18, None, None)]),
        ]);
        // Summer months use the second period
        let mut schedule = uniform_schedule(0);
        for hours in &mut schedule[5..9] {
            *hours = vec![1; HOURS];
        }
        record.energy_weekday_schedule = Some(schedule);

        let rate = normalize(&record);
        let bounds = rate.energy_tier_bounds.as_value().unwrap();
        let rates = rate.energy_tier_rates.as_value().unwrap();
        assert_eq!(bounds[0], vec![500.0, 1000.0]);
        assert_eq!(rates[0], vec![0.10, 0.15, 0.20]);
        assert_eq!(bounds[6], vec![800.0]);
        assert_eq!(rates[6], vec![0.12, 0.18]);
        assert_eq!(rate.energy_tou_weekday_rates, RateField::Absent);
    }

    #[rstest]
    fn test_normalize_tiered_energy_with_tou_periods(empty_raw_record: RawRateRecord) {
        // A month mixing periods makes a tiered rate unrepresentable
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![
            period(vec![tier(0.10, None, Some(500.0)), tier(0.15, None, None)]),
            period(vec![tier(0.12, None, Some(800.0)), tier(0.18, None, None)]),
        ]);
        record.energy_weekday_schedule = Some(two_period_schedule());

        let rate = normalize(&record);
        assert_eq!(rate.energy_tier_bounds, RateField::Unsupported);
        assert_eq!(rate.energy_tou_weekday_rates, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_bounds_without_rates(empty_raw_record: RawRateRecord) {
        // Tier bounds with no rate data anywhere
        let mut record = empty_raw_record;
        record.energy_structure = Some(vec![period(vec![
            RateTier {
                rate: None,
                adj: None,
                max: Some(500.0),
            },
            RateTier {
                rate: None,
                adj: None,
                max: None,
            },
        ])]);
        record.energy_weekday_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        assert_eq!(rate.energy_tier_bounds, RateField::Unsupported);
        assert_eq!(rate.energy_tier_rates, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_tou_demand(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.demand_structure = Some(vec![
            period(vec![tier(5.0, None, None)]),
            period(vec![tier(12.0, None, None)]),
        ]);
        record.demand_weekday_schedule = Some(two_period_schedule());
        record.demand_weekend_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        let weekday = rate.demand_tou_weekday_rates.as_value().unwrap();
        assert_approx_eq!(f64, weekday[0][0], 5.0);
        assert_approx_eq!(f64, weekday[0][12], 12.0);
    }

    #[rstest]
    fn test_normalize_tiered_tou_demand_unsupported(empty_raw_record: RawRateRecord) {
        // Demand tiers cannot be combined with a TOU schedule
        let mut record = empty_raw_record;
        record.demand_structure = Some(vec![period(vec![
            tier(5.0, None, Some(100.0)),
            tier(8.0, None, None),
        ])]);
        record.demand_weekday_schedule = Some(uniform_schedule(0));
        record.demand_weekend_schedule = Some(uniform_schedule(0));

        let rate = normalize(&record);
        assert_eq!(rate.demand_tou_weekday_rates, RateField::Unsupported);
        assert_eq!(rate.demand_tou_weekend_rates, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_flat_demand(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.flat_demand_structure = Some(vec![
            period(vec![tier(10.0, None, None)]),
            period(vec![tier(14.0, None, None)]),
        ]);
        // Second period for the summer months
        let mut months = vec![0; MONTHS];
        for index in months.iter_mut().take(9).skip(5) {
            *index = 1;
        }
        record.flat_demand_months = Some(months);

        let rate = normalize(&record);
        let Some(FlatDemandRates::Flat(rates)) = rate.demand_flat_rates.as_value() else {
            panic!("Expected flat demand rates");
        };
        assert_approx_eq!(f64, rates[0], 10.0);
        assert_approx_eq!(f64, rates[6], 14.0);
        assert_eq!(rate.demand_flat_bounds, RateField::Absent);
    }

    #[rstest]
    fn test_normalize_tiered_flat_demand(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.flat_demand_structure = Some(vec![period(vec![
            tier(10.0, None, Some(50.0)),
            tier(6.0, None, None),
        ])]);
        record.flat_demand_months = Some(vec![0; MONTHS]);

        let rate = normalize(&record);
        let Some(FlatDemandRates::Tiered(rates)) = rate.demand_flat_rates.as_value() else {
            panic!("Expected tiered flat demand rates");
        };
        assert_eq!(rates[0], vec![10.0, 6.0]);
        let bounds = rate.demand_flat_bounds.as_value().unwrap();
        assert_eq!(bounds[11], vec![50.0]);
    }

    #[rstest]
    fn test_normalize_flat_demand_missing_month_schedule(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.flat_demand_structure = Some(vec![period(vec![tier(10.0, None, None)])]);
        // No flat_demand_months

        let rate = normalize(&record);
        assert_eq!(rate.demand_flat_rates, RateField::Unsupported);
        assert_eq!(rate.demand_flat_bounds, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_flat_demand_bounds_without_rates(empty_raw_record: RawRateRecord) {
        // Bounds with no rate data must be rejected explicitly, not computed
        let mut record = empty_raw_record;
        record.flat_demand_structure = Some(vec![period(vec![
            RateTier {
                rate: None,
                adj: None,
                max: Some(50.0),
            },
            RateTier {
                rate: None,
                adj: None,
                max: None,
            },
        ])]);
        record.flat_demand_months = Some(vec![0; MONTHS]);

        let rate = normalize(&record);
        assert_eq!(rate.demand_flat_rates, RateField::Unsupported);
        assert_eq!(rate.demand_flat_bounds, RateField::Unsupported);
    }

    #[rstest]
    fn test_normalize_flat_demand_month_index_out_of_range(empty_raw_record: RawRateRecord) {
        let mut record = empty_raw_record;
        record.flat_demand_structure = Some(vec![period(vec![tier(10.0, None, None)])]);
        record.flat_demand_months = Some(vec![3; MONTHS]);

        let rate = normalize(&record);
        assert_eq!(rate.demand_flat_rates, RateField::Unsupported);
    }
}
