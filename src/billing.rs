//! The billing engine: monthly energy and demand charges for a normalized rate.
//!
//! Four charge components are computed independently and an absent component contributes a zero
//! vector. A rate with any unsupported component, or with an inconsistent tier schedule, yields
//! the `Unsupported` result as a whole: partially billing a rate would silently omit a real cost
//! component.
use crate::rate::{FlatDemandRates, NormalizedRate, RateField};
use crate::tier::allocate_tier;
use crate::usage::{DerivedUsageStats, HOURS, HourlyGrid, MONTHS, MonthlyValues, UsageProfile, ZERO_CHARGES};
use serde::{Deserialize, Serialize};

/// The four monthly charge components of a supported rate, in dollars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    /// Tiered energy charges per month
    #[serde(rename = "TieredEnergyCharge")]
    pub tiered_energy: MonthlyValues,
    /// Time-of-use energy charges per month
    #[serde(rename = "TOUEnergyCharge")]
    pub tou_energy: MonthlyValues,
    /// Flat demand charges per month
    #[serde(rename = "FlatDemandCharge")]
    pub flat_demand: MonthlyValues,
    /// Time-of-use demand charges per month
    #[serde(rename = "TOUDemandCharge")]
    pub tou_demand: MonthlyValues,
}

impl ChargeBreakdown {
    /// Total charge per month across all four components
    pub fn total(&self) -> MonthlyValues {
        let mut total = ZERO_CHARGES;
        for month in 0..MONTHS {
            total[month] = self.tiered_energy[month]
                + self.tou_energy[month]
                + self.flat_demand[month]
                + self.tou_demand[month];
        }
        total
    }
}

/// The outcome of billing one rate against one usage profile
#[derive(Debug, Clone, PartialEq)]
pub enum BillingResult {
    /// The rate's structure cannot be computed by this engine
    Unsupported,
    /// The monthly charge breakdown
    Charges(ChargeBreakdown),
}

impl BillingResult {
    /// The charge breakdown, if the rate was supported
    pub fn as_charges(&self) -> Option<&ChargeBreakdown> {
        match self {
            Self::Charges(charges) => Some(charges),
            Self::Unsupported => None,
        }
    }
}

/// Compute monthly charges for a normalized rate against preprocessed usage data.
///
/// Returns [`BillingResult::Unsupported`] when any charge category carries the unsupported
/// sentinel or the rate fails validation; otherwise each absent category contributes an all-zero
/// vector to the breakdown.
pub fn compute_charges(
    rate: &NormalizedRate,
    profile: &UsageProfile,
    stats: &DerivedUsageStats,
) -> BillingResult {
    if !rate.is_valid() || rate.has_unsupported() {
        return BillingResult::Unsupported;
    }

    BillingResult::Charges(ChargeBreakdown {
        tiered_energy: tiered_energy_charge(rate, stats),
        tou_energy: tou_energy_charge(rate, profile, stats),
        flat_demand: flat_demand_charge(rate, stats),
        tou_demand: tou_demand_charge(rate, profile),
    })
}

/// Monthly tiered energy charge: total monthly energy allocated across that month's tiers
fn tiered_energy_charge(rate: &NormalizedRate, stats: &DerivedUsageStats) -> MonthlyValues {
    let (Some(rates), Some(bounds)) = (
        rate.energy_tier_rates.as_value(),
        rate.energy_tier_bounds.as_value(),
    ) else {
        return ZERO_CHARGES;
    };

    let mut charges = ZERO_CHARGES;
    for month in 0..MONTHS {
        charges[month] = allocate_tier(stats.total_energy[month], &rates[month], &bounds[month]);
    }
    charges
}

/// Monthly TOU energy charge: the hourly usage grid priced by the weekday and weekend rate
/// grids, each weighted by its day count, summed per month
fn tou_energy_charge(
    rate: &NormalizedRate,
    profile: &UsageProfile,
    stats: &DerivedUsageStats,
) -> MonthlyValues {
    let (Some(weekday), Some(weekend)) = (
        rate.energy_tou_weekday_rates.as_value(),
        rate.energy_tou_weekend_rates.as_value(),
    ) else {
        return ZERO_CHARGES;
    };

    let day_cost = |rates: &HourlyGrid, month: usize| -> f64 {
        (0..HOURS)
            .map(|hour| profile.energy[month][hour] * rates[month][hour])
            .sum()
    };

    let mut charges = ZERO_CHARGES;
    for month in 0..MONTHS {
        charges[month] = day_cost(weekday, month) * stats.day_counts.weekday[month]
            + day_cost(weekend, month) * stats.day_counts.weekend[month];
    }
    charges
}

/// Monthly flat demand charge: peak power priced at the month's flat rate, or allocated across
/// the month's demand tiers
fn flat_demand_charge(rate: &NormalizedRate, stats: &DerivedUsageStats) -> MonthlyValues {
    let mut charges = ZERO_CHARGES;
    match rate.demand_flat_rates.as_value() {
        Some(FlatDemandRates::Flat(rates)) => {
            for month in 0..MONTHS {
                charges[month] = stats.max_power[month] * rates[month];
            }
        }
        Some(FlatDemandRates::Tiered(rates)) => {
            let Some(bounds) = rate.demand_flat_bounds.as_value() else {
                return ZERO_CHARGES;
            };
            for month in 0..MONTHS {
                charges[month] =
                    allocate_tier(stats.max_power[month], &rates[month], &bounds[month]);
            }
        }
        None => {}
    }
    charges
}

/// Monthly TOU demand charge.
///
/// For each month, the hours of the day are grouped by their (weekday) demand rate; each group
/// is billed at its rate on the peak power observed within the group, and the groups are summed.
fn tou_demand_charge(rate: &NormalizedRate, profile: &UsageProfile) -> MonthlyValues {
    let Some(weekday) = rate.demand_tou_weekday_rates.as_value() else {
        return ZERO_CHARGES;
    };

    let mut charges = ZERO_CHARGES;
    for month in 0..MONTHS {
        let mut seen: Vec<f64> = Vec::new();
        for &period_rate in &weekday[month] {
            if seen.contains(&period_rate) {
                continue;
            }
            seen.push(period_rate);

            let peak = (0..HOURS)
                .filter(|&other| weekday[month][other] == period_rate)
                .map(|other| profile.power[month][other])
                .fold(f64::NEG_INFINITY, f64::max);
            charges[month] += peak * period_rate;
        }
    }
    charges
}
