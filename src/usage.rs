//! Code for working with the user's hourly usage profile.
//!
//! The profile holds average energy and peak power for every (month, hour-of-day) cell. From it
//! and a charge-days-per-week figure we derive the per-month quantities the billing engine
//! consumes: calendar-weighted day counts, total monthly energy and the peak/minimum power.
use crate::input::input_err_msg;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// The number of months in a billing year
pub const MONTHS: usize = 12;

/// The number of hours in a day
pub const HOURS: usize = 24;

/// Days in each calendar month (non-leap year, as the rate database assumes)
pub const DAYS_IN_MONTH: [f64; MONTHS] = [
    31.0, 28.0, 31.0, 30.0, 31.0, 30.0, 31.0, 31.0, 30.0, 31.0, 30.0, 31.0,
];

/// A value for each month of the year
pub type MonthlyValues = [f64; MONTHS];

/// A value for each (month, hour-of-day) combination
pub type HourlyGrid = [[f64; HOURS]; MONTHS];

/// A [`MonthlyValues`] of all zeroes
pub const ZERO_CHARGES: MonthlyValues = [0.0; MONTHS];

/// A single cell of the usage profile, as read from the usage CSV file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UsageProfileRow {
    /// Month number (1 = January)
    pub month: u32,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Average energy drawn during this hour (kWh)
    pub energy_kwh: f64,
    /// Peak power drawn during this hour (kW)
    pub power_kw: f64,
}

/// The user's hourly usage profile
#[derive(Debug, Clone, PartialEq)]
pub struct UsageProfile {
    /// Average energy (kWh) for each month and hour of day
    pub energy: HourlyGrid,
    /// Peak power (kW) for each month and hour of day
    pub power: HourlyGrid,
}

impl UsageProfile {
    /// Assemble a usage profile from CSV rows.
    ///
    /// Every (month, hour) cell must appear exactly once and all values must be finite and
    /// non-negative. Anything else is a caller error: the core calculation is never invoked with
    /// a partial profile.
    pub fn from_rows<I>(iter: I) -> Result<Self>
    where
        I: Iterator<Item = UsageProfileRow>,
    {
        let mut energy = [[0.0; HOURS]; MONTHS];
        let mut power = [[0.0; HOURS]; MONTHS];
        let mut seen = [[false; HOURS]; MONTHS];

        for row in iter {
            ensure!(
                (1..=MONTHS as u32).contains(&row.month),
                "Month {} is out of range (must be 1-12)",
                row.month
            );
            ensure!(
                row.hour < HOURS as u32,
                "Hour {} is out of range (must be 0-23)",
                row.hour
            );
            ensure!(
                row.energy_kwh.is_finite() && row.energy_kwh >= 0.0,
                "Energy value for month {}, hour {} must be finite and non-negative",
                row.month,
                row.hour
            );
            ensure!(
                row.power_kw.is_finite() && row.power_kw >= 0.0,
                "Power value for month {}, hour {} must be finite and non-negative",
                row.month,
                row.hour
            );

            let (month, hour) = (row.month as usize - 1, row.hour as usize);
            ensure!(
                !seen[month][hour],
                "Duplicate entry for month {}, hour {}",
                row.month,
                row.hour
            );
            seen[month][hour] = true;
            energy[month][hour] = row.energy_kwh;
            power[month][hour] = row.power_kw;
        }

        ensure!(
            seen.iter().flatten().all(|&cell| cell),
            "Usage profile is incomplete: every month/hour combination must have an entry"
        );

        Ok(Self { energy, power })
    }
}

/// Read the usage profile from the specified CSV file
pub fn read_usage_profile(file_path: &Path) -> Result<UsageProfile> {
    let rows = crate::input::read_csv::<UsageProfileRow>(file_path)?;
    UsageProfile::from_rows(rows).with_context(|| input_err_msg(file_path))
}

/// The number of charged weekdays and weekend days in each month
#[derive(Debug, Clone, PartialEq)]
pub struct DayCounts {
    /// Charged weekday count per month
    pub weekday: MonthlyValues,
    /// Charged weekend day count per month
    pub weekend: MonthlyValues,
}

impl DayCounts {
    /// Total days charged in each month
    pub fn total(&self) -> MonthlyValues {
        let mut total = [0.0; MONTHS];
        for month in 0..MONTHS {
            total[month] = self.weekday[month] + self.weekend[month];
        }
        total
    }
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derive per-month weekday and weekend day counts from a charge-days-per-week figure.
///
/// Up to five charge days per week fall on weekdays; the sixth and seventh are weekend days.
/// Each month contributes its calendar days scaled by the charged fraction of the week, rounded
/// to two decimal places.
///
/// # Arguments
///
/// * `charge_days` - Number of days per week on which charging occurs (1-7)
pub fn derive_day_counts(charge_days: u32) -> Result<DayCounts> {
    ensure!(
        (1..=7).contains(&charge_days),
        "Charge days per week must be between 1 and 7 (got {charge_days})"
    );

    let weekdays = charge_days.min(5) as f64;
    let weekends = charge_days.saturating_sub(5) as f64;

    let mut counts = DayCounts {
        weekday: [0.0; MONTHS],
        weekend: [0.0; MONTHS],
    };
    for (month, &days) in DAYS_IN_MONTH.iter().enumerate() {
        counts.weekday[month] = round2(days * weekdays / 7.0);
        counts.weekend[month] = round2(days * weekends / 7.0);
    }

    Ok(counts)
}

/// Total energy use (kWh) in each month: the hourly profile summed over the day, scaled by the
/// number of days charged in the month.
pub fn total_monthly_energy(profile: &UsageProfile, day_counts: &DayCounts) -> MonthlyValues {
    let days = day_counts.total();
    let mut total = [0.0; MONTHS];
    for month in 0..MONTHS {
        total[month] = profile.energy[month].iter().sum::<f64>() * days[month];
    }
    total
}

/// The peak hourly power across the whole profile, replicated for each month.
///
/// The calculator uses a single peak figure for the whole year rather than per-month peaks.
pub fn monthly_max_power(profile: &UsageProfile) -> MonthlyValues {
    let max = profile
        .power
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    [max; MONTHS]
}

/// The minimum hourly power across the whole profile, replicated for each month
pub fn monthly_min_power(profile: &UsageProfile) -> MonthlyValues {
    let min = profile
        .power
        .iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    [min; MONTHS]
}

/// Per-month quantities derived once from the usage profile and shared by all rate calculations
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedUsageStats {
    /// Weekday/weekend day counts per month
    pub day_counts: DayCounts,
    /// Total energy use (kWh) per month
    pub total_energy: MonthlyValues,
    /// Peak power (kW) per month
    pub max_power: MonthlyValues,
    /// Minimum power (kW) per month
    pub min_power: MonthlyValues,
}

impl DerivedUsageStats {
    /// Derive usage statistics for the given profile and charge-days-per-week figure
    pub fn derive(profile: &UsageProfile, charge_days: u32) -> Result<Self> {
        let day_counts = derive_day_counts(charge_days)?;
        let total_energy = total_monthly_energy(profile, &day_counts);

        Ok(Self {
            day_counts,
            total_energy,
            max_power: monthly_max_power(profile),
            min_power: monthly_min_power(profile),
        })
    }
}
