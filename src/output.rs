//! The module responsible for writing calculation results to disk.
use crate::billing::BillingResult;
use crate::rate::NormalizedRate;
use crate::usage::{DerivedUsageStats, MONTHS};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which run-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "ratecalc_results";

/// The output file name for the per-month charge breakdown
const MONTHLY_CHARGES_FILE_NAME: &str = "monthly_charges.csv";

/// The output file name for the per-rate annual summary
const ANNUAL_SUMMARY_FILE_NAME: &str = "annual_summary.csv";

/// Month abbreviations in calendar order
const MONTH_NAMES: [&str; MONTHS] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Get the default output folder for the given rate database file
pub fn get_output_dir(rates_file: &Path) -> Result<PathBuf> {
    let run_name = rates_file
        .file_stem()
        .context("Rate database path has no file name")?
        .to_str()
        .context("Invalid chars in rate database file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, run_name].iter().collect())
}

/// Create the output directory, failing if it already exists unless `overwrite` is given.
///
/// Returns whether an existing directory was overwritten.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    let existed = output_dir.is_dir();
    if existed {
        ensure!(
            overwrite,
            "Output directory {} already exists (pass --overwrite to replace it)",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir)?;
    }

    fs::create_dir_all(output_dir)?;
    Ok(existed)
}

/// A row of the monthly charges CSV file.
///
/// Unsupported rates keep their row for every month with the supported flag unset and empty
/// charge fields.
#[derive(Serialize, Debug, PartialEq)]
struct MonthlyChargeRow<'a> {
    rate_id: &'a str,
    month: usize,
    month_name: &'static str,
    supported: bool,
    tiered_energy_charge: Option<f64>,
    tou_energy_charge: Option<f64>,
    flat_demand_charge: Option<f64>,
    tou_demand_charge: Option<f64>,
    total_charge: Option<f64>,
    cost_per_kwh: Option<f64>,
    total_energy_kwh: f64,
}

/// A row of the annual summary CSV file, one per rate, with the rate details included
#[derive(Serialize, Debug, PartialEq)]
struct AnnualSummaryRow<'a> {
    rate_id: &'a str,
    supported: bool,
    rate_name: Option<&'a str>,
    utility_name: Option<&'a str>,
    eia_id: Option<u64>,
    sector: Option<&'a str>,
    fixed_charge_first_meter: Option<f64>,
    source_reference: Option<&'a str>,
    demand_max: Option<f64>,
    demand_min: Option<f64>,
    tiered_energy_charge: Option<f64>,
    tou_energy_charge: Option<f64>,
    flat_demand_charge: Option<f64>,
    tou_demand_charge: Option<f64>,
    total_charge: Option<f64>,
    total_energy_kwh: f64,
    cost_per_kwh: Option<f64>,
}

/// Write the monthly charge breakdown for all rates
fn write_monthly_charges(
    file_path: &Path,
    results: &IndexMap<String, (NormalizedRate, BillingResult)>,
    stats: &DerivedUsageStats,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;

    for (rate_id, (_, result)) in results {
        let charges = result.as_charges();
        let total = charges.map(super::billing::ChargeBreakdown::total);

        for month in 0..MONTHS {
            let energy = stats.total_energy[month];
            let total_charge = total.as_ref().map(|total| total[month]);
            let cost_per_kwh =
                total_charge.map(|charge| if energy > 0.0 { charge / energy } else { 0.0 });

            writer.serialize(MonthlyChargeRow {
                rate_id,
                month: month + 1,
                month_name: MONTH_NAMES[month],
                supported: charges.is_some(),
                tiered_energy_charge: charges.map(|c| c.tiered_energy[month]),
                tou_energy_charge: charges.map(|c| c.tou_energy[month]),
                flat_demand_charge: charges.map(|c| c.flat_demand[month]),
                tou_demand_charge: charges.map(|c| c.tou_demand[month]),
                total_charge,
                cost_per_kwh,
                total_energy_kwh: energy,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write the annual summary for all rates
fn write_annual_summary(
    file_path: &Path,
    results: &IndexMap<String, (NormalizedRate, BillingResult)>,
    stats: &DerivedUsageStats,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    let annual_energy: f64 = stats.total_energy.iter().sum();

    for (rate_id, (rate, result)) in results {
        let charges = result.as_charges();
        let annual = |values: &[f64; MONTHS]| values.iter().sum::<f64>();

        let total_charge = charges.map(|charges| annual(&charges.total()));
        let cost_per_kwh = match total_charge {
            Some(total) if annual_energy > 0.0 => Some(total / annual_energy),
            _ => None,
        };

        writer.serialize(AnnualSummaryRow {
            rate_id,
            supported: charges.is_some(),
            rate_name: rate.metadata.rate_name.as_deref(),
            utility_name: rate.metadata.utility_name.as_deref(),
            eia_id: rate.metadata.eia_id,
            sector: rate.metadata.sector.as_deref(),
            fixed_charge_first_meter: rate.metadata.fixed_charge_first_meter,
            source_reference: rate.metadata.source_reference.as_deref(),
            demand_max: rate.metadata.demand_max,
            demand_min: rate.metadata.demand_min,
            tiered_energy_charge: charges.map(|c| annual(&c.tiered_energy)),
            tou_energy_charge: charges.map(|c| annual(&c.tou_energy)),
            flat_demand_charge: charges.map(|c| annual(&c.flat_demand)),
            tou_demand_charge: charges.map(|c| annual(&c.tou_demand)),
            total_charge,
            total_energy_kwh: annual_energy,
            cost_per_kwh,
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Write all result files to the output directory.
///
/// # Arguments
///
/// * `output_dir` - Folder where files will be saved
/// * `results` - Normalized rate and billing result for each rate id
/// * `stats` - The usage statistics shared by all calculations
pub fn write_results(
    output_dir: &Path,
    results: &IndexMap<String, (NormalizedRate, BillingResult)>,
    stats: &DerivedUsageStats,
) -> Result<()> {
    write_monthly_charges(
        &output_dir.join(MONTHLY_CHARGES_FILE_NAME),
        results,
        stats,
    )?;
    write_annual_summary(&output_dir.join(ANNUAL_SUMMARY_FILE_NAME), results, stats)?;
    Ok(())
}
