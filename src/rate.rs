//! The data model for utility rate plans.
//!
//! [`RawRateRecord`] mirrors the subset of the URDB record schema the calculator reads. It is
//! loosely typed: every field is optional and unknown fields are ignored, as the upstream
//! database gives no guarantees about which charge components a rate carries.
//!
//! [`NormalizedRate`] is the computable form produced by the normalizer. Each charge category
//! field is a [`RateField`]: absent, unsupported, or a concrete value. The serialized field
//! names of [`NormalizedRate`] are a compatibility contract with cached rate files and must not
//! change.
use crate::usage::HourlyGrid;
use serde::{Deserialize, Serialize};

/// A charge category field of a [`NormalizedRate`].
///
/// `Absent` means the charge category does not apply to the rate at all and contributes zero
/// cost. `Unsupported` means the category is present in the source record but cannot be
/// represented by the calculation engine; a single unsupported category makes the whole rate
/// unsupported so that no real cost component is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateField<T> {
    /// The charge category does not apply to this rate
    Absent,
    /// The charge category is present but not representable by the engine
    Unsupported,
    /// The computable form of the charge category
    Value(T),
}

impl<T> RateField<T> {
    /// Whether this field is the `Unsupported` sentinel
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// The concrete value, if there is one
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for RateField<T> {
    /// Fold a failed mapping (`None`) into the `Unsupported` sentinel
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Unsupported,
        }
    }
}

/// The MongoDB-style identifier wrapper used by URDB record exports
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectId {
    /// The rate's unique identifier
    #[serde(rename = "$oid")]
    pub oid: String,
}

/// One tier of a rate structure period
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateTier {
    /// Per-unit rate ($/kWh or $/kW)
    pub rate: Option<f64>,
    /// Adjustment added to the rate when present
    pub adj: Option<f64>,
    /// Upper bound of the tier; the final tier of a period has none
    pub max: Option<f64>,
}

/// One period of a rate structure: an ordered list of tiers.
///
/// The tier list key differs by charge category in the source schema, hence the aliases.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatePeriod {
    /// The ordered tiers of this period
    #[serde(
        alias = "energyRateTiers",
        alias = "demandRateTiers",
        alias = "flatDemandTiers",
        default
    )]
    pub tiers: Vec<RateTier>,
}

/// A raw rate record as decoded from the URDB rate database.
///
/// Only the keys the calculator consumes are modelled; everything else in the record is
/// ignored. Missing keys are tolerated throughout (they indicate the absence of a charge
/// component, not an error).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRateRecord {
    /// Unique identifier for the rate
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Energy rate structure (periods of tiers)
    #[serde(rename = "energyRateStrux")]
    pub energy_structure: Option<Vec<RatePeriod>>,
    /// Energy period index by (month, hour) on weekdays
    #[serde(rename = "energyWeekdaySched")]
    pub energy_weekday_schedule: Option<Vec<Vec<usize>>>,
    /// Energy period index by (month, hour) on weekends
    #[serde(rename = "energyWeekendSched")]
    pub energy_weekend_schedule: Option<Vec<Vec<usize>>>,

    /// TOU demand rate structure
    #[serde(rename = "demandRateStrux")]
    pub demand_structure: Option<Vec<RatePeriod>>,
    /// Demand period index by (month, hour) on weekdays
    #[serde(rename = "demandWeekdaySched")]
    pub demand_weekday_schedule: Option<Vec<Vec<usize>>>,
    /// Demand period index by (month, hour) on weekends
    #[serde(rename = "demandWeekendSched")]
    pub demand_weekend_schedule: Option<Vec<Vec<usize>>>,

    /// Flat demand rate structure
    #[serde(rename = "flatDemandStrux")]
    pub flat_demand_structure: Option<Vec<RatePeriod>>,
    /// Flat demand period index for each month
    #[serde(rename = "flatDemandMonths")]
    pub flat_demand_months: Option<Vec<usize>>,

    /// When the rate stops being offered (Unix timestamp)
    pub enddate: Option<i64>,

    /// Rate name
    #[serde(rename = "rateName")]
    pub rate_name: Option<String>,
    /// Utility offering the rate
    #[serde(rename = "utilityName")]
    pub utility_name: Option<String>,
    /// EIA identifier of the utility
    #[serde(rename = "eiaId")]
    pub eia_id: Option<u64>,
    /// Customer class the rate applies to
    pub sector: Option<String>,
    /// Fixed monthly charge for the first meter ($)
    #[serde(rename = "fixedChargeFirstMeter")]
    pub fixed_charge_first_meter: Option<f64>,
    /// Where the rate description was sourced from
    #[serde(rename = "sourceReference")]
    pub source_reference: Option<String>,
    /// Free-text description of the rate
    pub description: Option<String>,
    /// Maximum demand (kW) for rate eligibility
    #[serde(rename = "demandMax")]
    pub demand_max: Option<f64>,
    /// Minimum demand (kW) for rate eligibility
    #[serde(rename = "demandMin")]
    pub demand_min: Option<f64>,
}

/// Descriptive rate details carried through normalization unchanged, for reporting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateMetadata {
    /// Rate name
    #[serde(rename = "rateName")]
    pub rate_name: Option<String>,
    /// Utility offering the rate
    #[serde(rename = "utilityName")]
    pub utility_name: Option<String>,
    /// EIA identifier of the utility
    #[serde(rename = "eiaId")]
    pub eia_id: Option<u64>,
    /// Customer class the rate applies to
    pub sector: Option<String>,
    /// Fixed monthly charge for the first meter ($)
    #[serde(rename = "fixedChargeFirstMeter")]
    pub fixed_charge_first_meter: Option<f64>,
    /// Where the rate description was sourced from
    #[serde(rename = "sourceReference")]
    pub source_reference: Option<String>,
    /// Free-text description of the rate
    pub description: Option<String>,
    /// Maximum demand (kW) for rate eligibility
    #[serde(rename = "demandMax")]
    pub demand_max: Option<f64>,
    /// Minimum demand (kW) for rate eligibility
    #[serde(rename = "demandMin")]
    pub demand_min: Option<f64>,
}

/// The flat demand rate shape: one rate per month, or a tier schedule per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatDemandRates {
    /// A single $/kW rate for each month
    Flat([f64; 12]),
    /// Per-tier $/kW rates for each month, paired with the bounds in `demandFlatMax`
    Tiered(Vec<Vec<f64>>),
}

/// A rate plan in the small closed set of shapes the billing engine can compute.
///
/// For the energy category at most one of the tiered and TOU representations is concrete; the
/// other is [`RateField::Absent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRate {
    /// Unique identifier for the rate
    pub id: String,
    /// Descriptive details carried through for reporting
    #[serde(flatten)]
    pub metadata: RateMetadata,

    /// Monthly energy tier upper bounds (kWh)
    #[serde(rename = "nrgTierMax")]
    pub energy_tier_bounds: RateField<Vec<Vec<f64>>>,
    /// Monthly energy tier rates ($/kWh)
    #[serde(rename = "nrgTierRates")]
    pub energy_tier_rates: RateField<Vec<Vec<f64>>>,
    /// Weekday energy rate ($/kWh) by (month, hour)
    #[serde(rename = "nrgTOUWkdRates")]
    pub energy_tou_weekday_rates: RateField<HourlyGrid>,
    /// Weekend energy rate ($/kWh) by (month, hour)
    #[serde(rename = "nrgTOUWkeRates")]
    pub energy_tou_weekend_rates: RateField<HourlyGrid>,

    /// Weekday demand rate ($/kW) by (month, hour)
    #[serde(rename = "demandTOUwkdRates")]
    pub demand_tou_weekday_rates: RateField<HourlyGrid>,
    /// Weekend demand rate ($/kW) by (month, hour)
    #[serde(rename = "demandTOUwkeRates")]
    pub demand_tou_weekend_rates: RateField<HourlyGrid>,

    /// Monthly flat demand rates ($/kW)
    #[serde(rename = "demandFlatRates")]
    pub demand_flat_rates: RateField<FlatDemandRates>,
    /// Monthly flat demand tier upper bounds (kW), present only for tiered flat demand
    #[serde(rename = "demandFlatMax")]
    pub demand_flat_bounds: RateField<Vec<Vec<f64>>>,
}

/// Whether every tier boundary list is non-decreasing
fn bounds_in_sequence(bounds: &[Vec<f64>]) -> bool {
    bounds
        .iter()
        .all(|month| month.windows(2).all(|pair| pair[0] <= pair[1]))
}

impl NormalizedRate {
    /// Whether any charge category of this rate is the `Unsupported` sentinel
    pub fn has_unsupported(&self) -> bool {
        self.energy_tier_bounds.is_unsupported()
            || self.energy_tier_rates.is_unsupported()
            || self.energy_tou_weekday_rates.is_unsupported()
            || self.energy_tou_weekend_rates.is_unsupported()
            || self.demand_tou_weekday_rates.is_unsupported()
            || self.demand_tou_weekend_rates.is_unsupported()
            || self.demand_flat_rates.is_unsupported()
            || self.demand_flat_bounds.is_unsupported()
    }

    /// Whether the rate's tier schedules are internally consistent.
    ///
    /// Some rates in the database carry tier boundaries out of sequence. The tier allocator
    /// would undercount or produce negative bands for such schedules, so they must be treated
    /// as unsupported rather than computed. This check fails closed.
    pub fn is_valid(&self) -> bool {
        if let Some(bounds) = self.energy_tier_bounds.as_value()
            && !bounds_in_sequence(bounds)
        {
            return false;
        }

        if let Some(bounds) = self.demand_flat_bounds.as_value()
            && !bounds_in_sequence(bounds)
        {
            return false;
        }

        true
    }
}
