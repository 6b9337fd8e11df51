//! The tier allocator: spreading a scalar quantity across an ordered tier schedule.
//!
//! Tiered charges are billed cumulatively from the lowest band up. The same allocation is used
//! for tiered energy charges (kWh against monthly energy) and tiered flat demand charges (kW
//! against monthly peak power).

/// Allocate `usage` across an ordered tier schedule and return the total charge.
///
/// `rates` holds the per-unit rate for each tier. `bounds` holds the upper bound of every tier
/// except the last, which is open-ended. Tier `i` covers `(bounds[i-1], bounds[i]]`, with an
/// implicit lower bound of zero for the first tier; usage exactly equal to a bound is billed
/// entirely within that tier.
///
/// This function never fails. Callers must check bound monotonicity beforehand (see
/// [`NormalizedRate::is_valid`](crate::rate::NormalizedRate::is_valid)); for malformed schedules
/// the partial sum accumulated so far is returned.
pub fn allocate_tier(usage: f64, rates: &[f64], bounds: &[f64]) -> f64 {
    let mut remaining = usage;
    let mut lower = 0.0;
    let mut charge = 0.0;

    for (i, &rate) in rates.iter().enumerate() {
        let upper = bounds.get(i).copied().unwrap_or(f64::INFINITY);

        // Usage tops out in this tier: bill the remainder at this rate and stop
        if usage > lower && usage <= upper {
            charge += remaining * rate;
            break;
        }

        // Usage extends past this tier: bill the full band and carry on
        if usage > upper {
            let band = upper - lower;
            charge += band * rate;
            remaining -= band;
        }

        lower = upper;
    }

    charge
}
