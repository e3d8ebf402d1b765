//! Monthly energy aggregation.

use std::collections::BTreeMap;

use crate::source::{Reading, TurbineId};

/// Number of 10-minute SCADA samples per hour. Fixed by the source cadence;
/// a different sampling interval requires a different divisor.
pub const SAMPLES_PER_HOUR: f64 = 6.0;

/// Cumulative energy per turbine for one month, in kWh.
pub type MonthlyEnergy = BTreeMap<TurbineId, f64>;

/// Reduce one month of raw readings to cumulative energy per turbine.
///
/// Sums each turbine's averaged kW samples and converts the total to kWh via
/// the fixed 10-minute cadence. Turbines without readings in the input are
/// absent from the result, not zero-valued. Pure function of its input.
pub fn summarize(readings: &[Reading]) -> MonthlyEnergy {
    let mut totals: MonthlyEnergy = BTreeMap::new();
    for reading in readings {
        *totals.entry(reading.turbine_id).or_insert(0.0) += reading.power_kw;
    }
    for energy in totals.values_mut() {
        *energy /= SAMPLES_PER_HOUR;
    }
    totals
}
