//! Humidity waste (merma) calculation

use rust_decimal::Decimal;

use crate::models::HumidityWaste;
use crate::rules::{GrainRules, WasteBand};
use crate::types::{percent_of, round2};

/// Waste percent for a humidity reading.
///
/// Step function over the table bands: the band with the highest threshold
/// not exceeding `actual_humidity` wins. Below every band the waste is zero.
pub fn waste_percent_for(table: &[WasteBand], actual_humidity: Decimal) -> Decimal {
    table
        .iter()
        .rev()
        .find(|band| band.humidity <= actual_humidity)
        .map_or(Decimal::ZERO, |band| band.waste_percent)
}

/// Physical weight loss for a lot given its humidity
pub fn humidity_waste(
    rules: &GrainRules,
    actual_humidity: Decimal,
    gross_quantity_kg: Decimal,
) -> HumidityWaste {
    if actual_humidity <= rules.base_humidity {
        return HumidityWaste {
            base_humidity: rules.base_humidity,
            actual_humidity,
            waste_percent: Decimal::ZERO,
            waste_kg: Decimal::ZERO,
            net_quantity_kg: gross_quantity_kg,
            requires_drying: false,
        };
    }

    let waste_percent = waste_percent_for(&rules.humidity_waste_table, actual_humidity);
    let waste_kg = round2(percent_of(gross_quantity_kg, waste_percent));

    HumidityWaste {
        base_humidity: rules.base_humidity,
        actual_humidity,
        waste_percent,
        waste_kg,
        net_quantity_kg: gross_quantity_kg - waste_kg,
        requires_drying: true,
    }
}
