//! Factor calculator
//!
//! Converts a laboratory analysis into a commercial factor (0-100), a grade,
//! itemized bonuses/discounts and an ordered audit trail. The order of the
//! steps is part of the output:
//!
//! 1. base factor (100)
//! 2. humidity discount, from the humidity above base
//! 3. discounts for every parameter beyond tolerance
//! 4. bonuses for parameters better than their bonus threshold
//! 5. final factor, clamped to 0-100 and rounded half-up to 2 decimals

use std::sync::Arc;

use rust_decimal::Decimal;

use super::humidity::humidity_waste;
use crate::models::{
    normalize_grain_name, Adjustment, CalculationStep, Grade, HumidityWaste, PriceAdjustment,
    QualityAnalysis, QualityResult, QualityWarning, Severity, WarningCode,
};
use crate::rules::{GrainRules, RuleBook};
use crate::types::{clamp, round2};
use crate::validation::sanitize_measurements;

/// Factor every lot starts from
pub const BASE_FACTOR: Decimal = Decimal::ONE_HUNDRED;

/// Calculator bound to one rule book revision
#[derive(Debug, Clone)]
pub struct FactorCalculator {
    rules: Arc<RuleBook>,
}

impl FactorCalculator {
    pub fn new(rules: Arc<RuleBook>) -> Self {
        Self { rules }
    }

    pub fn rule_book(&self) -> &RuleBook {
        &self.rules
    }

    pub fn calculation_version(&self) -> &str {
        &self.rules.version
    }

    /// Humidity waste for a raw grain name
    pub fn humidity_waste(
        &self,
        grain_type: &str,
        actual_humidity: Decimal,
        gross_quantity_kg: Decimal,
    ) -> HumidityWaste {
        humidity_waste(
            self.rules.rules_for(grain_type).rules,
            actual_humidity,
            gross_quantity_kg,
        )
    }

    /// Calculate the quality result for one analysis.
    ///
    /// Never fails: bad readings and unknown grains produce warnings and a
    /// best-effort result.
    pub fn calculate(
        &self,
        analysis: &QualityAnalysis,
        grain_type: &str,
        quantity_kg: Option<Decimal>,
    ) -> QualityResult {
        let lookup = self.rules.rules_for(grain_type);
        let rules = lookup.rules;
        let sanitized = sanitize_measurements(&analysis.measurements);

        let mut warnings = Vec::new();
        if !lookup.is_known() {
            warnings.push(QualityWarning::new(
                "grain_type",
                WarningCode::UnknownGrainType,
                Severity::Warning,
                format!(
                    "No rule table for grain type '{}'; no bonuses or discounts applied",
                    grain_type.trim()
                ),
            ));
        }
        warnings.extend(sanitized.warnings.iter().cloned());

        let mut run = Run::new();

        // Step 2: humidity
        let humidity = sanitized.humidity;
        let waste = humidity_waste(rules, humidity, quantity_kg.unwrap_or(Decimal::ZERO));
        let humidity_excess = (humidity - rules.base_humidity).max(Decimal::ZERO);
        let humidity_rate = rules.humidity_factor_rate();
        let humidity_factor_discount = round2(humidity_excess * humidity_rate);

        if humidity_excess > Decimal::ZERO {
            run.out_of_tolerance = true;
            match rules.max_humidity {
                Some(max) if humidity > max => {
                    run.out_of_standard = true;
                    run.worsen(Some(Grade::OutOfStandard));
                    warnings.push(QualityWarning::new(
                        "humidity",
                        WarningCode::AboveMaxHumidity,
                        Severity::Critical,
                        format!("Humidity {}% exceeds the receiving limit of {}%", humidity, max),
                    ));
                }
                _ => warnings.push(QualityWarning::new(
                    "humidity",
                    WarningCode::AboveBaseHumidity,
                    Severity::Warning,
                    format!(
                        "Humidity {}% above base {}%; lot requires drying",
                        humidity, rules.base_humidity
                    ),
                )),
            }
        }
        run.step(
            format!(
                "Humidity {}% vs base {}%: {} points x {}",
                humidity, rules.base_humidity, humidity_excess, humidity_rate
            ),
            -humidity_factor_discount,
        );

        // Step 3: discounts
        let mut discounts = Vec::new();
        for rule in &rules.tolerances {
            let Some(value) = sanitized.values.get(rule.parameter) else {
                continue;
            };
            let excess = rule.excess(value);
            if excess <= Decimal::ZERO {
                continue;
            }

            let amount = round2(excess * rule.discount_rate);
            run.out_of_tolerance = true;
            let grade = rule.grade_for(value);
            run.worsen(grade);

            if grade == Some(Grade::OutOfStandard) {
                run.out_of_standard = true;
                warnings.push(QualityWarning::new(
                    rule.parameter.as_str(),
                    WarningCode::OutOfStandard,
                    Severity::Critical,
                    format!(
                        "{} {} is beyond the standard limit {}",
                        rule.parameter,
                        value,
                        rule.standard_limit
                            .or_else(|| rule.grade_limits.last().copied())
                            .unwrap_or(rule.tolerance)
                    ),
                ));
            } else {
                warnings.push(QualityWarning::new(
                    rule.parameter.as_str(),
                    WarningCode::OutOfTolerance,
                    Severity::Warning,
                    format!(
                        "{} {} is beyond tolerance {}",
                        rule.parameter, value, rule.tolerance
                    ),
                ));
            }

            run.step(
                format!(
                    "Discount {}: {} vs tolerance {} x {}",
                    rule.parameter, value, rule.tolerance, rule.discount_rate
                ),
                -amount,
            );
            discounts.push(Adjustment {
                parameter: rule.parameter.as_str().to_string(),
                value,
                tolerance: rule.tolerance,
                rate: rule.discount_rate,
                amount,
            });
        }

        // Step 4: bonuses
        let mut bonuses = Vec::new();
        if analysis.measurements.humidity.is_some() {
            if let Some(bonus) = humidity_bonus(rules, humidity) {
                run.step(
                    format!("Bonus humidity: {}% below {}%", humidity, bonus.tolerance),
                    bonus.amount,
                );
                bonuses.push(bonus);
            }
        }
        for rule in &rules.tolerances {
            let Some(value) = sanitized.values.get(rule.parameter) else {
                continue;
            };
            let Some((points, bonus)) = rule.bonus_for(value) else {
                continue;
            };
            let amount = round2(points);
            if amount <= Decimal::ZERO {
                continue;
            }
            let threshold = bonus.threshold.unwrap_or(rule.tolerance);
            run.step(
                format!(
                    "Bonus {}: {} vs threshold {} x {}",
                    rule.parameter, value, threshold, bonus.rate
                ),
                amount,
            );
            bonuses.push(Adjustment {
                parameter: rule.parameter.as_str().to_string(),
                value,
                tolerance: threshold,
                rate: bonus.rate,
                amount,
            });
        }

        // Step 5: final factor
        let total_bonus: Decimal = bonuses.iter().map(|b| b.amount).sum();
        let total_discount: Decimal = discounts.iter().map(|d| d.amount).sum();
        let raw = BASE_FACTOR + total_bonus - total_discount - humidity_factor_discount;
        let final_factor = round2(clamp(raw, Decimal::ZERO, BASE_FACTOR));
        run.finish(final_factor);

        let price_adjustment = PriceAdjustment {
            percent: final_factor - BASE_FACTOR,
            adjusted_quantity_kg: quantity_kg.map(|q| round2(q * final_factor / BASE_FACTOR)),
        };

        let grain_name = lookup
            .grain_type
            .map(|g| g.as_str().to_string())
            .unwrap_or_else(|| normalize_grain_name(grain_type));

        QualityResult {
            analysis_id: analysis.id,
            ctg_entry_id: analysis.ctg_entry_id,
            grain_type: grain_name,
            base_factor: BASE_FACTOR,
            final_factor,
            grade: run.grade,
            bonuses,
            discounts,
            total_bonus,
            total_discount,
            humidity_waste: waste,
            humidity_factor_discount,
            price_adjustment,
            warnings,
            out_of_tolerance: run.out_of_tolerance,
            out_of_standard: run.out_of_standard,
            calculation_steps: run.steps,
            calculation_version: self.rules.version.clone(),
        }
    }
}

fn humidity_bonus(rules: &GrainRules, humidity: Decimal) -> Option<Adjustment> {
    let bonus = rules.humidity_bonus.as_ref()?;
    let threshold = bonus.threshold.unwrap_or(rules.base_humidity);
    let better = threshold - humidity;
    if better <= Decimal::ZERO {
        return None;
    }
    let amount = round2(bonus.points(better));
    (amount > Decimal::ZERO).then(|| Adjustment {
        parameter: "humidity".to_string(),
        value: humidity,
        tolerance: threshold,
        rate: bonus.rate,
        amount,
    })
}

/// Running state of one calculation
struct Run {
    factor: Decimal,
    steps: Vec<CalculationStep>,
    grade: Option<Grade>,
    out_of_tolerance: bool,
    out_of_standard: bool,
}

impl Run {
    fn new() -> Self {
        let mut run = Self {
            factor: BASE_FACTOR,
            steps: Vec::new(),
            grade: None,
            out_of_tolerance: false,
            out_of_standard: false,
        };
        run.step("Base factor".to_string(), Decimal::ZERO);
        run
    }

    fn step(&mut self, description: String, delta: Decimal) {
        self.factor += delta;
        self.steps.push(CalculationStep {
            step: self.steps.len() as u32 + 1,
            description,
            delta,
            factor_after: self.factor,
        });
    }

    fn finish(&mut self, final_factor: Decimal) {
        let delta = final_factor - self.factor;
        self.step(
            "Final factor (clamped to 0-100, rounded to 2 decimals)".to_string(),
            delta,
        );
    }

    /// Keep the worst grade seen so far
    fn worsen(&mut self, grade: Option<Grade>) {
        self.grade = self.grade.max(grade);
    }
}
