//! Grain rule tables
//!
//! A [`RuleBook`] is an immutable, versioned configuration object holding one
//! [`GrainRules`] table per grain type. It is built once at startup (either the
//! built-in [`RuleBook::standard`] revision or a JSON file) and shared read-only.
//! Unknown grain names resolve to a zero-effect table instead of failing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Grade, GrainType, QualityParameter};

/// Factor points per humidity point above base when a grain defines no rate
pub const DEFAULT_HUMIDITY_FACTOR_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Version tag of the built-in rule tables
pub const STANDARD_RULES_VERSION: &str = "2024.1";

/// Errors raised while loading or validating a rule book
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid rule book JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rule book version must not be empty")]
    EmptyVersion,

    #[error("Grain {0} is defined more than once")]
    DuplicateGrain(GrainType),

    #[error("Humidity waste table for {0} must be strictly ascending")]
    UnorderedWasteTable(GrainType),

    #[error("Negative rate for {grain} {parameter}")]
    NegativeRate { grain: GrainType, parameter: String },

    #[error("Grade limits for {grain} {parameter} must be monotonic and at most three")]
    InvalidGradeLimits {
        grain: GrainType,
        parameter: QualityParameter,
    },

    #[error("Last grade limit for {grain} {parameter} is stricter than its standard limit")]
    GradeLimitsBeyondStandard {
        grain: GrainType,
        parameter: QualityParameter,
    },

    #[error("Parameter {parameter} is defined more than once for {grain}")]
    DuplicateParameter {
        grain: GrainType,
        parameter: QualityParameter,
    },
}

/// One step of the humidity waste table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteBand {
    /// Humidity threshold (%) at which this band starts
    pub humidity: Decimal,
    /// Weight loss (%) for humidity in this band
    pub waste_percent: Decimal,
}

/// Which side of the tolerance is worse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Lower is better (defects, foreign matter)
    Max,
    /// Higher is better (hectoliter weight, protein)
    Min,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusRule {
    /// Threshold beyond which the bonus starts; defaults to the tolerance
    #[serde(default)]
    pub threshold: Option<Decimal>,
    /// Factor points per unit better than the threshold
    pub rate: Decimal,
    /// Maximum bonus in factor points
    #[serde(default)]
    pub cap: Option<Decimal>,
}

impl BonusRule {
    /// Capped bonus for a value `better` units past the threshold
    pub fn points(&self, better: Decimal) -> Decimal {
        let points = better.max(Decimal::ZERO) * self.rate;
        self.cap.map_or(points, |cap| points.min(cap))
    }
}

/// Tolerance, discount and grading rule for one quality parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceRule {
    pub parameter: QualityParameter,
    pub direction: Direction,
    /// Value up to (or down to) which no discount applies
    pub tolerance: Decimal,
    /// Factor points per unit beyond tolerance
    pub discount_rate: Decimal,
    /// Hard standard limit; beyond it the lot is out of standard
    #[serde(default)]
    pub standard_limit: Option<Decimal>,
    /// G1, G2, G3 bounds (upper bounds for `max`, lower bounds for `min`)
    #[serde(default)]
    pub grade_limits: Vec<Decimal>,
    #[serde(default)]
    pub bonus: Option<BonusRule>,
}

impl ToleranceRule {
    /// How far the value is past tolerance on the bad side (zero if within)
    pub fn excess(&self, value: Decimal) -> Decimal {
        let deviation = match self.direction {
            Direction::Max => value - self.tolerance,
            Direction::Min => self.tolerance - value,
        };
        deviation.max(Decimal::ZERO)
    }

    pub fn exceeds_standard(&self, value: Decimal) -> bool {
        match (self.standard_limit, self.direction) {
            (Some(limit), Direction::Max) => value > limit,
            (Some(limit), Direction::Min) => value < limit,
            (None, _) => false,
        }
    }

    /// Grade of a single value against this parameter's grade limits
    pub fn grade_for(&self, value: Decimal) -> Option<Grade> {
        if self.exceeds_standard(value) {
            return Some(Grade::OutOfStandard);
        }
        if self.grade_limits.is_empty() {
            return None;
        }
        let position = self.grade_limits.iter().position(|limit| match self.direction {
            Direction::Max => value <= *limit,
            Direction::Min => value >= *limit,
        });
        Some(position.map_or(Grade::OutOfStandard, Grade::from_index))
    }

    /// Bonus points for a value better than the bonus threshold
    pub fn bonus_for(&self, value: Decimal) -> Option<(Decimal, &BonusRule)> {
        let bonus = self.bonus.as_ref()?;
        let threshold = bonus.threshold.unwrap_or(self.tolerance);
        let better = match self.direction {
            Direction::Max => threshold - value,
            Direction::Min => value - threshold,
        };
        if better <= Decimal::ZERO {
            return None;
        }
        Some((bonus.points(better), bonus))
    }
}

/// Rule table for one grain type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrainRules {
    /// Standard humidity (%) beyond which waste and discounts apply
    pub base_humidity: Decimal,
    /// Hard receiving limit for humidity
    #[serde(default)]
    pub max_humidity: Option<Decimal>,
    /// Factor points per humidity point above base
    #[serde(default)]
    pub humidity_factor_rate: Option<Decimal>,
    /// Bonus for humidity below base
    #[serde(default)]
    pub humidity_bonus: Option<BonusRule>,
    #[serde(default)]
    pub humidity_waste_table: Vec<WasteBand>,
    #[serde(default)]
    pub tolerances: Vec<ToleranceRule>,
}

static ZERO_EFFECT: GrainRules = GrainRules {
    base_humidity: Decimal::ONE_HUNDRED,
    max_humidity: None,
    humidity_factor_rate: None,
    humidity_bonus: None,
    humidity_waste_table: Vec::new(),
    tolerances: Vec::new(),
};

impl GrainRules {
    /// Table used for grain types without rules: no waste, discounts, bonuses or grades
    pub fn zero_effect() -> &'static GrainRules {
        &ZERO_EFFECT
    }

    pub fn humidity_factor_rate(&self) -> Decimal {
        self.humidity_factor_rate
            .unwrap_or(DEFAULT_HUMIDITY_FACTOR_RATE)
    }

    pub fn tolerance(&self, parameter: QualityParameter) -> Option<&ToleranceRule> {
        self.tolerances.iter().find(|t| t.parameter == parameter)
    }

    fn validate(&self, grain: GrainType) -> Result<(), RuleError> {
        let ascending = self
            .humidity_waste_table
            .windows(2)
            .all(|pair| pair[0].humidity < pair[1].humidity);
        if !ascending {
            return Err(RuleError::UnorderedWasteTable(grain));
        }

        if self.humidity_factor_rate.is_some_and(|r| r < Decimal::ZERO)
            || self
                .humidity_bonus
                .as_ref()
                .is_some_and(|b| b.rate < Decimal::ZERO)
        {
            return Err(RuleError::NegativeRate {
                grain,
                parameter: "humidity".to_string(),
            });
        }

        for (index, rule) in self.tolerances.iter().enumerate() {
            if self.tolerances[..index]
                .iter()
                .any(|other| other.parameter == rule.parameter)
            {
                return Err(RuleError::DuplicateParameter {
                    grain,
                    parameter: rule.parameter,
                });
            }

            let negative_bonus = rule.bonus.as_ref().is_some_and(|b| b.rate < Decimal::ZERO);
            if rule.discount_rate < Decimal::ZERO || negative_bonus {
                return Err(RuleError::NegativeRate {
                    grain,
                    parameter: rule.parameter.to_string(),
                });
            }

            let monotonic = rule.grade_limits.windows(2).all(|pair| match rule.direction {
                Direction::Max => pair[0] <= pair[1],
                Direction::Min => pair[0] >= pair[1],
            });
            if !monotonic || rule.grade_limits.len() > 3 {
                return Err(RuleError::InvalidGradeLimits {
                    grain,
                    parameter: rule.parameter,
                });
            }

            // Past the last grade limit means out of standard
            let stricter = match (rule.grade_limits.last(), rule.standard_limit) {
                (Some(last), Some(limit)) => match rule.direction {
                    Direction::Max => *last < limit,
                    Direction::Min => *last > limit,
                },
                _ => false,
            };
            if stricter {
                return Err(RuleError::GradeLimitsBeyondStandard {
                    grain,
                    parameter: rule.parameter,
                });
            }
        }

        Ok(())
    }
}

/// Rules for one grain type inside a rule book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrainRuleEntry {
    pub grain_type: GrainType,
    #[serde(flatten)]
    pub rules: GrainRules,
}

/// Resolved rule table for a raw grain name
#[derive(Debug, Clone, Copy)]
pub struct RuleLookup<'a> {
    /// `None` when the name did not resolve to a configured grain
    pub grain_type: Option<GrainType>,
    pub rules: &'a GrainRules,
}

impl RuleLookup<'_> {
    pub fn is_known(&self) -> bool {
        self.grain_type.is_some()
    }
}

/// Versioned set of grain rule tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    pub version: String,
    pub grains: Vec<GrainRuleEntry>,
}

impl RuleBook {
    /// Parse and validate a JSON rule book
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let book: RuleBook = serde_json::from_str(json)?;
        book.validate()?;
        Ok(book)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.version.trim().is_empty() {
            return Err(RuleError::EmptyVersion);
        }
        for (index, entry) in self.grains.iter().enumerate() {
            if self.grains[..index]
                .iter()
                .any(|other| other.grain_type == entry.grain_type)
            {
                return Err(RuleError::DuplicateGrain(entry.grain_type));
            }
            entry.rules.validate(entry.grain_type)?;
        }
        Ok(())
    }

    pub fn rules(&self, grain: GrainType) -> Option<&GrainRules> {
        self.grains
            .iter()
            .find(|entry| entry.grain_type == grain)
            .map(|entry| &entry.rules)
    }

    /// Resolve a raw grain name, falling back to the zero-effect table
    pub fn rules_for(&self, grain: &str) -> RuleLookup<'_> {
        let resolved = GrainType::parse(grain)
            .and_then(|grain_type| self.rules(grain_type).map(|rules| (grain_type, rules)));
        match resolved {
            Some((grain_type, rules)) => RuleLookup {
                grain_type: Some(grain_type),
                rules,
            },
            None => RuleLookup {
                grain_type: None,
                rules: GrainRules::zero_effect(),
            },
        }
    }

    pub fn base_humidity(&self, grain: &str) -> Decimal {
        self.rules_for(grain).rules.base_humidity
    }

    pub fn humidity_waste_table(&self, grain: &str) -> &[WasteBand] {
        &self.rules_for(grain).rules.humidity_waste_table
    }

    pub fn tolerance_table(&self, grain: &str) -> &[ToleranceRule] {
        &self.rules_for(grain).rules.tolerances
    }

    pub fn grain_types(&self) -> impl Iterator<Item = GrainType> + '_ {
        self.grains.iter().map(|entry| entry.grain_type)
    }

    /// Built-in rule tables
    pub fn standard() -> Self {
        RuleBook {
            version: STANDARD_RULES_VERSION.to_string(),
            grains: vec![
                GrainRuleEntry {
                    grain_type: GrainType::Wheat,
                    rules: wheat(),
                },
                GrainRuleEntry {
                    grain_type: GrainType::Corn,
                    rules: corn(),
                },
                GrainRuleEntry {
                    grain_type: GrainType::Soybean,
                    rules: soybean(),
                },
                GrainRuleEntry {
                    grain_type: GrainType::Sorghum,
                    rules: sorghum(),
                },
                GrainRuleEntry {
                    grain_type: GrainType::Sunflower,
                    rules: sunflower(),
                },
            ],
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Built-in tables
// ============================================================================

fn d(num: i64, scale: u32) -> Decimal {
    Decimal::new(num, scale)
}

fn bands(rows: &[(i64, i64)]) -> Vec<WasteBand> {
    rows.iter()
        .map(|&(humidity, waste)| WasteBand {
            humidity: d(humidity, 1),
            waste_percent: d(waste, 2),
        })
        .collect()
}

fn max_rule(
    parameter: QualityParameter,
    tolerance: Decimal,
    discount_rate: Decimal,
    standard_limit: Option<Decimal>,
    grade_limits: Vec<Decimal>,
) -> ToleranceRule {
    ToleranceRule {
        parameter,
        direction: Direction::Max,
        tolerance,
        discount_rate,
        standard_limit,
        grade_limits,
        bonus: None,
    }
}

fn min_rule(
    parameter: QualityParameter,
    tolerance: Decimal,
    discount_rate: Decimal,
    standard_limit: Option<Decimal>,
    grade_limits: Vec<Decimal>,
) -> ToleranceRule {
    ToleranceRule {
        direction: Direction::Min,
        ..max_rule(parameter, tolerance, discount_rate, standard_limit, grade_limits)
    }
}

fn wheat() -> GrainRules {
    use QualityParameter::*;
    GrainRules {
        base_humidity: d(140, 1),
        max_humidity: Some(d(170, 1)),
        humidity_factor_rate: Some(d(10, 1)),
        humidity_bonus: None,
        humidity_waste_table: bands(&[
            (141, 70),
            (145, 115),
            (150, 170),
            (155, 225),
            (160, 280),
            (165, 335),
            (170, 390),
        ]),
        tolerances: vec![
            max_rule(ForeignMatter, d(20, 2), d(10, 1), Some(d(150, 2)), vec![d(50, 2), d(100, 2), d(150, 2)]),
            max_rule(DamagedGrains, d(50, 2), d(10, 1), Some(d(300, 2)), vec![d(100, 2), d(200, 2), d(300, 2)]),
            max_rule(BurntGrains, d(10, 2), d(20, 1), Some(d(50, 2)), vec![d(20, 2), d(35, 2), d(50, 2)]),
            max_rule(BrokenGrains, d(50, 2), d(5, 1), Some(d(300, 2)), vec![d(100, 2), d(200, 2), d(300, 2)]),
            max_rule(SproutedGrains, d(25, 2), d(10, 1), Some(d(100, 2)), vec![d(50, 2), d(75, 2), d(100, 2)]),
            max_rule(PestDamaged, d(50, 2), d(10, 1), Some(d(200, 2)), vec![d(100, 2), d(150, 2), d(200, 2)]),
            ToleranceRule {
                bonus: Some(BonusRule {
                    threshold: Some(d(79, 0)),
                    rate: d(5, 1),
                    cap: Some(d(15, 1)),
                }),
                ..min_rule(HectoliterWeight, d(75, 0), d(10, 1), Some(d(70, 0)), vec![d(79, 0), d(76, 0), d(70, 0)])
            },
            ToleranceRule {
                bonus: Some(BonusRule {
                    threshold: None,
                    rate: d(20, 1),
                    cap: Some(d(40, 1)),
                }),
                ..min_rule(Protein, d(110, 1), d(20, 1), None, Vec::new())
            },
        ],
    }
}

fn corn() -> GrainRules {
    use QualityParameter::*;
    GrainRules {
        base_humidity: d(145, 1),
        max_humidity: Some(d(200, 1)),
        humidity_factor_rate: Some(d(10, 1)),
        humidity_bonus: None,
        humidity_waste_table: bands(&[
            (146, 70),
            (150, 110),
            (155, 165),
            (160, 220),
            (165, 275),
            (170, 330),
            (180, 440),
            (190, 550),
            (200, 660),
        ]),
        tolerances: vec![
            max_rule(ForeignMatter, d(10, 1), d(10, 1), Some(d(30, 1)), vec![d(10, 1), d(20, 1), d(30, 1)]),
            max_rule(DamagedGrains, d(30, 1), d(10, 1), Some(d(80, 1)), vec![d(30, 1), d(50, 1), d(80, 1)]),
            max_rule(BrokenGrains, d(20, 1), d(5, 1), Some(d(50, 1)), vec![d(20, 1), d(30, 1), d(50, 1)]),
            max_rule(BurntGrains, d(5, 1), d(10, 1), Some(d(15, 1)), Vec::new()),
            min_rule(HectoliterWeight, d(69, 0), d(10, 1), Some(d(66, 0)), vec![d(72, 0), d(69, 0), d(66, 0)]),
        ],
    }
}

fn soybean() -> GrainRules {
    use QualityParameter::*;
    GrainRules {
        base_humidity: d(135, 1),
        max_humidity: Some(d(180, 1)),
        humidity_factor_rate: Some(d(15, 1)),
        humidity_bonus: None,
        humidity_waste_table: bands(&[
            (136, 70),
            (140, 115),
            (145, 170),
            (150, 225),
            (155, 280),
            (160, 335),
            (165, 390),
            (170, 445),
            (180, 555),
            (190, 665),
            (200, 775),
        ]),
        tolerances: vec![
            max_rule(ForeignMatter, d(10, 1), d(10, 1), Some(d(30, 1)), Vec::new()),
            max_rule(DamagedGrains, d(50, 1), d(10, 1), Some(d(100, 1)), Vec::new()),
            max_rule(BrokenGrains, d(200, 1), d(25, 2), Some(d(300, 1)), Vec::new()),
            max_rule(GreenGrains, d(50, 1), d(5, 1), Some(d(100, 1)), Vec::new()),
            max_rule(BurntGrains, d(10, 1), d(10, 1), Some(d(30, 1)), Vec::new()),
        ],
    }
}

fn sorghum() -> GrainRules {
    use QualityParameter::*;
    GrainRules {
        base_humidity: d(150, 1),
        max_humidity: Some(d(190, 1)),
        humidity_factor_rate: Some(d(10, 1)),
        humidity_bonus: None,
        humidity_waste_table: bands(&[
            (151, 70),
            (155, 115),
            (160, 170),
            (165, 225),
            (170, 280),
            (180, 390),
            (190, 500),
        ]),
        tolerances: vec![
            max_rule(ForeignMatter, d(10, 1), d(10, 1), Some(d(30, 1)), vec![d(10, 1), d(20, 1), d(30, 1)]),
            max_rule(DamagedGrains, d(30, 1), d(10, 1), Some(d(80, 1)), vec![d(30, 1), d(50, 1), d(80, 1)]),
            max_rule(BrokenGrains, d(30, 1), d(5, 1), Some(d(80, 1)), vec![d(30, 1), d(50, 1), d(80, 1)]),
        ],
    }
}

fn sunflower() -> GrainRules {
    use QualityParameter::*;
    GrainRules {
        base_humidity: d(110, 1),
        max_humidity: Some(d(150, 1)),
        // No grain-specific rate: the default applies
        humidity_factor_rate: None,
        humidity_bonus: None,
        humidity_waste_table: bands(&[
            (111, 70),
            (115, 115),
            (120, 170),
            (125, 225),
            (130, 280),
            (140, 390),
            (150, 500),
        ]),
        tolerances: vec![
            max_rule(ForeignMatter, d(20, 1), d(10, 1), Some(d(40, 1)), Vec::new()),
            max_rule(DamagedGrains, d(50, 1), d(10, 1), Some(d(100, 1)), Vec::new()),
        ],
    }
}
