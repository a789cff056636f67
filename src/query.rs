use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::ErrorKind;
use crate::unit_defs::types::UnitProperties;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Ref,
    TechLevel,
    MetalCost,
    EnergyCost,
    Buildtime,
    Health,
    SightDistance,
    Speed,
    Dps,
    Range,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Ref,
        Column::TechLevel,
        Column::MetalCost,
        Column::EnergyCost,
        Column::Buildtime,
        Column::Health,
        Column::SightDistance,
        Column::Speed,
        Column::Dps,
        Column::Range,
    ];

    /// Name accepted on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Column::Ref => "ref",
            Column::TechLevel => "techlevel",
            Column::MetalCost => "metalcost",
            Column::EnergyCost => "energycost",
            Column::Buildtime => "buildtime",
            Column::Health => "health",
            Column::SightDistance => "sightdistance",
            Column::Speed => "speed",
            Column::Dps => "dps",
            Column::Range => "range",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Column::Ref => "Ref",
            Column::TechLevel => "Tech level",
            Column::MetalCost => "Metal cost",
            Column::EnergyCost => "Energy cost",
            Column::Buildtime => "Buildtime",
            Column::Health => "Health",
            Column::SightDistance => "Sight range",
            Column::Speed => "Speed",
            Column::Dps => "DPS",
            Column::Range => "Range",
        }
    }

    pub fn value(self, unit: &UnitProperties) -> CellValue {
        match self {
            Column::Ref => CellValue::Text(unit.unit_ref().to_string()),
            Column::TechLevel => CellValue::Number(unit.tech_level() as f64),
            Column::MetalCost => CellValue::Number(unit.metal_cost() as f64),
            Column::EnergyCost => CellValue::Number(unit.energy_cost() as f64),
            Column::Buildtime => CellValue::Number(unit.buildtime() as f64),
            Column::Health => CellValue::Number(unit.health() as f64),
            Column::SightDistance => CellValue::Number(unit.sight_distance() as f64),
            Column::Speed => CellValue::Number(unit.speed()),
            Column::Dps => CellValue::Number(unit.combat_metrics().dps),
            Column::Range => CellValue::Number(unit.combat_metrics().max_range),
        }
    }

    /// Display form of the column for `unit`.
    pub fn render(self, unit: &UnitProperties) -> String {
        match self {
            Column::Ref => unit.unit_ref().to_string(),
            Column::TechLevel => format!("T{}", unit.tech_level()),
            Column::Buildtime => format!("{}s", unit.build_duration().as_secs()),
            Column::Speed => format!("{:.1}", unit.speed()),
            Column::Dps => format!("{:.0}", unit.combat_metrics().dps),
            Column::Range => format!("{:.0}", unit.combat_metrics().max_range),
            other => match other.value(unit) {
                CellValue::Number(n) => format!("{n}"),
                CellValue::Text(t) => t,
            },
        }
    }
}

impl FromStr for Column {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Column::ALL
            .into_iter()
            .find(|column| column.key() == wanted)
            .ok_or_else(|| ErrorKind::InvalidQuery(format!("unknown column `{s}`")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
            (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
}

impl Comparison {
    fn holds(self, value: f64, target: f64) -> bool {
        match self {
            Comparison::Greater => value > target,
            Comparison::GreaterOrEqual => value >= target,
            Comparison::Less => value < target,
            Comparison::LessOrEqual => value <= target,
            Comparison::Equal => value == target,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match.
    Contains(String),
    Compare(Comparison, f64),
}

/// A single `column<op>value` condition, e.g. `metalcost>=200` or `ref=arm`.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: Column,
    pub predicate: Predicate,
}

impl Filter {
    /// Builds a filter from a column and the raw condition typed for it (`>200`, `arm`).
    pub fn for_column(column: Column, condition: &str) -> Result<Filter, ErrorKind> {
        let condition = condition.trim();
        let predicate = if column == Column::Ref {
            Predicate::Contains(condition.trim_start_matches('=').trim().to_lowercase())
        } else {
            let (comparison, number) = [
                (">=", Comparison::GreaterOrEqual),
                ("<=", Comparison::LessOrEqual),
                (">", Comparison::Greater),
                ("<", Comparison::Less),
                ("=", Comparison::Equal),
            ]
            .into_iter()
            .find_map(|(op, comparison)| condition.strip_prefix(op).map(|rest| (comparison, rest)))
            .unwrap_or((Comparison::Equal, condition));

            let target = number
                .trim()
                .parse::<f64>()
                .map_err(|_| ErrorKind::InvalidQuery(format!("`{condition}` is not a number comparison")))?;
            Predicate::Compare(comparison, target)
        };

        Ok(Filter { column, predicate })
    }

    pub fn matches(&self, unit: &UnitProperties) -> bool {
        match (&self.predicate, self.column.value(unit)) {
            (Predicate::Contains(needle), CellValue::Text(text)) => text.to_lowercase().contains(needle.as_str()),
            (Predicate::Compare(comparison, target), CellValue::Number(value)) => comparison.holds(value, *target),
            _ => false,
        }
    }
}

/// Parses `column<op>value`. The column name is everything before the first operator.
impl FromStr for Filter {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(['>', '<', '='])
            .ok_or_else(|| ErrorKind::InvalidQuery(format!("`{s}` has no comparison operator")))?;
        let (column, condition) = s.split_at(split);
        Filter::for_column(column.parse()?, condition)
    }
}

pub fn apply_filters<'a>(units: impl IntoIterator<Item = &'a UnitProperties>, filters: &[Filter]) -> Vec<&'a UnitProperties> {
    units
        .into_iter()
        .filter(|unit| filters.iter().all(|filter| filter.matches(unit)))
        .collect()
}

/// Stable sort by `column`, ties keep their incoming order.
pub fn sort_units(units: &mut [&UnitProperties], column: Column, descending: bool) {
    units.sort_by(|a, b| {
        let ordering = column.value(a).compare(&column.value(b));
        if descending { ordering.reverse() } else { ordering }
    });
}

#[cfg(test)]
mod test {
    use super::*;

    fn units() -> Vec<UnitProperties> {
        vec![
            UnitProperties::builder().unit_ref("armpw").metal_cost(54).speed(2.5).build(),
            UnitProperties::builder().unit_ref("armwar").metal_cost(250).speed(1.6).build(),
            UnitProperties::builder().unit_ref("corak").metal_cost(45).speed(2.7).build(),
        ]
    }

    fn refs(units: &[&UnitProperties]) -> Vec<String> {
        units.iter().map(|unit| unit.unit_ref().to_string()).collect()
    }

    #[test]
    fn parses_filters() {
        assert_eq!(
            "metalcost>=100".parse::<Filter>().ok(),
            Some(Filter {
                column: Column::MetalCost,
                predicate: Predicate::Compare(Comparison::GreaterOrEqual, 100.0),
            })
        );
        assert_eq!(
            "Speed<2".parse::<Filter>().ok(),
            Some(Filter {
                column: Column::Speed,
                predicate: Predicate::Compare(Comparison::Less, 2.0),
            })
        );
        assert_eq!(
            "ref=ARM".parse::<Filter>().ok(),
            Some(Filter {
                column: Column::Ref,
                predicate: Predicate::Contains("arm".to_string()),
            })
        );
        assert!("bogus>1".parse::<Filter>().is_err());
        assert!("metalcost>lots".parse::<Filter>().is_err());
        assert!("metalcost".parse::<Filter>().is_err());
    }

    #[test]
    fn bare_numbers_mean_equality() {
        let filter = Filter::for_column(Column::MetalCost, "54").expect("bad filter");
        assert_eq!(filter.predicate, Predicate::Compare(Comparison::Equal, 54.0));
    }

    #[test]
    fn filters_and_sorts() {
        let units = units();

        let cheap = apply_filters(&units, &["metalcost<100".parse().expect("bad filter")]);
        assert_eq!(refs(&cheap), vec!["armpw", "corak"]);

        let mut arm = apply_filters(&units, &["ref=arm".parse().expect("bad filter")]);
        assert_eq!(refs(&arm), vec!["armpw", "armwar"]);

        sort_units(&mut arm, Column::MetalCost, true);
        assert_eq!(refs(&arm), vec!["armwar", "armpw"]);

        let mut all: Vec<&UnitProperties> = units.iter().collect();
        sort_units(&mut all, Column::Speed, false);
        assert_eq!(refs(&all), vec!["armwar", "armpw", "corak"]);
    }

    #[test]
    fn rendering() {
        let unit = UnitProperties::builder()
            .unit_ref("armpw")
            .buildtime(1650)
            .speed(2.55)
            .metal_cost(54)
            .build();
        assert_eq!(Column::Buildtime.render(&unit), "16s");
        assert_eq!(Column::Speed.render(&unit), "2.5");
        assert_eq!(Column::MetalCost.render(&unit), "54");
        assert_eq!(Column::TechLevel.render(&unit), "T0");
    }
}
