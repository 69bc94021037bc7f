//! Closed unit tables. Every category except temperature converts through a
//! multiplicative factor relative to its base unit.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Length,
    Weight,
    Temperature,
    Area,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// Multiply by this factor to reach the category base unit.
    Factor(f64),
    Celsius,
    Fahrenheit,
    Kelvin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub symbol: &'static str,
    pub category: Category,
    pub scale: Scale,
    aliases: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("cannot convert {from} to {to}: different categories")]
    CategoryMismatch { from: String, to: String },
}

const fn factor(
    symbol: &'static str,
    category: Category,
    value: f64,
    aliases: &'static [&'static str],
) -> Unit {
    Unit {
        symbol,
        category,
        scale: Scale::Factor(value),
        aliases,
    }
}

static UNITS: &[Unit] = &[
    // length, base metre
    factor("mm", Category::Length, 0.001, &["millimeter", "millimeters", "millimetre", "millimetres"]),
    factor("cm", Category::Length, 0.01, &["centimeter", "centimeters", "centimetre", "centimetres"]),
    factor("m", Category::Length, 1.0, &["meter", "meters", "metre", "metres"]),
    factor("km", Category::Length, 1000.0, &["kilometer", "kilometers", "kilometre", "kilometres"]),
    factor("in", Category::Length, 0.0254, &["inch", "inches"]),
    factor("ft", Category::Length, 0.3048, &["foot", "feet"]),
    factor("yd", Category::Length, 0.9144, &["yard", "yards"]),
    factor("mi", Category::Length, 1609.344, &["mile", "miles"]),
    factor("nmi", Category::Length, 1852.0, &["nauticalmile", "nauticalmiles"]),
    // weight, base kilogram
    factor("mg", Category::Weight, 0.000_001, &["milligram", "milligrams"]),
    factor("g", Category::Weight, 0.001, &["gram", "grams"]),
    factor("kg", Category::Weight, 1.0, &["kilogram", "kilograms", "kilo", "kilos"]),
    factor("t", Category::Weight, 1000.0, &["tonne", "tonnes", "ton", "tons"]),
    factor("oz", Category::Weight, 0.028_349_523_125, &["ounce", "ounces"]),
    factor("lb", Category::Weight, 0.453_592_37, &["lbs", "pound", "pounds"]),
    factor("st", Category::Weight, 6.350_293_18, &["stone", "stones"]),
    // area, base square metre
    factor("cm2", Category::Area, 0.0001, &["sqcm"]),
    factor("m2", Category::Area, 1.0, &["sqm"]),
    factor("km2", Category::Area, 1_000_000.0, &["sqkm"]),
    factor("ft2", Category::Area, 0.092_903_04, &["sqft"]),
    factor("mi2", Category::Area, 2_589_988.110_336, &["sqmi"]),
    factor("ha", Category::Area, 10_000.0, &["hectare", "hectares"]),
    factor("ac", Category::Area, 4_046.856_422_4, &["acre", "acres"]),
    // volume, base litre
    factor("ml", Category::Volume, 0.001, &["milliliter", "milliliters", "millilitre", "millilitres"]),
    factor("l", Category::Volume, 1.0, &["liter", "liters", "litre", "litres"]),
    factor("m3", Category::Volume, 1000.0, &["cubicmeter", "cubicmeters"]),
    factor("gal", Category::Volume, 3.785_411_784, &["gallon", "gallons"]),
    factor("qt", Category::Volume, 0.946_352_946, &["quart", "quarts"]),
    factor("pt", Category::Volume, 0.473_176_473, &["pint", "pints"]),
    factor("cup", Category::Volume, 0.236_588_236_5, &["cups"]),
    factor("floz", Category::Volume, 0.029_573_529_562_5, &["fluidounce", "fluidounces"]),
    factor("tbsp", Category::Volume, 0.014_786_764_781_25, &["tablespoon", "tablespoons"]),
    factor("tsp", Category::Volume, 0.004_928_921_593_75, &["teaspoon", "teaspoons"]),
    // temperature
    Unit {
        symbol: "°C",
        category: Category::Temperature,
        scale: Scale::Celsius,
        aliases: &["c", "celsius", "degc"],
    },
    Unit {
        symbol: "°F",
        category: Category::Temperature,
        scale: Scale::Fahrenheit,
        aliases: &["f", "fahrenheit", "degf"],
    },
    Unit {
        symbol: "K",
        category: Category::Temperature,
        scale: Scale::Kelvin,
        aliases: &["k", "kelvin"],
    },
];

/// Case-insensitive lookup by symbol or alias.
pub fn lookup(token: &str) -> Option<&'static Unit> {
    let normalized = token.trim().to_lowercase().replace('²', "2").replace('³', "3");
    if normalized.is_empty() {
        return None;
    }
    UNITS.iter().find(|unit| {
        unit.symbol.eq_ignore_ascii_case(&normalized) || unit.aliases.contains(&normalized.as_str())
    })
}

pub fn convert(amount: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    let source = lookup(from).ok_or_else(|| ConversionError::UnknownUnit(from.to_string()))?;
    let target = lookup(to).ok_or_else(|| ConversionError::UnknownUnit(to.to_string()))?;
    convert_units(amount, source, target)
}

pub fn convert_units(amount: f64, from: &Unit, to: &Unit) -> Result<f64, ConversionError> {
    if from.category != to.category {
        return Err(ConversionError::CategoryMismatch {
            from: from.symbol.to_string(),
            to: to.symbol.to_string(),
        });
    }

    match (from.scale, to.scale) {
        (Scale::Factor(source), Scale::Factor(target)) => Ok(amount * source / target),
        (source, target) => Ok(from_celsius(to_celsius(amount, source), target)),
    }
}

fn to_celsius(value: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        Scale::Kelvin => value - 273.15,
        Scale::Celsius | Scale::Factor(_) => value,
    }
}

fn from_celsius(value: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Fahrenheit => value * 9.0 / 5.0 + 32.0,
        Scale::Kelvin => value + 273.15,
        Scale::Celsius | Scale::Factor(_) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::{convert, lookup, Category, ConversionError};

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 0.001
    }

    #[test]
    fn converts_length_weight_and_volume() {
        assert!(close(convert(100.0, "km", "miles").unwrap(), 62.137));
        assert!(close(convert(1.0, "kg", "lbs").unwrap(), 2.205));
        assert!(close(convert(1.0, "gal", "l").unwrap(), 3.785));
        assert!(close(convert(1.0, "ha", "m2").unwrap(), 10_000.0));
    }

    #[test]
    fn converts_temperature_with_affine_formulas() {
        assert!(close(convert(100.0, "c", "f").unwrap(), 212.0));
        assert!(close(convert(32.0, "F", "C").unwrap(), 0.0));
        assert!(close(convert(0.0, "celsius", "kelvin").unwrap(), 273.15));
    }

    #[test]
    fn lookup_is_case_insensitive_and_alias_aware() {
        assert_eq!(lookup("KM").map(|u| u.symbol), Some("km"));
        assert_eq!(lookup("Miles").map(|u| u.symbol), Some("mi"));
        assert_eq!(lookup("m²").map(|u| u.category), Some(Category::Area));
        assert!(lookup("parsec").is_none());
    }

    #[test]
    fn rejects_mixed_categories_and_unknown_tokens() {
        assert!(matches!(
            convert(1.0, "kg", "km"),
            Err(ConversionError::CategoryMismatch { .. })
        ));
        assert_eq!(
            convert(1.0, "kg", "zorkmid"),
            Err(ConversionError::UnknownUnit("zorkmid".to_string()))
        );
    }
}
