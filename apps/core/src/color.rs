//! Color literal parsing and HEX / RGB / HSL conversion.
//!
//! Every input is normalized to an [`Rgb`] triple; the other two textual forms
//! are derived from it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("not a color literal")]
    NotAColor,
    #[error("invalid hex color '{0}'")]
    InvalidHex(String),
    #[error("component out of range: {0}")]
    OutOfRange(String),
    #[error("malformed color component '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Degrees in `0..360`.
    pub h: f64,
    /// Percent in `0..=100`.
    pub s: f64,
    /// Percent in `0..=100`.
    pub l: f64,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_rgb_string(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    pub fn to_hsl(self) -> Hsl {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) / 2.0;

        if delta == 0.0 {
            return Hsl {
                h: 0.0,
                s: 0.0,
                l: l * 100.0,
            };
        }

        let s = delta / (1.0 - (2.0 * l - 1.0).abs());
        let h = if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Hsl {
            h: h.rem_euclid(360.0),
            s: s * 100.0,
            l: l * 100.0,
        }
    }
}

impl Hsl {
    pub fn to_rgb(self) -> Rgb {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = l - chroma / 2.0;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        Rgb {
            r: channel(r + m),
            g: channel(g + m),
            b: channel(b + m),
        }
    }

    pub fn to_hsl_string(self) -> String {
        let hue = (self.h.round() as u32) % 360;
        format!(
            "hsl({}, {}%, {}%)",
            hue,
            self.s.round() as u32,
            self.l.round() as u32
        )
    }
}

fn channel(unit: f64) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Cheap acceptance predicate for the dispatcher: claims the input shape even
/// when the components later turn out to be out of range.
pub fn looks_like_color(input: &str) -> bool {
    let trimmed = input.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let lowered = trimmed.to_ascii_lowercase();
    if (lowered.starts_with("rgb(") || lowered.starts_with("hsl(")) && lowered.ends_with(')') {
        return true;
    }

    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

pub fn parse(input: &str) -> Result<Rgb, ColorError> {
    let trimmed = input.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(body) = function_body(&lowered, "rgb") {
        return parse_rgb_components(body);
    }
    if let Some(body) = function_body(&lowered, "hsl") {
        return parse_hsl_components(body).map(Hsl::to_rgb);
    }
    if looks_like_color(trimmed) {
        return parse_rgb_components(trimmed);
    }

    Err(ColorError::NotAColor)
}

pub fn parse_hsl(input: &str) -> Result<Hsl, ColorError> {
    let lowered = input.trim().to_ascii_lowercase();
    let body = function_body(&lowered, "hsl").ok_or(ColorError::NotAColor)?;
    parse_hsl_components(body)
}

fn function_body<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    input
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_hex(hex: &str) -> Result<Rgb, ColorError> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(hex.to_string()));
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(ColorError::InvalidHex(hex.to_string())),
    };

    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&expanded[range], 16).map_err(|_| ColorError::InvalidHex(hex.to_string()))
    };
    Ok(Rgb {
        r: component(0..2)?,
        g: component(2..4)?,
        b: component(4..6)?,
    })
}

fn split_components(body: &str) -> Result<[&str; 3], ColorError> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(ColorError::Malformed(body.to_string())),
    }
}

fn parse_rgb_components(body: &str) -> Result<Rgb, ColorError> {
    let [r, g, b] = split_components(body)?;
    let channel = |raw: &str| -> Result<u8, ColorError> {
        let value = raw
            .parse::<u32>()
            .map_err(|_| ColorError::Malformed(raw.to_string()))?;
        u8::try_from(value).map_err(|_| ColorError::OutOfRange(raw.to_string()))
    };
    Ok(Rgb {
        r: channel(r)?,
        g: channel(g)?,
        b: channel(b)?,
    })
}

fn parse_hsl_components(body: &str) -> Result<Hsl, ColorError> {
    let [h, s, l] = split_components(body)?;
    let number = |raw: &str, max: f64| -> Result<f64, ColorError> {
        let cleaned = raw.trim_end_matches('%').trim_end_matches("deg").trim();
        let value = cleaned
            .parse::<f64>()
            .map_err(|_| ColorError::Malformed(raw.to_string()))?;
        if !(0.0..=max).contains(&value) {
            return Err(ColorError::OutOfRange(raw.to_string()));
        }
        Ok(value)
    };
    Ok(Hsl {
        h: number(h, 360.0)?.rem_euclid(360.0),
        s: number(s, 100.0)?,
        l: number(l, 100.0)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{looks_like_color, parse, parse_hsl, ColorError, Hsl, Rgb};

    fn within_one(a: u8, b: u8) -> bool {
        (i16::from(a) - i16::from(b)).abs() <= 1
    }

    #[test]
    fn parses_every_literal_form() {
        let orange = Rgb::new(230, 126, 34);
        assert_eq!(parse("#E67E22"), Ok(orange));
        assert_eq!(parse("#e67e22"), Ok(orange));
        assert_eq!(parse("rgb(230, 126, 34)"), Ok(orange));
        assert_eq!(parse("RGB(230,126,34)"), Ok(orange));
        assert_eq!(parse("230,126,34"), Ok(orange));
        assert_eq!(parse("#fff"), Ok(Rgb::new(255, 255, 255)));
        assert_eq!(parse("hsl(0, 100%, 50%)"), Ok(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn derives_all_representations() {
        let orange = Rgb::new(230, 126, 34);
        assert_eq!(orange.to_hex(), "#E67E22");
        assert_eq!(orange.to_rgb_string(), "rgb(230, 126, 34)");
        assert_eq!(orange.to_hsl().to_hsl_string(), "hsl(28, 80%, 52%)");
    }

    #[test]
    fn rgb_round_trips_through_hsl() {
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(51) {
                    let original = Rgb::new(r as u8, g as u8, b as u8);
                    let back = original.to_hsl().to_rgb();
                    assert!(
                        within_one(original.r, back.r)
                            && within_one(original.g, back.g)
                            && within_one(original.b, back.b),
                        "{original:?} came back as {back:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn hsl_text_round_trips_within_one_point() {
        for literal in ["hsl(28, 80%, 52%)", "hsl(210, 50%, 40%)", "hsl(120, 100%, 25%)"] {
            let parsed = parse_hsl(literal).unwrap();
            let back = parse(literal).unwrap().to_hsl();
            assert!((parsed.h - back.h).abs() <= 1.0, "{literal}: hue {}", back.h);
            assert!((parsed.s - back.s).abs() <= 1.0, "{literal}: sat {}", back.s);
            assert!((parsed.l - back.l).abs() <= 1.0, "{literal}: light {}", back.l);
        }
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        assert_eq!(parse("rgb(300, 0, 0)"), Err(ColorError::OutOfRange("300".to_string())));
        assert!(matches!(parse("hsl(10, 120%, 50%)"), Err(ColorError::OutOfRange(_))));
        assert!(matches!(parse("#12345"), Err(ColorError::InvalidHex(_))));
        assert_eq!(parse("hello"), Err(ColorError::NotAColor));
    }

    #[test]
    fn acceptance_predicate_claims_color_shapes_only() {
        assert!(looks_like_color("#E67E22"));
        assert!(looks_like_color("rgb(1,2,3)"));
        assert!(looks_like_color("300, 0, 0"));
        assert!(!looks_like_color("#zzz"));
        assert!(!looks_like_color("1,2"));
        assert!(!looks_like_color("1+2"));
    }

    #[test]
    fn grey_has_zero_saturation() {
        let grey = Rgb::new(128, 128, 128).to_hsl();
        assert_eq!(grey.s, 0.0);
        assert_eq!(Hsl { h: 0.0, s: 0.0, l: grey.l }.to_rgb(), Rgb::new(128, 128, 128));
    }
}
