//! Grammar dispatch: decides which single interpreter owns a raw query and
//! turns its output into candidates.
//!
//! Interpreters are tried in a fixed order (text tools, color literals,
//! conversion phrases, arithmetic) and the first acceptance predicate that
//! claims the input wins, even if evaluation later produces nothing.
//! Interpreter failures never leave this module; they become an empty
//! candidate list.

use tracing::debug;

use crate::action_registry::provider_web_search_url;
use crate::calculator::{self, format_number};
use crate::color;
use crate::config::Config;
use crate::currency::{CurrencyError, CurrencyService, CurrencySettings};
use crate::model::{Payload, ResultType, SearchResult, Warning};
use crate::text_tools::{parse_tool, run_tool, Tool, ToolInvocation};
use crate::units;

pub const CALCULATOR_GROUP: &str = "Calculator";
pub const CONVERSION_GROUP: &str = "Conversion";
pub const CURRENCY_GROUP: &str = "Currency";
pub const COLOR_GROUP: &str = "Color";
pub const TEXT_TOOLS_GROUP: &str = "Text Tools";
pub const WEB_GROUP: &str = "Web";
pub const SHELL_GROUP: &str = "Shell";

const INTERPRETER_SCORE: f64 = 1.0;
const TITLE_PREVIEW_CHARS: usize = 96;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Tool(ToolInvocation),
    Color(String),
    Conversion {
        amount: f64,
        from: String,
        to: String,
    },
    Arithmetic(String),
    /// No interpreter claimed the input; only fuzzy matching applies.
    FreeText(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutput {
    pub results: Vec<SearchResult>,
    pub warnings: Vec<Warning>,
}

impl DispatchOutput {
    fn from_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            warnings: Vec::new(),
        }
    }

    fn from_warning(warning: Warning) -> Self {
        Self {
            results: Vec::new(),
            warnings: vec![warning],
        }
    }
}

pub struct DispatchContext<'a> {
    pub config: &'a Config,
    pub currency: &'a CurrencyService,
}

pub fn classify(raw: &str) -> Intent {
    if let Some(invocation) = parse_tool(raw) {
        return Intent::Tool(invocation);
    }
    if color::looks_like_color(raw) {
        return Intent::Color(raw.trim().to_string());
    }
    if let Some((amount, from, to)) = parse_conversion(raw) {
        return Intent::Conversion { amount, from, to };
    }
    if calculator::looks_like_expression(raw) {
        return Intent::Arithmetic(raw.trim().to_string());
    }
    Intent::FreeText(raw.trim().to_string())
}

/// Splits `<signed-decimal>[ ]<source> to <target>`; the number may be glued
/// to the source token (`100km to mi`).
fn parse_conversion(raw: &str) -> Option<(f64, String, String)> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let split_at = lowered.rfind(" to ")?;
    let left = trimmed[..split_at].trim();
    let target = trimmed[split_at + " to ".len()..].trim();
    if target.is_empty() {
        return None;
    }

    let number_len = leading_number_len(left)?;
    let amount = left[..number_len].parse::<f64>().ok()?;
    let source = left[number_len..].trim();
    if source.is_empty() || !amount.is_finite() {
        return None;
    }
    Some((amount, source.to_string(), target.to_string()))
}

fn leading_number_len(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut index = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        index += 1;
    }
    let mut digits = 0;
    let mut seen_dot = false;
    while index < bytes.len() {
        match bytes[index] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        index += 1;
    }
    (digits > 0).then_some(index)
}

pub async fn evaluate(intent: &Intent, ctx: &DispatchContext<'_>) -> DispatchOutput {
    match intent {
        Intent::Tool(invocation) => {
            DispatchOutput::from_results(evaluate_tool(invocation, ctx.config))
        }
        Intent::Color(raw) => DispatchOutput::from_results(evaluate_color(raw)),
        Intent::Conversion { amount, from, to } => {
            evaluate_conversion(*amount, from, to, ctx).await
        }
        Intent::Arithmetic(expr) => DispatchOutput::from_results(evaluate_arithmetic(expr)),
        Intent::FreeText(text) => {
            let qr = qr_result(text, "Query text", ctx.config);
            DispatchOutput::from_results(qr.into_iter().collect())
        }
    }
}

fn evaluate_tool(invocation: &ToolInvocation, cfg: &Config) -> Vec<SearchResult> {
    let argument = invocation.argument.as_str();
    match invocation.tool {
        Tool::WebSearch => match provider_web_search_url(cfg, argument) {
            Some(url) => vec![SearchResult::new(
                format!("Search the web for \"{argument}\""),
                url.clone(),
                WEB_GROUP,
                ResultType::BuiltInCommand,
                Payload::OpenUrl(url),
                INTERPRETER_SCORE,
            )],
            None => {
                debug!("web search provider has no usable template");
                Vec::new()
            }
        },
        Tool::Shell => vec![SearchResult::new(
            format!("Run {argument}"),
            "Shell command",
            SHELL_GROUP,
            ResultType::BuiltInCommand,
            Payload::RunShell(argument.to_string()),
            INTERPRETER_SCORE,
        )],
        tool => match run_tool(invocation) {
            Ok(output) => {
                let mut results = vec![SearchResult::new(
                    preview(&output),
                    tool.label(),
                    TEXT_TOOLS_GROUP,
                    ResultType::TextTool,
                    Payload::CopyText(output.clone()),
                    INTERPRETER_SCORE,
                )];
                results.extend(qr_result(&output, tool.label(), cfg));
                results
            }
            Err(error) => {
                debug!(?tool, %error, "text tool produced no result");
                Vec::new()
            }
        },
    }
}

fn evaluate_color(raw: &str) -> Vec<SearchResult> {
    let rgb = match color::parse(raw) {
        Ok(rgb) => rgb,
        Err(error) => {
            debug!(%error, "color literal rejected");
            return Vec::new();
        }
    };
    [
        (rgb.to_hex(), "HEX"),
        (rgb.to_rgb_string(), "RGB"),
        (rgb.to_hsl().to_hsl_string(), "HSL"),
    ]
    .into_iter()
    .map(|(text, label)| {
        SearchResult::new(
            text.clone(),
            label,
            COLOR_GROUP,
            ResultType::ColorConversion,
            Payload::CopyText(text),
            INTERPRETER_SCORE,
        )
    })
    .collect()
}

async fn evaluate_conversion(
    amount: f64,
    from: &str,
    to: &str,
    ctx: &DispatchContext<'_>,
) -> DispatchOutput {
    if let (Some(source), Some(target)) = (units::lookup(from), units::lookup(to)) {
        return match units::convert_units(amount, source, target) {
            Ok(value) => {
                let formatted = format_number(value);
                DispatchOutput::from_results(vec![SearchResult::new(
                    format!("{formatted} {}", target.symbol),
                    format!("{} {} to {}", format_number(amount), source.symbol, target.symbol),
                    CONVERSION_GROUP,
                    ResultType::UnitConversion,
                    Payload::CopyText(formatted),
                    INTERPRETER_SCORE,
                )])
            }
            Err(error) => {
                debug!(%error, "unit conversion rejected");
                DispatchOutput::default()
            }
        };
    }

    let settings = CurrencySettings::from_config(ctx.config);
    match ctx.currency.convert(amount, from, to, &settings).await {
        Ok(conversion) => {
            let formatted = conversion.formatted_value();
            DispatchOutput::from_results(vec![SearchResult::new(
                formatted.clone(),
                format!(
                    "{} {} to {} at {:.4}",
                    format_number(amount),
                    conversion.from.code,
                    conversion.to.code,
                    conversion.rate
                ),
                CURRENCY_GROUP,
                ResultType::CurrencyConversion,
                Payload::CopyText(formatted),
                INTERPRETER_SCORE,
            )])
        }
        Err(CurrencyError::ConfigurationMissing) => {
            DispatchOutput::from_warning(Warning::CurrencyConfigurationMissing)
        }
        Err(CurrencyError::Network(reason)) => {
            DispatchOutput::from_warning(Warning::CurrencyUnavailable(reason))
        }
        Err(error) => {
            debug!(%error, "conversion phrase produced no result");
            DispatchOutput::default()
        }
    }
}

fn evaluate_arithmetic(expr: &str) -> Vec<SearchResult> {
    match calculator::evaluate(expr) {
        Ok(value) => {
            let formatted = format_number(value);
            vec![SearchResult::new(
                formatted.clone(),
                expr,
                CALCULATOR_GROUP,
                ResultType::Calculator,
                Payload::CopyText(formatted),
                INTERPRETER_SCORE,
            )]
        }
        Err(error) => {
            debug!(%error, "expression produced no result");
            Vec::new()
        }
    }
}

fn qr_result(text: &str, source: &str, cfg: &Config) -> Option<SearchResult> {
    if cfg.qr_threshold == 0 || text.chars().count() < cfg.qr_threshold {
        return None;
    }
    Some(SearchResult::new(
        "Show as QR code",
        source,
        TEXT_TOOLS_GROUP,
        ResultType::TextTool,
        Payload::ShowQr(text.to_string()),
        INTERPRETER_SCORE,
    ))
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    single_line.chars().take(TITLE_PREVIEW_CHARS).collect()
}
