use std::collections::BTreeSet;

pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<u16> = 5..=100;
pub const DEBOUNCE_MS_RANGE: std::ops::RangeInclusive<u64> = 0..=1000;

/// Normalizes a command hotkey to `Ctrl+Alt+Shift+Key` order.
pub fn validate_hotkey(input: &str) -> Result<String, String> {
    let raw_parts: Vec<&str> = input
        .split('+')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();

    if raw_parts.len() < 2 {
        return Err("Hotkey must include at least one modifier and one key.".to_string());
    }

    let key_raw = raw_parts[raw_parts.len() - 1];
    let key = normalize_key(key_raw)?;

    let mut modifiers: BTreeSet<&'static str> = BTreeSet::new();
    for part in &raw_parts[..raw_parts.len() - 1] {
        let modifier = normalize_modifier(part)?;
        modifiers.insert(modifier);
    }

    let canonical = canonical_hotkey(&modifiers, &key);
    if is_reserved_hotkey(&canonical) {
        return Err(format!("Hotkey '{canonical}' is reserved by the desktop. Choose a different one."));
    }

    Ok(canonical)
}

pub fn validate_max_results(value: u16) -> Result<(), String> {
    if MAX_RESULTS_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Max results must be between {} and {}.",
            MAX_RESULTS_RANGE.start(),
            MAX_RESULTS_RANGE.end()
        ))
    }
}

pub fn validate_debounce_ms(value: u64) -> Result<(), String> {
    if DEBOUNCE_MS_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Debounce must be between {} and {} ms.",
            DEBOUNCE_MS_RANGE.start(),
            DEBOUNCE_MS_RANGE.end()
        ))
    }
}

fn normalize_modifier(input: &str) -> Result<&'static str, String> {
    match input.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Ok("Ctrl"),
        "alt" | "option" => Ok("Alt"),
        "shift" => Ok("Shift"),
        "win" | "windows" | "meta" | "super" | "cmd" => Ok("Meta"),
        _ => Err(format!("Unsupported modifier '{input}'. Use Ctrl, Alt, Shift, or Meta.")),
    }
}

fn normalize_key(input: &str) -> Result<String, String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err("Hotkey key is required.".to_string());
    }

    let upper = raw.to_ascii_uppercase();
    if upper == "SPACE" {
        return Ok("Space".to_string());
    }

    if let Some(number) = upper.strip_prefix('F') {
        if let Ok(parsed) = number.parse::<u8>() {
            if (1..=24).contains(&parsed) {
                return Ok(format!("F{parsed}"));
            }
            return Err("Function key must be between F1 and F24.".to_string());
        }
    }

    if upper.len() == 1 {
        let c = upper.chars().next().unwrap_or_default();
        if c.is_ascii_alphanumeric() {
            return Ok(upper);
        }
    }

    Err("Key must be A-Z, 0-9, Space, or F1-F24.".to_string())
}

fn canonical_hotkey(modifiers: &BTreeSet<&'static str>, key: &str) -> String {
    let mut ordered = Vec::new();
    for modifier in ["Ctrl", "Alt", "Shift", "Meta"] {
        if modifiers.contains(modifier) {
            ordered.push(modifier);
        }
    }
    ordered.push(key);
    ordered.join("+")
}

fn is_reserved_hotkey(canonical: &str) -> bool {
    matches!(
        canonical,
        "Alt+Tab" | "Alt+F4" | "Ctrl+Alt+Delete" | "Alt+Space" | "Meta+L" | "Meta+Tab"
    )
}

#[cfg(test)]
mod tests {
    use super::{validate_debounce_ms, validate_hotkey, validate_max_results};

    #[test]
    fn hotkeys_are_canonicalized() {
        assert_eq!(validate_hotkey("shift+ctrl+k"), Ok("Ctrl+Shift+K".to_string()));
        assert_eq!(validate_hotkey("Alt + f5"), Ok("Alt+F5".to_string()));
        assert_eq!(validate_hotkey("cmd+space"), Ok("Meta+Space".to_string()));
    }

    #[test]
    fn invalid_and_reserved_hotkeys_are_rejected() {
        assert!(validate_hotkey("K").is_err());
        assert!(validate_hotkey("Hyper+K").is_err());
        assert!(validate_hotkey("Ctrl+F30").is_err());
        assert!(validate_hotkey("alt+tab").is_err());
    }

    #[test]
    fn ranges_are_enforced() {
        assert!(validate_max_results(20).is_ok());
        assert!(validate_max_results(4).is_err());
        assert!(validate_max_results(101).is_err());
        assert!(validate_debounce_ms(40).is_ok());
        assert!(validate_debounce_ms(5000).is_err());
    }
}
