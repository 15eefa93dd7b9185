// Telemetry line protocol - typed events decoded from device lines

/// One decoded line from the device. Every line maps to exactly one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Raw tension reading in oz
    Measurement(f64),
    PeakReport { index: u32, value: f64 },
    PeakReset,
    PowerState { awake: bool },
    Unrecognized(String),
}

/// Classify one raw line. Total: malformed input becomes `Unrecognized`.
pub fn decode(line: &str) -> TelemetryEvent {
    let s = line.trim();

    match s {
        "px" | "pz" => return TelemetryEvent::PeakReset,
        "LP" => return TelemetryEvent::PowerState { awake: false },
        "WU" => return TelemetryEvent::PowerState { awake: true },
        _ => {}
    }

    if let Some(rest) = s.strip_prefix('p') {
        if s.len() > 2 {
            return decode_peak(rest).unwrap_or_else(|| TelemetryEvent::Unrecognized(s.to_string()));
        }
    }

    match parse_decimal(s) {
        Some(value) => TelemetryEvent::Measurement(value),
        None => TelemetryEvent::Unrecognized(s.to_string()),
    }
}

/// `rest` is everything after the leading `p`: one index digit, then the value.
fn decode_peak(rest: &str) -> Option<TelemetryEvent> {
    let mut chars = rest.chars();
    let index = chars.next()?.to_digit(10)?;
    let value = parse_decimal(chars.as_str())?;
    Some(TelemetryEvent::PeakReport { index, value })
}

/// Parse an optionally signed decimal number with at most one `.`.
/// Rejects the forms `f64::from_str` would otherwise accept (`inf`, `NaN`, exponents).
fn parse_decimal(s: &str) -> Option<f64> {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);

    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }

    if digits == 0 || dots > 1 {
        return None;
    }

    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_reset_tokens() {
        assert_eq!(decode("px"), TelemetryEvent::PeakReset);
        assert_eq!(decode("pz"), TelemetryEvent::PeakReset);
        assert_eq!(decode("  px\r\n"), TelemetryEvent::PeakReset);
    }

    #[test]
    fn test_power_state_tokens() {
        assert_eq!(decode("LP"), TelemetryEvent::PowerState { awake: false });
        assert_eq!(decode("WU\n"), TelemetryEvent::PowerState { awake: true });
    }

    #[test]
    fn test_peak_report() {
        assert_eq!(decode("p12.5"), TelemetryEvent::PeakReport { index: 1, value: 2.5 });
        assert_eq!(decode("p0350"), TelemetryEvent::PeakReport { index: 0, value: 350.0 });
        assert_eq!(decode("p3-1.25"), TelemetryEvent::PeakReport { index: 3, value: -1.25 });
    }

    #[test]
    fn test_short_or_malformed_peak_is_unrecognized() {
        assert_eq!(decode("p"), TelemetryEvent::Unrecognized("p".to_string()));
        assert_eq!(decode("p5"), TelemetryEvent::Unrecognized("p5".to_string()));
        assert_eq!(decode("pa12"), TelemetryEvent::Unrecognized("pa12".to_string()));
        assert_eq!(decode("p1abc"), TelemetryEvent::Unrecognized("p1abc".to_string()));
        assert_eq!(decode("p1inf"), TelemetryEvent::Unrecognized("p1inf".to_string()));
    }

    #[test]
    fn test_measurement() {
        assert_eq!(decode("42.0"), TelemetryEvent::Measurement(42.0));
        assert_eq!(decode("-3"), TelemetryEvent::Measurement(-3.0));
        assert_eq!(decode("+7.5"), TelemetryEvent::Measurement(7.5));
        assert_eq!(decode(".5"), TelemetryEvent::Measurement(0.5));
        assert_eq!(decode("1234.56\r\n"), TelemetryEvent::Measurement(1234.56));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(decode("abc"), TelemetryEvent::Unrecognized("abc".to_string()));
        assert_eq!(decode(""), TelemetryEvent::Unrecognized(String::new()));
        assert_eq!(decode("-"), TelemetryEvent::Unrecognized("-".to_string()));
        assert_eq!(decode("1.2.3"), TelemetryEvent::Unrecognized("1.2.3".to_string()));
        assert_eq!(decode("1e5"), TelemetryEvent::Unrecognized("1e5".to_string()));
        assert_eq!(decode("NaN"), TelemetryEvent::Unrecognized("NaN".to_string()));
        assert_eq!(decode("lp"), TelemetryEvent::Unrecognized("lp".to_string()));
    }

    #[test]
    fn test_decode_is_deterministic() {
        for line in ["42", "p12.5", "px", "LP", "WU", "garbage", "", "p", "é€"] {
            assert_eq!(decode(line), decode(line));
        }
    }

    #[test]
    fn test_non_ascii_does_not_panic() {
        assert!(matches!(decode("p€5"), TelemetryEvent::Unrecognized(_)));
        assert!(matches!(decode("€"), TelemetryEvent::Unrecognized(_)));
        assert_eq!(decode("5"), TelemetryEvent::Measurement(5.0));
    }
}
