//! Parsing of Kubernetes-style CPU and memory resource strings.

/// Parse a CPU quantity into millicores.
///
/// `"500m"` → `500.0`, `"1"` → `1000.0`, `"1.5"` → `1500.0`.
#[must_use]
pub fn parse_cpu_millicores(raw: &str) -> f64 {
    let raw = raw.trim();
    if let Some(milli) = raw.strip_suffix('m') {
        milli.parse().unwrap_or(0.0)
    } else {
        raw.parse::<f64>().unwrap_or(0.0) * 1000.0
    }
}

/// Binary/decimal unit suffixes recognized in memory quantities, largest first so
/// that e.g. `Gi` is not mistaken for a bare numeric suffix.
const UNITS: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("K", 1000.0),
    ("M", 1000.0 * 1000.0),
    ("G", 1000.0 * 1000.0 * 1000.0),
];

/// Parse a memory quantity into bytes.
///
/// Recognizes the `Ki`/`Mi`/`Gi` binary and `K`/`M`/`G` decimal suffixes; a bare
/// number is taken as a byte count.
#[must_use]
pub fn parse_memory_bytes(raw: &str) -> f64 {
    let raw = raw.trim();
    for (suffix, multiplier) in UNITS {
        if let Some(num) = raw.strip_suffix(suffix) {
            return num.parse::<f64>().unwrap_or(0.0) * multiplier;
        }
    }
    raw.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_millicores() {
        assert_eq!(parse_cpu_millicores("500m"), 500.0);
        assert_eq!(parse_cpu_millicores("1"), 1000.0);
        assert_eq!(parse_cpu_millicores("1.5"), 1500.0);
    }

    #[test]
    fn memory_units() {
        assert_eq!(parse_memory_bytes("1Ki"), 1024.0);
        assert_eq!(parse_memory_bytes("1Mi"), 1024.0 * 1024.0);
        assert_eq!(parse_memory_bytes("1Gi"), 1024.0 * 1024.0 * 1024.0);
        assert_eq!(parse_memory_bytes("1K"), 1000.0);
        assert_eq!(parse_memory_bytes("1G"), 1_000_000_000.0);
        assert_eq!(parse_memory_bytes("512"), 512.0);
    }
}
