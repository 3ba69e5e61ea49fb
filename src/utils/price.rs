//! Price text normalization
//!
//! Turns listing text such as `US $12,345.67` or `EUR 1,5` into a comparable
//! amount. Never fails: anything unparseable becomes `0.0`.

/// Leading decorations stripped before parsing (at most one is removed)
const PRICE_PREFIXES: [&str; 7] = [
    "US",
    "EUR",
    "GBP",
    "ILS",
    "From",
    "Approximately",
    "about",
];

/// Convert price text to a number, returning `0.0` when nothing usable is found
pub fn normalize_price(text: &str) -> f64 {
    let mut price = text.trim();
    if price.is_empty() {
        return 0.0;
    }

    if let Some(prefix) = PRICE_PREFIXES.iter().find(|p| price.starts_with(**p)) {
        price = price[prefix.len()..].trim();
    }

    let mut cleaned: String = price
        .chars()
        .filter_map(|c| match c {
            ',' | '.' => Some(c),
            _ => decimal_digit(c),
        })
        .collect();

    let commas = cleaned.matches(',').count();
    if commas == 1 && !cleaned.contains('.') {
        // "1,5" style decimal comma
        cleaned = cleaned.replace(',', ".");
    } else {
        cleaned = cleaned.replace(',', "");
    }

    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Zero code points of the decimal digit runs seen in listing text
/// (ASCII, Arabic-Indic, Indic scripts, Thai, Lao, Tibetan, Myanmar,
/// Khmer, Mongolian, fullwidth). Each run holds ten consecutive digits.
const DIGIT_ZEROS: [u32; 20] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6,
    0x0C66, 0x0CE6, 0x0D66, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x17E0, 0x1810, 0xFF10,
];

/// ASCII form of a decimal digit from any of the [`DIGIT_ZEROS`] runs
fn decimal_digit(c: char) -> Option<char> {
    let code = c as u32;
    DIGIT_ZEROS
        .iter()
        .find(|zero| (**zero..**zero + 10).contains(&code))
        .and_then(|zero| char::from_digit(code - zero, 10))
}

/// Same as [`normalize_price`] for text that may be missing entirely
pub fn normalize_optional_price(text: Option<&str>) -> f64 {
    text.map_or(0.0, normalize_price)
}
