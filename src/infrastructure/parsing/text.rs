//! Text normalization helpers shared by the extraction handlers
//!
//! Slug derivation and price parsing are part of the persistence contract
//! (slugs are natural keys), so they live here rather than inside any one
//! parser.

use std::sync::OnceLock;

use regex::Regex;

// Same shape the source site uses: optional symbol, then digits/commas/dots.
fn price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([£$€])?([\d.,]+)").expect("price pattern"))
}

fn decimal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("decimal pattern"))
}

fn integer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").expect("integer pattern"))
}

/// Parsed price with its detected currency
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    /// Monetary amount rounded to 2 decimals
    pub amount: f64,
    /// ISO 4217 code; GBP when the symbol is absent or unrecognized
    pub currency: String,
}

/// Derive a URL-safe slug from display text.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single hyphen and trims leading/trailing hyphens. Deterministic and
/// idempotent: slugifying a slug yields the same slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Parse a displayed price label like `£12.99`, `$1,299.00` or `14,99`.
///
/// Recognizes an optional leading currency symbol (£ -> GBP, $ -> USD,
/// € -> EUR, anything else defaults to GBP) followed by a decimal amount.
/// A lone comma followed by two digits is a decimal comma; any other comma
/// is a thousands separator and is stripped. Returns `None` when no numeric
/// token is present.
pub fn parse_price(label: &str) -> Option<ParsedPrice> {
    let caps = price_pattern().captures(label.trim())?;

    let raw = caps.get(2)?.as_str();
    let normalized = if !raw.contains('.') && raw.matches(',').count() == 1 {
        match raw.split_once(',') {
            Some((_, frac)) if frac.len() == 2 => raw.replace(',', "."),
            _ => raw.replace(',', ""),
        }
    } else {
        raw.replace(',', "")
    };
    let amount: f64 = normalized.parse().ok()?;
    let currency = match caps.get(1).map(|m| m.as_str()) {
        Some("$") => "USD",
        Some("€") => "EUR",
        _ => "GBP",
    };

    Some(ParsedPrice {
        amount: (amount * 100.0).round() / 100.0,
        currency: currency.to_string(),
    })
}

/// Extract the digits of a label like "(1,204 products)" as a count.
///
/// Every non-digit character is discarded; an empty result defaults to 0.
pub fn parse_count(label: &str) -> i64 {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// First decimal-like token in a label ("4.5 out of 5" -> 4.5)
pub fn first_decimal_token(label: &str) -> Option<f64> {
    let caps = decimal_pattern().captures(label)?;
    caps.get(1)?.as_str().parse().ok()
}

/// First integer-like token in a label ("1,204" is read as 1)
pub fn first_integer_token(label: &str) -> Option<i64> {
    let caps = integer_pattern().captures(label)?;
    caps.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_symbol_runs() {
        assert_eq!(slugify("Science Fiction & Fantasy"), "science-fiction-fantasy");
        assert_eq!(slugify("Children's Books"), "children-s-books");
        assert_eq!(slugify("  Crime / Thriller  "), "crime-thriller");
    }

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify("Science Fiction & Fantasy");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn slugify_trims_edge_hyphens() {
        assert_eq!(slugify("-- New In! --"), "new-in");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn price_detects_currency_symbols() {
        assert_eq!(
            parse_price("£12.99"),
            Some(ParsedPrice { amount: 12.99, currency: "GBP".into() })
        );
        assert_eq!(
            parse_price("$9.99"),
            Some(ParsedPrice { amount: 9.99, currency: "USD".into() })
        );
        assert_eq!(
            parse_price("€7.50"),
            Some(ParsedPrice { amount: 7.5, currency: "EUR".into() })
        );
    }

    #[test]
    fn price_defaults_to_gbp_without_symbol() {
        let parsed = parse_price("14,99").expect("numeric label");
        assert_eq!(parsed.currency, "GBP");
        assert_eq!(parsed.amount, 14.99);
    }

    #[test]
    fn price_reads_lone_comma_with_two_digits_as_decimal() {
        assert_eq!(parse_price("1,299").map(|p| p.amount), Some(1299.0));
        assert_eq!(parse_price("€7,50").map(|p| p.amount), Some(7.5));
    }

    #[test]
    fn price_strips_thousands_separators() {
        let parsed = parse_price("£1,299.00").expect("numeric label");
        assert_eq!(parsed.amount, 1299.0);
        assert_eq!(parsed.currency, "GBP");
    }

    #[test]
    fn price_rejects_non_numeric_labels() {
        assert_eq!(parse_price("Out of stock"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn count_keeps_digits_only() {
        assert_eq!(parse_count("(1,204 products)"), 1204);
        assert_eq!(parse_count("no count here"), 0);
    }

    #[test]
    fn token_helpers_take_first_match() {
        assert_eq!(first_decimal_token("4.5 out of 5 stars"), Some(4.5));
        assert_eq!(first_decimal_token("no rating"), None);
        assert_eq!(first_integer_token("12 reviews"), Some(12));
        assert_eq!(first_integer_token("reviews"), None);
    }
}
