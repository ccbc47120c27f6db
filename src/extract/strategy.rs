//! Text-to-digits parsing strategies
//!
//! Each strategy is a pure function of the cleaned OCR text. They are ordered
//! from most to least trustworthy; the extractor tries them in sequence.

use regex::Regex;
use std::fmt;
use std::str::FromStr;

use super::Reading;

/// A single way of pulling a reading out of OCR text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Digits with whitespace somewhere between them: "1 5 7 0 9", "157 09"
    Spaced,
    /// A run of exactly N digits not touching other digits: "15709."
    Contiguous,
    /// First N digits found anywhere in the text. Can splice unrelated numbers.
    Pool,
}

impl Strategy {
    /// Cascade order used when nothing is configured
    pub fn default_order() -> Vec<Strategy> {
        vec![Strategy::Spaced, Strategy::Contiguous, Strategy::Pool]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spaced => "spaced",
            Self::Contiguous => "contiguous",
            Self::Pool => "pool",
        }
    }

    pub fn apply(&self, text: &str, patterns: &Patterns) -> Option<Reading> {
        match self {
            Self::Spaced => spaced_digits(text, patterns),
            Self::Contiguous => contiguous_digits(text, patterns),
            Self::Pool => digit_pool(text, patterns.width),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spaced" | "spaced-digits" => Ok(Self::Spaced),
            "contiguous" => Ok(Self::Contiguous),
            "pool" | "digit-pool" => Ok(Self::Pool),
            other => Err(format!("unknown extraction strategy '{}'", other)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regexes compiled for one expected reading width
#[derive(Debug, Clone)]
pub struct Patterns {
    width: usize,
    spaced: Regex,
    contiguous: Regex,
}

impl Patterns {
    pub fn new(width: usize) -> Result<Self, regex::Error> {
        // ASCII classes only: `\d` would also accept other scripts' digits.
        let spaced = Regex::new(&format!(
            r"(?:^|[^0-9])([0-9](?:\s*[0-9]){{{}}})(?:[^0-9]|$)",
            width.saturating_sub(1)
        ))?;
        let contiguous = Regex::new(&format!(r"(?:^|[^0-9])([0-9]{{{}}})(?:[^0-9]|$)", width))?;

        Ok(Self {
            width,
            spaced,
            contiguous,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// Earliest group of exactly `width` digits with optional whitespace between
/// them. A group without any gap is left to the contiguous strategy.
pub fn spaced_digits(text: &str, patterns: &Patterns) -> Option<Reading> {
    let group = patterns.spaced.captures(text)?.get(1)?.as_str();
    if !group.contains(char::is_whitespace) {
        return None;
    }
    let digits: String = group.chars().filter(|c| !c.is_whitespace()).collect();
    Reading::new(digits, patterns.width)
}

/// Earliest run of exactly `width` digits bounded by non-digits
pub fn contiguous_digits(text: &str, patterns: &Patterns) -> Option<Reading> {
    let caps = patterns.contiguous.captures(text)?;
    Reading::new(caps.get(1)?.as_str(), patterns.width)
}

/// First `width` digits in order of appearance
pub fn digit_pool(text: &str, width: usize) -> Option<Reading> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(width)
        .collect();
    Reading::new(digits, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> Patterns {
        Patterns::new(5).unwrap()
    }

    #[test]
    fn test_spaced_collapses_whitespace() {
        let r = spaced_digits("1 5 7 0 9", &five()).unwrap();
        assert_eq!(r.as_str(), "15709");

        let r = spaced_digits("kWh: 1\t5  7\n0 9 .", &five()).unwrap();
        assert_eq!(r.as_str(), "15709");
    }

    #[test]
    fn test_spaced_ignores_contiguous_runs() {
        assert!(spaced_digits("15709.", &five()).is_none());
        assert!(spaced_digits("1 23456", &five()).is_none());
    }

    #[test]
    fn test_spaced_accepts_partial_gaps() {
        for text in ["1 5709", "157 09", "15 7 0 9", "1570\n9 kWh"] {
            let r = spaced_digits(text, &five()).unwrap();
            assert_eq!(r.as_str(), "15709", "{:?}", text);
        }
    }

    #[test]
    fn test_spaced_defers_when_earliest_group_has_no_gap() {
        assert!(spaced_digits("15709 and 4 4 4 4 4", &five()).is_none());
    }

    #[test]
    fn test_spaced_takes_earliest_group() {
        let r = spaced_digits("1 2 3 4 5 and 6 7 8 9 0", &five()).unwrap();
        assert_eq!(r.as_str(), "12345");
    }

    #[test]
    fn test_contiguous_requires_digit_bounds() {
        assert!(contiguous_digits("104103102101", &five()).is_none());
        assert!(contiguous_digits("123456", &five()).is_none());
        let r = contiguous_digits("No.15709kWh", &five()).unwrap();
        assert_eq!(r.as_str(), "15709");
    }

    #[test]
    fn test_contiguous_skips_longer_runs_to_find_exact_one() {
        let r = contiguous_digits("serial 8812345 reading 15709", &five()).unwrap();
        assert_eq!(r.as_str(), "15709");
    }

    #[test]
    fn test_contiguous_earliest_of_adjacent_runs() {
        let r = contiguous_digits("11111 22222", &five()).unwrap();
        assert_eq!(r.as_str(), "11111");
    }

    #[test]
    fn test_pool_takes_first_digits() {
        assert_eq!(digit_pool("a1b2c3d4e5f6", 5).unwrap().as_str(), "12345");
        assert!(digit_pool("1 2 - 3 4", 5).is_none());
    }

    #[test]
    fn test_pool_ignores_non_ascii_digits() {
        // Arabic-Indic digits are not meter digits
        assert!(digit_pool("١٢٣٤٥", 5).is_none());
    }

    #[test]
    fn test_other_widths() {
        let six = Patterns::new(6).unwrap();
        assert_eq!(contiguous_digits("x 123456 y", &six).unwrap().as_str(), "123456");
        assert!(contiguous_digits("x 12345 y", &six).is_none());
        assert_eq!(spaced_digits("1 2 3 4 5 6", &six).unwrap().as_str(), "123456");
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Spaced".parse::<Strategy>(), Ok(Strategy::Spaced));
        assert_eq!("digit-pool".parse::<Strategy>(), Ok(Strategy::Pool));
        assert!("fuzzy".parse::<Strategy>().is_err());
    }
}
