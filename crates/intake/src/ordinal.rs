//! Spoken number parsing for ordinal selection
//!
//! Transcribers hand over whatever the caller said: "2", "number two", "the second one",
//! "twenty-one". Words before the number are skipped; at least one digit token or number
//! word has to be present.

/// Value of a number word, and whether it is an ordinal ("second").
fn word_value(word: &str) -> Option<(u64, bool)> {
    let cardinal = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => {
            let ordinal = match word {
                "first" => 1,
                "second" => 2,
                "third" => 3,
                "fourth" => 4,
                "fifth" => 5,
                "sixth" => 6,
                "seventh" => 7,
                "eighth" => 8,
                "ninth" => 9,
                "tenth" => 10,
                "eleventh" => 11,
                "twelfth" => 12,
                "thirteenth" => 13,
                "fourteenth" => 14,
                "fifteenth" => 15,
                "sixteenth" => 16,
                "seventeenth" => 17,
                "eighteenth" => 18,
                "nineteenth" => 19,
                "twentieth" => 20,
                "thirtieth" => 30,
                "fortieth" => 40,
                "fiftieth" => 50,
                "sixtieth" => 60,
                "seventieth" => 70,
                "eightieth" => 80,
                "ninetieth" => 90,
                _ => return None,
            };
            return Some((ordinal, true));
        }
    };
    Some((cardinal, false))
}

fn scale_value(word: &str) -> Option<(u64, bool)> {
    match word {
        "hundred" => Some((100, false)),
        "thousand" => Some((1_000, false)),
        "million" => Some((1_000_000, false)),
        "hundredth" => Some((100, true)),
        "thousandth" => Some((1_000, true)),
        "millionth" => Some((1_000_000, true)),
        _ => None,
    }
}

/// "2", "2nd", "21st" -> digits; anything else -> None
fn digit_token(token: &str) -> Option<u64> {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let suffix = &token[digits.len()..];
    if !matches!(suffix, "" | "st" | "nd" | "rd" | "th") {
        return None;
    }
    digits.parse().ok()
}

/// One contiguous spoken number, built up word by word.
#[derive(Debug, Default)]
struct Phrase {
    total: u64,
    current: u64,
    started: bool,
}

impl Phrase {
    /// Whether `value` continues the phrase ("twenty" then "one", "hundred" then "five")
    /// rather than starting a separate number ("two" then "three").
    fn accepts(&self, value: u64) -> bool {
        if !self.started {
            return true;
        }
        let low = self.current % 100;
        if value < 10 {
            low == 0 || (low >= 20 && low % 10 == 0)
        } else {
            low == 0
        }
    }

    fn add(&mut self, value: u64) -> Option<()> {
        self.current = self.current.checked_add(value)?;
        self.started = true;
        Some(())
    }

    fn scale(&mut self, scale: u64) -> Option<()> {
        // bare "hundred" means one hundred
        if self.current == 0 {
            self.current = 1;
        }
        if scale == 100 {
            self.current = self.current.checked_mul(scale)?;
        } else {
            self.total = self.total.checked_add(self.current.checked_mul(scale)?)?;
            self.current = 0;
        }
        self.started = true;
        Some(())
    }

    fn value(&self) -> Option<u64> {
        if !self.started {
            return None;
        }
        self.total.checked_add(self.current)
    }
}

/// Parse a cardinal (or ordinal) number out of a transcribed utterance.
///
/// Only the first number is read. An ordinal closes it, so in "the second one" the
/// trailing "one" is a pronoun, and "two, no, three" reads as 2.
pub fn parse_cardinal(text: &str) -> Option<u64> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        // "twenty-one", "2.", "#2"
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut phrase = Phrase::default();

    for token in normalized.split_whitespace() {
        if let Some((value, ordinal)) = word_value(token) {
            if !phrase.accepts(value) {
                break;
            }
            phrase.add(value)?;
            if ordinal {
                break;
            }
        } else if let Some((scale, ordinal)) = scale_value(token) {
            phrase.scale(scale)?;
            if ordinal {
                break;
            }
        } else if phrase.started {
            if token != "and" {
                break;
            }
        } else if let Some(value) = digit_token(token) {
            return Some(value);
        }
    }

    phrase.value()
}

#[cfg(test)]
mod tests {
    use super::parse_cardinal;

    #[test]
    fn digits_are_accepted() {
        assert_eq!(parse_cardinal("3"), Some(3));
        assert_eq!(parse_cardinal(" 12 "), Some(12));
        assert_eq!(parse_cardinal("Number 2."), Some(2));
        assert_eq!(parse_cardinal("the 2nd one"), Some(2));
    }

    #[test]
    fn spelled_out_cardinals() {
        assert_eq!(parse_cardinal("one"), Some(1));
        assert_eq!(parse_cardinal("Two."), Some(2));
        assert_eq!(parse_cardinal("number four"), Some(4));
        assert_eq!(parse_cardinal("twenty-one"), Some(21));
        assert_eq!(parse_cardinal("one hundred and five"), Some(105));
        assert_eq!(parse_cardinal("two thousand three hundred"), Some(2300));
    }

    #[test]
    fn spoken_ordinals() {
        assert_eq!(parse_cardinal("the first one"), Some(1));
        assert_eq!(parse_cardinal("I'd like the third"), Some(3));
        assert_eq!(parse_cardinal("twenty first"), Some(21));
    }

    #[test]
    fn only_the_first_number_is_read() {
        assert_eq!(parse_cardinal("the second one please"), Some(2));
        assert_eq!(parse_cardinal("number two, no, three"), Some(2));
        assert_eq!(parse_cardinal("two three"), Some(2));
        assert_eq!(parse_cardinal("twenty twenty"), Some(20));
        assert_eq!(parse_cardinal("three hundred and twelfth"), Some(312));
    }

    #[test]
    fn no_number_present() {
        assert_eq!(parse_cardinal(""), None);
        assert_eq!(parse_cardinal("the one with Bill"), Some(1));
        assert_eq!(parse_cardinal("Bill Gates please"), None);
        assert_eq!(parse_cardinal("2x"), None);
    }

    #[test]
    fn zero_parses_for_range_check() {
        assert_eq!(parse_cardinal("zero"), Some(0));
        assert_eq!(parse_cardinal("0"), Some(0));
    }
}
