use crate::error::ConfigError;
use chrono::format::{parse_and_remainder, Item, Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

/// A `yyyy-MM-dd HH:mm:ss.SSS` style date pattern used both to read the time
/// column and to render the table-name suffix.
///
/// The pattern is translated once into a chrono format string. Parsing only
/// needs to match a prefix of the input; whatever follows the last pattern
/// item is ignored, so `yyyy` reads `2024-01-01` as the year 2024. Numbers
/// read at most their natural width (four digits for a year, two for the
/// other fields, exactly three for `S`). Fields the pattern does not mention
/// default to `1970-01-01 00:00:00.000` and a two-digit year is read as
/// `2000 + yy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    format: String,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDatePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut format = String::new();
        let mut has_field = false;
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == '\'' {
                let mut quoted = String::new();
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            quoted.push('\'');
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    quoted.push(next);
                }
                if !closed {
                    return Err(invalid("unterminated quoted literal"));
                }
                if quoted.is_empty() {
                    // '' outside a quoted section is an escaped quote
                    quoted.push('\'');
                }
                push_literal(&mut format, &quoted);
                continue;
            }

            if ch.is_ascii_alphabetic() {
                let mut width = 1;
                while chars.peek() == Some(&ch) {
                    chars.next();
                    width += 1;
                }
                let specifier = match (ch, width) {
                    ('y', 1..=2) => "%y",
                    ('y', _) => "%Y",
                    ('M', 1) => "%-m",
                    ('M', 2) => "%m",
                    ('M', _) => return Err(invalid("textual months are not supported")),
                    ('d', 1) => "%-d",
                    ('d', _) => "%d",
                    ('H', 1) => "%-H",
                    ('H', _) => "%H",
                    ('m', 1) => "%-M",
                    ('m', _) => "%M",
                    ('s', 1) => "%-S",
                    ('s', _) => "%S",
                    ('S', _) => "%3f",
                    (other, _) => {
                        return Err(invalid(&format!("unsupported pattern letter '{}'", other)))
                    }
                };
                format.push_str(specifier);
                has_field = true;
                continue;
            }

            push_literal(&mut format, &ch.to_string());
        }

        if !has_field {
            return Err(invalid("pattern contains no date fields"));
        }
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(invalid("pattern cannot be translated"));
        }

        Ok(Self {
            source: pattern.to_string(),
            format,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn parse(&self, input: &str) -> Option<NaiveDateTime> {
        let mut parsed = Parsed::new();
        parse_and_remainder(&mut parsed, input, StrftimeItems::new(&self.format)).ok()?;

        let year = parsed
            .year()
            .or_else(|| parsed.year_mod_100().map(|yy| 2000 + yy))
            .unwrap_or(1970);
        let hour = parsed.hour_div_12().unwrap_or(0) * 12 + parsed.hour_mod_12().unwrap_or(0);

        NaiveDate::from_ymd_opt(year, parsed.month().unwrap_or(1), parsed.day().unwrap_or(1))?
            .and_hms_nano_opt(
                hour,
                parsed.minute().unwrap_or(0),
                parsed.second().unwrap_or(0),
                parsed.nanosecond().unwrap_or(0),
            )
    }

    pub fn format(&self, value: &NaiveDateTime) -> String {
        value
            .format_with_items(StrftimeItems::new(&self.format))
            .to_string()
    }

    /// Parses `input` and renders it back through the same pattern.
    pub fn reformat(&self, input: &str) -> Option<String> {
        self.parse(input).map(|value| self.format(&value))
    }
}

fn push_literal(format: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '%' {
            format.push_str("%%");
        } else {
            format.push(ch);
        }
    }
}
