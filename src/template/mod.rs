//! Table-name and SQL templating.
//!
//! A template is literal text mixed with two kinds of tokens:
//!
//! * `@N` (N >= 1) expands to field N of the record, or nothing when the
//!   record is shorter. Digits are read greedily, so `@12` always names field
//!   12 and never field 1 followed by a literal `2`.
//! * `#` expands to the record's time column, read and re-rendered with the
//!   configured [`DatePattern`].
//!
//! An `@` that is not followed by a positive number stays literal text.

mod date_pattern;

pub use date_pattern::DatePattern;

use crate::db::sql_utils::is_safe_table_name;
use crate::db_types::Record;
use crate::error::EvaluationError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(usize),
    Time,
}

/// Where the `#` token takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSource {
    /// 1-based field index.
    pub column: usize,
    pub pattern: DatePattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTemplate {
    source: String,
    segments: Vec<Segment>,
    time: Option<TimeSource>,
}

impl TableTemplate {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '@' => {
                    let mut digits = String::new();
                    while let Some(next) = chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(next);
                        chars.next();
                    }
                    match digits.parse::<usize>() {
                        Ok(index) if index > 0 => {
                            flush_literal(&mut segments, &mut literal);
                            segments.push(Segment::Field(index));
                        }
                        _ => {
                            literal.push('@');
                            literal.push_str(&digits);
                        }
                    }
                }
                '#' => {
                    flush_literal(&mut segments, &mut literal);
                    segments.push(Segment::Time);
                }
                other => literal.push(other),
            }
        }
        flush_literal(&mut segments, &mut literal);

        Self {
            source: source.to_string(),
            segments,
            time: None,
        }
    }

    pub fn with_time_source(mut self, time: Option<TimeSource>) -> Self {
        self.time = time;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    #[cfg(test)]
    pub fn time_source(&self) -> Option<&TimeSource> {
        self.time.as_ref()
    }

    pub fn references_fields(&self) -> bool {
        self.highest_field() > 0
    }

    pub fn highest_field(&self) -> usize {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Field(index) => Some(*index),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn uses_time(&self) -> bool {
        self.segments.contains(&Segment::Time)
    }

    /// Expands every token against `record`.
    ///
    /// The time column is only read when the template contains `#`; without a
    /// configured time source a `#` is emitted unchanged.
    pub fn evaluate(&self, record: &Record) -> Result<String, EvaluationError> {
        let mut output = String::with_capacity(self.source.len());
        let mut time_value: Option<String> = None;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Field(index) => output.push_str(record.field(index - 1)),
                Segment::Time => match &self.time {
                    Some(source) => {
                        if time_value.is_none() {
                            time_value = Some(render_time(source, record)?);
                        }
                        output.push_str(time_value.as_deref().unwrap_or_default());
                    }
                    None => output.push('#'),
                },
            }
        }

        Ok(output)
    }

    /// Evaluates the template and checks the result can be spliced into SQL
    /// as a table name.
    pub fn table_name(&self, record: &Record) -> Result<String, EvaluationError> {
        let name = self.evaluate(record)?;
        if !is_safe_table_name(&name) {
            return Err(EvaluationError::UnsafeTableName(name));
        }
        Ok(name)
    }
}

fn render_time(source: &TimeSource, record: &Record) -> Result<String, EvaluationError> {
    if source.column == 0 || source.column > record.len() {
        return Err(EvaluationError::TimeColumnOutOfRange {
            column: source.column,
            fields: record.len(),
        });
    }

    let value = record.field(source.column - 1);
    source
        .pattern
        .reformat(value)
        .ok_or_else(|| EvaluationError::UnparsableTime {
            value: value.to_string(),
            pattern: source.pattern.as_str().to_string(),
        })
}

fn flush_literal(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

#[cfg(test)]
mod tests;
