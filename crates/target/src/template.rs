//! Path templating
//!
//! Object keys and buffer file names come from a user template such as
//! `exports/{stream}/{created_at[year]}/{export_time}`. Tokens resolve
//! against a small namespace: the stream name, the run's export timestamp,
//! today's date, and the stream's declared key properties looked up in the
//! record. A token with a `[component]` suffix parses the field as a
//! datetime and substitutes one unpadded component. Anything unresolvable
//! stays in the path verbatim.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;

use crate::error::TargetError;
use crate::flatten::FlattenedRecord;

/// Template applied when the configuration leaves the path unset
pub const DEFAULT_PATH_SPECIFICATION: &str = "{stream}/{export_time}";

/// Everything a template token can resolve against
pub struct RenderContext<'a> {
    pub stream: &'a str,
    pub record: &'a FlattenedRecord,
    pub key_properties: &'a [String],
    pub export_time: &'a str,
}

enum Segment {
    Literal(String),
    Simple(String),
    Function { name: String, func: String },
}

fn tokenize(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(offset) = rest[start..].find('}') else {
            break;
        };
        let end = start + offset;

        literal.push_str(&rest[..start]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let inner = &rest[start + 1..end];
        match inner.find('[') {
            Some(bracket) if inner.ends_with(']') => segments.push(Segment::Function {
                name: inner[..bracket].to_string(),
                func: inner[bracket + 1..inner.len() - 1].to_string(),
            }),
            _ => segments.push(Segment::Simple(inner.to_string())),
        }

        rest = &rest[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

enum DateComponent {
    Year,
    Month,
    Day,
    Hour,
}

impl DateComponent {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            _ => None,
        }
    }

    fn extract(&self, dt: NaiveDateTime) -> i64 {
        match self {
            Self::Year => i64::from(dt.year()),
            Self::Month => i64::from(dt.month()),
            Self::Day => i64::from(dt.day()),
            Self::Hour => i64::from(dt.hour()),
        }
    }
}

/// Render `template` (or the default) against the context
///
/// Unknown tokens and unknown date components are left in place; a known
/// date token over an unparseable field value is fatal.
pub fn render(template: Option<&str>, ctx: &RenderContext<'_>) -> Result<String, TargetError> {
    let template = template.unwrap_or(DEFAULT_PATH_SPECIFICATION).replace(' ', "");
    let mut out = String::new();

    for segment in tokenize(&template) {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Simple(name) => match lookup(ctx, &name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(&name);
                    out.push('}');
                }
            },
            Segment::Function { name, func } => {
                let resolved = match (lookup(ctx, &name), DateComponent::parse(&func)) {
                    (Some(value), Some(component)) => Some((value, component)),
                    _ => None,
                };
                match resolved {
                    Some((value, component)) => {
                        let dt = parse_datetime(&value).ok_or_else(|| {
                            TargetError::TokenDateParse {
                                token: format!("{name}[{func}]"),
                                value: value.clone(),
                            }
                        })?;
                        out.push_str(&component.extract(dt).to_string());
                    }
                    None => {
                        out.push_str(&format!("{{{name}[{func}]}}"));
                    }
                }
            }
        }
    }

    Ok(out)
}

fn lookup(ctx: &RenderContext<'_>, name: &str) -> Option<String> {
    match name {
        "stream" => Some(ctx.stream.to_string()),
        "export_time" => Some(ctx.export_time.to_string()),
        "export_date" => Some(Local::now().format("%Y-%m-%d").to_string()),
        _ if ctx.key_properties.iter().any(|k| k == name) => {
            ctx.record.get(name).map(scalar_to_string)
        }
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%dT%H%M%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

/// Resolve the local buffer file name for a record
///
/// The rendered path is made filesystem-safe (separators and `=` collapse
/// to single underscores) and suffixed `.jsonl`.
pub fn temp_file_path(
    template: Option<&str>,
    ctx: &RenderContext<'_>,
) -> Result<String, TargetError> {
    let rendered = render(template, ctx)?;
    let safe = rendered
        .replace('/', "_")
        .replace('=', "_")
        .replace("__", "_");
    Ok(format!("{safe}.jsonl"))
}

/// Resolve the remote key split into directory prefix and file name
///
/// The directory part keeps its trailing `/` (or is empty for a bare file
/// name); the configured file name prefix is glued onto the file part.
pub fn target_path(
    template: Option<&str>,
    ctx: &RenderContext<'_>,
    file_prefix: Option<&str>,
) -> Result<(String, String), TargetError> {
    let rendered = render(template, ctx)?;

    let (dir, file) = match rendered.rfind('/') {
        Some(i) => (rendered[..=i].to_string(), rendered[i + 1..].to_string()),
        None => (String::new(), rendered),
    };

    let file = match file_prefix {
        Some(prefix) => format!("{prefix}{file}"),
        None => file,
    };

    Ok((dir, file))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;
