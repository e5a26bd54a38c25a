//! Argument rewriting applied before a tool is invoked.
//!
//! Only the fields a rule touches are inspected; everything else in the
//! argument map passes through untouched.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::tools::registry::{ArgShape, ToolSpec};

const LOCAL_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];
const EVENT_TIME_FIELDS: [&str; 2] = ["start", "end"];
const ZONE_FIELD: &str = "timeZone";

/// Arguments after normalization, plus anything worth telling the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub args: Map<String, Value>,
    pub warnings: Vec<String>,
}

/// Apply every rule that applies to `spec`.
pub fn normalize(
    spec: &ToolSpec,
    mut args: Map<String, Value>,
    identity: Option<&str>,
    default_zone: Tz,
) -> Normalized {
    if let Some(param) = spec.identity_param {
        inject_identity(&mut args, param, identity);
    }
    let warnings = match spec.shape {
        ArgShape::Plain => Vec::new(),
        ArgShape::CalendarEvent => coerce_event_times(&mut args, default_zone),
    };
    Normalized { args, warnings }
}

/// Fill `param` from the caller identity when the model left it out or null.
///
/// An explicitly supplied value is never replaced. Returns whether anything
/// was injected.
pub fn inject_identity(
    args: &mut Map<String, Value>,
    param: &str,
    identity: Option<&str>,
) -> bool {
    let Some(identity) = identity else {
        return false;
    };
    match args.get(param) {
        Some(Value::Null) | None => {
            args.insert(param.to_string(), Value::String(identity.to_string()));
            true
        }
        Some(_) => false,
    }
}

/// A timestamp with a date/time separator but neither a UTC marker nor an
/// explicit offset.
pub fn is_bare_local(value: &str) -> bool {
    let Some((_, time)) = value.split_once('T') else {
        return false;
    };
    !time.ends_with(['Z', 'z']) && !time.contains(['+', '-'])
}

/// Attach `zone`'s offset to a bare local timestamp.
pub fn localize(value: &str, zone: Tz) -> Result<String, String> {
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("could not parse `{value}` as a local datetime"))?;
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.to_rfc3339())
        .ok_or_else(|| format!("`{value}` does not exist in {zone}"))
}

/// Best-effort zone attachment for calendar-event start/end values.
///
/// Failures leave the original string in place and produce a warning.
pub fn coerce_event_times(args: &mut Map<String, Value>, default_zone: Tz) -> Vec<String> {
    let mut warnings = Vec::new();

    let zone = match args.get(ZONE_FIELD).and_then(Value::as_str) {
        None => Ok(default_zone),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| format!("unknown time zone `{name}`")),
    };

    for field in EVENT_TIME_FIELDS {
        let Some(raw) = args.get(field).and_then(Value::as_str).map(str::to_owned) else {
            continue;
        };
        if !is_bare_local(&raw) {
            continue;
        }
        let outcome = zone.clone().and_then(|tz| localize(&raw, tz));
        match outcome {
            Ok(localized) => {
                args.insert(field.to_string(), Value::String(localized));
            }
            Err(reason) => {
                tracing::warn!(field, value = %raw, %reason, "Leaving event time unchanged");
                warnings.push(format!("{field}: {reason}; value passed through unchanged"));
            }
        }
    }
    warnings
}
