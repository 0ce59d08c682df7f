//! Request validation.
//!
//! Payloads arrive as raw JSON so every field problem can be reported at once,
//! one message per field, each message naming the offending field.

use crate::config::PaginationConfig;
use crate::db::models::{
    IncidentChanges, IncidentFilter, IncidentOrder, IncidentType, NewCamera, NewIncident,
    PageRequest, DEFAULT_THUMBNAIL_URL,
};
use crate::error::Error;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub mod sanitize;

pub use sanitize::{sanitize_str, Sanitize};

pub const TS_ORDER_MESSAGE: &str = "\"tsEnd\" must be greater than or equal to \"tsStart\"";

const INCIDENT_FIELDS: [&str; 6] = [
    "cameraId",
    "type",
    "tsStart",
    "tsEnd",
    "thumbnailUrl",
    "resolved",
];

const CAMERA_FIELDS: [&str; 2] = ["name", "location"];

/// Normalized list-query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentQuery {
    pub filter: IncidentFilter,
    pub order: IncidentOrder,
    pub page: PageRequest,
}

/// Collects field-level messages
#[derive(Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn push(&mut self, message: String) {
        self.0.push(message);
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Error> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(Error::Validation(self.0))
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, Error> {
    body.as_object()
        .ok_or_else(|| Error::invalid("\"value\" must be of type object"))
}

fn reject_unknown(obj: &Map<String, Value>, allowed: &[&str], errors: &mut FieldErrors) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(format!("\"{}\" is not allowed", key));
        }
    }
}

fn positive_int(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<i32> {
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            // 3.0 is fine, 3.5 is not
            n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
        }),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.fract() == 0.0 => Some(f as i64),
            Ok(_) => None,
            Err(_) => {
                errors.push(format!("\"{}\" must be a number", field));
                return None;
            }
        },
        _ => {
            errors.push(format!("\"{}\" must be a number", field));
            return None;
        }
    };

    match number {
        None => {
            errors.push(format!("\"{}\" must be an integer", field));
            None
        }
        Some(n) if n <= 0 => {
            errors.push(format!("\"{}\" must be a positive number", field));
            None
        }
        Some(n) => match i32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(format!("\"{}\" must be a safe number", field));
                None
            }
        },
    }
}

fn incident_type(value: &Value, errors: &mut FieldErrors) -> Option<IncidentType> {
    let parsed = value.as_str().and_then(|s| s.parse::<IncidentType>().ok());
    if parsed.is_none() {
        let allowed: Vec<&str> = IncidentType::ALL.iter().map(|t| t.as_str()).collect();
        errors.push(format!("\"type\" must be one of [{}]", allowed.join(", ")));
    }
    parsed
}

/// RFC 3339 strings or integer epoch milliseconds
fn timestamp(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    if parsed.is_none() {
        errors.push(format!("\"{}\" must be a valid date", field));
    }
    parsed
}

fn non_empty_string(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<String> {
    match value.as_str() {
        None => {
            errors.push(format!("\"{}\" must be a string", field));
            None
        }
        Some(s) if sanitize_str(s).trim().is_empty() => {
            errors.push(format!("\"{}\" is not allowed to be empty", field));
            None
        }
        Some(s) => Some(s.trim().to_string()),
    }
}

fn boolean(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<bool> {
    let parsed = value.as_bool();
    if parsed.is_none() {
        errors.push(format!("\"{}\" must be a boolean", field));
    }
    parsed
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<&'a Value> {
    let value = obj.get(field);
    if value.is_none() {
        errors.push(format!("\"{}\" is required", field));
    }
    value
}

fn check_ts_order(
    ts_start: Option<DateTime<Utc>>,
    ts_end: Option<DateTime<Utc>>,
    errors: &mut FieldErrors,
) {
    if let (Some(start), Some(end)) = (ts_start, ts_end) {
        if end < start {
            errors.push(TS_ORDER_MESSAGE.to_string());
        }
    }
}

/// Validate a create-incident payload and apply its defaults
pub fn validate_new_incident(body: &Value) -> Result<NewIncident, Error> {
    let obj = as_object(body)?;
    let mut errors = FieldErrors::default();
    reject_unknown(obj, &INCIDENT_FIELDS, &mut errors);

    let camera_id =
        required(obj, "cameraId", &mut errors).and_then(|v| positive_int("cameraId", v, &mut errors));
    let incident_type =
        required(obj, "type", &mut errors).and_then(|v| incident_type(v, &mut errors));
    let ts_start =
        required(obj, "tsStart", &mut errors).and_then(|v| timestamp("tsStart", v, &mut errors));
    let ts_end =
        required(obj, "tsEnd", &mut errors).and_then(|v| timestamp("tsEnd", v, &mut errors));
    let thumbnail_url = obj
        .get("thumbnailUrl")
        .and_then(|v| non_empty_string("thumbnailUrl", v, &mut errors));
    let resolved = obj
        .get("resolved")
        .and_then(|v| boolean("resolved", v, &mut errors));

    check_ts_order(ts_start, ts_end, &mut errors);

    errors.finish(|| NewIncident {
        camera_id: camera_id.unwrap_or_default(),
        incident_type: incident_type.unwrap_or(IncidentType::UnauthorisedAccess),
        ts_start: ts_start.unwrap_or_default(),
        ts_end: ts_end.unwrap_or_default(),
        thumbnail_url: thumbnail_url.unwrap_or_else(|| DEFAULT_THUMBNAIL_URL.to_string()),
        resolved: resolved.unwrap_or(false),
    })
}

/// Validate a partial incident update; every field is optional
pub fn validate_incident_patch(body: &Value) -> Result<IncidentChanges, Error> {
    let obj = as_object(body)?;
    let mut errors = FieldErrors::default();
    reject_unknown(obj, &INCIDENT_FIELDS, &mut errors);

    let changes = IncidentChanges {
        camera_id: obj
            .get("cameraId")
            .and_then(|v| positive_int("cameraId", v, &mut errors)),
        incident_type: obj.get("type").and_then(|v| incident_type(v, &mut errors)),
        ts_start: obj
            .get("tsStart")
            .and_then(|v| timestamp("tsStart", v, &mut errors)),
        ts_end: obj.get("tsEnd").and_then(|v| timestamp("tsEnd", v, &mut errors)),
        thumbnail_url: obj
            .get("thumbnailUrl")
            .and_then(|v| non_empty_string("thumbnailUrl", v, &mut errors)),
        resolved: obj
            .get("resolved")
            .and_then(|v| boolean("resolved", v, &mut errors)),
    };

    check_ts_order(changes.ts_start, changes.ts_end, &mut errors);

    errors.finish(|| changes)
}

/// Validate a create-camera payload
pub fn validate_new_camera(body: &Value) -> Result<NewCamera, Error> {
    let obj = as_object(body)?;
    let mut errors = FieldErrors::default();
    reject_unknown(obj, &CAMERA_FIELDS, &mut errors);

    let name = required(obj, "name", &mut errors)
        .and_then(|v| non_empty_string("name", v, &mut errors));
    let location = required(obj, "location", &mut errors)
        .and_then(|v| non_empty_string("location", v, &mut errors));

    errors.finish(|| NewCamera {
        name: name.unwrap_or_default(),
        location: location.unwrap_or_default(),
    })
}

/// Validate list-query parameters
///
/// Empty values count as absent; unrecognised parameters are ignored.
pub fn validate_incident_query(
    params: &HashMap<String, String>,
    limits: &PaginationConfig,
) -> Result<IncidentQuery, Error> {
    let mut errors = FieldErrors::default();
    let param = |name: &str| {
        params
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let resolved = param("resolved").and_then(|v| match v {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            errors.push("\"resolved\" must be a boolean".to_string());
            None
        }
    });

    let camera_id = param("cameraId")
        .and_then(|v| positive_int("cameraId", &Value::String(v.to_string()), &mut errors));

    let page = param("page")
        .map(|v| positive_int("page", &Value::String(v.to_string()), &mut errors))
        .unwrap_or(Some(1));

    let limit = param("limit")
        .map(|v| positive_int("limit", &Value::String(v.to_string()), &mut errors))
        .unwrap_or(Some(limits.default_limit as i32));
    if let Some(limit) = limit {
        if limit as u32 > limits.max_limit {
            errors.push(format!(
                "\"limit\" must be less than or equal to {}",
                limits.max_limit
            ));
        }
    }

    let order = match param("orderBy") {
        None | Some("id") => IncidentOrder::Id,
        Some("tsStart") => IncidentOrder::RecentFirst,
        Some(_) => {
            errors.push("\"orderBy\" must be one of [id, tsStart]".to_string());
            IncidentOrder::Id
        }
    };

    errors.finish(|| IncidentQuery {
        filter: IncidentFilter {
            resolved,
            camera_id,
        },
        order,
        page: PageRequest {
            page: page.unwrap_or(1) as u32,
            limit: limit.unwrap_or(limits.default_limit as i32) as u32,
        },
    })
}

/// Parse a path identifier
pub fn parse_id(raw: &str) -> Result<i32, Error> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| Error::BadRequest("Invalid ID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> Result<IncidentQuery, Error> {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        validate_incident_query(&params, &PaginationConfig::default())
    }

    fn messages(result: Result<impl std::fmt::Debug, Error>) -> Vec<String> {
        match result {
            Err(Error::Validation(messages)) => messages,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn new_incident_gets_defaults() {
        let incident = validate_new_incident(&json!({
            "cameraId": 1,
            "type": "Gun Threat",
            "tsStart": "2024-01-01T00:00:00Z",
            "tsEnd": "2024-01-01T00:05:00Z"
        }))
        .unwrap();

        assert_eq!(incident.camera_id, 1);
        assert_eq!(incident.incident_type, IncidentType::GunThreat);
        assert!(!incident.resolved);
        assert_eq!(incident.thumbnail_url, DEFAULT_THUMBNAIL_URL);
        assert_eq!(
            (incident.ts_end - incident.ts_start).num_minutes(),
            5
        );
    }

    #[test]
    fn unknown_type_names_the_type_field() {
        let errors = messages(validate_new_incident(&json!({
            "cameraId": 1,
            "type": "Traffic congestion",
            "tsStart": "2024-01-01T00:00:00Z",
            "tsEnd": "2024-01-01T00:05:00Z"
        })));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("\"type\""));
    }

    #[test]
    fn all_field_errors_are_reported_together() {
        let errors = messages(validate_new_incident(&json!({
            "cameraId": -3,
            "tsStart": "yesterday",
            "resolved": "yes",
            "colour": "red"
        })));
        assert!(errors.contains(&"\"colour\" is not allowed".to_string()));
        assert!(errors.contains(&"\"cameraId\" must be a positive number".to_string()));
        assert!(errors.contains(&"\"type\" is required".to_string()));
        assert!(errors.contains(&"\"tsStart\" must be a valid date".to_string()));
        assert!(errors.contains(&"\"tsEnd\" is required".to_string()));
        assert!(errors.contains(&"\"resolved\" must be a boolean".to_string()));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let errors = messages(validate_new_incident(&json!({
            "cameraId": 1,
            "type": "Face Recognised",
            "tsStart": "2024-01-01T00:05:00Z",
            "tsEnd": "2024-01-01T00:00:00Z"
        })));
        assert_eq!(errors, vec![TS_ORDER_MESSAGE.to_string()]);
    }

    #[test]
    fn epoch_millis_are_accepted() {
        let incident = validate_new_incident(&json!({
            "cameraId": "2",
            "type": "Unauthorised Access",
            "tsStart": 1_704_067_200_000i64,
            "tsEnd": 1_704_067_260_000i64
        }))
        .unwrap();
        assert_eq!(incident.camera_id, 2);
        assert_eq!(incident.ts_start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn body_must_be_an_object() {
        let errors = messages(validate_new_incident(&json!([1, 2])));
        assert_eq!(errors, vec!["\"value\" must be of type object".to_string()]);
    }

    #[test]
    fn patch_accepts_a_single_field() {
        let changes = validate_incident_patch(&json!({ "resolved": true })).unwrap();
        assert_eq!(changes.resolved, Some(true));
        assert_eq!(changes.camera_id, None);
        assert!(validate_incident_patch(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let errors = messages(validate_incident_patch(&json!({ "id": 4 })));
        assert_eq!(errors, vec!["\"id\" is not allowed".to_string()]);
    }

    #[test]
    fn camera_requires_name_and_location() {
        let errors = messages(validate_new_camera(&json!({ "name": "  " })));
        assert!(errors.contains(&"\"name\" is not allowed to be empty".to_string()));
        assert!(errors.contains(&"\"location\" is required".to_string()));

        let camera = validate_new_camera(&json!({ "name": "Vault", "location": "Backroom" })).unwrap();
        assert_eq!(camera.name, "Vault");
    }

    #[test]
    fn query_defaults() {
        let q = query(&[]).unwrap();
        assert_eq!(q.filter, IncidentFilter::default());
        assert_eq!(q.order, IncidentOrder::Id);
        assert_eq!(q.page, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn query_parses_filters() {
        let q = query(&[
            ("resolved", "false"),
            ("cameraId", "3"),
            ("page", "2"),
            ("limit", "25"),
            ("orderBy", "tsStart"),
            ("unrelated", "x"),
        ])
        .unwrap();
        assert_eq!(q.filter.resolved, Some(false));
        assert_eq!(q.filter.camera_id, Some(3));
        assert_eq!(q.order, IncidentOrder::RecentFirst);
        assert_eq!(q.page, PageRequest { page: 2, limit: 25 });
    }

    #[test]
    fn empty_resolved_means_no_filter() {
        let q = query(&[("resolved", "")]).unwrap();
        assert_eq!(q.filter.resolved, None);
    }

    #[test]
    fn query_rejects_bad_values() {
        let errors = messages(query(&[
            ("resolved", "maybe"),
            ("page", "0"),
            ("limit", "500"),
            ("orderBy", "name"),
        ]));
        assert!(errors.contains(&"\"resolved\" must be a boolean".to_string()));
        assert!(errors.contains(&"\"page\" must be a positive number".to_string()));
        assert!(errors.contains(&"\"limit\" must be less than or equal to 100".to_string()));
        assert!(errors.contains(&"\"orderBy\" must be one of [id, tsStart]".to_string()));

        let errors = messages(query(&[("page", "two")]));
        assert_eq!(errors, vec!["\"page\" must be a number".to_string()]);
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(Error::BadRequest(_))));
        assert!(matches!(parse_id("-1"), Err(Error::BadRequest(_))));
    }
}
