use crate::db::models::{IncidentChanges, NewCamera, NewIncident};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is a valid regex"));

/// Remove markup tags and escape whatever angle brackets remain
pub fn sanitize_str(input: &str) -> String {
    TAG_PATTERN
        .replace_all(input, "")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Strips markup from every free-text field before a payload is persisted
pub trait Sanitize {
    fn sanitize(self) -> Self;
}

impl Sanitize for NewIncident {
    fn sanitize(mut self) -> Self {
        self.thumbnail_url = sanitize_str(&self.thumbnail_url);
        self
    }
}

impl Sanitize for IncidentChanges {
    fn sanitize(mut self) -> Self {
        self.thumbnail_url = self.thumbnail_url.as_deref().map(sanitize_str);
        self
    }
}

impl Sanitize for NewCamera {
    fn sanitize(self) -> Self {
        Self {
            name: sanitize_str(&self.name),
            location: sanitize_str(&self.location),
        }
    }
}
