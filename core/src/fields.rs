use crate::ValidationError;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

/// Typed reads over a loose JSON object. A key set to `null` counts as absent.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn of(value: &'a Value) -> Result<Self, ValidationError> {
        value
            .as_object()
            .map(|map| Fields { map })
            .ok_or(ValidationError::NotAnObject)
    }

    fn lookup(&self, name: &str, aliases: &[&str]) -> Option<&'a Value> {
        std::iter::once(name)
            .chain(aliases.iter().copied())
            .filter_map(|key| self.map.get(key))
            .find(|v| !v.is_null())
    }

    pub fn text(&self, name: &'static str, aliases: &[&str]) -> Result<String, ValidationError> {
        self.opt_text(name, aliases)?.ok_or(ValidationError::Missing(name))
    }

    pub fn opt_text(&self, name: &'static str, aliases: &[&str]) -> Result<Option<String>, ValidationError> {
        match self.lookup(name, aliases) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::WrongType { field: name, expected: "a string" }),
        }
    }

    pub fn text_list(&self, name: &'static str, aliases: &[&str]) -> Result<Vec<String>, ValidationError> {
        let wrong = ValidationError::WrongType { field: name, expected: "an array of strings" };
        match self.lookup(name, aliases) {
            None => Err(ValidationError::Missing(name)),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned).ok_or_else(|| wrong.clone()))
                .collect(),
            Some(_) => Err(wrong),
        }
    }

    pub fn opt_timestamp(&self, name: &'static str, aliases: &[&str]) -> Result<Option<OffsetDateTime>, ValidationError> {
        match self.lookup(name, aliases) {
            None => Ok(None),
            Some(Value::String(s)) => OffsetDateTime::parse(s, &Rfc3339)
                .map(|t| Some(t.to_offset(UtcOffset::UTC)))
                .map_err(|_| ValidationError::InvalidTimestamp(name)),
            Some(_) => Err(ValidationError::WrongType { field: name, expected: "an RFC 3339 timestamp string" }),
        }
    }
}

/// Rejects empty or whitespace-only text.
pub(crate) fn non_blank(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank(field))
    } else {
        Ok(value)
    }
}

/// Optional text where blank means absent.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
