//! Geographic place attached to a tweet.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::raw::str_at;

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub country: String,
    pub country_code: String,
    /// Place granularity, e.g. "city"
    pub place_type: String,
}

impl Place {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        let id = str_at(value, &["id"])
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("place", "missing id"))?;
        Ok(Self {
            id,
            name: str_at(value, &["name"]).unwrap_or_default().to_string(),
            full_name: str_at(value, &["full_name"]).unwrap_or_default().to_string(),
            country: str_at(value, &["country"]).unwrap_or_default().to_string(),
            country_code: str_at(value, &["country_code"]).unwrap_or_default().to_string(),
            place_type: str_at(value, &["place_type"]).unwrap_or_default().to_string(),
        })
    }
}
