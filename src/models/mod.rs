//! Data models for search filters and scraped auction listings

use std::fmt;

use indexmap::IndexMap;

/// Column names of the fields every listing record carries, in table order.
pub mod columns {
    pub const SITE_URL: &str = "SITE_URL";
    pub const ASSET_URI: &str = "ASSET_URI";
    pub const CURRENT_BID: &str = "CURRENT_BID";
    pub const CLOSING_DATE_UTC: &str = "CLOSING_DATE_UTC";
    pub const LOCATION: &str = "LOCATION";
    pub const MAP_URL: &str = "MAP_URL";

    pub const FIXED: [&str; 6] = [
        SITE_URL,
        ASSET_URI,
        CURRENT_BID,
        CLOSING_DATE_UTC,
        LOCATION,
        MAP_URL,
    ];
}

/// A concrete make/model combination as shown in the search controls
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MakeModel {
    pub make: String,
    pub model: String,
}

impl MakeModel {
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for MakeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.make, self.model)
    }
}

/// A single cell of a listing record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug keeps the fractional part, so 0 is written as `0.0`
            Self::Number(n) => write!(f, "{n:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One auction listing scraped from its detail page.
///
/// The fixed columns always come first, followed by the description rows in
/// the order the page showed them.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    fields: IndexMap<String, FieldValue>,
}

impl ListingRecord {
    pub fn new(
        site_url: &str,
        asset_uri: &str,
        current_bid: f64,
        closing_date_utc: String,
        location: String,
        map_url: String,
    ) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(columns::SITE_URL.to_string(), site_url.into());
        fields.insert(columns::ASSET_URI.to_string(), asset_uri.into());
        fields.insert(columns::CURRENT_BID.to_string(), current_bid.into());
        fields.insert(columns::CLOSING_DATE_UTC.to_string(), closing_date_utc.into());
        fields.insert(columns::LOCATION.to_string(), location.into());
        fields.insert(columns::MAP_URL.to_string(), map_url.into());

        Self { fields }
    }

    /// Adds a description row. Returns `false` if the key collides with a
    /// fixed column, which is left untouched.
    pub fn insert_description(&mut self, key: String, value: String) -> bool {
        if columns::FIXED.contains(&key.as_str()) {
            return false;
        }
        self.fields.insert(key, FieldValue::Text(value));
        true
    }

    pub fn asset_uri(&self) -> &str {
        match self.get(columns::ASSET_URI) {
            Some(FieldValue::Text(uri)) => uri,
            _ => "",
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Flattens the record into the string cells stored in the table.
    pub fn to_row(&self) -> IndexMap<String, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}
