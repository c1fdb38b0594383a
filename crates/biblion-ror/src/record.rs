//! Serde types for registry records.
//!
//! v1 records carry `name`/`aliases`/`acronyms`, a `country` object,
//! `addresses`, plain-string `links` and an `external_ids` map. v2 records
//! carry typed `names`, `locations`, typed `links` and an `external_ids`
//! list. Accessors prefer the v2 field and fall back to v1.

use rustc_hash::FxHashMap;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: Option<String>,
    pub status: Option<String>,
    pub established: Option<i64>,
    pub types: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub links: Vec<Link>,
    pub external_ids: ExternalIds,

    // v2
    pub names: Vec<Name>,
    pub locations: Vec<Location>,

    // v1
    pub name: Option<String>,
    pub aliases: Vec<String>,
    pub acronyms: Vec<String>,
    pub country: Option<Country>,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Name {
    pub value: String,
    pub types: Vec<String>,
}

impl Name {
    fn is(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Location {
    pub geonames_details: GeonamesDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeonamesDetails {
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Country {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Url(String),
    Typed { value: String },
}

impl Link {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(u) => u,
            Self::Typed { value } => value,
        }
    }
}

/// A string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExternalIdV1 {
    pub preferred: Option<String>,
    pub all: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIdV2 {
    #[serde(rename = "type")]
    pub kind: String,
    pub preferred: Option<String>,
    #[serde(default)]
    pub all: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExternalIds {
    List(Vec<ExternalIdV2>),
    Map(FxHashMap<String, ExternalIdV1>),
}

impl Default for ExternalIds {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ExternalIds {
    /// Preferred identifier of scheme `kind` (case-insensitive), else the first listed.
    pub fn get(&self, kind: &str) -> Option<&str> {
        match self {
            Self::List(ids) => ids
                .iter()
                .find(|id| id.kind.eq_ignore_ascii_case(kind))
                .and_then(|id| id.preferred.as_deref().or(id.all.first().map(String::as_str))),
            Self::Map(ids) => ids
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(kind))
                .and_then(|(_, id)| {
                    id.preferred
                        .as_deref()
                        .or_else(|| id.all.as_ref().and_then(OneOrMany::first))
                }),
        }
    }
}

impl Organization {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.is("ror_display"))
            .or_else(|| self.names.iter().find(|n| n.is("label")))
            .map(|n| n.value.as_str())
            .or(self.name.as_deref())
    }

    /// Aliases and acronyms, in record order
    pub fn aliases(&self) -> Vec<&str> {
        if !self.names.is_empty() {
            return self
                .names
                .iter()
                .filter(|n| n.is("alias") || n.is("acronym"))
                .map(|n| n.value.as_str())
                .collect();
        }
        self.aliases
            .iter()
            .chain(&self.acronyms)
            .map(String::as_str)
            .collect()
    }

    /// Organization types joined with `"; "`
    pub fn type_list(&self) -> Option<String> {
        (!self.types.is_empty()).then(|| self.types.join("; "))
    }

    fn geo(&self) -> Option<&GeonamesDetails> {
        self.locations.first().map(|l| &l.geonames_details)
    }

    pub fn country_code(&self) -> Option<&str> {
        self.geo()
            .and_then(|g| g.country_code.as_deref())
            .or_else(|| self.country.as_ref().and_then(|c| c.country_code.as_deref()))
    }

    pub fn country_name(&self) -> Option<&str> {
        self.geo()
            .and_then(|g| g.country_name.as_deref())
            .or_else(|| self.country.as_ref().and_then(|c| c.country_name.as_deref()))
    }

    pub fn city(&self) -> Option<&str> {
        self.geo()
            .and_then(|g| g.name.as_deref())
            .or_else(|| self.addresses.first().and_then(|a| a.city.as_deref()))
    }

    pub fn latitude(&self) -> Option<f64> {
        self.geo()
            .and_then(|g| g.lat)
            .or_else(|| self.addresses.first().and_then(|a| a.lat))
    }

    pub fn longitude(&self) -> Option<f64> {
        self.geo()
            .and_then(|g| g.lng)
            .or_else(|| self.addresses.first().and_then(|a| a.lng))
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_V2: &str = r#"{
  "id": "https://ror.org/05gq02987",
  "names": [
    {"value": "Brown University", "types": ["ror_display", "label"], "lang": "en"},
    {"value": "Brown", "types": ["alias"], "lang": null},
    {"value": "BU", "types": ["acronym"], "lang": null}
  ],
  "status": "active",
  "types": ["education", "funder"],
  "established": 1764,
  "locations": [{"geonames_id": 5224151, "geonames_details": {"country_code": "US", "country_name": "United States", "lat": 41.82, "lng": -71.41, "name": "Providence"}}],
  "external_ids": [
    {"type": "fundref", "all": ["100006418"], "preferred": null},
    {"type": "grid", "all": ["grid.40263.33"], "preferred": "grid.40263.33"},
    {"type": "isni", "all": ["0000 0004 1936 9094"], "preferred": null},
    {"type": "wikidata", "all": ["Q49114"], "preferred": "Q49114"}
  ],
  "links": [{"type": "website", "value": "https://www.brown.edu"}],
  "relationships": [{"label": "Brown Medicine", "type": "child", "id": "https://ror.org/01aw9fv09"}]
}"#;

#[cfg(test)]
pub(crate) const SAMPLE_V1: &str = r#"{
  "id": "https://ror.org/04dkp9463",
  "name": "University of Amsterdam",
  "aliases": ["UvA"],
  "acronyms": ["UVA"],
  "status": "active",
  "types": ["Education"],
  "established": null,
  "country": {"country_name": "Netherlands", "country_code": "NL"},
  "addresses": [{"city": "Amsterdam", "lat": 52.35, "lng": 4.95}],
  "external_ids": {
    "GRID": {"preferred": "grid.7177.6", "all": "grid.7177.6"},
    "ISNI": {"preferred": null, "all": ["0000 0000 8499 2262"]}
  },
  "links": ["http://www.uva.nl/en/home"],
  "relationships": []
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_v2() {
        let org = Organization::from_slice(SAMPLE_V2.as_bytes()).unwrap();
        assert_eq!(org.key(), Some("https://ror.org/05gq02987"));
        assert_eq!(org.display_name(), Some("Brown University"));
        assert_eq!(org.aliases(), vec!["Brown", "BU"]);
        assert_eq!(org.type_list().as_deref(), Some("education; funder"));
        assert_eq!(org.city(), Some("Providence"));
        assert_eq!(org.latitude(), Some(41.82));
        assert_eq!(org.external_ids.get("wikidata"), Some("Q49114"));
        assert_eq!(org.external_ids.get("fundref"), Some("100006418"));
        assert_eq!(org.external_ids.get("isni"), Some("0000 0004 1936 9094"));
        assert_eq!(org.links[0].url(), "https://www.brown.edu");
    }

    #[test]
    fn decode_v1() {
        let org = Organization::from_slice(SAMPLE_V1.as_bytes()).unwrap();
        assert_eq!(org.display_name(), Some("University of Amsterdam"));
        assert_eq!(org.aliases(), vec!["UvA", "UVA"]);
        assert_eq!(org.established, None);
        assert_eq!(org.country_code(), Some("NL"));
        assert_eq!(org.city(), Some("Amsterdam"));
        assert_eq!(org.external_ids.get("grid"), Some("grid.7177.6"));
        assert_eq!(org.external_ids.get("isni"), Some("0000 0000 8499 2262"));
        assert_eq!(org.external_ids.get("wikidata"), None);
        assert_eq!(org.links[0].url(), "http://www.uva.nl/en/home");
    }

    #[test]
    fn wrong_field_type_is_error() {
        assert!(Organization::from_slice(br#"{"id": "x", "established": "long ago"}"#).is_err());
    }
}
