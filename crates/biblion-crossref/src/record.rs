//! Crossref work record, deserialized from one element of a member's `items`

use serde::Deserialize;
use serde_json::value::RawValue;

/// One element of a member's `items` array, kept raw until a table needs it.
#[derive(Debug)]
pub struct Item {
    pub raw: Box<RawValue>,
    /// Position within the member's `items` array
    pub position: usize,
}

/// Crossref work metadata
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Work {
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,

    /// Titles; the first is the main title
    #[serde(default)]
    pub title: Vec<String>,

    #[serde(default)]
    pub subtitle: Vec<String>,

    /// Work type (journal-article, book-chapter, ...)
    #[serde(rename = "type", default)]
    pub work_type: Option<String>,

    #[serde(default)]
    pub publisher: Option<String>,

    #[serde(default)]
    pub published: Option<DateParts>,
    #[serde(default)]
    pub published_print: Option<DateParts>,
    #[serde(default)]
    pub published_online: Option<DateParts>,
    #[serde(default)]
    pub issued: Option<DateParts>,

    /// JATS-encoded abstract
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,

    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub page: Option<String>,

    #[serde(default)]
    pub issn_type: Vec<TypedValue>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub references_count: Option<i64>,
    #[serde(default)]
    pub is_referenced_by_count: Option<i64>,

    #[serde(default)]
    pub author: Vec<Author>,
    #[serde(default)]
    pub reference: Vec<Reference>,
    #[serde(default)]
    pub subject: Vec<String>,
    #[serde(default)]
    pub funder: Vec<Funder>,
    #[serde(default)]
    pub license: Vec<License>,
    #[serde(default)]
    pub update_to: Vec<Update>,
}

/// `{"date-parts": [[year, month, day]]}` with any part possibly null
#[derive(Debug, Default, Deserialize)]
pub struct DateParts {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

impl DateParts {
    fn part(&self, i: usize) -> Option<i64> {
        self.date_parts.first().and_then(|p| p.get(i).copied().flatten())
    }

    pub fn year(&self) -> Option<i64> {
        self.part(0)
    }

    pub fn month(&self) -> Option<i64> {
        self.part(1)
    }

    pub fn day(&self) -> Option<i64> {
        self.part(2)
    }
}

#[derive(Debug, Deserialize)]
pub struct TypedValue {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    /// Set for organisational authors
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "ORCID", default)]
    pub orcid: Option<String>,
    /// "first" or "additional"
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub affiliation: Vec<Affiliation>,
}

#[derive(Debug, Deserialize)]
pub struct Affiliation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Vec<AffiliationId>,
}

#[derive(Debug, Deserialize)]
pub struct AffiliationId {
    pub id: String,
    #[serde(rename = "id-type", default)]
    pub id_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reference {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub article_title: Option<String>,
    #[serde(default)]
    pub journal_title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub first_page: Option<String>,
    #[serde(rename = "ISSN", default)]
    pub issn: Option<String>,
    #[serde(default)]
    pub unstructured: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Funder {
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub award: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct License {
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start: Option<DateParts>,
    #[serde(default)]
    pub delay_in_days: Option<i64>,
    #[serde(default)]
    pub content_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub updated: Option<DateParts>,
}

impl Work {
    /// Decode one raw `items` element.
    pub fn from_raw(raw: &RawValue) -> Result<Self, String> {
        serde_json::from_str(raw.get()).map_err(|e| format!("invalid work JSON: {e}"))
    }

    /// DOI, or `None` when absent or blank
    pub fn key(&self) -> Option<&str> {
        self.doi.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    pub fn main_title(&self) -> Option<&str> {
        self.title.first().map(String::as_str)
    }

    pub fn main_subtitle(&self) -> Option<&str> {
        self.subtitle.first().map(String::as_str)
    }

    /// Publication date: `published`, else print, else online, else `issued`
    pub fn published_date(&self) -> Option<&DateParts> {
        [
            &self.published,
            &self.published_print,
            &self.published_online,
            &self.issued,
        ]
        .into_iter()
        .flatten()
        .find(|d| d.year().is_some())
    }

    fn issn_of(&self, kind: &str) -> Option<&str> {
        self.issn_type
            .iter()
            .find(|t| t.kind.as_deref() == Some(kind))
            .and_then(|t| t.value.as_deref())
    }

    pub fn issn_print(&self) -> Option<&str> {
        self.issn_of("print")
    }

    pub fn issn_electronic(&self) -> Option<&str> {
        self.issn_of("electronic")
    }
}

impl Author {
    /// Bare ORCID iD, without the `https://orcid.org/` prefix
    pub fn orcid_id(&self) -> Option<String> {
        self.orcid.as_deref().map(extract_short_id)
    }
}

impl Affiliation {
    /// ROR identifier asserted for this affiliation, if any
    pub fn ror_id(&self) -> Option<&str> {
        self.id
            .iter()
            .find(|i| i.id_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("ror")))
            .map(|i| i.id.as_str())
    }
}

impl Funder {
    pub fn awards(&self) -> Option<String> {
        let awards: Vec<&str> = self
            .award
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();
        (!awards.is_empty()).then(|| awards.join("; "))
    }
}

/// Last path segment of an identifier URL (`https://orcid.org/0000-...` -> `0000-...`)
pub fn extract_short_id(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// DOI registrant prefix including the slash (`10.1000/xyz` -> `10.1000/`)
pub fn doi_prefix(doi: &str) -> Option<&str> {
    doi.find('/').map(|i| &doi[..=i])
}

#[cfg(test)]
pub(crate) const SAMPLE_WORK: &str = r#"{
    "DOI": "10.1000/j.x.2020.01",
    "title": ["Streaming relations"],
    "subtitle": [],
    "type": "journal-article",
    "publisher": "Example Press",
    "published-print": {"date-parts": [[2020, 3]]},
    "issued": {"date-parts": [[2019, 12, 1]]},
    "volume": "12",
    "page": "1-10",
    "issn-type": [{"value": "1234-5678", "type": "print"}, {"value": "8765-4321", "type": "electronic"}],
    "references-count": 2,
    "is-referenced-by-count": 7,
    "author": [
        {"given": "Ada", "family": "Lovelace", "ORCID": "http://orcid.org/0000-0002-1825-0097",
         "sequence": "first",
         "affiliation": [{"name": "Analytical Society", "id": [{"id": "https://ror.org/05abc", "id-type": "ROR"}]}]},
        {"name": "The Consortium", "sequence": "additional", "affiliation": []}
    ],
    "reference": [{"key": "r1", "DOI": "10.1000/ref1"}, {"key": "r2", "unstructured": "Babbage 1837"}],
    "subject": ["Computer Science", "Logic"],
    "funder": [{"DOI": "10.13039/1", "name": "Fund", "award": ["A1", " ", "B2"]}],
    "license": [{"URL": "https://creativecommons.org/licenses/by/4.0/", "start": {"date-parts": [[2020, 1, 1]]}, "delay-in-days": 0, "content-version": "vor"}],
    "update-to": [{"DOI": "10.1000/old", "type": "correction", "updated": {"date-parts": [[2021, 5, 2]]}}]
}"#;
