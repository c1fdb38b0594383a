//! DBLP record parser using quick-xml
//!
//! Parses one captured publication element. Field elements are flat children
//! of the record; titles may carry inline markup (`<i>`, `<sub>`, `<sup>`)
//! whose text is kept.

use anyhow::{Context, Result, bail};
use biblion_core::container::xml::{attribute, read_text, skip_element};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::entities::resolve_entity;

const DOI_RESOLVERS: &[&str] = &["https://doi.org/", "http://doi.org/", "http://dx.doi.org/"];

#[derive(Debug, Default)]
pub struct Publication {
    pub key: String,
    /// Record element name: `article`, `inproceedings`, ...
    pub kind: String,
    pub mdate: Option<String>,
    pub title: Option<String>,
    pub year: Option<i64>,
    /// Journal, book title or school
    pub venue: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<Author>,
    /// Electronic editions (`ee`), in record order
    pub links: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Author {
    pub name: String,
    pub orcid: Option<String>,
}

impl Publication {
    /// DOI of the first electronic edition that resolves through doi.org.
    pub fn doi(&self) -> Option<&str> {
        self.links
            .iter()
            .find_map(|url| DOI_RESOLVERS.iter().find_map(|p| url.strip_prefix(*p)))
    }
}

fn text(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let s = read_text(reader, resolve_entity)?;
    Ok((!s.is_empty()).then_some(s))
}

fn header(e: &BytesStart<'_>, publ: &mut Publication) -> Result<()> {
    publ.kind = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    publ.key = attribute(e, b"key")?.map(|k| k.trim().to_string()).unwrap_or_default();
    publ.mdate = attribute(e, b"mdate")?.map(|d| d.into_owned());
    if publ.key.is_empty() {
        bail!("<{}> record without key", publ.kind);
    }
    Ok(())
}

/// Parse one captured publication record.
pub fn parse_publication(xml: &[u8]) -> Result<Publication> {
    let mut reader = Reader::from_reader(xml);
    let mut publ = Publication::default();
    let mut buf = Vec::new();

    match reader.read_event_into(&mut buf)? {
        Event::Start(e) => header(&e, &mut publ)?,
        Event::Empty(e) => {
            header(&e, &mut publ)?;
            return Ok(publ);
        }
        _ => bail!("record does not start with an element"),
    }
    buf.clear();

    // every child is consumed whole, so the next end tag closes the record
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"author" => {
                    let orcid = attribute(&e, b"orcid")?.map(|o| o.into_owned());
                    if let Some(name) = text(&mut reader)? {
                        publ.authors.push(Author { name, orcid });
                    }
                }
                b"title" => publ.title = text(&mut reader)?,
                b"year" => {
                    if let Some(y) = text(&mut reader)? {
                        publ.year = Some(y.parse().with_context(|| format!("invalid year {y:?}"))?);
                    }
                }
                b"journal" | b"booktitle" | b"school" => {
                    let venue = text(&mut reader)?;
                    if publ.venue.is_none() {
                        publ.venue = venue;
                    }
                }
                b"volume" => publ.volume = text(&mut reader)?,
                b"number" => publ.number = text(&mut reader)?,
                b"pages" => publ.pages = text(&mut reader)?,
                b"publisher" => publ.publisher = text(&mut reader)?,
                b"ee" => publ.links.extend(text(&mut reader)?),
                _ => skip_element(&mut reader)?,
            },
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(publ)
}

#[cfg(test)]
pub(crate) const SAMPLE_ARTICLE: &str = r#"<article mdate="2020-09-17" key="journals/cacm/Knuth74" publtype="informal">
<author orcid="0000-0002-1825-0097">Donald E. Knuth</author>
<author>J&ouml;rg M&uuml;ller</author>
<title>Computer Programming as an Art &amp; a <i>Science</i>.</title>
<pages>667-673</pages>
<year>1974</year>
<volume>17</volume>
<journal>Commun. ACM</journal>
<number>12</number>
<ee type="oa">https://example.org/knuth.pdf</ee>
<ee>https://doi.org/10.1145/361604.361612</ee>
<url>db/journals/cacm/cacm17.html#Knuth74</url>
</article>"#;
