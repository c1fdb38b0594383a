//! ORCID record parser using quick-xml
//!
//! Parses one captured `record:record` element. Elements are matched by
//! local name, so the namespace prefixes of the summary schema are ignored.

use anyhow::{Context, Result, bail};
use biblion_core::container::xml::{attribute, predefined_entities, read_text, skip_element};
use quick_xml::Reader;
use quick_xml::events::Event;

/// One researcher, as much of the summary as the relations expose
#[derive(Debug, Default)]
pub struct Person {
    pub orcid: String,
    pub given_names: Option<String>,
    pub family_name: Option<String>,
    pub credit_name: Option<String>,
    pub biography: Option<String>,

    pub external_ids: Vec<ExternalId>,
    pub keywords: Vec<String>,
    pub researcher_urls: Vec<ResearcherUrl>,

    pub employments: Vec<Affiliation>,
    pub educations: Vec<Affiliation>,
    pub works: Vec<WorkSummary>,
}

#[derive(Debug, Default, Clone)]
pub struct ExternalId {
    pub kind: Option<String>,
    pub value: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ResearcherUrl {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Employment or education entry
#[derive(Debug, Default, Clone)]
pub struct Affiliation {
    pub organization_name: Option<String>,
    pub department: Option<String>,
    pub role_title: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Disambiguated organization identifier, e.g. a ROR URL
    pub organization_identifier: Option<String>,
    /// Registry of `organization_identifier` (`ROR`, `GRID`, `RINGGOLD`, ...)
    pub identifier_source: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct WorkSummary {
    pub doi: Option<String>,
    pub title: Option<String>,
}

fn text(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let s = read_text(reader, predefined_entities)?;
    Ok((!s.is_empty()).then_some(s))
}

/// Parse one captured record.
///
/// The iD comes from `orcid-identifier/path`, falling back to the record's
/// `path` attribute. A record with neither is an error.
pub fn parse_record(xml: &[u8]) -> Result<Person> {
    let mut reader = Reader::from_reader(xml);
    let mut person = Person::default();
    let mut path_attr = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"record" => path_attr = attribute(&e, b"path")?.map(|p| p.into_owned()),
                b"orcid-identifier" => {
                    if let Some(id) = parse_identifier(&mut reader)? {
                        person.orcid = id;
                    }
                }
                b"person" => parse_person(&mut reader, &mut person)?,
                b"activities-summary" => parse_activities(&mut reader, &mut person)?,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"record" => {
                path_attr = attribute(&e, b"path")?.map(|p| p.into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if person.orcid.is_empty() {
        match path_attr.as_deref().map(|p| p.trim().trim_start_matches('/')) {
            Some(p) if !p.is_empty() => person.orcid = p.to_string(),
            _ => bail!("record has no ORCID iD"),
        }
    }
    Ok(person)
}

fn parse_identifier(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut id = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"path" => id = text(reader)?,
            Event::End(e) if e.local_name().as_ref() == b"orcid-identifier" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(id)
}

fn parse_person(reader: &mut Reader<&[u8]>, person: &mut Person) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => parse_name(reader, person)?,
                b"biography" => person.biography = text(reader)?,
                b"researcher-url" => person.researcher_urls.push(parse_researcher_url(reader)?),
                b"keyword" => parse_keyword(reader, &mut person.keywords)?,
                b"external-identifier" => person
                    .external_ids
                    .push(parse_external_id(reader, b"external-identifier")?),
                b"source" => skip_element(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"person" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_name(reader: &mut Reader<&[u8]>, person: &mut Person) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"given-names" => person.given_names = text(reader)?,
                b"family-name" => person.family_name = text(reader)?,
                b"credit-name" => person.credit_name = text(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"name" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_keyword(reader: &mut Reader<&[u8]>, keywords: &mut Vec<String>) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"content" => {
                if let Some(k) = text(reader)? {
                    keywords.push(k);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"source" => skip_element(reader)?,
            Event::End(e) if e.local_name().as_ref() == b"keyword" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_researcher_url(reader: &mut Reader<&[u8]>) -> Result<ResearcherUrl> {
    let mut url = ResearcherUrl::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"url-name" => url.name = text(reader)?,
                b"url" => url.url = text(reader)?,
                b"source" => skip_element(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"researcher-url" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(url)
}

/// `external-identifier` (person level) and `external-id` (work level)
/// share their child elements.
fn parse_external_id(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<ExternalId> {
    let mut id = ExternalId::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"external-id-type" => id.kind = text(reader)?,
                b"external-id-value" => id.value = text(reader)?,
                b"external-id-url" => id.url = text(reader)?,
                b"source" => skip_element(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(id)
}

fn parse_activities(reader: &mut Reader<&[u8]>, person: &mut Person) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"employment-summary" => person
                    .employments
                    .push(parse_affiliation(reader, b"employment-summary")?),
                b"education-summary" => person
                    .educations
                    .push(parse_affiliation(reader, b"education-summary")?),
                b"work-summary" => person.works.push(parse_work(reader)?),
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"activities-summary" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_affiliation(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<Affiliation> {
    let mut aff = Affiliation::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"department-name" => aff.department = text(reader)?,
                b"role-title" => aff.role_title = text(reader)?,
                b"start-date" => aff.start_year = parse_year(reader, b"start-date")?,
                b"end-date" => aff.end_year = parse_year(reader, b"end-date")?,
                b"organization" => parse_organization(reader, &mut aff)?,
                b"source" => skip_element(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(aff)
}

fn parse_organization(reader: &mut Reader<&[u8]>, aff: &mut Affiliation) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => aff.organization_name = text(reader)?,
                b"city" => aff.city = text(reader)?,
                b"country" => aff.country = text(reader)?,
                b"disambiguated-organization-identifier" => {
                    aff.organization_identifier = text(reader)?
                }
                b"disambiguation-source" => aff.identifier_source = text(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"organization" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Year of a `start-date`/`end-date` element; month and day are not kept.
fn parse_year(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<Option<i64>> {
    let mut year = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"year" => {
                if let Some(s) = text(reader)? {
                    year = Some(s.parse().with_context(|| format!("invalid year {s:?}"))?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(year)
}

fn parse_work(reader: &mut Reader<&[u8]>) -> Result<WorkSummary> {
    let mut work = WorkSummary::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"title" => work.title = parse_work_title(reader)?,
                b"external-id" => {
                    let id = parse_external_id(reader, b"external-id")?;
                    let is_doi = id.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("doi"));
                    if is_doi && work.doi.is_none() {
                        work.doi = id.value;
                    }
                }
                b"source" => skip_element(reader)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"work-summary" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(work)
}

/// `work:title` wraps `common:title` plus optional subtitle and translations.
fn parse_work_title(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut title = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"title" => title = text(reader)?,
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(title)
}

#[cfg(test)]
pub(crate) const SAMPLE_RECORD: &str = r#"<record:record xmlns:record="http://www.orcid.org/ns/record" xmlns:common="http://www.orcid.org/ns/common" xmlns:person="http://www.orcid.org/ns/person" xmlns:personal-details="http://www.orcid.org/ns/personal-details" xmlns:keyword="http://www.orcid.org/ns/keyword" xmlns:researcher-url="http://www.orcid.org/ns/researcher-url" xmlns:external-identifier="http://www.orcid.org/ns/external-identifier" xmlns:activities="http://www.orcid.org/ns/activities" xmlns:employment="http://www.orcid.org/ns/employment" xmlns:education="http://www.orcid.org/ns/education" xmlns:work="http://www.orcid.org/ns/work" path="/0000-0002-1825-0097">
  <common:orcid-identifier>
    <common:uri>https://orcid.org/0000-0002-1825-0097</common:uri>
    <common:path>0000-0002-1825-0097</common:path>
    <common:host>orcid.org</common:host>
  </common:orcid-identifier>
  <person:person path="/0000-0002-1825-0097/person">
    <person:name visibility="public">
      <personal-details:given-names>Josiah</personal-details:given-names>
      <personal-details:family-name>Carberry</personal-details:family-name>
      <personal-details:credit-name>J. S. Carberry</personal-details:credit-name>
    </person:name>
    <person:biography><personal-details:content>Studies cracked pots &amp; their fractures.</personal-details:content></person:biography>
    <researcher-url:researcher-urls>
      <researcher-url:researcher-url put-code="1">
        <common:source><common:source-name>Josiah Carberry</common:source-name></common:source>
        <researcher-url:url-name>Lab</researcher-url:url-name>
        <researcher-url:url>https://example.org/lab</researcher-url:url>
      </researcher-url:researcher-url>
    </researcher-url:researcher-urls>
    <keyword:keywords>
      <keyword:keyword put-code="2"><keyword:content>psychoceramics</keyword:content></keyword:keyword>
      <keyword:keyword put-code="3"><keyword:content>pottery</keyword:content></keyword:keyword>
    </keyword:keywords>
    <external-identifier:external-identifiers>
      <external-identifier:external-identifier put-code="4">
        <common:external-id-type>Scopus Author ID</common:external-id-type>
        <common:external-id-value>7007156898</common:external-id-value>
        <common:external-id-url>http://www.scopus.com/inward/authorDetails.url?authorID=7007156898</common:external-id-url>
        <common:external-id-relationship>self</common:external-id-relationship>
      </external-identifier:external-identifier>
    </external-identifier:external-identifiers>
  </person:person>
  <activities:activities-summary>
    <activities:educations>
      <activities:affiliation-group>
        <education:education-summary put-code="5">
          <common:source><common:source-orcid><common:path>0000-0001-0000-0000</common:path></common:source-orcid></common:source>
          <common:role-title>PhD</common:role-title>
          <common:start-date><common:year>1990</common:year></common:start-date>
          <common:end-date><common:year>1995</common:year><common:month>06</common:month></common:end-date>
          <common:organization>
            <common:name>Wesleyan University</common:name>
            <common:address><common:city>Middletown</common:city><common:region>CT</common:region><common:country>US</common:country></common:address>
          </common:organization>
        </education:education-summary>
      </activities:affiliation-group>
    </activities:educations>
    <activities:employments>
      <activities:affiliation-group>
        <employment:employment-summary put-code="6">
          <common:department-name>Psychoceramics</common:department-name>
          <common:role-title>Professor</common:role-title>
          <common:start-date><common:year>2001</common:year></common:start-date>
          <common:organization>
            <common:name>Brown University</common:name>
            <common:address><common:city>Providence</common:city><common:country>US</common:country></common:address>
            <common:disambiguated-organization>
              <common:disambiguated-organization-identifier>https://ror.org/05gq02987</common:disambiguated-organization-identifier>
              <common:disambiguation-source>ROR</common:disambiguation-source>
            </common:disambiguated-organization>
          </common:organization>
        </employment:employment-summary>
      </activities:affiliation-group>
    </activities:employments>
    <activities:works>
      <activities:group>
        <common:external-ids>
          <common:external-id><common:external-id-type>doi</common:external-id-type><common:external-id-value>10.5555/12345678</common:external-id-value></common:external-id>
        </common:external-ids>
        <work:work-summary put-code="7">
          <common:external-ids>
            <common:external-id><common:external-id-type>isbn</common:external-id-type><common:external-id-value>978-0</common:external-id-value></common:external-id>
            <common:external-id><common:external-id-type>DOI</common:external-id-type><common:external-id-value>10.5555/12345678</common:external-id-value></common:external-id>
          </common:external-ids>
          <work:title><common:title>Toward a Unified Theory of High-Energy Metaphysics</common:title><common:subtitle>Silly String</common:subtitle></work:title>
        </work:work-summary>
        <work:work-summary put-code="8">
          <work:title><common:title>Untitled note</common:title></work:title>
        </work:work-summary>
      </activities:group>
    </activities:works>
  </activities:activities-summary>
</record:record>"#;
