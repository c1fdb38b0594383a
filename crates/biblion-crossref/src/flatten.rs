//! Flattening of one work into the rows of a single relation.
//!
//! A work yields one `works` row and zero or more rows in each child
//! relation, every child row leading with the work's DOI. Sequence columns
//! keep source order.

use biblion_core::{ColumnMask, RecordLocation, Row, RowBuilder};

use crate::record::{Item, Work};
use crate::schema::Table;

/// Append the rows `work` contributes to `table`.
pub fn flatten(
    table: Table,
    work: &Work,
    item: &Item,
    loc: &RecordLocation,
    mask: &ColumnMask,
    out: &mut Vec<Row>,
) -> Result<(), String> {
    let doi = work.key().ok_or("work has no DOI")?;
    let width = table.schema().width();
    let row = || RowBuilder::new(mask, width);

    match table {
        Table::Works => {
            let date = work.published_date();
            let mut b = row();
            b.push(|| doi)
                .push(|| loc.container)
                .push(|| {
                    let member = loc.member.as_deref().unwrap_or_default();
                    format!("{member}#{}", item.position)
                })
                .push(|| work.main_title())
                .push(|| work.main_subtitle())
                .push(|| work.work_type.as_deref())
                .push(|| work.publisher.as_deref())
                .push(|| date.and_then(|d| d.year()))
                .push(|| date.and_then(|d| d.month()))
                .push(|| date.and_then(|d| d.day()))
                .push(|| work.abstract_text.as_deref())
                .push(|| work.volume.as_deref())
                .push(|| work.issue.as_deref())
                .push(|| work.page.as_deref())
                .push(|| work.issn_print())
                .push(|| work.issn_electronic())
                .push(|| work.language.as_deref())
                .push(|| work.references_count)
                .push(|| work.is_referenced_by_count);
            out.push(b.finish());
        }
        Table::WorkAuthors => {
            for (seq, a) in work.author.iter().enumerate() {
                let mut b = row();
                b.push(|| doi)
                    .push(|| seq)
                    .push(|| a.given.as_deref())
                    .push(|| a.family.as_deref())
                    .push(|| a.name.as_deref())
                    .push(|| a.orcid_id())
                    .push(|| a.sequence.as_deref());
                out.push(b.finish());
            }
        }
        Table::AuthorAffiliations => {
            for (author_seq, a) in work.author.iter().enumerate() {
                for (seq, aff) in a.affiliation.iter().enumerate() {
                    let mut b = row();
                    b.push(|| doi)
                        .push(|| author_seq)
                        .push(|| seq)
                        .push(|| aff.name.as_deref())
                        .push(|| aff.ror_id());
                    out.push(b.finish());
                }
            }
        }
        Table::WorkReferences => {
            for (seq, r) in work.reference.iter().enumerate() {
                let mut b = row();
                b.push(|| doi)
                    .push(|| seq)
                    .push(|| r.key.as_deref())
                    .push(|| r.doi.as_deref())
                    .push(|| r.article_title.as_deref())
                    .push(|| r.journal_title.as_deref())
                    .push(|| r.author.as_deref())
                    .push(|| r.year.as_deref())
                    .push(|| r.volume.as_deref())
                    .push(|| r.first_page.as_deref())
                    .push(|| r.issn.as_deref())
                    .push(|| r.unstructured.as_deref());
                out.push(b.finish());
            }
        }
        Table::WorkSubjects => {
            for (seq, s) in work.subject.iter().enumerate() {
                let mut b = row();
                b.push(|| doi).push(|| seq).push(|| s.as_str());
                out.push(b.finish());
            }
        }
        Table::WorkFunders => {
            for (seq, f) in work.funder.iter().enumerate() {
                let mut b = row();
                b.push(|| doi)
                    .push(|| seq)
                    .push(|| f.doi.as_deref())
                    .push(|| f.name.as_deref())
                    .push(|| f.awards());
                out.push(b.finish());
            }
        }
        Table::WorkLicenses => {
            for (seq, l) in work.license.iter().enumerate() {
                let mut b = row();
                b.push(|| doi)
                    .push(|| seq)
                    .push(|| l.url.as_deref())
                    .push(|| l.start.as_ref().and_then(|d| d.year()))
                    .push(|| l.delay_in_days)
                    .push(|| l.content_version.as_deref());
                out.push(b.finish());
            }
        }
        Table::WorkUpdates => {
            for (seq, u) in work.update_to.iter().enumerate() {
                let mut b = row();
                b.push(|| doi)
                    .push(|| seq)
                    .push(|| u.doi.as_deref())
                    .push(|| u.kind.as_deref())
                    .push(|| u.updated.as_ref().and_then(|d| d.year()));
                out.push(b.finish());
            }
        }
    }
    Ok(())
}
