//! Tantivy-backed full-text index with snippet extraction (C4).
//!
//! Directly grounded on `crates/edge/src/db/tantivy.rs::ContentIndex`
//! (schema shape, writer/reader setup, `add`/`search`). Ranking is
//! delegated entirely to tantivy's BM25 scorer, not reimplemented
//! (SPEC_FULL.md §D.3). Extended with `tantivy::snippet::SnippetGenerator`
//! for the excerpt the teacher's whole-page index didn't need.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::snippet::SnippetGenerator;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use wiki_core::Identifier;

use crate::error::Error;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone, Copy)]
struct Fields {
    identifier: Field,
    title: Field,
    body: Field,
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let identifier = builder.add_text_field("identifier", STRING | STORED);
    let title = builder.add_text_field("title", TEXT | STORED);
    let body = builder.add_text_field("body", TEXT | STORED);
    (builder.build(), Fields { identifier, title, body })
}

pub struct SearchHit {
    pub identifier: Identifier,
    pub title: String,
    pub fragment: String,
    pub score: f32,
}

pub struct TextIndex {
    index: Index,
    fields: Fields,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    ready: AtomicBool,
}

impl TextIndex {
    pub fn create_in_ram() -> Result<Self, Error> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        Self::from_index(index, fields)
    }

    pub fn create_in_dir(dir: &Path) -> Result<Self, Error> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_dir(dir, schema)?;
        Self::from_index(index, fields)
    }

    fn from_index(index: Index, fields: Fields) -> Result<Self, Error> {
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        Ok(Self {
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
            ready: AtomicBool::new(false),
        })
    }

    /// Index (or re-index) `id`'s title and rendered body text.
    pub fn upsert(&self, id: &Identifier, title: &str, body: &str) -> Result<(), Error> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.fields.identifier, id.as_str()));
        writer.add_document(doc!(
            self.fields.identifier => id.as_str(),
            self.fields.title => title,
            self.fields.body => body,
        ))?;
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    pub fn remove(&self, id: &Identifier) -> Result<(), Error> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.fields.identifier, id.as_str()));
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Whether at least one document has ever been committed. Searching an
    /// index that is not yet ready returns no results rather than erroring.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchHit>, Error> {
        let searcher = self.reader.searcher();
        let query_parser =
            QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.body]);
        let query = query_parser.parse_query(query_str)?;

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
        let mut snippet_generator = SnippetGenerator::create(&searcher, &*query, self.fields.body)?;
        snippet_generator.set_max_num_chars(160);

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(address)?;
            let identifier_str = retrieved
                .get_first(self.fields.identifier)
                .and_then(Value::as_str)
                .unwrap_or_default();
            let Ok(identifier) = Identifier::normalize(identifier_str) else {
                continue;
            };
            let title = retrieved
                .get_first(self.fields.title)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let snippet = snippet_generator.snippet_from_doc(&retrieved);
            hits.push(SearchHit { identifier, title, fragment: snippet.to_html(), score });
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::normalize(s).unwrap()
    }

    #[test]
    fn upsert_then_search_finds_the_page() {
        let index = TextIndex::create_in_ram().unwrap();
        index
            .upsert(&id("garage"), "Garage Inventory", "A wrench and a hammer live on the shelf.")
            .unwrap();

        let hits = index.search("wrench", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, id("garage"));
        assert!(hits[0].fragment.to_lowercase().contains("wrench"));
    }

    #[test]
    fn remove_drops_the_page_from_search_results() {
        let index = TextIndex::create_in_ram().unwrap();
        index.upsert(&id("garage"), "Garage", "wrench and hammer").unwrap();
        index.remove(&id("garage")).unwrap();

        let hits = index.search("wrench", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn is_ready_false_until_first_commit() {
        let index = TextIndex::create_in_ram().unwrap();
        assert!(!index.is_ready());
        index.upsert(&id("garage"), "Garage", "wrench").unwrap();
        assert!(index.is_ready());
    }

    #[test]
    fn re_upserting_replaces_the_previous_document() {
        let index = TextIndex::create_in_ram().unwrap();
        index.upsert(&id("garage"), "Garage", "wrench").unwrap();
        index.upsert(&id("garage"), "Garage", "hammer").unwrap();

        assert!(index.search("wrench", 10).unwrap().is_empty());
        assert_eq!(index.search("hammer", 10).unwrap().len(), 1);
    }
}
