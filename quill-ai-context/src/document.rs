//! Schema for extractor output and flattening into retrievable rows.
//!
//! The external document extractor emits a JSON array of page records, each
//! holding a page number and a list of single-key objects mapping a heading
//! to the markdown text that follows it. That ad hoc shape is modeled here
//! as a strict tagged schema: a [`Section`] is either a real
//! heading-plus-body pair or an explicit [`Section::Unparsed`] fallback
//! carrying the raw text, so arbitrary keys are never silently accepted.
//!
//! Flattening turns pages into [`FlattenedRow`]s, one per (page, heading)
//! pair, normalizing the extractor's `"No Heading"` sentinel to `"General"`
//! and dropping sections whose body trims to empty.

use crate::error::ContextError;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic assigned to sections the extractor emitted without a real heading.
pub const GENERAL_TOPIC: &str = "General";

/// Topic assigned to sections the extractor could not parse.
pub const ERROR_TOPIC: &str = "Error";

/// One section of extracted page content.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// A heading and the text (including markdown tables) that follows it.
    Heading { title: String, body: String },
    /// Extractor output that did not fit the heading-to-text shape; the raw
    /// text is preserved so it can still be chunked under [`ERROR_TOPIC`].
    Unparsed { raw: String },
}

impl Serialize for Section {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Section::Heading { title, body } => map.serialize_entry(title, body)?,
            Section::Unparsed { raw } => map.serialize_entry(ERROR_TOPIC, raw)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = Section;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-key object mapping a heading to its text")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Section, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, serde_json::Value)> = Vec::new();
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }

                // The well-formed shape is exactly one key with a string
                // value; anything else falls back to Unparsed with the raw
                // content preserved.
                match entries.as_slice() {
                    [(key, serde_json::Value::String(body))] if key == ERROR_TOPIC => {
                        Ok(Section::Unparsed { raw: body.clone() })
                    }
                    [(key, serde_json::Value::String(body))] => Ok(Section::Heading {
                        title: key.clone(),
                        body: body.clone(),
                    }),
                    _ => {
                        let raw = serde_json::to_string(
                            &entries
                                .into_iter()
                                .collect::<serde_json::Map<String, serde_json::Value>>(),
                        )
                        .map_err(de::Error::custom)?;
                        Ok(Section::Unparsed { raw })
                    }
                }
            }
        }

        deserializer.deserialize_map(SectionVisitor)
    }
}

/// One page of extractor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number; `-1` when the extractor did not report one.
    #[serde(default = "unknown_page")]
    pub page_number: i64,
    #[serde(default)]
    pub extracted_data: Vec<Section>,
}

fn unknown_page() -> i64 {
    -1
}

/// One (page, heading) pair ready for chunking.
///
/// Invariant: `context` is non-empty after trimming; rows that would violate
/// this are dropped during flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedRow {
    pub context: String,
    pub keyword: String,
    pub page_number: i64,
}

/// Parse a full extraction file (JSON array of page records).
///
/// Malformed individual sections are tolerated via [`Section::Unparsed`]; a
/// document that is not a JSON array of pages at all is an extraction error.
pub fn parse_extraction(json: &str) -> Result<Vec<PageRecord>, ContextError> {
    serde_json::from_str(json)
        .map_err(|e| ContextError::malformed_extraction(format!("invalid page records: {e}")))
}

/// Flatten page records into one row per non-empty section.
pub fn flatten_pages(pages: &[PageRecord]) -> Vec<FlattenedRow> {
    let mut rows = Vec::new();

    for page in pages {
        for section in &page.extracted_data {
            let (keyword, context) = match section {
                Section::Heading { title, body } => {
                    let keyword = title.trim();
                    let keyword = if keyword.eq_ignore_ascii_case("no heading") {
                        GENERAL_TOPIC
                    } else {
                        keyword
                    };
                    (keyword.to_string(), body.trim())
                }
                Section::Unparsed { raw } => (ERROR_TOPIC.to_string(), raw.trim()),
            };

            if context.is_empty() {
                continue;
            }

            rows.push(FlattenedRow {
                context: context.to_string(),
                keyword,
                page_number: page.page_number,
            });
        }
    }

    rows
}
