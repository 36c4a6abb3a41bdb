//! Read API v2 results.
//!
//! Text lives in `readResults[].lines[].words[]`. Table cells in
//! `pageResults` point at words by JSON path, so a cell's text is masked token
//! by token alongside the words it references.

use std::collections::BTreeSet;
use std::fmt;

use fott_core::{similar, Annotation, BoundingBox, PageSizes};
use fott_rules::{mask, FieldSelector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::text::mask_token;
use crate::{OcrError, RedactionStats, Result, LINE_OVERLAP_THRESHOLD, WORD_OVERLAP_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResultV2 {
    #[serde(rename = "analyzeResult")]
    pub analyze_result: AnalyzeResultV2,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResultV2 {
    #[serde(rename = "readResults")]
    pub read_results: Vec<ReadResult>,
    #[serde(rename = "pageResults", default, skip_serializing_if = "Option::is_none")]
    pub page_results: Option<Vec<PageResult>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub page: u32,
    pub width: Number,
    pub height: Number,
    pub lines: Vec<LineV2>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineV2 {
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
    pub text: String,
    pub words: Vec<WordV2>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordV2 {
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableV2>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableV2 {
    pub cells: Vec<CellV2>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellV2 {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<ElementRef>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Position of a word: `readResults[read].lines[line].words[word]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WordRef {
    pub read: usize,
    pub line: usize,
    pub word: usize,
}

/// A cell element pointer. Anything that is not a word path (selection
/// marks, for one) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementRef {
    Word(WordRef),
    Other(String),
}

impl From<String> for ElementRef {
    fn from(value: String) -> Self {
        parse_word_ref(&value).map_or(ElementRef::Other(value), ElementRef::Word)
    }
}

impl From<ElementRef> for String {
    fn from(value: ElementRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Word(r) => {
                write!(f, "#/readResults/{}/lines/{}/words/{}", r.read, r.line, r.word)
            }
            ElementRef::Other(s) => f.write_str(s),
        }
    }
}

fn parse_word_ref(pointer: &str) -> Option<WordRef> {
    let mut parts = pointer.strip_prefix("#/")?.split('/');
    let mut index = |key: &str| -> Option<usize> {
        if parts.next()? != key {
            return None;
        }
        parts.next()?.parse().ok()
    };
    let read = index("readResults")?;
    let line = index("lines")?;
    let word = index("words")?;
    if parts.next().is_some() {
        return None;
    }
    Some(WordRef { read, line, word })
}

impl OcrResultV2 {
    pub fn page_sizes(&self) -> PageSizes {
        self.analyze_result
            .read_results
            .iter()
            .filter_map(|r| Some((r.page, (r.width.as_f64()?, r.height.as_f64()?))))
            .collect()
    }

    pub fn page_count(&self) -> usize {
        self.analyze_result.read_results.len()
    }

    /// Words on the annotation's page lying (almost) entirely inside a
    /// selected annotation, searched only within lines that overlap it.
    pub fn find_words(
        &self,
        annotations: &[Annotation],
        fields: &FieldSelector,
    ) -> BTreeSet<WordRef> {
        let mut found = BTreeSet::new();
        for annotation in annotations.iter().filter(|a| fields.is_selected(&a.field)) {
            for (ri, read) in self.analyze_result.read_results.iter().enumerate() {
                if read.page != annotation.page {
                    continue;
                }
                let target = &annotation.bounding_box;
                for (li, line) in read.lines.iter().enumerate() {
                    if !similar(&line.bounding_box, target, LINE_OVERLAP_THRESHOLD) {
                        continue;
                    }
                    for (wi, word) in line.words.iter().enumerate() {
                        if similar(&word.bounding_box, target, WORD_OVERLAP_THRESHOLD) {
                            log::debug!(
                                "[OcrV2] {} matches word {:?}",
                                annotation.field,
                                word.text
                            );
                            found.insert(WordRef { read: ri, line: li, word: wi });
                        }
                    }
                }
            }
        }
        found
    }

    pub fn redact(&mut self, annotations: &[Annotation], fields: &FieldSelector) -> RedactionStats {
        let words = self.find_words(annotations, fields);
        let mut stats = RedactionStats::default();

        for r in &words {
            let Some(line) = self
                .analyze_result
                .read_results
                .get_mut(r.read)
                .and_then(|read| read.lines.get_mut(r.line))
            else {
                continue;
            };
            if let Some(word) = line.words.get_mut(r.word) {
                word.text = mask(&word.text);
                stats.words += 1;
            }
            if let Some(text) = mask_token(&line.text, r.word) {
                line.text = text;
                stats.lines += 1;
            }
        }

        let cells = self
            .analyze_result
            .page_results
            .iter_mut()
            .flatten()
            .flat_map(|p| p.tables.iter_mut().flatten())
            .flat_map(|t| t.cells.iter_mut());
        for cell in cells {
            let hits: Vec<usize> = cell
                .elements
                .iter()
                .flatten()
                .enumerate()
                .filter_map(|(i, e)| match e {
                    ElementRef::Word(r) if words.contains(r) => Some(i),
                    _ => None,
                })
                .collect();
            for i in hits {
                if let Some(text) = mask_token(&cell.text, i) {
                    cell.text = text;
                    stats.cells += 1;
                }
            }
        }
        stats
    }

    /// The single-page result for 1-based `page`, renumbered to page 1.
    pub fn extract_page(&self, page: u32) -> Result<OcrResultV2> {
        let count = self.page_count();
        let index = (page as usize)
            .checked_sub(1)
            .filter(|&i| i < count)
            .ok_or(OcrError::PageOutOfRange { page, count })?;

        let mut read = self.analyze_result.read_results[index].clone();
        read.page = 1;

        let page_results = self.analyze_result.page_results.as_ref().map(|results| {
            results
                .iter()
                .filter(|p| p.page == page)
                .cloned()
                .map(|mut p| {
                    p.page = 1;
                    reindex_elements(&mut p, index);
                    p
                })
                .collect()
        });

        Ok(OcrResultV2 {
            analyze_result: AnalyzeResultV2 {
                read_results: vec![read],
                page_results,
                extra: self.analyze_result.extra.clone(),
            },
            extra: self.extra.clone(),
        })
    }
}

fn reindex_elements(page: &mut PageResult, read_index: usize) {
    let elements = page
        .tables
        .iter_mut()
        .flatten()
        .flat_map(|t| t.cells.iter_mut())
        .flat_map(|c| c.elements.iter_mut().flatten());
    for element in elements {
        if let ElementRef::Word(r) = element {
            if r.read == read_index {
                r.read = 0;
            }
        }
    }
}
