//! Layout API v3 results.
//!
//! All text lives in `analyzeResult.content`. Words, lines and table cells
//! carry their own copy of the text plus spans pointing back into `content`.
//! A matched word is masked in each of those places at the same character
//! positions.
//!
//! Word geometry is `boundingBox` up to `2021-09-30-preview` and `polygon`
//! from `2022-08-31` on. Whichever key a file uses is written back.

use fott_core::{similar, Annotation, BoundingBox, PageSizes, Span};
use fott_rules::{mask, FieldSelector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::text::mask_span;
use crate::{OcrError, RedactionStats, Result, WORD_OVERLAP_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResultV3 {
    #[serde(rename = "analyzeResult")]
    pub analyze_result: AnalyzeResultV3,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResultV3 {
    pub content: String,
    pub pages: Vec<PageV3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableV3>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageV3 {
    #[serde(rename = "pageNumber")]
    pub page_number: u32,
    pub width: Number,
    pub height: Number,
    pub words: Vec<WordV3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineV3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Span>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordV3 {
    pub content: String,
    #[serde(rename = "boundingBox", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<BoundingBox>,
    pub span: Span,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineV3 {
    pub content: String,
    pub spans: Vec<Span>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableV3 {
    pub cells: Vec<CellV3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Span>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellV3 {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Span>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WordV3 {
    pub fn geometry(&self) -> Option<&BoundingBox> {
        self.polygon.as_ref().or(self.bounding_box.as_ref())
    }
}

impl OcrResultV3 {
    pub fn page_sizes(&self) -> PageSizes {
        self.analyze_result
            .pages
            .iter()
            .filter_map(|p| Some((p.page_number, (p.width.as_f64()?, p.height.as_f64()?))))
            .collect()
    }

    pub fn page_count(&self) -> usize {
        self.analyze_result.pages.len()
    }

    /// `(page index, word index)` of the first word on each page matching
    /// each selected annotation on that page, deduplicated, in match order.
    pub fn find_words(
        &self,
        annotations: &[Annotation],
        fields: &FieldSelector,
    ) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        for (pi, page) in self.analyze_result.pages.iter().enumerate() {
            let on_page = annotations
                .iter()
                .filter(|a| a.page == page.page_number && fields.is_selected(&a.field));
            for annotation in on_page {
                let hit = page.words.iter().position(|w| {
                    w.geometry().is_some_and(|geometry| {
                        similar(&annotation.bounding_box, geometry, WORD_OVERLAP_THRESHOLD)
                    })
                });
                if let Some(wi) = hit {
                    let word = &page.words[wi].content;
                    log::debug!("[OcrV3] {} matches word {:?}", annotation.field, word);
                    if !found.contains(&(pi, wi)) {
                        found.push((pi, wi));
                    }
                }
            }
        }
        found
    }

    pub fn redact(&mut self, annotations: &[Annotation], fields: &FieldSelector) -> RedactionStats {
        let found = self.find_words(annotations, fields);
        let mut stats = RedactionStats::default();

        let mut spans = Vec::with_capacity(found.len());
        for (pi, wi) in found {
            let word = &mut self.analyze_result.pages[pi].words[wi];
            word.content = mask(&word.content);
            spans.push(word.span);
            stats.words += 1;
        }

        for span in &spans {
            if let Some(line) = self.line_containing(span) {
                if let Ok(relative) = span.relative_to(&line.spans) {
                    line.content = mask_span(&line.content, relative);
                    stats.lines += 1;
                }
            }
        }

        let result = &mut self.analyze_result;
        for span in &spans {
            result.content = mask_span(&result.content, *span);
        }

        for span in &spans {
            if let Some((cell, cell_spans)) = self.cell_containing(span) {
                if let Ok(relative) = span.relative_to(&cell_spans) {
                    cell.content = mask_span(&cell.content, relative);
                    stats.cells += 1;
                }
            }
        }

        let mut other = 0;
        for value in self.analyze_result.extra.values_mut() {
            for span in &spans {
                other += mask_spanned_text(value, span);
            }
        }
        if other > 0 {
            log::debug!("[OcrV3] masked {} paragraph or field texts", other);
        }
        stats
    }

    fn line_containing(&mut self, span: &Span) -> Option<&mut LineV3> {
        self.analyze_result
            .pages
            .iter_mut()
            .flat_map(|p| p.lines.iter_mut().flatten())
            .find(|line| span.inside(&line.spans))
    }

    fn cell_containing(&mut self, span: &Span) -> Option<(&mut CellV3, Vec<Span>)> {
        self.analyze_result
            .tables
            .iter_mut()
            .flatten()
            .flat_map(|t| t.cells.iter_mut())
            .find_map(|cell| {
                let spans = cell.spans.clone().filter(|s| span.inside(s))?;
                Some((cell, spans))
            })
    }

    /// The single-page result for 1-based `page`, renumbered to page 1.
    ///
    /// `content` is cut down to the page's spans (or, when the page has none,
    /// the range its words and lines cover) and every kept span is rebased
    /// onto the shorter text. Tables and document-level items such as
    /// paragraphs are kept when all their spans lie on the page.
    pub fn extract_page(&self, page: u32) -> Result<OcrResultV3> {
        let count = self.page_count();
        let index = (page as usize)
            .checked_sub(1)
            .filter(|&i| i < count)
            .ok_or(OcrError::PageOutOfRange { page, count })?;
        let source = &self.analyze_result.pages[index];
        let page_spans: Vec<Span> = match &source.spans {
            Some(spans) => spans.clone(),
            None => covering_span(source).into_iter().collect(),
        };

        let mut kept = source.clone();
        kept.page_number = 1;
        if let Some(spans) = &mut kept.spans {
            *spans = rebase(spans, &page_spans)?;
        }
        for word in &mut kept.words {
            word.span = word.span.relative_to(&page_spans)?;
        }
        for line in kept.lines.iter_mut().flatten() {
            line.spans = rebase(&line.spans, &page_spans)?;
        }
        for value in kept.extra.values_mut() {
            rebase_value(value, &page_spans)?;
        }

        let on_page = |spans: &Option<Vec<Span>>| {
            spans.as_ref().is_some_and(|spans| {
                !spans.is_empty() && spans.iter().all(|s| s.inside(&page_spans))
            })
        };
        let tables = self
            .analyze_result
            .tables
            .as_ref()
            .map(|tables| {
                tables
                    .iter()
                    .filter(|t| on_page(&t.spans))
                    .map(|t| rebase_table(t, &page_spans))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let mut extra = Map::new();
        for (key, value) in &self.analyze_result.extra {
            match value {
                Value::Array(items) => {
                    let items = items
                        .iter()
                        .filter_map(|item| {
                            let mut item = item.clone();
                            match rebase_value(&mut item, &page_spans) {
                                Ok(found) if found > 0 => Some(item),
                                _ => None,
                            }
                        })
                        .collect();
                    extra.insert(key.clone(), Value::Array(items));
                }
                Value::Object(_) => {}
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(OcrResultV3 {
            analyze_result: AnalyzeResultV3 {
                content: slice_chars(&self.analyze_result.content, &page_spans),
                pages: vec![kept],
                tables,
                extra,
            },
            extra: self.extra.clone(),
        })
    }
}

/// The smallest span covering every word and line of `page`.
fn covering_span(page: &PageV3) -> Option<Span> {
    let lines = page.lines.iter().flatten().flat_map(|l| l.spans.iter().copied());
    let (start, end) = page
        .words
        .iter()
        .map(|w| w.span)
        .chain(lines)
        .fold(None, |acc, s| match acc {
            None => Some((s.offset, s.end())),
            Some((start, end)) => Some((start.min(s.offset), end.max(s.end()))),
        })?;
    Some(Span::new(start, end - start))
}

/// The characters of `text` under `spans`, concatenated in order.
fn slice_chars(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    spans
        .iter()
        .flat_map(|s| {
            let end = s.end().min(chars.len());
            chars[s.offset.min(end)..end].iter()
        })
        .collect()
}

fn rebase(spans: &[Span], page_spans: &[Span]) -> Result<Vec<Span>> {
    spans
        .iter()
        .map(|s| s.relative_to(page_spans).map_err(OcrError::from))
        .collect()
}

fn rebase_table(table: &TableV3, page_spans: &[Span]) -> Result<TableV3> {
    let mut table = table.clone();
    if let Some(spans) = &mut table.spans {
        *spans = rebase(spans, page_spans)?;
    }
    for cell in &mut table.cells {
        if let Some(spans) = &mut cell.spans {
            *spans = rebase(spans, page_spans)?;
        }
    }
    Ok(table)
}

/// Rebases every `span` object and `spans` array nested in `value`.
/// Returns how many were rebased.
fn rebase_value(value: &mut Value, page_spans: &[Span]) -> Result<usize> {
    let mut count = 0;
    match value {
        Value::Array(items) => {
            for item in items {
                count += rebase_value(item, page_spans)?;
            }
        }
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                match key.as_str() {
                    "span" => {
                        let span: Span = serde_json::from_value(value.clone())?;
                        *value = serde_json::to_value(span.relative_to(page_spans)?)?;
                        count += 1;
                    }
                    "spans" => {
                        let spans: Vec<Span> = serde_json::from_value(value.clone())?;
                        *value = serde_json::to_value(rebase(&spans, page_spans)?)?;
                        count += spans.len();
                    }
                    _ => count += rebase_value(value, page_spans)?,
                }
            }
        }
        _ => {}
    }
    Ok(count)
}

/// Masks `span` in the `content` of every object nested in `value` whose
/// `spans` contain it, such as paragraphs or key-value pairs.
fn mask_spanned_text(value: &mut Value, span: &Span) -> usize {
    match value {
        Value::Array(items) => items.iter_mut().map(|item| mask_spanned_text(item, span)).sum(),
        Value::Object(map) => {
            let mut count = 0;
            let spans = map
                .get("spans")
                .and_then(|v| serde_json::from_value::<Vec<Span>>(v.clone()).ok());
            if let (Some(spans), Some(Value::String(content))) = (spans, map.get_mut("content")) {
                if let Ok(relative) = span.relative_to(&spans) {
                    *content = mask_span(content, relative);
                    count += 1;
                }
            }
            for (key, value) in map.iter_mut() {
                if key != "content" {
                    count += mask_spanned_text(value, span);
                }
            }
            count
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{annotation, name_annotations, v3_fixture};

    fn parse() -> OcrResultV3 {
        serde_json::from_value(v3_fixture()).unwrap()
    }

    #[test]
    fn test_page_sizes() {
        let sizes = parse().page_sizes();
        assert_eq!(sizes.get(&1), Some(&(1000.0, 1000.0)));
        assert_eq!(sizes.get(&2), Some(&(500.0, 500.0)));
    }

    #[test]
    fn test_redact_name() {
        let mut ocr = parse();
        let stats = ocr.redact(&name_annotations(), &FieldSelector::all());
        assert_eq!(stats, RedactionStats { words: 2, lines: 2, cells: 2 });

        let result = &ocr.analyze_result;
        assert_eq!(result.content, "Name: Aaaa Aaaaa\nTotal $3000.00\nJohn Doe");
        assert_eq!(result.pages[0].words[1].content, "Aaaa");
        assert_eq!(result.pages[0].words[2].content, "Aaaaa");
        assert_eq!(result.pages[0].lines.as_ref().unwrap()[0].content, "Name: Aaaa Aaaaa");
        let cells = &result.tables.as_ref().unwrap()[0].cells;
        assert_eq!(cells[0].content, "Aaaa Aaaaa");
        assert_eq!(cells[1].content, "$3000.00");
        assert_eq!(result.tables.as_ref().unwrap()[1].cells[0].content, "John Doe");
        assert_eq!(result.extra["paragraphs"][0]["content"], "Name: Aaaa Aaaaa");
        assert_eq!(result.extra["paragraphs"][1]["content"], "John Doe");
    }

    #[test]
    fn test_first_word_per_annotation_only() {
        let mut ocr = parse();
        // Covers both "John" and "Smith".
        let wide = annotation("Name", 1, &[195.0, 95.0, 405.0, 95.0, 405.0, 125.0, 195.0, 125.0]);
        let stats = ocr.redact(&[wide], &FieldSelector::all());
        assert_eq!(stats.words, 1);
        assert_eq!(ocr.analyze_result.content, "Name: Aaaa Smith\nTotal $3000.00\nJohn Doe");
    }

    #[test]
    fn test_redact_page_two_only() {
        let mut ocr = parse();
        let doe = annotation("Name", 2, &[98.0, 98.0, 302.0, 98.0, 302.0, 122.0, 98.0, 122.0]);
        ocr.redact(&[doe], &FieldSelector::all());
        assert_eq!(ocr.analyze_result.content, "Name: John Smith\nTotal $3000.00\nAaaa Doe");
        assert_eq!(ocr.analyze_result.pages[1].lines.as_ref().unwrap()[0].content, "Aaaa Doe");
    }

    #[test]
    fn test_redact_twice_equals_once() {
        let mut once = parse();
        once.redact(&name_annotations(), &FieldSelector::all());
        let mut twice = once.clone();
        twice.redact(&name_annotations(), &FieldSelector::all());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_extract_page_slices_content_to_the_page() {
        let ocr = parse();
        let page2 = ocr.extract_page(2).unwrap();
        let result = &page2.analyze_result;
        assert_eq!(page2.page_count(), 1);
        assert_eq!(result.content, "John Doe");

        let page = &result.pages[0];
        assert_eq!(page.page_number, 1);
        assert_eq!(page.spans, Some(vec![Span::new(0, 8)]));
        assert_eq!(page.words[0].span, Span::new(0, 4));
        assert_eq!(page.words[1].span, Span::new(5, 3));
        assert_eq!(page.lines.as_ref().unwrap()[0].spans, vec![Span::new(0, 8)]);

        let tables = result.tables.as_ref().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].spans, Some(vec![Span::new(0, 8)]));
        assert_eq!(tables[0].cells[0].spans, Some(vec![Span::new(0, 8)]));

        // The style runs across both pages and cannot be placed on one.
        assert_eq!(result.extra["paragraphs"].as_array().unwrap().len(), 1);
        assert_eq!(result.extra["paragraphs"][0]["spans"][0]["offset"], 0);
        assert_eq!(result.extra["styles"].as_array().unwrap().len(), 0);
        assert_eq!(result.extra["apiVersion"], "2022-08-31");

        assert!(matches!(ocr.extract_page(3), Err(OcrError::PageOutOfRange { page: 3, count: 2 })));
    }

    #[test]
    fn test_extracted_page_holds_no_other_page_text() {
        let ocr = parse();
        let page1 = ocr.extract_page(1).unwrap();
        assert_eq!(page1.analyze_result.content, "Name: John Smith\nTotal $3000.00");
        let text = serde_json::to_string(&page1).unwrap();
        assert!(!text.contains("Doe"));

        let page2 = serde_json::to_string(&ocr.extract_page(2).unwrap()).unwrap();
        assert!(!page2.contains("Smith"));
        assert!(!page2.contains("Total"));
    }

    #[test]
    fn test_redacting_an_extracted_page_matches_the_document() {
        let mut whole = parse();
        whole.redact(&name_annotations(), &FieldSelector::all());

        let mut page1 = parse().extract_page(1).unwrap();
        page1.redact(&name_annotations(), &FieldSelector::all());
        assert_eq!(page1.analyze_result.content, "Name: Aaaa Aaaaa\nTotal $3000.00");
        assert_eq!(page1, whole.extract_page(1).unwrap());
    }

    #[test]
    fn test_extract_page_without_page_spans_uses_word_and_line_range() {
        let mut ocr = parse();
        ocr.analyze_result.pages[1].spans = None;
        let page2 = ocr.extract_page(2).unwrap();
        let result = &page2.analyze_result;
        assert_eq!(result.content, "John Doe");
        assert_eq!(result.pages[0].spans, None);
        assert_eq!(result.pages[0].words[1].span, Span::new(5, 3));
        let tables = result.tables.as_ref().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].cells[0].content, "John Doe");
    }

    #[test]
    fn test_polygon_words_are_matched_and_written_back() {
        let mut value = v3_fixture();
        for page in value["analyzeResult"]["pages"].as_array_mut().unwrap() {
            for word in page["words"].as_array_mut().unwrap() {
                let word = word.as_object_mut().unwrap();
                let geometry = word.remove("boundingBox").unwrap();
                word.insert("polygon".to_string(), geometry);
            }
        }
        let mut ocr: OcrResultV3 = serde_json::from_value(value).unwrap();
        let stats = ocr.redact(&name_annotations(), &FieldSelector::all());
        assert_eq!(stats.words, 2);

        let out = serde_json::to_value(&ocr).unwrap();
        let word = &out["analyzeResult"]["pages"][0]["words"][1];
        assert_eq!(word["content"], "Aaaa");
        assert_eq!(word["polygon"][0], 200);
        assert!(word.get("boundingBox").is_none());
    }
}
