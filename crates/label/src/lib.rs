//! Label file redaction: masks the `text` of every entity whose field is
//! selected. Boxes, pages and unknown keys are left as they are.

use fott_core::LabelDocument;
use fott_rules::{mask, FieldSelector};

/// Masks selected entities in place and returns how many were masked.
pub fn redact_label(document: &mut LabelDocument, fields: &FieldSelector) -> usize {
    let mut masked = 0;
    for label in document.labels.iter_mut().filter(|l| fields.is_selected(&l.field)) {
        for entity in &mut label.entities {
            entity.text = mask(&entity.text);
            masked += 1;
        }
    }
    log::debug!("[Label] masked {} entities", masked);
    masked
}

/// Parses, redacts and re-serializes a label file.
pub fn redact_label_bytes(bytes: &[u8], fields: &FieldSelector) -> fott_core::Result<Vec<u8>> {
    let mut document: LabelDocument = fott_core::from_json_slice(bytes)?;
    redact_label(&mut document, fields);
    fott_core::to_json_vec(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> LabelDocument {
        serde_json::from_value(json!({
            "document": "a.jpg",
            "labels": [
                {"label": "Name", "value": [{
                    "page": 1,
                    "text": "John Smith",
                    "boundingBoxes": [[0.1, 0.1, 0.2, 0.1, 0.2, 0.2, 0.1, 0.2]]
                }]},
                {"label": "Date", "value": [
                    {"page": 1, "text": "1900/01/01", "boundingBoxes": []},
                    {"page": 2, "text": "Jan 2", "boundingBoxes": []}
                ]},
                {"label": "Total", "value": [{"page": 1, "text": "$3000.00", "boundingBoxes": []}]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_redact_all_fields() {
        let mut doc = sample();
        assert_eq!(redact_label(&mut doc, &FieldSelector::all()), 4);
        assert_eq!(doc.labels[0].entities[0].text, "Aaaa Aaaaa");
        assert_eq!(doc.labels[1].entities[0].text, "0000/00/00");
        assert_eq!(doc.labels[1].entities[1].text, "Aaa 0");
        assert_eq!(doc.labels[2].entities[0].text, "$0000.00");
    }

    #[test]
    fn test_redact_selected_field_only() {
        let original = sample();
        let mut doc = sample();
        assert_eq!(redact_label(&mut doc, &FieldSelector::new(["Name"])), 1);
        assert_eq!(doc.labels[0].entities[0].text, "Aaaa Aaaaa");
        assert_eq!(doc.labels[1], original.labels[1]);
        assert_eq!(doc.labels[2], original.labels[2]);
        assert_eq!(
            doc.labels[0].entities[0].bounding_boxes,
            original.labels[0].entities[0].bounding_boxes
        );
    }

    #[test]
    fn test_no_matching_field_is_noop() {
        let mut doc = sample();
        assert_eq!(redact_label(&mut doc, &FieldSelector::new(["Missing"])), 0);
        assert_eq!(doc, sample());
    }

    #[test]
    fn test_redact_twice_equals_once() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let once = redact_label_bytes(&bytes, &FieldSelector::all()).unwrap();
        let twice = redact_label_bytes(&once, &FieldSelector::all()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bytes_keep_unknown_keys() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let out = redact_label_bytes(&bytes, &FieldSelector::all()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["document"], json!("a.jpg"));
    }

    #[test]
    fn test_missing_labels_key_fails() {
        assert!(redact_label_bytes(br#"{"document": "a.jpg"}"#, &FieldSelector::all()).is_err());
    }
}
