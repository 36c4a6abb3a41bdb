//! Offset/length intervals into a document's global text buffer.

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Whether `other` lies entirely within this span.
    pub fn includes(&self, other: &Span) -> bool {
        self.offset <= other.offset && self.end() >= other.end()
    }

    /// Whether some span of `containers` includes this one.
    pub fn inside(&self, containers: &[Span]) -> bool {
        containers.iter().any(|c| c.includes(self))
    }

    /// Position of this span within the text formed by concatenating
    /// `containers` in order.
    ///
    /// The offset is the summed length of the containers before the first one
    /// that includes this span, plus the distance into that container.
    pub fn relative_to(&self, containers: &[Span]) -> Result<Span> {
        let mut offset = 0;
        for container in containers {
            if container.includes(self) {
                offset += self.offset - container.offset;
                return Ok(Span::new(offset, self.length));
            }
            offset += container.length;
        }
        Err(CoreError::SpanOutside {
            offset: self.offset,
            length: self.length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_includes_edges() {
        let line = Span::new(10, 5);
        assert!(line.includes(&Span::new(10, 5)));
        assert!(line.includes(&Span::new(12, 3)));
        assert!(!line.includes(&Span::new(9, 2)));
        assert!(!line.includes(&Span::new(14, 2)));
    }

    #[test]
    fn test_relative_to_single_container() {
        let word = Span::new(27, 6);
        let rel = word.relative_to(&[Span::new(20, 20)]).unwrap();
        assert_eq!(rel, Span::new(7, 6));
    }

    #[test]
    fn test_relative_to_second_container() {
        // A cell whose text spans two non-adjacent runs of the content.
        let containers = [Span::new(0, 4), Span::new(10, 8)];
        let rel = Span::new(12, 3).relative_to(&containers).unwrap();
        assert_eq!(rel, Span::new(6, 3));
    }

    #[test]
    fn test_relative_to_outside_fails() {
        let containers = [Span::new(0, 4), Span::new(10, 8)];
        let word = Span::new(3, 3);
        assert!(!word.inside(&containers));
        assert!(matches!(
            word.relative_to(&containers),
            Err(CoreError::SpanOutside { offset: 3, length: 3 })
        ));
    }

    #[test]
    fn test_empty_span_inside_container() {
        assert!(Span::new(5, 0).inside(&[Span::new(0, 5)]));
    }

    proptest! {
        #[test]
        fn prop_relative_offset_stays_in_bounds(
            lengths in proptest::collection::vec(1usize..20, 1..6),
            pick in 0usize..6,
            start in 0usize..20,
            len in 0usize..20,
        ) {
            // Lay the containers out with one character gaps in between.
            let mut containers = Vec::new();
            let mut cursor = 0;
            for l in &lengths {
                containers.push(Span::new(cursor, *l));
                cursor += l + 1;
            }
            let target = containers[pick % containers.len()];
            let start = start % target.length;
            let len = len % (target.length - start + 1);
            let span = Span::new(target.offset + start, len);

            let rel = span.relative_to(&containers).unwrap();
            let total: usize = lengths.iter().sum();
            prop_assert!(rel.end() <= total);
            prop_assert_eq!(rel.length, span.length);
        }
    }
}
