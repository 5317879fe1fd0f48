use crate::model::{Point, TextRange};

/// Byte offset to (line, UTF-16 column) conversion over one text.
pub struct LineMap<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineMap<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn offset_to_point(&self, offset: usize) -> Point {
        let offset = offset.min(self.text.len());
        match self.line_starts.binary_search(&offset) {
            Ok(line) => Point {
                line: line as u32,
                col: 0,
            },
            Err(next_line_idx) => {
                let line = next_line_idx - 1;
                let line_start = self.line_starts[line];
                let col = self.text[line_start..offset].encode_utf16().count();
                Point {
                    line: line as u32,
                    col: col as u32,
                }
            }
        }
    }

    pub fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange {
            start: self.offset_to_point(start),
            end: self.offset_to_point(end),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_on_second_line() {
        let text = "abc\ndef";
        let map = LineMap::new(text);
        assert_eq!(map.offset_to_point(5), Point { line: 1, col: 1 });
        assert_eq!(map.offset_to_point(4), Point { line: 1, col: 0 });
        assert_eq!(map.line_count(), 2);
    }

    #[test]
    fn test_columns_count_utf16_units() {
        let text = "和[[a]]";
        let map = LineMap::new(text);
        // '和' is 3 bytes in UTF-8 but one UTF-16 unit
        assert_eq!(map.offset_to_point(3), Point { line: 0, col: 1 });
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let map = LineMap::new("ab");
        assert_eq!(map.offset_to_point(10), Point { line: 0, col: 2 });
    }
}
