use lopdf::Document;
use tracing::debug;

/// Reader for PDF documents, yielding the text of one page at a time
///
/// Only a simple version currently.
/// Only able to read text content that are not "drawn".
/// Pages without any text are skipped.
#[derive(Debug)]
pub struct PdfReader {
    source: Document,
    page_numbers: Vec<u32>,
    next_page_index: usize,
}

impl PdfReader {
    /// Parses a whole PDF document held in memory
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, lopdf::Error> {
        let source = Document::load_mem(bytes)?;
        let page_numbers: Vec<u32> = source.get_pages().into_keys().collect();

        debug!("PDF reader source: nb pages: {}", page_numbers.len());

        Ok(Self {
            source,
            page_numbers,
            next_page_index: 0,
        })
    }

    pub fn total_pages(&self) -> usize {
        self.page_numbers.len()
    }

    /// Reads every remaining page and merges their texts, in page order
    pub fn read_to_string(self) -> Result<String, lopdf::Error> {
        self.collect()
    }
}

impl Iterator for PdfReader {
    type Item = Result<String, lopdf::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(page_number) = self.page_numbers.get(self.next_page_index).copied() {
            self.next_page_index += 1;

            match self.source.extract_text(&[page_number]) {
                Ok(content) if content.is_empty() => continue,
                Ok(content) => return Some(Ok(content)),
                Err(error) => return Some(Err(error)),
            }
        }

        None
    }
}
