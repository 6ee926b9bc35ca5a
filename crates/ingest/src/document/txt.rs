use legis_core::Page;

/// Decode bytes (UTF-8, lossy fallback) and split pages on form feed.
/// Line structure is preserved; the chunker depends on it.
pub fn extract_txt(bytes: &[u8]) -> Vec<Page> {
    let text = String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    text.split('\x0C')
        .enumerate()
        .map(|(i, page_text)| Page::new(i as u32 + 1, page_text))
        .collect()
}
