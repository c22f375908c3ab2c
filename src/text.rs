//! Text normalisation for producer output (OCR text, visual descriptions).

/// Collapse all runs of whitespace, including newlines, into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the text that gets embedded for a screenshot.
///
/// Both parts are whitespace-normalised and space-joined. Either part may be
/// empty, in which case the result is just the other part (or empty).
pub fn combine_text(ocr_text: &str, visual_description: &str) -> String {
    let ocr = normalize_whitespace(ocr_text);
    let visual = normalize_whitespace(visual_description);

    match (ocr.is_empty(), visual.is_empty()) {
        (false, false) => format!("{} {}", ocr, visual),
        (false, true) => ocr,
        (true, _) => visual,
    }
}
