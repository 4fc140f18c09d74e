// ============================================================
// Layer 4 — Narrative Preprocessor
// ============================================================
// Cleans complaint narratives before they are chunked.
//
// Consumer complaint exports typically contain:
//   - Redaction masks such as "XXXX" or "XX/XX/XXXX" where
//     names, dates and account numbers were removed
//   - Tabs, non-breaking spaces and \r\n line endings
//   - Runs of spaces and blank lines from form pasting
//
// Masks carry no meaning for retrieval but do match each
// other across unrelated complaints, so each mask run is
// collapsed to a single "[redacted]" token.
//
// Cleaning steps (applied in order):
//   1. Normalise whitespace and control characters
//   2. Collapse redaction masks
//   3. Collapse runs of spaces, trim each line
//   4. Allow at most one blank line between paragraphs

pub const REDACTION_TOKEN: &str = "[redacted]";

pub struct Preprocessor {
    mask_redactions: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { mask_redactions: true }
    }

    /// Keep redaction masks verbatim.
    pub fn keep_redactions(mut self) -> Self {
        self.mask_redactions = false;
        self
    }

    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: Normalise individual characters ───────────────────────────
        let normalised: String = text
            .replace("\r\n", "\n")
            .chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                '\r' => '\n',
                c if c.is_control() && c != '\n' => ' ',
                c => c,
            })
            .collect();

        // ── Step 2 + 3: Per line, mask redactions and collapse spaces ─────────
        let lines: Vec<String> = normalised
            .lines()
            .map(|line| {
                let words = line.split(' ').filter(|w| !w.is_empty());
                let mut out: Vec<&str> = Vec::new();
                for word in words {
                    let word = if self.mask_redactions && is_redaction(word) {
                        REDACTION_TOKEN
                    } else {
                        word
                    };
                    // "XXXX XXXX" → one token
                    if word == REDACTION_TOKEN && out.last() == Some(&REDACTION_TOKEN) {
                        continue;
                    }
                    out.push(word);
                }
                out.join(" ")
            })
            .collect();

        // ── Step 4: Collapse excessive blank lines ────────────────────────────
        let mut result = String::with_capacity(normalised.len());
        let mut blank_run = 0usize;
        for line in &lines {
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            result.push_str(line);
            result.push('\n');
        }

        result.trim().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// A word made only of X's, slashes, dashes and trailing punctuation,
/// with at least two X's: "XXXX", "XX/XX/XXXX", "XXXX-XXXX,", "{$XXXX}".
fn is_redaction(word: &str) -> bool {
    let core = word.trim_matches(|c: char| c.is_ascii_punctuation() && c != '/' && c != '-');
    let core = core.trim_start_matches('$');
    let xs = core.chars().filter(|&c| c == 'X' || c == 'x').count();
    xs >= 2
        && core.chars().all(|c| matches!(c, 'X' | 'x' | '/' | '-'))
        && core.chars().any(|c| c == 'X')
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("late   fee\tcharged"), "late fee charged");
    }

    #[test]
    fn test_masks_redactions() {
        let p = Preprocessor::new();
        assert_eq!(
            p.clean("On XX/XX/XXXX I called XXXX XXXX about my card."),
            "On [redacted] I called [redacted] about my card."
        );
    }

    #[test]
    fn test_keep_redactions() {
        let p = Preprocessor::new().keep_redactions();
        assert_eq!(p.clean("called  XXXX"), "called XXXX");
    }

    #[test]
    fn test_ordinary_words_are_not_masked() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Xbox x-ray tax"), "Xbox x-ray tax");
    }

    #[test]
    fn test_windows_line_endings_and_blank_lines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("one\r\n\r\n\r\n\r\ntwo\r\nthree"), "one\n\ntwo\nthree");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Preprocessor::new().clean("   "), "");
    }
}
