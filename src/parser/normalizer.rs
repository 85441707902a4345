// file: src/parser/normalizer.rs
// description: text normalization applied before chunking
// reference: unicode whitespace handling in std::char

pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, content: &str) -> String {
        let stripped = self.strip_control_chars(content);
        self.collapse_whitespace(&stripped)
    }

    fn strip_control_chars(&self, content: &str) -> String {
        content
            .chars()
            .map(|c| if c.is_control() && !c.is_whitespace() { ' ' } else { c })
            .collect()
    }

    fn collapse_whitespace(&self, content: &str) -> String {
        content.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
