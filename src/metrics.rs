#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_index: usize,
    pub page_number: Option<usize>,
    pub template: String,
    pub render_ms: f64,
    pub command_count: usize,
    pub flowable_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_render_ms: f64,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn numbered_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.page_number.is_some())
            .count()
    }
}
