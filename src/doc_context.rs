// What a page template's decoration callback knows about the page being started.
#[derive(Debug, Clone)]
pub struct DocContext {
    pub page_index: usize,
    pub page_number: Option<usize>,
    pub template_name: String,
}

impl DocContext {
    pub fn new(
        page_index: usize,
        page_number: Option<usize>,
        template_name: impl Into<String>,
    ) -> Self {
        Self {
            page_index,
            page_number,
            template_name: template_name.into(),
        }
    }
}
