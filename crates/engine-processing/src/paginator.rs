use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Lines remain on the current page.
    Filling,
    /// The next line must start a new page.
    Full,
}

/// Tracks page number and line position. It decides when a new page is
/// due; the engine writes the header and footer lines.
#[derive(Debug, Clone)]
pub struct Paginator {
    lines_per_page: usize,
    footer_lines: usize,
    page_number: u32,
    line_on_page: usize,
    state: PageState,
}

impl Paginator {
    /// No page is open until the first line is requested.
    pub fn new(lines_per_page: usize, footer_lines: usize) -> Self {
        Self {
            lines_per_page,
            footer_lines,
            page_number: 0,
            line_on_page: 0,
            state: PageState::Full,
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn line_on_page(&self) -> usize {
        self.line_on_page
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Whether `reserved` more lines, kept together, overflow the page body.
    pub fn needs_new_page(&self, reserved: usize) -> bool {
        let body = self.lines_per_page.saturating_sub(self.footer_lines);
        self.state == PageState::Full || self.line_on_page + reserved > body
    }

    /// Ends the current page regardless of how full it is.
    pub fn force_new_page(&mut self) {
        if self.page_number > 0 && self.line_on_page > 0 {
            debug!(page = self.page_number, line = self.line_on_page, "Forced page break");
            self.state = PageState::Full;
        }
    }

    /// Opens the next page and returns its number. Header lines are then
    /// counted through `record_line` like any other.
    pub fn start_page(&mut self) -> u32 {
        self.page_number += 1;
        self.line_on_page = 0;
        self.state = PageState::Filling;
        self.page_number
    }

    pub fn record_line(&mut self) {
        self.line_on_page += 1;
    }
}
