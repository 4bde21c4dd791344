//! Request Context Formatting
//!
//! Turns the structured context bundle attached to a request into a
//! bounded text block the router prepends to the prompt. Pure string
//! work, no I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Longest page-content excerpt included in a formatted block, in
/// characters. Longer content is cut and marked with an ellipsis.
pub const MAX_PAGE_CONTENT_CHARS: usize = 2000;

/// Structured context accompanying a request.
///
/// All fields are optional; absent fields produce no output line. Fields
/// are emitted in a fixed order regardless of how the bundle was built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Title of the page the user is looking at
    pub page_title: Option<String>,

    /// URL of that page
    pub page_url: Option<String>,

    /// Page text, truncated during formatting
    pub page_content: Option<String>,

    /// What the user is trying to accomplish
    pub user_intent: Option<String>,
}

impl RequestContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loose string map, ignoring unrecognized keys
    #[must_use]
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            page_title: map.get("page_title").cloned(),
            page_url: map.get("page_url").cloned(),
            page_content: map.get("page_content").cloned(),
            user_intent: map.get("user_intent").cloned(),
        }
    }

    /// Set the page title
    #[must_use]
    pub fn with_page_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = Some(title.into());
        self
    }

    /// Set the page URL
    #[must_use]
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Set the page content
    #[must_use]
    pub fn with_page_content(mut self, content: impl Into<String>) -> Self {
        self.page_content = Some(content.into());
        self
    }

    /// Set the user intent
    #[must_use]
    pub fn with_user_intent(mut self, intent: impl Into<String>) -> Self {
        self.user_intent = Some(intent.into());
        self
    }

    /// Whether no recognized field is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page_title.is_none()
            && self.page_url.is_none()
            && self.page_content.is_none()
            && self.user_intent.is_none()
    }

    /// Render the context block.
    ///
    /// Lines appear in the order: page title, URL, page content (truncated
    /// to [`MAX_PAGE_CONTENT_CHARS`]), user intent. An empty context
    /// renders to an empty string, which the router must not prepend.
    #[must_use]
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref title) = self.page_title {
            parts.push(format!("Page Title: {title}"));
        }

        if let Some(ref url) = self.page_url {
            parts.push(format!("URL: {url}"));
        }

        if let Some(ref content) = self.page_content {
            parts.push(format!("Page Content: {}", truncate(content)));
        }

        if let Some(ref intent) = self.user_intent {
            parts.push(format!("User Intent: {intent}"));
        }

        parts.join("\n")
    }
}

/// Cut content to the excerpt budget, counting characters rather than
/// bytes so multi-byte text cannot split a boundary.
fn truncate(content: &str) -> String {
    let mut chars = content.char_indices();
    match chars.nth(MAX_PAGE_CONTENT_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}
