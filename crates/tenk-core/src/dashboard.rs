//! HTML dashboard rendering with a deterministic fallback page.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tenk_llm::any::AnyProvider;
use tenk_llm::provider::{CompletionOptions, Message};
use tenk_llm::sanitize::clean_completion;

use crate::decompose::complete_within;

const SYSTEM_PROMPT: &str = "You are a financial front-end generator that creates elegant, responsive, and insightful dashboards. \
Your job is to analyze the financial text provided by the user and return a COMPLETE, SELF-CONTAINED HTML document ONLY \
(no markdown, no prose outside HTML, no explanations). The output should be production-grade, suitable for executive review.\n\n\
Design Requirements:\n\
1. Analyze the text for clear financial metrics: revenue, net income, operating income, cash, debt, equity, assets, R&D expenses, etc. \
Parse time series (annual or quarterly), segment breakdowns, and calculate derived metrics like ROE and profit margins when possible.\n\
2. Build visually appealing KPI cards:\n\
   - Use a modern, responsive grid layout (Flexbox or CSS Grid).\n\
   - Display KPIs with currency symbols, large bold numbers, labels, optional percent change YoY if present.\n\
   - Use color indicators (green for positive change, red for negative).\n\
3. Render insightful charts using Chart.js:\n\
   - Line chart: revenue and net income over time (by year or quarter).\n\
   - Bar chart: segment breakdowns or expense categories if found.\n\
   - Optional: pie chart for composition if useful.\n\
   - Charts must use different colors for each series, and include titles and axis labels.\n\
4. Style Requirements:\n\
   - Use embedded CSS (no external stylesheets or fonts).\n\
   - Light, professional theme (white background, gray tones, modern font like Arial or system default).\n\
   - Ensure mobile responsiveness.\n\
5. Optional Enhancements (if data allows):\n\
   - Include tooltips, legends, and hover effects on charts.\n\
   - Annotate charts with YoY % changes.\n\
   - Add ROE if both net income and equity are available.\n\
   - Create a summary section or executive overview with bullet points if needed.\n\
6. Never fabricate values. Only display what can be confidently extracted or calculated from the input. Skip unknowns gracefully.\n\n\
Output: A single full HTML5 document, ready to serve directly in a browser. Embed all JS/CSS inline via CDN.";

const FALLBACK_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Financial Dashboard</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        h1 { color: #333; text-align: center; margin-bottom: 30px; }
        .content { line-height: 1.5; color: #222; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Financial Analysis Dashboard</h1>
        <div class="content">
"#;

const FALLBACK_TAIL: &str = r"
        </div>
    </div>
</body>
</html>
";

fn user_prompt(title: &str, context: &str) -> String {
    format!(
        "Title for the page: {title}\n\n\
         Below is the free-form financial context. Extract what you can confidently, and render KPI cards and charts. \
         Only include tables/charts that correspond to metrics explicitly present in the text. \
         Do NOT fabricate intermediate years/quarters that are not in the text. \
         Prefer exact values and labels that appear in the text. \
         Return ONLY the HTML document.\n\n\
         ----- BEGIN CONTEXT -----\n\
         {context}\n\
         ----- END CONTEXT -----\n"
    )
}

/// Static page with the context HTML-escaped and newlines as `<br>`.
#[must_use]
pub fn fallback_html(context: &str) -> String {
    let escaped = html_escape::encode_safe(context).replace('\n', "<br>\n");
    let mut page = String::with_capacity(FALLBACK_HEAD.len() + escaped.len() + FALLBACK_TAIL.len());
    page.push_str(FALLBACK_HEAD);
    page.push_str(&escaped);
    page.push_str(FALLBACK_TAIL);
    page
}

fn is_html_document(text: &str) -> bool {
    text.to_ascii_lowercase().contains("<html")
}

/// Renders aggregated filing context into a dashboard page.
pub struct DashboardGenerator {
    provider: Arc<AnyProvider>,
    options: CompletionOptions,
    output_path: Option<PathBuf>,
}

impl DashboardGenerator {
    #[must_use]
    pub fn new(provider: Arc<AnyProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions::new(0.2, 0.9, 3500).with_timeout(Duration::from_secs(90)),
            output_path: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Also write every rendered page to `path`.
    #[must_use]
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    /// Render `context` as a complete HTML document. Never fails: upstream
    /// errors, timeouts and non-HTML replies produce [`fallback_html`].
    pub async fn render(&self, context: &str, title: &str) -> String {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(title, context)),
        ];

        let html = match complete_within(self.provider.as_ref(), &messages, &self.options).await {
            Ok(raw) => {
                let cleaned = clean_completion(&raw);
                if cleaned.is_empty() || !is_html_document(&cleaned) {
                    tracing::warn!(len = cleaned.len(), "dashboard reply is not an HTML document, using fallback");
                    fallback_html(context)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!("dashboard generation failed, using fallback: {e:#}");
                fallback_html(context)
            }
        };

        if let Some(ref path) = self.output_path {
            match tokio::fs::write(path, &html).await {
                Ok(()) => tracing::info!(path = %path.display(), "dashboard written"),
                Err(e) => tracing::warn!(path = %path.display(), "failed to write dashboard: {e}"),
            }
        }
        html
    }
}
