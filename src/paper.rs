//! HTML preview of the question paper.
//!
//! The preview is what gets captured for export: a white A4-width page with
//! an optional header and the questions in a `pre-wrap` block, so the model's
//! line layout (single-line options, blank lines between questions) survives.
//! Math papers pull in MathJax configured for `$…$` and `$$…$$`.

use crate::config::GenerationConfig;
use std::fmt::Write as _;

/// Shown in place of an empty answer key.
pub const NO_ANSWERS_NOTICE: &str = "No answers to display yet, or AI did not provide answers.";

const MATHJAX_CONFIG: &str = r#"<script>
window.MathJax = {
  tex: { inlineMath: [['$', '$']], displayMath: [['$$', '$$']] },
  svg: { fontCache: 'global' }
};
</script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>"#;

/// Render the questions as a standalone HTML document.
pub fn render_html(questions: &str, config: &GenerationConfig) -> String {
    let mut html = String::with_capacity(questions.len() + 2048);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        html,
        "<title>{}</title>",
        escape_html(&config.institution_name)
    );
    html.push_str(
        "<style>\n\
body { margin: 0; background: #ffffff; color: #000000; }\n\
h1, h2 { text-align: center; margin: 0 0 0.4em 0; }\n\
#pdf-content-area { width: 210mm; min-height: 200px; box-sizing: border-box; \
white-space: pre-wrap; font-family: serif; }\n\
</style>\n",
    );
    if config.is_math_paper {
        html.push_str(MATHJAX_CONFIG);
        html.push('\n');
    }
    html.push_str("</head>\n<body>\n");

    let padding_top = if config.show_paper_header { "2rem" } else { "0px" };
    let _ = writeln!(
        html,
        "<div id=\"pdf-content-area\" style=\"font-size: {}pt; padding: {} 2rem 2rem 2rem;\">",
        config.pdf_font_size, padding_top
    );

    if config.show_paper_header {
        let _ = writeln!(html, "<h1>{}</h1>", escape_html(&config.institution_name));
        html.push_str("<h2>Question Paper</h2>\n");
        let _ = writeln!(
            html,
            "<p style=\"text-align: center; font-size: 0.9em; margin-bottom: 15px;\">\
<strong>Subject:</strong> Based on Uploaded Chapter | <strong>Type:</strong> {} | \
<strong>Total Questions:</strong> {}</p>",
            escape_html(&config.question_type.to_string()),
            config.num_questions
        );
    }

    let _ = writeln!(html, "<div>{}</div>", escape_html(questions));
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// The answer key as shown to the user.
pub fn render_answers(answers: &str) -> &str {
    if answers.trim().is_empty() {
        NO_ANSWERS_NOTICE
    } else {
        answers
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
