//! Static Renderer: turns the preview tree into a self-contained print document.
//!
//! Output is one HTML string with inline CSS. Page boxes have the physical paper
//! size, so the PDF service can render it at 1:1 without any measurement on our side.
//! Text that overflows a page box is clipped; only the preview's overflow check warns
//! about that beforehand.

use crate::layout::page_format::PageFormat;
use crate::layout::resolver::PagePlan;
use crate::layout::selector::CvView;
use crate::models::cv::{is_hex_color, CvDocument, LayoutMode, Locale};
use crate::render::preview::{build_preview, Block, PreviewDocument, PreviewPage, PreviewSection};
use crate::render::theme::root_variables;

const FALLBACK_ACCENT: &str = "#2b6cb0";

const STYLESHEET: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
html, body { background: #ffffff; }
body { font-family: var(--font-family); font-size: 10pt; line-height: 1.4; color: #1a202c; }
.cv-page { width: var(--page-width); height: var(--page-height); padding: var(--page-margin); overflow: hidden; page-break-after: always; break-after: page; position: relative; }
.cv-page:last-child { page-break-after: auto; break-after: auto; }
.cv-page.two-column { display: grid; grid-template-columns: 32% 1fr; column-gap: 6mm; }
.cv-sidebar { background: var(--accent); color: var(--accent-contrast); margin: calc(-1 * var(--page-margin)) 0 calc(-1 * var(--page-margin)) calc(-1 * var(--page-margin)); padding: var(--page-margin); }
.cv-photo { width: 32mm; height: 32mm; border-radius: 50%; object-fit: cover; margin-bottom: 4mm; }
.cv-section { margin-bottom: 5mm; }
.cv-section-title { font-size: 12pt; color: var(--accent); border-bottom: 0.4mm solid var(--accent); margin-bottom: 2mm; text-transform: uppercase; letter-spacing: 0.05em; }
.cv-sidebar .cv-section-title { color: var(--accent-contrast); border-color: var(--accent-contrast); }
.cv-header h1 { font-size: 22pt; color: var(--accent); }
.cv-tagline { font-size: 12pt; margin-top: 1mm; }
.cv-contacts { list-style: none; display: flex; flex-wrap: wrap; gap: 3mm; margin-top: 2mm; font-size: 9pt; }
.cv-entry { margin-bottom: 3mm; break-inside: avoid; }
.cv-entry-heading { font-weight: 600; }
.cv-entry-sub { font-style: italic; }
.cv-entry-meta { font-size: 9pt; color: #4a5568; }
.cv-entry ul { margin-left: 5mm; margin-top: 1mm; }
.cv-tags { list-style: none; display: flex; flex-wrap: wrap; gap: 1.5mm; }
.cv-tags li { border: 0.3mm solid currentColor; border-radius: 1mm; padding: 0 1.5mm; font-size: 9pt; }
.cv-lines { list-style: none; }
.cv-placeholder { color: #718096; text-align: center; margin-top: 40%; }
"#;

/// Renders the export document for a resolved CV.
pub fn render_document(doc: &CvDocument, view: &CvView<'_>, plan: &PagePlan) -> String {
    render_preview(&build_preview(doc, view, plan))
}

/// Serializes an already-built preview tree to HTML.
pub fn render_preview(preview: &PreviewDocument) -> String {
    let accent = if is_hex_color(&preview.accent_color) {
        preview.accent_color.as_str()
    } else {
        FALLBACK_ACCENT
    };

    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!(
        "<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n",
        lang(preview.locale),
        escape(&preview.title)
    ));
    html.push_str(&page_rule(preview.format));
    html.push_str(&root_variables(accent, preview.font_family, preview.format));
    html.push_str(STYLESHEET);
    html.push_str("</style>\n</head>\n<body>\n");

    for page in &preview.pages {
        write_page(&mut html, page, preview.layout_mode);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn page_rule(format: PageFormat) -> String {
    format!("@page {{ size: {}; margin: 0; }}\n", format.css_size())
}

fn lang(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "en",
        Locale::De => "de",
    }
}

fn write_page(html: &mut String, page: &PreviewPage, layout: LayoutMode) {
    let two_column = layout == LayoutMode::TwoColumn;
    html.push_str(&format!(
        "<section class=\"cv-page{}\" id=\"{}\" data-page=\"{}\">\n",
        if two_column { " two-column" } else { "" },
        escape(&page.node_id),
        page.number
    ));

    if let Some(message) = &page.placeholder {
        html.push_str(&format!(
            "<p class=\"cv-placeholder\">{}</p>\n",
            escape(message)
        ));
    }

    if two_column {
        html.push_str("<aside class=\"cv-sidebar\">\n");
        write_photo(html, page);
        for section in &page.sidebar {
            write_section(html, section);
        }
        html.push_str("</aside>\n");
    }

    html.push_str("<main class=\"cv-main\">\n");
    if !two_column {
        write_photo(html, page);
    }
    for section in &page.main {
        write_section(html, section);
    }
    html.push_str("</main>\n</section>\n");
}

fn write_photo(html: &mut String, page: &PreviewPage) {
    if let Some(url) = &page.photo_url {
        html.push_str(&format!(
            "<img class=\"cv-photo\" src=\"{}\" alt=\"\">\n",
            escape(url)
        ));
    }
}

fn write_section(html: &mut String, section: &PreviewSection) {
    html.push_str(&format!(
        "<div class=\"cv-section cv-{}\" id=\"{}\">\n",
        section.section.key(),
        escape(&section.node_id)
    ));
    if let Some(title) = &section.title {
        html.push_str(&format!(
            "<h2 class=\"cv-section-title\">{}</h2>\n",
            escape(title)
        ));
    }
    for block in &section.blocks {
        write_block(html, block);
    }
    html.push_str("</div>\n");
}

fn write_block(html: &mut String, block: &Block) {
    match block {
        Block::Header {
            full_name,
            tagline,
            contacts,
        } => {
            html.push_str(&format!("<h1>{}</h1>\n", escape(full_name)));
            if let Some(tagline) = tagline {
                html.push_str(&format!(
                    "<p class=\"cv-tagline\">{}</p>\n",
                    escape(tagline)
                ));
            }
            write_list(html, "cv-contacts", contacts);
        }
        Block::Paragraph { text } => {
            for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
                html.push_str(&format!("<p>{}</p>\n", escape(paragraph.trim())));
            }
        }
        Block::Entry {
            heading,
            subheading,
            meta,
            description,
            bullets,
            ..
        } => {
            html.push_str("<article class=\"cv-entry\">\n");
            html.push_str(&format!(
                "<div class=\"cv-entry-heading\">{}</div>\n",
                escape(heading)
            ));
            if let Some(sub) = subheading {
                html.push_str(&format!(
                    "<div class=\"cv-entry-sub\">{}</div>\n",
                    escape(sub)
                ));
            }
            if let Some(meta) = meta {
                html.push_str(&format!(
                    "<div class=\"cv-entry-meta\">{}</div>\n",
                    escape(meta)
                ));
            }
            if let Some(description) = description {
                html.push_str(&format!("<p>{}</p>\n", escape(description)));
            }
            write_list(html, "cv-bullets", bullets);
            html.push_str("</article>\n");
        }
        Block::TagGroup { label, tags, .. } => {
            html.push_str(&format!(
                "<div class=\"cv-entry-heading\">{}</div>\n",
                escape(label)
            ));
            write_list(html, "cv-tags", tags);
        }
        Block::Lines { lines } => write_list(html, "cv-lines", lines),
    }
}

fn write_list(html: &mut String, class: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    html.push_str(&format!("<ul class=\"{class}\">\n"));
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", escape(item)));
    }
    html.push_str("</ul>\n");
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
