//! PDF serializer.
//!
//! A Tera template lays the document out as monospaced text; the lines are
//! then paginated onto A4 landscape pages using the built-in Courier font.

use lopdf::{Document, Object, Stream, dictionary};
use serde::Serialize;
use tera::{Context, Tera};

use super::RenderError;
use super::rows::{ReportDocument, Sheet};

const TEMPLATE_NAME: &str = "report.txt";

const TEMPLATE: &str = r#"{{ title }}
{{ company }}
{{ as_of_label }}: {{ as_of }}

{% for figure in figures -%}
{{ figure.label }}: {{ figure.value }}
{% endfor %}
{%- for section in sections %}
{{ section.title }} ({{ section.count }})
{% for line in section.lines -%}
{{ line }}
{% endfor -%}
{% endfor -%}
"#;

const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 36;
const FONT_SIZE: i64 = 8;
const LEADING: i64 = 10;
/// Widest cell before truncation, in characters.
const MAX_CELL_WIDTH: usize = 40;

#[derive(Serialize)]
struct Figure<'a> {
    label: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct Section<'a> {
    title: &'a str,
    count: usize,
    lines: Vec<String>,
}

/// Render the document to PDF bytes.
pub fn write_pdf(document: &ReportDocument, as_of_label: &str) -> Result<Vec<u8>, RenderError> {
    let text = render_text(document, as_of_label)?;
    let lines: Vec<&str> = text.lines().collect();
    paginate(&lines)
}

/// The laid-out text of the document.
pub fn render_text(document: &ReportDocument, as_of_label: &str) -> Result<String, RenderError> {
    let figures: Vec<Figure> = document
        .figures
        .iter()
        .map(|(label, value)| Figure { label, value })
        .collect();
    let sections: Vec<Section> = document
        .sheets
        .iter()
        .map(|sheet| Section {
            title: &sheet.title,
            count: sheet.rows.len(),
            lines: table_lines(sheet),
        })
        .collect();

    let mut context = Context::new();
    context.insert("title", &document.title);
    context.insert("company", &document.company);
    context.insert("as_of_label", as_of_label);
    context.insert("as_of", &document.as_of.format("%Y-%m-%d").to_string());
    context.insert("figures", &figures);
    context.insert("sections", &sections);

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .map_err(|e| RenderError::Template(e.to_string()))?;
    tera.autoescape_on(vec![]);

    tera.render(TEMPLATE_NAME, &context)
        .map_err(|e| RenderError::Template(e.to_string()))
}

/// Header, rule and rows with columns padded to a common width.
fn table_lines(sheet: &Sheet) -> Vec<String> {
    let widths: Vec<usize> = (0..sheet.header.len())
        .map(|col| {
            std::iter::once(&sheet.header)
                .chain(sheet.rows.iter())
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count().min(MAX_CELL_WIDTH))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |row: &[String]| -> String {
        row.iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let truncated: String = cell.chars().take(*width).collect();
                format!("{:<width$}", truncated, width = *width)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(sheet.rows.len() + 2);
    lines.push(format_row(&sheet.header));
    lines.push("-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    lines.extend(sheet.rows.iter().map(|row| format_row(row)));
    lines
}

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize
}

fn paginate(lines: &[&str]) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    let chunks: Vec<&[&str]> = if lines.is_empty() {
        vec![&[]]
    } else {
        lines.chunks(lines_per_page()).collect()
    };

    for chunk in chunks {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(chunk)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    Ok(buffer)
}

fn page_content(lines: &[&str]) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(b"BT\n");
    content.extend_from_slice(format!("/F1 {} Tf\n", FONT_SIZE).as_bytes());
    content.extend_from_slice(format!("{} {} Td\n", MARGIN, PAGE_HEIGHT - MARGIN).as_bytes());
    content.extend_from_slice(format!("{} TL\n", LEADING).as_bytes());

    for line in lines {
        content.push(b'(');
        content.extend(encode_pdf_string(line));
        content.extend_from_slice(b") Tj T*\n");
    }

    content.extend_from_slice(b"ET\n");
    content
}

/// Latin-1 bytes with PDF string delimiters escaped; other characters become `?`.
fn encode_pdf_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            c if c.is_control() => out.push(b' '),
            c if (c as u32) < 0x100 => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}
