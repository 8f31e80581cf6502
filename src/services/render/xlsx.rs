//! Minimal Office Open XML workbook writer.
//!
//! Every cell is written as an inline string, which keeps the workbook free
//! of a shared-strings table and styles.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::RenderError;
use super::rows::{ReportDocument, Sheet};

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

/// Serialize the document's sheets into `.xlsx` bytes.
pub fn write_workbook(document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
    let sheets: Vec<&Sheet> = document.sheets.iter().collect();
    if sheets.is_empty() {
        return Err(RenderError::Xlsx("workbook has no sheets".to_string()));
    }

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types(sheets.len())),
        ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
        ("xl/workbook.xml".to_string(), workbook(&sheets)),
        ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels(sheets.len())),
    ];
    for (index, sheet) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", index + 1),
            worksheet(sheet),
        ));
    }

    for (name, content) in parts {
        zip.start_file(name.as_str(), options)
            .map_err(|e| RenderError::Xlsx(format!("Failed to add {}: {}", name, e)))?;
        zip.write_all(content.as_bytes())
            .map_err(|e| RenderError::Xlsx(format!("Failed to write {}: {}", name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| RenderError::Xlsx(format!("Failed to finish workbook: {}", e)))?;

    Ok(cursor.into_inner())
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(CONTENT_TYPES_HEAD);
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            index
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook(sheets: &[&Sheet]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (index, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(xml_text(&sheet_name(&sheet.title, index)).as_str()),
            index + 1,
            index + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            index, index
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn worksheet(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let all_rows = std::iter::once(&sheet.header).chain(sheet.rows.iter());
    for (row_index, row) in all_rows.enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (col_index, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(col_index),
                row_number,
                escape(xml_text(value).as_str())
            ));
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column letters: 0 → A, 25 → Z, 26 → AA.
pub fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Replace characters XML 1.0 cannot carry, even as references, with a space.
fn xml_text(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => c,
            c if c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}' => ' ',
            c => c,
        })
        .collect()
}

fn sheet_name(title: &str, index: usize) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        cleaned
    }
}
