//! Turns uploaded bytes into plain text, one parser per [`SourceType`].

use crate::error::IngestError;
use calamine::{Data, Reader};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Cursor;
use voxlead_types::SourceType;

/// Extracts the text of a document. Whitespace-only output is an error.
pub fn parse_document(source_type: SourceType, bytes: &[u8]) -> Result<String, IngestError> {
    let text = match source_type {
        SourceType::Pdf => parse_pdf(bytes)?,
        SourceType::Csv => parse_csv(bytes)?,
        SourceType::Excel => parse_excel(bytes)?,
        SourceType::Notion => String::from_utf8(bytes.to_vec())?,
        SourceType::Airtable => parse_airtable(bytes)?,
        SourceType::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(IngestError::EmptyDocument);
    }
    Ok(text.to_string())
}

fn parse_pdf(bytes: &[u8]) -> Result<String, IngestError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))
}

/// One block per row, one `header: value` line per non-empty cell.
fn parse_csv(bytes: &[u8]) -> Result<String, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut blocks = Vec::new();
    for record in reader.records() {
        let record = record?;
        let lines: Vec<String> = record
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(i, value)| match headers.get(i) {
                Some(header) if !header.is_empty() => format!("{header}: {value}"),
                _ => value.to_string(),
            })
            .collect();
        if !lines.is_empty() {
            blocks.push(lines.join("\n"));
        }
    }
    Ok(blocks.join("\n\n"))
}

/// Every sheet of the workbook, first row taken as headers.
fn parse_excel(bytes: &[u8]) -> Result<String, IngestError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sections = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(|cell| cell.to_string()).collect(),
            None => continue,
        };

        let mut blocks = vec![format!("# {name}")];
        for row in rows {
            let lines: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(_, cell)| !matches!(cell, Data::Empty))
                .map(|(i, cell)| match headers.get(i).filter(|h| !h.is_empty()) {
                    Some(header) => format!("{header}: {cell}"),
                    None => cell.to_string(),
                })
                .collect();
            if !lines.is_empty() {
                blocks.push(lines.join("\n"));
            }
        }
        sections.push(blocks.join("\n\n"));
    }
    Ok(sections.join("\n\n"))
}

#[derive(Deserialize)]
struct AirtableExport {
    #[serde(default)]
    records: Vec<AirtableRecord>,
}

#[derive(Deserialize)]
struct AirtableRecord {
    #[serde(default)]
    fields: Map<String, Value>,
}

fn parse_airtable(bytes: &[u8]) -> Result<String, IngestError> {
    let export: AirtableExport = serde_json::from_slice(bytes)?;
    let blocks: Vec<String> = export
        .records
        .iter()
        .map(|record| {
            record
                .fields
                .iter()
                .filter_map(|(key, value)| render_value(value).map(|v| format!("{key}: {v}")))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|block| !block.is_empty())
        .collect();
    Ok(blocks.join("\n\n"))
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_render_as_header_value_pairs() {
        let csv = b"address,price,rooms\n12 rue Victor Hugo,350000,3\n8 avenue Foch,,5\n";
        let text = parse_document(SourceType::Csv, csv).expect("csv");
        assert_eq!(
            text,
            "address: 12 rue Victor Hugo\nprice: 350000\nrooms: 3\n\naddress: 8 avenue Foch\nrooms: 5"
        );
    }

    #[test]
    fn airtable_records_are_flattened() {
        let json = br#"{"records":[
            {"id":"rec1","fields":{"Name":"Loft Bastille","Tags":["loft","balcony"],"Price":420000}},
            {"id":"rec2","fields":{}}
        ]}"#;
        let text = parse_document(SourceType::Airtable, json).expect("airtable");
        assert!(text.contains("Name: Loft Bastille"));
        assert!(text.contains("Tags: loft, balcony"));
        assert!(text.contains("Price: 420000"));
    }

    #[test]
    fn text_is_decoded_lossily() {
        let text = parse_document(SourceType::Text, b"caf\xe9 ouvert").expect("text");
        assert!(text.starts_with("caf"));
        assert!(text.ends_with("ouvert"));
    }

    #[test]
    fn notion_requires_utf8() {
        assert!(matches!(
            parse_document(SourceType::Notion, b"\xff\xfe"),
            Err(IngestError::Utf8(_))
        ));
        let text = parse_document(SourceType::Notion, "# Visites\n- samedi".as_bytes())
            .expect("notion");
        assert_eq!(text, "# Visites\n- samedi");
    }

    #[test]
    fn blank_documents_are_rejected() {
        assert!(matches!(
            parse_document(SourceType::Text, b"  \n\t "),
            Err(IngestError::EmptyDocument)
        ));
        assert!(matches!(
            parse_document(SourceType::Csv, b"a,b\n"),
            Err(IngestError::EmptyDocument)
        ));
    }

    #[test]
    fn garbage_pdf_fails() {
        assert!(parse_document(SourceType::Pdf, b"not a pdf").is_err());
    }
}
