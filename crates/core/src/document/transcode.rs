//! Content-type driven transcoding of document text into JSON
//!
//! - spreadsheets cannot be represented and are refused
//! - XML becomes a nested object keyed by element names
//! - `text/plain` is parsed as JSON, else as a tab-delimited flat file
//! - JSON is parsed as-is
//! - anything else stays text

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use spapi_domain::{DocumentContent, Result, SpApiError};

/// Transcode decoded document text according to its content type.
///
/// # Errors
/// - `Parse` for spreadsheet content, malformed XML or malformed flat files
/// - `JsonParse` for a JSON content type whose body is not JSON
pub fn to_json(text: String, content_type: Option<&str>) -> Result<DocumentContent> {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("spreadsheet") || content_type.contains("ms-excel") {
        return Err(SpApiError::Parse(
            "spreadsheet documents cannot be converted to JSON; download without json".into(),
        ));
    }
    if content_type.contains("xml") {
        return xml_to_value(&text).map(DocumentContent::Json);
    }
    if content_type.contains("plain") {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return Ok(DocumentContent::Json(value));
        }
        return tsv_to_rows(&text).map(DocumentContent::Json);
    }
    if content_type.contains("json") {
        return serde_json::from_str(&text)
            .map(DocumentContent::Json)
            .map_err(|_| SpApiError::JsonParse { body: text });
    }
    Ok(DocumentContent::Text(text))
}

/// Convert a tab-delimited flat file with a header row into row objects.
///
/// Quoting is disabled: quote characters are kept verbatim. Short rows only
/// carry the columns they have; extra fields are dropped.
pub fn tsv_to_rows(text: &str) -> Result<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| SpApiError::Parse(format!("invalid flat file header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SpApiError::Parse(format!("invalid flat file row: {e}")))?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut children = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| xml_error(&e))?;
            let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
            let value = attribute.unescape_value().map_err(|e| xml_error(&e))?;
            children.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self { name, children, text: String::new() })
    }

    fn close(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            let mut children = self.children;
            if !self.text.is_empty() {
                children.insert("#text".to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn xml_error(err: &dyn std::fmt::Display) -> SpApiError {
    SpApiError::Parse(format!("invalid XML document: {err}"))
}

/// Repeated sibling elements collapse into an array.
fn attach(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Parse XML into a nested JSON object.
///
/// Elements become keys, attributes are prefixed with `@`, mixed text is
/// kept under `#text` and leaf elements become strings.
pub fn xml_to_value(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut root = Map::new();
    let mut stack: Vec<Frame> = Vec::new();
    loop {
        match reader.read_event().map_err(|e| xml_error(&e))? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Text(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&content.unescape().map_err(|e| xml_error(&e))?);
                }
            }
            Event::CData(content) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| xml_error(&"unbalanced closing tag"))?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(&"unexpected end of document"));
    }
    if root.is_empty() {
        return Err(xml_error(&"no root element"));
    }
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn spreadsheet_content_is_refused() {
        let err = to_json(
            "PK..".into(),
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        )
        .unwrap_err();
        assert!(matches!(err, SpApiError::Parse(_)));
        assert!(to_json("x".into(), Some("application/vnd.ms-excel")).is_err());
    }

    #[test]
    fn plain_text_falls_back_to_tab_delimited_rows() {
        let text = "sku\tquantity\tnote\nA-1\t5\tsays \"hi\"\nB-2\t0\t\n".to_string();
        let content = to_json(text, Some("text/plain; charset=utf-8")).unwrap();
        assert_eq!(
            content,
            DocumentContent::Json(json!([
                { "sku": "A-1", "quantity": "5", "note": "says \"hi\"" },
                { "sku": "B-2", "quantity": "0", "note": "" }
            ]))
        );
    }

    #[test]
    fn plain_text_holding_json_is_parsed_directly() {
        let content = to_json(r#"{"a":[1,2]}"#.into(), Some("text/plain")).unwrap();
        assert_eq!(content, DocumentContent::Json(json!({ "a": [1, 2] })));
    }

    #[test]
    fn xml_becomes_nested_object() {
        let xml = r#"<?xml version="1.0"?>
<Report version="1">
  <Item><Sku>A-1</Sku></Item>
  <Item><Sku>B-2</Sku></Item>
  <Empty/>
</Report>"#;
        let content = to_json(xml.into(), Some("text/xml")).unwrap();
        assert_eq!(
            content,
            DocumentContent::Json(json!({
                "Report": {
                    "@version": "1",
                    "Item": [ { "Sku": "A-1" }, { "Sku": "B-2" } ],
                    "Empty": ""
                }
            }))
        );
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(xml_to_value("<a><b></a>"), Err(SpApiError::Parse(_))));
    }

    #[test]
    fn unknown_content_type_stays_text() {
        let content = to_json("%PDF-1.4".into(), Some("application/pdf")).unwrap();
        assert_eq!(content, DocumentContent::Text("%PDF-1.4".into()));
    }
}
