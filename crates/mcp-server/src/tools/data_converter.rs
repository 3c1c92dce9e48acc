//! Data format conversion between JSON, YAML and XML

use anyhow::{bail, Context};
use async_trait::async_trait;
use capability_core::{
    Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DATA_CONVERTER: &str = "data_converter";

const FORMATS: [&str; 4] = ["json", "yaml", "yml", "xml"];

/// Element name used when a document has no single top-level key
const XML_ROOT: &str = "root";

/// Supported data formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Xml,
}

impl FromStr for DataFormat {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "xml" => Ok(Self::Xml),
            other => Err(HandlerError::invalid(format!(
                "Unsupported format '{}', expected one of: {}",
                other,
                FORMATS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
            Self::Xml => f.write_str("xml"),
        }
    }
}

/// Converts documents between JSON, YAML and XML
pub struct DataConverterTool;

impl DataConverterTool {
    /// Convert `data` and wrap the result in a fenced block
    pub fn convert(data: &str, from: DataFormat, to: DataFormat) -> HandlerResult<String> {
        let parsed: Value = match from {
            DataFormat::Json => serde_json::from_str(data)
                .with_context(|| format!("Failed to parse {} data", from))?,
            DataFormat::Yaml => serde_yaml::from_str(data)
                .with_context(|| format!("Failed to parse {} data", from))?,
            DataFormat::Xml => {
                parse_xml(data).with_context(|| format!("Failed to parse {} data", from))?
            }
        };

        let converted = match to {
            DataFormat::Json => serde_json::to_string_pretty(&parsed)
                .with_context(|| format!("Failed to write {} data", to))?,
            DataFormat::Yaml => serde_yaml::to_string(&parsed)
                .with_context(|| format!("Failed to write {} data", to))?,
            DataFormat::Xml => {
                write_xml(&parsed).with_context(|| format!("Failed to write {} data", to))?
            }
        };

        Ok(format!(
            "## Converted {} to {}\n\n```{}\n{}\n```",
            from.to_string().to_uppercase(),
            to.to_string().to_uppercase(),
            to,
            converted.trim_end()
        ))
    }
}

#[async_trait]
impl ToolUnit for DataConverterTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            DATA_CONVERTER,
            "Convert data between formats (JSON, YAML, XML)",
        )
        .required("data", ParameterSpec::string("Data to convert"))
        .required(
            "from_format",
            ParameterSpec::string("Source format").with_enum(FORMATS),
        )
        .required(
            "to_format",
            ParameterSpec::string("Target format").with_enum(FORMATS),
        )]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != DATA_CONVERTER {
            return None;
        }

        Some(convert_arguments(&arguments).map(|text| vec![ToolContent::text(text)]))
    }
}

fn convert_arguments(arguments: &Arguments) -> HandlerResult<String> {
    let field = |key: &str| {
        arguments
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::invalid(format!("Missing required argument '{}'", key)))
    };

    let data = field("data")?;
    let from: DataFormat = field("from_format")?.parse()?;
    let to: DataFormat = field("to_format")?.parse()?;

    DataConverterTool::convert(data, from, to)
}

/// An element being read: attributes and children collected so far
struct OpenElement {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn open(start: &BytesStart) -> anyhow::Result<Self> {
        let mut fields = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            fields.insert(format!("@{}", key), Value::String(value));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        })
    }

    /// Empty elements become null, text-only elements plain strings
    fn close(mut self) -> (String, Value) {
        let value = match (self.fields.is_empty(), self.text.is_empty()) {
            (true, true) => Value::Null,
            (true, false) => Value::String(self.text),
            (false, text_empty) => {
                if !text_empty {
                    self.fields.insert("#text".to_string(), Value::String(self.text));
                }
                Value::Object(self.fields)
            }
        };
        (self.name, value)
    }
}

/// Add a closed element to its parent; repeated names collect into an array
fn attach(
    stack: &mut [OpenElement],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> anyhow::Result<()> {
    let Some(parent) = stack.last_mut() else {
        if root.is_some() {
            bail!("XML document has more than one root element");
        }
        *root = Some((name, value));
        return Ok(());
    };

    match parent.fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.fields.insert(name, value);
        }
    }
    Ok(())
}

/// Read an XML document into `{root: {...}}`, attributes as `@name`, text as `#text`
fn parse_xml(data: &str) -> anyhow::Result<Value> {
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(OpenElement::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = OpenElement::open(&start)?.close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::End(_) => {
                let element = stack.pop().context("Unexpected closing tag")?;
                let (name, value) = element.close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        bail!("Element '{}' is never closed", open.name);
    }
    let (name, value) = root.context("XML document has no root element")?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

/// Pick the root element: a lone top-level key, otherwise `root`
fn document_root(value: &Value) -> (String, Value) {
    match value {
        Value::Object(map) if map.len() == 1 => match map.iter().next() {
            Some((name, inner)) if !inner.is_array() => (name.clone(), inner.clone()),
            _ => (XML_ROOT.to_string(), value.clone()),
        },
        Value::Array(_) => (XML_ROOT.to_string(), json!({ "item": value })),
        _ => (XML_ROOT.to_string(), value.clone()),
    }
}

fn write_xml(value: &Value) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let (name, body) = document_root(value);
    write_element(&mut writer, &name, &body)?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> anyhow::Result<()> {
    let tag = element_name(name);

    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(tag.as_str());
            let mut text = None;
            let mut children = Vec::new();

            for (key, field) in map {
                let attribute = key
                    .strip_prefix('@')
                    .filter(|_| !field.is_object() && !field.is_array());
                if key == "#text" {
                    text = Some(scalar_text(field));
                } else if let Some(attribute) = attribute {
                    start.push_attribute((element_name(attribute).as_str(), scalar_text(field).as_str()));
                } else {
                    children.push((key, field));
                }
            }

            if text.is_none() && children.is_empty() {
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }

            writer.write_event(Event::Start(start))?;
            if let Some(text) = text {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            for (key, field) in children {
                write_element(writer, key, field)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        Value::Null => writer.write_event(Event::Empty(BytesStart::new(tag.as_str())))?,
        scalar => {
            let text = scalar_text(scalar);
            writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
    }

    Ok(())
}

/// Replace characters not allowed in XML names
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();

    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_yaml() {
        let output =
            DataConverterTool::convert(r#"{"name": "chatdata", "tags": ["a"]}"#, DataFormat::Json, DataFormat::Yaml)
                .unwrap();

        assert!(output.starts_with("## Converted JSON to YAML"));
        assert!(output.contains("```yaml\n"));
        assert!(output.contains("name: chatdata"));
        assert!(output.contains("- a"));
    }

    #[test]
    fn test_yaml_to_json() {
        let output = DataConverterTool::convert("count: 3\n", DataFormat::Yaml, DataFormat::Json).unwrap();
        assert!(output.contains("\"count\": 3"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("YML".parse::<DataFormat>().unwrap(), DataFormat::Yaml);
        assert_eq!("xml".parse::<DataFormat>().unwrap(), DataFormat::Xml);
        assert!(matches!(
            "toml".parse::<DataFormat>(),
            Err(HandlerError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_parse_xml() {
        let value = parse_xml(
            r#"<?xml version="1.0"?>
            <config version="2">
                <name>chatdata &amp; co</name>
                <tag>a</tag>
                <tag>b</tag>
                <empty/>
                <note lang="en">hi</note>
            </config>"#,
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "config": {
                    "@version": "2",
                    "name": "chatdata & co",
                    "tag": ["a", "b"],
                    "empty": null,
                    "note": { "@lang": "en", "#text": "hi" }
                }
            })
        );
    }

    #[test]
    fn test_parse_xml_errors() {
        assert!(parse_xml("").is_err());
        assert!(parse_xml("<a><b></a>").is_err());
        assert!(parse_xml("<a/><b/>").is_err());
    }

    #[test]
    fn test_json_to_xml() {
        let output = DataConverterTool::convert(
            r##"{"name": "chatdata", "tags": ["a", "b"], "meta": {"@id": "7", "#text": "x"}, "none": null}"##,
            DataFormat::Json,
            DataFormat::Xml,
        )
        .unwrap();

        assert!(output.starts_with("## Converted JSON to XML\n\n```xml\n<?xml"));
        assert!(output.contains("<root>"));
        assert!(output.contains("<name>chatdata</name>"));
        assert!(output.contains("<tags>a</tags>"));
        assert!(output.contains("<tags>b</tags>"));
        assert!(output.contains(r#"<meta id="7">x</meta>"#));
        assert!(output.contains("<none/>"));
    }

    #[test]
    fn test_single_key_becomes_root() {
        let xml = write_xml(&json!({ "server": { "port": 8080 } })).unwrap();
        assert!(xml.contains("<server>"));
        assert!(xml.contains("<port>8080</port>"));
        assert!(!xml.contains("<root>"));

        let xml = write_xml(&json!([1, 2])).unwrap();
        assert!(xml.contains("<root>"));
        assert!(xml.contains("<item>1</item>"));
    }

    #[test]
    fn test_xml_to_yaml() {
        let output = DataConverterTool::convert(
            "<server><port>8080</port></server>",
            DataFormat::Xml,
            DataFormat::Yaml,
        )
        .unwrap();
        assert!(output.contains("server:\n  port: '8080'"));
    }

    #[test]
    fn test_element_name() {
        assert_eq!(element_name("user name"), "user_name");
        assert_eq!(element_name("1st"), "_1st");
        assert_eq!(element_name("ok-name.v2"), "ok-name.v2");
    }

    #[tokio::test]
    async fn test_invalid_input_fails() {
        let arguments = json!({ "data": "{broken", "from_format": "json", "to_format": "yaml" })
            .as_object()
            .cloned()
            .unwrap();

        let result = DataConverterTool.call(DATA_CONVERTER, arguments).await.unwrap();
        assert!(matches!(result, Err(HandlerError::Failed(message)) if message.contains("Failed to parse json data")));
    }
}
