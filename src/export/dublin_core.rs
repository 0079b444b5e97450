// src/export/dublin_core.rs

//! Dublin Core XML export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, Result};
use crate::models::{Record, ResultCollection};

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Write the collection as `<records>` holding one `<record>` per entry.
pub fn write(collection: &ResultCollection, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    out.write_all(&to_bytes(collection)?)?;
    out.flush()?;
    Ok(())
}

/// Render the collection as an XML document.
pub fn to_bytes(collection: &ResultCollection) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("records");
    root.push_attribute(("xmlns:dc", DC_NAMESPACE));
    emit(&mut writer, Event::Start(root))?;

    for record in collection {
        write_record(&mut writer, record)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("records")))?;
    Ok(writer.into_inner())
}

fn write_record(writer: &mut Writer<Vec<u8>>, record: &Record) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("record")))?;

    element(writer, "dc:title", record.title())?;
    for author in record.authors() {
        element(writer, "dc:creator", author)?;
    }
    element(writer, "dc:description", record.abstract_text())?;
    element(writer, "dc:identifier", record.identifier())?;
    if let Some(link) = record.link() {
        element(writer, "dc:relation", link)?;
    }
    element(writer, "dc:source", record.source())?;
    for keyword in record.keywords() {
        element(writer, "dc:subject", keyword)?;
    }
    element(writer, "dc:type", record.datatype())?;
    element(writer, "dc:date", record.date())?;

    emit(writer, Event::End(BytesEnd::new("record")))
}

fn element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(AppError::parse)
}
