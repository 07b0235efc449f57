use crate::error::CfoError;
use crate::helpers::xml::AttributeLookup;
use crate::helpers::xml::TextBuffer;
use crate::helpers::zip::ZipEntries;
use crate::on_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Cursor;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
/// Upper bound for `number-*-repeated` expansion of a non-empty cell
const MAX_REPEAT: usize = 1024;

const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
const SPACE: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");
const FILE_ENTRY: QName = QName(b"manifest:file-entry");
const ENCRYPTION_DATA: QName = QName(b"manifest:encryption-data");

/// Errors specific to OpenDocument spreadsheets
#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type '{0}'")]
    MimeTypeError(String),
}

/// An OpenDocument spreadsheet held in memory
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl OdsSpreadsheet {
    /// Opens the archive, checking its MIME type and rejecting encrypted documents
    pub(crate) fn open(file_name: &str, bytes: Vec<u8>) -> Result<OdsSpreadsheet, CfoError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, CfoError> {
        let mut events = self
            .zip
            .xml_events("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;

        let mut sheets = Vec::<Sheet>::new();
        let mut sheet: Option<Sheet> = None;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut text_context = false;
        let mut annotation_context = false;
        let mut paragraph_context = false;
        let mut paragraph_count = 0usize;

        on_xml_events!(events => {
            Event::Start(event) if event.name() == TABLE => {
                let name = event.attribute("table:name")?.map(|name| name.into_owned()).unwrap_or_default();
                sheet = criteria.accept(&name).then(|| Sheet::new(&self.name, &name));
                row = 0;
            }
            Event::End(event) if event.name() == TABLE => {
                sheets.extend(sheet.take());
            }
            Event::Start(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row_count = event.parse_attribute::<usize>("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row += row_count;
            }
            Event::Start(event) if sheet.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                paragraph_count = 0;
                col_count = event.parse_attribute::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let is_error = event.attribute("calcext:value-type")?.map(|kind| kind == "error").unwrap_or(false);
                kind = match event.attribute("office:value-type")?.as_deref() {
                    None => CellType::Empty,
                    Some(_) if is_error => CellType::Error,
                    Some("string") => CellType::Text,
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some(_) => CellType::Number,
                };
                let attribute = match kind {
                    CellType::Boolean => Some("office:boolean-value"),
                    CellType::IsoDateTime => Some("office:date-value"),
                    CellType::IsoDuration => Some("office:time-value"),
                    CellType::Number => Some("office:value"),
                    _ => None,
                };
                if let Some(attribute) = attribute {
                    if let Some(data) = event.attribute(attribute)? {
                        value.push_str(&data);
                    }
                }
                text_context = matches!(kind, CellType::Text | CellType::Error);
            }
            Event::End(event) if sheet.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                if let Some(sheet) = sheet.as_mut() {
                    if kind == CellType::Error {
                        debug!("Error value '{}' in sheet '{}' read as empty", value, sheet.name);
                    } else if kind != CellType::Empty && !value.is_empty() {
                        for row_offset in 0..row_count.min(MAX_REPEAT) {
                            for col_offset in 0..col_count.min(MAX_REPEAT) {
                                sheet.push(Cell {
                                    row: row + row_offset,
                                    col: col + col_offset,
                                    kind,
                                    value: value.to_owned(),
                                });
                            }
                        }
                    }
                }
                col += col_count;
                text_context = false;
                annotation_context = false;
                paragraph_context = false;
            }
            Event::Start(event) if text_context && event.name() == ANNOTATION => annotation_context = true,
            Event::End(event) if text_context && event.name() == ANNOTATION => annotation_context = false,
            Event::Start(event) if text_context && !annotation_context && event.name() == PARAGRAPH => {
                if paragraph_count > 0 {
                    value.push('\n');
                }
                paragraph_count += 1;
                paragraph_context = true;
            }
            Event::End(event) if text_context && event.name() == PARAGRAPH => paragraph_context = false,
            Event::Start(event) if text_context && !annotation_context && event.name() == SPACE => {
                let count = event.parse_attribute::<usize>("text:c")?.unwrap_or(1);
                value.extend(std::iter::repeat(' ').take(count));
            }
            Event::Start(event) if text_context && !annotation_context && event.name() == TAB => value.push('\t'),
            Event::Start(event) if text_context && !annotation_context && event.name() == LINE_BREAK => value.push('\n'),
            Event::Text(event) if paragraph_context && !annotation_context => value.push_text(&event)?,
            Event::GeneralRef(event) if paragraph_context && !annotation_context => value.push_reference(&event)?,
        });

        Ok(sheets)
    }
}

/// Validates the `mimetype` entry when the archive has one
fn check_mime(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<(), CfoError> {
    if let Some(mut file) = zip.entry("mimetype")? {
        let mut mime = String::new();
        file.read_to_string(&mut mime)?;
        if mime.trim() != MIME_TYPE {
            Err(OdsError::MimeTypeError(mime.trim().to_owned()))?;
        }
    }
    Ok(())
}

/// True when the manifest declares encryption data for any entry
fn is_password_protected(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<bool, CfoError> {
    let Some(mut events) = zip.xml_events("META-INF/manifest.xml")? else {
        return Ok(false);
    };
    let mut in_file_entry = false;
    on_xml_events!(events => {
        Event::Start(event) if event.name() == FILE_ENTRY => in_file_entry = true,
        Event::End(event) if event.name() == FILE_ENTRY => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == ENCRYPTION_DATA => return Ok(true),
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT: &str = r#"<office:document-content><office:body><office:spreadsheet>
        <table:table table:name="Ventas">
            <table:table-row>
                <table:table-cell office:value-type="string"><text:p>Producto</text:p></table:table-cell>
                <table:table-cell office:value-type="string"><text:p>Fecha</text:p></table:table-cell>
                <table:table-cell office:value-type="string"><text:p>Ingreso</text:p></table:table-cell>
            </table:table-row>
            <table:table-row table:number-rows-repeated="2">
                <table:table-cell office:value-type="string">
                    <office:annotation><text:p>nota</text:p></office:annotation>
                    <text:p>Pesas</text:p><text:p>y<text:s text:c="2"/>bandas</text:p>
                </table:table-cell>
                <table:table-cell office:value-type="date" office:date-value="2024-02-01T00:00:00"/>
                <table:table-cell office:value-type="float" office:value="250.5"><text:p>250,50</text:p></table:table-cell>
            </table:table-row>
            <table:table-row table:number-rows-repeated="1048570">
                <table:table-cell table:number-columns-repeated="1024"/>
            </table:table-row>
        </table:table>
        <table:table table:name="Notas">
            <table:table-row>
                <table:table-cell office:value-type="string" calcext:value-type="error"><text:p>#VALUE!</text:p></table:table-cell>
                <table:table-cell office:value-type="string"><text:p>Tom &amp; Co</text:p></table:table-cell>
            </table:table-row>
        </table:table>
    </office:spreadsheet></office:body></office:document-content>"#;

    const ENCRYPTED_MANIFEST: &str = r#"<manifest:manifest>
        <manifest:file-entry manifest:full-path="content.xml">
            <manifest:encryption-data manifest:checksum-type="SHA1/1K"/>
        </manifest:file-entry>
    </manifest:manifest>"#;

    fn archive(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_repeated_rows_and_paragraphs() {
        let bytes = archive(&[("mimetype", MIME_TYPE), ("content.xml", CONTENT)]);
        let mut spreadsheet = OdsSpreadsheet::open("ventas.ods", bytes).unwrap();
        let mut sheets = spreadsheet.read_sheets(&Criteria::default()).unwrap();
        assert_eq!(sheets.len(), 2);

        let notes = sheets.pop().unwrap().into_raw_table().unwrap();
        assert_eq!(notes.columns, vec!["Tom & Co"]);

        let table = sheets.pop().unwrap().into_raw_table().unwrap();
        assert_eq!(table.source, "ventas.ods#Ventas");
        assert_eq!(table.columns, vec!["Producto", "Fecha", "Ingreso"]);
        let row = vec![
            Value::Text("Pesas\ny  bandas".to_owned()),
            Value::Text("2024-02-01".to_owned()),
            Value::Number(250.5),
        ];
        assert_eq!(table.rows, vec![row.clone(), row]);
    }

    #[test]
    fn filters_sheets() {
        let bytes = archive(&[("content.xml", CONTENT)]);
        let mut spreadsheet = OdsSpreadsheet::open("ventas.ods", bytes).unwrap();
        let sheets = spreadsheet.read_sheets(&Criteria::from_globs(&["Not*"]).unwrap()).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Notas");
    }

    #[test]
    fn rejects_wrong_mime_type() {
        let bytes = archive(&[("mimetype", "application/zip"), ("content.xml", CONTENT)]);
        let error = OdsSpreadsheet::open("raro.ods", bytes).err().unwrap();
        assert_eq!(error.to_string(), "Invalid ODS MIME type 'application/zip'");
    }

    #[test]
    fn rejects_encrypted_documents() {
        let bytes = archive(&[
            ("mimetype", MIME_TYPE),
            ("META-INF/manifest.xml", ENCRYPTED_MANIFEST),
            ("content.xml", CONTENT),
        ]);
        let error = OdsSpreadsheet::open("secreto.ods", bytes).err().unwrap();
        assert!(error.to_string().contains("password protected"));
    }
}
