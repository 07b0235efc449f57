use crate::error::CfoError;
use crate::helpers::xml::AttributeLookup;
use crate::helpers::xml::TextBuffer;
use crate::helpers::xml::XmlEvents;
use crate::helpers::zip::ZipEntries;
use crate::on_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: QName = QName(b"Relationship"); // Package relationship
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");   // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");     // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");   // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");          // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");    // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");        // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                   // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");              // Worksheet definition
const TAG_ROW: QName = QName(b"row");                  // Row in worksheet
const TAG_CELL: QName = QName(b"c");                   // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");         // Inline string value
const TAG_VALUE: QName = QName(b"v");                  // Cell value content

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// An Office Open XML workbook held in memory
pub(crate) struct XlsxSpreadsheet {
    /// File name of the spreadsheet
    name: String,
    /// ZIP archive containing the workbook parts
    zip: Archive,
    /// Cell type per style index, used to recognise dates and times
    number_formats: Vec<CellType>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Opens the archive and loads the workbook structure, styles and shared strings
    pub(crate) fn open(file_name: &str, bytes: Vec<u8>) -> Result<XlsxSpreadsheet, CfoError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyError(file_name.to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, CfoError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            let mut events = self
                .zip
                .xml_events(zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            on_xml_events!(events => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    if let Some(number) = event.parse_attribute::<usize>("r")? {
                        row_count = number.saturating_sub(1);
                    }
                    col_count = 0;
                }
                Event::End(event) if event.name() == TAG_ROW => {
                    row_count += 1;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.attribute("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count, col_count));
                    col_count = col + 1;
                    value.clear();
                    kind = match event.attribute("t")?.as_deref() {
                        Some("inlineStr") | Some("str") => CellType::Text,
                        Some("s") => CellType::SharedString,
                        Some("d") => CellType::IsoDateTime,
                        Some("b") => CellType::Boolean,
                        Some("e") => CellType::Error,
                        _ => CellType::Number,
                    };
                    if kind == CellType::Number {
                        if let Some(style) = event.parse_attribute::<usize>("s")? {
                            kind = self.number_formats.get(style).copied().unwrap_or(CellType::Number);
                        }
                    }
                }
                Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut events, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if event.name() == TAG_VALUE => {
                    value = read_string_value(&mut events, TAG_VALUE, true)?;
                }
                Event::End(event) if !value.is_empty() && event.name() == TAG_CELL => {
                    let mut cell = Cell { row, col, kind, value: std::mem::take(&mut value) };
                    if cell.kind == CellType::SharedString {
                        cell.kind = CellType::Text;
                        cell.value = cell.value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|index| self.shared_strings.get(index))
                            .cloned()
                            .unwrap_or_default();
                    }
                    if cell.kind == CellType::Error {
                        debug!("Error value '{}' at {}!{} read as empty", cell.value, sheet_name, cell.reference());
                    }
                    sheet.push(cell);
                }
            });
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Loads the worksheet names and archive paths, and whether the workbook
/// uses the 1904 date system.
fn load_workbook(zip: &mut Archive) -> Result<(Vec<(String, String)>, bool), CfoError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut events = zip
        .xml_events("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    on_xml_events!(events => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<String>;
            let mut id = None::<String>;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.into_owned()),
                    b"id" => id = Some(attribute.unescape_value()?.into_owned()),
                    _ => (),
                }
            }
            if let Some((name, path)) = name.zip(id.and_then(|id| relationships.get(&id).cloned())) {
                sheets.push((name, path));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.attribute("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Maps worksheet relationship ids to archive paths
fn load_relationships(zip: &mut Archive, path: &str) -> Result<HashMap<String, String>, CfoError> {
    let mut events = zip
        .xml_events(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    on_xml_events!(events => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP.as_ref() => {
            let id = event.attribute("Id")?;
            let kind = event.attribute("Type")?;
            let target = event.attribute("Target")?;
            if kind.map(|kind| kind.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.into_owned(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target to its path inside the archive
fn to_zip_path(target: &str) -> String {
    if let Some(path) = target.strip_prefix('/') {
        path.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Loads the cell type of every style index from `xl/styles.xml`
fn load_number_formats(zip: &mut Archive, is_1904: bool) -> Result<Vec<CellType>, CfoError> {
    let mut events = match zip.xml_events("xl/styles.xml")? {
        Some(events) => events,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    on_xml_events!(events => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.into_owned(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.attribute("numFmtId")?.map(|id| id.into_owned()).unwrap_or_default());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the shared string table; workbooks without one have no shared strings
fn load_shared_strings(zip: &mut Archive) -> Result<Vec<String>, CfoError> {
    let mut shared_strings = Vec::<String>::new();
    let mut events = match zip.xml_events("xl/sharedStrings.xml")? {
        Some(events) => events,
        None => return Ok(shared_strings),
    };
    on_xml_events!(events => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut events, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads text up to `end_tag`, skipping phonetic annotations.
/// With `is_text_content` the element's own text counts; otherwise only `<t>` runs do.
fn read_string_value<R: BufRead>(
    events: &mut XmlEvents<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, CfoError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    on_xml_events!(events => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_reference(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
        <workbookPr date1904="false"/>
        <sheets>
            <sheet name="Ventas" sheetId="1" r:id="rId1"/>
            <sheet name="Vacia" sheetId="2" r:id="rId2"/>
        </sheets>
    </workbook>"#;

    const RELATIONSHIPS: &str = r#"<Relationships>
        <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
        <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
        <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
    </Relationships>"#;

    const STYLES: &str = r#"<styleSheet>
        <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
        <cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs>
    </styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst>
        <si><t>Producto</t></si>
        <si><r><t>Fe</t></r><r><t>cha</t></r><rPh><t>x</t></rPh></si>
        <si><t>Tom &amp; Co</t></si>
    </sst>"#;

    const SHEET: &str = r#"<worksheet><sheetData>
        <row r="2">
            <c r="B2" t="s"><v>0</v></c>
            <c r="C2" t="s"><v>1</v></c>
            <c r="D2" t="inlineStr"><is><t>Ingreso</t></is></c>
        </row>
        <row r="3">
            <c r="B3" t="s"><v>2</v></c>
            <c r="C3" s="1"><v>45306</v></c>
            <c r="D3"><v>1500.5</v></c>
        </row>
        <row r="4">
            <c r="B4" t="str"><v>Pesas</v></c>
            <c r="D4" t="e"><v>#DIV/0!</v></c>
        </row>
    </sheetData></worksheet>"#;

    const EMPTY_SHEET: &str = r#"<worksheet><sheetData/></worksheet>"#;

    fn workbook(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn sample() -> Vec<u8> {
        workbook(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET),
            ("xl/worksheets/sheet2.xml", EMPTY_SHEET),
        ])
    }

    #[test]
    fn reads_sheet_names_in_order() {
        let spreadsheet = XlsxSpreadsheet::open("ventas.xlsx", sample()).unwrap();
        let names: Vec<&str> = spreadsheet.sheets.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Ventas", "Vacia"]);
        assert_eq!(spreadsheet.sheets[1].1, "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn reads_cells_into_a_table() {
        let mut spreadsheet = XlsxSpreadsheet::open("ventas.xlsx", sample()).unwrap();
        let mut sheets = spreadsheet.read_sheets(&Criteria::default()).unwrap();
        assert_eq!(sheets.len(), 2);
        assert!(sheets.pop().unwrap().into_raw_table().is_none());

        let table = sheets.pop().unwrap().into_raw_table().unwrap();
        assert_eq!(table.source, "ventas.xlsx#Ventas");
        assert_eq!(table.columns, vec!["Producto", "Fecha", "Ingreso"]);
        assert_eq!(
            table.rows,
            vec![
                vec![
                    Value::Text("Tom & Co".to_owned()),
                    Value::Text("2024-01-15".to_owned()),
                    Value::Number(1500.5),
                ],
                vec![Value::Text("Pesas".to_owned()), Value::Empty, Value::Empty],
            ]
        );
    }

    #[test]
    fn filters_sheets() {
        let mut spreadsheet = XlsxSpreadsheet::open("ventas.xlsx", sample()).unwrap();
        let criteria = Criteria::from_globs(&["Vac*"]).unwrap();
        let sheets = spreadsheet.read_sheets(&criteria).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Vacia");
    }

    #[test]
    fn workbook_without_sheets_is_an_error() {
        let bytes = workbook(&[
            ("xl/workbook.xml", "<workbook><sheets/></workbook>"),
            ("xl/_rels/workbook.xml.rels", "<Relationships/>"),
        ]);
        let error = XlsxSpreadsheet::open("nada.xlsx", bytes).err().unwrap();
        assert_eq!(error.to_string(), "'nada.xlsx' contains no sheets");
    }

    #[test]
    fn relationship_targets_resolve_inside_xl() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
