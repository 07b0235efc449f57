#![allow(dead_code)]

use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tempfile::tempdir;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A cell written into a test workbook.
#[derive(Clone, Debug)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

pub use Cell::{Blank, Number, Text};

/// Builds a minimal `.xlsx` workbook with inline strings, one sheet per entry.
pub fn xlsx(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Vec<u8> {
    let mut workbook = String::from(
        r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut relationships = String::from("<Relationships>");
    for (index, (name, _)) in sheets.iter().enumerate() {
        let number = index + 1;
        workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{number}" r:id="rId{number}"/>"#));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{number}.xml"/>"#
        ));
    }
    workbook.push_str("</sheets></workbook>");
    relationships.push_str("</Relationships>");

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("xl/workbook.xml", options).expect("start workbook");
    writer.write_all(workbook.as_bytes()).expect("write workbook");
    writer.start_file("xl/_rels/workbook.xml.rels", options).expect("start rels");
    writer.write_all(relationships.as_bytes()).expect("write rels");
    for (index, (_, rows)) in sheets.iter().enumerate() {
        writer
            .start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)
            .expect("start sheet");
        writer.write_all(sheet_xml(rows).as_bytes()).expect("write sheet");
    }
    writer.finish().expect("finish workbook").into_inner()
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from("<worksheet><sheetData>");
    for (row_index, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
        for (col_index, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + col_index as u8) as char, row_index + 1);
            match cell {
                Text(text) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#
                )),
                Number(number) => xml.push_str(&format!(r#"<c r="{reference}"><v>{number}</v></c>"#)),
                Blank => (),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Sales with quantity: PRODUCTO, CANTIDAD, INGRESO over three rows.
pub fn quantity_sales() -> Vec<u8> {
    xlsx(&[(
        "Enero",
        vec![
            vec![Text("Producto"), Text("Cantidad"), Text("Ingreso")],
            vec![Text("Pesas"), Number(10.0), Number(1500.0)],
            vec![Text("Bandas"), Number(25.0), Number(500.0)],
            vec![Text("Pesas"), Number(5.0), Number(750.0)],
        ],
    )])
}

/// Sales without quantity: PRODUCTO, INGRESO over two rows.
pub fn revenue_sales() -> Vec<u8> {
    xlsx(&[(
        "Febrero",
        vec![
            vec![Text("producto"), Text("INGRESO ")],
            vec![Text("Esterilla"), Number(300.0)],
            vec![Text("Bandas"), Number(200.0)],
        ],
    )])
}

/// Scratch directory that cleans up on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `bytes` into a file under the workspace and returns its path.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, bytes).expect("write temp file");
        path
    }
}
