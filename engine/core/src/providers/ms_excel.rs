//! The `ms-excel` provider: one chunk per worksheet, pages numbered in
//! sheet order (§4.4, scenario S3), conversion via the office subprocess.

use std::io::Cursor;

use async_trait::async_trait;
use calamine::{open_workbook_from_rs, Reader, Xlsx};

use super::office::convert_via_soffice;
use super::splitter::{validate_chunk_overlap, validate_chunk_size};
use super::{Provider, RecursiveCharacterTextSplitter};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::source_file::SourceFile;

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct MsExcelProvider {
    default_chunk_size: usize,
    default_chunk_overlap: usize,
}

impl MsExcelProvider {
    pub fn new(default_chunk_size: usize, default_chunk_overlap: usize) -> Self {
        Self {
            default_chunk_size,
            default_chunk_overlap,
        }
    }
}

impl Default for MsExcelProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

#[async_trait]
impl Provider for MsExcelProvider {
    fn name(&self) -> &'static str {
        "ms-excel"
    }

    fn file_name_extensions(&self) -> &'static [&'static str] {
        &[".xlsx"]
    }

    fn splitter(
        &self,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<RecursiveCharacterTextSplitter> {
        let size = validate_chunk_size(chunk_size, self.default_chunk_size)?;
        let overlap = validate_chunk_overlap(chunk_overlap, self.default_chunk_overlap)?;
        Ok(RecursiveCharacterTextSplitter::new(size, overlap))
    }

    async fn process_file(
        &self,
        file: &SourceFile,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<Vec<Chunk>> {
        let bytes = file.buffer().await?;
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| Error::processing(400, format!("failed to open workbook: {e}")))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let splitter = self.splitter(chunk_size, chunk_overlap)?;
        let mut chunks = Vec::with_capacity(sheet_names.len());

        for (index, sheet_name) in sheet_names.iter().enumerate() {
            let range = workbook
                .worksheet_range(sheet_name)
                .map_err(|e| Error::processing(400, format!("failed to read sheet '{sheet_name}': {e}")))?;

            let mut text = String::new();
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }

            let chunk = Chunk::new(text).with_page((index + 1) as u32);
            chunks.extend(splitter.split_chunks(vec![chunk]));
        }

        Ok(chunks)
    }

    async fn convert_file_to_pdf(&self, file: &SourceFile) -> Result<SourceFile> {
        convert_via_soffice(file).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;

    /// Builds a minimal two-sheet xlsx using inline strings, so the test
    /// doesn't need a `sharedStrings.xml` part.
    fn build_birthdays_xlsx() -> Vec<u8> {
        const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

        const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Birthdays" sheetId="1" r:id="rId1"/>
<sheet name="Notes" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

        const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

        const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Name</t></is></c><c r="B1" t="inlineStr"><is><t>Date</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Dagobert</t></is></c><c r="B2" t="inlineStr"><is><t>Jan 1</t></is></c></row>
</sheetData>
</worksheet>"#;

        const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Remember the cake</t></is></c></row>
</sheetData>
</worksheet>"#;

        let mut buf = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buf);
        let options = FileOptions::default();

        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn one_chunk_per_sheet_tab_joined_and_numbered_in_order() {
        let bytes = build_birthdays_xlsx();
        let guard = crate::source_file::temp_file(&bytes, Some("xlsx"), None, Some("birthdays.xlsx"))
            .await
            .unwrap();

        let provider = MsExcelProvider::default();
        let chunks = provider.process_file(&guard, None, None).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert!(chunks[0].content.contains("Name\tDate"));
        assert!(chunks[0].content.contains("Dagobert\tJan 1"));
        assert_eq!(chunks[1].metadata.page, Some(2));
        assert!(chunks[1].content.contains("Remember the cake"));
    }
}
