//! Column file reader (spec §4.4): validates the trailer, footer, and header
//! in that order, then serves whole-batch or per-column random access.

use std::fs;
use std::path::{Path, PathBuf};

use crate::array::ColumnArray;
use crate::codec::{dictionary, plain, CodecTag, PageHeader};
use crate::error::{Result, VectorLiteError};
use crate::file::footer::{decode_trailer, Footer};
use crate::file::header::{Header, HEADER_SIZE};
use crate::file::record_batch::RecordBatch;
use crate::schema::{DataType, Schema};

const TRAILER_SIZE: usize = 12;

#[derive(Debug)]
pub struct ColumnFileReader {
    path: PathBuf,
    bytes: Vec<u8>,
    header: Header,
    footer: Footer,
}

impl ColumnFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
            return Err(VectorLiteError::InvalidFile("file too short".to_string()));
        }

        let footer_length = decode_trailer(&bytes)? as usize;
        let trailer_start = bytes.len() - TRAILER_SIZE;
        if footer_length > trailer_start {
            return Err(VectorLiteError::InvalidFile("footer length out of range".to_string()));
        }
        let footer_start = trailer_start - footer_length;
        let footer = Footer::decode_body(&bytes[footer_start..trailer_start])?;

        let header = Header::decode(&bytes[0..HEADER_SIZE])?;

        let reader = Self { path, bytes, header, footer };
        reader.validate()?;
        Ok(reader)
    }

    fn validate(&self) -> Result<()> {
        if self.footer.columns.len() != self.header.schema.fields.len() {
            return Err(VectorLiteError::InvalidFile(
                "footer column count does not match header schema".to_string(),
            ));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.header.schema
    }

    pub fn num_rows(&self) -> u64 {
        self.header.num_rows
    }

    /// Loads every column and returns one owned [`RecordBatch`]. Row count
    /// must match the header's `num_rows`.
    pub fn read_record_batch(&self) -> Result<RecordBatch> {
        let mut columns = Vec::with_capacity(self.footer.columns.len());
        for entry in &self.footer.columns {
            let field = &self.header.schema.fields[entry.field_ordinal as usize];
            columns.push(self.decode_column(entry.offset, entry.length, entry.codec_tag, &field.data_type)?);
        }
        if let Some(first) = columns.first() {
            if first.len() as u64 != self.header.num_rows {
                return Err(VectorLiteError::StorageCorrupted(format!(
                    "decoded row count {} does not match header num_rows {}",
                    first.len(),
                    self.header.num_rows
                )));
            }
        }
        Ok(RecordBatch::try_new(self.header.schema.clone(), columns))
    }

    /// Random per-column access by field ordinal, independent of the other
    /// columns in the file.
    pub fn read_column(&self, ordinal: usize) -> Result<ColumnArray> {
        let entry = self
            .footer
            .columns
            .iter()
            .find(|c| c.field_ordinal as usize == ordinal)
            .ok_or_else(|| VectorLiteError::InvalidFile(format!("no such column ordinal {ordinal}")))?;
        let field = &self.header.schema.fields[ordinal];
        self.decode_column(entry.offset, entry.length, entry.codec_tag, &field.data_type)
    }

    fn decode_column(&self, offset: u64, length: u64, expected_codec: CodecTag, data_type: &DataType) -> Result<ColumnArray> {
        let start = offset as usize;
        let end = start + length as usize;
        if end > self.bytes.len() {
            return Err(VectorLiteError::Truncated);
        }
        let page = &self.bytes[start..end];
        let (page_header, payload) = PageHeader::decode(page)?;
        if page_header.codec != expected_codec {
            return Err(VectorLiteError::InvalidFile("page codec does not match footer entry".to_string()));
        }
        match page_header.codec {
            CodecTag::Plain => plain::decode(payload, data_type, page_header.value_count as usize),
            CodecTag::Dictionary => {
                let leaf = match data_type {
                    DataType::Int32 => crate::schema::DataTypeLeaf::Int32,
                    DataType::Int64 => crate::schema::DataTypeLeaf::Int64,
                    DataType::Float32 => crate::schema::DataTypeLeaf::Float32,
                    DataType::Float64 => crate::schema::DataTypeLeaf::Float64,
                    _ => {
                        return Err(VectorLiteError::InvalidFile(
                            "dictionary codec is only valid for scalar primitive columns".to_string(),
                        ))
                    }
                };
                dictionary::decode(payload, leaf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Int64Array;
    use crate::file::writer::ColumnFileWriter;
    use crate::schema::{DataTypeLeaf, Field};

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("vector", DataType::FixedSizeList { element: Box::new(DataTypeLeaf::Float32), size: 3 }, false),
        ])
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.vlf");
        let schema = sample_schema();

        let mut writer = ColumnFileWriter::create(&path, schema.clone()).unwrap();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                ColumnArray::Int64(Int64Array::new(vec![1, 2, 3], None)),
                ColumnArray::FixedSizeList(crate::array::FixedSizeListArray::from_f32_rows(
                    vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
                    3,
                )),
            ],
        );
        writer.write_record_batch(batch).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let reader = ColumnFileReader::open(&path).unwrap();
        assert_eq!(reader.num_rows(), 3);
        let batch = reader.read_record_batch().unwrap();
        match &batch.columns[0] {
            ColumnArray::Int64(a) => {
                assert_eq!((0..a.len()).map(|i| a.get(i).unwrap()).collect::<Vec<_>>(), vec![1, 2, 3]);
            }
            _ => panic!("wrong variant"),
        }
        match &batch.columns[1] {
            ColumnArray::FixedSizeList(a) => {
                assert_eq!(a.get_f32_row(1), Some(vec![4.0, 5.0, 6.0]));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn corrupted_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.vlf");
        let schema = sample_schema();
        let mut writer = ColumnFileWriter::create(&path, schema.clone()).unwrap();
        writer
            .write_record_batch(RecordBatch::try_new(
                schema,
                vec![
                    ColumnArray::Int64(Int64Array::new(vec![1], None)),
                    ColumnArray::FixedSizeList(crate::array::FixedSizeListArray::from_f32_rows(vec![vec![1.0, 2.0, 3.0]], 3)),
                ],
            ))
            .unwrap();
        writer.close().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let n = bytes.len();
        bytes[n - 1] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let err = ColumnFileReader::open(&path).unwrap_err();
        assert!(matches!(err, VectorLiteError::InvalidFile(_)));
    }
}
