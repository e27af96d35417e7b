//! Column file writer (spec §4.4): reserves the header, streams pages while
//! recording their offsets/lengths, writes the footer, then patches the
//! header with the final row count.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::array::{ColumnArray, Float32Array, Float64Array, FixedSizeListArray, Int32Array, Int64Array, ListArray, Utf8Array};
use crate::codec::{dictionary, plain, CodecTag, PageHeader};
use crate::error::{Result, VectorLiteError};
use crate::file::footer::{ColumnPageIndex, Footer};
use crate::file::header::{Header, FORMAT_VERSION, HEADER_SIZE};
use crate::file::record_batch::RecordBatch;
use crate::schema::{DataType, Schema};

pub struct ColumnFileWriter {
    file: File,
    path: PathBuf,
    schema: Schema,
    batches: Vec<RecordBatch>,
    closed: bool,
}

impl ColumnFileWriter {
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;
        file.write_all(&[0u8; HEADER_SIZE])?;
        Ok(Self { file, path, schema, batches: Vec::new(), closed: false })
    }

    pub fn write_record_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if batch.schema != self.schema {
            return Err(VectorLiteError::SchemaMismatch(
                "record batch schema does not match writer schema".to_string(),
            ));
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Finalizes and flushes the file. Calling `close` twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let columns = concat_all_columns(&self.schema, &self.batches)?;
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);

        self.file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let mut pos = HEADER_SIZE as u64;
        let mut page_index = Vec::with_capacity(columns.len());

        for (ordinal, array) in columns.iter().enumerate() {
            let codec = choose_codec(array);
            let payload = match codec {
                CodecTag::Plain => plain::encode(array)?,
                CodecTag::Dictionary => dictionary::encode(array)?,
            };
            let header = PageHeader { codec, value_count: array.len() as u32 };
            let mut page_bytes = header.encode();
            page_bytes.extend_from_slice(&payload);

            let pad = (8 - (page_bytes.len() % 8)) % 8;
            page_bytes.extend(std::iter::repeat(0u8).take(pad));

            self.file.write_all(&page_bytes)?;
            page_index.push(ColumnPageIndex {
                field_ordinal: ordinal as u32,
                offset: pos,
                length: page_bytes.len() as u64,
                codec_tag: codec,
            });
            pos += page_bytes.len() as u64;
        }

        let footer = Footer { columns: page_index };
        self.file.write_all(&footer.encode())?;

        let header = Header { format_version: FORMAT_VERSION, num_rows: num_rows as u64, schema: self.schema.clone() };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.encode()?)?;
        self.file.flush()?;

        self.closed = true;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Dictionary for low-cardinality fixed-width primitive columns, plain
/// otherwise. Lists and strings are never dictionary-encoded (unsupported
/// type per the codec contract).
fn choose_codec(array: &ColumnArray) -> CodecTag {
    let distinct_ratio = |n: usize, distinct: usize| distinct as f64 / n.max(1) as f64;
    match array {
        ColumnArray::Int32(a) if a.len() > 0 && !a.has_nulls() => {
            let distinct: std::collections::HashSet<i32> = (0..a.len()).filter_map(|i| a.get(i)).collect();
            if distinct_ratio(a.len(), distinct.len()) <= 0.5 { CodecTag::Dictionary } else { CodecTag::Plain }
        }
        ColumnArray::Int64(a) if a.len() > 0 && !a.has_nulls() => {
            let distinct: std::collections::HashSet<i64> = (0..a.len()).filter_map(|i| a.get(i)).collect();
            if distinct_ratio(a.len(), distinct.len()) <= 0.5 { CodecTag::Dictionary } else { CodecTag::Plain }
        }
        _ => CodecTag::Plain,
    }
}

fn concat_all_columns(schema: &Schema, batches: &[RecordBatch]) -> Result<Vec<ColumnArray>> {
    let mut out = Vec::with_capacity(schema.fields.len());
    for (i, field) in schema.fields.iter().enumerate() {
        let parts: Vec<&ColumnArray> = batches.iter().map(|b| &b.columns[i]).collect();
        out.push(concat_column(&field.data_type, &parts)?);
    }
    Ok(out)
}

fn concat_column(data_type: &DataType, parts: &[&ColumnArray]) -> Result<ColumnArray> {
    match data_type {
        DataType::Int32 => {
            let mut values = Vec::new();
            for p in parts {
                if let ColumnArray::Int32(a) = p {
                    for i in 0..a.len() {
                        values.push(a.get(i).unwrap_or_default());
                    }
                }
            }
            Ok(ColumnArray::Int32(Int32Array::new(values, None)))
        }
        DataType::Int64 => {
            let mut values = Vec::new();
            for p in parts {
                if let ColumnArray::Int64(a) = p {
                    for i in 0..a.len() {
                        values.push(a.get(i).unwrap_or_default());
                    }
                }
            }
            Ok(ColumnArray::Int64(Int64Array::new(values, None)))
        }
        DataType::Float32 => {
            let mut values = Vec::new();
            for p in parts {
                if let ColumnArray::Float32(a) = p {
                    for i in 0..a.len() {
                        values.push(a.get(i).unwrap_or_default());
                    }
                }
            }
            Ok(ColumnArray::Float32(Float32Array::new(values, None)))
        }
        DataType::Float64 => {
            let mut values = Vec::new();
            for p in parts {
                if let ColumnArray::Float64(a) = p {
                    for i in 0..a.len() {
                        values.push(a.get(i).unwrap_or_default());
                    }
                }
            }
            Ok(ColumnArray::Float64(Float64Array::new(values, None)))
        }
        DataType::FixedSizeList { element, size } => {
            let mut rows = Vec::new();
            for p in parts {
                if let ColumnArray::FixedSizeList(a) = p {
                    for i in 0..a.len() {
                        if a.element() == crate::schema::DataTypeLeaf::Float32 {
                            let row = a.get_f32_row(i).unwrap_or_default();
                            rows.push(row.iter().flat_map(|v| v.to_le_bytes()).collect());
                        } else {
                            let row = a.get_i32_row(i).unwrap_or_default();
                            rows.push(row.iter().flat_map(|v| v.to_le_bytes()).collect());
                        }
                    }
                }
            }
            Ok(ColumnArray::FixedSizeList(FixedSizeListArray::from_rows(rows, **element, *size, None)))
        }
        DataType::List { .. } => {
            let mut rows = Vec::new();
            for p in parts {
                if let ColumnArray::List(a) = p {
                    for i in 0..a.len() {
                        rows.push(a.get_i32_row(i).unwrap_or_default());
                    }
                }
            }
            Ok(ColumnArray::List(ListArray::from_rows(rows, None)))
        }
        DataType::Utf8 => {
            let mut values = Vec::new();
            for p in parts {
                if let ColumnArray::Utf8(a) = p {
                    for i in 0..a.len() {
                        values.push(a.get(i).map(|s| s.to_string()));
                    }
                }
            }
            Ok(ColumnArray::Utf8(Utf8Array::from_values(values)))
        }
    }
}
