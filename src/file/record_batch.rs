use crate::array::ColumnArray;
use crate::schema::Schema;

/// An owned, column-major batch of rows sharing one [`Schema`].
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub schema: Schema,
    pub columns: Vec<ColumnArray>,
}

impl RecordBatch {
    pub fn try_new(schema: Schema, columns: Vec<ColumnArray>) -> Self {
        debug_assert_eq!(schema.fields.len(), columns.len());
        Self { schema, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnArray> {
        let idx = self.schema.field_index(name)?;
        self.columns.get(idx)
    }
}
