// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Reading result rows of a completed query

use super::client::QueryHandle;
use super::engine::QueryEngine;
use crate::error::{LoaderError, LoaderResult};
use std::collections::HashSet;
use std::sync::Arc;

/// A result row as an ordered tuple of string cells
pub type ResultTuple = Vec<String>;

#[derive(Clone)]
pub struct ResultReader {
    engine: Arc<dyn QueryEngine>,
}

impl ResultReader {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    /// Page through every result row of `handle`
    ///
    /// Rows from all pages are concatenated before the header is dropped, so
    /// only the very first row is ever treated as a header. Cells without a
    /// value read as empty strings.
    pub fn try_read_rows(
        &self,
        handle: &QueryHandle,
        has_header_row: bool,
    ) -> LoaderResult<Vec<ResultTuple>> {
        let execution_id = handle.execution_id();
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let page = self
                .engine
                .get_query_results(execution_id, next_token.as_deref())
                .map_err(|e| LoaderError::ResultFetch(format!("{}: {}", execution_id, e)))?;

            rows.extend(page.rows.into_iter().map(|row| {
                row.data
                    .into_iter()
                    .map(|datum| datum.var_char_value.unwrap_or_default())
                    .collect::<ResultTuple>()
            }));

            match page.next_token {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(LoaderError::ResultFetch(format!(
                            "{}: pagination token {} repeated",
                            execution_id, token
                        )));
                    }
                    next_token = Some(token);
                }
                None => break,
            }
        }

        if has_header_row && !rows.is_empty() {
            rows.remove(0);
        }
        log::debug!("Query {} returned {} rows", execution_id, rows.len());
        Ok(rows)
    }

    /// Like [`try_read_rows`](Self::try_read_rows), but a fetch failure is
    /// logged and reported as no rows.
    pub fn read_rows(&self, handle: &QueryHandle, has_header_row: bool) -> Vec<ResultTuple> {
        match self.try_read_rows(handle, has_header_row) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Unexpected error getting query results: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::engine::ResultRow;
    use crate::query::memory::MemoryQueryEngine;

    fn engine_with_rows(rows: Vec<ResultRow>, page_size: usize) -> (Arc<MemoryQueryEngine>, QueryHandle) {
        let engine = Arc::new(MemoryQueryEngine::new().with_page_size(page_size));
        let id = engine.insert_completed_execution("SELECT * FROM t", rows);
        (engine.clone(), QueryHandle::new(id, "SELECT * FROM t"))
    }

    #[test]
    fn test_header_row_is_skipped() {
        let (engine, handle) = engine_with_rows(
            vec![
                ResultRow::from_values(["partition"]),
                ResultRow::from_values(["year=2024/month=01"]),
                ResultRow::from_values(["year=2024/month=02"]),
            ],
            100,
        );

        let rows = ResultReader::new(engine).read_rows(&handle, true);
        assert_eq!(
            rows,
            vec![
                vec!["year=2024/month=01".to_string()],
                vec!["year=2024/month=02".to_string()],
            ]
        );
    }

    #[test]
    fn test_pages_are_concatenated_in_order() {
        let rows: Vec<ResultRow> = (0..7)
            .map(|i| ResultRow::from_values([format!("p{}", i), format!("v{}", i)]))
            .collect();
        let (engine, handle) = engine_with_rows(rows, 3);

        let read = ResultReader::new(engine).read_rows(&handle, false);
        assert_eq!(read.len(), 7);
        assert_eq!(read[0], vec!["p0".to_string(), "v0".to_string()]);
        assert_eq!(read[6], vec!["p6".to_string(), "v6".to_string()]);
    }

    #[test]
    fn test_header_only_first_page() {
        let rows: Vec<ResultRow> = (0..4).map(|i| ResultRow::from_values([format!("r{}", i)])).collect();
        let (engine, handle) = engine_with_rows(rows, 2);

        let read = ResultReader::new(engine).read_rows(&handle, true);
        assert_eq!(
            read,
            vec![vec!["r1".to_string()], vec!["r2".to_string()], vec!["r3".to_string()]]
        );
    }

    #[test]
    fn test_fetch_error_yields_empty() {
        let (engine, handle) = engine_with_rows(vec![ResultRow::from_values(["x"])], 10);
        engine.fail_next_results("access denied");

        let reader = ResultReader::new(engine.clone());
        assert!(reader.read_rows(&handle, false).is_empty());

        engine.fail_next_results("access denied");
        assert!(matches!(
            reader.try_read_rows(&handle, false),
            Err(LoaderError::ResultFetch(_))
        ));
    }

    #[test]
    fn test_missing_cells_read_as_empty() {
        let row = ResultRow {
            data: vec![Default::default(), crate::query::engine::Datum::new("b")],
        };
        let (engine, handle) = engine_with_rows(vec![row], 10);
        let read = ResultReader::new(engine).read_rows(&handle, false);
        assert_eq!(read, vec![vec![String::new(), "b".to_string()]]);
    }
}
