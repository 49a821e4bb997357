//! Serializes a table or database (schema + data) into a portable SQL script
//! or a ZIP archive of scripts.

use chrono::Utc;
use std::io::{Cursor, Write};
use tracing::warn;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::export::{ExportArtifact, ExportContent};
use crate::protocol::{DatabaseExportOptions, TableExportOptions};
use crate::query::{quote_identifier, quote_literal, quote_qualified, quote_string};
use crate::session::ConnectionHandle;
use crate::{MyBridgeError, Result};

pub struct ExportEncoder<'a> {
    handle: &'a ConnectionHandle,
}

impl<'a> ExportEncoder<'a> {
    pub fn new(handle: &'a ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Export one table: schema definition plus, when requested, an insert
    /// block over the (optionally filtered) row set.
    pub async fn export_table(
        &self,
        database: &str,
        table: &str,
        options: &TableExportOptions,
    ) -> Result<ExportArtifact> {
        let saved_mode = self.relax_quoting_mode().await?;
        let result = self.table_script(database, table, options).await;
        self.restore_quoting_mode(&saved_mode).await;
        let script = result?;

        let filename = format!("{database}_{table}_export_{}.sql", timestamp());
        Ok(ExportArtifact::new(filename, ExportContent::Sql(script)))
    }

    /// Export a database: every table in scope, laid out according to the
    /// composed layout flags. More than one output document selects ZIP.
    pub async fn export_database(
        &self,
        database: &str,
        options: &DatabaseExportOptions,
    ) -> Result<ExportArtifact> {
        let saved_mode = self.relax_quoting_mode().await?;
        let result = self.database_documents(database, options).await;
        self.restore_quoting_mode(&saved_mode).await;
        let documents = result?;

        if documents.len() == 1 {
            let (_, content) = documents.into_iter().next().ok_or_else(|| {
                MyBridgeError::operation("Failed to export database", "no documents produced")
            })?;
            let filename = format!("{database}_export_{}.sql", timestamp());
            Ok(ExportArtifact::new(filename, ExportContent::Sql(content)))
        } else {
            let archive = build_zip(&documents)?;
            let filename = format!("{database}_export_{}.zip", timestamp());
            Ok(ExportArtifact::new(filename, ExportContent::Zip(archive)))
        }
    }

    async fn database_documents(
        &self,
        database: &str,
        options: &DatabaseExportOptions,
    ) -> Result<Vec<(String, String)>> {
        let tables = match &options.selected_tables {
            Some(selection) => selection.clone(),
            None => self.handle.list_tables(database).await?,
        };
        let table_options = TableExportOptions {
            include_data: options.include_data,
            where_clause: None,
            selected_rows: None,
        };

        let mut sections = Vec::with_capacity(tables.len());
        for table in &tables {
            let section = self
                .table_sections(database, table, &table_options)
                .await?;
            sections.push((table.clone(), section));
        }

        let header = database_header(database);
        let documents = if options.file_per_table {
            let mut docs = Vec::new();
            for (table, (structure, data)) in sections {
                if options.split_schema_and_data {
                    docs.push((format!("{table}.structure.sql"), structure));
                    if let Some(data) = data {
                        docs.push((format!("{table}.data.sql"), data));
                    }
                } else {
                    let mut doc = structure;
                    if let Some(data) = data {
                        doc.push('\n');
                        doc.push_str(&data);
                    }
                    docs.push((format!("{table}.sql"), doc));
                }
            }
            docs
        } else if options.split_schema_and_data && !options.single_file {
            let mut structure_doc = header;
            let mut data_doc = String::new();
            for (_, (structure, data)) in sections {
                structure_doc.push_str(&structure);
                structure_doc.push('\n');
                if let Some(data) = data {
                    data_doc.push_str(&data);
                    data_doc.push('\n');
                }
            }
            vec![
                ("structure.sql".to_string(), structure_doc),
                ("data.sql".to_string(), data_doc),
            ]
        } else if options.split_schema_and_data {
            let mut doc = header;
            doc.push_str("-- Schema section\n\n");
            let mut data_section = String::from("-- Data section\n\n");
            for (_, (structure, data)) in sections {
                doc.push_str(&structure);
                doc.push('\n');
                if let Some(data) = data {
                    data_section.push_str(&data);
                    data_section.push('\n');
                }
            }
            doc.push_str(&data_section);
            vec![(format!("{database}.sql"), doc)]
        } else {
            let mut doc = header;
            for (_, (structure, data)) in sections {
                doc.push_str(&structure);
                if let Some(data) = data {
                    doc.push('\n');
                    doc.push_str(&data);
                }
                doc.push('\n');
            }
            vec![(format!("{database}.sql"), doc)]
        };

        Ok(documents)
    }

    async fn table_script(
        &self,
        database: &str,
        table: &str,
        options: &TableExportOptions,
    ) -> Result<String> {
        let (structure, data) = self.table_sections(database, table, options).await?;
        let mut script = structure;
        if let Some(data) = data {
            script.push('\n');
            script.push_str(&data);
        }
        Ok(script)
    }

    async fn table_sections(
        &self,
        database: &str,
        table: &str,
        options: &TableExportOptions,
    ) -> Result<(String, Option<String>)> {
        let mut structure = String::new();
        structure.push_str(&format!(
            "-- Table structure for {}\n",
            quote_identifier(table)
        ));
        structure.push_str(&format!(
            "DROP TABLE IF EXISTS {};\n",
            quote_identifier(table)
        ));
        let create = self.handle.show_create_table(database, table).await?;
        structure.push_str(&create);
        structure.push_str(";\n");

        if !options.include_data {
            return Ok((structure, None));
        }

        let mut data_sql = format!("SELECT * FROM {}", quote_qualified(database, table));
        if let Some(predicate) = &options.where_clause {
            if !predicate.trim().is_empty() {
                data_sql.push_str(" WHERE ");
                data_sql.push_str(predicate);
            }
        }
        let rowset = self
            .handle
            .query_raw(&data_sql)
            .await
            .map_err(|e| MyBridgeError::operation("Failed to export table", e))?;

        let columns = rowset.columns;
        let mut rows = rowset.rows;
        if let Some(selected) = &options.selected_rows {
            rows = rows
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| selected.contains(idx))
                .map(|(_, row)| row)
                .collect();
        }
        if rows.is_empty() {
            return Ok((structure, None));
        }

        let mut data = String::new();
        data.push_str(&format!("-- Data for table {}\n", quote_identifier(table)));
        data.push_str(&format!("LOCK TABLES {} WRITE;\n", quote_identifier(table)));
        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        data.push_str(&format!(
            "INSERT INTO {} ({}) VALUES\n",
            quote_identifier(table),
            column_list
        ));
        let tuples = rows
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(quote_literal)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            })
            .collect::<Vec<_>>()
            .join(",\n");
        data.push_str(&tuples);
        data.push_str(";\nUNLOCK TABLES;\n");

        Ok((structure, Some(data)))
    }

    /// Clear the session quoting mode so exported DDL and literals come out
    /// in the portable form. Returns the mode to restore.
    async fn relax_quoting_mode(&self) -> Result<String> {
        let rowset = self
            .handle
            .query_raw("SELECT @@SESSION.sql_mode AS sql_mode")
            .await
            .map_err(|e| MyBridgeError::operation("Failed to export", e))?;
        let saved = rowset
            .scalar()
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        self.handle
            .execute_raw("SET SESSION sql_mode = ''")
            .await
            .map_err(|e| MyBridgeError::operation("Failed to export", e))?;
        Ok(saved)
    }

    /// Restore runs on every exit path; a failure here must not mask the
    /// export result, so it is logged instead.
    async fn restore_quoting_mode(&self, saved: &str) {
        let sql = format!("SET SESSION sql_mode = {}", quote_string(saved));
        if let Err(e) = self.handle.execute_raw(&sql).await {
            warn!("failed to restore sql_mode after export: {e}");
        }
    }
}

fn database_header(database: &str) -> String {
    format!(
        "-- Database Export: {database}\n-- Generated on: {}\n-- mybridge export\n\n\
         CREATE DATABASE IF NOT EXISTS {};\nUSE {};\n\n",
        Utc::now().to_rfc3339(),
        quote_identifier(database),
        quote_identifier(database)
    )
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

fn build_zip(documents: &[(String, String)]) -> Result<Vec<u8>> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(6));
    for (name, content) in documents {
        writer
            .start_file(name, options)
            .map_err(|e| MyBridgeError::operation("Failed to build export archive", e))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| MyBridgeError::operation("Failed to build export archive", e))?;
    }
    let finished = writer
        .finish()
        .map_err(|e| MyBridgeError::operation("Failed to build export archive", e))?;
    Ok(finished.into_inner())
}
