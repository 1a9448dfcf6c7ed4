//! Integration tests for acc-output.

#[cfg(test)]
mod fixtures {
    use crate::{AccessRow, AccessSchema, SummaryRow};

    pub fn schema() -> AccessSchema {
        AccessSchema::new(vec!["hospital-1st".into(), "walk-leg".into(), "composite".into()])
    }

    pub fn row(id: &str, first: Option<f64>, class: Option<&str>) -> AccessRow {
        AccessRow {
            origin_id:    id.into(),
            values:       vec![first, first.map(|_| 12.5), first],
            access_class: class.map(str::to_owned),
        }
    }

    pub fn summary(region: &str) -> SummaryRow {
        SummaryRow {
            region:             region.into(),
            origins:            3,
            total_weight:       600.0,
            reachable_weight:   400.0,
            snap_failed_weight: 200.0,
            means:              vec![Some(90.0), Some(12.5), None],
        }
    }
}

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use super::fixtures::{row, schema, summary};
    use crate::csv::CsvWriter;
    use crate::writer::AccessWriter;
    use crate::OutputError;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path(), &schema()).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("accessibility.csv")).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, ["origin_id", "hospital-1st", "walk-leg", "composite", "access_class"]);

        let mut rdr2 = csv::Reader::from_path(dir.path().join("regional_summary.csv")).unwrap();
        let headers2: Vec<_> = rdr2.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(
            headers2,
            [
                "region", "origins", "total_weight", "reachable_weight", "snap_failed_weight",
                "mean_hospital-1st", "mean_walk-leg", "mean_composite",
            ]
        );
    }

    #[test]
    fn missing_values_are_empty_not_sentinel() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path(), &schema()).unwrap();
        w.write_rows(&[row("a", Some(999_999_999.0), Some("no access")), row("b", None, None)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("accessibility.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "999999999");
        assert_eq!(&rows[0][4], "no access");
        assert_eq!(&rows[1][0], "b");
        assert_eq!(&rows[1][1], "");
        assert_eq!(&rows[1][4], "");
    }

    #[test]
    fn summary_round_trip() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path(), &schema()).unwrap();
        w.write_summaries(&[summary("North")]).unwrap();
        w.finish().unwrap();
        w.finish().unwrap(); // idempotent

        let mut rdr = csv::Reader::from_path(dir.path().join("regional_summary.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][0], "North");
        assert_eq!(&rows[0][3], "400");
        assert_eq!(&rows[0][5], "90");
        assert_eq!(&rows[0][7], "");
    }

    #[test]
    fn wrong_width_rejected() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path(), &schema()).unwrap();
        let mut bad = row("a", Some(1.0), None);
        bad.values.pop();
        assert!(matches!(w.write_rows(&[bad]), Err(OutputError::Schema { found: 2, expected: 3 })));
    }
}

#[cfg(test)]
mod odcsv_tests {
    use std::io::Write;

    use crate::{fingerprint_path, read_od_csv, OdCsvWriter, OutputError, ROW_KEY};

    const F: f64 = 999_999_999.0;

    #[test]
    fn header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        let mut w = OdCsvWriter::create(&path, &[101, 205]).unwrap();
        w.write_row(17, &[0.0, F]).unwrap();
        w.write_row(18, &[36.25, 12.0]).unwrap();
        w.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("{ROW_KEY},101,205\n")));
        assert!(text.contains("17,0,999999999\n"));

        let od = read_od_csv(&path).unwrap();
        assert_eq!(od.destinations, vec![101, 205]);
        assert_eq!(od.rows, vec![(17, vec![0.0, F]), (18, vec![36.25, 12.0])]);
        assert_eq!(od.complete_len, text.len() as u64);
    }

    #[test]
    fn truncated_tail_dropped_and_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        {
            let mut w = OdCsvWriter::create(&path, &[1, 2]).unwrap();
            w.write_row(10, &[5.0, 6.0]).unwrap();
            w.flush().unwrap();
        }
        // Simulate a crash mid-row.
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"11,7.5").unwrap();
        drop(f);

        let od = read_od_csv(&path).unwrap();
        assert_eq!(od.rows, vec![(10, vec![5.0, 6.0])]);

        let mut w = OdCsvWriter::resume(&path, &od).unwrap();
        w.write_row(11, &[7.5, 8.0]).unwrap();
        w.flush().unwrap();
        drop(w);

        let again = read_od_csv(&path).unwrap();
        assert_eq!(again.rows, vec![(10, vec![5.0, 6.0]), (11, vec![7.5, 8.0])]);
    }

    #[test]
    fn full_width_row_without_newline_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        std::fs::write(&path, "origin_node,1,2\n10,5,6\n11,7,8").unwrap();
        let od = read_od_csv(&path).unwrap();
        assert_eq!(od.rows.len(), 1);
        assert_eq!(od.complete_len, "origin_node,1,2\n10,5,6\n".len() as u64);
    }

    #[test]
    fn wrong_row_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        std::fs::write(&path, "node,1,2\n").unwrap();
        assert!(matches!(read_od_csv(&path), Err(OutputError::Format { .. })));
    }

    #[test]
    fn fingerprint_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("od.csv");
        OdCsvWriter::create(&path, &[1]).unwrap();
        assert_eq!(read_od_csv(&path).unwrap().fingerprint, None);

        let mut w = OdCsvWriter::create_with_fingerprint(&path, &[1], "weight=time").unwrap();
        w.write_row(3, &[4.0]).unwrap();
        w.flush().unwrap();
        assert!(fingerprint_path(&path).ends_with("od.csv.run"));

        let od = read_od_csv(&path).unwrap();
        assert_eq!(od.fingerprint.as_deref(), Some("weight=time"));
        assert_eq!(od.rows, vec![(3, vec![4.0])]);

        // A plain re-create drops the stale sidecar.
        OdCsvWriter::create(&path, &[1]).unwrap();
        assert!(!fingerprint_path(&path).exists());
    }

    #[test]
    fn width_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = OdCsvWriter::create(&dir.path().join("od.csv"), &[1, 2, 3]).unwrap();
        assert!(w.write_row(1, &[0.0]).is_err());
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use tempfile::TempDir;

    use super::fixtures::{row, schema, summary};
    use crate::sqlite::SqliteWriter;
    use crate::writer::AccessWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn sqlite_rows_and_nulls() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path(), &schema()).unwrap();
        w.write_rows(&[row("a", Some(90.0), Some("high access")), row("b", None, None)]).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("accessibility.db")).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accessibility", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
        let first: Option<f64> = conn
            .query_row("SELECT \"hospital-1st\" FROM accessibility WHERE origin_id = 'b'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, None);
        let class: String = conn
            .query_row("SELECT access_class FROM accessibility WHERE origin_id = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(class, "high access");
    }

    #[test]
    fn sqlite_summary() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path(), &schema()).unwrap();
        w.write_summaries(&[summary("North")]).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("accessibility.db")).unwrap();
        let (origins, mean): (i64, f64) = conn
            .query_row(
                "SELECT origins, \"mean_hospital-1st\" FROM regional_summary WHERE region = 'North'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(origins, 3);
        assert_eq!(mean, 90.0);
    }

    #[test]
    fn rerun_replaces_tables() {
        let dir = tmp();
        for _ in 0..2 {
            let mut w = SqliteWriter::new(dir.path(), &schema()).unwrap();
            w.write_rows(&[row("a", Some(1.0), None)]).unwrap();
            w.finish().unwrap();
        }
        let conn = rusqlite::Connection::open(dir.path().join("accessibility.db")).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accessibility", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}

#[cfg(all(test, feature = "parquet"))]
mod parquet_tests {
    use arrow::array::{Array, Float64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    use super::fixtures::{row, schema, summary};
    use crate::parquet::ParquetWriter;
    use crate::writer::AccessWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn parquet_files_created() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path(), &schema()).unwrap();
        w.finish().unwrap();
        assert!(dir.path().join("accessibility.parquet").exists());
        assert!(dir.path().join("regional_summary.parquet").exists());
    }

    #[test]
    fn parquet_nulls_for_missing() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path(), &schema()).unwrap();
        w.write_rows(&[row("a", Some(90.0), Some("low access")), row("b", None, None)]).unwrap();
        w.write_summaries(&[summary("North")]).unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("accessibility.parquet")).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 5);

        let ids = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ids.value(1), "b");
        let first = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(first.value(0), 90.0);
        assert!(first.is_null(1));
        let class = batch.column(4).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(class.is_null(1));
    }
}
