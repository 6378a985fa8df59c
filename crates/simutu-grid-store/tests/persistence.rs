// SPDX-License-Identifier: Apache-2.0

use rusqlite::Connection;
use simutu_grid_model::{FieldDef, FieldName, FieldType, FieldValue, ItemId, Record, SubmissionId};
use simutu_grid_store::{
    create_row, get_mappings, init_schema, list_rows, register_submission, setup_mappings,
};
use tempfile::tempdir;

#[test]
fn mappings_and_rows_survive_reopen() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("capture.sqlite");
    let item = ItemId::new(3);
    let submission = SubmissionId::new(11);

    {
        let mut conn = Connection::open(&path).expect("open");
        init_schema(&conn).expect("schema");

        let mut nama = FieldDef::new("nama_kegiatan", "Nama Kegiatan", FieldType::Text)
            .expect("def");
        nama.required = true;
        let tanggal = FieldDef::new("tanggal", "Tanggal", FieldType::Date).expect("def");
        setup_mappings(&mut conn, item, &[nama, tanggal]).expect("setup");
        register_submission(&conn, submission, item).expect("register");

        let mut record = Record::new();
        record.insert(
            FieldName::parse("nama_kegiatan").expect("name"),
            FieldValue::Text("Audit Mutu Internal".to_string()),
        );
        record.insert(
            FieldName::parse("tanggal").expect("name"),
            FieldValue::Text("2024-03-15".to_string()),
        );
        create_row(&mut conn, submission, &record).expect("row");
    }

    let conn = Connection::open(&path).expect("reopen");
    init_schema(&conn).expect("idempotent schema");

    assert_eq!(get_mappings(&conn, item).expect("mappings").len(), 2);
    let rows = list_rows(&conn, submission).expect("rows");
    assert_eq!(rows.len(), 1);
    // ISO text written through the date field comes back typed.
    assert_eq!(
        rows[0].record.values[&FieldName::parse("tanggal").expect("name")],
        FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).expect("date"))
    );
}
