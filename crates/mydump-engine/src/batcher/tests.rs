use super::*;
use mydump_core::NativeScan;
use pretty_assertions::assert_eq;

const PREFIX: &str = "INSERT INTO `t1` (`id`, `name`) VALUES ";

fn run(rows: &[&str], max_allowed_packet: usize, extended: bool) -> (String, BatchStats) {
    let mut out: Vec<u8> = Vec::new();
    let mut batcher = InsertBatcher::new(&mut out, PREFIX, max_allowed_packet, extended);
    for row in rows {
        batcher.push_row(row.as_bytes()).unwrap();
    }
    let stats = batcher.finish().unwrap();
    (String::from_utf8(out).unwrap(), stats)
}

#[test]
fn test_rows_share_one_statement_under_the_bound() {
    let (out, stats) = run(&["(1,'John')", "(2,'Jill')"], 4096, true);
    assert_eq!(
        out,
        "INSERT INTO `t1` (`id`, `name`) VALUES (1,'John'),(2,'Jill');\n"
    );
    assert_eq!(stats, BatchStats { rows: 2, statements: 1 });
}

#[test]
fn test_no_rows_emit_nothing() {
    let (out, stats) = run(&[], 4096, true);
    assert_eq!(out, "");
    assert_eq!(stats, BatchStats::default());
}

#[test]
fn test_statement_splits_at_the_bound() {
    // prefix (39) + "(1,'a')" (7) = 46; adding 7 more would exceed 50 - 1
    let (out, stats) = run(&["(1,'a')", "(2,'b')", "(3,'c')"], 50, true);
    assert_eq!(
        out,
        "INSERT INTO `t1` (`id`, `name`) VALUES (1,'a');\n\
         INSERT INTO `t1` (`id`, `name`) VALUES (2,'b');\n\
         INSERT INTO `t1` (`id`, `name`) VALUES (3,'c');\n"
    );
    assert_eq!(stats.statements, 3);
}

#[test]
fn test_oversized_row_is_emitted_alone() {
    let big = format!("(1,'{}')", "x".repeat(200));
    let (out, stats) = run(&["(0,'a')", &big, "(2,'b')"], 64, true);
    let statements: Vec<&str> = out.lines().collect();
    assert_eq!(statements.len(), 3);
    assert!(statements[1].ends_with(&format!("VALUES {};", big)));
    assert_eq!(stats, BatchStats { rows: 3, statements: 3 });
}

#[test]
fn test_skip_extended_insert_emits_one_statement_per_row() {
    let (out, stats) = run(&["(1,'John')", "(2,'Jill')"], 4096, false);
    assert_eq!(
        out,
        "INSERT INTO `t1` (`id`, `name`) VALUES (1,'John');\n\
         INSERT INTO `t1` (`id`, `name`) VALUES (2,'Jill');\n"
    );
    assert_eq!(stats, BatchStats { rows: 2, statements: 2 });
}

#[test]
fn test_row_sink_scans_cells_by_column_class() {
    let mut out: Vec<u8> = Vec::new();
    let mut batcher = InsertBatcher::new(&mut out, PREFIX, 4096, true);
    batcher
        .begin(&[
            ColumnDescriptor::new("id", "INT", NativeScan::SignedInteger),
            ColumnDescriptor::new("name", "VARCHAR", NativeScan::Text),
        ])
        .unwrap();
    batcher
        .row(vec![Some(b"1".to_vec()), Some(b"O'Brien".to_vec())])
        .unwrap();
    batcher.row(vec![Some(b"2".to_vec()), None]).unwrap();
    batcher.finish().unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "INSERT INTO `t1` (`id`, `name`) VALUES (1,'O\\'Brien'),(2,NULL);\n"
    );
}

#[test]
fn test_row_sink_rejects_cell_count_mismatch() {
    let mut out: Vec<u8> = Vec::new();
    let mut batcher = InsertBatcher::new(&mut out, PREFIX, 4096, true);
    batcher
        .begin(&[ColumnDescriptor::new("id", "INT", NativeScan::SignedInteger)])
        .unwrap();
    let err = batcher.row(vec![None, None]).unwrap_err();
    assert!(matches!(err, MydumpError::Serialization(_)));
}
