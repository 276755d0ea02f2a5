use formula_arena::{ArenaConfig, HeapArena};
use formula_colstore::{
    create_column, CellValue, ColumnHandle, ColumnType, ColumnWriter, DataType, FilterMask, Level,
    MeasureType, MISSING_INTEGER,
};
use pretty_assertions::assert_eq;

fn nominal_rows(arena: &mut HeapArena, data_type: DataType, rows: usize) -> ColumnHandle {
    let column = create_column(arena);
    let mut writer = ColumnWriter::unfiltered(arena, column);
    writer.set_data_type(data_type);
    writer.set_measure_type(MeasureType::Nominal);
    writer.set_row_count(rows);
    column
}

fn counts(writer: &ColumnWriter<'_, HeapArena>) -> Vec<(i32, u32, u32)> {
    writer
        .view()
        .levels()
        .into_iter()
        .map(|l| (l.value, l.count, l.count_ex_filtered))
        .collect()
}

#[test]
fn unseen_codes_create_levels_on_the_fly() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 3);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.set_integer(0, 5, false);
    writer.set_integer(1, 3, false);
    writer.set_integer(2, 5, false);

    assert_eq!(
        writer.view().level(3),
        Some(Level {
            value: 3,
            label: "3".to_owned(),
            import_value: "3".to_owned(),
            count: 1,
            count_ex_filtered: 1,
        })
    );
    assert_eq!(counts(&writer), vec![(3, 1, 1), (5, 2, 2)]);
    assert_eq!(writer.view().integers().collect::<Vec<_>>(), vec![5, 3, 5]);
}

#[test]
fn overwrites_move_counts_between_levels() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 3);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.append_level(1, "low", None);
    writer.append_level(2, "high", None);
    writer.set_integer(0, 1, false);
    writer.set_integer(1, 1, false);
    writer.set_integer(2, 2, false);

    writer.set_integer(1, 2, false);
    assert_eq!(counts(&writer), vec![(1, 1, 1), (2, 2, 2)]);

    writer.set_integer(0, MISSING_INTEGER, false);
    assert_eq!(counts(&writer), vec![(1, 0, 0), (2, 2, 2)]);
    assert_eq!(writer.view().integer(0), MISSING_INTEGER);
    // Without trimming, empty levels stay.
    assert_eq!(writer.view().level_count(), 2);
}

#[test]
fn filtered_rows_are_excluded_from_filtered_counts() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 3);

    let mut mask = FilterMask::with_len(3);
    mask.set(1, true);

    let mut writer = ColumnWriter::new(&mut arena, column, &mask);
    for row in 0..3 {
        writer.set_integer(row, 4, false);
    }
    assert_eq!(counts(&writer), vec![(4, 3, 2)]);

    writer.set_integer(1, 5, false);
    assert_eq!(counts(&writer), vec![(4, 2, 2), (5, 1, 0)]);

    writer.set_integer(0, 5, false);
    assert_eq!(counts(&writer), vec![(4, 1, 1), (5, 2, 1)]);
}

#[test]
fn closure_filters_work_too() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 4);
    let even_rows_filtered = |row: usize| row % 2 == 0;

    let mut writer = ColumnWriter::new(&mut arena, column, &even_rows_filtered);
    for row in 0..4 {
        writer.set_integer(row, 1, false);
    }

    assert_eq!(counts(&writer), vec![(1, 4, 2)]);
}

#[test]
fn rewriting_the_same_value_has_no_side_effects() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 1);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.set_integer(0, 9, false);
    let before = writer.changes();
    writer.set_integer(0, 9, false);

    assert_eq!(writer.changes(), before);
    assert_eq!(counts(&writer), vec![(9, 1, 1)]);
}

#[test]
fn initing_writes_ignore_previous_content() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 2);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.append_level(1, "one", None);
    writer.append_level(2, "two", None);
    writer.set_integer(0, 1, true);
    writer.set_integer(1, 1, true);
    assert_eq!(counts(&writer), vec![(1, 2, 2), (2, 0, 0)]);

    // Nothing is retired for the old value.
    writer.set_integer(0, 2, true);
    assert_eq!(counts(&writer), vec![(1, 2, 2), (2, 1, 1)]);

    writer.update_level_counts();
    assert_eq!(counts(&writer), vec![(1, 1, 1), (2, 1, 1)]);
}

#[test]
fn trim_removes_level_when_last_row_leaves() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 3);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.set_trim_levels(true);
    writer.set_integer(0, 1, false);
    writer.set_integer(1, 1, false);
    writer.set_integer(2, 2, false);

    writer.set_integer(2, 1, false);

    assert_eq!(counts(&writer), vec![(1, 3, 3)]);
}

#[test]
fn trim_on_text_column_stores_the_written_code() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Text, 3);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.append_level(0, "a", None);
    writer.append_level(1, "b", None);
    writer.append_level(2, "c", None);
    for row in 0..3 {
        writer.set_integer(row, row as i32, false);
    }
    writer.set_trim_levels(true);

    // Row 1 leaves "b" (emptying it); removing it renumbers "c" to 1 and
    // row 2 with it. Code 2 is then unknown and gets a fresh level.
    writer.set_integer(1, 2, false);

    let view = writer.view();
    assert_eq!(view.integer(1), 2);
    assert_eq!(view.integers().collect::<Vec<_>>(), vec![0, 2, 1]);
    let levels: Vec<(i32, String, u32)> = view
        .levels()
        .into_iter()
        .map(|l| (l.value, l.label, l.count))
        .collect();
    assert_eq!(
        levels,
        vec![
            (0, "a".to_owned(), 1),
            (1, "c".to_owned(), 1),
            (2, "2".to_owned(), 1),
        ]
    );
}

#[test]
fn trimmed_integer_column_reads_back_every_write() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 3);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.set_trim_levels(true);
    for row in 0..3 {
        writer.set_integer(row, row as i32, false);
    }
    writer.set_integer(1, 2, false);

    assert_eq!(writer.view().integers().collect::<Vec<_>>(), vec![0, 2, 2]);
    assert_eq!(counts(&writer), vec![(0, 1, 1), (2, 2, 2)]);
}

#[test]
fn switching_to_id_resets_rows_to_missing() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 2);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);
    writer.set_integer(0, 1, false);
    writer.set_integer(1, 2, false);

    writer.set_measure_type(MeasureType::Id);

    let view = writer.view();
    assert_eq!(view.row_count(), 2);
    assert_eq!(view.text_value(0), None);
    assert_eq!(view.text_value(1), None);

    writer.set_text(0, "p1", false);
    assert_eq!(writer.view().text_value(0).as_deref(), Some("p1"));
}

#[test]
fn switching_between_integer_and_decimal_resets_rows() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = create_column(&mut arena);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);
    writer.set_measure_type(MeasureType::Continuous);
    writer.set_row_count(2);
    writer.set_integer(0, 7, false);

    writer.set_data_type(DataType::Decimal);
    assert!(writer.view().decimal(0).is_nan());
    assert!(writer.view().decimal(1).is_nan());

    writer.set_decimal(1, 0.5, false);
    writer.set_data_type(DataType::Integer);
    assert_eq!(
        writer.view().integers().collect::<Vec<_>>(),
        vec![MISSING_INTEGER, MISSING_INTEGER]
    );
}

#[test]
fn measure_change_within_a_cell_kind_keeps_rows() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 2);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);
    writer.set_integer(0, 4, false);

    writer.set_measure_type(MeasureType::Ordinal);

    assert_eq!(writer.view().integers().collect::<Vec<_>>(), vec![4, MISSING_INTEGER]);
}

#[test]
fn continuous_columns_skip_levels() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = create_column(&mut arena);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    writer.set_measure_type(MeasureType::Continuous);
    writer.set_row_count(2);
    writer.set_integer(0, 42, false);
    writer.set_integer(1, -7, false);

    assert_eq!(writer.view().level_count(), 0);
    assert_eq!(writer.view().integers().collect::<Vec<_>>(), vec![42, -7]);

    writer.update_level_counts();
    assert_eq!(writer.view().level_count(), 0);
}

#[test]
fn update_level_counts_reconciles_raw_appends() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 0);
    let mask = FilterMask::from_words(vec![0b0100], 4);
    let mut writer = ColumnWriter::new(&mut arena, column, &mask);

    writer.append_level(1, "yes", None);
    writer.append_level(0, "no", None);
    for v in [1, 0, 1, MISSING_INTEGER] {
        writer.append(CellValue::Integer(v));
    }
    assert_eq!(counts(&writer), vec![(1, 0, 0), (0, 0, 0)]);

    writer.update_level_counts();
    let reconciled = counts(&writer);
    assert_eq!(reconciled, vec![(1, 2, 1), (0, 1, 1)]);

    writer.update_level_counts();
    assert_eq!(counts(&writer), reconciled);
}

#[test]
#[should_panic(expected = "integer cells cannot be written")]
fn integer_write_to_decimal_column_is_fatal() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = create_column(&mut arena);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);
    writer.set_data_type(DataType::Decimal);
    writer.set_row_count(1);
    writer.set_integer(0, 1, false);
}

#[test]
#[should_panic(expected = "decimal cells can only be written")]
fn decimal_write_to_integer_column_is_fatal() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 1);
    ColumnWriter::unfiltered(&mut arena, column).set_decimal(0, 1.0, false);
}

#[test]
#[should_panic(expected = "text cells can only be written")]
fn text_write_to_nominal_column_is_fatal() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Text, 1);
    ColumnWriter::unfiltered(&mut arena, column).set_text(0, "x", false);
}

#[test]
#[should_panic(expected = "out of range")]
fn writing_past_last_row_is_fatal() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = nominal_rows(&mut arena, DataType::Integer, 2);
    ColumnWriter::unfiltered(&mut arena, column).set_integer(2, 1, false);
}

#[test]
fn every_mutation_advances_the_change_counter() {
    let mut arena = HeapArena::new(&ArenaConfig::small());
    let column = create_column(&mut arena);
    let mut writer = ColumnWriter::unfiltered(&mut arena, column);

    let mut last = writer.changes();
    let mut check = |writer: &ColumnWriter<'_, HeapArena>, what: &str| {
        let now = writer.changes();
        assert!(now > last, "{what} did not advance the change counter");
        last = now;
    };

    writer.set_id(7);
    check(&writer, "set_id");
    writer.set_column_type(ColumnType::Data);
    check(&writer, "set_column_type");
    writer.set_measure_type(MeasureType::Ordinal);
    check(&writer, "set_measure_type");
    writer.set_auto_measure(true);
    check(&writer, "set_auto_measure");
    writer.set_active(true);
    check(&writer, "set_active");
    writer.set_dps(2);
    check(&writer, "set_dps");
    writer.set_row_count(2);
    check(&writer, "set_row_count");
    writer.set_integer(0, 1, false);
    check(&writer, "set_integer");
    writer.insert_rows(0, 0);
    check(&writer, "insert_rows");
    writer.append_level(9, "nine", None);
    check(&writer, "append_level");
    writer.insert_level(4, "four", None);
    check(&writer, "insert_level");
    writer.remove_level(9);
    check(&writer, "remove_level");
    writer.update_level_counts();
    check(&writer, "update_level_counts");
    writer.clear_levels();
    check(&writer, "clear_levels");
    writer.set_name("score");
    check(&writer, "set_name");
    writer.set_formula("A + B");
    check(&writer, "set_formula");
    writer.set_formula_message("");
    check(&writer, "set_formula_message");

    let view = writer.view();
    assert_eq!(view.id(), 7);
    assert_eq!(view.column_type(), ColumnType::Data);
    assert_eq!(view.measure_type(), MeasureType::Ordinal);
    assert!(view.auto_measure());
    assert!(view.active());
    assert_eq!(view.dps(), 2);
}
