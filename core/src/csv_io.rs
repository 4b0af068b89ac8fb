//! CSV export/import for habit logs and time blocks.
//!
//! Exports are plain flat files meant to be re-importable; imports recover
//! from bad rows individually and report them instead of aborting the run.

use std::io::{Read, Write};

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::models::{duration_minutes, ImportReport, NewHabit, NewHabitLog, NewTimeBlock};

pub const HABIT_LOG_HEADERS: [&str; 7] = [
    "Habit Name",
    "Type",
    "Target Hours",
    "Date",
    "Hours Spent",
    "Completed",
    "Notes",
];

pub const TIME_BLOCK_HEADERS: [&str; 7] = [
    "Date",
    "Start Time",
    "End Time",
    "Activity",
    "Duration (minutes)",
    "Category",
    "Task",
];

/// Write every habit log (joined with its habit) as CSV, newest date first.
pub fn export_habit_logs<W: Write>(db: &Database, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HABIT_LOG_HEADERS)
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    for row in db.habit_log_export_rows()? {
        let target = row.target_hours.map(|v| v.to_string()).unwrap_or_default();
        let hours = row.hours_spent.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            row.habit_name.as_str(),
            row.habit_type.as_str(),
            target.as_str(),
            row.log_date.as_str(),
            hours.as_str(),
            if row.completed { "1" } else { "0" },
            row.notes.as_str(),
        ])
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    }
    wtr.flush()
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(())
}

/// Write every time block (with category/task names) as CSV, newest date first.
pub fn export_time_blocks<W: Write>(db: &Database, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(TIME_BLOCK_HEADERS)
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    for row in db.time_block_export_rows()? {
        let duration = row.duration_minutes.to_string();
        wtr.write_record([
            row.block_date.as_str(),
            row.start_time.as_str(),
            row.end_time.as_str(),
            row.activity.as_str(),
            duration.as_str(),
            row.category.as_deref().unwrap_or(""),
            row.task.as_deref().unwrap_or(""),
        ])
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    }
    wtr.flush()
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(())
}

/// Import habit logs, creating any habit named in the file that does not
/// exist yet (matched by exact name).
///
/// Rows without a Date are skipped silently; rows that fail otherwise are
/// recorded and the import keeps going. Each inserted row is committed as it
/// lands, so a partial import keeps what succeeded.
pub fn import_habit_logs<R: Read>(db: &Database, reader: R) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| StoreError::Malformed(format!("Failed to read CSV headers: {e}")))?
        .clone();

    // Build column index map (case-insensitive)
    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_name = col("Habit Name")
        .ok_or_else(|| StoreError::Malformed("Missing 'Habit Name' column".to_string()))?;
    let idx_type = col("Type");
    let idx_target = col("Target Hours");
    let idx_date = col("Date");
    let idx_hours = col("Hours Spent");
    let idx_completed = col("Completed");
    let idx_notes = col("Notes");

    let mut imported = 0;
    let mut errors = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2; // header is line 1
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("Row {line}: {e}"));
                continue;
            }
        };
        if let Err(e) = import_habit_log_row(
            db, &record, idx_name, idx_type, idx_target, idx_date, idx_hours, idx_completed,
            idx_notes, &mut imported,
        ) {
            errors.push(format!("Row {line}: {e}"));
        }
    }

    Ok(ImportReport { imported, errors })
}

#[allow(clippy::too_many_arguments)]
fn import_habit_log_row(
    db: &Database,
    record: &csv::StringRecord,
    idx_name: usize,
    idx_type: Option<usize>,
    idx_target: Option<usize>,
    idx_date: Option<usize>,
    idx_hours: Option<usize>,
    idx_completed: Option<usize>,
    idx_notes: Option<usize>,
    imported: &mut usize,
) -> Result<()> {
    let cell = |idx: Option<usize>| -> &str { idx.and_then(|i| record.get(i)).unwrap_or("") };

    let habit_name = record.get(idx_name).unwrap_or("").trim();
    if habit_name.is_empty() {
        return Err(StoreError::Validation("missing habit name".to_string()));
    }

    // Upsert the habit by exact name.
    let habit_id = match db.habit_id_by_name(habit_name)? {
        Some(id) => id,
        None => {
            let habit_type = match cell(idx_type) {
                "" => "daily",
                t => t,
            };
            db.insert_habit(&NewHabit {
                name: habit_name.to_string(),
                habit_type: habit_type.to_string(),
                target_hours: cell(idx_target).parse::<i64>().ok(),
                target_value: None,
                target_type: "binary".to_string(),
            })?
        }
    };

    let date_cell = cell(idx_date);
    if date_cell.is_empty() {
        return Ok(()); // habit ensured, nothing logged for this row
    }
    let log_date = NaiveDate::parse_from_str(date_cell, "%Y-%m-%d")
        .map_err(|_| StoreError::Malformed(format!("Invalid date '{date_cell}'. Use YYYY-MM-DD")))?;

    let completed_cell = cell(idx_completed).to_lowercase();
    db.insert_log(&NewHabitLog {
        habit_id,
        log_date,
        hours_spent: cell(idx_hours).parse::<f64>().ok(),
        value: None,
        completed: matches!(completed_cell.as_str(), "true" | "1" | "yes"),
        completion_percentage: None,
        notes: cell(idx_notes).to_string(),
    })?;
    *imported += 1;
    Ok(())
}

/// Import time blocks. Category and Task cells resolve to existing rows by
/// exact name; an unknown name leaves the block unlinked rather than creating
/// anything.
///
/// Rows missing any of date/start/end/activity are skipped silently. The
/// Duration cell is trusted when it parses, otherwise the duration is
/// recomputed from the time pair.
pub fn import_time_blocks<R: Read>(db: &Database, reader: R) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| StoreError::Malformed(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_date = col("Date");
    let idx_start = col("Start Time");
    let idx_end = col("End Time");
    let idx_activity = col("Activity");
    let idx_duration = col("Duration (minutes)");
    let idx_category = col("Category");
    let idx_task = col("Task");

    let mut imported = 0;
    let mut errors = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("Row {line}: {e}"));
                continue;
            }
        };

        let cell = |idx: Option<usize>| -> &str { idx.and_then(|i| record.get(i)).unwrap_or("") };

        let date_cell = cell(idx_date);
        let start = cell(idx_start);
        let end = cell(idx_end);
        let activity = cell(idx_activity);
        if date_cell.is_empty() || start.is_empty() || end.is_empty() || activity.is_empty() {
            continue; // incomplete row, skipped without an error
        }

        let outcome = (|| -> Result<()> {
            let block_date = NaiveDate::parse_from_str(date_cell, "%Y-%m-%d").map_err(|_| {
                StoreError::Malformed(format!("Invalid date '{date_cell}'. Use YYYY-MM-DD"))
            })?;

            let category_id = match cell(idx_category) {
                "" => None,
                name => db.category_id_by_name(name)?,
            };
            let task_id = match cell(idx_task) {
                "" => None,
                name => db.task_id_by_name(name)?,
            };

            let duration = match cell(idx_duration).parse::<i64>() {
                Ok(minutes) => minutes,
                Err(_) => duration_minutes(start, end)?,
            };

            db.insert_block_with_duration(
                &NewTimeBlock {
                    block_date,
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                    activity: activity.to_string(),
                    category_id,
                    task_id,
                },
                duration,
            )?;
            imported += 1;
            Ok(())
        })();

        if let Err(e) = outcome {
            errors.push(format!("Row {line}: {e}"));
        }
    }

    Ok(ImportReport { imported, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_CATEGORY_COLOR;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn export_habit_logs_format() {
        let db = db();
        let id = db
            .insert_habit(&NewHabit {
                name: "Reading".to_string(),
                habit_type: "daily".to_string(),
                target_hours: Some(30),
                target_value: None,
                target_type: "binary".to_string(),
            })
            .unwrap();
        db.insert_log(&NewHabitLog {
            habit_id: id,
            log_date: date("2024-06-01"),
            hours_spent: Some(1.5),
            value: None,
            completed: true,
            completion_percentage: None,
            notes: "chapter 3".to_string(),
        })
        .unwrap();

        let mut out = Vec::new();
        export_habit_logs(&db, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Reading,daily,30,2024-06-01,1.5,1,chapter 3"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn export_time_blocks_blank_for_unlinked() {
        let db = db();
        db.insert_block(&NewTimeBlock {
            block_date: date("2024-06-01"),
            start_time: "09:00".to_string(),
            end_time: "10:30".to_string(),
            activity: "deep work".to_string(),
            category_id: None,
            task_id: None,
        })
        .unwrap();

        let mut out = Vec::new();
        export_time_blocks(&db, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task"
        );
        assert_eq!(lines.next().unwrap(), "2024-06-01,09:00,10:30,deep work,90,,");
    }

    #[test]
    fn import_habit_logs_creates_missing_habits() {
        let db = db();
        let csv = "Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes\n\
                   Reading,daily,30,2024-06-01,1.5,true,chapter 3\n\
                   Reading,daily,30,2024-06-02,0.5,0,\n\
                   Running,,,2024-06-01,,yes,\n";
        let report = import_habit_logs(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 3);
        assert!(report.errors.is_empty());

        // Two distinct habits, the second with the default type.
        let habits = db.list_habits().unwrap();
        assert_eq!(habits.len(), 2);
        let running = habits.iter().find(|h| h.name == "Running").unwrap();
        assert_eq!(running.habit_type, "daily");
        assert_eq!(running.target_hours, None);

        let logs = db.logs_for_date(date("2024-06-01")).unwrap();
        assert_eq!(logs.len(), 2);
        let reading = logs.iter().find(|l| l.name.as_deref() == Some("Reading")).unwrap();
        assert!(reading.completed);
        assert_eq!(reading.hours_spent, Some(1.5));
        let running = logs.iter().find(|l| l.name.as_deref() == Some("Running")).unwrap();
        assert!(running.completed); // "yes" counts
        assert!(running.hours_spent.is_none());
    }

    #[test]
    fn import_habit_logs_dateless_row_creates_habit_only() {
        let db = db();
        let csv = "Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes\n\
                   Meditation,daily,,,,,\n";
        let report = import_habit_logs(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 0);
        assert!(report.errors.is_empty());
        assert_eq!(db.list_habits().unwrap().len(), 1);
    }

    #[test]
    fn import_habit_logs_recovers_per_row() {
        let db = db();
        let csv = "Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes\n\
                   ,daily,,2024-06-01,,,\n\
                   Reading,daily,,not-a-date,,,\n\
                   Reading,daily,,2024-06-02,,1,\n";
        let report = import_habit_logs(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("Row 2:"));
        assert!(report.errors[1].starts_with("Row 3:"));
        // The good row landed despite its predecessors failing.
        assert_eq!(db.logs_for_date(date("2024-06-02")).unwrap().len(), 1);
    }

    #[test]
    fn import_habit_logs_missing_name_column_is_fatal() {
        let db = db();
        let csv = "Type,Date\ndaily,2024-06-01\n";
        assert!(matches!(
            import_habit_logs(&db, csv.as_bytes()),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn import_time_blocks_resolves_names_or_leaves_null() {
        let db = db();
        let work = db.insert_category("Work", DEFAULT_CATEGORY_COLOR).unwrap();
        let emails = db.insert_task("Emails", Some(work)).unwrap();

        let csv = "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task\n\
                   2024-06-01,09:00,10:00,inbox,60,Work,Emails\n\
                   2024-06-01,10:00,11:00,errands,60,Nonexistent,Nowhere\n";
        let report = import_time_blocks(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 2);
        assert!(report.errors.is_empty());

        let day = db.blocks_for_date(date("2024-06-01")).unwrap();
        assert_eq!(day.blocks[0].category_id, Some(work));
        assert_eq!(day.blocks[0].task_id, Some(emails));
        // Unknown names never auto-create categories or tasks.
        assert_eq!(day.blocks[1].category_id, None);
        assert_eq!(day.blocks[1].task_id, None);
        assert_eq!(db.list_categories().unwrap().len(), 1);
        assert_eq!(db.list_tasks(None).unwrap().len(), 1);
    }

    #[test]
    fn import_time_blocks_duration_cell_trusted_else_recomputed() {
        let db = db();
        let csv = "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task\n\
                   2024-06-01,09:00,10:00,trusted,45,,\n\
                   2024-06-01,09:00,10:00,recomputed,,,\n";
        let report = import_time_blocks(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 2);

        let day = db.blocks_for_date(date("2024-06-01")).unwrap();
        let trusted = day.blocks.iter().find(|b| b.activity == "trusted").unwrap();
        assert_eq!(trusted.duration_minutes, 45);
        let recomputed = day.blocks.iter().find(|b| b.activity == "recomputed").unwrap();
        assert_eq!(recomputed.duration_minutes, 60);
    }

    #[test]
    fn import_time_blocks_skips_incomplete_rows_silently() {
        let db = db();
        let csv = "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task\n\
                   2024-06-01,,10:00,missing start,,,\n\
                   2024-06-01,09:00,10:00,,,,\n\
                   2024-06-01,09:00,10:00,kept,,,\n";
        let report = import_time_blocks(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 1);
        assert!(report.errors.is_empty());
        assert_eq!(db.blocks_for_date(date("2024-06-01")).unwrap().blocks.len(), 1);
    }

    #[test]
    fn import_time_blocks_bad_times_reported() {
        let db = db();
        let csv = "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task\n\
                   2024-06-01,nine,10:00,broken,,,\n";
        let report = import_time_blocks(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Invalid time"));
    }

    #[test]
    fn habit_log_export_import_round_trip() {
        let db = db();
        let reading = db
            .insert_habit(&NewHabit {
                name: "Reading".to_string(),
                habit_type: "daily".to_string(),
                target_hours: Some(30),
                target_value: None,
                target_type: "binary".to_string(),
            })
            .unwrap();
        db.insert_log(&NewHabitLog {
            habit_id: reading,
            log_date: date("2024-06-01"),
            hours_spent: Some(1.5),
            value: None,
            completed: true,
            completion_percentage: None,
            notes: "chapter 3".to_string(),
        })
        .unwrap();
        db.insert_log(&NewHabitLog {
            habit_id: reading,
            log_date: date("2024-06-02"),
            hours_spent: None,
            value: None,
            completed: false,
            completion_percentage: None,
            notes: String::new(),
        })
        .unwrap();

        let mut out = Vec::new();
        export_habit_logs(&db, &mut out).unwrap();

        // Import the exported bytes into an empty store.
        let other = Database::open_in_memory().unwrap();
        let report = import_habit_logs(&other, out.as_slice()).unwrap();
        assert_eq!(report.imported, 2);
        assert!(report.errors.is_empty());

        // The habit was recreated from the file, not pre-seeded.
        let habits = other.list_habits().unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].name, "Reading");
        assert_eq!(habits[0].habit_type, "daily");

        let first = other.logs_for_date(date("2024-06-01")).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].hours_spent, Some(1.5));
        assert!(first[0].completed); // exported "1" parses back as true
        assert_eq!(first[0].notes, "chapter 3");

        let second = other.logs_for_date(date("2024-06-02")).unwrap();
        assert_eq!(second.len(), 1);
        assert!(second[0].hours_spent.is_none());
        assert!(!second[0].completed); // exported "0" stays false
        assert!(second[0].notes.is_empty());
    }

    #[test]
    fn export_import_round_trip() {
        let db = db();
        let work = db.insert_category("Work", DEFAULT_CATEGORY_COLOR).unwrap();
        let mut block = NewTimeBlock {
            block_date: date("2024-06-01"),
            start_time: "09:00".to_string(),
            end_time: "10:30".to_string(),
            activity: "deep work".to_string(),
            category_id: Some(work),
            task_id: None,
        };
        db.insert_block(&block).unwrap();
        block.start_time = "14:00".to_string();
        block.end_time = "15:00".to_string();
        block.activity = "review".to_string();
        db.insert_block(&block).unwrap();

        let mut out = Vec::new();
        export_time_blocks(&db, &mut out).unwrap();

        let other = Database::open_in_memory().unwrap();
        other.insert_category("Work", DEFAULT_CATEGORY_COLOR).unwrap();
        let report = import_time_blocks(&other, out.as_slice()).unwrap();
        assert_eq!(report.imported, 2);
        assert!(report.errors.is_empty());

        let day = other.blocks_for_date(date("2024-06-01")).unwrap();
        assert_eq!(day.total_minutes, 150);
        assert_eq!(day.blocks[0].activity, "deep work");
        assert!(day.blocks[0].category_id.is_some());
    }
}
