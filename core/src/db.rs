use std::path::Path;

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};

use crate::error::{Result, StoreError};
use crate::models::{
    Category, CategoryAnalytics, CategoryStat, DayBlocks, duration_minutes, Habit, HabitAnalytics,
    HabitLog, HabitLogExportRow, HabitProgress, HabitStat, minutes_to_hours, NewHabit, NewHabitLog,
    NewTimeBlock, round1, round2, Task, TaskAnalytics, TaskStat, TimeBlock, TimeBlockExportRow,
    UNCATEGORIZED_COLOR, UpdateHabitLog, UpdateTimeBlock,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS habits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    habit_type TEXT NOT NULL,
                    target_hours INTEGER,
                    target_value INTEGER,
                    target_type TEXT NOT NULL DEFAULT 'binary',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS habit_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    habit_id INTEGER NOT NULL,
                    log_date TEXT NOT NULL,
                    hours_spent REAL,
                    value INTEGER,
                    completed INTEGER NOT NULL DEFAULT 0,
                    completion_percentage INTEGER,
                    notes TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    color TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    category_id INTEGER,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS time_blocks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    block_date TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    activity TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL,
                    category_id INTEGER,
                    task_id INTEGER
                );

                CREATE INDEX IF NOT EXISTS idx_habit_logs_habit ON habit_logs(habit_id);
                CREATE INDEX IF NOT EXISTS idx_habit_logs_date ON habit_logs(log_date);
                CREATE INDEX IF NOT EXISTS idx_time_blocks_date ON time_blocks(block_date);
                CREATE INDEX IF NOT EXISTS idx_time_blocks_category ON time_blocks(category_id);
                CREATE INDEX IF NOT EXISTS idx_time_blocks_task ON time_blocks(task_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Map a constraint violation onto a Conflict with a user-facing message;
    /// pass everything else through as a storage error.
    fn conflict_on_unique(err: rusqlite::Error, message: &str) -> StoreError {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(message.to_string())
            }
            other => StoreError::Storage(other),
        }
    }

    // --- Row mapping helpers ---

    fn habit_from_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
        Ok(Habit {
            id: row.get(0)?,
            name: row.get(1)?,
            habit_type: row.get(2)?,
            target_hours: row.get(3)?,
            target_value: row.get(4)?,
            target_type: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // Expects columns:
    // 0: hl.id, 1: hl.habit_id, 2: hl.log_date, 3: hl.hours_spent, 4: hl.value,
    // 5: hl.completed, 6: hl.completion_percentage, 7: hl.notes,
    // 8: h.name, 9: h.habit_type, 10: h.target_hours, 11: h.target_value,
    // 12: h.target_type
    fn log_from_row(row: &rusqlite::Row) -> rusqlite::Result<HabitLog> {
        Ok(HabitLog {
            id: row.get(0)?,
            habit_id: row.get(1)?,
            log_date: row.get(2)?,
            hours_spent: row.get(3)?,
            value: row.get(4)?,
            completed: row.get(5)?,
            completion_percentage: row.get(6)?,
            notes: row.get(7)?,
            name: Some(row.get(8)?),
            habit_type: Some(row.get(9)?),
            target_hours: row.get(10)?,
            target_value: row.get(11)?,
            target_type: Some(row.get(12)?),
        })
    }

    fn category_from_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // Expects: t.id, t.name, t.category_id, t.created_at, c.name, c.color
    fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            name: row.get(1)?,
            category_id: row.get(2)?,
            created_at: row.get(3)?,
            category_name: row.get(4)?,
            category_color: row.get(5)?,
        })
    }

    // Expects: tb.id, tb.block_date, tb.start_time, tb.end_time, tb.activity,
    // tb.duration_minutes, tb.category_id, tb.task_id, c.name, c.color, t.name
    fn block_from_row(row: &rusqlite::Row) -> rusqlite::Result<TimeBlock> {
        Ok(TimeBlock {
            id: row.get(0)?,
            block_date: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            activity: row.get(4)?,
            duration_minutes: row.get(5)?,
            category_id: row.get(6)?,
            task_id: row.get(7)?,
            category_name: row.get(8)?,
            category_color: row.get(9)?,
            task_name: row.get(10)?,
        })
    }

    // --- Habits ---

    pub fn insert_habit(&self, habit: &NewHabit) -> Result<i64> {
        if habit.name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }
        if habit.habit_type.trim().is_empty() {
            return Err(StoreError::Validation("habit_type is required".to_string()));
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO habits (name, habit_type, target_hours, target_value, target_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.name,
                habit.habit_type,
                habit.target_hours,
                habit.target_value,
                habit.target_type,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, habit_type, target_hours, target_value, target_type, created_at
             FROM habits ORDER BY created_at DESC, id DESC",
        )?;
        let habits = stmt
            .query_map([], Self::habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    pub fn habit_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM habits WHERE name = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Deletes the habit and all of its logs. Idempotent: deleting an
    /// unknown id is not an error.
    pub fn delete_habit(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM habit_logs WHERE habit_id = ?1", params![id])?;
        Ok(())
    }

    /// Target vs. accumulated hours for one habit.
    ///
    /// A habit with zero logs still reports `total_hours = 0.0` (LEFT JOIN);
    /// a wholly unknown id is NotFound.
    pub fn habit_progress(&self, habit_id: i64) -> Result<HabitProgress> {
        let mut stmt = self.conn.prepare(
            "SELECT h.name, h.target_hours, COALESCE(SUM(hl.hours_spent), 0) AS total_hours
             FROM habits h
             LEFT JOIN habit_logs hl ON h.id = hl.habit_id
             WHERE h.id = ?1
             GROUP BY h.id",
        )?;
        let mut rows = stmt.query(params![habit_id])?;
        match rows.next()? {
            Some(row) => Ok(HabitProgress {
                name: row.get(0)?,
                target_hours: row.get(1)?,
                total_hours: row.get(2)?,
            }),
            None => Err(StoreError::NotFound(format!("Habit {habit_id} not found"))),
        }
    }

    // --- Habit logs ---

    /// No (habit_id, log_date) uniqueness and no FK check: multiple logs per
    /// habit per day are allowed, and a dangling habit_id is accepted.
    pub fn insert_log(&self, log: &NewHabitLog) -> Result<i64> {
        let date = log.log_date.format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT INTO habit_logs (habit_id, log_date, hours_spent, value, completed, completion_percentage, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.habit_id,
                date,
                log.hours_spent,
                log.value,
                log.completed,
                log.completion_percentage,
                log.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Logs for one day joined with the parent habit's type/target fields,
    /// most recently inserted first.
    pub fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<HabitLog>> {
        let date = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT hl.id, hl.habit_id, hl.log_date, hl.hours_spent, hl.value,
                    hl.completed, hl.completion_percentage, hl.notes,
                    h.name, h.habit_type, h.target_hours, h.target_value, h.target_type
             FROM habit_logs hl
             JOIN habits h ON hl.habit_id = h.id
             WHERE hl.log_date = ?1
             ORDER BY hl.id DESC",
        )?;
        let logs = stmt
            .query_map(params![date], Self::log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn update_log(&self, id: i64, update: &UpdateHabitLog) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habit_logs
             SET hours_spent = ?1, value = ?2, completed = ?3, completion_percentage = ?4, notes = ?5
             WHERE id = ?6",
            params![
                update.hours_spent,
                update.value,
                update.completed,
                update.completion_percentage,
                update.notes,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("Habit log {id} not found")));
        }
        Ok(())
    }

    pub fn delete_log(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM habit_logs WHERE id = ?1", params![id])?;
        Ok(())
    }

    // --- Categories ---

    pub fn insert_category(&self, name: &str, color: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO categories (name, color, created_at) VALUES (?1, ?2, ?3)",
                params![name, color, now],
            )
            .map_err(|e| Self::conflict_on_unique(e, "Category already exists"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, created_at FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], Self::category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn category_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM categories WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn update_category(&self, id: i64, name: &str, color: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }
        let changed = self
            .conn
            .execute(
                "UPDATE categories SET name = ?1, color = ?2 WHERE id = ?3",
                params![name, color, id],
            )
            .map_err(|e| Self::conflict_on_unique(e, "Category name already exists"))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("Category {id} not found")));
        }
        Ok(())
    }

    /// Guarded delete: refused while any time block references the category.
    /// On success the category's tasks are removed too; their own time-block
    /// references are deliberately not checked (preserved original cascade).
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM time_blocks WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Err(StoreError::Conflict(format!(
                "Cannot delete. {count} time blocks use this category."
            )));
        }
        self.conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM tasks WHERE category_id = ?1", params![id])?;
        Ok(())
    }

    // --- Tasks ---

    pub fn insert_task(&self, name: &str, category_id: Option<i64>) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO tasks (name, category_id, created_at) VALUES (?1, ?2, ?3)",
                params![name, category_id, now],
            )
            .map_err(|e| Self::conflict_on_unique(e, "Task already exists"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Tasks joined with their category's name/color. Unfiltered listing is
    /// grouped by category name; filtered listing is by task name.
    pub fn list_tasks(&self, category_id: Option<i64>) -> Result<Vec<Task>> {
        let tasks = if let Some(cat) = category_id {
            let mut stmt = self.conn.prepare(
                "SELECT t.id, t.name, t.category_id, t.created_at, c.name, c.color
                 FROM tasks t
                 LEFT JOIN categories c ON t.category_id = c.id
                 WHERE t.category_id = ?1
                 ORDER BY t.name",
            )?;
            stmt.query_map(params![cat], Self::task_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT t.id, t.name, t.category_id, t.created_at, c.name, c.color
                 FROM tasks t
                 LEFT JOIN categories c ON t.category_id = c.id
                 ORDER BY c.name, t.name",
            )?;
            stmt.query_map([], Self::task_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(tasks)
    }

    pub fn task_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM tasks WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn update_task(&self, id: i64, name: &str, category_id: Option<i64>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET name = ?1, category_id = ?2 WHERE id = ?3",
                params![name, category_id, id],
            )
            .map_err(|e| Self::conflict_on_unique(e, "Task name already exists"))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("Task {id} not found")));
        }
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM time_blocks WHERE task_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Err(StoreError::Conflict(format!(
                "Cannot delete. {count} time blocks use this task."
            )));
        }
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    // --- Time blocks ---

    pub fn insert_block(&self, block: &NewTimeBlock) -> Result<i64> {
        if block.activity.trim().is_empty() {
            return Err(StoreError::Validation("activity is required".to_string()));
        }
        let duration = duration_minutes(&block.start_time, &block.end_time)?;
        self.insert_block_with_duration(block, duration)
    }

    /// Insert with an explicit precomputed duration (import path).
    pub fn insert_block_with_duration(&self, block: &NewTimeBlock, duration: i64) -> Result<i64> {
        let date = block.block_date.format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT INTO time_blocks (block_date, start_time, end_time, activity, duration_minutes, category_id, task_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                date,
                block.start_time,
                block.end_time,
                block.activity,
                duration,
                block.category_id,
                block.task_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Blocks for one day joined with category/task names, ordered by start
    /// time, with the day's tracked-time totals.
    pub fn blocks_for_date(&self, date: NaiveDate) -> Result<DayBlocks> {
        let date = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT tb.id, tb.block_date, tb.start_time, tb.end_time, tb.activity,
                    tb.duration_minutes, tb.category_id, tb.task_id,
                    c.name, c.color, t.name
             FROM time_blocks tb
             LEFT JOIN categories c ON tb.category_id = c.id
             LEFT JOIN tasks t ON tb.task_id = t.id
             WHERE tb.block_date = ?1
             ORDER BY tb.start_time",
        )?;
        let blocks = stmt
            .query_map(params![date], Self::block_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let total_minutes: i64 = blocks.iter().map(|b| b.duration_minutes).sum();
        Ok(DayBlocks {
            blocks,
            total_minutes,
            total_hours: minutes_to_hours(total_minutes),
        })
    }

    /// Recomputes the duration from the new time pair.
    pub fn update_block(&self, id: i64, update: &UpdateTimeBlock) -> Result<()> {
        if update.activity.trim().is_empty() {
            return Err(StoreError::Validation("activity is required".to_string()));
        }
        let duration = duration_minutes(&update.start_time, &update.end_time)?;
        let changed = self.conn.execute(
            "UPDATE time_blocks
             SET start_time = ?1, end_time = ?2, activity = ?3, duration_minutes = ?4,
                 category_id = ?5, task_id = ?6
             WHERE id = ?7",
            params![
                update.start_time,
                update.end_time,
                update.activity,
                duration,
                update.category_id,
                update.task_id,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("Time block {id} not found")));
        }
        Ok(())
    }

    pub fn delete_block(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM time_blocks WHERE id = ?1", params![id])?;
        Ok(())
    }

    // --- Analytics ---
    //
    // Ranges are inclusive ISO date strings; SQLite's BETWEEN compares them
    // lexicographically, which is correct for YYYY-MM-DD.

    pub fn category_analytics(&self, start_date: &str, end_date: &str) -> Result<CategoryAnalytics> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.color,
                    COALESCE(SUM(tb.duration_minutes), 0) AS total_minutes,
                    COUNT(tb.id) AS block_count
             FROM categories c
             LEFT JOIN time_blocks tb ON c.id = tb.category_id
                 AND tb.block_date BETWEEN ?1 AND ?2
             GROUP BY c.id, c.name, c.color
             ORDER BY total_minutes DESC",
        )?;
        let mut categories = stmt
            .query_map(params![start_date, end_date], |row| {
                let total_minutes: i64 = row.get(3)?;
                Ok(CategoryStat {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    color: row.get(2)?,
                    total_minutes,
                    total_hours: minutes_to_hours(total_minutes),
                    block_count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Blocks with no category surface as a synthetic bucket, but only
        // when they actually contribute time.
        let (unc_minutes, unc_count): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_minutes), 0), COUNT(*)
             FROM time_blocks
             WHERE category_id IS NULL AND block_date BETWEEN ?1 AND ?2",
            params![start_date, end_date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if unc_minutes > 0 {
            categories.push(CategoryStat {
                id: None,
                name: "Uncategorized".to_string(),
                color: UNCATEGORIZED_COLOR.to_string(),
                total_minutes: unc_minutes,
                total_hours: minutes_to_hours(unc_minutes),
                block_count: unc_count,
            });
        }

        let total_minutes: i64 = categories.iter().map(|c| c.total_minutes).sum();
        Ok(CategoryAnalytics {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            categories,
            total_minutes,
            total_hours: minutes_to_hours(total_minutes),
        })
    }

    /// Unlike the category rollup, tasks that logged no time in the range
    /// are dropped from the result.
    pub fn task_analytics(
        &self,
        start_date: &str,
        end_date: &str,
        category_id: Option<i64>,
    ) -> Result<TaskAnalytics> {
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<TaskStat> {
            let total_minutes: i64 = row.get(4)?;
            Ok(TaskStat {
                id: row.get(0)?,
                name: row.get(1)?,
                category_name: row.get(2)?,
                color: row.get(3)?,
                total_minutes,
                total_hours: minutes_to_hours(total_minutes),
                block_count: row.get(5)?,
            })
        };

        let stats = if let Some(cat) = category_id {
            let mut stmt = self.conn.prepare(
                "SELECT t.id, t.name, c.name AS category_name, c.color,
                        COALESCE(SUM(tb.duration_minutes), 0) AS total_minutes,
                        COUNT(tb.id) AS block_count
                 FROM tasks t
                 LEFT JOIN categories c ON t.category_id = c.id
                 LEFT JOIN time_blocks tb ON t.id = tb.task_id
                     AND tb.block_date BETWEEN ?1 AND ?2
                 WHERE t.category_id = ?3
                 GROUP BY t.id, t.name, c.name, c.color
                 ORDER BY total_minutes DESC",
            )?;
            stmt.query_map(params![start_date, end_date, cat], map_row)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT t.id, t.name, c.name AS category_name, c.color,
                        COALESCE(SUM(tb.duration_minutes), 0) AS total_minutes,
                        COUNT(tb.id) AS block_count
                 FROM tasks t
                 LEFT JOIN categories c ON t.category_id = c.id
                 LEFT JOIN time_blocks tb ON t.id = tb.task_id
                     AND tb.block_date BETWEEN ?1 AND ?2
                 GROUP BY t.id, t.name, c.name, c.color
                 ORDER BY c.name, total_minutes DESC",
            )?;
            stmt.query_map(params![start_date, end_date], map_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        let tasks: Vec<TaskStat> = stats.into_iter().filter(|t| t.total_minutes > 0).collect();
        let total_minutes: i64 = tasks.iter().map(|t| t.total_minutes).sum();
        Ok(TaskAnalytics {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            tasks,
            total_minutes,
            total_hours: minutes_to_hours(total_minutes),
        })
    }

    pub fn habit_analytics(&self, start_date: &str, end_date: &str) -> Result<HabitAnalytics> {
        let mut stmt = self.conn.prepare(
            "SELECT h.id, h.name, h.habit_type, h.target_type, h.target_hours,
                    COUNT(hl.id) AS log_count,
                    COALESCE(SUM(CASE WHEN hl.completed = 1 THEN 1 ELSE 0 END), 0) AS completed_count,
                    AVG(CASE WHEN hl.completion_percentage IS NOT NULL THEN hl.completion_percentage
                             ELSE CASE WHEN hl.completed = 1 THEN 100 ELSE 0 END END) AS avg_completion,
                    SUM(COALESCE(hl.hours_spent, 0)) AS total_hours
             FROM habits h
             LEFT JOIN habit_logs hl ON h.id = hl.habit_id
                 AND hl.log_date BETWEEN ?1 AND ?2
             GROUP BY h.id, h.name, h.habit_type, h.target_type, h.target_hours
             ORDER BY h.name",
        )?;
        let habits = stmt
            .query_map(params![start_date, end_date], |row| {
                let log_count: i64 = row.get(5)?;
                let completed_count: i64 = row.get(6)?;
                let avg_completion: Option<f64> = row.get(7)?;
                let total_hours: Option<f64> = row.get(8)?;
                #[allow(clippy::cast_precision_loss)]
                let completion_rate = if log_count > 0 {
                    completed_count as f64 / log_count as f64 * 100.0
                } else {
                    0.0
                };
                Ok(HabitStat {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    habit_type: row.get(2)?,
                    target_type: row.get(3)?,
                    target_hours: row.get(4)?,
                    log_count,
                    completed_count,
                    avg_completion: round1(avg_completion.unwrap_or(0.0)),
                    total_hours: round2(total_hours.unwrap_or(0.0)),
                    completion_rate: round1(completion_rate),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HabitAnalytics {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            habits,
        })
    }

    // --- Export row queries ---

    pub fn habit_log_export_rows(&self) -> Result<Vec<HabitLogExportRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.name, h.habit_type, h.target_hours, hl.log_date,
                    hl.hours_spent, hl.completed, hl.notes
             FROM habit_logs hl
             JOIN habits h ON hl.habit_id = h.id
             ORDER BY hl.log_date DESC, h.name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HabitLogExportRow {
                    habit_name: row.get(0)?,
                    habit_type: row.get(1)?,
                    target_hours: row.get(2)?,
                    log_date: row.get(3)?,
                    hours_spent: row.get(4)?,
                    completed: row.get(5)?,
                    notes: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn time_block_export_rows(&self) -> Result<Vec<TimeBlockExportRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT tb.block_date, tb.start_time, tb.end_time, tb.activity,
                    tb.duration_minutes, c.name, t.name
             FROM time_blocks tb
             LEFT JOIN categories c ON tb.category_id = c.id
             LEFT JOIN tasks t ON tb.task_id = t.id
             ORDER BY tb.block_date DESC, tb.start_time",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TimeBlockExportRow {
                    block_date: row.get(0)?,
                    start_time: row.get(1)?,
                    end_time: row.get(2)?,
                    activity: row.get(3)?,
                    duration_minutes: row.get(4)?,
                    category: row.get(5)?,
                    task: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
