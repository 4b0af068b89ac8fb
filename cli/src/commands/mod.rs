mod analytics;
mod block;
mod habit;
mod helpers;
mod log;
mod registry;
mod transfer;

pub(crate) use analytics::{cmd_analytics_categories, cmd_analytics_habits, cmd_analytics_tasks};
pub(crate) use block::{cmd_block_add, cmd_block_delete, cmd_block_list, cmd_block_update};
pub(crate) use habit::{cmd_habit_add, cmd_habit_delete, cmd_habit_list, cmd_habit_progress};
pub(crate) use log::{cmd_log_add, cmd_log_delete, cmd_log_list, cmd_log_update};
pub(crate) use registry::{
    cmd_category_add, cmd_category_delete, cmd_category_list, cmd_category_update, cmd_task_add,
    cmd_task_delete, cmd_task_list, cmd_task_update,
};
pub(crate) use transfer::{
    cmd_export_habits, cmd_export_timeblocks, cmd_import_habits, cmd_import_timeblocks,
};
