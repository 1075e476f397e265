use crate::error::{GanttError, Result};
use crate::model::Schedule;
use std::path::Path;

/// Save a schedule to a JSON file.
pub fn save_schedule(schedule: &Schedule, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(schedule)?;
    std::fs::write(path, json).map_err(|e| GanttError::io(path, e))
}

/// Load a schedule from a JSON file.
pub fn load_schedule(path: &Path) -> Result<Schedule> {
    let json = std::fs::read_to_string(path).map_err(|e| GanttError::io(path, e))?;
    Ok(serde_json::from_str(&json)?)
}
