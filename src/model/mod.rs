pub mod event;
pub mod reschedule;
pub mod scale_manager;
pub mod schedule;
pub mod search;
pub mod selection;
pub mod ticks;
pub mod timeline;

pub use event::{Event, EventId, Lane, PatchSet, TimePatch};
pub use reschedule::{DragTarget, Handle, RescheduleEvent};
pub use scale_manager::ScaleManager;
pub use schedule::Schedule;
pub use search::SearchQuery;
pub use selection::EventSelection;
