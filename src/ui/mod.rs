pub mod dialogs;
pub mod gantt_chart;
pub mod search_bar;
pub mod theme;
pub mod toolbar;
