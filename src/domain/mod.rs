pub mod calendar;
pub mod models;
pub mod time_range;
