//! Scheduling Context - 预约排班
//!
//! 职责:
//! - 预约状态机
//! - 时间段与当天区间冲突检测

mod conflict;
mod value_objects;

pub use conflict::{find_conflicts, BookedSlot};
pub use value_objects::{format_time_of_day, parse_time_of_day, AppointmentStatus, TimeSlot};
