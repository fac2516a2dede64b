//! Scheduling Context - Value Objects

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::domain::macros::string_enum;
use crate::domain::DomainError;

string_enum! {
    /// 预约状态
    #[derive(Default)]
    pub enum AppointmentStatus: "status" {
        #[default]
        Scheduled => "SCHEDULED",
        Confirmed => "CONFIRMED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        NoShow => "NO_SHOW",
    }
}

impl AppointmentStatus {
    /// 终态不可再修改
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// 是否占用兽医的时间
    pub fn occupies_schedule(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        matches!(
            (self, next),
            (Scheduled, Confirmed)
                | (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

const MINUTES_PER_DAY: u32 = 24 * 60;

/// 预约时间段
///
/// 不变量:
/// - 时长在 [MIN_DURATION, MAX_DURATION] 内
/// - 结束时间不跨天
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: u32,
}

impl TimeSlot {
    pub const MIN_DURATION: u32 = 5;
    pub const MAX_DURATION: u32 = 480;

    pub fn new(date: NaiveDate, start: NaiveTime, duration_minutes: u32) -> Result<Self, DomainError> {
        if !(Self::MIN_DURATION..=Self::MAX_DURATION).contains(&duration_minutes) {
            return Err(DomainError::invalid(
                "duration_minutes",
                format!(
                    "must be between {} and {} minutes",
                    Self::MIN_DURATION,
                    Self::MAX_DURATION
                ),
            ));
        }

        let start = start.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(start);
        let slot = Self {
            date,
            start,
            duration_minutes,
        };
        if slot.end_minute() > MINUTES_PER_DAY {
            return Err(DomainError::invalid(
                "duration_minutes",
                "appointment must end on the same day",
            ));
        }
        Ok(slot)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// 距当天零点的分钟数
    pub fn start_minute(&self) -> u32 {
        self.start.hour() * 60 + self.start.minute()
    }

    pub fn end_minute(&self) -> u32 {
        self.start_minute() + self.duration_minutes
    }

    /// 两个区间冲突当且仅当 start_A < end_B && start_B < end_A
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.date == other.date
            && self.start_minute() < other.end_minute()
            && other.start_minute() < self.end_minute()
    }
}

/// 解析 "HH:MM" 格式
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| DomainError::invalid("start_time", "must be in HH:MM format"))
}

pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
