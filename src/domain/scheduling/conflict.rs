//! 兽医排班冲突检测

use uuid::Uuid;

use super::{AppointmentStatus, TimeSlot};

/// 已占用的时间段
#[derive(Debug, Clone)]
pub struct BookedSlot {
    pub appointment_id: Uuid,
    pub slot: TimeSlot,
    pub status: AppointmentStatus,
}

/// 找出与候选时间段冲突的预约
///
/// 取消或爽约的预约不占用时间；`exclude` 用于改期时排除自身
pub fn find_conflicts(candidate: &TimeSlot, booked: &[BookedSlot], exclude: Option<Uuid>) -> Vec<Uuid> {
    booked
        .iter()
        .filter(|b| Some(b.appointment_id) != exclude)
        .filter(|b| b.status.occupies_schedule())
        .filter(|b| b.slot.overlaps(candidate))
        .map(|b| b.appointment_id)
        .collect()
}
