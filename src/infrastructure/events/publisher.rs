//! Event Publisher Implementation
//!
//! 每个诊所一个广播房间，WebSocket 连接订阅所属诊所的房间

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::ports::{ClinicEvent, ClinicNotifierPort};

/// 每个房间的缓冲容量，慢订阅者超出后会收到 Lagged
const ROOM_CAPACITY: usize = 100;

/// 事件发布器
pub struct EventPublisher {
    /// clinic_id -> broadcast sender
    rooms: DashMap<Uuid, broadcast::Sender<ClinicEvent>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅诊所房间，房间不存在时创建
    pub fn subscribe_clinic(&self, clinic_id: Uuid) -> broadcast::Receiver<ClinicEvent> {
        self.rooms
            .entry(clinic_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// 当前房间数
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// 删除没有订阅者的房间，返回删除数量
    pub fn prune_empty_rooms(&self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - self.rooms.len()
    }
}

impl ClinicNotifierPort for EventPublisher {
    fn publish(&self, clinic_id: Uuid, event: ClinicEvent) {
        let name = event.name();
        let Some(sender) = self.rooms.get(&clinic_id) else {
            tracing::debug!(clinic_id = %clinic_id, event = name, "No room for clinic, event dropped");
            return;
        };

        if let Err(e) = sender.send(event) {
            tracing::debug!(
                clinic_id = %clinic_id,
                event = name,
                error = %e,
                "Failed to publish event (no receivers)"
            );
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::LowStockNotice;

    fn low_stock() -> ClinicEvent {
        ClinicEvent::LowStock(LowStockNotice {
            product_id: Uuid::new_v4(),
            name: "Gauze".to_string(),
            stock_quantity: 1,
            min_stock: 5,
        })
    }

    #[tokio::test]
    async fn test_events_stay_in_their_room() {
        let publisher = EventPublisher::new();
        let clinic_a = Uuid::new_v4();
        let clinic_b = Uuid::new_v4();
        let mut rx_a = publisher.subscribe_clinic(clinic_a);
        let mut rx_b = publisher.subscribe_clinic(clinic_b);

        publisher.publish(clinic_a, low_stock());

        assert_eq!(rx_a.recv().await.unwrap().name(), "low_stock");
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish(Uuid::new_v4(), low_stock());
        assert_eq!(publisher.room_count(), 0);
    }

    #[test]
    fn test_prune_empty_rooms() {
        let publisher = EventPublisher::new();
        let kept = publisher.subscribe_clinic(Uuid::new_v4());
        drop(publisher.subscribe_clinic(Uuid::new_v4()));

        assert_eq!(publisher.prune_empty_rooms(), 1);
        assert_eq!(publisher.room_count(), 1);
        drop(kept);
        assert_eq!(publisher.prune_empty_rooms(), 1);
    }
}
