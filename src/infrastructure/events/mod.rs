//! Events - 诊所房间事件广播

mod publisher;

pub use publisher::EventPublisher;
