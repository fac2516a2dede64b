//! HTTP Handlers
//!
//! 每个资源一个文件，请求/响应 DTO 与处理函数放在一起

mod appointment;
mod auth;
mod clinic;
mod dashboard;
mod invoice;
mod medical_record;
mod patient;
mod ping;
mod product;
mod websocket;

pub use appointment::*;
pub use auth::*;
pub use clinic::*;
pub use dashboard::*;
pub use invoice::*;
pub use medical_record::*;
pub use patient::*;
pub use ping::*;
pub use product::*;
pub use websocket::*;
