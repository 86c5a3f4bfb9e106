//! Handlers 模块

pub mod activity;
pub mod entries;
pub mod metrics;
pub mod services;

pub use activity::*;
pub use entries::*;
pub use metrics::*;
pub use services::*;
