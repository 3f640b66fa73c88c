//! 可观测性：tracing 初始化
//!
//! 环境变量 `RUST_LOG` 控制过滤，未设置时默认 info。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}
