//! rat_litepool - 嵌入式SQLite连接管理库
//!
//! 文件库按调用线程独占物理连接；内存库整个进程只有一个连接，
//! 由专属工作线程独占，所有线程的操作经受限队列串行化后同步返回

// 导出所有公共模块
pub mod error;
pub mod types;
pub mod utils;
pub mod config;
pub mod pool;
pub mod manager;
pub mod i18n;

// 重新导出常用类型和函数
pub use error::{LitePoolError, LitePoolResult};
pub use types::{DataValue, TextPolicy};
pub use config::{SqliteConfig, SqliteConfigBuilder, sqlite_config, memory_config};
pub use pool::{
    SqlitePool, SharedPool, FilePool, PooledConnection, PooledCursor,
    MemoryConnection, MemoryCursor, FileConnection, FileCursor,
    CursorData, ScalarFunction, MEMORY_TARGET,
};
pub use manager::{
    PoolRegistry, add_database, get_pool, get_connection, set_default_alias,
    get_aliases, remove_database, health_check,
};

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_litepool库
///
/// 这个函数会初始化多语言错误消息系统
///
/// 注意：日志系统由调用者自行初始化，本库不再自动初始化日志
pub fn init() {
    // 初始化多语言错误消息系统
    i18n::ErrorMessageI18n::init();
}

/// 获取库版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
