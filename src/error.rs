//! 错误类型定义模块
//!
//! 受限资源上执行失败时，SQLite原生错误会被完整搬运回调用线程，
//! 调用方看到的错误种类与消息和直接调用完全一致

use thiserror::Error;

/// rat_litepool 统一结果类型
pub type LitePoolResult<T> = Result<T, LitePoolError>;

/// rat_litepool 错误类型
#[derive(Error, Debug)]
pub enum LitePoolError {
    /// 文件型数据库不存在且未启用自动创建
    #[error("数据库文件不存在: {path}")]
    FileNotFound {
        /// 解析后的绝对路径
        path: String,
    },

    /// SQLite原生错误 - 原样透传，保留错误种类与消息
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// 调用参数不符合简单属性约定
    #[error("{message}")]
    UnexpectedArgument {
        /// 错误描述
        message: String,
    },

    /// 回滚失败 - 连接已被关闭清除后上抛
    #[error("回滚失败: {source}")]
    RollbackFailed {
        /// 回滚时引擎返回的原始错误
        #[source]
        source: rusqlite::Error,
    },

    /// 连接错误
    #[error("{message}")]
    ConnectionError {
        /// 错误描述
        message: String,
    },

    /// 连接池错误
    #[error("{message}")]
    PoolError {
        /// 错误描述
        message: String,
    },

    /// 配置错误
    #[error("{message}")]
    ConfigError {
        /// 错误描述
        message: String,
    },
}
