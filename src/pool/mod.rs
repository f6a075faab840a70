//! 连接池模块
//!
//! 按数据库目标选择池策略：保留标记`":memory:"`路由到进程级
//! 共享内存库（所有操作经受限队列串行化），其余目标按绝对路径
//! 构建文件型连接池（每个线程独享物理连接，无需受限转发）

mod executor;
mod file;
mod memory;
mod shared;
mod types;
mod worker;

pub use file::{FileConnection, FileCursor, FilePool};
pub use memory::{MemoryConnection, MemoryCursor};
pub use shared::SharedPool;
pub use types::{CursorData, ScalarFunction};

use std::path::Path;

use crate::config::SqliteConfig;
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::types::{DataValue, TextPolicy};
use crate::utils;

/// 选择共享内存库策略的保留目标标记
pub const MEMORY_TARGET: &str = ":memory:";

/// SQLite连接池 - 两种池策略的统一入口
#[derive(Debug)]
pub enum SqlitePool {
    /// 进程级共享内存库
    Memory(&'static SharedPool),
    /// 按线程的文件库连接池
    File(FilePool),
}

impl SqlitePool {
    /// 根据配置选择并构建池策略
    pub fn new(config: &SqliteConfig) -> LitePoolResult<Self> {
        if config.target == MEMORY_TARGET {
            Ok(SqlitePool::Memory(SharedPool::global()?))
        } else {
            let path = utils::absolutize_path(
                Path::new(&config.target),
                config.base_dir.as_deref(),
            )?;
            Ok(SqlitePool::File(FilePool::new(
                path,
                config.create_if_missing,
            )))
        }
    }

    /// 是否为共享内存库策略
    pub fn is_memory(&self) -> bool {
        matches!(self, SqlitePool::Memory(_))
    }

    /// 获取连接
    pub fn connect(&self) -> LitePoolResult<PooledConnection> {
        match self {
            SqlitePool::Memory(pool) => Ok(PooledConnection::Memory(pool.acquire())),
            SqlitePool::File(pool) => Ok(PooledConnection::File(pool.connect()?)),
        }
    }

    /// 释放连接，使其回到干净的可复用状态
    pub fn release(&self, conn: PooledConnection) -> LitePoolResult<()> {
        match (self, conn) {
            (SqlitePool::Memory(pool), PooledConnection::Memory(conn)) => pool.release(&conn),
            (SqlitePool::File(pool), PooledConnection::File(conn)) => pool.release(conn),
            _ => Err(identity_mismatch()),
        }
    }

    /// 销毁连接
    ///
    /// 文件库物理关闭且对当前线程终态；共享内存库只回滚不销毁
    pub fn drop_connection(&self, conn: PooledConnection) -> LitePoolResult<()> {
        match (self, conn) {
            (SqlitePool::Memory(pool), PooledConnection::Memory(conn)) => {
                pool.drop_connection(&conn)
            }
            (SqlitePool::File(pool), PooledConnection::File(conn)) => pool.drop_connection(conn),
            _ => Err(identity_mismatch()),
        }
    }

    /// 健康检查
    ///
    /// 内存库通过受限协议执行探测查询；文件库只做非侵入的
    /// 文件存在性检查，避免在检查线程上开出连接
    pub fn health_check(&self) -> LitePoolResult<bool> {
        match self {
            SqlitePool::Memory(pool) => {
                let conn = pool.acquire();
                let healthy = conn.execute("SELECT 1", &[]).is_ok();
                Ok(healthy)
            }
            SqlitePool::File(pool) => Ok(pool.path().exists()),
        }
    }
}

fn identity_mismatch() -> LitePoolError {
    LitePoolError::PoolError {
        message: i18n::t("error.release_identity"),
    }
}

/// 池化连接 - 两种连接类型的统一封装
///
/// 文件型变体基于`Rc`，不允许离开打开它的线程
#[derive(Debug)]
pub enum PooledConnection {
    /// 共享内存库代理
    Memory(MemoryConnection),
    /// 文件库连接
    File(FileConnection),
}

impl PooledConnection {
    /// 打开一个未绑定结果的游标
    pub fn cursor(&self) -> LitePoolResult<PooledCursor> {
        match self {
            PooledConnection::Memory(conn) => Ok(PooledCursor::Memory(conn.cursor()?)),
            PooledConnection::File(conn) => Ok(PooledCursor::File(conn.cursor())),
        }
    }

    /// 执行单条语句，返回承载结果的游标
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<PooledCursor> {
        match self {
            PooledConnection::Memory(conn) => Ok(PooledCursor::Memory(conn.execute(sql, params)?)),
            PooledConnection::File(conn) => Ok(PooledCursor::File(conn.execute(sql, params)?)),
        }
    }

    /// 对同一语句执行多组参数，返回累计影响行数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<u64> {
        match self {
            PooledConnection::Memory(conn) => conn.execute_many(sql, param_sets),
            PooledConnection::File(conn) => conn.execute_many(sql, param_sets),
        }
    }

    /// 执行SQL脚本
    pub fn execute_batch(&self, sql: &str) -> LitePoolResult<()> {
        match self {
            PooledConnection::Memory(conn) => conn.execute_batch(sql),
            PooledConnection::File(conn) => conn.execute_batch(sql),
        }
    }

    /// 提交当前事务
    pub fn commit(&self) -> LitePoolResult<()> {
        match self {
            PooledConnection::Memory(conn) => conn.commit(),
            PooledConnection::File(conn) => conn.commit(),
        }
    }

    /// 回滚当前事务
    pub fn rollback(&self) -> LitePoolResult<()> {
        match self {
            PooledConnection::Memory(conn) => conn.rollback(),
            PooledConnection::File(conn) => conn.rollback(),
        }
    }

    /// 注册标量自定义函数
    pub fn create_scalar_function(
        &self,
        name: &str,
        n_args: i32,
        func: ScalarFunction,
    ) -> LitePoolResult<()> {
        match self {
            PooledConnection::Memory(conn) => conn.create_scalar_function(name, n_args, func),
            PooledConnection::File(conn) => conn.create_scalar_function(name, n_args, func),
        }
    }

    /// 导出整库SQL转储
    pub fn dump(&self) -> LitePoolResult<Vec<String>> {
        match self {
            PooledConnection::Memory(conn) => conn.dump(),
            PooledConnection::File(conn) => conn.dump(),
        }
    }

    /// 累计变更行数
    pub fn total_changes(&self) -> LitePoolResult<u64> {
        match self {
            PooledConnection::Memory(conn) => conn.total_changes(),
            PooledConnection::File(conn) => conn.total_changes(),
        }
    }

    /// 是否处于自动提交状态
    pub fn is_autocommit(&self) -> LitePoolResult<bool> {
        match self {
            PooledConnection::Memory(conn) => conn.is_autocommit(),
            PooledConnection::File(conn) => Ok(conn.is_autocommit()),
        }
    }

    /// 最近插入行的rowid
    pub fn last_insert_rowid(&self) -> LitePoolResult<i64> {
        match self {
            PooledConnection::Memory(conn) => conn.last_insert_rowid(),
            PooledConnection::File(conn) => Ok(conn.last_insert_rowid()),
        }
    }

    /// 读取文本解码策略
    pub fn text_policy(&self) -> LitePoolResult<TextPolicy> {
        match self {
            PooledConnection::Memory(conn) => conn.text_policy(),
            PooledConnection::File(conn) => Ok(conn.text_policy()),
        }
    }

    /// 设置文本解码策略
    pub fn set_text_policy(&self, policy: TextPolicy) -> LitePoolResult<()> {
        match self {
            PooledConnection::Memory(conn) => conn.set_text_policy(policy),
            PooledConnection::File(conn) => {
                conn.set_text_policy(policy);
                Ok(())
            }
        }
    }

    /// 请求引擎中断当前正在执行的操作
    pub fn interrupt(&self) {
        match self {
            PooledConnection::Memory(conn) => conn.interrupt(),
            PooledConnection::File(conn) => conn.interrupt_handle().interrupt(),
        }
    }
}

/// 池化游标 - 两种游标类型的统一封装
#[derive(Debug)]
pub enum PooledCursor {
    /// 内存库游标代理
    Memory(MemoryCursor),
    /// 文件库游标
    File(FileCursor),
}

impl PooledCursor {
    /// 在该游标上执行语句
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<()> {
        match self {
            PooledCursor::Memory(cursor) => cursor.execute(sql, params),
            PooledCursor::File(cursor) => cursor.execute(sql, params),
        }
    }

    /// 在该游标上执行多组参数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<()> {
        match self {
            PooledCursor::Memory(cursor) => cursor.execute_many(sql, param_sets),
            PooledCursor::File(cursor) => cursor.execute_many(sql, param_sets),
        }
    }

    /// 取下一行
    pub fn fetch_one(&self) -> LitePoolResult<Option<Vec<DataValue>>> {
        match self {
            PooledCursor::Memory(cursor) => cursor.fetch_one(),
            PooledCursor::File(cursor) => Ok(cursor.fetch_one()),
        }
    }

    /// 取一批行
    pub fn fetch_many(&self, size: Option<usize>) -> LitePoolResult<Vec<Vec<DataValue>>> {
        match self {
            PooledCursor::Memory(cursor) => cursor.fetch_many(size),
            PooledCursor::File(cursor) => cursor.fetch_many(size),
        }
    }

    /// 取剩余所有行
    pub fn fetch_all(&self) -> LitePoolResult<Vec<Vec<DataValue>>> {
        match self {
            PooledCursor::Memory(cursor) => cursor.fetch_all(),
            PooledCursor::File(cursor) => Ok(cursor.fetch_all()),
        }
    }

    /// 关闭游标
    pub fn close(&self) -> LitePoolResult<()> {
        match self {
            PooledCursor::Memory(cursor) => cursor.close(),
            PooledCursor::File(_) => Ok(()),
        }
    }

    /// 影响行数；返回结果集的语句为-1
    pub fn rowcount(&self) -> LitePoolResult<i64> {
        match self {
            PooledCursor::Memory(cursor) => cursor.rowcount(),
            PooledCursor::File(cursor) => Ok(cursor.rowcount()),
        }
    }

    /// 最近插入行的rowid
    pub fn lastrowid(&self) -> LitePoolResult<Option<i64>> {
        match self {
            PooledCursor::Memory(cursor) => cursor.lastrowid(),
            PooledCursor::File(cursor) => Ok(cursor.lastrowid()),
        }
    }

    /// 结果列名，非查询语句为None
    pub fn description(&self) -> LitePoolResult<Option<Vec<String>>> {
        match self {
            PooledCursor::Memory(cursor) => cursor.description(),
            PooledCursor::File(cursor) => Ok(cursor.description()),
        }
    }

    /// 读取arraysize
    pub fn arraysize(&self) -> LitePoolResult<usize> {
        match self {
            PooledCursor::Memory(cursor) => cursor.arraysize(),
            PooledCursor::File(cursor) => Ok(cursor.arraysize()),
        }
    }

    /// 设置arraysize，必须为正整数
    pub fn set_arraysize(&self, size: usize) -> LitePoolResult<()> {
        match self {
            PooledCursor::Memory(cursor) => cursor.set_arraysize(size),
            PooledCursor::File(cursor) => cursor.set_arraysize(size),
        }
    }
}
