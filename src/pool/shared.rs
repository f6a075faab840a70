//! 共享内存库连接池模块
//!
//! 整个进程只存在一个内存库连接，由专属工作线程独占；
//! 所有线程通过同一个代理句柄共享它

use once_cell::sync::OnceCell;
use rat_logger::{debug, info};

use crossbeam_channel::Sender;

use super::memory::MemoryConnection;
use super::types::WorkerMessage;
use super::worker::MemoryWorker;
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;

/// 进程级共享池实例
///
/// 构造严格发生在一次性初始化原语内部：并发的首次获取只会
/// 构造一个工作线程和一个连接，构造失败可以重试
static SHARED_POOL: OnceCell<SharedPool> = OnceCell::new();

/// 共享内存库连接池
pub struct SharedPool {
    /// 唯一的代理句柄
    connection: MemoryConnection,
    /// 队列发送端副本，teardown时投递关闭哨兵
    sender: Sender<WorkerMessage>,
}

impl SharedPool {
    /// 获取进程级共享池，首次调用时构造
    pub fn global() -> LitePoolResult<&'static SharedPool> {
        SHARED_POOL.get_or_try_init(SharedPool::new)
    }

    /// 构造共享池：启动工作线程并建立唯一代理
    pub(crate) fn new() -> LitePoolResult<Self> {
        info!("创建共享内存库连接池");
        let (sender, interrupt) = MemoryWorker::spawn()?;
        let connection = MemoryConnection::new(sender.clone(), interrupt);
        Ok(Self { connection, sender })
    }

    /// 获取共享连接
    ///
    /// 幂等：任何线程、任何次数的调用返回的都是同一个代理实例
    pub fn acquire(&self) -> MemoryConnection {
        self.connection.clone()
    }

    /// 释放共享连接
    ///
    /// 校验身份后通过受限协议回滚，把资源恢复到干净的事务状态，
    /// 但不销毁它
    pub fn release(&self, conn: &MemoryConnection) -> LitePoolResult<()> {
        self.check_identity(conn)?;
        conn.rollback()
    }

    /// 丢弃共享连接
    ///
    /// 共享资源在进程内绝不中途拆除，丢弃同样只做回滚
    pub fn drop_connection(&self, conn: &MemoryConnection) -> LitePoolResult<()> {
        self.check_identity(conn)?;
        conn.rollback()
    }

    fn check_identity(&self, conn: &MemoryConnection) -> LitePoolResult<()> {
        if self.connection.same_connection(conn) {
            Ok(())
        } else {
            Err(LitePoolError::PoolError {
                message: i18n::t("error.release_identity"),
            })
        }
    }
}

impl Drop for SharedPool {
    fn drop(&mut self) {
        // 资源存在即关闭：投递关闭哨兵，工作线程退出循环，
        // 连接随所有权释放而关闭
        debug!("共享内存库连接池teardown");
        let _ = self.sender.send(WorkerMessage::Shutdown);
    }
}

impl std::fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool").finish_non_exhaustive()
    }
}
