//! 内存库代理句柄模块
//!
//! `MemoryConnection`与`MemoryCursor`是任意线程触达受限资源的唯一途径。
//! 每个方法都遵循同一套受限协议：构造操作请求与新的一次性结果槽，
//! 入队后在结果槽上阻塞，醒来时或者拿到返回值，或者把工作线程捕获的
//! 原始失败在当前线程重新抛出。会产生游标的调用把工作线程侧的游标
//! 标识重新包装成新的受限句柄

use rusqlite::InterruptHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::types::{
    reply_slot, ConnectionOperation, CursorId, CursorOperation, ScalarFunction, WorkerMessage,
};
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::types::{DataValue, TextPolicy};

/// 代理内部共享状态
struct MemoryConnectionInner {
    /// 受限队列发送端
    sender: Sender<WorkerMessage>,
    /// interrupt旁路句柄 - 不经过队列直达引擎
    interrupt: InterruptHandle,
}

/// 内存库连接代理
///
/// 克隆共享同一内部状态，所有克隆指向同一个受限连接
#[derive(Clone)]
pub struct MemoryConnection {
    inner: Arc<MemoryConnectionInner>,
}

impl MemoryConnection {
    pub(crate) fn new(sender: Sender<WorkerMessage>, interrupt: InterruptHandle) -> Self {
        Self {
            inner: Arc::new(MemoryConnectionInner { sender, interrupt }),
        }
    }

    /// 两个句柄是否指向同一个受限连接
    pub(crate) fn same_connection(&self, other: &MemoryConnection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 入队连接级操作
    fn enqueue(&self, op: ConnectionOperation) -> LitePoolResult<()> {
        self.inner
            .sender
            .send(WorkerMessage::Connection(op))
            .map_err(|_| LitePoolError::ConnectionError {
                message: i18n::t("error.worker_unavailable"),
            })
    }

    /// 打开一个未绑定结果的游标
    pub fn cursor(&self) -> LitePoolResult<MemoryCursor> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::OpenCursor { response })?;
        let id = wait_reply(receiver)?;
        Ok(MemoryCursor::new(self.inner.sender.clone(), id))
    }

    /// 执行单条语句，返回承载结果的游标句柄
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<MemoryCursor> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
            response,
        })?;
        let id = wait_reply(receiver)?;
        Ok(MemoryCursor::new(self.inner.sender.clone(), id))
    }

    /// 对同一语句执行多组参数，返回累计影响行数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<u64> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::ExecuteMany {
            sql: sql.to_string(),
            param_sets: param_sets.to_vec(),
            response,
        })?;
        wait_reply(receiver)
    }

    /// 执行SQL脚本
    pub fn execute_batch(&self, sql: &str) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::ExecuteBatch {
            sql: sql.to_string(),
            response,
        })?;
        wait_reply(receiver)
    }

    /// 提交当前事务
    pub fn commit(&self) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::Commit { response })?;
        wait_reply(receiver)
    }

    /// 回滚当前事务
    pub fn rollback(&self) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::Rollback { response })?;
        wait_reply(receiver)
    }

    /// 关闭底层连接
    pub fn close(&self) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::Close { response })?;
        wait_reply(receiver)
    }

    /// 注册标量自定义函数
    pub fn create_scalar_function(
        &self,
        name: &str,
        n_args: i32,
        func: ScalarFunction,
    ) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::CreateScalarFunction {
            name: name.to_string(),
            n_args,
            func,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 导出整库SQL转储
    pub fn dump(&self) -> LitePoolResult<Vec<String>> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::Dump { response })?;
        wait_reply(receiver)
    }

    /// 累计变更行数
    pub fn total_changes(&self) -> LitePoolResult<u64> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::TotalChanges { response })?;
        wait_reply(receiver)
    }

    /// 是否处于自动提交状态
    pub fn is_autocommit(&self) -> LitePoolResult<bool> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::IsAutocommit { response })?;
        wait_reply(receiver)
    }

    /// 最近插入行的rowid
    pub fn last_insert_rowid(&self) -> LitePoolResult<i64> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::LastInsertRowid { response })?;
        wait_reply(receiver)
    }

    /// 读取文本解码策略
    pub fn text_policy(&self) -> LitePoolResult<TextPolicy> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::GetTextPolicy { response })?;
        wait_reply(receiver)
    }

    /// 设置文本解码策略
    pub fn set_text_policy(&self, policy: TextPolicy) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(ConnectionOperation::SetTextPolicy { policy, response })?;
        wait_reply(receiver)
    }

    /// 请求引擎中断当前正在执行的操作
    ///
    /// 这是能力表中唯一的旁路：必须能从外部线程打断受限侧正在
    /// 执行的调用，所以直接触达引擎而不入队
    pub fn interrupt(&self) {
        self.inner.interrupt.interrupt();
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection").finish_non_exhaustive()
    }
}

/// 内存库游标代理
///
/// 由受限调用的结果重新包装而来，自身的每个操作同样走受限协议
pub struct MemoryCursor {
    sender: Sender<WorkerMessage>,
    id: CursorId,
    closed: AtomicBool,
}

impl MemoryCursor {
    pub(crate) fn new(sender: Sender<WorkerMessage>, id: CursorId) -> Self {
        Self {
            sender,
            id,
            closed: AtomicBool::new(false),
        }
    }

    /// 入队游标级操作
    fn enqueue(&self, op: CursorOperation) -> LitePoolResult<()> {
        self.sender
            .send(WorkerMessage::Cursor(op))
            .map_err(|_| LitePoolError::ConnectionError {
                message: i18n::t("error.worker_unavailable"),
            })
    }

    /// 在该游标上执行语句，结果替换游标内容
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::Execute {
            cursor: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
            response,
        })?;
        wait_reply(receiver)
    }

    /// 在该游标上执行多组参数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::ExecuteMany {
            cursor: self.id,
            sql: sql.to_string(),
            param_sets: param_sets.to_vec(),
            response,
        })?;
        wait_reply(receiver)
    }

    /// 取下一行，结果耗尽后返回None
    pub fn fetch_one(&self) -> LitePoolResult<Option<Vec<DataValue>>> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::FetchOne {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 取一批行，`size`缺省时使用arraysize
    pub fn fetch_many(&self, size: Option<usize>) -> LitePoolResult<Vec<Vec<DataValue>>> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::FetchMany {
            cursor: self.id,
            size,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 取剩余所有行
    pub fn fetch_all(&self) -> LitePoolResult<Vec<Vec<DataValue>>> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::FetchAll {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 关闭游标
    pub fn close(&self) -> LitePoolResult<()> {
        self.closed.store(true, Ordering::Relaxed);
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::Close {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 影响行数；返回结果集的语句为-1
    pub fn rowcount(&self) -> LitePoolResult<i64> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::RowCount {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 最近插入行的rowid
    pub fn lastrowid(&self) -> LitePoolResult<Option<i64>> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::LastRowid {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 结果列名，非查询语句为None
    pub fn description(&self) -> LitePoolResult<Option<Vec<String>>> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::Description {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 读取arraysize
    pub fn arraysize(&self) -> LitePoolResult<usize> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::GetArraySize {
            cursor: self.id,
            response,
        })?;
        wait_reply(receiver)
    }

    /// 设置arraysize，必须为正整数
    pub fn set_arraysize(&self, size: usize) -> LitePoolResult<()> {
        let (response, receiver) = reply_slot();
        self.enqueue(CursorOperation::SetArraySize {
            cursor: self.id,
            size,
            response,
        })?;
        wait_reply(receiver)
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        // 句柄丢弃时尽力通知工作线程回收游标状态，不等待回执
        if !self.closed.load(Ordering::Relaxed) {
            let (response, _receiver) = reply_slot();
            let _ = self.sender.send(WorkerMessage::Cursor(CursorOperation::Close {
                cursor: self.id,
                response,
            }));
        }
    }
}

impl std::fmt::Debug for MemoryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCursor").field("id", &self.id).finish()
    }
}

/// 在一次性结果槽上阻塞等待工作线程的响应
///
/// 通道断开意味着工作线程在响应前退出；正常情况下拿到的是
/// 工作线程写入的成功值或原始失败
fn wait_reply<T>(receiver: crossbeam_channel::Receiver<LitePoolResult<T>>) -> LitePoolResult<T> {
    receiver.recv().map_err(|_| LitePoolError::ConnectionError {
        message: i18n::t("error.reply_lost"),
    })?
}
