//! 连接池类型定义模块
//!
//! 受限资源的能力表以操作枚举的形式在编译期固定：
//! 只有在此声明的操作才能跨线程转发，不存在动态透传

use std::collections::VecDeque;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::LitePoolResult;
use crate::types::{DataValue, TextPolicy};

/// 游标标识 - 工作线程侧游标注册表中的键
pub(crate) type CursorId = u64;

/// 一次性结果槽的写端，随操作请求进入队列
///
/// 容量为1的通道即单次赋值单元：工作线程恰好写入一次，
/// 调用线程在读端阻塞，通道纪律保证写在读前发生
pub(crate) type ReplySlot<T> = Sender<LitePoolResult<T>>;

/// 创建一对一次性结果槽
pub(crate) fn reply_slot<T>() -> (ReplySlot<T>, Receiver<LitePoolResult<T>>) {
    bounded(1)
}

/// 跨线程转发的标量自定义函数
pub type ScalarFunction =
    Box<dyn FnMut(&[DataValue]) -> LitePoolResult<DataValue> + Send + 'static>;

/// 连接级操作请求
pub(crate) enum ConnectionOperation {
    /// 打开一个未绑定结果的游标
    OpenCursor {
        response: ReplySlot<CursorId>,
    },
    /// 执行单条语句，返回承载结果的游标
    Execute {
        sql: String,
        params: Vec<DataValue>,
        response: ReplySlot<CursorId>,
    },
    /// 对同一语句执行多组参数，返回累计影响行数
    ExecuteMany {
        sql: String,
        param_sets: Vec<Vec<DataValue>>,
        response: ReplySlot<u64>,
    },
    /// 执行SQL脚本（多条语句）
    ExecuteBatch {
        sql: String,
        response: ReplySlot<()>,
    },
    /// 提交当前事务
    Commit {
        response: ReplySlot<()>,
    },
    /// 回滚当前事务
    Rollback {
        response: ReplySlot<()>,
    },
    /// 关闭底层连接（此后所有操作失败）
    Close {
        response: ReplySlot<()>,
    },
    /// 注册标量自定义函数
    CreateScalarFunction {
        name: String,
        n_args: i32,
        func: ScalarFunction,
        response: ReplySlot<()>,
    },
    /// 导出整库SQL转储
    Dump {
        response: ReplySlot<Vec<String>>,
    },
    /// 属性读取：累计变更行数
    TotalChanges {
        response: ReplySlot<u64>,
    },
    /// 属性读取：是否处于自动提交状态
    IsAutocommit {
        response: ReplySlot<bool>,
    },
    /// 属性读取：最近插入行的rowid
    LastInsertRowid {
        response: ReplySlot<i64>,
    },
    /// 属性读取：文本解码策略
    GetTextPolicy {
        response: ReplySlot<TextPolicy>,
    },
    /// 属性写入：文本解码策略
    SetTextPolicy {
        policy: TextPolicy,
        response: ReplySlot<()>,
    },
}

/// 游标级操作请求
pub(crate) enum CursorOperation {
    /// 在既有游标上执行语句，结果替换游标内容
    Execute {
        cursor: CursorId,
        sql: String,
        params: Vec<DataValue>,
        response: ReplySlot<()>,
    },
    /// 在既有游标上执行多组参数
    ExecuteMany {
        cursor: CursorId,
        sql: String,
        param_sets: Vec<Vec<DataValue>>,
        response: ReplySlot<()>,
    },
    /// 取下一行
    FetchOne {
        cursor: CursorId,
        response: ReplySlot<Option<Vec<DataValue>>>,
    },
    /// 取一批行，`size`缺省时使用游标的arraysize
    FetchMany {
        cursor: CursorId,
        size: Option<usize>,
        response: ReplySlot<Vec<Vec<DataValue>>>,
    },
    /// 取剩余所有行
    FetchAll {
        cursor: CursorId,
        response: ReplySlot<Vec<Vec<DataValue>>>,
    },
    /// 关闭游标并从注册表移除
    Close {
        cursor: CursorId,
        response: ReplySlot<()>,
    },
    /// 属性读取：影响行数（返回结果集的语句为-1）
    RowCount {
        cursor: CursorId,
        response: ReplySlot<i64>,
    },
    /// 属性读取：最近插入行的rowid
    LastRowid {
        cursor: CursorId,
        response: ReplySlot<Option<i64>>,
    },
    /// 属性读取：结果列名
    Description {
        cursor: CursorId,
        response: ReplySlot<Option<Vec<String>>>,
    },
    /// 属性读取：arraysize
    GetArraySize {
        cursor: CursorId,
        response: ReplySlot<usize>,
    },
    /// 属性写入：arraysize（必须为正整数）
    SetArraySize {
        cursor: CursorId,
        size: usize,
        response: ReplySlot<()>,
    },
}

/// 受限队列中的消息
pub(crate) enum WorkerMessage {
    /// 连接级操作
    Connection(ConnectionOperation),
    /// 游标级操作
    Cursor(CursorOperation),
    /// 关闭哨兵 - 工作线程收到后退出循环，连接随之关闭
    Shutdown,
}

/// 一次语句执行物化出的游标内容
///
/// 行在执行时整体缓冲；fetch粒度（one/many/all与arraysize）在句柄层保留
#[derive(Debug, Clone)]
pub struct CursorData {
    /// 结果列名，非查询语句为None
    pub columns: Option<Vec<String>>,
    /// 缓冲的结果行
    pub rows: VecDeque<Vec<DataValue>>,
    /// 影响行数；返回结果集的语句按DBAPI惯例为-1
    pub rowcount: i64,
    /// 最近插入行的rowid，仅DML后有值
    pub lastrowid: Option<i64>,
    /// fetch_many的默认批大小
    pub arraysize: usize,
}

impl CursorData {
    /// 未绑定结果的空游标内容
    pub(crate) fn empty() -> Self {
        Self {
            columns: None,
            rows: VecDeque::new(),
            rowcount: -1,
            lastrowid: None,
            arraysize: 1,
        }
    }
}
