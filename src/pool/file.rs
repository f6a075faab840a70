//! 文件型连接池模块
//!
//! 每个调用线程对同一个文件库持有自己独立的物理连接，
//! 连接状态存放在线程本地存储里，线程之间互不可见，
//! 因此不需要任何跨线程同步。连接句柄基于`Rc`实现，
//! 类型系统天然阻止它被移交给其他线程

use rat_logger::{debug, info, warn};
use rusqlite::{Connection, InterruptHandle};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::executor;
use super::types::{CursorData, ScalarFunction};
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::types::{DataValue, TextPolicy};

/// 连接池实例标识分配器
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// 按(池标识)索引的线程本地连接槽
    static THREAD_SLOTS: RefCell<HashMap<u64, ThreadSlot>> = RefCell::new(HashMap::new());
}

/// 单个线程上一个池的连接状态
enum ThreadSlot {
    /// 已连接（release之后仍保持连接）
    Connected(FileConnection),
    /// 已销毁 - 终态，该线程上重新构建连接池之前无法再连接
    Dropped,
}

/// 文件型连接池
///
/// 池本身可以在线程间自由共享；每个线程首次`connect`时
/// 才会真正打开属于自己的物理连接
#[derive(Debug)]
pub struct FilePool {
    id: u64,
    path: PathBuf,
    create_if_missing: bool,
}

/// 连接内部状态
struct FileConnectionInner {
    conn: Connection,
    text_policy: Cell<TextPolicy>,
}

/// 文件型连接句柄
///
/// `Deref`到原生连接：文件库不需要受限转发，调用线程直接
/// 使用引擎接口。`!Send`保证句柄无法离开打开它的线程
#[derive(Clone)]
pub struct FileConnection {
    inner: Rc<FileConnectionInner>,
}

impl FilePool {
    /// 创建文件型连接池，`path`必须已经是解析后的绝对路径
    pub(crate) fn new(path: PathBuf, create_if_missing: bool) -> Self {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        info!("创建文件型连接池: 路径={}", path.display());
        Self {
            id,
            path,
            create_if_missing,
        }
    }

    /// 数据库文件路径
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// 获取当前线程的连接，必要时惰性建立
    pub fn connect(&self) -> LitePoolResult<FileConnection> {
        // 线程本地借用在打开新连接之前结束，open不持有任何锁
        let existing = THREAD_SLOTS.with(|slots| {
            match slots.borrow().get(&self.id) {
                Some(ThreadSlot::Connected(conn)) => Some(Ok(conn.clone())),
                Some(ThreadSlot::Dropped) => Some(Err(LitePoolError::PoolError {
                    message: i18n::t("error.pool_dropped"),
                })),
                None => None,
            }
        });
        if let Some(result) = existing {
            return result;
        }

        let conn = self.open_connection()?;
        THREAD_SLOTS.with(|slots| {
            slots
                .borrow_mut()
                .insert(self.id, ThreadSlot::Connected(conn.clone()));
        });
        Ok(conn)
    }

    /// 打开物理连接并完成会话初始化
    fn open_connection(&self) -> LitePoolResult<FileConnection> {
        let file_exists = self.path.exists();

        if !file_exists && !self.create_if_missing {
            warn!("数据库文件不存在且未启用自动创建: {}", self.path.display());
            return Err(LitePoolError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }

        if self.create_if_missing && !file_exists {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LitePoolError::ConnectionError {
                    message: i18n::tf("error.dir_create", &[("message", &e.to_string())]),
                })?;
            }
        }

        let conn = Connection::open(&self.path)?;
        executor::init_connection(&conn)?;
        info!("打开文件库连接: 路径={}", self.path.display());

        Ok(FileConnection {
            inner: Rc::new(FileConnectionInner {
                conn,
                text_policy: Cell::new(TextPolicy::Lossy),
            }),
        })
    }

    /// 释放连接：回滚后连接保持可复用的干净状态
    ///
    /// 回滚失败时连接被视为损坏：关闭并清除后把失败上抛
    pub fn release(&self, conn: FileConnection) -> LitePoolResult<()> {
        self.check_identity(&conn)?;
        debug!("释放文件库连接: 路径={}", self.path.display());

        match conn.rollback() {
            Ok(()) => Ok(()),
            Err(LitePoolError::Sqlite(source)) => {
                self.mark_dropped();
                close_physical(conn);
                Err(LitePoolError::RollbackFailed { source })
            }
            Err(other) => Err(other),
        }
    }

    /// 销毁连接：清除存储的引用并物理关闭
    ///
    /// 对该线程上的这个池是终态操作
    pub fn drop_connection(&self, conn: FileConnection) -> LitePoolResult<()> {
        self.check_identity(&conn)?;
        info!("销毁文件库连接: 路径={}", self.path.display());

        self.mark_dropped();
        close_physical(conn);
        Ok(())
    }

    /// 校验句柄是该线程存储的那一个连接
    fn check_identity(&self, conn: &FileConnection) -> LitePoolResult<()> {
        THREAD_SLOTS.with(|slots| match slots.borrow().get(&self.id) {
            Some(ThreadSlot::Connected(stored)) if Rc::ptr_eq(&stored.inner, &conn.inner) => Ok(()),
            _ => Err(LitePoolError::PoolError {
                message: i18n::t("error.release_identity"),
            }),
        })
    }

    /// 把该线程的槽置为终态并丢弃存储的句柄
    fn mark_dropped(&self) {
        THREAD_SLOTS.with(|slots| {
            slots.borrow_mut().insert(self.id, ThreadSlot::Dropped);
        });
    }
}

/// 物理关闭连接
///
/// 存储的克隆已被清除，正常情况下这是最后一个句柄；
/// 若调用方还留有别的克隆，关闭推迟到最后一个句柄释放
fn close_physical(conn: FileConnection) {
    if let Ok(inner) = Rc::try_unwrap(conn.inner) {
        if let Err((_, e)) = inner.conn.close() {
            warn!("文件库连接关闭失败: {}", e);
        }
    }
}

impl FileConnection {
    /// 打开一个未绑定结果的游标
    pub fn cursor(&self) -> FileCursor {
        FileCursor {
            inner: self.inner.clone(),
            data: RefCell::new(CursorData::empty()),
        }
    }

    /// 执行单条语句，返回承载结果的游标
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<FileCursor> {
        let data = executor::run_statement(
            &self.inner.conn,
            sql,
            params,
            self.inner.text_policy.get(),
        )?;
        Ok(FileCursor {
            inner: self.inner.clone(),
            data: RefCell::new(data),
        })
    }

    /// 对同一语句执行多组参数，返回累计影响行数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<u64> {
        executor::run_statement_many(&self.inner.conn, sql, param_sets)
    }

    /// 执行SQL脚本
    pub fn execute_batch(&self, sql: &str) -> LitePoolResult<()> {
        executor::run_batch(&self.inner.conn, sql)
    }

    /// 提交当前事务
    pub fn commit(&self) -> LitePoolResult<()> {
        executor::commit_if_open(&self.inner.conn)
    }

    /// 回滚当前事务
    pub fn rollback(&self) -> LitePoolResult<()> {
        executor::rollback_if_open(&self.inner.conn)
    }

    /// 注册标量自定义函数
    pub fn create_scalar_function(
        &self,
        name: &str,
        n_args: i32,
        func: ScalarFunction,
    ) -> LitePoolResult<()> {
        executor::install_scalar_function(
            &self.inner.conn,
            name,
            n_args,
            func,
            self.inner.text_policy.get(),
        )
    }

    /// 导出整库SQL转储
    pub fn dump(&self) -> LitePoolResult<Vec<String>> {
        executor::dump_sql(&self.inner.conn)
    }

    /// 累计变更行数
    pub fn total_changes(&self) -> LitePoolResult<u64> {
        executor::total_changes(&self.inner.conn)
    }

    /// 是否处于自动提交状态
    pub fn is_autocommit(&self) -> bool {
        self.inner.conn.is_autocommit()
    }

    /// 最近插入行的rowid
    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.conn.last_insert_rowid()
    }

    /// 读取文本解码策略
    pub fn text_policy(&self) -> TextPolicy {
        self.inner.text_policy.get()
    }

    /// 设置文本解码策略
    pub fn set_text_policy(&self, policy: TextPolicy) {
        self.inner.text_policy.set(policy);
    }

    /// 获取可跨线程使用的interrupt句柄
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.inner.conn.get_interrupt_handle()
    }
}

impl Deref for FileConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.inner.conn
    }
}

impl std::fmt::Debug for FileConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConnection").finish_non_exhaustive()
    }
}

/// 文件型游标
///
/// 结果在执行时物化到本地，fetch操作直接在调用线程完成
pub struct FileCursor {
    inner: Rc<FileConnectionInner>,
    data: RefCell<CursorData>,
}

impl FileCursor {
    /// 在该游标上执行语句，结果替换游标内容
    pub fn execute(&self, sql: &str, params: &[DataValue]) -> LitePoolResult<()> {
        let mut data = executor::run_statement(
            &self.inner.conn,
            sql,
            params,
            self.inner.text_policy.get(),
        )?;
        let mut current = self.data.borrow_mut();
        data.arraysize = current.arraysize;
        *current = data;
        Ok(())
    }

    /// 在该游标上执行多组参数
    pub fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<DataValue>],
    ) -> LitePoolResult<()> {
        let total = executor::run_statement_many(&self.inner.conn, sql, param_sets)?;
        let mut current = self.data.borrow_mut();
        let arraysize = current.arraysize;
        *current = CursorData {
            columns: None,
            rows: std::collections::VecDeque::new(),
            rowcount: total as i64,
            lastrowid: None,
            arraysize,
        };
        Ok(())
    }

    /// 取下一行，结果耗尽后返回None
    pub fn fetch_one(&self) -> Option<Vec<DataValue>> {
        self.data.borrow_mut().rows.pop_front()
    }

    /// 取一批行，`size`缺省时使用arraysize
    pub fn fetch_many(&self, size: Option<usize>) -> LitePoolResult<Vec<Vec<DataValue>>> {
        if size == Some(0) {
            return Err(LitePoolError::UnexpectedArgument {
                message: i18n::t("error.fetch_size_zero"),
            });
        }
        let mut data = self.data.borrow_mut();
        let take = size.unwrap_or(data.arraysize);
        let mut batch = Vec::with_capacity(take.min(data.rows.len()));
        for _ in 0..take {
            match data.rows.pop_front() {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(batch)
    }

    /// 取剩余所有行
    pub fn fetch_all(&self) -> Vec<Vec<DataValue>> {
        self.data.borrow_mut().rows.drain(..).collect()
    }

    /// 影响行数；返回结果集的语句为-1
    pub fn rowcount(&self) -> i64 {
        self.data.borrow().rowcount
    }

    /// 最近插入行的rowid
    pub fn lastrowid(&self) -> Option<i64> {
        self.data.borrow().lastrowid
    }

    /// 结果列名，非查询语句为None
    pub fn description(&self) -> Option<Vec<String>> {
        self.data.borrow().columns.clone()
    }

    /// 读取arraysize
    pub fn arraysize(&self) -> usize {
        self.data.borrow().arraysize
    }

    /// 设置arraysize，必须为正整数
    pub fn set_arraysize(&self, size: usize) -> LitePoolResult<()> {
        if size == 0 {
            return Err(LitePoolError::UnexpectedArgument {
                message: i18n::t("error.arraysize_zero"),
            });
        }
        self.data.borrow_mut().arraysize = size;
        Ok(())
    }
}

impl std::fmt::Debug for FileCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCursor")
            .field("rowcount", &self.data.borrow().rowcount)
            .finish()
    }
}
