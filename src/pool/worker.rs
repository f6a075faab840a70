//! 内存库工作线程模块
//!
//! 受限资源的唯一属主：内存库连接在本线程上创建，在本线程上销毁，
//! 生命周期内绝不被其他线程直接触碰。工作线程按FIFO顺序逐个执行
//! 队列里的请求，两个请求的执行在时间上绝不重叠，这种排队纪律
//! 替代了资源内部的加锁

use rat_logger::{debug, info, warn};
use rusqlite::{Connection, InterruptHandle};
use std::collections::{HashMap, VecDeque};
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::executor;
use super::types::{
    ConnectionOperation, CursorData, CursorId, CursorOperation, ScalarFunction, WorkerMessage,
};
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::types::TextPolicy;

/// 内存库工作线程
pub(crate) struct MemoryWorker {
    /// 受限连接 - Close操作后变为None，后续操作报连接已关闭
    connection: Option<Connection>,
    /// 打开的游标注册表
    cursors: HashMap<CursorId, CursorData>,
    /// 下一个游标标识
    next_cursor_id: CursorId,
    /// 文本解码策略
    text_policy: TextPolicy,
    /// 操作接收器
    receiver: Receiver<WorkerMessage>,
}

impl MemoryWorker {
    /// 启动工作线程
    ///
    /// 连接在工作线程上创建并完成会话初始化；启动握手通道把
    /// interrupt句柄（或创建失败的错误）交回给发起方后才进入主循环
    pub(crate) fn spawn() -> LitePoolResult<(Sender<WorkerMessage>, InterruptHandle)> {
        let (sender, receiver) = unbounded();
        let (startup_tx, startup_rx) = bounded::<LitePoolResult<InterruptHandle>>(1);

        let spawn_result = thread::Builder::new()
            .name("rat-litepool-memory".to_string())
            .spawn(move || {
                let conn = match Connection::open_in_memory() {
                    Ok(conn) => conn,
                    Err(e) => {
                        let _ = startup_tx.send(Err(e.into()));
                        return;
                    }
                };
                if let Err(e) = executor::init_connection(&conn) {
                    let _ = startup_tx.send(Err(e));
                    return;
                }
                // interrupt句柄是唯一合法的旁路：它必须能从外部线程
                // 打断一个正在受限侧执行的调用，所以不走队列
                let _ = startup_tx.send(Ok(conn.get_interrupt_handle()));

                let worker = MemoryWorker {
                    connection: Some(conn),
                    cursors: HashMap::new(),
                    next_cursor_id: 1,
                    text_policy: TextPolicy::Lossy,
                    receiver,
                };
                worker.run();
            });

        if let Err(e) = spawn_result {
            return Err(LitePoolError::ConnectionError {
                message: i18n::tf("error.worker_spawn", &[("message", &e.to_string())]),
            });
        }

        let interrupt = startup_rx.recv().map_err(|_| LitePoolError::ConnectionError {
            message: i18n::t("error.worker_startup"),
        })??;

        info!("内存库工作线程启动完成");
        Ok((sender, interrupt))
    }

    /// 运行主循环
    ///
    /// 单个请求的失败只会通过结果槽回传给调用方，绝不终止工作线程；
    /// 只有Shutdown哨兵能让循环退出，连接随所有权释放而关闭
    fn run(mut self) {
        info!("内存库工作线程开始运行");

        while let Ok(message) = self.receiver.recv() {
            match message {
                WorkerMessage::Connection(op) => self.handle_connection_op(op),
                WorkerMessage::Cursor(op) => self.handle_cursor_op(op),
                WorkerMessage::Shutdown => {
                    debug!("收到关闭哨兵");
                    break;
                }
            }
        }

        info!("内存库工作线程停止运行");
    }

    /// 取受限连接的引用
    fn conn(&self) -> LitePoolResult<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| LitePoolError::ConnectionError {
                message: i18n::t("error.connection_closed"),
            })
    }

    /// 在注册表中登记新游标
    fn register_cursor(&mut self, data: CursorData) -> CursorId {
        let id = self.next_cursor_id;
        self.next_cursor_id += 1;
        self.cursors.insert(id, data);
        id
    }

    /// 取游标状态的可变引用
    fn cursor_state(&mut self, id: CursorId) -> LitePoolResult<&mut CursorData> {
        self.cursors
            .get_mut(&id)
            .ok_or_else(|| LitePoolError::ConnectionError {
                message: i18n::t("error.cursor_closed"),
            })
    }

    /// 处理连接级操作
    fn handle_connection_op(&mut self, op: ConnectionOperation) {
        match op {
            ConnectionOperation::OpenCursor { response } => {
                let id = self.register_cursor(CursorData::empty());
                let _ = response.send(Ok(id));
            }
            ConnectionOperation::Execute {
                sql,
                params,
                response,
            } => {
                let executed = match self.conn() {
                    Ok(conn) => executor::run_statement(conn, &sql, &params, self.text_policy),
                    Err(e) => Err(e),
                };
                let _ = response.send(executed.map(|data| self.register_cursor(data)));
            }
            ConnectionOperation::ExecuteMany {
                sql,
                param_sets,
                response,
            } => {
                let result = match self.conn() {
                    Ok(conn) => executor::run_statement_many(conn, &sql, &param_sets),
                    Err(e) => Err(e),
                };
                let _ = response.send(result);
            }
            ConnectionOperation::ExecuteBatch { sql, response } => {
                let result = self.conn().and_then(|conn| executor::run_batch(conn, &sql));
                let _ = response.send(result);
            }
            ConnectionOperation::Commit { response } => {
                let result = self.conn().and_then(executor::commit_if_open);
                let _ = response.send(result);
            }
            ConnectionOperation::Rollback { response } => {
                let result = self.conn().and_then(executor::rollback_if_open);
                let _ = response.send(result);
            }
            ConnectionOperation::Close { response } => {
                let _ = response.send(self.close_connection());
            }
            ConnectionOperation::CreateScalarFunction {
                name,
                n_args,
                func,
                response,
            } => {
                let _ = response.send(self.install_scalar_function(&name, n_args, func));
            }
            ConnectionOperation::Dump { response } => {
                let result = self.conn().and_then(executor::dump_sql);
                let _ = response.send(result);
            }
            ConnectionOperation::TotalChanges { response } => {
                let result = self.conn().and_then(executor::total_changes);
                let _ = response.send(result);
            }
            ConnectionOperation::IsAutocommit { response } => {
                let result = self.conn().map(|conn| conn.is_autocommit());
                let _ = response.send(result);
            }
            ConnectionOperation::LastInsertRowid { response } => {
                let result = self.conn().map(|conn| conn.last_insert_rowid());
                let _ = response.send(result);
            }
            ConnectionOperation::GetTextPolicy { response } => {
                let _ = response.send(Ok(self.text_policy));
            }
            ConnectionOperation::SetTextPolicy { policy, response } => {
                self.text_policy = policy;
                let _ = response.send(Ok(()));
            }
        }
    }

    /// 处理游标级操作
    fn handle_cursor_op(&mut self, op: CursorOperation) {
        match op {
            CursorOperation::Execute {
                cursor,
                sql,
                params,
                response,
            } => {
                let executed = match self.conn() {
                    Ok(conn) => executor::run_statement(conn, &sql, &params, self.text_policy),
                    Err(e) => Err(e),
                };
                let result = executed.and_then(|mut data| {
                    let state = self.cursor_state(cursor)?;
                    // arraysize是游标自身的属性，跨越多次执行保留
                    data.arraysize = state.arraysize;
                    *state = data;
                    Ok(())
                });
                let _ = response.send(result);
            }
            CursorOperation::ExecuteMany {
                cursor,
                sql,
                param_sets,
                response,
            } => {
                let executed = match self.conn() {
                    Ok(conn) => executor::run_statement_many(conn, &sql, &param_sets),
                    Err(e) => Err(e),
                };
                let result = executed.and_then(|total| {
                    let state = self.cursor_state(cursor)?;
                    let arraysize = state.arraysize;
                    *state = CursorData {
                        columns: None,
                        rows: VecDeque::new(),
                        rowcount: total as i64,
                        lastrowid: None,
                        arraysize,
                    };
                    Ok(())
                });
                let _ = response.send(result);
            }
            CursorOperation::FetchOne { cursor, response } => {
                let result = self
                    .cursor_state(cursor)
                    .map(|state| state.rows.pop_front());
                let _ = response.send(result);
            }
            CursorOperation::FetchMany {
                cursor,
                size,
                response,
            } => {
                let result = match size {
                    Some(0) => Err(LitePoolError::UnexpectedArgument {
                        message: i18n::t("error.fetch_size_zero"),
                    }),
                    _ => self.cursor_state(cursor).map(|state| {
                        let take = size.unwrap_or(state.arraysize);
                        let mut batch = Vec::with_capacity(take.min(state.rows.len()));
                        for _ in 0..take {
                            match state.rows.pop_front() {
                                Some(row) => batch.push(row),
                                None => break,
                            }
                        }
                        batch
                    }),
                };
                let _ = response.send(result);
            }
            CursorOperation::FetchAll { cursor, response } => {
                let result = self
                    .cursor_state(cursor)
                    .map(|state| state.rows.drain(..).collect());
                let _ = response.send(result);
            }
            CursorOperation::Close { cursor, response } => {
                // 关闭不存在的游标视为幂等空操作
                self.cursors.remove(&cursor);
                let _ = response.send(Ok(()));
            }
            CursorOperation::RowCount { cursor, response } => {
                let result = self.cursor_state(cursor).map(|state| state.rowcount);
                let _ = response.send(result);
            }
            CursorOperation::LastRowid { cursor, response } => {
                let result = self.cursor_state(cursor).map(|state| state.lastrowid);
                let _ = response.send(result);
            }
            CursorOperation::Description { cursor, response } => {
                let result = self.cursor_state(cursor).map(|state| state.columns.clone());
                let _ = response.send(result);
            }
            CursorOperation::GetArraySize { cursor, response } => {
                let result = self.cursor_state(cursor).map(|state| state.arraysize);
                let _ = response.send(result);
            }
            CursorOperation::SetArraySize {
                cursor,
                size,
                response,
            } => {
                let result = if size == 0 {
                    Err(LitePoolError::UnexpectedArgument {
                        message: i18n::t("error.arraysize_zero"),
                    })
                } else {
                    self.cursor_state(cursor).map(|state| {
                        state.arraysize = size;
                    })
                };
                let _ = response.send(result);
            }
        }
    }

    /// 关闭受限连接
    ///
    /// 幂等：重复关闭是空操作。关闭失败时连接放回原位并上抛错误
    fn close_connection(&mut self) -> LitePoolResult<()> {
        match self.connection.take() {
            Some(conn) => match conn.close() {
                Ok(()) => {
                    self.cursors.clear();
                    Ok(())
                }
                Err((conn, e)) => {
                    warn!("内存库连接关闭失败: {}", e);
                    self.connection = Some(conn);
                    Err(e.into())
                }
            },
            None => Ok(()),
        }
    }

    /// 注册跨线程转发来的标量自定义函数
    fn install_scalar_function(
        &self,
        name: &str,
        n_args: i32,
        func: ScalarFunction,
    ) -> LitePoolResult<()> {
        let conn = self.conn()?;
        executor::install_scalar_function(conn, name, n_args, func, self.text_policy)
    }
}
