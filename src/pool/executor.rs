//! 语句执行器模块
//!
//! 两种池策略共用的SQL执行实现：参数绑定、行解码、会话初始化。
//! 文件型连接在调用线程直接使用，内存库则由工作线程在受限侧调用

use rusqlite::functions::FunctionFlags;
use rusqlite::{params_from_iter, Connection};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;

use super::types::{CursorData, ScalarFunction};
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::types::{DataValue, TextPolicy};

/// 引擎会话初始化
///
/// 注册两参数的`pow`标量函数并保持确定性标记，供SQL文本直接调用
pub(crate) fn init_connection(conn: &Connection) -> LitePoolResult<()> {
    conn.create_scalar_function(
        "pow",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let base = ctx.get::<f64>(0)?;
            let exponent = ctx.get::<f64>(1)?;
            Ok(base.powf(exponent))
        },
    )?;
    Ok(())
}

/// 注册调用方提供的标量自定义函数
///
/// 参数与返回值经由`DataValue`转换；函数自身的失败以
/// `UserFunctionError`的形式进入引擎错误通道
pub(crate) fn install_scalar_function(
    conn: &Connection,
    name: &str,
    n_args: i32,
    func: ScalarFunction,
    policy: TextPolicy,
) -> LitePoolResult<()> {
    if name.is_empty() {
        return Err(LitePoolError::UnexpectedArgument {
            message: i18n::t("error.function_name_empty"),
        });
    }

    let func = std::cell::RefCell::new(AssertUnwindSafe(func));
    conn.create_scalar_function(name, n_args, FunctionFlags::SQLITE_UTF8, move |ctx| {
        let mut args = Vec::with_capacity(ctx.len());
        for idx in 0..ctx.len() {
            let value = DataValue::from_value_ref(ctx.get_raw(idx), policy)
                .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            args.push(value);
        }
        let result =
            (func.borrow_mut().0)(&args).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
        Ok(result.into_sql_value())
    })?;
    Ok(())
}

/// 执行单条语句并物化结果
///
/// 返回结果集的语句整体缓冲行数据，rowcount按DBAPI惯例为-1；
/// 其余语句记录影响行数与最近插入rowid
pub(crate) fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[DataValue],
    policy: TextPolicy,
) -> LitePoolResult<CursorData> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();

    if column_count > 0 {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut buffered = VecDeque::new();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut decoded = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                decoded.push(DataValue::from_value_ref(row.get_ref(idx)?, policy)?);
            }
            buffered.push_back(decoded);
        }
        Ok(CursorData {
            columns: Some(columns),
            rows: buffered,
            rowcount: -1,
            lastrowid: None,
            arraysize: 1,
        })
    } else {
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        drop(stmt);
        Ok(CursorData {
            columns: None,
            rows: VecDeque::new(),
            rowcount: changed as i64,
            lastrowid: Some(conn.last_insert_rowid()),
            arraysize: 1,
        })
    }
}

/// 对同一语句执行多组参数，返回累计影响行数
pub(crate) fn run_statement_many(
    conn: &Connection,
    sql: &str,
    param_sets: &[Vec<DataValue>],
) -> LitePoolResult<u64> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() > 0 {
        return Err(LitePoolError::UnexpectedArgument {
            message: i18n::t("error.executemany_rows"),
        });
    }

    let mut total = 0u64;
    for params in param_sets {
        total += stmt.execute(params_from_iter(params.iter()))? as u64;
    }
    Ok(total)
}

/// 执行SQL脚本
pub(crate) fn run_batch(conn: &Connection, sql: &str) -> LitePoolResult<()> {
    conn.execute_batch(sql)?;
    Ok(())
}

/// 仅当存在打开的事务时提交
///
/// 引擎默认自动提交，无事务时提交是空操作而不是错误
pub(crate) fn commit_if_open(conn: &Connection) -> LitePoolResult<()> {
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }
    Ok(())
}

/// 仅当存在打开的事务时回滚
pub(crate) fn rollback_if_open(conn: &Connection) -> LitePoolResult<()> {
    if !conn.is_autocommit() {
        conn.execute_batch("ROLLBACK")?;
    }
    Ok(())
}

/// 累计变更行数
///
/// 通过SQL内建函数读取，避免依赖驱动层的接口差异
pub(crate) fn total_changes(conn: &Connection) -> LitePoolResult<u64> {
    let total: i64 = conn.query_row("SELECT total_changes()", [], |row| row.get(0))?;
    Ok(total as u64)
}

/// 导出整库SQL转储
///
/// 输出可重放的语句序列：建表语句、借助`quote()`转义的INSERT、
/// 索引/触发器/视图定义，整体包在一个事务里
pub(crate) fn dump_sql(conn: &Connection) -> LitePoolResult<Vec<String>> {
    let mut lines = vec!["BEGIN TRANSACTION;".to_string()];

    let mut tables: Vec<(String, String)> = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let sql: Option<String> = row.get(1)?;
            if let Some(sql) = sql {
                tables.push((name, sql));
            }
        }
    }

    for (name, create_sql) in &tables {
        lines.push(format!("{};", create_sql));

        let escaped_name = name.replace('"', "\"\"");
        let columns: Vec<String> = {
            let stmt = conn.prepare(&format!("SELECT * FROM \"{}\" LIMIT 0", escaped_name))?;
            stmt.column_names().into_iter().map(String::from).collect()
        };
        // quote()由引擎自行处理各存储类别的字面量转义
        let quoted: Vec<String> = columns
            .iter()
            .map(|c| format!("quote(\"{}\")", c.replace('"', "\"\"")))
            .collect();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM \"{}\"",
            quoted.join(", "),
            escaped_name
        ))?;
        let column_count = columns.len();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut literals = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                literals.push(row.get::<_, String>(idx)?);
            }
            lines.push(format!(
                "INSERT INTO \"{}\" VALUES({});",
                escaped_name,
                literals.join(",")
            ));
        }
    }

    {
        let mut stmt = conn.prepare(
            "SELECT sql FROM sqlite_master \
             WHERE sql NOT NULL AND type IN ('index', 'trigger', 'view') ORDER BY name",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let sql: String = row.get(0)?;
            lines.push(format!("{};", sql));
        }
    }

    lines.push("COMMIT;".to_string());
    Ok(lines)
}
