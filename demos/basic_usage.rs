//! RatLitePool 基本使用示例
//!
//! 本示例展示了如何使用 rat_litepool 管理文件型SQLite数据库,
//! 包括配置构建、连接生命周期、游标操作和注册表路由。

use rat_litepool::*;
use rat_logger::{LoggerBuilder, handler::term::TermConfig};

fn main() -> LitePoolResult<()> {
    // 初始化日志系统
    LoggerBuilder::new()
        .add_terminal_with_config(TermConfig::default())
        .init()
        .expect("日志初始化失败");
    rat_litepool::init();

    println!("=== RatLitePool 基本使用示例 ===");
    println!("库版本: {}", rat_litepool::version());

    // 清理旧的数据库文件
    let db_path = "/tmp/test_litepool_basic.db";
    if std::path::Path::new(db_path).exists() {
        std::fs::remove_file(db_path).unwrap_or_else(|e| {
            eprintln!("警告：删除数据库文件失败 {}: {}", db_path, e);
        });
        println!("✅ 已清理旧的数据库文件: {}", db_path);
    }

    // 1. 配置文件型数据库并注册
    println!("\n1. 配置文件型数据库...");
    let config = SqliteConfig::builder()
        .alias("default")
        .path(db_path)
        .create_if_missing(true)
        .build()?;
    add_database(config)?;
    println!("已注册别名: {:?}", get_aliases());

    // 2. 获取当前线程的连接并建表
    println!("\n2. 建表并写入数据...");
    let conn = get_connection(None)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER
        )",
    )?;

    let inserted = conn.execute_many(
        "INSERT INTO users (name, age) VALUES (?1, ?2)",
        &[
            vec![DataValue::from("张三"), DataValue::Int(25)],
            vec![DataValue::from("李四"), DataValue::Int(30)],
            vec![DataValue::from("王五"), DataValue::Int(35)],
        ],
    )?;
    println!("插入了 {} 行", inserted);

    // 3. 查询并按DBAPI游标语义读取
    println!("\n3. 查询数据...");
    let cursor = conn.execute("SELECT id, name, age FROM users ORDER BY id", &[])?;
    println!("列名: {:?}", cursor.description()?);
    while let Some(row) = cursor.fetch_one()? {
        println!("  行: {:?}", row);
    }

    // 4. 会话初始化注册的pow函数
    println!("\n4. 调用会话自定义函数...");
    let cursor = conn.execute("SELECT name, pow(age, 2) FROM users ORDER BY id", &[])?;
    for row in cursor.fetch_all()? {
        println!("  pow结果: {:?}", row);
    }

    // 5. 释放连接（回滚到干净状态，连接保留给本线程复用）
    println!("\n5. 释放连接...");
    let pool = get_pool(None)?;
    pool.release(conn)?;
    println!("健康检查: {:?}", health_check(None)?);

    println!("\n=== 示例完成 ===");
    Ok(())
}
