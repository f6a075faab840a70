//! 内存库受限桥接示例
//!
//! 展示多个线程通过同一个代理句柄并发操作进程级共享的内存库：
//! 所有操作经受限队列在专属工作线程上串行执行，调用方同步拿到结果。

use std::thread;

use rat_litepool::*;
use rat_logger::{LoggerBuilder, handler::term::TermConfig};

fn main() -> LitePoolResult<()> {
    LoggerBuilder::new()
        .add_terminal_with_config(TermConfig::default())
        .init()
        .expect("日志初始化失败");
    rat_litepool::init();

    println!("=== 内存库受限桥接示例 ===");

    // 1. 选择器把":memory:"路由到进程级共享池
    let pool = SqlitePool::new(&memory_config("mem")?)?;
    let conn = pool.connect()?;
    conn.execute_batch("CREATE TABLE counters (thread INTEGER, n INTEGER)")?;

    // 2. 8个线程并发写入，受限队列保证串行执行
    println!("\n并发写入中...");
    let workers: Vec<_> = (0..8)
        .map(|t| {
            thread::spawn(move || {
                let conn = SharedPool::global().unwrap().acquire();
                for n in 0..100 {
                    conn.execute(
                        "INSERT INTO counters (thread, n) VALUES (?1, ?2)",
                        &[DataValue::Int(t), DataValue::Int(n)],
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let cursor = conn.execute("SELECT COUNT(*) FROM counters", &[])?;
    println!("总行数: {:?}", cursor.fetch_one()?);

    // 3. 失败跨线程透传：非法SQL的错误和直接调用一致
    match conn.execute("SELECT FROM nothing", &[]) {
        Err(e) => println!("\n透传的引擎错误: {}", e),
        Ok(_) => unreachable!(),
    }

    // 4. 自定义函数跨线程注册后在SQL里可用
    conn.create_scalar_function(
        "int_mod",
        2,
        Box::new(|args| match (&args[0], &args[1]) {
            (DataValue::Int(a), DataValue::Int(b)) if *b != 0 => Ok(DataValue::Int(a % b)),
            _ => Ok(DataValue::Null),
        }),
    )?;
    let cursor = conn.execute("SELECT int_mod(17, 5)", &[])?;
    println!("\n自定义函数结果: {:?}", cursor.fetch_one()?);

    // 5. 整库转储在受限侧物化
    println!("\n数据库转储前5行:");
    for line in conn.dump()?.iter().take(5) {
        println!("  {}", line);
    }

    // 6. 释放回干净状态（共享资源不销毁）
    pool.release(conn)?;
    println!("\n=== 示例完成 ===");
    Ok(())
}
