//! 内存库受限桥接测试
//!
//! 所有测试共享进程级的那一个内存库连接，各自使用独立表名；
//! 事务相关的行为集中在单个测试里，避免并发测试互相干扰

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};
    use std::thread;

    use rat_litepool::{
        memory_config, DataValue, LitePoolError, SharedPool, SqlitePool, TextPolicy,
    };

    /// 串行化本文件的测试：它们共享同一个受限连接，
    /// 事务窗口不允许被其他测试的写入穿插
    static BRIDGE_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn bridge_lock() -> MutexGuard<'static, ()> {
        BRIDGE_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 多个线程获取共享池，拿到的必须是同一个底层资源
    #[test]
    fn test_acquire_returns_single_resource() {
        println!("🔍 测试共享池的单例性");
        rat_litepool::init();
        let _guard = bridge_lock();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                thread::spawn(move || {
                    let pool = SharedPool::global().unwrap();
                    let conn = pool.acquire();
                    conn.execute_batch(
                        "CREATE TABLE IF NOT EXISTS singleton_probe (thread INTEGER)",
                    )
                    .unwrap();
                    conn.execute(
                        "INSERT INTO singleton_probe (thread) VALUES (?1)",
                        &[DataValue::Int(i)],
                    )
                    .unwrap();
                    conn
                })
            })
            .collect();

        let connections: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // 任何一个句柄都能看到所有线程写入的行：底层只有一个资源
        let cursor = connections[0]
            .execute("SELECT COUNT(*) FROM singleton_probe", &[])
            .unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(8)]
        );

        // 身份校验：别的线程拿到的句柄可以在本线程成功release
        let pool = SharedPool::global().unwrap();
        for conn in &connections {
            pool.release(conn).unwrap();
        }
        println!("✅ 8个线程共享同一个受限连接");
    }

    /// 并发写入全部串行执行，每个线程内的入队顺序在总序中保持
    #[test]
    fn test_operations_are_serialized_in_fifo_order() {
        println!("🔍 测试受限操作的FIFO串行化");
        let _guard = bridge_lock();
        let pool = SharedPool::global().unwrap();
        let setup = pool.acquire();
        setup
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS fifo_probe (thread INTEGER, seq INTEGER)",
            )
            .unwrap();

        let threads = 8;
        let per_thread = 25;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                thread::spawn(move || {
                    let conn = SharedPool::global().unwrap().acquire();
                    for seq in 0..per_thread {
                        conn.execute(
                            "INSERT INTO fifo_probe (thread, seq) VALUES (?1, ?2)",
                            &[DataValue::Int(t), DataValue::Int(seq)],
                        )
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cursor = setup
            .execute("SELECT COUNT(*) FROM fifo_probe", &[])
            .unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(threads * per_thread)]
        );

        // 总序与各线程的入队顺序一致：按rowid排列时每个线程的seq单调递增
        let cursor = setup
            .execute("SELECT thread, seq FROM fifo_probe ORDER BY rowid", &[])
            .unwrap();
        let mut last_seq = vec![-1i64; threads as usize];
        for row in cursor.fetch_all().unwrap() {
            let (thread_id, seq) = match (&row[0], &row[1]) {
                (DataValue::Int(t), DataValue::Int(s)) => (*t as usize, *s),
                other => panic!("意外的行内容: {:?}", other),
            };
            assert!(seq > last_seq[thread_id]);
            last_seq[thread_id] = seq;
        }
        println!("✅ {}个线程×{}次写入全部按入队顺序执行", threads, per_thread);
    }

    /// 受限调用的失败必须以引擎原始的种类和消息到达调用线程
    #[test]
    fn test_error_passthrough_matches_direct_call() {
        println!("🔍 测试错误跨线程透传");
        rat_litepool::init();
        let _guard = bridge_lock();

        // 同一条非法SQL直接在本线程执行一次，作为对照
        let direct_err = {
            let conn = rusqlite::Connection::open_in_memory().unwrap();
            conn.prepare("SELECT FROM nothing").unwrap_err()
        };

        let conn = SharedPool::global().unwrap().acquire();
        match conn.execute("SELECT FROM nothing", &[]) {
            Err(LitePoolError::Sqlite(bridged)) => {
                assert_eq!(bridged.to_string(), direct_err.to_string());
            }
            other => panic!("预期Sqlite错误，实际: {:?}", other.err()),
        }

        // 运行期失败同样透传：pow参数个数错误
        match conn.execute("SELECT pow(2)", &[]) {
            Err(LitePoolError::Sqlite(e)) => {
                assert!(e.to_string().contains("pow"));
            }
            other => panic!("预期Sqlite错误，实际: {:?}", other.err()),
        }
        println!("✅ 调用线程看到的错误与直接调用一致");
    }

    /// 事务语义：release回滚；commit后数据保留（集中在一个测试内避免并发干扰）
    #[test]
    fn test_transactions_through_bridge() {
        let _guard = bridge_lock();
        let pool = SharedPool::global().unwrap();
        let conn = pool.acquire();
        conn.execute_batch("CREATE TABLE IF NOT EXISTS txn_probe (v INTEGER)")
            .unwrap();

        conn.execute_batch("BEGIN").unwrap();
        assert!(!conn.is_autocommit().unwrap());
        conn.execute("INSERT INTO txn_probe (v) VALUES (?1)", &[DataValue::Int(1)])
            .unwrap();
        pool.release(&conn).unwrap();
        assert!(conn.is_autocommit().unwrap());

        let cursor = conn.execute("SELECT COUNT(*) FROM txn_probe", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(0)]
        );

        conn.execute_batch("BEGIN").unwrap();
        conn.execute("INSERT INTO txn_probe (v) VALUES (?1)", &[DataValue::Int(2)])
            .unwrap();
        conn.commit().unwrap();
        // drop_connection对共享资源只回滚不销毁，已提交数据保留
        pool.drop_connection(&conn).unwrap();

        let cursor = conn.execute("SELECT v FROM txn_probe", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(2)]
        );
    }

    /// 游标代理经过重新包装后再受限：fetch在任意线程可用
    #[test]
    fn test_cursor_rewrapping_across_threads() {
        let _guard = bridge_lock();
        let conn = SharedPool::global().unwrap().acquire();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cursor_probe (v INTEGER);
             DELETE FROM cursor_probe;",
        )
        .unwrap();
        let sets: Vec<Vec<DataValue>> = (1..=4).map(|v| vec![DataValue::Int(v)]).collect();
        conn.execute_many("INSERT INTO cursor_probe (v) VALUES (?1)", &sets)
            .unwrap();

        let cursor = conn
            .execute("SELECT v FROM cursor_probe ORDER BY v", &[])
            .unwrap();
        assert_eq!(
            cursor.description().unwrap(),
            Some(vec!["v".to_string()])
        );

        // 游标句柄交给另一个线程继续fetch，操作仍走受限队列
        let remainder = thread::spawn(move || {
            let first = cursor.fetch_one().unwrap().unwrap();
            assert_eq!(first, vec![DataValue::Int(1)]);
            cursor.fetch_all().unwrap().len()
        })
        .join()
        .unwrap();
        assert_eq!(remainder, 3);
    }

    /// 自定义标量函数跨线程注册后在SQL里可用
    #[test]
    fn test_scalar_function_forwarding() {
        let _guard = bridge_lock();
        let conn = SharedPool::global().unwrap().acquire();
        conn.create_scalar_function(
            "double_it",
            1,
            Box::new(|args| match &args[0] {
                DataValue::Int(v) => Ok(DataValue::Int(v * 2)),
                other => Ok(other.clone()),
            }),
        )
        .unwrap();

        let cursor = conn.execute("SELECT double_it(21)", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(42)]
        );

        // 空函数名违反属性约定
        match conn.create_scalar_function("", 1, Box::new(|_| Ok(DataValue::Null))) {
            Err(LitePoolError::UnexpectedArgument { .. }) => {}
            other => panic!("预期UnexpectedArgument，实际: {:?}", other.err()),
        }
    }

    /// interrupt走旁路，从外部线程调用安全且不破坏后续操作
    #[test]
    fn test_interrupt_bypasses_confinement() {
        let _guard = bridge_lock();
        let conn = SharedPool::global().unwrap().acquire();
        let foreign = conn.clone();
        thread::spawn(move || {
            foreign.interrupt();
        })
        .join()
        .unwrap();

        // 旁路调用之后受限协议继续正常工作
        let cursor = conn.execute("SELECT 1", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(1)]
        );
    }

    /// 属性读写走同一套受限协议
    #[test]
    fn test_property_access_through_bridge() {
        let _guard = bridge_lock();
        let conn = SharedPool::global().unwrap().acquire();

        assert_eq!(conn.text_policy().unwrap(), TextPolicy::Lossy);
        conn.set_text_policy(TextPolicy::Lossy).unwrap();

        conn.execute_batch("CREATE TABLE IF NOT EXISTS prop_probe (v INTEGER)")
            .unwrap();
        let before = conn.total_changes().unwrap();
        conn.execute("INSERT INTO prop_probe (v) VALUES (?1)", &[DataValue::Int(1)])
            .unwrap();
        assert!(conn.total_changes().unwrap() > before);
        assert!(conn.last_insert_rowid().unwrap() >= 1);
    }

    /// `":memory:"`目标经选择器路由到共享池
    #[test]
    fn test_selector_routes_memory_target() {
        rat_litepool::init();
        let _guard = bridge_lock();
        let config = memory_config("selector_mem").unwrap();
        let pool = SqlitePool::new(&config).unwrap();
        assert!(pool.is_memory());
        assert!(pool.health_check().unwrap());

        let conn = pool.connect().unwrap();
        conn.execute_batch("CREATE TABLE IF NOT EXISTS selector_probe (v INTEGER)")
            .unwrap();
        // 会话初始化注册的pow在受限侧同样可用
        let cursor = conn.execute("SELECT pow(2, 8)", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Float(256.0)]
        );
        // 两个别名、同一个":memory:"目标：进程里仍然只有一个内存库
        let other = SqlitePool::new(&memory_config("selector_mem_2").unwrap()).unwrap();
        let other_conn = other.connect().unwrap();
        let cursor = other_conn
            .execute(
                "SELECT name FROM sqlite_master WHERE name = 'selector_probe'",
                &[],
            )
            .unwrap();
        assert!(cursor.fetch_one().unwrap().is_some());

        pool.release(conn).unwrap();
    }

    /// dump在受限侧物化整库转储
    #[test]
    fn test_dump_through_bridge() {
        let _guard = bridge_lock();
        let conn = SharedPool::global().unwrap().acquire();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS dump_probe (v TEXT);
             DELETE FROM dump_probe;",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO dump_probe (v) VALUES (?1)",
            &[DataValue::from("x")],
        )
        .unwrap();

        let lines = conn.dump().unwrap();
        assert_eq!(lines.first().map(String::as_str), Some("BEGIN TRANSACTION;"));
        assert_eq!(lines.last().map(String::as_str), Some("COMMIT;"));
        assert!(lines.iter().any(|l| l.contains("dump_probe")));
    }
}
