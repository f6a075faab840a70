//! 文件型连接池基础测试
//!
//! 覆盖文件库的生命周期语义：惰性连接、文件缺失校验、
//! release回滚、drop终态，以及游标与会话初始化行为

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rat_litepool::{
        sqlite_config, DataValue, LitePoolError, PoolRegistry, SqliteConfig, SqlitePool,
    };

    fn file_pool(path: &std::path::Path) -> SqlitePool {
        let config = sqlite_config("test", path.to_str().unwrap(), true).unwrap();
        SqlitePool::new(&config).unwrap()
    }

    /// 文件缺失且禁止创建时connect必须失败，且不留下任何连接
    #[test]
    fn test_missing_file_is_rejected() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let config = sqlite_config("nofile", path.to_str().unwrap(), false).unwrap();
        let pool = SqlitePool::new(&config).unwrap();

        for _ in 0..2 {
            match pool.connect() {
                Err(LitePoolError::FileNotFound { path: reported }) => {
                    assert!(reported.contains("missing.db"));
                }
                other => panic!("预期FileNotFound，实际: {:?}", other.err()),
            }
        }
        assert!(!path.exists());
    }

    /// 同线程内connect幂等返回同一个连接
    #[test]
    fn test_connect_is_lazy_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("lazy.db"));

        let conn = pool.connect().unwrap();
        // 临时表只对单个物理连接可见，用它证明connect的幂等性
        conn.execute_batch("CREATE TEMPORARY TABLE session_items (v TEXT)")
            .unwrap();

        let again = pool.connect().unwrap();
        again
            .execute(
                "INSERT INTO session_items (v) VALUES (?1)",
                &[DataValue::from("a")],
            )
            .unwrap();
        let cursor = conn
            .execute("SELECT COUNT(*) FROM session_items", &[])
            .unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(1)]
        );
    }

    /// release回滚未提交事务，重新connect看不到残留状态
    #[test]
    fn test_release_rolls_back() {
        println!("🔍 测试release后的事务清洁性");
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("release.db"));

        let conn = pool.connect().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        conn.execute_batch("BEGIN").unwrap();
        conn.execute("INSERT INTO t (v) VALUES (?1)", &[DataValue::Int(1)])
            .unwrap();
        pool.release(conn).unwrap();

        let conn = pool.connect().unwrap();
        let cursor = conn.execute("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Int(0)]
        );
        println!("✅ release后未提交数据已回滚");
    }

    /// drop是终态：同一线程上必须重建连接池才能再连接
    #[test]
    fn test_drop_is_terminal() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drop.db");
        let pool = file_pool(&path);

        let conn = pool.connect().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        pool.drop_connection(conn).unwrap();

        match pool.connect() {
            Err(LitePoolError::PoolError { .. }) => {}
            other => panic!("预期PoolError，实际: {:?}", other.err()),
        }

        // 重建连接池后可以重新连接，之前的数据还在文件里
        let rebuilt = file_pool(&path);
        let conn = rebuilt.connect().unwrap();
        let cursor = conn
            .execute(
                "SELECT name FROM sqlite_master WHERE type = 'table'",
                &[],
            )
            .unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::from("t")]
        );
    }

    /// 释放别的池的连接必须被身份校验拒绝
    #[test]
    fn test_release_identity_check() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let pool_a = file_pool(&dir.path().join("a.db"));
        let pool_b = file_pool(&dir.path().join("b.db"));

        let conn_b = pool_b.connect().unwrap();
        match pool_a.release(conn_b) {
            Err(LitePoolError::PoolError { .. }) => {}
            other => panic!("预期PoolError，实际: {:?}", other.err()),
        }
    }

    /// 线程A写入并提交后释放，线程B用自己的连接池读回已提交数据
    #[test]
    fn test_cross_thread_durability() {
        println!("🔍 测试跨线程文件持久性");
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("durability.db"));

        let writer_path = path.clone();
        thread::spawn(move || {
            let pool = file_pool(&writer_path);
            let conn = pool.connect().unwrap();
            conn.execute_batch("CREATE TABLE events (name TEXT)").unwrap();
            conn.execute(
                "INSERT INTO events (name) VALUES (?1)",
                &[DataValue::from("committed")],
            )
            .unwrap();
            conn.commit().unwrap();
            pool.release(conn).unwrap();
        })
        .join()
        .unwrap();

        let reader_path = path.clone();
        let read_back = thread::spawn(move || {
            let pool = file_pool(&reader_path);
            let conn = pool.connect().unwrap();
            let cursor = conn.execute("SELECT name FROM events", &[]).unwrap();
            cursor.fetch_one().unwrap()
        })
        .join()
        .unwrap();

        assert_eq!(read_back, Some(vec![DataValue::from("committed")]));
        println!("✅ 线程B读到了线程A提交的行");
    }

    /// 会话初始化注册的pow函数可以在SQL里直接调用
    #[test]
    fn test_pow_function_registered() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("pow.db"));
        let conn = pool.connect().unwrap();

        let cursor = conn.execute("SELECT pow(2, 10)", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::Float(1024.0)]
        );
    }

    /// 非法UTF-8文本按宽容策略以替换字符解码，不报错
    #[test]
    fn test_lossy_text_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("text.db"));
        let conn = pool.connect().unwrap();

        conn.execute_batch("CREATE TABLE t (v TEXT)").unwrap();
        conn.execute_batch("INSERT INTO t (v) VALUES (CAST(X'61FF62' AS TEXT))")
            .unwrap();

        let cursor = conn.execute("SELECT v FROM t", &[]).unwrap();
        let row = cursor.fetch_one().unwrap().unwrap();
        assert_eq!(row, vec![DataValue::from("a\u{fffd}b")]);
    }

    /// 游标的DBAPI语义：description、rowcount、fetch粒度、arraysize
    #[test]
    fn test_cursor_semantics() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("cursor.db"));
        let conn = pool.connect().unwrap();

        conn.execute_batch("CREATE TABLE nums (id INTEGER PRIMARY KEY, v INTEGER)")
            .unwrap();
        let insert = conn
            .execute("INSERT INTO nums (v) VALUES (?1)", &[DataValue::Int(10)])
            .unwrap();
        // DML游标：影响行数与lastrowid
        assert_eq!(insert.rowcount().unwrap(), 1);
        assert_eq!(insert.lastrowid().unwrap(), Some(1));
        assert_eq!(insert.description().unwrap(), None);

        let sets: Vec<Vec<DataValue>> = (2..=5).map(|v| vec![DataValue::Int(v * 10)]).collect();
        assert_eq!(
            conn.execute_many("INSERT INTO nums (v) VALUES (?1)", &sets)
                .unwrap(),
            4
        );

        let cursor = conn
            .execute("SELECT id, v FROM nums ORDER BY id", &[])
            .unwrap();
        // 查询游标：rowcount按DBAPI惯例为-1，description给出列名
        assert_eq!(cursor.rowcount().unwrap(), -1);
        assert_eq!(
            cursor.description().unwrap(),
            Some(vec!["id".to_string(), "v".to_string()])
        );

        let first = cursor.fetch_one().unwrap().unwrap();
        assert_eq!(first, vec![DataValue::Int(1), DataValue::Int(10)]);

        cursor.set_arraysize(2).unwrap();
        assert_eq!(cursor.arraysize().unwrap(), 2);
        assert_eq!(cursor.fetch_many(None).unwrap().len(), 2);

        match cursor.fetch_many(Some(0)) {
            Err(LitePoolError::UnexpectedArgument { .. }) => {}
            other => panic!("预期UnexpectedArgument，实际: {:?}", other.err()),
        }
        match cursor.set_arraysize(0) {
            Err(LitePoolError::UnexpectedArgument { .. }) => {}
            other => panic!("预期UnexpectedArgument，实际: {:?}", other.err()),
        }

        let rest = cursor.fetch_all().unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(cursor.fetch_one().unwrap(), None);
    }

    /// execute_many拒绝返回结果集的语句
    #[test]
    fn test_execute_many_rejects_queries() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("many.db"));
        let conn = pool.connect().unwrap();

        match conn.execute_many("SELECT 1", &[vec![]]) {
            Err(LitePoolError::UnexpectedArgument { .. }) => {}
            other => panic!("预期UnexpectedArgument，实际: {:?}", other.err()),
        }
    }

    /// dump输出可重放的SQL转储
    #[test]
    fn test_dump_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir.path().join("dump_src.db"));
        let conn = pool.connect().unwrap();

        conn.execute_batch("CREATE TABLE kv (k TEXT, v INTEGER)").unwrap();
        conn.execute(
            "INSERT INTO kv (k, v) VALUES (?1, ?2)",
            &[DataValue::from("answer"), DataValue::Int(42)],
        )
        .unwrap();

        let lines = conn.dump().unwrap();
        assert!(lines.iter().any(|l| l.contains("CREATE TABLE kv")));
        assert!(lines.iter().any(|l| l.starts_with("INSERT INTO \"kv\"")));

        // 重放到另一个库里，数据一致
        let replay = file_pool(&dir.path().join("dump_dst.db"));
        let target = replay.connect().unwrap();
        target.execute_batch(&lines.join("\n")).unwrap();
        let cursor = target.execute("SELECT k, v FROM kv", &[]).unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap().unwrap(),
            vec![DataValue::from("answer"), DataValue::Int(42)]
        );
    }

    /// 注册表按别名路由，别名重复被拒绝
    #[test]
    fn test_registry_alias_routing() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();
        let registry = PoolRegistry::new();

        let config_a = sqlite_config("reg_a", dir.path().join("a.db").to_str().unwrap(), true)
            .unwrap();
        let config_b = sqlite_config("reg_b", dir.path().join("b.db").to_str().unwrap(), true)
            .unwrap();
        registry.add_database(config_a.clone()).unwrap();
        registry.add_database(config_b).unwrap();

        match registry.add_database(config_a) {
            Err(LitePoolError::ConfigError { .. }) => {}
            other => panic!("预期ConfigError，实际: {:?}", other.err()),
        }

        // 第一个注册的数据库自动成为默认
        let default_pool = registry.get_pool(None).unwrap();
        assert!(!default_pool.is_memory());

        registry.set_default_alias("reg_b").unwrap();
        assert!(registry.get_pool(None).is_ok());
        assert_eq!(registry.get_aliases().len(), 2);

        assert!(registry.health_check(Some("reg_a")).is_ok());
        assert!(registry.remove_database("reg_b"));
        assert!(!registry.remove_database("reg_b"));
        assert!(matches!(
            registry.get_pool(None),
            Err(LitePoolError::ConfigError { .. })
        ));
    }

    /// 相对路径必须配合base_dir解析，绝不回退到进程工作目录
    #[test]
    fn test_relative_target_requires_base_dir() {
        rat_litepool::init();
        let dir = tempfile::tempdir().unwrap();

        let bad = SqliteConfig::builder()
            .alias("rel")
            .path("data/rel.db")
            .create_if_missing(true)
            .build()
            .unwrap();
        assert!(matches!(
            SqlitePool::new(&bad),
            Err(LitePoolError::ConfigError { .. })
        ));

        let good = SqliteConfig::builder()
            .alias("rel")
            .path("data/rel.db")
            .create_if_missing(true)
            .base_dir(dir.path())
            .build()
            .unwrap();
        let pool = SqlitePool::new(&good).unwrap();
        let conn = pool.connect().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        assert!(dir.path().join("data/rel.db").exists());
    }
}
