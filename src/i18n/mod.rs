//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use std::collections::HashMap;
use std::sync::Once;
use rat_embed_lang::register_translations;

/// 保证翻译只注册一次，避免重复注册触发底层panic
static REGISTER_ONCE: Once = Once::new();

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        REGISTER_ONCE.call_once(Self::register_all_translations_inner);
    }

    fn register_all_translations_inner() {
        let mut translations = HashMap::new();

        // 数据库连接错误
        let mut connection_errors = HashMap::new();
        connection_errors.insert("zh-CN".to_string(), "数据库连接失败: {message}".to_string());
        connection_errors.insert("en-US".to_string(), "Database connection failed: {message}".to_string());
        connection_errors.insert("ja-JP".to_string(), "データベース接続に失敗しました: {message}".to_string());
        translations.insert("error.connection".to_string(), connection_errors);

        // 连接池错误
        let mut pool_errors = HashMap::new();
        pool_errors.insert("zh-CN".to_string(), "连接池操作失败: {message}".to_string());
        pool_errors.insert("en-US".to_string(), "Connection pool operation failed: {message}".to_string());
        pool_errors.insert("ja-JP".to_string(), "接続プール操作が失敗しました: {message}".to_string());
        translations.insert("error.pool".to_string(), pool_errors);

        // 配置错误
        let mut config_errors = HashMap::new();
        config_errors.insert("zh-CN".to_string(), "配置错误: {message}".to_string());
        config_errors.insert("en-US".to_string(), "Configuration error: {message}".to_string());
        config_errors.insert("ja-JP".to_string(), "設定エラー: {message}".to_string());
        translations.insert("error.config".to_string(), config_errors);

        // SQLite数据库文件不存在
        let mut file_not_found = HashMap::new();
        file_not_found.insert("zh-CN".to_string(), "SQLite数据库文件不存在且未启用自动创建: {path}".to_string());
        file_not_found.insert("en-US".to_string(), "SQLite database file does not exist and auto-create is not enabled: {path}".to_string());
        file_not_found.insert("ja-JP".to_string(), "SQLiteデータベースファイルが存在せず、自動作成が有効ではありません: {path}".to_string());
        translations.insert("error.file_not_found".to_string(), file_not_found);

        // 创建SQLite数据库目录失败
        let mut dir_create_failed = HashMap::new();
        dir_create_failed.insert("zh-CN".to_string(), "创建SQLite数据库目录失败: {message}".to_string());
        dir_create_failed.insert("en-US".to_string(), "Failed to create SQLite database directory: {message}".to_string());
        dir_create_failed.insert("ja-JP".to_string(), "SQLiteデータベースディレクトリ作成失敗: {message}".to_string());
        translations.insert("error.dir_create".to_string(), dir_create_failed);

        // 工作线程启动失败
        let mut worker_spawn_failed = HashMap::new();
        worker_spawn_failed.insert("zh-CN".to_string(), "内存库工作线程启动失败: {message}".to_string());
        worker_spawn_failed.insert("en-US".to_string(), "In-memory worker thread startup failed: {message}".to_string());
        worker_spawn_failed.insert("ja-JP".to_string(), "インメモリワーカースレッド起動失敗: {message}".to_string());
        translations.insert("error.worker_spawn".to_string(), worker_spawn_failed);

        // 工作线程启动握手失败
        let mut worker_startup = HashMap::new();
        worker_startup.insert("zh-CN".to_string(), "内存库工作线程未完成启动握手".to_string());
        worker_startup.insert("en-US".to_string(), "In-memory worker thread did not complete the startup handshake".to_string());
        worker_startup.insert("ja-JP".to_string(), "インメモリワーカースレッドが起動ハンドシェイクを完了しませんでした".to_string());
        translations.insert("error.worker_startup".to_string(), worker_startup);

        // 工作线程不可用
        let mut worker_unavailable = HashMap::new();
        worker_unavailable.insert("zh-CN".to_string(), "内存库工作线程不可用，请求无法入队".to_string());
        worker_unavailable.insert("en-US".to_string(), "In-memory worker thread is unavailable, request cannot be enqueued".to_string());
        worker_unavailable.insert("ja-JP".to_string(), "インメモリワーカースレッドが利用できず、リクエストをキューに入れられません".to_string());
        translations.insert("error.worker_unavailable".to_string(), worker_unavailable);

        // 响应信号丢失
        let mut reply_lost = HashMap::new();
        reply_lost.insert("zh-CN".to_string(), "工作线程在响应前退出，结果信号丢失".to_string());
        reply_lost.insert("en-US".to_string(), "Worker thread exited before responding, result signal lost".to_string());
        reply_lost.insert("ja-JP".to_string(), "ワーカースレッドが応答前に終了し、結果シグナルが失われました".to_string());
        translations.insert("error.reply_lost".to_string(), reply_lost);

        // 连接已关闭
        let mut connection_closed = HashMap::new();
        connection_closed.insert("zh-CN".to_string(), "连接已关闭，无法继续执行操作".to_string());
        connection_closed.insert("en-US".to_string(), "Connection is closed, no further operations possible".to_string());
        connection_closed.insert("ja-JP".to_string(), "接続は閉じられており、これ以上操作できません".to_string());
        translations.insert("error.connection_closed".to_string(), connection_closed);

        // 游标已关闭
        let mut cursor_closed = HashMap::new();
        cursor_closed.insert("zh-CN".to_string(), "游标已关闭或不存在".to_string());
        cursor_closed.insert("en-US".to_string(), "Cursor is closed or does not exist".to_string());
        cursor_closed.insert("ja-JP".to_string(), "カーソルは閉じられているか存在しません".to_string());
        translations.insert("error.cursor_closed".to_string(), cursor_closed);

        // 连接池已销毁
        let mut pool_dropped = HashMap::new();
        pool_dropped.insert("zh-CN".to_string(), "当前线程上的连接池已销毁，需要重新构建连接池才能连接".to_string());
        pool_dropped.insert("en-US".to_string(), "The pool was dropped on this thread; reconstruct the pool to connect again".to_string());
        pool_dropped.insert("ja-JP".to_string(), "このスレッド上のプールは破棄されています。再接続するにはプールを再構築してください".to_string());
        translations.insert("error.pool_dropped".to_string(), pool_dropped);

        // 释放的连接不属于该连接池
        let mut release_identity = HashMap::new();
        release_identity.insert("zh-CN".to_string(), "释放的连接不是该连接池持有的连接".to_string());
        release_identity.insert("en-US".to_string(), "The released connection is not the one held by this pool".to_string());
        release_identity.insert("ja-JP".to_string(), "解放された接続はこのプールが保持している接続ではありません".to_string());
        translations.insert("error.release_identity".to_string(), release_identity);

        // 相对路径缺少base_dir
        let mut relative_path = HashMap::new();
        relative_path.insert("zh-CN".to_string(), "相对路径 '{path}' 必须配合显式的base_dir使用，绝不回退到进程工作目录".to_string());
        relative_path.insert("en-US".to_string(), "Relative path '{path}' requires an explicit base_dir; the process working directory is never used".to_string());
        relative_path.insert("ja-JP".to_string(), "相対パス '{path}' には明示的なbase_dirが必要です。プロセスの作業ディレクトリは使用されません".to_string());
        translations.insert("error.relative_path".to_string(), relative_path);

        // base_dir本身必须是绝对路径
        let mut base_dir_relative = HashMap::new();
        base_dir_relative.insert("zh-CN".to_string(), "base_dir '{path}' 必须是绝对路径".to_string());
        base_dir_relative.insert("en-US".to_string(), "base_dir '{path}' must be an absolute path".to_string());
        base_dir_relative.insert("ja-JP".to_string(), "base_dir '{path}' は絶対パスでなければなりません".to_string());
        translations.insert("error.base_dir_relative".to_string(), base_dir_relative);

        // 数据库别名未找到
        let mut alias_not_found = HashMap::new();
        alias_not_found.insert("zh-CN".to_string(), "数据库别名 '{alias}' 未找到".to_string());
        alias_not_found.insert("en-US".to_string(), "Database alias '{alias}' not found".to_string());
        alias_not_found.insert("ja-JP".to_string(), "データベースエイリアス '{alias}' が見つかりません".to_string());
        translations.insert("error.alias_not_found".to_string(), alias_not_found);

        // 数据库别名重复
        let mut alias_duplicate = HashMap::new();
        alias_duplicate.insert("zh-CN".to_string(), "数据库别名 '{alias}' 已存在".to_string());
        alias_duplicate.insert("en-US".to_string(), "Database alias '{alias}' already exists".to_string());
        alias_duplicate.insert("ja-JP".to_string(), "データベースエイリアス '{alias}' は既に存在します".to_string());
        translations.insert("error.alias_duplicate".to_string(), alias_duplicate);

        // 未设置默认别名
        let mut no_default_alias = HashMap::new();
        no_default_alias.insert("zh-CN".to_string(), "未设置默认数据库别名".to_string());
        no_default_alias.insert("en-US".to_string(), "No default database alias is set".to_string());
        no_default_alias.insert("ja-JP".to_string(), "デフォルトのデータベースエイリアスが設定されていません".to_string());
        translations.insert("error.no_default_alias".to_string(), no_default_alias);

        // 配置项缺失
        let mut missing_field = HashMap::new();
        missing_field.insert("zh-CN".to_string(), "配置项 '{field}' 必须显式设置".to_string());
        missing_field.insert("en-US".to_string(), "Configuration field '{field}' must be set explicitly".to_string());
        missing_field.insert("ja-JP".to_string(), "設定項目 '{field}' は明示的に設定する必要があります".to_string());
        translations.insert("error.missing_field".to_string(), missing_field);

        // arraysize必须为正数
        let mut arraysize_zero = HashMap::new();
        arraysize_zero.insert("zh-CN".to_string(), "arraysize必须是正整数".to_string());
        arraysize_zero.insert("en-US".to_string(), "arraysize must be a positive integer".to_string());
        arraysize_zero.insert("ja-JP".to_string(), "arraysizeは正の整数でなければなりません".to_string());
        translations.insert("error.arraysize_zero".to_string(), arraysize_zero);

        // fetch_many的size必须为正数
        let mut fetch_size_zero = HashMap::new();
        fetch_size_zero.insert("zh-CN".to_string(), "fetch_many的size必须是正整数".to_string());
        fetch_size_zero.insert("en-US".to_string(), "fetch_many size must be a positive integer".to_string());
        fetch_size_zero.insert("ja-JP".to_string(), "fetch_manyのsizeは正の整数でなければなりません".to_string());
        translations.insert("error.fetch_size_zero".to_string(), fetch_size_zero);

        // 自定义函数名不能为空
        let mut function_name_empty = HashMap::new();
        function_name_empty.insert("zh-CN".to_string(), "自定义函数名不能为空".to_string());
        function_name_empty.insert("en-US".to_string(), "Custom function name cannot be empty".to_string());
        function_name_empty.insert("ja-JP".to_string(), "カスタム関数名は空にできません".to_string());
        translations.insert("error.function_name_empty".to_string(), function_name_empty);

        // executemany不允许返回结果集
        let mut executemany_rows = HashMap::new();
        executemany_rows.insert("zh-CN".to_string(), "execute_many不能用于返回结果集的语句".to_string());
        executemany_rows.insert("en-US".to_string(), "execute_many cannot be used with statements that return rows".to_string());
        executemany_rows.insert("ja-JP".to_string(), "execute_manyは結果セットを返すステートメントには使用できません".to_string());
        translations.insert("error.executemany_rows".to_string(), executemany_rows);

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        Self::register_all_translations();

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}

/// 重新导出rat_embed_lang的核心函数
pub use rat_embed_lang::{t, tf, set_language, current_language};
