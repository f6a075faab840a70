//! # 配置管理模块
//!
//! 提供数据库目标配置，支持构建器模式和链式配置
//! 严格遵循项目规范：必需配置项必须显式设置，严禁隐式默认值

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::pool::MEMORY_TARGET;

/// SQLite数据库配置
///
/// `target`为保留标记`":memory:"`时选择共享内存库策略，
/// 其余取值被视为文件路径，按`base_dir`解析后走按线程连接池策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// 数据库别名（注册表中的键）
    pub alias: String,
    /// 数据库目标：文件路径或`":memory:"`
    pub target: String,
    /// 文件不存在时是否允许创建
    pub create_if_missing: bool,
    /// 相对路径的解析基准目录（必须是绝对路径）
    pub base_dir: Option<PathBuf>,
}

impl SqliteConfig {
    /// 创建配置构建器
    pub fn builder() -> SqliteConfigBuilder {
        SqliteConfigBuilder::new()
    }

    /// 是否为内存库配置
    pub fn is_memory(&self) -> bool {
        self.target == MEMORY_TARGET
    }
}

/// SQLite配置构建器
///
/// 文件型目标要求显式设置`create_if_missing`，严禁隐式默认值
#[derive(Debug)]
pub struct SqliteConfigBuilder {
    alias: Option<String>,
    target: Option<String>,
    create_if_missing: Option<bool>,
    base_dir: Option<PathBuf>,
}

impl SqliteConfigBuilder {
    fn new() -> Self {
        Self {
            alias: None,
            target: None,
            create_if_missing: None,
            base_dir: None,
        }
    }

    /// 设置数据库别名
    pub fn alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// 设置文件型数据库路径
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.target = Some(path.into());
        self
    }

    /// 选择共享内存库
    pub fn memory(mut self) -> Self {
        self.target = Some(MEMORY_TARGET.to_string());
        self
    }

    /// 设置文件不存在时是否允许创建
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = Some(create);
        self
    }

    /// 设置相对路径的解析基准目录
    pub fn base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// 构建配置，校验必需项
    pub fn build(self) -> LitePoolResult<SqliteConfig> {
        let alias = self.alias.ok_or_else(|| missing_field("alias"))?;
        let target = self.target.ok_or_else(|| missing_field("target"))?;

        let create_if_missing = if target == MEMORY_TARGET {
            // 内存库没有文件可创建，该配置项无意义
            true
        } else {
            self.create_if_missing
                .ok_or_else(|| missing_field("create_if_missing"))?
        };

        Ok(SqliteConfig {
            alias,
            target,
            create_if_missing,
            base_dir: self.base_dir,
        })
    }
}

fn missing_field(field: &str) -> LitePoolError {
    LitePoolError::ConfigError {
        message: i18n::tf("error.missing_field", &[("field", field)]),
    }
}

/// 创建文件型SQLite数据库配置
pub fn sqlite_config<S: Into<String>, P: Into<String>>(
    alias: S,
    path: P,
    create_if_missing: bool,
) -> LitePoolResult<SqliteConfig> {
    SqliteConfig::builder()
        .alias(alias)
        .path(path)
        .create_if_missing(create_if_missing)
        .build()
}

/// 创建共享内存库配置
pub fn memory_config<S: Into<String>>(alias: S) -> LitePoolResult<SqliteConfig> {
    SqliteConfig::builder().alias(alias).memory().build()
}
