//! 连接池注册表模块
//!
//! 提供按别名索引的进程级连接池注册表，以及对应的全局便捷函数

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rat_logger::{info, warn};
use std::sync::Arc;

use crate::config::SqliteConfig;
use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;
use crate::pool::{PooledConnection, SqlitePool};

/// 全局连接池注册表实例
pub static GLOBAL_POOL_REGISTRY: Lazy<PoolRegistry> = Lazy::new(PoolRegistry::new);

/// 获取全局连接池注册表
pub(crate) fn get_global_registry() -> &'static PoolRegistry {
    &GLOBAL_POOL_REGISTRY
}

/// 连接池注册表 - 管理多个数据库目标的连接池
#[derive(Debug)]
pub struct PoolRegistry {
    /// 连接池映射 (别名 -> 连接池)
    pools: DashMap<String, Arc<SqlitePool>>,
    /// 默认数据库别名
    default_alias: RwLock<Option<String>>,
}

impl PoolRegistry {
    /// 创建新的注册表
    pub fn new() -> Self {
        info!("创建连接池注册表");
        Self {
            pools: DashMap::new(),
            default_alias: RwLock::new(None),
        }
    }

    /// 按配置添加数据库，别名重复时报错
    ///
    /// 第一个注册的数据库自动成为默认数据库
    pub fn add_database(&self, config: SqliteConfig) -> LitePoolResult<()> {
        let pool = SqlitePool::new(&config)?;
        let alias = config.alias.clone();

        match self.pools.entry(alias.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(LitePoolError::ConfigError {
                    message: i18n::tf("error.alias_duplicate", &[("alias", &alias)]),
                });
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(pool));
            }
        }

        info!("添加数据库: 别名={}, 目标={}", alias, config.target);

        let mut default = self.default_alias.write();
        if default.is_none() {
            *default = Some(alias);
        }
        Ok(())
    }

    /// 按别名获取连接池，`None`使用默认别名
    pub fn get_pool(&self, alias: Option<&str>) -> LitePoolResult<Arc<SqlitePool>> {
        let alias = match alias {
            Some(a) => a.to_string(),
            None => self
                .default_alias
                .read()
                .clone()
                .ok_or_else(|| LitePoolError::ConfigError {
                    message: i18n::t("error.no_default_alias"),
                })?,
        };

        self.pools
            .get(&alias)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LitePoolError::ConfigError {
                message: i18n::tf("error.alias_not_found", &[("alias", &alias)]),
            })
    }

    /// 设置默认别名，别名必须已注册
    pub fn set_default_alias(&self, alias: &str) -> LitePoolResult<()> {
        if !self.pools.contains_key(alias) {
            return Err(LitePoolError::ConfigError {
                message: i18n::tf("error.alias_not_found", &[("alias", alias)]),
            });
        }
        *self.default_alias.write() = Some(alias.to_string());
        Ok(())
    }

    /// 列出所有已注册的别名
    pub fn get_aliases(&self) -> Vec<String> {
        self.pools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// 移除数据库，返回是否存在
    ///
    /// 被移除的别名若是默认别名，默认别名被清空
    pub fn remove_database(&self, alias: &str) -> bool {
        let removed = self.pools.remove(alias).is_some();
        if removed {
            info!("移除数据库: 别名={}", alias);
            let mut default = self.default_alias.write();
            if default.as_deref() == Some(alias) {
                *default = None;
            }
        } else {
            warn!("移除数据库失败，别名不存在: {}", alias);
        }
        removed
    }

    /// 对指定别名（缺省为默认别名）执行健康检查
    pub fn health_check(&self, alias: Option<&str>) -> LitePoolResult<bool> {
        self.get_pool(alias)?.health_check()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 便捷函数 - 添加数据库配置
pub fn add_database(config: SqliteConfig) -> LitePoolResult<()> {
    get_global_registry().add_database(config)
}

/// 便捷函数 - 按别名获取连接池
pub fn get_pool(alias: Option<&str>) -> LitePoolResult<Arc<SqlitePool>> {
    get_global_registry().get_pool(alias)
}

/// 便捷函数 - 按别名获取连接
pub fn get_connection(alias: Option<&str>) -> LitePoolResult<PooledConnection> {
    get_global_registry().get_pool(alias)?.connect()
}

/// 便捷函数 - 设置默认别名
pub fn set_default_alias(alias: &str) -> LitePoolResult<()> {
    get_global_registry().set_default_alias(alias)
}

/// 便捷函数 - 列出所有别名
pub fn get_aliases() -> Vec<String> {
    get_global_registry().get_aliases()
}

/// 便捷函数 - 移除数据库
pub fn remove_database(alias: &str) -> bool {
    get_global_registry().remove_database(alias)
}

/// 便捷函数 - 健康检查
pub fn health_check(alias: Option<&str>) -> LitePoolResult<bool> {
    get_global_registry().health_check(alias)
}
