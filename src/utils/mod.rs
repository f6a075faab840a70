//! 工具函数模块

use std::path::{Component, Path, PathBuf};

use crate::error::{LitePoolError, LitePoolResult};
use crate::i18n;

/// 将可能是相对路径的数据库目标解析为绝对路径
///
/// 相对路径必须配合显式的`base_dir`解析，绝不回退到进程工作目录：
/// 数据库文件的位置应当由创建数据库的代码决定，而不是由进程启动位置决定
pub fn absolutize_path(path: &Path, base_dir: Option<&Path>) -> LitePoolResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }

    match base_dir {
        Some(base) if base.is_absolute() => Ok(normalize_path(&base.join(path))),
        Some(base) => Err(LitePoolError::ConfigError {
            message: i18n::tf(
                "error.base_dir_relative",
                &[("path", &base.display().to_string())],
            ),
        }),
        None => Err(LitePoolError::ConfigError {
            message: i18n::tf(
                "error.relative_path",
                &[("path", &path.display().to_string())],
            ),
        }),
    }
}

/// 词法化整理路径中的`.`与`..`片段，不访问文件系统
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
