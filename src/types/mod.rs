//! 基础数据类型模块
//!
//! 定义跨越线程边界的SQL数据值表示，覆盖SQLite的五种存储类别

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{LitePoolError, LitePoolResult};

/// 文本解码策略
///
/// 对应引擎会话初始化中的文本解码行为：宽容模式以替换字符处理非法UTF-8，
/// 严格模式按原生引擎语义报错
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextPolicy {
    /// 非法UTF-8以替换字符解码（默认）
    Lossy,
    /// 非法UTF-8直接报错
    Strict,
}

impl Default for TextPolicy {
    fn default() -> Self {
        TextPolicy::Lossy
    }
}

/// SQL数据值类型 - 所有跨线程传递的参数与结果都使用该表示
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// 空值
    Null,
    /// 布尔值（以整数0/1存储）
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 字节数组
    Bytes(Vec<u8>),
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Null => write!(f, "null"),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Bytes(bytes) => write!(f, "[{} bytes]", bytes.len()),
        }
    }
}

impl std::fmt::Debug for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Debug 和 Display 保持一致，显示实际值而不是类型构造函数
        write!(f, "{}", self)
    }
}

impl DataValue {
    /// 获取数据类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Bool(_) => "boolean",
            DataValue::Int(_) => "integer",
            DataValue::Float(_) => "float",
            DataValue::String(_) => "string",
            DataValue::Bytes(_) => "bytes",
        }
    }

    /// 是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// 按文本解码策略从引擎原生值构造数据值
    pub fn from_value_ref(value: ValueRef<'_>, policy: TextPolicy) -> LitePoolResult<Self> {
        match value {
            ValueRef::Null => Ok(DataValue::Null),
            ValueRef::Integer(i) => Ok(DataValue::Int(i)),
            ValueRef::Real(f) => Ok(DataValue::Float(f)),
            ValueRef::Text(bytes) => match policy {
                TextPolicy::Lossy => Ok(DataValue::String(
                    String::from_utf8_lossy(bytes).into_owned(),
                )),
                TextPolicy::Strict => match std::str::from_utf8(bytes) {
                    Ok(s) => Ok(DataValue::String(s.to_string())),
                    Err(e) => Err(LitePoolError::Sqlite(rusqlite::Error::Utf8Error(e))),
                },
            },
            ValueRef::Blob(bytes) => Ok(DataValue::Bytes(bytes.to_vec())),
        }
    }

    /// 转换为引擎原生值（自定义函数返回值使用）
    pub fn into_sql_value(self) -> Value {
        match self {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Integer(b as i64),
            DataValue::Int(i) => Value::Integer(i),
            DataValue::Float(f) => Value::Real(f),
            DataValue::String(s) => Value::Text(s),
            DataValue::Bytes(b) => Value::Blob(b),
        }
    }
}

impl ToSql for DataValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DataValue::Null => ToSqlOutput::Owned(Value::Null),
            DataValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(*b as i64)),
            DataValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            DataValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            DataValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DataValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Int(value as i64)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Float(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::String(value)
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(value: Vec<u8>) -> Self {
        DataValue::Bytes(value)
    }
}

impl<T> From<Option<T>> for DataValue
where
    T: Into<DataValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DataValue::Null,
        }
    }
}
