// crates/nm_config/src/error.rs

//! 配置层错误类型

use nm_foundation::NmError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },
}

impl From<ConfigError> for NmError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => NmError::from(e),
            ConfigError::Parse(message) => NmError::config(message),
            ConfigError::InvalidValue { key, value, reason } => {
                NmError::invalid_config(key, value, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "cancel_distance".to_string(),
            value: "-1".to_string(),
            reason: "必须为正".to_string(),
        };
        assert!(err.to_string().contains("cancel_distance"));
    }

    #[test]
    fn test_config_error_into_nm_error() {
        let err: NmError = ConfigError::InvalidValue {
            key: "cancel_distance".to_string(),
            value: "0".to_string(),
            reason: "必须为正".to_string(),
        }
        .into();
        assert!(err.is_config_error());
        assert!(matches!(err, NmError::InvalidConfig { .. }));
    }
}
