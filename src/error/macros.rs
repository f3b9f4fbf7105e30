//! # 错误处理宏

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::MonitorError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MonitorError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建内部错误的宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::MonitorError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MonitorError::internal(format!($fmt, $($arg)*))
    };
}

/// 直接返回内部错误
#[macro_export]
macro_rules! bail {
    ($msg:expr) => {
        return Err($crate::internal_error!($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::internal_error!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}
