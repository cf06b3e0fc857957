use std::fmt;

#[doc = "运维手册对齐的错误码标识。"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    #[doc = "WARDEN-ENUM-001: Net* 枚举调用返回非成功状态。"]
    Enum001,
    #[doc = "WARDEN-ENUM-002: 枚举调用成功但未返回缓冲区。"]
    Enum002,
    #[doc = "WARDEN-ENUM-003: 枚举缓冲区地址未对齐，无法解码。"]
    Enum003,
    #[doc = "WARDEN-LSA-101: 登录会话枚举失败。"]
    Lsa101,
    #[doc = "WARDEN-DEP-201: 进程属主映射不可用。"]
    Dep201,
    #[doc = "WARDEN-HOST-301: 当前平台不支持该操作。"]
    Host301,
}

impl ErrorCode {
    #[doc = "返回规范化错误码字符串。"]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Enum001 => "WARDEN-ENUM-001",
            ErrorCode::Enum002 => "WARDEN-ENUM-002",
            ErrorCode::Enum003 => "WARDEN-ENUM-003",
            ErrorCode::Lsa101 => "WARDEN-LSA-101",
            ErrorCode::Dep201 => "WARDEN-DEP-201",
            ErrorCode::Host301 => "WARDEN-HOST-301",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[doc = "Warden 的统一错误类型。"]
#[derive(thiserror::Error, Debug)]
pub enum WardenError {
    #[doc = "原生枚举调用返回失败状态，未分配缓冲区。"]
    #[error("枚举失败: {op} (status {status:#x})")]
    EnumerationFailed { op: &'static str, status: u32 },

    #[doc = "原生调用成功但返回空指针。"]
    #[error("枚举结果为空指针: {op}")]
    NullResult { op: &'static str },

    #[doc = "缓冲区基址未按记录类型对齐，记录被整体丢弃。"]
    #[error("枚举缓冲区未对齐: {op}（丢弃 {entries} 条记录）")]
    MalformedBuffer { op: &'static str, entries: usize },

    #[doc = "外部依赖（进程属主映射）不可用。"]
    #[error("依赖不可用: {message}")]
    DependencyUnavailable { message: String },

    #[doc = "当前平台不支持。"]
    #[error("当前平台不支持: {op}")]
    Unsupported { op: &'static str },

    #[doc = "IO 错误。"]
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[doc = "配置错误。"]
    #[error("配置错误: {message}")]
    ConfigError { message: String },
}

impl WardenError {
    #[doc = "返回该错误对应的错误码（若有）。"]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            WardenError::EnumerationFailed { op, .. } if op.starts_with("Lsa") => {
                Some(ErrorCode::Lsa101)
            }
            WardenError::EnumerationFailed { .. } => Some(ErrorCode::Enum001),
            WardenError::NullResult { .. } => Some(ErrorCode::Enum002),
            WardenError::MalformedBuffer { .. } => Some(ErrorCode::Enum003),
            WardenError::DependencyUnavailable { .. } => Some(ErrorCode::Dep201),
            WardenError::Unsupported { .. } => Some(ErrorCode::Host301),
            WardenError::IoError(_) | WardenError::ConfigError { .. } => None,
        }
    }
}
