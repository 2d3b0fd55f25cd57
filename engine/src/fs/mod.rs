//! 文件系统辅助

pub mod atomic;
