//! 数据模型模块
//! 用户、刷新令牌与 chirp

pub mod auth;
pub mod chirp;
pub mod user;
