pub mod admin;
pub mod business;
pub mod common;
pub mod contribution;
pub mod notification;
pub mod pagination;
pub mod partnership;
pub mod statement;
pub mod user;
pub mod wallet;
pub mod withdrawal;

pub use admin::*;
pub use business::*;
pub use common::*;
pub use contribution::*;
pub use notification::*;
pub use pagination::*;
pub use partnership::*;
pub use statement::*;
pub use user::*;
pub use wallet::*;
pub use withdrawal::*;
