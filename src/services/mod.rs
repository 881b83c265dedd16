pub mod admin_service;
pub mod business_service;
pub mod contribution_service;
pub mod notification_service;
pub mod partnership_service;
pub mod profit_service;
pub mod user_service;
pub mod wallet_service;
pub mod withdrawal_service;

pub use admin_service::*;
pub use business_service::*;
pub use contribution_service::*;
pub use notification_service::*;
pub use partnership_service::*;
pub use profit_service::*;
pub use user_service::*;
pub use wallet_service::*;
pub use withdrawal_service::*;
