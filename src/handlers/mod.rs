pub mod admin;
pub mod businesses;
pub mod contributions;
pub mod health;
pub mod notifications;
pub mod partnerships;
pub mod statements;
pub mod users;
pub mod wallet;
pub mod withdrawals;
pub mod ws;

pub use admin::admin_config;
pub use businesses::business_config;
pub use contributions::contribution_config;
pub use health::health_config;
pub use notifications::notification_config;
pub use partnerships::partnership_config;
pub use statements::statement_config;
pub use users::user_config;
pub use wallet::wallet_config;
pub use withdrawals::withdrawal_config;
pub use ws::ws_config;
