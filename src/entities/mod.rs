pub mod businesses;
pub mod contributions;
pub mod notifications;
pub mod partnerships;
pub mod profit_history;
pub mod statements;
pub mod users;
pub mod wallet_transactions;
pub mod wallets;
pub mod withdrawals;

pub use businesses as business_entity;
pub use contributions as contribution_entity;
pub use notifications as notification_entity;
pub use partnerships as partnership_entity;
pub use profit_history as profit_history_entity;
pub use statements as statement_entity;
pub use users as user_entity;
pub use wallet_transactions as wallet_transaction_entity;
pub use wallets as wallet_entity;
pub use withdrawals as withdrawal_entity;

pub use contributions::ContributionStatus;
pub use notifications::NotificationKind;
pub use users::UserRole;
pub use wallet_transactions::TransactionKind;
pub use withdrawals::{WithdrawalSource, WithdrawalStatus};
