use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{TransactionKind, wallet_transaction_entity as wallet_transactions};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransactionResponse {
    pub id: i64,
    pub kind: TransactionKind,
    /// 金额（正数，方向由 kind 决定）
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<wallet_transactions::Model> for WalletTransactionResponse {
    fn from(t: wallet_transactions::Model) -> Self {
        Self {
            id: t.id,
            kind: t.kind,
            amount: t.amount,
            balance_after: t.balance_after,
            description: t.description,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub id: i64,
    pub user_id: i64,
    pub balance: i64,
    /// 最新的在前
    pub transactions: Vec<WalletTransactionResponse>,
}

/// 管理员为用户钱包入账
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditWalletRequest {
    #[schema(example = 50000)]
    pub amount: i64,
    #[schema(example = "Bank transfer")]
    pub description: Option<String>,
}
