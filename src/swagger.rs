use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    ContributionStatus, NotificationKind, TransactionKind, UserRole, WithdrawalSource,
    WithdrawalStatus,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::users::get_me,
        handlers::wallet::my_wallet,
        handlers::businesses::create_business,
        handlers::businesses::list_businesses,
        handlers::businesses::get_business,
        handlers::contributions::create_contribution,
        handlers::contributions::business_contributions,
        handlers::contributions::my_contributions,
        handlers::contributions::all_contributions,
        handlers::contributions::approve_contribution,
        handlers::contributions::funding_progress,
        handlers::contributions::leaderboard,
        handlers::partnerships::buy_partnership,
        handlers::partnerships::my_partnerships,
        handlers::partnerships::business_partnerships,
        handlers::statements::add_statement,
        handlers::statements::list_statements,
        handlers::statements::allocate_profit,
        handlers::statements::profit_history,
        handlers::withdrawals::request_withdrawal,
        handlers::withdrawals::request_profit_withdrawal,
        handlers::withdrawals::update_withdrawal_status,
        handlers::withdrawals::withdrawal_history,
        handlers::withdrawals::list_withdrawals,
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::admin::create_user,
        handlers::admin::dashboard,
        handlers::admin::businesses_progress,
        handlers::admin::credit_wallet,
        handlers::ws::ws_connect,
    ),
    components(
        schemas(
            UserRole,
            ContributionStatus,
            NotificationKind,
            TransactionKind,
            WithdrawalSource,
            WithdrawalStatus,
            WithdrawalDecision,
            ApiError,
            PaginationParams,
            CreateUserRequest,
            UserResponse,
            JoinedBusiness,
            UserProfile,
            WalletTransactionResponse,
            WalletResponse,
            CreditWalletRequest,
            CreateBusinessRequest,
            BusinessResponse,
            CreateContributionRequest,
            ContributionResponse,
            ContributionReceipt,
            FundingProgress,
            LeaderboardEntry,
            BuyPartnershipRequest,
            PartnershipResponse,
            CreateStatementRequest,
            StatementResponse,
            AllocateProfitRequest,
            ProfitAllocation,
            CreateWithdrawalRequest,
            ProfitWithdrawalRequest,
            UpdateWithdrawalStatusRequest,
            WithdrawalResponse,
            NotificationResponse,
            UnreadCount,
            WithdrawalCounts,
            DashboardStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "User profile API"),
        (name = "wallet", description = "Wallet API"),
        (name = "businesses", description = "Business API"),
        (name = "contributions", description = "Contribution and funding progress API"),
        (name = "partnerships", description = "Partnership slot API"),
        (name = "statements", description = "Monthly statements and profit allocation API"),
        (name = "withdrawals", description = "Withdrawal request and approval API"),
        (name = "notifications", description = "Notification inbox API"),
        (name = "admin", description = "Administration API"),
        (name = "realtime", description = "Websocket push channel"),
        (name = "health", description = "Health check"),
    ),
    info(
        title = "Club Ledger API",
        version = "0.1.0",
        description = "Investment club ledger REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
