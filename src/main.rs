use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use club_ledger::{
    AppError,
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    realtime::PresenceDirectory,
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .expect("Failed to run database migrations");
    }

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 在线用户目录，websocket 与通知服务共享
    let presence = Arc::new(PresenceDirectory::new());

    // 创建服务
    let notification_service = NotificationService::new(
        pool.clone(),
        presence.clone(),
        config.ledger.currency_symbol.clone(),
    );
    let user_service = UserService::new(pool.clone());
    let wallet_service = WalletService::new(pool.clone(), notification_service.clone());
    let business_service = BusinessService::new(pool.clone());
    let contribution_service = ContributionService::new(
        pool.clone(),
        notification_service.clone(),
        config.ledger.leaderboard_limit,
    );
    let partnership_service = PartnershipService::new(pool.clone(), notification_service.clone());
    let profit_service = ProfitService::new(pool.clone(), notification_service.clone());
    let withdrawal_service = WithdrawalService::new(pool.clone(), notification_service.clone());
    let admin_service = AdminService::new(pool.clone());

    let realtime_config = config.realtime.clone();

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::from(presence.clone()))
            .app_data(web::Data::new(realtime_config.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(wallet_service.clone()))
            .app_data(web::Data::new(business_service.clone()))
            .app_data(web::Data::new(contribution_service.clone()))
            .app_data(web::Data::new(partnership_service.clone()))
            .app_data(web::Data::new(profit_service.clone()))
            .app_data(web::Data::new(withdrawal_service.clone()))
            .app_data(web::Data::new(admin_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::ws_config)
                    .configure(handlers::user_config)
                    .configure(handlers::wallet_config)
                    .configure(handlers::business_config)
                    .configure(handlers::contribution_config)
                    .configure(handlers::partnership_config)
                    .configure(handlers::statement_config)
                    .configure(handlers::withdrawal_config)
                    .configure(handlers::notification_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
