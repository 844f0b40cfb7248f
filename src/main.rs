use std::path::Path;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{ error, info, warn };

use trainee_notify::{
    api,
    config::Config,
    context::AppContext,
    db,
    error::DispatchResult,
    listeners::{ self, QueueConsumer },
    outbox::{ Outbox, SmtpMailSender, SqsOutbox },
    repository::Repository,
    scheduler::{ FireHandler, Scheduler },
    services::broadcaster::SnsBroadcaster,
    services::history::{ HistoryService, HistoryStore },
    services::messaging::MessagingController,
    services::notification::{ NotificationService, NotificationSettings },
    services::reference::ReferenceClient,
    services::user_directory::CognitoUserDirectory,
    templates::{ TemplateEngine, TemplateVersions },
    SqsClient,
};

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber
        ::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    dotenv().ok();

    info!("Starting up trainee notification service");

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration, using defaults: {}", e);
        Config::default()
    });

    // Document store
    let db_client = match db::connect::setup_db_client(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Fatal error creating database client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::init::ensure_tables_exist(&db_client).await {
        error!("Fatal error ensuring tables exist: {}", e);
        std::process::exit(1);
    }

    info!("Database tables verified/created successfully");

    // Shared AWS clients
    let aws_config = db::connect::load_aws_config(&config).await;
    let sqs_client = aws_sdk_sqs::Client::new(&aws_config);
    let sns_client = aws_sdk_sns::Client::new(&aws_config);
    let cognito_client = aws_sdk_cognitoidentityprovider::Client::new(&aws_config);

    let repository = Repository::new(db_client.clone());

    // Templates
    let versions = match TemplateVersions::from_config(&config.templates) {
        Ok(versions) => versions,
        Err(e) => {
            error!("Fatal template configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = TemplateEngine::new(config.notifications.timezone, versions);
    if let Err(e) = engine.load_dir(Path::new(&config.templates.root)) {
        error!("Fatal error loading templates from {}: {}", config.templates.root, e);
        std::process::exit(1);
    }
    let templates = Arc::new(engine);

    // Services
    let events = Arc::new(
        SnsBroadcaster::new(
            sns_client,
            config.sns.topic_arn.clone(),
            config.sns.message_attribute.clone()
        )
    );

    let history: Arc<dyn HistoryStore> = Arc::new(
        HistoryService::new(repository.clone(), events)
    );

    let scheduler = Arc::new(Scheduler::new(repository.clone()));

    let gate = Arc::new(MessagingController::new(&config.notifications, &config.services));
    let directory = Arc::new(
        CognitoUserDirectory::new(cognito_client, config.cognito.user_pool_id.clone())
    );
    let reference = Arc::new(ReferenceClient::new(&config.services));

    let outbox: Arc<dyn Outbox> = Arc::new(
        SqsOutbox::new(sqs_client.clone(), config.queues.outbox_url.clone())
    );

    let mailer = match SmtpMailSender::new(&config.mail) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            error!("Fatal mail configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let notifications = Arc::new(
        NotificationService::new(
            history.clone(),
            scheduler.clone(),
            gate,
            directory,
            reference,
            outbox,
            mailer,
            templates.clone(),
            NotificationSettings::from_config(&config.notifications)
        )
    );

    // Shutdown signal shared by every worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    // Scheduler worker
    tokio::spawn(
        scheduler
            .clone()
            .run(notifications.clone() as Arc<dyn FireHandler>, shutdown_rx.clone())
    );

    // Reconciliation sweep
    {
        let service = notifications.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = service.sweep_orphans().await {
                            warn!("Reconciliation sweep failed: {}", e);
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    // Queue listeners
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.programme_membership_url.clone(),
            "programme-membership",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::programme_membership::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.placement_url.clone(),
            "placement",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::placement::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.coj_url.clone(),
            "coj",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::coj::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.form_url.clone(),
            "forms",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::forms::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.gmc_url.clone(),
            "gmc",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::gmc::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.ltft_url.clone(),
            "ltft",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::ltft::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.account_url.clone(),
            "account",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::account::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.email_feedback_url.clone(),
            "email-feedback",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::email_feedback::handle(&svc, body).await }
            }
        );
    }
    {
        let svc = notifications.clone();
        spawn_listener(
            sqs_client.clone(),
            config.queues.outbox_url.clone(),
            "outbox",
            shutdown_rx.clone(),
            move |body| {
                let svc = svc.clone();
                async move { listeners::outbox::handle(&svc, body).await }
            }
        );
    }

    // HTTP surface
    let context = AppContext::new(
        repository,
        history,
        notifications,
        scheduler,
        templates,
        config.clone()
    );

    let app = api::router(context);

    let port = std::env
        ::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let bind_address = format!("0.0.0.0:{}", port);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(l) => l,
        Err(e) => {
            error!("Fatal error binding to {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    info!("Server running on http://localhost:{}", port);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Fatal error running server: {}", e);
        std::process::exit(1);
    }
}

fn spawn_listener<F, Fut>(
    client: SqsClient,
    queue_url: String,
    name: &'static str,
    shutdown: watch::Receiver<bool>,
    handler: F
)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<()>> + Send + 'static
{
    if queue_url.trim().is_empty() {
        warn!("No queue configured for {} listener", name);
        return;
    }

    tokio::spawn(async move {
        let consumer = QueueConsumer::new(client, queue_url, name);
        if let Err(e) = consumer.run(shutdown, handler).await {
            error!("Listener {} terminated: {}", name, e);
            std::process::exit(1);
        }
    });
}
