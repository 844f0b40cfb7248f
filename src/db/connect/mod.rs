use aws_config::{ meta::region::RegionProviderChain, BehaviorVersion, Region };
use aws_sdk_dynamodb::Client;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;

/// Builds the document-store client. A configured endpoint points at a local
/// instance; otherwise the shared AWS credential chain applies.
pub async fn setup_db_client(config: &Config) -> Result<Client, AppError> {
    let region_provider = RegionProviderChain::default_provider().or_else(
        Region::new(config.aws.region.clone())
    );

    let mut loader = aws_config
        ::from_env()
        .behavior_version(BehaviorVersion::latest())
        .region(region_provider);

    if
        let (Some(access_key), Some(secret_key)) = (
            &config.aws.access_key_id,
            &config.aws.secret_access_key,
        )
    {
        use aws_credential_types::Credentials;
        let credentials = Credentials::new(access_key, secret_key, None, None, "config");
        loader = loader.credentials_provider(credentials);
    }

    let aws_config = loader.load().await;

    if let Some(endpoint) = &config.database.endpoint {
        info!("Setting up local DynamoDB client with endpoint: {}", endpoint);
        let dynamo_config = aws_sdk_dynamodb::config::Builder
            ::from(&aws_config)
            .endpoint_url(endpoint)
            .build();
        return Ok(Client::from_conf(dynamo_config));
    }

    info!("Setting up AWS DynamoDB client for region: {}", config.aws.region);
    Ok(Client::new(&aws_config))
}

/// Shared AWS SDK config for the queue, topic and directory clients.
pub async fn load_aws_config(config: &Config) -> aws_config::SdkConfig {
    let region_provider = RegionProviderChain::default_provider().or_else(
        Region::new(config.aws.region.clone())
    );

    aws_config
        ::from_env()
        .behavior_version(BehaviorVersion::latest())
        .region(region_provider)
        .load().await
}
