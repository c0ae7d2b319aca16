use serde::de::DeserializeOwned;
use serde::Serialize;
use taskdeck_core::api::{ApiClient, Endpoint, SnapshotSource};
use taskdeck_core::models::{Goal, Meeting, Message, Post, Task};

use crate::commands::common::{load_client_config, print_entities, Describe};
use crate::error::CliError;

pub async fn run_fetch(resource: &str, as_json: bool, profile: Option<&str>) -> Result<(), CliError> {
    let endpoint = resource
        .parse::<Endpoint>()
        .map_err(CliError::InvalidResource)?;
    let config = load_client_config(profile)?;
    let client = ApiClient::new(config.session()?, config.http_timeout)?;

    match endpoint {
        Endpoint::Tasks => fetch_and_print::<Task>(&client, &endpoint, as_json).await,
        Endpoint::Goals => fetch_and_print::<Goal>(&client, &endpoint, as_json).await,
        Endpoint::Meetings => fetch_and_print::<Meeting>(&client, &endpoint, as_json).await,
        Endpoint::Posts => fetch_and_print::<Post>(&client, &endpoint, as_json).await,
        Endpoint::Messages { .. } => {
            fetch_and_print::<Message>(&client, &endpoint, as_json).await
        }
    }
}

async fn fetch_and_print<E>(
    source: &impl SnapshotSource,
    endpoint: &Endpoint,
    as_json: bool,
) -> Result<(), CliError>
where
    E: Describe + Serialize + DeserializeOwned + Send,
{
    let entities = source.fetch_snapshot::<E>(endpoint).await?;
    print_entities(&entities, as_json)
}
