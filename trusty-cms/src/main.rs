use trusty_cms::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let state = AppState::builder().config(config).build().await?;
    Server::new(state).serve().await
}
