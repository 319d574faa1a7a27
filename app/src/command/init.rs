use cora_config::Config;

/// Strategy for initializing the configuration.
///
/// This strategy creates the default configuration file at `~/cora/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Edit the config file and add your API key");
        println!("   2. For Azure deployments set base_url and api_version");
        println!("   3. Run 'cora chat' to start a conversation");
        println!();
        Ok(())
    }
}
