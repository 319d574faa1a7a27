use cora_core::parse_agent_response;
use cora_core::response::extract_product_names;
use std::io::Read;

/// Input parameters for the Parse command strategy.
#[derive(Debug, Clone)]
pub struct ParseInput {
    /// Raw agent reply; read from stdin when absent
    pub text: Option<String>,
}

/// Strategy for normalizing a raw agent reply without calling any model.
#[derive(Debug, Clone, Copy)]
pub struct ParseStrategy;

impl super::CommandStrategy for ParseStrategy {
    type Input = ParseInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let text = match input.text {
            Some(text) => text,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let response = parse_agent_response(&text);
        println!("{}", serde_json::to_string_pretty(&response)?);

        let mentioned = extract_product_names(&text);
        if !mentioned.is_empty() {
            eprintln!("{}", mentioned.trim_start());
        }
        Ok(())
    }
}
