use anyhow::{bail, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use fileupdate_core::catalog::Token;
use rand::Rng;

use super::{to_json, Context};

/// Random bytes behind each generated credential.
const CREDENTIAL_BYTES: usize = 32;

/// Publish token commands.
#[derive(Debug, clap::Parser)]
pub struct TokensCommand {
    #[command(subcommand)]
    pub action: TokensAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum TokensAction {
    /// List tokens with masked credentials
    List,

    /// Issue a new token and print its credential once
    Create {
        /// Label shown on releases published with this token
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Disable a token; it stays on record
    Disable { id: String },
}

impl TokensCommand {
    pub async fn run(self, ctx: &Context) -> Result<serde_json::Value> {
        let storage = &ctx.storage;

        match self.action {
            TokensAction::List => {
                let tokens: Vec<Token> = storage
                    .list_tokens()
                    .await?
                    .into_iter()
                    .map(|mut token| {
                        token.token = token.masked_credential();
                        token
                    })
                    .collect();
                to_json(&tokens)
            }
            TokensAction::Create { name, description } => {
                let name = name.trim();
                if name.is_empty() {
                    bail!("Token name cannot be blank");
                }

                let mut token = Token::new(generate_credential(), name);
                if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
                    token = token.with_description(description.trim());
                }
                to_json(&storage.create_token(&token).await?)
            }
            TokensAction::Disable { id } => match storage.disable_token(&id).await? {
                Some(token) => {
                    tracing::info!(token_id = %token.id, "Disabled token");
                    to_json(&token)
                }
                None => bail!("Token not found: {id}"),
            },
        }
    }
}

/// Generates a random URL-safe credential.
fn generate_credential() -> String {
    let mut bytes = [0u8; CREDENTIAL_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_credentials_are_url_safe_and_distinct() {
        let first = generate_credential();
        let second = generate_credential();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
