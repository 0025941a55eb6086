#![allow(clippy::print_stdout)]

use std::sync::Arc;
use std::time::Duration;

use bargaining::config::normalize_base_url;
use bargaining::{
    ActionClient, BargainId, BargainingConfig, CsrfToken, DialogSurface, NavigationTiming,
    NegotiationController, NegotiationError, NegotiationOutcome, Operation, PageContext,
    ProductId, TokenProvider,
};
use clap::Parser;

mod console;

pub use console::{ConsoleNavigator, ConsoleSurface};

#[derive(Parser, Debug)]
#[command(name = "crazycart-bargain")]
#[command(about = "Negotiate prices on a CrazyCart storefront")]
pub struct BargainCli {
    /// Storefront base URL [default: $CRAZYCART_BASE_URL or http://127.0.0.1:8000]
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Session cookie of a logged-in user [default: $CRAZYCART_SESSION_ID]
    #[arg(long, global = true)]
    pub session_id: Option<String>,
    /// Request timeout in milliseconds [default: $CRAZYCART_TIMEOUT_MS or 30000]
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
    /// CSRF token to send instead of loading one from a page
    #[arg(long, global = true)]
    pub csrf_token: Option<String>,
    /// Page to load the CSRF token from [default: the page the action lives on]
    #[arg(long, global = true)]
    pub page: Option<String>,
    /// Answer yes to confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
    /// Fire follow-up navigation without the usual delay
    #[arg(long, global = true)]
    pub no_wait: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Accept the offer currently on the table
    Accept { id: BargainId },
    /// Reject the offer currently on the table
    Reject { id: BargainId },
    /// Answer with a new price and a message explaining it
    Counter {
        id: BargainId,
        amount: String,
        #[arg(long, short)]
        message: String,
    },
    /// Make the first offer on a product
    Create {
        product_id: ProductId,
        amount: String,
        #[arg(long, short, default_value = "")]
        message: String,
        #[arg(long, short, default_value_t = 1)]
        quantity: u32,
    },
    /// Send a bargain request the way the product page does
    Request {
        product_id: ProductId,
        amount: String,
        #[arg(long, short, default_value = "")]
        message: String,
    },
    /// Post a message on a bargain thread
    Message { id: BargainId, text: String },
}

impl Commands {
    /// Page that carries the CSRF token for this command.
    #[must_use]
    pub fn token_page(&self) -> String {
        match self {
            Self::Accept { id }
            | Self::Reject { id }
            | Self::Counter { id, .. }
            | Self::Message { id, .. } => format!("/bargaining/{id}/"),
            Self::Create { .. } | Self::Request { .. } => "/bargaining/requests/".to_string(),
        }
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Accept { .. } => Operation::Accept,
            Self::Reject { .. } => Operation::Reject,
            Self::Counter { .. } => Operation::Counter,
            Self::Create { .. } => Operation::CreateOffer,
            Self::Request { .. } => Operation::RequestBargain,
            Self::Message { .. } => Operation::SendMessage,
        }
    }
}

impl BargainCli {
    /// Layers command-line flags over `config`.
    pub fn apply_overrides(&self, mut config: BargainingConfig) -> anyhow::Result<BargainingConfig> {
        if let Some(base_url) = self.base_url.as_deref() {
            config.base_url = normalize_base_url(base_url)?;
        }
        if self.session_id.is_some() {
            config = config.with_session_id(self.session_id.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(timeout_ms.max(1));
        }
        if self.no_wait {
            config = config.with_timing(NavigationTiming::immediate());
        }
        Ok(config)
    }
}

/// Resolves the CSRF token for a run.
///
/// A non-blank `csrf_token` is used as the page token and also joins the
/// client's cookie jar as `csrftoken`, since the storefront checks the header
/// against the cookie. Otherwise `page` is loaded and scraped.
pub async fn load_tokens(
    client: ActionClient,
    csrf_token: Option<&str>,
    page: &str,
) -> Result<(ActionClient, PageContext), NegotiationError> {
    if let Some(token) = csrf_token.and_then(CsrfToken::new) {
        let context = PageContext::new().with_meta_token(token.as_str());
        return Ok((client.with_csrf_cookie(&token), context));
    }
    let context = client.fetch_page_context(page).await?;
    Ok((client, context))
}

pub async fn run(cli: BargainCli) -> anyhow::Result<()> {
    let config = cli.apply_overrides(BargainingConfig::from_env()?)?;
    let client = ActionClient::new(&config)?;
    let surface = Arc::new(ConsoleSurface::new(cli.yes));

    let page = cli
        .page
        .clone()
        .unwrap_or_else(|| cli.command.token_page());
    let (client, context) = match load_tokens(client, cli.csrf_token.as_deref(), &page).await {
        Ok(loaded) => loaded,
        Err(error) => {
            surface.notify(
                &error.user_message(cli.command.operation()),
                error.severity(),
            );
            return Err(anyhow::Error::new(error).context(format!("failed to load {page}")));
        }
    };
    let tokens: Arc<dyn TokenProvider> = Arc::new(context);

    let navigator = Arc::new(ConsoleNavigator::new(config.base_url.clone()));
    let controller =
        NegotiationController::with_client(client, &config, tokens, surface, navigator.clone());

    let outcome = match cli.command {
        Commands::Accept { id } => controller.request_accept(id).await,
        Commands::Reject { id } => controller.request_reject(id).await,
        Commands::Counter {
            id,
            amount,
            message,
        } => controller.request_counter(id, &amount, &message).await,
        Commands::Create {
            product_id,
            amount,
            message,
            quantity,
        } => {
            controller
                .create_initial_offer(product_id, &amount, &message, quantity)
                .await
        }
        Commands::Request {
            product_id,
            amount,
            message,
        } => {
            controller
                .submit_bargain_request(product_id, &amount, &message)
                .await
        }
        Commands::Message { id, text } => controller.send_message(id, &text).await,
    };

    navigator.settle().await;
    match outcome {
        NegotiationOutcome::Failed(error) => Err(error.into()),
        NegotiationOutcome::Declined | NegotiationOutcome::Completed(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> BargainCli {
        match BargainCli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(err) => panic!("expected {args:?} to parse: {err}"),
        }
    }

    #[test]
    fn cli_requires_subcommand() {
        let err = match BargainCli::try_parse_from(["crazycart-bargain"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn counter_requires_message() {
        let err = match BargainCli::try_parse_from(["crazycart-bargain", "counter", "4", "750"]) {
            Ok(_) => panic!("expected missing --message parse error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn bargain_ids_must_be_positive() {
        let err = match BargainCli::try_parse_from(["crazycart-bargain", "accept", "0"]) {
            Ok(_) => panic!("expected invalid id parse error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn create_defaults_to_single_quantity_and_blank_message() {
        let cli = parse(&["crazycart-bargain", "create", "7", "500"]);
        let (Some(product_id), Some(id)) = (ProductId::new(7), BargainId::new(7)) else {
            panic!("valid ids");
        };
        assert_eq!(
            cli.command,
            Commands::Create {
                product_id,
                amount: "500".to_string(),
                message: String::new(),
                quantity: 1,
            }
        );
        assert_eq!(cli.command.token_page(), "/bargaining/requests/");
        assert_eq!(
            Commands::Accept { id }.token_page(),
            "/bargaining/7/"
        );
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = parse(&[
            "crazycart-bargain",
            "counter",
            "4",
            "750",
            "-m",
            "final price",
            "--yes",
            "--base-url",
            "https://shop.example.com/",
        ]);
        assert!(cli.yes);
        assert_eq!(cli.base_url.as_deref(), Some("https://shop.example.com/"));
        assert!(matches!(cli.command, Commands::Counter { .. }));
    }

    #[test]
    fn flags_override_config() -> anyhow::Result<()> {
        let cli = parse(&[
            "crazycart-bargain",
            "--base-url",
            "https://shop.example.com/",
            "--session-id",
            " s3ss10n ",
            "--timeout-ms",
            "2500",
            "--no-wait",
            "reject",
            "3",
        ]);
        let config = cli.apply_overrides(BargainingConfig::new("http://127.0.0.1:8000")?)?;
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.session_id.as_deref(), Some("s3ss10n"));
        assert_eq!(config.timeout, Duration::from_millis(2_500));
        assert_eq!(config.timing, NavigationTiming::immediate());
        Ok(())
    }

    #[test]
    fn commands_name_their_operation() {
        let cli = parse(&["crazycart-bargain", "request", "7", "500"]);
        assert_eq!(cli.command.operation(), Operation::RequestBargain);
        let cli = parse(&["crazycart-bargain", "message", "3", "hello"]);
        assert_eq!(cli.command.operation(), Operation::SendMessage);
    }

    #[tokio::test]
    async fn supplied_token_is_also_set_as_cookie() -> anyhow::Result<()> {
        let config = BargainingConfig::new("http://127.0.0.1:8000")?;
        let client = ActionClient::new(&config)?;

        let (client, context) = load_tokens(client, Some(" tok-9 "), "/bargaining/1/").await?;

        assert_eq!(
            context.token().map(|token| token.as_str().to_string()),
            Some("tok-9".to_string())
        );
        let cookie = client.cookie_header().unwrap_or_default();
        assert!(cookie.contains("csrftoken=tok-9"), "cookie header: {cookie}");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_page_maps_to_network_notice() -> anyhow::Result<()> {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?
        };
        let config = BargainingConfig::new(&format!("http://{addr}"))?;
        let client = ActionClient::new(&config)?;

        let error = match load_tokens(client, Some("  "), "/bargaining/1/").await {
            Ok(_) => panic!("expected the page load to fail"),
            Err(error) => error,
        };

        assert!(matches!(error, NegotiationError::Transport(_)));
        let cli = parse(&["crazycart-bargain", "accept", "1"]);
        assert_eq!(
            error.user_message(cli.command.operation()),
            "Network error. Please check your connection and try again."
        );
        Ok(())
    }

    #[test]
    fn bad_base_url_flag_is_an_error() -> anyhow::Result<()> {
        let cli = parse(&["crazycart-bargain", "--base-url", "shop", "accept", "1"]);
        assert!(
            cli.apply_overrides(BargainingConfig::new("http://127.0.0.1:8000")?)
                .is_err()
        );
        Ok(())
    }
}
