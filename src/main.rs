use anyhow::Result;
use clap::Parser;
use educator_ai_gateway::models::{Config, EncodedImage};
use educator_ai_gateway::Dispatcher;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "educator-ai-gateway")]
#[command(about = "Send one prompt through the AI request gateway")]
struct CliArgs {
    /// Prompt text sent to the model.
    #[arg(value_name = "PROMPT")]
    prompt: String,

    /// Attach an image (any still format; sent as JPEG) to use a vision model.
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Decode the reply as JSON and pretty-print it.
    #[arg(long)]
    structured: bool,
}

async fn run(args: CliArgs) -> Result<String> {
    let config = Config::from_env()?;
    let gateway = Dispatcher::from_config(&config)?;

    let image = args
        .image
        .as_deref()
        .map(EncodedImage::from_file)
        .transpose()?;

    if args.structured {
        let value = gateway.complete_value(&args.prompt, image).await?;
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        Ok(gateway.complete(&args.prompt, image).await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "educator_ai_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    info!("Starting educator-ai-gateway");

    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_cli_parses_prompt_and_flags() {
        let args = CliArgs::try_parse_from([
            "educator-ai-gateway",
            "Suggest a fractions activity",
            "--image",
            "board.png",
            "--structured",
        ])
        .unwrap();
        assert_eq!(args.prompt, "Suggest a fractions activity");
        assert_eq!(args.image.unwrap().to_str(), Some("board.png"));
        assert!(args.structured);
    }

    #[test]
    fn test_cli_requires_prompt() {
        assert!(CliArgs::try_parse_from(["educator-ai-gateway"]).is_err());
    }
}
