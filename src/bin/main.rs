use clap::Parser;
use smart_auth::commands::retrieve_token::RetrieveTokenCommand;
use smart_auth::http::client::HttpClient;
use smart_auth::parameters::{AuthArgs, Config};
use std::error::Error;
use std::io;

#[derive(Parser, Debug)]
#[command(name = "smart-auth-cli")]
#[command(about = "Obtains a SMART-on-FHIR access token via the OAuth2 JWT-bearer assertion grant")]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    let config = Config::try_from(cli.auth)?;

    let http_client = HttpClient::new().map_err(|e| format!("error creating http client: {e}"))?;

    let response = RetrieveTokenCommand::new(http_client).retrieve_token(&config)?;

    // The token document is relayed exactly as received.
    println!("{response}");
    Ok(())
}
