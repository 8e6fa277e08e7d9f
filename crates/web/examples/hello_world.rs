use aquarius::logging::LogSettings;
use aquarius::protocol::{EncodedResponse, Request, SendError};
use aquarius::{Router, Server, ServerConfig};
use tracing::{Level, error};

fn test(request: &Request) -> Result<EncodedResponse, SendError> {
    request.to_response("/test")
}

#[tokio::main]
async fn main() {
    if let Err(e) = LogSettings::new(Level::INFO).init() {
        eprintln!("{e}");
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid configuration");
            return;
        }
    };

    let router = match Router::builder().route_with_methods("/test/", test, ["GET"]) {
        Ok(builder) => builder.build(),
        Err(e) => {
            error!(cause = %e, "invalid route");
            return;
        }
    };

    let server = match Server::builder().router(router).config(config).build() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "can't build server");
            return;
        }
    };

    if let Err(e) = server.start().await {
        error!(cause = %e, "server stopped with error");
    }
}
