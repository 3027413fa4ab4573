use tracing_subscriber::EnvFilter;

use zedis::config::Config;
use zedis::server::Server;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let config = match std::env::args().nth(1) {
    Some(path) => match Config::from_file(&path) {
      Ok(config) => config,
      Err(e) => {
        tracing::error!(path = %path, error = %e, "failed to load configuration");
        std::process::exit(1);
      },
    },
    None => Config::default(),
  };

  let server = match Server::new(config) {
    Ok(server) => server,
    Err(e) => {
      tracing::error!(error = %e, "failed to initialise server");
      std::process::exit(1);
    },
  };

  if let Err(e) = server.run() {
    tracing::error!(error = %e, "server terminated");
    std::process::exit(1);
  }
}
