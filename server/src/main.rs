use clap::Parser;
use server::network::Server;

/// Main-method of the application.
/// Parses command-line arguments, then runs the buzzer server until shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Number of slides for a game created at startup (0 to skip)
        #[clap(short, long, default_value = "0")]
        slides: u32,
    }

    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address).await?;

    // Optionally seed one game so a deployment without the HTTP layer
    // still has a room to join
    if args.slides > 0 {
        let (game_id, host_id) = server.service_mut().create_game(args.slides)?;
        println!("Created game {} (host id {})", game_id, host_id);
    }

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
