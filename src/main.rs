use web_server::config::ServerConfig;
use web_server::server::Server;

fn main() {
    let config = ServerConfig::default();
    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("server init error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.run() {
        eprintln!("server error: {}", e);
        std::process::exit(1);
    }
}
