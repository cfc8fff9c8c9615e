use std::time::{Duration, Instant};

use micro_client::middleware::{MiddlewareChain, Next};
use micro_client::{ClientError, HttpClient};
use micro_message::{Request, Response};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// cargo run -p micro-client --example fetch -- http://127.0.0.1:8080/
fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let url = std::env::args().nth(1).unwrap_or_else(|| String::from("http://127.0.0.1:8080/"));
    let request = match Request::new("GET", &url) {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, url, "invalid request");
            return;
        }
    };

    let mut client = HttpClient::builder()
        .connect_timeout(Duration::from_secs(3))
        .timeout(Duration::from_secs(10))
        .default_header("User-Agent", "micro-client/fetch")
        .build();

    let chain = MiddlewareChain::new().with(|request: Request, next: Next<'_>| -> Result<Response, ClientError> {
        let start = Instant::now();
        let response = next.run(request)?;
        info!(status = response.status(), elapsed = ?start.elapsed(), "request finished");
        Ok(response)
    });

    match chain.handle(request, &mut client) {
        Ok(response) => {
            println!("HTTP/{} {} {}", response.version(), response.status(), response.reason());
            for (name, values) in response.headers().iter() {
                println!("{name}: {}", values.join(", "));
            }
            println!();
            match response.body().contents() {
                Ok(body) => println!("{}", String::from_utf8_lossy(&body)),
                Err(e) => error!(cause = %e, "failed to read body"),
            }
        }
        Err(e) if e.is_network() => error!(cause = %e, "server unreachable"),
        Err(e) => error!(cause = %e, "request failed"),
    }
}
