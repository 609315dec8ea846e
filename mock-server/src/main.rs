use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    println!("mock server on http://{}", listener.local_addr()?);
    println!("routes: GET|HEAD /, GET /status/{{code}}, GET /delay/{{ms}}, POST /echo");
    mock_server::run(listener).await
}
