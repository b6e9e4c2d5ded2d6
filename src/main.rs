use std::fmt::{Debug, Display};

use colored::*;
use tokio::task::JoinError;
use tutor_connect::core::{get_subscriber, init_subscriber, AppConfig};
use tutor_connect::tutor_connect_web_server::TutorConnectServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let file_appender = tracing_appender::rolling::daily("/var/tmp/log/tutor_connect", "app");

    let subscriber = get_subscriber("tutor_connect".into(), "info".into(), file_appender);
    init_subscriber(subscriber);

    let config = AppConfig::new()?;

    let server = TutorConnectServer::build(config.clone()).await?;
    let port = server.port();

    let server_task = tokio::spawn(server.run_until_stopped());

    println!("{}", "-----------------------------------------".green());
    println!(
        "{}",
        format!("🚀 Tutor Connect started on {}:{}", config.server.host, port).bold()
    );
    println!("{}", "-----------------------------------------".green());

    tokio::select! {
        outcome = server_task => report_exit("HTTP server", outcome),
    }
    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{} has exited", task_name)
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} failed",
                task_name
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{} task failed to complete",
                task_name
            )
        }
    }
}
