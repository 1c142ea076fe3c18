//! Subcommands of `licd` and their handlers.
//!
//! Each handler calls one [`LicdClient`] method and prints the result to
//! stdout. Failures propagate to `main`, which logs them and exits with 1.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::client::{LicdClient, NewLicense};
use crate::report;

#[derive(Subcommand)]
pub enum Command {
    /// Issue a new license.
    Create(CreateArgs),

    /// Set a license's expiration date (may shorten it).
    Renew(RenewArgs),

    /// Release a license's machine binding so it can be activated elsewhere.
    Reset(UserArgs),

    /// Suspend a license. Suspension cannot be undone.
    Suspend(UserArgs),

    /// List every license with its activation and expiry status.
    List(ListArgs),

    /// Verify a license for a machine, as a licensed client would.
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub license_key: String,
    /// Expiration date (YYYY-MM-DD). Omit for a license that never expires.
    #[arg(long, value_parser = parse_date_arg)]
    pub expires: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct RenewArgs {
    #[arg(long)]
    pub username: String,
    /// New expiration date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date_arg)]
    pub expires: NaiveDate,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[arg(long)]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub license_key: String,
    #[arg(long)]
    pub machine_id: String,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    licd_registry::parse_date(raw).map_err(|e| e.to_string())
}

/// Run one subcommand against the server.
pub async fn run(command: Command, client: &LicdClient) -> anyhow::Result<()> {
    match command {
        Command::Create(args) => {
            let outcome = client
                .create_license(NewLicense {
                    username: &args.username,
                    password: &args.password,
                    license_key: &args.license_key,
                    expiration_date: args.expires,
                })
                .await
                .with_context(|| format!("creating license for {}", args.username))?;
            println!("{}: {}", args.username, outcome.message);
        }
        Command::Renew(args) => {
            let outcome = client
                .renew_license(&args.username, args.expires)
                .await
                .with_context(|| format!("renewing license for {}", args.username))?;
            println!(
                "{}: {} (expires {})",
                args.username, outcome.message, outcome.new_expiration_date
            );
        }
        Command::Reset(args) => {
            let outcome = client
                .reset_license(&args.username)
                .await
                .with_context(|| format!("resetting license for {}", args.username))?;
            println!("{}: {}", args.username, outcome.message);
        }
        Command::Suspend(args) => {
            let outcome = client
                .suspend_license(&args.username)
                .await
                .with_context(|| format!("suspending license for {}", args.username))?;
            println!("{}: {}", args.username, outcome.message);
        }
        Command::List(args) => {
            let licenses = client.list_licenses().await.context("listing licenses")?;
            let reports = report::build(&licenses, today());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("{}", report::render_text(&reports));
            }
        }
        Command::Verify(args) => {
            let outcome = client
                .verify(
                    &args.username,
                    &args.password,
                    &args.license_key,
                    &args.machine_id,
                )
                .await
                .with_context(|| format!("verifying license for {}", args.username))?;
            let expiration = outcome
                .expiration_date
                .map_or_else(|| "never".to_string(), |d| d.to_string());
            println!("{}: {} (expires {expiration})", args.username, outcome.message);
        }
    }
    Ok(())
}

/// Today's date on the local calendar.
fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_argument_parsing() {
        assert_eq!(
            parse_date_arg("2030-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 31).unwrap()
        );
        assert!(parse_date_arg("31/01/2030").unwrap_err().contains("YYYY-MM-DD"));
    }
}
